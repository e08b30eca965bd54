use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::app_error::AppError;

/// Review state of an uploaded prescription. The cart mirrors the state of
/// its newest open prescription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum PrescriptionStatus {
    #[serde(rename = "To Be Verified")]
    ToBeVerified,
    Verified,
    Rejected,
}

impl PrescriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrescriptionStatus::ToBeVerified => "To Be Verified",
            PrescriptionStatus::Verified => "Verified",
            PrescriptionStatus::Rejected => "Rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PrescriptionStatus::ToBeVerified)
    }
}

impl fmt::Display for PrescriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrescriptionStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "to be verified" | "pending" => Ok(PrescriptionStatus::ToBeVerified),
            "verified" => Ok(PrescriptionStatus::Verified),
            "rejected" => Ok(PrescriptionStatus::Rejected),
            other => Err(AppError::BadRequest(format!(
                "{} is not a valid prescription status",
                other
            ))),
        }
    }
}

/// Validates a doctor's decision on prescription `id` and returns the new state.
pub fn review(
    id: i32,
    current: PrescriptionStatus,
    decision: PrescriptionStatus,
) -> Result<PrescriptionStatus, AppError> {
    if current.is_terminal() {
        return Err(AppError::AlreadyReviewed(id));
    }
    if !decision.is_terminal() {
        return Err(AppError::BadRequest(
            "A review must either verify or reject the prescription".into(),
        ));
    }
    Ok(decision)
}

/// The checkout gate.
pub fn checkout_allowed(requires_prescription: bool, cart_status: Option<PrescriptionStatus>) -> bool {
    !requires_prescription || cart_status == Some(PrescriptionStatus::Verified)
}

/// Reads a nullable status column written by this service.
pub fn parse_column(value: Option<&str>) -> Result<Option<PrescriptionStatus>, AppError> {
    value.map(str::parse).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use PrescriptionStatus::*;

    #[test]
    fn pending_prescription_can_be_verified_or_rejected() {
        assert_eq!(review(1, ToBeVerified, Verified).unwrap(), Verified);
        assert_eq!(review(1, ToBeVerified, Rejected).unwrap(), Rejected);
    }

    #[test]
    fn terminal_prescription_cannot_be_reviewed_again() {
        for current in [Verified, Rejected] {
            for decision in [Verified, Rejected] {
                assert!(matches!(
                    review(9, current, decision),
                    Err(AppError::AlreadyReviewed(9))
                ));
            }
        }
    }

    #[test]
    fn review_must_be_a_decision() {
        assert!(matches!(
            review(1, ToBeVerified, ToBeVerified),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn gate_only_opens_on_verified() {
        assert!(checkout_allowed(false, None));
        assert!(checkout_allowed(false, Some(Rejected)));
        assert!(checkout_allowed(true, Some(Verified)));
        assert!(!checkout_allowed(true, None));
        assert!(!checkout_allowed(true, Some(ToBeVerified)));
        assert!(!checkout_allowed(true, Some(Rejected)));
    }

    #[test]
    fn parses_labels_and_aliases() {
        assert_eq!("pending".parse::<PrescriptionStatus>().unwrap(), ToBeVerified);
        assert_eq!("To Be Verified".parse::<PrescriptionStatus>().unwrap(), ToBeVerified);
        assert_eq!("VERIFIED".parse::<PrescriptionStatus>().unwrap(), Verified);
        assert!("approved".parse::<PrescriptionStatus>().is_err());
        assert_eq!(parse_column(None).unwrap(), None);
        assert_eq!(parse_column(Some("Rejected")).unwrap(), Some(Rejected));
    }
}
