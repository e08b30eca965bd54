use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::app_error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Doctor,
    Pharmacy,
    DeliveryAgent,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Doctor => "doctor",
            Role::Pharmacy => "pharmacy",
            Role::DeliveryAgent => "delivery_agent",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "customer" => Ok(Role::Customer),
            "doctor" => Ok(Role::Doctor),
            "pharmacy" => Ok(Role::Pharmacy),
            "delivery_agent" | "agent" => Ok(Role::DeliveryAgent),
            other => Err(AppError::BadRequest(format!("{} is not a valid role", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_roles() {
        assert_eq!("Customer".parse::<Role>().unwrap(), Role::Customer);
        assert_eq!("agent".parse::<Role>().unwrap(), Role::DeliveryAgent);
        assert_eq!(
            Role::DeliveryAgent.as_str().parse::<Role>().unwrap(),
            Role::DeliveryAgent
        );
    }

    #[test]
    fn rejects_admin() {
        assert!(matches!("admin".parse::<Role>(), Err(AppError::BadRequest(_))));
    }
}
