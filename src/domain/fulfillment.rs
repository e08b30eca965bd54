//! Sub-order lifecycle and the order status derived from it.
//!
//! ```text
//! Processing -> Assigned -> Shipped -> Delivered
//! Processing | Assigned | Shipped -> Cancelled
//! ```

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::app_error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum SubOrderStatus {
    Processing,
    Assigned,
    Shipped,
    Delivered,
    Cancelled,
}

impl SubOrderStatus {
    pub const ALL: [SubOrderStatus; 5] = [
        SubOrderStatus::Processing,
        SubOrderStatus::Assigned,
        SubOrderStatus::Shipped,
        SubOrderStatus::Delivered,
        SubOrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubOrderStatus::Processing => "Processing",
            SubOrderStatus::Assigned => "Assigned",
            SubOrderStatus::Shipped => "Shipped",
            SubOrderStatus::Delivered => "Delivered",
            SubOrderStatus::Cancelled => "Cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SubOrderStatus::Delivered | SubOrderStatus::Cancelled)
    }

    pub fn can_transition_to(&self, next: SubOrderStatus) -> bool {
        use SubOrderStatus::*;
        matches!(
            (self, next),
            (Processing, Assigned)
                | (Assigned, Shipped)
                | (Shipped, Delivered)
                | (Processing, Cancelled)
                | (Assigned, Cancelled)
                | (Shipped, Cancelled)
        )
    }
}

impl fmt::Display for SubOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubOrderStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SubOrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::BadRequest(format!("{} is not a valid sub-order status", s)))
    }
}

/// Who is asking for a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Pharmacy(i32),
    Agent(i32),
}

/// The parts of a sub-order that decide whether a transition is allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubOrderState {
    pub id: i32,
    pub status: SubOrderStatus,
    pub pharmacy_id: i32,
    pub agent_id: Option<i32>,
}

/// Checks that `actor` may move the sub-order to `next`, optionally binding
/// `bind_agent` on assignment.
///
/// While `Processing`, only the owning pharmacy acts. Once `Assigned`, only
/// the bound agent acts; a sub-order assigned without an agent is delivered
/// by its pharmacy, which then keeps driving it.
pub fn check_transition(
    sub: &SubOrderState,
    next: SubOrderStatus,
    actor: Actor,
    bind_agent: Option<i32>,
) -> Result<(), AppError> {
    use SubOrderStatus::*;

    if sub.status.is_terminal() {
        return Err(AppError::InvalidTransition(format!(
            "Sub-order #{} is already {}",
            sub.id, sub.status
        )));
    }

    match (sub.status, actor) {
        (Processing, Actor::Pharmacy(id)) if id == sub.pharmacy_id => {}
        (Processing, Actor::Pharmacy(_)) => {
            return Err(AppError::NotOwner(format!(
                "Sub-order #{} belongs to another pharmacy",
                sub.id
            )));
        }
        (Processing, Actor::Agent(_)) => {
            return Err(AppError::NotOwner(format!(
                "Sub-order #{} has not been assigned to an agent yet",
                sub.id
            )));
        }
        (_, Actor::Agent(id)) if sub.agent_id == Some(id) => {}
        (_, Actor::Pharmacy(id)) if sub.agent_id.is_none() && id == sub.pharmacy_id => {}
        _ => {
            return Err(AppError::NotOwner(format!(
                "Sub-order #{} is handled by its bound delivery agent",
                sub.id
            )));
        }
    }

    if !sub.status.can_transition_to(next) {
        return Err(AppError::InvalidTransition(format!(
            "Cannot move sub-order #{} from {} to {}",
            sub.id, sub.status, next
        )));
    }

    if bind_agent.is_some() && next != Assigned {
        return Err(AppError::BadRequest(
            "An agent can only be bound when assigning a sub-order".into(),
        ));
    }

    Ok(())
}

/// Order-level status, derived from the sub-orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum OrderStatus {
    Processing,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Partially Delivered")]
    PartiallyDelivered,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Processing => "Processing",
            OrderStatus::InProgress => "In Progress",
            OrderStatus::PartiallyDelivered => "Partially Delivered",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    /// Aggregates sub-order statuses. Cancelled sub-orders are ignored unless
    /// every sub-order is cancelled.
    pub fn aggregate(statuses: &[SubOrderStatus]) -> OrderStatus {
        let active: Vec<SubOrderStatus> = statuses
            .iter()
            .copied()
            .filter(|s| *s != SubOrderStatus::Cancelled)
            .collect();

        if statuses.is_empty() {
            return OrderStatus::Processing;
        }
        if active.is_empty() {
            return OrderStatus::Cancelled;
        }
        if active.iter().all(|s| *s == SubOrderStatus::Delivered) {
            return if active.len() == statuses.len() {
                OrderStatus::Delivered
            } else {
                OrderStatus::PartiallyDelivered
            };
        }
        if active.iter().all(|s| *s == SubOrderStatus::Processing) {
            return OrderStatus::Processing;
        }
        OrderStatus::InProgress
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SubOrderStatus::*;

    fn state(status: SubOrderStatus, agent_id: Option<i32>) -> SubOrderState {
        SubOrderState {
            id: 1,
            status,
            pharmacy_id: 10,
            agent_id,
        }
    }

    #[test]
    fn graph_is_exactly_the_documented_one() {
        let allowed = [
            (Processing, Assigned),
            (Assigned, Shipped),
            (Shipped, Delivered),
            (Processing, Cancelled),
            (Assigned, Cancelled),
            (Shipped, Cancelled),
        ];
        for from in SubOrderStatus::ALL {
            for to in SubOrderStatus::ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    allowed.contains(&(from, to)),
                    "{} -> {}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn terminal_states_have_no_exit() {
        for from in [Delivered, Cancelled] {
            for to in SubOrderStatus::ALL {
                let result = check_transition(&state(from, Some(5)), to, Actor::Agent(5), None);
                assert!(matches!(result, Err(AppError::InvalidTransition(_))));
            }
        }
    }

    #[test]
    fn owning_pharmacy_assigns_and_binds_agent() {
        assert!(check_transition(&state(Processing, None), Assigned, Actor::Pharmacy(10), Some(5)).is_ok());
        assert!(check_transition(&state(Processing, None), Cancelled, Actor::Pharmacy(10), None).is_ok());
    }

    #[test]
    fn other_pharmacy_is_not_owner() {
        let result = check_transition(&state(Processing, None), Assigned, Actor::Pharmacy(11), None);
        assert!(matches!(result, Err(AppError::NotOwner(_))));
    }

    #[test]
    fn agent_cannot_act_before_assignment() {
        let result = check_transition(&state(Processing, None), Assigned, Actor::Agent(5), None);
        assert!(matches!(result, Err(AppError::NotOwner(_))));
    }

    #[test]
    fn only_bound_agent_moves_assigned_sub_order() {
        let sub = state(Assigned, Some(5));
        assert!(check_transition(&sub, Shipped, Actor::Agent(5), None).is_ok());
        assert!(matches!(
            check_transition(&sub, Shipped, Actor::Agent(6), None),
            Err(AppError::NotOwner(_))
        ));
        assert!(matches!(
            check_transition(&sub, Shipped, Actor::Pharmacy(10), None),
            Err(AppError::NotOwner(_))
        ));
    }

    #[test]
    fn bound_agent_still_respects_graph() {
        let result = check_transition(&state(Assigned, Some(5)), Delivered, Actor::Agent(5), None);
        assert!(matches!(result, Err(AppError::InvalidTransition(_))));
        let result = check_transition(&state(Shipped, Some(5)), Assigned, Actor::Agent(5), None);
        assert!(matches!(result, Err(AppError::InvalidTransition(_))));
    }

    #[test]
    fn pharmacy_delivers_when_no_agent_bound() {
        assert!(check_transition(&state(Assigned, None), Shipped, Actor::Pharmacy(10), None).is_ok());
        assert!(check_transition(&state(Shipped, None), Delivered, Actor::Pharmacy(10), None).is_ok());
        assert!(matches!(
            check_transition(&state(Assigned, None), Shipped, Actor::Agent(5), None),
            Err(AppError::NotOwner(_))
        ));
    }

    #[test]
    fn agent_binding_only_on_assignment() {
        let result = check_transition(&state(Processing, None), Cancelled, Actor::Pharmacy(10), Some(5));
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[test]
    fn parses_status_case_insensitively() {
        assert_eq!("shipped".parse::<SubOrderStatus>().unwrap(), Shipped);
        assert!("lost".parse::<SubOrderStatus>().is_err());
    }

    #[test]
    fn aggregate_boundaries() {
        use OrderStatus as O;
        assert_eq!(O::aggregate(&[]), O::Processing);
        assert_eq!(O::aggregate(&[Processing]), O::Processing);
        assert_eq!(O::aggregate(&[Processing, Processing]), O::Processing);
        assert_eq!(O::aggregate(&[Processing, Cancelled]), O::Processing);
        assert_eq!(O::aggregate(&[Assigned, Processing]), O::InProgress);
        assert_eq!(O::aggregate(&[Shipped]), O::InProgress);
        assert_eq!(O::aggregate(&[Delivered, Shipped]), O::InProgress);
        assert_eq!(O::aggregate(&[Delivered, Processing]), O::InProgress);
        assert_eq!(O::aggregate(&[Delivered]), O::Delivered);
        assert_eq!(O::aggregate(&[Delivered, Delivered]), O::Delivered);
        assert_eq!(O::aggregate(&[Delivered, Cancelled]), O::PartiallyDelivered);
        assert_eq!(O::aggregate(&[Cancelled]), O::Cancelled);
        assert_eq!(O::aggregate(&[Cancelled, Cancelled]), O::Cancelled);
    }
}
