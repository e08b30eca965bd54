use axum::{Extension, extract::State, response::IntoResponse};
use serde::Deserialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, ErrorResponse, StdResponse},
    app_state::AppState,
    domain::{
        fulfillment::{Actor, SubOrderStatus},
        role::Role,
    },
    extract::{AppJson, AppPath},
    middleware::{self, Principal},
    services::fulfillment::{self, TransitionOutcome},
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(utoipa_axum::routes!(update_status))
        .route_layer(axum::middleware::from_fn(middleware::authenticated))
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateStatusReq {
    /// Target status, e.g. `Assigned` or `Delivered`.
    pub status: String,
    /// Delivery agent to bind; only allowed when moving to `Assigned`.
    pub agent_id: Option<i32>,
}

fn actor_of(principal: &Principal) -> Result<Actor, AppError> {
    match principal.role {
        Role::Pharmacy => Ok(Actor::Pharmacy(principal.id)),
        Role::DeliveryAgent => Ok(Actor::Agent(principal.id)),
        other => Err(AppError::ForbiddenResource(format!(
            "The {} role cannot update sub-orders",
            other
        ))),
    }
}

/// Move a sub-order along its fulfillment lifecycle.
#[utoipa::path(
    put,
    path = "/suborders/{order_id}/{sub_order_id}/status",
    tags = ["Sub-orders"],
    params(
        ("order_id" = i32, Path, description = "Order ID"),
        ("sub_order_id" = i32, Path, description = "Sub-order ID")
    ),
    request_body = UpdateStatusReq,
    security(("principalRole" = []), ("principalId" = [])),
    responses(
        (status = 200, description = "Status updated", body = StdResponse<TransitionOutcome, String>),
        (status = 403, description = "Caller does not own the sub-order", body = ErrorResponse),
        (status = 404, description = "Sub-order or agent not found", body = ErrorResponse),
        (status = 409, description = "Transition not allowed", body = ErrorResponse)
    )
)]
async fn update_status(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppPath((order_id, sub_order_id)): AppPath<(i32, i32)>,
    AppJson(body): AppJson<UpdateStatusReq>,
) -> Result<impl IntoResponse, AppError> {
    let actor = actor_of(&principal)?;
    let next: SubOrderStatus = body.status.parse()?;

    let outcome =
        fulfillment::transition(&state, actor, order_id, sub_order_id, next, body.agent_id).await?;

    Ok(StdResponse {
        data: Some(outcome),
        message: Some("Sub-order status updated"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pharmacies_and_agents_drive_sub_orders() {
        let principal = |role| Principal { role, id: 7 };

        assert_eq!(actor_of(&principal(Role::Pharmacy)).unwrap(), Actor::Pharmacy(7));
        assert_eq!(actor_of(&principal(Role::DeliveryAgent)).unwrap(), Actor::Agent(7));
        assert!(matches!(
            actor_of(&principal(Role::Customer)),
            Err(AppError::ForbiddenResource(_))
        ));
        assert!(matches!(
            actor_of(&principal(Role::Doctor)),
            Err(AppError::ForbiddenResource(_))
        ));
    }
}
