use axum::{Extension, extract::State, response::IntoResponse};
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, ErrorResponse, StdResponse},
    app_state::AppState,
    extract::AppPath,
    middleware::{self, Principal},
    services::orders::{self, SubOrderView},
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(utoipa_axum::routes!(get_assigned_sub_orders))
        .route_layer(axum::middleware::from_fn(middleware::agents_authorization))
}

/// Sub-orders bound to the authenticated delivery agent.
#[utoipa::path(
    get,
    path = "/agents/{id}/suborders",
    tags = ["Delivery Agents"],
    params(
        ("id" = i32, Path, description = "Delivery agent ID")
    ),
    security(("principalRole" = []), ("principalId" = [])),
    responses(
        (status = 200, description = "Get assigned sub-orders successfully", body = StdResponse<Vec<SubOrderView>, String>),
        (status = 403, description = "Another agent", body = ErrorResponse)
    )
)]
async fn get_assigned_sub_orders(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppPath(agent_id): AppPath<i32>,
) -> Result<impl IntoResponse, AppError> {
    if principal.id != agent_id {
        return Err(AppError::NotOwner(format!(
            "Agent #{} cannot list the sub-orders of agent #{}",
            principal.id, agent_id
        )));
    }

    let sub_orders = orders::list_agent_sub_orders(&state, agent_id).await?;

    Ok(StdResponse {
        data: Some(sub_orders),
        message: Some("Get assigned sub-orders successfully"),
    })
}
