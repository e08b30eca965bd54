use axum::{Extension, extract::State, response::IntoResponse};
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, ErrorResponse, StdResponse},
    app_state::AppState,
    extract::AppPath,
    middleware::{self, Principal},
    services::orders::{self, OrderView},
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(utoipa_axum::routes!(get_orders))
        .routes(utoipa_axum::routes!(get_order))
        .route_layer(axum::middleware::from_fn(middleware::customers_authorization))
}

/// Fetch the authenticated customer's orders, newest first.
#[utoipa::path(
    get,
    path = "/orders",
    tags = ["Orders"],
    security(("principalRole" = []), ("principalId" = [])),
    responses(
        (status = 200, description = "Get orders successfully", body = StdResponse<Vec<OrderView>, String>)
    )
)]
async fn get_orders(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, AppError> {
    let orders = orders::list_customer_orders(&state, principal.id).await?;

    Ok(StdResponse {
        data: Some(orders),
        message: Some("Get orders successfully"),
    })
}

/// Fetch a specific order.
#[utoipa::path(
    get,
    path = "/orders/{id}",
    tags = ["Orders"],
    params(
        ("id" = i32, Path, description = "Order ID to fetch")
    ),
    security(("principalRole" = []), ("principalId" = [])),
    responses(
        (status = 200, description = "Get order successfully", body = StdResponse<OrderView, String>),
        (status = 403, description = "Order belongs to another customer", body = ErrorResponse),
        (status = 404, description = "Order not found", body = ErrorResponse)
    )
)]
async fn get_order(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppPath(id): AppPath<i32>,
) -> Result<impl IntoResponse, AppError> {
    let order = orders::get_customer_order(&state, principal.id, id).await?;

    Ok(StdResponse {
        data: Some(order),
        message: Some("Get order successfully"),
    })
}
