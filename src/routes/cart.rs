use axum::{Extension, extract::State, response::IntoResponse};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, ErrorResponse, StdResponse},
    app_state::AppState,
    extract::{AppJson, AppPath, AppQuery},
    middleware::{self, Principal},
    services::{
        carts::{self, CartView},
        checkout,
        orders::OrderView,
    },
};

/// Customer-facing cart routes.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(utoipa_axum::routes!(get_cart))
        .routes(utoipa_axum::routes!(add_item))
        .routes(utoipa_axum::routes!(remove_item))
        .routes(utoipa_axum::routes!(checkout_cart))
        .route_layer(axum::middleware::from_fn(middleware::customers_authorization))
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CartQuery {
    /// Must match the authenticated customer when given.
    pub customer: Option<i32>,
}

#[derive(Deserialize, ToSchema)]
pub struct AddItemReq {
    pub medicine_id: i32,
    pub quantity: i32,
}

/// Fetch the authenticated customer's cart.
#[utoipa::path(
    get,
    path = "/cart",
    tags = ["Cart"],
    params(CartQuery),
    security(("principalRole" = []), ("principalId" = [])),
    responses(
        (status = 200, description = "Get cart successfully", body = StdResponse<CartView, String>),
        (status = 403, description = "Another customer's cart", body = ErrorResponse),
        (status = 404, description = "Cart not found", body = ErrorResponse)
    )
)]
async fn get_cart(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppQuery(query): AppQuery<CartQuery>,
) -> Result<impl IntoResponse, AppError> {
    let customer_id = match query.customer {
        Some(customer) if customer != principal.id => {
            return Err(AppError::NotOwner(format!(
                "Customer #{} cannot read the cart of customer #{}",
                principal.id, customer
            )));
        }
        _ => principal.id,
    };

    let cart = carts::get_cart(&state, customer_id).await?;

    Ok(StdResponse {
        data: Some(cart),
        message: Some("Get cart successfully"),
    })
}

/// Add a medicine to the cart. The line is assigned to a single pharmacy that
/// can cover the whole quantity.
#[utoipa::path(
    post,
    path = "/cart/items",
    tags = ["Cart"],
    request_body = AddItemReq,
    security(("principalRole" = []), ("principalId" = [])),
    responses(
        (status = 200, description = "Item added", body = StdResponse<CartView, String>),
        (status = 400, description = "Invalid quantity", body = ErrorResponse),
        (status = 409, description = "No pharmacy has enough stock", body = ErrorResponse)
    )
)]
async fn add_item(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppJson(body): AppJson<AddItemReq>,
) -> Result<impl IntoResponse, AppError> {
    let cart = carts::add_item(&state, principal.id, body.medicine_id, body.quantity).await?;

    Ok(StdResponse {
        data: Some(cart),
        message: Some("Item added to cart"),
    })
}

/// Remove a medicine from the cart.
#[utoipa::path(
    delete,
    path = "/cart/items/{medicine_id}",
    tags = ["Cart"],
    params(
        ("medicine_id" = i32, Path, description = "Medicine to remove")
    ),
    security(("principalRole" = []), ("principalId" = [])),
    responses(
        (status = 200, description = "Item removed", body = StdResponse<CartView, String>),
        (status = 404, description = "Item not in cart", body = ErrorResponse)
    )
)]
async fn remove_item(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppPath(medicine_id): AppPath<i32>,
) -> Result<impl IntoResponse, AppError> {
    let cart = carts::remove_item(&state, principal.id, medicine_id).await?;

    Ok(StdResponse {
        data: Some(cart),
        message: Some("Item removed from cart"),
    })
}

/// Turn the cart into an order split per pharmacy.
#[utoipa::path(
    post,
    path = "/cart/checkout",
    tags = ["Cart"],
    security(("principalRole" = []), ("principalId" = [])),
    responses(
        (status = 200, description = "Order created", body = StdResponse<OrderView, String>),
        (status = 409, description = "Empty cart, pending prescription or stock changed", body = ErrorResponse),
        (status = 503, description = "Cart is busy, retry", body = ErrorResponse)
    )
)]
async fn checkout_cart(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, AppError> {
    let order = checkout::checkout(&state, principal.id).await?;

    Ok(StdResponse {
        data: Some(order),
        message: Some("Checkout completed"),
    })
}
