use axum::{Extension, extract::State, response::IntoResponse};
use bigdecimal::BigDecimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, ErrorResponse, StdResponse},
    app_state::AppState,
    domain::fulfillment::SubOrderStatus,
    extract::{AppJson, AppPath, AppQuery},
    middleware::{self, Principal},
    models::StockEntity,
    services::{
        catalog::{self, StockUpsert},
        orders::{self, SubOrderView},
    },
};

/// Pharmacy-facing routes. Every path names a pharmacy, which must be the caller.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(utoipa_axum::routes!(get_sub_orders))
        .routes(utoipa_axum::routes!(list_stock))
        .routes(utoipa_axum::routes!(get_stock_record, upsert_stock))
        .route_layer(axum::middleware::from_fn(middleware::pharmacies_authorization))
}

fn ensure_self(principal: &Principal, pharmacy_id: i32) -> Result<(), AppError> {
    if principal.id != pharmacy_id {
        return Err(AppError::NotOwner(format!(
            "Pharmacy #{} cannot access pharmacy #{}",
            principal.id, pharmacy_id
        )));
    }
    Ok(())
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SubOrdersQuery {
    pub status: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpsertStockReq {
    pub quantity: i32,
    #[schema(value_type = String)]
    pub unit_price: BigDecimal,
}

#[utoipa::path(
    get,
    path = "/pharmacy/{id}/suborders",
    tags = ["Pharmacy"],
    params(
        ("id" = i32, Path, description = "Pharmacy ID"),
        SubOrdersQuery
    ),
    security(("principalRole" = []), ("principalId" = [])),
    responses(
        (status = 200, description = "Get sub-orders successfully", body = StdResponse<Vec<SubOrderView>, String>),
        (status = 403, description = "Another pharmacy", body = ErrorResponse)
    )
)]
async fn get_sub_orders(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppPath(pharmacy_id): AppPath<i32>,
    AppQuery(query): AppQuery<SubOrdersQuery>,
) -> Result<impl IntoResponse, AppError> {
    ensure_self(&principal, pharmacy_id)?;
    let status = query
        .status
        .as_deref()
        .map(str::parse::<SubOrderStatus>)
        .transpose()?;

    let sub_orders =
        orders::list_pharmacy_sub_orders(&state, pharmacy_id, status.map(|s| s.as_str())).await?;

    Ok(StdResponse {
        data: Some(sub_orders),
        message: Some("Get sub-orders successfully"),
    })
}

#[utoipa::path(
    get,
    path = "/pharmacy/{id}/stock",
    tags = ["Pharmacy"],
    params(
        ("id" = i32, Path, description = "Pharmacy ID")
    ),
    security(("principalRole" = []), ("principalId" = [])),
    responses(
        (status = 200, description = "Get stock successfully", body = StdResponse<Vec<StockEntity>, String>),
        (status = 403, description = "Another pharmacy", body = ErrorResponse)
    )
)]
async fn list_stock(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppPath(pharmacy_id): AppPath<i32>,
) -> Result<impl IntoResponse, AppError> {
    ensure_self(&principal, pharmacy_id)?;

    let conn = &mut state.conn().await?;
    let stock = catalog::list_pharmacy_stock(conn, pharmacy_id).await?;

    Ok(StdResponse {
        data: Some(stock),
        message: Some("Get stock successfully"),
    })
}

#[utoipa::path(
    get,
    path = "/stock/{pharmacy_id}/{medicine_id}",
    tags = ["Pharmacy"],
    params(
        ("pharmacy_id" = i32, Path, description = "Pharmacy ID"),
        ("medicine_id" = i32, Path, description = "Medicine ID")
    ),
    security(("principalRole" = []), ("principalId" = [])),
    responses(
        (status = 200, description = "Get stock record successfully", body = StdResponse<StockEntity, String>),
        (status = 403, description = "Another pharmacy", body = ErrorResponse),
        (status = 404, description = "No stock record", body = ErrorResponse)
    )
)]
async fn get_stock_record(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppPath((pharmacy_id, medicine_id)): AppPath<(i32, i32)>,
) -> Result<impl IntoResponse, AppError> {
    ensure_self(&principal, pharmacy_id)?;

    let conn = &mut state.conn().await?;
    let stock = catalog::get_stock(conn, pharmacy_id, medicine_id).await?;

    Ok(StdResponse {
        data: Some(stock),
        message: Some("Get stock record successfully"),
    })
}

/// Set the quantity and price a pharmacy offers for a medicine.
#[utoipa::path(
    put,
    path = "/stock/{pharmacy_id}/{medicine_id}",
    tags = ["Pharmacy"],
    params(
        ("pharmacy_id" = i32, Path, description = "Pharmacy ID"),
        ("medicine_id" = i32, Path, description = "Medicine ID")
    ),
    request_body = UpsertStockReq,
    security(("principalRole" = []), ("principalId" = [])),
    responses(
        (status = 200, description = "Stock saved", body = StdResponse<StockUpsert, String>),
        (status = 400, description = "Negative quantity or price", body = ErrorResponse),
        (status = 403, description = "Another pharmacy", body = ErrorResponse),
        (status = 404, description = "Unknown medicine", body = ErrorResponse)
    )
)]
async fn upsert_stock(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppPath((pharmacy_id, medicine_id)): AppPath<(i32, i32)>,
    AppJson(body): AppJson<UpsertStockReq>,
) -> Result<impl IntoResponse, AppError> {
    let upsert = catalog::upsert_stock(
        &state,
        principal.id,
        pharmacy_id,
        medicine_id,
        body.quantity,
        body.unit_price,
    )
    .await?;

    Ok(StdResponse {
        message: Some(if upsert.created {
            "Stock created"
        } else {
            "Stock updated"
        }),
        data: Some(upsert),
    })
}
