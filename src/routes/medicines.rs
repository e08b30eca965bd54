use axum::{extract::State, response::IntoResponse};
use serde::Deserialize;
use utoipa::IntoParams;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, ErrorResponse, StdResponse},
    app_state::AppState,
    extract::{AppPath, AppQuery},
    middleware,
    models::MedicineEntity,
    services::catalog,
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(utoipa_axum::routes!(search_medicines))
        .routes(utoipa_axum::routes!(get_medicine))
        .route_layer(axum::middleware::from_fn(middleware::authenticated))
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Case-insensitive substring of the medicine name.
    pub name: Option<String>,
}

/// Search the medicine catalog by name.
#[utoipa::path(
    get,
    path = "/medicines",
    tags = ["Medicines"],
    params(SearchQuery),
    security(("principalRole" = []), ("principalId" = [])),
    responses(
        (status = 200, description = "Search medicines successfully", body = StdResponse<Vec<MedicineEntity>, String>)
    )
)]
async fn search_medicines(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<SearchQuery>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state.conn().await?;
    let medicines = catalog::search_medicines(conn, query.name.as_deref()).await?;

    Ok(StdResponse {
        data: Some(medicines),
        message: Some("Search medicines successfully"),
    })
}

#[utoipa::path(
    get,
    path = "/medicines/{id}",
    tags = ["Medicines"],
    params(
        ("id" = i32, Path, description = "Medicine ID to fetch")
    ),
    security(("principalRole" = []), ("principalId" = [])),
    responses(
        (status = 200, description = "Get medicine successfully", body = StdResponse<MedicineEntity, String>),
        (status = 404, description = "Medicine not found", body = ErrorResponse)
    )
)]
async fn get_medicine(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state.conn().await?;
    let medicine = catalog::get_medicine(conn, id).await?;

    Ok(StdResponse {
        data: Some(medicine),
        message: Some("Get medicine successfully"),
    })
}
