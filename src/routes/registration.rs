use axum::{extract::State, http::StatusCode, response::IntoResponse};
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, ErrorResponse, StdResponse},
    app_state::AppState,
    extract::AppJson,
    services::registration::{self, Registration, RegistrationReceipt},
};

/// Public: no principal headers are needed to register.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(utoipa_axum::routes!(register))
}

/// Register a customer, doctor, pharmacy or delivery agent.
#[utoipa::path(
    post,
    path = "/register",
    tags = ["Registration"],
    request_body = Registration,
    responses(
        (status = 201, description = "Registered", body = StdResponse<RegistrationReceipt, String>),
        (status = 400, description = "Invalid fields", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse)
    )
)]
async fn register(
    State(state): State<AppState>,
    AppJson(body): AppJson<Registration>,
) -> Result<impl IntoResponse, AppError> {
    let receipt = registration::register(&state, body).await?;

    Ok((
        StatusCode::CREATED,
        StdResponse {
            data: Some(receipt),
            message: Some("Registered successfully"),
        },
    ))
}
