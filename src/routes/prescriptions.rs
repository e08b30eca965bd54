use axum::{Extension, extract::State, response::IntoResponse};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app_error::{AppError, ErrorResponse, StdResponse},
    app_state::AppState,
    domain::{prescription::PrescriptionStatus, role::Role},
    extract::{AppJson, AppPath, AppQuery},
    middleware::{self, Principal},
    models::PrescriptionEntity,
    services::prescriptions,
};

/// Customers upload, doctors list and review. Both roles share the paths, so
/// the role is checked per handler.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(utoipa_axum::routes!(upload_prescription, list_prescriptions))
        .routes(utoipa_axum::routes!(review_prescription))
        .route_layer(axum::middleware::from_fn(middleware::authenticated))
}

#[derive(Deserialize, ToSchema)]
pub struct UploadPrescriptionReq {
    /// Opaque reference to the stored prescription file.
    pub file_ref: String,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListPrescriptionsQuery {
    /// `pending`, `verified`, `rejected` or an exact status label.
    pub status: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct ReviewReq {
    /// `Verified` or `Rejected`.
    pub decision: String,
}

/// Upload a prescription for the current cart.
#[utoipa::path(
    post,
    path = "/prescriptions",
    tags = ["Prescriptions"],
    request_body = UploadPrescriptionReq,
    security(("principalRole" = []), ("principalId" = [])),
    responses(
        (status = 200, description = "Prescription uploaded", body = StdResponse<PrescriptionEntity, String>),
        (status = 400, description = "Empty file reference", body = ErrorResponse),
        (status = 403, description = "Caller is not a customer", body = ErrorResponse)
    )
)]
async fn upload_prescription(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppJson(body): AppJson<UploadPrescriptionReq>,
) -> Result<impl IntoResponse, AppError> {
    let customer_id = principal.require(Role::Customer)?;
    let prescription = prescriptions::upload_prescription(&state, customer_id, body.file_ref).await?;

    Ok(StdResponse {
        data: Some(prescription),
        message: Some("Prescription uploaded"),
    })
}

/// List prescriptions for review, oldest first.
#[utoipa::path(
    get,
    path = "/prescriptions",
    tags = ["Prescriptions"],
    params(ListPrescriptionsQuery),
    security(("principalRole" = []), ("principalId" = [])),
    responses(
        (status = 200, description = "Get prescriptions successfully", body = StdResponse<Vec<PrescriptionEntity>, String>),
        (status = 403, description = "Caller is not a doctor", body = ErrorResponse)
    )
)]
async fn list_prescriptions(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppQuery(query): AppQuery<ListPrescriptionsQuery>,
) -> Result<impl IntoResponse, AppError> {
    principal.require(Role::Doctor)?;
    let status = query
        .status
        .as_deref()
        .map(str::parse::<PrescriptionStatus>)
        .transpose()?;

    let prescriptions = prescriptions::list_prescriptions(&state, status).await?;

    Ok(StdResponse {
        data: Some(prescriptions),
        message: Some("Get prescriptions successfully"),
    })
}

/// Verify or reject a prescription.
#[utoipa::path(
    post,
    path = "/prescriptions/{id}/review",
    tags = ["Prescriptions"],
    params(
        ("id" = i32, Path, description = "Prescription ID to review")
    ),
    request_body = ReviewReq,
    security(("principalRole" = []), ("principalId" = [])),
    responses(
        (status = 200, description = "Prescription reviewed", body = StdResponse<PrescriptionEntity, String>),
        (status = 400, description = "Decision is not Verified or Rejected", body = ErrorResponse),
        (status = 404, description = "Prescription not found", body = ErrorResponse),
        (status = 409, description = "Already reviewed", body = ErrorResponse)
    )
)]
async fn review_prescription(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    AppPath(id): AppPath<i32>,
    AppJson(body): AppJson<ReviewReq>,
) -> Result<impl IntoResponse, AppError> {
    let doctor_id = principal.require(Role::Doctor)?;
    let decision: PrescriptionStatus = body.decision.parse()?;
    if !decision.is_terminal() {
        return Err(AppError::BadRequest(
            "decision must be Verified or Rejected".into(),
        ));
    }

    let prescription = prescriptions::review_prescription(&state, doctor_id, id, decision).await?;

    Ok(StdResponse {
        data: Some(prescription),
        message: Some("Prescription reviewed"),
    })
}
