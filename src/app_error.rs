use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use diesel::result::DatabaseErrorKind;
use diesel_async::pooled_connection::bb8::RunError;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

use crate::aliases::DieselError;

/// Standard success envelope shared by every endpoint.
#[derive(Serialize, ToSchema, Debug)]
pub struct StdResponse<T, M> {
    pub data: Option<T>,
    pub message: Option<M>,
}

impl<T, M> IntoResponse for StdResponse<T, M>
where
    T: Serialize,
    M: Serialize,
{
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

/// Error body returned on every failure.
#[derive(Serialize, ToSchema, Debug)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    InsufficientStock(String),

    #[error("{0}")]
    StockConflict(String),

    #[error("Checkout is blocked until the cart's prescription is verified")]
    PrescriptionPending,

    #[error("Cart has no items")]
    EmptyCart,

    #[error("Prescription #{0} has already been reviewed")]
    AlreadyReviewed(i32),

    #[error("{0}")]
    InvalidTransition(String),

    #[error("{0}")]
    NotOwner(String),

    #[error("{0}")]
    ForbiddenResource(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    ServiceBusy(String),

    #[error("{0} is unreachable")]
    ServiceUnreachable(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Stable error kind exposed to clients.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NotFoundError",
            AppError::BadRequest(_) => "ValidationError",
            AppError::InsufficientStock(_) => "InsufficientStockError",
            AppError::StockConflict(_) => "StockConflictError",
            AppError::PrescriptionPending => "PrescriptionPendingError",
            AppError::EmptyCart => "EmptyCartError",
            AppError::AlreadyReviewed(_) => "AlreadyReviewedError",
            AppError::InvalidTransition(_) => "InvalidTransitionError",
            AppError::NotOwner(_) => "NotOwnerError",
            AppError::ForbiddenResource(_) => "ForbiddenError",
            AppError::Unauthorized(_) => "UnauthorizedError",
            AppError::Conflict(_) => "ConflictError",
            AppError::ServiceBusy(_) => "ServiceBusy",
            AppError::ServiceUnreachable(_) => "ServiceUnreachable",
            AppError::Other(_) => "InternalError",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::InsufficientStock(_)
            | AppError::StockConflict(_)
            | AppError::PrescriptionPending
            | AppError::EmptyCart
            | AppError::AlreadyReviewed(_)
            | AppError::InvalidTransition(_)
            | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotOwner(_) | AppError::ForbiddenResource(_) => StatusCode::FORBIDDEN,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::ServiceBusy(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::ServiceUnreachable(_) => StatusCode::BAD_GATEWAY,
            AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            AppError::Other(err) => {
                tracing::error!("Internal error: {:#}", err);
                "Internal server error".to_string()
            }
            AppError::ServiceBusy(msg) => {
                tracing::warn!("Request failed with a retryable error: {}", msg);
                msg.clone()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": message,
            "kind": self.kind(),
        }));

        (status, body).into_response()
    }
}

impl From<DieselError> for AppError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => AppError::NotFound("Record not found".into()),
            DieselError::DatabaseError(kind, info) => match kind {
                DatabaseErrorKind::UniqueViolation => {
                    AppError::Conflict("Resource already exists".into())
                }
                DatabaseErrorKind::ForeignKeyViolation => {
                    AppError::NotFound("Referenced record does not exist".into())
                }
                DatabaseErrorKind::CheckViolation => {
                    AppError::Conflict("Request violates a data constraint".into())
                }
                DatabaseErrorKind::SerializationFailure => {
                    AppError::ServiceBusy("Concurrent update detected, retry the request".into())
                }
                // diesel-async reports 55P03 and 40P01 as `Unknown` without
                // their SQLSTATE, leaving the server message as the only signal.
                _ if info.message().contains("lock timeout")
                    || info.message().contains("deadlock detected") =>
                {
                    AppError::ServiceBusy("Timed out waiting for a consistent view, retry the request".into())
                }
                _ => AppError::Other(anyhow::anyhow!(
                    "Database error: {}",
                    info.message()
                )),
            },
            other => AppError::Other(other.into()),
        }
    }
}

impl From<RunError> for AppError {
    fn from(err: RunError) -> Self {
        match err {
            RunError::TimedOut => {
                AppError::ServiceBusy("Timed out waiting for a database connection".into())
            }
            RunError::User(err) => AppError::Other(anyhow::anyhow!(
                "Failed to obtain a DB connection: {}",
                err
            )),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_diesel_not_found() {
        let err: AppError = DieselError::NotFound.into();
        assert_eq!(err.kind(), "NotFoundError");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn lock_contention_is_retryable() {
        for message in [
            "canceling statement due to lock timeout",
            "deadlock detected",
        ] {
            let err: AppError =
                DieselError::DatabaseError(DatabaseErrorKind::Unknown, Box::new(message.to_string()))
                    .into();
            assert_eq!(err.kind(), "ServiceBusy", "{}", message);
        }

        let err: AppError = DieselError::DatabaseError(
            DatabaseErrorKind::Unknown,
            Box::new("syntax error at or near \"FROM\"".to_string()),
        )
        .into();
        assert_eq!(err.kind(), "InternalError");
    }

    #[test]
    fn internal_errors_hide_their_detail() {
        let err = AppError::Other(anyhow::anyhow!("relation \"carts\" does not exist"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn workflow_errors_are_conflicts() {
        for err in [
            AppError::EmptyCart,
            AppError::PrescriptionPending,
            AppError::AlreadyReviewed(3),
            AppError::StockConflict("x".into()),
            AppError::InsufficientStock("x".into()),
        ] {
            assert_eq!(err.status_code(), StatusCode::CONFLICT);
        }
        assert_eq!(
            AppError::NotOwner("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::ServiceBusy("x".into()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
