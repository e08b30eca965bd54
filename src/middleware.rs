//! Principal handling. Credentials are checked upstream; the gateway forwards
//! the authenticated principal as `x-principal-role` / `x-principal-id`.

use axum::{extract::Request, http::HeaderMap, middleware::Next, response::Response};

use crate::{app_error::AppError, domain::role::Role};

pub const PRINCIPAL_ROLE_HEADER: &str = "x-principal-role";
pub const PRINCIPAL_ID_HEADER: &str = "x-principal-id";

/// The authenticated caller: a role and the id of the linked role entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub role: Role,
    pub id: i32,
}

impl Principal {
    pub fn require(&self, role: Role) -> Result<i32, AppError> {
        if self.role == role {
            Ok(self.id)
        } else {
            Err(AppError::ForbiddenResource(format!(
                "This action requires the {} role",
                role
            )))
        }
    }
}

pub fn principal_from_headers(headers: &HeaderMap) -> Result<Principal, AppError> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AppError::Unauthorized(format!("Missing {} header", name)))
    };

    let role: Role = header(PRINCIPAL_ROLE_HEADER)?
        .parse()
        .map_err(|_| AppError::Unauthorized("Unknown principal role".into()))?;
    let id: i32 = header(PRINCIPAL_ID_HEADER)?
        .parse()
        .map_err(|_| AppError::Unauthorized("Malformed principal id".into()))?;

    if id <= 0 {
        return Err(AppError::Unauthorized("Malformed principal id".into()));
    }

    Ok(Principal { role, id })
}

async fn authorize(allowed: &[Role], mut req: Request, next: Next) -> Result<Response, AppError> {
    let principal = principal_from_headers(req.headers())?;

    if !allowed.is_empty() && !allowed.contains(&principal.role) {
        tracing::debug!("Rejected {} principal #{}", principal.role, principal.id);
        return Err(AppError::ForbiddenResource(format!(
            "The {} role cannot access this resource",
            principal.role
        )));
    }

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

/// Any authenticated principal.
pub async fn authenticated(req: Request, next: Next) -> Result<Response, AppError> {
    authorize(&[], req, next).await
}

pub async fn customers_authorization(req: Request, next: Next) -> Result<Response, AppError> {
    authorize(&[Role::Customer], req, next).await
}

pub async fn pharmacies_authorization(req: Request, next: Next) -> Result<Response, AppError> {
    authorize(&[Role::Pharmacy], req, next).await
}

pub async fn agents_authorization(req: Request, next: Next) -> Result<Response, AppError> {
    authorize(&[Role::DeliveryAgent], req, next).await
}
