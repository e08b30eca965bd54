use axum::Router;
use utoipa::openapi::{
    OpenApi,
    security::{ApiKey, ApiKeyValue, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::middleware::{PRINCIPAL_ID_HEADER, PRINCIPAL_ROLE_HEADER};

/// Registers the principal headers as security schemes and mounts Swagger UI.
pub fn create_swagger_ui(mut openapi: OpenApi) -> Router {
    let components = openapi.components.get_or_insert_with(Default::default);
    components.add_security_scheme(
        "principalRole",
        SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(PRINCIPAL_ROLE_HEADER))),
    );
    components.add_security_scheme(
        "principalId",
        SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(PRINCIPAL_ID_HEADER))),
    );

    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", openapi)
        .into()
}
