use axum::Router;
use utoipa_axum::router::OpenApiRouter;

use crate::{app_state::AppState, swagger};

pub mod agents;
pub mod cart;
pub mod medicines;
pub mod orders;
pub mod pharmacy;
pub mod prescriptions;
pub mod registration;
pub mod suborders;

/// Every resource router, each carrying its own role guard.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .merge(registration::routes_with_openapi())
        .merge(medicines::routes_with_openapi())
        .merge(cart::routes_with_openapi())
        .merge(prescriptions::routes_with_openapi())
        .merge(orders::routes_with_openapi())
        .merge(pharmacy::routes_with_openapi())
        .merge(agents::routes_with_openapi())
        .merge(suborders::routes_with_openapi())
}

/// The complete application with Swagger UI, ready to be served.
pub fn app(state: AppState) -> Router {
    let (router, mut openapi) = routes_with_openapi().split_for_parts();
    openapi.info = utoipa::openapi::InfoBuilder::new()
        .title("MediQuick OrderService API")
        .version(env!("CARGO_PKG_VERSION"))
        .build();

    router
        .with_state(state)
        .merge(swagger::create_swagger_ui(openapi))
}
