use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::SharedState;

/// Swagger UI and OpenAPI document.
pub mod docs;
/// Per-group game endpoints.
pub mod group;
/// Health endpoint.
pub mod health;

/// Every route of the service, bound to `state`.
pub fn router(state: SharedState) -> Router<()> {
    health::router()
        .merge(group::router())
        .merge(docs::router())
        .with_state(state)
}

/// [`router`] plus the cross-cutting middleware layers used in production.
pub fn app(state: SharedState) -> Router<()> {
    router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
