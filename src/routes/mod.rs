use axum::Router;

use crate::state::SharedState;

/// Guild configuration.
pub mod admin;
/// User commands.
pub mod commands;
/// OpenAPI document and Swagger UI.
pub mod docs;
/// Platform events.
pub mod gateway;
/// Health check.
pub mod health;
/// Notification stream.
pub mod sse;

/// Compose every route tree and the documentation UI around the shared state.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(sse::router())
        .merge(gateway::router())
        .merge(commands::router())
        .merge(admin::router());

    api_router.merge(docs::router()).with_state(state)
}
