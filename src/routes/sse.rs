use std::convert::Infallible;

use axum::{Router, extract::State, response::sse::Sse, routing::get};
use futures::Stream;
use tracing::info;

use crate::{services::sse_service, state::SharedState};

/// Server-sent event stream of every notification the gateway must relay.
#[utoipa::path(
    get,
    path = "/sse/notifications",
    tag = "sse",
    responses((status = 200, description = "Notification stream rendered by the gateway", content_type = "text/event-stream", body = String))
)]
/// Stream status cards, reports, alerts and welcomes to the platform gateway.
pub async fn notification_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>> {
    let receiver = sse_service::subscribe_notifications(&state);
    info!(
        subscribers = state.notifications().subscriber_count(),
        "new notification SSE connection"
    );
    sse_service::to_sse_stream(receiver, sse_service::handshake(&state))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/sse/notifications", get(notification_stream))
}
