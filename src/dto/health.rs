use serde::Serialize;
use utoipa::ToSchema;

/// Health payload returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// "ok", or "degraded" while no session store is usable.
    pub status: String,
    /// Live rooms driven by the timer engine.
    pub rooms: usize,
    /// Participants across every live room.
    pub participants: usize,
}

impl HealthResponse {
    /// Payload for the given store state and room counts.
    pub fn new(degraded: bool, rooms: usize, participants: usize) -> Self {
        let status = if degraded { "degraded" } else { "ok" };
        Self {
            status: status.to_owned(),
            rooms,
            participants,
        }
    }
}
