//! Library crate for pomora-back: shared study-room timers, session
//! accounting and leaderboard reports behind an HTTP/SSE gateway adapter.

pub mod config;
/// Persistence models and session store backends.
pub mod dao;
/// Request, response and event payloads.
pub mod dto;
/// Service and HTTP error types.
pub mod error;
/// HTTP route trees.
pub mod routes;
/// Room lifecycle, timer, reporting and notification logic.
pub mod services;
/// Shared in-memory state.
pub mod state;
