/// Guild configuration and user command handlers.
pub mod command_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Guild registration, onboarding and welcomes.
pub mod guild_service;
/// Health check service.
pub mod health_service;
/// Notification sink abstraction and its SSE implementation.
pub mod notifier;
/// Membership events to room population changes.
pub mod participant_tracker;
mod periodic;
/// Calendar-driven leaderboard reports.
pub mod report_scheduler;
/// Leaderboard rendering shared by scheduled and manual reports.
pub mod reporting;
/// Server-Sent Events streaming of notifications.
pub mod sse_service;
/// Room status cards and the global presence line.
pub mod status_publisher;
/// Storage connection supervisor toggling degraded mode.
pub mod storage_supervisor;
/// Periodic driver advancing every room.
pub mod timer_engine;
