use std::time::SystemTime;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Guild configuration payloads.
pub mod admin;
/// User command payloads.
pub mod commands;
/// Platform event payloads.
pub mod gateway;
/// Health check payload.
pub mod health;
/// Room status view.
pub mod room;
/// Notification stream events.
pub mod sse;
/// Custom field validators.
pub mod validation;

fn format_system_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}

/// Render a second count as `mm:ss`; minutes are not wrapped into hours.
pub fn format_clock(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Render a minute count as `Xh Ym`.
pub fn format_minutes(minutes: u64) -> String {
    format!("{}h {}m", minutes / 60, minutes % 60)
}
