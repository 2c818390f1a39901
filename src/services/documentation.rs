use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Pomora Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::notification_stream,
        crate::routes::gateway::voice_join,
        crate::routes::gateway::voice_leave,
        crate::routes::gateway::voice_state,
        crate::routes::gateway::guild_available,
        crate::routes::gateway::guild_removed,
        crate::routes::gateway::member_joined,
        crate::routes::commands::confirm,
        crate::routes::commands::stop,
        crate::routes::commands::settings,
        crate::routes::commands::status,
        crate::routes::commands::stats,
        crate::routes::commands::leaderboard,
        crate::routes::admin::get_config,
        crate::routes::admin::set_channel,
        crate::routes::admin::test_welcome,
        crate::routes::admin::reset_welcome,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::sse::Handshake,
            crate::dto::sse::SystemStatus,
            crate::dto::sse::StatusRefreshEvent,
            crate::dto::sse::StatusClosedEvent,
            crate::dto::sse::ReportEvent,
            crate::dto::sse::VoiceAlertEvent,
            crate::dto::sse::WelcomeEvent,
            crate::dto::sse::OnboardingEvent,
            crate::dto::sse::PresenceEvent,
            crate::dto::room::RoomStatus,
            crate::dao::models::Timeframe,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Notification stream consumed by the gateway"),
        (name = "gateway", description = "Voice, guild and member events from the platform"),
        (name = "commands", description = "User commands"),
        (name = "admin", description = "Guild configuration"),
    )
)]
/// OpenAPI description of every route.
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/healthcheck",
            "/sse/notifications",
            "/gateway/voice/state",
            "/commands/settings",
            "/admin/guilds/{guild_id}/channels",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
