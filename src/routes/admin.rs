use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post, put},
};
use axum_valid::Valid;

use crate::{
    dto::{
        admin::{GuildConfigResponse, SetChannelRequest, WelcomeTestRequest},
        commands::ActionResponse,
    },
    error::AppError,
    services::{command_service, guild_service},
    state::{SharedState, room::GuildId},
};

/// Guild configuration endpoints backing the admin commands.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/admin/guilds/{guild_id}/config", get(get_config))
        .route("/admin/guilds/{guild_id}/channels", put(set_channel))
        .route("/admin/guilds/{guild_id}/welcome/test", post(test_welcome))
        .route("/admin/guilds/{guild_id}/welcome/reset", post(reset_welcome))
}

/// Stored configuration of a guild, defaults when never configured.
#[utoipa::path(
    get,
    path = "/admin/guilds/{guild_id}/config",
    tag = "admin",
    params(("guild_id" = String, Path, description = "Guild snowflake")),
    responses(
        (status = 200, description = "Guild configuration", body = GuildConfigResponse),
        (status = 503, description = "Session store unavailable")
    )
)]
pub async fn get_config(
    State(state): State<SharedState>,
    Path(guild_id): Path<GuildId>,
) -> Result<Json<GuildConfigResponse>, AppError> {
    Ok(Json(command_service::guild_config(&state, guild_id).await?))
}

/// Set the study, report or welcome channel.
#[utoipa::path(
    put,
    path = "/admin/guilds/{guild_id}/channels",
    tag = "admin",
    params(("guild_id" = String, Path, description = "Guild snowflake")),
    request_body = SetChannelRequest,
    responses(
        (status = 200, description = "Channel updated", body = ActionResponse),
        (status = 503, description = "Session store unavailable")
    )
)]
pub async fn set_channel(
    State(state): State<SharedState>,
    Path(guild_id): Path<GuildId>,
    Valid(Json(request)): Valid<Json<SetChannelRequest>>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(
        command_service::set_channel(&state, guild_id, request.kind, request.channel_id).await?,
    ))
}

/// Send a sample welcome card to the configured welcome channel.
#[utoipa::path(
    post,
    path = "/admin/guilds/{guild_id}/welcome/test",
    tag = "admin",
    params(("guild_id" = String, Path, description = "Guild snowflake")),
    request_body = WelcomeTestRequest,
    responses(
        (status = 200, description = "Test welcome sent", body = ActionResponse),
        (status = 400, description = "No welcome channel configured")
    )
)]
pub async fn test_welcome(
    State(state): State<SharedState>,
    Path(guild_id): Path<GuildId>,
    Valid(Json(request)): Valid<Json<WelcomeTestRequest>>,
) -> Result<Json<ActionResponse>, AppError> {
    let delivered =
        guild_service::test_welcome(&state, guild_id, request.user_id, &request.display_name)
            .await?;
    let message = if delivered {
        "Sent a test welcome message!"
    } else {
        "The test welcome could not be delivered; is the gateway connected?"
    };
    Ok(Json(ActionResponse::new(message)))
}

/// Disable welcomes and clear the custom welcome text.
#[utoipa::path(
    post,
    path = "/admin/guilds/{guild_id}/welcome/reset",
    tag = "admin",
    params(("guild_id" = String, Path, description = "Guild snowflake")),
    responses(
        (status = 200, description = "Welcome settings reset", body = ActionResponse),
        (status = 503, description = "Session store unavailable")
    )
)]
pub async fn reset_welcome(
    State(state): State<SharedState>,
    Path(guild_id): Path<GuildId>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(command_service::reset_welcome(&state, guild_id).await?))
}
