use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::{
        commands::{
            ActionResponse, LeaderboardRequest, LeaderboardResponse, SettingsRequest,
            SettingsResponse, UserCommand, UserStatsResponse,
        },
        room::RoomStatus,
    },
    error::AppError,
    services::command_service,
    state::{SharedState, room::UserId},
};

/// Slash-command backends. Replies carry the text shown to the caller.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/commands/confirm", post(confirm))
        .route("/commands/stop", post(stop))
        .route("/commands/settings", post(settings))
        .route("/commands/status/{user_id}", get(status))
        .route("/commands/stats/{user_id}", get(stats))
        .route("/commands/leaderboard", post(leaderboard))
}

/// Confirm presence for the current phase.
#[utoipa::path(
    post,
    path = "/commands/confirm",
    tag = "commands",
    request_body = UserCommand,
    responses(
        (status = 200, description = "Presence confirmed", body = ActionResponse),
        (status = 404, description = "Caller is not in a room")
    )
)]
/// Confirm the caller is still at their desk.
pub async fn confirm(
    State(state): State<SharedState>,
    Valid(Json(command)): Valid<Json<UserCommand>>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(command_service::confirm(&state, command.user_id).await?))
}

/// Leave the caller's room and close it when it becomes empty.
#[utoipa::path(
    post,
    path = "/commands/stop",
    tag = "commands",
    request_body = UserCommand,
    responses(
        (status = 200, description = "Caller left their room", body = ActionResponse),
        (status = 404, description = "Caller is not in a room")
    )
)]
/// Leave the caller's room as if they disconnected.
pub async fn stop(
    State(state): State<SharedState>,
    Valid(Json(command)): Valid<Json<UserCommand>>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(command_service::stop(&state, command.user_id).await?))
}

/// Change the focus, break or toggle settings of the caller's room.
#[utoipa::path(
    post,
    path = "/commands/settings",
    tag = "commands",
    request_body = SettingsRequest,
    responses(
        (status = 200, description = "Room settings applied", body = SettingsResponse),
        (status = 400, description = "Durations out of range"),
        (status = 404, description = "Caller is not in a room")
    )
)]
/// Change the durations and toggles of the caller's room.
pub async fn settings(
    State(state): State<SharedState>,
    Valid(Json(request)): Valid<Json<SettingsRequest>>,
) -> Result<Json<SettingsResponse>, AppError> {
    Ok(Json(command_service::update_settings(&state, request).await?))
}

/// Status of the room the caller is in.
#[utoipa::path(
    get,
    path = "/commands/status/{user_id}",
    tag = "commands",
    params(("user_id" = String, Path, description = "User snowflake")),
    responses(
        (status = 200, description = "Caller's room", body = RoomStatus),
        (status = 404, description = "Caller is not in a room")
    )
)]
pub async fn status(
    State(state): State<SharedState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<RoomStatus>, AppError> {
    Ok(Json(command_service::status(&state, user_id)?))
}

/// Caller's totals summed over every guild.
#[utoipa::path(
    get,
    path = "/commands/stats/{user_id}",
    tag = "commands",
    params(("user_id" = String, Path, description = "User snowflake")),
    responses(
        (status = 200, description = "Totals across every guild", body = UserStatsResponse),
        (status = 404, description = "No session recorded yet"),
        (status = 503, description = "Session store unavailable")
    )
)]
pub async fn stats(
    State(state): State<SharedState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<UserStatsResponse>, AppError> {
    Ok(Json(command_service::user_stats(&state, user_id).await?))
}

/// Top of the guild leaderboard for one window.
#[utoipa::path(
    post,
    path = "/commands/leaderboard",
    tag = "commands",
    request_body = LeaderboardRequest,
    responses(
        (status = 200, description = "Rendered leaderboard", body = LeaderboardResponse),
        (status = 503, description = "Session store unavailable")
    )
)]
/// On-demand leaderboard; never resets the window.
pub async fn leaderboard(
    State(state): State<SharedState>,
    Valid(Json(request)): Valid<Json<LeaderboardRequest>>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    Ok(Json(command_service::leaderboard(&state, request).await?))
}
