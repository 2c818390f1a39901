use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, post},
};
use axum_valid::Valid;

use crate::{
    dto::gateway::{
        GuildAvailableRequest, MemberJoinedRequest, MembershipResponse, VoiceMembershipEvent,
        VoiceStateUpdate,
    },
    services::{guild_service, participant_tracker},
    state::{SharedState, room::GuildId},
};

/// Endpoints fed by the platform gateway with raw membership events.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/gateway/voice/join", post(voice_join))
        .route("/gateway/voice/leave", post(voice_leave))
        .route("/gateway/voice/state", post(voice_state))
        .route("/gateway/guilds", post(guild_available))
        .route("/gateway/guilds/{guild_id}", delete(guild_removed))
        .route("/gateway/members", post(member_joined))
}

/// A user entered a voice channel.
#[utoipa::path(
    post,
    path = "/gateway/voice/join",
    tag = "gateway",
    request_body = VoiceMembershipEvent,
    responses((status = 200, description = "Membership processed", body = MembershipResponse))
)]
pub async fn voice_join(
    State(state): State<SharedState>,
    Valid(Json(event)): Valid<Json<VoiceMembershipEvent>>,
) -> Json<MembershipResponse> {
    let outcomes =
        participant_tracker::on_join(&state, event.user_id, event.guild_id, event.channel_id).await;
    Json(MembershipResponse { outcomes })
}

/// A user left a voice channel.
#[utoipa::path(
    post,
    path = "/gateway/voice/leave",
    tag = "gateway",
    request_body = VoiceMembershipEvent,
    responses((status = 200, description = "Membership processed", body = MembershipResponse))
)]
pub async fn voice_leave(
    State(state): State<SharedState>,
    Valid(Json(event)): Valid<Json<VoiceMembershipEvent>>,
) -> Json<MembershipResponse> {
    let outcome =
        participant_tracker::on_leave(&state, event.user_id, event.guild_id, event.channel_id)
            .await;
    Json(MembershipResponse::single(outcome))
}

/// Raw voice state change; moves become a leave followed by a join.
#[utoipa::path(
    post,
    path = "/gateway/voice/state",
    tag = "gateway",
    request_body = VoiceStateUpdate,
    responses((status = 200, description = "Membership processed", body = MembershipResponse))
)]
pub async fn voice_state(
    State(state): State<SharedState>,
    Valid(Json(update)): Valid<Json<VoiceStateUpdate>>,
) -> Json<MembershipResponse> {
    let outcomes = participant_tracker::on_voice_state(&state, update).await;
    Json(MembershipResponse { outcomes })
}

/// A guild became available; onboarding is sent when the service was just added.
#[utoipa::path(
    post,
    path = "/gateway/guilds",
    tag = "gateway",
    request_body = GuildAvailableRequest,
    responses(
        (status = 201, description = "Guild registered for the first time"),
        (status = 204, description = "Known guild refreshed")
    )
)]
pub async fn guild_available(
    State(state): State<SharedState>,
    Valid(Json(request)): Valid<Json<GuildAvailableRequest>>,
) -> StatusCode {
    let registration = guild_service::register_guild(&state, request).await;
    if registration.newly_known {
        StatusCode::CREATED
    } else {
        StatusCode::NO_CONTENT
    }
}

/// The service was removed from a guild.
#[utoipa::path(
    delete,
    path = "/gateway/guilds/{guild_id}",
    tag = "gateway",
    params(("guild_id" = String, Path, description = "Guild snowflake")),
    responses(
        (status = 204, description = "Guild forgotten"),
        (status = 404, description = "Guild was not known")
    )
)]
pub async fn guild_removed(
    State(state): State<SharedState>,
    Path(guild_id): Path<GuildId>,
) -> StatusCode {
    if guild_service::forget_guild(&state, guild_id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

/// A member joined a guild.
#[utoipa::path(
    post,
    path = "/gateway/members",
    tag = "gateway",
    request_body = MemberJoinedRequest,
    responses(
        (status = 202, description = "Welcome sent"),
        (status = 204, description = "Nothing to send")
    )
)]
pub async fn member_joined(
    State(state): State<SharedState>,
    Valid(Json(request)): Valid<Json<MemberJoinedRequest>>,
) -> StatusCode {
    if guild_service::welcome_member(&state, request).await {
        StatusCode::ACCEPTED
    } else {
        StatusCode::NO_CONTENT
    }
}
