//! User and admin commands.
//!
//! Every function returns the reply the platform shows to the caller; room
//! membership changes go through the participant tracker.

use tracing::info;

use crate::{
    dao::models::{GuildConfigEntity, GuildConfigUpdate, Timeframe},
    dto::{
        admin::{ChannelKind, GuildConfigResponse},
        commands::{
            ActionResponse, LeaderboardRequest, LeaderboardResponse, SettingsRequest,
            SettingsResponse, UserStatsResponse,
        },
        room::RoomStatus,
    },
    error::ServiceError,
    services::{participant_tracker, reporting, status_publisher},
    state::{
        SharedState,
        room::{ChannelId, GuildId, SettingsChange, UserId},
    },
};

const NO_STATS_MESSAGE: &str =
    "You haven't started studying yet! Join a voice channel to log your first session.";

fn on_off(value: bool) -> &'static str {
    if value { "ON" } else { "OFF" }
}

/// Mark the caller present for the current phase of their room.
pub async fn confirm(state: &SharedState, user_id: UserId) -> Result<ActionResponse, ServiceError> {
    participant_tracker::confirm_presence(state, user_id).await?;
    Ok(ActionResponse::new(
        "Presence confirmed. Good luck and stay productive.",
    ))
}

/// Remove the caller from their room as if they left the channel.
pub async fn stop(state: &SharedState, user_id: UserId) -> Result<ActionResponse, ServiceError> {
    participant_tracker::stop_timer(state, user_id).await?;
    Ok(ActionResponse::new("Timer stopped."))
}

/// Change the caller's room durations and toggles, then force a fresh status card.
pub async fn update_settings(
    state: &SharedState,
    request: SettingsRequest,
) -> Result<SettingsResponse, ServiceError> {
    let user_id = request.user_id;
    let key = state
        .rooms()
        .with_user_room_mut(user_id, |room| {
            let current = room.snapshot();
            room.apply_settings(SettingsChange {
                focus_secs: request.focus_minutes * 60,
                break_secs: request.break_minutes * 60,
                sound_enabled: request.sound_enabled.unwrap_or(current.sound_enabled),
                voice_alerts_enabled: request
                    .voice_enabled
                    .unwrap_or(current.voice_alerts_enabled),
            });
            room.key()
        })
        .ok_or(ServiceError::NotInSession)?;

    info!(
        guild_id = key.guild_id,
        channel_id = key.channel_id,
        user_id,
        focus_minutes = request.focus_minutes,
        break_minutes = request.break_minutes,
        "room settings updated"
    );
    status_publisher::publish_status(state, key, true).await;

    let snapshot = state.rooms().get(key).ok_or(ServiceError::NotInSession)?;
    let message = format!(
        "Settings Updated\n**{}m Focus** / **{}m Break**\nSound: **{}** | Voice: **{}**",
        snapshot.focus_secs / 60,
        snapshot.break_secs / 60,
        on_off(snapshot.sound_enabled),
        on_off(snapshot.voice_alerts_enabled),
    );
    Ok(SettingsResponse {
        message,
        status: RoomStatus::from(&snapshot),
    })
}

/// Snapshot of the caller's room.
pub fn status(state: &SharedState, user_id: UserId) -> Result<RoomStatus, ServiceError> {
    state
        .rooms()
        .find_by_user(user_id)
        .map(|snapshot| RoomStatus::from(&snapshot))
        .ok_or(ServiceError::NotInSession)
}

/// Caller's counters summed over every guild.
pub async fn user_stats(
    state: &SharedState,
    user_id: UserId,
) -> Result<UserStatsResponse, ServiceError> {
    let store = state.require_session_store().await?;
    let aggregate = store
        .user_aggregate(user_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(NO_STATS_MESSAGE.to_owned()))?;
    Ok(UserStatsResponse::new(user_id, aggregate))
}

/// Best users of a guild for one window.
pub async fn leaderboard(
    state: &SharedState,
    request: LeaderboardRequest,
) -> Result<LeaderboardResponse, ServiceError> {
    let timeframe = request.timeframe.unwrap_or(Timeframe::Weekly);
    let (report, delivered) =
        reporting::manual_report(state, request.guild_id, request.channel_id, timeframe).await?;
    Ok(LeaderboardResponse { delivered, report })
}

/// Stored configuration of a guild, defaults when never configured.
pub async fn guild_config(
    state: &SharedState,
    guild_id: GuildId,
) -> Result<GuildConfigResponse, ServiceError> {
    let store = state.require_session_store().await?;
    let config = store
        .group_config(guild_id)
        .await?
        .unwrap_or_else(|| GuildConfigEntity::with_defaults(guild_id));
    Ok(config.into())
}

/// Point one of the guild's configured channels somewhere else.
pub async fn set_channel(
    state: &SharedState,
    guild_id: GuildId,
    kind: ChannelKind,
    channel_id: ChannelId,
) -> Result<ActionResponse, ServiceError> {
    let (update, label) = match kind {
        ChannelKind::Study => (
            GuildConfigUpdate {
                study_channel_id: Some(channel_id),
                ..GuildConfigUpdate::default()
            },
            "Study channel",
        ),
        ChannelKind::Reports => (
            GuildConfigUpdate {
                report_channel_id: Some(channel_id),
                ..GuildConfigUpdate::default()
            },
            "Report channel",
        ),
        ChannelKind::Welcome => (
            GuildConfigUpdate {
                welcome_channel_id: Some(channel_id),
                welcome_enabled: Some(true),
                ..GuildConfigUpdate::default()
            },
            "Welcome channel",
        ),
    };

    let store = state.require_session_store().await?;
    store.update_group_config(guild_id, update).await?;
    info!(guild_id, channel_id, kind = ?kind, "guild channel updated");
    Ok(ActionResponse::new(format!(
        "✅ {label} updated to <#{channel_id}>"
    )))
}

/// Turn welcomes off and drop the custom text.
pub async fn reset_welcome(
    state: &SharedState,
    guild_id: GuildId,
) -> Result<ActionResponse, ServiceError> {
    let store = state.require_session_store().await?;
    store
        .update_group_config(
            guild_id,
            GuildConfigUpdate {
                welcome_message: Some(None),
                welcome_enabled: Some(false),
                ..GuildConfigUpdate::default()
            },
        )
        .await?;
    info!(guild_id, "welcome settings reset");
    Ok(ActionResponse::new("Welcome settings reset."))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::session_store::MemorySessionStore,
        state::{AppState, room::RoomKey},
    };

    async fn state_with_study_channel() -> SharedState {
        let state = AppState::new(AppConfig::default());
        state
            .install_session_store(Arc::new(MemorySessionStore::new()))
            .await;
        set_channel(&state, 1, ChannelKind::Study, 2).await.unwrap();
        state
    }

    #[tokio::test]
    async fn commands_outside_a_room_report_not_in_session() {
        let state = state_with_study_channel().await;
        assert!(matches!(status(&state, 9), Err(ServiceError::NotInSession)));
        assert!(matches!(
            confirm(&state, 9).await,
            Err(ServiceError::NotInSession)
        ));
        assert!(matches!(stop(&state, 9).await, Err(ServiceError::NotInSession)));
    }

    #[tokio::test]
    async fn settings_shorten_current_phase_and_keep_flags() {
        let state = state_with_study_channel().await;
        participant_tracker::on_join(&state, 7, 1, 2).await;

        let response = update_settings(
            &state,
            SettingsRequest {
                user_id: 7,
                focus_minutes: 10,
                break_minutes: 3,
                sound_enabled: Some(false),
                voice_enabled: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(response.status.duration_secs, 600);
        assert_eq!(response.status.remaining_secs, 600);
        assert_eq!(response.status.round_number, 1);
        assert_eq!(
            response.message,
            "Settings Updated\n**10m Focus** / **3m Break**\nSound: **OFF** | Voice: **ON**"
        );
    }

    #[tokio::test]
    async fn stats_for_unknown_user_is_not_found() {
        let state = state_with_study_channel().await;
        let err = user_stats(&state, 3).await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(message) if message == NO_STATS_MESSAGE));
    }

    #[tokio::test]
    async fn welcome_channel_enables_welcomes_and_reset_disables() {
        let state = state_with_study_channel().await;
        let reply = set_channel(&state, 1, ChannelKind::Welcome, 5).await.unwrap();
        assert_eq!(reply.message, "✅ Welcome channel updated to <#5>");

        let config = guild_config(&state, 1).await.unwrap();
        assert!(config.welcome_enabled);
        assert_eq!(config.study_channel_id, Some(2));

        reset_welcome(&state, 1).await.unwrap();
        let config = guild_config(&state, 1).await.unwrap();
        assert!(!config.welcome_enabled);
        assert_eq!(config.welcome_channel_id, Some(5));
    }

    #[tokio::test]
    async fn stop_destroys_a_single_user_room() {
        let state = state_with_study_channel().await;
        participant_tracker::on_join(&state, 7, 1, 2).await;
        assert!(state.rooms().contains(RoomKey::new(1, 2)));

        let reply = stop(&state, 7).await.unwrap();
        assert_eq!(reply.message, "Timer stopped.");
        assert!(!state.rooms().contains(RoomKey::new(1, 2)));
    }
}
