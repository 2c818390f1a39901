//! Turns raw voice membership into room population changes.

use tracing::{debug, info, warn};

use crate::{
    dto::gateway::{MembershipOutcome, VoiceStateUpdate},
    error::ServiceError,
    services::status_publisher,
    state::{
        SharedState,
        registry::{JoinResult, LeaveResult},
        room::{ChannelId, GuildId, RoomKey, RoomSnapshot, UserId},
    },
};

/// Whether `channel_id` is the study channel configured for `guild_id`.
///
/// A channel that already hosts a live room keeps qualifying, so a config
/// change never strands its participants.
async fn is_study_channel(state: &SharedState, key: RoomKey) -> bool {
    if state.rooms().contains(key) {
        return true;
    }

    let store = match state.require_session_store().await {
        Ok(store) => store,
        Err(err) => {
            warn!(
                guild_id = key.guild_id,
                channel_id = key.channel_id,
                error = %err,
                "cannot resolve study channel; ignoring join"
            );
            return false;
        }
    };

    match store.group_config(key.guild_id).await {
        Ok(config) => config
            .and_then(|config| config.study_channel_id)
            .is_some_and(|study_channel| study_channel == key.channel_id),
        Err(err) => {
            warn!(
                guild_id = key.guild_id,
                channel_id = key.channel_id,
                error = %err,
                "failed to load guild config; ignoring join"
            );
            false
        }
    }
}

/// A user entered a voice channel.
pub async fn on_join(
    state: &SharedState,
    user_id: UserId,
    guild_id: GuildId,
    channel_id: ChannelId,
) -> Vec<MembershipOutcome> {
    let key = RoomKey::new(guild_id, channel_id);
    let _membership = state.lock_membership(guild_id).await;
    if !is_study_channel(state, key).await {
        debug!(guild_id, channel_id, user_id, "join outside the study channel ignored");
        return vec![MembershipOutcome::Ignored];
    }

    let mut outcomes = Vec::with_capacity(2);

    // A user occupies one voice channel at a time; a missed leave must not keep them in two rooms.
    if let Some(previous) = state.rooms().room_of(user_id).filter(|previous| *previous != key) {
        debug!(
            user_id,
            guild_id = previous.guild_id,
            channel_id = previous.channel_id,
            "dropping user from stale room before join"
        );
        outcomes.push(leave_room(state, user_id, previous).await);
    }

    let outcome = match state.rooms().join(key, user_id, state.room_defaults()) {
        JoinResult::Created => {
            info!(guild_id, channel_id, user_id, "room created");
            status_publisher::publish_status(state, key, true).await;
            MembershipOutcome::RoomCreated
        }
        JoinResult::Joined => {
            info!(guild_id, channel_id, user_id, "user joined room");
            status_publisher::publish_status(state, key, false).await;
            MembershipOutcome::Joined
        }
        JoinResult::AlreadyPresent => {
            debug!(guild_id, channel_id, user_id, "duplicate join ignored");
            MembershipOutcome::AlreadyPresent
        }
    };
    outcomes.push(outcome);
    outcomes
}

/// A user left a voice channel. Resolved by channel, never by the user index.
pub async fn on_leave(
    state: &SharedState,
    user_id: UserId,
    guild_id: GuildId,
    channel_id: ChannelId,
) -> MembershipOutcome {
    let _membership = state.lock_membership(guild_id).await;
    leave_room(state, user_id, RoomKey::new(guild_id, channel_id)).await
}

async fn leave_room(state: &SharedState, user_id: UserId, key: RoomKey) -> MembershipOutcome {
    match state.rooms().leave(key, user_id) {
        LeaveResult::UnknownRoom | LeaveResult::NotParticipant => {
            debug!(
                guild_id = key.guild_id,
                channel_id = key.channel_id,
                user_id,
                "leave for untracked user ignored"
            );
            MembershipOutcome::NotTracked
        }
        LeaveResult::Left => {
            info!(
                guild_id = key.guild_id,
                channel_id = key.channel_id,
                user_id,
                "user left room"
            );
            status_publisher::publish_status(state, key, false).await;
            MembershipOutcome::Left
        }
        LeaveResult::RoomRemoved { status_message_ref } => {
            info!(
                guild_id = key.guild_id,
                channel_id = key.channel_id,
                user_id,
                "last participant left; room destroyed"
            );
            status_publisher::clear_status(state, key, status_message_ref).await;
            MembershipOutcome::RoomRemoved
        }
    }
}

/// Translate a raw voice state change into a leave and/or a join.
pub async fn on_voice_state(state: &SharedState, update: VoiceStateUpdate) -> Vec<MembershipOutcome> {
    if update.is_bot {
        return vec![MembershipOutcome::Ignored];
    }
    if update.old_channel_id == update.new_channel_id {
        // Mute, deafen or stream toggles inside the same channel.
        return vec![MembershipOutcome::Ignored];
    }

    let mut outcomes = Vec::with_capacity(2);
    if let Some(old_channel) = update.old_channel_id {
        outcomes.push(on_leave(state, update.user_id, update.guild_id, old_channel).await);
    }
    if let Some(new_channel) = update.new_channel_id {
        outcomes.extend(on_join(state, update.user_id, update.guild_id, new_channel).await);
    }
    outcomes
}

/// Mark the user as present in their current room.
pub async fn confirm_presence(
    state: &SharedState,
    user_id: UserId,
) -> Result<RoomSnapshot, ServiceError> {
    let key = state
        .rooms()
        .with_user_room_mut(user_id, |room| {
            room.confirm(user_id);
            room.key()
        })
        .ok_or(ServiceError::NotInSession)?;

    status_publisher::publish_status(state, key, false).await;
    state.rooms().get(key).ok_or(ServiceError::NotInSession)
}

/// Stop the timer for the caller: they leave their room like a voice disconnect.
pub async fn stop_timer(state: &SharedState, user_id: UserId) -> Result<MembershipOutcome, ServiceError> {
    let key = state
        .rooms()
        .room_of(user_id)
        .ok_or(ServiceError::NotInSession)?;
    let _membership = state.lock_membership(key.guild_id).await;
    match leave_room(state, user_id, key).await {
        MembershipOutcome::NotTracked => Err(ServiceError::NotInSession),
        outcome => Ok(outcome),
    }
}
