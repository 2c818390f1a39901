//! Room status cards: decides between editing the current card and sending a
//! new one, and keeps the per-channel message pointer in the store.

use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    dto::{
        room::RoomStatus,
        sse::{MessageMode, PresenceEvent, StatusClosedEvent, StatusRefreshEvent},
    },
    services::notifier::log_outcome,
    state::{SharedState, room::RoomKey},
};

/// What a status refresh ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusOutcome {
    /// Card handed over for `message_id`, edited or posted anew.
    Sent { message_id: String, mode: MessageMode },
    /// The card was rendered but the sink could not deliver it.
    NotDelivered,
    /// The room no longer exists.
    RoomGone,
}

/// Render the room's status card, editing the current message unless `force_new` is set.
pub async fn publish_status(state: &SharedState, key: RoomKey, force_new: bool) -> StatusOutcome {
    let Some(known_ref) = state
        .rooms()
        .get(key)
        .map(|snapshot| snapshot.status_message_ref)
    else {
        return StatusOutcome::RoomGone;
    };

    let store = state.require_session_store().await.ok();
    let existing = match (&store, force_new) {
        (_, true) => None,
        (Some(store), false) => match store.active_status_message(key.channel_id).await {
            Ok(pointer) => pointer.or(known_ref),
            Err(err) => {
                warn!(
                    guild_id = key.guild_id,
                    channel_id = key.channel_id,
                    error = %err,
                    "failed to read status message pointer"
                );
                known_ref
            }
        },
        (None, false) => known_ref,
    };

    let (message_id, mode) = match existing {
        Some(message_id) => (message_id, MessageMode::Edit),
        None => (Uuid::new_v4().simple().to_string(), MessageMode::New),
    };

    if let (Some(store), MessageMode::New) = (&store, mode) {
        if let Err(err) = store
            .set_active_status_message(key.channel_id, key.guild_id, message_id.clone())
            .await
        {
            warn!(
                guild_id = key.guild_id,
                channel_id = key.channel_id,
                error = %err,
                "failed to store status message pointer"
            );
        }
    }

    // Read again: the room may have changed or closed while the store was busy.
    let Some(snapshot) = state.rooms().with_room_mut(key, |room| {
        room.set_status_message_ref(Some(message_id.clone()));
        room.snapshot()
    }) else {
        debug!(
            guild_id = key.guild_id,
            channel_id = key.channel_id,
            "room closed before its status card was sent"
        );
        return StatusOutcome::RoomGone;
    };

    let result = state
        .notifier()
        .refresh_status(StatusRefreshEvent {
            message_id: message_id.clone(),
            mode,
            status: RoomStatus::from(&snapshot),
        })
        .await;

    if log_outcome(&result, "status.refresh") {
        StatusOutcome::Sent { message_id, mode }
    } else {
        StatusOutcome::NotDelivered
    }
}

/// Retire the status card of a destroyed room and forget its pointer.
pub async fn clear_status(state: &SharedState, key: RoomKey, last_ref: Option<String>) -> bool {
    let mut message_id = last_ref;
    if let Ok(store) = state.require_session_store().await {
        if message_id.is_none() {
            message_id = store
                .active_status_message(key.channel_id)
                .await
                .ok()
                .flatten();
        }
        if let Err(err) = store.delete_active_status_message(key.channel_id).await {
            warn!(
                guild_id = key.guild_id,
                channel_id = key.channel_id,
                error = %err,
                "failed to delete status message pointer"
            );
        }
    }

    let result = state
        .notifier()
        .clear_status(StatusClosedEvent {
            guild_id: key.guild_id,
            channel_id: key.channel_id,
            message_id,
        })
        .await;
    log_outcome(&result, "status.closed")
}

/// Publish the global "N People Working" line.
pub async fn publish_presence(state: &SharedState) -> bool {
    let participants = state.rooms().total_participants();
    let result = state
        .notifier()
        .update_presence(PresenceEvent::new(participants))
        .await;
    log_outcome(&result, "presence")
}
