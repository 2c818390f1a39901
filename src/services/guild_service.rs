//! Guild lifecycle: directory registration, onboarding and member welcomes.

use tracing::{debug, info, warn};

use crate::{
    dao::models::GuildConfigEntity,
    dto::{
        gateway::{GuildAvailableRequest, MemberJoinedRequest},
        sse::{OnboardingEvent, WelcomeEvent},
    },
    error::ServiceError,
    services::{notifier::log_outcome, status_publisher},
    state::{
        SharedState,
        guild::{GuildInfo, TextChannel},
        room::{ChannelId, GuildId, UserId},
    },
};

const ONBOARDING_CHANNEL_HINTS: &[&str] = &["general", "bot"];
const ONBOARDING_TITLE: &str = "Hello! I’m Pomora.";
const ONBOARDING_DESCRIPTION: &str =
    "Thank you for inviting me! I’m here to turn your server into a productivity powerhouse.";
const ONBOARDING_TIPS: [&str; 3] = [
    "Quick Start: use `/config` to pick the study voice channel and where reports are posted.",
    "Welcomes: set a welcome channel to greet every new member with a card.",
    "Analytics: I track study time automatically when members join the study voice channel.",
];

/// What registering a guild did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuildRegistration {
    /// True when the guild was not served before.
    pub newly_known: bool,
    /// `Some(delivered)` when an onboarding message was attempted.
    pub onboarding: Option<bool>,
}

/// Record a guild the gateway serves, greeting it when the service was just added.
pub async fn register_guild(state: &SharedState, request: GuildAvailableRequest) -> GuildRegistration {
    let info = GuildInfo {
        guild_id: request.guild_id,
        name: request.name,
        system_channel_id: request.system_channel_id,
        text_channels: request
            .text_channels
            .into_iter()
            .map(|channel| TextChannel {
                id: channel.id,
                name: channel.name,
            })
            .collect(),
    };

    let onboarding = if request.newly_joined {
        Some(send_onboarding(state, &info).await)
    } else {
        None
    };

    let guild_id = info.guild_id;
    let newly_known = state.guilds().upsert(info);
    info!(guild_id, newly_known, newly_joined = request.newly_joined, "guild registered");
    GuildRegistration {
        newly_known,
        onboarding,
    }
}

/// Forget a guild the service left and close its live rooms.
///
/// No leave events arrive for a guild the service is no longer part of, so its
/// rooms would otherwise tick on forever.
pub async fn forget_guild(state: &SharedState, guild_id: GuildId) -> bool {
    let _membership = state.lock_membership(guild_id).await;
    let removed = state.guilds().remove(guild_id);
    for (key, status_message_ref) in state.rooms().remove_guild(guild_id) {
        info!(guild_id, channel_id = key.channel_id, "room closed with its guild");
        status_publisher::clear_status(state, key, status_message_ref).await;
    }
    if removed {
        info!(guild_id, "guild forgotten");
    }
    removed
}

async fn send_onboarding(state: &SharedState, info: &GuildInfo) -> bool {
    let Some(channel_id) = info
        .system_channel_id
        .or_else(|| info.channel_named_like(ONBOARDING_CHANNEL_HINTS))
    else {
        debug!(guild_id = info.guild_id, "no channel for onboarding message");
        return false;
    };

    let result = state
        .notifier()
        .send_onboarding(OnboardingEvent {
            guild_id: info.guild_id,
            channel_id,
            title: ONBOARDING_TITLE.to_owned(),
            description: ONBOARDING_DESCRIPTION.to_owned(),
            tips: ONBOARDING_TIPS.iter().map(|tip| (*tip).to_owned()).collect(),
        })
        .await;
    log_outcome(&result, "onboarding")
}

fn welcome_card(
    config: &GuildConfigEntity,
    channel_id: ChannelId,
    guild_name: &str,
    user_id: UserId,
    display_name: &str,
    member_count: Option<u64>,
    test: bool,
) -> WelcomeEvent {
    WelcomeEvent {
        guild_id: config.guild_id,
        channel_id,
        user_id,
        title: format!("Welcome, {display_name}!"),
        description: format!("Welcome to **{guild_name}**! We are glad to have you here."),
        member_count,
        custom_message: config.welcome_message.clone(),
        test,
    }
}

fn guild_name(state: &SharedState, guild_id: GuildId) -> String {
    state
        .guilds()
        .get(guild_id)
        .map(|info| info.name)
        .unwrap_or_else(|| "the server".to_owned())
}

/// Greet a member who joined a guild. Returns whether a welcome went out.
pub async fn welcome_member(state: &SharedState, request: MemberJoinedRequest) -> bool {
    if request.is_bot {
        return false;
    }
    let guild_id = request.guild_id;

    let store = match state.require_session_store().await {
        Ok(store) => store,
        Err(err) => {
            warn!(guild_id, user_id = request.user_id, error = %err, "cannot load welcome settings");
            return false;
        }
    };
    let config = match store.group_config(guild_id).await {
        Ok(Some(config)) => config,
        Ok(None) => return false,
        Err(err) => {
            warn!(guild_id, user_id = request.user_id, error = %err, "failed to load welcome settings");
            return false;
        }
    };
    let Some(channel_id) = config.welcome_channel_id.filter(|_| config.welcome_enabled) else {
        debug!(guild_id, "welcome disabled");
        return false;
    };

    let event = welcome_card(
        &config,
        channel_id,
        &guild_name(state, guild_id),
        request.user_id,
        &request.display_name,
        request.member_count,
        false,
    );
    let result = state.notifier().send_welcome(event).await;
    log_outcome(&result, "welcome")
}

/// Send a sample welcome card addressed to the requesting admin.
pub async fn test_welcome(
    state: &SharedState,
    guild_id: GuildId,
    user_id: UserId,
    display_name: &str,
) -> Result<bool, ServiceError> {
    let store = state.require_session_store().await?;
    let config = store
        .group_config(guild_id)
        .await?
        .unwrap_or_else(|| GuildConfigEntity::with_defaults(guild_id));
    let channel_id = config.welcome_channel_id.ok_or_else(|| {
        ServiceError::InvalidInput("set a welcome channel before testing the welcome message".into())
    })?;

    let event = welcome_card(
        &config,
        channel_id,
        &guild_name(state, guild_id),
        user_id,
        display_name,
        None,
        true,
    );
    let result = state.notifier().send_welcome(event).await;
    Ok(log_outcome(&result, "welcome"))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{models::GuildConfigUpdate, session_store::MemorySessionStore},
        dto::gateway::TextChannelInput,
        services::participant_tracker,
        state::{AppState, room::RoomKey},
    };

    async fn state() -> SharedState {
        let state = AppState::new(AppConfig::default());
        state
            .install_session_store(Arc::new(MemorySessionStore::new()))
            .await;
        state
    }

    fn guild_request(newly_joined: bool) -> GuildAvailableRequest {
        GuildAvailableRequest {
            guild_id: 1,
            name: "Study Hall".into(),
            system_channel_id: None,
            text_channels: vec![
                TextChannelInput {
                    id: 10,
                    name: "random".into(),
                },
                TextChannelInput {
                    id: 11,
                    name: "General".into(),
                },
            ],
            newly_joined,
        }
    }

    #[tokio::test]
    async fn onboarding_goes_to_general_channel() {
        let state = state().await;
        let mut receiver = state.notifications().subscribe();

        let registration = register_guild(&state, guild_request(true)).await;
        assert_eq!(
            registration,
            GuildRegistration {
                newly_known: true,
                onboarding: Some(true),
            }
        );

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.event.as_deref(), Some("onboarding"));
        assert!(event.data.contains("\"channel_id\":\"11\""));
        assert_eq!(state.guilds().len(), 1);
    }

    #[tokio::test]
    async fn reconnect_does_not_onboard_again() {
        let state = state().await;
        register_guild(&state, guild_request(false)).await;
        let registration = register_guild(&state, guild_request(false)).await;
        assert!(!registration.newly_known);
        assert_eq!(registration.onboarding, None);
        assert!(forget_guild(&state, 1).await);
        assert!(!forget_guild(&state, 1).await);
    }

    #[tokio::test]
    async fn forgetting_a_guild_closes_its_rooms() {
        let state = state().await;
        register_guild(&state, guild_request(false)).await;
        let store = state.session_store().await.unwrap();
        store
            .update_group_config(
                1,
                GuildConfigUpdate {
                    study_channel_id: Some(20),
                    ..GuildConfigUpdate::default()
                },
            )
            .await
            .unwrap();
        participant_tracker::on_join(&state, 7, 1, 20).await;
        assert!(state.rooms().contains(RoomKey::new(1, 20)));

        assert!(forget_guild(&state, 1).await);
        assert!(!state.rooms().contains(RoomKey::new(1, 20)));
        assert!(state.rooms().find_by_user(7).is_none());
        assert_eq!(store.active_status_message(20).await.unwrap(), None);
    }

    #[tokio::test]
    async fn welcome_requires_enabled_channel() {
        let state = state().await;
        let member = MemberJoinedRequest {
            guild_id: 1,
            user_id: 2,
            display_name: "Ada".into(),
            member_count: Some(12),
            is_bot: false,
        };
        let _receiver = state.notifications().subscribe();
        assert!(!welcome_member(&state, member.clone()).await);

        let store = state.session_store().await.unwrap();
        store
            .update_group_config(
                1,
                GuildConfigUpdate {
                    welcome_channel_id: Some(20),
                    welcome_enabled: Some(true),
                    ..GuildConfigUpdate::default()
                },
            )
            .await
            .unwrap();
        assert!(welcome_member(&state, member).await);
    }

    #[tokio::test]
    async fn test_welcome_needs_a_channel() {
        let state = state().await;
        let err = test_welcome(&state, 1, 2, "Ada").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }
}
