use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, PickFirst, serde_as};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dto::validation::validate_snowflake,
    state::room::{ChannelId, GuildId, UserId},
};

/// A user entered or left a voice channel.
#[serde_as]
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct VoiceMembershipEvent {
    /// Member whose voice state changed.
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    #[schema(value_type = String)]
    #[validate(custom(function = "validate_snowflake"))]
    pub user_id: UserId,
    /// Guild of the channel.
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    #[schema(value_type = String)]
    #[validate(custom(function = "validate_snowflake"))]
    pub guild_id: GuildId,
    /// Voice channel entered or left.
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    #[schema(value_type = String)]
    #[validate(custom(function = "validate_snowflake"))]
    pub channel_id: ChannelId,
}

/// Raw voice state transition as observed by the gateway.
///
/// A missing `old_channel_id` is a connect, a missing `new_channel_id` a
/// disconnect, and two different channels a move.
#[serde_as]
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct VoiceStateUpdate {
    /// Member whose voice state changed.
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    #[schema(value_type = String)]
    #[validate(custom(function = "validate_snowflake"))]
    pub user_id: UserId,
    /// Guild of both channels.
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    #[schema(value_type = String)]
    #[validate(custom(function = "validate_snowflake"))]
    pub guild_id: GuildId,
    /// Channel before the change.
    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    #[schema(value_type = Option<String>)]
    pub old_channel_id: Option<ChannelId>,
    /// Channel after the change.
    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    #[schema(value_type = Option<String>)]
    pub new_channel_id: Option<ChannelId>,
    /// Bots never join rooms.
    #[serde(default)]
    pub is_bot: bool,
}

/// Text channel advertised by the gateway for report and onboarding fallbacks.
#[serde_as]
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TextChannelInput {
    /// Channel id.
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    #[schema(value_type = String)]
    pub id: ChannelId,
    /// Channel name.
    pub name: String,
}

/// Guild became available to the service, either at startup or because it was just added.
#[serde_as]
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct GuildAvailableRequest {
    /// Guild id.
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    #[schema(value_type = String)]
    #[validate(custom(function = "validate_snowflake"))]
    pub guild_id: GuildId,
    /// Guild name.
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    /// Channel the platform posts system messages in.
    #[serde_as(as = "Option<PickFirst<(DisplayFromStr, _)>>")]
    #[schema(value_type = Option<String>)]
    pub system_channel_id: Option<ChannelId>,
    /// Text channels in display order.
    #[serde(default)]
    pub text_channels: Vec<TextChannelInput>,
    /// The service was just invited; triggers the onboarding message.
    #[serde(default)]
    pub newly_joined: bool,
}

/// Member joined a guild.
#[serde_as]
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct MemberJoinedRequest {
    /// Guild joined.
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    #[schema(value_type = String)]
    #[validate(custom(function = "validate_snowflake"))]
    pub guild_id: GuildId,
    /// New member.
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    #[schema(value_type = String)]
    #[validate(custom(function = "validate_snowflake"))]
    pub user_id: UserId,
    /// Name rendered in the welcome card.
    #[validate(length(min = 1, max = 100))]
    pub display_name: String,
    /// Guild size after the join, when known.
    #[serde(default)]
    pub member_count: Option<u64>,
    /// Bots are not welcomed.
    #[serde(default)]
    pub is_bot: bool,
}

/// What a membership event did to the room population.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MembershipOutcome {
    /// Not the study channel of the guild, or a bot.
    Ignored,
    /// First participant; the room was created.
    RoomCreated,
    /// Added to an existing room.
    Joined,
    /// Already a participant; nothing changed.
    AlreadyPresent,
    /// Removed; the room lives on.
    Left,
    /// Last participant left; the room was closed.
    RoomRemoved,
    /// Leave for a user or room that is not tracked.
    NotTracked,
}

/// Result of one membership event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct MembershipResponse {
    /// One outcome per room touched, leave before join for a move.
    pub outcomes: Vec<MembershipOutcome>,
}

impl MembershipResponse {
    /// Response for an event that touched one room.
    pub fn single(outcome: MembershipOutcome) -> Self {
        Self {
            outcomes: vec![outcome],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn ids_accept_strings_and_numbers() {
        let event: VoiceMembershipEvent = serde_json::from_str(
            r#"{ "user_id": "80351110224678912", "guild_id": 2, "channel_id": "3" }"#,
        )
        .unwrap();
        assert_eq!(event.user_id, 80351110224678912);
        assert_eq!(event.guild_id, 2);
        assert_eq!(event.channel_id, 3);
        assert!(event.validate().is_ok());
    }

    #[test]
    fn zero_snowflake_fails_validation() {
        let event: VoiceMembershipEvent =
            serde_json::from_str(r#"{ "user_id": "0", "guild_id": "2", "channel_id": "3" }"#)
                .unwrap();
        assert!(event.validate().is_err());
    }

    #[test]
    fn voice_state_channels_are_optional() {
        let update: VoiceStateUpdate =
            serde_json::from_str(r#"{ "user_id": "1", "guild_id": "2", "new_channel_id": "3" }"#)
                .unwrap();
        assert_eq!(update.old_channel_id, None);
        assert_eq!(update.new_channel_id, Some(3));
        assert!(!update.is_bot);
    }
}
