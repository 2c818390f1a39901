use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, PickFirst, serde_as};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dao::models::GuildConfigEntity,
    dto::{format_system_time, validation::validate_snowflake},
    state::room::{ChannelId, GuildId, UserId},
};

/// Which configured channel an admin command sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Voice channel whose members get a shared timer.
    Study,
    /// Text channel receiving scheduled leaderboards.
    Reports,
    /// Text channel receiving welcome cards. Also enables welcomes.
    Welcome,
}

/// Admin points one configured channel somewhere else.
#[serde_as]
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct SetChannelRequest {
    /// Which channel to set.
    pub kind: ChannelKind,
    /// New channel.
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    #[schema(value_type = String)]
    #[validate(custom(function = "validate_snowflake"))]
    pub channel_id: ChannelId,
}

/// Admin asks for a sample welcome card addressed to themselves.
#[serde_as]
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct WelcomeTestRequest {
    /// Admin receiving the card.
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    #[schema(value_type = String)]
    #[validate(custom(function = "validate_snowflake"))]
    pub user_id: UserId,
    /// Name rendered in the card.
    #[validate(length(min = 1, max = 100))]
    pub display_name: String,
}

/// Stored configuration of a guild.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct GuildConfigResponse {
    /// Configured guild.
    #[serde_as(as = "DisplayFromStr")]
    #[schema(value_type = String)]
    pub guild_id: GuildId,
    /// Voice channel hosting rooms, any when unset.
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[schema(value_type = Option<String>)]
    pub study_channel_id: Option<ChannelId>,
    /// Channel receiving reports.
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[schema(value_type = Option<String>)]
    pub report_channel_id: Option<ChannelId>,
    /// Channel receiving welcome cards.
    #[serde_as(as = "Option<DisplayFromStr>")]
    #[schema(value_type = Option<String>)]
    pub welcome_channel_id: Option<ChannelId>,
    /// Custom welcome text.
    pub welcome_message: Option<String>,
    /// Whether welcomes are sent.
    pub welcome_enabled: bool,
    /// RFC 3339 timestamp of the last change.
    pub updated_at: String,
}

impl From<GuildConfigEntity> for GuildConfigResponse {
    fn from(entity: GuildConfigEntity) -> Self {
        Self {
            guild_id: entity.guild_id,
            study_channel_id: entity.study_channel_id,
            report_channel_id: entity.report_channel_id,
            welcome_channel_id: entity.welcome_channel_id,
            welcome_message: entity.welcome_message,
            welcome_enabled: entity.welcome_enabled,
            updated_at: format_system_time(entity.updated_at),
        }
    }
}
