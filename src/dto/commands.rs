use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, PickFirst, serde_as};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dao::models::{Timeframe, UserAggregate},
    dto::{format_minutes, room::RoomStatus, sse::ReportEvent, validation::validate_snowflake},
    state::room::{ChannelId, GuildId, UserId},
};

/// Command issued by a single user about their own room.
#[serde_as]
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct UserCommand {
    /// Caller.
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    #[schema(value_type = String)]
    #[validate(custom(function = "validate_snowflake"))]
    pub user_id: UserId,
}

/// New timer settings for the caller's room.
#[serde_as]
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct SettingsRequest {
    /// Caller.
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    #[schema(value_type = String)]
    #[validate(custom(function = "validate_snowflake"))]
    pub user_id: UserId,
    /// New focus length.
    #[validate(range(min = 1, max = 99, message = "focus minutes must be between 1 and 99"))]
    pub focus_minutes: u32,
    /// New short break length.
    #[validate(range(min = 1, max = 99, message = "break minutes must be between 1 and 99"))]
    pub break_minutes: u32,
    /// Keeps the current value when omitted.
    #[serde(default)]
    pub sound_enabled: Option<bool>,
    /// Keeps the current value when omitted.
    #[serde(default)]
    pub voice_enabled: Option<bool>,
}

/// On-demand leaderboard for a guild, posted in the channel the request came from.
#[serde_as]
#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct LeaderboardRequest {
    /// Guild whose leaderboard is requested.
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    #[schema(value_type = String)]
    #[validate(custom(function = "validate_snowflake"))]
    pub guild_id: GuildId,
    /// Channel the reply is posted in.
    #[serde_as(as = "PickFirst<(DisplayFromStr, _)>")]
    #[schema(value_type = String)]
    #[validate(custom(function = "validate_snowflake"))]
    pub channel_id: ChannelId,
    /// Defaults to `weekly`.
    #[serde(default)]
    pub timeframe: Option<Timeframe>,
}

/// Plain acknowledgement with a user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ActionResponse {
    /// Text shown to the caller.
    pub message: String,
}

impl ActionResponse {
    /// Acknowledgement carrying `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Settings command reply carrying the updated room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct SettingsResponse {
    /// Text shown to the caller.
    pub message: String,
    /// Room after the change.
    pub status: RoomStatus,
}

/// Totals of a user across every guild.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct UserStatsResponse {
    /// User the totals belong to.
    #[serde_as(as = "DisplayFromStr")]
    #[schema(value_type = String)]
    pub user_id: UserId,
    /// Minutes since the last daily reset.
    pub daily_minutes: u64,
    /// Minutes since the last weekly reset.
    pub weekly_minutes: u64,
    /// Minutes since the last monthly reset.
    pub monthly_minutes: u64,
    /// Minutes ever credited.
    pub total_minutes: u64,
    /// `daily_minutes` as `Xh Ym`.
    pub daily: String,
    /// `weekly_minutes` as `Xh Ym`.
    pub weekly: String,
    /// `monthly_minutes` as `Xh Ym`.
    pub monthly: String,
    /// `total_minutes` as `Xh Ym`.
    pub total: String,
}

impl UserStatsResponse {
    /// Response for `user_id` built from the summed counters.
    pub fn new(user_id: UserId, aggregate: UserAggregate) -> Self {
        Self {
            user_id,
            daily_minutes: aggregate.daily_time,
            weekly_minutes: aggregate.weekly_time,
            monthly_minutes: aggregate.monthly_time,
            total_minutes: aggregate.total_time,
            daily: format_minutes(aggregate.daily_time),
            weekly: format_minutes(aggregate.weekly_time),
            monthly: format_minutes(aggregate.monthly_time),
            total: format_minutes(aggregate.total_time),
        }
    }
}

/// Manual leaderboard outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct LeaderboardResponse {
    /// Whether the rendered report reached the notification stream.
    pub delivered: bool,
    /// Rendered report.
    pub report: ReportEvent,
}
