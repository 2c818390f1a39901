use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};

use super::error::{MongoDaoError, MongoResult};
use crate::dao::models::{
    GuildConfigEntity, GuildStatsEntity, SessionKind, SessionLogEntity, Timeframe,
};

pub const SESSION_LOG_COLLECTION: &str = "session_logs";
pub const GUILD_STATS_COLLECTION: &str = "guild_stats";
pub const GUILD_CONFIG_COLLECTION: &str = "guild_configs";
pub const ACTIVE_MESSAGE_COLLECTION: &str = "active_channel_messages";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionLogDocument {
    user_id: String,
    guild_id: Option<String>,
    duration: i64,
    session_type: SessionKind,
    is_web: bool,
    created_at: DateTime,
}

impl From<SessionLogEntity> for SessionLogDocument {
    fn from(value: SessionLogEntity) -> Self {
        Self {
            user_id: value.user_id.to_string(),
            guild_id: value.guild_id.map(|id| id.to_string()),
            duration: i64::from(value.duration),
            session_type: value.session_type,
            is_web: false,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildStatsDocument {
    pub guild_id: String,
    pub user_id: String,
    #[serde(default)]
    pub daily_time: i64,
    #[serde(default)]
    pub weekly_time: i64,
    #[serde(default)]
    pub monthly_time: i64,
    #[serde(default)]
    pub total_time: i64,
    pub updated_at: DateTime,
}

impl GuildStatsDocument {
    pub fn minutes(&self, timeframe: Timeframe) -> u64 {
        let value = match timeframe {
            Timeframe::Daily => self.daily_time,
            Timeframe::Weekly => self.weekly_time,
            Timeframe::Monthly => self.monthly_time,
            Timeframe::Total => self.total_time,
        };
        value.max(0) as u64
    }
}

impl TryFrom<GuildStatsDocument> for GuildStatsEntity {
    type Error = MongoDaoError;

    fn try_from(value: GuildStatsDocument) -> MongoResult<Self> {
        Ok(Self {
            guild_id: parse_id(GUILD_STATS_COLLECTION, &value.guild_id)?,
            user_id: parse_id(GUILD_STATS_COLLECTION, &value.user_id)?,
            daily_time: value.minutes(Timeframe::Daily),
            weekly_time: value.minutes(Timeframe::Weekly),
            monthly_time: value.minutes(Timeframe::Monthly),
            total_time: value.minutes(Timeframe::Total),
            updated_at: value.updated_at.to_system_time(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildConfigDocument {
    #[serde(rename = "_id")]
    guild_id: String,
    study_channel_id: Option<String>,
    report_channel_id: Option<String>,
    welcome_channel_id: Option<String>,
    welcome_message: Option<String>,
    #[serde(default)]
    welcome_enabled: bool,
    updated_at: DateTime,
}

impl TryFrom<GuildConfigDocument> for GuildConfigEntity {
    type Error = MongoDaoError;

    fn try_from(value: GuildConfigDocument) -> MongoResult<Self> {
        Ok(Self {
            guild_id: parse_id(GUILD_CONFIG_COLLECTION, &value.guild_id)?,
            study_channel_id: parse_optional_id(value.study_channel_id)?,
            report_channel_id: parse_optional_id(value.report_channel_id)?,
            welcome_channel_id: parse_optional_id(value.welcome_channel_id)?,
            welcome_message: value.welcome_message,
            welcome_enabled: value.welcome_enabled,
            updated_at: value.updated_at.to_system_time(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveMessageDocument {
    #[serde(rename = "_id")]
    pub channel_id: String,
    pub guild_id: String,
    pub message_id: String,
    pub updated_at: DateTime,
}

pub fn parse_id(collection: &'static str, value: &str) -> MongoResult<u64> {
    value
        .parse::<u64>()
        .map_err(|_| MongoDaoError::CorruptIdentifier {
            collection,
            value: value.to_owned(),
        })
}

fn parse_optional_id(value: Option<String>) -> MongoResult<Option<u64>> {
    value
        .map(|raw| parse_id(GUILD_CONFIG_COLLECTION, &raw))
        .transpose()
}
