use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use utoipa::ToSchema;

use crate::state::room::{ChannelId, GuildId, UserId};

/// Kind of session recorded in the immutable session log.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    /// Credited work interval.
    Focus,
    /// Rest interval, never credited.
    Break,
}

impl SessionKind {
    /// Stable name used in persisted rows.
    pub fn as_str(self) -> &'static str {
        match self {
            SessionKind::Focus => "focus",
            SessionKind::Break => "break",
        }
    }
}

/// Rolling window of the per-user aggregate counters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    /// Reset every day.
    Daily,
    /// Reset on the configured weekday.
    Weekly,
    /// Reset on the first of the month.
    Monthly,
    /// Never reset by the scheduler.
    Total,
}

impl Timeframe {
    /// Column holding the counter for this window.
    pub fn column(self) -> &'static str {
        match self {
            Timeframe::Daily => "daily_time",
            Timeframe::Weekly => "weekly_time",
            Timeframe::Monthly => "monthly_time",
            Timeframe::Total => "total_time",
        }
    }

    /// Title used when announcing a report for this window.
    pub fn title(self) -> &'static str {
        match self {
            Timeframe::Daily => "Daily",
            Timeframe::Weekly => "Weekly",
            Timeframe::Monthly => "Monthly",
            Timeframe::Total => "All Time",
        }
    }
}

/// Append-only record of one credited session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionLogEntity {
    /// Credited user.
    pub user_id: UserId,
    /// `None` for sessions that did not happen inside a guild.
    pub guild_id: Option<GuildId>,
    /// Credited length in whole minutes.
    pub duration: u32,
    /// Kind of the completed phase.
    pub session_type: SessionKind,
    /// When the credit was recorded.
    pub created_at: SystemTime,
}

/// Accumulated minutes of one user inside one guild.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GuildStatsEntity {
    /// Guild the minutes were earned in.
    pub guild_id: GuildId,
    /// Owner of the counters.
    pub user_id: UserId,
    /// Minutes since the last daily reset.
    pub daily_time: u64,
    /// Minutes since the last weekly reset.
    pub weekly_time: u64,
    /// Minutes since the last monthly reset.
    pub monthly_time: u64,
    /// Minutes ever credited.
    pub total_time: u64,
    /// Last increment or reset.
    pub updated_at: SystemTime,
}

impl GuildStatsEntity {
    /// Counter value for the requested window.
    pub fn minutes(&self, timeframe: Timeframe) -> u64 {
        match timeframe {
            Timeframe::Daily => self.daily_time,
            Timeframe::Weekly => self.weekly_time,
            Timeframe::Monthly => self.monthly_time,
            Timeframe::Total => self.total_time,
        }
    }
}

/// One line of a leaderboard, already ordered by the store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LeaderboardEntry {
    /// Ranked user.
    pub user_id: UserId,
    /// Counter value for the requested window.
    pub minutes: u64,
}

/// Totals of a user summed over every guild.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserAggregate {
    /// Daily minutes summed over guilds.
    pub daily_time: u64,
    /// Weekly minutes summed over guilds.
    pub weekly_time: u64,
    /// Monthly minutes summed over guilds.
    pub monthly_time: u64,
    /// Total minutes summed over guilds.
    pub total_time: u64,
}

impl UserAggregate {
    /// Add one per-guild row to the running sum.
    pub fn accumulate(mut self, row: &GuildStatsEntity) -> Self {
        self.daily_time += row.daily_time;
        self.weekly_time += row.weekly_time;
        self.monthly_time += row.monthly_time;
        self.total_time += row.total_time;
        self
    }
}

/// Persisted per-guild settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GuildConfigEntity {
    /// Configured guild.
    pub guild_id: GuildId,
    /// Only voice channel that hosts rooms, any channel when unset.
    pub study_channel_id: Option<ChannelId>,
    /// Where scheduled reports are posted.
    pub report_channel_id: Option<ChannelId>,
    /// Where new members are greeted.
    pub welcome_channel_id: Option<ChannelId>,
    /// Custom greeting, the built-in one when unset.
    pub welcome_message: Option<String>,
    /// Whether new members are greeted at all.
    pub welcome_enabled: bool,
    /// Last change.
    pub updated_at: SystemTime,
}

impl GuildConfigEntity {
    /// Row inserted when a guild is configured for the first time.
    pub fn with_defaults(guild_id: GuildId) -> Self {
        Self {
            guild_id,
            study_channel_id: None,
            report_channel_id: None,
            welcome_channel_id: None,
            welcome_message: None,
            welcome_enabled: false,
            updated_at: SystemTime::now(),
        }
    }

    /// Overlay the fields present in `update`, leaving the others untouched.
    pub fn apply(&mut self, update: &GuildConfigUpdate) {
        if let Some(channel) = update.study_channel_id {
            self.study_channel_id = Some(channel);
        }
        if let Some(channel) = update.report_channel_id {
            self.report_channel_id = Some(channel);
        }
        if let Some(channel) = update.welcome_channel_id {
            self.welcome_channel_id = Some(channel);
        }
        if let Some(message) = &update.welcome_message {
            self.welcome_message = message.clone();
        }
        if let Some(enabled) = update.welcome_enabled {
            self.welcome_enabled = enabled;
        }
        self.updated_at = SystemTime::now();
    }
}

/// Partial update of a guild configuration. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuildConfigUpdate {
    /// New study channel.
    pub study_channel_id: Option<ChannelId>,
    /// New report channel.
    pub report_channel_id: Option<ChannelId>,
    /// New welcome channel.
    pub welcome_channel_id: Option<ChannelId>,
    /// `Some(None)` clears the custom welcome message.
    pub welcome_message: Option<Option<String>>,
    /// New welcome toggle.
    pub welcome_enabled: Option<bool>,
}

impl GuildConfigUpdate {
    /// True when the update would not change any field.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Pointer to the status message currently edited in place for a channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActiveStatusMessageEntity {
    /// Voice channel of the room.
    pub channel_id: ChannelId,
    /// Guild owning the channel.
    pub guild_id: GuildId,
    /// Platform id of the status message.
    pub message_id: String,
    /// When the pointer last moved.
    pub updated_at: SystemTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_update_only_touches_present_fields() {
        let mut config = GuildConfigEntity::with_defaults(1);
        config.report_channel_id = Some(40);
        config.welcome_message = Some("hi".into());

        config.apply(&GuildConfigUpdate {
            study_channel_id: Some(7),
            ..Default::default()
        });

        assert_eq!(config.study_channel_id, Some(7));
        assert_eq!(config.report_channel_id, Some(40));
        assert_eq!(config.welcome_message.as_deref(), Some("hi"));
        assert!(!config.welcome_enabled);
    }

    #[test]
    fn config_update_can_clear_welcome_message() {
        let mut config = GuildConfigEntity::with_defaults(1);
        config.welcome_message = Some("hi".into());
        config.welcome_enabled = true;

        config.apply(&GuildConfigUpdate {
            welcome_message: Some(None),
            welcome_enabled: Some(false),
            ..Default::default()
        });

        assert_eq!(config.welcome_message, None);
        assert!(!config.welcome_enabled);
    }

    #[test]
    fn aggregate_sums_rows() {
        let row = GuildStatsEntity {
            guild_id: 1,
            user_id: 2,
            daily_time: 25,
            weekly_time: 50,
            monthly_time: 75,
            total_time: 100,
            updated_at: SystemTime::now(),
        };
        let sum = UserAggregate::default().accumulate(&row).accumulate(&row);
        assert_eq!(sum.daily_time, 50);
        assert_eq!(sum.total_time, 200);
        assert_eq!(row.minutes(Timeframe::Monthly), 75);
    }
}
