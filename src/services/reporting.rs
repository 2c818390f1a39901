//! Leaderboard fetch-and-render shared by scheduled and on-demand reports.

use tracing::{debug, info, warn};

use crate::{
    dao::models::{GuildConfigEntity, Timeframe},
    dto::sse::{ReportEvent, ReportTrigger},
    error::ServiceError,
    services::notifier::log_outcome,
    state::{
        SharedState,
        guild::GuildInfo,
        room::{ChannelId, GuildId},
    },
};

/// Channel name fragments hinting at a place for reports.
const REPORT_CHANNEL_HINTS: &[&str] = &["pomo", "bot"];

/// What happened to one guild's scheduled report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportDelivery {
    /// Posted in `channel_id`.
    Delivered { channel_id: ChannelId },
    /// The sink refused or nobody was listening.
    NotDelivered { channel_id: ChannelId },
    /// Nobody studied in the window; nothing was sent.
    NoData,
    /// The guild had data but no channel to post it in.
    NoChannel,
    /// The leaderboard could not be read.
    StoreFailed,
}

impl ReportDelivery {
    /// Whether the report went out.
    pub fn is_delivered(self) -> bool {
        matches!(self, Self::Delivered { .. })
    }

    /// Whether the guild may have had counters worth reporting.
    pub fn had_data(self) -> bool {
        !matches!(self, Self::NoData)
    }
}

/// Pick where a guild's scheduled report goes.
///
/// Configured report channel first, then the system channel, then a text
/// channel whose name hints at the purpose, then any text channel.
pub fn resolve_report_channel(
    config: Option<&GuildConfigEntity>,
    guild: &GuildInfo,
) -> Option<ChannelId> {
    config
        .and_then(|config| config.report_channel_id)
        .or(guild.system_channel_id)
        .or_else(|| guild.channel_named_like(REPORT_CHANNEL_HINTS))
        .or_else(|| guild.first_text_channel())
}

/// Scheduled report for one guild. Guilds without data are skipped.
pub async fn send_scheduled_report(
    state: &SharedState,
    guild: &GuildInfo,
    timeframe: Timeframe,
) -> ReportDelivery {
    let guild_id = guild.guild_id;
    let store = match state.require_session_store().await {
        Ok(store) => store,
        Err(err) => {
            warn!(guild_id, timeframe = ?timeframe, error = %err, "cannot build report");
            return ReportDelivery::StoreFailed;
        }
    };

    let limit = state.config().reports.leaderboard_limit;
    let entries = match store.aggregate_top(guild_id, timeframe, limit).await {
        Ok(entries) => entries,
        Err(err) => {
            warn!(guild_id, timeframe = ?timeframe, error = %err, "failed to read leaderboard");
            return ReportDelivery::StoreFailed;
        }
    };
    if entries.is_empty() {
        debug!(guild_id, timeframe = ?timeframe, "no activity; report skipped");
        return ReportDelivery::NoData;
    }

    let config = match store.group_config(guild_id).await {
        Ok(config) => config,
        Err(err) => {
            warn!(guild_id, error = %err, "failed to load guild config; using channel heuristics");
            None
        }
    };
    let Some(channel_id) = resolve_report_channel(config.as_ref(), guild) else {
        warn!(guild_id, timeframe = ?timeframe, "no channel to post report in");
        return ReportDelivery::NoChannel;
    };

    let report = ReportEvent::render(
        guild_id,
        channel_id,
        timeframe,
        ReportTrigger::Scheduled,
        &entries,
    );
    let result = state.notifier().send_report(report).await;
    if log_outcome(&result, "report") {
        info!(guild_id, channel_id, timeframe = ?timeframe, entries = entries.len(), "report sent");
        ReportDelivery::Delivered { channel_id }
    } else {
        ReportDelivery::NotDelivered { channel_id }
    }
}

/// On-demand leaderboard. Never resets, and renders a no-data report rather than staying silent.
pub async fn manual_report(
    state: &SharedState,
    guild_id: GuildId,
    channel_id: ChannelId,
    timeframe: Timeframe,
) -> Result<(ReportEvent, bool), ServiceError> {
    let store = state.require_session_store().await?;
    let limit = state.config().reports.leaderboard_limit;
    let entries = store.aggregate_top(guild_id, timeframe, limit).await?;

    let report = ReportEvent::render(
        guild_id,
        channel_id,
        timeframe,
        ReportTrigger::Manual,
        &entries,
    );
    let result = state.notifier().send_report(report.clone()).await;
    let delivered = log_outcome(&result, "report");
    Ok((report, delivered))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::guild::TextChannel;

    fn guild(system_channel_id: Option<ChannelId>, channels: &[(ChannelId, &str)]) -> GuildInfo {
        GuildInfo {
            guild_id: 1,
            name: "Study Hall".into(),
            system_channel_id,
            text_channels: channels
                .iter()
                .map(|(id, name)| TextChannel {
                    id: *id,
                    name: (*name).into(),
                })
                .collect(),
        }
    }

    #[test]
    fn configured_channel_wins() {
        let mut config = GuildConfigEntity::with_defaults(1);
        config.report_channel_id = Some(99);
        let info = guild(Some(5), &[(7, "pomodoro")]);
        assert_eq!(resolve_report_channel(Some(&config), &info), Some(99));
    }

    #[test]
    fn falls_back_through_heuristics() {
        let info = guild(Some(5), &[(7, "pomodoro")]);
        assert_eq!(resolve_report_channel(None, &info), Some(5));

        let info = guild(None, &[(6, "random"), (7, "Pomo-Room")]);
        assert_eq!(resolve_report_channel(None, &info), Some(7));

        let info = guild(None, &[(6, "random"), (8, "lounge")]);
        assert_eq!(resolve_report_channel(None, &info), Some(6));

        assert_eq!(resolve_report_channel(None, &guild(None, &[])), None);
    }
}
