//! Calendar-driven leaderboard reports and window resets.
//!
//! A check runs once per minute. Each trigger is claimed in a last-fired map
//! before any await, so a re-entered or delayed check cannot fire it twice
//! for the same calendar bucket.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use futures::future::join_all;
use time::{Date, OffsetDateTime};
use tracing::{info, warn};

use crate::{
    config::{ReportConfig, ResetPolicy},
    dao::models::Timeframe,
    services::{
        periodic::PeriodicTask,
        reporting::{self, ReportDelivery},
        status_publisher,
    },
    state::{SharedState, room::GuildId},
};

const CHECK_PERIOD: Duration = Duration::from_secs(60);

/// What happened to a window's counters after its report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOutcome {
    /// Counters zeroed on `rows` rows.
    Reset { rows: u64 },
    /// Kept on purpose by the reset policy.
    Skipped,
    /// The store refused the reset.
    Failed,
}

/// Result of one fired trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOutcome {
    /// Window that was reported.
    pub timeframe: Timeframe,
    /// Delivery per known guild, ordered by id.
    pub guilds: Vec<(GuildId, ReportDelivery)>,
    /// What happened to the window afterwards.
    pub reset: ResetOutcome,
}

/// Triggers matching `now`, in daily, weekly, monthly order.
pub fn due_triggers(config: &ReportConfig, now: OffsetDateTime) -> Vec<Timeframe> {
    if now.hour() != config.hour_utc || now.minute() != 0 {
        return Vec::new();
    }

    let mut due = vec![Timeframe::Daily];
    if now.weekday() == config.weekly_weekday {
        due.push(Timeframe::Weekly);
    }
    if now.day() == 1 {
        due.push(Timeframe::Monthly);
    }
    due
}

struct SchedulerInner {
    state: SharedState,
    last_fired: Mutex<HashMap<Timeframe, Date>>,
}

impl SchedulerInner {
    /// Record `date` as fired for `timeframe`. False when it already was.
    fn claim(&self, timeframe: Timeframe, date: Date) -> bool {
        let mut last_fired = self
            .last_fired
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if last_fired.get(&timeframe) == Some(&date) {
            return false;
        }
        last_fired.insert(timeframe, date);
        true
    }

    async fn check(&self, now: OffsetDateTime) -> Vec<ReportOutcome> {
        let mut outcomes = Vec::new();
        for timeframe in due_triggers(&self.state.config().reports, now) {
            if !self.claim(timeframe, now.date()) {
                continue;
            }
            outcomes.push(run_scheduled(&self.state, timeframe).await);
        }
        outcomes
    }
}

/// Owner of the report driver task.
pub struct ReportScheduler {
    inner: Arc<SchedulerInner>,
    driver: Mutex<Option<PeriodicTask>>,
}

impl ReportScheduler {
    /// Idle scheduler over `state`.
    pub fn new(state: SharedState) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                state,
                last_fired: Mutex::new(HashMap::new()),
            }),
            driver: Mutex::new(None),
        }
    }

    /// Spawn the minute driver. It also publishes the global presence line.
    pub fn start(&self) -> bool {
        let mut driver = self
            .driver
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if driver.is_some() {
            return false;
        }

        let inner = self.inner.clone();
        *driver = Some(PeriodicTask::spawn("reports", CHECK_PERIOD, move || {
            let inner = inner.clone();
            tokio::spawn(async move {
                status_publisher::publish_presence(&inner.state).await;
                inner.check(OffsetDateTime::now_utc()).await;
            });
        }));
        info!(
            hour_utc = self.inner.state.config().reports.hour_utc,
            "report scheduler started"
        );
        true
    }

    /// Stop the minute driver and wait for it to exit.
    pub async fn stop(&self) {
        let driver = self
            .driver
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(driver) = driver {
            driver.stop().await;
            info!("report scheduler stopped");
        }
    }

    /// Run the triggers due at `now`, each at most once per calendar bucket.
    pub async fn check(&self, now: OffsetDateTime) -> Vec<ReportOutcome> {
        self.inner.check(now).await
    }
}

/// Report `timeframe` to every known guild, then reset the window per policy.
pub async fn run_scheduled(state: &SharedState, timeframe: Timeframe) -> ReportOutcome {
    let guilds = state.guilds().all();
    info!(timeframe = ?timeframe, guilds = guilds.len(), "scheduled report fired");

    let deliveries = join_all(
        guilds
            .iter()
            .map(|guild| reporting::send_scheduled_report(state, guild, timeframe)),
    )
    .await;
    let guilds: Vec<(GuildId, ReportDelivery)> = guilds
        .iter()
        .map(|guild| guild.guild_id)
        .zip(deliveries)
        .collect();

    let reset = if should_reset(state.config().reports.reset_policy, &guilds) {
        reset_window(state, timeframe).await
    } else {
        warn!(timeframe = ?timeframe, "no report delivered; window counters kept");
        ResetOutcome::Skipped
    };

    ReportOutcome {
        timeframe,
        guilds,
        reset,
    }
}

fn should_reset(policy: ResetPolicy, guilds: &[(GuildId, ReportDelivery)]) -> bool {
    match policy {
        ResetPolicy::Always => true,
        ResetPolicy::SkipOnTotalFailure => {
            let had_data = guilds.iter().any(|(_, delivery)| delivery.had_data());
            let delivered = guilds.iter().any(|(_, delivery)| delivery.is_delivered());
            !had_data || delivered
        }
    }
}

async fn reset_window(state: &SharedState, timeframe: Timeframe) -> ResetOutcome {
    let store = match state.require_session_store().await {
        Ok(store) => store,
        Err(err) => {
            warn!(timeframe = ?timeframe, error = %err, "cannot reset window");
            return ResetOutcome::Failed;
        }
    };
    match store.reset_aggregate_window(None, timeframe).await {
        Ok(rows) => {
            info!(timeframe = ?timeframe, rows, "window counters reset");
            ResetOutcome::Reset { rows }
        }
        Err(err) => {
            warn!(timeframe = ?timeframe, error = %err, "failed to reset window");
            ResetOutcome::Failed
        }
    }
}
