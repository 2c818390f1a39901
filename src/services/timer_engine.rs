//! The single periodic driver advancing every live room.
//!
//! Each tick flips rooms in memory first, then hands every phase boundary to
//! its own task so slow persistence in one room never holds back the others.

use std::{
    sync::Mutex,
    time::{Duration, SystemTime},
};

use futures::future::join_all;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::{
    dao::{
        models::{SessionKind, SessionLogEntity},
        session_store::SessionStore,
    },
    dto::sse::{VoiceAlertEvent, VoiceAlertKind},
    services::{
        notifier::log_outcome,
        periodic::PeriodicTask,
        status_publisher::{self, StatusOutcome},
    },
    state::{
        SharedState,
        room::{Phase, PhaseBoundary, RoomKey, UserId},
    },
};

/// Persistence result of one phase boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreditOutcome {
    /// A break ended, or the focus was too short to be worth a minute.
    NotApplicable,
    /// No usable store; nothing was attempted.
    StoreUnavailable,
    /// Writes were attempted for every participant.
    Attempted {
        minutes: u32,
        credited: Vec<UserId>,
        failed: Vec<UserId>,
    },
}

/// Everything that happened after one room crossed a phase boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryOutcome {
    /// Boundary that triggered the work.
    pub boundary: PhaseBoundary,
    /// Credit given for a completed focus phase.
    pub credit: CreditOutcome,
    /// Status card published for the new phase.
    pub status: StatusOutcome,
    /// `None` when voice alerts are off for the room, otherwise whether the alert went out.
    pub voice_alert: Option<bool>,
}

/// Work dispatched by one tick.
#[derive(Debug, Default)]
pub struct TickReport {
    /// One task per room that crossed a boundary.
    pub boundaries: Vec<JoinHandle<BoundaryOutcome>>,
    /// Throttled status refreshes.
    pub refreshes: Vec<JoinHandle<StatusOutcome>>,
}

impl TickReport {
    /// Wait for every task of the tick; tasks that panicked are skipped.
    pub async fn join(self) -> (Vec<BoundaryOutcome>, Vec<StatusOutcome>) {
        let boundaries = join_all(self.boundaries)
            .await
            .into_iter()
            .filter_map(Result::ok)
            .collect();
        let refreshes = join_all(self.refreshes)
            .await
            .into_iter()
            .filter_map(Result::ok)
            .collect();
        (boundaries, refreshes)
    }
}

/// Owner of the timer driver task.
pub struct TimerEngine {
    state: SharedState,
    period: Duration,
    driver: Mutex<Option<PeriodicTask>>,
}

impl TimerEngine {
    /// Engine over `state`, driven every `timer.tick_interval_ms` rounded to whole seconds.
    pub fn new(state: SharedState) -> Self {
        let timer = &state.config().timer;
        let step_secs = timer.tick_step_secs();
        if u64::from(step_secs) * 1000 != timer.tick_interval_ms {
            warn!(
                tick_interval_ms = timer.tick_interval_ms,
                step_secs, "tick interval rounded to whole seconds"
            );
        }
        let period = Duration::from_secs(step_secs.into());
        Self {
            state,
            period,
            driver: Mutex::new(None),
        }
    }

    /// Spawn the periodic driver. Returns `false` when it is already running.
    pub fn start(&self) -> bool {
        let mut driver = self
            .driver
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if driver.is_some() {
            return false;
        }

        let state = self.state.clone();
        *driver = Some(PeriodicTask::spawn("timer", self.period, move || {
            tick(&state);
        }));
        info!(period_ms = self.period.as_millis() as u64, "timer engine started");
        true
    }

    /// Stop the driver and wait for it to exit. Boundary tasks already spawned keep running.
    pub async fn stop(&self) {
        let driver = self
            .driver
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(driver) = driver {
            driver.stop().await;
            info!("timer engine stopped");
        }
    }

    /// Whether the periodic driver is active.
    pub fn is_running(&self) -> bool {
        self.driver
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_some()
    }

    /// Run one step by hand.
    pub fn tick(&self) -> TickReport {
        tick(&self.state)
    }
}

/// Advance every room by one step and dispatch the resulting work.
pub fn tick(state: &SharedState) -> TickReport {
    let timer = &state.config().timer;
    let advanced = state
        .rooms()
        .advance_all(timer.tick_step_secs(), timer.status_refresh_secs);

    let boundaries = advanced
        .boundaries
        .into_iter()
        .map(|boundary| {
            info!(
                guild_id = boundary.key.guild_id,
                channel_id = boundary.key.channel_id,
                ended = ?boundary.ended,
                next = ?boundary.next,
                round = boundary.ended_round,
                participants = boundary.participants.len(),
                "phase boundary"
            );
            tokio::spawn(complete_boundary(state.clone(), boundary))
        })
        .collect();

    let refreshes = advanced
        .refreshes
        .into_iter()
        .map(|key| {
            let state = state.clone();
            tokio::spawn(async move { status_publisher::publish_status(&state, key, false).await })
        })
        .collect();

    TickReport {
        boundaries,
        refreshes,
    }
}

/// Credit, announce and alert for a boundary the room already moved past.
async fn complete_boundary(state: SharedState, boundary: PhaseBoundary) -> BoundaryOutcome {
    let (credit, status) = tokio::join!(
        credit_participants(&state, &boundary),
        status_publisher::publish_status(&state, boundary.key, true),
    );

    let voice_alert = if boundary.voice_alerts_enabled {
        let kind = match boundary.next {
            Phase::Focus => VoiceAlertKind::FocusStart,
            Phase::Break | Phase::LongBreak => VoiceAlertKind::BreakStart,
        };
        let result = state
            .notifier()
            .send_voice_alert(VoiceAlertEvent {
                guild_id: boundary.key.guild_id,
                channel_id: boundary.key.channel_id,
                kind,
                sound_enabled: boundary.sound_enabled,
            })
            .await;
        Some(log_outcome(&result, "voice.alert"))
    } else {
        None
    };

    BoundaryOutcome {
        boundary,
        credit,
        status,
        voice_alert,
    }
}

async fn credit_participants(state: &SharedState, boundary: &PhaseBoundary) -> CreditOutcome {
    let minutes = boundary.credited_minutes();
    if !boundary.ended.is_focus() || minutes == 0 || boundary.participants.is_empty() {
        return CreditOutcome::NotApplicable;
    }

    let store = match state.require_session_store().await {
        Ok(store) => store,
        Err(err) => {
            warn!(
                guild_id = boundary.key.guild_id,
                channel_id = boundary.key.channel_id,
                participants = boundary.participants.len(),
                minutes,
                error = %err,
                "cannot credit focus session"
            );
            return CreditOutcome::StoreUnavailable;
        }
    };

    let writes = boundary
        .participants
        .iter()
        .map(|&user_id| credit_user(store.as_ref(), boundary.key, user_id, minutes));
    let results = join_all(writes).await;

    let (credited, failed): (Vec<_>, Vec<_>) = results.into_iter().partition(|(_, ok)| *ok);
    CreditOutcome::Attempted {
        minutes,
        credited: credited.into_iter().map(|(user_id, _)| user_id).collect(),
        failed: failed.into_iter().map(|(user_id, _)| user_id).collect(),
    }
}

/// Append the log row and bump the aggregate for one user. Both are always attempted.
async fn credit_user(
    store: &dyn SessionStore,
    key: RoomKey,
    user_id: UserId,
    minutes: u32,
) -> (UserId, bool) {
    let log = SessionLogEntity {
        user_id,
        guild_id: Some(key.guild_id),
        duration: minutes,
        session_type: SessionKind::Focus,
        created_at: SystemTime::now(),
    };
    let (logged, incremented) = tokio::join!(
        store.log_session(log),
        store.increment_aggregate(key.guild_id, user_id, minutes),
    );

    let mut ok = true;
    if let Err(err) = logged {
        warn!(guild_id = key.guild_id, user_id, error = %err, "failed to append session log");
        ok = false;
    }
    if let Err(err) = incremented {
        warn!(guild_id = key.guild_id, user_id, error = %err, "failed to increment aggregate");
        ok = false;
    }
    (user_id, ok)
}
