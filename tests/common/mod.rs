#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};

use futures::future::BoxFuture;
use pomora_back::{
    config::AppConfig,
    dao::{
        models::{
            GuildConfigEntity, GuildConfigUpdate, LeaderboardEntry, SessionLogEntity, Timeframe,
            UserAggregate,
        },
        session_store::{MemorySessionStore, SessionStore},
        storage::StorageResult,
    },
    dto::sse::{
        OnboardingEvent, PresenceEvent, ReportEvent, StatusClosedEvent, StatusRefreshEvent,
        VoiceAlertEvent, WelcomeEvent,
    },
    services::{
        notifier::{NotificationSink, NotifyError, NotifyResult},
        timer_engine::{BoundaryOutcome, TimerEngine},
    },
    state::{
        AppState, SharedState,
        guild::{GuildInfo, TextChannel},
        room::{ChannelId, GuildId, UserId},
    },
};

pub const GUILD: GuildId = 100;
pub const STUDY: ChannelId = 200;
pub const REPORTS: ChannelId = 300;

#[derive(Debug, Clone)]
pub enum Recorded {
    Status(StatusRefreshEvent),
    Closed(StatusClosedEvent),
    Report(ReportEvent),
    VoiceAlert(VoiceAlertEvent),
    Welcome(WelcomeEvent),
    Onboarding(OnboardingEvent),
    Presence(PresenceEvent),
}

/// Sink keeping every notification in memory.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Recorded>>,
    reject_reports: AtomicBool,
}

impl RecordingSink {
    pub fn reject_reports(&self, reject: bool) {
        self.reject_reports.store(reject, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<Recorded> {
        self.events.lock().unwrap().clone()
    }

    pub fn reports(&self) -> Vec<ReportEvent> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Recorded::Report(report) => Some(report),
                _ => None,
            })
            .collect()
    }

    pub fn statuses(&self) -> Vec<StatusRefreshEvent> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Recorded::Status(status) => Some(status),
                _ => None,
            })
            .collect()
    }

    pub fn closed(&self) -> Vec<StatusClosedEvent> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Recorded::Closed(closed) => Some(closed),
                _ => None,
            })
            .collect()
    }

    pub fn presences(&self) -> Vec<PresenceEvent> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Recorded::Presence(presence) => Some(presence),
                _ => None,
            })
            .collect()
    }

    pub fn voice_alerts(&self) -> Vec<VoiceAlertEvent> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Recorded::VoiceAlert(alert) => Some(alert),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: Recorded) -> BoxFuture<'static, NotifyResult> {
        self.events.lock().unwrap().push(event);
        Box::pin(async { Ok(()) })
    }
}

impl NotificationSink for RecordingSink {
    fn refresh_status(&self, event: StatusRefreshEvent) -> BoxFuture<'static, NotifyResult> {
        self.record(Recorded::Status(event))
    }

    fn clear_status(&self, event: StatusClosedEvent) -> BoxFuture<'static, NotifyResult> {
        self.record(Recorded::Closed(event))
    }

    fn send_report(&self, event: ReportEvent) -> BoxFuture<'static, NotifyResult> {
        if self.reject_reports.load(Ordering::SeqCst) {
            return Box::pin(async { Err(NotifyError::NoSubscribers { event: "report" }) });
        }
        self.record(Recorded::Report(event))
    }

    fn send_voice_alert(&self, event: VoiceAlertEvent) -> BoxFuture<'static, NotifyResult> {
        self.record(Recorded::VoiceAlert(event))
    }

    fn send_welcome(&self, event: WelcomeEvent) -> BoxFuture<'static, NotifyResult> {
        self.record(Recorded::Welcome(event))
    }

    fn send_onboarding(&self, event: OnboardingEvent) -> BoxFuture<'static, NotifyResult> {
        self.record(Recorded::Onboarding(event))
    }

    fn update_presence(&self, event: PresenceEvent) -> BoxFuture<'static, NotifyResult> {
        self.record(Recorded::Presence(event))
    }
}

pub struct Harness {
    pub state: SharedState,
    pub sink: Arc<RecordingSink>,
    pub store: MemorySessionStore,
    pub engine: TimerEngine,
}

impl Harness {
    /// State with a memory store, a recording sink and `STUDY` configured for `GUILD`.
    pub async fn new(config: AppConfig) -> Self {
        let sink = Arc::new(RecordingSink::default());
        let state = AppState::with_notifier(config, sink.clone());
        let store = MemorySessionStore::new();
        state.install_session_store(Arc::new(store.clone())).await;
        store
            .update_group_config(
                GUILD,
                GuildConfigUpdate {
                    study_channel_id: Some(STUDY),
                    report_channel_id: Some(REPORTS),
                    ..GuildConfigUpdate::default()
                },
            )
            .await
            .unwrap();
        state.guilds().upsert(GuildInfo {
            guild_id: GUILD,
            name: "Study Hall".into(),
            system_channel_id: None,
            text_channels: vec![TextChannel {
                id: REPORTS,
                name: "pomodoro-reports".into(),
            }],
        });

        let engine = TimerEngine::new(state.clone());
        Self {
            state,
            sink,
            store,
            engine,
        }
    }

    pub async fn default() -> Self {
        Self::new(AppConfig::default()).await
    }

    /// Run `ticks` engine steps, waiting for the work each one dispatched.
    pub async fn run_ticks(&self, ticks: u32) -> Vec<BoundaryOutcome> {
        let mut boundaries = Vec::new();
        for _ in 0..ticks {
            let (outcomes, _) = self.engine.tick().join().await;
            boundaries.extend(outcomes);
        }
        boundaries
    }
}

/// Memory store whose guild config lookup gives way to other tasks a few times
/// before answering, like a round trip to a real database.
pub struct YieldingConfigStore {
    inner: MemorySessionStore,
    yields: usize,
}

impl YieldingConfigStore {
    pub fn new(inner: MemorySessionStore, yields: usize) -> Self {
        Self { inner, yields }
    }
}

impl SessionStore for YieldingConfigStore {
    fn log_session(&self, log: SessionLogEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.log_session(log)
    }

    fn increment_aggregate(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        minutes: u32,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.increment_aggregate(guild_id, user_id, minutes)
    }

    fn aggregate_top(
        &self,
        guild_id: GuildId,
        timeframe: Timeframe,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<LeaderboardEntry>>> {
        self.inner.aggregate_top(guild_id, timeframe, limit)
    }

    fn user_aggregate(&self, user_id: UserId) -> BoxFuture<'static, StorageResult<Option<UserAggregate>>> {
        self.inner.user_aggregate(user_id)
    }

    fn group_config(
        &self,
        guild_id: GuildId,
    ) -> BoxFuture<'static, StorageResult<Option<GuildConfigEntity>>> {
        let lookup = self.inner.group_config(guild_id);
        let yields = self.yields;
        Box::pin(async move {
            for _ in 0..yields {
                tokio::task::yield_now().await;
            }
            lookup.await
        })
    }

    fn update_group_config(
        &self,
        guild_id: GuildId,
        update: GuildConfigUpdate,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.update_group_config(guild_id, update)
    }

    fn reset_aggregate_window(
        &self,
        guild_id: Option<GuildId>,
        timeframe: Timeframe,
    ) -> BoxFuture<'static, StorageResult<u64>> {
        self.inner.reset_aggregate_window(guild_id, timeframe)
    }

    fn set_active_status_message(
        &self,
        channel_id: ChannelId,
        guild_id: GuildId,
        message_id: String,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.inner
            .set_active_status_message(channel_id, guild_id, message_id)
    }

    fn active_status_message(
        &self,
        channel_id: ChannelId,
    ) -> BoxFuture<'static, StorageResult<Option<String>>> {
        self.inner.active_status_message(channel_id)
    }

    fn delete_active_status_message(
        &self,
        channel_id: ChannelId,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.delete_active_status_message(channel_id)
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.health_check()
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.try_reconnect()
    }
}
