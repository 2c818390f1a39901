/// Guilds served by the gateway.
pub mod guild;
/// Live room registry.
pub mod registry;
/// Room state machine.
pub mod room;
mod sse;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock, watch};
use tracing::warn;

use crate::{
    config::AppConfig,
    dao::session_store::SessionStore,
    dto::sse::{ServerEvent, SystemStatus},
    error::ServiceError,
    services::notifier::{NotificationSink, SseNotifier},
};

use self::{
    guild::GuildDirectory,
    registry::RoomRegistry,
    room::{GuildId, RoomSettings},
};

pub use self::sse::SseHub;

/// Handle to the state shared by every route and driver.
pub type SharedState = Arc<AppState>;

const NOTIFICATION_CAPACITY: usize = 256;
const EVENT_SYSTEM_STATUS: &str = "system.status";

/// Central application state: live rooms, known guilds, the storage slot and the notification sink.
pub struct AppState {
    config: AppConfig,
    session_store: RwLock<Option<Arc<dyn SessionStore>>>,
    rooms: RoomRegistry,
    guilds: GuildDirectory,
    membership_locks: DashMap<GuildId, Arc<Mutex<()>>>,
    notifier: Arc<dyn NotificationSink>,
    notifications: Arc<SseHub>,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct the state with the SSE-backed notification sink.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let notifications = Arc::new(SseHub::new(NOTIFICATION_CAPACITY));
        let notifier = Arc::new(SseNotifier::new(notifications.clone()));
        Self::build(config, notifier, notifications)
    }

    /// Construct the state around a caller-provided sink.
    pub fn with_notifier(config: AppConfig, notifier: Arc<dyn NotificationSink>) -> SharedState {
        Self::build(
            config,
            notifier,
            Arc::new(SseHub::new(NOTIFICATION_CAPACITY)),
        )
    }

    fn build(
        config: AppConfig,
        notifier: Arc<dyn NotificationSink>,
        notifications: Arc<SseHub>,
    ) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            config,
            session_store: RwLock::new(None),
            rooms: RoomRegistry::new(),
            guilds: GuildDirectory::default(),
            membership_locks: DashMap::new(),
            notifier,
            notifications,
            degraded: degraded_tx,
        })
    }

    /// Configuration loaded at startup.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Settings new rooms are created with.
    pub fn room_defaults(&self) -> RoomSettings {
        RoomSettings::from_timer(&self.config.timer)
    }

    /// Live rooms.
    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    /// Guilds the gateway reported.
    pub fn guilds(&self) -> &GuildDirectory {
        &self.guilds
    }

    /// Serialise membership changes of one guild.
    ///
    /// Held across the whole join or leave, including the store lookups, so a
    /// leave can never overtake the join it follows.
    pub async fn lock_membership(&self, guild_id: GuildId) -> OwnedMutexGuard<()> {
        let lock = Arc::clone(self.membership_locks.entry(guild_id).or_default().value());
        lock.lock_owned().await
    }

    /// Sink every notification goes through.
    pub fn notifier(&self) -> &Arc<dyn NotificationSink> {
        &self.notifier
    }

    /// Broadcast hub behind the notification SSE stream.
    pub fn notifications(&self) -> &SseHub {
        &self.notifications
    }

    /// Obtain a handle to the current session store, if one is installed.
    pub async fn session_store(&self) -> Option<Arc<dyn SessionStore>> {
        let guard = self.session_store.read().await;
        guard.as_ref().cloned()
    }

    /// Current session store, or [`ServiceError::Degraded`] while none is usable.
    pub async fn require_session_store(&self) -> Result<Arc<dyn SessionStore>, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.session_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new session store implementation and leave degraded mode.
    pub async fn install_session_store(&self, store: Arc<dyn SessionStore>) {
        {
            let mut guard = self.session_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current session store and enter degraded mode.
    pub async fn clear_session_store(&self) {
        {
            let mut guard = self.session_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update the degraded flag and announce it on the notification stream when it changes.
    pub fn update_degraded(&self, value: bool) {
        let changed = self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
        if !changed {
            return;
        }

        match ServerEvent::json(
            Some(EVENT_SYSTEM_STATUS.to_string()),
            &SystemStatus { degraded: value },
        ) {
            Ok(event) => {
                self.notifications.broadcast(event);
            }
            Err(err) => warn!(error = %err, "failed to serialize system status event"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::session_store::MemorySessionStore;

    #[tokio::test]
    async fn store_slot_drives_degraded_flag() {
        let state = AppState::new(AppConfig::default());
        assert!(state.is_degraded());
        assert!(matches!(
            state.require_session_store().await,
            Err(ServiceError::Degraded)
        ));

        let mut watcher = state.degraded_watcher();
        state
            .install_session_store(Arc::new(MemorySessionStore::new()))
            .await;
        assert!(!state.is_degraded());
        assert!(watcher.has_changed().unwrap());
        assert!(state.require_session_store().await.is_ok());

        state.clear_session_store().await;
        assert!(state.is_degraded());
    }

    #[tokio::test]
    async fn degraded_change_is_announced_once() {
        let state = AppState::new(AppConfig::default());
        let mut receiver = state.notifications().subscribe();

        state.update_degraded(false);
        state.update_degraded(false);

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.event.as_deref(), Some(EVENT_SYSTEM_STATUS));
        assert!(receiver.try_recv().is_err());
    }
}
