//! Process-local [`SessionStore`] used when no database is configured and as
//! the store double in tests. Data does not survive a restart.

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicBool, Ordering},
    },
    time::SystemTime,
};

use futures::future::BoxFuture;

use super::SessionStore;
use crate::{
    dao::{
        models::{
            ActiveStatusMessageEntity, GuildConfigEntity, GuildConfigUpdate, GuildStatsEntity,
            LeaderboardEntry, SessionLogEntity, Timeframe, UserAggregate,
        },
        storage::{StorageError, StorageResult},
    },
    state::room::{ChannelId, GuildId, UserId},
};

/// Session store kept in process memory behind a mutex.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    tables: Mutex<Tables>,
    failing: AtomicBool,
}

#[derive(Default)]
struct Tables {
    session_logs: Vec<SessionLogEntity>,
    guild_stats: HashMap<(GuildId, UserId), GuildStatsEntity>,
    guild_configs: HashMap<GuildId, GuildConfigEntity>,
    active_messages: HashMap<ChannelId, ActiveStatusMessageEntity>,
}

impl MemorySessionStore {
    /// Empty store in working mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail until switched back.
    pub fn set_failing(&self, failing: bool) {
        self.inner.failing.store(failing, Ordering::SeqCst);
    }

    /// Copy of every session log appended so far.
    pub fn session_logs(&self) -> Vec<SessionLogEntity> {
        self.tables().session_logs.clone()
    }

    /// Aggregate row for a guild member, if one was ever created.
    pub fn stats(&self, guild_id: GuildId, user_id: UserId) -> Option<GuildStatsEntity> {
        self.tables().guild_stats.get(&(guild_id, user_id)).cloned()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        // A poisoned lock only means another test thread panicked mid-write.
        self.inner
            .tables
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn guard(&self, operation: &'static str) -> StorageResult<()> {
        if self.inner.failing.load(Ordering::SeqCst) {
            return Err(StorageError::rejected(operation, "memory store switched to failing mode"));
        }
        Ok(())
    }

    fn run<T, F>(&self, operation: &'static str, work: F) -> BoxFuture<'static, StorageResult<T>>
    where
        T: Send + 'static,
        F: FnOnce(&mut Tables) -> T + Send + 'static,
    {
        let store = self.clone();
        Box::pin(async move {
            store.guard(operation)?;
            let mut tables = store.tables();
            Ok(work(&mut tables))
        })
    }
}

impl SessionStore for MemorySessionStore {
    fn log_session(&self, log: SessionLogEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.run("log_session", move |tables| tables.session_logs.push(log))
    }

    fn increment_aggregate(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        minutes: u32,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.run("increment_aggregate", move |tables| {
            let minutes = u64::from(minutes);
            let row = tables
                .guild_stats
                .entry((guild_id, user_id))
                .or_insert_with(|| GuildStatsEntity {
                    guild_id,
                    user_id,
                    daily_time: 0,
                    weekly_time: 0,
                    monthly_time: 0,
                    total_time: 0,
                    updated_at: SystemTime::now(),
                });
            row.daily_time += minutes;
            row.weekly_time += minutes;
            row.monthly_time += minutes;
            row.total_time += minutes;
            row.updated_at = SystemTime::now();
        })
    }

    fn aggregate_top(
        &self,
        guild_id: GuildId,
        timeframe: Timeframe,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<LeaderboardEntry>>> {
        self.run("aggregate_top", move |tables| {
            let mut entries: Vec<LeaderboardEntry> = tables
                .guild_stats
                .values()
                .filter(|row| row.guild_id == guild_id)
                .map(|row| LeaderboardEntry {
                    user_id: row.user_id,
                    minutes: row.minutes(timeframe),
                })
                .filter(|entry| entry.minutes > 0)
                .collect();
            entries.sort_by(|a, b| b.minutes.cmp(&a.minutes).then(a.user_id.cmp(&b.user_id)));
            entries.truncate(limit);
            entries
        })
    }

    fn user_aggregate(&self, user_id: UserId) -> BoxFuture<'static, StorageResult<Option<UserAggregate>>> {
        self.run("user_aggregate", move |tables| {
            let rows: Vec<&GuildStatsEntity> = tables
                .guild_stats
                .values()
                .filter(|row| row.user_id == user_id)
                .collect();
            if rows.is_empty() {
                return None;
            }
            Some(
                rows.into_iter()
                    .fold(UserAggregate::default(), |sum, row| sum.accumulate(row)),
            )
        })
    }

    fn group_config(
        &self,
        guild_id: GuildId,
    ) -> BoxFuture<'static, StorageResult<Option<GuildConfigEntity>>> {
        self.run("group_config", move |tables| {
            tables.guild_configs.get(&guild_id).cloned()
        })
    }

    fn update_group_config(
        &self,
        guild_id: GuildId,
        update: GuildConfigUpdate,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.run("update_group_config", move |tables| {
            tables
                .guild_configs
                .entry(guild_id)
                .or_insert_with(|| GuildConfigEntity::with_defaults(guild_id))
                .apply(&update);
        })
    }

    fn reset_aggregate_window(
        &self,
        guild_id: Option<GuildId>,
        timeframe: Timeframe,
    ) -> BoxFuture<'static, StorageResult<u64>> {
        self.run("reset_aggregate_window", move |tables| {
            let mut touched = 0;
            for row in tables
                .guild_stats
                .values_mut()
                .filter(|row| guild_id.is_none_or(|guild| guild == row.guild_id))
            {
                match timeframe {
                    Timeframe::Daily => row.daily_time = 0,
                    Timeframe::Weekly => row.weekly_time = 0,
                    Timeframe::Monthly => row.monthly_time = 0,
                    Timeframe::Total => row.total_time = 0,
                }
                row.updated_at = SystemTime::now();
                touched += 1;
            }
            touched
        })
    }

    fn set_active_status_message(
        &self,
        channel_id: ChannelId,
        guild_id: GuildId,
        message_id: String,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.run("set_active_status_message", move |tables| {
            tables.active_messages.insert(
                channel_id,
                ActiveStatusMessageEntity {
                    channel_id,
                    guild_id,
                    message_id,
                    updated_at: SystemTime::now(),
                },
            );
        })
    }

    fn active_status_message(
        &self,
        channel_id: ChannelId,
    ) -> BoxFuture<'static, StorageResult<Option<String>>> {
        self.run("active_status_message", move |tables| {
            tables
                .active_messages
                .get(&channel_id)
                .map(|entry| entry.message_id.clone())
        })
    }

    fn delete_active_status_message(
        &self,
        channel_id: ChannelId,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.run("delete_active_status_message", move |tables| {
            tables.active_messages.remove(&channel_id);
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.run("health_check", |_| ())
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.run("try_reconnect", |_| ())
    }
}
