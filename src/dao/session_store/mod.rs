pub mod memory;
/// MongoDB-backed store.
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{
    GuildConfigEntity, GuildConfigUpdate, LeaderboardEntry, SessionLogEntity, Timeframe,
    UserAggregate,
};
use crate::dao::storage::StorageResult;
use crate::state::room::{ChannelId, GuildId, UserId};
use futures::future::BoxFuture;

pub use memory::MemorySessionStore;

/// Abstraction over the durable store for session logs, aggregates, guild
/// configuration and status message pointers.
///
/// Every call is independent and short-lived; implementations must tolerate
/// many interleaved calls coming from unrelated rooms.
pub trait SessionStore: Send + Sync {
    /// Append one immutable session record.
    fn log_session(&self, log: SessionLogEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Add `minutes` to the daily, weekly, monthly and total counters in one atomic upsert.
    fn increment_aggregate(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        minutes: u32,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Highest non-zero counters of a guild for the window, best first.
    fn aggregate_top(
        &self,
        guild_id: GuildId,
        timeframe: Timeframe,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<LeaderboardEntry>>>;
    /// Sum of a user's counters across every guild, `None` when the user has no rows.
    fn user_aggregate(&self, user_id: UserId) -> BoxFuture<'static, StorageResult<Option<UserAggregate>>>;
    /// Stored configuration of a guild, `None` when never configured.
    fn group_config(
        &self,
        guild_id: GuildId,
    ) -> BoxFuture<'static, StorageResult<Option<GuildConfigEntity>>>;
    /// Insert-with-defaults then patch the fields present in `update`.
    /// Apply a partial update, creating the row with defaults first if needed.
    fn update_group_config(
        &self,
        guild_id: GuildId,
        update: GuildConfigUpdate,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Zero one window column, for one guild or for every guild when `guild_id` is `None`.
    /// Zero one window for a guild, or every guild when `guild_id` is `None`.
    /// Returns the number of rows touched.
    fn reset_aggregate_window(
        &self,
        guild_id: Option<GuildId>,
        timeframe: Timeframe,
    ) -> BoxFuture<'static, StorageResult<u64>>;
    /// Point the channel at the status message to edit from now on.
    fn set_active_status_message(
        &self,
        channel_id: ChannelId,
        guild_id: GuildId,
        message_id: String,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Status message currently edited in place for the channel.
    fn active_status_message(
        &self,
        channel_id: ChannelId,
    ) -> BoxFuture<'static, StorageResult<Option<String>>>;
    /// Forget the channel's status message pointer.
    fn delete_active_status_message(
        &self,
        channel_id: ChannelId,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Cheap round trip proving the backend answers.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Rebuild the connection after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
