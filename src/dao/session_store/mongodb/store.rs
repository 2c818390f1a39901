use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{Bson, DateTime, Document, doc},
    options::IndexOptions,
};
use tokio::sync::RwLock;

use super::{
    config::MongoConfig,
    connection::open,
    error::{MongoDaoError, MongoResult},
    models::{
        ACTIVE_MESSAGE_COLLECTION, ActiveMessageDocument, GUILD_CONFIG_COLLECTION,
        GUILD_STATS_COLLECTION, GuildConfigDocument, GuildStatsDocument, SESSION_LOG_COLLECTION,
        SessionLogDocument, parse_id,
    },
};
use crate::{
    dao::{
        models::{
            GuildConfigEntity, GuildConfigUpdate, GuildStatsEntity, LeaderboardEntry,
            SessionLogEntity, Timeframe, UserAggregate,
        },
        session_store::SessionStore,
        storage::StorageResult,
    },
    state::room::{ChannelId, GuildId, UserId},
};

/// Session store persisted in MongoDB, reconnectable in place.
#[derive(Clone)]
pub struct MongoSessionStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) = open(&self.config).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoSessionStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) = open(&config).await?;

        let store = Self {
            inner: Arc::new(MongoInner {
                state: RwLock::new(MongoState { client, database }),
                config,
            }),
        };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;

        // One aggregate row per (guild, member); the upsert relies on it.
        let stats_index = IndexModel::builder()
            .keys(doc! { "guild_id": 1, "user_id": 1 })
            .options(
                IndexOptions::builder()
                    .name(Some("guild_user_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();
        database
            .collection::<Document>(GUILD_STATS_COLLECTION)
            .create_index(stats_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: GUILD_STATS_COLLECTION,
                index: "guild_id,user_id",
                source,
            })?;

        let log_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "created_at": -1 })
            .options(
                IndexOptions::builder()
                    .name(Some("user_created_idx".to_owned()))
                    .build(),
            )
            .build();
        database
            .collection::<Document>(SESSION_LOG_COLLECTION)
            .create_index(log_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: SESSION_LOG_COLLECTION,
                index: "user_id,created_at",
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn stats_collection(&self) -> Collection<GuildStatsDocument> {
        self.database().await.collection(GUILD_STATS_COLLECTION)
    }

    async fn config_collection(&self) -> Collection<GuildConfigDocument> {
        self.database().await.collection(GUILD_CONFIG_COLLECTION)
    }

    async fn message_collection(&self) -> Collection<ActiveMessageDocument> {
        self.database().await.collection(ACTIVE_MESSAGE_COLLECTION)
    }

    async fn log_session(&self, log: SessionLogEntity) -> MongoResult<()> {
        let user_id = log.user_id;
        let document = SessionLogDocument::from(log);
        self.database()
            .await
            .collection::<SessionLogDocument>(SESSION_LOG_COLLECTION)
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::LogSession { user_id, source })?;
        Ok(())
    }

    async fn increment_aggregate(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        minutes: u32,
    ) -> MongoResult<()> {
        let minutes = i64::from(minutes);
        self.stats_collection()
            .await
            .update_one(
                doc! { "guild_id": guild_id.to_string(), "user_id": user_id.to_string() },
                doc! {
                    "$inc": {
                        "daily_time": minutes,
                        "weekly_time": minutes,
                        "monthly_time": minutes,
                        "total_time": minutes,
                    },
                    "$set": { "updated_at": DateTime::now() },
                },
            )
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::IncrementAggregate {
                guild_id,
                user_id,
                source,
            })?;
        Ok(())
    }

    async fn aggregate_top(
        &self,
        guild_id: GuildId,
        timeframe: Timeframe,
        limit: usize,
    ) -> MongoResult<Vec<LeaderboardEntry>> {
        let column = timeframe.column();
        let map_err = |source: mongodb::error::Error| MongoDaoError::Leaderboard {
            guild_id,
            timeframe: column,
            source,
        };

        let documents: Vec<GuildStatsDocument> = self
            .stats_collection()
            .await
            .aggregate(leaderboard_pipeline(guild_id, column, limit))
            .with_type::<GuildStatsDocument>()
            .await
            .map_err(map_err)?
            .try_collect()
            .await
            .map_err(map_err)?;

        documents
            .into_iter()
            .map(|document| {
                Ok(LeaderboardEntry {
                    minutes: document.minutes(timeframe),
                    user_id: parse_id(GUILD_STATS_COLLECTION, &document.user_id)?,
                })
            })
            .collect()
    }

    async fn user_aggregate(&self, user_id: UserId) -> MongoResult<Option<UserAggregate>> {
        let map_err = |source: mongodb::error::Error| MongoDaoError::UserAggregate { user_id, source };
        let documents: Vec<GuildStatsDocument> = self
            .stats_collection()
            .await
            .find(doc! { "user_id": user_id.to_string() })
            .await
            .map_err(map_err)?
            .try_collect()
            .await
            .map_err(map_err)?;

        if documents.is_empty() {
            return Ok(None);
        }

        let mut sum = UserAggregate::default();
        for document in documents {
            let row = GuildStatsEntity::try_from(document)?;
            sum = sum.accumulate(&row);
        }
        Ok(Some(sum))
    }

    async fn group_config(&self, guild_id: GuildId) -> MongoResult<Option<GuildConfigEntity>> {
        self.config_collection()
            .await
            .find_one(doc! { "_id": guild_id.to_string() })
            .await
            .map_err(|source| MongoDaoError::LoadConfig { guild_id, source })?
            .map(GuildConfigEntity::try_from)
            .transpose()
    }

    async fn update_group_config(
        &self,
        guild_id: GuildId,
        update: GuildConfigUpdate,
    ) -> MongoResult<()> {
        let (set, set_on_insert) = config_update_documents(&update);
        let mut changes = doc! { "$set": set };
        if !set_on_insert.is_empty() {
            changes.insert("$setOnInsert", set_on_insert);
        }

        self.config_collection()
            .await
            .update_one(doc! { "_id": guild_id.to_string() }, changes)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::UpdateConfig { guild_id, source })?;
        Ok(())
    }

    async fn reset_aggregate_window(
        &self,
        guild_id: Option<GuildId>,
        timeframe: Timeframe,
    ) -> MongoResult<u64> {
        let filter = match guild_id {
            Some(guild_id) => doc! { "guild_id": guild_id.to_string() },
            None => Document::new(),
        };
        let result = self
            .stats_collection()
            .await
            .update_many(
                filter,
                doc! { "$set": { timeframe.column(): 0_i64, "updated_at": DateTime::now() } },
            )
            .await
            .map_err(|source| MongoDaoError::ResetWindow {
                timeframe: timeframe.column(),
                source,
            })?;
        Ok(result.matched_count)
    }

    async fn set_active_status_message(
        &self,
        channel_id: ChannelId,
        guild_id: GuildId,
        message_id: String,
    ) -> MongoResult<()> {
        let document = ActiveMessageDocument {
            channel_id: channel_id.to_string(),
            guild_id: guild_id.to_string(),
            message_id,
            updated_at: DateTime::now(),
        };
        self.message_collection()
            .await
            .replace_one(doc! { "_id": document.channel_id.as_str() }, &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::StatusMessage { channel_id, source })?;
        Ok(())
    }

    async fn active_status_message(&self, channel_id: ChannelId) -> MongoResult<Option<String>> {
        let document = self
            .message_collection()
            .await
            .find_one(doc! { "_id": channel_id.to_string() })
            .await
            .map_err(|source| MongoDaoError::StatusMessage { channel_id, source })?;
        Ok(document.map(|document| document.message_id))
    }

    async fn delete_active_status_message(&self, channel_id: ChannelId) -> MongoResult<()> {
        self.message_collection()
            .await
            .delete_one(doc! { "_id": channel_id.to_string() })
            .await
            .map_err(|source| MongoDaoError::StatusMessage { channel_id, source })?;
        Ok(())
    }
}

/// Split a partial update into the `$set` fields and the defaults written only
/// when the row is created. A field may not appear in both.
fn config_update_documents(update: &GuildConfigUpdate) -> (Document, Document) {
    let mut set = doc! { "updated_at": DateTime::now() };
    let mut set_on_insert = Document::new();

    let channels = [
        ("study_channel_id", update.study_channel_id),
        ("report_channel_id", update.report_channel_id),
        ("welcome_channel_id", update.welcome_channel_id),
    ];
    for (field, value) in channels {
        match value {
            Some(channel) => set.insert(field, channel.to_string()),
            None => set_on_insert.insert(field, Bson::Null),
        };
    }

    match &update.welcome_message {
        Some(Some(message)) => set.insert("welcome_message", message.as_str()),
        Some(None) => set.insert("welcome_message", Bson::Null),
        None => set_on_insert.insert("welcome_message", Bson::Null),
    };

    match update.welcome_enabled {
        Some(enabled) => set.insert("welcome_enabled", enabled),
        None => set_on_insert.insert("welcome_enabled", false),
    };

    (set, set_on_insert)
}

impl SessionStore for MongoSessionStore {
    fn log_session(&self, log: SessionLogEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.log_session(log).await.map_err(Into::into) })
    }

    fn increment_aggregate(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        minutes: u32,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .increment_aggregate(guild_id, user_id, minutes)
                .await
                .map_err(Into::into)
        })
    }

    fn aggregate_top(
        &self,
        guild_id: GuildId,
        timeframe: Timeframe,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<LeaderboardEntry>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .aggregate_top(guild_id, timeframe, limit)
                .await
                .map_err(Into::into)
        })
    }

    fn user_aggregate(&self, user_id: UserId) -> BoxFuture<'static, StorageResult<Option<UserAggregate>>> {
        let store = self.clone();
        Box::pin(async move { store.user_aggregate(user_id).await.map_err(Into::into) })
    }

    fn group_config(
        &self,
        guild_id: GuildId,
    ) -> BoxFuture<'static, StorageResult<Option<GuildConfigEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.group_config(guild_id).await.map_err(Into::into) })
    }

    fn update_group_config(
        &self,
        guild_id: GuildId,
        update: GuildConfigUpdate,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .update_group_config(guild_id, update)
                .await
                .map_err(Into::into)
        })
    }

    fn reset_aggregate_window(
        &self,
        guild_id: Option<GuildId>,
        timeframe: Timeframe,
    ) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .reset_aggregate_window(guild_id, timeframe)
                .await
                .map_err(Into::into)
        })
    }

    fn set_active_status_message(
        &self,
        channel_id: ChannelId,
        guild_id: GuildId,
        message_id: String,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .set_active_status_message(channel_id, guild_id, message_id)
                .await
                .map_err(Into::into)
        })
    }

    fn active_status_message(
        &self,
        channel_id: ChannelId,
    ) -> BoxFuture<'static, StorageResult<Option<String>>> {
        let store = self.clone();
        Box::pin(async move { store.active_status_message(channel_id).await.map_err(Into::into) })
    }

    fn delete_active_status_message(
        &self,
        channel_id: ChannelId,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .delete_active_status_message(channel_id)
                .await
                .map_err(Into::into)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}

const RANK_KEY: &str = "user_rank";

/// Top rows of one window column, ties ranked by the numeric user id.
///
/// Ids are stored as decimal strings, so sorting on them directly would put
/// `"10"` before `"9"`.
fn leaderboard_pipeline(guild_id: GuildId, column: &'static str, limit: usize) -> Vec<Document> {
    vec![
        doc! { "$match": { "guild_id": guild_id.to_string(), column: { "$gt": 0 } } },
        doc! { "$addFields": { RANK_KEY: { "$toLong": "$user_id" } } },
        doc! { "$sort": { column: -1, RANK_KEY: 1 } },
        doc! { "$limit": i64::try_from(limit).unwrap_or(i64::MAX) },
        doc! { "$unset": RANK_KEY },
    ]
}
