use mongodb::error::Error as MongoError;
use thiserror::Error;

/// Result alias for MongoDB operations.
pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Failure of a MongoDB call, tagged with the operation that made it.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    /// The connection string could not be parsed.
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    /// The driver rejected the options.
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    /// The server did not answer when connecting.
    #[error("MongoDB did not answer the initial ping")]
    InitialPing {
        #[source]
        source: MongoError,
    },
    /// A periodic ping failed.
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    /// An index could not be created.
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    /// Appending a session log failed.
    #[error("failed to append session log for user `{user_id}`")]
    LogSession {
        user_id: u64,
        #[source]
        source: MongoError,
    },
    /// The counter upsert failed.
    #[error("failed to increment aggregate for user `{user_id}` in guild `{guild_id}`")]
    IncrementAggregate {
        guild_id: u64,
        user_id: u64,
        #[source]
        source: MongoError,
    },
    /// The leaderboard aggregation failed.
    #[error("failed to load `{timeframe}` leaderboard of guild `{guild_id}`")]
    Leaderboard {
        guild_id: u64,
        timeframe: &'static str,
        #[source]
        source: MongoError,
    },
    /// Summing a user's rows failed.
    #[error("failed to load aggregate of user `{user_id}`")]
    UserAggregate {
        user_id: u64,
        #[source]
        source: MongoError,
    },
    /// Zeroing a window failed.
    #[error("failed to reset `{timeframe}` window")]
    ResetWindow {
        timeframe: &'static str,
        #[source]
        source: MongoError,
    },
    /// Reading a guild configuration failed.
    #[error("failed to load configuration of guild `{guild_id}`")]
    LoadConfig {
        guild_id: u64,
        #[source]
        source: MongoError,
    },
    /// Writing a guild configuration failed.
    #[error("failed to update configuration of guild `{guild_id}`")]
    UpdateConfig {
        guild_id: u64,
        #[source]
        source: MongoError,
    },
    /// Reading or writing a status message pointer failed.
    #[error("failed to access status message pointer of channel `{channel_id}`")]
    StatusMessage {
        channel_id: u64,
        #[source]
        source: MongoError,
    },
    /// A stored id is not a decimal snowflake.
    #[error("stored document in `{collection}` holds an invalid identifier `{value}`")]
    CorruptIdentifier {
        collection: &'static str,
        value: String,
    },
}
