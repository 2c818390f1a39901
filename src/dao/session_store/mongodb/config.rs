use std::time::Duration;

use mongodb::options::ClientOptions;

use super::error::{MongoDaoError, MongoResult};
use crate::config::StoreConfig;

const DEFAULT_DB: &str = "pomora";

/// Connection settings of the MongoDB store.
#[derive(Clone)]
pub struct MongoConfig {
    /// Driver options, pool bounds included.
    pub options: ClientOptions,
    /// Database holding every collection.
    pub database_name: String,
}

impl MongoConfig {
    /// Parse the connection string and apply the pool bounds from the store configuration.
    pub async fn from_uri(
        uri: &str,
        db_name: Option<&str>,
        store: &StoreConfig,
    ) -> MongoResult<Self> {
        let database_name = db_name.unwrap_or(DEFAULT_DB).to_owned();
        let mut options =
            ClientOptions::parse(uri)
                .await
                .map_err(|source| MongoDaoError::InvalidUri {
                    uri: uri.to_owned(),
                    source,
                })?;

        options.max_pool_size = Some(store.max_pool_size);
        options.connect_timeout = Some(Duration::from_secs(store.connect_timeout_secs));
        options.server_selection_timeout = Some(Duration::from_secs(store.connect_timeout_secs));
        options.max_idle_time = Some(Duration::from_secs(store.idle_timeout_secs));

        Ok(Self {
            options,
            database_name,
        })
    }
}
