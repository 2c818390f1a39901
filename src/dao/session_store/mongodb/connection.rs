use mongodb::{Client, Database, bson::doc};
use tracing::debug;

use super::{
    config::MongoConfig,
    error::{MongoDaoError, MongoResult},
};

/// Build a client and check the server answers.
///
/// Fails fast within the configured server selection timeout; retrying is the
/// storage supervisor's job.
pub async fn open(config: &MongoConfig) -> MongoResult<(Client, Database)> {
    let client = Client::with_options(config.options.clone())
        .map_err(|source| MongoDaoError::ClientConstruction { source })?;
    let database = client.database(&config.database_name);

    database
        .run_command(doc! { "ping": 1 })
        .await
        .map_err(|source| MongoDaoError::InitialPing { source })?;
    debug!(database = %config.database_name, "document store answered initial ping");

    Ok((client, database))
}
