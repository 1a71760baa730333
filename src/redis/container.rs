//! The contract a shared Redis backend fulfils, plus the seeding helper
//! shared by the adapters in this module.

use redis::aio::MultiplexedConnection;

use crate::daemon::Resource;
use crate::redis::{Entry, RedisError};

/// A shared Redis backend the daemon can own.
pub trait RedisContainer: Resource {
    /// Connection URL, e.g. `redis://localhost:6379`.
    fn url(&self) -> String;
}

/// Connects to the backend and writes the declared entries.
///
/// Seeding is idempotent: `SET NX` only creates keys that are missing, so
/// concurrent consumers declaring the same entry cannot clobber each other.
pub(crate) async fn connect_and_seed(
    url: &str,
    entries: &[Entry],
) -> Result<MultiplexedConnection, RedisError> {
    let client = redis::Client::open(url).map_err(RedisError::Connect)?;
    let mut connection = client
        .get_multiplexed_async_connection()
        .await
        .map_err(RedisError::Connect)?;

    for entry in entries {
        let _: redis::Value = redis::cmd("SET")
            .arg(&entry.key)
            .arg(&entry.value)
            .arg("NX")
            .query_async(&mut connection)
            .await
            .map_err(|source| RedisError::SetEntry {
                key: entry.key.clone(),
                source,
            })?;
    }

    Ok(connection)
}
