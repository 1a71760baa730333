//! The contract a shared Postgres backend fulfils, plus the connection
//! plumbing shared by the adapters in this module.

use tokio::task::JoinHandle;
use tokio_postgres::{Client, Config, NoTls};
use tracing::debug;

use crate::daemon::Resource;
use crate::postgres::PostgresError;

/// A shared Postgres backend the daemon can own.
///
/// Implementations describe how to reach the server; teardown comes from
/// the [`Resource`] supertrait (a no-op for externally managed servers).
pub trait PostgresContainer: Resource {
    /// Base connection parameters for the default database, without any
    /// per-consumer `search_path`.
    fn config(&self) -> Config;
}

/// A client plus the task driving its connection.
///
/// `tokio-postgres` splits a session into a `Client` and a `Connection`
/// future that must be polled for the client to make progress; the driver
/// task is that future. Dropping the client ends the session and the task.
pub(crate) struct Session {
    pub(crate) client: Client,
    pub(crate) driver: JoinHandle<()>,
}

impl Session {
    pub(crate) async fn open(config: &Config) -> Result<Self, PostgresError> {
        let (client, connection) = config.connect(NoTls).await.map_err(PostgresError::Connect)?;

        let driver = tokio::spawn(async move {
            if let Err(error) = connection.await {
                debug!("postgres connection closed: {error}");
            }
        });

        Ok(Self { client, driver })
    }

    /// Closes the session, aborting the driver task.
    pub(crate) fn close(self) {
        drop(self.client);
        self.driver.abort();
    }
}
