//! One-shot Postgres entry points.
//!
//! Unlike [`ReusablePostgres`](crate::postgres::ReusablePostgres), these
//! give the caller a dedicated server: no schema isolation, no sharing, and
//! the release terminates the backend directly. Handy for tests that mutate
//! server-level state.

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::daemon::Resource;
use crate::postgres::container::{PostgresContainer, Session};
use crate::postgres::external::{ExternalConfig, ExternalCreator, ExternalPostgres};
use crate::postgres::query::{exec_query, Query};
use crate::postgres::runtime::{RuntimeConfig, RuntimeCreator, RuntimePostgres};
use crate::postgres::{Migrations, PostgresError};
use crate::reusable::Creator;

/// Starts a dedicated Postgres container and prepares its default database.
pub async fn run(
    ctx: CancellationToken,
    migrations: Option<&dyn Migrations>,
    initial_queries: &[Query],
) -> Result<OwnedPostgres<RuntimePostgres>, PostgresError> {
    run_config(ctx, RuntimeConfig::default(), migrations, initial_queries).await
}

/// [`run`] with explicit container settings.
pub async fn run_config(
    ctx: CancellationToken,
    config: RuntimeConfig,
    migrations: Option<&dyn Migrations>,
    initial_queries: &[Query],
) -> Result<OwnedPostgres<RuntimePostgres>, PostgresError> {
    let container = RuntimeCreator::with_config(config)
        .create(ctx)
        .await
        .map_err(PostgresError::CreateContainer)?;
    init_container(container, migrations, initial_queries).await
}

/// Connects to an externally managed server and prepares its database.
pub async fn use_external(
    ctx: CancellationToken,
    migrations: Option<&dyn Migrations>,
    initial_queries: &[Query],
) -> Result<OwnedPostgres<ExternalPostgres>, PostgresError> {
    let container = ExternalCreator::new()
        .create(ctx)
        .await
        .map_err(PostgresError::CreateContainer)?;
    init_container(container, migrations, initial_queries).await
}

/// [`use_external`] with an explicit connection string.
pub async fn use_external_config(
    ctx: CancellationToken,
    config: ExternalConfig,
    migrations: Option<&dyn Migrations>,
    initial_queries: &[Query],
) -> Result<OwnedPostgres<ExternalPostgres>, PostgresError> {
    let container = ExternalCreator::with_config(config)
        .create(ctx)
        .await
        .map_err(PostgresError::CreateContainer)?;
    init_container(container, migrations, initial_queries).await
}

/// Connects to `container`'s default database, applies migrations and
/// initial queries, and wraps everything into an [`OwnedPostgres`].
pub async fn init_container<R: PostgresContainer>(
    container: R,
    migrations: Option<&dyn Migrations>,
    initial_queries: &[Query],
) -> Result<OwnedPostgres<R>, PostgresError> {
    let session = match Session::open(&container.config()).await {
        Ok(session) => session,
        Err(error) => {
            terminate_quietly(&container).await;
            return Err(error);
        }
    };

    let seeded = async {
        if let Some(migrations) = migrations {
            migrations
                .up(&session.client)
                .await
                .map_err(PostgresError::Migrations)?;
        }

        for query in initial_queries {
            exec_query(&session.client, query).await?;
        }
        Ok(())
    }
    .await;

    match seeded {
        Ok(()) => Ok(OwnedPostgres { session, container }),
        Err(error) => {
            session.close();
            terminate_quietly(&container).await;
            Err(error)
        }
    }
}

async fn terminate_quietly<R: PostgresContainer>(container: &R) {
    if let Err(error) = container.terminate().await {
        warn!("failed to terminate postgres container: {error}");
    }
}

/// A dedicated Postgres backend owned by a single consumer.
pub struct OwnedPostgres<R: PostgresContainer> {
    session: Session,
    container: R,
}

impl<R: PostgresContainer> OwnedPostgres<R> {
    /// The client connected to the default database.
    pub fn client(&self) -> &tokio_postgres::Client {
        &self.session.client
    }

    /// Closes the client and terminates the backend.
    pub async fn release(self) {
        self.session.close();
        terminate_quietly(&self.container).await;
    }
}
