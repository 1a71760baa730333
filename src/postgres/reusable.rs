//! Per-consumer schema isolation on top of a shared Postgres container.
//!
//! Every [`run`](ReusablePostgres::run) call carves a fresh schema out of
//! the shared database, points a dedicated client at it via `search_path`,
//! applies the consumer's migrations and initial queries, and hands back a
//! [`PostgresHandle`]. Consumers therefore share one server but never see
//! each other's tables. Schema names come from a monotonic counter and are
//! never reused within the process; tearing down the shared container drops
//! them all transitively.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::postgres::container::{PostgresContainer, Session};
use crate::postgres::query::{exec_query, Query};
use crate::postgres::{Migrations, PostgresError};
use crate::reusable::{Creator, Release, Reusable, ReusableError};

/// A shared Postgres container with per-consumer schema isolation.
pub struct ReusablePostgres<C: Creator> {
    inner: Reusable<C>,
    schema_counter: AtomicI64,
}

impl<C> ReusablePostgres<C>
where
    C: Creator,
    C::Output: PostgresContainer,
{
    pub fn new(creator: C) -> Self {
        Self {
            inner: Reusable::new(creator),
            schema_counter: AtomicI64::new(0),
        }
    }

    pub fn with_quiet_period(creator: C, quiet_period: Duration) -> Self {
        Self {
            inner: Reusable::with_quiet_period(creator, quiet_period),
            schema_counter: AtomicI64::new(0),
        }
    }

    /// Enters the shared container and prepares an isolated consumer view.
    ///
    /// # Arguments
    ///
    /// * `ctx` - forwarded to the creator when this call triggers the
    ///   creation of a fresh container generation
    /// * `migrations` - applied to the new schema when present
    /// * `initial_queries` - executed in order after the migrations
    ///
    /// # Errors
    ///
    /// Any failure after the shared container was entered releases the
    /// consumer's user count before returning, so the caller never has to
    /// clean up a failed run.
    pub async fn run(
        &self,
        ctx: CancellationToken,
        migrations: Option<&dyn Migrations>,
        initial_queries: &[Query],
    ) -> Result<PostgresHandle, PostgresError> {
        let (container, release) = self.inner.run(ctx).await?;

        match self
            .isolate(container.as_ref(), migrations, initial_queries)
            .await
        {
            Ok(session) => Ok(PostgresHandle { session, release }),
            Err(error) => {
                release.release().await;
                Err(error)
            }
        }
    }

    /// Tears the shared container down, bounded by `ctx`.
    pub async fn terminate(&self, ctx: CancellationToken) -> Result<(), ReusableError> {
        self.inner.terminate(ctx).await
    }

    async fn isolate(
        &self,
        container: &C::Output,
        migrations: Option<&dyn Migrations>,
        initial_queries: &[Query],
    ) -> Result<Session, PostgresError> {
        let schema = self.create_schema(container).await?;

        let mut config = container.config();
        config.options(format!("-c search_path={schema}").as_str());
        let session = Session::open(&config).await?;

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
            Ok(()) => Ok(session),
            Err(error) => {
                session.close();
                Err(error)
            }
        }
    }

    /// Creates the next consumer schema through a short-lived session
    /// against the default database.
    async fn create_schema(&self, container: &C::Output) -> Result<String, PostgresError> {
        let schema = schema_name(self.schema_counter.fetch_add(1, Ordering::Relaxed) + 1);

        let session = Session::open(&container.config()).await?;
        let created = session
            .client
            .batch_execute(&format!("CREATE SCHEMA {schema}"))
            .await;
        session.close();

        created.map_err(|source| PostgresError::CreateSchema {
            schema: schema.clone(),
            source,
        })?;
        Ok(schema)
    }
}

/// Schema names stay valid identifiers for any counter value.
fn schema_name(sequence: i64) -> String {
    format!("public{sequence}")
}

/// An isolated consumer view of the shared database.
pub struct PostgresHandle {
    session: Session,
    release: Release,
}

impl std::fmt::Debug for PostgresHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresHandle").finish_non_exhaustive()
    }
}

impl PostgresHandle {
    /// The client connected to this consumer's schema.
    pub fn client(&self) -> &tokio_postgres::Client {
        &self.session.client
    }

    /// Closes the client and releases the shared container.
    pub async fn release(self) {
        self.session.close();
        self.release.release().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_names_are_valid_identifiers() {
        for sequence in [1, 2, 42, i64::MAX] {
            let name = schema_name(sequence);
            assert!(name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_'));
            assert!(name.starts_with("public"));
        }
    }

    #[test]
    fn test_schema_names_are_unique_per_sequence() {
        assert_ne!(schema_name(1), schema_name(2));
    }
}
