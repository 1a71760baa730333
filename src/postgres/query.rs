//! Initial queries: literal SQL or the output of a query builder.
//!
//! Consumers seed their schema by passing queries to
//! [`ReusablePostgres::run`](crate::postgres::ReusablePostgres::run). A
//! query is either a raw statement executed verbatim or a [`BuildQuery`]
//! whose `build` produces parameterised SQL, so builder crates can be
//! plugged in without this module knowing about them.

use tokio_postgres::types::ToSql;
use tokio_postgres::Client;

use crate::daemon::BoxError;
use crate::postgres::PostgresError;

/// Parameter list produced by a [`BuildQuery`].
pub type SqlParams = Vec<Box<dyn ToSql + Send + Sync>>;

/// A builder that renders itself into SQL plus parameters.
pub trait BuildQuery: Send + Sync {
    /// Produces the statement and its parameters.
    fn build(&self) -> Result<(String, SqlParams), BoxError>;
}

/// An initial query to run against a freshly isolated schema.
pub enum Query {
    /// A literal statement, executed verbatim.
    Raw(String),
    /// A builder rendered at execution time.
    Built(Box<dyn BuildQuery>),
}

impl Query {
    /// A literal statement.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::Raw(sql.into())
    }

    /// A built statement.
    pub fn built(builder: impl BuildQuery + 'static) -> Self {
        Self::Built(Box::new(builder))
    }
}

impl From<&str> for Query {
    fn from(sql: &str) -> Self {
        Self::Raw(sql.to_owned())
    }
}

impl From<String> for Query {
    fn from(sql: String) -> Self {
        Self::Raw(sql)
    }
}

pub(crate) async fn exec_query(client: &Client, query: &Query) -> Result<(), PostgresError> {
    match query {
        Query::Raw(sql) => {
            client
                .batch_execute(sql)
                .await
                .map_err(|source| PostgresError::ExecQuery {
                    query: sql.clone(),
                    source,
                })
        }
        Query::Built(builder) => {
            let (sql, params) = builder.build().map_err(PostgresError::BuildQuery)?;
            let params: Vec<&(dyn ToSql + Sync)> = params
                .iter()
                .map(|param| &**param as &(dyn ToSql + Sync))
                .collect();

            client
                .execute(sql.as_str(), &params)
                .await
                .map_err(|source| PostgresError::ExecQuery { query: sql, source })?;
            Ok(())
        }
    }
}
