//! Schema migrations applied to a freshly isolated consumer schema.
//!
//! The [`Migrations`] trait is deliberately small so migration frameworks
//! can be adapted to it; the implementations here cover the common test
//! cases: none at all, inline statements, and a directory of `.sql` files.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio_postgres::Client;

use crate::daemon::BoxError;

/// Applies and rolls back schema migrations.
#[async_trait]
pub trait Migrations: Send + Sync {
    async fn up(&self, client: &Client) -> Result<(), BoxError>;
    async fn down(&self, client: &Client) -> Result<(), BoxError>;
}

/// No migrations at all.
pub struct NoMigrations;

#[async_trait]
impl Migrations for NoMigrations {
    async fn up(&self, _client: &Client) -> Result<(), BoxError> {
        Ok(())
    }

    async fn down(&self, _client: &Client) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Inline migration statements, applied in order.
pub struct SqlMigrations {
    up: Vec<String>,
    down: Vec<String>,
}

impl SqlMigrations {
    /// Up-only migrations; `down` rolls back nothing.
    pub fn new(up: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::with_down(up, Vec::<String>::new())
    }

    pub fn with_down(
        up: impl IntoIterator<Item = impl Into<String>>,
        down: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            up: up.into_iter().map(Into::into).collect(),
            down: down.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl Migrations for SqlMigrations {
    async fn up(&self, client: &Client) -> Result<(), BoxError> {
        for statement in &self.up {
            client.batch_execute(statement).await?;
        }
        Ok(())
    }

    async fn down(&self, client: &Client) -> Result<(), BoxError> {
        for statement in &self.down {
            client.batch_execute(statement).await?;
        }
        Ok(())
    }
}

/// Migrations read from a directory of `.sql` files.
///
/// Files named `*.up.sql` are applied by `up` in lexical order; files named
/// `*.down.sql` are applied by `down` in reverse lexical order. A plain
/// `*.sql` file counts as an up migration.
pub struct DirMigrations {
    dir: PathBuf,
}

impl DirMigrations {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl Migrations for DirMigrations {
    async fn up(&self, client: &Client) -> Result<(), BoxError> {
        for path in up_files(&self.dir)? {
            let sql = std::fs::read_to_string(&path)?;
            client.batch_execute(&sql).await?;
        }
        Ok(())
    }

    async fn down(&self, client: &Client) -> Result<(), BoxError> {
        let mut files = down_files(&self.dir)?;
        files.reverse();
        for path in files {
            let sql = std::fs::read_to_string(&path)?;
            client.batch_execute(&sql).await?;
        }
        Ok(())
    }
}

fn up_files(dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    sql_files(dir, |name| {
        name.ends_with(".up.sql") || (name.ends_with(".sql") && !name.ends_with(".down.sql"))
    })
}

fn down_files(dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    sql_files(dir, |name| name.ends_with(".down.sql"))
}

fn sql_files(dir: &Path, keep: impl Fn(&str) -> bool) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }

        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if keep(name) {
            files.push(entry.path());
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), "SELECT 1;").unwrap();
    }

    #[test]
    fn test_up_files_are_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "002_indexes.up.sql");
        touch(dir.path(), "001_users.up.sql");
        touch(dir.path(), "001_users.down.sql");
        touch(dir.path(), "notes.txt");

        let files = up_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|path| path.file_name().unwrap().to_str().unwrap().to_owned())
            .collect();
        assert_eq!(names, ["001_users.up.sql", "002_indexes.up.sql"]);
    }

    #[test]
    fn test_plain_sql_counts_as_up() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "schema.sql");

        let files = up_files(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_down_files_only_match_down_suffix() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "001_users.up.sql");
        touch(dir.path(), "001_users.down.sql");

        let files = down_files(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
    }
}
