//! Document store
//!
//! SQLite-backed collections of JSON documents. Handles connection pooling,
//! embedded migrations and typed collection access.

mod collection;
mod error;
mod filter;

pub use collection::{Collection, Document, Record};
pub use error::StoreError;
pub use filter::{FieldValue, Filter, Page, Sort};
pub(crate) use filter::field_expr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Connection pool shared by every collection
#[derive(Clone, Debug)]
pub struct Database {
    pool: SqlitePool,
}

/// File path behind a `sqlite:` URL, `None` for in-memory databases
fn database_file(url: &str) -> Option<&str> {
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url);
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() || path.contains(":memory:") {
        None
    } else {
        Some(path)
    }
}

impl Database {
    /// Open a connection pool and run migrations
    ///
    /// # Arguments
    /// * `url` - SQLite URL (`sqlite:data/enem.db`, `sqlite::memory:`)
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let file = database_file(url);

        if let Some(parent) = file.and_then(|f| Path::new(f).parent()) {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Migration(format!("Failed to create db directory: {}", e))
                })?;
            }
        }

        let connection_string = if url.starts_with("sqlite:") {
            url.to_string()
        } else {
            format!("sqlite:{}", url)
        };

        let options = SqliteConnectOptions::from_str(&connection_string)?.create_if_missing(true);

        // Every in-memory connection is a separate database, so pin a single one.
        let pool_options = if file.is_none() {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options.connect_with(options).await?;
        info!("Connected to SQLite database at: {}", url);

        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Fresh in-memory database with migrations applied
    pub async fn in_memory() -> Result<Self, StoreError> {
        Self::connect("sqlite::memory:").await
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        info!("Running database migrations...");

        let migration_sql = include_str!("../../migrations/001_create_collections.sql");

        let mut cleaned_sql = String::new();
        for line in migration_sql.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with("--") {
                continue;
            }
            cleaned_sql.push_str(trimmed);
            cleaned_sql.push(' ');
        }

        let statements = cleaned_sql
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty());

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    StoreError::Migration(format!(
                        "{} - Statement: {}",
                        e,
                        statement.chars().take(100).collect::<String>()
                    ))
                })?;
        }

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Typed handle to the collection of `T`
    pub fn collection<T: Document>(&self) -> Collection<T> {
        Collection::new(self.pool.clone())
    }

    /// Start a transaction spanning several collections
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, StoreError> {
        Ok(self.pool.begin().await?)
    }

    /// Underlying pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close every pooled connection; later queries fail
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
