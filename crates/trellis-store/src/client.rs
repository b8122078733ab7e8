//! SQLite connection management and the shared graph store handle.

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tokio::task::JoinHandle;

use crate::schema;

/// Errors from graph store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite connection error: {0}")]
    Connection(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cannot delete root node")]
    RootDelete,

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Configuration for opening the graph database.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// SQLite URL, e.g. `sqlite://trellis.db` or `sqlite::memory:`.
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    /// A write transaction still open after this many seconds is logged
    /// as a suspected leak.
    pub busy_warn_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            max_connections: 16,
            acquire_timeout_secs: 5,
            busy_warn_secs: 5,
        }
    }
}

/// Thread-safe handle to the graph database with connection pooling.
///
/// This is the single point of access for all graph state. Clone is cheap
/// (inner pool is an Arc).
#[derive(Clone)]
pub struct GraphStore {
    pool: SqlitePool,
    busy_warn: Duration,
}

impl GraphStore {
    /// Open the database with the given configuration.
    ///
    /// Creates the file and schema on first use and seeds the root node.
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let memory = config.url.contains(":memory:");

        let mut options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| StoreError::Connection(e.to_string()))?
            .create_if_missing(true)
            .foreign_keys(true);
        if !memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        // Every pooled `:memory:` connection opens its own empty database,
        // so an in-memory store must never grow past one connection, and
        // that connection must never be recycled.
        let max_connections = if memory { 1 } else { config.max_connections };

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs));
        if memory {
            pool_options = pool_options
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options.connect_with(options).await?;
        schema::init(&pool).await?;

        tracing::info!(url = %config.url, max_connections, "Connected to SQLite");
        Ok(Self {
            pool,
            busy_warn: Duration::from_secs(config.busy_warn_secs),
        })
    }

    /// Get a reference to the underlying pool for direct reads.
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Begin a write transaction.
    ///
    /// The returned guard commits explicitly and rolls back on drop. A
    /// watchdog logs a warning if the transaction is still open after the
    /// configured busy threshold.
    pub(crate) async fn begin(&self) -> Result<WriteGuard<'_>> {
        let tx = self.pool.begin().await?;
        let warn_after = self.busy_warn;
        let watchdog = tokio::spawn(async move {
            tokio::time::sleep(warn_after).await;
            tracing::warn!(
                held_secs = warn_after.as_secs(),
                "A write transaction has been open past the busy threshold"
            );
        });
        Ok(WriteGuard {
            tx,
            _watchdog: Watchdog(watchdog),
        })
    }
}

/// An open write transaction plus its leak watchdog.
///
/// Dropping the guard without [`WriteGuard::commit`] rolls the transaction
/// back and cancels the watchdog, so every exit path releases the
/// connection back to the pool.
pub(crate) struct WriteGuard<'a> {
    pub(crate) tx: Transaction<'a, Sqlite>,
    _watchdog: Watchdog,
}

impl WriteGuard<'_> {
    pub(crate) async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

struct Watchdog(JoinHandle<()>);

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.0.abort();
    }
}
