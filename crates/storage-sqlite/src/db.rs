//! Connection pool, write serialization and embedded migrations.
//!
//! Reads go through an r2d2 pool. All writes run on a single dedicated
//! connection behind [`WriteHandle`], hopped onto the blocking thread pool,
//! which serializes them the way a browser-style single-threaded runtime
//! would while keeping the async callers unblocked.

use std::sync::{Arc, Mutex};

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use moneta_core::errors::{Error, Result};

use crate::errors::StorageError;

pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

const CONNECTION_PRAGMAS: &str =
    "PRAGMA busy_timeout = 5000; PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL;";

#[derive(Debug, Clone, Copy)]
struct ConnectionOptions;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for ConnectionOptions {
    fn on_acquire(
        &self,
        conn: &mut SqliteConnection,
    ) -> std::result::Result<(), diesel::r2d2::Error> {
        conn.batch_execute(CONNECTION_PRAGMAS)
            .map_err(diesel::r2d2::Error::QueryError)
    }
}

pub fn create_pool(database_url: &str) -> Result<Arc<DbPool>> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    let pool = Pool::builder()
        .max_size(8)
        .connection_customizer(Box::new(ConnectionOptions))
        .build(manager)
        .map_err(|e| StorageError::Pool(e.to_string()))?;
    Ok(Arc::new(pool))
}

pub fn get_connection(pool: &DbPool) -> Result<DbConnection> {
    pool.get()
        .map_err(|e| StorageError::Pool(e.to_string()).into())
}

/// Serializes writes onto one dedicated SQLite connection.
#[derive(Clone)]
pub struct WriteHandle {
    conn: Arc<Mutex<SqliteConnection>>,
}

impl WriteHandle {
    pub fn open(database_url: &str) -> Result<Self> {
        let mut conn = SqliteConnection::establish(database_url)
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        conn.batch_execute(CONNECTION_PRAGMAS)
            .map_err(StorageError::from)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a write closure on the writer connection.
    pub async fn exec<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| Error::from(StorageError::WriterPoisoned))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| Error::internal(format!("writer task failed: {e}")))?
    }

    pub(crate) fn run_migrations(&self) -> Result<()> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|_| Error::from(StorageError::WriterPoisoned))?;
        guard
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| StorageError::Migration(e.to_string()))?;
        Ok(())
    }
}
