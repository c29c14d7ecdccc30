//! SQLite-backed Local Store for Moneta.
//!
//! Durable, per-owner partitioned tables for each entity kind plus the
//! sync-metadata row, with embedded migrations. Writes are serialized onto
//! a dedicated connection and every committed write is published on the
//! change bus so live queries refresh without polling.

use std::sync::Arc;

use moneta_core::errors::Result;

pub mod db;
pub mod errors;
pub mod observe;
pub mod schema;

mod codec;

pub mod debts;
pub mod goals;
pub mod sync_state;
pub mod transactions;

pub use db::{create_pool, get_connection, DbPool, WriteHandle};
pub use debts::DebtRepository;
pub use errors::StorageError;
pub use goals::InvestmentGoalRepository;
pub use observe::{ChangeBus, ChangeNotice, Live};
pub use sync_state::SyncStateRepository;
pub use transactions::TransactionRepository;

/// Owns the pool, the writer and the change bus, and hands out repositories
/// that share them.
pub struct Database {
    pool: Arc<DbPool>,
    writer: WriteHandle,
    bus: ChangeBus,
}

impl Database {
    /// Open the database at `database_url` and run pending migrations.
    pub fn open(database_url: &str) -> Result<Self> {
        let pool = create_pool(database_url)?;
        let writer = WriteHandle::open(database_url)?;
        writer.run_migrations()?;
        Ok(Self {
            pool,
            writer,
            bus: ChangeBus::new(),
        })
    }

    pub fn change_bus(&self) -> &ChangeBus {
        &self.bus
    }

    pub fn transactions(&self) -> TransactionRepository {
        TransactionRepository::new(Arc::clone(&self.pool), self.writer.clone(), self.bus.clone())
    }

    pub fn debts(&self) -> DebtRepository {
        DebtRepository::new(Arc::clone(&self.pool), self.writer.clone(), self.bus.clone())
    }

    pub fn investment_goals(&self) -> InvestmentGoalRepository {
        InvestmentGoalRepository::new(Arc::clone(&self.pool), self.writer.clone(), self.bus.clone())
    }

    pub fn sync_state(&self) -> SyncStateRepository {
        SyncStateRepository::new(Arc::clone(&self.pool), self.writer.clone())
    }
}
