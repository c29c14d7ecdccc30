//! Offline-first persistence and synchronization core for Moneta.
//!
//! This crate owns the domain records (transactions, debts, investment
//! goals), the temporary-identifier allocator, the push/pull sync engine and
//! the realtime merge handler. Durable storage and the hosted-backend client
//! live behind the port traits in [`sync::ports`] and are provided by the
//! `moneta-storage-sqlite` and `moneta-connect` crates.

pub mod errors;
pub mod ids;
pub mod records;
pub mod sync;

pub use errors::{Error, Result};
