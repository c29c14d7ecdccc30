//! Hosted-backend boundary for Moneta.
//!
//! Implements the core's remote ports against the cloud service: per-kind
//! CRUD over REST, the realtime change feed, and the session/connectivity
//! handle the auth layer writes into.

pub mod client;
pub mod error;
pub mod realtime;
pub mod session;
pub mod types;

pub use client::{ConnectClient, ConnectConfig, API_URL_ENV};
pub use error::{ApiRetryClass, ConnectError};
pub use realtime::ChangeFeed;
pub use session::{AuthSession, SessionHandle};
