//! SQLite storage for debts.

mod model;
mod repository;

pub use model::DebtDB;
pub use repository::DebtRepository;
