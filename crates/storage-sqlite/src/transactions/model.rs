//! Database model for the transactions table.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use moneta_core::errors::Result;
use moneta_core::records::{Syncable, Transaction, TransactionFields};

use crate::codec::{
    date_from_db, date_to_db, decimal_from_db, decimal_to_db, enum_from_db, enum_to_db,
    envelope_from_db, timestamp_to_db,
};

#[derive(
    Queryable,
    Identifiable,
    Insertable,
    AsChangeset,
    Selectable,
    Debug,
    Clone,
    Serialize,
    Deserialize,
)]
#[diesel(table_name = crate::schema::transactions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct TransactionDB {
    pub id: String,
    pub owner_id: String,
    pub description: String,
    pub amount: String,
    pub date: String,
    pub direction: String,
    pub category: Option<String>,
    pub sync_status: String,
    pub local_updated_at: String,
    pub server_updated_at: Option<String>,
    pub is_deleted: bool,
    pub version: i64,
}

impl TryFrom<TransactionDB> for Transaction {
    type Error = moneta_core::Error;

    fn try_from(row: TransactionDB) -> Result<Self> {
        let envelope = envelope_from_db(
            row.id,
            row.owner_id,
            &row.sync_status,
            &row.local_updated_at,
            row.server_updated_at.as_deref(),
            row.is_deleted,
            row.version,
        )?;
        let fields = TransactionFields {
            description: row.description,
            amount: decimal_from_db(&row.amount)?,
            date: date_from_db(&row.date)?,
            direction: enum_from_db(&row.direction)?,
            category: row.category,
        };
        Ok(Transaction::from_parts(envelope, fields))
    }
}

impl TryFrom<&Transaction> for TransactionDB {
    type Error = moneta_core::Error;

    fn try_from(record: &Transaction) -> Result<Self> {
        let env = record.envelope();
        Ok(Self {
            id: env.id.as_str().to_string(),
            owner_id: env.owner_id.as_str().to_string(),
            description: record.fields.description.clone(),
            amount: decimal_to_db(&record.fields.amount),
            date: date_to_db(&record.fields.date),
            direction: enum_to_db(&record.fields.direction)?,
            category: record.fields.category.clone(),
            sync_status: enum_to_db(&env.sync_status)?,
            local_updated_at: timestamp_to_db(&env.local_updated_at),
            server_updated_at: env.server_updated_at.as_ref().map(timestamp_to_db),
            is_deleted: env.is_deleted,
            version: env.version,
        })
    }
}
