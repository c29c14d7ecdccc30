//! Database model for the debts table.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use moneta_core::errors::Result;
use moneta_core::records::{Debt, DebtFields, Syncable};

use crate::codec::{
    date_from_db, date_to_db, decimal_from_db, decimal_to_db, enum_to_db, envelope_from_db,
    timestamp_to_db,
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
#[diesel(table_name = crate::schema::debts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct DebtDB {
    pub id: String,
    pub owner_id: String,
    pub creditor: String,
    pub amount: String,
    pub due_date: String,
    pub is_settled: bool,
    pub sync_status: String,
    pub local_updated_at: String,
    pub server_updated_at: Option<String>,
    pub is_deleted: bool,
    pub version: i64,
}

impl TryFrom<DebtDB> for Debt {
    type Error = moneta_core::Error;

    fn try_from(row: DebtDB) -> Result<Self> {
        let envelope = envelope_from_db(
            row.id,
            row.owner_id,
            &row.sync_status,
            &row.local_updated_at,
            row.server_updated_at.as_deref(),
            row.is_deleted,
            row.version,
        )?;
        let fields = DebtFields {
            creditor: row.creditor,
            amount: decimal_from_db(&row.amount)?,
            due_date: date_from_db(&row.due_date)?,
            is_settled: row.is_settled,
        };
        Ok(Debt::from_parts(envelope, fields))
    }
}

impl TryFrom<&Debt> for DebtDB {
    type Error = moneta_core::Error;

    fn try_from(record: &Debt) -> Result<Self> {
        let env = record.envelope();
        Ok(Self {
            id: env.id.as_str().to_string(),
            owner_id: env.owner_id.as_str().to_string(),
            creditor: record.fields.creditor.clone(),
            amount: decimal_to_db(&record.fields.amount),
            due_date: date_to_db(&record.fields.due_date),
            is_settled: record.fields.is_settled,
            sync_status: enum_to_db(&env.sync_status)?,
            local_updated_at: timestamp_to_db(&env.local_updated_at),
            server_updated_at: env.server_updated_at.as_ref().map(timestamp_to_db),
            is_deleted: env.is_deleted,
            version: env.version,
        })
    }
}
