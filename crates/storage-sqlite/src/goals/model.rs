//! Database model for the investment_goals table.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use moneta_core::errors::Result;
use moneta_core::records::{InvestmentGoal, InvestmentGoalFields, Syncable};

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
#[diesel(table_name = crate::schema::investment_goals)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct InvestmentGoalDB {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub target_amount: String,
    pub contributed_amount: String,
    pub target_date: Option<String>,
    pub sync_status: String,
    pub local_updated_at: String,
    pub server_updated_at: Option<String>,
    pub is_deleted: bool,
    pub version: i64,
}

impl TryFrom<InvestmentGoalDB> for InvestmentGoal {
    type Error = moneta_core::Error;

    fn try_from(row: InvestmentGoalDB) -> Result<Self> {
        let envelope = envelope_from_db(
            row.id,
            row.owner_id,
            &row.sync_status,
            &row.local_updated_at,
            row.server_updated_at.as_deref(),
            row.is_deleted,
            row.version,
        )?;
        let fields = InvestmentGoalFields {
            name: row.name,
            target_amount: decimal_from_db(&row.target_amount)?,
            contributed_amount: decimal_from_db(&row.contributed_amount)?,
            target_date: row.target_date.as_deref().map(date_from_db).transpose()?,
        };
        Ok(InvestmentGoal::from_parts(envelope, fields))
    }
}

impl TryFrom<&InvestmentGoal> for InvestmentGoalDB {
    type Error = moneta_core::Error;

    fn try_from(record: &InvestmentGoal) -> Result<Self> {
        let env = record.envelope();
        Ok(Self {
            id: env.id.as_str().to_string(),
            owner_id: env.owner_id.as_str().to_string(),
            name: record.fields.name.clone(),
            target_amount: decimal_to_db(&record.fields.target_amount),
            contributed_amount: decimal_to_db(&record.fields.contributed_amount),
            target_date: record.fields.target_date.as_ref().map(date_to_db),
            sync_status: enum_to_db(&env.sync_status)?,
            local_updated_at: timestamp_to_db(&env.local_updated_at),
            server_updated_at: env.server_updated_at.as_ref().map(timestamp_to_db),
            is_deleted: env.is_deleted,
            version: env.version,
        })
    }
}
