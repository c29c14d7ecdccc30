//! Debts owed to a creditor.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{EntityKind, SyncEnvelope, Syncable};

/// Business fields of a debt, excluding the sync envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebtFields {
    pub creditor: String,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub is_settled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Debt {
    #[serde(flatten)]
    pub envelope: SyncEnvelope,
    #[serde(flatten)]
    pub fields: DebtFields,
}

impl Syncable for Debt {
    type Fields = DebtFields;

    const KIND: EntityKind = EntityKind::Debt;

    fn envelope(&self) -> &SyncEnvelope {
        &self.envelope
    }

    fn envelope_mut(&mut self) -> &mut SyncEnvelope {
        &mut self.envelope
    }

    fn fields(&self) -> DebtFields {
        self.fields.clone()
    }

    fn from_parts(envelope: SyncEnvelope, fields: DebtFields) -> Self {
        Self { envelope, fields }
    }

    // Natural key: creditor + amount + due date.
    fn natural_key(fields: &DebtFields) -> String {
        format!(
            "{}|{}|{}",
            fields.creditor.trim().to_lowercase(),
            fields.amount.normalize(),
            fields.due_date
        )
    }
}
