//! Income/expense transactions.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{EntityKind, SyncEnvelope, Syncable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionDirection {
    Income,
    Expense,
}

impl TransactionDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

/// Business fields of a transaction, excluding the sync envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionFields {
    pub description: String,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub direction: TransactionDirection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(flatten)]
    pub envelope: SyncEnvelope,
    #[serde(flatten)]
    pub fields: TransactionFields,
}

impl Syncable for Transaction {
    type Fields = TransactionFields;

    const KIND: EntityKind = EntityKind::Transaction;

    fn envelope(&self) -> &SyncEnvelope {
        &self.envelope
    }

    fn envelope_mut(&mut self) -> &mut SyncEnvelope {
        &mut self.envelope
    }

    fn fields(&self) -> TransactionFields {
        self.fields.clone()
    }

    fn from_parts(envelope: SyncEnvelope, fields: TransactionFields) -> Self {
        Self { envelope, fields }
    }

    // Natural key: description + date + amount + direction.
    fn natural_key(fields: &TransactionFields) -> String {
        format!(
            "{}|{}|{}|{}",
            fields.description.trim().to_lowercase(),
            fields.date,
            fields.amount.normalize(),
            fields.direction.as_str()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn coffee() -> TransactionFields {
        TransactionFields {
            description: "Coffee".to_string(),
            amount: dec!(12),
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            direction: TransactionDirection::Expense,
            category: None,
        }
    }

    #[test]
    fn natural_key_ignores_case_whitespace_and_scale() {
        let a = coffee();
        let mut b = coffee();
        b.description = "  coffee ".to_string();
        b.amount = dec!(12.00);
        assert_eq!(Transaction::natural_key(&a), Transaction::natural_key(&b));
    }

    #[test]
    fn natural_key_distinguishes_direction() {
        let a = coffee();
        let mut b = coffee();
        b.direction = TransactionDirection::Income;
        assert_ne!(Transaction::natural_key(&a), Transaction::natural_key(&b));
    }
}
