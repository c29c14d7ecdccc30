//! Investment goals.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{EntityKind, SyncEnvelope, Syncable};

/// Business fields of an investment goal, excluding the sync envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentGoalFields {
    pub name: String,
    pub target_amount: Decimal,
    pub contributed_amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentGoal {
    #[serde(flatten)]
    pub envelope: SyncEnvelope,
    #[serde(flatten)]
    pub fields: InvestmentGoalFields,
}

impl Syncable for InvestmentGoal {
    type Fields = InvestmentGoalFields;

    const KIND: EntityKind = EntityKind::InvestmentGoal;

    fn envelope(&self) -> &SyncEnvelope {
        &self.envelope
    }

    fn envelope_mut(&mut self) -> &mut SyncEnvelope {
        &mut self.envelope
    }

    fn fields(&self) -> InvestmentGoalFields {
        self.fields.clone()
    }

    fn from_parts(envelope: SyncEnvelope, fields: InvestmentGoalFields) -> Self {
        Self { envelope, fields }
    }

    // Natural key: name + target amount. Contributions change over a goal's
    // lifetime and would make the key unstable.
    fn natural_key(fields: &InvestmentGoalFields) -> String {
        format!(
            "{}|{}",
            fields.name.trim().to_lowercase(),
            fields.target_amount.normalize()
        )
    }
}
