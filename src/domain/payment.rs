use super::ids::{PaymentId, PaymentRequestId};
use super::money::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    #[default]
    BankTransfer,
    Check,
    Card,
    Other,
}

/// Descriptive data attached to a recorded payment.
///
/// None of it takes part in aggregation; it only makes the entry attributable.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMetadata {
    pub method: PaymentMethod,
    pub notes: Option<String>,
    pub recorded_by: Option<String>,
}

/// A single ledger entry. Created once, atomically with the parent's aggregate
/// update, and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: PaymentId,
    pub parent_request_id: PaymentRequestId,
    pub amount_paid: Amount,
    pub method: PaymentMethod,
    pub notes: Option<String>,
    pub recorded_by: Option<String>,
    pub recorded_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(
        parent_request_id: PaymentRequestId,
        amount_paid: Amount,
        metadata: PaymentMetadata,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PaymentId::new(),
            parent_request_id,
            amount_paid,
            method: metadata.method,
            notes: metadata.notes,
            recorded_by: metadata.recorded_by,
            recorded_at: now,
            created_at: now,
        }
    }
}
