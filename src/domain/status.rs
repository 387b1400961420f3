use super::money::{Amount, Balance};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Settlement state of a payment request.
///
/// Stored on the request as a snapshot taken at the last reconciliation;
/// it is not re-derived on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    PartiallyPaid,
    Paid,
    Overdue,
}

impl PaymentStatus {
    /// Derives the status of a request from its totals.
    ///
    /// Overdue is only reachable while nothing has been paid: a partially paid
    /// request past its due date stays `PartiallyPaid`. Paying exactly the
    /// invoiced amount yields `Paid`.
    pub fn derive(
        amount: Amount,
        total_paid: Balance,
        due_date: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        if total_paid >= Balance::from(amount) {
            Self::Paid
        } else if total_paid.is_positive() {
            Self::PartiallyPaid
        } else if due_date.is_some_and(|due| now > due) {
            Self::Overdue
        } else {
            Self::Pending
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::PartiallyPaid => "partially_paid",
            Self::Paid => "paid",
            Self::Overdue => "overdue",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
