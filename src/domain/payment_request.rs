use super::ids::{CustomerId, PaymentRequestId, ProjectId};
use super::money::{Amount, Balance};
use super::payment::Payment;
use super::status::PaymentStatus;
use crate::error::{LedgerError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Caller input for opening a payment request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPaymentRequest {
    pub project_id: ProjectId,
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub amount: Decimal,
    pub due_date: Option<DateTime<Utc>>,
}

impl NewPaymentRequest {
    fn validate(&self) -> Result<Amount> {
        if self.customer_id.is_blank() {
            return Err(LedgerError::validation("customerId is required"));
        }
        if self.project_id.is_blank() {
            return Err(LedgerError::validation("projectId is required"));
        }
        Amount::new(self.amount)
            .map_err(|_| LedgerError::validation(format!("amount must be > 0, got {}", self.amount)))
    }
}

/// The ledger "account": an invoice-like obligation owed for a project.
///
/// `total_paid` and `status` are derived. Only reconciliation writes them, and
/// `total_paid` always equals the sum of the request's payment log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub id: PaymentRequestId,
    pub project_id: ProjectId,
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub amount: Amount,
    pub total_paid: Balance,
    pub status: PaymentStatus,
    pub issue_date: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    pub external_invoice_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentRequest {
    /// Opens a request with nothing paid.
    pub fn open(input: NewPaymentRequest, now: DateTime<Utc>) -> Result<Self> {
        let amount = input.validate()?;
        Ok(Self {
            id: PaymentRequestId::new(),
            project_id: input.project_id,
            customer_id: input.customer_id,
            customer_name: input.customer_name,
            amount,
            total_paid: Balance::ZERO,
            status: PaymentStatus::Pending,
            issue_date: now,
            due_date: input.due_date,
            external_invoice_number: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Opens a request that is settled on arrival.
    ///
    /// The status is forced to `Paid` and the paid total to `amount_paid`,
    /// whatever the invoiced amount would derive to.
    pub fn settled(input: NewPaymentRequest, amount_paid: Amount, now: DateTime<Utc>) -> Result<Self> {
        let mut request = Self::open(input, now)?;
        request.total_paid = amount_paid.into();
        request.status = PaymentStatus::Paid;
        Ok(request)
    }

    /// Folds one payment into the aggregate and re-derives the status.
    ///
    /// No upper clamp: overpayment is kept as-is and shows up in `surplus`.
    /// A total beyond the `Decimal` range is rejected as `InvalidAmount`.
    pub fn apply_payment(&self, amount_paid: Amount, now: DateTime<Utc>) -> Result<Self> {
        let total_paid = self
            .total_paid
            .checked_add(amount_paid)
            .ok_or(LedgerError::InvalidAmount(amount_paid.value()))?;
        Ok(Self {
            total_paid,
            status: PaymentStatus::derive(self.amount, total_paid, self.due_date, now),
            updated_at: now,
            ..self.clone()
        })
    }

    pub fn outstanding(&self) -> Balance {
        (Balance::from(self.amount) - self.total_paid).floor_zero()
    }

    pub fn surplus(&self) -> Balance {
        (self.total_paid - Balance::from(self.amount)).floor_zero()
    }
}

/// A request together with its payment log, newest payment first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequestDetail {
    pub request: PaymentRequest,
    pub payments: Vec<Payment>,
}

/// Result of replaying a request's payment log against its stored aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerAudit {
    pub request_id: PaymentRequestId,
    pub recorded_total: Balance,
    pub replayed_total: Balance,
    pub payment_count: usize,
}

impl LedgerAudit {
    /// Fails with `StorageUnavailable` when the stored log sums past the
    /// `Decimal` range, which reconciliation never lets happen.
    pub fn replay(request: &PaymentRequest, payments: &[Payment]) -> Result<Self> {
        let replayed_total = Balance::checked_sum(payments.iter().map(|p| p.amount_paid))
            .ok_or_else(|| {
                LedgerError::StorageUnavailable(format!(
                    "payment log of {} overflows its total",
                    request.id
                ))
            })?;
        Ok(Self {
            request_id: request.id,
            recorded_total: request.total_paid,
            replayed_total,
            payment_count: payments.len(),
        })
    }

    pub fn is_consistent(&self) -> bool {
        self.recorded_total == self.replayed_total
    }
}
