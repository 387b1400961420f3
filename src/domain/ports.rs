use super::ids::{PaymentRequestId, ProjectId};
use super::payment::Payment;
use super::payment_request::PaymentRequest;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Pure function applied inside an atomic update: given the current request,
/// produce the updated request and the payment to append to its log.
pub type LedgerMutator<'a> = &'a (dyn Fn(&PaymentRequest) -> Result<(PaymentRequest, Payment)> + Send + Sync);

/// Transactional backend for payment requests and their append-only payment logs.
///
/// Implementations must never expose a payment without the aggregate update
/// that accompanied it, or the reverse.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Creates a request, optionally together with its opening payment, as one unit.
    async fn insert(&self, request: PaymentRequest, opening: Option<Payment>) -> Result<()>;

    async fn get(&self, id: PaymentRequestId) -> Result<Option<PaymentRequest>>;

    /// All payments recorded against `id`, in no particular order.
    async fn payments(&self, id: PaymentRequestId) -> Result<Vec<Payment>>;

    /// The request and its payment log read from one consistent view, so the
    /// log always matches the returned aggregate.
    async fn get_with_payments(
        &self,
        id: PaymentRequestId,
    ) -> Result<Option<(PaymentRequest, Vec<Payment>)>>;

    async fn list_by_project(&self, project: &ProjectId) -> Result<Vec<PaymentRequest>>;

    /// Runs one read-mutate-write attempt against `id`.
    ///
    /// No other commit on the same id may interleave between the read and the
    /// write. A store that detects a concurrent writer instead of excluding it
    /// returns `LedgerError::Conflict` and commits nothing. Returns the
    /// committed request and payment.
    async fn atomic_update(
        &self,
        id: PaymentRequestId,
        mutator: LedgerMutator<'_>,
    ) -> Result<(PaymentRequest, Payment)>;

    /// Last-write-wins update of the invoice annotation. Bumps `updatedAt` only.
    async fn set_external_invoice_number(
        &self,
        id: PaymentRequestId,
        number: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<PaymentRequest>;
}

pub type LedgerStoreRef = Arc<dyn LedgerStore>;
pub type LedgerStoreFactory = Box<dyn Fn() -> LedgerStoreRef + Send + Sync>;

/// Source of "now" for everything that stamps or derives from time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub type ClockRef = Arc<dyn Clock>;
