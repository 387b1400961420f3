use super::config::LedgerConfig;
use super::retry::commit_with_retry;
use crate::domain::ids::{PaymentId, PaymentRequestId};
use crate::domain::money::Amount;
use crate::domain::payment::{Payment, PaymentMetadata};
use crate::domain::payment_request::{LedgerAudit, NewPaymentRequest, PaymentRequest};
use crate::domain::ports::{Clock, ClockRef, LedgerStore, LedgerStoreRef};
use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

/// Folds payments into payment requests.
///
/// This is the only writer of `totalPaid` and `status`. Every successful call
/// commits exactly one aggregate update together with exactly one new payment.
#[derive(Clone)]
pub struct ReconciliationService {
    store: LedgerStoreRef,
    clock: ClockRef,
    config: LedgerConfig,
}

impl ReconciliationService {
    pub fn new(store: LedgerStoreRef, clock: ClockRef, config: LedgerConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    /// Records a payment against an existing request and returns the payment id.
    ///
    /// A non-positive amount fails with `InvalidAmount` before the store is
    /// touched. Contention is retried against a freshly read aggregate.
    #[instrument(skip_all, fields(request_id = %request_id, amount = %amount_paid))]
    pub async fn record_payment(
        &self,
        request_id: PaymentRequestId,
        amount_paid: Decimal,
        metadata: PaymentMetadata,
    ) -> Result<PaymentId> {
        let amount = Amount::new(amount_paid)?;

        let clock = &self.clock;
        let metadata = &metadata;
        let mutator = move |current: &PaymentRequest| -> Result<(PaymentRequest, Payment)> {
            let now = clock.now();
            Ok((
                current.apply_payment(amount, now)?,
                Payment::new(current.id, amount, metadata.clone(), now),
            ))
        };

        let store = &self.store;
        let (request, payment) = commit_with_retry(&self.config, request_id, || {
            store.atomic_update(request_id, &mutator)
        })
        .await?;

        info!(
            payment_id = %payment.id,
            total_paid = %request.total_paid,
            status = %request.status,
            "payment recorded"
        );
        Ok(payment.id)
    }

    /// Opens a request that a single payment settles on arrival.
    ///
    /// The request and its opening payment are created together; the status is
    /// `Paid` and the paid total is `amount_paid`, independent of `input.amount`.
    #[instrument(skip_all, fields(project_id = %input.project_id, amount = %amount_paid))]
    pub async fn record_manual_settlement(
        &self,
        input: NewPaymentRequest,
        amount_paid: Decimal,
        metadata: PaymentMetadata,
    ) -> Result<(PaymentRequestId, PaymentId)> {
        let amount = Amount::new(amount_paid)?;
        let now = self.clock.now();
        let request = PaymentRequest::settled(input, amount, now)?;
        let payment = Payment::new(request.id, amount, metadata, now);
        let ids = (request.id, payment.id);

        let store = &self.store;
        commit_with_retry(&self.config, request.id, || {
            store.insert(request.clone(), Some(payment.clone()))
        })
        .await?;

        info!(request_id = %ids.0, payment_id = %ids.1, "manual settlement recorded");
        Ok(ids)
    }

    /// Replays the payment log of a request against its stored paid total.
    ///
    /// Both are read from one consistent view, so a mismatch means the stored
    /// ledger itself has drifted.
    pub async fn audit(&self, request_id: PaymentRequestId) -> Result<LedgerAudit> {
        let (request, payments) = self
            .store
            .get_with_payments(request_id)
            .await?
            .ok_or(LedgerError::NotFound(request_id))?;

        let audit = LedgerAudit::replay(&request, &payments)?;
        if !audit.is_consistent() {
            warn!(
                request_id = %request_id,
                recorded = %audit.recorded_total,
                replayed = %audit.replayed_total,
                "payment log does not reproduce the paid total"
            );
        }
        Ok(audit)
    }
}
