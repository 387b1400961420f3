use crate::domain::ids::{PaymentRequestId, ProjectId};
use crate::domain::payment::Payment;
use crate::domain::payment_request::PaymentRequest;
use crate::domain::ports::{LedgerMutator, LedgerStore};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Ledger {
    requests: HashMap<PaymentRequestId, PaymentRequest>,
    payments: HashMap<PaymentRequestId, Vec<Payment>>,
}

/// A thread-safe in-memory ledger.
///
/// Requests and payment logs live behind a single `RwLock`, so an atomic update
/// holds the write guard across read, mutate and write. Same-key writers are
/// therefore serialized and never observe a `Conflict`.
#[derive(Default, Clone)]
pub struct InMemoryLedgerStore {
    ledger: Arc<RwLock<Ledger>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn insert(&self, request: PaymentRequest, opening: Option<Payment>) -> Result<()> {
        let mut ledger = self.ledger.write().await;
        if ledger.requests.contains_key(&request.id) {
            return Err(LedgerError::validation(format!(
                "payment request {} already exists",
                request.id
            )));
        }
        let log = ledger.payments.entry(request.id).or_default();
        log.extend(opening);
        ledger.requests.insert(request.id, request);
        Ok(())
    }

    async fn get(&self, id: PaymentRequestId) -> Result<Option<PaymentRequest>> {
        let ledger = self.ledger.read().await;
        Ok(ledger.requests.get(&id).cloned())
    }

    async fn payments(&self, id: PaymentRequestId) -> Result<Vec<Payment>> {
        let ledger = self.ledger.read().await;
        Ok(ledger.payments.get(&id).cloned().unwrap_or_default())
    }

    async fn get_with_payments(
        &self,
        id: PaymentRequestId,
    ) -> Result<Option<(PaymentRequest, Vec<Payment>)>> {
        let ledger = self.ledger.read().await;
        Ok(ledger.requests.get(&id).map(|request| {
            let payments = ledger.payments.get(&id).cloned().unwrap_or_default();
            (request.clone(), payments)
        }))
    }

    async fn list_by_project(&self, project: &ProjectId) -> Result<Vec<PaymentRequest>> {
        let ledger = self.ledger.read().await;
        Ok(ledger
            .requests
            .values()
            .filter(|r| &r.project_id == project)
            .cloned()
            .collect())
    }

    async fn atomic_update(
        &self,
        id: PaymentRequestId,
        mutator: LedgerMutator<'_>,
    ) -> Result<(PaymentRequest, Payment)> {
        let mut ledger = self.ledger.write().await;
        let current = ledger.requests.get(&id).ok_or(LedgerError::NotFound(id))?;

        let (updated, payment) = mutator(current)?;
        if updated.id != id || payment.parent_request_id != id {
            return Err(LedgerError::validation(format!(
                "mutator changed the identity of payment request {id}"
            )));
        }

        ledger
            .payments
            .entry(id)
            .or_default()
            .push(payment.clone());
        ledger.requests.insert(id, updated.clone());
        Ok((updated, payment))
    }

    async fn set_external_invoice_number(
        &self,
        id: PaymentRequestId,
        number: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<PaymentRequest> {
        let mut ledger = self.ledger.write().await;
        let request = ledger
            .requests
            .get_mut(&id)
            .ok_or(LedgerError::NotFound(id))?;
        request.external_invoice_number = number;
        request.updated_at = now;
        Ok(request.clone())
    }
}
