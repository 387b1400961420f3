use crate::domain::ids::{PaymentRequestId, ProjectId};
use crate::domain::payment_request::{NewPaymentRequest, PaymentRequest, PaymentRequestDetail};
use crate::domain::ports::{Clock, ClockRef, LedgerStore, LedgerStoreRef};
use crate::error::{LedgerError, Result};
use std::cmp::Reverse;
use tracing::{debug, info, instrument};

/// CRUD over payment requests. Never writes `totalPaid` or `status` after creation.
#[derive(Clone)]
pub struct PaymentRequestRepository {
    store: LedgerStoreRef,
    clock: ClockRef,
}

impl PaymentRequestRepository {
    pub fn new(store: LedgerStoreRef, clock: ClockRef) -> Self {
        Self { store, clock }
    }

    /// Opens a request with nothing paid and returns its id.
    #[instrument(skip(self, input), fields(project_id = %input.project_id, customer_id = %input.customer_id))]
    pub async fn create(&self, input: NewPaymentRequest) -> Result<PaymentRequestId> {
        let request = PaymentRequest::open(input, self.clock.now())?;
        let id = request.id;
        self.store.insert(request, None).await?;
        info!(request_id = %id, "payment request created");
        Ok(id)
    }

    /// Returns the request with its payments, most recently recorded first.
    pub async fn get_by_id(&self, id: PaymentRequestId) -> Result<PaymentRequestDetail> {
        let (request, mut payments) = self
            .store
            .get_with_payments(id)
            .await?
            .ok_or(LedgerError::NotFound(id))?;
        payments.sort_by_key(|p| Reverse((p.recorded_at, p.id)));
        Ok(PaymentRequestDetail { request, payments })
    }

    /// All requests of a project, most recently issued first.
    pub async fn list_by_project(&self, project: &ProjectId) -> Result<Vec<PaymentRequest>> {
        let mut requests = self.store.list_by_project(project).await?;
        requests.sort_by_key(|r| Reverse((r.issue_date, r.id)));
        debug!(project_id = %project, count = requests.len(), "listed payment requests");
        Ok(requests)
    }

    /// Direct last-write-wins field update; bypasses reconciliation entirely.
    pub async fn annotate_invoice_number(
        &self,
        id: PaymentRequestId,
        number: Option<String>,
    ) -> Result<PaymentRequest> {
        self.store
            .set_external_invoice_number(id, number, self.clock.now())
            .await
    }
}
