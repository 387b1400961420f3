use super::annotation::InvoiceAnnotationService;
use super::config::LedgerConfig;
use super::reconciliation::ReconciliationService;
use super::repository::PaymentRequestRepository;
use crate::domain::ids::{PaymentId, PaymentRequestId, ProjectId};
use crate::domain::payment::PaymentMetadata;
use crate::domain::payment_request::{
    LedgerAudit, NewPaymentRequest, PaymentRequest, PaymentRequestDetail,
};
use crate::domain::ports::{ClockRef, LedgerStoreRef};
use crate::error::Result;
use crate::infrastructure::clock::SystemClock;
use rust_decimal::Decimal;
use std::sync::Arc;

/// The entry point UI handlers call into.
///
/// `LedgerEngine` wires the repository, reconciliation and annotation services
/// over one shared store and clock. It holds no mutable state of its own, so a
/// clone can be handed to every request handler.
#[derive(Clone)]
pub struct LedgerEngine {
    repository: PaymentRequestRepository,
    reconciliation: ReconciliationService,
    annotation: InvoiceAnnotationService,
}

impl LedgerEngine {
    /// Creates an engine over `store`.
    ///
    /// # Arguments
    ///
    /// * `store` - Backend holding payment requests and payment logs.
    /// * `clock` - Source of commit timestamps and overdue checks.
    /// * `config` - Retry and timeout settings for commits.
    pub fn new(store: LedgerStoreRef, clock: ClockRef, config: LedgerConfig) -> Self {
        let repository = PaymentRequestRepository::new(store.clone(), clock.clone());
        Self {
            reconciliation: ReconciliationService::new(store, clock, config),
            annotation: InvoiceAnnotationService::new(repository.clone(), config),
            repository,
        }
    }

    /// Creates an engine on the system clock with default settings.
    pub fn with_store(store: LedgerStoreRef) -> Self {
        Self::new(store, Arc::new(SystemClock), LedgerConfig::default())
    }

    pub async fn create_payment_request(&self, input: NewPaymentRequest) -> Result<PaymentRequestId> {
        self.repository.create(input).await
    }

    pub async fn get_payment_requests_by_project(&self, project: &ProjectId) -> Result<Vec<PaymentRequest>> {
        self.repository.list_by_project(project).await
    }

    pub async fn get_payment_request_by_id(&self, id: PaymentRequestId) -> Result<PaymentRequestDetail> {
        self.repository.get_by_id(id).await
    }

    pub async fn record_payment(
        &self,
        request_id: PaymentRequestId,
        amount_paid: Decimal,
        metadata: PaymentMetadata,
    ) -> Result<PaymentId> {
        self.reconciliation
            .record_payment(request_id, amount_paid, metadata)
            .await
    }

    pub async fn record_manual_settlement(
        &self,
        input: NewPaymentRequest,
        amount_paid: Decimal,
        metadata: PaymentMetadata,
    ) -> Result<(PaymentRequestId, PaymentId)> {
        self.reconciliation
            .record_manual_settlement(input, amount_paid, metadata)
            .await
    }

    pub async fn annotate_invoice_number(&self, id: PaymentRequestId, number: &str) -> Result<()> {
        self.annotation.annotate(id, number).await
    }

    pub async fn clear_invoice_number(&self, id: PaymentRequestId) -> Result<()> {
        self.annotation.clear(id).await
    }

    pub async fn audit_ledger(&self, id: PaymentRequestId) -> Result<LedgerAudit> {
        self.reconciliation.audit(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::CustomerId;
    use crate::domain::money::Balance;
    use crate::domain::status::PaymentStatus;
    use crate::error::LedgerError;
    use crate::infrastructure::in_memory::InMemoryLedgerStore;
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;

    fn engine() -> LedgerEngine {
        LedgerEngine::with_store(Arc::new(InMemoryLedgerStore::new()))
    }

    fn input(project: &str, amount: Decimal) -> NewPaymentRequest {
        NewPaymentRequest {
            project_id: ProjectId::new(project),
            customer_id: CustomerId::new("C-1"),
            customer_name: "Litware Machining".to_string(),
            amount,
            due_date: None,
        }
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let engine = engine();
        let id = engine
            .create_payment_request(input("P-1", dec!(100000)))
            .await
            .unwrap();

        engine
            .record_payment(id, dec!(40000), PaymentMetadata::default())
            .await
            .unwrap();
        engine.annotate_invoice_number(id, "A-2024-17").await.unwrap();
        let last = engine
            .record_payment(id, dec!(60000), PaymentMetadata::default())
            .await
            .unwrap();

        let detail = engine.get_payment_request_by_id(id).await.unwrap();
        assert_eq!(detail.request.total_paid, Balance::new(dec!(100000)));
        assert_eq!(detail.request.status, PaymentStatus::Paid);
        assert_eq!(detail.request.external_invoice_number.as_deref(), Some("A-2024-17"));
        assert_eq!(detail.payments.len(), 2);
        assert!(detail.payments.iter().any(|p| p.id == last));
        assert!(engine.audit_ledger(id).await.unwrap().is_consistent());
    }

    #[tokio::test]
    async fn test_overpayment_is_recorded_as_is() {
        let engine = engine();
        let id = engine
            .create_payment_request(input("P-1", dec!(100000)))
            .await
            .unwrap();
        engine
            .record_payment(id, dec!(150000), PaymentMetadata::default())
            .await
            .unwrap();

        let request = engine.get_payment_request_by_id(id).await.unwrap().request;
        assert_eq!(request.total_paid, Balance::new(dec!(150000)));
        assert_eq!(request.status, PaymentStatus::Paid);
        assert_eq!(request.surplus(), Balance::new(dec!(50000)));
    }

    #[tokio::test]
    async fn test_settlement_listed_with_project() {
        let engine = engine();
        engine
            .create_payment_request(input("P-7", dec!(10)))
            .await
            .unwrap();
        let (settled, _) = engine
            .record_manual_settlement(input("P-7", dec!(10)), dec!(10), PaymentMetadata::default())
            .await
            .unwrap();

        let listed = engine
            .get_payment_requests_by_project(&"P-7".into())
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().any(|r| r.id == settled && r.status == PaymentStatus::Paid));
    }

    #[tokio::test]
    async fn test_overdue_request_created_past_due() {
        let engine = engine();
        let mut past_due = input("P-1", dec!(100000));
        past_due.due_date = Some(Utc::now() - Duration::days(1));
        let id = engine.create_payment_request(past_due).await.unwrap();

        // Creation does not derive; the snapshot is only refreshed by a payment.
        let request = engine.get_payment_request_by_id(id).await.unwrap().request;
        assert_eq!(request.status, PaymentStatus::Pending);

        engine
            .record_payment(id, dec!(1), PaymentMetadata::default())
            .await
            .unwrap();
        let request = engine.get_payment_request_by_id(id).await.unwrap().request;
        assert_eq!(request.status, PaymentStatus::PartiallyPaid);
    }

    #[tokio::test]
    async fn test_unknown_request_errors() {
        let engine = engine();
        let missing = PaymentRequestId::new();
        assert!(matches!(
            engine.record_payment(missing, dec!(100), PaymentMetadata::default()).await,
            Err(LedgerError::NotFound(_))
        ));
        assert!(matches!(
            engine.audit_ledger(missing).await,
            Err(LedgerError::NotFound(_))
        ));
    }
}
