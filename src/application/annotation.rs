use super::config::LedgerConfig;
use super::repository::PaymentRequestRepository;
use super::retry::commit_with_retry;
use crate::domain::ids::PaymentRequestId;
use crate::error::{LedgerError, Result};
use tracing::{info, instrument};

/// Attaches external accounting-system invoice numbers to payment requests.
#[derive(Clone)]
pub struct InvoiceAnnotationService {
    repository: PaymentRequestRepository,
    config: LedgerConfig,
}

impl InvoiceAnnotationService {
    pub fn new(repository: PaymentRequestRepository, config: LedgerConfig) -> Self {
        Self { repository, config }
    }

    #[instrument(skip(self))]
    pub async fn annotate(&self, id: PaymentRequestId, number: &str) -> Result<()> {
        let number = number.trim();
        if number.is_empty() {
            return Err(LedgerError::validation("invoice number must not be empty"));
        }
        self.write(id, Some(number.to_string())).await?;
        info!("invoice number annotated");
        Ok(())
    }

    pub async fn clear(&self, id: PaymentRequestId) -> Result<()> {
        self.write(id, None).await
    }

    async fn write(&self, id: PaymentRequestId, number: Option<String>) -> Result<()> {
        let repository = &self.repository;
        commit_with_retry(&self.config, id, || {
            repository.annotate_invoice_number(id, number.clone())
        })
        .await
        .map(|_| ())
    }
}
