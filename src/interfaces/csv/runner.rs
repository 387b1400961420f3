use super::command_reader::{CommandType, LedgerCommand};
use super::request_writer::RequestRow;
use crate::application::engine::LedgerEngine;
use crate::domain::ids::{PaymentRequestId, ProjectId};
use crate::error::{LedgerError, Result};
use std::collections::HashMap;
use tracing::debug;

/// Applies batch commands to a `LedgerEngine`, resolving request labels to ids.
pub struct BatchRunner {
    engine: LedgerEngine,
    labels: HashMap<String, PaymentRequestId>,
    projects: Vec<ProjectId>,
}

impl BatchRunner {
    pub fn new(engine: LedgerEngine) -> Self {
        Self {
            engine,
            labels: HashMap::new(),
            projects: Vec::new(),
        }
    }

    pub async fn apply(&mut self, command: LedgerCommand) -> Result<()> {
        debug!(kind = ?command.r#type, request = %command.request, "applying command");
        match command.r#type {
            CommandType::Create => {
                self.ensure_unused(&command.request)?;
                let input = command.new_request()?;
                let project = input.project_id.clone();
                let id = self.engine.create_payment_request(input).await?;
                self.remember(command.request, id, project);
            }
            CommandType::Settlement => {
                self.ensure_unused(&command.request)?;
                let input = command.new_request()?;
                let project = input.project_id.clone();
                let amount = command.amount()?;
                let (id, _) = self
                    .engine
                    .record_manual_settlement(input, amount, command.metadata())
                    .await?;
                self.remember(command.request, id, project);
            }
            CommandType::Payment => {
                let id = self.resolve(&command.request).await?;
                self.engine
                    .record_payment(id, command.amount()?, command.metadata())
                    .await?;
            }
            CommandType::Annotate => {
                let id = self.resolve(&command.request).await?;
                let number = command.invoice.as_deref().unwrap_or_default();
                self.engine.annotate_invoice_number(id, number).await?;
            }
            CommandType::Clear => {
                let id = self.resolve(&command.request).await?;
                self.engine.clear_invoice_number(id).await?;
            }
        }
        Ok(())
    }

    /// Every request of every project touched by the batch, project by project
    /// in first-seen order, newest request first within a project.
    pub async fn rows(&self) -> Result<Vec<RequestRow>> {
        let by_id: HashMap<PaymentRequestId, &str> = self
            .labels
            .iter()
            .map(|(label, id)| (*id, label.as_str()))
            .collect();

        let mut rows = Vec::new();
        for project in &self.projects {
            for request in self.engine.get_payment_requests_by_project(project).await? {
                let label = by_id
                    .get(&request.id)
                    .map(|l| l.to_string())
                    .unwrap_or_else(|| request.id.to_string());
                rows.push(RequestRow::new(label, &request));
            }
        }
        Ok(rows)
    }

    fn ensure_unused(&self, label: &str) -> Result<()> {
        if self.labels.contains_key(label) {
            return Err(LedgerError::validation(format!(
                "request reference '{label}' is already in use"
            )));
        }
        Ok(())
    }

    /// Accepts a label from this batch or a raw request id from an earlier run.
    async fn resolve(&mut self, label: &str) -> Result<PaymentRequestId> {
        if let Some(id) = self.labels.get(label) {
            return Ok(*id);
        }
        let id: PaymentRequestId = label.parse().map_err(|_| {
            LedgerError::validation(format!("unknown request reference '{label}'"))
        })?;
        let project = self.engine.get_payment_request_by_id(id).await?.request.project_id;
        self.track_project(project);
        Ok(id)
    }

    fn track_project(&mut self, project: ProjectId) {
        if !self.projects.contains(&project) {
            self.projects.push(project);
        }
    }

    fn remember(&mut self, label: String, id: PaymentRequestId, project: ProjectId) {
        self.labels.insert(label, id);
        self.track_project(project);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::in_memory::InMemoryLedgerStore;
    use crate::interfaces::csv::command_reader::CommandReader;
    use std::sync::Arc;

    const HEADER: &str =
        "type, request, project, customer, customer_name, amount, due_date, method, recorded_by, notes, invoice";

    async fn run(body: &str) -> (Vec<RequestRow>, Vec<LedgerError>) {
        let engine = LedgerEngine::with_store(Arc::new(InMemoryLedgerStore::new()));
        let mut runner = BatchRunner::new(engine);
        let mut errors = Vec::new();
        let data = format!("{HEADER}\n{body}");
        for command in CommandReader::new(data.as_bytes()).commands() {
            let outcome = match command {
                Ok(command) => runner.apply(command).await,
                Err(e) => Err(e),
            };
            if let Err(e) = outcome {
                errors.push(e);
            }
        }
        (runner.rows().await.unwrap(), errors)
    }

    #[tokio::test]
    async fn test_batch_reconciles_payments() {
        let (rows, errors) = run(
            "create, r1, P-1, C-1, Acme, 100000, , , , , \n\
             payment, r1, , , , 30000, , , , , \n\
             payment, r1, , , , 70000, , , , , \n\
             annotate, r1, , , , , , , , , INV-1",
        )
        .await;

        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total_paid, "100000");
        assert_eq!(rows[0].status, "paid");
        assert_eq!(rows[0].invoice.as_deref(), Some("INV-1"));
    }

    #[tokio::test]
    async fn test_bad_rows_are_reported_and_skipped() {
        let (rows, errors) = run(
            "create, r1, P-1, C-1, Acme, 100, , , , , \n\
             payment, r1, , , , 0, , , , , \n\
             payment, nope, , , , 5, , , , , \n\
             create, r1, P-1, C-1, Acme, 100, , , , , \n\
             payment, r1, , , , 5, , , , , ",
        )
        .await;

        assert_eq!(errors.len(), 3);
        assert!(matches!(errors[0], LedgerError::InvalidAmount(_)));
        assert!(matches!(errors[1], LedgerError::Validation(_)));
        assert!(matches!(errors[2], LedgerError::Validation(_)));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total_paid, "5");
        assert_eq!(rows[0].status, "partially_paid");
    }

    #[tokio::test]
    async fn test_blank_annotation_is_rejected_and_clear_removes_it() {
        let (rows, errors) = run(
            "create, r1, P-1, C-1, Acme, 100, , , , , \n\
             annotate, r1, , , , , , , , , INV-3\n\
             annotate, r1, , , , , , , , ,   ",
        )
        .await;
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], LedgerError::Validation(_)));
        assert_eq!(rows[0].invoice.as_deref(), Some("INV-3"));

        let (rows, errors) = run(
            "create, r1, P-1, C-1, Acme, 100, , , , , \n\
             annotate, r1, , , , , , , , , INV-3\n\
             clear, r1",
        )
        .await;
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(rows[0].invoice, None);
    }

    #[tokio::test]
    async fn test_rows_grouped_by_project_in_first_seen_order() {
        let (rows, _) = run(
            "create, b1, P-B, C-1, , 10, , , , , \n\
             settlement, a1, P-A, C-2, , 20, , , , , ",
        )
        .await;

        let labels: Vec<_> = rows.iter().map(|r| r.request.as_str()).collect();
        assert_eq!(labels, vec!["b1", "a1"]);
        assert_eq!(rows[1].status, "paid");
    }
}
