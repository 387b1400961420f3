use crate::domain::ids::{CustomerId, ProjectId};
use crate::domain::payment::{PaymentMetadata, PaymentMethod};
use crate::domain::payment_request::NewPaymentRequest;
use crate::error::{LedgerError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum CommandType {
    Create,
    Payment,
    Settlement,
    Annotate,
    Clear,
}

/// One row of a ledger batch file.
///
/// `request` is a caller-chosen label for the payment request; the runner maps
/// it to the id assigned at creation.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct LedgerCommand {
    pub r#type: CommandType,
    pub request: String,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub method: Option<PaymentMethod>,
    #[serde(default)]
    pub recorded_by: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub invoice: Option<String>,
}

impl LedgerCommand {
    pub fn amount(&self) -> Result<Decimal> {
        self.amount
            .ok_or_else(|| LedgerError::validation(format!("{:?} row is missing an amount", self.r#type)))
    }

    pub fn new_request(&self) -> Result<NewPaymentRequest> {
        let project = self
            .project
            .as_deref()
            .ok_or_else(|| LedgerError::validation("projectId is required"))?;
        let customer = self
            .customer
            .as_deref()
            .ok_or_else(|| LedgerError::validation("customerId is required"))?;
        Ok(NewPaymentRequest {
            project_id: ProjectId::new(project),
            customer_id: CustomerId::new(customer),
            customer_name: self.customer_name.clone().unwrap_or_default(),
            amount: self.amount()?,
            due_date: self.due_date,
        })
    }

    pub fn metadata(&self) -> PaymentMetadata {
        PaymentMetadata {
            method: self.method.unwrap_or_default(),
            notes: self.notes.clone(),
            recorded_by: self.recorded_by.clone(),
        }
    }
}

/// Reads ledger commands from a CSV source.
///
/// Wraps `csv::Reader`, trimming whitespace and accepting short rows.
pub struct CommandReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CommandReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily reads and deserializes commands, so large batches are streamed.
    pub fn commands(self) -> impl Iterator<Item = Result<LedgerCommand>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(LedgerError::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    const HEADER: &str =
        "type, request, project, customer, customer_name, amount, due_date, method, recorded_by, notes, invoice";

    #[test]
    fn test_reader_valid_stream() {
        let data = format!(
            "{HEADER}\n\
             create, r1, P-1, C-1, Acme, 100000, 2024-07-01T00:00:00Z, , , , \n\
             payment, r1, , , , 250.50, , cash, clerk, first instalment, \n\
             annotate, r1, , , , , , , , , INV-9"
        );
        let reader = CommandReader::new(data.as_bytes());
        let results: Vec<Result<LedgerCommand>> = reader.commands().collect();
        assert_eq!(results.len(), 3);

        let create = results[0].as_ref().unwrap();
        assert_eq!(create.r#type, CommandType::Create);
        let input = create.new_request().unwrap();
        assert_eq!(input.project_id, ProjectId::new("P-1"));
        assert_eq!(input.amount, dec!(100000));
        assert_eq!(
            input.due_date,
            Some(Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap())
        );

        let payment = results[1].as_ref().unwrap();
        assert_eq!(payment.amount().unwrap(), dec!(250.50));
        let metadata = payment.metadata();
        assert_eq!(metadata.method, PaymentMethod::Cash);
        assert_eq!(metadata.notes.as_deref(), Some("first instalment"));

        let annotate = results[2].as_ref().unwrap();
        assert_eq!(annotate.invoice.as_deref(), Some("INV-9"));
        assert_eq!(annotate.amount, None);
    }

    #[test]
    fn test_reader_clear_row() {
        let data = format!("{HEADER}\nclear, r1");
        let results: Vec<Result<LedgerCommand>> =
            CommandReader::new(data.as_bytes()).commands().collect();
        let command = results[0].as_ref().unwrap();
        assert_eq!(command.r#type, CommandType::Clear);
        assert_eq!(command.invoice, None);
    }

    #[test]
    fn test_reader_accepts_short_rows() {
        let data = format!("{HEADER}\npayment, r1, , , , 10");
        let results: Vec<Result<LedgerCommand>> =
            CommandReader::new(data.as_bytes()).commands().collect();
        let command = results[0].as_ref().unwrap();
        assert_eq!(command.amount, Some(dec!(10)));
        assert_eq!(command.metadata().method, PaymentMethod::BankTransfer);
    }

    #[test]
    fn test_reader_malformed_line() {
        let data = format!("{HEADER}\nrefund, r1, , , , 1.0, , , , , ");
        let results: Vec<Result<LedgerCommand>> =
            CommandReader::new(data.as_bytes()).commands().collect();
        assert!(matches!(results[0], Err(LedgerError::Csv(_))));
    }

    #[test]
    fn test_create_requires_customer() {
        let data = format!("{HEADER}\ncreate, r1, P-1, , , 10, , , , , ");
        let results: Vec<Result<LedgerCommand>> =
            CommandReader::new(data.as_bytes()).commands().collect();
        let command = results[0].as_ref().unwrap();
        assert!(matches!(
            command.new_request(),
            Err(LedgerError::Validation(_))
        ));
    }
}
