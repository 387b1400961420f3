use crate::domain::payment_request::PaymentRequest;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

/// Flat, display-ready view of a payment request.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct RequestRow {
    pub request: String,
    pub id: String,
    pub project: String,
    pub customer: String,
    pub amount: String,
    pub total_paid: String,
    pub outstanding: String,
    pub status: String,
    pub invoice: Option<String>,
}

impl RequestRow {
    pub fn new(label: String, request: &PaymentRequest) -> Self {
        Self {
            request: label,
            id: request.id.to_string(),
            project: request.project_id.to_string(),
            customer: request.customer_id.to_string(),
            amount: request.amount.to_string(),
            total_paid: request.total_paid.to_string(),
            outstanding: request.outstanding().to_string(),
            status: request.status.to_string(),
            invoice: request.external_invoice_number.clone(),
        }
    }
}

/// Writes payment request rows as CSV, header included.
pub struct RequestWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> RequestWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_rows(&mut self, rows: impl IntoIterator<Item = RequestRow>) -> Result<()> {
        let mut wrote_any = false;
        for row in rows {
            self.writer.serialize(row)?;
            wrote_any = true;
        }
        if !wrote_any {
            self.writer.write_record([
                "request",
                "id",
                "project",
                "customer",
                "amount",
                "total_paid",
                "outstanding",
                "status",
                "invoice",
            ])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
