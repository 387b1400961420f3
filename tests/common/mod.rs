#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use payledger::application::config::LedgerConfig;
use payledger::application::engine::LedgerEngine;
use payledger::domain::ids::{CustomerId, ProjectId};
use payledger::domain::payment_request::NewPaymentRequest;
use payledger::domain::ports::LedgerStoreRef;
use payledger::infrastructure::clock::FixedClock;
use payledger::infrastructure::in_memory::InMemoryLedgerStore;
use rust_decimal::Decimal;
use std::fs::File;
use std::io::Error;
use std::path::Path;
use std::sync::Arc;

pub const HEADER: [&str; 11] = [
    "type",
    "request",
    "project",
    "customer",
    "customer_name",
    "amount",
    "due_date",
    "method",
    "recorded_by",
    "notes",
    "invoice",
];

pub fn anchor() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

pub fn new_request(project: &str, customer: &str, amount: Decimal) -> NewPaymentRequest {
    NewPaymentRequest {
        project_id: ProjectId::new(project),
        customer_id: CustomerId::new(customer),
        customer_name: format!("{customer} Ltd"),
        amount,
        due_date: None,
    }
}

/// Engine over `store` with a clock pinned to `anchor()`.
pub fn engine_on(store: LedgerStoreRef, config: LedgerConfig) -> (LedgerEngine, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::new(anchor()));
    (LedgerEngine::new(store, clock.clone(), config), clock)
}

pub fn in_memory_engine() -> (LedgerEngine, Arc<FixedClock>) {
    engine_on(Arc::new(InMemoryLedgerStore::new()), LedgerConfig::default())
}

/// Writes a command batch. Short rows are padded with empty fields.
pub fn write_commands(path: &Path, rows: &[&[&str]]) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(HEADER)?;
    for row in rows {
        let mut record: Vec<&str> = row.to_vec();
        record.resize(HEADER.len(), "");
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}
