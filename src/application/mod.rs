//! Application layer orchestrating the ledger.
//!
//! `LedgerEngine` is the primary entry point. It delegates to the repository
//! for plain CRUD, to the reconciliation service for everything that moves
//! `totalPaid`, and to the annotation service for invoice numbers.

pub mod annotation;
pub mod config;
pub mod engine;
pub mod reconciliation;
pub mod repository;
mod retry;
