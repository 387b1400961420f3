//! Batch CSV adapters used by the command-line driver.

pub mod csv;
