//! Ledger entities, value objects and the ports the services depend on.

pub mod ids;
pub mod money;
pub mod payment;
pub mod payment_request;
pub mod ports;
pub mod status;
