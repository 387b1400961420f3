//! Strongly-typed identifiers for ledger records and their foreign references.

use crate::error::LedgerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of a payment request (the ledger "account").
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentRequestId(Uuid);

/// Identifier of a single recorded payment (a ledger "entry").
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(Uuid);

macro_rules! impl_uuid_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Uses UUIDv7, so ids sort by creation time.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            pub fn as_bytes(&self) -> &[u8; 16] {
                self.0.as_bytes()
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $t {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<Uuid> for $t {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl FromStr for $t {
            type Err = LedgerError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::from_str(s)
                    .map(Self)
                    .map_err(|e| LedgerError::validation(format!("{}: {}", $name, e)))
            }
        }
    };
}

impl_uuid_newtype!(PaymentRequestId, "PaymentRequestId");
impl_uuid_newtype!(PaymentId, "PaymentId");

/// Reference to a project owned by the projects screens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(String);

/// Reference to a customer owned by the customers screens.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(String);

macro_rules! impl_string_ref {
    ($t:ty) => {
        impl $t {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $t {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $t {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }
    };
}

impl_string_ref!(ProjectId);
impl_string_ref!(CustomerId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_round_trips_through_display() {
        let id = PaymentRequestId::new();
        let parsed: PaymentRequestId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_request_id_rejects_garbage() {
        let result = "does-not-exist".parse::<PaymentRequestId>();
        assert!(matches!(result, Err(LedgerError::Validation(_))));
    }

    #[test]
    fn test_blank_references() {
        assert!(CustomerId::new("  ").is_blank());
        assert!(!ProjectId::new("P-100").is_blank());
    }
}
