use crate::domain::ids::{PaymentRequestId, ProjectId};
use crate::domain::payment::Payment;
use crate::domain::payment_request::PaymentRequest;
use crate::domain::ports::{LedgerMutator, LedgerStore};
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, Direction, ErrorKind, IteratorMode,
    OptimisticTransactionDB, Options,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Column Family for payment request aggregates, keyed by request id.
pub const CF_REQUESTS: &str = "payment_requests";
/// Column Family for payment logs, keyed by request id followed by payment id.
pub const CF_PAYMENTS: &str = "payments";
/// Column Family indexing requests by project: project length (u32 BE),
/// project, request id.
pub const CF_PROJECT_INDEX: &str = "requests_by_project";

/// A persistent ledger backed by a RocksDB optimistic transaction database.
///
/// Every write goes through a transaction. Reads that feed a write use
/// `get_for_update`, so a concurrent commit on the same request makes ours
/// fail with `Busy`, which is surfaced as `LedgerError::Conflict`.
///
/// `Clone` shares the underlying `Arc<OptimisticTransactionDB>`.
#[derive(Clone)]
pub struct RocksDbLedgerStore {
    db: Arc<OptimisticTransactionDB>,
}

impl RocksDbLedgerStore {
    /// Opens or creates a database at `path` with all ledger column families.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cfs = [CF_REQUESTS, CF_PAYMENTS, CF_PROJECT_INDEX]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()));

        let db: OptimisticTransactionDB = OptimisticTransactionDB::open_cf_descriptors(&opts, path, cfs)?;
        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| LedgerError::StorageUnavailable(format!("column family {name} not found")))
    }

    fn payment_key(payment: &Payment) -> Vec<u8> {
        let mut key = payment.parent_request_id.as_bytes().to_vec();
        key.extend_from_slice(payment.id.as_bytes());
        key
    }

    /// Length-prefixed so no project's prefix is a prefix of another's.
    fn project_prefix(project: &ProjectId) -> Vec<u8> {
        let name = project.as_str().as_bytes();
        let mut key = (name.len() as u32).to_be_bytes().to_vec();
        key.extend_from_slice(name);
        key
    }

    fn project_key(request: &PaymentRequest) -> Vec<u8> {
        let mut key = Self::project_prefix(&request.project_id);
        key.extend_from_slice(request.id.as_bytes());
        key
    }

    /// Maps a failed commit: contention becomes `Conflict`, anything else is a storage failure.
    fn commit_error(id: PaymentRequestId, e: rocksdb::Error) -> LedgerError {
        match e.kind() {
            ErrorKind::Busy | ErrorKind::TryAgain => LedgerError::Conflict(id),
            _ => e.into(),
        }
    }

    fn read_request(&self, id: PaymentRequestId) -> Result<Option<PaymentRequest>> {
        let requests = self.cf(CF_REQUESTS)?;
        match self.db.get_cf(requests, id.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn scan_prefix(&self, cf: &ColumnFamily, prefix: &[u8]) -> Result<Vec<KeyValue>> {
        take_prefix(
            self.db
                .iterator_cf(cf, IteratorMode::From(prefix, Direction::Forward)),
            prefix,
        )
    }
}

type KeyValue = (Box<[u8]>, Box<[u8]>);

fn take_prefix(
    iter: impl Iterator<Item = std::result::Result<KeyValue, rocksdb::Error>>,
    prefix: &[u8],
) -> Result<Vec<KeyValue>> {
    let mut rows = Vec::new();
    for item in iter {
        let (key, value) = item?;
        if !key.starts_with(prefix) {
            break;
        }
        rows.push((key, value));
    }
    Ok(rows)
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(bytes)?)
}

#[async_trait]
impl LedgerStore for RocksDbLedgerStore {
    async fn insert(&self, request: PaymentRequest, opening: Option<Payment>) -> Result<()> {
        let requests = self.cf(CF_REQUESTS)?;
        let payments = self.cf(CF_PAYMENTS)?;
        let index = self.cf(CF_PROJECT_INDEX)?;
        let id = request.id;

        let txn = self.db.transaction();
        if txn.get_for_update_cf(requests, id.as_bytes(), true)?.is_some() {
            return Err(LedgerError::validation(format!(
                "payment request {id} already exists"
            )));
        }
        txn.put_cf(requests, id.as_bytes(), encode(&request)?)?;
        txn.put_cf(index, Self::project_key(&request), b"")?;
        if let Some(payment) = &opening {
            txn.put_cf(payments, Self::payment_key(payment), encode(payment)?)?;
        }
        txn.commit().map_err(|e| Self::commit_error(id, e))
    }

    async fn get(&self, id: PaymentRequestId) -> Result<Option<PaymentRequest>> {
        self.read_request(id)
    }

    async fn payments(&self, id: PaymentRequestId) -> Result<Vec<Payment>> {
        let payments = self.cf(CF_PAYMENTS)?;
        self.scan_prefix(payments, id.as_bytes())?
            .iter()
            .map(|(_key, value)| decode(value))
            .collect()
    }

    async fn get_with_payments(
        &self,
        id: PaymentRequestId,
    ) -> Result<Option<(PaymentRequest, Vec<Payment>)>> {
        let requests = self.cf(CF_REQUESTS)?;
        let payments = self.cf(CF_PAYMENTS)?;

        // Both reads see the same sequence number, so no commit lands in between.
        let snapshot = self.db.snapshot();
        let request: PaymentRequest = match snapshot.get_cf(requests, id.as_bytes())? {
            Some(bytes) => decode(&bytes)?,
            None => return Ok(None),
        };
        let prefix = id.as_bytes();
        let log = take_prefix(
            snapshot.iterator_cf(payments, IteratorMode::From(prefix, Direction::Forward)),
            prefix,
        )?
        .iter()
        .map(|(_key, value)| decode(value))
        .collect::<Result<Vec<Payment>>>()?;
        Ok(Some((request, log)))
    }

    async fn list_by_project(&self, project: &ProjectId) -> Result<Vec<PaymentRequest>> {
        let index = self.cf(CF_PROJECT_INDEX)?;
        let prefix = Self::project_prefix(project);

        let mut found = Vec::new();
        for (key, _) in self.scan_prefix(index, &prefix)? {
            let uuid = Uuid::from_slice(&key[prefix.len()..]).map_err(|e| {
                LedgerError::StorageUnavailable(format!("corrupt project index key: {e}"))
            })?;
            if let Some(request) = self.read_request(PaymentRequestId::from(uuid))? {
                found.push(request);
            }
        }
        Ok(found)
    }

    async fn atomic_update(
        &self,
        id: PaymentRequestId,
        mutator: LedgerMutator<'_>,
    ) -> Result<(PaymentRequest, Payment)> {
        let requests = self.cf(CF_REQUESTS)?;
        let payments = self.cf(CF_PAYMENTS)?;

        let txn = self.db.transaction();
        let current: PaymentRequest = match txn.get_for_update_cf(requests, id.as_bytes(), true)? {
            Some(bytes) => decode(&bytes)?,
            None => return Err(LedgerError::NotFound(id)),
        };

        let (updated, payment) = mutator(&current)?;
        if updated.id != id || payment.parent_request_id != id {
            return Err(LedgerError::validation(format!(
                "mutator changed the identity of payment request {id}"
            )));
        }

        txn.put_cf(requests, id.as_bytes(), encode(&updated)?)?;
        txn.put_cf(payments, Self::payment_key(&payment), encode(&payment)?)?;
        txn.commit().map_err(|e| Self::commit_error(id, e))?;
        Ok((updated, payment))
    }

    async fn set_external_invoice_number(
        &self,
        id: PaymentRequestId,
        number: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<PaymentRequest> {
        let requests = self.cf(CF_REQUESTS)?;

        // The whole record is rewritten, so this must lose to a concurrent
        // reconciliation rather than overwrite its aggregate.
        let txn = self.db.transaction();
        let mut request: PaymentRequest = match txn.get_for_update_cf(requests, id.as_bytes(), true)? {
            Some(bytes) => decode(&bytes)?,
            None => return Err(LedgerError::NotFound(id)),
        };
        request.external_invoice_number = number;
        request.updated_at = now;

        txn.put_cf(requests, id.as_bytes(), encode(&request)?)?;
        txn.commit().map_err(|e| Self::commit_error(id, e))?;
        Ok(request)
    }
}
