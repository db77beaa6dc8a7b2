//! The external ledger contract.
//!
//! A ledger is an append-only transactional key-value service keyed by
//! fingerprint, with a secondary lookup by name. Everything crossing this
//! boundary is a primitive scalar; the `RegistryClient` turns it back into
//! typed records and rejects anything malformed.
//!
//! Every bundled backend enforces the same duplicate policy: a second submit of
//! a known fingerprint is rejected with `DuplicateRecord` and the first
//! writer's record is kept.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use notary_core::model::{DocumentRecord, Fingerprint, SignerIdentity};
use notary_core::{NotaryError, NotaryResult};

pub mod file;
pub mod http;
pub mod memory;

pub use file::FileLedger;
pub use http::HttpLedger;
pub use memory::InMemoryLedger;

/// Wire form of a document record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub fingerprint: String,
    pub name: String,
    pub signer: String,
    pub signed_at: i64,
}

impl LedgerRecord {
    /// Validate and convert into a typed record.
    pub fn into_document(self) -> NotaryResult<DocumentRecord> {
        let fingerprint = Fingerprint::parse(&self.fingerprint).map_err(|e| {
            NotaryError::ledger_protocol(format!("ledger returned invalid fingerprint: {e}"))
        })?;
        let signer = SignerIdentity::new(self.signer).map_err(|_| {
            NotaryError::ledger_protocol("ledger returned record without signer")
        })?;
        if self.signed_at < 0 {
            return Err(NotaryError::ledger_protocol(format!(
                "ledger returned negative timestamp: {}",
                self.signed_at
            )));
        }
        Ok(DocumentRecord {
            fingerprint,
            name: self.name,
            signer,
            signed_at: self.signed_at,
        })
    }
}

impl From<&DocumentRecord> for LedgerRecord {
    fn from(r: &DocumentRecord) -> Self {
        Self {
            fingerprint: r.fingerprint.to_string(),
            name: r.name.clone(),
            signer: r.signer.to_string(),
            signed_at: r.signed_at,
        }
    }
}

/// Ledger confirmation of a durable write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_id: String,
}

#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Short backend label for logs and diagnostics.
    fn backend(&self) -> &'static str;

    /// Readiness probe used by `RegistryClient::connect`.
    async fn ping(&self) -> NotaryResult<()>;

    async fn submit_document(&self, record: &LedgerRecord) -> NotaryResult<TxReceipt>;

    async fn get_document_by_fingerprint(&self, fingerprint: &str) -> NotaryResult<Option<LedgerRecord>>;

    async fn get_document_by_name(&self, name: &str) -> NotaryResult<Option<LedgerRecord>>;
}

/// Fingerprint and name indexes shared by the local backends.
///
/// Names are not unique; the name index resolves to the most recently
/// accepted record carrying that name.
#[derive(Debug, Default)]
pub(crate) struct LedgerIndex {
    by_fingerprint: BTreeMap<String, LedgerRecord>,
    by_name: BTreeMap<String, String>,
    accepted: u64,
}

impl LedgerIndex {
    pub(crate) fn check_new(&self, record: &LedgerRecord) -> NotaryResult<()> {
        match self.by_fingerprint.get(&record.fingerprint) {
            Some(existing) => Err(NotaryError::duplicate(
                record.fingerprint.clone(),
                existing.clone().into_document().ok(),
            )),
            None => Ok(()),
        }
    }

    /// Insert a record already checked with `check_new`; returns its sequence number.
    pub(crate) fn insert(&mut self, record: LedgerRecord) -> u64 {
        self.accepted += 1;
        self.by_name
            .insert(record.name.clone(), record.fingerprint.clone());
        self.by_fingerprint
            .insert(record.fingerprint.clone(), record);
        self.accepted
    }

    pub(crate) fn get(&self, fingerprint: &str) -> Option<LedgerRecord> {
        self.by_fingerprint.get(fingerprint).cloned()
    }

    pub(crate) fn get_by_name(&self, name: &str) -> Option<LedgerRecord> {
        self.by_name
            .get(name)
            .and_then(|fp| self.by_fingerprint.get(fp))
            .cloned()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_fingerprint.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notary_core::ErrorKind;

    fn rec(fp: char, name: &str, signer: &str) -> LedgerRecord {
        LedgerRecord {
            fingerprint: fp.to_string().repeat(64),
            name: name.to_string(),
            signer: signer.to_string(),
            signed_at: 10,
        }
    }

    #[test]
    fn into_document_rejects_malformed_fields() {
        let mut r = rec('a', "x.pdf", "0xA");
        r.fingerprint = "xyz".into();
        assert_eq!(r.into_document().unwrap_err().kind(), ErrorKind::LedgerProtocol);

        let r = rec('a', "x.pdf", "");
        assert_eq!(r.into_document().unwrap_err().kind(), ErrorKind::LedgerProtocol);

        let mut r = rec('a', "x.pdf", "0xA");
        r.signed_at = -1;
        assert_eq!(r.into_document().unwrap_err().kind(), ErrorKind::LedgerProtocol);
    }

    #[test]
    fn index_keeps_first_writer_and_latest_name() {
        let mut idx = LedgerIndex::default();
        let first = rec('a', "same.pdf", "0xA");
        idx.check_new(&first).unwrap();
        idx.insert(first);

        let dup = rec('a', "other.pdf", "0xB");
        let err = idx.check_new(&dup).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateRecord);

        let second = rec('b', "same.pdf", "0xC");
        idx.check_new(&second).unwrap();
        idx.insert(second);

        assert_eq!(idx.get(&"a".repeat(64)).unwrap().signer, "0xA");
        assert_eq!(idx.get_by_name("same.pdf").unwrap().signer, "0xC");
        assert_eq!(idx.len(), 2);
    }
}
