//! In-process ledger.
//!
//! Holds records for the lifetime of the process. Used by tests and by hosts
//! that only need a scratch registry.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use notary_core::{NotaryError, NotaryResult};

use crate::constants::CLIENT_VERSION;
use crate::ledger::{LedgerClient, LedgerIndex, LedgerRecord, TxReceipt};

#[derive(Debug, Default)]
pub struct InMemoryLedger {
    index: RwLock<LedgerIndex>,
    offline: AtomicBool,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: every call fails with `LedgerUnavailable` until reset.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn ensure_online(&self) -> NotaryResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(NotaryError::ledger_unavailable("in-memory ledger is offline"));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> NotaryResult<()> {
        self.ensure_online()
    }

    async fn submit_document(&self, record: &LedgerRecord) -> NotaryResult<TxReceipt> {
        self.ensure_online()?;
        let mut index = self.index.write();
        index.check_new(record)?;
        let seq = index.insert(record.clone());
        debug!(fingerprint = %record.fingerprint, seq, "memory ledger accepted record");
        Ok(TxReceipt {
            tx_id: format!("memory:{CLIENT_VERSION}:{seq}"),
        })
    }

    async fn get_document_by_fingerprint(&self, fingerprint: &str) -> NotaryResult<Option<LedgerRecord>> {
        self.ensure_online()?;
        Ok(self.index.read().get(fingerprint))
    }

    async fn get_document_by_name(&self, name: &str) -> NotaryResult<Option<LedgerRecord>> {
        self.ensure_online()?;
        Ok(self.index.read().get_by_name(name))
    }
}
