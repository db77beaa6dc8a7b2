//! Registry client for the document notary.
//!
//! This client:
//! - is constructed explicitly with `connect`, which probes the ledger
//! - stamps new records with its clock and submits them
//! - validates every record the ledger hands back
//!
//! It holds no global state; hosts create one and pass it by reference (or
//! `Arc`) to whatever needs it.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use notary_core::clock::Clock;
use notary_core::model::{DocumentRecord, Fingerprint, RecordReceipt, SignerIdentity};
use notary_core::pipeline::DocumentRegistry;
use notary_core::{NotaryError, NotaryResult};

use crate::ledger::{LedgerClient, LedgerRecord};

#[derive(Clone)]
pub struct RegistryClient {
    ledger: Arc<dyn LedgerClient>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for RegistryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryClient")
            .field("backend", &self.ledger.backend())
            .finish()
    }
}

impl RegistryClient {
    /// Probe the ledger and return a ready client, or `LedgerUnavailable`.
    pub async fn connect(ledger: Arc<dyn LedgerClient>, clock: Arc<dyn Clock>) -> NotaryResult<Self> {
        ledger.ping().await?;
        info!(backend = ledger.backend(), "registry connected");
        Ok(Self { ledger, clock })
    }

    pub fn backend(&self) -> &'static str {
        self.ledger.backend()
    }
}

fn check_key<F>(record: &DocumentRecord, matches: F, what: &str) -> NotaryResult<()>
where
    F: FnOnce(&DocumentRecord) -> bool,
{
    if matches(record) {
        Ok(())
    } else {
        Err(NotaryError::ledger_protocol(format!(
            "ledger returned a record for a different {what}"
        )))
    }
}

#[async_trait]
impl DocumentRegistry for RegistryClient {
    async fn submit(
        &self,
        fingerprint: &Fingerprint,
        name: &str,
        signer: &SignerIdentity,
    ) -> NotaryResult<RecordReceipt> {
        if name.trim().is_empty() {
            return Err(NotaryError::invalid_argument("document name must not be empty"));
        }

        let record = DocumentRecord {
            fingerprint: fingerprint.clone(),
            name: name.to_string(),
            signer: signer.clone(),
            signed_at: self.clock.now_epoch_seconds(),
        };

        match self.ledger.submit_document(&LedgerRecord::from(&record)).await {
            Ok(tx) => {
                info!(fingerprint = %fingerprint, tx_id = %tx.tx_id, "record accepted by ledger");
                Ok(RecordReceipt {
                    fingerprint: record.fingerprint,
                    tx_id: tx.tx_id,
                    signed_at: record.signed_at,
                })
            }
            Err(NotaryError::DuplicateRecord {
                fingerprint: dup,
                existing: None,
            }) => {
                // Gateways may omit the existing record; look it up so callers
                // can see who signed first.
                let existing = self.get_by_fingerprint(fingerprint).await.ok().flatten();
                Err(NotaryError::duplicate(dup, existing))
            }
            Err(e) => Err(e),
        }
    }

    async fn get_by_fingerprint(&self, fingerprint: &Fingerprint) -> NotaryResult<Option<DocumentRecord>> {
        debug!(fingerprint = %fingerprint, "registry lookup by fingerprint");
        let Some(raw) = self
            .ledger
            .get_document_by_fingerprint(fingerprint.as_str())
            .await?
        else {
            return Ok(None);
        };
        let record = raw.into_document()?;
        check_key(&record, |r| &r.fingerprint == fingerprint, "fingerprint")?;
        Ok(Some(record))
    }

    async fn get_by_name(&self, name: &str) -> NotaryResult<Option<DocumentRecord>> {
        debug!(name, "registry lookup by name");
        let Some(raw) = self.ledger.get_document_by_name(name).await? else {
            return Ok(None);
        };
        let record = raw.into_document()?;
        check_key(&record, |r| r.name == name, "name")?;
        Ok(Some(record))
    }
}
