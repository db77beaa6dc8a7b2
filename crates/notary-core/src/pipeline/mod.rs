//! Notarization pipeline.
//!
//! A request moves through three stages, each feeding the next:
//! - fingerprint the original bytes
//! - submit (fingerprint, name, signer) to the registry
//! - embed `File hash: <fingerprint>` into a derivative copy
//!
//! The registry and the watermark engine are reached through the
//! [`DocumentRegistry`] and [`ProvenanceEmbedder`] traits so this crate stays free
//! of ledger and PDF dependencies. Query flows bypass the pipeline and go
//! straight to the registry.
//!
//! There is no rollback. The only durable side effect is the ledger record,
//! and it is deliberately left standing if watermarking fails afterwards.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::errors::{NotaryError, NotaryResult};
use crate::fingerprint::fingerprint;
use crate::identity::IdentityProvider;
use crate::model::{DocumentRecord, Fingerprint, RecordReceipt, Registration, SignerIdentity};

pub mod state;

pub use state::{NotarizationFailure, NotarizationState, Stage};

/// Prefix of the provenance marker drawn on derivatives.
pub const PROVENANCE_PREFIX: &str = "File hash: ";

/// The marker embedded for a fingerprint.
pub fn provenance_text(fp: &Fingerprint) -> String {
    format!("{PROVENANCE_PREFIX}{fp}")
}

/// Registry seam: the dual-keyed (fingerprint, name) record store.
#[async_trait]
pub trait DocumentRegistry: Send + Sync {
    /// Record a new association and wait for durable acceptance.
    async fn submit(
        &self,
        fingerprint: &Fingerprint,
        name: &str,
        signer: &SignerIdentity,
    ) -> NotaryResult<RecordReceipt>;

    async fn get_by_fingerprint(&self, fingerprint: &Fingerprint) -> NotaryResult<Option<DocumentRecord>>;

    async fn get_by_name(&self, name: &str) -> NotaryResult<Option<DocumentRecord>>;
}

/// Watermark seam: produce a derivative carrying `text` on every page.
#[async_trait]
pub trait ProvenanceEmbedder: Send + Sync {
    async fn embed_provenance(&self, document: &[u8], text: &str) -> NotaryResult<Vec<u8>>;
}

/// Input of a single notarization.
#[derive(Debug, Clone)]
pub struct NotarizationRequest<'a> {
    pub document: &'a [u8],
    pub name: String,
    pub signer: SignerIdentity,
}

/// Successful result of a notarization.
#[derive(Debug, Clone, Serialize)]
pub struct Notarization {
    pub fingerprint: Fingerprint,
    pub registration: Registration,
    #[serde(skip)]
    pub derivative: Vec<u8>,
    pub transitions: Vec<NotarizationState>,
}

/// Composes a registry and an embedder into the notarization pipeline.
pub struct Notary<R, E> {
    registry: R,
    embedder: E,
}

struct Run {
    transitions: Vec<NotarizationState>,
    fingerprint: Option<Fingerprint>,
    recorded: bool,
}

impl Run {
    fn new() -> Self {
        Self {
            transitions: vec![NotarizationState::Idle],
            fingerprint: None,
            recorded: false,
        }
    }

    fn enter(&mut self, state: NotarizationState) {
        info!(state = state.name(), "notarization transition");
        self.transitions.push(state);
    }

    fn fail(mut self, stage: Stage, error: NotaryError) -> NotarizationFailure {
        warn!(
            stage = stage.as_str(),
            kind = error.kind().as_str(),
            record_left_standing = self.recorded,
            "notarization failed: {error}"
        );
        self.transitions.push(NotarizationState::Failed {
            stage,
            kind: error.kind(),
        });
        NotarizationFailure {
            stage,
            error,
            fingerprint: self.fingerprint,
            ledger_record_left_standing: self.recorded,
            transitions: self.transitions,
        }
    }
}

impl<R, E> Notary<R, E>
where
    R: DocumentRegistry,
    E: ProvenanceEmbedder,
{
    pub fn new(registry: R, embedder: E) -> Self {
        Self { registry, embedder }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Run the full pipeline for one document.
    ///
    /// Dropping the returned future abandons the request. If the registering
    /// stage already completed, the ledger record stays: submission cannot be
    /// retracted.
    pub async fn notarize(
        &self,
        req: NotarizationRequest<'_>,
    ) -> Result<Notarization, NotarizationFailure> {
        let mut run = Run::new();

        run.enter(NotarizationState::Fingerprinting);
        if req.name.trim().is_empty() {
            return Err(run.fail(
                Stage::Fingerprinting,
                NotaryError::invalid_argument("document name must not be empty"),
            ));
        }
        let fp = fingerprint(req.document);
        run.fingerprint = Some(fp.clone());

        run.enter(NotarizationState::Registering {
            fingerprint: fp.clone(),
        });
        let registration = match self.registry.submit(&fp, &req.name, &req.signer).await {
            Ok(receipt) => {
                run.recorded = true;
                Registration::Recorded { receipt }
            }
            Err(NotaryError::DuplicateRecord { existing, .. }) => {
                info!(fingerprint = %fp, "document already notarized; continuing");
                Registration::AlreadyNotarized {
                    existing: existing.map(|b| *b),
                }
            }
            Err(e) => return Err(run.fail(Stage::Registering, e)),
        };

        run.enter(NotarizationState::Watermarking {
            fingerprint: fp.clone(),
        });
        let derivative = match self
            .embedder
            .embed_provenance(req.document, &provenance_text(&fp))
            .await
        {
            Ok(bytes) => bytes,
            Err(e) => return Err(run.fail(Stage::Watermarking, e)),
        };

        run.enter(NotarizationState::Complete {
            fingerprint: fp.clone(),
        });
        Ok(Notarization {
            fingerprint: fp,
            registration,
            derivative,
            transitions: run.transitions,
        })
    }

    /// Notarize with whatever identity `provider` has, prompting it if needed.
    pub async fn notarize_as(
        &self,
        provider: &dyn IdentityProvider,
        document: &[u8],
        name: impl Into<String>,
    ) -> Result<Notarization, NotarizationFailure> {
        let signer = match provider.current_identity() {
            Some(id) => id,
            None => match provider.request_identity().await {
                Ok(id) => id,
                Err(e) => return Err(Run::new().fail(Stage::Identifying, e)),
            },
        };
        self.notarize(NotarizationRequest {
            document,
            name: name.into(),
            signer,
        })
        .await
    }

    pub async fn lookup_by_fingerprint(&self, fp: &Fingerprint) -> NotaryResult<Option<DocumentRecord>> {
        self.registry.get_by_fingerprint(fp).await
    }

    pub async fn lookup_by_name(&self, name: &str) -> NotaryResult<Option<DocumentRecord>> {
        self.registry.get_by_name(name).await
    }
}

#[async_trait]
impl<T: DocumentRegistry + ?Sized> DocumentRegistry for std::sync::Arc<T> {
    async fn submit(
        &self,
        fingerprint: &Fingerprint,
        name: &str,
        signer: &SignerIdentity,
    ) -> NotaryResult<RecordReceipt> {
        (**self).submit(fingerprint, name, signer).await
    }

    async fn get_by_fingerprint(&self, fingerprint: &Fingerprint) -> NotaryResult<Option<DocumentRecord>> {
        (**self).get_by_fingerprint(fingerprint).await
    }

    async fn get_by_name(&self, name: &str) -> NotaryResult<Option<DocumentRecord>> {
        (**self).get_by_name(name).await
    }
}

#[async_trait]
impl<T: ProvenanceEmbedder + ?Sized> ProvenanceEmbedder for std::sync::Arc<T> {
    async fn embed_provenance(&self, document: &[u8], text: &str) -> NotaryResult<Vec<u8>> {
        (**self).embed_provenance(document, text).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use assert_matches::assert_matches;

    use super::*;
    use crate::errors::ErrorKind;
    use crate::identity::StaticIdentity;

    #[derive(Default)]
    struct MapRegistry {
        records: Mutex<BTreeMap<Fingerprint, DocumentRecord>>,
        unavailable: bool,
    }

    #[async_trait]
    impl DocumentRegistry for MapRegistry {
        async fn submit(
            &self,
            fingerprint: &Fingerprint,
            name: &str,
            signer: &SignerIdentity,
        ) -> NotaryResult<RecordReceipt> {
            if self.unavailable {
                return Err(NotaryError::ledger_unavailable("offline"));
            }
            let mut map = self.records.lock().unwrap();
            if let Some(existing) = map.get(fingerprint) {
                return Err(NotaryError::duplicate(fingerprint.as_str(), Some(existing.clone())));
            }
            map.insert(
                fingerprint.clone(),
                DocumentRecord {
                    fingerprint: fingerprint.clone(),
                    name: name.to_string(),
                    signer: signer.clone(),
                    signed_at: 100,
                },
            );
            Ok(RecordReceipt {
                fingerprint: fingerprint.clone(),
                tx_id: "tx-1".to_string(),
                signed_at: 100,
            })
        }

        async fn get_by_fingerprint(&self, fingerprint: &Fingerprint) -> NotaryResult<Option<DocumentRecord>> {
            Ok(self.records.lock().unwrap().get(fingerprint).cloned())
        }

        async fn get_by_name(&self, name: &str) -> NotaryResult<Option<DocumentRecord>> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .values()
                .find(|r| r.name == name)
                .cloned())
        }
    }

    /// Appends the marker to the bytes; rejects documents starting with `!`.
    struct AppendEmbedder;

    #[async_trait]
    impl ProvenanceEmbedder for AppendEmbedder {
        async fn embed_provenance(&self, document: &[u8], text: &str) -> NotaryResult<Vec<u8>> {
            if document.first() == Some(&b'!') {
                return Err(NotaryError::unsupported_document("corrupt header"));
            }
            let mut out = document.to_vec();
            out.extend_from_slice(text.as_bytes());
            Ok(out)
        }
    }

    fn request<'a>(doc: &'a [u8], name: &str, signer: &str) -> NotarizationRequest<'a> {
        NotarizationRequest {
            document: doc,
            name: name.to_string(),
            signer: SignerIdentity::new(signer).unwrap(),
        }
    }

    #[tokio::test]
    async fn happy_path_walks_every_state() {
        let notary = Notary::new(MapRegistry::default(), AppendEmbedder);
        let out = notary.notarize(request(b"doc", "a.pdf", "0xA")).await.unwrap();

        let names: Vec<_> = out.transitions.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            ["idle", "fingerprinting", "registering", "watermarking", "complete"]
        );
        assert!(out.registration.is_new());
        assert!(out.derivative.ends_with(provenance_text(&out.fingerprint).as_bytes()));

        let rec = notary.lookup_by_fingerprint(&out.fingerprint).await.unwrap().unwrap();
        assert_eq!(rec.name, "a.pdf");
    }

    #[tokio::test]
    async fn duplicate_counts_as_complete_and_keeps_first_signer() {
        let notary = Notary::new(MapRegistry::default(), AppendEmbedder);
        notary.notarize(request(b"doc", "a.pdf", "0xA")).await.unwrap();
        let second = notary.notarize(request(b"doc", "b.pdf", "0xB")).await.unwrap();

        assert_matches!(
            &second.registration,
            Registration::AlreadyNotarized { existing: Some(r) } if r.signer.as_str() == "0xA"
        );
        let rec = notary.lookup_by_fingerprint(&second.fingerprint).await.unwrap().unwrap();
        assert_eq!(rec.signer.as_str(), "0xA");
        assert_eq!(rec.name, "a.pdf");
    }

    #[tokio::test]
    async fn ledger_failure_keeps_its_kind() {
        let reg = MapRegistry {
            unavailable: true,
            ..Default::default()
        };
        let notary = Notary::new(reg, AppendEmbedder);
        let fail = notary.notarize(request(b"doc", "a.pdf", "0xA")).await.unwrap_err();

        assert_eq!(fail.stage, Stage::Registering);
        assert_eq!(fail.kind(), ErrorKind::LedgerUnavailable);
        assert!(fail.error.is_retryable());
        assert!(!fail.ledger_record_left_standing);
        assert_matches!(
            fail.transitions.last(),
            Some(NotarizationState::Failed { stage: Stage::Registering, kind: ErrorKind::LedgerUnavailable })
        );
    }

    #[tokio::test]
    async fn watermark_failure_leaves_record_standing() {
        let notary = Notary::new(MapRegistry::default(), AppendEmbedder);
        let fail = notary.notarize(request(b"!broken", "a.pdf", "0xA")).await.unwrap_err();

        assert_eq!(fail.stage, Stage::Watermarking);
        assert_eq!(fail.kind(), ErrorKind::UnsupportedDocumentFormat);
        assert!(fail.ledger_record_left_standing);

        let fp = fail.fingerprint.unwrap();
        assert!(notary.lookup_by_fingerprint(&fp).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn empty_name_rejected_before_registering() {
        let notary = Notary::new(MapRegistry::default(), AppendEmbedder);
        let fail = notary.notarize(request(b"doc", "  ", "0xA")).await.unwrap_err();
        assert_eq!(fail.stage, Stage::Fingerprinting);
        assert_eq!(fail.kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn notarize_as_without_identity_fails_typed() {
        let notary = Notary::new(MapRegistry::default(), AppendEmbedder);
        let fail = notary
            .notarize_as(&StaticIdentity::none(), b"doc", "a.pdf")
            .await
            .unwrap_err();
        assert_eq!(fail.kind(), ErrorKind::IdentityUnavailable);
        assert_eq!(fail.stage, Stage::Identifying);
        assert!(fail.fingerprint.is_none());
        assert!(!fail.ledger_record_left_standing);
        assert_eq!(
            fail.transitions,
            vec![
                NotarizationState::Idle,
                NotarizationState::Failed { stage: Stage::Identifying, kind: ErrorKind::IdentityUnavailable },
            ]
        );
        assert!(fail.to_string().starts_with("notarization failed while identifying"));
        assert!(notary.lookup_by_name("a.pdf").await.unwrap().is_none());

        let ok = notary
            .notarize_as(&StaticIdentity::new("0xA").unwrap(), b"doc", "a.pdf")
            .await
            .unwrap();
        assert!(ok.registration.is_new());
    }

    #[tokio::test]
    async fn query_miss_is_none() {
        let notary = Notary::new(MapRegistry::default(), AppendEmbedder);
        let zero = Fingerprint::parse(&"00".repeat(32)).unwrap();
        assert!(notary.lookup_by_fingerprint(&zero).await.unwrap().is_none());
        assert!(notary.lookup_by_name("missing.pdf").await.unwrap().is_none());
    }
}
