//! notary-core
//!
//! Core primitives for the document notary:
//! - Fingerprint / record models
//! - SHA-256 content fingerprinting
//! - Typed error kinds shared by every crate
//! - Explicit configuration (no environment reads)
//! - Identity and clock capabilities
//! - The notarization pipeline (fingerprint -> register -> watermark)

pub mod clock;
pub mod config;
pub mod errors;
pub mod fingerprint;
pub mod identity;
pub mod model;
pub mod naming;
pub mod pipeline;

pub use crate::errors::{ErrorKind, NotaryError, NotaryResult};

/// Convenience re-exports.
pub mod prelude {
    pub use crate::clock::{Clock, FixedClock, SystemClock};
    pub use crate::config::{validate_config, LimitsConfig, NotaryConfig, TextPolicy, WatermarkConfig};
    pub use crate::fingerprint::{fingerprint, fingerprint_reader, fingerprint_reader_limited};
    pub use crate::identity::{IdentityProvider, StaticIdentity};
    pub use crate::model::{DocumentRecord, Fingerprint, RecordReceipt, Registration, SignerIdentity};
    pub use crate::naming::signed_file_name;
    pub use crate::pipeline::{
        provenance_text, DocumentRegistry, Notarization, NotarizationFailure, NotarizationRequest,
        NotarizationState, Notary, ProvenanceEmbedder, Stage,
    };
    pub use crate::{ErrorKind, NotaryError, NotaryResult};
}
