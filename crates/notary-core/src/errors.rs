//! Error types shared by every notary crate.
//!
//! Each variant is a distinct error *kind* that callers are expected to match on:
//! the CLI maps them to different exit codes and recovery hints, and the
//! orchestrator carries them unchanged into its terminal failure state.
//!
//! A query miss is not an error. Lookups return `Ok(None)`.

use serde::Serialize;
use thiserror::Error;

use crate::model::DocumentRecord;

pub type NotaryResult<T> = Result<T, NotaryError>;

#[derive(Debug, Error)]
pub enum NotaryError {
    /// The source bytes could not be fully materialized.
    #[error("input read error: {0}")]
    InputRead(String),

    /// Transient network or ledger fault. Retryable by the caller.
    #[error("ledger unavailable: {0}")]
    LedgerUnavailable(String),

    /// The ledger answered with something that does not fit the contract.
    #[error("ledger protocol error: {0}")]
    LedgerProtocol(String),

    /// The fingerprint is already registered. `existing` carries the first
    /// writer's record when the ledger reports it.
    #[error("document already notarized: {fingerprint}")]
    DuplicateRecord {
        fingerprint: String,
        existing: Option<Box<DocumentRecord>>,
    },

    #[error("unsupported document format: {0}")]
    UnsupportedDocumentFormat(String),

    #[error("identity unavailable: {0}")]
    IdentityUnavailable(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Copyable discriminant of [`NotaryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InputRead,
    LedgerUnavailable,
    LedgerProtocol,
    DuplicateRecord,
    UnsupportedDocumentFormat,
    IdentityUnavailable,
    InvalidArgument,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InputRead => "input_read",
            Self::LedgerUnavailable => "ledger_unavailable",
            Self::LedgerProtocol => "ledger_protocol",
            Self::DuplicateRecord => "duplicate_record",
            Self::UnsupportedDocumentFormat => "unsupported_document_format",
            Self::IdentityUnavailable => "identity_unavailable",
            Self::InvalidArgument => "invalid_argument",
        }
    }
}

impl NotaryError {
    pub fn input_read(msg: impl Into<String>) -> Self {
        Self::InputRead(msg.into())
    }

    pub fn ledger_unavailable(msg: impl Into<String>) -> Self {
        Self::LedgerUnavailable(msg.into())
    }

    pub fn ledger_protocol(msg: impl Into<String>) -> Self {
        Self::LedgerProtocol(msg.into())
    }

    pub fn duplicate(fingerprint: impl Into<String>, existing: Option<DocumentRecord>) -> Self {
        Self::DuplicateRecord {
            fingerprint: fingerprint.into(),
            existing: existing.map(Box::new),
        }
    }

    pub fn unsupported_document(msg: impl Into<String>) -> Self {
        Self::UnsupportedDocumentFormat(msg.into())
    }

    pub fn identity_unavailable(msg: impl Into<String>) -> Self {
        Self::IdentityUnavailable(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InputRead(_) => ErrorKind::InputRead,
            Self::LedgerUnavailable(_) => ErrorKind::LedgerUnavailable,
            Self::LedgerProtocol(_) => ErrorKind::LedgerProtocol,
            Self::DuplicateRecord { .. } => ErrorKind::DuplicateRecord,
            Self::UnsupportedDocumentFormat(_) => ErrorKind::UnsupportedDocumentFormat,
            Self::IdentityUnavailable(_) => ErrorKind::IdentityUnavailable,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
        }
    }

    /// Only ledger unavailability is worth retrying. Nothing retries internally.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LedgerUnavailable(_))
    }
}

impl From<std::io::Error> for NotaryError {
    fn from(e: std::io::Error) -> Self {
        Self::InputRead(e.to_string())
    }
}
