//! Notarization state machine.
//!
//! ```text
//! Idle -> Fingerprinting -> Registering -> Watermarking -> Complete
//!   \___________\________________\______________\-> Failed { stage, kind }
//! ```
//!
//! `notarize_as` resolves the signer while still `Idle`; a failure there is
//! `Failed { stage: Identifying }` straight from `Idle`.

use serde::Serialize;

use crate::errors::{ErrorKind, NotaryError};
use crate::model::Fingerprint;

/// A non-terminal step of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Identifying,
    Fingerprinting,
    Registering,
    Watermarking,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Identifying => "identifying",
            Self::Fingerprinting => "fingerprinting",
            Self::Registering => "registering",
            Self::Watermarking => "watermarking",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum NotarizationState {
    Idle,
    Fingerprinting,
    Registering { fingerprint: Fingerprint },
    Watermarking { fingerprint: Fingerprint },
    Complete { fingerprint: Fingerprint },
    Failed { stage: Stage, kind: ErrorKind },
}

impl NotarizationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Failed { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Fingerprinting => "fingerprinting",
            Self::Registering { .. } => "registering",
            Self::Watermarking { .. } => "watermarking",
            Self::Complete { .. } => "complete",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Terminal failure of a notarization request.
///
/// `error` is the component error exactly as it was raised.
#[derive(Debug, thiserror::Error)]
#[error("notarization failed while {}: {error}", .stage.as_str())]
pub struct NotarizationFailure {
    pub stage: Stage,
    pub error: NotaryError,
    /// Known once fingerprinting succeeded.
    pub fingerprint: Option<Fingerprint>,
    /// True when the ledger accepted the record before the failure. The record
    /// is not rolled back.
    pub ledger_record_left_standing: bool,
    pub transitions: Vec<NotarizationState>,
}

impl NotarizationFailure {
    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }
}
