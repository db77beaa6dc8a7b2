//! Signer identity capability.
//!
//! Acquiring an identity (wallet prompts, key unlocks) happens outside the
//! notary. The pipeline only ever sees the opaque token an `IdentityProvider`
//! hands back.

use async_trait::async_trait;

use crate::errors::{NotaryError, NotaryResult};
use crate::model::SignerIdentity;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Ask the collaborator for an identity, running its authorization flow if needed.
    async fn request_identity(&self) -> NotaryResult<SignerIdentity>;

    /// The identity already authorized, if any. Never prompts.
    fn current_identity(&self) -> Option<SignerIdentity>;
}

/// A provider with a fixed, pre-authorized token (CLI `--signer`, tests).
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    identity: Option<SignerIdentity>,
}

impl StaticIdentity {
    pub fn new(token: impl Into<String>) -> NotaryResult<Self> {
        Ok(Self {
            identity: Some(SignerIdentity::new(token)?),
        })
    }

    pub fn none() -> Self {
        Self { identity: None }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentity {
    async fn request_identity(&self) -> NotaryResult<SignerIdentity> {
        self.identity
            .clone()
            .ok_or_else(|| NotaryError::identity_unavailable("no signer identity configured"))
    }

    fn current_identity(&self) -> Option<SignerIdentity> {
        self.identity.clone()
    }
}
