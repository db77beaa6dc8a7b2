//! Notary data model.
//!
//! These are plain value types. Policy (uniqueness, resolution of duplicate
//! names, timestamps) lives in the registry; I/O lives in the hosts.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{NotaryError, NotaryResult};

/// Hex width of a SHA-256 fingerprint.
pub const FINGERPRINT_HEX_LEN: usize = 64;

/// Content-addressed identifier of a document: lowercase SHA-256 hex.
///
/// The only ways to obtain one are hashing bytes (`crate::fingerprint`) or
/// parsing a 64-char hex string, so every value is well formed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Parse a user or ledger supplied fingerprint.
    ///
    /// Accepts upper or lower case hex surrounded by whitespace and normalizes
    /// to lowercase.
    pub fn parse(s: &str) -> NotaryResult<Self> {
        let s = s.trim();
        if s.len() != FINGERPRINT_HEX_LEN {
            return Err(NotaryError::invalid_argument(format!(
                "fingerprint must be {FINGERPRINT_HEX_LEN} hex chars, got {}",
                s.len()
            )));
        }
        if !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(NotaryError::invalid_argument(
                "fingerprint must be hexadecimal",
            ));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    pub(crate) fn from_digest(digest: &[u8]) -> Self {
        Self(hex::encode(digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = NotaryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Fingerprint> for String {
    fn from(f: Fingerprint) -> Self {
        f.0
    }
}

/// Opaque token naming whoever notarized a document (e.g. a public address).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignerIdentity(String);

impl SignerIdentity {
    pub fn new(token: impl Into<String>) -> NotaryResult<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(NotaryError::identity_unavailable(
                "signer identity must not be empty",
            ));
        }
        Ok(Self(token))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SignerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The registry's immutable association of a fingerprint with a signer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub fingerprint: Fingerprint,
    pub name: String,
    pub signer: SignerIdentity,
    /// Unix epoch seconds.
    pub signed_at: i64,
}

/// Confirmation that the ledger durably accepted a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordReceipt {
    pub fingerprint: Fingerprint,
    pub tx_id: String,
    pub signed_at: i64,
}

/// Outcome of the registering step. Both variants mean "notarized".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Registration {
    Recorded { receipt: RecordReceipt },
    AlreadyNotarized { existing: Option<DocumentRecord> },
}

impl Registration {
    pub fn is_new(&self) -> bool {
        matches!(self, Self::Recorded { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_normalizes_case_and_whitespace() {
        let upper = format!("  {}  ", "AB".repeat(32));
        let f = Fingerprint::parse(&upper).unwrap();
        assert_eq!(f.as_str(), "ab".repeat(32));
    }

    #[test]
    fn parse_rejects_bad_length_and_chars() {
        assert!(Fingerprint::parse("abc").is_err());
        assert!(Fingerprint::parse(&"zz".repeat(32)).is_err());
    }

    #[test]
    fn fingerprint_serde_is_a_plain_string() {
        let f = Fingerprint::parse(&"0".repeat(64)).unwrap();
        let s = serde_json::to_string(&f).unwrap();
        assert_eq!(s, format!("\"{}\"", "0".repeat(64)));
        assert!(serde_json::from_str::<Fingerprint>("\"nothex\"").is_err());
    }

    #[test]
    fn empty_signer_rejected() {
        assert!(SignerIdentity::new("   ").is_err());
        assert_eq!(SignerIdentity::new("0xABC").unwrap().as_str(), "0xABC");
    }
}
