//! Constants shared between the registry client and ledger gateways.
//!
//! Keep the HTTP paths stable; deployed gateways route on them.

/// Default directory for the local append-only ledger.
pub const DEFAULT_LEDGER_DIR: &str = ".notary";

/// Default file name of the local append-only ledger.
pub const DEFAULT_LEDGER_FILE: &str = "ledger.jsonl";

/// Gateway path segments.
pub const PATH_HEALTH: &str = "health";
pub const PATH_DOCUMENTS: &str = "documents";
pub const PATH_BY_FINGERPRINT: &str = "by-fingerprint";
pub const PATH_BY_NAME: &str = "by-name";

/// Version string sent to gateways and embedded in transaction ids.
pub const CLIENT_VERSION: &str = "v1";

pub fn user_agent() -> String {
    format!("notary-registry/{CLIENT_VERSION}")
}
