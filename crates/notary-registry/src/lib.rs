//! notary-registry
//!
//! Off-chain wiring between the notary and an append-only ledger.
//!
//! It includes:
//! - the `LedgerClient` contract (submit, get by fingerprint, get by name)
//! - `RegistryClient`, which stamps, submits, and validates records
//! - ledger backends: in-memory, append-only JSON-lines file, HTTP gateway
//!
//! Duplicate policy: a fingerprint is registered once. Later submits fail with
//! `DuplicateRecord` and the first writer's signer and timestamp are kept.

pub mod constants;
pub mod ledger;
pub mod registry_client;

pub use constants::*;
pub use ledger::{FileLedger, HttpLedger, InMemoryLedger, LedgerClient, LedgerRecord, TxReceipt};
pub use registry_client::*;
