use std::sync::Arc;

use anyhow::Result;

use notary_core::clock::SystemClock;
use notary_core::pipeline::NotarizationFailure;
use notary_core::{ErrorKind, NotaryError, NotaryResult};
use notary_registry::{FileLedger, HttpLedger, LedgerClient, RegistryClient};

use crate::args::{Cli, Command};

mod doctor;
mod hash;
mod lookup;
mod sign;

pub async fn dispatch(cli: Cli) -> Result<()> {
    match &cli.command {
        Command::Sign {
            file,
            signer,
            name,
            out,
            logo,
            text_policy,
        } => {
            let opts = sign::SignOpts {
                file,
                signer,
                name: name.as_deref(),
                out: out.as_deref(),
                logo,
                text_policy,
            };
            sign::run(&cli, opts).await
        }
        Command::Hash { file } => hash::run(&cli, file).await,
        Command::Lookup { fingerprint, name } => {
            lookup::run(&cli, fingerprint.as_deref(), name.as_deref()).await
        }
        Command::Doctor { logo } => doctor::run(&cli, logo).await,
    }
}

/// The ledger selected by the global flags; `--ledger-url` wins over `--ledger`.
pub fn open_ledger(cli: &Cli) -> NotaryResult<Arc<dyn LedgerClient>> {
    match &cli.ledger_url {
        Some(url) => Ok(Arc::new(HttpLedger::new(url)?)),
        None => Ok(Arc::new(FileLedger::open(&cli.ledger)?)),
    }
}

pub async fn connect_registry(cli: &Cli) -> NotaryResult<RegistryClient> {
    RegistryClient::connect(open_ledger(cli)?, Arc::new(SystemClock)).await
}

/// Typed kind behind an error chain, if it came from the notary crates.
pub fn error_kind(err: &anyhow::Error) -> Option<ErrorKind> {
    if let Some(e) = err.downcast_ref::<NotaryError>() {
        return Some(e.kind());
    }
    err.downcast_ref::<NotarizationFailure>().map(|f| f.kind())
}

/// 2: bad input or document, 3: ledger unreachable, 4: ledger misbehaved, 1: other.
pub fn exit_code(kind: Option<ErrorKind>) -> u8 {
    match kind {
        Some(
            ErrorKind::InputRead
            | ErrorKind::UnsupportedDocumentFormat
            | ErrorKind::InvalidArgument
            | ErrorKind::IdentityUnavailable,
        ) => 2,
        Some(ErrorKind::LedgerUnavailable) => 3,
        Some(ErrorKind::LedgerProtocol) => 4,
        Some(ErrorKind::DuplicateRecord) | None => 1,
    }
}

pub fn recovery_hint(kind: Option<ErrorKind>) -> Option<&'static str> {
    match kind? {
        ErrorKind::InputRead => Some("check the file path and permissions, or raise --max-input-bytes"),
        ErrorKind::UnsupportedDocumentFormat => Some("the input must be a readable PDF"),
        ErrorKind::InvalidArgument => Some("check the command arguments"),
        ErrorKind::IdentityUnavailable => Some("pass a signer token with --signer"),
        ErrorKind::LedgerUnavailable => Some("the ledger is unreachable; retry later or check --ledger/--ledger-url"),
        ErrorKind::LedgerProtocol => Some("the ledger returned an unexpected reply; check --ledger-url points at a notary gateway"),
        ErrorKind::DuplicateRecord => None,
    }
}
