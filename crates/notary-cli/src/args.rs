use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand};

/// 256 MiB.
pub const DEFAULT_MAX_INPUT_BYTES: u64 = 256 * 1024 * 1024;

#[derive(Parser, Debug, Clone)]
#[command(name = "notary", version, about = "Document notary CLI")]
pub struct Cli {
    /// Emit JSON output on stdout and JSON logs on stderr.
    #[arg(long, global = true)]
    pub json: bool,

    /// Log filter (e.g. info, debug, notary_registry=trace). Overrides RUST_LOG.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Local append-only ledger file.
    #[arg(long, global = true, default_value = ".notary/ledger.jsonl")]
    pub ledger: PathBuf,

    /// Remote ledger gateway; takes precedence over --ledger.
    #[arg(long, global = true)]
    pub ledger_url: Option<String>,

    /// Refuse input documents larger than this many bytes.
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_INPUT_BYTES)]
    pub max_input_bytes: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Notarize a document: record it on the ledger and write a watermarked copy.
    Sign {
        /// Path of the PDF to notarize.
        file: PathBuf,

        /// Signer identity token (e.g. a wallet address).
        #[arg(long)]
        signer: String,

        /// Name to register (default: the file name).
        #[arg(long)]
        name: Option<String>,

        /// Output path (default: <stem>-signed.<ext> next to the input).
        #[arg(long)]
        out: Option<PathBuf>,

        /// Logo path or URL; repeat to give fallbacks, first available wins.
        #[arg(long)]
        logo: Vec<String>,

        /// always | with-logo
        #[arg(long, default_value = "always")]
        text_policy: String,
    },

    /// Print the fingerprint of a file without touching the ledger.
    Hash { file: PathBuf },

    /// Look up a ledger record by fingerprint or by name.
    #[command(group(ArgGroup::new("key").required(true).args(["fingerprint", "name"])))]
    Lookup {
        #[arg(long)]
        fingerprint: Option<String>,
        #[arg(long)]
        name: Option<String>,
    },

    /// Run environment checks (ledger reachability, logo sources).
    Doctor {
        /// Logo sources to probe.
        #[arg(long)]
        logo: Vec<String>,
    },
}
