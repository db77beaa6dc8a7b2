use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use notary_core::config::{validate_config, LimitsConfig, NotaryConfig, TextPolicy, WatermarkConfig};
use notary_core::identity::StaticIdentity;
use notary_core::model::{DocumentRecord, Registration};
use notary_core::pipeline::Notary;
use notary_watermark::WatermarkEngine;

use crate::args::Cli;
use crate::cmd::connect_registry;
use crate::io::{export, input};
use crate::output;

pub struct SignOpts<'a> {
    pub file: &'a Path,
    pub signer: &'a str,
    pub name: Option<&'a str>,
    pub out: Option<&'a Path>,
    pub logo: &'a [String],
    pub text_policy: &'a str,
}

#[derive(Debug, Serialize)]
pub struct SignOut {
    pub file: String,
    pub name: String,
    pub fingerprint: String,
    pub outcome: &'static str,
    pub registration: Registration,
    pub output: String,
    pub record: Option<DocumentRecord>,
    pub transitions: Vec<&'static str>,
}

fn spinner() -> ProgressBar {
    if output::is_json() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub async fn run(cli: &Cli, opts: SignOpts<'_>) -> Result<()> {
    let config = NotaryConfig {
        watermark: WatermarkConfig {
            text_policy: TextPolicy::parse(opts.text_policy)?,
            ..Default::default()
        },
        limits: LimitsConfig {
            max_input_bytes: cli.max_input_bytes,
        },
    };
    validate_config(&config)?;

    let identity = StaticIdentity::new(opts.signer)?;
    let name = input::document_name(opts.file, opts.name)?;
    let out_path = export::derivative_path(opts.file, opts.out)?;

    let pb = spinner();
    pb.set_message("reading document");
    let document = input::read_document(opts.file, config.limits.max_input_bytes)?;

    pb.set_message("connecting to ledger");
    let registry = match connect_registry(cli).await {
        Ok(r) => r,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e.into());
        }
    };

    let engine = WatermarkEngine::new(config.watermark.clone(), input::logo_source(opts.logo));
    let notary = Notary::new(registry, engine);

    pb.set_message("notarizing");
    let done = match notary.notarize_as(&identity, &document, name.clone()).await {
        Ok(n) => n,
        Err(failure) => {
            pb.finish_and_clear();
            if failure.ledger_record_left_standing {
                output::status(
                    false,
                    "warning",
                    "the ledger record was written but no watermarked copy was produced",
                );
            }
            return Err(failure.into());
        }
    };

    pb.set_message("writing derivative");
    let written = export::write_derivative(&out_path, &done.derivative);
    pb.finish_and_clear();
    written?;

    let record = notary.lookup_by_fingerprint(&done.fingerprint).await?;
    let outcome = if done.registration.is_new() {
        "recorded"
    } else {
        "already_notarized"
    };
    output::status(
        true,
        outcome,
        &format!("{} -> {} ({})", opts.file.display(), out_path.display(), done.fingerprint),
    );

    output::print(&SignOut {
        file: opts.file.display().to_string(),
        name,
        fingerprint: done.fingerprint.to_string(),
        outcome,
        registration: done.registration,
        output: out_path.display().to_string(),
        record,
        transitions: done.transitions.iter().map(|s| s.name()).collect(),
    })
}
