use anyhow::Result;
use serde::Serialize;

use notary_core::config::{validate_config, LimitsConfig, NotaryConfig};
use notary_watermark::{decode_logo, LogoDecode, LogoFetch};

use crate::args::Cli;
use crate::cmd::connect_registry;
use crate::io::input;
use crate::output;

#[derive(Debug, Serialize)]
pub struct Check {
    pub name: String,
    pub ok: bool,
    pub detail: String,
}

#[derive(Debug, Serialize)]
pub struct DoctorOut {
    pub ok: bool,
    pub checks: Vec<Check>,
}

pub async fn run(cli: &Cli, logos: &[String]) -> Result<()> {
    let mut checks = Vec::new();

    let config = NotaryConfig {
        limits: LimitsConfig {
            max_input_bytes: cli.max_input_bytes,
        },
        ..Default::default()
    };
    checks.push(match validate_config(&config) {
        Ok(()) => check("config", true, "watermark and limit settings are valid"),
        Err(e) => check("config", false, &e.to_string()),
    });

    let target = match &cli.ledger_url {
        Some(url) => url.clone(),
        None => cli.ledger.display().to_string(),
    };
    checks.push(match connect_registry(cli).await {
        Ok(reg) => check("ledger", true, &format!("{} ledger reachable at {target}", reg.backend())),
        Err(e) => check("ledger", false, &format!("{target}: {e}")),
    });

    for arg in logos {
        let source = input::logo_source(std::slice::from_ref(arg));
        let detail = match source.fetch().await {
            LogoFetch::Unavailable(reason) => Err(reason),
            LogoFetch::Fetched(bytes) => match decode_logo(&bytes) {
                LogoDecode::Decoded(img) => Ok(format!("{} {}x{}", img.decoder.name(), img.width, img.height)),
                LogoDecode::Unsupported => Err("not a PNG or JPEG image".to_string()),
            },
        };
        checks.push(match detail {
            Ok(d) => check(&format!("logo {arg}"), true, &d),
            // Logos are optional; report but do not fail the run.
            Err(d) => check(&format!("logo {arg}"), false, &format!("{d} (stamping continues without it)")),
        });
    }

    for c in &checks {
        output::status(c.ok, if c.ok { "ok" } else { "fail" }, &format!("{}: {}", c.name, c.detail));
    }
    let ok = checks.iter().all(|c| c.ok || c.name.starts_with("logo "));
    output::print(&DoctorOut { ok, checks })
}

fn check(name: &str, ok: bool, detail: &str) -> Check {
    Check {
        name: name.to_string(),
        ok,
        detail: detail.to_string(),
    }
}
