use anyhow::Result;
use serde::Serialize;

use notary_core::model::{DocumentRecord, Fingerprint};
use notary_core::pipeline::DocumentRegistry;

use crate::args::Cli;
use crate::cmd::connect_registry;
use crate::output;

#[derive(Debug, Serialize)]
pub struct LookupOut {
    pub found: bool,
    pub by: &'static str,
    pub key: String,
    pub record: Option<DocumentRecord>,
}

pub async fn run(cli: &Cli, fingerprint: Option<&str>, name: Option<&str>) -> Result<()> {
    // Validate the key before touching the ledger.
    let fp = fingerprint.map(Fingerprint::parse).transpose()?;
    let registry = connect_registry(cli).await?;

    let (by, key, record) = match (fp, name) {
        (Some(fp), _) => ("fingerprint", fp.to_string(), registry.get_by_fingerprint(&fp).await?),
        (None, Some(name)) => ("name", name.to_string(), registry.get_by_name(name).await?),
        (None, None) => anyhow::bail!("lookup needs --fingerprint or --name"),
    };
    let out = LookupOut {
        found: record.is_some(),
        by,
        key,
        record,
    };

    match &out.record {
        Some(r) => output::status(true, "found", &format!("{} signed by {} at {}", r.name, r.signer, r.signed_at)),
        None => output::status(false, "missing", &format!("no record for {} {}", out.by, out.key)),
    }
    output::print(&out)
}
