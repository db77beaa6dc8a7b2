use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use crate::args::Cli;
use crate::io::input;
use crate::output;

#[derive(Debug, Serialize)]
pub struct HashOut {
    pub file: String,
    pub fingerprint: String,
}

pub async fn run(cli: &Cli, file: &Path) -> Result<()> {
    let fp = input::fingerprint_file(file, cli.max_input_bytes)?;
    output::print(&HashOut {
        file: file.display().to_string(),
        fingerprint: fp.to_string(),
    })
}
