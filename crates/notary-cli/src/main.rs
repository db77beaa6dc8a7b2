use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;

mod args;
mod cmd;
mod io;
mod output;

#[derive(Debug, Serialize)]
struct ErrorOut<'a> {
    error: String,
    kind: Option<&'static str>,
    hint: Option<&'a str>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = args::Cli::parse();
    output::init(cli.json);
    output::init_logging(cli.json, cli.log_level.as_deref());

    tracing::debug!(command = ?cli.command, "notary starting");

    match cmd::dispatch(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let kind = cmd::error_kind(&e);
            let hint = cmd::recovery_hint(kind);
            if output::is_json() {
                let _ = output::print(&ErrorOut {
                    error: format!("{e:#}"),
                    kind: kind.map(|k| k.as_str()),
                    hint,
                });
            }
            output::eprintln_line(&format!("error: {e:#}"));
            if let Some(h) = hint {
                output::eprintln_line(&format!("hint: {h}"));
            }
            ExitCode::from(cmd::exit_code(kind))
        }
    }
}
