use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use tracing_subscriber::EnvFilter;

static JSON_MODE: AtomicBool = AtomicBool::new(false);

pub fn init(json: bool) {
    JSON_MODE.store(json, Ordering::Relaxed);
}

pub fn is_json() -> bool {
    JSON_MODE.load(Ordering::Relaxed)
}

/// Install the stderr log subscriber. `--log-level` wins over `RUST_LOG`;
/// with neither set only warnings and errors are shown.
pub fn init_logging(json: bool, level: Option<&str>) {
    let filter = match level {
        Some(l) => EnvFilter::new(l),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr);
    // A subscriber may already be installed (tests); keep it.
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

pub fn print<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    println!("{s}");
    Ok(())
}

pub fn eprintln_line(msg: &str) {
    let _ = writeln!(io::stderr(), "{msg}");
}

/// One-line human summary on stderr; suppressed in JSON mode.
pub fn status(ok: bool, label: &str, msg: &str) {
    if is_json() {
        return;
    }
    let mut err = StandardStream::stderr(ColorChoice::Auto);
    let color = if ok { Color::Green } else { Color::Red };
    let _ = err.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true));
    let _ = write!(err, "{label:>9}");
    let _ = err.reset();
    let _ = writeln!(err, " {msg}");
}
