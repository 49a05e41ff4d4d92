//! Run the three-process vector clock scenario and print its observable log.
//!
//! ```text
//! causal-scenario [--config <path>] [--json] [--tracing]
//! ```
//!
//! Diagnostics go to stderr and are filtered through `RUST_LOG`. With `--tracing` the clock log
//! is emitted as `info` events alongside them instead of as bare lines on stdout.

use std::path::PathBuf;
use std::sync::Arc;

use causal_clock::{Config, EventSink, StdoutSink, TracingSink, run_reference_scenario};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let mut config_path: Option<PathBuf> = None;
    let mut json = false;
    let mut traced = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                config_path = Some(
                    args.next()
                        .map(PathBuf::from)
                        .unwrap_or_else(|| usage("missing value for --config")),
                )
            }
            "--json" => json = true,
            "--tracing" => traced = true,
            other => usage(&format!("unknown argument {other}")),
        }
    }

    let config = match config_path {
        Some(path) => Config::from_file(&path).unwrap_or_else(|e| fatal(&e)),
        None => Config::default(),
    };

    let sink: Arc<dyn EventSink> = if traced {
        Arc::new(TracingSink)
    } else {
        Arc::new(StdoutSink)
    };
    let report = run_reference_scenario(&config, sink).unwrap_or_else(|e| fatal(&e));

    if json {
        let out = serde_json::to_string_pretty(&report)
            .unwrap_or_else(|e| fatal(&format!("serialize report: {e}")));
        println!("{out}");
    }
}

fn usage(msg: &str) -> ! {
    eprintln!("error: {msg}");
    eprintln!("usage: causal-scenario [--config <path>] [--json] [--tracing]");
    std::process::exit(2);
}

fn fatal(err: &dyn std::fmt::Display) -> ! {
    eprintln!("error: {err}");
    std::process::exit(1);
}
