//! converge - reconcile a project environment from the command line

use converge_cli::{build_cli, dispatch, Failure};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbosity: u8, json: bool) {
    let default = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> ExitCode {
    let matches = build_cli().get_matches();
    init_tracing(matches.get_count("verbose"), matches.get_flag("log-json"));

    let (document, code) = match dispatch(&matches) {
        Ok(value) => (value, ExitCode::SUCCESS),
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "converge failed");
            let failure = serde_json::to_value(Failure::from_error(&err))
                .unwrap_or_else(|_| serde_json::json!({ "failed": true }));
            (failure, ExitCode::FAILURE)
        }
    };
    println!("{document}");
    code
}
