mod cmd;
mod config;
mod error;
mod input;
mod signal;

use std::future::Future;

use clap::Parser;
use config::{Cli, Commands};
use error::CliError;

fn main() {
    // stdout остаётся пустым при успехе: логи только в stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let Cli { global, command } = Cli::parse();
    let result = block_on_detached(async move {
        match command {
            Commands::Write(args) => cmd::write::run(&global, &args).await,
        }
    })
    .map_err(CliError::Runtime)
    .and_then(|r| r);

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Run `future` to completion on a fresh multi-thread runtime.
///
/// Runtime is shut down without joining the blocking pool: a stdin read
/// stays parked there until the next line arrives, which may be never.
fn block_on_detached<F: Future>(future: F) -> Result<F::Output, std::io::Error> {
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    let output = runtime.block_on(future);
    runtime.shutdown_background();
    Ok(output)
}
