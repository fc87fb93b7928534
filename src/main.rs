use std::io;
use std::process;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use netdiag::cli::Cli;
use netdiag::{report, Orchestrator, StepOutcome};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // No arguments at all: usage on stderr and a failing exit code.
    if std::env::args_os().len() <= 1 {
        Cli::command().write_help(&mut io::stderr())?;
        eprintln!();
        process::exit(1);
    }

    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    if cli.no_color {
        colored::control::set_override(false);
    }
    if !cli.no_banner {
        println!("{}", report::banner());
    }

    // First Ctrl-C cancels whatever step is running and finished results are
    // still printed. A second one exits at once.
    let cancel = CancellationToken::new();
    let cancel_ctrlc = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        cancel_ctrlc.cancel();
        if tokio::signal::ctrl_c().await.is_ok() {
            process::exit(130);
        }
    });

    let orchestrator = Orchestrator::system()
        .with_scan_options(cli.scan_options())
        .with_output(cli.output.clone())
        .with_cancel(cancel);

    let outcome = orchestrator.run(&cli.host, &cli.plan()).await;

    // Step failures were already printed; the exit code stays 0.
    let failed = [
        matches!(outcome.ping, Some(StepOutcome::Failed(_))),
        matches!(outcome.scan, Some(StepOutcome::Failed(_))),
        matches!(outcome.trace, Some(StepOutcome::Failed(_))),
    ]
    .iter()
    .filter(|&&f| f)
    .count();
    info!(
        host = %outcome.target.hostname,
        resolved = outcome.target.address.is_some(),
        failed,
        "run complete"
    );

    Ok(())
}
