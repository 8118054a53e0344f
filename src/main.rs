//! arrayfile - inspect and rewrite binary array files

use anyhow::Result;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

use arrayfile::commands;
use arrayfile::config::CliArgs;

fn setup_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else if verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

fn run() -> Result<()> {
    // Parse CLI arguments
    let args = CliArgs::parse_args();

    // Setup logging
    setup_logging(args.verbose, args.quiet);

    args.validate()
        .map_err(|e| anyhow::anyhow!("Invalid arguments: {}", e))?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    commands::run(&args, &mut out)
}

fn main() {
    if let Err(e) = run() {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}
