//! Blockbar - status line generator speaking the i3bar protocol
//!
//! Reads click events on stdin and writes frames to stdout. Configuration
//! errors are reported on stderr before anything is printed.

use anyhow::{Context, Result};
use blockbar::{
    paths, Bar, Config, Emitter, EventRouter, Output, Scheduler, Services, SignalBridge,
    SignalRoutes,
};
use clap::Parser;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "blockbar", version, about = "Status line generator for i3bar and swaybar")]
struct Args {
    /// Configuration file
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    log::info!("Starting blockbar v{}", env!("CARGO_PKG_VERSION"));

    let config_path = match args.config {
        Some(path) => path,
        None => paths::default_config_path().context("Cannot determine the home directory")?,
    };

    let mut services = Services::new();
    let config = Config::load(&config_path, &mut services)
        .with_context(|| format!("Invalid configuration {}", config_path.display()))?;

    let bar = Arc::new(Bar::from_config(config));
    log::info!(
        "Loaded {} blocks from {}",
        bar.blocks().len(),
        config_path.display()
    );

    services.start().context("Failed to start background services")?;

    let output = Arc::new(Output::stdout());
    output.write_header().context("Failed to write protocol header")?;

    bar.start().context("Failed to start block threads")?;

    let emitter = Emitter::new(Arc::clone(&bar), output);

    let routes = SignalRoutes::new(&bar);
    SignalBridge::new(routes, emitter.clone())
        .spawn()
        .context("Failed to install signal handlers")?;

    bar.prime(Instant::now());

    EventRouter::new(emitter.clone())
        .spawn(io::BufReader::new(io::stdin()))
        .context("Failed to start event reader")?;

    Scheduler::new(emitter)
        .run()
        .context("Failed to write status output")?;

    Ok(())
}
