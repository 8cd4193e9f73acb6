//! tcpopts - Userspace Program
//!
//! Loads the XDP timestamp locator, attaches it to an interface,
//! waits for SIGINT/SIGTERM, then detaches and reports parser statistics.
//!
//! ## Usage
//!
//! ```bash
//! # Attach to eth0 with the default object (/etc/tcpopts/xdp.o)
//! sudo ./tcpopts --interface eth0
//!
//! # Force generic mode and use a locally built object
//! sudo ./tcpopts -i eth0 --mode generic --obj target/bpfel-unknown-none/release/tcpopts
//!
//! # Write statistics on shutdown
//! sudo ./tcpopts -i eth0 --stats-output stats.prom --stats-format prometheus
//! ```

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use log::{error, info, warn};
use tcpopts_userspace::{
    attach::AttachmentManager,
    cli::Args,
    error::ProbeError,
    interface::Interface,
    loader::ProgramLoader,
    shutdown::ShutdownFlag,
    types::{ParserStats, StatsReport},
};
use tokio::time::Instant;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging; RUST_LOG takes precedence over --verbose
    env_logger::Builder::new()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .parse_default_env()
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            let code = err
                .downcast_ref::<ProbeError>()
                .map_or(1, ProbeError::exit_code);
            ExitCode::from(code)
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let if_name = args.validate()?;
    let manager = AttachmentManager::new(args.mode.strategies())?;

    info!("Starting tcpopts...");
    info!("   Interface: {}", if_name);
    info!("   Object: {:?}", args.obj);
    info!("   Program: {}", args.program);
    info!("   Modes: {:?}", manager.strategies());

    let interface = Interface::resolve(if_name)?;

    let mut loader = ProgramLoader::load(&args.obj)?;
    loader.init_logger();

    // Signals arriving during attach end the wait loop right away
    let shutdown = ShutdownFlag::new();
    shutdown.install_signal_handlers()?;

    let program = loader.load_xdp(&args.program)?;
    let mut handle = manager.attach(program, &interface)?;

    let started = Instant::now();
    info!(
        "Locating TCP timestamps on {} ({} mode). Press Ctrl-C to stop.",
        handle.interface(),
        handle.mode()
    );

    shutdown.wait(args.poll_interval()).await;

    let elapsed = started.elapsed().as_secs();
    let stats = loader.read_stats();

    match loader.xdp_mut(&args.program) {
        Ok(program) => {
            handle.detach(program);
        }
        // The link is released with the loader
        Err(e) => warn!("Cannot reach XDP program for detach: {}", e),
    }

    let stats = match stats {
        Ok(stats) => stats,
        Err(e) => {
            warn!("{}", e);
            return Ok(());
        }
    };

    print_summary(&stats, elapsed);

    if let Some(path) = &args.stats_output {
        let report = StatsReport::new(interface, handle.mode(), elapsed, stats);
        args.stats_format.exporter(path.clone()).export(&report)?;
        info!("Statistics written to {:?}", path);
    }

    Ok(())
}

fn print_summary(stats: &ParserStats, elapsed: u64) {
    info!("");
    info!("============================================");
    info!("             Summary Report");
    info!("============================================");
    info!("");
    info!("  Attached for:       {} seconds", elapsed);
    info!("  Frames seen:        {}", stats.frames);
    info!("  Frames passed:      {}", stats.passed());
    info!("  Truncated (drop):   {}", stats.truncated);
    info!("");
    info!("  Breakdown:");
    info!("    not IPv4:         {:>10}", stats.not_ipv4);
    info!("    not TCP:          {:>10}", stats.not_tcp);
    info!("    no TCP options:   {:>10}", stats.no_options);
    info!("    options scanned:  {:>10}", stats.options_scanned);
    info!("    timestamps found: {:>10}", stats.timestamps_found);
    info!("");
    info!("  Timestamp coverage: {:.2}%", stats.timestamp_ratio());
    info!("");
    info!("============================================");
}
