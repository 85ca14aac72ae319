use clap::{Parser, Subcommand};
use env_logger::Env;
use log::{error, info, LevelFilter};
use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use labjack_diag::{
    load_config, AppConfig, DaqDriver, Diagnostic, SimulatedDriver, StopReason, TerminalCharts,
};

/// LabJack T4 connection check and live stream viewer
#[derive(Parser, Debug)]
#[command(name = "lj-diag")]
#[command(about = "Check a LabJack T4 and plot its vibration/temperature stream", long_about = None)]
struct Args {
    /// Path to configuration file (defaults to ./lj-diag.toml when present)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Use the built-in simulated device instead of real hardware
    #[arg(long)]
    simulate: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Open, identify and configure the device, then disconnect
    Probe,
    /// Probe, then reconnect and plot the stream until Ctrl+C
    Stream,
}

/// Usage:
///   lj-diag                       # probe only
///   lj-diag stream                # probe, then live plot
///   lj-diag --simulate stream     # no hardware needed
///   lj-diag --config lj-diag.toml --log-level debug stream
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    let log_level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.console.verbosity.clone());
    initialize_logging(&log_level)?;
    log_startup_info(&config, &args);

    let driver = setup_driver(args.simulate)?;
    let mut diagnostic = Diagnostic::new(
        driver,
        config.locator()?,
        config.stream.scan_list.clone(),
        config.stream_settings(),
    );

    match args.command.unwrap_or(Command::Probe) {
        Command::Probe => run_probe(&mut diagnostic),
        Command::Stream => {
            let shutdown_flag = setup_shutdown_handler()?;
            run_stream(&mut diagnostic, &config, shutdown_flag)
        }
    }
}

// Helper Functions

/// Log startup information
fn log_startup_info(config: &AppConfig, args: &Args) {
    info!("=== LabJack Diagnostic ===");
    match &args.config {
        Some(path) => info!("Configuration: {}", path.display()),
        None => info!("Configuration: defaults"),
    }
    info!(
        "Device: {} via {} (fallback ANY), identifier {}",
        config.device.model, config.device.preferred_connection, config.device.identifier
    );
    info!(
        "Stream: {:?} at {} Hz, {} scans per read, redraw every {} ms",
        config.stream.scan_list,
        config.stream.scan_rate,
        config.stream.scans_per_read,
        config.stream.tick_period_ms
    );
}

/// Pick the hardware driver, or the simulator when asked for
fn setup_driver(simulate: bool) -> Result<Box<dyn DaqDriver>, Box<dyn std::error::Error>> {
    if simulate {
        info!("Using simulated T4");
        return Ok(Box::new(SimulatedDriver::new().with_pacing(true)));
    }

    hardware_driver()
}

#[cfg(feature = "ljm")]
fn hardware_driver() -> Result<Box<dyn DaqDriver>, Box<dyn std::error::Error>> {
    Ok(Box::new(labjack_diag::LjmDriver::new()?))
}

#[cfg(not(feature = "ljm"))]
fn hardware_driver() -> Result<Box<dyn DaqDriver>, Box<dyn std::error::Error>> {
    Err("built without the `ljm` feature; rebuild with --features ljm or pass --simulate".into())
}

/// Setup Ctrl+C handler for graceful shutdown
fn setup_shutdown_handler() -> Result<Arc<AtomicBool>, Box<dyn std::error::Error>> {
    let shutdown_flag = Arc::new(AtomicBool::new(false));
    let shutdown_flag_clone = shutdown_flag.clone();

    ctrlc::set_handler(move || {
        info!("Ctrl+C received - stopping stream...");
        shutdown_flag_clone.store(true, Ordering::SeqCst);
    })?;

    Ok(shutdown_flag)
}

fn run_probe(
    diagnostic: &mut Diagnostic<Box<dyn DaqDriver>>,
) -> Result<(), Box<dyn std::error::Error>> {
    match diagnostic.probe() {
        Ok(info) => {
            info!(
                "✓ LabJack {} (serial {}) reachable and configured",
                info.device_type, info.serial_number
            );
            Ok(())
        }
        Err(e) => {
            error!("✗ Probe failed: {}", e);
            Err(e.into())
        }
    }
}

fn run_stream(
    diagnostic: &mut Diagnostic<Box<dyn DaqDriver>>,
    config: &AppConfig,
    shutdown_flag: Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut charts = TerminalCharts::new(config.display.width, config.display.height);

    match diagnostic.stream(&shutdown_flag, &mut charts) {
        Ok(summary) => {
            match summary.stopped_by {
                StopReason::Shutdown => info!("✓ Stream stopped by user"),
                StopReason::SurfaceClosed => info!("✓ Display closed"),
            }
            info!(
                "{} ticks, {} stale buffers dropped",
                summary.ticks, summary.dropped_buffers
            );
            Ok(())
        }
        Err(e) => {
            error!("✗ Stream failed: {}", e);
            Err(e.into())
        }
    }
}

/// Initialize logging with configurable level
fn initialize_logging(log_level: &str) -> Result<(), Box<dyn std::error::Error>> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        _ => {
            eprintln!("Warning: Invalid log level '{}', using 'info'", log_level);
            LevelFilter::Info
        }
    };

    env_logger::Builder::from_env(Env::default())
        .filter_level(level)
        .format_timestamp_millis()
        .init();

    Ok(())
}
