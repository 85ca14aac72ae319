mod app;

use clap::Parser;
use log::{error, info};
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use labjack_diag::{load_config, DaqDriver, Diagnostic, SimulatedDriver};

use app::{GuiSession, StreamApp};

/// LabJack T4 live stream window
#[derive(Parser, Debug)]
#[command(name = "lj-diag-gui")]
#[command(about = "Plot the LabJack vibration/temperature stream in a window", long_about = None)]
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
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;

    let log_level = args
        .log_level
        .unwrap_or_else(|| config.console.verbosity.clone());
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .default_filter_or(format!("{},winit=warn,eframe=warn,zbus=warn", log_level)),
    )
    .format_timestamp_millis()
    .init();

    let shutdown_flag = Arc::new(AtomicBool::new(false));
    let shutdown_flag_clone = shutdown_flag.clone();
    ctrlc::set_handler(move || {
        info!("Ctrl+C received - closing window...");
        shutdown_flag_clone.store(true, Ordering::SeqCst);
    })?;

    let driver: Box<dyn DaqDriver> = if args.simulate {
        info!("Using simulated T4");
        Box::new(SimulatedDriver::new().with_pacing(true))
    } else {
        hardware_driver()?
    };

    let settings = config.stream_settings();
    let tick_period = settings.tick_period;
    let diagnostic = Diagnostic::new(
        driver,
        config.locator()?,
        config.stream.scan_list.clone(),
        settings,
    );
    let viewer = diagnostic.into_viewer()?;

    let session = Rc::new(RefCell::new(GuiSession {
        viewer: Some(viewer),
        failure: None,
    }));

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 520.0])
            .with_min_inner_size([600.0, 300.0]),
        ..Default::default()
    };

    let app_session = session.clone();
    eframe::run_native(
        "LabJack Stream",
        options,
        Box::new(move |_cc| Ok(Box::new(StreamApp::new(app_session, shutdown_flag, tick_period)))),
    )?;

    let mut session = session.borrow_mut();
    let finished = match session.viewer.take() {
        Some(viewer) => viewer.finish(),
        None => Ok(()),
    };
    if let Some(e) = session.failure.take() {
        error!("✗ Stream failed: {}", e);
        return Err(e.into());
    }
    finished?;

    info!("Window closed, connection released");
    Ok(())
}

#[cfg(feature = "ljm")]
fn hardware_driver() -> Result<Box<dyn DaqDriver>, Box<dyn std::error::Error>> {
    Ok(Box::new(labjack_diag::LjmDriver::new()?))
}

#[cfg(not(feature = "ljm"))]
fn hardware_driver() -> Result<Box<dyn DaqDriver>, Box<dyn std::error::Error>> {
    Err("built without the `ljm` feature; rebuild with --features ljm or pass --simulate".into())
}
