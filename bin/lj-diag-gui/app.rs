use eframe::egui;
use egui_plot::{Line, Plot, PlotPoints, Points};
use log::error;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use labjack_diag::{ChartFrame, ChartSurface, DaqDriver, DaqError, RollingWindow, StreamViewer};

/// State shared between the window and `main`, which closes the stream
/// once the event loop returns
pub struct GuiSession {
    pub viewer: Option<StreamViewer<Box<dyn DaqDriver>>>,
    pub failure: Option<DaqError>,
}

// ============================================================================
// Chart surface backed by an egui panel
// ============================================================================

struct EguiCharts<'a> {
    ui: &'a mut egui::Ui,
}

impl ChartSurface for EguiCharts<'_> {
    fn draw(&mut self, frame: &ChartFrame<'_>) -> Result<(), DaqError> {
        if let Some(report) = frame.report {
            self.ui.label(format!(
                "Tick {} | {} | {} scans | {} dropped buffers",
                report.tick,
                report.timestamp.format("%H:%M:%S%.3f"),
                report.scans,
                report.dropped
            ));
        } else {
            self.ui.label("Waiting for data...");
        }

        self.ui.columns(2, |columns| {
            channel_plot(&mut columns[0], "vibration_plot", "Vibration (AIN0)", frame.vibration);
            channel_plot(&mut columns[1], "temperature_plot", "Temperature (AIN1)", frame.temperature);
        });
        Ok(())
    }
}

/// Line of the window contents with the newest sample marked
fn channel_plot(ui: &mut egui::Ui, id: &str, title: &str, window: &RollingWindow<Vec<f64>>) {
    let samples: Vec<[f64; 2]> = window
        .samples()
        .enumerate()
        .map(|(i, value)| [i as f64, value])
        .collect();
    let latest = samples.last().copied();

    ui.label(title);
    Plot::new(id)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .x_axis_label("Sample")
        .y_axis_label("V")
        .show(ui, |plot_ui| {
            plot_ui.line(Line::new(title, PlotPoints::from(samples)));
            if let Some(point) = latest {
                plot_ui.points(Points::new("latest", vec![point]).radius(5.0));
            }
        });
}

// ============================================================================
// App
// ============================================================================

pub struct StreamApp {
    session: Rc<RefCell<GuiSession>>,
    shutdown_flag: Arc<AtomicBool>,
    tick_period: Duration,
    last_tick: Option<Instant>,
    closing: bool,
}

impl StreamApp {
    pub fn new(
        session: Rc<RefCell<GuiSession>>,
        shutdown_flag: Arc<AtomicBool>,
        tick_period: Duration,
    ) -> Self {
        Self {
            session,
            shutdown_flag,
            tick_period,
            last_tick: None,
            closing: false,
        }
    }

    /// Run one stream tick when the period has elapsed
    fn poll_stream(&mut self, ctx: &egui::Context) {
        if self.closing {
            return;
        }
        if self.shutdown_flag.load(Ordering::SeqCst) {
            self.request_close(ctx);
            return;
        }

        let due = self
            .last_tick
            .is_none_or(|last| last.elapsed() >= self.tick_period);
        if !due {
            return;
        }
        self.last_tick = Some(Instant::now());

        let mut guard = self.session.borrow_mut();
        let session = &mut *guard;
        let Some(viewer) = session.viewer.as_mut() else {
            return;
        };
        if let Err(e) = viewer.tick() {
            error!("DAQ: Stream read failed: {}", e);
            session.failure = Some(e);
            self.closing = true;
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
    }

    fn request_close(&mut self, ctx: &egui::Context) {
        self.closing = true;
        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
    }
}

impl eframe::App for StreamApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_stream(ctx);

        let next_tick = self
            .last_tick
            .map(|last| self.tick_period.saturating_sub(last.elapsed()))
            .unwrap_or_default();
        ctx.request_repaint_after(next_tick.max(Duration::from_millis(10)));

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("LabJack T4 Stream");
            ui.separator();

            let session = self.session.borrow();
            match session.viewer.as_ref() {
                Some(viewer) => {
                    let mut charts = EguiCharts { ui };
                    if let Err(e) = charts.draw(&viewer.frame()) {
                        error!("DAQ: Failed to draw frame: {}", e);
                    }
                }
                None => {
                    ui.label("Stream closed");
                }
            }
        });
    }
}
