use std::io::{self, Write};
use textplots::{Chart, Plot, Shape};

use crate::error::DaqError;
use crate::stream::ChartFrame;
use crate::window::RollingWindow;

/// Something that can show the two channel windows
///
/// Implemented by the terminal renderer here and by the egui window in the
/// GUI binary. `is_open` turning false ends the stream.
pub trait ChartSurface {
    fn draw(&mut self, frame: &ChartFrame<'_>) -> Result<(), DaqError>;

    fn is_open(&self) -> bool {
        true
    }
}

/// Determine the best scale and unit for a given maximum voltage
pub fn determine_scale(max_value: f64) -> (f64, &'static str) {
    if max_value >= 1.0 || max_value == 0.0 || !max_value.is_finite() {
        (1.0, "V")
    } else if max_value >= 1e-3 {
        (1e3, "mV")
    } else if max_value >= 1e-6 {
        (1e6, "μV")
    } else {
        (1e9, "nV")
    }
}

/// Plot one channel with the most recent sample marked
///
/// # Arguments
/// * `values` - Samples, oldest first
/// * `title` - Heading printed above the chart
/// * `width` - Plot width (textplots needs at least 32)
/// * `height` - Plot height (textplots needs at least 3)
pub fn plot_channel(
    values: &[f64],
    title: &str,
    width: u32,
    height: u32,
) -> Result<(), DaqError> {
    println!("{}", title);
    let Some(&latest) = values.last() else {
        println!("(no samples yet)");
        return Ok(());
    };

    let width = width.max(32);
    let height = height.max(3);

    let min_value = values.iter().fold(f64::INFINITY, |a, &b| a.min(b));
    let max_value = values.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    let (scale, unit) = determine_scale(max_value.abs().max(min_value.abs()));

    let line: Vec<(f32, f32)> = values
        .iter()
        .enumerate()
        .map(|(i, &value)| (i as f32, (value * scale) as f32))
        .collect();
    let newest = [((values.len() - 1) as f32, (latest * scale) as f32)];
    let max_index = ((values.len() - 1) as f32).max(1.0);

    println!(
        "{} samples | {:.3} to {:.3} {} | latest {:.3} {}",
        values.len(),
        min_value * scale,
        max_value * scale,
        unit,
        latest * scale,
        unit
    );

    Chart::new(width, height, 0.0, max_index)
        .lineplot(&Shape::Lines(&line))
        .lineplot(&Shape::Points(&newest))
        .nice();

    Ok(())
}

/// Two stacked text charts redrawn in place on stdout
#[derive(Debug, Clone)]
pub struct TerminalCharts {
    width: u32,
    height: u32,
    clear_screen: bool,
}

impl Default for TerminalCharts {
    fn default() -> Self {
        Self::new(120, 24)
    }
}

impl TerminalCharts {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            clear_screen: true,
        }
    }

    /// Append frames instead of redrawing in place (useful when piping output)
    pub fn with_clear_screen(mut self, clear: bool) -> Self {
        self.clear_screen = clear;
        self
    }

    fn window_values(window: &RollingWindow<Vec<f64>>) -> Vec<f64> {
        window.samples().collect()
    }
}

impl ChartSurface for TerminalCharts {
    fn draw(&mut self, frame: &ChartFrame<'_>) -> Result<(), DaqError> {
        if self.clear_screen {
            print!("\x1B[2J\x1B[H");
        }

        match frame.report {
            Some(report) => println!(
                "Tick {} | {} | {} scans | {} dropped buffers | Ctrl+C to quit",
                report.tick,
                report.timestamp.format("%H:%M:%S%.3f"),
                report.scans,
                report.dropped
            ),
            None => println!("Waiting for data | Ctrl+C to quit"),
        }
        println!("{}", "─".repeat(self.width as usize));

        plot_channel(
            &Self::window_values(frame.vibration),
            "Vibration (AIN0)",
            self.width,
            self.height,
        )?;
        plot_channel(
            &Self::window_values(frame.temperature),
            "Temperature (AIN1)",
            self.width,
            self.height,
        )?;

        io::stdout().flush()?;
        Ok(())
    }
}
