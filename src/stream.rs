use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, error, info, warn};
use std::time::Duration;

use crate::driver::DaqDriver;
use crate::error::DaqError;
use crate::types::{Handle, ScanList};
use crate::window::{DEFAULT_WINDOW_LEN, RollingWindow};

/// The viewer displays exactly vibration and temperature
pub const CHANNEL_COUNT: usize = 2;

/// Upper bound on extra reads per tick when draining a backlog
const MAX_DRAIN_READS: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub struct StreamSettings {
    /// Scans per second requested from the device
    pub scan_rate: f64,
    /// Scans returned by one blocking read
    pub scans_per_read: usize,
    /// Batches kept per channel for display
    pub window_len: usize,
    /// Redraw period
    pub tick_period: Duration,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            scan_rate: 1000.0,
            scans_per_read: 128,
            window_len: DEFAULT_WINDOW_LEN,
            tick_period: Duration::from_secs(1),
        }
    }
}

/// Outcome of one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    /// Wall-clock time of the first scan in the displayed buffer
    pub timestamp: DateTime<Utc>,
    /// Buffers read and discarded to catch up with the device
    pub dropped: usize,
    pub scans: usize,
}

/// Everything a chart surface needs to draw one frame
#[derive(Debug, Clone, Copy)]
pub struct ChartFrame<'a> {
    pub report: Option<TickReport>,
    pub vibration: &'a RollingWindow<Vec<f64>>,
    pub temperature: &'a RollingWindow<Vec<f64>>,
}

/// Split an interleaved buffer into one vector per channel
///
/// Element `i` goes to channel `i % channels`. A buffer that does not hold a
/// whole number of scans is rejected rather than mis-assigned.
pub fn split_channels(data: &[f64], channels: usize) -> Result<Vec<Vec<f64>>, DaqError> {
    if channels == 0 {
        return Err(DaqError::ScanListMismatch {
            expected: CHANNEL_COUNT,
            actual: 0,
        });
    }
    if data.len() % channels != 0 {
        return Err(DaqError::PartialScan {
            samples: data.len(),
            channels,
        });
    }

    let mut split = vec![Vec::with_capacity(data.len() / channels); channels];
    for (i, &value) in data.iter().enumerate() {
        split[i % channels].push(value);
    }
    Ok(split)
}

/// Even-indexed samples are vibration, odd-indexed samples are temperature
pub fn deinterleave(data: &[f64]) -> Result<(Vec<f64>, Vec<f64>), DaqError> {
    let mut split = split_channels(data, CHANNEL_COUNT)?;
    let temperature = split.pop().unwrap_or_default();
    let vibration = split.pop().unwrap_or_default();
    Ok((vibration, temperature))
}

/// A running two-channel stream and its display windows
///
/// Created by [`StreamViewer::start`]; [`StreamViewer::finish`] stops the
/// stream and closes the handle, consuming the viewer so no read can follow.
pub struct StreamViewer<D: DaqDriver> {
    driver: D,
    handle: Handle,
    settings: StreamSettings,
    actual_scan_rate: f64,
    started_at: DateTime<Utc>,
    scans_consumed: u64,
    ticks: u64,
    dropped_total: usize,
    last_report: Option<TickReport>,
    vibration: RollingWindow<Vec<f64>>,
    temperature: RollingWindow<Vec<f64>>,
}

impl<D: DaqDriver> StreamViewer<D> {
    /// Start streaming the scan list on an open, configured handle
    ///
    /// On failure the handle is closed before the error is returned.
    pub fn start(
        mut driver: D,
        handle: Handle,
        scan_list: &ScanList,
        settings: StreamSettings,
    ) -> Result<Self, DaqError> {
        let started = if scan_list.len() != CHANNEL_COUNT {
            Err(DaqError::ScanListMismatch {
                expected: CHANNEL_COUNT,
                actual: scan_list.len(),
            })
        } else {
            driver.stream_start(
                handle,
                settings.scans_per_read,
                &scan_list.addresses(),
                settings.scan_rate,
            )
        };
        let actual_scan_rate = match started {
            Ok(rate) if rate.is_finite() && rate > 0.0 => rate,
            Ok(rate) => {
                error!("DAQ: Driver reported an unusable scan rate of {} Hz", rate);
                if let Err(stop_err) = driver.stream_stop(handle) {
                    warn!("DAQ: Failed to stop stream on {}: {}", handle, stop_err);
                }
                if let Err(close_err) = driver.close(handle) {
                    warn!("DAQ: Failed to close {} after start failure: {}", handle, close_err);
                }
                return Err(DaqError::InvalidScanRate(rate));
            }
            Err(e) => {
                if let Err(close_err) = driver.close(handle) {
                    warn!("DAQ: Failed to close {} after start failure: {}", handle, close_err);
                }
                return Err(e);
            }
        };
        info!(
            "DAQ: Stream started on {:?} at {:.1} Hz, {} scans per read",
            scan_list.names(),
            actual_scan_rate,
            settings.scans_per_read
        );

        let buffer_period = settings.scans_per_read as f64 / actual_scan_rate;
        if settings.tick_period.as_secs_f64() > buffer_period {
            info!(
                "DAQ: Device fills a buffer every {:.3} s, ticks every {:.3} s; older buffers are dropped",
                buffer_period,
                settings.tick_period.as_secs_f64()
            );
        }

        Ok(Self {
            driver,
            handle,
            vibration: RollingWindow::new(settings.window_len),
            temperature: RollingWindow::new(settings.window_len),
            settings,
            actual_scan_rate,
            started_at: Utc::now(),
            scans_consumed: 0,
            ticks: 0,
            dropped_total: 0,
            last_report: None,
        })
    }

    /// Read the newest buffer and push it into the windows
    ///
    /// Performs one blocking read. While the driver still holds at least a
    /// full buffer afterwards, further buffers are read and the older ones
    /// discarded, so the display tracks the device instead of lagging behind.
    pub fn tick(&mut self) -> Result<TickReport, DaqError> {
        let mut read = self.driver.stream_read(self.handle).inspect_err(|e| {
            error!("DAQ: Connection lost to LabJack: {}", e);
        })?;
        let mut first_scan = self.scans_consumed;
        self.scans_consumed += (read.data.len() / CHANNEL_COUNT) as u64;

        let full_buffer = self.settings.scans_per_read as i32;
        let mut dropped = 0;
        while read.driver_backlog >= full_buffer && full_buffer > 0 {
            if dropped == MAX_DRAIN_READS {
                warn!(
                    "DAQ: Backlog of {} scans remains after {} catch-up reads",
                    read.driver_backlog, dropped
                );
                break;
            }
            read = self.driver.stream_read(self.handle).inspect_err(|e| {
                error!("DAQ: Connection lost to LabJack: {}", e);
            })?;
            first_scan = self.scans_consumed;
            self.scans_consumed += (read.data.len() / CHANNEL_COUNT) as u64;
            dropped += 1;
        }
        if dropped > 0 {
            debug!("DAQ: Dropped {} stale buffers", dropped);
        }

        let (vibration, temperature) = deinterleave(&read.data)?;
        let scans = vibration.len();
        self.vibration.push(vibration);
        self.temperature.push(temperature);

        self.ticks += 1;
        self.dropped_total += dropped;
        let report = TickReport {
            tick: self.ticks,
            timestamp: self.scan_timestamp(first_scan),
            dropped,
            scans,
        };
        self.last_report = Some(report);
        debug!(
            "DAQ: Tick {} with {} scans (device backlog {})",
            report.tick, scans, read.device_backlog
        );

        Ok(report)
    }

    fn scan_timestamp(&self, scan: u64) -> DateTime<Utc> {
        let micros = (scan as f64 * 1e6 / self.actual_scan_rate) as i64;
        self.started_at + TimeDelta::microseconds(micros)
    }

    pub fn frame(&self) -> ChartFrame<'_> {
        ChartFrame {
            report: self.last_report,
            vibration: &self.vibration,
            temperature: &self.temperature,
        }
    }

    pub fn vibration(&self) -> &RollingWindow<Vec<f64>> {
        &self.vibration
    }

    pub fn temperature(&self) -> &RollingWindow<Vec<f64>> {
        &self.temperature
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn dropped_total(&self) -> usize {
        self.dropped_total
    }

    /// Stop the stream and close the handle
    ///
    /// The handle is closed even when stopping fails; the first error wins.
    pub fn finish(mut self) -> Result<(), DaqError> {
        let stopped = self.driver.stream_stop(self.handle);
        if let Err(e) = &stopped {
            warn!("DAQ: Failed to stop stream: {}", e);
        }
        info!("DAQ: Cleaning up and exiting.");
        let closed = self.driver.close(self.handle);
        stopped.and(closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deinterleave_even_odd() {
        let data = [1.0, 10.0, 2.0, 20.0, 3.0, 30.0];
        let (vibration, temperature) = deinterleave(&data).unwrap();
        assert_eq!(vibration, vec![1.0, 2.0, 3.0]);
        assert_eq!(temperature, vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn test_deinterleave_empty_buffer() {
        let (vibration, temperature) = deinterleave(&[]).unwrap();
        assert!(vibration.is_empty());
        assert!(temperature.is_empty());
    }

    #[test]
    fn test_partial_scan_is_rejected() {
        let result = deinterleave(&[1.0, 2.0, 3.0]);
        assert!(matches!(
            result,
            Err(DaqError::PartialScan {
                samples: 3,
                channels: 2
            })
        ));
    }

    #[test]
    fn test_split_three_channels() {
        let split = split_channels(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0], 3).unwrap();
        assert_eq!(split, vec![vec![0.0, 3.0], vec![1.0, 4.0], vec![2.0, 5.0]]);
        assert!(split_channels(&[1.0], 0).is_err());
    }
}
