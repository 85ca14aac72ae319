#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use labjack_diag::{
    ChartFrame, ChartSurface, ConnectionType, DaqDriver, DaqError, DeviceInfo, DeviceType,
    Handle, ScanChannel, StreamRead,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Open(DeviceType, ConnectionType, String),
    HandleInfo(Handle),
    NamesToAddresses(Vec<String>),
    WriteNames(Handle, Vec<(String, f64)>),
    StreamStart(Handle, usize, Vec<i32>, f64),
    StreamRead(Handle),
    StreamStop(Handle),
    Close(Handle),
}

/// Driver double that records every call and replays scripted reads
///
/// Reads are served from `reads` in order; once it is empty each read
/// returns `[tick*10 + 0, tick*10 + 1, ...]` style interleaved data of
/// `scans_per_read` scans over two channels.
#[derive(Debug, Default)]
pub struct RecordingDriver {
    pub calls: Vec<Call>,
    pub fail_ethernet: bool,
    pub fail_any: bool,
    pub fail_write: bool,
    pub reads: VecDeque<Result<StreamRead, DaqError>>,
    /// Scan rate reported back from `stream_start` instead of the requested one
    pub reported_rate: Option<f64>,
    next_handle: i32,
    scans_per_read: usize,
    generated: usize,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ethernet_failure(mut self) -> Self {
        self.fail_ethernet = true;
        self
    }

    pub fn with_reads(mut self, reads: Vec<Result<StreamRead, DaqError>>) -> Self {
        self.reads = reads.into();
        self
    }

    pub fn with_reported_rate(mut self, rate: f64) -> Self {
        self.reported_rate = Some(rate);
        self
    }

    pub fn with_write_failure(mut self) -> Self {
        self.fail_write = true;
        self
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|&c| predicate(c)).count()
    }

    pub fn opens(&self) -> Vec<ConnectionType> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Open(_, connection, _) => Some(*connection),
                _ => None,
            })
            .collect()
    }

    pub fn writes(&self) -> Vec<Vec<(String, f64)>> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::WriteNames(_, frames) => Some(frames.clone()),
                _ => None,
            })
            .collect()
    }
}

pub fn read_of(data: Vec<f64>) -> StreamRead {
    StreamRead {
        data,
        device_backlog: 0,
        driver_backlog: 0,
    }
}

pub fn driver_failure(operation: &'static str) -> DaqError {
    DaqError::driver(operation, 1227, "scripted failure")
}

impl DaqDriver for RecordingDriver {
    fn open(
        &mut self,
        device_type: DeviceType,
        connection_type: ConnectionType,
        identifier: &str,
    ) -> Result<Handle, DaqError> {
        self.calls
            .push(Call::Open(device_type, connection_type, identifier.to_string()));
        let fails = match connection_type {
            ConnectionType::Any => self.fail_any,
            _ => self.fail_ethernet,
        };
        if fails {
            return Err(driver_failure("open"));
        }
        self.next_handle += 1;
        Ok(Handle(self.next_handle))
    }

    fn handle_info(&mut self, handle: Handle) -> Result<DeviceInfo, DaqError> {
        self.calls.push(Call::HandleInfo(handle));
        Ok(DeviceInfo {
            device_type: DeviceType::T4,
            connection_type: if self.fail_ethernet {
                ConnectionType::Usb
            } else {
                ConnectionType::Ethernet
            },
            serial_number: 440_000_001,
            ip_address: i32::from_be_bytes([192, 168, 0, 10]),
            port: 502,
            max_bytes_per_mb: 1040,
        })
    }

    fn close(&mut self, handle: Handle) -> Result<(), DaqError> {
        self.calls.push(Call::Close(handle));
        Ok(())
    }

    fn names_to_addresses(&mut self, names: &[&str]) -> Result<Vec<ScanChannel>, DaqError> {
        self.calls.push(Call::NamesToAddresses(
            names.iter().map(|n| n.to_string()).collect(),
        ));
        Ok(names
            .iter()
            .enumerate()
            .map(|(i, name)| ScanChannel {
                name: name.to_string(),
                address: i as i32 * 2,
            })
            .collect())
    }

    fn write_names(&mut self, handle: Handle, frames: &[(&str, f64)]) -> Result<(), DaqError> {
        self.calls.push(Call::WriteNames(
            handle,
            frames.iter().map(|(n, v)| (n.to_string(), *v)).collect(),
        ));
        if self.fail_write {
            return Err(driver_failure("write_names"));
        }
        Ok(())
    }

    fn stream_start(
        &mut self,
        handle: Handle,
        scans_per_read: usize,
        addresses: &[i32],
        scan_rate: f64,
    ) -> Result<f64, DaqError> {
        self.calls.push(Call::StreamStart(
            handle,
            scans_per_read,
            addresses.to_vec(),
            scan_rate,
        ));
        self.scans_per_read = scans_per_read;
        Ok(self.reported_rate.unwrap_or(scan_rate))
    }

    fn stream_read(&mut self, handle: Handle) -> Result<StreamRead, DaqError> {
        self.calls.push(Call::StreamRead(handle));
        if let Some(read) = self.reads.pop_front() {
            return read;
        }

        self.generated += 1;
        let base = (self.generated * 10) as f64;
        let mut data = Vec::with_capacity(self.scans_per_read * 2);
        for scan in 0..self.scans_per_read {
            data.push(base + scan as f64);
            data.push(-(base + scan as f64));
        }
        Ok(read_of(data))
    }

    fn stream_stop(&mut self, handle: Handle) -> Result<(), DaqError> {
        self.calls.push(Call::StreamStop(handle));
        Ok(())
    }
}

/// Surface that counts frames and stops the stream after `limit` of them,
/// either by raising the shutdown flag or by reporting itself closed
pub struct CountingSurface {
    pub draws: usize,
    pub limit: usize,
    pub shutdown: Option<Arc<AtomicBool>>,
    pub vibration_seen: Vec<Vec<f64>>,
}

impl CountingSurface {
    pub fn closing_after(limit: usize) -> Self {
        Self {
            draws: 0,
            limit,
            shutdown: None,
            vibration_seen: Vec::new(),
        }
    }

    pub fn shutting_down_after(limit: usize, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            draws: 0,
            limit,
            shutdown: Some(shutdown),
            vibration_seen: Vec::new(),
        }
    }
}

impl ChartSurface for CountingSurface {
    fn draw(&mut self, frame: &ChartFrame<'_>) -> Result<(), DaqError> {
        self.draws += 1;
        self.vibration_seen = frame.vibration.iter().cloned().collect();
        if self.draws >= self.limit {
            if let Some(flag) = &self.shutdown {
                flag.store(true, Ordering::SeqCst);
            }
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.shutdown.is_some() || self.draws < self.limit
    }
}
