use log::{debug, info};
use std::collections::{HashMap, HashSet};
use std::f64::consts::TAU;
use std::time::{Duration, Instant};

use super::DaqDriver;
use crate::error::DaqError;
use crate::types::{ConnectionType, DeviceInfo, DeviceType, Handle, ScanChannel, StreamRead};

// LJM error codes reproduced by the simulator
const LJME_DEVICE_NOT_OPEN: i32 = 1224;
const LJME_DEVICE_NOT_FOUND: i32 = 1227;
const LJME_INVALID_NAME: i32 = 1294;
const LJME_STREAM_NOT_RUNNING: i32 = 2103;

const SIM_SERIAL_NUMBER: i32 = 440_012_345;
const SIM_IP: [u8; 4] = [192, 168, 1, 207];
const SIM_PORT: i32 = 502;

/// Vibration tone frequency in Hz
const VIBRATION_HZ: f64 = 50.0;
const VIBRATION_AMPLITUDE_V: f64 = 0.5;
/// Temperature sensor output drifting slowly around 2.5 V
const TEMPERATURE_BASE_V: f64 = 2.5;
const TEMPERATURE_DRIFT_V: f64 = 0.02;
const TEMPERATURE_DRIFT_HZ: f64 = 0.05;

#[derive(Debug)]
struct SimStream {
    handle: Handle,
    scans_per_read: usize,
    channels: usize,
    scan_rate: f64,
    scans_delivered: u64,
    started: Instant,
}

/// Synthetic T4 for running the diagnostic without hardware
///
/// Channel 0 carries a sine "vibration" tone and channel 1 a slowly
/// drifting "temperature" level; any further channels read 0 V.
#[derive(Debug)]
pub struct SimulatedDriver {
    ethernet_available: bool,
    paced: bool,
    next_handle: i32,
    open_handles: HashMap<Handle, ConnectionType>,
    registers: HashMap<i32, f64>,
    stream: Option<SimStream>,
}

impl Default for SimulatedDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedDriver {
    /// USB-attached device, reads return immediately
    pub fn new() -> Self {
        Self {
            ethernet_available: false,
            paced: false,
            next_handle: 1,
            open_handles: HashMap::new(),
            registers: HashMap::new(),
            stream: None,
        }
    }

    /// Make the device reachable over Ethernet as well as USB
    pub fn with_ethernet(mut self, available: bool) -> Self {
        self.ethernet_available = available;
        self
    }

    /// Block each read until its buffer would have been sampled in real time
    pub fn with_pacing(mut self, paced: bool) -> Self {
        self.paced = paced;
        self
    }

    /// Last value written to a register address, if any
    pub fn register(&self, address: i32) -> Option<f64> {
        self.registers.get(&address).copied()
    }

    pub fn open_handles(&self) -> HashSet<Handle> {
        self.open_handles.keys().copied().collect()
    }

    fn ensure_open(&self, handle: Handle, operation: &'static str) -> Result<ConnectionType, DaqError> {
        self.open_handles.get(&handle).copied().ok_or_else(|| {
            DaqError::driver(
                operation,
                LJME_DEVICE_NOT_OPEN,
                format!("handle {} is not open", handle),
            )
        })
    }

    fn sample(channel: usize, t: f64) -> f64 {
        match channel {
            0 => VIBRATION_AMPLITUDE_V * (TAU * VIBRATION_HZ * t).sin(),
            1 => TEMPERATURE_BASE_V + TEMPERATURE_DRIFT_V * (TAU * TEMPERATURE_DRIFT_HZ * t).sin(),
            _ => 0.0,
        }
    }
}

/// Modbus address of a T4 register name
fn resolve_name(name: &str) -> Option<i32> {
    match name {
        "STREAM_SETTLING_US" => return Some(4008),
        "STREAM_RESOLUTION_INDEX" => return Some(4010),
        _ => {}
    }

    let rest = name.strip_prefix("AIN")?;
    let (index, suffix) = match rest.split_once('_') {
        Some((index, suffix)) => (index, Some(suffix)),
        None => (rest, None),
    };
    let index: i32 = index.parse().ok()?;
    if !(0..=11).contains(&index) {
        return None;
    }

    match suffix {
        None => Some(index * 2),
        Some("RANGE") => Some(40000 + index * 2),
        Some(_) => None,
    }
}

impl DaqDriver for SimulatedDriver {
    fn open(
        &mut self,
        device_type: DeviceType,
        connection_type: ConnectionType,
        identifier: &str,
    ) -> Result<Handle, DaqError> {
        let reachable = match connection_type {
            ConnectionType::Any | ConnectionType::Usb => Some(ConnectionType::Usb),
            ConnectionType::Ethernet | ConnectionType::Tcp if self.ethernet_available => {
                Some(ConnectionType::Ethernet)
            }
            _ => None,
        };
        let model_matches = matches!(device_type, DeviceType::Any | DeviceType::T4);
        let id_matches = identifier.eq_ignore_ascii_case("ANY")
            || identifier == SIM_SERIAL_NUMBER.to_string();

        match reachable {
            Some(actual) if model_matches && id_matches => {
                let handle = Handle(self.next_handle);
                self.next_handle += 1;
                self.open_handles.insert(handle, actual);
                debug!("Simulator opened {} over {}", handle, actual);
                Ok(handle)
            }
            _ => Err(DaqError::driver(
                "open",
                LJME_DEVICE_NOT_FOUND,
                format!(
                    "no {} reachable over {} matching {}",
                    device_type, connection_type, identifier
                ),
            )),
        }
    }

    fn handle_info(&mut self, handle: Handle) -> Result<DeviceInfo, DaqError> {
        let connection_type = self.ensure_open(handle, "handle_info")?;
        Ok(DeviceInfo {
            device_type: DeviceType::T4,
            connection_type,
            serial_number: SIM_SERIAL_NUMBER,
            ip_address: i32::from_be_bytes(SIM_IP),
            port: if connection_type == ConnectionType::Usb { 0 } else { SIM_PORT },
            max_bytes_per_mb: if connection_type == ConnectionType::Usb { 64 } else { 1040 },
        })
    }

    fn close(&mut self, handle: Handle) -> Result<(), DaqError> {
        self.ensure_open(handle, "close")?;
        if self.stream.as_ref().is_some_and(|s| s.handle == handle) {
            self.stream = None;
        }
        self.open_handles.remove(&handle);
        Ok(())
    }

    fn names_to_addresses(&mut self, names: &[&str]) -> Result<Vec<ScanChannel>, DaqError> {
        names
            .iter()
            .map(|name| {
                resolve_name(name)
                    .map(|address| ScanChannel {
                        name: name.to_string(),
                        address,
                    })
                    .ok_or_else(|| {
                        DaqError::driver(
                            "names_to_addresses",
                            LJME_INVALID_NAME,
                            format!("unknown register name {}", name),
                        )
                    })
            })
            .collect()
    }

    fn write_names(&mut self, handle: Handle, frames: &[(&str, f64)]) -> Result<(), DaqError> {
        self.ensure_open(handle, "write_names")?;
        let resolved = frames
            .iter()
            .map(|(name, value)| {
                resolve_name(name).map(|address| (address, *value)).ok_or_else(|| {
                    DaqError::driver(
                        "write_names",
                        LJME_INVALID_NAME,
                        format!("unknown register name {}", name),
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.registers.extend(resolved);
        Ok(())
    }

    fn stream_start(
        &mut self,
        handle: Handle,
        scans_per_read: usize,
        addresses: &[i32],
        scan_rate: f64,
    ) -> Result<f64, DaqError> {
        self.ensure_open(handle, "stream_start")?;
        info!(
            "Simulator streaming {} channels at {:.1} Hz",
            addresses.len(),
            scan_rate
        );
        self.stream = Some(SimStream {
            handle,
            scans_per_read,
            channels: addresses.len(),
            scan_rate,
            scans_delivered: 0,
            started: Instant::now(),
        });
        Ok(scan_rate)
    }

    fn stream_read(&mut self, handle: Handle) -> Result<StreamRead, DaqError> {
        self.ensure_open(handle, "stream_read")?;
        let paced = self.paced;
        let stream = self
            .stream
            .as_mut()
            .filter(|s| s.handle == handle)
            .ok_or_else(|| {
                DaqError::driver("stream_read", LJME_STREAM_NOT_RUNNING, "stream is not running")
            })?;

        let first_scan = stream.scans_delivered;
        let last_scan = first_scan + stream.scans_per_read as u64;

        let mut driver_backlog = 0;
        if paced {
            let due = Duration::from_secs_f64(last_scan as f64 / stream.scan_rate);
            let elapsed = stream.started.elapsed();
            if elapsed < due {
                std::thread::sleep(due - elapsed);
            } else {
                let available = (elapsed.as_secs_f64() * stream.scan_rate) as u64;
                driver_backlog = available.saturating_sub(last_scan) as i32;
            }
        }

        let mut data = Vec::with_capacity(stream.scans_per_read * stream.channels);
        for scan in first_scan..last_scan {
            let t = scan as f64 / stream.scan_rate;
            for channel in 0..stream.channels {
                data.push(Self::sample(channel, t));
            }
        }
        stream.scans_delivered = last_scan;

        Ok(StreamRead {
            data,
            device_backlog: 0,
            driver_backlog,
        })
    }

    fn stream_stop(&mut self, handle: Handle) -> Result<(), DaqError> {
        self.ensure_open(handle, "stream_stop")?;
        match self.stream.take() {
            Some(stream) if stream.handle == handle => Ok(()),
            other => {
                self.stream = other;
                Err(DaqError::driver(
                    "stream_stop",
                    LJME_STREAM_NOT_RUNNING,
                    "stream is not running",
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_t4_names() {
        assert_eq!(resolve_name("AIN0"), Some(0));
        assert_eq!(resolve_name("AIN1"), Some(2));
        assert_eq!(resolve_name("AIN1_RANGE"), Some(40002));
        assert_eq!(resolve_name("STREAM_SETTLING_US"), Some(4008));
        assert_eq!(resolve_name("AIN99"), None);
        assert_eq!(resolve_name("DAC0"), None);
    }

    #[test]
    fn test_ethernet_unavailable_by_default() {
        let mut driver = SimulatedDriver::new();
        assert!(driver
            .open(DeviceType::T4, ConnectionType::Ethernet, "ANY")
            .is_err());
        let handle = driver
            .open(DeviceType::T4, ConnectionType::Any, "ANY")
            .unwrap();
        let info = driver.handle_info(handle).unwrap();
        assert_eq!(info.connection_type, ConnectionType::Usb);
    }

    #[test]
    fn test_stream_read_is_interleaved() {
        let mut driver = SimulatedDriver::new();
        let handle = driver.open(DeviceType::T4, ConnectionType::Any, "ANY").unwrap();
        driver.stream_start(handle, 4, &[0, 2], 1000.0).unwrap();

        let read = driver.stream_read(handle).unwrap();
        assert_eq!(read.data.len(), 8);
        // Odd slots are the temperature channel
        for value in read.data.iter().skip(1).step_by(2) {
            assert!((value - TEMPERATURE_BASE_V).abs() <= TEMPERATURE_DRIFT_V);
        }
    }

    #[test]
    fn test_closed_handle_rejects_reads() {
        let mut driver = SimulatedDriver::new();
        let handle = driver.open(DeviceType::T4, ConnectionType::Any, "ANY").unwrap();
        driver.stream_start(handle, 4, &[0, 2], 1000.0).unwrap();
        driver.close(handle).unwrap();
        assert!(driver.stream_read(handle).is_err());
        assert!(driver.open_handles().is_empty());
    }
}
