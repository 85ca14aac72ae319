//! Adapter over the vendor LJM library through the `ljmrs` bindings.
//!
//! Requires the LabJack LJM shared library to be installed on the host.

use log::{debug, info};
use std::fmt::Debug;
use std::sync::OnceLock;

use ljmrs::LJMLibrary;

use super::DaqDriver;
use crate::error::DaqError;
use crate::types::{ConnectionType, DeviceInfo, DeviceType, Handle, ScanChannel, StreamRead};

/// Error code reported when the bindings do not expose the LJM code
const UNKNOWN_LJM_CODE: i32 = -1;

/// Outcome of loading the LJM library, shared by every driver instance
static LJM_INIT: OnceLock<Result<(), String>> = OnceLock::new();

fn ljm_error<E: Debug>(operation: &'static str) -> impl FnOnce(E) -> DaqError {
    move |e| DaqError::driver(operation, UNKNOWN_LJM_CODE, format!("{:?}", e))
}

#[cfg(feature = "ljm-static")]
fn load_library() -> Result<(), String> {
    unsafe { LJMLibrary::init() }
        .map(|_| ())
        .map_err(|e| format!("{:?}", e))
}

#[cfg(not(feature = "ljm-static"))]
fn load_library() -> Result<(), String> {
    unsafe { LJMLibrary::init(None) }
        .map(|_| ())
        .map_err(|e| format!("{:?}", e))
}

fn to_ljm_device(device_type: DeviceType) -> ljmrs::DeviceType {
    match device_type {
        DeviceType::Any => ljmrs::DeviceType::ANY,
        DeviceType::T4 => ljmrs::DeviceType::T4,
        DeviceType::T7 => ljmrs::DeviceType::T7,
        DeviceType::T8 => ljmrs::DeviceType::T8,
    }
}

fn from_ljm_device(device_type: ljmrs::DeviceType) -> Result<DeviceType, DaqError> {
    match device_type {
        ljmrs::DeviceType::ANY => Ok(DeviceType::Any),
        ljmrs::DeviceType::T4 => Ok(DeviceType::T4),
        ljmrs::DeviceType::T7 => Ok(DeviceType::T7),
        ljmrs::DeviceType::T8 => Ok(DeviceType::T8),
        other => Err(DaqError::InvalidIdentifier(format!(
            "Unsupported device type: {}",
            other
        ))),
    }
}

// The bindings have no TCP variant; LJM's numeric code travels through UNKNOWN
fn to_ljm_connection(connection_type: ConnectionType) -> ljmrs::ConnectionType {
    match connection_type {
        ConnectionType::Any => ljmrs::ConnectionType::ANY,
        ConnectionType::Usb => ljmrs::ConnectionType::USB,
        ConnectionType::Tcp => ljmrs::ConnectionType::UNKNOWN(i32::from(ConnectionType::Tcp)),
        ConnectionType::Ethernet => ljmrs::ConnectionType::ETHERNET,
        ConnectionType::Wifi => ljmrs::ConnectionType::WIFI,
    }
}

fn from_ljm_connection(connection_type: ljmrs::ConnectionType) -> Result<ConnectionType, DaqError> {
    match connection_type {
        ljmrs::ConnectionType::ANY => Ok(ConnectionType::Any),
        ljmrs::ConnectionType::USB => Ok(ConnectionType::Usb),
        ljmrs::ConnectionType::ETHERNET => Ok(ConnectionType::Ethernet),
        ljmrs::ConnectionType::WIFI => Ok(ConnectionType::Wifi),
        ljmrs::ConnectionType::UNKNOWN(code) => ConnectionType::try_from(code),
    }
}

/// Production driver talking to real hardware
#[derive(Debug)]
pub struct LjmDriver(());

impl LjmDriver {
    /// Load the LJM library (once per process) and return a driver using it
    pub fn new() -> Result<Self, DaqError> {
        LJM_INIT
            .get_or_init(|| {
                let loaded = load_library();
                if loaded.is_ok() {
                    info!("LJM library loaded");
                }
                loaded
            })
            .clone()
            .map_err(|message| DaqError::driver("init", UNKNOWN_LJM_CODE, message))?;
        Ok(LjmDriver(()))
    }
}

impl DaqDriver for LjmDriver {
    fn open(
        &mut self,
        device_type: DeviceType,
        connection_type: ConnectionType,
        identifier: &str,
    ) -> Result<Handle, DaqError> {
        let raw = LJMLibrary::open_jack(
            to_ljm_device(device_type),
            to_ljm_connection(connection_type),
            identifier.to_string(),
        )
        .map_err(ljm_error("open"))?;
        Ok(Handle(raw))
    }

    fn handle_info(&mut self, handle: Handle) -> Result<DeviceInfo, DaqError> {
        let info = LJMLibrary::get_handle_info(handle.0).map_err(ljm_error("handle_info"))?;
        Ok(DeviceInfo {
            device_type: from_ljm_device(info.device_type)?,
            connection_type: from_ljm_connection(info.connection_type)?,
            serial_number: info.serial_number,
            ip_address: info.ip_address,
            port: info.port,
            max_bytes_per_mb: info.max_bytes_per_megabyte,
        })
    }

    fn close(&mut self, handle: Handle) -> Result<(), DaqError> {
        LJMLibrary::close_jack(handle.0).map_err(ljm_error("close"))?;
        Ok(())
    }

    fn names_to_addresses(&mut self, names: &[&str]) -> Result<Vec<ScanChannel>, DaqError> {
        names
            .iter()
            .map(|name| {
                let (address, _data_type) = LJMLibrary::name_to_address(name.to_string())
                    .map_err(ljm_error("names_to_addresses"))?;
                Ok(ScanChannel {
                    name: name.to_string(),
                    address,
                })
            })
            .collect()
    }

    // The bindings expose single-name writes only, so the frames go out in
    // order rather than as one eWriteNames transaction
    fn write_names(&mut self, handle: Handle, frames: &[(&str, f64)]) -> Result<(), DaqError> {
        for (name, value) in frames {
            debug!("LJM write {} = {}", name, value);
            LJMLibrary::write_name(handle.0, name.to_string(), *value)
                .map_err(ljm_error("write_names"))?;
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
        let actual_rate = LJMLibrary::stream_start(
            handle.0,
            scans_per_read as i32,
            scan_rate,
            addresses.to_vec(),
        )
        .map_err(ljm_error("stream_start"))?;
        if actual_rate != scan_rate {
            debug!("LJM stream rate {} Hz (requested {} Hz)", actual_rate, scan_rate);
        }
        Ok(actual_rate)
    }

    // Backlog counters are not surfaced by the bindings; report none
    fn stream_read(&mut self, handle: Handle) -> Result<StreamRead, DaqError> {
        let data = LJMLibrary::stream_read(handle.0).map_err(ljm_error("stream_read"))?;
        Ok(StreamRead {
            data,
            device_backlog: 0,
            driver_backlog: 0,
        })
    }

    fn stream_stop(&mut self, handle: Handle) -> Result<(), DaqError> {
        LJMLibrary::stream_stop(handle.0).map_err(ljm_error("stream_stop"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_types_map_both_ways() {
        for connection in [
            ConnectionType::Any,
            ConnectionType::Usb,
            ConnectionType::Tcp,
            ConnectionType::Ethernet,
            ConnectionType::Wifi,
        ] {
            assert_eq!(
                from_ljm_connection(to_ljm_connection(connection)).unwrap(),
                connection
            );
        }
        assert!(from_ljm_connection(ljmrs::ConnectionType::UNKNOWN(99)).is_err());
    }

    #[test]
    fn test_device_types_map_both_ways() {
        for device in [DeviceType::Any, DeviceType::T4, DeviceType::T7, DeviceType::T8] {
            assert_eq!(from_ljm_device(to_ljm_device(device)).unwrap(), device);
        }
    }
}
