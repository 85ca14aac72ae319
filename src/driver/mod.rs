pub mod simulated;

#[cfg(feature = "ljm")]
pub mod ljm;

pub use simulated::SimulatedDriver;

#[cfg(feature = "ljm")]
pub use ljm::LjmDriver;

use crate::error::DaqError;
use crate::types::{ConnectionType, DeviceInfo, DeviceType, Handle, ScanChannel, StreamRead};

/// Capability interface over a LabJack driver
///
/// Everything the diagnostic needs from the hardware goes through this
/// trait, so the locator, configurator and stream viewer can run against
/// the vendor LJM library, the built-in simulator, or a test double.
///
/// Implementations are expected to report every vendor failure as
/// [`DaqError::Driver`] and never retry on their own.
pub trait DaqDriver: Send {
    // === Connection ===

    /// Open a device by model, transport and identifier
    ///
    /// # Arguments
    /// * `device_type` - Device model to match
    /// * `connection_type` - Transport to use (`Any` lets the driver choose)
    /// * `identifier` - Serial number, IP, name or `"ANY"`
    fn open(
        &mut self,
        device_type: DeviceType,
        connection_type: ConnectionType,
        identifier: &str,
    ) -> Result<Handle, DaqError>;

    /// Query identity information of an open handle
    fn handle_info(&mut self, handle: Handle) -> Result<DeviceInfo, DaqError>;

    /// Close an open handle. Stops any running stream on it.
    fn close(&mut self, handle: Handle) -> Result<(), DaqError>;

    // === Registers ===

    /// Resolve register names to Modbus addresses, preserving order
    fn names_to_addresses(&mut self, names: &[&str]) -> Result<Vec<ScanChannel>, DaqError>;

    /// Write several named registers in one batched call
    fn write_names(&mut self, handle: Handle, frames: &[(&str, f64)]) -> Result<(), DaqError>;

    // === Streaming ===

    /// Start streaming the given addresses
    ///
    /// # Returns
    /// The scan rate actually configured by the device
    fn stream_start(
        &mut self,
        handle: Handle,
        scans_per_read: usize,
        addresses: &[i32],
        scan_rate: f64,
    ) -> Result<f64, DaqError>;

    /// Block until one buffer of `scans_per_read` scans is available and return it
    fn stream_read(&mut self, handle: Handle) -> Result<StreamRead, DaqError>;

    /// Stop a running stream
    fn stream_stop(&mut self, handle: Handle) -> Result<(), DaqError>;
}

impl<D: DaqDriver + ?Sized> DaqDriver for Box<D> {
    fn open(
        &mut self,
        device_type: DeviceType,
        connection_type: ConnectionType,
        identifier: &str,
    ) -> Result<Handle, DaqError> {
        (**self).open(device_type, connection_type, identifier)
    }

    fn handle_info(&mut self, handle: Handle) -> Result<DeviceInfo, DaqError> {
        (**self).handle_info(handle)
    }

    fn close(&mut self, handle: Handle) -> Result<(), DaqError> {
        (**self).close(handle)
    }

    fn names_to_addresses(&mut self, names: &[&str]) -> Result<Vec<ScanChannel>, DaqError> {
        (**self).names_to_addresses(names)
    }

    fn write_names(&mut self, handle: Handle, frames: &[(&str, f64)]) -> Result<(), DaqError> {
        (**self).write_names(handle, frames)
    }

    fn stream_start(
        &mut self,
        handle: Handle,
        scans_per_read: usize,
        addresses: &[i32],
        scan_rate: f64,
    ) -> Result<f64, DaqError> {
        (**self).stream_start(handle, scans_per_read, addresses, scan_rate)
    }

    fn stream_read(&mut self, handle: Handle) -> Result<StreamRead, DaqError> {
        (**self).stream_read(handle)
    }

    fn stream_stop(&mut self, handle: Handle) -> Result<(), DaqError> {
        (**self).stream_stop(handle)
    }
}

impl<D: DaqDriver + ?Sized> DaqDriver for &mut D {
    fn open(
        &mut self,
        device_type: DeviceType,
        connection_type: ConnectionType,
        identifier: &str,
    ) -> Result<Handle, DaqError> {
        (**self).open(device_type, connection_type, identifier)
    }

    fn handle_info(&mut self, handle: Handle) -> Result<DeviceInfo, DaqError> {
        (**self).handle_info(handle)
    }

    fn close(&mut self, handle: Handle) -> Result<(), DaqError> {
        (**self).close(handle)
    }

    fn names_to_addresses(&mut self, names: &[&str]) -> Result<Vec<ScanChannel>, DaqError> {
        (**self).names_to_addresses(names)
    }

    fn write_names(&mut self, handle: Handle, frames: &[(&str, f64)]) -> Result<(), DaqError> {
        (**self).write_names(handle, frames)
    }

    fn stream_start(
        &mut self,
        handle: Handle,
        scans_per_read: usize,
        addresses: &[i32],
        scan_rate: f64,
    ) -> Result<f64, DaqError> {
        (**self).stream_start(handle, scans_per_read, addresses, scan_rate)
    }

    fn stream_read(&mut self, handle: Handle) -> Result<StreamRead, DaqError> {
        (**self).stream_read(handle)
    }

    fn stream_stop(&mut self, handle: Handle) -> Result<(), DaqError> {
        (**self).stream_stop(handle)
    }
}
