use log::{debug, info};

use crate::driver::DaqDriver;
use crate::error::DaqError;
use crate::types::{Handle, ScanList};

/// Register frames written before streaming: ±10 V on both inputs,
/// automatic settling, default resolution.
pub const STREAM_CONFIG_FRAMES: [(&str, f64); 4] = [
    ("AIN0_RANGE", 10.0),
    ("AIN1_RANGE", 10.0),
    ("STREAM_SETTLING_US", 0.0),
    ("STREAM_RESOLUTION_INDEX", 0.0),
];

/// Default scan list: vibration on AIN0, temperature on AIN1
pub const DEFAULT_SCAN_LIST: [&str; 2] = ["AIN0", "AIN1"];

/// Prepares an open device for two-channel streaming
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceConfigurator;

impl DeviceConfigurator {
    /// Resolve the channel names and write the stream configuration
    ///
    /// The register frames are the same whatever channels are requested.
    /// Register state persists on the device until it is power-cycled or
    /// reconfigured, so the returned scan list stays valid across reconnects.
    pub fn configure<D: DaqDriver + ?Sized>(
        &self,
        driver: &mut D,
        handle: Handle,
        channel_names: &[&str],
    ) -> Result<ScanList, DaqError> {
        let scan_list = ScanList(driver.names_to_addresses(channel_names)?);
        debug!("DAQ: Scan list resolved to {:?}", scan_list.addresses());

        driver.write_names(handle, &STREAM_CONFIG_FRAMES)?;
        info!("DAQ: LabJack configured.");

        Ok(scan_list)
    }
}
