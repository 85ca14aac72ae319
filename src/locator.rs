use log::{info, warn};

use crate::driver::DaqDriver;
use crate::error::DaqError;
use crate::types::{ConnectionType, DeviceInfo, DeviceType, Handle};

/// Finds the device, preferring a network transport over whatever else is attached
#[derive(Debug, Clone)]
pub struct DeviceLocator {
    pub device_type: DeviceType,
    pub preferred_connection: ConnectionType,
    pub identifier: String,
}

impl Default for DeviceLocator {
    fn default() -> Self {
        Self {
            device_type: DeviceType::T4,
            preferred_connection: ConnectionType::Ethernet,
            identifier: "ANY".to_string(),
        }
    }
}

impl DeviceLocator {
    pub fn new(
        device_type: DeviceType,
        preferred_connection: ConnectionType,
        identifier: impl Into<String>,
    ) -> Self {
        Self {
            device_type,
            preferred_connection,
            identifier: identifier.into(),
        }
    }

    /// Open the device and read its identity
    ///
    /// The preferred transport is tried first. If it fails, a single open over
    /// any transport follows and its error, if any, is returned unchanged.
    pub fn locate<D: DaqDriver + ?Sized>(
        &self,
        driver: &mut D,
    ) -> Result<(Handle, DeviceInfo), DaqError> {
        info!("DAQ: Creating LabJack connection...");

        let handle = match driver.open(
            self.device_type,
            self.preferred_connection,
            &self.identifier,
        ) {
            Ok(handle) => handle,
            Err(e) if self.preferred_connection != ConnectionType::Any => {
                warn!(
                    "DAQ: {} connection could not be established: {}",
                    self.preferred_connection, e
                );
                driver.open(self.device_type, ConnectionType::Any, &self.identifier)?
            }
            Err(e) => return Err(e),
        };

        let info = driver.handle_info(handle)?;
        info!("DAQ: Opened a LabJack {} with:\n{}", handle, info);

        Ok((handle, info))
    }
}
