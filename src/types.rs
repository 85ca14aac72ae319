use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::error::DaqError;

/// Opaque identifier of an open device connection, as handed out by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(pub i32);

impl From<Handle> for i32 {
    fn from(handle: Handle) -> Self {
        handle.0
    }
}

impl From<i32> for Handle {
    fn from(raw: i32) -> Self {
        Handle(raw)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Device model, numbered the way the LJM driver numbers them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    Any = 0,
    T4 = 4,
    T7 = 7,
    T8 = 8,
}

impl DeviceType {
    /// Identifier string accepted by the driver's open-by-name call
    pub fn as_identifier(&self) -> &'static str {
        match self {
            DeviceType::Any => "ANY",
            DeviceType::T4 => "T4",
            DeviceType::T7 => "T7",
            DeviceType::T8 => "T8",
        }
    }
}

impl From<DeviceType> for i32 {
    fn from(device_type: DeviceType) -> Self {
        device_type as i32
    }
}

impl TryFrom<i32> for DeviceType {
    type Error = DaqError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DeviceType::Any),
            4 => Ok(DeviceType::T4),
            7 => Ok(DeviceType::T7),
            8 => Ok(DeviceType::T8),
            _ => Err(DaqError::InvalidIdentifier(format!(
                "Unknown device type code: {}",
                value
            ))),
        }
    }
}

impl FromStr for DeviceType {
    type Err = DaqError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ANY" | "LJM_DTANY" => Ok(DeviceType::Any),
            "T4" | "LJM_DTT4" => Ok(DeviceType::T4),
            "T7" | "LJM_DTT7" => Ok(DeviceType::T7),
            "T8" | "LJM_DTT8" => Ok(DeviceType::T8),
            other => Err(DaqError::InvalidIdentifier(format!(
                "Unknown device type: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_identifier())
    }
}

/// Transport used to reach the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionType {
    Any = 0,
    Usb = 1,
    Tcp = 2,
    Ethernet = 3,
    Wifi = 4,
}

impl ConnectionType {
    pub fn as_identifier(&self) -> &'static str {
        match self {
            ConnectionType::Any => "ANY",
            ConnectionType::Usb => "USB",
            ConnectionType::Tcp => "TCP",
            ConnectionType::Ethernet => "ETHERNET",
            ConnectionType::Wifi => "WIFI",
        }
    }
}

impl From<ConnectionType> for i32 {
    fn from(connection_type: ConnectionType) -> Self {
        connection_type as i32
    }
}

impl TryFrom<i32> for ConnectionType {
    type Error = DaqError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ConnectionType::Any),
            1 => Ok(ConnectionType::Usb),
            2 => Ok(ConnectionType::Tcp),
            3 => Ok(ConnectionType::Ethernet),
            4 => Ok(ConnectionType::Wifi),
            _ => Err(DaqError::InvalidIdentifier(format!(
                "Unknown connection type code: {}",
                value
            ))),
        }
    }
}

impl FromStr for ConnectionType {
    type Err = DaqError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "ANY" => Ok(ConnectionType::Any),
            "USB" => Ok(ConnectionType::Usb),
            "TCP" => Ok(ConnectionType::Tcp),
            "ETHERNET" | "ETH" => Ok(ConnectionType::Ethernet),
            "WIFI" => Ok(ConnectionType::Wifi),
            other => Err(DaqError::InvalidIdentifier(format!(
                "Unknown connection type: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_identifier())
    }
}

/// Identity of an open device, queried once right after opening it
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceInfo {
    pub device_type: DeviceType,
    pub connection_type: ConnectionType,
    pub serial_number: i32,
    /// IPv4 address packed into an i32, most significant octet first
    pub ip_address: i32,
    pub port: i32,
    pub max_bytes_per_mb: i32,
}

impl DeviceInfo {
    pub fn ip(&self) -> Ipv4Addr {
        number_to_ip(self.ip_address)
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\tDevice type: {}", self.device_type)?;
        writeln!(f, "\tConnection type: {}", self.connection_type)?;
        writeln!(f, "\tSerial Number: {}", self.serial_number)?;
        writeln!(f, "\tIP Address: {}", self.ip())?;
        writeln!(f, "\tPort: {}", self.port)?;
        write!(f, "\tMax bytes per MB: {}", self.max_bytes_per_mb)
    }
}

/// Unpack the driver's numeric IPv4 representation
pub fn number_to_ip(number: i32) -> Ipv4Addr {
    Ipv4Addr::from((number as u32).to_be_bytes())
}

/// One named channel resolved to its Modbus address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanChannel {
    pub name: String,
    pub address: i32,
}

/// Ordered channels sampled on every stream scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanList(pub Vec<ScanChannel>);

impl ScanList {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn addresses(&self) -> Vec<i32> {
        self.0.iter().map(|c| c.address).collect()
    }
}

/// Result of one blocking stream read
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamRead {
    /// Interleaved samples, one value per channel per scan
    pub data: Vec<f64>,
    /// Scans still waiting in the device buffer
    pub device_backlog: i32,
    /// Scans already transferred to the driver but not yet read
    pub driver_backlog: i32,
}
