pub mod config;
pub mod configurator;
pub mod driver;
pub mod error;
pub mod locator;
pub mod plotting;
pub mod session;
pub mod stream;
pub mod types;
pub mod window;

pub use config::{load_config, AppConfig};
pub use configurator::{DeviceConfigurator, DEFAULT_SCAN_LIST, STREAM_CONFIG_FRAMES};
pub use driver::{DaqDriver, SimulatedDriver};
#[cfg(feature = "ljm")]
pub use driver::LjmDriver;
pub use error::DaqError;
pub use locator::DeviceLocator;
pub use plotting::{determine_scale, plot_channel, ChartSurface, TerminalCharts};
pub use session::{Diagnostic, SessionState, StopReason, StreamSummary};
pub use stream::{
    deinterleave, split_channels, ChartFrame, StreamSettings, StreamViewer, TickReport,
    CHANNEL_COUNT,
};
pub use types::{
    number_to_ip, ConnectionType, DeviceInfo, DeviceType, Handle, ScanChannel, ScanList,
    StreamRead,
};
pub use window::RollingWindow;
