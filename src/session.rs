use log::{error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::configurator::DeviceConfigurator;
use crate::driver::DaqDriver;
use crate::error::DaqError;
use crate::locator::DeviceLocator;
use crate::plotting::ChartSurface;
use crate::stream::{StreamSettings, StreamViewer};
use crate::types::{DeviceInfo, Handle, ScanList};

/// Lifecycle of the diagnostic's connection to the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unopened,
    Opening,
    Configured,
    Streaming,
    Closed,
}

impl SessionState {
    /// Move forward, rejecting transitions the lifecycle does not allow
    ///
    /// `Closed -> Opening` is the reconnect that precedes streaming;
    /// [`Diagnostic`] permits it once.
    pub fn advance(&mut self, to: SessionState) -> Result<(), DaqError> {
        use SessionState::*;
        let allowed = matches!(
            (*self, to),
            (Unopened, Opening)
                | (Opening, Configured)
                | (Opening, Streaming)
                | (Opening, Closed)
                | (Configured, Closed)
                | (Streaming, Closed)
                | (Closed, Opening)
        );
        if !allowed {
            return Err(DaqError::InvalidState { from: *self, to });
        }
        *self = to;
        Ok(())
    }
}

/// Why a stream ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Shutdown,
    SurfaceClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSummary {
    pub ticks: u64,
    pub dropped_buffers: usize,
    pub stopped_by: StopReason,
}

/// Connection check plus live view of one device
///
/// `probe` opens, configures and closes the device. `stream` then reconnects
/// (the configuration survives on the device), streams until shut down and
/// closes again, so every open is matched by exactly one close.
pub struct Diagnostic<D: DaqDriver> {
    driver: D,
    locator: DeviceLocator,
    configurator: DeviceConfigurator,
    channel_names: Vec<String>,
    settings: StreamSettings,
    state: SessionState,
    reconnected: bool,
    info: Option<DeviceInfo>,
    scan_list: Option<ScanList>,
}

impl<D: DaqDriver> Diagnostic<D> {
    pub fn new(
        driver: D,
        locator: DeviceLocator,
        channel_names: Vec<String>,
        settings: StreamSettings,
    ) -> Self {
        Self {
            driver,
            locator,
            configurator: DeviceConfigurator,
            channel_names,
            settings,
            state: SessionState::Unopened,
            reconnected: false,
            info: None,
            scan_list: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn scan_list(&self) -> Option<&ScanList> {
        self.scan_list.as_ref()
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Open, identify and configure the device, then close the connection
    ///
    /// Only valid on a fresh session.
    pub fn probe(&mut self) -> Result<&DeviceInfo, DaqError> {
        if self.state != SessionState::Unopened {
            return Err(DaqError::InvalidState {
                from: self.state,
                to: SessionState::Opening,
            });
        }
        self.state.advance(SessionState::Opening)?;
        let (handle, info) = self.locate()?;

        let names: Vec<&str> = self.channel_names.iter().map(String::as_str).collect();
        let scan_list = match self.configurator.configure(&mut self.driver, handle, &names) {
            Ok(scan_list) => scan_list,
            Err(e) => {
                error!("DAQ: Configuration failed: {}", e);
                if let Err(close_err) = self.driver.close(handle) {
                    warn!("DAQ: Failed to close {} after configuration failure: {}", handle, close_err);
                }
                self.state.advance(SessionState::Closed)?;
                return Err(e);
            }
        };
        self.state.advance(SessionState::Configured)?;

        info!("DAQ: Closing connection after configuration.");
        self.driver.close(handle)?;
        self.state.advance(SessionState::Closed)?;

        self.scan_list = Some(scan_list);
        Ok(self.info.insert(info))
    }

    fn locate(&mut self) -> Result<(Handle, DeviceInfo), DaqError> {
        match self.locator.locate(&mut self.driver) {
            Ok(found) => Ok(found),
            Err(e) => {
                self.state.advance(SessionState::Closed)?;
                Err(e)
            }
        }
    }

    /// The one reconnect after configuration, ahead of streaming
    fn reopen(&mut self) -> Result<Handle, DaqError> {
        if self.reconnected {
            return Err(DaqError::InvalidState {
                from: self.state,
                to: SessionState::Opening,
            });
        }
        self.state.advance(SessionState::Opening)?;
        self.reconnected = true;
        let (handle, _info) = self.locate()?;
        Ok(handle)
    }

    fn ensure_probed(&mut self) -> Result<ScanList, DaqError> {
        if self.scan_list.is_none() {
            self.probe()?;
        }
        self.scan_list
            .clone()
            .ok_or(DaqError::InvalidState {
                from: self.state,
                to: SessionState::Streaming,
            })
    }

    /// Reconnect and start streaming, handing the running stream to the caller
    ///
    /// Used when an external event loop drives the ticks. The caller owns the
    /// close through [`StreamViewer::finish`].
    pub fn into_viewer(mut self) -> Result<StreamViewer<D>, DaqError> {
        let scan_list = self.ensure_probed()?;
        let handle = self.reopen()?;

        StreamViewer::start(self.driver, handle, &scan_list, self.settings)
    }

    /// Reconnect, stream into `surface` until stopped, then close
    ///
    /// Runs at most once per session; a second call is an invalid transition.
    /// `shutdown` is checked once per tick before the read. A read or draw
    /// failure stops the stream, closes the handle and is returned unchanged.
    pub fn stream<S: ChartSurface + ?Sized>(
        &mut self,
        shutdown: &AtomicBool,
        surface: &mut S,
    ) -> Result<StreamSummary, DaqError> {
        let scan_list = self.ensure_probed()?;
        let handle = self.reopen()?;

        let mut viewer = match StreamViewer::start(
            &mut self.driver,
            handle,
            &scan_list,
            self.settings.clone(),
        ) {
            Ok(viewer) => viewer,
            Err(e) => {
                error!("DAQ: Failed to start stream: {}", e);
                self.state.advance(SessionState::Closed)?;
                return Err(e);
            }
        };
        self.state.advance(SessionState::Streaming)?;

        let tick_period = self.settings.tick_period;
        let outcome = loop {
            if shutdown.load(Ordering::SeqCst) {
                info!("DAQ: Shutdown requested.");
                break Ok(StopReason::Shutdown);
            }
            if !surface.is_open() {
                info!("DAQ: Display closed.");
                break Ok(StopReason::SurfaceClosed);
            }

            let tick_started = Instant::now();
            if let Err(e) = viewer.tick() {
                break Err(e);
            }
            if let Err(e) = surface.draw(&viewer.frame()) {
                error!("DAQ: Failed to draw frame: {}", e);
                break Err(e);
            }

            if let Some(remaining) = tick_period.checked_sub(tick_started.elapsed()) {
                std::thread::sleep(remaining);
            }
        };

        let ticks = viewer.ticks();
        let dropped_buffers = viewer.dropped_total();
        let finished = viewer.finish();
        self.state.advance(SessionState::Closed)?;

        let stopped_by = outcome?;
        finished?;

        info!(
            "DAQ: Stream ended after {} ticks ({} buffers dropped).",
            ticks, dropped_buffers
        );
        Ok(StreamSummary {
            ticks,
            dropped_buffers,
            stopped_by,
        })
    }
}
