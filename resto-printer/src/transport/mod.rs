//! Printer transports
//!
//! One interface over the two Bluetooth stacks a printer can be reached by:
//!
//! - [`classic`]: Classic Bluetooth SPP through an RFCOMM tty (Linux)
//! - [`ble`]: Bluetooth Low Energy GATT writes (`ble` feature)
//! - [`unavailable`]: stub for stacks this platform/build lacks
//! - [`mock`]: scripted in-memory transport for tests and demos
//!
//! Transports only move bytes and report raw scan candidates. Name filtering,
//! scan timeouts and connection bookkeeping live in
//! [`Discovery`](crate::Discovery) and
//! [`ConnectionManager`](crate::ConnectionManager).

#[cfg(feature = "ble")]
pub mod ble;
#[cfg(target_os = "linux")]
pub mod classic;
pub mod mock;
pub mod unavailable;

use std::sync::Arc;

use async_trait::async_trait;
use shared::models::{PrinterDevice, TransportKind};
use tokio::sync::mpsc;
use tracing::info;

use crate::config::PrinterConfig;
use crate::error::PrintResult;

pub use mock::MockTransport;
pub use unavailable::UnavailableTransport;

/// Scan candidate as reported by the radio, before name filtering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    pub id: String,
    pub name: Option<String>,
}

impl DiscoveredDevice {
    pub fn new(id: impl Into<String>, name: Option<&str>) -> Self {
        Self {
            id: id.into(),
            name: name.map(str::to_string),
        }
    }
}

/// Byte transport to Bluetooth printers
#[async_trait]
pub trait Transport: Send + Sync {
    fn kind(&self) -> TransportKind;

    /// Whether the stack supports only one open link at a time
    fn is_exclusive(&self) -> bool {
        false
    }

    /// Check support, permission and adapter power
    async fn check_ready(&self) -> PrintResult<()>;

    /// Report candidates into `found`
    ///
    /// Finite stacks (paired-device lists) return when done. Advertisement
    /// scans run until the future is dropped; callers must then call
    /// [`stop_scan`](Transport::stop_scan).
    async fn scan(&self, found: mpsc::Sender<DiscoveredDevice>) -> PrintResult<()>;

    /// Stop any radio scan in progress
    async fn stop_scan(&self) -> PrintResult<()>;

    /// Open a write-capable link to `device`
    ///
    /// Returns only once the link can accept [`transmit`](Transport::transmit).
    async fn connect(&self, device: &PrinterDevice) -> PrintResult<()>;

    async fn disconnect(&self, device_id: &str) -> PrintResult<()>;

    /// Send raw bytes over an open link
    async fn transmit(&self, device_id: &str, data: &[u8]) -> PrintResult<()>;
}

/// The process-wide pair of transports, one per Bluetooth stack
///
/// Construct once at startup and share; each transport owns its radio handle
/// for the lifetime of the process.
#[derive(Clone)]
pub struct Transports {
    classic: Arc<dyn Transport>,
    ble: Arc<dyn Transport>,
}

impl Transports {
    pub fn new(classic: Arc<dyn Transport>, ble: Arc<dyn Transport>) -> Self {
        Self { classic, ble }
    }

    /// Select implementations for this platform and build
    pub fn detect(config: &PrinterConfig) -> Self {
        let transports = Self {
            classic: classic_transport(config),
            ble: ble_transport(config),
        };
        info!("Printer transports selected");
        transports
    }

    pub fn get(&self, kind: TransportKind) -> Arc<dyn Transport> {
        match kind {
            TransportKind::Classic => self.classic.clone(),
            TransportKind::Ble => self.ble.clone(),
        }
    }
}

#[cfg(target_os = "linux")]
fn classic_transport(config: &PrinterConfig) -> Arc<dyn Transport> {
    Arc::new(classic::ClassicTransport::new(config.rfcomm_channel))
}

#[cfg(not(target_os = "linux"))]
fn classic_transport(_config: &PrinterConfig) -> Arc<dyn Transport> {
    Arc::new(UnavailableTransport::new(
        TransportKind::Classic,
        "Classic Bluetooth printing is only supported on Linux",
    ))
}

#[cfg(feature = "ble")]
fn ble_transport(config: &PrinterConfig) -> Arc<dyn Transport> {
    Arc::new(ble::BleTransport::new(config.ble_chunk_size))
}

#[cfg(not(feature = "ble"))]
fn ble_transport(_config: &PrinterConfig) -> Arc<dyn Transport> {
    Arc::new(UnavailableTransport::new(
        TransportKind::Ble,
        "built without BLE support",
    ))
}
