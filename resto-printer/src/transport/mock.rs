//! Scripted in-memory transport
//!
//! Behaves like a real stack for everything above the transport layer:
//! advertisements arrive on a schedule, connects and transmits can be made to
//! fail per device, and every call is recorded for assertions.
//!
//! ```no_run
//! # async fn demo() {
//! use resto_printer::transport::MockTransport;
//!
//! let ble = MockTransport::ble()
//!     .with_device("AA:BB:CC:DD:EE:01", Some("POS-58"))
//!     .with_device("AA:BB:CC:DD:EE:02", Some("Fitness Band"));
//! # }
//! ```

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use shared::models::{PrinterDevice, TransportKind};
use tokio::sync::mpsc;

use super::{DiscoveredDevice, Transport};
use crate::error::{PrintError, PrintResult};

/// Readiness failure to simulate
#[derive(Debug, Clone)]
enum Readiness {
    Ready,
    Unavailable,
    PermissionDenied,
    RadioOff,
}

#[derive(Default)]
struct State {
    advertised: Vec<(Duration, DiscoveredDevice)>,
    connect_failures: HashSet<String>,
    transmit_failures: HashSet<String>,
    connected: HashSet<String>,
    scanning: bool,
    scan_stops: usize,
    connect_calls: Vec<String>,
    disconnect_calls: Vec<String>,
    transmitted: Vec<(String, Vec<u8>)>,
}

pub struct MockTransport {
    kind: TransportKind,
    readiness: Readiness,
    connect_delay: Duration,
    state: Mutex<State>,
}

impl MockTransport {
    /// Classic stack: paired list, exclusive links
    pub fn classic() -> Self {
        Self::new(TransportKind::Classic)
    }

    /// BLE stack: advertisement scan that runs until stopped
    pub fn ble() -> Self {
        Self::new(TransportKind::Ble)
    }

    fn new(kind: TransportKind) -> Self {
        Self {
            kind,
            readiness: Readiness::Ready,
            connect_delay: Duration::ZERO,
            state: Mutex::new(State::default()),
        }
    }

    /// Device reported immediately by a scan
    pub fn with_device(self, id: &str, name: Option<&str>) -> Self {
        self.advertise_after(Duration::ZERO, id, name)
    }

    /// Device reported `delay` after the previous one (BLE only)
    pub fn advertise_after(self, delay: Duration, id: &str, name: Option<&str>) -> Self {
        self.lock()
            .advertised
            .push((delay, DiscoveredDevice::new(id, name)));
        self
    }

    pub fn fail_connect(self, id: &str) -> Self {
        self.lock().connect_failures.insert(id.to_string());
        self
    }

    pub fn fail_transmit(self, id: &str) -> Self {
        self.lock().transmit_failures.insert(id.to_string());
        self
    }

    /// Every connect takes this long
    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    pub fn unavailable(mut self) -> Self {
        self.readiness = Readiness::Unavailable;
        self
    }

    pub fn permission_denied(mut self) -> Self {
        self.readiness = Readiness::PermissionDenied;
        self
    }

    pub fn radio_off(mut self) -> Self {
        self.readiness = Readiness::RadioOff;
        self
    }

    /// Payloads sent, in order, with their device ids
    pub fn transmitted(&self) -> Vec<(String, Vec<u8>)> {
        self.lock().transmitted.clone()
    }

    pub fn connect_calls(&self) -> Vec<String> {
        self.lock().connect_calls.clone()
    }

    pub fn disconnect_calls(&self) -> Vec<String> {
        self.lock().disconnect_calls.clone()
    }

    /// Whether a link to `id` is currently open at the transport
    pub fn is_linked(&self, id: &str) -> bool {
        self.lock().connected.contains(id)
    }

    pub fn is_scanning(&self) -> bool {
        self.lock().scanning
    }

    pub fn scan_stops(&self) -> usize {
        self.lock().scan_stops
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // Poisoned only if a test panicked while holding the lock
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    fn is_exclusive(&self) -> bool {
        self.kind == TransportKind::Classic
    }

    async fn check_ready(&self) -> PrintResult<()> {
        match self.readiness {
            Readiness::Ready => Ok(()),
            Readiness::Unavailable => Err(PrintError::Unavailable("mock stack absent".into())),
            Readiness::PermissionDenied => {
                Err(PrintError::PermissionDenied("mock permission".into()))
            }
            Readiness::RadioOff => Err(PrintError::RadioOff),
        }
    }

    async fn scan(&self, found: mpsc::Sender<DiscoveredDevice>) -> PrintResult<()> {
        self.check_ready().await?;
        let advertised = {
            let mut state = self.lock();
            state.scanning = self.kind == TransportKind::Ble;
            state.advertised.clone()
        };

        for (delay, device) in advertised {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if found.send(device).await.is_err() {
                return Ok(());
            }
        }

        if self.kind == TransportKind::Ble {
            // Advertisement scans only end when stopped
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn stop_scan(&self) -> PrintResult<()> {
        let mut state = self.lock();
        state.scanning = false;
        state.scan_stops += 1;
        Ok(())
    }

    async fn connect(&self, device: &PrinterDevice) -> PrintResult<()> {
        self.check_ready().await?;
        self.lock().connect_calls.push(device.id.clone());
        if !self.connect_delay.is_zero() {
            tokio::time::sleep(self.connect_delay).await;
        }

        let mut state = self.lock();
        if state.connect_failures.contains(&device.id) {
            return Err(PrintError::connection(&device.id, "mock refused"));
        }
        state.connected.insert(device.id.clone());
        Ok(())
    }

    async fn disconnect(&self, device_id: &str) -> PrintResult<()> {
        let mut state = self.lock();
        state.disconnect_calls.push(device_id.to_string());
        state.connected.remove(device_id);
        Ok(())
    }

    async fn transmit(&self, device_id: &str, data: &[u8]) -> PrintResult<()> {
        let mut state = self.lock();
        if !state.connected.contains(device_id) {
            return Err(PrintError::NotConnected(device_id.to_string()));
        }
        if state.transmit_failures.contains(device_id) {
            state.connected.remove(device_id);
            return Err(PrintError::transmit(device_id, "mock link dropped"));
        }
        state.transmitted.push((device_id.to_string(), data.to_vec()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_classic_scan_completes() {
        let t = MockTransport::classic()
            .with_device("AA", Some("RPP02N"))
            .with_device("BB", None);
        let (tx, mut rx) = mpsc::channel(8);

        t.scan(tx).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().id, "AA");
        assert_eq!(rx.recv().await.unwrap().id, "BB");
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_transmit_requires_link() {
        let t = MockTransport::ble();
        let device = PrinterDevice::new("AA", None, TransportKind::Ble);

        assert!(matches!(t.transmit("AA", b"x").await, Err(PrintError::NotConnected(_))));
        t.connect(&device).await.unwrap();
        t.transmit("AA", b"x").await.unwrap();
        assert_eq!(t.transmitted(), vec![("AA".to_string(), b"x".to_vec())]);
    }

    #[tokio::test]
    async fn test_failed_transmit_drops_link() {
        let t = MockTransport::ble().fail_transmit("AA");
        let device = PrinterDevice::new("AA", None, TransportKind::Ble);

        t.connect(&device).await.unwrap();
        assert!(matches!(t.transmit("AA", b"x").await, Err(PrintError::TransmitFailed { .. })));
        assert!(!t.is_linked("AA"));
    }
}
