//! Printer discovery
//!
//! Classic discovery lists OS-paired devices and returns at once. BLE
//! discovery listens to advertisements for a bounded window, reporting each
//! printer once through a callback as it appears, and always stops the radio
//! scan when the window closes.
//!
//! Both keep only devices whose advertised name looks like a printer; nameless
//! devices are dropped.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use shared::models::{PrinterDevice, TransportKind};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::error::PrintResult;
use crate::transport::{DiscoveredDevice, Transport, Transports};

/// Default BLE scan window
pub const DEFAULT_BLE_SCAN_TIMEOUT: Duration = Duration::from_secs(10);

/// Case-insensitive name fragments that mark a device as a printer
const PRINTER_NAME_HINTS: [&str; 4] = ["printer", "pos", "rpp", "thermal"];

/// Whether an advertised name looks like a thermal printer
pub fn is_printer_name(name: Option<&str>) -> bool {
    let Some(name) = name else {
        return false;
    };
    let name = name.to_lowercase();
    PRINTER_NAME_HINTS.iter().any(|hint| name.contains(hint))
}

/// Result of a scan that ran to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    Found(Vec<PrinterDevice>),
    /// Scan worked but nothing printer-like was seen
    NotFound,
}

impl ScanOutcome {
    fn from_devices(devices: Vec<PrinterDevice>) -> Self {
        if devices.is_empty() {
            ScanOutcome::NotFound
        } else {
            ScanOutcome::Found(devices)
        }
    }

    pub fn devices(&self) -> &[PrinterDevice] {
        match self {
            ScanOutcome::Found(devices) => devices,
            ScanOutcome::NotFound => &[],
        }
    }

    /// Guidance for an empty scan
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            ScanOutcome::Found(_) => None,
            ScanOutcome::NotFound => Some(
                "No printers found. Turn the printer on, keep it close, and pair Classic printers in system settings first.",
            ),
        }
    }
}

pub struct Discovery {
    transports: Transports,
    ble_timeout: Duration,
}

impl Discovery {
    pub fn new(transports: Transports, ble_timeout: Duration) -> Self {
        Self {
            transports,
            ble_timeout,
        }
    }

    /// Printers among the OS-paired Classic devices
    #[instrument(skip(self))]
    pub async fn scan_classic(&self) -> PrintResult<ScanOutcome> {
        let transport = self.transports.get(TransportKind::Classic);
        transport.check_ready().await?;

        let outcome = collect(transport, None, |_| {}).await?;
        info!(found = outcome.devices().len(), "Classic scan finished");
        Ok(outcome)
    }

    /// Scan for BLE printers for the configured window
    ///
    /// `on_found` is called once per printer as it is first seen.
    pub async fn scan_ble<F>(&self, on_found: F) -> PrintResult<ScanOutcome>
    where
        F: FnMut(&PrinterDevice) + Send,
    {
        self.scan_ble_for(self.ble_timeout, on_found).await
    }

    /// Scan for BLE printers for `window`
    #[instrument(skip(self, on_found))]
    pub async fn scan_ble_for<F>(&self, window: Duration, on_found: F) -> PrintResult<ScanOutcome>
    where
        F: FnMut(&PrinterDevice) + Send,
    {
        let transport = self.transports.get(TransportKind::Ble);
        transport.check_ready().await?;

        let outcome = collect(transport, Some(window), on_found).await?;
        info!(found = outcome.devices().len(), "BLE scan finished");
        Ok(outcome)
    }

    /// Dispatch on transport kind
    pub async fn scan<F>(&self, kind: TransportKind, on_found: F) -> PrintResult<ScanOutcome>
    where
        F: FnMut(&PrinterDevice) + Send,
    {
        match kind {
            TransportKind::Classic => {
                let outcome = self.scan_classic().await?;
                outcome.devices().iter().for_each(on_found);
                Ok(outcome)
            }
            TransportKind::Ble => self.scan_ble(on_found).await,
        }
    }
}

/// Drive a transport scan, filtering and de-duplicating candidates
///
/// With a `window` the scan is cut off at the deadline; without one it runs
/// until the transport finishes. The radio scan is stopped either way.
async fn collect<F>(
    transport: Arc<dyn Transport>,
    window: Option<Duration>,
    mut on_found: F,
) -> PrintResult<ScanOutcome>
where
    F: FnMut(&PrinterDevice) + Send,
{
    let kind = transport.kind();
    let (tx, mut rx) = mpsc::channel::<DiscoveredDevice>(32);
    let mut guard = StopScanGuard::new(transport.clone());

    let mut seen = HashSet::new();
    let mut devices = Vec::new();
    let mut accept = |candidate: DiscoveredDevice| {
        if !is_printer_name(candidate.name.as_deref()) || !seen.insert(candidate.id.clone()) {
            return;
        }
        let device = PrinterDevice::new(candidate.id, candidate.name, kind);
        debug!(id = %device.id, name = ?device.name, "Printer found");
        on_found(&device);
        devices.push(device);
    };

    let deadline = async {
        match window {
            Some(window) => tokio::time::sleep(window).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    let scan = transport.scan(tx);
    tokio::pin!(scan);
    let mut scan_done = false;
    let mut result = Ok(());

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            finished = &mut scan, if !scan_done => {
                scan_done = true;
                result = finished;
            }
            candidate = rx.recv() => match candidate {
                Some(candidate) => accept(candidate),
                None => break,
            },
        }
    }

    guard.stop().await;
    result?;
    Ok(ScanOutcome::from_devices(devices))
}

/// Stops the radio scan when a discovery future ends or is dropped
struct StopScanGuard {
    transport: Option<Arc<dyn Transport>>,
}

impl StopScanGuard {
    fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport: Some(transport),
        }
    }

    async fn stop(&mut self) {
        let Some(transport) = self.transport.take() else {
            return;
        };
        if let Err(e) = transport.stop_scan().await {
            warn!(error = %e, "Failed to stop scan");
        }
    }
}

impl Drop for StopScanGuard {
    fn drop(&mut self) {
        let Some(transport) = self.transport.take() else {
            return;
        };
        // Cancelled mid-scan: stop in the background
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Err(e) = transport.stop_scan().await {
                    warn!(error = %e, "Failed to stop scan");
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_printer_name_filter() {
        assert!(is_printer_name(Some("POS-58")));
        assert!(is_printer_name(Some("RPP02N")));
        assert!(is_printer_name(Some("MTP-II Thermal")));
        assert!(is_printer_name(Some("BlueTooth Printer")));
        assert!(is_printer_name(Some("mini pos printer")));
        assert!(!is_printer_name(Some("Fitness Band")));
        assert!(!is_printer_name(Some("")));
        assert!(!is_printer_name(None));
    }

    #[test]
    fn test_outcome_from_devices() {
        assert_eq!(ScanOutcome::from_devices(vec![]), ScanOutcome::NotFound);
        let device = PrinterDevice::new("AA", Some("POS".into()), TransportKind::Ble);
        assert_eq!(
            ScanOutcome::from_devices(vec![device.clone()]),
            ScanOutcome::Found(vec![device])
        );
    }
}
