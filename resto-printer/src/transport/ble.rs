//! Bluetooth Low Energy transport (btleplug)
//!
//! The platform manager and first adapter are created lazily on first use and
//! then held for the life of the process. Peripherals seen during the latest
//! scan are cached so a later connect does not need to rescan.
//!
//! A connect only completes after service discovery found a characteristic
//! that accepts writes; print data is sent to it in `chunk_size` pieces.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{
    Central, CentralEvent, CentralState, CharPropFlags, Characteristic, Manager as _,
    Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::StreamExt;
use shared::models::{PrinterDevice, TransportKind};
use tokio::sync::{mpsc, Mutex, OnceCell};
use tracing::{debug, info, instrument, warn};

use super::{DiscoveredDevice, Transport};
use crate::error::{PrintError, PrintResult};

/// Pause between write chunks so the printer buffer keeps up
const CHUNK_DELAY: Duration = Duration::from_millis(20);

/// Process-wide radio handle
struct Radio {
    _manager: Manager,
    adapter: Adapter,
}

/// Open GATT link to a printer
#[derive(Clone)]
struct Link {
    peripheral: Peripheral,
    characteristic: Characteristic,
    write_type: WriteType,
}

pub struct BleTransport {
    chunk_size: usize,
    radio: OnceCell<Radio>,
    seen: Mutex<HashMap<String, Peripheral>>,
    links: Mutex<HashMap<String, Link>>,
}

impl BleTransport {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            radio: OnceCell::new(),
            seen: Mutex::new(HashMap::new()),
            links: Mutex::new(HashMap::new()),
        }
    }

    async fn adapter(&self) -> PrintResult<&Adapter> {
        let radio = self
            .radio
            .get_or_try_init(|| async {
                let manager = Manager::new().await.map_err(radio_error)?;
                let adapter = manager
                    .adapters()
                    .await
                    .map_err(radio_error)?
                    .into_iter()
                    .next()
                    .ok_or_else(|| PrintError::Unavailable("no BLE adapter found".to_string()))?;
                info!("BLE adapter initialised");
                Ok::<_, PrintError>(Radio {
                    _manager: manager,
                    adapter,
                })
            })
            .await?;
        Ok(&radio.adapter)
    }

    /// Cached peripheral for `id`, else look it up among known peripherals
    async fn peripheral(&self, id: &str) -> PrintResult<Peripheral> {
        if let Some(p) = self.seen.lock().await.get(id) {
            return Ok(p.clone());
        }

        let adapter = self.adapter().await?;
        for p in adapter.peripherals().await.map_err(radio_error)? {
            if peripheral_key(&p).await == id {
                self.seen.lock().await.insert(id.to_string(), p.clone());
                return Ok(p);
            }
        }
        Err(PrintError::connection(id, "device not found; scan again"))
    }
}

#[async_trait]
impl Transport for BleTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Ble
    }

    async fn check_ready(&self) -> PrintResult<()> {
        let adapter = self.adapter().await?;
        match adapter.adapter_state().await.map_err(radio_error)? {
            CentralState::PoweredOff => Err(PrintError::RadioOff),
            _ => Ok(()),
        }
    }

    #[instrument(skip(self, found))]
    async fn scan(&self, found: mpsc::Sender<DiscoveredDevice>) -> PrintResult<()> {
        let adapter = self.adapter().await?;
        // A fresh scan supersedes earlier results
        self.seen.lock().await.clear();
        let mut events = adapter.events().await.map_err(radio_error)?;
        adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(radio_error)?;
        info!("BLE scan started");

        while let Some(event) = events.next().await {
            let id = match event {
                CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => id,
                _ => continue,
            };
            let Ok(peripheral) = adapter.peripheral(&id).await else {
                continue;
            };
            let name = match peripheral.properties().await {
                Ok(Some(props)) => props.local_name,
                _ => None,
            };

            let key = peripheral_key(&peripheral).await;
            self.seen.lock().await.insert(key.clone(), peripheral);
            if found.send(DiscoveredDevice { id: key, name }).await.is_err() {
                break;
            }
        }
        Ok(())
    }

    async fn stop_scan(&self) -> PrintResult<()> {
        // Nothing to stop if the radio never came up
        let Some(radio) = self.radio.get() else {
            return Ok(());
        };
        radio.adapter.stop_scan().await.map_err(radio_error)?;
        debug!("BLE scan stopped");
        Ok(())
    }

    #[instrument(skip(self, device), fields(device_id = %device.id))]
    async fn connect(&self, device: &PrinterDevice) -> PrintResult<()> {
        let peripheral = self.peripheral(&device.id).await?;

        if !peripheral.is_connected().await.unwrap_or(false) {
            peripheral
                .connect()
                .await
                .map_err(|e| link_error(&device.id, e))?;
        }
        peripheral
            .discover_services()
            .await
            .map_err(|e| link_error(&device.id, e))?;

        let Some(characteristic) = writable_characteristic(&peripheral) else {
            if let Err(e) = peripheral.disconnect().await {
                warn!(error = %e, "Disconnect after failed discovery");
            }
            return Err(PrintError::connection(
                &device.id,
                "no writable characteristic",
            ));
        };
        let write_type = if characteristic
            .properties
            .contains(CharPropFlags::WRITE_WITHOUT_RESPONSE)
        {
            WriteType::WithoutResponse
        } else {
            WriteType::WithResponse
        };

        info!(characteristic = %characteristic.uuid, ?write_type, "BLE link ready");
        self.links.lock().await.insert(
            device.id.clone(),
            Link {
                peripheral,
                characteristic,
                write_type,
            },
        );
        Ok(())
    }

    async fn disconnect(&self, device_id: &str) -> PrintResult<()> {
        let link = self.links.lock().await.remove(device_id);
        let peripheral = match link {
            Some(link) => link.peripheral,
            // A connect abandoned mid-flight may still have opened a GATT link
            None => {
                let Some(p) = self.seen.lock().await.get(device_id).cloned() else {
                    return Ok(());
                };
                if !p.is_connected().await.unwrap_or(false) {
                    return Ok(());
                }
                debug!(device_id, "Closing link left by an unfinished connect");
                p
            }
        };
        peripheral
            .disconnect()
            .await
            .map_err(|e| link_error(device_id, e))
    }

    #[instrument(skip(self, data), fields(data_len = data.len()))]
    async fn transmit(&self, device_id: &str, data: &[u8]) -> PrintResult<()> {
        let link = self
            .links
            .lock()
            .await
            .get(device_id)
            .cloned()
            .ok_or_else(|| PrintError::NotConnected(device_id.to_string()))?;

        for chunk in data.chunks(self.chunk_size) {
            link.peripheral
                .write(&link.characteristic, chunk, link.write_type)
                .await
                .map_err(|e| PrintError::transmit(device_id, e))?;
            tokio::time::sleep(CHUNK_DELAY).await;
        }

        debug!(chunks = data.len().div_ceil(self.chunk_size), "Data sent");
        Ok(())
    }
}

/// Stable id: the address where the platform exposes one, else the platform id
async fn peripheral_key(peripheral: &Peripheral) -> String {
    match peripheral.properties().await {
        Ok(Some(props)) if props.address.into_inner() != [0u8; 6] => props.address.to_string(),
        _ => peripheral.id().to_string(),
    }
}

/// First characteristic accepting writes, unacknowledged writes preferred
fn writable_characteristic(peripheral: &Peripheral) -> Option<Characteristic> {
    let chars = peripheral.characteristics();
    chars
        .iter()
        .find(|c| c.properties.contains(CharPropFlags::WRITE_WITHOUT_RESPONSE))
        .or_else(|| {
            chars
                .iter()
                .find(|c| c.properties.contains(CharPropFlags::WRITE))
        })
        .cloned()
}

/// Adapter-level failures
fn radio_error(e: btleplug::Error) -> PrintError {
    match e {
        btleplug::Error::PermissionDenied => {
            PrintError::PermissionDenied("Bluetooth access not granted".to_string())
        }
        other => PrintError::Unavailable(other.to_string()),
    }
}

/// Peripheral-level failures
fn link_error(device_id: &str, e: btleplug::Error) -> PrintError {
    match e {
        btleplug::Error::PermissionDenied => {
            PrintError::PermissionDenied("Bluetooth access not granted".to_string())
        }
        other => PrintError::connection(device_id, other),
    }
}
