//! Connection manager
//!
//! Tracks live printer links keyed by device id. At most one connection exists
//! per device; stacks that allow a single link (Classic SPP) have any other
//! link on the same stack closed before a new one opens. A transport error
//! while transmitting destroys the connection.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use shared::models::{PrinterDevice, TransportKind};
use tracing::{info, instrument, warn};

use crate::error::{PrintError, PrintResult};
use crate::transport::Transports;

/// Live link to a printer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub device_id: String,
    pub transport: TransportKind,
    pub connected_at: DateTime<Utc>,
}

pub struct ConnectionManager {
    transports: Transports,
    connections: Mutex<HashMap<String, Connection>>,
    connect_timeout: Duration,
    transmit_timeout: Duration,
}

impl ConnectionManager {
    pub fn new(transports: Transports, connect_timeout: Duration, transmit_timeout: Duration) -> Self {
        Self {
            transports,
            connections: Mutex::new(HashMap::new()),
            connect_timeout,
            transmit_timeout,
        }
    }

    /// Open a link to `device`, reusing an existing one
    #[instrument(skip(self, device), fields(device_id = %device.id, transport = %device.transport))]
    pub async fn connect(&self, device: &PrinterDevice) -> PrintResult<Connection> {
        if let Some(existing) = self.get_connection(&device.id) {
            return Ok(existing);
        }

        let transport = self.transports.get(device.transport);
        if transport.is_exclusive() {
            for other in self.ids_on(device.transport) {
                info!(other = %other, "Closing link to free the single slot");
                self.disconnect(&other).await;
            }
        }

        match tokio::time::timeout(self.connect_timeout, transport.connect(device)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(error = %e, "Connect failed");
                return Err(e);
            }
            Err(_) => {
                warn!(timeout = ?self.connect_timeout, "Connect timed out");
                // The link may still come up late; make sure it does not linger
                if let Err(e) = transport.disconnect(&device.id).await {
                    warn!(error = %e, "Cleanup after timeout failed");
                }
                return Err(PrintError::connection(
                    &device.id,
                    format!("timed out after {}s", self.connect_timeout.as_secs()),
                ));
            }
        }

        let connection = Connection {
            device_id: device.id.clone(),
            transport: device.transport,
            connected_at: Utc::now(),
        };
        self.lock().insert(device.id.clone(), connection.clone());
        info!("Printer connected");
        Ok(connection)
    }

    /// Close the link to `device_id`; a no-op when not connected
    pub async fn disconnect(&self, device_id: &str) {
        let Some(connection) = self.lock().remove(device_id) else {
            return;
        };
        let transport = self.transports.get(connection.transport);
        match transport.disconnect(device_id).await {
            Ok(()) => info!(device_id, "Printer disconnected"),
            Err(e) => warn!(device_id, error = %e, "Disconnect reported an error"),
        }
    }

    pub fn is_connected(&self, device_id: &str) -> bool {
        self.lock().contains_key(device_id)
    }

    pub fn get_connection(&self, device_id: &str) -> Option<Connection> {
        self.lock().get(device_id).cloned()
    }

    /// All live connections
    pub fn connections(&self) -> Vec<Connection> {
        self.lock().values().cloned().collect()
    }

    /// Send bytes over the live link to `device_id`
    ///
    /// On any failure the connection is discarded so the next job reconnects.
    #[instrument(skip(self, data), fields(data_len = data.len()))]
    pub async fn transmit(&self, device_id: &str, data: &[u8]) -> PrintResult<()> {
        let connection = self
            .get_connection(device_id)
            .ok_or_else(|| PrintError::NotConnected(device_id.to_string()))?;
        let transport = self.transports.get(connection.transport);

        let error = match tokio::time::timeout(self.transmit_timeout, transport.transmit(device_id, data)).await {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(PrintError::NotConnected(_))) => {
                PrintError::transmit(device_id, "link lost")
            }
            Ok(Err(e)) => e,
            Err(_) => PrintError::transmit(
                device_id,
                format!("timed out after {}s", self.transmit_timeout.as_secs()),
            ),
        };

        warn!(error = %error, "Transmit failed, dropping connection");
        self.disconnect(device_id).await;
        Err(error)
    }

    /// Close every link
    pub async fn disconnect_all(&self) {
        let ids: Vec<String> = self.lock().keys().cloned().collect();
        for id in ids {
            self.disconnect(&id).await;
        }
    }

    fn ids_on(&self, kind: TransportKind) -> Vec<String> {
        self.lock()
            .values()
            .filter(|c| c.transport == kind)
            .map(|c| c.device_id.clone())
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Connection>> {
        self.connections.lock().unwrap_or_else(|e| e.into_inner())
    }
}
