//! Printer service - the configuration screen and order flow entry point
//!
//! Ties the registry to discovery, connections and dispatch: scan, save a
//! printer with its role, pick the default, test-print, remove, and route
//! order documents to the right printer.

use std::sync::Arc;

use chrono::Utc;
use shared::models::{ConfiguredPrinter, Order, PrinterDevice, PrinterRole, Settings, TransportKind};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::config::PrinterConfig;
use crate::connection::{Connection, ConnectionManager};
use crate::discovery::{Discovery, ScanOutcome};
use crate::dispatcher::{PrintDispatcher, PrintOutcome};
use crate::error::PrintError;
use crate::formatter::{DocumentKind, ReceiptFormatter};
use crate::registry::{PrinterRegistry, RegistryError};
use crate::transport::Transports;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Print(#[from] PrintError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServiceError {
    /// Message for the configuration screen / toast
    pub fn user_message(&self) -> String {
        match self {
            ServiceError::Print(e) => e.user_message(),
            ServiceError::Registry(RegistryError::PrinterNotFound(_)) => {
                "That printer is no longer configured.".to_string()
            }
            ServiceError::Registry(_) | ServiceError::Io(_) => {
                "Printer settings could not be saved or loaded.".to_string()
            }
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

pub struct PrinterService {
    registry: PrinterRegistry,
    discovery: Discovery,
    connections: Arc<ConnectionManager>,
    dispatcher: PrintDispatcher,
}

impl PrinterService {
    pub fn new(config: &PrinterConfig, transports: Transports, registry: PrinterRegistry) -> Self {
        let connections = Arc::new(ConnectionManager::new(
            transports.clone(),
            config.connect_timeout,
            config.transmit_timeout,
        ));
        let formatter = ReceiptFormatter::new(config.paper_width, config.encoding);

        Self {
            registry,
            discovery: Discovery::new(transports, config.ble_scan_timeout),
            dispatcher: PrintDispatcher::new(connections.clone(), formatter),
            connections,
        }
    }

    /// Open the registry under the data directory with this platform's transports
    pub fn open(config: &PrinterConfig) -> ServiceResult<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        let registry = PrinterRegistry::open(config.registry_path())?;
        info!(path = %config.registry_path().display(), "Printer registry opened");
        Ok(Self::new(config, Transports::detect(config), registry))
    }

    pub fn registry(&self) -> &PrinterRegistry {
        &self.registry
    }

    pub fn connections(&self) -> &ConnectionManager {
        &self.connections
    }

    /// Scan one transport; BLE results also stream through `on_found`
    pub async fn scan<F>(&self, transport: TransportKind, on_found: F) -> ServiceResult<ScanOutcome>
    where
        F: FnMut(&PrinterDevice) + Send,
    {
        Ok(self.discovery.scan(transport, on_found).await?)
    }

    /// Configured printers, in registry order
    pub fn printers(&self) -> ServiceResult<Vec<ConfiguredPrinter>> {
        Ok(self.registry.list()?)
    }

    /// Save a discovered device with its role
    ///
    /// Reconfiguring a known printer keeps its last connection time.
    pub fn configure(
        &self,
        device: PrinterDevice,
        role: PrinterRole,
        is_default: bool,
    ) -> ServiceResult<ConfiguredPrinter> {
        let mut printer = ConfiguredPrinter::from_device(device, role, is_default);
        if let Some(existing) = self.registry.get(&printer.id)? {
            printer.last_connected_at = existing.last_connected_at;
        }
        self.registry.upsert(printer.clone())?;
        Ok(printer)
    }

    pub fn set_default(&self, id: &str) -> ServiceResult<()> {
        Ok(self.registry.set_default(id)?)
    }

    /// Forget a printer and drop its live connection
    pub async fn remove(&self, id: &str) -> ServiceResult<Option<ConfiguredPrinter>> {
        self.connections.disconnect(id).await;
        Ok(self.registry.remove(id)?)
    }

    /// Connect a configured printer ahead of printing
    pub async fn connect(&self, id: &str) -> ServiceResult<Connection> {
        let printer = self.configured(id)?;
        let connection = self.connections.connect(&printer.device()).await?;
        self.record_connected(id);
        Ok(connection)
    }

    pub async fn disconnect(&self, id: &str) {
        self.connections.disconnect(id).await;
    }

    /// Print the test page on a configured printer
    #[instrument(skip(self))]
    pub async fn test_print(&self, id: &str) -> ServiceResult<PrintOutcome> {
        let printer = self.configured(id)?;
        let outcome = self.dispatcher.print_test_page(&printer).await?;
        self.after_print(&outcome);
        Ok(outcome)
    }

    /// Print `kind` for `order` on the printer serving that document
    #[instrument(skip(self, order, settings), fields(kind = %kind))]
    pub async fn print_order(
        &self,
        kind: DocumentKind,
        order: &Order,
        settings: Option<&Settings>,
    ) -> ServiceResult<PrintOutcome> {
        let role = kind.role();
        let printer = self
            .registry
            .resolve(role)?
            .ok_or(PrintError::NoPrinterConfigured(role))?;

        let outcome = self.dispatcher.print(kind, order, &printer, settings).await?;
        self.after_print(&outcome);
        Ok(outcome)
    }

    /// Close all live connections
    pub async fn shutdown(&self) {
        self.connections.disconnect_all().await;
        info!("Printer service stopped");
    }

    fn configured(&self, id: &str) -> ServiceResult<ConfiguredPrinter> {
        self.registry
            .get(id)?
            .ok_or_else(|| RegistryError::PrinterNotFound(id.to_string()).into())
    }

    fn after_print(&self, outcome: &PrintOutcome) {
        if outcome.connected_now {
            self.record_connected(&outcome.device_id);
        }
    }

    /// Failing to stamp the time never fails the print
    fn record_connected(&self, id: &str) {
        if let Err(e) = self.registry.touch_connected(id, Utc::now()) {
            warn!(printer_id = %id, error = %e, "Failed to record connection time");
        }
    }
}
