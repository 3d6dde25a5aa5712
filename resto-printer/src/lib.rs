//! # resto-printer
//!
//! Bluetooth thermal printing for the restaurant POS.
//!
//! ## Scope
//!
//! - Printer discovery over Classic Bluetooth (paired devices) and BLE
//!   (advertisement scan)
//! - Connection management, one live link per printer
//! - Kitchen order tickets, customer bills and test pages as ESC/POS
//! - Role-based routing through a persistent printer registry
//!
//! Order/menu/settings CRUD stays in the backend; this crate only reads the
//! [`Order`](shared::models::Order) and [`Settings`](shared::models::Settings)
//! it is handed.
//!
//! ## Example
//!
//! ```ignore
//! use resto_printer::{DocumentKind, PrinterConfig, PrinterService};
//! use shared::models::{Order, OrderItem, PrinterRole, TransportKind};
//!
//! let config = PrinterConfig::from_env();
//! let service = PrinterService::open(&config)?;
//!
//! // Configuration screen
//! let outcome = service.scan(TransportKind::Ble, |d| println!("{}", d.display_name())).await?;
//! if let Some(device) = outcome.devices().first() {
//!     service.configure(device.clone(), PrinterRole::Both, true)?;
//! }
//!
//! // Order flow
//! let order = Order::dine_in(5, vec![OrderItem::new("Paneer Tikka", 2, 180.0)]);
//! service.print_order(DocumentKind::Kot, &order, None).await?;
//! ```

pub mod config;
pub mod connection;
pub mod discovery;
pub mod dispatcher;
pub mod encoding;
pub mod error;
pub mod escpos;
pub mod formatter;
pub mod logger;
pub mod registry;
pub mod service;
pub mod stream;
pub mod transport;

// Re-exports
pub use config::PrinterConfig;
pub use connection::{Connection, ConnectionManager};
pub use discovery::{is_printer_name, Discovery, ScanOutcome, DEFAULT_BLE_SCAN_TIMEOUT};
pub use dispatcher::{PrintDispatcher, PrintOutcome};
pub use encoding::TextEncoding;
pub use error::{PrintError, PrintResult};
pub use escpos::EscPosBuilder;
pub use formatter::{format_bill, format_kot, format_test_page, DocumentKind, ReceiptFormatter};
pub use registry::{PrinterRegistry, RegistryError, RegistryResult};
pub use service::{PrinterService, ServiceError, ServiceResult};
pub use stream::{Alignment, Command, CommandStream, TextSize};
pub use transport::{DiscoveredDevice, Transport, Transports};
