//! Printer Models
//!
//! `PrinterDevice` is a transient discovery result; `ConfiguredPrinter` is the
//! persisted registry entry built from it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bluetooth transport a printer is reached over
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// Classic Bluetooth serial profile (requires OS-level pairing)
    Classic,
    /// Bluetooth Low Energy (advertisement + GATT)
    #[serde(rename = "BLE")]
    Ble,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Classic => write!(f, "Classic"),
            TransportKind::Ble => write!(f, "BLE"),
        }
    }
}

/// Which documents a printer receives
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum PrinterRole {
    /// Kitchen order tickets only
    #[serde(rename = "KOT")]
    Kot,
    /// Customer bills only
    Bill,
    #[default]
    Both,
}

impl PrinterRole {
    /// Whether a printer with this role should receive documents for `wanted`
    pub fn serves(self, wanted: PrinterRole) -> bool {
        self == PrinterRole::Both || wanted == PrinterRole::Both || self == wanted
    }
}

impl fmt::Display for PrinterRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrinterRole::Kot => write!(f, "KOT"),
            PrinterRole::Bill => write!(f, "Bill"),
            PrinterRole::Both => write!(f, "Both"),
        }
    }
}

/// Printer found by a scan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PrinterDevice {
    /// Bluetooth address or platform handle, unique per scan
    pub id: String,
    pub name: Option<String>,
    pub transport: TransportKind,
}

impl PrinterDevice {
    pub fn new(id: impl Into<String>, name: Option<String>, transport: TransportKind) -> Self {
        Self {
            id: id.into(),
            name,
            transport,
        }
    }

    /// Name for display, falling back to the id
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// Persisted printer configuration entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfiguredPrinter {
    pub id: String,
    pub name: Option<String>,
    pub transport: TransportKind,
    #[serde(default)]
    pub role: PrinterRole,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub last_connected_at: Option<DateTime<Utc>>,
}

impl ConfiguredPrinter {
    pub fn from_device(device: PrinterDevice, role: PrinterRole, is_default: bool) -> Self {
        Self {
            id: device.id,
            name: device.name,
            transport: device.transport,
            role,
            is_default,
            last_connected_at: None,
        }
    }

    /// The device part of this entry
    pub fn device(&self) -> PrinterDevice {
        PrinterDevice {
            id: self.id.clone(),
            name: self.name.clone(),
            transport: self.transport,
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}
