//! Error types for the printer subsystem

use shared::models::PrinterRole;
use thiserror::Error;

/// Printer error types
///
/// Discovery and connection failures keep their specific cause so callers can
/// tell "cannot scan" from "never connected" from "connected, then failed".
#[derive(Debug, Error)]
pub enum PrintError {
    /// Bluetooth hardware or support is absent on this platform/build
    #[error("Bluetooth unavailable: {0}")]
    Unavailable(String),

    /// Bluetooth or location permission not granted
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Bluetooth adapter is switched off
    #[error("Bluetooth is turned off")]
    RadioOff,

    /// Link or handshake to the printer failed
    #[error("Connection to {device_id} failed: {reason}")]
    ConnectionFailed { device_id: String, reason: String },

    /// Link was live but the job failed on the wire
    #[error("Transmit to {device_id} failed: {reason}")]
    TransmitFailed { device_id: String, reason: String },

    /// No live connection for the device
    #[error("Printer not connected: {0}")]
    NotConnected(String),

    /// No registered printer serves the requested role
    #[error("No printer configured for {0}")]
    NoPrinterConfigured(PrinterRole),
}

impl PrintError {
    pub fn connection(device_id: &str, reason: impl ToString) -> Self {
        PrintError::ConnectionFailed {
            device_id: device_id.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn transmit(device_id: &str, reason: impl ToString) -> Self {
        PrintError::TransmitFailed {
            device_id: device_id.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether a user action (retry, grant, enable) can recover
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PrintError::PermissionDenied(_)
                | PrintError::RadioOff
                | PrintError::ConnectionFailed { .. }
                | PrintError::TransmitFailed { .. }
                | PrintError::NotConnected(_)
        )
    }

    /// Message for the configuration screen / toast
    pub fn user_message(&self) -> String {
        match self {
            PrintError::Unavailable(_) => {
                "Bluetooth printing is not available on this device.".to_string()
            }
            PrintError::PermissionDenied(_) => {
                "Bluetooth permission is required. Grant it in system settings and try again."
                    .to_string()
            }
            PrintError::RadioOff => "Bluetooth is off. Turn it on and try again.".to_string(),
            PrintError::ConnectionFailed { .. } => {
                "Could not connect to the printer. Check that it is on and in range, then retry."
                    .to_string()
            }
            PrintError::TransmitFailed { .. } => {
                "The printer disconnected while printing. Check paper and power, then retry."
                    .to_string()
            }
            PrintError::NotConnected(_) => "The printer is not connected.".to_string(),
            PrintError::NoPrinterConfigured(role) => {
                format!("No {} printer is configured. Add one in printer settings.", role)
            }
        }
    }
}

/// Result type for printer operations
pub type PrintResult<T> = Result<T, PrintError>;
