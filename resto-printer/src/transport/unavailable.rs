use async_trait::async_trait;
use shared::models::{PrinterDevice, TransportKind};
use tokio::sync::mpsc;

use super::{DiscoveredDevice, Transport};
use crate::error::{PrintError, PrintResult};

/// Transport for a stack that does not exist here
///
/// Every operation fails with [`PrintError::Unavailable`].
#[derive(Debug, Clone)]
pub struct UnavailableTransport {
    kind: TransportKind,
    reason: String,
}

impl UnavailableTransport {
    pub fn new(kind: TransportKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }

    fn fail<T>(&self) -> PrintResult<T> {
        Err(PrintError::Unavailable(self.reason.clone()))
    }
}

#[async_trait]
impl Transport for UnavailableTransport {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    async fn check_ready(&self) -> PrintResult<()> {
        self.fail()
    }

    async fn scan(&self, _found: mpsc::Sender<DiscoveredDevice>) -> PrintResult<()> {
        self.fail()
    }

    async fn stop_scan(&self) -> PrintResult<()> {
        Ok(())
    }

    async fn connect(&self, _device: &PrinterDevice) -> PrintResult<()> {
        self.fail()
    }

    async fn disconnect(&self, _device_id: &str) -> PrintResult<()> {
        Ok(())
    }

    async fn transmit(&self, _device_id: &str, _data: &[u8]) -> PrintResult<()> {
        self.fail()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_everything_unavailable() {
        let t = UnavailableTransport::new(TransportKind::Ble, "no radio");
        let device = PrinterDevice::new("AA", Some("POS-58".into()), TransportKind::Ble);

        assert!(matches!(t.check_ready().await, Err(PrintError::Unavailable(r)) if r == "no radio"));
        assert!(matches!(t.connect(&device).await, Err(PrintError::Unavailable(_))));
        assert!(matches!(t.transmit("AA", b"x").await, Err(PrintError::Unavailable(_))));
        assert!(t.stop_scan().await.is_ok());
    }
}
