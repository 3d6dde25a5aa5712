//! Print dispatcher
//!
//! Runs one print job end to end: make sure the printer is connected, format
//! the document, encode it and transmit it. A failed connect aborts the job
//! before anything is formatted.

use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use shared::models::{ConfiguredPrinter, Order, Settings};
use tracing::{info, instrument};

use crate::connection::ConnectionManager;
use crate::error::PrintResult;
use crate::formatter::{DocumentKind, ReceiptFormatter};
use crate::stream::CommandStream;

/// What a finished job did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintOutcome {
    pub device_id: String,
    /// Bytes sent to the printer
    pub bytes: usize,
    /// Whether the job had to open the connection itself
    pub connected_now: bool,
}

pub struct PrintDispatcher {
    connections: Arc<ConnectionManager>,
    formatter: ReceiptFormatter,
}

impl PrintDispatcher {
    pub fn new(connections: Arc<ConnectionManager>, formatter: ReceiptFormatter) -> Self {
        Self {
            connections,
            formatter,
        }
    }

    pub fn formatter(&self) -> &ReceiptFormatter {
        &self.formatter
    }

    /// Print `kind` for `order` on `printer`, stamped with the local time
    ///
    /// `settings` is only read for bills; `None` uses the defaults.
    pub async fn print(
        &self,
        kind: DocumentKind,
        order: &Order,
        printer: &ConfiguredPrinter,
        settings: Option<&Settings>,
    ) -> PrintResult<PrintOutcome> {
        self.print_at(kind, order, printer, settings, now()).await
    }

    /// [`print`](Self::print) with an explicit print time
    #[instrument(skip_all, fields(kind = %kind, printer_id = %printer.id))]
    pub async fn print_at(
        &self,
        kind: DocumentKind,
        order: &Order,
        printer: &ConfiguredPrinter,
        settings: Option<&Settings>,
        printed_at: NaiveDateTime,
    ) -> PrintResult<PrintOutcome> {
        let connected_now = self.ensure_connected(printer).await?;

        let defaults = Settings::default();
        let settings = settings.unwrap_or(&defaults);
        let stream = self.formatter.format(kind, order, settings, printed_at);

        self.send(printer, &stream, connected_now).await
    }

    /// Print the fixed test page on `printer`
    #[instrument(skip_all, fields(printer_id = %printer.id))]
    pub async fn print_test_page(&self, printer: &ConfiguredPrinter) -> PrintResult<PrintOutcome> {
        let connected_now = self.ensure_connected(printer).await?;
        let stream = self.formatter.format_test_page(printer, now());
        self.send(printer, &stream, connected_now).await
    }

    /// Connect when needed; `true` if this call opened the link
    async fn ensure_connected(&self, printer: &ConfiguredPrinter) -> PrintResult<bool> {
        if self.connections.is_connected(&printer.id) {
            return Ok(false);
        }
        self.connections.connect(&printer.device()).await?;
        Ok(true)
    }

    async fn send(
        &self,
        printer: &ConfiguredPrinter,
        stream: &CommandStream,
        connected_now: bool,
    ) -> PrintResult<PrintOutcome> {
        let data = stream.encode();
        self.connections.transmit(&printer.id, &data).await?;

        info!(bytes = data.len(), "Print job sent");
        Ok(PrintOutcome {
            device_id: printer.id.clone(),
            bytes: data.len(),
            connected_now,
        })
    }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PrintError;
    use crate::formatter::fixtures::{paneer_order, printed_at};
    use crate::transport::{MockTransport, Transports};
    use shared::models::{PrinterDevice, PrinterRole, TransportKind};
    use std::time::Duration;

    fn setup(ble: MockTransport) -> (PrintDispatcher, Arc<MockTransport>, Arc<ConnectionManager>) {
        let ble = Arc::new(ble);
        let connections = Arc::new(ConnectionManager::new(
            Transports::new(Arc::new(MockTransport::classic()), ble.clone()),
            Duration::from_secs(15),
            Duration::from_secs(15),
        ));
        let dispatcher = PrintDispatcher::new(connections.clone(), ReceiptFormatter::default());
        (dispatcher, ble, connections)
    }

    fn printer(id: &str) -> ConfiguredPrinter {
        ConfiguredPrinter::from_device(
            PrinterDevice::new(id, Some("POS-58".into()), TransportKind::Ble),
            PrinterRole::Both,
            true,
        )
    }

    #[tokio::test]
    async fn test_print_connects_then_sends_encoded_stream() {
        let (dispatcher, ble, _) = setup(MockTransport::ble());
        let order = paneer_order();

        let outcome = dispatcher
            .print_at(DocumentKind::Kot, &order, &printer("B1"), None, printed_at())
            .await
            .unwrap();

        let expected = dispatcher.formatter().format_kot(&order, printed_at()).encode();
        assert!(outcome.connected_now);
        assert_eq!(outcome.bytes, expected.len());
        assert_eq!(ble.transmitted(), vec![("B1".to_string(), expected)]);
    }

    #[tokio::test]
    async fn test_print_reuses_connection() {
        let (dispatcher, ble, _) = setup(MockTransport::ble());
        let order = paneer_order();
        let p = printer("B1");

        dispatcher.print_at(DocumentKind::Kot, &order, &p, None, printed_at()).await.unwrap();
        let second = dispatcher
            .print_at(DocumentKind::Bill, &order, &p, None, printed_at())
            .await
            .unwrap();

        assert!(!second.connected_now);
        assert_eq!(ble.connect_calls().len(), 1);
        assert_eq!(ble.transmitted().len(), 2);
    }

    #[tokio::test]
    async fn test_connect_failure_aborts_before_transmit() {
        let (dispatcher, ble, connections) = setup(MockTransport::ble().fail_connect("B1"));

        let err = dispatcher
            .print_at(DocumentKind::Bill, &paneer_order(), &printer("B1"), None, printed_at())
            .await
            .unwrap_err();

        assert!(matches!(err, PrintError::ConnectionFailed { .. }));
        assert!(ble.transmitted().is_empty());
        assert!(!connections.is_connected("B1"));
    }

    #[tokio::test]
    async fn test_transmit_failure_reports_and_disconnects() {
        let (dispatcher, _, connections) = setup(MockTransport::ble().fail_transmit("B1"));

        let err = dispatcher
            .print_at(DocumentKind::Kot, &paneer_order(), &printer("B1"), None, printed_at())
            .await
            .unwrap_err();

        assert!(matches!(err, PrintError::TransmitFailed { .. }));
        assert!(!connections.is_connected("B1"));
    }

    #[tokio::test]
    async fn test_test_page() {
        let (dispatcher, ble, _) = setup(MockTransport::ble());

        let outcome = dispatcher.print_test_page(&printer("B1")).await.unwrap();
        assert!(outcome.bytes > 0);
        assert_eq!(ble.transmitted().len(), 1);
    }
}
