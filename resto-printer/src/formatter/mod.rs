//! Receipt formatter
//!
//! Turns orders into [`CommandStream`]s. Every function here is pure: the same
//! order, settings and print time always produce the same stream. The print
//! time is passed in by the caller.

mod bill;
mod kot;
mod test_page;

use chrono::NaiveDateTime;
use shared::models::{ConfiguredPrinter, Order, PrinterRole, Settings};

use crate::encoding::TextEncoding;
use crate::stream::{CommandStream, DEFAULT_WIDTH};

/// Application name printed on test pages
pub const APP_NAME: &str = "RestoPOS";

/// Kind of document a print job carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    /// Kitchen order ticket
    Kot,
    Bill,
}

impl DocumentKind {
    /// Printer role that receives this document
    pub fn role(self) -> PrinterRole {
        match self {
            DocumentKind::Kot => PrinterRole::Kot,
            DocumentKind::Bill => PrinterRole::Bill,
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentKind::Kot => write!(f, "KOT"),
            DocumentKind::Bill => write!(f, "Bill"),
        }
    }
}

/// Receipt formatter for a given paper width and text encoding
///
/// Common widths:
/// - 58mm paper: 32 characters (most BLE printers)
/// - 80mm paper: 32 characters in the large font, 48 in the small one
#[derive(Debug, Clone, Copy)]
pub struct ReceiptFormatter {
    width: usize,
    encoding: TextEncoding,
}

impl ReceiptFormatter {
    pub fn new(width: usize, encoding: TextEncoding) -> Self {
        Self { width, encoding }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Kitchen order ticket: items, notes and table/token, no prices
    pub fn format_kot(&self, order: &Order, printed_at: NaiveDateTime) -> CommandStream {
        kot::render(self.stream(), order, printed_at)
    }

    /// Customer bill with item table and totals
    pub fn format_bill(
        &self,
        order: &Order,
        settings: &Settings,
        printed_at: NaiveDateTime,
    ) -> CommandStream {
        bill::render(self.stream(), order, settings, printed_at)
    }

    /// Fixed test page describing the printer
    pub fn format_test_page(
        &self,
        printer: &ConfiguredPrinter,
        printed_at: NaiveDateTime,
    ) -> CommandStream {
        test_page::render(self.stream(), printer, printed_at)
    }

    /// Format `kind` for `order`; settings are only read for bills
    pub fn format(
        &self,
        kind: DocumentKind,
        order: &Order,
        settings: &Settings,
        printed_at: NaiveDateTime,
    ) -> CommandStream {
        match kind {
            DocumentKind::Kot => self.format_kot(order, printed_at),
            DocumentKind::Bill => self.format_bill(order, settings, printed_at),
        }
    }

    fn stream(&self) -> CommandStream {
        CommandStream::with_encoding(self.width, self.encoding)
    }
}

impl Default for ReceiptFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, TextEncoding::Utf8)
    }
}

/// Common header: centered bold title over a '=' separator, then left align
fn header(s: &mut CommandStream, title: &str) {
    s.center();
    s.bold();
    s.line(title);
    s.bold_off();
    s.sep_double();
    s.left();
}

/// Trailing feed and full cut
fn footer(s: &mut CommandStream) {
    s.feed(3);
    s.cut();
}

/// Currency amount with exactly two decimals
fn money(currency: &str, amount: f64) -> String {
    assert!(amount.is_finite(), "money amount must be finite, got {amount}");
    format!("{}{:.2}", currency, amount)
}

/// Convenience: format a KOT with the default 32-column UTF-8 layout
pub fn format_kot(order: &Order, printed_at: NaiveDateTime) -> CommandStream {
    ReceiptFormatter::default().format_kot(order, printed_at)
}

/// Convenience: format a bill with the default 32-column UTF-8 layout
pub fn format_bill(order: &Order, settings: &Settings, printed_at: NaiveDateTime) -> CommandStream {
    ReceiptFormatter::default().format_bill(order, settings, printed_at)
}

/// Convenience: format a test page with the default 32-column UTF-8 layout
pub fn format_test_page(printer: &ConfiguredPrinter, printed_at: NaiveDateTime) -> CommandStream {
    ReceiptFormatter::default().format_test_page(printer, printed_at)
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::stream::Command;

    #[test]
    fn test_streams_start_with_init_and_end_with_cut() {
        let order = paneer_order();
        let f = ReceiptFormatter::default();

        for stream in [
            f.format_kot(&order, printed_at()),
            f.format_bill(&order, &Settings::default(), printed_at()),
        ] {
            assert_eq!(stream.commands().first(), Some(&Command::Init));
            assert_eq!(stream.commands().last(), Some(&Command::Cut));
        }
    }

    #[test]
    fn test_header_layout() {
        let stream = format_kot(&paneer_order(), printed_at());
        let commands = stream.commands();

        assert_eq!(
            &commands[..7],
            &[
                Command::Init,
                Command::Align(crate::stream::Alignment::Center),
                Command::Bold(true),
                Command::Text("KITCHEN ORDER TICKET".into()),
                Command::LineFeed,
                Command::Bold(false),
                Command::Text("=".repeat(32)),
            ]
        );
    }

    #[test]
    fn test_money_two_decimals() {
        assert_eq!(money("₹", 378.0), "₹378.00");
        assert_eq!(money("$", 0.5), "$0.50");
        assert_eq!(money("₹", 12.346), "₹12.35");
    }

    #[test]
    #[should_panic(expected = "finite")]
    fn test_money_rejects_nan() {
        money("₹", f64::NAN);
    }
}
