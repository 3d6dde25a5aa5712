//! Customer bill
//!
//! Item table columns on a 32-column line:
//!
//! ```text
//! Item             Qty      Amount
//! Paneer Tikka       2     ₹360.00
//! Chicken Birya...   1     ₹250.00
//! ```

use chrono::NaiveDateTime;
use shared::models::{Order, OrderItem, Settings};

use super::{footer, header, money};
use crate::encoding::TextEncoding;
use crate::stream::CommandStream;

const NAME_COL: usize = 16;
const QTY_COL: usize = 4;
/// Names longer than the column are cut to this many characters plus "..."
const NAME_CUT: usize = 13;
const ELLIPSIS: &str = "...";

pub(super) fn render(
    mut s: CommandStream,
    order: &Order,
    settings: &Settings,
    printed_at: NaiveDateTime,
) -> CommandStream {
    let currency = settings.currency();
    let amount_col = s.width().saturating_sub(NAME_COL + QTY_COL);

    header(&mut s, settings.restaurant_name());

    s.line(&format!("Bill No: {}", order.bill_number()));
    s.line(&order.identity_line());
    s.line(&format!("Date: {}", printed_at.format("%d/%m/%Y")));
    s.line(&format!("Time: {}", printed_at.format("%H:%M")));
    s.sep_single();

    let encoding = s.encoding();
    s.line(&row(encoding, "Item", "Qty", "Amount", amount_col));
    s.sep_single();
    for item in &order.items {
        let line = item_row(encoding, item, currency, amount_col);
        s.line(&line);
    }
    s.sep_single();

    s.line_lr("Subtotal:", &money(currency, order.subtotal));
    s.line_lr(
        &format!("Tax ({}%):", settings.tax_percent()),
        &money(currency, order.tax),
    );
    s.bold();
    s.line_lr("TOTAL:", &money(currency, order.total));
    s.bold_off();
    s.sep_double();

    if let Some(method) = order.payment_method.as_deref().filter(|m| !m.is_empty()) {
        s.line(&format!("Payment: {}", method));
    }

    s.center();
    s.newline();
    s.line("Thank you for dining with us!");
    s.line("Please visit again");
    footer(&mut s);
    s
}

/// Item name cut to fit the name column, measured in printed columns
pub(crate) fn truncate_name(encoding: TextEncoding, name: &str) -> String {
    if encoding.width(name) > NAME_COL {
        format!("{}{}", encoding.truncate(name, NAME_CUT), ELLIPSIS)
    } else {
        name.to_string()
    }
}

fn item_row(encoding: TextEncoding, item: &OrderItem, currency: &str, amount_col: usize) -> String {
    assert!(
        item.price.is_finite(),
        "item price must be finite for {}",
        item.name
    );
    row(
        encoding,
        &truncate_name(encoding, &item.name),
        &item.quantity.to_string(),
        &money(currency, item.amount()),
        amount_col,
    )
}

/// One table row; quantity and amount always keep a leading space
fn row(encoding: TextEncoding, name: &str, qty: &str, amount: &str, amount_col: usize) -> String {
    let qty = format!(" {}", justify_right(encoding, qty, QTY_COL - 1));
    // A wide quantity borrows from the amount column
    let overflow = encoding.width(&qty).saturating_sub(QTY_COL);
    let amount_col = amount_col.saturating_sub(overflow).max(1);
    format!(
        "{}{} {}",
        encoding.pad(name, NAME_COL, false),
        qty,
        justify_right(encoding, amount, amount_col - 1),
    )
}

/// Right-justify without truncating
fn justify_right(encoding: TextEncoding, s: &str, width: usize) -> String {
    let w = encoding.width(s);
    if w >= width {
        s.to_string()
    } else {
        format!("{}{}", " ".repeat(width - w), s)
    }
}
