//! Kitchen order ticket
//!
//! Kitchen-facing: identity, time, and one line per item with its modifiers
//! and notes. Prices are never printed.

use chrono::NaiveDateTime;
use shared::models::{Order, OrderItem};

use super::{footer, header};
use crate::stream::CommandStream;

const TITLE: &str = "KITCHEN ORDER TICKET";

pub(super) fn render(mut s: CommandStream, order: &Order, printed_at: NaiveDateTime) -> CommandStream {
    header(&mut s, TITLE);

    // Table/token large so it reads from across the pass
    s.double_height();
    s.line(&order.identity_line());
    s.reset_size();
    s.line(&format!("Time: {}", printed_at.format("%d/%m/%Y %H:%M")));
    s.sep_single();

    for item in &order.items {
        render_item(&mut s, item);
    }

    s.sep_single();
    footer(&mut s);
    s
}

fn render_item(s: &mut CommandStream, item: &OrderItem) {
    s.bold();
    s.line(&format!("{}x {}", item.quantity, item.name));
    s.bold_off();

    for modifier in &item.modifiers {
        s.line(&format!("  + {}", modifier));
    }

    if let Some(note) = item.note() {
        s.line(&format!("  Note: {}", note));
    }
}
