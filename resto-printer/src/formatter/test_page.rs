use chrono::NaiveDateTime;
use shared::models::ConfiguredPrinter;

use super::{footer, header, APP_NAME};
use crate::stream::CommandStream;

pub(super) fn render(
    mut s: CommandStream,
    printer: &ConfiguredPrinter,
    printed_at: NaiveDateTime,
) -> CommandStream {
    header(&mut s, APP_NAME);

    s.center();
    s.bold();
    s.line("TEST PRINT SUCCESSFUL");
    s.bold_off();
    s.sep_single();
    s.left();

    s.line(&format!("Printer: {}", printer.display_name()));
    s.line(&format!("Role: {}", printer.role));
    s.line(&format!("Transport: {}", printer.transport));
    s.line(&format!("Date: {}", printed_at.format("%d/%m/%Y %H:%M:%S")));

    footer(&mut s);
    s
}
