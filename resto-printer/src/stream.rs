//! Printer command stream
//!
//! A [`CommandStream`] is the formatted form of a document: an ordered list of
//! printer commands that is independent of the wire encoding. It can be
//! inspected as text lines (for tests and previews) or lowered to ESC/POS
//! bytes with [`CommandStream::encode`].

use crate::encoding::TextEncoding;
use crate::escpos::EscPosBuilder;

/// Paper width of an 80mm printer in its 32-column font
pub const DEFAULT_WIDTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSize {
    Normal,
    DoubleHeight,
    DoubleWidth,
    Double,
}

impl TextSize {
    fn escpos(self) -> u8 {
        match self {
            TextSize::Normal => 0x00,
            TextSize::DoubleHeight => 0x01,
            TextSize::DoubleWidth => 0x10,
            TextSize::Double => 0x11,
        }
    }
}

/// A single printer command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Init,
    Align(Alignment),
    Bold(bool),
    Size(TextSize),
    Text(String),
    LineFeed,
    Feed(u8),
    Cut,
}

/// Ordered printer commands with a fluent builder surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandStream {
    commands: Vec<Command>,
    width: usize,
    encoding: TextEncoding,
}

impl CommandStream {
    /// Start a stream with the printer-initialize command
    pub fn new(width: usize) -> Self {
        Self::with_encoding(width, TextEncoding::Utf8)
    }

    /// Start a stream laid out for `encoding`
    pub fn with_encoding(width: usize, encoding: TextEncoding) -> Self {
        Self {
            commands: vec![Command::Init],
            width,
            encoding,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    fn push(&mut self, command: Command) -> &mut Self {
        self.commands.push(command);
        self
    }

    // === Text Output ===

    pub fn text(&mut self, s: &str) -> &mut Self {
        self.push(Command::Text(s.to_string()))
    }

    /// Text followed by a line feed
    pub fn line(&mut self, s: &str) -> &mut Self {
        self.text(s);
        self.push(Command::LineFeed)
    }

    pub fn newline(&mut self) -> &mut Self {
        self.push(Command::LineFeed)
    }

    /// Print and feed `lines` lines
    pub fn feed(&mut self, lines: u8) -> &mut Self {
        self.push(Command::Feed(lines))
    }

    // === Alignment ===

    pub fn center(&mut self) -> &mut Self {
        self.push(Command::Align(Alignment::Center))
    }

    pub fn left(&mut self) -> &mut Self {
        self.push(Command::Align(Alignment::Left))
    }

    pub fn right(&mut self) -> &mut Self {
        self.push(Command::Align(Alignment::Right))
    }

    // === Text Style ===

    pub fn bold(&mut self) -> &mut Self {
        self.push(Command::Bold(true))
    }

    pub fn bold_off(&mut self) -> &mut Self {
        self.push(Command::Bold(false))
    }

    pub fn double_size(&mut self) -> &mut Self {
        self.push(Command::Size(TextSize::Double))
    }

    pub fn double_height(&mut self) -> &mut Self {
        self.push(Command::Size(TextSize::DoubleHeight))
    }

    pub fn reset_size(&mut self) -> &mut Self {
        self.push(Command::Size(TextSize::Normal))
    }

    // === Separators ===

    /// A full-width line of '='
    pub fn sep_double(&mut self) -> &mut Self {
        let sep = "=".repeat(self.width);
        self.line(&sep)
    }

    /// A full-width line of '-'
    pub fn sep_single(&mut self) -> &mut Self {
        let sep = "-".repeat(self.width);
        self.line(&sep)
    }

    // === Layout Helpers ===

    /// Left text and right text on the same line, space-filled between
    pub fn line_lr(&mut self, left: &str, right: &str) -> &mut Self {
        let lw = self.encoding.width(left);
        let rw = self.encoding.width(right);

        if lw + rw >= self.width {
            self.line(&format!("{} {}", left, right))
        } else {
            let spaces = " ".repeat(self.width - lw - rw);
            self.line(&format!("{}{}{}", left, spaces, right))
        }
    }

    // === Paper Control ===

    /// Full paper cut
    pub fn cut(&mut self) -> &mut Self {
        self.push(Command::Cut)
    }

    // === Output ===

    /// Printed text, one entry per line, without control codes
    pub fn text_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        let mut current = String::new();
        for command in &self.commands {
            match command {
                Command::Text(s) => current.push_str(s),
                Command::LineFeed | Command::Feed(_) => {
                    lines.push(std::mem::take(&mut current));
                }
                _ => {}
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
        lines
    }

    /// Whether any printed line equals `line` exactly
    pub fn has_line(&self, line: &str) -> bool {
        self.text_lines().iter().any(|l| l == line)
    }

    /// Lower the stream to ESC/POS bytes
    pub fn encode(&self) -> Vec<u8> {
        let mut b = EscPosBuilder::new(self.encoding);
        for command in &self.commands {
            match command {
                Command::Init => b.init(),
                Command::Align(Alignment::Left) => b.left(),
                Command::Align(Alignment::Center) => b.center(),
                Command::Align(Alignment::Right) => b.right(),
                Command::Bold(true) => b.bold(),
                Command::Bold(false) => b.bold_off(),
                Command::Size(size) => b.size(size.escpos()),
                Command::Text(s) => b.text(s),
                Command::LineFeed => b.newline(),
                Command::Feed(n) => b.feed(*n),
                Command::Cut => b.cut(),
            };
        }
        b.build()
    }
}

impl Default for CommandStream {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_with_init() {
        let s = CommandStream::new(32);
        assert_eq!(s.commands(), &[Command::Init]);
        assert_eq!(&s.encode()[..2], &[0x1B, 0x40]);
    }

    #[test]
    fn test_text_lines() {
        let mut s = CommandStream::new(10);
        s.center().bold().line("Title").bold_off().left();
        s.text("a").text("b").newline();
        s.sep_double();

        assert_eq!(s.text_lines(), vec!["Title", "ab", "=========="]);
    }

    #[test]
    fn test_line_lr() {
        let mut s = CommandStream::new(20);
        s.line_lr("Subtotal:", "₹360.00");
        assert_eq!(s.text_lines(), vec!["Subtotal:    ₹360.00"]);
        assert_eq!(s.text_lines()[0].chars().count(), 20);
    }

    #[test]
    fn test_line_lr_overflow() {
        let mut s = CommandStream::new(8);
        s.line_lr("Subtotal:", "₹360.00");
        assert_eq!(s.text_lines(), vec!["Subtotal: ₹360.00"]);
    }

    #[test]
    fn test_encode_maps_commands() {
        let mut s = CommandStream::new(32);
        s.center().bold().line("Hi").bold_off().feed(3).cut();

        let data = s.encode();
        assert_eq!(
            data,
            vec![
                0x1B, 0x40, // init
                0x1B, 0x61, 0x01, // center
                0x1B, 0x45, 0x01, // bold
                b'H', b'i', 0x0A, // text
                0x1B, 0x45, 0x00, // bold off
                0x1B, 0x64, 3, // feed
                0x1D, 0x56, 0x00, // cut
            ]
        );
    }
}
