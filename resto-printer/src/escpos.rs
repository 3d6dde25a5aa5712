//! ESC/POS byte encoder
//!
//! Low-level builder that appends raw ESC/POS sequences. Receipt code does not
//! use it directly; it builds a [`CommandStream`](crate::CommandStream) which is
//! lowered to bytes here.

use crate::encoding::TextEncoding;

const ESC: u8 = 0x1B;
const GS: u8 = 0x1D;
const LF: u8 = 0x0A;

/// ESC/POS command builder
///
/// Text is encoded with the configured [`TextEncoding`] as it is appended;
/// control sequences are written verbatim.
pub struct EscPosBuilder {
    buf: Vec<u8>,
    encoding: TextEncoding,
}

impl EscPosBuilder {
    pub fn new(encoding: TextEncoding) -> Self {
        Self {
            buf: Vec::with_capacity(1024),
            encoding,
        }
    }

    // === Setup ===

    /// Initialize printer (ESC @) and select the text encoding
    pub fn init(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[ESC, 0x40]);
        self.buf.extend_from_slice(self.encoding.preamble());
        self
    }

    // === Text Output ===

    /// Write encoded text
    pub fn text(&mut self, s: &str) -> &mut Self {
        let bytes = self.encoding.encode(s);
        self.buf.extend_from_slice(&bytes);
        self
    }

    /// Write a line break
    pub fn newline(&mut self) -> &mut Self {
        self.buf.push(LF);
        self
    }

    /// Print and feed n lines (ESC d n)
    pub fn feed(&mut self, lines: u8) -> &mut Self {
        self.buf.extend_from_slice(&[ESC, 0x64, lines]);
        self
    }

    // === Alignment ===

    pub fn center(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[ESC, 0x61, 0x01]);
        self
    }

    pub fn left(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[ESC, 0x61, 0x00]);
        self
    }

    pub fn right(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[ESC, 0x61, 0x02]);
        self
    }

    // === Text Style ===

    pub fn bold(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[ESC, 0x45, 0x01]);
        self
    }

    pub fn bold_off(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[ESC, 0x45, 0x00]);
        self
    }

    /// Select character size (GS ! n)
    pub fn size(&mut self, n: u8) -> &mut Self {
        self.buf.extend_from_slice(&[GS, 0x21, n]);
        self
    }

    // === Paper Control ===

    /// Full cut (GS V 0)
    pub fn cut(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[GS, 0x56, 0x00]);
        self
    }

    // === Build ===

    /// Close the job and return the bytes
    pub fn build(mut self) -> Vec<u8> {
        self.buf.extend_from_slice(self.encoding.epilogue());
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_basic() {
        let mut b = EscPosBuilder::new(TextEncoding::Utf8);
        b.init().center().bold().text("Title").newline().bold_off().left();

        let data = b.build();
        assert_eq!(&data[..2], &[0x1B, 0x40]);
        assert_eq!(&data[2..5], &[0x1B, 0x61, 0x01]);
        assert!(String::from_utf8_lossy(&data).contains("Title"));
    }

    #[test]
    fn test_gbk_preamble_and_epilogue() {
        let mut b = EscPosBuilder::new(TextEncoding::Gbk);
        b.init().text("你好");

        let data = b.build();
        assert_eq!(&data[..7], &[0x1B, 0x40, 0x1C, 0x26, 0x1C, 0x43, 0x01]);
        assert_eq!(&data[data.len() - 2..], &[0x1C, 0x2E]);
        // two GBK double-byte characters
        assert_eq!(data.len(), 7 + 4 + 2);
    }

    #[test]
    fn test_cut_and_feed() {
        let mut b = EscPosBuilder::new(TextEncoding::Utf8);
        b.feed(4).cut();
        assert_eq!(b.build(), vec![0x1B, 0x64, 4, 0x1D, 0x56, 0x00]);
    }
}
