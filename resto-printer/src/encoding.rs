//! Text encoding for thermal printers
//!
//! Two encodings are supported:
//! - UTF-8 passthrough, for printers with a UTF-8 code page
//! - GBK, for Chinese-market printers (most generic 58/80mm BLE printers)
//!
//! Width helpers measure text the way the printer lays it out: one column per
//! character in UTF-8 mode, one column per GBK byte in GBK mode.

use std::str::FromStr;

/// Currency symbols GBK cannot represent, with their printable fallbacks
const GBK_SUBSTITUTIONS: &[(char, &str)] = &[('₹', "Rs."), ('€', "EUR")];

/// Text encoding used when turning a command stream into bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    #[default]
    Utf8,
    Gbk,
}

impl FromStr for TextEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(TextEncoding::Utf8),
            "gbk" => Ok(TextEncoding::Gbk),
            other => Err(format!("Unknown printer encoding: {}", other)),
        }
    }
}

impl TextEncoding {
    /// Encode a run of text (no control codes) for the printer
    pub fn encode(self, s: &str) -> Vec<u8> {
        match self {
            TextEncoding::Utf8 => s.as_bytes().to_vec(),
            TextEncoding::Gbk => {
                let text = substitute_gbk(s);
                let (cow, _, _) = encoding_rs::GBK.encode(&text);
                cow.into_owned()
            }
        }
    }

    /// Commands sent right after printer init to select this encoding
    pub fn preamble(self) -> &'static [u8] {
        match self {
            TextEncoding::Utf8 => &[],
            // FS & - enable Chinese mode, FS C 1 - select GBK
            TextEncoding::Gbk => &[0x1C, 0x26, 0x1C, 0x43, 0x01],
        }
    }

    /// Commands sent at the end of a job
    pub fn epilogue(self) -> &'static [u8] {
        match self {
            TextEncoding::Utf8 => &[],
            // FS . - exit Chinese mode
            TextEncoding::Gbk => &[0x1C, 0x2E],
        }
    }

    /// Printed width of a string in columns
    pub fn width(self, s: &str) -> usize {
        match self {
            TextEncoding::Utf8 => s.chars().count(),
            TextEncoding::Gbk => self.encode(s).len(),
        }
    }

    /// Truncate a string to fit within `max_width` columns
    pub fn truncate(self, s: &str, max_width: usize) -> String {
        let mut width = 0;
        let mut result = String::new();
        for c in s.chars() {
            let mut tmp = [0u8; 4];
            let char_width = self.width(c.encode_utf8(&mut tmp));
            if width + char_width > max_width {
                break;
            }
            result.push(c);
            width += char_width;
        }
        result
    }

    /// Pad a string to `width` columns, truncating if it is longer
    pub fn pad(self, s: &str, width: usize, align_right: bool) -> String {
        let current = self.width(s);
        if current >= width {
            return self.truncate(s, width);
        }
        let spaces = " ".repeat(width - current);
        if align_right {
            format!("{}{}", spaces, s)
        } else {
            format!("{}{}", s, spaces)
        }
    }
}

fn substitute_gbk(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match GBK_SUBSTITUTIONS.iter().find(|(from, _)| *from == c) {
            Some((_, to)) => out.push_str(to),
            None => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_width_counts_chars() {
        assert_eq!(TextEncoding::Utf8.width("hello"), 5);
        assert_eq!(TextEncoding::Utf8.width("₹378.00"), 7);
    }

    #[test]
    fn test_gbk_width() {
        assert_eq!(TextEncoding::Gbk.width("hello"), 5);
        assert_eq!(TextEncoding::Gbk.width("你好"), 4);
        assert_eq!(TextEncoding::Gbk.width("AB中文CD"), 8);
        // ₹ prints as "Rs."
        assert_eq!(TextEncoding::Gbk.width("₹5"), 4);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(TextEncoding::Utf8.truncate("hello world", 5), "hello");
        assert_eq!(TextEncoding::Gbk.truncate("你好世界", 4), "你好");
        assert_eq!(TextEncoding::Gbk.truncate("AB中文", 4), "AB中");
    }

    #[test]
    fn test_pad() {
        assert_eq!(TextEncoding::Utf8.pad("hi", 5, false), "hi   ");
        assert_eq!(TextEncoding::Utf8.pad("hi", 5, true), "   hi");
        assert_eq!(TextEncoding::Utf8.pad("hello world", 5, false), "hello");
    }

    #[test]
    fn test_gbk_substitutes_rupee() {
        assert_eq!(TextEncoding::Gbk.encode("₹10"), b"Rs.10".to_vec());
        assert_eq!(TextEncoding::Utf8.encode("₹10"), "₹10".as_bytes().to_vec());
    }

    #[test]
    fn test_gbk_encodes_mixed_text() {
        let bytes = TextEncoding::Gbk.encode("宫保 ₹5");
        assert_eq!(bytes, [&[0xB9, 0xAC, 0xB1, 0xA3][..], b" Rs.5"].concat());
    }

    #[test]
    fn test_parse() {
        assert_eq!("UTF-8".parse::<TextEncoding>(), Ok(TextEncoding::Utf8));
        assert_eq!("gbk".parse::<TextEncoding>(), Ok(TextEncoding::Gbk));
        assert!("latin1".parse::<TextEncoding>().is_err());
    }
}
