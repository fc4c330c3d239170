//! Firebird character sets and transliteration.

use crate::error::{Error, Result};
use crate::protocol::constants::*;

/// How a character set maps characters to bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Codec {
    /// Raw bytes; strings are stored as their UTF-8 bytes.
    Binary,
    Ascii,
    Latin1,
    Win1252,
    Utf8,
}

/// A Firebird character set.
#[derive(Debug, PartialEq, Eq)]
pub struct Charset {
    id: u8,
    name: &'static str,
    max_bytes_per_char: u8,
    codec: Codec,
}

static CHARSETS: [Charset; 8] = [
    Charset { id: CS_NONE, name: "NONE", max_bytes_per_char: 1, codec: Codec::Binary },
    Charset { id: CS_BINARY, name: "OCTETS", max_bytes_per_char: 1, codec: Codec::Binary },
    Charset { id: CS_ASCII, name: "ASCII", max_bytes_per_char: 1, codec: Codec::Ascii },
    Charset { id: CS_UNICODE_FSS, name: "UNICODE_FSS", max_bytes_per_char: 3, codec: Codec::Utf8 },
    Charset { id: CS_UTF8, name: "UTF8", max_bytes_per_char: 4, codec: Codec::Utf8 },
    Charset { id: CS_ISO8859_1, name: "ISO8859_1", max_bytes_per_char: 1, codec: Codec::Latin1 },
    Charset { id: CS_WIN1252, name: "WIN1252", max_bytes_per_char: 1, codec: Codec::Win1252 },
    // Alias accepted by name only
    Charset { id: CS_BINARY, name: "BINARY", max_bytes_per_char: 1, codec: Codec::Binary },
];

/// Code points for WIN1252 bytes 0x80..=0x9F; 0 marks an unassigned byte.
const WIN1252_HIGH: [u16; 32] = [
    0x20AC, 0, 0x201A, 0x0192, 0x201E, 0x2026, 0x2020, 0x2021, 0x02C6, 0x2030, 0x0160, 0x2039,
    0x0152, 0, 0x017D, 0, 0, 0x2018, 0x2019, 0x201C, 0x201D, 0x2022, 0x2013, 0x2014, 0x02DC,
    0x2122, 0x0161, 0x203A, 0x0153, 0, 0x017E, 0x0178,
];

impl Charset {
    /// Look up a character set by id.
    pub fn by_id(id: u8) -> Option<&'static Charset> {
        CHARSETS.iter().find(|c| c.id == id)
    }

    /// Look up a character set by Firebird name (case-insensitive).
    pub fn by_name(name: &str) -> Option<&'static Charset> {
        let name = name.trim();
        let name = if name.eq_ignore_ascii_case("UTF-8") {
            "UTF8"
        } else {
            name
        };
        CHARSETS.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Look up by name, failing with a configuration error.
    pub fn require(name: &str) -> Result<&'static Charset> {
        Self::by_name(name).ok_or_else(|| {
            Error::configuration(
                JB_UNKNOWN_CHARACTER_SET,
                format!("Unknown Firebird character set {}", name),
            )
        })
    }

    /// The UTF8 character set.
    pub fn utf8() -> &'static Charset {
        &CHARSETS[4]
    }

    /// The OCTETS character set.
    pub fn octets() -> &'static Charset {
        &CHARSETS[1]
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn max_bytes_per_char(&self) -> u8 {
        self.max_bytes_per_char
    }

    /// Whether this character set stores raw bytes.
    pub fn is_binary(&self) -> bool {
        self.id == CS_BINARY
    }

    /// Encode `value`, failing on characters without a representation.
    pub fn encode(&self, value: &str) -> Result<Vec<u8>> {
        match self.codec {
            Codec::Binary | Codec::Utf8 => Ok(value.as_bytes().to_vec()),
            Codec::Ascii => self.encode_single_byte(value, |c| (c as u32) < 0x80),
            Codec::Latin1 => self.encode_single_byte(value, |c| (c as u32) <= 0xFF),
            Codec::Win1252 => {
                let mut out = Vec::with_capacity(value.len());
                for c in value.chars() {
                    out.push(win1252_byte(c).ok_or(Error::TransliterationFailed {
                        charset: self.name,
                        character: c,
                    })?);
                }
                Ok(out)
            }
        }
    }

    fn encode_single_byte(&self, value: &str, fits: impl Fn(char) -> bool) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(value.len());
        for c in value.chars() {
            if !fits(c) {
                return Err(Error::TransliterationFailed {
                    charset: self.name,
                    character: c,
                });
            }
            out.push(c as u32 as u8);
        }
        Ok(out)
    }

    /// Decode bytes in this character set.
    pub fn decode(&self, bytes: &[u8]) -> Result<String> {
        match self.codec {
            Codec::Utf8 => String::from_utf8(bytes.to_vec())
                .map_err(|e| Error::type_conversion(format!("Invalid {} data: {}", self.name, e))),
            Codec::Binary => Ok(String::from_utf8_lossy(bytes).into_owned()),
            Codec::Ascii | Codec::Latin1 => Ok(bytes.iter().map(|b| *b as char).collect()),
            Codec::Win1252 => Ok(bytes.iter().map(|b| win1252_char(*b)).collect()),
        }
    }
}

fn win1252_byte(c: char) -> Option<u8> {
    let cp = c as u32;
    if cp < 0x80 || (0xA0..=0xFF).contains(&cp) {
        return Some(cp as u8);
    }
    WIN1252_HIGH
        .iter()
        .position(|&m| m != 0 && m as u32 == cp)
        .map(|i| 0x80 + i as u8)
}

fn win1252_char(b: u8) -> char {
    match b {
        0x80..=0x9F => {
            let cp = WIN1252_HIGH[(b - 0x80) as usize];
            if cp == 0 {
                b as char
            } else {
                char::from_u32(cp as u32).unwrap_or(char::REPLACEMENT_CHARACTER)
            }
        }
        _ => b as char,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(Charset::by_name("utf-8").unwrap().id(), CS_UTF8);
        assert_eq!(Charset::by_name("win1252").unwrap().id(), CS_WIN1252);
        assert_eq!(Charset::by_id(CS_UNICODE_FSS).unwrap().max_bytes_per_char(), 3);
        assert!(Charset::by_name("KOI8R").is_none());
        assert!(Charset::require("KOI8R").is_err());
    }

    #[test]
    fn test_latin1_transliteration() {
        let latin1 = Charset::by_id(CS_ISO8859_1).unwrap();
        assert_eq!(latin1.encode("caf\u{e9}").unwrap(), vec![b'c', b'a', b'f', 0xE9]);
        match latin1.encode("\u{20ac}5") {
            Err(Error::TransliterationFailed { charset, character }) => {
                assert_eq!(charset, "ISO8859_1");
                assert_eq!(character, '\u{20ac}');
            }
            other => panic!("Expected TransliterationFailed, got {:?}", other),
        }
        assert_eq!(latin1.decode(&[0xE9]).unwrap(), "\u{e9}");
    }

    #[test]
    fn test_win1252_euro() {
        let win = Charset::by_id(CS_WIN1252).unwrap();
        assert_eq!(win.encode("\u{20ac}").unwrap(), vec![0x80]);
        assert_eq!(win.decode(&[0x80, 0x41]).unwrap(), "\u{20ac}A");
        assert!(win.encode("\u{4e2d}").is_err());
    }

    #[test]
    fn test_ascii_rejects_high_chars() {
        let ascii = Charset::by_id(CS_ASCII).unwrap();
        assert!(ascii.encode("abc").is_ok());
        assert!(ascii.encode("\u{e9}").is_err());
    }

    #[test]
    fn test_utf8_decode_invalid() {
        assert!(Charset::utf8().decode(&[0xff, 0xfe]).is_err());
        assert_eq!(Charset::utf8().decode("\u{e9}t\u{e9}".as_bytes()).unwrap(), "\u{e9}t\u{e9}");
    }
}
