//! Database and transaction parameter buffers (DPB / TPB).
//!
//! A parameter buffer is a version byte followed by an ordered list of
//! tagged entries. Entry order is significant (a table lock is a
//! `lock_read`/`lock_write` entry immediately followed by its lock mode) and
//! tags may repeat, so the buffer is kept as a `Vec` rather than a map.
//!
//! Wire layout per entry:
//!
//! ```text
//! flag:    tag
//! byte:    tag, 1, value
//! integer: tag, 4, value (i32 little-endian)
//! string:  tag, len, bytes
//! ```
//!
//! DPB flags are written as `tag, 0` because every DPB entry carries a
//! length. TPB flags are a lone tag byte.

use bytes::Bytes;
use tracing::trace;

use crate::error::{Error, Result};
use crate::protocol::buffer::{ReadBuffer, WriteBuffer};
use crate::protocol::constants::*;

/// Which kind of parameter buffer this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// Database parameter buffer, sent on attach.
    Dpb,
    /// Transaction parameter buffer, sent on transaction start.
    Tpb,
}

/// How the value of a known tag is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueKind {
    Flag,
    Byte,
    Int,
    String,
}

impl BufferKind {
    /// Version byte that starts a buffer of this kind.
    pub fn version(&self) -> u8 {
        match self {
            BufferKind::Dpb => ISC_DPB_VERSION1,
            BufferKind::Tpb => ISC_TPB_VERSION3,
        }
    }

    fn value_kind(&self, tag: u8) -> Option<ValueKind> {
        match self {
            BufferKind::Dpb => match tag {
                ISC_DPB_PAGE_SIZE
                | ISC_DPB_NUM_BUFFERS
                | ISC_DPB_CONNECT_TIMEOUT
                | ISC_DPB_SQL_DIALECT
                | ISC_DPB_PROCESS_ID => Some(ValueKind::Int),
                ISC_DPB_USER_NAME
                | ISC_DPB_PASSWORD
                | ISC_DPB_LC_CTYPE
                | ISC_DPB_SQL_ROLE_NAME
                | ISC_DPB_PROCESS_NAME
                | ISC_DPB_HOST_NAME
                | ISC_DPB_OS_USER => Some(ValueKind::String),
                ISC_DPB_NO_DB_TRIGGERS => Some(ValueKind::Byte),
                ISC_DPB_UTF8_FILENAME => Some(ValueKind::Flag),
                _ => None,
            },
            BufferKind::Tpb => match tag {
                ISC_TPB_LOCK_READ | ISC_TPB_LOCK_WRITE => Some(ValueKind::String),
                ISC_TPB_LOCK_TIMEOUT => Some(ValueKind::Int),
                ISC_TPB_CONSISTENCY..=ISC_TPB_VERB_TIME
                | ISC_TPB_COMMIT_TIME..=ISC_TPB_NO_AUTO_UNDO
                | ISC_TPB_READ_CONSISTENCY => Some(ValueKind::Flag),
                _ => None,
            },
        }
    }
}

/// Value of a single parameter buffer entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterValue {
    /// Tag without a value.
    None,
    /// Single byte value.
    Byte(u8),
    /// 4-byte integer value.
    Int(i32),
    /// Length-prefixed string value.
    String(String),
    /// Entry with an unknown tag (or undecodable data), kept verbatim.
    Opaque(Bytes),
}

/// A single tagged entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Item tag.
    pub tag: u8,
    /// Item value.
    pub value: ParameterValue,
}

impl Parameter {
    /// Create a new entry.
    pub fn new(tag: u8, value: ParameterValue) -> Self {
        Self { tag, value }
    }
}

/// Ordered collection of parameter buffer entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterBuffer {
    kind: BufferKind,
    entries: Vec<Parameter>,
}

impl ParameterBuffer {
    /// Create an empty buffer of the given kind.
    pub fn new(kind: BufferKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
        }
    }

    /// Create an empty DPB.
    pub fn dpb() -> Self {
        Self::new(BufferKind::Dpb)
    }

    /// Create an empty TPB.
    pub fn tpb() -> Self {
        Self::new(BufferKind::Tpb)
    }

    /// Create a buffer from existing entries.
    pub fn from_entries(kind: BufferKind, entries: Vec<Parameter>) -> Self {
        Self { kind, entries }
    }

    /// Buffer kind.
    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    /// All entries in encoding order.
    pub fn entries(&self) -> &[Parameter] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the buffer has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append an entry.
    pub fn push(&mut self, tag: u8, value: ParameterValue) {
        self.entries.push(Parameter::new(tag, value));
    }

    /// Append a flag entry.
    pub fn add_flag(&mut self, tag: u8) {
        self.push(tag, ParameterValue::None);
    }

    /// Append a byte entry.
    pub fn add_byte(&mut self, tag: u8, value: u8) {
        self.push(tag, ParameterValue::Byte(value));
    }

    /// Append an integer entry.
    pub fn add_int(&mut self, tag: u8, value: i32) {
        self.push(tag, ParameterValue::Int(value));
    }

    /// Append a string entry.
    pub fn add_string(&mut self, tag: u8, value: impl Into<String>) {
        self.push(tag, ParameterValue::String(value.into()));
    }

    /// First entry with `tag`.
    pub fn find(&self, tag: u8) -> Option<&Parameter> {
        self.entries.iter().find(|p| p.tag == tag)
    }

    /// Check if any entry has `tag`.
    pub fn contains(&self, tag: u8) -> bool {
        self.find(tag).is_some()
    }

    /// Remove every entry with `tag`, returning how many were removed.
    pub fn remove(&mut self, tag: u8) -> usize {
        let before = self.entries.len();
        self.entries.retain(|p| p.tag != tag);
        before - self.entries.len()
    }

    /// Integer value of the first entry with `tag`.
    pub fn int_value(&self, tag: u8) -> Option<i32> {
        match self.find(tag)?.value {
            ParameterValue::Int(v) => Some(v),
            ParameterValue::Byte(v) => Some(v as i32),
            _ => None,
        }
    }

    /// String value of the first entry with `tag`.
    pub fn string_value(&self, tag: u8) -> Option<&str> {
        match &self.find(tag)?.value {
            ParameterValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Encode the buffer including its version byte.
    ///
    /// Every value must have the kind its tag is decoded as, so that
    /// [`decode`](Self::decode) gives back the same entries. Unknown tags
    /// only take opaque values, and in a TPB only empty ones.
    pub fn encode(&self) -> Result<Bytes> {
        let mut buf = WriteBuffer::with_capacity(1 + self.entries.len() * 6);
        buf.write_u8(self.kind.version());
        for entry in &self.entries {
            self.check_value(entry)?;
            buf.write_u8(entry.tag);
            match &entry.value {
                ParameterValue::None => {
                    if self.kind == BufferKind::Dpb {
                        buf.write_u8(0);
                    }
                }
                ParameterValue::Byte(v) => {
                    buf.write_u8(1);
                    buf.write_u8(*v);
                }
                ParameterValue::Int(v) => {
                    buf.write_u8(4);
                    buf.write_i32_le(*v);
                }
                ParameterValue::String(s) => write_with_length(&mut buf, entry.tag, s.as_bytes())?,
                ParameterValue::Opaque(data) => {
                    if self.kind == BufferKind::Tpb && data.is_empty() {
                        continue;
                    }
                    write_with_length(&mut buf, entry.tag, data)?;
                }
            }
        }
        Ok(buf.freeze())
    }

    /// Decode a buffer previously produced by [`encode`](Self::encode) or
    /// received from the server.
    ///
    /// Entries with unknown tags are kept as [`ParameterValue::Opaque`] and
    /// decoding continues with the next entry.
    pub fn decode(kind: BufferKind, data: &[u8]) -> Result<Self> {
        let mut buf = ReadBuffer::from_slice(data);
        let version = buf.read_u8()?;
        if version != kind.version() {
            return Err(Error::protocol(format!(
                "Unsupported {:?} version {}, expected {}",
                kind,
                version,
                kind.version()
            )));
        }

        let mut entries = Vec::new();
        while buf.remaining() > 0 {
            let tag = buf.read_u8()?;
            let value = match (kind, kind.value_kind(tag)) {
                (BufferKind::Tpb, Some(ValueKind::Flag)) => ParameterValue::None,
                (BufferKind::Tpb, None) => {
                    trace!(tag, "unknown TPB item kept as opaque flag");
                    ParameterValue::Opaque(Bytes::new())
                }
                (_, value_kind) => {
                    let len = buf.read_u8()? as usize;
                    let data = buf.read_bytes(len)?;
                    decode_value(tag, value_kind, data)
                }
            };
            entries.push(Parameter { tag, value });
        }
        Ok(Self { kind, entries })
    }

    fn check_value(&self, entry: &Parameter) -> Result<()> {
        let expected = self.kind.value_kind(entry.tag);
        let valid = match (&entry.value, expected) {
            (ParameterValue::None, Some(ValueKind::Flag))
            | (ParameterValue::Byte(_), Some(ValueKind::Byte))
            | (ParameterValue::Int(_), Some(ValueKind::Int))
            | (ParameterValue::String(_), Some(ValueKind::String)) => true,
            (ParameterValue::Opaque(data), None) => {
                self.kind == BufferKind::Dpb || data.is_empty()
            }
            // TPB flags are read without a length
            (ParameterValue::Opaque(_), Some(ValueKind::Flag)) if self.kind == BufferKind::Tpb => {
                false
            }
            // data the decoder would not recognise for its tag either
            (ParameterValue::Opaque(data), value_kind) => known_value(value_kind, data).is_none(),
            _ => false,
        };
        if valid {
            return Ok(());
        }
        Err(Error::configuration(
            JB_INVALID_CONNECTION_PROPERTY_VALUE,
            format!(
                "{:?} item {} cannot hold {:?}, expected {}",
                self.kind,
                entry.tag,
                entry.value,
                match expected {
                    Some(kind) => format!("{:?}", kind),
                    None => "an opaque value".to_string(),
                }
            ),
        ))
    }
}

fn write_with_length(buf: &mut WriteBuffer, tag: u8, data: &[u8]) -> Result<()> {
    if data.len() > u8::MAX as usize {
        return Err(Error::configuration(
            JB_INVALID_CONNECTION_PROPERTY_VALUE,
            format!(
                "Value for parameter item {} too long: {} bytes (maximum 255)",
                tag,
                data.len()
            ),
        ));
    }
    buf.write_u8(data.len() as u8);
    buf.write_bytes(data);
    Ok(())
}

/// Typed value for `data`, when it has the shape `value_kind` expects.
fn known_value(value_kind: Option<ValueKind>, data: &[u8]) -> Option<ParameterValue> {
    match (value_kind?, data.len()) {
        (ValueKind::Flag, 0) => Some(ParameterValue::None),
        (ValueKind::Byte, 1) => Some(ParameterValue::Byte(data[0])),
        (ValueKind::Int, 4) => Some(ParameterValue::Int(i32::from_le_bytes([
            data[0], data[1], data[2], data[3],
        ]))),
        (ValueKind::String, _) => std::str::from_utf8(data)
            .ok()
            .map(|s| ParameterValue::String(s.to_string())),
        _ => None,
    }
}

fn decode_value(tag: u8, value_kind: Option<ValueKind>, data: Bytes) -> ParameterValue {
    known_value(value_kind, &data).unwrap_or_else(|| {
        trace!(tag, len = data.len(), "parameter item kept as opaque value");
        ParameterValue::Opaque(data)
    })
}
