//! Field values and their row-data encoding.
//!
//! [`DatatypeCoder`] converts between [`FbValue`] and the big-endian bytes of
//! a single field as described by its [`FieldDescriptor`]. A `None` payload
//! is SQL NULL.

use std::fmt;

use bytes::Bytes;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{Error, Result};
use crate::protocol::buffer::{ReadBuffer, WriteBuffer};
use crate::protocol::constants::*;

use super::date;
use super::decfloat::{DecFloat, DecimalFormat};
use super::descriptor::FieldDescriptor;
use super::encoding::Charset;
use super::sql_type::SqlType;

/// Value with a time zone, kept as UTC plus the Firebird zone id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZonedValue<T> {
    pub utc: T,
    pub zone_id: u16,
}

/// Zone ids at or below this value encode a fixed offset.
const MAX_OFFSET_ZONE_ID: u16 = 2 * 1439;

impl<T> ZonedValue<T> {
    /// Offset from UTC in minutes, when the zone is a fixed offset rather
    /// than a named region.
    pub fn offset_minutes(&self) -> Option<i32> {
        (self.zone_id <= MAX_OFFSET_ZONE_ID).then(|| self.zone_id as i32 - 1439)
    }
}

/// A single field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FbValue {
    Null,
    Boolean(bool),
    Short(i16),
    Int(i32),
    BigInt(i64),
    Int128(i128),
    /// Exact decimal as a plain string (`-123.45`).
    Decimal(String),
    Float(f32),
    Double(f64),
    String(String),
    Bytes(Bytes),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    TimeTz(ZonedValue<NaiveTime>),
    TimestampTz(ZonedValue<NaiveDateTime>),
    /// Blob id to be opened through a blob channel.
    BlobId(u64),
    /// Row identifier (`RDB$DB_KEY`).
    RowId(Bytes),
}

impl FbValue {
    /// Check if the value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, FbValue::Null)
    }

    /// Boolean view: NULL reads as `false`.
    pub fn to_bool(&self) -> Result<bool> {
        match self {
            FbValue::Null => Ok(false),
            FbValue::Boolean(b) => Ok(*b),
            FbValue::Short(v) => Ok(*v != 0),
            FbValue::Int(v) => Ok(*v != 0),
            FbValue::BigInt(v) => Ok(*v != 0),
            FbValue::String(s) => Ok(matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "true" | "t" | "y" | "1"
            )),
            other => Err(Error::type_conversion(format!(
                "Cannot convert {:?} to boolean",
                other
            ))),
        }
    }

    /// Integer view: NULL reads as 0.
    pub fn to_i64(&self) -> Result<i64> {
        match self {
            FbValue::Null => Ok(0),
            FbValue::Boolean(b) => Ok(*b as i64),
            FbValue::Short(v) => Ok(*v as i64),
            FbValue::Int(v) => Ok(*v as i64),
            FbValue::BigInt(v) => Ok(*v),
            FbValue::Int128(v) => i64::try_from(*v)
                .map_err(|_| Error::NumericOverflow {
                    message: format!("{} does not fit in a BIGINT", v),
                }),
            FbValue::Decimal(s) | FbValue::String(s) => s
                .trim()
                .parse()
                .map_err(|_| Error::type_conversion(format!("Cannot convert {:?} to integer", s))),
            other => Err(Error::type_conversion(format!(
                "Cannot convert {:?} to integer",
                other
            ))),
        }
    }

    /// Try to get the value as a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FbValue::String(s) | FbValue::Decimal(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FbValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FbValue::Null => write!(f, "NULL"),
            FbValue::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            FbValue::Short(v) => write!(f, "{}", v),
            FbValue::Int(v) => write!(f, "{}", v),
            FbValue::BigInt(v) => write!(f, "{}", v),
            FbValue::Int128(v) => write!(f, "{}", v),
            FbValue::Decimal(s) | FbValue::String(s) => write!(f, "{}", s),
            FbValue::Float(v) => write!(f, "{}", v),
            FbValue::Double(v) => write!(f, "{}", v),
            FbValue::Bytes(b) | FbValue::RowId(b) => write!(f, "<{} bytes>", b.len()),
            FbValue::Date(d) => write!(f, "{}", d),
            FbValue::Time(t) => write!(f, "{}", t),
            FbValue::Timestamp(ts) => write!(f, "{}", ts),
            FbValue::TimeTz(z) => write!(f, "{} (zone {})", z.utc, z.zone_id),
            FbValue::TimestampTz(z) => write!(f, "{} (zone {})", z.utc, z.zone_id),
            FbValue::BlobId(id) => write!(f, "<blob {:#x}>", id),
        }
    }
}

/// A parsed exact decimal: `unscaled * 10^-scale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScaledDecimal {
    unscaled: i128,
    scale: u32,
}

impl ScaledDecimal {
    fn parse(text: &str) -> Result<Self> {
        let invalid = || Error::type_conversion(format!("Invalid decimal value {:?}", text));
        let text = text.trim();
        let (negative, digits) = match text.as_bytes().first() {
            Some(b'-') => (true, &text[1..]),
            Some(b'+') => (false, &text[1..]),
            _ => (false, text),
        };
        let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits, ""));
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        let mut unscaled: i128 = 0;
        for c in int_part.chars().chain(frac_part.chars()) {
            let d = c.to_digit(10).ok_or_else(invalid)? as i128;
            unscaled = unscaled
                .checked_mul(10)
                .and_then(|v| v.checked_add(d))
                .ok_or_else(|| Error::NumericOverflow {
                    message: format!("{} has too many digits", text),
                })?;
        }
        Ok(Self {
            unscaled: if negative { -unscaled } else { unscaled },
            scale: frac_part.len() as u32,
        })
    }

    /// Rescale to `target`, rounding half away from zero when digits are
    /// dropped.
    fn rescale(self, target: u32) -> Result<i128> {
        let overflow = || Error::NumericOverflow {
            message: format!("value does not fit with scale {}", target),
        };
        if target >= self.scale {
            let factor = 10i128.checked_pow(target - self.scale).ok_or_else(overflow)?;
            self.unscaled.checked_mul(factor).ok_or_else(overflow)
        } else {
            // dropping more digits than an i128 holds leaves nothing
            let Some(factor) = 10i128.checked_pow(self.scale - target) else {
                return Ok(0);
            };
            let quotient = self.unscaled / factor;
            let remainder = (self.unscaled % factor).abs();
            if remainder >= factor - remainder {
                Ok(quotient + self.unscaled.signum())
            } else {
                Ok(quotient)
            }
        }
    }
}

/// Format `unscaled * 10^-scale` as a plain decimal string.
pub fn format_decimal(unscaled: i128, scale: u32) -> String {
    if scale == 0 {
        return unscaled.to_string();
    }
    let digits = unscaled.unsigned_abs().to_string();
    let scale = scale as usize;
    let padded = if digits.len() <= scale {
        format!("{}{}", "0".repeat(scale - digits.len() + 1), digits)
    } else {
        digits
    };
    let (int_part, frac_part) = padded.split_at(padded.len() - scale);
    let sign = if unscaled < 0 { "-" } else { "" };
    format!("{}{}.{}", sign, int_part, frac_part)
}

/// Converts field values to and from row data.
#[derive(Debug, Clone, Copy)]
pub struct DatatypeCoder {
    connection_charset: &'static Charset,
}

impl Default for DatatypeCoder {
    fn default() -> Self {
        Self::new(Charset::utf8())
    }
}

impl DatatypeCoder {
    /// Create a coder for a connection using `connection_charset`.
    pub fn new(connection_charset: &'static Charset) -> Self {
        Self { connection_charset }
    }

    pub fn connection_charset(&self) -> &'static Charset {
        self.connection_charset
    }

    /// Character set used for a field's character data. Fields in NONE
    /// use the connection character set.
    fn field_charset(&self, field: &FieldDescriptor) -> &'static Charset {
        match field.charset() {
            Some(cs) if cs.id() != CS_NONE => cs,
            _ => self.connection_charset,
        }
    }

    /// Decode a field. `None` is SQL NULL.
    pub fn decode(&self, field: &FieldDescriptor, data: Option<&[u8]>) -> Result<FbValue> {
        let Some(data) = data else {
            return Ok(FbValue::Null);
        };
        let scale = (-(field.scale as i32)).max(0) as u32;
        let value = match field.sql_type {
            SqlType::Boolean => FbValue::Boolean(fixed::<1>(data)?[0] != 0),
            SqlType::Short => {
                let v = i16::from_be_bytes(fixed(data)?);
                scaled(v as i128, scale).unwrap_or(FbValue::Short(v))
            }
            SqlType::Long => {
                let v = i32::from_be_bytes(fixed(data)?);
                scaled(v as i128, scale).unwrap_or(FbValue::Int(v))
            }
            SqlType::Int64 => {
                let v = i64::from_be_bytes(fixed(data)?);
                scaled(v as i128, scale).unwrap_or(FbValue::BigInt(v))
            }
            SqlType::Int128 => {
                let v = i128::from_be_bytes(fixed(data)?);
                if field.sub_type == 0 && scale == 0 {
                    FbValue::Int128(v)
                } else {
                    FbValue::Decimal(format_decimal(v, scale))
                }
            }
            SqlType::Float => FbValue::Float(f32::from_be_bytes(fixed(data)?)),
            SqlType::Double | SqlType::DFloat => FbValue::Double(f64::from_be_bytes(fixed(data)?)),
            SqlType::Date => FbValue::Date(date::decode_date(data)?),
            SqlType::Time => FbValue::Time(date::decode_time(data)?),
            SqlType::Timestamp => FbValue::Timestamp(date::decode_timestamp(data)?),
            SqlType::TimeTz | SqlType::TimeTzEx => {
                let mut buf = ReadBuffer::from_slice(data);
                let utc = date::decode_time(&buf.read_bytes(4)?)?;
                let zone_id = buf.read_u16_be()?;
                FbValue::TimeTz(ZonedValue { utc, zone_id })
            }
            SqlType::TimestampTz | SqlType::TimestampTzEx => {
                let mut buf = ReadBuffer::from_slice(data);
                let utc = date::decode_timestamp(&buf.read_bytes(8)?)?;
                let zone_id = buf.read_u16_be()?;
                FbValue::TimestampTz(ZonedValue { utc, zone_id })
            }
            SqlType::Text if field.is_db_key() => FbValue::RowId(Bytes::copy_from_slice(data)),
            SqlType::Text | SqlType::Varying => {
                let charset = self.field_charset(field);
                if charset.is_binary() && field.charset_id() == CS_BINARY {
                    FbValue::Bytes(Bytes::copy_from_slice(data))
                } else {
                    let mut s = charset.decode(data)?;
                    if field.sql_type == SqlType::Text && charset.max_bytes_per_char() > 1 {
                        // Server pads multi-byte CHAR to its byte length
                        let chars = (field.length / charset.max_bytes_per_char() as u32) as usize;
                        if let Some((idx, _)) = s.char_indices().nth(chars) {
                            s.truncate(idx);
                        }
                    }
                    FbValue::String(s)
                }
            }
            SqlType::Blob | SqlType::Array | SqlType::Quad => {
                FbValue::BlobId(ReadBuffer::from_slice(&fixed::<8>(data)?).read_u64_be()?)
            }
            SqlType::Null => FbValue::Null,
            SqlType::Dec16 | SqlType::Dec34 => {
                let decimal = DecFloat::decode(decimal_format(field.sql_type), data)?;
                if is_exact_numeric(field) {
                    FbValue::Decimal(format_decimal(decimal.to_unscaled(scale)?, scale))
                } else {
                    FbValue::Decimal(decimal.to_string())
                }
            }
        };
        Ok(value)
    }

    /// Encode a value for a field. NULL encodes as `None`.
    pub fn encode(&self, field: &FieldDescriptor, value: &FbValue) -> Result<Option<Bytes>> {
        if value.is_null() {
            return Ok(None);
        }
        let scale = (-(field.scale as i32)).max(0) as u32;
        let bytes = match field.sql_type {
            SqlType::Boolean => Bytes::copy_from_slice(&[value.to_bool()? as u8]),
            SqlType::Short | SqlType::Long | SqlType::Int64 | SqlType::Int128 => {
                let unscaled = self.unscaled_value(value, scale)?;
                encode_integer(field.sql_type, unscaled)?
            }
            SqlType::Float => match value {
                FbValue::Float(v) => Bytes::copy_from_slice(&v.to_be_bytes()),
                FbValue::Double(v) => Bytes::copy_from_slice(&(*v as f32).to_be_bytes()),
                other => Bytes::copy_from_slice(&(other.to_i64()? as f32).to_be_bytes()),
            },
            SqlType::Double | SqlType::DFloat => match value {
                FbValue::Float(v) => Bytes::copy_from_slice(&(*v as f64).to_be_bytes()),
                FbValue::Double(v) => Bytes::copy_from_slice(&v.to_be_bytes()),
                other => Bytes::copy_from_slice(&(other.to_i64()? as f64).to_be_bytes()),
            },
            SqlType::Date => match value {
                FbValue::Date(d) => Bytes::copy_from_slice(&date::encode_date(*d)),
                FbValue::Timestamp(ts) => Bytes::copy_from_slice(&date::encode_date(ts.date())),
                other => return Err(mismatch(other, "DATE")),
            },
            SqlType::Time => match value {
                FbValue::Time(t) => Bytes::copy_from_slice(&date::encode_time(*t)),
                FbValue::Timestamp(ts) => Bytes::copy_from_slice(&date::encode_time(ts.time())),
                other => return Err(mismatch(other, "TIME")),
            },
            SqlType::Timestamp => match value {
                FbValue::Timestamp(ts) => Bytes::copy_from_slice(&date::encode_timestamp(*ts)),
                FbValue::Date(d) => {
                    let midnight = d
                        .and_hms_opt(0, 0, 0)
                        .ok_or_else(|| mismatch(value, "TIMESTAMP"))?;
                    Bytes::copy_from_slice(&date::encode_timestamp(midnight))
                }
                other => return Err(mismatch(other, "TIMESTAMP")),
            },
            SqlType::TimeTz | SqlType::TimeTzEx => match value {
                FbValue::TimeTz(z) => encode_zoned(field.sql_type, &date::encode_time(z.utc), z),
                FbValue::TimestampTz(z) => {
                    encode_zoned(field.sql_type, &date::encode_time(z.utc.time()), z)
                }
                other => return Err(mismatch(other, "TIME WITH TIME ZONE")),
            },
            SqlType::TimestampTz | SqlType::TimestampTzEx => match value {
                FbValue::TimestampTz(z) => {
                    encode_zoned(field.sql_type, &date::encode_timestamp(z.utc), z)
                }
                other => return Err(mismatch(other, "TIMESTAMP WITH TIME ZONE")),
            },
            SqlType::Text | SqlType::Varying => self.encode_character(field, value)?,
            SqlType::Blob | SqlType::Array | SqlType::Quad => match value {
                FbValue::BlobId(id) => {
                    let mut buf = WriteBuffer::with_capacity(8);
                    buf.write_u64_be(*id);
                    buf.freeze()
                }
                other => return Err(mismatch(other, "BLOB id")),
            },
            SqlType::Dec16 | SqlType::Dec34 => {
                let format = decimal_format(field.sql_type);
                let decimal = if is_exact_numeric(field) {
                    let unscaled = self.unscaled_value(value, scale)?;
                    if unscaled.unsigned_abs() >= 10u128.pow(format.precision()) {
                        return Err(Error::NumericOverflow {
                            message: format!(
                                "{} has more than {} digits",
                                format_decimal(unscaled, scale),
                                format.precision()
                            ),
                        });
                    }
                    DecFloat::from_unscaled(unscaled, scale)
                } else {
                    self.decfloat_value(value)?
                };
                Bytes::from(decimal.encode(format)?)
            }
            SqlType::Null => {
                return Err(Error::UnsupportedType {
                    sql_type: SQL_NULL,
                })
            }
        };
        Ok(Some(bytes))
    }

    fn decfloat_value(&self, value: &FbValue) -> Result<DecFloat> {
        match value {
            FbValue::Decimal(s) | FbValue::String(s) => DecFloat::parse(s),
            // shortest exponent form round-trips through the decimal parser,
            // including inf and NaN
            FbValue::Float(v) => DecFloat::parse(&format!("{:e}", v)),
            FbValue::Double(v) => DecFloat::parse(&format!("{:e}", v)),
            other => Ok(DecFloat::from_unscaled(self.unscaled_value(other, 0)?, 0)),
        }
    }

    fn unscaled_value(&self, value: &FbValue, scale: u32) -> Result<i128> {
        let decimal = match value {
            FbValue::Boolean(b) => ScaledDecimal {
                unscaled: *b as i128,
                scale: 0,
            },
            FbValue::Short(v) => ScaledDecimal {
                unscaled: *v as i128,
                scale: 0,
            },
            FbValue::Int(v) => ScaledDecimal {
                unscaled: *v as i128,
                scale: 0,
            },
            FbValue::BigInt(v) => ScaledDecimal {
                unscaled: *v as i128,
                scale: 0,
            },
            FbValue::Int128(v) => ScaledDecimal {
                unscaled: *v,
                scale: 0,
            },
            FbValue::Decimal(s) | FbValue::String(s) => ScaledDecimal::parse(s)?,
            other => return Err(mismatch(other, "exact numeric")),
        };
        decimal.rescale(scale)
    }

    fn encode_character(&self, field: &FieldDescriptor, value: &FbValue) -> Result<Bytes> {
        let mut data = match value {
            FbValue::Bytes(b) | FbValue::RowId(b) => b.to_vec(),
            FbValue::String(s) | FbValue::Decimal(s) => self.field_charset(field).encode(s)?,
            other => self
                .field_charset(field)
                .encode(&other.to_string())?,
        };
        let capacity = field.length as usize;
        if data.len() > capacity {
            return Err(Error::StringTruncation {
                expected: capacity,
                actual: data.len(),
            });
        }
        if field.sql_type == SqlType::Text {
            data.resize(capacity, field.padding_byte());
        }
        Ok(Bytes::from(data))
    }
}

fn fixed<const N: usize>(data: &[u8]) -> Result<[u8; N]> {
    data.try_into().map_err(|_| {
        Error::protocol(format!(
            "Expected {} bytes of field data, got {}",
            N,
            data.len()
        ))
    })
}

fn decimal_format(sql_type: SqlType) -> DecimalFormat {
    if sql_type == SqlType::Dec16 {
        DecimalFormat::Decimal64
    } else {
        DecimalFormat::Decimal128
    }
}

/// NUMERIC and DECIMAL columns stored as decimal floating point.
fn is_exact_numeric(field: &FieldDescriptor) -> bool {
    field.scale != 0 || matches!(field.sub_type, SUBTYPE_NUMERIC | SUBTYPE_DECIMAL)
}

/// UTC value followed by the zone id; the extended forms add the offset in
/// minutes, which the server recomputes for named zones.
fn encode_zoned<T>(sql_type: SqlType, utc: &[u8], zoned: &ZonedValue<T>) -> Bytes {
    let mut buf = WriteBuffer::with_capacity(utc.len() + 4);
    buf.write_bytes(utc);
    buf.write_u16_be(zoned.zone_id);
    if matches!(sql_type, SqlType::TimeTzEx | SqlType::TimestampTzEx) {
        buf.write_u16_be(zoned.offset_minutes().unwrap_or(0) as i16 as u16);
    }
    buf.freeze()
}

fn scaled(unscaled: i128, scale: u32) -> Option<FbValue> {
    (scale > 0).then(|| FbValue::Decimal(format_decimal(unscaled, scale)))
}

fn encode_integer(sql_type: SqlType, unscaled: i128) -> Result<Bytes> {
    let overflow = |name: &str| Error::NumericOverflow {
        message: format!("{} out of range for {}", unscaled, name),
    };
    let bytes = match sql_type {
        SqlType::Short => Bytes::copy_from_slice(
            &i16::try_from(unscaled)
                .map_err(|_| overflow("SMALLINT"))?
                .to_be_bytes(),
        ),
        SqlType::Long => Bytes::copy_from_slice(
            &i32::try_from(unscaled)
                .map_err(|_| overflow("INTEGER"))?
                .to_be_bytes(),
        ),
        SqlType::Int64 => Bytes::copy_from_slice(
            &i64::try_from(unscaled)
                .map_err(|_| overflow("BIGINT"))?
                .to_be_bytes(),
        ),
        _ => Bytes::copy_from_slice(&unscaled.to_be_bytes()),
    };
    Ok(bytes)
}

fn mismatch(value: &FbValue, target: &str) -> Error {
    Error::type_conversion(format!("Cannot convert {:?} to {}", value, target))
}
