//! Firebird SQL data types as reported in statement descriptors.
//!
//! Note: Nullability is encoded in the low bit of the raw type code and is a
//! field property, not a type property; [`SqlType::from_raw`] ignores it.

use crate::error::{Error, Result};
use crate::protocol::constants::*;

/// Firebird SQL type (XSQLVAR `sqltype`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Text,
    Varying,
    Short,
    Long,
    Float,
    Double,
    DFloat,
    Timestamp,
    Blob,
    Array,
    Quad,
    Time,
    Date,
    Int64,
    Int128,
    TimestampTz,
    TimeTz,
    TimestampTzEx,
    TimeTzEx,
    Dec16,
    Dec34,
    Boolean,
    Null,
}

impl SqlType {
    /// Create from a raw type code, ignoring the nullable bit.
    pub fn from_raw(raw: u16) -> Result<Self> {
        let t = match raw & !1 {
            SQL_TEXT => SqlType::Text,
            SQL_VARYING => SqlType::Varying,
            SQL_SHORT => SqlType::Short,
            SQL_LONG => SqlType::Long,
            SQL_FLOAT => SqlType::Float,
            SQL_DOUBLE => SqlType::Double,
            SQL_D_FLOAT => SqlType::DFloat,
            SQL_TIMESTAMP => SqlType::Timestamp,
            SQL_BLOB => SqlType::Blob,
            SQL_ARRAY => SqlType::Array,
            SQL_QUAD => SqlType::Quad,
            SQL_TYPE_TIME => SqlType::Time,
            SQL_TYPE_DATE => SqlType::Date,
            SQL_INT64 => SqlType::Int64,
            SQL_INT128 => SqlType::Int128,
            SQL_TIMESTAMP_TZ => SqlType::TimestampTz,
            SQL_TIME_TZ => SqlType::TimeTz,
            SQL_TIMESTAMP_TZ_EX => SqlType::TimestampTzEx,
            SQL_TIME_TZ_EX => SqlType::TimeTzEx,
            SQL_DEC16 => SqlType::Dec16,
            SQL_DEC34 => SqlType::Dec34,
            SQL_BOOLEAN => SqlType::Boolean,
            SQL_NULL => SqlType::Null,
            other => return Err(Error::UnsupportedType { sql_type: other }),
        };
        Ok(t)
    }

    /// Raw type code with the nullable bit cleared.
    pub fn type_code(&self) -> u16 {
        match self {
            SqlType::Text => SQL_TEXT,
            SqlType::Varying => SQL_VARYING,
            SqlType::Short => SQL_SHORT,
            SqlType::Long => SQL_LONG,
            SqlType::Float => SQL_FLOAT,
            SqlType::Double => SQL_DOUBLE,
            SqlType::DFloat => SQL_D_FLOAT,
            SqlType::Timestamp => SQL_TIMESTAMP,
            SqlType::Blob => SQL_BLOB,
            SqlType::Array => SQL_ARRAY,
            SqlType::Quad => SQL_QUAD,
            SqlType::Time => SQL_TYPE_TIME,
            SqlType::Date => SQL_TYPE_DATE,
            SqlType::Int64 => SQL_INT64,
            SqlType::Int128 => SQL_INT128,
            SqlType::TimestampTz => SQL_TIMESTAMP_TZ,
            SqlType::TimeTz => SQL_TIME_TZ,
            SqlType::TimestampTzEx => SQL_TIMESTAMP_TZ_EX,
            SqlType::TimeTzEx => SQL_TIME_TZ_EX,
            SqlType::Dec16 => SQL_DEC16,
            SqlType::Dec34 => SQL_DEC34,
            SqlType::Boolean => SQL_BOOLEAN,
            SqlType::Null => SQL_NULL,
        }
    }

    /// Whether values of this type can be negative.
    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            SqlType::Short
                | SqlType::Long
                | SqlType::Float
                | SqlType::Double
                | SqlType::DFloat
                | SqlType::Int64
                | SqlType::Int128
                | SqlType::Dec16
                | SqlType::Dec34
        )
    }

    /// Whether this is an exact integer storage type usable for
    /// NUMERIC/DECIMAL.
    pub fn is_fixed_point_storage(&self) -> bool {
        matches!(
            self,
            SqlType::Short | SqlType::Long | SqlType::Int64 | SqlType::Int128
        )
    }

    /// Whether this type holds character data.
    pub fn is_character(&self) -> bool {
        matches!(self, SqlType::Text | SqlType::Varying)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_ignores_nullable_bit() {
        assert_eq!(SqlType::from_raw(SQL_BOOLEAN).unwrap(), SqlType::Boolean);
        assert_eq!(SqlType::from_raw(SQL_BOOLEAN + 1).unwrap(), SqlType::Boolean);
        assert_eq!(SqlType::from_raw(SQL_INT128 | 1).unwrap(), SqlType::Int128);
    }

    #[test]
    fn test_from_raw_unsupported() {
        match SqlType::from_raw(12) {
            Err(Error::UnsupportedType { sql_type }) => assert_eq!(sql_type, 12),
            other => panic!("Expected UnsupportedType error, got {:?}", other),
        }
    }

    #[test]
    fn test_type_code_round_trip() {
        for raw in [SQL_TEXT, SQL_VARYING, SQL_DEC34, SQL_TIME_TZ, SQL_NULL] {
            assert_eq!(SqlType::from_raw(raw).unwrap().type_code(), raw);
        }
    }

    #[test]
    fn test_signedness() {
        assert!(SqlType::Int128.is_signed());
        assert!(SqlType::Dec16.is_signed());
        assert!(!SqlType::Boolean.is_signed());
        assert!(!SqlType::Varying.is_signed());
    }
}
