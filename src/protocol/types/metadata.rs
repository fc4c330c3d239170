//! Externally visible column and parameter metadata.
//!
//! Maps a [`FieldDescriptor`] to the JDBC view of the field: type code, type
//! name, precision, scale, signedness and the host type values are read as.

use crate::protocol::constants::*;

use super::descriptor::FieldDescriptor;
use super::sql_type::SqlType;

/// Host representation a field's values are exposed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostType {
    String,
    Boolean,
    Short,
    Int,
    Long,
    /// Exact decimal, exposed as a string with the field's scale.
    Decimal,
    Float,
    Double,
    Date,
    Time,
    Timestamp,
    TimeWithTimeZone,
    TimestampWithTimeZone,
    Bytes,
    /// Byte-array-like stream (binary blob).
    BinaryStream,
    /// Character stream decoded with the field's character set (text blob).
    CharacterStream,
    /// Blob handle with no text or binary assumption.
    BlobHandle,
    RowId,
    Array,
    Null,
}

/// Whether a field accepts NULL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nullability {
    NoNulls,
    Nullable,
}

/// JDBC view of a result column or statement parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMetadata {
    /// Column alias (empty for parameters).
    pub label: String,
    /// Underlying column name.
    pub column_name: String,
    pub table_name: String,
    /// `java.sql.Types` code.
    pub jdbc_type: i32,
    pub type_name: String,
    pub precision: u32,
    pub scale: i32,
    pub signed: bool,
    pub nullability: Nullability,
    pub host_type: HostType,
    /// Character set name for character data.
    pub charset: Option<&'static str>,
}

impl FieldMetadata {
    /// Metadata of a result column.
    pub fn for_column(field: &FieldDescriptor) -> Self {
        Self::build(field, false)
    }

    /// Metadata of a statement parameter.
    ///
    /// A `RDB$DB_KEY` parameter is reported as fixed-length BINARY, not
    /// ROWID.
    pub fn for_parameter(field: &FieldDescriptor) -> Self {
        Self::build(field, true)
    }

    fn build(field: &FieldDescriptor, parameter: bool) -> Self {
        let (jdbc_type, type_name, host_type) = if field.is_db_key() {
            if parameter {
                (JDBC_BINARY, "CHAR".to_string(), HostType::Bytes)
            } else {
                (JDBC_ROWID, "CHAR".to_string(), HostType::RowId)
            }
        } else {
            map_type(field)
        };
        let charset = match field.sql_type {
            SqlType::Text | SqlType::Varying => field.charset().map(|c| c.name()),
            SqlType::Blob if field.sub_type == BLOB_SUB_TYPE_TEXT => {
                field.charset().map(|c| c.name())
            }
            _ => None,
        };
        Self {
            label: field.field_name.clone(),
            column_name: field.original_name.clone(),
            table_name: field.relation_name.clone(),
            jdbc_type,
            type_name,
            precision: precision(field, jdbc_type),
            scale: -(field.scale as i32),
            signed: field.sql_type.is_signed(),
            nullability: if field.nullable {
                Nullability::Nullable
            } else {
                Nullability::NoNulls
            },
            host_type,
            charset,
        }
    }

    /// Whether the field is nullable.
    pub fn is_nullable(&self) -> bool {
        self.nullability == Nullability::Nullable
    }
}

fn is_scaled_numeric(field: &FieldDescriptor) -> bool {
    match field.sql_type {
        SqlType::Short | SqlType::Long | SqlType::Int64 | SqlType::Int128 => {
            field.sub_type == SUBTYPE_NUMERIC
                || field.sub_type == SUBTYPE_DECIMAL
                || field.scale < 0
        }
        SqlType::Double | SqlType::Dec16 | SqlType::Dec34 => {
            field.sub_type == SUBTYPE_NUMERIC || field.sub_type == SUBTYPE_DECIMAL
        }
        _ => false,
    }
}

fn map_type(field: &FieldDescriptor) -> (i32, String, HostType) {
    if is_scaled_numeric(field) {
        let (code, name) = if field.sub_type == SUBTYPE_DECIMAL {
            (JDBC_DECIMAL, "DECIMAL")
        } else {
            (JDBC_NUMERIC, "NUMERIC")
        };
        return (code, name.to_string(), HostType::Decimal);
    }

    let (code, name, host) = match field.sql_type {
        SqlType::Text => {
            if field.charset_id() == CS_BINARY {
                (JDBC_BINARY, "CHAR", HostType::Bytes)
            } else {
                (JDBC_CHAR, "CHAR", HostType::String)
            }
        }
        SqlType::Varying => {
            if field.charset_id() == CS_BINARY {
                (JDBC_VARBINARY, "VARCHAR", HostType::Bytes)
            } else {
                (JDBC_VARCHAR, "VARCHAR", HostType::String)
            }
        }
        SqlType::Short => (JDBC_SMALLINT, "SMALLINT", HostType::Short),
        SqlType::Long => (JDBC_INTEGER, "INTEGER", HostType::Int),
        SqlType::Int64 => (JDBC_BIGINT, "BIGINT", HostType::Long),
        SqlType::Int128 => (JDBC_NUMERIC, "INT128", HostType::Decimal),
        SqlType::Float => (JDBC_FLOAT, "FLOAT", HostType::Float),
        SqlType::Double | SqlType::DFloat => (JDBC_DOUBLE, "DOUBLE PRECISION", HostType::Double),
        SqlType::Dec16 | SqlType::Dec34 => (JDBC_DECFLOAT, "DECFLOAT", HostType::Decimal),
        SqlType::Date => (JDBC_DATE, "DATE", HostType::Date),
        SqlType::Time => (JDBC_TIME, "TIME", HostType::Time),
        SqlType::Timestamp => (JDBC_TIMESTAMP, "TIMESTAMP", HostType::Timestamp),
        SqlType::TimeTz | SqlType::TimeTzEx => (
            JDBC_TIME_WITH_TIMEZONE,
            "TIME WITH TIME ZONE",
            HostType::TimeWithTimeZone,
        ),
        SqlType::TimestampTz | SqlType::TimestampTzEx => (
            JDBC_TIMESTAMP_WITH_TIMEZONE,
            "TIMESTAMP WITH TIME ZONE",
            HostType::TimestampWithTimeZone,
        ),
        SqlType::Boolean => (JDBC_BOOLEAN, "BOOLEAN", HostType::Boolean),
        SqlType::Blob => {
            return match field.sub_type {
                BLOB_SUB_TYPE_TEXT => (
                    JDBC_LONGVARCHAR,
                    "BLOB SUB_TYPE TEXT".to_string(),
                    HostType::CharacterStream,
                ),
                BLOB_SUB_TYPE_BINARY => (
                    JDBC_LONGVARBINARY,
                    "BLOB SUB_TYPE BINARY".to_string(),
                    HostType::BinaryStream,
                ),
                sub if sub < 0 => (
                    JDBC_BLOB,
                    format!("BLOB SUB_TYPE {}", sub),
                    HostType::BlobHandle,
                ),
                sub => (
                    JDBC_LONGVARBINARY,
                    format!("BLOB SUB_TYPE {}", sub),
                    HostType::BinaryStream,
                ),
            }
        }
        SqlType::Array => (JDBC_ARRAY, "ARRAY", HostType::Array),
        SqlType::Quad => (JDBC_OTHER, "QUAD", HostType::Bytes),
        SqlType::Null => (JDBC_NULL, "NULL", HostType::Null),
    };
    (code, name.to_string(), host)
}

/// Precision of an exact numeric, estimated from its storage type.
///
/// Storage wider than 64 bits reports the widened precision of the server
/// regardless of what was declared.
fn numeric_precision(field: &FieldDescriptor) -> u32 {
    match field.sql_type {
        SqlType::Int128 => 38,
        SqlType::Dec34 => 34,
        SqlType::Dec16 => 16,
        _ => {
            if let Some(declared) = field.declared_precision {
                return declared as u32;
            }
            match field.sql_type {
                SqlType::Short => 4,
                SqlType::Long => 9,
                _ => 18,
            }
        }
    }
}

fn precision(field: &FieldDescriptor, jdbc_type: i32) -> u32 {
    match jdbc_type {
        JDBC_NUMERIC | JDBC_DECIMAL => numeric_precision(field),
        JDBC_CHAR | JDBC_VARCHAR => {
            let max = field.charset().map(|c| c.max_bytes_per_char()).unwrap_or(1) as u32;
            field.length / max.max(1)
        }
        JDBC_BINARY | JDBC_VARBINARY | JDBC_ROWID => field.length,
        JDBC_FLOAT => {
            // Binary precision of 24 bits reported as 7 decimal digits
            7
        }
        JDBC_DOUBLE => 15,
        JDBC_INTEGER => 10,
        JDBC_BIGINT => 19,
        JDBC_SMALLINT => 5,
        JDBC_DATE => 10,
        JDBC_TIME => 8,
        JDBC_TIMESTAMP => 19,
        JDBC_TIME_WITH_TIMEZONE => 19,
        JDBC_TIMESTAMP_WITH_TIMEZONE => 30,
        JDBC_BOOLEAN => 1,
        JDBC_DECFLOAT => match field.sql_type {
            SqlType::Dec16 => 16,
            _ => 34,
        },
        _ => 0,
    }
}
