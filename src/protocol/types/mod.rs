//! Firebird data types, descriptors and field values.

mod date;
mod decfloat;
mod descriptor;
mod encoding;
mod metadata;
mod row;
mod sql_type;
mod value;

pub use date::{
    decode_date, decode_time, decode_timestamp, encode_date, encode_time, encode_timestamp,
};
pub use decfloat::{DecFloat, DecimalFormat};
pub use descriptor::{FieldDescriptor, RowDescriptor, RowDescriptorBuilder, DB_KEY_NAME};
pub use encoding::Charset;
pub use metadata::{FieldMetadata, HostType, Nullability};
pub use row::Row;
pub use sql_type::SqlType;
pub use value::{format_decimal, DatatypeCoder, FbValue, ZonedValue};
