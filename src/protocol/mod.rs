//! Firebird protocol codecs used by the core layer.

pub mod buffer;
pub mod capabilities;
pub mod constants;
pub mod info;
pub mod parameter_buffer;
pub mod tpb;
pub mod types;

pub use buffer::{ReadBuffer, WriteBuffer};
pub use capabilities::{ReturningKind, ServerCapabilities};
pub use info::BlobInfo;
pub use parameter_buffer::{BufferKind, Parameter, ParameterBuffer, ParameterValue};
pub use tpb::{IsolationLevel, TableLockMode, TpbMapper, TransactionParameters};
pub use types::{
    Charset, DatatypeCoder, FbValue, FieldDescriptor, FieldMetadata, Row, RowDescriptor, SqlType,
};
