//! Firebird core protocol layer for Rust
//!
//! The connection-independent core of a Firebird client: field descriptors
//! and value conversion, parameter buffers, statement classification and
//! generated keys support, transaction-bound blob transfer and result set
//! behaviour. Network transport plugs in through [`blob::BlobChannel`] and
//! [`statement::StatementExecutor`].
//!
//! # Example
//!
//! ```no_run
//! use firebird_core_rs::{ConnectionProperties, KeyRequest, Result, ServerCapabilities};
//!
//! fn main() -> Result<()> {
//!     let props = ConnectionProperties::from_map([
//!         ("user", "SYSDBA"),
//!         ("generatedKeysEnabled", "insert,update"),
//!     ])?;
//!
//!     let support = props.generated_keys_support(&ServerCapabilities::new(4, 0));
//!     let query = support.build_query(
//!         "INSERT INTO employee (name) VALUES (?)",
//!         &KeyRequest::ReturnGeneratedKeys,
//!         &(),
//!     )?;
//!     println!("{}", query.sql());
//!
//!     Ok(())
//! }
//! ```

pub mod blob;
pub mod error;
pub mod properties;
pub mod protocol;
pub mod result_set;
pub mod statement;
pub mod transaction;
pub mod warning;

// Re-export main types
pub use blob::{BlobChannel, BlobInputStream, BlobOutputStream, CachedBlob, LiveBlob};
pub use error::{Error, ErrorKind, Result};
pub use properties::{ConnectionProperties, ScrollableCursor};
pub use protocol::types::{
    Charset, DatatypeCoder, DecFloat, FbValue, FieldDescriptor, FieldMetadata, Row, RowDescriptor,
    SqlType, ZonedValue,
};
pub use protocol::{IsolationLevel, ParameterBuffer, ServerCapabilities, TpbMapper};
pub use result_set::{Concurrency, Holdability, ResultSetBehavior, ResultSetType};
pub use statement::{
    check_statement, classify, CallSite, GeneratedKeysSupport, KeyRequest, StatementBatch,
    StatementKind,
};
pub use transaction::{ResourceBinding, TransactionRegistry};
pub use warning::{Warning, WarningChain};
