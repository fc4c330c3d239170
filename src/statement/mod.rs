//! Statement level SQL handling: classification, the transaction statement
//! guard, generated keys rewriting and batches.

pub mod batch;
pub mod detector;
pub mod generated_keys;
pub mod tx_guard;

pub use batch::{StatementBatch, StatementExecutor};
pub use detector::{classify, StatementInfo, StatementKind, TxStatementKind};
pub use generated_keys::{
    ColumnCatalog, GeneratedKeysConfig, GeneratedKeysQuery, GeneratedKeysSupport, KeyRequest,
};
pub use tx_guard::{check_statement, CallSite};
