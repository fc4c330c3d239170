//! Error types for the Firebird core layer.
//!
//! Every error carries a stable numeric code (see [`Error::error_code`]) and
//! belongs to exactly one [`ErrorKind`], so callers can tell configuration
//! mistakes from absent capabilities, state violations, data problems and
//! errors reported by the server.

use std::io;
use std::panic::Location;
use std::time::Duration;
use thiserror::Error;

use crate::protocol::constants::*;
use crate::statement::{CallSite, TxStatementKind};

/// Result type alias for Firebird core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed configuration, reported at configuration or prepare time.
    Configuration,
    /// Well-formed request for a capability that is absent or switched off.
    FeatureNotSupported,
    /// Operation on a closed or otherwise unusable resource.
    State,
    /// Value does not fit or cannot be represented.
    Data,
    /// Lock or update conflict with a concurrent transaction.
    Conflict,
    /// Any other error reported by the server.
    Server,
    /// Transport level failure (I/O, timeout, closed connection).
    Connection,
    /// Malformed wire data.
    Protocol,
    /// Invalid arguments supplied by the caller.
    Usage,
}

/// Why a generated-keys request cannot be served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnsupportedReason {
    /// Switched off through the `generatedKeysEnabled` connection property.
    ExplicitlyDisabled,
    /// The server version has no `RETURNING` clause.
    NoReturningSupport,
}

impl UnsupportedReason {
    /// Human readable reason text.
    pub fn message(&self) -> &'static str {
        match self {
            UnsupportedReason::ExplicitlyDisabled => "disabled through connection property",
            UnsupportedReason::NoReturningSupport => {
                "This version of Firebird does not support retrieving generated keys \
                 (support was added in Firebird 2.0)"
            }
        }
    }
}

impl std::fmt::Display for UnsupportedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Error type for Firebird core operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error during network communication.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid configuration value or flag.
    #[error("Configuration error: {message}")]
    Configuration { code: u32, message: String },

    /// Generated keys were requested but cannot be produced.
    #[error("Generated keys functionality not available, reason: {reason}")]
    GeneratedKeysNotSupported { reason: UnsupportedReason },

    /// A transaction management statement was used where it is not permitted.
    #[error("{}", tx_statement_message(.statement, .call_site))]
    TxStatementNotAllowed {
        statement: TxStatementKind,
        call_site: CallSite,
    },

    /// Operation on a blob that was closed explicitly or by transaction end.
    #[error("Blob already closed")]
    BlobClosed,

    /// Read from a blob stream whose blob is no longer open.
    #[error("Stream already closed")]
    StreamClosed,

    /// Blob operation not valid for the blob's current mode or state.
    #[error("Invalid blob state: {message}")]
    InvalidBlobState { code: u32, message: String },

    /// String value longer than the declared byte length of the field.
    #[error("String truncation: expected data length {expected} bytes, actual {actual} bytes")]
    StringTruncation { expected: usize, actual: usize },

    /// Character without representation in the target character set.
    #[error("Cannot transliterate character {character:?} to character set {charset}")]
    TransliterationFailed { charset: &'static str, character: char },

    /// Numeric value out of range for the target field.
    #[error("Arithmetic overflow: {message}")]
    NumericOverflow { message: String },

    /// Error reported by the server, passed through unchanged.
    #[error("Server error {code}: {message}")]
    Server { code: u32, message: String },

    /// Network read did not complete within the configured socket timeout.
    #[error("Socket read timed out after {timeout:?}")]
    SocketTimeout { timeout: Duration },

    /// Connection closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Protocol error.
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// Buffer too small.
    #[error("Buffer too small: need {needed} bytes, have {available} filed at {location}")]
    BufferTooSmall {
        needed: usize,
        available: usize,
        location: &'static Location<'static>,
    },

    /// Type conversion error.
    #[error("Type conversion error: {message}")]
    TypeConversion { message: String },

    /// Unsupported Firebird data type.
    #[error("Unsupported Firebird data type: {sql_type}")]
    UnsupportedType { sql_type: u16 },

    /// Column index out of bounds.
    #[error("Column index {index} out of bounds (columns: {count})")]
    ColumnIndexOutOfBounds { index: usize, count: usize },

    /// Invalid argument supplied by the caller.
    #[error("{message}")]
    Usage { code: u32, message: String },

    /// Batch execution stopped at a failing statement.
    #[error("Batch execution failed after {} statement(s): {source}", .update_counts.len())]
    Batch {
        update_counts: Vec<i64>,
        #[source]
        source: Box<Error>,
    },
}

fn tx_statement_message(statement: &TxStatementKind, call_site: &CallSite) -> String {
    match call_site {
        CallSite::ExecuteQuery => {
            format!("{} statement cannot be executed through executeQuery", statement)
        }
        CallSite::AddBatch => {
            format!("{} statement cannot be added to a batch", statement)
        }
        CallSite::PrepareCall => {
            format!("{} statement cannot be prepared as a callable statement", statement)
        }
        CallSite::Execute | CallSite::PrepareStatement => format!(
            "{} statement not allowed; use the connection API or set allowTxStmts=true",
            statement
        ),
    }
}

impl Error {
    /// Create a configuration error.
    pub fn configuration(code: u32, message: impl Into<String>) -> Self {
        Self::Configuration {
            code,
            message: message.into(),
        }
    }

    /// Create a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Create a server error.
    pub fn server(code: u32, message: impl Into<String>) -> Self {
        Self::Server {
            code,
            message: message.into(),
        }
    }

    /// Create a type conversion error.
    pub fn type_conversion(message: impl Into<String>) -> Self {
        Self::TypeConversion {
            message: message.into(),
        }
    }

    /// Create a usage error.
    pub fn usage(code: u32, message: impl Into<String>) -> Self {
        Self::Usage {
            code,
            message: message.into(),
        }
    }

    /// Create a blob state error.
    pub fn blob_state(code: u32, message: impl Into<String>) -> Self {
        Self::InvalidBlobState {
            code,
            message: message.into(),
        }
    }

    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Configuration { .. } => ErrorKind::Configuration,
            Error::GeneratedKeysNotSupported { .. } => ErrorKind::FeatureNotSupported,
            Error::TxStatementNotAllowed { call_site, .. } => match call_site {
                CallSite::AddBatch | CallSite::PrepareCall => ErrorKind::FeatureNotSupported,
                _ => ErrorKind::Usage,
            },
            Error::BlobClosed | Error::StreamClosed | Error::InvalidBlobState { .. } => {
                ErrorKind::State
            }
            Error::StringTruncation { .. }
            | Error::TransliterationFailed { .. }
            | Error::NumericOverflow { .. }
            | Error::TypeConversion { .. } => ErrorKind::Data,
            Error::Server { .. } if self.is_conflict() => ErrorKind::Conflict,
            Error::Server { .. } => ErrorKind::Server,
            Error::Io(_) | Error::SocketTimeout { .. } | Error::ConnectionClosed => {
                ErrorKind::Connection
            }
            Error::Protocol { .. } | Error::BufferTooSmall { .. } => ErrorKind::Protocol,
            Error::UnsupportedType { .. } => ErrorKind::FeatureNotSupported,
            Error::ColumnIndexOutOfBounds { .. } | Error::Usage { .. } => ErrorKind::Usage,
            Error::Batch { source, .. } => source.kind(),
        }
    }

    /// Stable identifying code of this error.
    ///
    /// Server conditions use the Firebird ISC code; client-side conditions
    /// use the `JB_*` codes from [`crate::protocol::constants`].
    pub fn error_code(&self) -> u32 {
        match self {
            Error::Io(_) => ISC_NET_READ_ERR,
            Error::Configuration { code, .. } => *code,
            Error::GeneratedKeysNotSupported { .. } => JB_GENERATED_KEYS_SUPPORT_NOT_AVAILABLE,
            Error::TxStatementNotAllowed {
                statement,
                call_site,
            } => match call_site {
                CallSite::ExecuteQuery => JB_EXECUTE_QUERY_WITH_TX_STMT,
                CallSite::AddBatch => JB_ADD_BATCH_WITH_TX_STMT,
                CallSite::PrepareCall => JB_PREPARE_CALL_WITH_TX_STMT,
                CallSite::Execute | CallSite::PrepareStatement => match statement {
                    TxStatementKind::Commit => JB_COMMIT_STATEMENT_NOT_ALLOWED,
                    TxStatementKind::Rollback => JB_ROLLBACK_STATEMENT_NOT_ALLOWED,
                    TxStatementKind::SetTransaction => JB_SET_TRANSACTION_STATEMENT_NOT_ALLOWED,
                },
            },
            Error::BlobClosed => ISC_BAD_SEGSTR_HANDLE,
            Error::StreamClosed => JB_STREAM_CLOSED,
            Error::InvalidBlobState { code, .. } => *code,
            Error::StringTruncation { .. } => ISC_STRING_TRUNCATION,
            Error::TransliterationFailed { .. } => ISC_TRANSLITERATION_FAILED,
            Error::NumericOverflow { .. } => ISC_ARITH_EXCEPT,
            Error::Server { code, .. } => *code,
            Error::SocketTimeout { .. } => ISC_NET_READ_ERR,
            Error::ConnectionClosed => ISC_NET_READ_ERR,
            Error::Protocol { .. } | Error::BufferTooSmall { .. } => JB_PROTOCOL_ERROR,
            Error::TypeConversion { .. } => JB_TYPE_CONVERSION,
            Error::UnsupportedType { .. } => JB_UNSUPPORTED_DATA_TYPE,
            Error::ColumnIndexOutOfBounds { .. } => JB_INVALID_COLUMN_INDEX,
            Error::Usage { code, .. } => *code,
            Error::Batch { .. } => JB_BATCH_UPDATE_FAILED,
        }
    }

    /// Whether this is a lock or update conflict with another transaction.
    ///
    /// Conflicts are never retried by this crate.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Error::Server { code, .. }
                if matches!(*code, ISC_LOCK_CONFLICT | ISC_UPDATE_CONFLICT | ISC_DEADLOCK)
        )
    }

    /// Reason attached to a generated-keys capability error.
    pub fn unsupported_reason(&self) -> Option<UnsupportedReason> {
        match self {
            Error::GeneratedKeysNotSupported { reason } => Some(*reason),
            _ => None,
        }
    }
}
