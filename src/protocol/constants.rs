//! Firebird protocol constants.

// SQL type codes (XSQLVAR sqltype with the nullable bit cleared)
pub const SQL_TEXT: u16 = 452;
pub const SQL_VARYING: u16 = 448;
pub const SQL_SHORT: u16 = 500;
pub const SQL_LONG: u16 = 496;
pub const SQL_FLOAT: u16 = 482;
pub const SQL_DOUBLE: u16 = 480;
pub const SQL_D_FLOAT: u16 = 530;
pub const SQL_TIMESTAMP: u16 = 510;
pub const SQL_BLOB: u16 = 520;
pub const SQL_ARRAY: u16 = 540;
pub const SQL_QUAD: u16 = 550;
pub const SQL_TYPE_TIME: u16 = 560;
pub const SQL_TYPE_DATE: u16 = 570;
pub const SQL_INT64: u16 = 580;
pub const SQL_TIMESTAMP_TZ_EX: u16 = 32748;
pub const SQL_TIME_TZ_EX: u16 = 32750;
pub const SQL_INT128: u16 = 32752;
pub const SQL_TIMESTAMP_TZ: u16 = 32754;
pub const SQL_TIME_TZ: u16 = 32756;
pub const SQL_DEC16: u16 = 32760;
pub const SQL_DEC34: u16 = 32762;
pub const SQL_BOOLEAN: u16 = 32764;
pub const SQL_NULL: u16 = 32766;

// Numeric subtypes
pub const SUBTYPE_NUMERIC: i16 = 1;
pub const SUBTYPE_DECIMAL: i16 = 2;

// Blob subtypes
pub const BLOB_SUB_TYPE_BINARY: i16 = 0;
pub const BLOB_SUB_TYPE_TEXT: i16 = 1;

// Character set ids
pub const CS_NONE: u8 = 0;
pub const CS_BINARY: u8 = 1;
pub const CS_ASCII: u8 = 2;
pub const CS_UNICODE_FSS: u8 = 3;
pub const CS_UTF8: u8 = 4;
pub const CS_ISO8859_1: u8 = 21;
pub const CS_WIN1252: u8 = 53;

// Parameter buffer versions
pub const ISC_DPB_VERSION1: u8 = 1;
pub const ISC_TPB_VERSION3: u8 = 3;

// DPB items
pub const ISC_DPB_PAGE_SIZE: u8 = 4;
pub const ISC_DPB_NUM_BUFFERS: u8 = 5;
pub const ISC_DPB_SQL_ROLE_NAME: u8 = 60;
pub const ISC_DPB_USER_NAME: u8 = 28;
pub const ISC_DPB_PASSWORD: u8 = 29;
pub const ISC_DPB_LC_CTYPE: u8 = 48;
pub const ISC_DPB_CONNECT_TIMEOUT: u8 = 57;
pub const ISC_DPB_SQL_DIALECT: u8 = 63;
pub const ISC_DPB_PROCESS_ID: u8 = 71;
pub const ISC_DPB_NO_DB_TRIGGERS: u8 = 72;
pub const ISC_DPB_PROCESS_NAME: u8 = 74;
pub const ISC_DPB_UTF8_FILENAME: u8 = 77;
pub const ISC_DPB_HOST_NAME: u8 = 90;
pub const ISC_DPB_OS_USER: u8 = 91;

// TPB items
pub const ISC_TPB_CONSISTENCY: u8 = 1;
pub const ISC_TPB_CONCURRENCY: u8 = 2;
pub const ISC_TPB_SHARED: u8 = 3;
pub const ISC_TPB_PROTECTED: u8 = 4;
pub const ISC_TPB_EXCLUSIVE: u8 = 5;
pub const ISC_TPB_WAIT: u8 = 6;
pub const ISC_TPB_NOWAIT: u8 = 7;
pub const ISC_TPB_READ: u8 = 8;
pub const ISC_TPB_WRITE: u8 = 9;
pub const ISC_TPB_LOCK_READ: u8 = 10;
pub const ISC_TPB_LOCK_WRITE: u8 = 11;
pub const ISC_TPB_VERB_TIME: u8 = 12;
pub const ISC_TPB_COMMIT_TIME: u8 = 13;
pub const ISC_TPB_IGNORE_LIMBO: u8 = 14;
pub const ISC_TPB_READ_COMMITTED: u8 = 15;
pub const ISC_TPB_AUTOCOMMIT: u8 = 16;
pub const ISC_TPB_REC_VERSION: u8 = 17;
pub const ISC_TPB_NO_REC_VERSION: u8 = 18;
pub const ISC_TPB_RESTART_REQUESTS: u8 = 19;
pub const ISC_TPB_NO_AUTO_UNDO: u8 = 20;
pub const ISC_TPB_LOCK_TIMEOUT: u8 = 21;
pub const ISC_TPB_READ_CONSISTENCY: u8 = 22;

// Info items
pub const ISC_INFO_END: u8 = 1;
pub const ISC_INFO_TRUNCATED: u8 = 2;
pub const ISC_INFO_ERROR: u8 = 3;
pub const ISC_INFO_BLOB_NUM_SEGMENTS: u8 = 4;
pub const ISC_INFO_BLOB_MAX_SEGMENT: u8 = 5;
pub const ISC_INFO_BLOB_TOTAL_LENGTH: u8 = 6;
pub const ISC_INFO_BLOB_TYPE: u8 = 7;

// Blob seek modes
pub const BLOB_SEEK_ABSOLUTE: i32 = 0;
pub const BLOB_SEEK_RELATIVE: i32 = 1;
pub const BLOB_SEEK_FROM_TAIL: i32 = 2;

/// Largest segment a single put/get segment call transfers.
pub const MAX_BLOB_SEGMENT_SIZE: usize = 32765;
/// Default buffer size for blob streams.
pub const DEFAULT_BLOB_BUFFER_SIZE: usize = 16384;

// ISC error codes
pub const ISC_ARITH_EXCEPT: u32 = 335544321;
pub const ISC_BAD_SEGSTR_HANDLE: u32 = 335544328;
pub const ISC_BAD_SEGSTR_ID: u32 = 335544329;
pub const ISC_DEADLOCK: u32 = 335544336;
pub const ISC_LOCK_CONFLICT: u32 = 335544345;
pub const ISC_NO_SEGSTR_CLOSE: u32 = 335544355;
pub const ISC_SEGSTR_EOF: u32 = 335544367;
pub const ISC_SEGSTR_NO_OP: u32 = 335544368;
pub const ISC_SEGSTR_NO_READ: u32 = 335544369;
pub const ISC_SEGSTR_NO_TRANS: u32 = 335544370;
pub const ISC_SEGSTR_NO_WRITE: u32 = 335544371;
pub const ISC_SEGSTR_WRONG_DB: u32 = 335544372;
pub const ISC_UPDATE_CONFLICT: u32 = 335544451;
pub const ISC_BAD_SEGSTR_TYPE: u32 = 335544465;
pub const ISC_TRANSLITERATION_FAILED: u32 = 335544565;
pub const ISC_NET_READ_ERR: u32 = 335544726;
pub const ISC_STRING_TRUNCATION: u32 = 335544914;

// Client-side error and warning codes
pub const JB_GENERATED_KEYS_SUPPORT_NOT_AVAILABLE: u32 = 337248273;
pub const JB_GENERATED_KEYS_ARRAY_EMPTY_OR_NULL: u32 = 337248274;
pub const JB_GENERATED_KEYS_INVALID_COLUMN_POSITION: u32 = 337248275;
pub const JB_GENERATED_KEYS_NO_COLUMNS_FOUND: u32 = 337248276;
pub const JB_RESULT_SET_TYPE_DOWNGRADE_SCROLL_SENSITIVE: u32 = 337248277;
pub const JB_EXECUTE_QUERY_WITH_TX_STMT: u32 = 337248278;
pub const JB_ADD_BATCH_WITH_TX_STMT: u32 = 337248279;
pub const JB_COMMIT_STATEMENT_NOT_ALLOWED: u32 = 337248280;
pub const JB_ROLLBACK_STATEMENT_NOT_ALLOWED: u32 = 337248281;
pub const JB_SET_TRANSACTION_STATEMENT_NOT_ALLOWED: u32 = 337248282;
pub const JB_PREPARE_CALL_WITH_TX_STMT: u32 = 337248283;
pub const JB_INVALID_CONNECTION_PROPERTY_VALUE: u32 = 337248284;
pub const JB_UNKNOWN_TPB_KEYWORD: u32 = 337248285;
pub const JB_INVALID_ISOLATION_LEVEL: u32 = 337248286;
pub const JB_STREAM_CLOSED: u32 = 337248287;
pub const JB_INVALID_RESULT_SET_TYPE: u32 = 337248288;
pub const JB_INVALID_RESULT_SET_CONCURRENCY: u32 = 337248289;
pub const JB_INVALID_RESULT_SET_HOLDABILITY: u32 = 337248290;
pub const JB_BATCH_UPDATE_FAILED: u32 = 337248291;
pub const JB_INVALID_COLUMN_INDEX: u32 = 337248292;
pub const JB_UNSUPPORTED_DATA_TYPE: u32 = 337248293;
pub const JB_PROTOCOL_ERROR: u32 = 337248294;
pub const JB_TYPE_CONVERSION: u32 = 337248295;
pub const JB_UNKNOWN_CHARACTER_SET: u32 = 337248296;
pub const JB_NO_ACTIVE_TRANSACTION: u32 = 337248297;
pub const JB_TRANSACTION_ALREADY_ACTIVE: u32 = 337248298;
pub const JB_INVALID_BLOB_OFFSET: u32 = 337248299;
pub const JB_SET_TRANSACTION_NOT_ALLOWED_ACTIVE_TX: u32 = 337248300;
pub const JB_SET_TRANSACTION_NOT_ALLOWED_IN_AUTO_COMMIT: u32 = 337248301;
pub const JB_INVALID_SET_TRANSACTION: u32 = 337248302;

// JDBC type codes (java.sql.Types)
pub const JDBC_BIT: i32 = -7;
pub const JDBC_TINYINT: i32 = -6;
pub const JDBC_BIGINT: i32 = -5;
pub const JDBC_LONGVARBINARY: i32 = -4;
pub const JDBC_VARBINARY: i32 = -3;
pub const JDBC_BINARY: i32 = -2;
pub const JDBC_LONGVARCHAR: i32 = -1;
pub const JDBC_NULL: i32 = 0;
pub const JDBC_CHAR: i32 = 1;
pub const JDBC_NUMERIC: i32 = 2;
pub const JDBC_DECIMAL: i32 = 3;
pub const JDBC_INTEGER: i32 = 4;
pub const JDBC_SMALLINT: i32 = 5;
pub const JDBC_FLOAT: i32 = 6;
pub const JDBC_REAL: i32 = 7;
pub const JDBC_DOUBLE: i32 = 8;
pub const JDBC_VARCHAR: i32 = 12;
pub const JDBC_BOOLEAN: i32 = 16;
pub const JDBC_DATE: i32 = 91;
pub const JDBC_TIME: i32 = 92;
pub const JDBC_TIMESTAMP: i32 = 93;
pub const JDBC_OTHER: i32 = 1111;
pub const JDBC_ARRAY: i32 = 2003;
pub const JDBC_BLOB: i32 = 2004;
pub const JDBC_ROWID: i32 = -8;
pub const JDBC_TIME_WITH_TIMEZONE: i32 = 2013;
pub const JDBC_TIMESTAMP_WITH_TIMEZONE: i32 = 2014;
pub const JDBC_DECFLOAT: i32 = -6001;

// JDBC result set constants
pub const TYPE_FORWARD_ONLY: i32 = 1003;
pub const TYPE_SCROLL_INSENSITIVE: i32 = 1004;
pub const TYPE_SCROLL_SENSITIVE: i32 = 1005;
pub const CONCUR_READ_ONLY: i32 = 1007;
pub const CONCUR_UPDATABLE: i32 = 1008;
pub const HOLD_CURSORS_OVER_COMMIT: i32 = 1;
pub const CLOSE_CURSORS_AT_COMMIT: i32 = 2;
