//! Connection properties.
//!
//! Properties are read once, from a string map or through the builder
//! methods, into an immutable [`ConnectionProperties`] that the rest of
//! the crate takes its configuration from.

use std::time::Duration;

use base64::Engine;
use bytes::Bytes;
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::capabilities::ServerCapabilities;
use crate::protocol::constants::*;
use crate::protocol::parameter_buffer::ParameterBuffer;
use crate::protocol::tpb::{IsolationLevel, TpbMapper, TransactionParameters};
use crate::protocol::types::{Charset, DatatypeCoder};
use crate::statement::{GeneratedKeysConfig, GeneratedKeysSupport};

const BASE64_PREFIX: &str = "base64:";

/// How scrollable result sets are implemented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollableCursor {
    /// Fetch everything and scroll client-side.
    #[default]
    Emulated,
    /// Server-side scrollable cursors (Firebird 5.0 and later).
    Server,
}

impl ScrollableCursor {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "" | "EMULATED" => Ok(ScrollableCursor::Emulated),
            "SERVER" => Ok(ScrollableCursor::Server),
            _ => Err(invalid_value("scrollableCursor", value)),
        }
    }
}

fn invalid_value(key: &str, value: &str) -> Error {
    Error::configuration(
        JB_INVALID_CONNECTION_PROPERTY_VALUE,
        format!("Invalid value '{}' for connection property {}", value, key),
    )
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(invalid_value(key, value)),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| invalid_value(key, value))
}

/// Immutable per-connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionProperties {
    user: Option<String>,
    password: Option<String>,
    role_name: Option<String>,
    charset: &'static Charset,
    sql_dialect: u8,
    allow_tx_stmts: bool,
    generated_keys: GeneratedKeysConfig,
    scrollable_cursor: ScrollableCursor,
    db_crypt_config: Option<Bytes>,
    default_isolation: IsolationLevel,
    tpb_mapper: TpbMapper,
    socket_timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    blob_buffer_size: usize,
}

impl Default for ConnectionProperties {
    fn default() -> Self {
        Self {
            user: None,
            password: None,
            role_name: None,
            charset: Charset::utf8(),
            sql_dialect: 3,
            allow_tx_stmts: false,
            generated_keys: GeneratedKeysConfig::Default,
            scrollable_cursor: ScrollableCursor::Emulated,
            db_crypt_config: None,
            default_isolation: IsolationLevel::ReadCommitted,
            tpb_mapper: TpbMapper::default(),
            socket_timeout: None,
            connect_timeout: None,
            blob_buffer_size: DEFAULT_BLOB_BUFFER_SIZE,
        }
    }
}

impl ConnectionProperties {
    /// Default properties.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build properties from key/value pairs.
    ///
    /// Keys are case-insensitive. Unknown keys are ignored; invalid values
    /// are configuration errors.
    pub fn from_map<I, K, V>(properties: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut props = Self::default();
        // isolation overrides apply after every key was seen
        let mut mappings = Vec::new();
        for (key, value) in properties {
            let (key, value) = (key.as_ref(), value.as_ref());
            match key.to_ascii_lowercase().as_str() {
                "user" | "user_name" => props.user = Some(value.to_string()),
                "password" => props.password = Some(value.to_string()),
                "rolename" | "sql_role_name" => props.role_name = Some(value.to_string()),
                "charset" | "encoding" | "lc_ctype" => props.charset = Charset::require(value)?,
                "sqldialect" | "sql_dialect" | "dialect" => {
                    props = props.with_sql_dialect(parse_number(key, value)?)?
                }
                "allowtxstmts" => props.allow_tx_stmts = parse_bool(key, value)?,
                "generatedkeysenabled" => {
                    props.generated_keys = GeneratedKeysConfig::parse(value)
                }
                "scrollablecursor" => props.scrollable_cursor = ScrollableCursor::parse(value)?,
                "dbcryptconfig" => props = props.with_db_crypt_config(value)?,
                "defaultisolation" => {
                    props = props.with_default_isolation(IsolationLevel::from_name(value)?)?
                }
                "sockettimeout" => {
                    props.socket_timeout = Some(Duration::from_millis(parse_number(key, value)?))
                }
                "connecttimeout" => {
                    props.connect_timeout = Some(Duration::from_secs(parse_number(key, value)?))
                }
                "blobbuffersize" => props.blob_buffer_size = parse_number(key, value)?,
                other if other.starts_with("transaction_") => {
                    mappings.push((IsolationLevel::from_name(key)?, value.to_string()));
                }
                _ => debug!(target: "firebird_core::properties", "ignoring unknown property {}", key),
            }
        }
        for (level, mapping) in mappings {
            props.tpb_mapper = props.tpb_mapper.with_mapping(level, &mapping)?;
        }
        Ok(props)
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_role_name(mut self, role_name: impl Into<String>) -> Self {
        self.role_name = Some(role_name.into());
        self
    }

    /// Set the connection character set by Firebird name.
    pub fn with_charset(mut self, name: &str) -> Result<Self> {
        self.charset = Charset::require(name)?;
        Ok(self)
    }

    /// Set the SQL dialect (1 or 3).
    pub fn with_sql_dialect(mut self, dialect: u8) -> Result<Self> {
        if !matches!(dialect, 1 | 3) {
            return Err(invalid_value("sqlDialect", &dialect.to_string()));
        }
        self.sql_dialect = dialect;
        Ok(self)
    }

    pub fn with_allow_tx_stmts(mut self, allow: bool) -> Self {
        self.allow_tx_stmts = allow;
        self
    }

    pub fn with_generated_keys_enabled(mut self, value: &str) -> Self {
        self.generated_keys = GeneratedKeysConfig::parse(value);
        self
    }

    pub fn with_scrollable_cursor(mut self, mode: ScrollableCursor) -> Self {
        self.scrollable_cursor = mode;
        self
    }

    /// Set the database encryption key material.
    ///
    /// A `base64:` prefix marks base64 encoded binary data; anything else
    /// is taken as UTF-8 text.
    pub fn with_db_crypt_config(mut self, value: &str) -> Result<Self> {
        let data = match value.strip_prefix(BASE64_PREFIX) {
            Some(encoded) => base64::engine::general_purpose::STANDARD
                .decode(encoded.trim())
                .map_err(|_| invalid_value("dbCryptConfig", value))?,
            None => value.as_bytes().to_vec(),
        };
        self.db_crypt_config = Some(Bytes::from(data));
        Ok(self)
    }

    pub fn with_default_isolation(mut self, level: IsolationLevel) -> Result<Self> {
        self.tpb_mapper.mapping(level)?;
        self.default_isolation = level;
        Ok(self)
    }

    /// Override the TPB of an isolation level with symbolic flags.
    pub fn with_isolation_mapping(mut self, level: IsolationLevel, mapping: &str) -> Result<Self> {
        self.tpb_mapper = self.tpb_mapper.with_mapping(level, mapping)?;
        Ok(self)
    }

    pub fn with_socket_timeout(mut self, timeout: Duration) -> Self {
        self.socket_timeout = Some(timeout);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn with_blob_buffer_size(mut self, size: usize) -> Self {
        self.blob_buffer_size = size;
        self
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn role_name(&self) -> Option<&str> {
        self.role_name.as_deref()
    }

    pub fn charset(&self) -> &'static Charset {
        self.charset
    }

    pub fn sql_dialect(&self) -> u8 {
        self.sql_dialect
    }

    pub fn allow_tx_stmts(&self) -> bool {
        self.allow_tx_stmts
    }

    pub fn generated_keys(&self) -> &GeneratedKeysConfig {
        &self.generated_keys
    }

    pub fn scrollable_cursor(&self) -> ScrollableCursor {
        self.scrollable_cursor
    }

    /// Opaque encryption key material, passed to the server unchanged.
    pub fn db_crypt_config(&self) -> Option<&Bytes> {
        self.db_crypt_config.as_ref()
    }

    pub fn default_isolation(&self) -> IsolationLevel {
        self.default_isolation
    }

    pub fn tpb_mapper(&self) -> &TpbMapper {
        &self.tpb_mapper
    }

    /// Transaction parameters of the default isolation level.
    pub fn default_transaction_parameters(&self) -> Result<&TransactionParameters> {
        self.tpb_mapper.mapping(self.default_isolation)
    }

    pub fn socket_timeout(&self) -> Option<Duration> {
        self.socket_timeout
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    pub fn blob_buffer_size(&self) -> usize {
        self.blob_buffer_size
    }

    /// Field codec for the connection character set.
    pub fn datatype_coder(&self) -> DatatypeCoder {
        DatatypeCoder::new(self.charset)
    }

    /// Generated keys behaviour for a server.
    pub fn generated_keys_support(&self, capabilities: &ServerCapabilities) -> GeneratedKeysSupport {
        GeneratedKeysSupport::from_config(&self.generated_keys, capabilities, self.sql_dialect)
    }

    /// Database parameter buffer for attaching.
    pub fn to_dpb(&self) -> ParameterBuffer {
        let mut dpb = ParameterBuffer::dpb();
        dpb.add_int(ISC_DPB_SQL_DIALECT, self.sql_dialect as i32);
        dpb.add_string(ISC_DPB_LC_CTYPE, self.charset.name());
        if let Some(user) = &self.user {
            dpb.add_string(ISC_DPB_USER_NAME, user.as_str());
        }
        if let Some(password) = &self.password {
            dpb.add_string(ISC_DPB_PASSWORD, password.as_str());
        }
        if let Some(role) = &self.role_name {
            dpb.add_string(ISC_DPB_SQL_ROLE_NAME, role.as_str());
        }
        if let Some(timeout) = self.connect_timeout {
            dpb.add_int(
                ISC_DPB_CONNECT_TIMEOUT,
                i32::try_from(timeout.as_secs()).unwrap_or(i32::MAX),
            );
        }
        dpb.add_int(ISC_DPB_PROCESS_ID, std::process::id() as i32);
        let process_name = std::env::current_exe()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
            .unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string());
        dpb.add_string(ISC_DPB_PROCESS_NAME, process_name);
        let host_name = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "localhost".to_string());
        dpb.add_string(ISC_DPB_HOST_NAME, host_name);
        dpb.add_string(ISC_DPB_OS_USER, whoami::username());
        dpb.add_flag(ISC_DPB_UTF8_FILENAME);
        dpb
    }
}
