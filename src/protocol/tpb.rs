//! Transaction parameter mapping.
//!
//! Maps JDBC isolation levels to TPBs and parses the symbolic flag lists
//! used to override those mappings, for example
//! `"read_committed,no_rec_version,write,nowait,lock_timeout=5"`, and the
//! options of `SET TRANSACTION` statements executed as SQL.

use std::fmt;

use crate::error::{Error, Result};
use crate::protocol::constants::*;
use crate::protocol::parameter_buffer::{ParameterBuffer, ParameterValue};

/// Prefix accepted (and ignored) in front of TPB keywords.
const TPB_PREFIX: &str = "isc_tpb_";

/// JDBC transaction isolation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IsolationLevel {
    None,
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    /// Create from a `java.sql.Connection` isolation constant.
    pub fn from_jdbc(level: i32) -> Result<Self> {
        match level {
            0 => Ok(IsolationLevel::None),
            1 => Ok(IsolationLevel::ReadUncommitted),
            2 => Ok(IsolationLevel::ReadCommitted),
            4 => Ok(IsolationLevel::RepeatableRead),
            8 => Ok(IsolationLevel::Serializable),
            _ => Err(Error::configuration(
                JB_INVALID_ISOLATION_LEVEL,
                format!("Invalid transaction isolation level {}", level),
            )),
        }
    }

    /// Create from a name such as `TRANSACTION_READ_COMMITTED`.
    pub fn from_name(name: &str) -> Result<Self> {
        let upper = name.trim().to_ascii_uppercase();
        let short = upper.strip_prefix("TRANSACTION_").unwrap_or(&upper);
        match short {
            "NONE" => Ok(IsolationLevel::None),
            "READ_UNCOMMITTED" => Ok(IsolationLevel::ReadUncommitted),
            "READ_COMMITTED" => Ok(IsolationLevel::ReadCommitted),
            "REPEATABLE_READ" => Ok(IsolationLevel::RepeatableRead),
            "SERIALIZABLE" => Ok(IsolationLevel::Serializable),
            _ => Err(Error::configuration(
                JB_INVALID_ISOLATION_LEVEL,
                format!("Unknown transaction isolation level {}", name),
            )),
        }
    }

    /// The `java.sql.Connection` constant for this level.
    pub fn jdbc_value(&self) -> i32 {
        match self {
            IsolationLevel::None => 0,
            IsolationLevel::ReadUncommitted => 1,
            IsolationLevel::ReadCommitted => 2,
            IsolationLevel::RepeatableRead => 4,
            IsolationLevel::Serializable => 8,
        }
    }

    /// Property name of this level.
    pub fn name(&self) -> &'static str {
        match self {
            IsolationLevel::None => "TRANSACTION_NONE",
            IsolationLevel::ReadUncommitted => "TRANSACTION_READ_UNCOMMITTED",
            IsolationLevel::ReadCommitted => "TRANSACTION_READ_COMMITTED",
            IsolationLevel::RepeatableRead => "TRANSACTION_REPEATABLE_READ",
            IsolationLevel::Serializable => "TRANSACTION_SERIALIZABLE",
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lock mode of a reserved table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableLockMode {
    Shared,
    Protected,
    Exclusive,
}

impl TableLockMode {
    fn tag(&self) -> u8 {
        match self {
            TableLockMode::Shared => ISC_TPB_SHARED,
            TableLockMode::Protected => ISC_TPB_PROTECTED,
            TableLockMode::Exclusive => ISC_TPB_EXCLUSIVE,
        }
    }
}

fn keyword_tag(keyword: &str) -> Option<u8> {
    let tag = match keyword {
        "consistency" => ISC_TPB_CONSISTENCY,
        "concurrency" => ISC_TPB_CONCURRENCY,
        "shared" => ISC_TPB_SHARED,
        "protected" => ISC_TPB_PROTECTED,
        "exclusive" => ISC_TPB_EXCLUSIVE,
        "wait" => ISC_TPB_WAIT,
        "nowait" => ISC_TPB_NOWAIT,
        "read" => ISC_TPB_READ,
        "write" => ISC_TPB_WRITE,
        "lock_read" => ISC_TPB_LOCK_READ,
        "lock_write" => ISC_TPB_LOCK_WRITE,
        "verb_time" => ISC_TPB_VERB_TIME,
        "commit_time" => ISC_TPB_COMMIT_TIME,
        "ignore_limbo" => ISC_TPB_IGNORE_LIMBO,
        "read_committed" => ISC_TPB_READ_COMMITTED,
        "autocommit" => ISC_TPB_AUTOCOMMIT,
        "rec_version" => ISC_TPB_REC_VERSION,
        "no_rec_version" => ISC_TPB_NO_REC_VERSION,
        "restart_requests" => ISC_TPB_RESTART_REQUESTS,
        "no_auto_undo" => ISC_TPB_NO_AUTO_UNDO,
        "lock_timeout" => ISC_TPB_LOCK_TIMEOUT,
        "read_consistency" => ISC_TPB_READ_CONSISTENCY,
        _ => return None,
    };
    Some(tag)
}

/// Parse a comma separated list of TPB keywords into a TPB.
///
/// Keywords are case-insensitive and may carry the `isc_tpb_` prefix.
/// `lock_timeout` takes an integer (`lock_timeout=5`), `lock_read` and
/// `lock_write` take a table name. Unknown keywords are rejected with an
/// error naming the keyword.
pub fn parse_tpb_flags(mapping: &str) -> Result<ParameterBuffer> {
    let mut tpb = ParameterBuffer::tpb();
    for token in mapping.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let (keyword, argument) = match token.split_once('=') {
            Some((k, v)) => (k.trim(), Some(v.trim())),
            None => (token, None),
        };
        let lower = keyword.to_ascii_lowercase();
        let short = lower.strip_prefix(TPB_PREFIX).unwrap_or(&lower);
        let tag = keyword_tag(short).ok_or_else(|| {
            Error::configuration(
                JB_UNKNOWN_TPB_KEYWORD,
                format!("Keyword {} unknown. Please check your mapping.", keyword),
            )
        })?;

        match tag {
            ISC_TPB_LOCK_TIMEOUT => {
                let value = argument
                    .and_then(|a| a.parse::<i32>().ok())
                    .ok_or_else(|| {
                        Error::configuration(
                            JB_UNKNOWN_TPB_KEYWORD,
                            format!("{} requires an integer argument, got {:?}", keyword, argument),
                        )
                    })?;
                tpb.add_int(tag, value);
            }
            ISC_TPB_LOCK_READ | ISC_TPB_LOCK_WRITE => match argument {
                Some(table) if !table.is_empty() => tpb.add_string(tag, table),
                _ => {
                    return Err(Error::configuration(
                        JB_UNKNOWN_TPB_KEYWORD,
                        format!("{} requires a table name", keyword),
                    ))
                }
            },
            _ => {
                if argument.is_some() {
                    return Err(Error::configuration(
                        JB_UNKNOWN_TPB_KEYWORD,
                        format!("Keyword {} does not take an argument", keyword),
                    ));
                }
                tpb.add_flag(tag);
            }
        }
    }
    Ok(tpb)
}

/// Transaction parameters for starting a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionParameters {
    tpb: ParameterBuffer,
}

impl TransactionParameters {
    /// Wrap an existing TPB.
    pub fn new(tpb: ParameterBuffer) -> Self {
        Self { tpb }
    }

    /// Parse from symbolic flags.
    pub fn parse(mapping: &str) -> Result<Self> {
        parse_tpb_flags(mapping).map(Self::new)
    }

    /// Parse the options of a `SET TRANSACTION` statement.
    pub fn from_set_transaction(sql: &str) -> Result<Self> {
        parse_set_transaction(sql)
    }

    /// The underlying TPB.
    pub fn tpb(&self) -> &ParameterBuffer {
        &self.tpb
    }

    /// Encode the TPB.
    pub fn encode(&self) -> Result<bytes::Bytes> {
        self.tpb.encode()
    }

    /// Whether the transaction is read-only.
    pub fn is_read_only(&self) -> bool {
        self.tpb.contains(ISC_TPB_READ)
    }

    /// Copy with the access mode set to read-only or read-write.
    pub fn with_read_only(&self, read_only: bool) -> Self {
        let mut tpb = self.tpb.clone();
        tpb.remove(ISC_TPB_READ);
        tpb.remove(ISC_TPB_WRITE);
        tpb.add_flag(if read_only { ISC_TPB_READ } else { ISC_TPB_WRITE });
        Self { tpb }
    }

    /// Whether the transaction waits for lock resolution.
    pub fn is_wait(&self) -> bool {
        !self.tpb.contains(ISC_TPB_NOWAIT)
    }

    /// Lock timeout in seconds, if set.
    pub fn lock_timeout(&self) -> Option<i32> {
        self.tpb.int_value(ISC_TPB_LOCK_TIMEOUT)
    }

    /// Reserve `table` with the given access and lock mode.
    pub fn add_table_lock(&mut self, table: &str, write: bool, mode: TableLockMode) {
        let tag = if write {
            ISC_TPB_LOCK_WRITE
        } else {
            ISC_TPB_LOCK_READ
        };
        self.tpb.push(tag, ParameterValue::String(table.to_string()));
        self.tpb.add_flag(mode.tag());
    }
}

/// Isolation level to TPB mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TpbMapper {
    read_committed: TransactionParameters,
    repeatable_read: TransactionParameters,
    serializable: TransactionParameters,
}

impl Default for TpbMapper {
    fn default() -> Self {
        let build = |flags: &[u8]| {
            let mut tpb = ParameterBuffer::tpb();
            for flag in flags {
                tpb.add_flag(*flag);
            }
            TransactionParameters::new(tpb)
        };
        Self {
            read_committed: build(&[
                ISC_TPB_WRITE,
                ISC_TPB_WAIT,
                ISC_TPB_READ_COMMITTED,
                ISC_TPB_REC_VERSION,
            ]),
            repeatable_read: build(&[ISC_TPB_WRITE, ISC_TPB_WAIT, ISC_TPB_CONCURRENCY]),
            serializable: build(&[ISC_TPB_WRITE, ISC_TPB_WAIT, ISC_TPB_CONSISTENCY]),
        }
    }
}

impl TpbMapper {
    /// Replace the mapping of `level` with parsed symbolic flags.
    pub fn with_mapping(mut self, level: IsolationLevel, mapping: &str) -> Result<Self> {
        let params = TransactionParameters::parse(mapping)?;
        match level {
            IsolationLevel::ReadUncommitted | IsolationLevel::ReadCommitted => {
                self.read_committed = params
            }
            IsolationLevel::RepeatableRead => self.repeatable_read = params,
            IsolationLevel::Serializable => self.serializable = params,
            IsolationLevel::None => {
                return Err(Error::configuration(
                    JB_INVALID_ISOLATION_LEVEL,
                    "Cannot define a mapping for TRANSACTION_NONE",
                ))
            }
        }
        Ok(self)
    }

    /// Transaction parameters for `level`.
    ///
    /// `ReadUncommitted` is served as `ReadCommitted`; `None` is rejected.
    pub fn mapping(&self, level: IsolationLevel) -> Result<&TransactionParameters> {
        match level {
            IsolationLevel::ReadUncommitted | IsolationLevel::ReadCommitted => {
                Ok(&self.read_committed)
            }
            IsolationLevel::RepeatableRead => Ok(&self.repeatable_read),
            IsolationLevel::Serializable => Ok(&self.serializable),
            IsolationLevel::None => Err(Error::configuration(
                JB_INVALID_ISOLATION_LEVEL,
                "Transaction isolation TRANSACTION_NONE is not supported",
            )),
        }
    }
}

/// Token of a `SET TRANSACTION` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SqlToken {
    /// Unquoted word, upper-cased.
    Word(String),
    /// Double-quoted identifier with the quotes removed.
    Quoted(String),
    Number(String),
    Symbol(char),
}

fn tokenize_statement(sql: &str) -> Vec<SqlToken> {
    let chars: Vec<char> = sql.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c == '-' && chars.get(i + 1) == Some(&'-') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
        } else if c == '/' && chars.get(i + 1) == Some(&'*') {
            i += 2;
            while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                i += 1;
            }
            i += 2;
        } else if c == '"' {
            let mut name = String::new();
            i += 1;
            while i < chars.len() {
                if chars[i] == '"' {
                    if chars.get(i + 1) == Some(&'"') {
                        name.push('"');
                        i += 2;
                        continue;
                    }
                    break;
                }
                name.push(chars[i]);
                i += 1;
            }
            i += 1;
            tokens.push(SqlToken::Quoted(name));
        } else if c.is_alphabetic() {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '$') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            tokens.push(SqlToken::Word(word.to_ascii_uppercase()));
        } else if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
            tokens.push(SqlToken::Number(chars[start..i].iter().collect()));
        } else {
            tokens.push(SqlToken::Symbol(c));
            i += 1;
        }
    }
    tokens
}

fn set_transaction_error(message: impl fmt::Display) -> Error {
    Error::usage(
        JB_INVALID_SET_TRANSACTION,
        format!("Invalid SET TRANSACTION statement: {}", message),
    )
}

/// Table reservation from a `RESERVING` clause.
type Reservation = (String, bool, TableLockMode);

struct SetTransactionParser {
    tokens: Vec<SqlToken>,
    pos: usize,
}

impl SetTransactionParser {
    fn new(sql: &str) -> Self {
        Self {
            tokens: tokenize_statement(sql),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        matches!(&self.tokens[self.pos.min(self.tokens.len())..], [] | [SqlToken::Symbol(';')])
    }

    fn is_word(&self, offset: usize, word: &str) -> bool {
        matches!(self.tokens.get(self.pos + offset), Some(SqlToken::Word(w)) if w == word)
    }

    /// Consume `words` if the next tokens are exactly those words.
    fn accept(&mut self, words: &[&str]) -> bool {
        if words.iter().enumerate().all(|(i, w)| self.is_word(i, w)) {
            self.pos += words.len();
            true
        } else {
            false
        }
    }

    fn accept_symbol(&mut self, symbol: char) -> bool {
        if self.tokens.get(self.pos) == Some(&SqlToken::Symbol(symbol)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, words: &[&str]) -> Result<()> {
        if self.accept(words) {
            Ok(())
        } else {
            Err(set_transaction_error(format!("expected {}", words.join(" "))))
        }
    }

    fn current(&self) -> String {
        match self.tokens.get(self.pos) {
            Some(SqlToken::Word(w)) | Some(SqlToken::Number(w)) => w.clone(),
            Some(SqlToken::Quoted(q)) => format!("\"{}\"", q),
            Some(SqlToken::Symbol(c)) => c.to_string(),
            None => "end of statement".to_string(),
        }
    }

    fn identifier(&mut self) -> Result<String> {
        let name = match self.tokens.get(self.pos) {
            Some(SqlToken::Word(w)) => w.clone(),
            Some(SqlToken::Quoted(q)) if !q.is_empty() => q.clone(),
            _ => {
                return Err(set_transaction_error(format!(
                    "expected a table name, found {}",
                    self.current()
                )))
            }
        };
        self.pos += 1;
        Ok(name)
    }

    fn integer(&mut self) -> Result<i32> {
        let value = match self.tokens.get(self.pos) {
            Some(SqlToken::Number(n)) => n.parse::<i32>().ok(),
            _ => None,
        };
        let value = value.ok_or_else(|| {
            set_transaction_error(format!("expected an integer, found {}", self.current()))
        })?;
        self.pos += 1;
        Ok(value)
    }

    /// Isolation level clause as TPB keywords, `None` if the next tokens
    /// do not start one.
    fn isolation_level(&mut self) -> Result<Option<&'static [&'static str]>> {
        let explicit = self.accept(&["ISOLATION", "LEVEL"]);
        let flags: &'static [&'static str] =
            if self.accept(&["SNAPSHOT", "TABLE", "STABILITY"]) || self.accept(&["CONSISTENCY"]) {
                &["consistency"]
            } else if self.accept(&["SNAPSHOT"]) {
                if self.is_word(0, "AT") {
                    return Err(set_transaction_error("SNAPSHOT AT NUMBER is not supported"));
                }
                &["concurrency"]
            } else if self.accept(&["READ", "COMMITTED"]) {
                if self.accept(&["RECORD_VERSION"]) {
                    &["read_committed", "rec_version"]
                } else if self.accept(&["READ", "CONSISTENCY"]) {
                    &["read_committed", "read_consistency"]
                } else {
                    self.accept(&["NO", "RECORD_VERSION"]);
                    &["read_committed", "no_rec_version"]
                }
            } else if explicit {
                return Err(set_transaction_error(format!(
                    "expected an isolation level, found {}",
                    self.current()
                )));
            } else {
                return Ok(None);
            };
        Ok(Some(flags))
    }

    /// `RESERVING <tables> [FOR [SHARED | PROTECTED] {READ | WRITE}] [, ...]`
    fn reserving(&mut self, reservations: &mut Vec<Reservation>) -> Result<()> {
        let mut tables = Vec::new();
        loop {
            tables.push(self.identifier()?);
            if self.accept_symbol(',') {
                continue;
            }
            let (write, mode) = if self.accept(&["FOR"]) {
                let mode = if self.accept(&["PROTECTED"]) {
                    TableLockMode::Protected
                } else {
                    self.accept(&["SHARED"]);
                    TableLockMode::Shared
                };
                let write = if self.accept(&["WRITE"]) {
                    true
                } else if self.accept(&["READ"]) {
                    false
                } else {
                    return Err(set_transaction_error(format!(
                        "expected READ or WRITE, found {}",
                        self.current()
                    )));
                };
                (write, mode)
            } else {
                (false, TableLockMode::Shared)
            };
            reservations.extend(tables.drain(..).map(|table| (table, write, mode)));
            if !self.accept_symbol(',') {
                return Ok(());
            }
        }
    }
}

fn set_once<T>(slot: &mut Option<T>, value: T, clause: &str) -> Result<()> {
    if slot.is_some() {
        return Err(set_transaction_error(format!("{} specified more than once", clause)));
    }
    *slot = Some(value);
    Ok(())
}

fn add_keyword(tpb: &mut ParameterBuffer, keyword: &str) -> Result<()> {
    let tag = keyword_tag(keyword).ok_or_else(|| {
        set_transaction_error(format!("no TPB mapping for {}", keyword))
    })?;
    tpb.add_flag(tag);
    Ok(())
}

/// Parse the options of a `SET TRANSACTION` statement into a TPB.
///
/// Omitted options take the server defaults: read-write, wait and
/// snapshot isolation. `READ COMMITTED` without a record version option
/// is `NO RECORD_VERSION`.
pub fn parse_set_transaction(sql: &str) -> Result<TransactionParameters> {
    let mut parser = SetTransactionParser::new(sql);
    parser.expect(&["SET", "TRANSACTION"])?;
    if parser.accept(&["NAME"]) {
        parser.identifier()?;
    }

    let mut access = None;
    let mut wait = None;
    let mut isolation = None;
    let mut lock_timeout = None;
    let mut options: Vec<&'static str> = Vec::new();
    let mut reservations = Vec::new();

    while !parser.at_end() {
        let option = if parser.accept(&["READ", "ONLY"]) {
            set_once(&mut access, "read", "access mode")?;
            None
        } else if parser.accept(&["READ", "WRITE"]) {
            set_once(&mut access, "write", "access mode")?;
            None
        } else if parser.accept(&["WAIT"]) {
            set_once(&mut wait, "wait", "lock resolution")?;
            None
        } else if parser.accept(&["NO", "WAIT"]) {
            set_once(&mut wait, "nowait", "lock resolution")?;
            None
        } else if parser.accept(&["LOCK", "TIMEOUT"]) {
            let seconds = parser.integer()?;
            set_once(&mut lock_timeout, seconds, "LOCK TIMEOUT")?;
            None
        } else if parser.accept(&["NO", "AUTO", "UNDO"]) {
            Some("no_auto_undo")
        } else if parser.accept(&["AUTO", "COMMIT"]) {
            Some("autocommit")
        } else if parser.accept(&["IGNORE", "LIMBO"]) {
            Some("ignore_limbo")
        } else if parser.accept(&["RESTART", "REQUESTS"]) {
            Some("restart_requests")
        } else if parser.accept(&["RESERVING"]) {
            parser.reserving(&mut reservations)?;
            None
        } else if let Some(flags) = parser.isolation_level()? {
            set_once(&mut isolation, flags, "isolation level")?;
            None
        } else {
            return Err(set_transaction_error(format!("unexpected {}", parser.current())));
        };

        if let Some(option) = option {
            if options.contains(&option) {
                return Err(set_transaction_error(format!("{} specified more than once", option)));
            }
            options.push(option);
        }
    }

    if wait == Some("nowait") && lock_timeout.is_some() {
        return Err(set_transaction_error("LOCK TIMEOUT cannot be combined with NO WAIT"));
    }

    let mut tpb = ParameterBuffer::tpb();
    add_keyword(&mut tpb, access.unwrap_or("write"))?;
    add_keyword(&mut tpb, wait.unwrap_or("wait"))?;
    for keyword in isolation.unwrap_or(&["concurrency"]) {
        add_keyword(&mut tpb, keyword)?;
    }
    if let Some(seconds) = lock_timeout {
        tpb.add_int(ISC_TPB_LOCK_TIMEOUT, seconds);
    }
    for keyword in options {
        add_keyword(&mut tpb, keyword)?;
    }

    let mut params = TransactionParameters::new(tpb);
    for (table, write, mode) in reservations {
        params.add_table_lock(&table, write, mode);
    }
    Ok(params)
}
