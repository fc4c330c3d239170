//! Generated keys retrieval through `RETURNING` clause rewriting.

use tracing::debug;

use crate::error::{Error, Result, UnsupportedReason};
use crate::protocol::capabilities::{ReturningKind, ServerCapabilities};
use crate::protocol::constants::*;

use super::detector::{classify, StatementInfo, StatementKind};

/// Parsed value of the `generatedKeysEnabled` connection property.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GeneratedKeysConfig {
    /// Every statement kind the server supports.
    #[default]
    Default,
    /// Requests for generated keys fail.
    Disabled,
    /// Requests for generated keys are ignored.
    Ignored,
    /// Comma separated list of statement kinds, lower-cased.
    Kinds(Vec<String>),
}

impl GeneratedKeysConfig {
    /// Parse a property value. Never fails: unrecognised kind tokens are
    /// dropped when the support is created.
    pub fn parse(value: &str) -> Self {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "" | "default" => GeneratedKeysConfig::Default,
            "disabled" => GeneratedKeysConfig::Disabled,
            "ignored" => GeneratedKeysConfig::Ignored,
            list => GeneratedKeysConfig::Kinds(
                list.split(',')
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect(),
            ),
        }
    }
}

/// Which generated keys the caller asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyRequest {
    NoKeys,
    /// All columns of the target table.
    ReturnGeneratedKeys,
    /// 1-based column positions in the target table.
    Indexes(Vec<usize>),
    /// Column names, used as given (quote them where needed).
    Names(Vec<String>),
}

/// Column names of a table in ordinal order.
///
/// Consulted when a server without `RETURNING *` needs all columns, or when
/// keys are requested by position.
pub trait ColumnCatalog {
    fn columns(&self, table: &str) -> Result<Vec<String>>;
}

/// Catalog that knows no tables.
impl ColumnCatalog for () {
    fn columns(&self, _table: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// A statement prepared for generated keys retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedKeysQuery {
    original_sql: String,
    sql: String,
    generates_keys: bool,
    kind: StatementKind,
    key_positions: Vec<usize>,
}

impl GeneratedKeysQuery {
    fn unchanged(sql: &str, info: Option<&StatementInfo>, generates_keys: bool) -> Self {
        Self {
            original_sql: sql.to_string(),
            sql: sql.to_string(),
            generates_keys,
            kind: info.map_or(StatementKind::Other, |i| i.kind),
            key_positions: Vec::new(),
        }
    }

    /// SQL as supplied by the caller.
    pub fn original_sql(&self) -> &str {
        &self.original_sql
    }

    /// SQL to execute.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Whether executing the statement produces a generated keys result set.
    pub fn generates_keys(&self) -> bool {
        self.generates_keys
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    /// 1-based positions of the key columns in the generated keys result
    /// set. Empty when the column list is decided by the server (an
    /// existing `RETURNING` clause or `RETURNING *`).
    pub fn key_positions(&self) -> &[usize] {
        &self.key_positions
    }
}

enum Quoting {
    None,
    DoubleQuotes,
}

impl Quoting {
    fn for_dialect(dialect: u8) -> Self {
        if dialect >= 3 {
            Quoting::DoubleQuotes
        } else {
            Quoting::None
        }
    }

    fn apply(&self, name: &str) -> String {
        match self {
            Quoting::None => name.to_string(),
            Quoting::DoubleQuotes => format!("\"{}\"", name.replace('"', "\"\"")),
        }
    }
}

fn returning_kind(kind: StatementKind) -> Option<ReturningKind> {
    match kind {
        StatementKind::Insert => Some(ReturningKind::Insert),
        StatementKind::Update => Some(ReturningKind::Update),
        StatementKind::Delete => Some(ReturningKind::Delete),
        StatementKind::UpdateOrInsert => Some(ReturningKind::UpdateOrInsert),
        StatementKind::Merge => Some(ReturningKind::Merge),
        _ => None,
    }
}

/// Generated keys behaviour of a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedKeysSupport {
    /// Requests fail with the given reason (a request for no keys passes).
    Disabled(UnsupportedReason),
    /// Requests pass through unchanged and never produce keys.
    Ignored,
    /// Statements of the listed kinds get a `RETURNING` clause.
    Enabled {
        kinds: Vec<ReturningKind>,
        returning_all: bool,
        dialect: u8,
    },
}

impl GeneratedKeysSupport {
    /// Create the support for a `generatedKeysEnabled` property value.
    pub fn create_for(config: &str, capabilities: &ServerCapabilities, dialect: u8) -> Self {
        Self::from_config(&GeneratedKeysConfig::parse(config), capabilities, dialect)
    }

    pub fn from_config(
        config: &GeneratedKeysConfig,
        capabilities: &ServerCapabilities,
        dialect: u8,
    ) -> Self {
        let server_kinds = capabilities.returning_kinds();
        let kinds = match config {
            GeneratedKeysConfig::Disabled => {
                return GeneratedKeysSupport::Disabled(UnsupportedReason::ExplicitlyDisabled)
            }
            GeneratedKeysConfig::Ignored => return GeneratedKeysSupport::Ignored,
            _ if server_kinds.is_empty() => {
                return GeneratedKeysSupport::Disabled(UnsupportedReason::NoReturningSupport)
            }
            GeneratedKeysConfig::Default => server_kinds,
            GeneratedKeysConfig::Kinds(tokens) => {
                let enabled: Vec<ReturningKind> = server_kinds
                    .into_iter()
                    .filter(|k| tokens.iter().any(|t| t == k.token()))
                    .collect();
                if enabled.is_empty() {
                    return GeneratedKeysSupport::Ignored;
                }
                enabled
            }
        };
        GeneratedKeysSupport::Enabled {
            kinds,
            returning_all: capabilities.supports_returning_all(),
            dialect,
        }
    }

    /// Whether generated keys can be retrieved at all.
    pub fn supports_generated_keys(&self) -> bool {
        matches!(self, GeneratedKeysSupport::Enabled { .. })
    }

    /// Statement kinds that get a `RETURNING` clause.
    pub fn supported_kinds(&self) -> &[ReturningKind] {
        match self {
            GeneratedKeysSupport::Enabled { kinds, .. } => kinds,
            _ => &[],
        }
    }

    /// Prepare `sql` for the requested generated keys.
    pub fn build_query(
        &self,
        sql: &str,
        request: &KeyRequest,
        catalog: &dyn ColumnCatalog,
    ) -> Result<GeneratedKeysQuery> {
        match self {
            GeneratedKeysSupport::Ignored => Ok(GeneratedKeysQuery::unchanged(sql, None, false)),
            GeneratedKeysSupport::Disabled(reason) => match request {
                KeyRequest::NoKeys => Ok(GeneratedKeysQuery::unchanged(sql, None, false)),
                _ => Err(Error::GeneratedKeysNotSupported { reason: *reason }),
            },
            GeneratedKeysSupport::Enabled {
                kinds,
                returning_all,
                dialect,
            } => {
                let info = classify(sql);
                if info.has_returning {
                    return Ok(GeneratedKeysQuery::unchanged(sql, Some(&info), true));
                }
                let supported = returning_kind(info.kind).is_some_and(|k| kinds.contains(&k));
                let quoting = Quoting::for_dialect(*dialect);

                let columns = match request {
                    KeyRequest::NoKeys => None,
                    KeyRequest::Indexes(indexes) if indexes.is_empty() => {
                        return Err(empty_request("columnIndexes"))
                    }
                    KeyRequest::Names(names) if names.is_empty() => {
                        return Err(empty_request("columnNames"))
                    }
                    _ if !supported => None,
                    KeyRequest::ReturnGeneratedKeys if *returning_all => {
                        Some((vec!["*".to_string()], false))
                    }
                    KeyRequest::ReturnGeneratedKeys => {
                        let table = table_of(&info)?;
                        let columns = catalog.columns(table)?;
                        if columns.is_empty() {
                            return Err(no_columns(table));
                        }
                        Some((columns.iter().map(|c| quoting.apply(c)).collect(), true))
                    }
                    KeyRequest::Indexes(indexes) => {
                        let table = table_of(&info)?;
                        let columns = catalog.columns(table)?;
                        if columns.is_empty() {
                            return Err(no_columns(table));
                        }
                        let selected = indexes
                            .iter()
                            .map(|&idx| {
                                idx.checked_sub(1)
                                    .and_then(|i| columns.get(i))
                                    .map(|c| quoting.apply(c))
                                    .ok_or_else(|| {
                                        Error::usage(
                                            JB_GENERATED_KEYS_INVALID_COLUMN_POSITION,
                                            format!(
                                                "Column position {} does not exist in table {}",
                                                idx, table
                                            ),
                                        )
                                    })
                            })
                            .collect::<Result<Vec<_>>>()?;
                        Some((selected, true))
                    }
                    KeyRequest::Names(names) => Some((names.clone(), true)),
                };

                match columns {
                    Some((columns, positional)) => {
                        let rewritten = append_returning(sql, &columns);
                        debug!(
                            target: "firebird_core::statement",
                            "rewrote {:?} statement for generated keys: {}", info.kind, rewritten
                        );
                        Ok(GeneratedKeysQuery {
                            original_sql: sql.to_string(),
                            sql: rewritten,
                            generates_keys: true,
                            kind: info.kind,
                            key_positions: if positional {
                                (1..=columns.len()).collect()
                            } else {
                                Vec::new()
                            },
                        })
                    }
                    None => Ok(GeneratedKeysQuery::unchanged(sql, Some(&info), false)),
                }
            }
        }
    }
}

fn table_of(info: &StatementInfo) -> Result<&str> {
    info.table_name
        .as_deref()
        .ok_or_else(|| Error::usage(JB_GENERATED_KEYS_NO_COLUMNS_FOUND, "No target table found"))
}

fn empty_request(parameter: &str) -> Error {
    Error::usage(
        JB_GENERATED_KEYS_ARRAY_EMPTY_OR_NULL,
        format!("Generated keys array {} was empty or null", parameter),
    )
}

fn no_columns(table: &str) -> Error {
    Error::usage(
        JB_GENERATED_KEYS_NO_COLUMNS_FOUND,
        format!("No columns were found for table {} to build RETURNING clause", table),
    )
}

/// Append a `RETURNING` clause after dropping trailing whitespace and one
/// statement terminator.
fn append_returning(sql: &str, columns: &[String]) -> String {
    let trimmed = sql.trim_end();
    let trimmed = trimmed.strip_suffix(';').unwrap_or(trimmed);
    format!("{}\nRETURNING {}", trimmed, columns.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapCatalog(HashMap<&'static str, Vec<String>>);

    impl ColumnCatalog for MapCatalog {
        fn columns(&self, table: &str) -> Result<Vec<String>> {
            Ok(self.0.get(table).cloned().unwrap_or_default())
        }
    }

    fn catalog() -> MapCatalog {
        MapCatalog(HashMap::from([(
            "GENERATED_KEYS_TBL",
            vec!["ID".to_string(), "NAME".to_string(), "TEXT_VALUE".to_string()],
        )]))
    }

    const INSERT: &str = "INSERT INTO generated_keys_tbl(name, text_value) VALUES (?, ?)";

    #[test]
    fn test_config_parse() {
        assert_eq!(GeneratedKeysConfig::parse(""), GeneratedKeysConfig::Default);
        assert_eq!(GeneratedKeysConfig::parse("DISABLED"), GeneratedKeysConfig::Disabled);
        assert_eq!(GeneratedKeysConfig::parse(" ignored "), GeneratedKeysConfig::Ignored);
        assert_eq!(
            GeneratedKeysConfig::parse("Insert, merge,"),
            GeneratedKeysConfig::Kinds(vec!["insert".into(), "merge".into()])
        );
    }

    #[test]
    fn test_version_gating() {
        let fb15 = ServerCapabilities::new(1, 5);
        assert_eq!(
            GeneratedKeysSupport::create_for("default", &fb15, 3),
            GeneratedKeysSupport::Disabled(UnsupportedReason::NoReturningSupport)
        );
        let fb21 = ServerCapabilities::new(2, 1);
        assert_eq!(
            GeneratedKeysSupport::create_for("default", &fb21, 3).supported_kinds(),
            &[ReturningKind::Insert]
        );
        let fb25 = ServerCapabilities::new(2, 5);
        let kinds = GeneratedKeysSupport::create_for("", &fb25, 3);
        assert!(!kinds.supported_kinds().contains(&ReturningKind::Merge));
        assert!(kinds.supported_kinds().contains(&ReturningKind::UpdateOrInsert));
        let fb30 = ServerCapabilities::new(3, 0);
        assert_eq!(
            GeneratedKeysSupport::create_for("default", &fb30, 3).supported_kinds(),
            &ReturningKind::ALL
        );
    }

    #[test]
    fn test_kind_list_intersects_server_support() {
        let fb21 = ServerCapabilities::new(2, 1);
        let support = GeneratedKeysSupport::create_for("insert,merge,bogus", &fb21, 3);
        assert_eq!(support.supported_kinds(), &[ReturningKind::Insert]);
        assert_eq!(
            GeneratedKeysSupport::create_for("merge", &fb21, 3),
            GeneratedKeysSupport::Ignored
        );
        assert_eq!(
            GeneratedKeysSupport::create_for("nothing,known", &ServerCapabilities::new(4, 0), 3),
            GeneratedKeysSupport::Ignored
        );
    }

    #[test]
    fn test_disabled_rejects_key_requests() {
        let support = GeneratedKeysSupport::create_for("disabled", &ServerCapabilities::new(4, 0), 3);
        let query = support.build_query(INSERT, &KeyRequest::NoKeys, &()).unwrap();
        assert!(!query.generates_keys());
        assert_eq!(query.sql(), INSERT);

        for request in [
            KeyRequest::ReturnGeneratedKeys,
            KeyRequest::Indexes(vec![1]),
            KeyRequest::Names(vec!["ID".into()]),
        ] {
            let err = support.build_query(INSERT, &request, &()).unwrap_err();
            assert_eq!(err.unsupported_reason(), Some(UnsupportedReason::ExplicitlyDisabled));
        }
    }

    #[test]
    fn test_ignored_never_fails() {
        let support = GeneratedKeysSupport::create_for("ignored", &ServerCapabilities::new(4, 0), 3);
        for request in [KeyRequest::ReturnGeneratedKeys, KeyRequest::Indexes(vec![])] {
            let query = support.build_query(INSERT, &request, &()).unwrap();
            assert!(!query.generates_keys());
            assert_eq!(query.sql(), INSERT);
        }
    }

    #[test]
    fn test_returning_all_on_fb4() {
        let support = GeneratedKeysSupport::create_for("default", &ServerCapabilities::new(4, 0), 3);
        let query = support
            .build_query(&format!("{};  \n", INSERT), &KeyRequest::ReturnGeneratedKeys, &())
            .unwrap();
        assert!(query.generates_keys());
        assert_eq!(query.sql(), format!("{}\nRETURNING *", INSERT));
        assert!(query.key_positions().is_empty());
        assert_eq!(query.kind(), StatementKind::Insert);
    }

    #[test]
    fn test_all_columns_from_catalog_before_fb4() {
        let support = GeneratedKeysSupport::create_for("default", &ServerCapabilities::new(3, 0), 3);
        let query = support
            .build_query(INSERT, &KeyRequest::ReturnGeneratedKeys, &catalog())
            .unwrap();
        assert_eq!(
            query.sql(),
            format!("{}\nRETURNING \"ID\",\"NAME\",\"TEXT_VALUE\"", INSERT)
        );
        assert_eq!(query.key_positions(), &[1, 2, 3]);

        let dialect1 = GeneratedKeysSupport::create_for("default", &ServerCapabilities::new(3, 0), 1);
        let query = dialect1
            .build_query(INSERT, &KeyRequest::Indexes(vec![3, 1]), &catalog())
            .unwrap();
        assert_eq!(query.sql(), format!("{}\nRETURNING TEXT_VALUE,ID", INSERT));
    }

    #[test]
    fn test_column_index_errors() {
        let support = GeneratedKeysSupport::create_for("default", &ServerCapabilities::new(3, 0), 3);
        let err = support
            .build_query(INSERT, &KeyRequest::Indexes(vec![5]), &catalog())
            .unwrap_err();
        assert_eq!(err.error_code(), JB_GENERATED_KEYS_INVALID_COLUMN_POSITION);

        let err = support
            .build_query("insert into missing values (1)", &KeyRequest::Indexes(vec![1]), &catalog())
            .unwrap_err();
        assert_eq!(err.error_code(), JB_GENERATED_KEYS_NO_COLUMNS_FOUND);

        let err = support
            .build_query(INSERT, &KeyRequest::Names(vec![]), &catalog())
            .unwrap_err();
        assert_eq!(err.error_code(), JB_GENERATED_KEYS_ARRAY_EMPTY_OR_NULL);
    }

    #[test]
    fn test_existing_returning_passes_through() {
        let support = GeneratedKeysSupport::create_for("default", &ServerCapabilities::new(3, 0), 3);
        let sql = "insert into t (x) values (1) returning id";
        for request in [KeyRequest::NoKeys, KeyRequest::Names(vec!["X".into()])] {
            let query = support.build_query(sql, &request, &()).unwrap();
            assert!(query.generates_keys());
            assert_eq!(query.sql(), sql);
        }
    }

    #[test]
    fn test_unsupported_kind_passes_through() {
        let support = GeneratedKeysSupport::create_for("insert", &ServerCapabilities::new(3, 0), 3);
        let sql = "delete from generated_keys_tbl where id = 1";
        let query = support
            .build_query(sql, &KeyRequest::Names(vec!["ID".into()]), &catalog())
            .unwrap();
        assert!(!query.generates_keys());
        assert_eq!(query.sql(), sql);

        let query = support
            .build_query("select * from rdb$database", &KeyRequest::ReturnGeneratedKeys, &())
            .unwrap();
        assert!(!query.generates_keys());
    }
}
