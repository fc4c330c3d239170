//! Policy for transaction management statements executed as plain SQL.

use tracing::debug;

use crate::error::{Error, Result};

use super::detector::{classify, TxStatementKind};

/// Statement execution entry point a piece of SQL arrives through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallSite {
    /// `executeQuery`: the statement must produce a result set.
    ExecuteQuery,
    /// Adding to a statement batch.
    AddBatch,
    /// `execute` / `executeUpdate` on a plain statement.
    Execute,
    /// Preparing a statement.
    PrepareStatement,
    /// Preparing a callable statement.
    PrepareCall,
}

impl CallSite {
    /// Whether transaction statements may pass through this call site when
    /// `allowTxStmts` is enabled.
    pub fn permits_tx_statements(&self) -> bool {
        matches!(self, CallSite::Execute | CallSite::PrepareStatement)
    }
}

/// Check `sql` against the transaction statement policy.
///
/// Returns the transaction statement kind when `sql` is an allowed
/// transaction statement (the caller must then apply it to the
/// transaction registry), `None` for ordinary SQL, or an error when the
/// statement is rejected at this call site.
pub fn check_statement(
    sql: &str,
    call_site: CallSite,
    allow_tx_stmts: bool,
) -> Result<Option<TxStatementKind>> {
    let Some(statement) = classify(sql).kind.tx_statement() else {
        return Ok(None);
    };
    if allow_tx_stmts && call_site.permits_tx_statements() {
        debug!(
            target: "firebird_core::statement",
            "allowing {} statement through {:?}", statement, call_site
        );
        return Ok(Some(statement));
    }
    Err(Error::TxStatementNotAllowed {
        statement,
        call_site,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::protocol::constants::*;

    #[test]
    fn test_plain_sql_passes() {
        for site in [CallSite::ExecuteQuery, CallSite::AddBatch, CallSite::PrepareCall] {
            assert_eq!(check_statement("select 1 from rdb$database", site, false).unwrap(), None);
        }
    }

    #[test]
    fn test_execute_query_always_rejects() {
        for allow in [true, false] {
            let err = check_statement("commit work", CallSite::ExecuteQuery, allow).unwrap_err();
            assert_eq!(err.error_code(), JB_EXECUTE_QUERY_WITH_TX_STMT);
        }
    }

    #[test]
    fn test_prepare_call_always_rejects() {
        for allow in [true, false] {
            let err = check_statement("rollback", CallSite::PrepareCall, allow).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::FeatureNotSupported);
            assert_eq!(err.error_code(), JB_PREPARE_CALL_WITH_TX_STMT);
        }
    }

    #[test]
    fn test_execute_depends_on_allow_flag() {
        let err = check_statement("set transaction", CallSite::Execute, false).unwrap_err();
        assert_eq!(err.error_code(), JB_SET_TRANSACTION_STATEMENT_NOT_ALLOWED);
        assert_eq!(
            check_statement("set transaction", CallSite::Execute, true).unwrap(),
            Some(TxStatementKind::SetTransaction)
        );

        let err = check_statement("commit", CallSite::PrepareStatement, false).unwrap_err();
        assert_eq!(err.error_code(), JB_COMMIT_STATEMENT_NOT_ALLOWED);
        assert_eq!(
            check_statement("commit", CallSite::PrepareStatement, true).unwrap(),
            Some(TxStatementKind::Commit)
        );
    }
}
