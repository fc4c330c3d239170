//! Integration tests for COMMIT / ROLLBACK / SET TRANSACTION executed as SQL.

mod common;

use common::{active_registry, RecordingExecutor};
use firebird_core_rs::protocol::constants::*;
use firebird_core_rs::protocol::TransactionParameters;
use firebird_core_rs::statement::TxStatementKind;
use firebird_core_rs::{
    check_statement, CallSite, ConnectionProperties, Error, ErrorKind, StatementBatch, TransactionRegistry,
};

const TX_STATEMENTS: [(&str, TxStatementKind); 6] = [
    ("COMMIT", TxStatementKind::Commit),
    ("commit work", TxStatementKind::Commit),
    ("ROLLBACK", TxStatementKind::Rollback),
    ("rollback work;", TxStatementKind::Rollback),
    ("SET TRANSACTION", TxStatementKind::SetTransaction),
    ("set transaction read only isolation level snapshot", TxStatementKind::SetTransaction),
];

const CALL_SITES: [CallSite; 5] = [
    CallSite::ExecuteQuery,
    CallSite::AddBatch,
    CallSite::Execute,
    CallSite::PrepareStatement,
    CallSite::PrepareCall,
];

fn not_allowed_code(kind: TxStatementKind) -> u32 {
    match kind {
        TxStatementKind::Commit => JB_COMMIT_STATEMENT_NOT_ALLOWED,
        TxStatementKind::Rollback => JB_ROLLBACK_STATEMENT_NOT_ALLOWED,
        TxStatementKind::SetTransaction => JB_SET_TRANSACTION_STATEMENT_NOT_ALLOWED,
    }
}

#[test]
fn test_full_call_site_grid() {
    for allow in [false, true] {
        for (sql, kind) in TX_STATEMENTS {
            for site in CALL_SITES {
                let result = check_statement(sql, site, allow);
                match (site, allow) {
                    (CallSite::ExecuteQuery, _) => {
                        let err = result.unwrap_err();
                        assert_eq!(err.error_code(), JB_EXECUTE_QUERY_WITH_TX_STMT, "{}", sql);
                        assert_eq!(err.kind(), ErrorKind::Usage);
                    }
                    (CallSite::AddBatch, _) => {
                        let err = result.unwrap_err();
                        assert_eq!(err.error_code(), JB_ADD_BATCH_WITH_TX_STMT, "{}", sql);
                        assert_eq!(err.kind(), ErrorKind::FeatureNotSupported);
                    }
                    (CallSite::PrepareCall, _) => {
                        let err = result.unwrap_err();
                        assert_eq!(err.error_code(), JB_PREPARE_CALL_WITH_TX_STMT, "{}", sql);
                        assert_eq!(err.kind(), ErrorKind::FeatureNotSupported);
                    }
                    (_, false) => {
                        let err = result.unwrap_err();
                        assert_eq!(err.error_code(), not_allowed_code(kind), "{}", sql);
                        assert!(matches!(err, Error::TxStatementNotAllowed { statement, .. } if statement == kind));
                    }
                    (_, true) => assert_eq!(result.unwrap(), Some(kind), "{} via {:?}", sql, site),
                }
            }
        }
    }
}

#[test]
fn test_lookalikes_are_ordinary_sql() {
    for sql in [
        "select 'commit' from rdb$database",
        "insert into log (msg) values ('rollback')",
        "-- commit\nselect 1 from rdb$database",
        "execute procedure commit_all",
    ] {
        for site in CALL_SITES {
            assert_eq!(check_statement(sql, site, false).unwrap(), None, "{}", sql);
        }
    }
}

#[test]
fn test_allowed_statement_applies_to_registry() {
    let props = ConnectionProperties::from_map([("allowTxStmts", "true")]).unwrap();
    let registry = active_registry();
    let first = registry.current_transaction().unwrap();
    let binding = registry.register().unwrap();

    let kind = check_statement("commit", CallSite::Execute, props.allow_tx_stmts())
        .unwrap()
        .unwrap();
    assert_eq!(registry.apply_statement(kind, "commit").unwrap(), None);
    assert!(!registry.is_active());
    assert!(!binding.is_live());

    // the next statement runs in a new transaction
    let next = registry.ensure_transaction();
    assert_ne!(next, first);
    assert_eq!(registry.current_transaction(), Some(next));

    let kind = check_statement("rollback", CallSite::PrepareStatement, true)
        .unwrap()
        .unwrap();
    assert_eq!(registry.apply_statement(kind, "rollback").unwrap(), None);
    assert_ne!(registry.ensure_transaction(), next);
}

fn set_transaction(registry: &TransactionRegistry, sql: &str) -> TransactionParameters {
    let kind = check_statement(sql, CallSite::Execute, true).unwrap().unwrap();
    assert_eq!(kind, TxStatementKind::SetTransaction);
    let id = registry.apply_statement(kind, sql).unwrap().unwrap();
    assert_eq!(registry.current_transaction(), Some(id));
    registry.current_parameters().unwrap()
}

#[test]
fn test_set_transaction_configures_next_transaction() {
    let registry = TransactionRegistry::new();

    let params = set_transaction(&registry, "set transaction");
    assert!(params.tpb().contains(ISC_TPB_CONCURRENCY));
    assert!(!params.is_read_only());
    assert!(params.is_wait());
    assert_eq!(params.lock_timeout(), None);
    assert!(!params.tpb().contains(ISC_TPB_AUTOCOMMIT));
    assert!(!params.tpb().contains(ISC_TPB_NO_AUTO_UNDO));
    registry.commit();

    let params = set_transaction(
        &registry,
        "set transaction read only read committed wait lock timeout 500 no auto undo",
    );
    assert!(params.tpb().contains(ISC_TPB_READ_COMMITTED));
    assert!(params.is_read_only());
    assert_eq!(params.lock_timeout(), Some(500));
    assert!(!params.tpb().contains(ISC_TPB_AUTOCOMMIT));
    assert!(params.tpb().contains(ISC_TPB_NO_AUTO_UNDO));
    registry.commit();

    let params = set_transaction(
        &registry,
        "set transaction snapshot table stability reserving TEST for shared write",
    );
    assert!(params.tpb().contains(ISC_TPB_CONSISTENCY));
    assert!(!params.is_read_only());
    assert_eq!(params.lock_timeout(), None);
    assert_eq!(params.tpb().string_value(ISC_TPB_LOCK_WRITE), Some("TEST"));
    assert!(params.tpb().contains(ISC_TPB_SHARED));
    registry.commit();

    let params = set_transaction(&registry, "set transaction read write read committed no wait auto commit");
    assert!(params.tpb().contains(ISC_TPB_READ_COMMITTED));
    assert!(!params.is_read_only());
    assert!(!params.is_wait());
    assert!(params.tpb().contains(ISC_TPB_AUTOCOMMIT));
    assert!(!params.tpb().contains(ISC_TPB_NO_AUTO_UNDO));
    registry.commit();
    assert_eq!(registry.current_parameters(), None);
}

#[test]
fn test_set_transaction_rejections() {
    let registry = active_registry();
    let active = registry.current_transaction();
    let err = registry
        .apply_statement(TxStatementKind::SetTransaction, "set transaction read only")
        .unwrap_err();
    assert_eq!(err.error_code(), JB_SET_TRANSACTION_NOT_ALLOWED_ACTIVE_TX);
    assert_eq!(err.kind(), ErrorKind::Usage);
    assert_eq!(registry.current_transaction(), active);

    registry.set_auto_commit(true);
    let err = registry
        .apply_statement(TxStatementKind::SetTransaction, "set transaction")
        .unwrap_err();
    assert_eq!(err.error_code(), JB_SET_TRANSACTION_NOT_ALLOWED_IN_AUTO_COMMIT);
    assert!(!registry.is_active());

    registry.set_auto_commit(false);
    let err = registry
        .apply_statement(TxStatementKind::SetTransaction, "set transaction read only bogus")
        .unwrap_err();
    assert_eq!(err.error_code(), JB_INVALID_SET_TRANSACTION);
    assert!(!registry.is_active());
}

#[tokio::test]
async fn test_batch_rejects_tx_statements() {
    let mut batch = StatementBatch::new();
    batch.add("insert into t (x) values (1)").unwrap();
    let err = batch.add("COMMIT").unwrap_err();
    assert_eq!(err.error_code(), JB_ADD_BATCH_WITH_TX_STMT);
    assert_eq!(batch.len(), 1);

    let mut executor = RecordingExecutor::default();
    assert_eq!(batch.execute(&mut executor).await.unwrap(), vec![1]);
    assert_eq!(executor.executed, vec!["insert into t (x) values (1)".to_string()]);
    assert!(batch.is_empty());
}

#[tokio::test]
async fn test_batch_failure_reports_completed_counts() {
    let mut batch = StatementBatch::new();
    for sql in ["update a set x = 1", "update b set x = 1", "update FAIL set x = 1", "update c set x = 1"] {
        batch.add(sql).unwrap();
    }
    let mut executor = RecordingExecutor::default();
    match batch.execute(&mut executor).await {
        Err(Error::Batch { update_counts, source }) => {
            assert_eq!(update_counts, vec![1, 1]);
            assert_eq!(source.kind(), ErrorKind::Conflict);
        }
        other => panic!("expected batch failure, got {:?}", other),
    }
    assert_eq!(executor.executed.len(), 3);
    assert!(batch.is_empty());
}
