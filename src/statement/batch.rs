//! Sequential statement batches.

use std::future::Future;

use tracing::debug;

use crate::error::{Error, Result};

use super::tx_guard::{check_statement, CallSite};

/// Executes single update statements for a batch.
pub trait StatementExecutor {
    /// Execute `sql` and return its update count.
    fn execute_update(&mut self, sql: &str) -> impl Future<Output = Result<i64>> + Send;
}

/// A batch of SQL statements executed one after another.
///
/// Transaction management statements are rejected when added.
#[derive(Debug, Clone, Default)]
pub struct StatementBatch {
    statements: Vec<String>,
}

impl StatementBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a statement to the batch.
    pub fn add(&mut self, sql: impl Into<String>) -> Result<()> {
        let sql = sql.into();
        check_statement(&sql, CallSite::AddBatch, false)?;
        self.statements.push(sql);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    pub fn clear(&mut self) {
        self.statements.clear();
    }

    /// Execute every statement in order and return the update counts.
    ///
    /// Execution stops at the first failure, which is reported as
    /// [`Error::Batch`] carrying the counts of the statements that
    /// completed. The batch is empty afterwards in either case.
    pub async fn execute<E>(&mut self, executor: &mut E) -> Result<Vec<i64>>
    where
        E: StatementExecutor + Send,
    {
        let statements = std::mem::take(&mut self.statements);
        let mut update_counts = Vec::with_capacity(statements.len());
        for sql in &statements {
            match executor.execute_update(sql).await {
                Ok(count) => update_counts.push(count),
                Err(e) => {
                    debug!(
                        target: "firebird_core::statement",
                        "batch failed at statement {} of {}: {}",
                        update_counts.len() + 1,
                        statements.len(),
                        e
                    );
                    return Err(Error::Batch {
                        update_counts,
                        source: Box::new(e),
                    });
                }
            }
        }
        Ok(update_counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::constants::*;

    struct FailAt {
        fail_at: usize,
        executed: Vec<String>,
    }

    impl StatementExecutor for FailAt {
        async fn execute_update(&mut self, sql: &str) -> Result<i64> {
            self.executed.push(sql.to_string());
            if self.executed.len() == self.fail_at {
                Err(Error::server(ISC_LOCK_CONFLICT, "lock conflict on no wait transaction"))
            } else {
                Ok(1)
            }
        }
    }

    #[test]
    fn test_add_rejects_tx_statements() {
        let mut batch = StatementBatch::new();
        for sql in ["commit", "rollback work", "set transaction read only"] {
            let err = batch.add(sql).unwrap_err();
            assert_eq!(err.error_code(), JB_ADD_BATCH_WITH_TX_STMT);
        }
        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn test_execute_all() {
        let mut batch = StatementBatch::new();
        batch.add("insert into t values (1)").unwrap();
        batch.add("insert into t values (2)").unwrap();
        let mut executor = FailAt {
            fail_at: 0,
            executed: Vec::new(),
        };
        assert_eq!(batch.execute(&mut executor).await.unwrap(), vec![1, 1]);
        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn test_failure_truncates_update_counts() {
        let mut batch = StatementBatch::new();
        for i in 0..5 {
            batch.add(format!("insert into t values ({})", i)).unwrap();
        }
        let mut executor = FailAt {
            fail_at: 3,
            executed: Vec::new(),
        };
        let err = batch.execute(&mut executor).await.unwrap_err();
        match &err {
            Error::Batch {
                update_counts,
                source,
            } => {
                assert_eq!(update_counts, &vec![1, 1]);
                assert!(source.is_conflict());
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert_eq!(executor.executed.len(), 3);
    }
}
