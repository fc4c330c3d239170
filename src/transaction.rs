//! Transaction lifetime and transaction-bound resource invalidation.
//!
//! A [`TransactionRegistry`] tracks the connection's current transaction and
//! the resources (blobs, cursors) opened under it. Resources do not register
//! callbacks; they hold a [`ResourceBinding`] carrying the generation they
//! were opened in. Ending a transaction bumps the generation and clears the
//! resource set under one mutex, so any later check from any thread sees the
//! resource as closed.
//!
//! Transactions start lazily: after a commit or rollback no transaction is
//! active until the next statement calls
//! [`TransactionRegistry::ensure_transaction`] or a `SET TRANSACTION`
//! statement starts one with its own parameters.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::constants::*;
use crate::protocol::tpb::TransactionParameters;
use crate::statement::TxStatementKind;

/// Identifier of a transaction-bound resource.
pub type ResourceId = u64;

/// How a transaction ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionEnd {
    Commit,
    Rollback,
}

#[derive(Debug, Default)]
struct RegistryState {
    /// Id of the current transaction, 0 when none is active.
    transaction_id: u64,
    /// Highest transaction id handed out so far.
    last_transaction_id: u64,
    /// Bumped on every transaction end.
    generation: u64,
    resources: HashSet<ResourceId>,
    next_resource: ResourceId,
    auto_commit: bool,
    /// Parameters of the active transaction when they differ from the
    /// connection defaults.
    parameters: Option<TransactionParameters>,
}

impl RegistryState {
    fn begin(&mut self, parameters: Option<TransactionParameters>) -> Result<u64> {
        if self.transaction_id != 0 {
            return Err(Error::usage(
                JB_TRANSACTION_ALREADY_ACTIVE,
                format!("Transaction {} is already active", self.transaction_id),
            ));
        }
        self.last_transaction_id += 1;
        self.transaction_id = self.last_transaction_id;
        self.parameters = parameters;
        debug!(
            target: "firebird_core::transaction",
            "begin transaction {} (default parameters: {})",
            self.transaction_id,
            self.parameters.is_none()
        );
        Ok(self.transaction_id)
    }
}

/// Per-connection registry of the active transaction and its resources.
///
/// Cloning yields another handle to the same registry.
#[derive(Debug, Clone, Default)]
pub struct TransactionRegistry {
    state: Arc<Mutex<RegistryState>>,
}

impl TransactionRegistry {
    /// Create a registry with no active transaction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a transaction with the connection defaults, returning its id.
    pub fn begin(&self) -> Result<u64> {
        self.state.lock().begin(None)
    }

    /// Start a transaction with explicit parameters, returning its id.
    pub fn begin_with(&self, parameters: TransactionParameters) -> Result<u64> {
        self.state.lock().begin(Some(parameters))
    }

    /// Id of the active transaction, starting one with the connection
    /// defaults if none is active.
    pub fn ensure_transaction(&self) -> u64 {
        let mut state = self.state.lock();
        if state.transaction_id != 0 {
            return state.transaction_id;
        }
        state.last_transaction_id += 1;
        state.transaction_id = state.last_transaction_id;
        state.parameters = None;
        debug!(target: "firebird_core::transaction", "begin transaction {}", state.transaction_id);
        state.transaction_id
    }

    /// Whether the connection is in auto-commit mode.
    pub fn is_auto_commit(&self) -> bool {
        self.state.lock().auto_commit
    }

    /// Switch auto-commit mode. Changing the mode commits the active
    /// transaction.
    pub fn set_auto_commit(&self, auto_commit: bool) {
        if self.is_auto_commit() != auto_commit {
            self.commit();
            self.state.lock().auto_commit = auto_commit;
        }
    }

    /// Parameters the active transaction was started with, `None` when it
    /// uses the connection defaults or no transaction is active.
    pub fn current_parameters(&self) -> Option<TransactionParameters> {
        self.state.lock().parameters.clone()
    }

    /// Whether a transaction is active.
    pub fn is_active(&self) -> bool {
        self.state.lock().transaction_id != 0
    }

    /// Id of the active transaction, as `CURRENT_TRANSACTION` would report.
    pub fn current_transaction(&self) -> Option<u64> {
        let id = self.state.lock().transaction_id;
        (id != 0).then_some(id)
    }

    /// Number of live resources in the active transaction.
    pub fn live_resources(&self) -> usize {
        self.state.lock().resources.len()
    }

    /// Register a resource with the active transaction.
    pub fn register(&self) -> Result<ResourceBinding> {
        let mut state = self.state.lock();
        if state.transaction_id == 0 {
            return Err(Error::usage(
                JB_NO_ACTIVE_TRANSACTION,
                "No transaction is active",
            ));
        }
        state.next_resource += 1;
        let id = state.next_resource;
        state.resources.insert(id);
        Ok(ResourceBinding {
            registry: self.clone(),
            id,
            generation: state.generation,
            transaction_id: state.transaction_id,
        })
    }

    /// Commit the active transaction.
    pub fn commit(&self) -> usize {
        self.end(TransactionEnd::Commit)
    }

    /// Roll back the active transaction.
    pub fn rollback(&self) -> usize {
        self.end(TransactionEnd::Rollback)
    }

    /// End the active transaction and invalidate every resource bound to it.
    ///
    /// Returns the number of resources invalidated. Ending when no
    /// transaction is active does nothing.
    pub fn end(&self, how: TransactionEnd) -> usize {
        let mut state = self.state.lock();
        if state.transaction_id == 0 {
            return 0;
        }
        let invalidated = state.resources.len();
        state.resources.clear();
        state.generation += 1;
        debug!(
            target: "firebird_core::transaction",
            "{:?} transaction {}, invalidated {} resource(s)",
            how,
            state.transaction_id,
            invalidated
        );
        state.transaction_id = 0;
        state.parameters = None;
        invalidated
    }

    /// Apply an allowed transaction management statement executed as `sql`.
    ///
    /// COMMIT and ROLLBACK end the active transaction and return `None`; the
    /// next statement starts its replacement. SET TRANSACTION starts a
    /// transaction with the options parsed from `sql` and returns its id. It
    /// is rejected in auto-commit mode and while a transaction is active.
    pub fn apply_statement(&self, statement: TxStatementKind, sql: &str) -> Result<Option<u64>> {
        match statement {
            TxStatementKind::Commit => {
                self.end(TransactionEnd::Commit);
                Ok(None)
            }
            TxStatementKind::Rollback => {
                self.end(TransactionEnd::Rollback);
                Ok(None)
            }
            TxStatementKind::SetTransaction => {
                let parameters = TransactionParameters::from_set_transaction(sql)?;
                let mut state = self.state.lock();
                if state.auto_commit {
                    return Err(Error::usage(
                        JB_SET_TRANSACTION_NOT_ALLOWED_IN_AUTO_COMMIT,
                        "SET TRANSACTION is not allowed in auto-commit mode",
                    ));
                }
                if state.transaction_id != 0 {
                    return Err(Error::usage(
                        JB_SET_TRANSACTION_NOT_ALLOWED_ACTIVE_TX,
                        format!(
                            "SET TRANSACTION is not allowed while transaction {} is active",
                            state.transaction_id
                        ),
                    ));
                }
                state.begin(Some(parameters)).map(Some)
            }
        }
    }

    fn release(&self, id: ResourceId, generation: u64) {
        let mut state = self.state.lock();
        if state.generation == generation {
            state.resources.remove(&id);
        }
    }

    fn is_live(&self, id: ResourceId, generation: u64) -> bool {
        let state = self.state.lock();
        state.generation == generation && state.resources.contains(&id)
    }
}

/// Back reference from a resource to the transaction it was opened in.
///
/// Dropping the binding releases the resource.
#[derive(Debug)]
pub struct ResourceBinding {
    registry: TransactionRegistry,
    id: ResourceId,
    generation: u64,
    transaction_id: u64,
}

impl ResourceBinding {
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Transaction the resource belongs to.
    pub fn transaction_id(&self) -> u64 {
        self.transaction_id
    }

    /// Whether the owning transaction is still active and the resource has
    /// not been released.
    pub fn is_live(&self) -> bool {
        self.registry.is_live(self.id, self.generation)
    }

    /// Fail with [`Error::BlobClosed`] once the binding is no longer live.
    pub fn ensure_live(&self) -> Result<()> {
        if self.is_live() {
            Ok(())
        } else {
            Err(Error::BlobClosed)
        }
    }

    /// Release the resource early.
    pub fn release(&self) {
        self.registry.release(self.id, self.generation);
    }
}

impl Drop for ResourceBinding {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_invalidates_resources() {
        let registry = TransactionRegistry::new();
        registry.begin().unwrap();
        let a = registry.register().unwrap();
        let b = registry.register().unwrap();
        assert!(a.is_live() && b.is_live());
        assert_eq!(registry.live_resources(), 2);

        assert_eq!(registry.commit(), 2);
        assert!(!a.is_live());
        assert!(!b.is_live());
        assert!(!registry.is_active());
    }

    #[test]
    fn test_new_transaction_does_not_revive_old_resources() {
        let registry = TransactionRegistry::new();
        registry.begin().unwrap();
        let old = registry.register().unwrap();
        registry.rollback();
        registry.begin().unwrap();
        let new = registry.register().unwrap();
        assert!(!old.is_live());
        assert!(new.is_live());
        assert_ne!(old.transaction_id(), new.transaction_id());
    }

    #[test]
    fn test_release_and_drop() {
        let registry = TransactionRegistry::new();
        registry.begin().unwrap();
        let a = registry.register().unwrap();
        {
            let _b = registry.register().unwrap();
            assert_eq!(registry.live_resources(), 2);
        }
        assert_eq!(registry.live_resources(), 1);
        a.release();
        assert!(!a.is_live());
        assert_eq!(registry.live_resources(), 0);
    }

    #[test]
    fn test_register_requires_transaction() {
        let registry = TransactionRegistry::new();
        assert!(registry.register().is_err());
        registry.begin().unwrap();
        assert!(registry.begin().is_err());
    }

    #[test]
    fn test_commit_statement_ends_transaction() {
        let registry = TransactionRegistry::new();
        let first = registry.begin().unwrap();
        let resource = registry.register().unwrap();
        assert_eq!(registry.apply_statement(TxStatementKind::Commit, "commit").unwrap(), None);
        assert!(!resource.is_live());
        assert_eq!(registry.current_transaction(), None);

        let second = registry.ensure_transaction();
        assert!(second > first);
        assert_eq!(registry.ensure_transaction(), second);
        assert_eq!(registry.current_parameters(), None);
    }

    #[test]
    fn test_set_transaction_starts_configured_transaction() {
        let registry = TransactionRegistry::new();
        let id = registry
            .apply_statement(TxStatementKind::SetTransaction, "set transaction read only")
            .unwrap()
            .unwrap();
        assert_eq!(registry.current_transaction(), Some(id));
        assert!(registry.current_parameters().unwrap().is_read_only());

        let err = registry
            .apply_statement(TxStatementKind::SetTransaction, "set transaction")
            .unwrap_err();
        assert_eq!(err.error_code(), JB_SET_TRANSACTION_NOT_ALLOWED_ACTIVE_TX);
        assert_eq!(registry.current_transaction(), Some(id));

        registry.rollback();
        assert_eq!(registry.current_parameters(), None);
    }

    #[test]
    fn test_set_transaction_rejected_in_auto_commit() {
        let registry = TransactionRegistry::new();
        registry.set_auto_commit(true);
        let err = registry
            .apply_statement(TxStatementKind::SetTransaction, "set transaction")
            .unwrap_err();
        assert_eq!(err.error_code(), JB_SET_TRANSACTION_NOT_ALLOWED_IN_AUTO_COMMIT);
        assert!(!registry.is_active());
    }

    #[test]
    fn test_switching_auto_commit_commits() {
        let registry = TransactionRegistry::new();
        registry.begin().unwrap();
        let binding = registry.register().unwrap();
        registry.set_auto_commit(true);
        assert!(!binding.is_live());
        assert!(registry.is_auto_commit());
    }

    #[test]
    fn test_invalidation_visible_across_threads() {
        let registry = TransactionRegistry::new();
        registry.begin().unwrap();
        let binding = registry.register().unwrap();
        let other = registry.clone();
        std::thread::spawn(move || {
            other.commit();
        })
        .join()
        .unwrap();
        assert!(!binding.is_live());
    }
}
