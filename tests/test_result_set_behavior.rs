//! Integration tests for result set type, concurrency and holdability.

use firebird_core_rs::protocol::constants::*;
use firebird_core_rs::{Concurrency, ErrorKind, Holdability, ResultSetBehavior, ResultSetType, WarningChain};

const TYPES: [i32; 3] = [TYPE_FORWARD_ONLY, TYPE_SCROLL_INSENSITIVE, TYPE_SCROLL_SENSITIVE];
const CONCURRENCIES: [i32; 2] = [CONCUR_READ_ONLY, CONCUR_UPDATABLE];
const HOLDABILITIES: [i32; 2] = [HOLD_CURSORS_OVER_COMMIT, CLOSE_CURSORS_AT_COMMIT];

#[test]
fn test_every_requested_combination() {
    for t in TYPES {
        for c in CONCURRENCIES {
            for h in HOLDABILITIES {
                let mut warnings = WarningChain::new();
                let behavior = ResultSetBehavior::from_jdbc(t, c, h, &mut warnings).unwrap();

                if t == TYPE_SCROLL_SENSITIVE {
                    assert_eq!(behavior.result_set_type(), ResultSetType::ScrollInsensitive);
                    assert_eq!(warnings.len(), 1);
                    assert_eq!(
                        warnings.first().map(|w| w.code),
                        Some(JB_RESULT_SET_TYPE_DOWNGRADE_SCROLL_SENSITIVE)
                    );
                } else {
                    assert_eq!(behavior.result_set_type().jdbc_value(), t);
                    assert!(warnings.is_empty());
                }
                assert_eq!(behavior.concurrency().jdbc_value(), c);
                assert_eq!(behavior.holdability().jdbc_value(), h);
                assert_eq!(behavior.is_scrollable(), t != TYPE_FORWARD_ONLY);
                assert_eq!(behavior.is_updatable(), c == CONCUR_UPDATABLE);
                assert_eq!(behavior.is_close_cursors_at_commit(), h == CLOSE_CURSORS_AT_COMMIT);
            }
        }
    }
}

#[test]
fn test_warnings_accumulate_until_cleared() {
    let mut warnings = WarningChain::new();
    for _ in 0..2 {
        ResultSetBehavior::resolve(
            ResultSetType::ScrollSensitive,
            Concurrency::ReadOnly,
            Holdability::HoldOverCommit,
            &mut warnings,
        );
    }
    assert_eq!(warnings.len(), 2);
    warnings.clear();
    assert!(warnings.is_empty());
}

#[test]
fn test_default_behavior() {
    let behavior = ResultSetBehavior::default();
    assert_eq!(behavior.result_set_type(), ResultSetType::ForwardOnly);
    assert_eq!(behavior.concurrency(), Concurrency::ReadOnly);
    assert_eq!(behavior.holdability(), Holdability::CloseAtCommit);
    assert_eq!(
        ResultSetBehavior::of(ResultSetType::ForwardOnly, Concurrency::Updatable, Holdability::CloseAtCommit)
            .with_read_only(),
        behavior
    );
}

#[test]
fn test_invalid_constants() {
    let mut warnings = WarningChain::new();
    for (t, c, h) in [(1002, CONCUR_READ_ONLY, 1), (TYPE_FORWARD_ONLY, 0, 1), (TYPE_FORWARD_ONLY, CONCUR_READ_ONLY, 3)] {
        let err = ResultSetBehavior::from_jdbc(t, c, h, &mut warnings).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
    }
    assert!(warnings.is_empty());
}
