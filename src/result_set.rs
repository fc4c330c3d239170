//! Result set type, concurrency and holdability resolution.

use tracing::warn;

use crate::error::{Error, Result};
use crate::protocol::constants::*;
use crate::warning::{Warning, WarningChain};

/// Scrollability of a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultSetType {
    ForwardOnly,
    ScrollInsensitive,
    /// Requested only; always resolved to `ScrollInsensitive`.
    ScrollSensitive,
}

impl ResultSetType {
    pub fn from_jdbc(value: i32) -> Result<Self> {
        match value {
            TYPE_FORWARD_ONLY => Ok(ResultSetType::ForwardOnly),
            TYPE_SCROLL_INSENSITIVE => Ok(ResultSetType::ScrollInsensitive),
            TYPE_SCROLL_SENSITIVE => Ok(ResultSetType::ScrollSensitive),
            _ => Err(Error::usage(
                JB_INVALID_RESULT_SET_TYPE,
                format!("Invalid result set type {}", value),
            )),
        }
    }

    pub fn jdbc_value(&self) -> i32 {
        match self {
            ResultSetType::ForwardOnly => TYPE_FORWARD_ONLY,
            ResultSetType::ScrollInsensitive => TYPE_SCROLL_INSENSITIVE,
            ResultSetType::ScrollSensitive => TYPE_SCROLL_SENSITIVE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Concurrency {
    ReadOnly,
    Updatable,
}

impl Concurrency {
    pub fn from_jdbc(value: i32) -> Result<Self> {
        match value {
            CONCUR_READ_ONLY => Ok(Concurrency::ReadOnly),
            CONCUR_UPDATABLE => Ok(Concurrency::Updatable),
            _ => Err(Error::usage(
                JB_INVALID_RESULT_SET_CONCURRENCY,
                format!("Invalid result set concurrency {}", value),
            )),
        }
    }

    pub fn jdbc_value(&self) -> i32 {
        match self {
            Concurrency::ReadOnly => CONCUR_READ_ONLY,
            Concurrency::Updatable => CONCUR_UPDATABLE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Holdability {
    HoldOverCommit,
    CloseAtCommit,
}

impl Holdability {
    pub fn from_jdbc(value: i32) -> Result<Self> {
        match value {
            HOLD_CURSORS_OVER_COMMIT => Ok(Holdability::HoldOverCommit),
            CLOSE_CURSORS_AT_COMMIT => Ok(Holdability::CloseAtCommit),
            _ => Err(Error::usage(
                JB_INVALID_RESULT_SET_HOLDABILITY,
                format!("Invalid result set holdability {}", value),
            )),
        }
    }

    pub fn jdbc_value(&self) -> i32 {
        match self {
            Holdability::HoldOverCommit => HOLD_CURSORS_OVER_COMMIT,
            Holdability::CloseAtCommit => CLOSE_CURSORS_AT_COMMIT,
        }
    }
}

/// Resolved behaviour of a result set.
///
/// The type is never `ScrollSensitive`: such requests are downgraded to
/// `ScrollInsensitive` with a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResultSetBehavior {
    result_set_type: ResultSetType,
    concurrency: Concurrency,
    holdability: Holdability,
}

impl Default for ResultSetBehavior {
    fn default() -> Self {
        Self {
            result_set_type: ResultSetType::ForwardOnly,
            concurrency: Concurrency::ReadOnly,
            holdability: Holdability::CloseAtCommit,
        }
    }
}

impl ResultSetBehavior {
    /// Resolve a requested behaviour, discarding warnings.
    pub fn of(
        result_set_type: ResultSetType,
        concurrency: Concurrency,
        holdability: Holdability,
    ) -> Self {
        Self::resolve(result_set_type, concurrency, holdability, &mut WarningChain::new())
    }

    /// Resolve a requested behaviour, queueing warnings on `warnings`.
    pub fn resolve(
        result_set_type: ResultSetType,
        concurrency: Concurrency,
        holdability: Holdability,
        warnings: &mut WarningChain,
    ) -> Self {
        let result_set_type = match result_set_type {
            ResultSetType::ScrollSensitive => {
                let warning = Warning::new(
                    JB_RESULT_SET_TYPE_DOWNGRADE_SCROLL_SENSITIVE,
                    "Result set type changed. TYPE_SCROLL_SENSITIVE is not supported, \
                     using TYPE_SCROLL_INSENSITIVE instead",
                );
                warn!(target: "firebird_core::result_set", "{}", warning);
                warnings.push(warning);
                ResultSetType::ScrollInsensitive
            }
            other => other,
        };
        Self {
            result_set_type,
            concurrency,
            holdability,
        }
    }

    /// Resolve raw JDBC constants; invalid values are usage errors.
    pub fn from_jdbc(
        result_set_type: i32,
        concurrency: i32,
        holdability: i32,
        warnings: &mut WarningChain,
    ) -> Result<Self> {
        Ok(Self::resolve(
            ResultSetType::from_jdbc(result_set_type)?,
            Concurrency::from_jdbc(concurrency)?,
            Holdability::from_jdbc(holdability)?,
            warnings,
        ))
    }

    /// Same behaviour with concurrency forced to read-only.
    pub fn with_read_only(&self) -> Self {
        Self {
            concurrency: Concurrency::ReadOnly,
            ..*self
        }
    }

    pub fn result_set_type(&self) -> ResultSetType {
        self.result_set_type
    }

    pub fn concurrency(&self) -> Concurrency {
        self.concurrency
    }

    pub fn holdability(&self) -> Holdability {
        self.holdability
    }

    pub fn is_scrollable(&self) -> bool {
        self.result_set_type != ResultSetType::ForwardOnly
    }

    pub fn is_updatable(&self) -> bool {
        self.concurrency == Concurrency::Updatable
    }

    pub fn is_close_cursors_at_commit(&self) -> bool {
        self.holdability == Holdability::CloseAtCommit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TYPES: [ResultSetType; 3] = [
        ResultSetType::ForwardOnly,
        ResultSetType::ScrollInsensitive,
        ResultSetType::ScrollSensitive,
    ];
    const CONCURRENCIES: [Concurrency; 2] = [Concurrency::ReadOnly, Concurrency::Updatable];
    const HOLDABILITIES: [Holdability; 2] = [Holdability::HoldOverCommit, Holdability::CloseAtCommit];

    #[test]
    fn test_scroll_sensitive_downgrade_for_every_combination() {
        for t in TYPES {
            for c in CONCURRENCIES {
                for h in HOLDABILITIES {
                    let mut warnings = WarningChain::new();
                    let behavior = ResultSetBehavior::resolve(t, c, h, &mut warnings);
                    assert_eq!(behavior.concurrency(), c);
                    assert_eq!(behavior.holdability(), h);
                    if t == ResultSetType::ScrollSensitive {
                        assert_eq!(behavior.result_set_type(), ResultSetType::ScrollInsensitive);
                        assert_eq!(
                            warnings.first().map(|w| w.code),
                            Some(JB_RESULT_SET_TYPE_DOWNGRADE_SCROLL_SENSITIVE)
                        );
                    } else {
                        assert_eq!(behavior.result_set_type(), t);
                        assert!(warnings.is_empty());
                    }
                }
            }
        }
    }

    #[test]
    fn test_with_read_only() {
        let behavior = ResultSetBehavior::of(
            ResultSetType::ScrollInsensitive,
            Concurrency::Updatable,
            Holdability::HoldOverCommit,
        );
        assert!(behavior.is_updatable());
        let read_only = behavior.with_read_only();
        assert!(!read_only.is_updatable());
        assert!(read_only.is_scrollable());
        assert!(!read_only.is_close_cursors_at_commit());
    }

    #[test]
    fn test_invalid_jdbc_values() {
        let mut warnings = WarningChain::new();
        let err = ResultSetBehavior::from_jdbc(42, CONCUR_READ_ONLY, CLOSE_CURSORS_AT_COMMIT, &mut warnings)
            .unwrap_err();
        assert_eq!(err.error_code(), JB_INVALID_RESULT_SET_TYPE);
        let err = ResultSetBehavior::from_jdbc(TYPE_FORWARD_ONLY, 0, CLOSE_CURSORS_AT_COMMIT, &mut warnings)
            .unwrap_err();
        assert_eq!(err.error_code(), JB_INVALID_RESULT_SET_CONCURRENCY);
        let err = ResultSetBehavior::from_jdbc(TYPE_FORWARD_ONLY, CONCUR_READ_ONLY, 3, &mut warnings)
            .unwrap_err();
        assert_eq!(err.error_code(), JB_INVALID_RESULT_SET_HOLDABILITY);

        let behavior = ResultSetBehavior::from_jdbc(
            TYPE_SCROLL_SENSITIVE,
            CONCUR_READ_ONLY,
            HOLD_CURSORS_OVER_COMMIT,
            &mut warnings,
        )
        .unwrap();
        assert_eq!(behavior.result_set_type().jdbc_value(), TYPE_SCROLL_INSENSITIVE);
        assert_eq!(warnings.len(), 1);
    }
}
