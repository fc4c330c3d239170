//! Non-fatal diagnostics queued on a connection or statement.

use std::fmt;

/// A single warning with a stable code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub code: u32,
    pub message: String,
}

impl Warning {
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

/// Warnings in the order they were raised, kept until cleared.
#[derive(Debug, Clone, Default)]
pub struct WarningChain {
    warnings: Vec<Warning>,
}

impl WarningChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, warning: Warning) {
        self.warnings.push(warning);
    }

    /// First warning raised, if any.
    pub fn first(&self) -> Option<&Warning> {
        self.warnings.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Warning> {
        self.warnings.iter()
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Drop every queued warning.
    pub fn clear(&mut self) {
        self.warnings.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_keeps_order_until_cleared() {
        let mut chain = WarningChain::new();
        chain.push(Warning::new(1, "first"));
        chain.push(Warning::new(2, "second"));
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.first().map(|w| w.code), Some(1));
        assert_eq!(
            chain.iter().map(|w| w.message.as_str()).collect::<Vec<_>>(),
            vec!["first", "second"]
        );
        chain.clear();
        assert!(chain.is_empty());
        assert!(chain.first().is_none());
    }
}
