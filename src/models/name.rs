use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::UntestedError;

/// Identity of a registered test: `module.category.test`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TestName {
    pub module: String,
    pub category: String,
    pub test: String,
}

impl TestName {
    pub fn new(
        module: impl Into<String>,
        category: impl Into<String>,
        test: impl Into<String>,
    ) -> Self {
        Self {
            module: module.into(),
            category: category.into(),
            test: test.into(),
        }
    }

    /// Parse a canonical dotted name. Exactly three non-empty segments are required.
    pub fn parse(full: &str) -> Result<Self, UntestedError> {
        let mut parts = full.split('.');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(m), Some(c), Some(t), None) if !m.is_empty() && !c.is_empty() && !t.is_empty() => {
                Ok(Self::new(m, c, t))
            }
            _ => Err(UntestedError::InvalidName(full.to_string())),
        }
    }

    /// The canonical dotted form used as the registry key.
    pub fn full(&self) -> String {
        format!("{}.{}.{}", self.module, self.category, self.test)
    }
}

impl fmt::Display for TestName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.module, self.category, self.test)
    }
}
