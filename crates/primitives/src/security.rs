//! Security type definitions.

use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};

/// Code identifying a security in the security master.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Into, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SecurityCode(pub String);

impl SecurityCode {
    /// Create a new security code.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the security code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this code denotes the cash line rather than a priced security.
    #[must_use]
    pub fn is_cash(&self) -> bool {
        self.0.trim().eq_ignore_ascii_case("CASH")
    }
}

impl From<&str> for SecurityCode {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A security whose betas are estimated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Security {
    /// Security master code.
    pub code: SecurityCode,
    /// Display name.
    pub name: Option<String>,
    /// Explicit symbol at the price source, when known.
    pub price_symbol: Option<String>,
}

impl Security {
    /// Create a new security.
    #[must_use]
    pub const fn new(code: SecurityCode, name: Option<String>, price_symbol: Option<String>) -> Self {
        Self { code, name, price_symbol }
    }

    /// Create a security with just a code.
    #[must_use]
    pub const fn simple(code: SecurityCode) -> Self {
        Self { code, name: None, price_symbol: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn security_code_from_str() {
        let code: SecurityCode = "005930".into();
        assert_eq!(code.as_str(), "005930");
        assert_eq!(code.to_string(), "005930");
    }

    #[test]
    fn cash_detection() {
        assert!(SecurityCode::new("CASH").is_cash());
        assert!(SecurityCode::new(" cash ").is_cash());
        assert!(!SecurityCode::new("CASHX").is_cash());
    }
}
