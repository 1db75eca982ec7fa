//! Security master from a CSV file.

use std::path::Path;

use factorbeta_primitives::{Security, SecurityCode};
use serde::Deserialize;
use tracing::info;

use crate::IoError;

/// One row of the security master file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SecurityRecord {
    /// Security code.
    pub security_code: String,
    /// Display name.
    #[serde(default)]
    pub security_name: Option<String>,
    /// Explicit price-source symbol.
    #[serde(default)]
    pub price_symbol: Option<String>,
}

impl From<SecurityRecord> for Security {
    fn from(record: SecurityRecord) -> Self {
        let trimmed = |s: Option<String>| s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Self::new(
            SecurityCode::new(record.security_code.trim()),
            trimmed(record.security_name),
            trimmed(record.price_symbol),
        )
    }
}

/// Securities of `path`, in file order. Rows with an empty code are dropped.
///
/// # Errors
/// Returns an error if the file can't be read or a row is malformed.
pub fn read_securities(path: impl AsRef<Path>) -> Result<Vec<Security>, IoError> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new().has_headers(true).flexible(true).from_path(path)?;

    let mut securities = Vec::new();
    for result in reader.deserialize() {
        let record: SecurityRecord = result?;
        if record.security_code.trim().is_empty() {
            continue;
        }
        securities.push(Security::from(record));
    }

    info!(path = %path.display(), securities = securities.len(), "securities loaded");
    Ok(securities)
}
