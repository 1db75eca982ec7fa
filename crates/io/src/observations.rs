//! Factor observations from a long-form CSV file.

use std::{collections::HashMap, path::Path};

use factorbeta_primitives::{Date, FactorCode, RawDate, RawObservation, RawValue};
use factorbeta_traits::{CollaboratorError, FactorObservationSource};
use factorbeta_utils::coerce_date;
use serde::Deserialize;
use tracing::info;

use crate::IoError;

#[derive(Debug, Deserialize)]
struct ObservationRow {
    factor_code: String,
    date: String,
    #[serde(default)]
    value: Option<String>,
}

/// Observations of every factor, read once from a
/// `factor_code,date,value` file.
///
/// Dates and values are kept as text; the normalizer decides what is usable.
#[derive(Debug, Clone, Default)]
pub struct CsvFactorObservations {
    rows: HashMap<FactorCode, Vec<RawObservation>>,
}

impl CsvFactorObservations {
    /// Read `path`.
    ///
    /// # Errors
    /// Returns an error if the file can't be read or a row lacks a column.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let path = path.as_ref();
        let mut reader = csv::ReaderBuilder::new().has_headers(true).flexible(true).from_path(path)?;

        let mut rows: HashMap<FactorCode, Vec<RawObservation>> = HashMap::new();
        let mut total = 0;
        for result in reader.deserialize() {
            let row: ObservationRow = result?;
            let value = row.value.map_or(RawValue::Missing, RawValue::Text);
            rows.entry(FactorCode::new(row.factor_code.trim()))
                .or_default()
                .push(RawObservation::new(RawDate::Text(row.date), value));
            total += 1;
        }

        info!(path = %path.display(), factors = rows.len(), rows = total, "factor observations loaded");
        Ok(Self { rows })
    }

    /// Build from observations already in memory.
    #[must_use]
    pub const fn from_rows(rows: HashMap<FactorCode, Vec<RawObservation>>) -> Self {
        Self { rows }
    }

    /// Factor codes present in the file.
    pub fn factor_codes(&self) -> impl Iterator<Item = &FactorCode> {
        self.rows.keys()
    }
}

impl FactorObservationSource for CsvFactorObservations {
    fn factor_observations(
        &self,
        code: &FactorCode,
        start: Date,
        end: Date,
    ) -> Result<Vec<RawObservation>, CollaboratorError> {
        let Some(rows) = self.rows.get(code) else {
            return Ok(Vec::new());
        };
        // Unreadable dates pass through so they are counted downstream
        Ok(rows
            .iter()
            .filter(|o| coerce_date(&o.date).is_none_or(|d| d >= start && d <= end))
            .cloned()
            .collect())
    }
}
