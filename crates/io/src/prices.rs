//! Security prices from per-symbol CSV files.

use std::path::{Path, PathBuf};

use csv::StringRecord;
use factorbeta_primitives::{Date, RawDate, RawObservation, RawValue, ReturnSeries};
use factorbeta_traits::{CollaboratorError, ReturnTransform, SecurityReturnSource};
use factorbeta_transforms::LogReturn;
use factorbeta_utils::{SeriesNormalizer, UtilsError, coerce_date};
use tracing::debug;

use crate::IoError;

/// Price columns in order of preference.
const PRICE_COLUMNS: [&str; 2] = ["adj close", "close"];

/// Configuration for [`CsvPriceSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceSourceConfig {
    /// Fewest prices on or before the end date for a symbol to be usable.
    pub min_prices: usize,
}

impl Default for PriceSourceConfig {
    fn default() -> Self {
        Self { min_prices: 65 }
    }
}

/// Reads `<dir>/<symbol>.csv` with a `Date` column and an `Adj Close` or
/// `Close` column, and turns the prices into daily log returns.
#[derive(Debug, Clone)]
pub struct CsvPriceSource {
    dir: PathBuf,
    config: PriceSourceConfig,
}

impl CsvPriceSource {
    /// Create a source over `dir` with default configuration.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_config(dir, PriceSourceConfig::default())
    }

    /// Create a source with custom configuration.
    pub fn with_config(dir: impl Into<PathBuf>, config: PriceSourceConfig) -> Self {
        Self { dir: dir.into(), config }
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &PriceSourceConfig {
        &self.config
    }

    /// File holding the prices of `symbol`.
    #[must_use]
    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.csv"))
    }

    /// Raw price observations of one file, from the preferred price column.
    ///
    /// # Errors
    /// Returns an error if the file can't be read or has no date or price
    /// column.
    pub fn read_prices(path: &Path) -> Result<Vec<RawObservation>, IoError> {
        let mut reader = csv::ReaderBuilder::new().has_headers(true).flexible(true).from_path(path)?;
        let headers = reader.headers()?.clone();

        let date_idx = column(&headers, "date").ok_or_else(|| IoError::MissingColumn {
            path: path.to_path_buf(),
            column: "Date".to_string(),
        })?;
        let price_idx = PRICE_COLUMNS
            .iter()
            .find_map(|name| column(&headers, name))
            .ok_or_else(|| IoError::MissingColumn {
                path: path.to_path_buf(),
                column: "Adj Close or Close".to_string(),
            })?;

        let mut prices = Vec::new();
        for result in reader.records() {
            let record = result?;
            let date = record.get(date_idx).unwrap_or_default();
            let value = record.get(price_idx).map_or(RawValue::Missing, |v| RawValue::Text(v.to_string()));
            prices.push(RawObservation::new(RawDate::Text(date.to_string()), value));
        }
        Ok(prices)
    }
}

fn column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name))
}

impl SecurityReturnSource for CsvPriceSource {
    fn security_returns(
        &self,
        symbol: &str,
        end: Date,
    ) -> Result<Option<ReturnSeries>, CollaboratorError> {
        let path = self.path_for(symbol);
        if !path.is_file() {
            debug!(%symbol, path = %path.display(), "no price file");
            return Ok(None);
        }

        let raw: Vec<RawObservation> = Self::read_prices(&path)?
            .into_iter()
            .filter(|o| coerce_date(&o.date).is_some_and(|d| d <= end))
            .collect();

        let levels = match SeriesNormalizer::new().normalize(&raw) {
            Ok((levels, _)) => levels,
            Err(UtilsError::InsufficientData { .. }) => return Ok(None),
            Err(err) => return Err(CollaboratorError::Malformed(err.to_string())),
        };
        if levels.len() < self.config.min_prices {
            debug!(%symbol, prices = levels.len(), required = self.config.min_prices, "too few prices");
            return Ok(None);
        }

        let returns = LogReturn.apply(&levels);
        Ok((!returns.is_empty()).then_some(returns))
    }
}
