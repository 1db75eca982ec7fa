//! Factor metadata from a CSV file.

use std::path::{Path, PathBuf};

use factorbeta_primitives::{FactorCode, FactorDefinition, Frequency, SecurityCode, TransformRule};
use factorbeta_traits::{CollaboratorError, FactorDefinitionSource, LagPolicySink, TransformError};
use factorbeta_utils::{FactorExclusion, parse_lag_policy};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::IoError;

/// One row of the factor metadata file, as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefinitionRecord {
    /// Factor code.
    pub factor_code: String,
    /// Display name.
    #[serde(default)]
    pub factor_name: Option<String>,
    /// `D` or `M`.
    pub frequency: String,
    /// `log_return`, `diff_pp` or `duration_return`.
    pub transform_rule: String,
    /// Duration for `duration_return`.
    #[serde(default)]
    pub duration_years: Option<f64>,
    /// Free-text lag, e.g. `1` or `lag=1`.
    #[serde(default)]
    pub lag_policy: Option<String>,
    /// Release lag of a monthly factor.
    #[serde(default)]
    pub release_lag_months: Option<u32>,
    /// Reference security for lag calibration.
    #[serde(default)]
    pub lag_policy_stock_code: Option<String>,
}

impl DefinitionRecord {
    /// Typed definition.
    ///
    /// # Errors
    /// Returns [`TransformError`] for an unsupported frequency or transform.
    pub fn to_definition(&self) -> Result<FactorDefinition, TransformError> {
        let frequency: Frequency = self.frequency.parse()?;
        let transform = TransformRule::parse_with_duration(&self.transform_rule, self.duration_years)?;

        let mut definition = FactorDefinition::new(self.factor_code.trim(), frequency, transform);
        definition.name = non_empty(self.factor_name.as_deref()).map(str::to_string);
        definition.lag = non_empty(self.lag_policy.as_deref()).and_then(parse_lag_policy);
        definition.release_lag_months = self.release_lag_months;
        definition.lag_reference =
            non_empty(self.lag_policy_stock_code.as_deref()).map(SecurityCode::new);
        Ok(definition)
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// Factor metadata file.
///
/// Rows with an unsupported frequency or transform are left out of
/// [`FactorDefinitionSource::factor_definitions`]; [`Self::partition`] returns
/// them as exclusions. They stay in the file. Calibrated lags are written back
/// into `lag_policy`.
#[derive(Debug, Clone)]
pub struct CsvFactorDefinitions {
    path: PathBuf,
    records: Vec<DefinitionRecord>,
}

impl CsvFactorDefinitions {
    /// Read `path`.
    ///
    /// # Errors
    /// Returns an error if the file can't be read or a row is malformed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let path = path.as_ref().to_path_buf();
        let mut reader = csv::ReaderBuilder::new().has_headers(true).flexible(true).from_path(&path)?;
        let records = reader.deserialize().collect::<Result<Vec<DefinitionRecord>, _>>()?;
        info!(path = %path.display(), factors = records.len(), "factor definitions loaded");
        Ok(Self { path, records })
    }

    /// Stored rows.
    #[must_use]
    pub fn records(&self) -> &[DefinitionRecord] {
        &self.records
    }

    /// Typed definitions of the rows that parse, in file order.
    #[must_use]
    pub fn definitions(&self) -> Vec<FactorDefinition> {
        self.partition().0
    }

    /// Typed definitions, and the rows that don't parse as exclusions with
    /// reasons such as `unsupported_transform(yoy)`. Both in file order.
    #[must_use]
    pub fn partition(&self) -> (Vec<FactorDefinition>, Vec<FactorExclusion>) {
        let mut definitions = Vec::with_capacity(self.records.len());
        let mut rejected = Vec::new();
        for record in &self.records {
            match record.to_definition() {
                Ok(definition) => definitions.push(definition),
                Err(err) => {
                    warn!(factor = %record.factor_code, error = %err, "factor definition rejected");
                    rejected.push(FactorExclusion {
                        code: FactorCode::new(record.factor_code.trim()),
                        reason: err.exclusion_reason(),
                    });
                }
            }
        }
        (definitions, rejected)
    }

    /// Rewrite the file with the current rows.
    ///
    /// # Errors
    /// Returns an error if the file can't be written.
    pub fn save(&self) -> Result<(), IoError> {
        let mut writer = csv::Writer::from_path(&self.path)?;
        for record in &self.records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl FactorDefinitionSource for CsvFactorDefinitions {
    fn factor_definitions(&self) -> Result<Vec<FactorDefinition>, CollaboratorError> {
        Ok(self.definitions())
    }
}

impl LagPolicySink for CsvFactorDefinitions {
    fn update_lag_policy(&mut self, code: &FactorCode, lag: i32) -> Result<(), CollaboratorError> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.factor_code.trim() == code.as_str())
            .ok_or_else(|| CollaboratorError::Rejected(format!("unknown factor {code}")))?;
        record.lag_policy = Some(lag.to_string());
        self.save()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn metadata() -> NamedTempFile {
        let mut file = NamedTempFile::with_suffix(".csv").unwrap();
        writeln!(
            file,
            "factor_code,factor_name,frequency,transform_rule,duration_years,lag_policy,release_lag_months,lag_policy_stock_code"
        )
        .unwrap();
        writeln!(file, "F_VOL_VIX,VIX,D,log_return,,lag=1,,005930").unwrap();
        writeln!(file, "F_RATE_KR10Y,KTB 10Y,D,duration_return,7.5,,,").unwrap();
        writeln!(file, "F_INFL_KR_CPI,CPI,M,log_return,,,1,").unwrap();
        writeln!(file, "F_WEIRD,Weird,W,log_return,,,,").unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn parses_rows_and_rejects_unsupported() {
        let file = metadata();
        let source = CsvFactorDefinitions::from_path(file.path()).unwrap();

        let defs = source.factor_definitions().unwrap();

        assert_eq!(defs.len(), 3);
        assert_eq!(defs[0].lag, Some(1));
        assert_eq!(defs[0].lag_reference, Some(SecurityCode::new("005930")));
        assert_eq!(defs[1].transform, TransformRule::DurationReturn { duration_years: 7.5 });
        assert_eq!(defs[1].lag, None);
        assert!(defs[2].is_monthly());
        assert_eq!(defs[2].release_lag_months, Some(1));
        assert_eq!(source.records().len(), 4);
    }

    #[test]
    fn unsupported_rows_become_exclusions() {
        let mut file = NamedTempFile::with_suffix(".csv").unwrap();
        writeln!(file, "factor_code,frequency,transform_rule").unwrap();
        writeln!(file, "F_A,D,log_return").unwrap();
        writeln!(file, "F_B,D,yoy").unwrap();
        writeln!(file, "F_C,W,diff_pp").unwrap();
        file.flush().unwrap();

        let (defs, rejected) = CsvFactorDefinitions::from_path(file.path()).unwrap().partition();

        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].code, FactorCode::new("F_A"));
        assert_eq!(
            rejected,
            vec![
                FactorExclusion {
                    code: FactorCode::new("F_B"),
                    reason: "unsupported_transform(yoy)".to_string()
                },
                FactorExclusion {
                    code: FactorCode::new("F_C"),
                    reason: "unsupported_frequency(w)".to_string()
                },
            ]
        );
    }

    #[test]
    fn lag_write_back_rewrites_file() {
        let file = metadata();
        let mut source = CsvFactorDefinitions::from_path(file.path()).unwrap();

        source.update_lag_policy(&"F_RATE_KR10Y".into(), -2).unwrap();

        let reread = CsvFactorDefinitions::from_path(file.path()).unwrap();
        assert_eq!(reread.definitions()[1].lag, Some(-2));
        assert_eq!(reread.records().len(), 4);

        let err = source.update_lag_policy(&"F_NONE".into(), 1).unwrap_err();
        assert!(matches!(err, CollaboratorError::Rejected(_)));
    }
}
