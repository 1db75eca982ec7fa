//! Engine and run configuration.

use std::{path::Path, time::Duration};

use factorbeta_primitives::FactorCode;
use factorbeta_traits::RetryPolicy;
use factorbeta_utils::{
    DEFAULT_DELAY_SENSITIVE_FACTORS, DuplicatePolicy, LagPolicy, MatrixConfig, NormalizeConfig,
};
use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Default trailing window, in observations.
pub const WINDOW_DAYS: usize = 252;

/// Default minimum overlap for a factor to be estimated.
pub const MIN_NOBS: usize = 60;

/// Parameters of the regression engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Most recent observations kept in each regression sample.
    pub window_days: usize,
    /// Minimum overlapping observations for a factor to be eligible, and for
    /// a multi-factor sample to be fitted.
    pub min_nobs: usize,
    /// Lag for factors without an explicit or delay-sensitive policy.
    pub lag_default: i32,
    /// Months between a monthly observation and its release.
    pub release_lag_months: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { window_days: WINDOW_DAYS, min_nobs: MIN_NOBS, lag_default: 0, release_lag_months: 1 }
    }
}

impl EngineConfig {
    /// Check the parameters.
    ///
    /// # Errors
    /// Returns [`ModelError::InvalidConfig`] for a zero window, a minimum
    /// below two observations, or a window that can never hold a
    /// multi-factor sample of `min_nobs` rows.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.window_days == 0 {
            return Err(ModelError::InvalidConfig("window_days must be positive".to_string()));
        }
        if self.min_nobs < 2 {
            return Err(ModelError::InvalidConfig("min_nobs must be at least 2".to_string()));
        }
        if self.window_days < self.min_nobs {
            return Err(ModelError::InvalidConfig(format!(
                "window_days {} is shorter than min_nobs {}",
                self.window_days, self.min_nobs
            )));
        }
        Ok(())
    }
}

/// Lag sweep of the calibrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Smallest lag tried.
    pub min_lag: i32,
    /// Largest lag tried.
    pub max_lag: i32,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self { min_lag: -3, max_lag: 3 }
    }
}

/// Everything a batch run needs besides its collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Regression parameters.
    pub engine: EngineConfig,
    /// Calendar days of factor history fetched before the end date.
    pub lookback_days: u32,
    /// Price interval label recorded with every estimate.
    pub price_interval: String,
    /// Lookback label recorded with every estimate.
    pub lookback_window: String,
    /// Estimates per upsert call.
    pub upsert_chunk_size: usize,
    /// Attempts per collaborator call.
    pub retry_attempts: u32,
    /// Pause between attempts, in milliseconds.
    pub retry_backoff_ms: u64,
    /// Lag for delay-sensitive factors without an explicit policy.
    pub delay_sensitive_lag: i32,
    /// Delay-sensitive factor codes.
    pub delay_sensitive_factors: Vec<FactorCode>,
    /// Handling of conflicting duplicate observations.
    pub duplicate_policy: DuplicatePolicy,
    /// Lag sweep.
    pub calibration: CalibrationConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            lookback_days: 850,
            price_interval: "1d".to_string(),
            lookback_window: "2y".to_string(),
            upsert_chunk_size: 500,
            retry_attempts: 3,
            retry_backoff_ms: 200,
            delay_sensitive_lag: 1,
            delay_sensitive_factors: DEFAULT_DELAY_SENSITIVE_FACTORS
                .iter()
                .map(|c| FactorCode::from(*c))
                .collect(),
            duplicate_policy: DuplicatePolicy::KeepLast,
            calibration: CalibrationConfig::default(),
        }
    }
}

impl RunConfig {
    /// Parse a TOML document; absent keys keep their defaults.
    ///
    /// # Errors
    /// Returns an error if the document is not valid TOML for this type or
    /// the values fail [`Self::validate`].
    pub fn from_toml(content: &str) -> Result<Self, ModelError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file can't be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ModelError> {
        Self::from_toml(&std::fs::read_to_string(path)?)
    }

    /// Check the parameters.
    ///
    /// # Errors
    /// Returns [`ModelError::InvalidConfig`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ModelError> {
        self.engine.validate()?;
        if self.upsert_chunk_size == 0 {
            return Err(ModelError::InvalidConfig("upsert_chunk_size must be positive".to_string()));
        }
        if self.retry_attempts == 0 {
            return Err(ModelError::InvalidConfig("retry_attempts must be positive".to_string()));
        }
        if self.calibration.min_lag > self.calibration.max_lag {
            return Err(ModelError::InvalidConfig(format!(
                "calibration range {}..={} is empty",
                self.calibration.min_lag, self.calibration.max_lag
            )));
        }
        Ok(())
    }

    /// Retry policy for collaborator calls.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry_attempts,
            backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }

    /// Lag defaults for factors without an explicit policy.
    #[must_use]
    pub fn lag_policy(&self) -> LagPolicy {
        LagPolicy {
            lag_default: self.engine.lag_default,
            delay_sensitive_lag: self.delay_sensitive_lag,
            delay_sensitive_factors: self.delay_sensitive_factors.clone(),
        }
    }

    /// Factor matrix configuration.
    #[must_use]
    pub fn matrix_config(&self) -> MatrixConfig {
        MatrixConfig {
            lookback_days: self.lookback_days,
            release_lag_months: self.engine.release_lag_months,
            normalize: NormalizeConfig {
                duplicate_policy: self.duplicate_policy,
                ..NormalizeConfig::default()
            },
            lag: self.lag_policy(),
            ..MatrixConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RunConfig::default();
        assert_eq!(config.engine.window_days, 252);
        assert_eq!(config.engine.min_nobs, 60);
        assert_eq!(config.upsert_chunk_size, 500);
        assert_eq!(config.price_interval, "1d");
        assert!(config.delay_sensitive_factors.contains(&FactorCode::from("F_VOL_VIX")));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = RunConfig::from_toml(
            r#"
            lookback_window = "3y"
            duplicate_policy = "reject"

            [engine]
            min_nobs = 40
            "#,
        )
        .unwrap();

        assert_eq!(config.engine.min_nobs, 40);
        assert_eq!(config.engine.window_days, 252);
        assert_eq!(config.lookback_window, "3y");
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Reject);
        assert_eq!(config.calibration, CalibrationConfig::default());
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            RunConfig::from_toml("[engine]\nwindow_days = 0"),
            Err(ModelError::InvalidConfig(_))
        ));
        assert!(matches!(
            RunConfig::from_toml("[calibration]\nmin_lag = 2\nmax_lag = 1"),
            Err(ModelError::InvalidConfig(_))
        ));
        assert!(matches!(RunConfig::from_toml("upsert_chunk_size = \"x\""), Err(ModelError::ConfigParse(_))));
    }

    #[test]
    fn window_shorter_than_min_nobs_is_rejected() {
        let mut config = RunConfig::default();
        config.engine.window_days = 40;
        assert!(matches!(config.validate(), Err(ModelError::InvalidConfig(_))));

        config.engine.window_days = 60;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn matrix_config_carries_lag_policy() {
        let mut config = RunConfig::default();
        config.engine.lag_default = 2;
        let matrix = config.matrix_config();
        assert_eq!(matrix.lag.lag_default, 2);
        assert_eq!(matrix.lookback_days, 850);
    }
}
