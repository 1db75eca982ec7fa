//! Collaborator interfaces for data sources and estimate persistence.

use std::{thread, time::Duration};

use factorbeta_primitives::{
    BetaEstimate, Date, FactorCode, FactorDefinition, RawObservation, ReturnSeries,
};
use tracing::warn;

/// Errors reported by external collaborators.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollaboratorError {
    /// The collaborator could not be reached or timed out.
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    /// The collaborator answered with data that could not be interpreted.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The collaborator refused the request.
    #[error("request rejected: {0}")]
    Rejected(String),
}

impl CollaboratorError {
    /// Returns whether retrying the same call may succeed.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Source of daily security returns.
pub trait SecurityReturnSource {
    /// Returns for `symbol` up to and including `end`, or `None` when the
    /// source has no usable price history for the symbol.
    ///
    /// # Errors
    /// Returns `CollaboratorError` when the source fails.
    fn security_returns(
        &self,
        symbol: &str,
        end: Date,
    ) -> Result<Option<ReturnSeries>, CollaboratorError>;
}

/// Source of raw factor level observations.
pub trait FactorObservationSource {
    /// Observations for `code` within `[start, end]`, in source order.
    ///
    /// # Errors
    /// Returns `CollaboratorError` when the source fails.
    fn factor_observations(
        &self,
        code: &FactorCode,
        start: Date,
        end: Date,
    ) -> Result<Vec<RawObservation>, CollaboratorError>;
}

/// Source of factor metadata.
pub trait FactorDefinitionSource {
    /// All factor definitions for the run.
    ///
    /// # Errors
    /// Returns `CollaboratorError` when the source fails.
    fn factor_definitions(&self) -> Result<Vec<FactorDefinition>, CollaboratorError>;
}

/// Persistence target for beta estimates.
pub trait BetaEstimateSink {
    /// Upsert a chunk of estimates keyed by [`BetaEstimate::key`], returning
    /// the number of rows written.
    ///
    /// # Errors
    /// Returns `CollaboratorError` when the chunk was not persisted.
    fn upsert(&mut self, chunk: &[BetaEstimate]) -> Result<usize, CollaboratorError>;
}

/// Write-back target for calibrated lag policies.
pub trait LagPolicySink {
    /// Record `lag` as the policy of factor `code`.
    ///
    /// # Errors
    /// Returns `CollaboratorError` when the update was not persisted.
    fn update_lag_policy(&mut self, code: &FactorCode, lag: i32) -> Result<(), CollaboratorError>;
}

/// Bounded retry for collaborator calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Pause between attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, backoff: Duration::from_millis(200) }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self { max_attempts: 1, backoff: Duration::ZERO }
    }

    /// Run `op`, retrying recoverable failures until attempts run out.
    ///
    /// # Errors
    /// Returns the last error, or the first non-recoverable one.
    pub fn run<T>(
        &self,
        what: &str,
        mut op: impl FnMut() -> Result<T, CollaboratorError>,
    ) -> Result<T, CollaboratorError> {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_recoverable() && attempt < attempts => {
                    warn!(%what, attempt, error = %err, "collaborator call failed, retrying");
                    if !self.backoff.is_zero() {
                        thread::sleep(self.backoff);
                    }
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[test]
    fn retries_unavailable_until_success() {
        let calls = Cell::new(0);
        let policy = RetryPolicy { max_attempts: 3, backoff: Duration::ZERO };
        let out = policy.run("fetch", || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(CollaboratorError::Unavailable("timeout".to_string()))
            } else {
                Ok(7)
            }
        });
        assert_eq!(out, Ok(7));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let calls = Cell::new(0);
        let policy = RetryPolicy { max_attempts: 2, backoff: Duration::ZERO };
        let out: Result<(), _> = policy.run("fetch", || {
            calls.set(calls.get() + 1);
            Err(CollaboratorError::Unavailable("down".to_string()))
        });
        assert!(out.is_err());
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn does_not_retry_malformed() {
        let calls = Cell::new(0);
        let out: Result<(), _> = RetryPolicy::default().run("fetch", || {
            calls.set(calls.get() + 1);
            Err(CollaboratorError::Malformed("bad json".to_string()))
        });
        assert_eq!(out, Err(CollaboratorError::Malformed("bad json".to_string())));
        assert_eq!(calls.get(), 1);
    }
}
