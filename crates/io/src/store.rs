//! In-memory persistence targets.

use std::collections::BTreeMap;

use factorbeta_primitives::{BetaEstimate, EstimateKey, FactorCode};
use factorbeta_traits::{BetaEstimateSink, CollaboratorError, LagPolicySink};
use tracing::debug;

/// Estimate store keyed by [`EstimateKey`].
///
/// Upserting the same key twice keeps one row holding the latest values.
#[derive(Debug, Clone, Default)]
pub struct MemoryEstimateStore {
    rows: BTreeMap<EstimateKey, BetaEstimate>,
}

impl MemoryEstimateStore {
    /// Create an empty store.
    #[must_use]
    pub const fn new() -> Self {
        Self { rows: BTreeMap::new() }
    }

    /// Number of stored rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the store holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Stored estimates in key order.
    pub fn estimates(&self) -> impl Iterator<Item = &BetaEstimate> {
        self.rows.values()
    }

    /// Stored estimate under `key`.
    #[must_use]
    pub fn get(&self, key: &EstimateKey) -> Option<&BetaEstimate> {
        self.rows.get(key)
    }
}

impl BetaEstimateSink for MemoryEstimateStore {
    fn upsert(&mut self, chunk: &[BetaEstimate]) -> Result<usize, CollaboratorError> {
        for estimate in chunk {
            self.rows.insert(estimate.key(), estimate.clone());
        }
        debug!(rows = chunk.len(), stored = self.rows.len(), "estimates upserted");
        Ok(chunk.len())
    }
}

/// Lag policy updates kept in memory, e.g. for dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryLagPolicyStore {
    lags: BTreeMap<FactorCode, i32>,
}

impl MemoryLagPolicyStore {
    /// Create an empty store.
    #[must_use]
    pub const fn new() -> Self {
        Self { lags: BTreeMap::new() }
    }

    /// Recorded lag of `code`.
    #[must_use]
    pub fn lag(&self, code: &FactorCode) -> Option<i32> {
        self.lags.get(code).copied()
    }

    /// All recorded lags in factor order.
    pub fn lags(&self) -> impl Iterator<Item = (&FactorCode, i32)> {
        self.lags.iter().map(|(code, lag)| (code, *lag))
    }
}

impl LagPolicySink for MemoryLagPolicyStore {
    fn update_lag_policy(&mut self, code: &FactorCode, lag: i32) -> Result<(), CollaboratorError> {
        self.lags.insert(code.clone(), lag);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use factorbeta_primitives::{Date, Method, Provenance};
    use rstest::rstest;

    use super::*;

    fn estimate(factor: &str, method: Method, beta: f64) -> BetaEstimate {
        BetaEstimate {
            asof_date: Date::from_ymd_opt(2024, 6, 28).unwrap(),
            window_days: 252,
            security_code: "005930".into(),
            factor_code: factor.into(),
            method,
            beta: Some(beta),
            alpha: Some(0.0),
            r_squared: Some(0.5),
            n_obs: 252,
            provenance: Provenance {
                price_interval: "1d".to_string(),
                lookback_window: "2y".to_string(),
                price_source: "005930.KS".to_string(),
            },
        }
    }

    #[test]
    fn upsert_replaces_same_key() {
        let mut store = MemoryEstimateStore::new();
        let first = vec![estimate("F_A", Method::Single, 1.0), estimate("F_A", Method::Multi, 0.8)];

        assert_eq!(store.upsert(&first).unwrap(), 2);
        assert_eq!(store.upsert(&[estimate("F_A", Method::Single, 1.5)]).unwrap(), 1);

        assert_eq!(store.len(), 2);
        let single = store.get(&first[0].key()).unwrap();
        assert_eq!(single.beta, Some(1.5));
    }

    #[rstest]
    #[case(&[1], 1)]
    #[case(&[1, -2], -2)]
    #[case(&[0, 3, 0], 0)]
    fn lag_store_keeps_last_update(#[case] updates: &[i32], #[case] expected: i32) {
        let mut store = MemoryLagPolicyStore::new();
        let code = FactorCode::new("F_VOL_VIX");
        for lag in updates {
            store.update_lag_policy(&code, *lag).unwrap();
        }
        assert_eq!(store.lag(&code), Some(expected));
        assert_eq!(store.lags().count(), 1);
    }
}
