//! Per-security run report.

use std::fmt;

use factorbeta_primitives::{Date, FactorCode, Security};
use serde::{Deserialize, Serialize};

use crate::{BetaEstimation, MultiOutcome};

/// Outcome of one security.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    /// At least one regression produced a fit.
    Ok,
    /// Nothing was estimated.
    Skip,
    /// Estimation was attempted and every regression failed.
    Fail,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ok => "OK",
            Self::Skip => "SKIP",
            Self::Fail => "FAIL",
        })
    }
}

/// One line of the run report. Factor lists are `|`-separated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    /// Security code.
    pub security_code: String,
    /// Security name.
    pub security_name: String,
    /// Outcome.
    pub status: Status,
    /// Human-readable reason.
    pub reason: String,
    /// Price-source symbol the returns came from.
    pub used_source: String,
    /// As-of date of the headline fit.
    pub asof_date: Option<Date>,
    /// Observations of the headline fit.
    pub n_obs: usize,
    /// Factors with a single-factor fit.
    pub single_eligible: String,
    /// Factors without enough overlap, or absent from the matrix.
    pub single_skipped: String,
    /// Eligible factors whose single fit failed.
    pub single_failed: String,
    /// Factors in the multi-factor fit.
    pub multi_eligible: String,
    /// Factors left out of the multi-factor fit.
    pub multi_skipped: String,
    /// Factors of a multi-factor fit the solver rejected.
    pub multi_failed: String,
}

impl ReportRow {
    /// Row for a security that never reached estimation.
    #[must_use]
    pub fn skipped(security: &Security, reason: impl Into<String>, used_source: &str) -> Self {
        Self {
            security_code: security.code.to_string(),
            security_name: security.name.clone().unwrap_or_default(),
            status: Status::Skip,
            reason: reason.into(),
            used_source: used_source.to_string(),
            asof_date: None,
            n_obs: 0,
            single_eligible: String::new(),
            single_skipped: String::new(),
            single_failed: String::new(),
            multi_eligible: String::new(),
            multi_skipped: String::new(),
            multi_failed: String::new(),
        }
    }

    /// Row summarizing an estimation.
    #[must_use]
    pub fn from_estimation(
        security: &Security,
        used_source: &str,
        estimation: &BetaEstimation,
        min_nobs: usize,
    ) -> Self {
        let diag = &estimation.diagnostics;
        let not_eligible: Vec<&FactorCode> =
            diag.skipped.iter().map(|s| &s.code).chain(&diag.missing).collect();

        let mut row = Self::skipped(security, String::new(), used_source);
        row.single_eligible = join(estimation.single.iter().map(|f| &f.factor_code));
        row.single_skipped = join(not_eligible.iter().copied());
        row.single_failed = join(diag.failed.iter().map(|f| &f.code));

        let (multi_eligible, multi_skipped, multi_failed) = match &diag.multi {
            MultiOutcome::Fitted => (join(&diag.eligible), join(not_eligible.iter().copied()), String::new()),
            MultiOutcome::Degenerate { .. } | MultiOutcome::NoEligibleFactors => (
                String::new(),
                join(diag.eligible.iter().chain(not_eligible.iter().copied())),
                String::new(),
            ),
            MultiOutcome::Failed { .. } => {
                (String::new(), join(not_eligible.iter().copied()), join(&diag.eligible))
            }
        };
        row.multi_eligible = multi_eligible;
        row.multi_skipped = multi_skipped;
        row.multi_failed = multi_failed;

        if diag.eligible.is_empty() {
            row.reason = format!("no_factor_overlap(min_nobs={min_nobs})");
            return row;
        }

        if estimation.is_empty() {
            row.status = Status::Fail;
            row.reason = diag
                .failed
                .first()
                .map(|f| format!("solver_failure:{}", f.reason))
                .or_else(|| match &diag.multi {
                    MultiOutcome::Failed { reason } => Some(format!("solver_failure:{reason}")),
                    _ => None,
                })
                .unwrap_or_else(|| "no_fit".to_string());
            return row;
        }

        row.status = Status::Ok;
        let mut reason = format!(
            "ok_factors={}, skipped_factors={}",
            diag.eligible.len(),
            not_eligible.len()
        );
        match &diag.multi {
            MultiOutcome::Degenerate { n_obs } => reason.push_str(&format!(", multi_thin(n_obs={n_obs})")),
            MultiOutcome::Failed { reason: why } => reason.push_str(&format!(", multi_failed:{why}")),
            MultiOutcome::Fitted | MultiOutcome::NoEligibleFactors => {}
        }
        if !diag.failed.is_empty() {
            reason.push_str(&format!(", single_failed={}", diag.failed.len()));
        }
        row.reason = reason;

        if let Some(multi) = &estimation.multi {
            row.asof_date = Some(multi.asof_date);
            row.n_obs = multi.n_obs;
        } else if let Some(latest) = estimation.single.iter().max_by_key(|f| f.asof_date) {
            row.asof_date = Some(latest.asof_date);
            row.n_obs = latest.n_obs;
        }
        row
    }
}

fn join<'a>(codes: impl IntoIterator<Item = &'a FactorCode>) -> String {
    codes.into_iter().map(FactorCode::as_str).collect::<Vec<_>>().join("|")
}

/// Status counts of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Securities with at least one fit.
    pub ok: usize,
    /// Securities skipped.
    pub skip: usize,
    /// Securities whose every regression failed.
    pub fail: usize,
}

impl RunSummary {
    /// Count the statuses of `rows`.
    #[must_use]
    pub fn from_rows(rows: &[ReportRow]) -> Self {
        rows.iter().fold(Self::default(), |mut acc, row| {
            match row.status {
                Status::Ok => acc.ok += 1,
                Status::Skip => acc.skip += 1,
                Status::Fail => acc.fail += 1,
            }
            acc
        })
    }
}
