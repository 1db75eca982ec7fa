//! Error types for mathematical operations.

/// Errors that can occur during mathematical operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MathError {
    /// Dimension mismatch.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Actual dimension.
        actual: usize,
    },

    /// Fewer observations than coefficients.
    #[error("insufficient data: need at least {required} rows, got {actual}")]
    InsufficientData {
        /// Required number of rows.
        required: usize,
        /// Actual number of rows.
        actual: usize,
    },

    /// Design matrix columns are linearly dependent.
    #[error("rank deficient design matrix: rank {rank} < columns {columns}")]
    RankDeficient {
        /// Numerical rank.
        rank: usize,
        /// Number of columns.
        columns: usize,
    },

    /// Empty data.
    #[error("empty data provided")]
    EmptyData,
}
