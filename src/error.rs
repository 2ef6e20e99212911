//! Errors reported while building a predictor from its configuration.

use thiserror::Error;

#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{what} size must be a power of two (got {size})")]
    TableSizeNotPowerOfTwo { what: &'static str, size: usize },

    #[error("{what} must be non-zero")]
    ZeroSized { what: &'static str },

    #[error("history segment for row {row} ends at bit {end}, past the {history_len}-bit register")]
    SegmentOutOfRange { row: usize, end: usize, history_len: usize },

    #[error("history segment of {bits} bits does not fit in a machine word")]
    SegmentTooWide { bits: usize },

    #[error("{iters} VPC iterations requested, at most {max} supported")]
    TooManyVpcIterations { iters: usize, max: usize },

    #[error("bipolar perceptron needs one history bit per row ({rows} rows, {history_len}-bit history)")]
    HistoryTooShort { rows: usize, history_len: usize },
}

/// Errors reported while building a synthetic workload.
#[derive(Error, Clone, Debug, PartialEq)]
pub enum WorkloadError {
    #[error("site {pc:#x}: {what} must be non-empty")]
    Empty { pc: usize, what: &'static str },

    #[error("site {pc:#x}: loop trip count must be non-zero")]
    ZeroTrip { pc: usize },

    #[error("site {pc:#x}: correlation distance must be non-zero")]
    ZeroDistance { pc: usize },

    #[error("site {pc:#x}: probability {p} is outside [0, 1]")]
    BadProbability { pc: usize, p: f64 },
}
