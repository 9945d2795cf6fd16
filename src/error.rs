//! Errors reported while building a predictor.

use thiserror::Error;

/// Reasons a [`crate::TAGEConfig`] can be rejected.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no tagged components were configured")]
    NoComponents,

    #[error("{0} tagged components configured, at most {max} are supported",
        max = crate::TAGEConfig::MAX_COMPONENTS)]
    TooManyComponents(usize),

    #[error("history length must be nonzero")]
    ZeroHistoryLength,

    #[error("history lengths must be strictly increasing ({prev} then {next})")]
    HistoryLengthsNotIncreasing { prev: usize, next: usize },

    #[error("history length {0} is longer than {max} bits",
        max = crate::TAGEConfig::MAX_HISTORY_LEN)]
    HistoryLengthTooLong(usize),

    #[error("{name} counter width {bits} is outside 1..=8")]
    CounterWidth { name: &'static str, bits: u8 },

    #[error("{name} counter initial value {init} does not fit in {bits} bits")]
    CounterInit { name: &'static str, init: u8, bits: u8 },

    #[error("{name} index bits {bits} is outside 1..=24")]
    IndexBits { name: &'static str, bits: usize },

    #[error("tag bits {0} is outside 2..=24")]
    TagBits(usize),

    #[error("malformed configuration: {0}")]
    Json(#[from] serde_json::Error),
}
