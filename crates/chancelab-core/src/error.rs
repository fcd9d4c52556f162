//! Error taxonomy shared by every analysis entry point.

use thiserror::Error;

/// Errors raised by a single analysis call.
///
/// Every error is local to the call that produced it. Analyses are
/// deterministic, so repeating an identical call yields the identical error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// Numeric input outside the function's domain.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Zero-length input where at least one observation is required.
    #[error("empty input")]
    EmptyInput,

    /// Fewer observations than the analysis requires.
    #[error("insufficient data: need {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Posterior update requested for a prior family without a conjugate update.
    #[error("unsupported prior type: {0}")]
    UnsupportedPriorType(String),

    /// Interval requested for a distribution family that is not implemented.
    #[error("unsupported distribution: {0}")]
    UnsupportedDistribution(String),
}

impl AnalysisError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// True for the soft "not yet analyzable" conditions a caller should
    /// display as pending rather than as a failure.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, Self::EmptyInput | Self::InsufficientData { .. })
    }
}

/// Result type for analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Fail with [`AnalysisError::InsufficientData`] when `got < needed`.
pub(crate) fn require(needed: usize, got: usize) -> Result<()> {
    if got == 0 && needed > 0 {
        return Err(AnalysisError::EmptyInput);
    }
    if got < needed {
        return Err(AnalysisError::InsufficientData { needed, got });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_distinguishes_empty_from_short() {
        assert_eq!(require(2, 0), Err(AnalysisError::EmptyInput));
        assert_eq!(
            require(10, 3),
            Err(AnalysisError::InsufficientData { needed: 10, got: 3 })
        );
        assert!(require(10, 10).is_ok());
    }

    #[test]
    fn insufficient_data_is_soft() {
        assert!(AnalysisError::EmptyInput.is_insufficient_data());
        assert!(AnalysisError::InsufficientData { needed: 2, got: 1 }.is_insufficient_data());
        assert!(!AnalysisError::invalid("p").is_insufficient_data());
    }

    #[test]
    fn messages_render() {
        let e = AnalysisError::InsufficientData { needed: 100, got: 7 };
        assert_eq!(e.to_string(), "insufficient data: need 100, got 7");
    }
}
