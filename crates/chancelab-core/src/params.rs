//! Analysis configuration.

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// Number of binary draws summed into one trial when nothing else is configured.
pub const DEFAULT_TRIAL_BITS: u32 = 200;

/// Configuration passed into every analysis call. Never mutated by an analysis.
///
/// Deserializing fills missing fields from the binomial defaults of the
/// configured `trial_bits`, so `{"trial_bits": 100}` yields mean 50 and
/// standard deviation 5.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "ParametersFile")]
pub struct AnalysisParameters {
    /// N, the number of binary draws summed into one trial.
    pub trial_bits: u32,
    /// Mean under the null hypothesis (N/2).
    pub expected_mean: f64,
    /// Per-trial standard deviation under the null hypothesis (sqrt(N/4)).
    pub expected_std_dev: f64,
    /// Level for confidence and credible intervals.
    pub confidence_level: f64,
    /// Shortest run of cumulative deviation reported as an excursion.
    pub minimum_excursion_length: usize,
    /// |Z| that the cumulative deviation must exceed to count as an excursion.
    pub excursion_threshold: f64,
    /// Alpha used for significance flags.
    pub significance_level: f64,
}

impl Default for AnalysisParameters {
    fn default() -> Self {
        Self::for_trial_bits(DEFAULT_TRIAL_BITS)
    }
}

impl AnalysisParameters {
    /// Binomial null-hypothesis defaults for trials summing `n` fair bits.
    pub fn for_trial_bits(n: u32) -> Self {
        Self {
            trial_bits: n,
            expected_mean: n as f64 / 2.0,
            expected_std_dev: (n as f64 / 4.0).sqrt(),
            confidence_level: 0.95,
            minimum_excursion_length: 100,
            excursion_threshold: 2.0,
            significance_level: 0.05,
        }
    }

    pub fn with_expected_mean(mut self, mean: f64) -> Self {
        self.expected_mean = mean;
        self
    }

    pub fn with_expected_std_dev(mut self, std_dev: f64) -> Self {
        self.expected_std_dev = std_dev;
        self
    }

    pub fn with_confidence_level(mut self, level: f64) -> Self {
        self.confidence_level = level;
        self
    }

    pub fn with_minimum_excursion_length(mut self, length: usize) -> Self {
        self.minimum_excursion_length = length;
        self
    }

    /// Reject configurations no analysis can run under.
    pub fn validate(&self) -> Result<()> {
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(AnalysisError::invalid(format!(
                "confidence_level must be in (0, 1), got {}",
                self.confidence_level
            )));
        }
        if !(self.significance_level > 0.0 && self.significance_level < 1.0) {
            return Err(AnalysisError::invalid(format!(
                "significance_level must be in (0, 1), got {}",
                self.significance_level
            )));
        }
        if !(self.expected_std_dev.is_finite() && self.expected_std_dev > 0.0) {
            return Err(AnalysisError::invalid(format!(
                "expected_std_dev must be positive, got {}",
                self.expected_std_dev
            )));
        }
        if !self.expected_mean.is_finite() {
            return Err(AnalysisError::invalid("expected_mean must be finite"));
        }
        if self.minimum_excursion_length == 0 {
            return Err(AnalysisError::invalid(
                "minimum_excursion_length must be at least 1",
            ));
        }
        if !(self.excursion_threshold > 0.0) {
            return Err(AnalysisError::invalid("excursion_threshold must be positive"));
        }
        Ok(())
    }
}

/// On-disk form where every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ParametersFile {
    trial_bits: Option<u32>,
    expected_mean: Option<f64>,
    expected_std_dev: Option<f64>,
    confidence_level: Option<f64>,
    minimum_excursion_length: Option<usize>,
    excursion_threshold: Option<f64>,
    significance_level: Option<f64>,
}

impl From<ParametersFile> for AnalysisParameters {
    fn from(file: ParametersFile) -> Self {
        let base = Self::for_trial_bits(file.trial_bits.unwrap_or(DEFAULT_TRIAL_BITS));
        Self {
            expected_mean: file.expected_mean.unwrap_or(base.expected_mean),
            expected_std_dev: file.expected_std_dev.unwrap_or(base.expected_std_dev),
            confidence_level: file.confidence_level.unwrap_or(base.confidence_level),
            minimum_excursion_length: file
                .minimum_excursion_length
                .unwrap_or(base.minimum_excursion_length),
            excursion_threshold: file.excursion_threshold.unwrap_or(base.excursion_threshold),
            significance_level: file.significance_level.unwrap_or(base.significance_level),
            ..base
        }
    }
}
