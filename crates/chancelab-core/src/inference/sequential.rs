//! Wald sequential probability ratio test and adaptive sample-size re-estimation.

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::inference::power::required_sample_size;
use crate::params::AnalysisParameters;

/// Observations between interim analyses while the test continues.
pub const ANALYSIS_INTERVAL: usize = 100;

/// Observed-effect weight when re-estimating sample size mid-study.
const OBSERVED_WEIGHT: f64 = 0.7;
/// Sample size below which the observed effect is ignored.
const MIN_OBSERVED_N: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SprtConfig {
    pub null_mean: f64,
    pub alternative_mean: f64,
    /// Known per-observation standard deviation.
    pub sigma: f64,
    /// Type-I error rate.
    pub alpha: f64,
    /// Type-II error rate.
    pub beta: f64,
}

impl SprtConfig {
    /// Null at the chance mean, alternative shifted by `effect` standard deviations.
    pub fn from_params(params: &AnalysisParameters, effect: f64) -> Self {
        Self {
            null_mean: params.expected_mean,
            alternative_mean: params.expected_mean + effect * params.expected_std_dev,
            sigma: params.expected_std_dev,
            alpha: params.significance_level,
            beta: 0.2,
        }
    }

    /// Upper boundary A = ln((1 − β) / α).
    pub fn upper_boundary(&self) -> f64 {
        ((1.0 - self.beta) / self.alpha).ln()
    }

    /// Lower boundary B = ln(β / (1 − α)).
    pub fn lower_boundary(&self) -> f64 {
        (self.beta / (1.0 - self.alpha)).ln()
    }

    fn validate(&self) -> Result<()> {
        let rate_ok = |r: f64| r > 0.0 && r < 1.0;
        if !rate_ok(self.alpha) || !rate_ok(self.beta) || self.alpha + self.beta >= 1.0 {
            return Err(AnalysisError::invalid(format!(
                "need 0 < alpha, beta and alpha + beta < 1, got alpha={} beta={}",
                self.alpha, self.beta
            )));
        }
        if !(self.sigma.is_finite() && self.sigma > 0.0) {
            return Err(AnalysisError::invalid(format!(
                "sigma must be positive, got {}",
                self.sigma
            )));
        }
        if self.null_mean == self.alternative_mean {
            return Err(AnalysisError::invalid(
                "null and alternative means must differ",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SprtDecision {
    Continue,
    /// Log-likelihood ratio crossed A: accept the alternative.
    StopEfficacy,
    /// Log-likelihood ratio crossed B: accept the null.
    StopFutility,
}

#[derive(Debug, Clone, Serialize)]
pub struct SequentialAnalysisResult {
    pub decision: SprtDecision,
    /// Observations supplied.
    pub n: usize,
    /// Observations consumed when a boundary was crossed, otherwise `n`.
    pub samples_used: usize,
    pub log_likelihood_ratio: f64,
    pub upper_boundary: f64,
    pub lower_boundary: f64,
    /// When to look again; `None` once stopped.
    pub next_analysis_at: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdaptiveSampleSize {
    pub current_n: usize,
    pub effect_used: f64,
    pub used_observed_effect: bool,
    pub required_n: usize,
    pub additional_n: usize,
}

/// Run the SPRT over `data` in order, stopping at the first boundary crossing.
pub fn sequential_probability_ratio_test(
    data: &[f64],
    config: SprtConfig,
) -> Result<SequentialAnalysisResult> {
    config.validate()?;
    if data.is_empty() {
        return Err(AnalysisError::EmptyInput);
    }
    let upper = config.upper_boundary();
    let lower = config.lower_boundary();
    let shift = config.alternative_mean - config.null_mean;
    let midpoint = (config.alternative_mean + config.null_mean) / 2.0;
    let scale = shift / (config.sigma * config.sigma);

    let mut llr = 0.0;
    let mut decision = SprtDecision::Continue;
    let mut samples_used = data.len();
    for (i, &x) in data.iter().enumerate() {
        llr += scale * (x - midpoint);
        if llr >= upper {
            decision = SprtDecision::StopEfficacy;
        } else if llr <= lower {
            decision = SprtDecision::StopFutility;
        }
        if decision != SprtDecision::Continue {
            samples_used = i + 1;
            log::debug!("sprt stopped after {samples_used} observations: {decision:?}");
            break;
        }
    }

    Ok(SequentialAnalysisResult {
        decision,
        n: data.len(),
        samples_used,
        log_likelihood_ratio: llr,
        upper_boundary: upper,
        lower_boundary: lower,
        next_analysis_at: (decision == SprtDecision::Continue)
            .then_some(data.len() + ANALYSIS_INTERVAL),
    })
}

/// Re-estimate the total sample size from an interim effect estimate.
///
/// Past 50 observations the effect is a 70/30 blend of observed and planned;
/// the result never drops below `current_n`.
pub fn adaptive_sample_size(
    current_n: usize,
    observed_effect: f64,
    expected_effect: f64,
    alpha: f64,
    power: f64,
) -> Result<AdaptiveSampleSize> {
    let used_observed_effect = current_n > MIN_OBSERVED_N;
    let effect_used = if used_observed_effect {
        OBSERVED_WEIGHT * observed_effect + (1.0 - OBSERVED_WEIGHT) * expected_effect
    } else {
        expected_effect
    };
    let required_n = required_sample_size(effect_used, alpha, power)?.max(current_n);
    Ok(AdaptiveSampleSize {
        current_n,
        effect_used,
        used_observed_effect,
        required_n,
        additional_n: required_n - current_n,
    })
}
