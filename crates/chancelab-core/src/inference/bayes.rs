//! Bayes factors for point hypotheses and conjugate normal updating.

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::numerics::{self, z_critical};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Point hypothesis: observations ~ N(mean, variance).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    pub mean: f64,
    pub variance: f64,
}

impl Hypothesis {
    pub fn new(mean: f64, variance: f64) -> Self {
        Self { mean, variance }
    }
}

/// Jeffreys evidence categories for a Bayes factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceStrength {
    Inconclusive,
    Weak,
    Moderate,
    Strong,
    VeryStrong,
    Extreme,
}

impl EvidenceStrength {
    /// Classify a Bayes factor in favor of one hypothesis.
    pub fn from_bayes_factor(bf: f64) -> Self {
        if bf > 100.0 {
            Self::Extreme
        } else if bf > 30.0 {
            Self::VeryStrong
        } else if bf > 10.0 {
            Self::Strong
        } else if bf > 3.0 {
            Self::Moderate
        } else if bf > 1.0 {
            Self::Weak
        } else {
            Self::Inconclusive
        }
    }
}

/// Which hypothesis the data favor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceDirection {
    Alternative,
    Null,
    Neither,
}

#[derive(Debug, Clone, Serialize)]
pub struct BayesFactorResult {
    pub n: usize,
    pub log_marginal_null: f64,
    pub log_marginal_alternative: f64,
    /// ln BF10; finite even when `bf10` overflows.
    pub log_bf10: f64,
    pub bf10: f64,
    pub bf01: f64,
    /// Jeffreys category of BF10.
    pub strength: EvidenceStrength,
    pub direction: EvidenceDirection,
    /// Jeffreys category of the favored side (1/BF10 when the null is favored).
    pub direction_strength: EvidenceStrength,
}

/// Parametric distribution family, used both for priors and posteriors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum Distribution {
    Normal { mean: f64, variance: f64 },
    Beta { alpha: f64, beta: f64 },
    Gamma { shape: f64, rate: f64 },
    Uniform { lower: f64, upper: f64 },
}

impl Distribution {
    pub fn family(&self) -> &'static str {
        match self {
            Self::Normal { .. } => "normal",
            Self::Beta { .. } => "beta",
            Self::Gamma { .. } => "gamma",
            Self::Uniform { .. } => "uniform",
        }
    }

    pub fn mean(&self) -> f64 {
        match *self {
            Self::Normal { mean, .. } => mean,
            Self::Beta { alpha, beta } => alpha / (alpha + beta),
            Self::Gamma { shape, rate } => shape / rate,
            Self::Uniform { lower, upper } => (lower + upper) / 2.0,
        }
    }

    pub fn variance(&self) -> f64 {
        match *self {
            Self::Normal { variance, .. } => variance,
            Self::Beta { alpha, beta } => {
                let s = alpha + beta;
                alpha * beta / (s * s * (s + 1.0))
            }
            Self::Gamma { shape, rate } => shape / (rate * rate),
            Self::Uniform { lower, upper } => (upper - lower).powi(2) / 12.0,
        }
    }
}

/// Prior belief about the mean.
pub type Prior = Distribution;

#[derive(Debug, Clone, Serialize)]
pub struct PosteriorDistribution {
    pub prior: Distribution,
    pub distribution: Distribution,
    pub n: usize,
    pub data_mean: f64,
}

impl PosteriorDistribution {
    pub fn mean(&self) -> f64 {
        self.distribution.mean()
    }

    pub fn std_dev(&self) -> f64 {
        self.distribution.variance().sqrt()
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// BF10 of `alternative` against `null` for the observed values.
///
/// Both marginal likelihoods are products of normal densities, so the ratio
/// is formed in log space and only exponentiated at the end.
pub fn bayes_factor(
    data: &[f64],
    null: Hypothesis,
    alternative: Hypothesis,
) -> Result<BayesFactorResult> {
    if data.is_empty() {
        return Err(AnalysisError::EmptyInput);
    }
    let log_marginal_null = log_likelihood(data, null)?;
    let log_marginal_alternative = log_likelihood(data, alternative)?;
    let log_bf10 = log_marginal_alternative - log_marginal_null;
    let bf10 = log_bf10.exp();
    let bf01 = (-log_bf10).exp();

    let direction = if log_bf10 > 0.0 {
        EvidenceDirection::Alternative
    } else if log_bf10 < 0.0 {
        EvidenceDirection::Null
    } else {
        EvidenceDirection::Neither
    };
    let direction_strength = match direction {
        EvidenceDirection::Null => EvidenceStrength::from_bayes_factor(bf01),
        _ => EvidenceStrength::from_bayes_factor(bf10),
    };

    Ok(BayesFactorResult {
        n: data.len(),
        log_marginal_null,
        log_marginal_alternative,
        log_bf10,
        bf10,
        bf01,
        strength: EvidenceStrength::from_bayes_factor(bf10),
        direction,
        direction_strength,
    })
}

/// Conjugate update of a normal prior on the mean with known data variance.
pub fn update_posterior(
    prior: Prior,
    data: &[f64],
    data_variance: f64,
) -> Result<PosteriorDistribution> {
    let Distribution::Normal {
        mean: prior_mean,
        variance: prior_variance,
    } = prior
    else {
        return Err(AnalysisError::UnsupportedPriorType(prior.family().into()));
    };
    check_variance("prior variance", prior_variance)?;
    check_variance("data variance", data_variance)?;
    let data_mean = numerics::mean(data)?;

    let n = data.len() as f64;
    let prior_precision = 1.0 / prior_variance;
    let data_precision = n / data_variance;
    let precision = prior_precision + data_precision;
    let mean = (prior_precision * prior_mean + data_precision * data_mean) / precision;

    Ok(PosteriorDistribution {
        prior,
        distribution: Distribution::Normal {
            mean,
            variance: 1.0 / precision,
        },
        n: data.len(),
        data_mean,
    })
}

/// Central credible interval of a normal posterior at `level`.
pub fn credible_interval(posterior: &PosteriorDistribution, level: f64) -> Result<(f64, f64)> {
    match posterior.distribution {
        Distribution::Normal { mean, variance } => {
            let half = z_critical(level)? * variance.sqrt();
            Ok((mean - half, mean + half))
        }
        other => Err(AnalysisError::UnsupportedDistribution(other.family().into())),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn log_likelihood(data: &[f64], h: Hypothesis) -> Result<f64> {
    check_variance("hypothesis variance", h.variance)?;
    let norm = -0.5 * (2.0 * std::f64::consts::PI * h.variance).ln();
    Ok(data
        .iter()
        .map(|x| norm - (x - h.mean).powi(2) / (2.0 * h.variance))
        .sum())
}

fn check_variance(name: &str, v: f64) -> Result<()> {
    if !(v.is_finite() && v > 0.0) {
        return Err(AnalysisError::invalid(format!(
            "{name} must be positive, got {v}"
        )));
    }
    Ok(())
}
