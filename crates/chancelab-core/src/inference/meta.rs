//! Inverse-variance meta-analysis across sessions.
//!
//! Fixed effects assume one true effect shared by every session; random
//! effects add a between-session variance τ² estimated by DerSimonian–Laird.

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::numerics::{self, ConfidenceInterval, two_tailed_p};

/// Level of the pooled and per-study intervals.
pub const META_CONFIDENCE_LEVEL: f64 = 0.95;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One study (session) entering a meta-analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectSizeData {
    pub study_id: String,
    pub effect_size: f64,
    pub standard_error: f64,
    pub sample_size: usize,
}

impl EffectSizeData {
    pub fn new(
        study_id: impl Into<String>,
        effect_size: f64,
        standard_error: f64,
        sample_size: usize,
    ) -> Self {
        Self {
            study_id: study_id.into(),
            effect_size,
            standard_error,
            sample_size,
        }
    }

    pub fn variance(&self) -> f64 {
        self.standard_error * self.standard_error
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetaModel {
    FixedEffects,
    RandomEffects,
}

/// Cochran's Q and derived between-study heterogeneity measures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Heterogeneity {
    pub q: f64,
    pub df: usize,
    /// Share of total variation due to heterogeneity, in percent.
    pub i_squared: f64,
    pub p_value: f64,
    pub tau_squared: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetaAnalysisResult {
    pub model: MetaModel,
    pub studies: Vec<EffectSizeData>,
    /// Weights actually used, parallel to `studies`.
    pub weights: Vec<f64>,
    pub pooled_effect: f64,
    pub standard_error: f64,
    pub confidence_interval: ConfidenceInterval,
    pub z: f64,
    pub p_value: f64,
    pub heterogeneity: Heterogeneity,
    pub total_sample_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForestRow {
    pub label: String,
    pub effect: f64,
    pub lower: f64,
    pub upper: f64,
    pub weight_percent: f64,
}

/// Rows ready for a forest plot: one per study plus the pooled estimate.
#[derive(Debug, Clone, Serialize)]
pub struct ForestPlotData {
    pub model: MetaModel,
    pub rows: Vec<ForestRow>,
    pub pooled: ForestRow,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CombinedZ {
    pub z: f64,
    pub p_value: f64,
    pub k: usize,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

pub fn fixed_effects(studies: &[EffectSizeData]) -> Result<MetaAnalysisResult> {
    check_studies(studies)?;
    let weights: Vec<f64> = studies.iter().map(|s| 1.0 / s.variance()).collect();
    let mut heterogeneity = cochran_q(studies, &weights)?;
    heterogeneity.tau_squared = 0.0;
    pooled(MetaModel::FixedEffects, studies, weights, heterogeneity)
}

/// DerSimonian–Laird random-effects pooling.
pub fn random_effects(studies: &[EffectSizeData]) -> Result<MetaAnalysisResult> {
    check_studies(studies)?;
    let fixed: Vec<f64> = studies.iter().map(|s| 1.0 / s.variance()).collect();
    let mut heterogeneity = cochran_q(studies, &fixed)?;

    let sum_w: f64 = fixed.iter().sum();
    let sum_w2: f64 = fixed.iter().map(|w| w * w).sum();
    let c = sum_w - sum_w2 / sum_w;
    let tau_squared = if c > 0.0 {
        ((heterogeneity.q - heterogeneity.df as f64) / c).max(0.0)
    } else {
        0.0
    };
    heterogeneity.tau_squared = tau_squared;
    log::debug!("random effects over {} studies: tau^2 = {tau_squared:.6}", studies.len());

    let weights = studies
        .iter()
        .map(|s| 1.0 / (s.variance() + tau_squared))
        .collect();
    pooled(MetaModel::RandomEffects, studies, weights, heterogeneity)
}

pub fn forest_plot_data(result: &MetaAnalysisResult) -> Result<ForestPlotData> {
    let critical = numerics::z_critical(META_CONFIDENCE_LEVEL)?;
    let total_w: f64 = result.weights.iter().sum();
    let rows = result
        .studies
        .iter()
        .zip(&result.weights)
        .map(|(s, w)| ForestRow {
            label: s.study_id.clone(),
            effect: s.effect_size,
            lower: s.effect_size - critical * s.standard_error,
            upper: s.effect_size + critical * s.standard_error,
            weight_percent: 100.0 * w / total_w,
        })
        .collect();
    Ok(ForestPlotData {
        model: result.model,
        rows,
        pooled: ForestRow {
            label: "pooled".into(),
            effect: result.pooled_effect,
            lower: result.confidence_interval.lower,
            upper: result.confidence_interval.upper,
            weight_percent: 100.0,
        },
    })
}

/// Weighted Stouffer combination Σwᵢzᵢ / √Σwᵢ². Unweighted when `weights` is `None`.
pub fn stouffer_combined_z(z_scores: &[f64], weights: Option<&[f64]>) -> Result<CombinedZ> {
    if z_scores.is_empty() {
        return Err(AnalysisError::EmptyInput);
    }
    let (num, den) = match weights {
        None => (z_scores.iter().sum::<f64>(), z_scores.len() as f64),
        Some(w) => {
            if w.len() != z_scores.len() {
                return Err(AnalysisError::invalid(format!(
                    "length mismatch: {} z-scores vs {} weights",
                    z_scores.len(),
                    w.len()
                )));
            }
            if w.iter().any(|&x| !(x.is_finite() && x >= 0.0)) {
                return Err(AnalysisError::invalid("weights must be non-negative"));
            }
            (
                z_scores.iter().zip(w).map(|(z, w)| z * w).sum::<f64>(),
                w.iter().map(|w| w * w).sum::<f64>(),
            )
        }
    };
    if den <= 0.0 {
        return Err(AnalysisError::invalid("weights sum to zero"));
    }
    let z = num / den.sqrt();
    Ok(CombinedZ {
        z,
        p_value: two_tailed_p(z),
        k: z_scores.len(),
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn check_studies(studies: &[EffectSizeData]) -> Result<()> {
    if studies.is_empty() {
        return Err(AnalysisError::EmptyInput);
    }
    for s in studies {
        if !(s.standard_error.is_finite() && s.standard_error > 0.0) {
            return Err(AnalysisError::invalid(format!(
                "study '{}' has non-positive standard error {}",
                s.study_id, s.standard_error
            )));
        }
        if !s.effect_size.is_finite() {
            return Err(AnalysisError::invalid(format!(
                "study '{}' has non-finite effect size",
                s.study_id
            )));
        }
    }
    Ok(())
}

fn weighted_mean(studies: &[EffectSizeData], weights: &[f64]) -> (f64, f64) {
    let sum_w: f64 = weights.iter().sum();
    let sum_wy: f64 = studies
        .iter()
        .zip(weights)
        .map(|(s, w)| w * s.effect_size)
        .sum();
    (sum_wy / sum_w, sum_w)
}

fn cochran_q(studies: &[EffectSizeData], weights: &[f64]) -> Result<Heterogeneity> {
    let df = studies.len() - 1;
    if df == 0 {
        return Ok(Heterogeneity {
            q: 0.0,
            df,
            i_squared: 0.0,
            p_value: 1.0,
            tau_squared: 0.0,
        });
    }
    let (mean, _) = weighted_mean(studies, weights);
    let q: f64 = studies
        .iter()
        .zip(weights)
        .map(|(s, w)| w * (s.effect_size - mean).powi(2))
        .sum();
    let p_value = numerics::chi_square_probability(q.max(0.0), df as f64)?;
    let i_squared = if q > 0.0 {
        (100.0 * (q - df as f64) / q).max(0.0)
    } else {
        0.0
    };
    Ok(Heterogeneity {
        q,
        df,
        i_squared,
        p_value,
        tau_squared: 0.0,
    })
}

fn pooled(
    model: MetaModel,
    studies: &[EffectSizeData],
    weights: Vec<f64>,
    heterogeneity: Heterogeneity,
) -> Result<MetaAnalysisResult> {
    let (pooled_effect, standard_error) = if let [only] = studies {
        (only.effect_size, only.standard_error)
    } else {
        let (mean, sum_w) = weighted_mean(studies, &weights);
        (mean, 1.0 / sum_w.sqrt())
    };
    let z = pooled_effect / standard_error;
    let critical = numerics::z_critical(META_CONFIDENCE_LEVEL)?;

    Ok(MetaAnalysisResult {
        model,
        studies: studies.to_vec(),
        weights,
        pooled_effect,
        standard_error,
        confidence_interval: ConfidenceInterval::around(
            pooled_effect,
            critical,
            standard_error,
            META_CONFIDENCE_LEVEL,
        ),
        z,
        p_value: two_tailed_p(z),
        heterogeneity,
        total_sample_size: studies.iter().map(|s| s.sample_size).sum(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn studies() -> Vec<EffectSizeData> {
        vec![
            EffectSizeData::new("a", 0.10, 0.05, 400),
            EffectSizeData::new("b", 0.30, 0.10, 100),
            EffectSizeData::new("c", -0.05, 0.08, 160),
        ]
    }

    #[test]
    fn single_study_passes_through() {
        let one = vec![EffectSizeData::new("s1", 0.123, 0.045, 500)];
        for r in [fixed_effects(&one).unwrap(), random_effects(&one).unwrap()] {
            assert_eq!(r.pooled_effect, 0.123);
            assert_eq!(r.standard_error, 0.045);
            assert_eq!(r.heterogeneity.df, 0);
            assert_eq!(r.heterogeneity.q, 0.0);
            assert_eq!(r.heterogeneity.i_squared, 0.0);
            assert_eq!(r.heterogeneity.tau_squared, 0.0);
            assert_eq!(r.heterogeneity.p_value, 1.0);
        }
    }

    #[test]
    fn fixed_effects_inverse_variance() {
        let r = fixed_effects(&studies()).unwrap();
        let w = [400.0, 100.0, 156.25];
        let sum_w: f64 = w.iter().sum();
        let expected = (400.0 * 0.10 + 100.0 * 0.30 + 156.25 * -0.05) / sum_w;
        assert!((r.pooled_effect - expected).abs() < 1e-12);
        assert!((r.standard_error - 1.0 / sum_w.sqrt()).abs() < 1e-12);
        assert_eq!(r.heterogeneity.df, 2);
        assert_eq!(r.heterogeneity.tau_squared, 0.0);
        assert!(r.confidence_interval.contains(r.pooled_effect));
        assert_eq!(r.total_sample_size, 660);
    }

    #[test]
    fn random_effects_widen_under_heterogeneity() {
        let fixed = fixed_effects(&studies()).unwrap();
        let random = random_effects(&studies()).unwrap();
        assert!(fixed.heterogeneity.q > fixed.heterogeneity.df as f64);
        assert!(random.heterogeneity.tau_squared > 0.0);
        assert!(random.standard_error > fixed.standard_error);
        assert!(random.heterogeneity.i_squared > 0.0);
    }

    #[test]
    fn homogeneous_studies_have_zero_tau() {
        let same = vec![
            EffectSizeData::new("a", 0.2, 0.1, 100),
            EffectSizeData::new("b", 0.2, 0.1, 100),
        ];
        let r = random_effects(&same).unwrap();
        assert_eq!(r.heterogeneity.tau_squared, 0.0);
        assert_eq!(r.heterogeneity.i_squared, 0.0);
        assert!((r.pooled_effect - 0.2).abs() < 1e-12);
    }

    #[test]
    fn forest_weights_sum_to_hundred() {
        let r = random_effects(&studies()).unwrap();
        let plot = forest_plot_data(&r).unwrap();
        assert_eq!(plot.rows.len(), 3);
        let total: f64 = plot.rows.iter().map(|r| r.weight_percent).sum();
        assert!((total - 100.0).abs() < 1e-9);
        assert_eq!(plot.pooled.effect, r.pooled_effect);
        assert!(plot.rows[0].lower < 0.10 && plot.rows[0].upper > 0.10);
    }

    #[test]
    fn rejects_bad_studies() {
        assert_eq!(fixed_effects(&[]).unwrap_err(), AnalysisError::EmptyInput);
        let bad = vec![EffectSizeData::new("x", 0.1, 0.0, 10)];
        assert!(matches!(
            fixed_effects(&bad),
            Err(AnalysisError::InvalidArgument(_))
        ));
    }

    #[test]
    fn stouffer_weighted_and_unweighted() {
        let r = stouffer_combined_z(&[1.0, 2.0, 3.0], None).unwrap();
        assert!((r.z - 6.0 / 3f64.sqrt()).abs() < 1e-12);
        let r = stouffer_combined_z(&[1.0, 1.0], Some(&[3.0, 4.0])).unwrap();
        assert!((r.z - 7.0 / 5.0).abs() < 1e-12);
        assert!(stouffer_combined_z(&[1.0], Some(&[1.0, 2.0])).is_err());
        assert!(stouffer_combined_z(&[], None).is_err());
    }
}
