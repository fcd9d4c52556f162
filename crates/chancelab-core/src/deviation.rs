//! Deviation and variance analysis of trial sequences.
//!
//! Converts a trial sequence into Z-scores, a cumulative deviation trajectory
//! with excursion periods, and the two alternative variance aggregations
//! ("network" combined and "device" independent).

use serde::Serialize;

use crate::error::{AnalysisError, Result, require};
use crate::numerics::{
    self, ConfidenceInterval, EffectMagnitude, Significance, interpret_cohens_d, normal_cdf,
    one_tailed_p, two_tailed_p,
};
use crate::params::AnalysisParameters;
use crate::trial::{IntentionTag, Trial, trial_values};

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Cumulative deviation state after one trial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CumulativePoint {
    pub index: usize,
    pub sequence_number: u64,
    pub timestamp_ms: u64,
    pub deviation: f64,
    pub cumulative_deviation: f64,
    /// cumulative_deviation / (σ · √(index + 1)).
    pub z_score: f64,
    /// Upper-tail p of `z_score`.
    pub p_value: f64,
}

/// Maximal run of the cumulative Z beyond the excursion threshold in one sign.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExcursionPeriod {
    pub start_index: usize,
    /// Inclusive.
    pub end_index: usize,
    pub length: usize,
    /// +1 above chance, −1 below.
    pub direction: i8,
    /// Signed Z at the point of largest |Z| in the period.
    pub peak_z: f64,
    pub peak_index: usize,
    /// Two-tailed p of `peak_z`.
    pub p_value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CumulativeResult {
    pub n: usize,
    pub points: Vec<CumulativePoint>,
    pub excursions: Vec<ExcursionPeriod>,
    pub final_cumulative_deviation: f64,
    pub final_z: f64,
    pub final_p_value: f64,
    pub max_abs_z: f64,
    pub max_abs_z_index: usize,
}

/// Combined ("network", GCP-style) variance of per-trial normalized deviations.
#[derive(Debug, Clone, Serialize)]
pub struct NetworkVarianceResult {
    pub n: usize,
    pub mean_deviation: f64,
    /// Sample variance of z_i = (value − μ) / σ; ≈ 1 under the null.
    pub normalized_variance: f64,
    /// Lag-1 autocorrelation of the z_i.
    pub temporal_correlation: f64,
    /// (n − 1) · normalized_variance.
    pub chi_square: f64,
    pub degrees_of_freedom: usize,
    pub p_value: f64,
    pub is_significant: bool,
    /// Σ z_i / √n.
    pub stouffer_z: f64,
    pub stouffer_z_squared: f64,
    pub stouffer_p_value: f64,
}

/// Independent ("device") view of trials as standardized observations.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceVarianceResult {
    pub n: usize,
    pub mean: f64,
    pub variance: f64,
    pub skewness: f64,
    pub kurtosis: f64,
    /// OLS slope of z on trial index (z units per trial).
    pub drift_slope: f64,
    pub drift_p_value: f64,
    pub autocorrelation: f64,
    pub ks_statistic: f64,
    pub ks_p_value: f64,
    pub anderson_darling: f64,
    pub anderson_darling_p_value: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ZScoreResult {
    pub n: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub standard_error: f64,
    pub expected_mean: f64,
    pub z_score: f64,
    pub p_value_two_tailed: f64,
    /// Upper tail (mean above chance).
    pub p_value_one_tailed: f64,
    pub confidence_interval: ConfidenceInterval,
    pub significance: Significance,
}

#[derive(Debug, Clone, Serialize)]
pub struct EffectSizeResult {
    pub n: usize,
    pub mean_difference: f64,
    pub cohens_d: f64,
    pub hedges_g: f64,
    /// Large-sample standard error of d.
    pub standard_error: f64,
    pub confidence_interval: ConfidenceInterval,
    pub magnitude: EffectMagnitude,
}

/// Trials partitioned by intention tag, each preserving input order.
#[derive(Debug, Clone, Default)]
pub struct IntentionSplit {
    pub positive: Vec<Trial>,
    pub negative: Vec<Trial>,
    pub neutral: Vec<Trial>,
}

// ---------------------------------------------------------------------------
// Analysis functions
// ---------------------------------------------------------------------------

/// Running cumulative deviation with single-pass excursion detection.
pub fn calculate_cumulative_deviation(
    trials: &[Trial],
    params: &AnalysisParameters,
) -> Result<CumulativeResult> {
    params.validate()?;
    if trials.is_empty() {
        return Err(AnalysisError::EmptyInput);
    }

    let sigma = params.expected_std_dev;
    let threshold = params.excursion_threshold;
    let mut points = Vec::with_capacity(trials.len());
    let mut tracker = ExcursionTracker::new(params.minimum_excursion_length);
    let mut cumulative = 0.0;
    let mut max_abs_z = 0.0f64;
    let mut max_abs_z_index = 0;

    for (i, trial) in trials.iter().enumerate() {
        let deviation = trial.value as f64 - params.expected_mean;
        cumulative += deviation;
        let z = cumulative / (sigma * ((i + 1) as f64).sqrt());
        if z.abs() > max_abs_z {
            max_abs_z = z.abs();
            max_abs_z_index = i;
        }
        let sign = if z > threshold {
            1
        } else if z < -threshold {
            -1
        } else {
            0
        };
        tracker.step(i, z, sign);
        points.push(CumulativePoint {
            index: i,
            sequence_number: trial.sequence_number,
            timestamp_ms: trial.timestamp_ms,
            deviation,
            cumulative_deviation: cumulative,
            z_score: z,
            p_value: one_tailed_p(z),
        });
    }

    let n = trials.len();
    let excursions = tracker.finish(n - 1);
    log::debug!(
        "cumulative deviation over {n} trials: final z {:.3}, {} excursion(s)",
        points[n - 1].z_score,
        excursions.len()
    );

    let last = points[n - 1];
    Ok(CumulativeResult {
        n,
        final_cumulative_deviation: last.cumulative_deviation,
        final_z: last.z_score,
        final_p_value: last.p_value,
        max_abs_z,
        max_abs_z_index,
        points,
        excursions,
    })
}

/// Combined variance statistic over per-trial normalized deviations.
pub fn calculate_network_variance(
    trials: &[Trial],
    params: &AnalysisParameters,
) -> Result<NetworkVarianceResult> {
    params.validate()?;
    require(2, trials.len())?;

    let z = standardize(trials, params);
    let n = z.len();
    let normalized_variance = numerics::variance(&z)?;
    let temporal_correlation = if n >= 3 {
        numerics::lag1_autocorrelation(&z)?
    } else {
        0.0
    };
    let df = n - 1;
    let chi_square = df as f64 * normalized_variance;
    let p_value = numerics::chi_square_probability(chi_square, df as f64)?;

    let sum_z: f64 = z.iter().sum();
    let stouffer_z = sum_z / (n as f64).sqrt();

    Ok(NetworkVarianceResult {
        n,
        mean_deviation: numerics::mean(&trial_values(trials))? - params.expected_mean,
        normalized_variance,
        temporal_correlation,
        chi_square,
        degrees_of_freedom: df,
        p_value,
        is_significant: p_value < params.significance_level,
        stouffer_z,
        stouffer_z_squared: stouffer_z * stouffer_z,
        stouffer_p_value: two_tailed_p(stouffer_z),
    })
}

/// Distributional shape, drift and goodness of fit of standardized trials.
///
/// The Kolmogorov–Smirnov and Anderson–Darling statistics compare against the
/// continuous N(0, 1); on lattice-valued trials they are approximate.
pub fn calculate_device_variance(
    trials: &[Trial],
    params: &AnalysisParameters,
) -> Result<DeviceVarianceResult> {
    params.validate()?;
    require(10, trials.len())?;

    let z = standardize(trials, params);
    let n = z.len();
    let index: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let fit = numerics::linear_regression(&index, &z)?;
    let t = fit.slope_t();
    let drift_p_value = if t.is_finite() {
        numerics::t_two_tailed_p(t, (n - 2) as f64)?
    } else {
        0.0
    };

    let (ks_statistic, ks_p_value) = kolmogorov_smirnov_normal(&z);
    let (anderson_darling, anderson_darling_p_value) = anderson_darling_normal(&z);

    Ok(DeviceVarianceResult {
        n,
        mean: numerics::mean(&z)?,
        variance: numerics::variance(&z)?,
        skewness: numerics::skewness(&z)?,
        kurtosis: numerics::kurtosis(&z)?,
        drift_slope: fit.slope,
        drift_p_value,
        autocorrelation: numerics::lag1_autocorrelation(&z)?,
        ks_statistic,
        ks_p_value,
        anderson_darling,
        anderson_darling_p_value,
    })
}

/// Single-sample Z-test of the trial mean against `expected_mean`.
pub fn calculate_z_score(trials: &[Trial], params: &AnalysisParameters) -> Result<ZScoreResult> {
    params.validate()?;
    require(2, trials.len())?;

    let values = trial_values(trials);
    let n = values.len();
    let mean = numerics::mean(&values)?;
    let mut std_dev = numerics::standard_deviation(&values)?;
    if std_dev < 1e-12 {
        log::warn!("zero sample variance over {n} trials, using expected std dev");
        std_dev = params.expected_std_dev;
    }
    let standard_error = std_dev / (n as f64).sqrt();
    let z_score = (mean - params.expected_mean) / standard_error;
    let p_value_two_tailed = two_tailed_p(z_score);
    let critical = numerics::z_critical(params.confidence_level)?;

    Ok(ZScoreResult {
        n,
        mean,
        std_dev,
        standard_error,
        expected_mean: params.expected_mean,
        z_score,
        p_value_two_tailed,
        p_value_one_tailed: one_tailed_p(z_score),
        confidence_interval: ConfidenceInterval::around(
            mean,
            critical,
            standard_error,
            params.confidence_level,
        ),
        significance: Significance::from_p(p_value_two_tailed, params.significance_level),
    })
}

/// Cohen's d and Hedges' g of the trial mean against the reference distribution.
pub fn calculate_effect_size(
    trials: &[Trial],
    params: &AnalysisParameters,
) -> Result<EffectSizeResult> {
    params.validate()?;
    require(2, trials.len())?;

    let values = trial_values(trials);
    let n = values.len();
    let mean = numerics::mean(&values)?;
    let d = numerics::cohens_d(mean, params.expected_mean, params.expected_std_dev)?;
    let g = numerics::hedges_g(d, n, 1)?;
    let nf = n as f64;
    let standard_error = (1.0 / nf + d * d / (2.0 * nf)).sqrt();
    let critical = numerics::z_critical(params.confidence_level)?;

    Ok(EffectSizeResult {
        n,
        mean_difference: mean - params.expected_mean,
        cohens_d: d,
        hedges_g: g,
        standard_error,
        confidence_interval: ConfidenceInterval::around(
            d,
            critical,
            standard_error,
            params.confidence_level,
        ),
        magnitude: interpret_cohens_d(d),
    })
}

/// Partition trials by intention tag.
pub fn split_by_intention(trials: &[Trial]) -> IntentionSplit {
    let mut split = IntentionSplit::default();
    for trial in trials {
        match trial.intention {
            IntentionTag::Positive => split.positive.push(trial.clone()),
            IntentionTag::Negative => split.negative.push(trial.clone()),
            IntentionTag::Neutral => split.neutral.push(trial.clone()),
        }
    }
    split
}

/// Point-biserial correlation of trial value with a positive intention tag.
pub fn point_biserial_for_intention(trials: &[Trial]) -> Result<f64> {
    let values = trial_values(trials);
    let split: Vec<bool> = trials
        .iter()
        .map(|t| t.intention == IntentionTag::Positive)
        .collect();
    numerics::point_biserial_correlation(&values, &split)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn standardize(trials: &[Trial], params: &AnalysisParameters) -> Vec<f64> {
    trials
        .iter()
        .map(|t| (t.value as f64 - params.expected_mean) / params.expected_std_dev)
        .collect()
}

/// Forward-pass excursion state: at most one open run at a time.
struct ExcursionTracker {
    minimum_length: usize,
    open: Option<OpenRun>,
    closed: Vec<ExcursionPeriod>,
}

struct OpenRun {
    start: usize,
    sign: i8,
    peak_z: f64,
    peak_index: usize,
}

impl ExcursionTracker {
    fn new(minimum_length: usize) -> Self {
        Self {
            minimum_length,
            open: None,
            closed: Vec::new(),
        }
    }

    fn step(&mut self, index: usize, z: f64, sign: i8) {
        if let Some(run) = self.open.as_mut()
            && run.sign == sign
        {
            if z.abs() > run.peak_z.abs() {
                run.peak_z = z;
                run.peak_index = index;
            }
            return;
        }
        if index > 0 {
            self.close(index - 1);
        }
        if sign != 0 {
            self.open = Some(OpenRun {
                start: index,
                sign,
                peak_z: z,
                peak_index: index,
            });
        }
    }

    fn close(&mut self, end: usize) {
        let Some(run) = self.open.take() else {
            return;
        };
        let length = end + 1 - run.start;
        if length >= self.minimum_length {
            self.closed.push(ExcursionPeriod {
                start_index: run.start,
                end_index: end,
                length,
                direction: run.sign,
                peak_z: run.peak_z,
                peak_index: run.peak_index,
                p_value: two_tailed_p(run.peak_z),
            });
        } else {
            log::debug!(
                "dropping excursion at {}..={end}: length {length} below {}",
                run.start,
                self.minimum_length
            );
        }
    }

    fn finish(mut self, last_index: usize) -> Vec<ExcursionPeriod> {
        self.close(last_index);
        self.closed
    }
}

/// One-sample KS statistic against N(0, 1) with the asymptotic Kolmogorov p-value.
fn kolmogorov_smirnov_normal(z: &[f64]) -> (f64, f64) {
    let mut sorted = z.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let nf = sorted.len() as f64;
    let mut d_max = 0.0f64;
    for (i, &x) in sorted.iter().enumerate() {
        let f = normal_cdf(x);
        let above = (i + 1) as f64 / nf - f;
        let below = f - i as f64 / nf;
        d_max = d_max.max(above).max(below);
    }

    let sqrt_n = nf.sqrt();
    let lambda = (sqrt_n + 0.12 + 0.11 / sqrt_n) * d_max;
    let mut p = 0.0;
    for k in 1..=100i32 {
        let sign = if k % 2 == 0 { -1.0 } else { 1.0 };
        p += sign * (-2.0 * (k as f64 * lambda).powi(2)).exp();
    }
    (d_max, (2.0 * p).clamp(0.0, 1.0))
}

/// Anderson–Darling A² against the fully specified N(0, 1).
///
/// p-value from the Marsaglia & Marsaglia (2004) asymptotic distribution.
fn anderson_darling_normal(z: &[f64]) -> (f64, f64) {
    let mut u: Vec<f64> = z
        .iter()
        .map(|&x| normal_cdf(x).clamp(1e-15, 1.0 - 1e-15))
        .collect();
    u.sort_by(|a, b| a.total_cmp(b));
    let n = u.len();
    let nf = n as f64;
    let mut s = 0.0;
    for i in 0..n {
        s += (2.0 * (i + 1) as f64 - 1.0) * (u[i].ln() + (1.0 - u[n - 1 - i]).ln());
    }
    let a2 = -nf - s / nf;
    (a2, (1.0 - anderson_darling_cdf(a2)).clamp(0.0, 1.0))
}

fn anderson_darling_cdf(z: f64) -> f64 {
    if z <= 0.0 {
        return 0.0;
    }
    if z < 2.0 {
        (-1.233_714_1 / z).exp() / z.sqrt()
            * (2.00012
                + (0.247105
                    - (0.0649821 - (0.0347962 - (0.011672 - 0.00168691 * z) * z) * z) * z)
                    * z)
    } else {
        (-(1.0776
            - (2.30695 - (0.43424 - (0.082433 - (0.008056 - 0.0003146 * z) * z) * z) * z) * z)
            .exp())
        .exp()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trial::trials_from_values;

    /// Binomial(200, 0.5) values from a simple LCG.
    fn binomial_values(n: usize, seed: u64) -> Vec<u32> {
        let mut state = seed;
        let mut next = move || {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            state >> 32
        };
        (0..n)
            .map(|_| {
                let a = next() as u32;
                let b = next() as u32;
                let c = next() as u32;
                let d = next() as u32;
                let e = next() as u32;
                let f = next() as u32;
                let g = next() as u32 & 0xFF;
                a.count_ones()
                    + b.count_ones()
                    + c.count_ones()
                    + d.count_ones()
                    + e.count_ones()
                    + f.count_ones()
                    + g.count_ones()
            })
            .collect()
    }

    fn biased_block(prefix: usize, block: usize, shift: u32) -> Vec<Trial> {
        let mut values = vec![100u32; prefix];
        values.extend(std::iter::repeat_n(100 + shift, block));
        trials_from_values(&values)
    }

    #[test]
    fn cumulative_empty_input_fails() {
        let err = calculate_cumulative_deviation(&[], &AnalysisParameters::default());
        assert_eq!(err.unwrap_err(), AnalysisError::EmptyInput);
    }

    #[test]
    fn cumulative_z_matches_formula() {
        let trials = trials_from_values(&[110, 90, 105]);
        let params = AnalysisParameters::default();
        let result = calculate_cumulative_deviation(&trials, &params).unwrap();
        let sigma = params.expected_std_dev;
        assert_eq!(result.points.len(), 3);
        assert!((result.points[0].z_score - 10.0 / sigma).abs() < 1e-12);
        assert!((result.points[1].z_score - 0.0).abs() < 1e-12);
        assert!((result.points[2].z_score - 5.0 / (sigma * 3f64.sqrt())).abs() < 1e-12);
        assert_eq!(result.final_cumulative_deviation, 5.0);
        assert!((result.points[1].p_value - 0.5).abs() < 1e-12);
    }

    #[test]
    fn cumulative_is_pure_and_order_sensitive() {
        let params = AnalysisParameters::default();
        let values = binomial_values(500, 7);
        let trials = trials_from_values(&values);
        let a = calculate_cumulative_deviation(&trials, &params).unwrap();
        let b = calculate_cumulative_deviation(&trials, &params).unwrap();
        assert_eq!(a.points, b.points);
        assert_eq!(a.excursions, b.excursions);

        let mut reversed = values.clone();
        reversed.reverse();
        let c = calculate_cumulative_deviation(&trials_from_values(&reversed), &params).unwrap();
        let za: Vec<f64> = a.points.iter().map(|p| p.z_score).collect();
        let zc: Vec<f64> = c.points.iter().map(|p| p.z_score).collect();
        assert_ne!(za, zc);
        // Same multiset, same endpoint.
        assert!((a.final_z - c.final_z).abs() < 1e-9);
    }

    #[test]
    fn sustained_bias_yields_one_bounded_excursion() {
        let params = AnalysisParameters::default();
        let block = params.minimum_excursion_length + 10;
        let trials = biased_block(50, block, 40);
        let result = calculate_cumulative_deviation(&trials, &params).unwrap();
        assert_eq!(result.excursions.len(), 1);
        let exc = result.excursions[0];
        assert!(exc.start_index >= 50);
        assert_eq!(exc.end_index, 50 + block - 1);
        assert!(exc.length >= params.minimum_excursion_length);
        assert_eq!(exc.direction, 1);
        assert!(exc.peak_z > 2.0);
        assert!(exc.p_value < 0.05);
    }

    #[test]
    fn short_bias_is_not_reported() {
        let params = AnalysisParameters::default();
        let trials = biased_block(50, params.minimum_excursion_length - 10, 40);
        let result = calculate_cumulative_deviation(&trials, &params).unwrap();
        assert!(result.excursions.is_empty());
        assert!(result.max_abs_z > 2.0);
    }

    #[test]
    fn excursion_closes_on_sign_flip() {
        let params = AnalysisParameters::default().with_minimum_excursion_length(5);
        let mut values = vec![140u32; 20];
        values.extend(std::iter::repeat_n(0u32, 40));
        let result =
            calculate_cumulative_deviation(&trials_from_values(&values), &params).unwrap();
        assert_eq!(result.excursions.len(), 2);
        assert_eq!(result.excursions[0].direction, 1);
        assert_eq!(result.excursions[1].direction, -1);
        assert!(result.excursions[0].end_index < result.excursions[1].start_index);
    }

    #[test]
    fn network_variance_near_one_for_binomial() {
        let trials = trials_from_values(&binomial_values(5000, 11));
        let result = calculate_network_variance(&trials, &AnalysisParameters::default()).unwrap();
        assert!((result.normalized_variance - 1.0).abs() < 0.1);
        assert_eq!(result.degrees_of_freedom, 4999);
        assert!(result.temporal_correlation.abs() < 0.05);
        assert!(result.p_value > 0.0 && result.p_value <= 1.0);
    }

    #[test]
    fn network_variance_flags_inflated_variance() {
        let values: Vec<u32> = (0..500).map(|i| if i % 2 == 0 { 80 } else { 120 }).collect();
        let result =
            calculate_network_variance(&trials_from_values(&values), &AnalysisParameters::default())
                .unwrap();
        assert!(result.normalized_variance > 7.0);
        assert!(result.is_significant);
        assert!(result.temporal_correlation < -0.9);
    }

    #[test]
    fn device_variance_binomial_looks_normal() {
        let trials = trials_from_values(&binomial_values(1000, 3));
        let result = calculate_device_variance(&trials, &AnalysisParameters::default()).unwrap();
        assert!(result.mean.abs() < 0.15);
        assert!((result.variance - 1.0).abs() < 0.15);
        assert!(result.skewness.abs() < 0.3);
        assert!(result.kurtosis.abs() < 0.5);
        assert!(result.drift_slope.abs() < 1e-3);
        assert!(result.ks_statistic < 0.1);
        assert!(result.anderson_darling.is_finite());
    }

    #[test]
    fn device_variance_detects_non_normal_shape() {
        let values: Vec<u32> = (0..400).map(|i| if i % 2 == 0 { 70 } else { 130 }).collect();
        let result =
            calculate_device_variance(&trials_from_values(&values), &AnalysisParameters::default())
                .unwrap();
        assert!(result.ks_p_value < 0.01);
        assert!(result.anderson_darling_p_value < 0.01);
        assert!((result.kurtosis + 2.0).abs() < 1e-9);
    }

    #[test]
    fn device_variance_requires_ten_trials() {
        let trials = trials_from_values(&[100; 9]);
        assert_eq!(
            calculate_device_variance(&trials, &AnalysisParameters::default()).unwrap_err(),
            AnalysisError::InsufficientData { needed: 10, got: 9 }
        );
    }

    #[test]
    fn z_score_concrete_scenario() {
        // 121 × 95, 121 × 111, 58 × 103: mean 103, sample sd ≈ 7.2.
        let mut values = vec![95u32; 121];
        values.extend(std::iter::repeat_n(111u32, 121));
        values.extend(std::iter::repeat_n(103u32, 58));
        let trials = trials_from_values(&values);
        let result = calculate_z_score(&trials, &AnalysisParameters::default()).unwrap();
        assert!((result.mean - 103.0).abs() < 1e-9);
        assert!((result.std_dev - 7.2).abs() < 0.05);
        assert!((result.z_score - 7.2).abs() < 0.1, "z = {}", result.z_score);
        assert!(result.significance.is_significant());
        assert!(result.confidence_interval.contains(103.0));
        assert!(!result.confidence_interval.contains(100.0));
    }

    #[test]
    fn z_score_constant_input_uses_expected_sd() {
        let trials = trials_from_values(&[101; 50]);
        let params = AnalysisParameters::default();
        let result = calculate_z_score(&trials, &params).unwrap();
        assert_eq!(result.std_dev, params.expected_std_dev);
        assert!(result.z_score > 0.0);
    }

    #[test]
    fn effect_size_against_reference() {
        let trials = trials_from_values(&[103; 40]);
        let params = AnalysisParameters::default().with_expected_std_dev(7.5);
        let result = calculate_effect_size(&trials, &params).unwrap();
        assert!((result.cohens_d - 0.4).abs() < 1e-12);
        assert!(result.hedges_g < result.cohens_d);
        assert_eq!(result.magnitude, EffectMagnitude::Small);
        assert!(result.confidence_interval.contains(0.4));
    }

    #[test]
    fn intention_split_and_point_biserial() {
        let trials: Vec<Trial> = (0..20)
            .map(|i| {
                let tag = if i % 2 == 0 {
                    IntentionTag::Positive
                } else {
                    IntentionTag::Neutral
                };
                let value = if i % 2 == 0 { 104 } else { 98 };
                Trial::new(i, value).with_intention(tag)
            })
            .collect();
        let split = split_by_intention(&trials);
        assert_eq!(split.positive.len(), 10);
        assert_eq!(split.neutral.len(), 10);
        assert!(split.negative.is_empty());
        let r = point_biserial_for_intention(&trials).unwrap();
        assert!((r - 1.0).abs() < 1e-9);
    }
}
