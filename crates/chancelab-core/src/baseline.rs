//! Baseline calibration, long-term drift detection and intention/control comparison.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{AnalysisError, Result, require};
use crate::numerics::{self, ConfidenceInterval, EffectMagnitude, Significance};
use crate::params::AnalysisParameters;
use crate::trial::{MS_PER_DAY, Trial, trial_values};

/// Minimum trials for a drift window to count.
pub const MIN_WINDOW_TRIALS: usize = 10;
/// Minimum valid windows before a drift trend is fitted.
pub const MIN_DRIFT_WINDOWS: usize = 3;

const DRIFT_P_THRESHOLD: f64 = 0.01;
const PROJECTION_DAYS: f64 = 30.0;
const PROJECTED_DRIFT_LIMIT: f64 = 5.0;
const DAILY_RATE_LIMIT: f64 = 0.5;
/// Largest window index a drift period may produce.
const MAX_WINDOW_INDEX: f64 = u32::MAX as f64;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Two-sample summary of a baseline against a current calibration run.
#[derive(Debug, Clone, Serialize)]
pub struct CalibrationAnalysis {
    pub baseline_n: usize,
    pub baseline_mean: f64,
    pub baseline_std_dev: f64,
    pub current_n: usize,
    pub current_mean: f64,
    pub current_std_dev: f64,
    /// current_mean − baseline_mean.
    pub drift: f64,
    pub pooled_std_dev: f64,
    pub welch_t: f64,
    /// Welch–Satterthwaite degrees of freedom.
    pub welch_df: f64,
    /// Two-tailed p of the Welch test.
    pub p_value: f64,
    pub pooled_t: f64,
    pub pooled_p_value: f64,
    pub recalibration_needed: bool,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DriftWindow {
    pub index: usize,
    pub start_ms: u64,
    /// Days from the first trial to the window center.
    pub midpoint_days: f64,
    pub n: usize,
    pub mean: f64,
    /// Whether the window holds enough trials to enter the fit.
    pub valid: bool,
}

/// What raised the maintenance flag, checked in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftTrigger {
    SignificantTrend,
    ProjectedDrift,
    DailyRate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftStatus {
    /// Too few windows or too short a span to fit a trend.
    InsufficientHistory,
    Stable,
    MaintenanceRequired,
}

#[derive(Debug, Clone, Serialize)]
pub struct DriftAnalysis {
    pub period_days: f64,
    pub windows: Vec<DriftWindow>,
    pub valid_windows: usize,
    pub span_days: f64,
    /// Slope of window mean against time, value units per day.
    pub daily_drift_rate: f64,
    pub projected_drift_30d: f64,
    pub r_squared: f64,
    pub slope_t: f64,
    pub p_value: f64,
    pub status: DriftStatus,
    pub maintenance_required: bool,
    pub trigger: Option<DriftTrigger>,
}

/// Pooled-variance comparison of intention trials with control trials.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonResult {
    pub intention_n: usize,
    pub intention_mean: f64,
    pub control_n: usize,
    pub control_mean: f64,
    pub mean_difference: f64,
    pub pooled_std_dev: f64,
    pub t_statistic: f64,
    pub degrees_of_freedom: usize,
    pub p_value: f64,
    pub cohens_d: f64,
    pub hedges_g: f64,
    pub magnitude: EffectMagnitude,
    /// Interval for the mean difference.
    pub confidence_interval: ConfidenceInterval,
    pub significance: Significance,
}

// ---------------------------------------------------------------------------
// Analysis functions
// ---------------------------------------------------------------------------

/// Compare a current calibration run against the stored baseline.
///
/// Recalibration is flagged when the Welch test rejects at 0.05 or the mean
/// has moved by more than two baseline standard deviations.
pub fn analyze_calibration_data(
    baseline: &[Trial],
    current: &[Trial],
    params: &AnalysisParameters,
) -> Result<CalibrationAnalysis> {
    params.validate()?;
    let a = SampleStats::of(baseline)?;
    let b = SampleStats::of(current)?;

    let drift = b.mean - a.mean;
    let pooled = numerics::pooled_std_dev(a.sd, a.n, b.sd, b.n)?;

    let va = a.sd * a.sd / a.n as f64;
    let vb = b.sd * b.sd / b.n as f64;
    let welch_se = (va + vb).sqrt();
    let welch_df_den =
        va * va / (a.n as f64 - 1.0) + vb * vb / (b.n as f64 - 1.0);
    let pooled_df = (a.n + b.n - 2) as f64;
    let welch_df = if welch_df_den > 0.0 {
        (va + vb).powi(2) / welch_df_den
    } else {
        pooled_df
    };
    let (welch_t, p_value) = t_and_p(drift, welch_se, welch_df.max(1.0))?;

    let pooled_se = pooled * (1.0 / a.n as f64 + 1.0 / b.n as f64).sqrt();
    let (pooled_t, pooled_p_value) = t_and_p(drift, pooled_se, pooled_df)?;

    let reason = if p_value < 0.05 {
        Some(format!("mean shift significant (Welch p = {p_value:.4})"))
    } else if drift.abs() > 2.0 * a.sd {
        Some(format!(
            "mean moved {drift:.3}, more than two baseline std devs ({:.3})",
            a.sd
        ))
    } else {
        None
    };
    if let Some(reason) = &reason {
        log::info!("recalibration needed: {reason}");
    }

    Ok(CalibrationAnalysis {
        baseline_n: a.n,
        baseline_mean: a.mean,
        baseline_std_dev: a.sd,
        current_n: b.n,
        current_mean: b.mean,
        current_std_dev: b.sd,
        drift,
        pooled_std_dev: pooled,
        welch_t,
        welch_df,
        p_value,
        pooled_t,
        pooled_p_value,
        recalibration_needed: reason.is_some(),
        reason,
    })
}

/// Bucket trials into fixed time windows and fit a linear trend to window means.
pub fn detect_baseline_drift(
    trials: &[Trial],
    period_days: f64,
    params: &AnalysisParameters,
) -> Result<DriftAnalysis> {
    params.validate()?;
    if !(period_days.is_finite() && period_days > 0.0) {
        return Err(AnalysisError::invalid(format!(
            "period_days must be positive, got {period_days}"
        )));
    }
    if trials.is_empty() {
        return Err(AnalysisError::EmptyInput);
    }

    let period_ms = period_days * MS_PER_DAY;
    let first = trials.iter().map(|t| t.timestamp_ms).min().unwrap_or(0);
    let last = trials.iter().map(|t| t.timestamp_ms).max().unwrap_or(0);
    let span_days = (last - first) as f64 / MS_PER_DAY;

    if (last - first) as f64 / period_ms > MAX_WINDOW_INDEX {
        return Err(AnalysisError::invalid(format!(
            "period_days {period_days} splits {span_days:.3} days into too many windows"
        )));
    }

    let mut sums: BTreeMap<usize, (usize, f64)> = BTreeMap::new();
    for trial in trials {
        let k = ((trial.timestamp_ms - first) as f64 / period_ms).floor() as usize;
        let slot = sums.entry(k).or_insert((0, 0.0));
        slot.0 += 1;
        slot.1 += trial.value as f64;
    }

    let windows: Vec<DriftWindow> = sums
        .into_iter()
        .map(|(k, (n, sum))| DriftWindow {
            index: k,
            start_ms: first.saturating_add((k as f64 * period_ms) as u64),
            midpoint_days: (k as f64 + 0.5) * period_days,
            n,
            mean: sum / n as f64,
            valid: n >= MIN_WINDOW_TRIALS,
        })
        .collect();
    for w in windows.iter().filter(|w| !w.valid) {
        log::debug!(
            "drift window {} skipped: {} trials below {MIN_WINDOW_TRIALS}",
            w.index,
            w.n
        );
    }

    let (xs, ys): (Vec<f64>, Vec<f64>) = windows
        .iter()
        .filter(|w| w.valid)
        .map(|w| (w.midpoint_days, w.mean))
        .unzip();
    let valid_windows = xs.len();

    let mut result = DriftAnalysis {
        period_days,
        windows,
        valid_windows,
        span_days,
        daily_drift_rate: 0.0,
        projected_drift_30d: 0.0,
        r_squared: 0.0,
        slope_t: 0.0,
        p_value: 1.0,
        status: DriftStatus::InsufficientHistory,
        maintenance_required: false,
        trigger: None,
    };
    if valid_windows < MIN_DRIFT_WINDOWS || span_days < 2.0 * period_days {
        log::debug!(
            "drift: {valid_windows} valid window(s) over {span_days:.2} days, reporting stable"
        );
        return Ok(result);
    }

    let fit = numerics::linear_regression(&xs, &ys)?;
    let slope_t = fit.slope_t();
    let p_value = if slope_t.is_finite() {
        numerics::t_two_tailed_p(slope_t, (valid_windows - 2) as f64)?
    } else {
        0.0
    };
    let projected = fit.slope * PROJECTION_DAYS;

    let trigger = if p_value < DRIFT_P_THRESHOLD {
        Some(DriftTrigger::SignificantTrend)
    } else if projected.abs() > PROJECTED_DRIFT_LIMIT {
        Some(DriftTrigger::ProjectedDrift)
    } else if fit.slope.abs() > DAILY_RATE_LIMIT {
        Some(DriftTrigger::DailyRate)
    } else {
        None
    };

    result.daily_drift_rate = fit.slope;
    result.projected_drift_30d = projected;
    result.r_squared = fit.r_squared;
    result.slope_t = slope_t;
    result.p_value = p_value;
    result.maintenance_required = trigger.is_some();
    result.status = if trigger.is_some() {
        DriftStatus::MaintenanceRequired
    } else {
        DriftStatus::Stable
    };
    result.trigger = trigger;
    Ok(result)
}

/// Two-sample pooled-variance t-test of intention against control trials.
pub fn compare_control_periods(
    intention: &[Trial],
    control: &[Trial],
    params: &AnalysisParameters,
) -> Result<ComparisonResult> {
    params.validate()?;
    let a = SampleStats::of(intention)?;
    let b = SampleStats::of(control)?;

    let pooled = numerics::pooled_std_dev(a.sd, a.n, b.sd, b.n)?;
    if pooled < 1e-12 {
        return Err(AnalysisError::invalid(
            "both samples have zero variance; comparison undefined",
        ));
    }
    let diff = a.mean - b.mean;
    let df = a.n + b.n - 2;
    let se = pooled * (1.0 / a.n as f64 + 1.0 / b.n as f64).sqrt();
    let t = diff / se;
    let p_value = numerics::t_two_tailed_p(t, df as f64)?;
    let d = diff / pooled;
    let critical = numerics::t_critical(params.confidence_level, df as f64)?;

    Ok(ComparisonResult {
        intention_n: a.n,
        intention_mean: a.mean,
        control_n: b.n,
        control_mean: b.mean,
        mean_difference: diff,
        pooled_std_dev: pooled,
        t_statistic: t,
        degrees_of_freedom: df,
        p_value,
        cohens_d: d,
        hedges_g: numerics::hedges_g(d, a.n + b.n, 2)?,
        magnitude: numerics::interpret_cohens_d(d),
        confidence_interval: ConfidenceInterval::around(
            diff,
            critical,
            se,
            params.confidence_level,
        ),
        significance: Significance::from_p(p_value, params.significance_level),
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct SampleStats {
    n: usize,
    mean: f64,
    sd: f64,
}

impl SampleStats {
    fn of(trials: &[Trial]) -> Result<Self> {
        require(2, trials.len())?;
        let values = trial_values(trials);
        Ok(Self {
            n: values.len(),
            mean: numerics::mean(&values)?,
            sd: numerics::standard_deviation(&values)?,
        })
    }
}

/// t statistic and two-tailed p, with a zero standard error treated as exact.
fn t_and_p(diff: f64, se: f64, df: f64) -> Result<(f64, f64)> {
    if se > 0.0 {
        let t = diff / se;
        return Ok((t, numerics::t_two_tailed_p(t, df)?));
    }
    if diff == 0.0 {
        Ok((0.0, 1.0))
    } else {
        log::warn!("zero standard error with nonzero difference {diff}");
        Ok((f64::INFINITY.copysign(diff), 0.0))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trial::IntentionTag;

    /// Alternating ±spread around `center`, one trial per `step_ms`.
    fn sample(center: u32, spread: u32, n: usize, start_ms: u64, step_ms: u64) -> Vec<Trial> {
        (0..n)
            .map(|i| {
                let v = if i % 2 == 0 {
                    center + spread
                } else {
                    center - spread
                };
                Trial::new(start_ms + i as u64 * step_ms, v).with_sequence(i as u64)
            })
            .collect()
    }

    #[test]
    fn calibration_stable_when_means_match() {
        let base = sample(100, 7, 200, 0, 1000);
        let cur = sample(100, 7, 200, 0, 1000);
        let r = analyze_calibration_data(&base, &cur, &AnalysisParameters::default()).unwrap();
        assert_eq!(r.drift, 0.0);
        assert!((r.p_value - 1.0).abs() < 1e-9);
        assert!(!r.recalibration_needed);
        assert!(r.reason.is_none());
    }

    #[test]
    fn calibration_flags_shift() {
        let base = sample(100, 7, 200, 0, 1000);
        let cur = sample(103, 7, 200, 0, 1000);
        let r = analyze_calibration_data(&base, &cur, &AnalysisParameters::default()).unwrap();
        assert_eq!(r.drift, 3.0);
        assert!(r.p_value < 0.05);
        assert!(r.pooled_p_value < 0.05);
        assert!(r.recalibration_needed);
        // Equal sizes and variances: Welch df equals pooled df.
        assert!((r.welch_df - 398.0).abs() < 1e-6);
    }

    #[test]
    fn calibration_flags_large_shift_without_power() {
        let base = sample(100, 1, 2, 0, 1000);
        let cur = sample(103, 1, 2, 0, 1000);
        let r = analyze_calibration_data(&base, &cur, &AnalysisParameters::default()).unwrap();
        assert!(r.recalibration_needed);
    }

    #[test]
    fn calibration_requires_two_trials_each() {
        let base = sample(100, 1, 1, 0, 1000);
        let cur = sample(100, 1, 10, 0, 1000);
        assert_eq!(
            analyze_calibration_data(&base, &cur, &AnalysisParameters::default()).unwrap_err(),
            AnalysisError::InsufficientData { needed: 2, got: 1 }
        );
    }

    fn daily_windows(means: &[u32], per_day: usize) -> Vec<Trial> {
        let day = MS_PER_DAY as u64;
        let step = day / per_day as u64;
        means
            .iter()
            .enumerate()
            .flat_map(|(d, &m)| sample(m, 2, per_day, d as u64 * day, step))
            .collect()
    }

    #[test]
    fn drift_detects_trend() {
        let trials = daily_windows(&[100, 101, 102, 103, 104, 105], 20);
        let r = detect_baseline_drift(&trials, 1.0, &AnalysisParameters::default()).unwrap();
        assert_eq!(r.valid_windows, 6);
        assert!((r.daily_drift_rate - 1.0).abs() < 1e-9);
        assert!((r.projected_drift_30d - 30.0).abs() < 1e-6);
        assert!(r.maintenance_required);
        assert_eq!(r.status, DriftStatus::MaintenanceRequired);
        assert_eq!(r.trigger, Some(DriftTrigger::SignificantTrend));
    }

    #[test]
    fn drift_flat_is_stable() {
        let trials = daily_windows(&[100, 100, 100, 100], 20);
        let r = detect_baseline_drift(&trials, 1.0, &AnalysisParameters::default()).unwrap();
        assert_eq!(r.status, DriftStatus::Stable);
        assert!(!r.maintenance_required);
        assert_eq!(r.daily_drift_rate, 0.0);
    }

    #[test]
    fn drift_short_history_is_neutral() {
        let trials = daily_windows(&[100, 110], 20);
        let r = detect_baseline_drift(&trials, 1.0, &AnalysisParameters::default()).unwrap();
        assert_eq!(r.status, DriftStatus::InsufficientHistory);
        assert!(!r.maintenance_required);
        assert!(r.trigger.is_none());
    }

    #[test]
    fn drift_skips_sparse_windows() {
        let mut trials = daily_windows(&[100, 100, 100], 20);
        trials.extend(sample(150, 1, 4, 3 * MS_PER_DAY as u64, 1000));
        let r = detect_baseline_drift(&trials, 1.0, &AnalysisParameters::default()).unwrap();
        assert_eq!(r.windows.len(), 4);
        assert_eq!(r.valid_windows, 3);
        assert!(!r.windows[3].valid);
        assert_eq!(r.status, DriftStatus::Stable);
    }

    #[test]
    fn drift_rejects_bad_period() {
        let trials = daily_windows(&[100], 20);
        assert!(matches!(
            detect_baseline_drift(&trials, 0.0, &AnalysisParameters::default()),
            Err(AnalysisError::InvalidArgument(_))
        ));
        assert_eq!(
            detect_baseline_drift(&[], 1.0, &AnalysisParameters::default()).unwrap_err(),
            AnalysisError::EmptyInput
        );
    }

    #[test]
    fn drift_noisy_steep_trend_projects_past_limit() {
        let trials = daily_windows(&[100, 104, 101], 20);
        let r = detect_baseline_drift(&trials, 1.0, &AnalysisParameters::default()).unwrap();
        assert_eq!(r.valid_windows, 3);
        assert!(r.p_value >= DRIFT_P_THRESHOLD);
        assert!((r.daily_drift_rate - 0.5).abs() < 1e-9);
        assert!((r.projected_drift_30d - 15.0).abs() < 1e-6);
        assert_eq!(r.trigger, Some(DriftTrigger::ProjectedDrift));
        assert_eq!(r.status, DriftStatus::MaintenanceRequired);
    }

    #[test]
    fn daily_rate_limit_is_dominated_by_projection() {
        let implied_projection = DAILY_RATE_LIMIT * PROJECTION_DAYS;
        assert!(implied_projection > PROJECTED_DRIFT_LIMIT);

        let trials = daily_windows(&[100, 112, 102], 20);
        let r = detect_baseline_drift(&trials, 1.0, &AnalysisParameters::default()).unwrap();
        assert!(r.p_value >= DRIFT_P_THRESHOLD);
        assert!(r.daily_drift_rate > DAILY_RATE_LIMIT);
        assert_eq!(r.trigger, Some(DriftTrigger::ProjectedDrift));
    }

    #[test]
    fn drift_rejects_period_too_small_for_span() {
        let trials = sample(100, 2, 40, 0, 1000);
        assert!(matches!(
            detect_baseline_drift(&trials, 1e-300, &AnalysisParameters::default()),
            Err(AnalysisError::InvalidArgument(_))
        ));
    }

    #[test]
    fn drift_stores_only_occupied_windows() {
        // 86.4 ms windows over 39 s: 40 occupied out of ~450.
        let trials = sample(100, 2, 40, 0, 1000);
        let r = detect_baseline_drift(&trials, 1e-6, &AnalysisParameters::default()).unwrap();
        assert_eq!(r.windows.len(), 40);
        assert_eq!(r.valid_windows, 0);
        assert_eq!(r.status, DriftStatus::InsufficientHistory);
        assert!(r.windows.windows(2).all(|w| w[0].index < w[1].index));
    }

    #[test]
    fn compare_intention_with_control() {
        let intention: Vec<Trial> = sample(104, 7, 100, 0, 1000)
            .into_iter()
            .map(|t| t.with_intention(IntentionTag::Positive))
            .collect();
        let control = sample(100, 7, 100, 0, 1000);
        let r = compare_control_periods(&intention, &control, &AnalysisParameters::default())
            .unwrap();
        assert_eq!(r.mean_difference, 4.0);
        assert_eq!(r.degrees_of_freedom, 198);
        assert!(r.p_value < 0.001);
        assert!(r.significance.is_significant());
        assert!(r.hedges_g < r.cohens_d);
        assert!(r.confidence_interval.contains(4.0));
        assert!(!r.confidence_interval.contains(0.0));
    }

    #[test]
    fn compare_zero_variance_is_invalid() {
        let a = sample(100, 0, 10, 0, 1000);
        let b = sample(101, 0, 10, 0, 1000);
        assert!(compare_control_periods(&a, &b, &AnalysisParameters::default()).is_err());
    }
}
