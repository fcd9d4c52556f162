//! Probability and numerics library.
//!
//! Distribution functions, moment statistics, effect sizes and
//! multiple-comparison corrections. Everything here is a pure function of its
//! arguments. Functions fail with [`AnalysisError::InvalidArgument`] for
//! out-of-domain input instead of clamping; the only documented clamp is the
//! variance floor at zero that absorbs negative rounding artifacts.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF, StudentsT};
use statrs::function::erf::erfc;
use std::f64::consts::{PI, SQRT_2};

use crate::error::{AnalysisError, Result, require};

// ---------------------------------------------------------------------------
// Normal distribution
// ---------------------------------------------------------------------------

/// Standard normal CDF, Φ(z).
pub fn normal_cdf(z: f64) -> f64 {
    (0.5 * erfc(-z / SQRT_2)).clamp(0.0, 1.0)
}

/// Standard normal density.
pub fn normal_pdf(z: f64) -> f64 {
    (-0.5 * z * z).exp() / (2.0 * PI).sqrt()
}

/// Upper-tail probability P(Z > z).
pub fn one_tailed_p(z: f64) -> f64 {
    (0.5 * erfc(z / SQRT_2)).clamp(0.0, 1.0)
}

/// Two-tailed probability P(|Z| > |z|).
pub fn two_tailed_p(z: f64) -> f64 {
    erfc(z.abs() / SQRT_2).clamp(0.0, 1.0)
}

/// Inverse standard normal CDF, Φ⁻¹(p).
///
/// Wichura's AS241 (PPND16) rational approximation, relative error ~1e-16.
pub fn normal_inverse(p: f64) -> Result<f64> {
    if !(p > 0.0 && p < 1.0) {
        return Err(AnalysisError::invalid(format!(
            "probability must be in (0, 1), got {p}"
        )));
    }
    let q = p - 0.5;
    if q.abs() <= 0.425 {
        let r = 0.180625 - q * q;
        let num = ((((((2509.080_928_730_122_7 * r + 33_430.575_583_588_13) * r
            + 67_265.770_927_008_7)
            * r
            + 45_921.953_931_549_87)
            * r
            + 13_731.693_765_509_46)
            * r
            + 1_971.590_950_306_551_3)
            * r
            + 133.141_667_891_784_38)
            * r
            + 3.387_132_872_796_366_5;
        let den = ((((((5_226.495_278_852_546 * r + 28_729.085_735_721_943) * r
            + 39_307.895_800_092_71)
            * r
            + 21_213.794_301_586_597)
            * r
            + 5_394.196_021_424_751)
            * r
            + 687.187_007_492_057_9)
            * r
            + 42.313_330_701_600_91)
            * r
            + 1.0;
        return Ok(q * num / den);
    }

    let tail = if q < 0.0 { p } else { 1.0 - p };
    let mut r = (-tail.ln()).sqrt();
    let value = if r <= 5.0 {
        r -= 1.6;
        let num = ((((((7.745_450_142_783_414e-4 * r + 0.022_723_844_989_269_184) * r
            + 0.241_780_725_177_450_6)
            * r
            + 1.270_458_252_452_368_4)
            * r
            + 3.647_848_324_763_204_5)
            * r
            + 5.769_497_221_460_691)
            * r
            + 4.630_337_846_156_545)
            * r
            + 1.423_437_110_749_683_6;
        let den = ((((((1.050_750_071_644_416_8e-9 * r + 5.475_938_084_995_345e-4) * r
            + 0.015_198_666_563_616_457)
            * r
            + 0.148_103_976_427_480_08)
            * r
            + 0.689_767_334_985_1)
            * r
            + 1.676_384_830_183_803_8)
            * r
            + 2.053_191_626_637_759)
            * r
            + 1.0;
        num / den
    } else {
        r -= 5.0;
        let num = ((((((2.010_334_399_292_288_1e-7 * r + 2.711_555_568_743_487_6e-5) * r
            + 0.001_242_660_947_388_078_4)
            * r
            + 0.026_532_189_526_576_124)
            * r
            + 0.296_560_571_828_504_9)
            * r
            + 1.784_826_539_917_291_3)
            * r
            + 5.463_784_911_164_114)
            * r
            + 6.657_904_643_501_103;
        let den = ((((((2.044_263_103_389_939_7e-15 * r + 1.421_511_758_316_446e-7) * r
            + 1.846_318_317_510_054_8e-5)
            * r
            + 7.868_691_311_456_133e-4)
            * r
            + 0.014_875_361_290_850_615)
            * r
            + 0.136_929_880_922_735_8)
            * r
            + 0.599_832_206_555_888)
            * r
            + 1.0;
        num / den
    };
    Ok(if q < 0.0 { -value } else { value })
}

/// Two-sided critical value z such that P(|Z| < z) = `confidence`.
pub fn z_critical(confidence: f64) -> Result<f64> {
    check_probability("confidence", confidence)?;
    normal_inverse(1.0 - (1.0 - confidence) / 2.0)
}

// ---------------------------------------------------------------------------
// Chi-square and Student-t
// ---------------------------------------------------------------------------

/// Upper-tail probability P(X > x) for X ~ χ²(df).
pub fn chi_square_probability(x: f64, df: f64) -> Result<f64> {
    check_df(df)?;
    if !(x >= 0.0) {
        return Err(AnalysisError::invalid(format!(
            "chi-square statistic must be non-negative, got {x}"
        )));
    }
    if x == 0.0 {
        return Ok(1.0);
    }
    let dist = ChiSquared::new(df)
        .map_err(|_| AnalysisError::invalid(format!("invalid chi-square df {df}")))?;
    Ok(dist.sf(x).clamp(0.0, 1.0))
}

/// Value x with P(X > x) = `alpha` for X ~ χ²(df).
pub fn chi_square_critical(alpha: f64, df: f64) -> Result<f64> {
    check_probability("alpha", alpha)?;
    check_df(df)?;
    let dist = ChiSquared::new(df)
        .map_err(|_| AnalysisError::invalid(format!("invalid chi-square df {df}")))?;
    Ok(dist.inverse_cdf(1.0 - alpha))
}

/// Upper-tail probability P(T > t) for T ~ t(df).
pub fn t_distribution_probability(t: f64, df: f64) -> Result<f64> {
    Ok(students_t(df)?.sf(t).clamp(0.0, 1.0))
}

/// Two-tailed probability P(|T| > |t|) for T ~ t(df).
pub fn t_two_tailed_p(t: f64, df: f64) -> Result<f64> {
    Ok((2.0 * students_t(df)?.sf(t.abs())).clamp(0.0, 1.0))
}

/// Two-sided critical value t such that P(|T| < t) = `confidence`.
pub fn t_critical(confidence: f64, df: f64) -> Result<f64> {
    check_probability("confidence", confidence)?;
    Ok(students_t(df)?.inverse_cdf(1.0 - (1.0 - confidence) / 2.0))
}

fn students_t(df: f64) -> Result<StudentsT> {
    check_df(df)?;
    StudentsT::new(0.0, 1.0, df)
        .map_err(|_| AnalysisError::invalid(format!("invalid Student-t df {df}")))
}

fn check_df(df: f64) -> Result<()> {
    if !(df >= 1.0) || !df.is_finite() {
        return Err(AnalysisError::invalid(format!(
            "degrees of freedom must be >= 1, got {df}"
        )));
    }
    Ok(())
}

fn check_probability(name: &str, p: f64) -> Result<()> {
    if !(p > 0.0 && p < 1.0) {
        return Err(AnalysisError::invalid(format!(
            "{name} must be in (0, 1), got {p}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Moments
// ---------------------------------------------------------------------------

pub fn mean(data: &[f64]) -> Result<f64> {
    if data.is_empty() {
        return Err(AnalysisError::EmptyInput);
    }
    Ok(data.iter().sum::<f64>() / data.len() as f64)
}

/// Sample variance (n − 1 denominator), floored at zero.
pub fn variance(data: &[f64]) -> Result<f64> {
    require(2, data.len())?;
    let m = mean(data)?;
    let ss: f64 = data.iter().map(|&x| (x - m) * (x - m)).sum();
    Ok((ss / (data.len() - 1) as f64).max(0.0))
}

pub fn standard_deviation(data: &[f64]) -> Result<f64> {
    Ok(variance(data)?.sqrt())
}

/// Moment-ratio skewness m3 / m2^1.5. Zero for constant data.
pub fn skewness(data: &[f64]) -> Result<f64> {
    let (m2, m3, _) = central_moments(data)?;
    if m2 < 1e-300 {
        return Ok(0.0);
    }
    Ok(m3 / m2.powf(1.5))
}

/// Excess kurtosis m4 / m2² − 3. Zero for constant data.
pub fn kurtosis(data: &[f64]) -> Result<f64> {
    let (m2, _, m4) = central_moments(data)?;
    if m2 < 1e-300 {
        return Ok(0.0);
    }
    Ok(m4 / (m2 * m2) - 3.0)
}

/// Population central moments (m2, m3, m4).
fn central_moments(data: &[f64]) -> Result<(f64, f64, f64)> {
    require(2, data.len())?;
    let m = mean(data)?;
    let n = data.len() as f64;
    let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
    for &x in data {
        let d = x - m;
        let d2 = d * d;
        m2 += d2;
        m3 += d2 * d;
        m4 += d2 * d2;
    }
    Ok((m2 / n, m3 / n, m4 / n))
}

pub fn median(data: &[f64]) -> Result<f64> {
    if data.is_empty() {
        return Err(AnalysisError::EmptyInput);
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    Ok(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    })
}

/// Lag-1 autocorrelation. Zero when the series has no variance.
pub fn lag1_autocorrelation(data: &[f64]) -> Result<f64> {
    require(3, data.len())?;
    let n = data.len();
    let m = mean(data)?;
    let var: f64 = data.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / n as f64;
    if var < 1e-12 {
        return Ok(0.0);
    }
    let mut sum = 0.0;
    for i in 0..n - 1 {
        sum += (data[i] - m) * (data[i + 1] - m);
    }
    Ok(sum / ((n - 1) as f64 * var))
}

/// Pearson correlation coefficient. Zero when either side has no variance.
pub fn pearson_correlation(a: &[f64], b: &[f64]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(AnalysisError::invalid(format!(
            "length mismatch: {} vs {}",
            a.len(),
            b.len()
        )));
    }
    require(2, a.len())?;
    let mean_a = mean(a)?;
    let mean_b = mean(b)?;
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (&x, &y) in a.iter().zip(b) {
        let da = x - mean_a;
        let db = y - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    let denom = (var_a * var_b).sqrt();
    Ok(if denom < 1e-12 { 0.0 } else { cov / denom })
}

// ---------------------------------------------------------------------------
// Regression
// ---------------------------------------------------------------------------

/// Ordinary least squares fit of y on x.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    /// Standard error of the slope (residual df = n − 2).
    pub slope_std_error: f64,
    pub n: usize,
}

impl LinearFit {
    /// t statistic for H0: slope = 0. Infinite for an exact non-flat fit.
    pub fn slope_t(&self) -> f64 {
        if self.slope_std_error > 0.0 {
            self.slope / self.slope_std_error
        } else if self.slope == 0.0 {
            0.0
        } else {
            f64::INFINITY.copysign(self.slope)
        }
    }
}

pub fn linear_regression(xs: &[f64], ys: &[f64]) -> Result<LinearFit> {
    if xs.len() != ys.len() {
        return Err(AnalysisError::invalid(format!(
            "length mismatch: {} vs {}",
            xs.len(),
            ys.len()
        )));
    }
    require(3, xs.len())?;
    let n = xs.len() as f64;
    let mx = mean(xs)?;
    let my = mean(ys)?;
    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    for (&x, &y) in xs.iter().zip(ys) {
        sxx += (x - mx) * (x - mx);
        sxy += (x - mx) * (y - my);
        syy += (y - my) * (y - my);
    }
    if sxx < 1e-12 {
        return Err(AnalysisError::invalid("regressor has zero variance"));
    }
    let slope = sxy / sxx;
    let intercept = my - slope * mx;
    let sse = (syy - slope * sxy).max(0.0);
    let r_squared = if syy > 1e-12 { 1.0 - sse / syy } else { 0.0 };
    let slope_std_error = (sse / (n - 2.0) / sxx).sqrt();
    Ok(LinearFit {
        slope,
        intercept,
        r_squared,
        slope_std_error,
        n: xs.len(),
    })
}

// ---------------------------------------------------------------------------
// Effect sizes
// ---------------------------------------------------------------------------

/// Two-sided interval at a stated level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
    pub level: f64,
}

impl ConfidenceInterval {
    /// `center ± critical · standard_error`.
    pub fn around(center: f64, critical: f64, standard_error: f64, level: f64) -> Self {
        Self {
            lower: center - critical * standard_error,
            upper: center + critical * standard_error,
            level,
        }
    }

    pub fn contains(&self, x: f64) -> bool {
        self.lower <= x && x <= self.upper
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Conventional magnitude bands for a standardized mean difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectMagnitude {
    Negligible,
    Small,
    Medium,
    Large,
}

/// Classify |d| as < 0.2, < 0.5, < 0.8, or larger.
pub fn interpret_cohens_d(d: f64) -> EffectMagnitude {
    let d = d.abs();
    if d < 0.2 {
        EffectMagnitude::Negligible
    } else if d < 0.5 {
        EffectMagnitude::Small
    } else if d < 0.8 {
        EffectMagnitude::Medium
    } else {
        EffectMagnitude::Large
    }
}

/// Verdict on a two-tailed p-value at the configured significance level α.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Significance {
    /// p < α
    Significant,
    /// α ≤ p < 2α
    Marginal,
    NotSignificant,
}

impl Significance {
    pub fn from_p(p: f64, alpha: f64) -> Self {
        if p < alpha {
            Self::Significant
        } else if p < 2.0 * alpha {
            Self::Marginal
        } else {
            Self::NotSignificant
        }
    }

    pub fn is_significant(self) -> bool {
        self == Self::Significant
    }
}

impl std::fmt::Display for Significance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Significant => write!(f, "significant"),
            Self::Marginal => write!(f, "marginal"),
            Self::NotSignificant => write!(f, "not significant"),
        }
    }
}

/// Standardized difference of an observed mean from a reference.
pub fn cohens_d(observed_mean: f64, reference_mean: f64, reference_std: f64) -> Result<f64> {
    if !(reference_std > 0.0) {
        return Err(AnalysisError::invalid(format!(
            "reference standard deviation must be positive, got {reference_std}"
        )));
    }
    Ok((observed_mean - reference_mean) / reference_std)
}

/// Small-sample corrected Cohen's d: g = d · (1 − 3 / (4·df − 1)), df = n − groups.
pub fn hedges_g(d: f64, n: usize, groups: usize) -> Result<f64> {
    if n <= groups {
        return Err(AnalysisError::invalid(format!(
            "hedges_g needs n > groups, got n={n}, groups={groups}"
        )));
    }
    let df = (n - groups) as f64;
    Ok(d * (1.0 - 3.0 / (4.0 * df - 1.0)))
}

/// Pooled standard deviation of two samples.
pub fn pooled_std_dev(sd1: f64, n1: usize, sd2: f64, n2: usize) -> Result<f64> {
    if n1 + n2 < 3 || n1 == 0 || n2 == 0 {
        return Err(AnalysisError::InsufficientData {
            needed: 3,
            got: n1 + n2,
        });
    }
    let num = (n1 as f64 - 1.0) * sd1 * sd1 + (n2 as f64 - 1.0) * sd2 * sd2;
    Ok((num / (n1 + n2 - 2) as f64).max(0.0).sqrt())
}

/// Point-biserial correlation between a continuous variable and a dichotomy.
pub fn point_biserial_correlation(values: &[f64], split: &[bool]) -> Result<f64> {
    if values.len() != split.len() {
        return Err(AnalysisError::invalid(format!(
            "length mismatch: {} values vs {} flags",
            values.len(),
            split.len()
        )));
    }
    require(2, values.len())?;
    let (mut sum1, mut n1, mut sum0, mut n0) = (0.0, 0usize, 0.0, 0usize);
    for (&v, &s) in values.iter().zip(split) {
        if s {
            sum1 += v;
            n1 += 1;
        } else {
            sum0 += v;
            n0 += 1;
        }
    }
    if n1 == 0 || n0 == 0 {
        return Err(AnalysisError::invalid(
            "point-biserial correlation needs both groups non-empty",
        ));
    }
    let n = values.len() as f64;
    let m = mean(values)?;
    let sd_pop = (values.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / n).sqrt();
    if sd_pop < 1e-12 {
        return Ok(0.0);
    }
    let p = n1 as f64 / n;
    let q = n0 as f64 / n;
    Ok((sum1 / n1 as f64 - sum0 / n0 as f64) / sd_pop * (p * q).sqrt())
}

// ---------------------------------------------------------------------------
// Multiple-comparison corrections
// ---------------------------------------------------------------------------

fn check_p_values(p_values: &[f64]) -> Result<()> {
    if let Some(&bad) = p_values.iter().find(|p| !(0.0..=1.0).contains(*p)) {
        return Err(AnalysisError::invalid(format!(
            "p-values must be in [0, 1], got {bad}"
        )));
    }
    Ok(())
}

/// Bonferroni-adjusted p-values, in input order.
pub fn bonferroni(p_values: &[f64]) -> Result<Vec<f64>> {
    check_p_values(p_values)?;
    let m = p_values.len() as f64;
    Ok(p_values.iter().map(|&p| (p * m).min(1.0)).collect())
}

/// Holm step-down adjusted p-values, in input order.
pub fn holm(p_values: &[f64]) -> Result<Vec<f64>> {
    check_p_values(p_values)?;
    let m = p_values.len();
    let mut order: Vec<usize> = (0..m).collect();
    order.sort_by(|&a, &b| p_values[a].total_cmp(&p_values[b]));
    let mut adjusted = vec![0.0; m];
    let mut running_max = 0.0f64;
    for (rank, &idx) in order.iter().enumerate() {
        let adj = ((m - rank) as f64 * p_values[idx]).min(1.0);
        running_max = running_max.max(adj);
        adjusted[idx] = running_max;
    }
    Ok(adjusted)
}

/// Benjamini–Hochberg (FDR) adjusted p-values, in input order.
pub fn benjamini_hochberg(p_values: &[f64]) -> Result<Vec<f64>> {
    check_p_values(p_values)?;
    let m = p_values.len();
    let mut order: Vec<usize> = (0..m).collect();
    order.sort_by(|&a, &b| p_values[a].total_cmp(&p_values[b]));
    let mut adjusted = vec![0.0; m];
    let mut running_min = 1.0f64;
    for (rank, &idx) in order.iter().enumerate().rev() {
        let adj = (p_values[idx] * m as f64 / (rank + 1) as f64).min(1.0);
        running_min = running_min.min(adj);
        adjusted[idx] = running_min;
    }
    Ok(adjusted)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn normal_cdf_reference_values() {
        assert!(close(normal_cdf(0.0), 0.5, 1e-12));
        assert!(close(normal_cdf(1.96), 0.975_002_104_851_780, 1e-9));
        assert!(close(normal_cdf(-1.0), 0.158_655_253_931_457, 1e-9));
        assert!(close(two_tailed_p(1.96), 0.049_995_790_296_44, 1e-9));
        assert!(close(one_tailed_p(1.644_853_626_951), 0.05, 1e-9));
    }

    #[test]
    fn normal_inverse_reference_values() {
        assert!(close(normal_inverse(0.5).unwrap(), 0.0, 1e-12));
        assert!(close(normal_inverse(0.975).unwrap(), 1.959_963_984_540_054, 1e-9));
        assert!(close(normal_inverse(0.01).unwrap(), -2.326_347_874_040_841, 1e-9));
        assert!(close(normal_inverse(1e-10).unwrap(), -6.361_340_902_404_056, 1e-6));
    }

    #[test]
    fn normal_inverse_round_trips_cdf() {
        let mut x = -4.0;
        while x <= 4.0 {
            let back = normal_inverse(normal_cdf(x)).unwrap();
            assert!(close(back, x, 1e-4), "x={x}, back={back}");
            x += 0.05;
        }
    }

    #[test]
    fn normal_inverse_rejects_out_of_range() {
        for p in [0.0, 1.0, -0.1, 1.5, f64::NAN] {
            assert!(matches!(
                normal_inverse(p),
                Err(AnalysisError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn chi_square_reference_values() {
        // P(χ²(1) > 3.841) ≈ 0.05
        assert!(close(chi_square_probability(3.841_458_820_694_124, 1.0).unwrap(), 0.05, 1e-6));
        assert!(close(chi_square_probability(0.0, 4.0).unwrap(), 1.0, 1e-12));
        assert!(close(chi_square_critical(0.05, 2.0).unwrap(), 5.991_464_547_107_979, 1e-3));
        assert!(chi_square_probability(1.0, 0.5).is_err());
        assert!(chi_square_probability(-1.0, 3.0).is_err());
    }

    #[test]
    fn t_reference_values() {
        assert!(close(t_two_tailed_p(2.228_138_851_986_274, 10.0).unwrap(), 0.05, 1e-6));
        assert!(close(t_distribution_probability(0.0, 5.0).unwrap(), 0.5, 1e-12));
        assert!(close(t_critical(0.95, 10.0).unwrap(), 2.228_138_851_986_274, 1e-3));
        assert!(t_two_tailed_p(1.0, 0.0).is_err());
    }

    #[test]
    fn moments() {
        let data = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!(close(mean(&data).unwrap(), 5.0, 1e-12));
        assert!(close(variance(&data).unwrap(), 4.571_428_571_428_571, 1e-10));
        assert!(close(standard_deviation(&data).unwrap(), 4.571_428_571_428_571_f64.sqrt(), 1e-10));
        assert!(skewness(&data).unwrap() > 0.0);
        assert!(close(median(&data).unwrap(), 4.5, 1e-12));
        assert_eq!(skewness(&[3.0, 3.0, 3.0]).unwrap(), 0.0);
    }

    #[test]
    fn moments_reject_short_input() {
        assert_eq!(mean(&[]), Err(AnalysisError::EmptyInput));
        assert_eq!(
            variance(&[1.0]),
            Err(AnalysisError::InsufficientData { needed: 2, got: 1 })
        );
        assert!(kurtosis(&[1.0]).is_err());
    }

    #[test]
    fn symmetric_data_kurtosis() {
        // Uniform on {-1, 1}: m4/m2² = 1 → excess −2.
        let data = [-1.0, 1.0, -1.0, 1.0];
        assert!(close(kurtosis(&data).unwrap(), -2.0, 1e-12));
        assert!(close(skewness(&data).unwrap(), 0.0, 1e-12));
    }

    #[test]
    fn effect_sizes() {
        assert!(close(cohens_d(103.0, 100.0, 7.5).unwrap(), 0.4, 1e-12));
        assert!(cohens_d(1.0, 0.0, 0.0).is_err());
        let g = hedges_g(0.5, 20, 2).unwrap();
        assert!(close(g, 0.5 * (1.0 - 3.0 / 71.0), 1e-12));
        assert!(hedges_g(0.5, 2, 2).is_err());
        assert_eq!(interpret_cohens_d(-0.6), EffectMagnitude::Medium);
        assert_eq!(interpret_cohens_d(0.1), EffectMagnitude::Negligible);
        let sp = pooled_std_dev(2.0, 10, 2.0, 30).unwrap();
        assert!(close(sp, 2.0, 1e-12));
    }

    #[test]
    fn point_biserial_matches_pearson_on_indicator() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let split = [false, false, true, false, true, true];
        let indicator: Vec<f64> = split.iter().map(|&s| if s { 1.0 } else { 0.0 }).collect();
        let r_pb = point_biserial_correlation(&values, &split).unwrap();
        let r = pearson_correlation(&values, &indicator).unwrap();
        assert!(close(r_pb, r, 1e-12));
        assert!(point_biserial_correlation(&values, &[true; 6]).is_err());
    }

    #[test]
    fn regression_recovers_line() {
        let xs: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 3.0 + 0.5 * x).collect();
        let fit = linear_regression(&xs, &ys).unwrap();
        assert!(close(fit.slope, 0.5, 1e-12));
        assert!(close(fit.intercept, 3.0, 1e-12));
        assert!(close(fit.r_squared, 1.0, 1e-12));
        assert!(linear_regression(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn corrections() {
        let p = [0.01, 0.04, 0.03, 0.005];
        let bonf = bonferroni(&p).unwrap();
        assert!(close(bonf[0], 0.04, 1e-12));
        assert!(close(bonf[1], 0.16, 1e-12));

        let h = holm(&p).unwrap();
        // sorted: 0.005*4=0.02, 0.01*3=0.03, 0.03*2=0.06, 0.04*1=0.04→0.06
        assert!(close(h[3], 0.02, 1e-12));
        assert!(close(h[0], 0.03, 1e-12));
        assert!(close(h[2], 0.06, 1e-12));
        assert!(close(h[1], 0.06, 1e-12));

        let bh = benjamini_hochberg(&p).unwrap();
        // ranks 4,3 → 0.04; ranks 2,1 → 0.02
        let expected = [0.02, 0.04, 0.04, 0.02];
        for (adj, want) in bh.iter().zip(expected) {
            assert!(close(*adj, want, 1e-12), "{adj} vs {want}");
        }
        assert!(holm(&[1.2]).is_err());
    }

    #[test]
    fn significance_follows_alpha() {
        assert_eq!(Significance::from_p(0.001, 0.05), Significance::Significant);
        assert_eq!(Significance::from_p(0.03, 0.05), Significance::Significant);
        assert_eq!(Significance::from_p(0.07, 0.05), Significance::Marginal);
        assert_eq!(Significance::from_p(0.5, 0.05), Significance::NotSignificant);
        assert_eq!(Significance::from_p(0.03, 0.01), Significance::Marginal);
        assert_eq!(Significance::from_p(0.005, 0.01), Significance::Significant);
        assert!(Significance::Significant.is_significant());
        assert!(!Significance::Marginal.is_significant());
    }
}
