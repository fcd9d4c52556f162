//! NIST SP 800-22 inspired randomness battery for fixed-range trial streams.
//!
//! Trials are sums of N fair bits, so most tests first reduce each trial to one
//! bit: above/below the sample median or above/below the expected mean, with
//! ties dropped. Each test returns a [`TestOutcome`] with a p-value, a pass/fail
//! determination at 0.05, and a letter grade (A through F).

use chancelab_core::numerics::{self, holm};
use chancelab_core::{AnalysisError, AnalysisParameters, Trial};
use rustfft::{FftPlanner, num_complex::Complex};
use serde::Serialize;
use statrs::distribution::{ChiSquared, ContinuousCDF, Normal};
use statrs::function::erf::erfc;

/// Trials below which the battery returns a neutral result.
pub const MIN_TRIALS: usize = 100;
/// Trials required by the matrix-rank and spectral tests.
pub const MIN_TRIALS_LARGE: usize = 1000;
/// Pass threshold for every individual test.
pub const PASS_LEVEL: f64 = 0.05;
/// Fraction of tests that must survive family-wise adjustment.
pub const RANDOM_SCORE_LEVEL: f64 = 0.95;

/// Bits remaining after tie removal below which a mapped test cannot run.
const MIN_MAPPED_BITS: usize = 32;
/// Pattern scans stop after this many bits.
const MAX_PATTERN_BITS: usize = 20_000;

type TestResult = Result<TestOutcome, AnalysisError>;

// ═══════════════════════════════════════════════════════════════════════════════
// Core types
// ═══════════════════════════════════════════════════════════════════════════════

/// What a test looks for; drives the recommendations of a failed battery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TestCategory {
    Frequency,
    Runs,
    Serial,
    Spectral,
    Entropy,
    Matrix,
    Cusum,
    Normality,
}

impl TestCategory {
    pub fn recommendation(self) -> &'static str {
        match self {
            Self::Frequency => "bias: mean departs from N/2, check source balance",
            Self::Runs | Self::Serial => {
                "pattern/correlation: successive trials are not independent"
            }
            Self::Spectral => "periodicity: periodic component in the trial stream",
            Self::Entropy => "predictability: short patterns are over-represented",
            Self::Matrix => "linear dependence: bit blocks are linearly related",
            Self::Cusum => "drift: cumulative sums wander beyond chance",
            Self::Normality => "distribution shape: trial values are not binomial-shaped",
        }
    }
}

/// Result of a single randomness test.
#[derive(Debug, Clone, Serialize)]
pub struct TestOutcome {
    pub name: String,
    pub category: TestCategory,
    pub statistic: f64,
    pub p_value: f64,
    pub passed: bool,
    pub grade: char,
    pub details: String,
}

impl TestOutcome {
    fn new(
        name: &str,
        category: TestCategory,
        statistic: f64,
        p_value: f64,
        details: String,
    ) -> Self {
        let p_value = if p_value.is_nan() { 0.0 } else { p_value.clamp(0.0, 1.0) };
        Self {
            name: name.to_string(),
            category,
            statistic,
            p_value,
            passed: p_value > PASS_LEVEL,
            grade: Self::grade_from_p(p_value),
            details,
        }
    }

    /// Assign a letter grade based on p-value.
    ///
    /// - A: p >= 0.1
    /// - B: p >= 0.01
    /// - C: p >= 0.001
    /// - D: p >= 0.0001
    /// - F: otherwise
    pub fn grade_from_p(p: f64) -> char {
        if p >= 0.1 {
            'A'
        } else if p >= 0.01 {
            'B'
        } else if p >= 0.001 {
            'C'
        } else if p >= 0.0001 {
            'D'
        } else {
            'F'
        }
    }
}

/// Aggregate verdict of the battery.
#[derive(Debug, Clone, Serialize)]
pub struct RandomnessTestResult {
    pub n: usize,
    pub tests: Vec<TestOutcome>,
    /// Tests not run because their minimum sample was not met.
    pub skipped: Vec<String>,
    pub passed: usize,
    pub total: usize,
    /// passed / total.
    pub score: f64,
    /// Holm-adjusted p-values, parallel to `tests`.
    pub adjusted_p_values: Vec<f64>,
    /// Fraction of tests whose adjusted p-value exceeds the pass level.
    pub adjusted_score: f64,
    pub is_random_at_level: bool,
    /// Mean of grade scores (A=100 … F=0).
    pub quality_score: f64,
    pub recommendations: Vec<String>,
}

impl RandomnessTestResult {
    fn neutral(n: usize) -> Self {
        Self {
            n,
            tests: Vec::new(),
            skipped: Vec::new(),
            passed: 0,
            total: 0,
            score: 0.5,
            adjusted_p_values: Vec::new(),
            adjusted_score: 0.5,
            is_random_at_level: false,
            quality_score: 0.0,
            recommendations: vec![format!("collect at least {MIN_TRIALS} trials")],
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════════════════════

fn as_f64(values: &[u32]) -> Vec<f64> {
    values.iter().map(|&v| v as f64).collect()
}

/// 1 above the sample median, 0 below; ties dropped.
fn median_bits(values: &[u32]) -> Result<Vec<u8>, AnalysisError> {
    let median = numerics::median(&as_f64(values))?;
    Ok(threshold_bits(values, median))
}

/// 1 above `reference`, 0 below; ties dropped.
fn threshold_bits(values: &[u32], reference: f64) -> Vec<u8> {
    values
        .iter()
        .map(|&v| v as f64)
        .filter(|&v| v != reference)
        .map(|v| u8::from(v > reference))
        .collect()
}

fn check_bits(bits: &[u8]) -> Result<(), AnalysisError> {
    if bits.len() < MIN_MAPPED_BITS {
        return Err(AnalysisError::InsufficientData {
            needed: MIN_MAPPED_BITS,
            got: bits.len(),
        });
    }
    Ok(())
}

fn require(needed: usize, got: usize) -> Result<(), AnalysisError> {
    if got < needed {
        return Err(AnalysisError::InsufficientData { needed, got });
    }
    Ok(())
}

fn chi_square_sf(x: f64, df: f64) -> Result<f64, AnalysisError> {
    let dist = ChiSquared::new(df)
        .map_err(|_| AnalysisError::InvalidArgument(format!("invalid chi-square df {df}")))?;
    Ok(dist.sf(x.max(0.0)))
}

/// Two-tailed normal p-value of |z|.
fn normal_two_tailed(z: f64) -> f64 {
    erfc(z.abs() / std::f64::consts::SQRT_2)
}

// ═══════════════════════════════════════════════════════════════════════════════
// 1. FREQUENCY
// ═══════════════════════════════════════════════════════════════════════════════

/// Monobit frequency on raw values: z of the sample mean against the expected mean.
pub fn frequency_test(values: &[u32], params: &AnalysisParameters) -> TestResult {
    let name = "Frequency";
    require(MIN_TRIALS, values.len())?;
    let n = values.len() as f64;
    let mean = numerics::mean(&as_f64(values))?;
    let z = (mean - params.expected_mean) / (params.expected_std_dev / n.sqrt());
    Ok(TestOutcome::new(
        name,
        TestCategory::Frequency,
        z,
        normal_two_tailed(z),
        format!("mean={mean:.4}, expected={:.4}", params.expected_mean),
    ))
}

// ═══════════════════════════════════════════════════════════════════════════════
// 2. RUNS
// ═══════════════════════════════════════════════════════════════════════════════

/// Wald–Wolfowitz runs test on the median mapping.
pub fn runs_test(values: &[u32], _params: &AnalysisParameters) -> TestResult {
    let name = "Runs";
    require(MIN_TRIALS, values.len())?;
    let bits = median_bits(values)?;
    check_bits(&bits)?;

    let n = bits.len() as f64;
    let n1 = bits.iter().filter(|&&b| b == 1).count() as f64;
    let n0 = n - n1;
    let runs = 1 + bits.windows(2).filter(|w| w[0] != w[1]).count();
    let expected = 2.0 * n1 * n0 / n + 1.0;
    let variance = 2.0 * n1 * n0 * (2.0 * n1 * n0 - n) / (n * n * (n - 1.0));
    if variance < 1e-10 {
        return Ok(TestOutcome::new(
            name,
            TestCategory::Runs,
            0.0,
            0.0,
            "Zero variance".to_string(),
        ));
    }
    let z = (runs as f64 - expected) / variance.sqrt();
    Ok(TestOutcome::new(
        name,
        TestCategory::Runs,
        z,
        normal_two_tailed(z),
        format!("runs={runs}, expected={expected:.1}"),
    ))
}

/// Longest run of either symbol on the median mapping.
///
/// Runs of length ≥ k start at about n·2⁻ᵏ positions, so
/// P(L ≥ k) ≈ 1 − exp(−n·2⁻ᵏ); the p-value doubles the smaller tail.
pub fn longest_run_test(values: &[u32], _params: &AnalysisParameters) -> TestResult {
    let name = "Longest Run";
    require(MIN_TRIALS, values.len())?;
    let bits = median_bits(values)?;
    check_bits(&bits)?;

    let mut longest = 1usize;
    let mut current = 1usize;
    for w in bits.windows(2) {
        if w[0] == w[1] {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 1;
        }
    }
    let n = bits.len() as f64;
    let at_least = 1.0 - (-n * 2f64.powi(-(longest as i32))).exp();
    let at_most = (-n * 2f64.powi(-(longest as i32 + 1))).exp();
    let p = (2.0 * at_least.min(at_most)).min(1.0);
    Ok(TestOutcome::new(
        name,
        TestCategory::Runs,
        longest as f64,
        p,
        format!("longest={longest}, expected≈{:.1}", n.log2() - 1.0),
    ))
}

// ═══════════════════════════════════════════════════════════════════════════════
// 3. SERIAL
// ═══════════════════════════════════════════════════════════════════════════════

/// Overlapping m-bit pattern counts with wrap-around.
fn pattern_counts(bits: &[u8], m: usize) -> Vec<u64> {
    let n = bits.len();
    let mut counts = vec![0u64; 1 << m];
    for i in 0..n {
        let mut val = 0usize;
        for j in 0..m {
            val = (val << 1) | bits[(i + j) % n] as usize;
        }
        counts[val] += 1;
    }
    counts
}

/// Helper: compute psi-squared for the serial test.
fn psi_sq(bits: &[u8], m: usize) -> f64 {
    if m == 0 {
        return 0.0;
    }
    let n = bits.len() as f64;
    let sum_sq: f64 = pattern_counts(bits, m)
        .iter()
        .map(|&c| (c as f64) * (c as f64))
        .sum();
    sum_sq * (1u64 << m) as f64 / n - n
}

fn pattern_bits(values: &[u32]) -> Result<Vec<u8>, AnalysisError> {
    let mut bits = median_bits(values)?;
    check_bits(&bits)?;
    bits.truncate(MAX_PATTERN_BITS);
    Ok(bits)
}

/// Serial test: ∇ψ²ₘ over overlapping m-bit patterns, m = min(4, ⌊log₂ n⌋ − 2).
pub fn serial_test(values: &[u32], _params: &AnalysisParameters) -> TestResult {
    let name = "Serial";
    require(MIN_TRIALS, values.len())?;
    let bits = pattern_bits(values)?;
    let n = bits.len();
    let m = 4.min(n.ilog2() as usize - 2);

    let delta = psi_sq(&bits, m) - psi_sq(&bits, m - 1);
    let df = (1u64 << (m - 1)) as f64;
    let p = chi_square_sf(delta, df)?;
    Ok(TestOutcome::new(
        name,
        TestCategory::Serial,
        delta,
        p,
        format!("m={m}, n_bits={n}"),
    ))
}

/// Approximate entropy with m = 2 (natural log): χ² = 2n(ln 2 − ApEn), df 2ᵐ.
pub fn approximate_entropy_test(values: &[u32], _params: &AnalysisParameters) -> TestResult {
    let name = "Approximate Entropy";
    let m = 2usize;
    require(MIN_TRIALS, values.len())?;
    let bits = pattern_bits(values)?;
    let n = bits.len() as f64;

    let phi = |block_len: usize| -> f64 {
        pattern_counts(&bits, block_len)
            .iter()
            .filter(|&&c| c > 0)
            .map(|&c| {
                let p = c as f64 / n;
                p * p.ln()
            })
            .sum()
    };
    let apen = phi(m) - phi(m + 1);
    let chi2 = 2.0 * n * (std::f64::consts::LN_2 - apen);
    let p = chi_square_sf(chi2, (1u64 << m) as f64)?;
    Ok(TestOutcome::new(
        name,
        TestCategory::Entropy,
        chi2,
        p,
        format!("ApEn={apen:.6}, m={m}"),
    ))
}

// ═══════════════════════════════════════════════════════════════════════════════
// 4. SPECTRAL
// ═══════════════════════════════════════════════════════════════════════════════

/// DFT spectral test on the ±1 mean mapping: peaks below T = √(ln(20)·n).
pub fn dft_spectral_test(values: &[u32], params: &AnalysisParameters) -> TestResult {
    let name = "DFT Spectral";
    require(MIN_TRIALS_LARGE, values.len())?;
    let bits = threshold_bits(values, params.expected_mean);
    check_bits(&bits)?;
    let n = bits.len();

    let mut buffer: Vec<Complex<f64>> = bits
        .iter()
        .map(|&b| Complex {
            re: if b == 1 { 1.0 } else { -1.0 },
            im: 0.0,
        })
        .collect();
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n);
    fft.process(&mut buffer);

    let half = n / 2;
    let threshold = (20f64.ln() * n as f64).sqrt();
    let n0 = 0.95 * half as f64;
    let n1 = buffer[..half]
        .iter()
        .filter(|c| c.norm() < threshold)
        .count() as f64;
    let d = (n1 - n0) / (n as f64 * 0.95 * 0.05 / 4.0).sqrt();
    Ok(TestOutcome::new(
        name,
        TestCategory::Spectral,
        d,
        normal_two_tailed(d),
        format!("peaks_below_threshold={}/{half}", n1 as u64),
    ))
}

// ═══════════════════════════════════════════════════════════════════════════════
// 5. MATRIX RANK
// ═══════════════════════════════════════════════════════════════════════════════

/// GF(2) Gaussian elimination to compute binary matrix rank.
fn gf2_rank(matrix: &[u8], size: usize) -> usize {
    let mut m: Vec<Vec<u8>> = matrix.chunks(size).map(<[u8]>::to_vec).collect();
    let mut rank = 0;
    for col in 0..size {
        let Some(pivot) = (rank..size).find(|&row| m[row][col] == 1) else {
            continue;
        };
        m.swap(rank, pivot);
        for row in 0..size {
            if row != rank && m[row][col] == 1 {
                let rank_row = m[rank].clone();
                for (m_c, r_c) in m[row].iter_mut().zip(rank_row.iter()) {
                    *m_c ^= r_c;
                }
            }
        }
        rank += 1;
    }
    rank
}

/// Probability that a random size×size GF(2) matrix has rank `r`.
fn rank_probability(r: usize, size: usize) -> f64 {
    let s = size as i32;
    let r_i = r as i32;
    let mut product = 1.0;
    for i in 0..r_i {
        let a = 1.0 - 2f64.powi(i - s);
        product *= a * a / (1.0 - 2f64.powi(i - r_i));
    }
    2f64.powi(r_i * (2 * s - r_i) - s * s) * product
}

/// Binary matrix rank on the mean mapping: 32×32 when 38 matrices fit, else 8×8.
pub fn matrix_rank_test(values: &[u32], params: &AnalysisParameters) -> TestResult {
    let name = "Binary Matrix Rank";
    require(MIN_TRIALS_LARGE, values.len())?;
    let bits = threshold_bits(values, params.expected_mean);
    let size = if bits.len() / (32 * 32) >= 38 { 32 } else { 8 };
    let per_matrix = size * size;
    let num_matrices = bits.len() / per_matrix;
    if num_matrices == 0 {
        return Err(AnalysisError::InsufficientData {
            needed: per_matrix,
            got: bits.len(),
        });
    }

    let mut counts = [0u64; 3];
    for matrix in bits.chunks_exact(per_matrix) {
        let rank = gf2_rank(matrix, size);
        let slot = if rank == size {
            0
        } else if rank + 1 == size {
            1
        } else {
            2
        };
        counts[slot] += 1;
    }
    let p_full = rank_probability(size, size);
    let p_m1 = rank_probability(size - 1, size);
    let probs = [p_full, p_m1, 1.0 - p_full - p_m1];
    let nf = num_matrices as f64;
    let chi2: f64 = counts
        .iter()
        .zip(probs)
        .map(|(&c, p)| (c as f64 - nf * p).powi(2) / (nf * p))
        .sum();
    let p = chi_square_sf(chi2, 2.0)?;
    Ok(TestOutcome::new(
        name,
        TestCategory::Matrix,
        chi2,
        p,
        format!(
            "N={num_matrices}, {size}x{size}, full={}, full-1={}",
            counts[0], counts[1]
        ),
    ))
}

// ═══════════════════════════════════════════════════════════════════════════════
// 6. CUMULATIVE SUMS
// ═══════════════════════════════════════════════════════════════════════════════

/// NIST cusum p-value for maximum excursion `z` of an n-step ±1 walk.
fn cusum_p(z: f64, n: usize) -> f64 {
    if z < 1e-10 {
        return 1.0;
    }
    let nf = n as f64;
    let sqrt_n = nf.sqrt();
    let norm = Normal::standard();
    let upper = ((nf / z - 1.0) / 4.0).floor() as i64;

    let mut first = 0.0;
    for k in ((-nf / z + 1.0) / 4.0).floor() as i64..=upper {
        let kf = k as f64;
        first += norm.cdf((4.0 * kf + 1.0) * z / sqrt_n) - norm.cdf((4.0 * kf - 1.0) * z / sqrt_n);
    }
    let mut second = 0.0;
    for k in ((-nf / z - 3.0) / 4.0).floor() as i64..=upper {
        let kf = k as f64;
        second += norm.cdf((4.0 * kf + 3.0) * z / sqrt_n) - norm.cdf((4.0 * kf + 1.0) * z / sqrt_n);
    }
    (1.0 - first + second).clamp(0.0, 1.0)
}

fn cusum(values: &[u32], params: &AnalysisParameters, reverse: bool) -> TestResult {
    let name = if reverse {
        "Cumulative Sums (backward)"
    } else {
        "Cumulative Sums (forward)"
    };
    require(MIN_TRIALS, values.len())?;
    let mut bits = threshold_bits(values, params.expected_mean);
    check_bits(&bits)?;
    if reverse {
        bits.reverse();
    }
    let mut s: i64 = 0;
    let mut z: u64 = 0;
    for &bit in &bits {
        s += if bit == 1 { 1 } else { -1 };
        z = z.max(s.unsigned_abs());
    }
    let n = bits.len();
    Ok(TestOutcome::new(
        name,
        TestCategory::Cusum,
        z as f64,
        cusum_p(z as f64, n),
        format!("max|S|={z}, n={n}"),
    ))
}

pub fn cusum_forward_test(values: &[u32], params: &AnalysisParameters) -> TestResult {
    cusum(values, params, false)
}

pub fn cusum_backward_test(values: &[u32], params: &AnalysisParameters) -> TestResult {
    cusum(values, params, true)
}

// ═══════════════════════════════════════════════════════════════════════════════
// 7. NORMALITY
// ═══════════════════════════════════════════════════════════════════════════════

/// Jarque–Bera on raw values: JB = n/6·(S² + K²/4), χ² with 2 df.
pub fn jarque_bera_test(values: &[u32], _params: &AnalysisParameters) -> TestResult {
    let name = "Jarque-Bera";
    require(MIN_TRIALS, values.len())?;
    let data = as_f64(values);
    if numerics::variance(&data)? < 1e-12 {
        return Ok(TestOutcome::new(
            name,
            TestCategory::Normality,
            f64::INFINITY,
            0.0,
            "Zero variance".to_string(),
        ));
    }
    let s = numerics::skewness(&data)?;
    let k = numerics::kurtosis(&data)?;
    let jb = data.len() as f64 / 6.0 * (s * s + k * k / 4.0);
    Ok(TestOutcome::new(
        name,
        TestCategory::Normality,
        jb,
        chi_square_sf(jb, 2.0)?,
        format!("skewness={s:.4}, excess_kurtosis={k:.4}"),
    ))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Test battery
// ═══════════════════════════════════════════════════════════════════════════════

type TestFn = fn(&[u32], &AnalysisParameters) -> TestResult;

/// Battery order; recommendations follow it.
const BATTERY: [(&str, TestFn); 10] = [
    ("Frequency", frequency_test),
    ("Runs", runs_test),
    ("Longest Run", longest_run_test),
    ("Binary Matrix Rank", matrix_rank_test),
    ("DFT Spectral", dft_spectral_test),
    ("Serial", serial_test),
    ("Approximate Entropy", approximate_entropy_test),
    ("Cumulative Sums (forward)", cusum_forward_test),
    ("Cumulative Sums (backward)", cusum_backward_test),
    ("Jarque-Bera", jarque_bera_test),
];

/// Run the battery over a trial sequence.
pub fn run_randomness_tests(
    trials: &[Trial],
    params: &AnalysisParameters,
) -> Result<RandomnessTestResult, AnalysisError> {
    let values: Vec<u32> = trials.iter().map(|t| t.value).collect();
    run_on_values(&values, params)
}

/// Run the battery over bare trial values.
pub fn run_on_values(
    values: &[u32],
    params: &AnalysisParameters,
) -> Result<RandomnessTestResult, AnalysisError> {
    params.validate()?;
    let n = values.len();
    if n < MIN_TRIALS {
        log::debug!("randomness battery: {n} trials below {MIN_TRIALS}, neutral result");
        return Ok(RandomnessTestResult::neutral(n));
    }

    let mut tests = Vec::with_capacity(BATTERY.len());
    let mut skipped = Vec::new();
    for (name, test_fn) in BATTERY {
        match test_fn(values, params) {
            Ok(outcome) => tests.push(outcome),
            Err(e) if e.is_insufficient_data() => {
                log::debug!("randomness battery: skipping {name}: {e}");
                skipped.push(name.to_string());
            }
            Err(e) => return Err(e),
        }
    }

    let total = tests.len();
    let passed = tests.iter().filter(|t| t.passed).count();
    let p_values: Vec<f64> = tests.iter().map(|t| t.p_value).collect();
    let adjusted_p_values = holm(&p_values)?;
    let adjusted_passed = adjusted_p_values.iter().filter(|&&p| p > PASS_LEVEL).count();
    let (score, adjusted_score) = if total == 0 {
        (0.0, 0.0)
    } else {
        (
            passed as f64 / total as f64,
            adjusted_passed as f64 / total as f64,
        )
    };

    let mut recommendations: Vec<String> = Vec::new();
    for t in tests.iter().filter(|t| !t.passed) {
        let rec = t.category.recommendation();
        if !recommendations.iter().any(|r| r == rec) {
            recommendations.push(rec.to_string());
        }
    }

    Ok(RandomnessTestResult {
        n,
        quality_score: calculate_quality_score(&tests),
        passed,
        total,
        score,
        adjusted_score,
        is_random_at_level: total > 0 && adjusted_score >= RANDOM_SCORE_LEVEL,
        adjusted_p_values,
        tests,
        skipped,
        recommendations,
    })
}

/// Calculate overall quality score (0-100) from test outcomes.
///
/// Each grade maps to a score: A=100, B=75, C=50, D=25, F=0.
/// Returns the average across all tests.
pub fn calculate_quality_score(results: &[TestOutcome]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    let total: f64 = results
        .iter()
        .map(|r| match r.grade {
            'A' => 100.0,
            'B' => 75.0,
            'C' => 50.0,
            'D' => 25.0,
            _ => 0.0,
        })
        .sum();
    total / results.len() as f64
}
