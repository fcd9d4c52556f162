//! `chancelab analyze`: deviation and variance metrics over one trial file.

use std::fmt::{self, Write as _};
use std::path::Path;

use chancelab_core::{
    AnalysisParameters, AnalysisResult, CumulativeResult, DeviceVarianceResult, EffectSizeResult,
    NetworkVarianceResult, Trial, ZScoreResult, calculate_cumulative_deviation,
    calculate_device_variance, calculate_effect_size, calculate_network_variance,
    calculate_z_score,
};

use super::{CliError, Output, fmt_p};

/// Results of every analysis that had enough data.
#[derive(Default)]
pub struct AnalyzeReport {
    pub n: usize,
    pub z: Option<ZScoreResult>,
    pub effect: Option<EffectSizeResult>,
    pub cumulative: Option<CumulativeResult>,
    pub network: Option<NetworkVarianceResult>,
    pub device: Option<DeviceVarianceResult>,
}

impl AnalyzeReport {
    fn into_results(self) -> Vec<AnalysisResult> {
        let mut out = Vec::new();
        out.extend(self.z.map(AnalysisResult::from));
        out.extend(self.effect.map(AnalysisResult::from));
        out.extend(self.cumulative.map(AnalysisResult::from));
        out.extend(self.network.map(AnalysisResult::from));
        out.extend(self.device.map(AnalysisResult::from));
        out
    }
}

/// Keep the value, or skip the analysis when there is not enough data yet.
fn optional<T>(name: &str, r: chancelab_core::Result<T>) -> Result<Option<T>, CliError> {
    match r {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.is_insufficient_data() => {
            log::warn!("{name} skipped: {e}");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

pub fn analyze(trials: &[Trial], params: &AnalysisParameters) -> Result<AnalyzeReport, CliError> {
    Ok(AnalyzeReport {
        n: trials.len(),
        z: optional("z-score", calculate_z_score(trials, params))?,
        effect: optional("effect size", calculate_effect_size(trials, params))?,
        cumulative: optional(
            "cumulative deviation",
            calculate_cumulative_deviation(trials, params),
        )?,
        network: optional("network variance", calculate_network_variance(trials, params))?,
        device: optional("device variance", calculate_device_variance(trials, params))?,
    })
}

pub fn render(
    report: &AnalyzeReport,
    params: &AnalysisParameters,
) -> Result<String, fmt::Error> {
    let mut s = String::new();
    writeln!(
        s,
        "Trials: {}  (N = {}, expected mean {:.2}, sd {:.4})\n",
        report.n, params.trial_bits, params.expected_mean, params.expected_std_dev
    )?;

    if let Some(z) = &report.z {
        writeln!(s, "Z-score")?;
        writeln!(s, "  mean        {:.4} ± {:.4}", z.mean, z.standard_error)?;
        writeln!(
            s,
            "  z           {:+.4}   p(two) {}   p(one) {}",
            z.z_score,
            fmt_p(z.p_value_two_tailed),
            fmt_p(z.p_value_one_tailed)
        )?;
        writeln!(
            s,
            "  {:.0}% CI     [{:.4}, {:.4}]   {}\n",
            z.confidence_interval.level * 100.0,
            z.confidence_interval.lower,
            z.confidence_interval.upper,
            z.significance
        )?;
    }

    if let Some(e) = &report.effect {
        writeln!(s, "Effect size")?;
        writeln!(
            s,
            "  d {:+.4}   g {:+.4}   ({:?})\n",
            e.cohens_d, e.hedges_g, e.magnitude
        )?;
    }

    if let Some(c) = &report.cumulative {
        writeln!(s, "Cumulative deviation")?;
        writeln!(
            s,
            "  final {:+.2}   z {:+.4}   p {}",
            c.final_cumulative_deviation,
            c.final_z,
            fmt_p(c.final_p_value)
        )?;
        writeln!(
            s,
            "  max |z| {:.4} at trial {}",
            c.max_abs_z, c.max_abs_z_index
        )?;
        writeln!(s, "  excursions: {}", c.excursions.len())?;
        for e in &c.excursions {
            writeln!(
                s,
                "    [{}..={}] len {:>6}  {}  peak z {:+.3}  p {}",
                e.start_index,
                e.end_index,
                e.length,
                if e.direction > 0 { "+" } else { "-" },
                e.peak_z,
                fmt_p(e.p_value)
            )?;
        }
        writeln!(s)?;
    }

    if let Some(v) = &report.network {
        writeln!(s, "Network variance")?;
        writeln!(
            s,
            "  chi²({}) {:.2}   p {}   normalized {:.4}   lag-1 r {:+.4}",
            v.degrees_of_freedom,
            v.chi_square,
            fmt_p(v.p_value),
            v.normalized_variance,
            v.temporal_correlation
        )?;
        writeln!(
            s,
            "  Stouffer z {:+.4}   p {}\n",
            v.stouffer_z,
            fmt_p(v.stouffer_p_value)
        )?;
    }

    if let Some(d) = &report.device {
        writeln!(s, "Device variance")?;
        writeln!(
            s,
            "  variance {:.4}   skew {:+.4}   kurtosis {:+.4}",
            d.variance, d.skewness, d.kurtosis
        )?;
        writeln!(
            s,
            "  drift slope {:+.3e}   p {}   lag-1 r {:+.4}",
            d.drift_slope,
            fmt_p(d.drift_p_value),
            d.autocorrelation
        )?;
        writeln!(
            s,
            "  KS {:.4} (p {})   AD {:.4} (p {})",
            d.ks_statistic,
            fmt_p(d.ks_p_value),
            d.anderson_darling,
            fmt_p(d.anderson_darling_p_value)
        )?;
    }
    Ok(s)
}

pub fn run(
    input: &Path,
    params: &AnalysisParameters,
    keep_points: bool,
    out: &Output,
) -> Result<(), CliError> {
    let trials = super::load_trials(input)?;
    let mut report = analyze(&trials, params)?;
    let text = render(&report, params)?;
    if !keep_points && let Some(c) = report.cumulative.as_mut() {
        c.points.clear();
    }
    out.emit(&report.into_results(), &text)
}
