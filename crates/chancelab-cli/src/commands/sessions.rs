//! `chancelab sessions`: per-session summaries pooled by meta-analysis.

use std::fmt::{self, Write as _};
use std::path::Path;

use chancelab_core::inference::{
    CombinedZ, ForestPlotData, MetaAnalysisResult, fixed_effects, forest_plot_data,
    random_effects, statistical_power, stouffer_combined_z,
};
use chancelab_core::{AnalysisParameters, SessionSummary, Trial, effect_sizes, summarize_sessions};
use serde::Serialize;

use super::{CliError, Output, fmt_p};

#[derive(Debug, Serialize)]
pub struct SessionsReport {
    pub sessions: Vec<SessionSummary>,
    pub fixed: MetaAnalysisResult,
    pub random: MetaAnalysisResult,
    /// Forest rows for the random-effects model.
    pub forest: ForestPlotData,
    /// Session z-scores combined with √n weights.
    pub stouffer: CombinedZ,
    /// Power of the pooled sample to detect the random-effects estimate.
    pub observed_power: Option<f64>,
}

pub fn build(trials: &[Trial], params: &AnalysisParameters) -> Result<SessionsReport, CliError> {
    let sessions = summarize_sessions(trials, params)?;
    if sessions.is_empty() {
        return Err(CliError::Input("no session has at least two trials".into()));
    }
    let studies = effect_sizes(&sessions);
    let fixed = fixed_effects(&studies)?;
    let random = random_effects(&studies)?;
    let forest = forest_plot_data(&random)?;

    let z: Vec<f64> = sessions.iter().map(|s| s.z_score).collect();
    let w: Vec<f64> = sessions.iter().map(|s| (s.n as f64).sqrt()).collect();
    let stouffer = stouffer_combined_z(&z, Some(w.as_slice()))?;

    let observed_power = statistical_power(
        random.pooled_effect,
        random.total_sample_size,
        params.significance_level,
    )
    .ok();

    Ok(SessionsReport {
        sessions,
        fixed,
        random,
        forest,
        stouffer,
        observed_power,
    })
}

pub fn render(r: &SessionsReport) -> Result<String, fmt::Error> {
    let mut s = String::new();
    writeln!(s, "Sessions: {}\n", r.sessions.len())?;
    writeln!(
        s,
        "  {:<20} {:>7} {:>10} {:>9} {:>10} {:>9}  intention",
        "session", "n", "mean", "z", "p", "d"
    )?;
    for x in &r.sessions {
        writeln!(
            s,
            "  {:<20} {:>7} {:>10.4} {:>+9.3} {:>10} {:>+9.4}  {}",
            x.session_id,
            x.n,
            x.mean,
            x.z_score,
            fmt_p(x.p_value),
            x.cohens_d,
            x.dominant_intention
        )?;
    }

    writeln!(s)?;
    for m in [&r.fixed, &r.random] {
        writeln!(
            s,
            "  {:<15} d {:+.4}  [{:+.4}, {:+.4}]  z {:+.3}  p {}",
            format!("{:?}", m.model),
            m.pooled_effect,
            m.confidence_interval.lower,
            m.confidence_interval.upper,
            m.z,
            fmt_p(m.p_value)
        )?;
    }
    let h = &r.random.heterogeneity;
    writeln!(
        s,
        "  heterogeneity   Q({}) {:.3}  p {}  I² {:.1}%  tau² {:.5}",
        h.df,
        h.q,
        fmt_p(h.p_value),
        h.i_squared,
        h.tau_squared
    )?;
    writeln!(
        s,
        "  Stouffer        z {:+.3}  p {}",
        r.stouffer.z,
        fmt_p(r.stouffer.p_value)
    )?;
    if let Some(p) = r.observed_power {
        writeln!(s, "  observed power  {p:.3}")?;
    }

    writeln!(s, "\n  Forest ({:?})", r.forest.model)?;
    for row in r.forest.rows.iter().chain(std::iter::once(&r.forest.pooled)) {
        writeln!(
            s,
            "  {:<20} {:+.4}  [{:+.4}, {:+.4}]  {:>5.1}%",
            row.label, row.effect, row.lower, row.upper, row.weight_percent
        )?;
    }
    Ok(s)
}

pub fn run(input: &Path, params: &AnalysisParameters, out: &Output) -> Result<(), CliError> {
    let trials = super::load_trials(input)?;
    let report = build(&trials, params)?;
    out.emit(&report, &render(&report)?)
}
