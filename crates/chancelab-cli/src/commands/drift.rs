//! `chancelab drift`: windowed trend of the trial mean over time.

use std::fmt::{self, Write as _};
use std::path::Path;

use chancelab_core::{
    AnalysisParameters, AnalysisResult, DriftAnalysis, DriftStatus, DriftTrigger,
    detect_baseline_drift,
};

use super::{CliError, Output, fmt_p};

fn trigger_text(t: DriftTrigger) -> &'static str {
    match t {
        DriftTrigger::SignificantTrend => "significant linear trend",
        DriftTrigger::ProjectedDrift => "projected 30-day drift too large",
        DriftTrigger::DailyRate => "daily drift rate too large",
    }
}

pub fn render(d: &DriftAnalysis) -> Result<String, fmt::Error> {
    let mut s = String::new();
    writeln!(
        s,
        "Baseline drift  ({}-day windows over {:.1} days)\n",
        d.period_days, d.span_days
    )?;
    writeln!(s, "  {:>6} {:>10} {:>8} {:>10}", "window", "mid (d)", "n", "mean")?;
    for w in &d.windows {
        writeln!(
            s,
            "  {:>6} {:>10.2} {:>8} {:>10.4}{}",
            w.index,
            w.midpoint_days,
            w.n,
            w.mean,
            if w.valid { "" } else { "  (too few trials)" }
        )?;
    }
    writeln!(s)?;
    match d.status {
        DriftStatus::InsufficientHistory => {
            writeln!(
                s,
                "  {} valid window(s): not enough history to fit a trend",
                d.valid_windows
            )?;
        }
        DriftStatus::Stable | DriftStatus::MaintenanceRequired => {
            writeln!(
                s,
                "  slope {:+.5}/day   30-day {:+.4}   R² {:.3}   t {:+.3}   p {}",
                d.daily_drift_rate,
                d.projected_drift_30d,
                d.r_squared,
                d.slope_t,
                fmt_p(d.p_value)
            )?;
            match d.trigger {
                Some(t) => {
                    writeln!(s, "  MAINTENANCE REQUIRED: {}", trigger_text(t))?;
                }
                None => {
                    writeln!(s, "  stable")?;
                }
            }
        }
    }
    Ok(s)
}

pub fn run(
    input: &Path,
    period_days: f64,
    params: &AnalysisParameters,
    out: &Output,
) -> Result<(), CliError> {
    let trials = super::load_trials(input)?;
    let analysis = detect_baseline_drift(&trials, period_days, params)?;
    if let Some(t) = analysis.trigger {
        log::warn!("maintenance required: {}", trigger_text(t));
    }
    let text = render(&analysis)?;
    out.emit(&AnalysisResult::from(analysis), &text)
}
