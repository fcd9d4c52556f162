//! `chancelab calibrate`: current calibration run against the stored baseline.

use std::fmt::{self, Write as _};
use std::path::Path;

use chancelab_core::{
    AnalysisParameters, AnalysisResult, CalibrationAnalysis, analyze_calibration_data,
};

use super::{CliError, Output, fmt_p};

pub fn render(c: &CalibrationAnalysis) -> Result<String, fmt::Error> {
    let mut s = String::new();
    writeln!(s, "Calibration\n")?;
    writeln!(
        s,
        "  baseline  n {:>7}   mean {:.4}   sd {:.4}",
        c.baseline_n, c.baseline_mean, c.baseline_std_dev
    )?;
    writeln!(
        s,
        "  current   n {:>7}   mean {:.4}   sd {:.4}",
        c.current_n, c.current_mean, c.current_std_dev
    )?;
    writeln!(s, "  drift     {:+.4}", c.drift)?;
    writeln!(
        s,
        "  Welch t {:+.4} (df {:.1})  p {}",
        c.welch_t,
        c.welch_df,
        fmt_p(c.p_value)
    )?;
    writeln!(
        s,
        "  pooled t {:+.4}  p {}",
        c.pooled_t,
        fmt_p(c.pooled_p_value)
    )?;
    match &c.reason {
        Some(reason) => {
            writeln!(s, "\n  RECALIBRATION NEEDED: {reason}")?;
        }
        None => {
            writeln!(s, "\n  calibration holds")?;
        }
    }
    Ok(s)
}

pub fn run(
    baseline: &Path,
    current: &Path,
    params: &AnalysisParameters,
    out: &Output,
) -> Result<(), CliError> {
    let baseline = super::load_trials(baseline)?;
    let current = super::load_trials(current)?;
    let analysis = analyze_calibration_data(&baseline, &current, params)?;
    if analysis.recalibration_needed {
        log::warn!("recalibration needed (drift {:+.4})", analysis.drift);
    }
    let text = render(&analysis)?;
    out.emit(&AnalysisResult::from(analysis), &text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chancelab_core::trials_from_values;

    #[test]
    fn shifted_run_is_flagged_in_text() {
        let params = AnalysisParameters::default();
        let base: Vec<u32> = (0..300).map(|i| 96 + (i * 13 % 9)).collect();
        let cur: Vec<u32> = base.iter().map(|v| v + 3).collect();
        let c = analyze_calibration_data(
            &trials_from_values(&base),
            &trials_from_values(&cur),
            &params,
        )
        .unwrap();
        assert!(c.recalibration_needed);
        assert!(render(&c).unwrap().contains("RECALIBRATION NEEDED"));
    }
}
