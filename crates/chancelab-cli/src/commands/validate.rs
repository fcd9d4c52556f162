//! `chancelab validate`: randomness battery over a trial file.

use std::fmt::{self, Write as _};
use std::path::Path;

use chancelab_core::AnalysisParameters;
use chancelab_tests::{PASS_LEVEL, RandomnessTestResult, run_randomness_tests};

use super::{CliError, Output, fmt_p};

pub fn render(r: &RandomnessTestResult) -> Result<String, fmt::Error> {
    let mut s = String::new();
    writeln!(s, "Randomness battery over {} trials\n", r.n)?;
    writeln!(
        s,
        "  {:<28} {:>12} {:>10} {:>10}  grade",
        "test", "statistic", "p", "Holm p"
    )?;
    for (t, adj) in r.tests.iter().zip(&r.adjusted_p_values) {
        writeln!(
            s,
            "  {:<28} {:>12.4} {:>10} {:>10}  {} {}",
            t.name,
            t.statistic,
            fmt_p(t.p_value),
            fmt_p(*adj),
            t.grade,
            if t.passed { "PASS" } else { "FAIL" }
        )?;
    }
    for name in &r.skipped {
        writeln!(s, "  {name:<28} skipped (not enough data)")?;
    }
    writeln!(
        s,
        "\n  passed {}/{}   adjusted score {:.2}   quality {:.0}/100",
        r.passed, r.total, r.adjusted_score, r.quality_score
    )?;
    writeln!(
        s,
        "  verdict: {}",
        if r.is_random_at_level {
            "consistent with chance"
        } else {
            "NOT consistent with chance"
        }
    )?;
    for rec in &r.recommendations {
        writeln!(s, "  - {rec}")?;
    }
    Ok(s)
}

pub fn run(input: &Path, params: &AnalysisParameters, out: &Output) -> Result<(), CliError> {
    let trials = super::load_trials(input)?;
    let result = run_randomness_tests(&trials, params)?;
    if !result.is_random_at_level {
        let failed = result
            .adjusted_p_values
            .iter()
            .filter(|&&p| p < PASS_LEVEL)
            .count();
        log::warn!("{failed} of {} tests failed after Holm adjustment", result.total);
    }
    out.emit(&result, &render(&result)?)
}
