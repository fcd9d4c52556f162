//! `chancelab compare`: intention-tagged trials against neutral control trials.

use std::fmt::{self, Write as _};
use std::path::Path;

use chancelab_core::{
    AnalysisParameters, AnalysisResult, ComparisonResult, IntentionTag, Trial,
    compare_control_periods, split_by_intention,
};

use super::{CliError, Output, fmt_p};

pub fn compare(
    trials: &[Trial],
    tag: IntentionTag,
    params: &AnalysisParameters,
) -> Result<ComparisonResult, CliError> {
    let split = split_by_intention(trials);
    let intention = match tag {
        IntentionTag::Positive => &split.positive,
        IntentionTag::Negative => &split.negative,
        IntentionTag::Neutral => {
            return Err(CliError::Input(
                "--intention-tag must be positive or negative; neutral trials are the control"
                    .into(),
            ));
        }
    };
    log::debug!(
        "{} {tag} trials against {} neutral",
        intention.len(),
        split.neutral.len()
    );
    Ok(compare_control_periods(intention, &split.neutral, params)?)
}

pub fn render(r: &ComparisonResult, tag: IntentionTag) -> Result<String, fmt::Error> {
    let mut s = String::new();
    writeln!(s, "{tag} intention vs neutral control\n")?;
    writeln!(
        s,
        "  intention  n {:>7}   mean {:.4}",
        r.intention_n, r.intention_mean
    )?;
    writeln!(
        s,
        "  control    n {:>7}   mean {:.4}",
        r.control_n, r.control_mean
    )?;
    writeln!(
        s,
        "  difference {:+.4}  [{:.4}, {:.4}]",
        r.mean_difference, r.confidence_interval.lower, r.confidence_interval.upper
    )?;
    writeln!(
        s,
        "  t({}) {:+.4}   p {}   {}",
        r.degrees_of_freedom,
        r.t_statistic,
        fmt_p(r.p_value),
        r.significance
    )?;
    writeln!(
        s,
        "  d {:+.4}   g {:+.4}   ({:?})",
        r.cohens_d, r.hedges_g, r.magnitude
    )?;
    Ok(s)
}

pub fn run(
    input: &Path,
    tag: IntentionTag,
    params: &AnalysisParameters,
    out: &Output,
) -> Result<(), CliError> {
    let trials = super::load_trials(input)?;
    let result = compare(&trials, tag, params)?;
    let text = render(&result, tag)?;
    out.emit(&AnalysisResult::from(result), &text)
}
