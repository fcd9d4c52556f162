//! Per-session summaries for cross-session inference.
//!
//! Groups trials by `session_id` and reduces each session to a deviation
//! summary and a standardized effect that feeds the meta-analysis.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::Result;
use crate::inference::EffectSizeData;
use crate::numerics::{self, two_tailed_p};
use crate::params::AnalysisParameters;
use crate::trial::{IntentionTag, Trial, trial_values};

/// Trials required before a session is summarized.
pub const MIN_SESSION_TRIALS: usize = 2;

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub n: usize,
    pub mean: f64,
    pub std_dev: f64,
    /// (mean − μ) / (σ / √n) against the expected std dev.
    pub z_score: f64,
    pub p_value: f64,
    /// (mean − μ) / σ.
    pub cohens_d: f64,
    /// Large-sample sampling variance of d: 1/n + d²/(2n).
    pub d_variance: f64,
    pub dominant_intention: IntentionTag,
    pub first_timestamp_ms: u64,
    pub last_timestamp_ms: u64,
}

impl SessionSummary {
    pub fn effect_size_data(&self) -> EffectSizeData {
        EffectSizeData::new(
            self.session_id.clone(),
            self.cohens_d,
            self.d_variance.sqrt(),
            self.n,
        )
    }
}

/// Summarize every session with at least two trials, in first-seen order.
pub fn summarize_sessions(
    trials: &[Trial],
    params: &AnalysisParameters,
) -> Result<Vec<SessionSummary>> {
    params.validate()?;

    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<Trial>> = HashMap::new();
    for trial in trials {
        let key = trial.session_id.as_str();
        groups
            .entry(key)
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(trial.clone());
    }

    let mut summaries = Vec::with_capacity(order.len());
    for id in order {
        let Some(group) = groups.get(id) else {
            continue;
        };
        if group.len() < MIN_SESSION_TRIALS {
            log::debug!(
                "session '{id}' skipped: {} trial(s) below {MIN_SESSION_TRIALS}",
                group.len()
            );
            continue;
        }
        summaries.push(summarize(id, group, params)?);
    }
    Ok(summaries)
}

/// Effect-size inputs for every summarized session.
pub fn effect_sizes(summaries: &[SessionSummary]) -> Vec<EffectSizeData> {
    summaries.iter().map(SessionSummary::effect_size_data).collect()
}

fn summarize(id: &str, group: &[Trial], params: &AnalysisParameters) -> Result<SessionSummary> {
    let values = trial_values(group);
    let n = values.len();
    let nf = n as f64;
    let mean = numerics::mean(&values)?;
    let d = numerics::cohens_d(mean, params.expected_mean, params.expected_std_dev)?;
    let z_score = d * nf.sqrt();

    Ok(SessionSummary {
        session_id: id.to_string(),
        n,
        mean,
        std_dev: numerics::standard_deviation(&values)?,
        z_score,
        p_value: two_tailed_p(z_score),
        cohens_d: d,
        d_variance: 1.0 / nf + d * d / (2.0 * nf),
        dominant_intention: dominant_intention(group),
        first_timestamp_ms: group.iter().map(|t| t.timestamp_ms).min().unwrap_or(0),
        last_timestamp_ms: group.iter().map(|t| t.timestamp_ms).max().unwrap_or(0),
    })
}

/// Most frequent tag; ties resolve positive, negative, then neutral.
fn dominant_intention(group: &[Trial]) -> IntentionTag {
    let count = |tag| group.iter().filter(|t| t.intention == tag).count();
    let mut best = IntentionTag::Positive;
    let mut best_count = count(best);
    for tag in [IntentionTag::Negative, IntentionTag::Neutral] {
        let c = count(tag);
        if c > best_count {
            best = tag;
            best_count = c;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::fixed_effects;

    fn session(id: &str, values: &[u32], tag: IntentionTag, start_ms: u64) -> Vec<Trial> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                Trial::new(start_ms + i as u64 * 1000, v)
                    .with_session(id)
                    .with_intention(tag)
                    .with_sequence(i as u64)
            })
            .collect()
    }

    #[test]
    fn groups_in_first_seen_order() {
        let mut trials = session("b", &[100, 102, 104, 98], IntentionTag::Positive, 5000);
        trials.extend(session("a", &[99, 101], IntentionTag::Neutral, 0));
        trials.extend(session("lonely", &[120], IntentionTag::Neutral, 0));
        let s = summarize_sessions(&trials, &AnalysisParameters::default()).unwrap();
        assert_eq!(s.len(), 2);
        assert_eq!(s[0].session_id, "b");
        assert_eq!(s[1].session_id, "a");
        assert_eq!(s[0].n, 4);
        assert_eq!(s[0].mean, 101.0);
        assert_eq!(s[0].dominant_intention, IntentionTag::Positive);
        assert_eq!(s[0].first_timestamp_ms, 5000);
        assert_eq!(s[0].last_timestamp_ms, 8000);
    }

    #[test]
    fn effect_size_matches_reference_distribution() {
        let params = AnalysisParameters::default();
        let values = vec![103u32; 50];
        let trials = session("s", &values, IntentionTag::Positive, 0);
        let s = &summarize_sessions(&trials, &params).unwrap()[0];
        let d = 3.0 / params.expected_std_dev;
        assert!((s.cohens_d - d).abs() < 1e-12);
        assert!((s.z_score - d * 50f64.sqrt()).abs() < 1e-9);
        let e = s.effect_size_data();
        assert_eq!(e.sample_size, 50);
        assert!((e.standard_error - (1.0 / 50.0 + d * d / 100.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn summaries_feed_meta_analysis() {
        let mut trials = session("a", &[101, 99, 103, 100, 102], IntentionTag::Positive, 0);
        trials.extend(session("b", &[98, 102, 100, 101], IntentionTag::Positive, 0));
        let s = summarize_sessions(&trials, &AnalysisParameters::default()).unwrap();
        let meta = fixed_effects(&effect_sizes(&s)).unwrap();
        assert_eq!(meta.studies.len(), 2);
        assert_eq!(meta.total_sample_size, 9);
    }

    #[test]
    fn dominant_tag_tie_prefers_positive() {
        let mut trials = session("x", &[100, 100], IntentionTag::Negative, 0);
        trials.extend(session("x", &[100, 100], IntentionTag::Positive, 0));
        assert_eq!(dominant_intention(&trials), IntentionTag::Positive);
    }
}
