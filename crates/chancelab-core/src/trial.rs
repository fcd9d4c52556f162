//! Trial records supplied by the trial source.

use serde::{Deserialize, Serialize};

/// Intention declared for the period a trial was recorded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentionTag {
    Positive,
    Negative,
    /// Control/baseline periods and untagged trials.
    #[default]
    #[serde(alias = "none", alias = "control")]
    Neutral,
}

impl std::fmt::Display for IntentionTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Positive => write!(f, "positive"),
            Self::Negative => write!(f, "negative"),
            Self::Neutral => write!(f, "neutral"),
        }
    }
}

impl std::str::FromStr for IntentionTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "positive" | "high" => Ok(Self::Positive),
            "negative" | "low" => Ok(Self::Negative),
            "neutral" | "none" | "control" | "baseline" => Ok(Self::Neutral),
            other => Err(format!("unknown intention tag '{other}'")),
        }
    }
}

/// One sampled outcome: the sum of N binary draws.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    /// Unix epoch milliseconds.
    pub timestamp_ms: u64,
    pub value: u32,
    #[serde(default)]
    pub session_id: String,
    #[serde(default, alias = "intention_tag")]
    pub intention: IntentionTag,
    #[serde(default)]
    pub sequence_number: u64,
}

impl Trial {
    pub fn new(timestamp_ms: u64, value: u32) -> Self {
        Self {
            timestamp_ms,
            value,
            session_id: String::new(),
            intention: IntentionTag::Neutral,
            sequence_number: 0,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn with_intention(mut self, intention: IntentionTag) -> Self {
        self.intention = intention;
        self
    }

    pub fn with_sequence(mut self, sequence_number: u64) -> Self {
        self.sequence_number = sequence_number;
        self
    }
}

/// Milliseconds per day, the unit drift rates are reported in.
pub const MS_PER_DAY: f64 = 86_400_000.0;

/// Trial values as `f64`, preserving order.
pub fn trial_values(trials: &[Trial]) -> Vec<f64> {
    trials.iter().map(|t| t.value as f64).collect()
}

/// Build trials from bare values, one second apart, numbered from zero.
pub fn trials_from_values(values: &[u32]) -> Vec<Trial> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| Trial::new(i as u64 * 1000, v).with_sequence(i as u64))
        .collect()
}
