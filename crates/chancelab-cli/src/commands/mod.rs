pub mod analyze;
pub mod calibrate;
pub mod compare;
pub mod drift;
pub mod sessions;
pub mod validate;

use std::path::{Path, PathBuf};

use chancelab_core::{AnalysisError, AnalysisParameters, Trial};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error("formatting output failed")]
    Format(#[from] std::fmt::Error),
    #[error("{0}")]
    Input(String),
}

/// Trial files are either a bare array or an object with a `trials` field.
#[derive(Deserialize)]
#[serde(untagged)]
enum TrialFile {
    Bare(Vec<Trial>),
    Wrapped { trials: Vec<Trial> },
}

fn read(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn parse_trials(text: &str) -> Result<Vec<Trial>, CliError> {
    let trials = match serde_json::from_str(text)? {
        TrialFile::Bare(t) | TrialFile::Wrapped { trials: t } => t,
    };
    if trials.is_empty() {
        return Err(CliError::Input("trial file contains no trials".into()));
    }
    Ok(trials)
}

pub fn load_trials(path: &Path) -> Result<Vec<Trial>, CliError> {
    let trials = parse_trials(&read(path)?)?;
    log::debug!("loaded {} trials from {}", trials.len(), path.display());
    Ok(trials)
}

/// Defaults when no file is given; the result is always validated.
pub fn load_params(path: Option<&Path>) -> Result<AnalysisParameters, CliError> {
    let params = match path {
        Some(p) => serde_json::from_str::<AnalysisParameters>(&read(p)?)?,
        None => AnalysisParameters::default(),
    };
    params.validate()?;
    log::debug!(
        "parameters: N = {}, mean = {}, sd = {:.4}",
        params.trial_bits,
        params.expected_mean,
        params.expected_std_dev
    );
    Ok(params)
}

/// Where a command's result goes.
pub struct Output {
    pub json: bool,
    pub path: Option<PathBuf>,
}

impl Output {
    /// Print the text summary (or pretty JSON with `--json`) and write JSON
    /// to `--output` when given.
    pub fn emit<T: Serialize>(&self, value: &T, text: &str) -> Result<(), CliError> {
        let pretty = serde_json::to_string_pretty(value)?;
        if self.json {
            println!("{pretty}");
        } else {
            print!("{text}");
        }
        if let Some(path) = &self.path {
            std::fs::write(path, &pretty).map_err(|source| CliError::Io {
                path: path.clone(),
                source,
            })?;
            if !self.json {
                println!("\nJSON written to {}", path.display());
            }
        }
        Ok(())
    }
}

pub(crate) fn fmt_p(p: f64) -> String {
    if p < 1e-4 {
        format!("{p:.2e}")
    } else {
        format!("{p:.4}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chancelab_core::IntentionTag;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_bare_array() {
        let file = write_temp(
            r#"[{"timestamp_ms": 1000, "value": 101},
                {"timestamp_ms": 2000, "value": 97, "session_id": "s1", "intention": "positive"}]"#,
        );
        let trials = load_trials(file.path()).unwrap();
        assert_eq!(trials.len(), 2);
        assert_eq!(trials[0].intention, IntentionTag::Neutral);
        assert_eq!(trials[1].session_id, "s1");
        assert_eq!(trials[1].intention, IntentionTag::Positive);
    }

    #[test]
    fn loads_wrapped_object() {
        let file = write_temp(r#"{"trials": [{"timestamp_ms": 5, "value": 100, "intention_tag": "none"}]}"#);
        let trials = load_trials(file.path()).unwrap();
        assert_eq!(trials.len(), 1);
        assert_eq!(trials[0].intention, IntentionTag::Neutral);
    }

    #[test]
    fn empty_file_is_rejected() {
        let file = write_temp("[]");
        assert!(matches!(load_trials(file.path()), Err(CliError::Input(_))));
    }

    #[test]
    fn malformed_json_is_a_json_error() {
        let file = write_temp("[{\"value\": }]");
        assert!(matches!(load_trials(file.path()), Err(CliError::Json(_))));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_trials(Path::new("/nonexistent/trials.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/trials.json"));
    }

    #[test]
    fn params_fill_binomial_defaults() {
        let file = write_temp(r#"{"trial_bits": 100}"#);
        let params = load_params(Some(file.path())).unwrap();
        assert_eq!(params.expected_mean, 50.0);
        assert!((params.expected_std_dev - 5.0).abs() < 1e-12);
        assert_eq!(load_params(None).unwrap(), AnalysisParameters::default());
    }

    #[test]
    fn invalid_params_are_rejected() {
        let file = write_temp(r#"{"confidence_level": 1.5}"#);
        assert!(matches!(
            load_params(Some(file.path())),
            Err(CliError::Analysis(AnalysisError::InvalidArgument(_)))
        ));
    }

    #[test]
    fn emit_writes_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let out = Output {
            json: false,
            path: Some(path.clone()),
        };
        out.emit(&serde_json::json!({"ok": true}), "").unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(written["ok"], true);
    }

    #[test]
    fn formatting_errors_propagate() {
        let err: CliError = std::fmt::Error.into();
        assert!(matches!(err, CliError::Format(_)));
        assert_eq!(err.to_string(), "formatting output failed");
    }

    #[test]
    fn small_p_values_use_scientific_notation() {
        assert_eq!(fmt_p(0.0312), "0.0312");
        assert_eq!(fmt_p(0.000012), "1.20e-5");
    }
}
