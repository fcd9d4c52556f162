//! # chancelab-core
//!
//! **Is this stream of random trials behaving like chance?**
//!
//! `chancelab-core` is the statistical engine behind long-running chance-deviation
//! experiments. Each trial is the sum of N fair binary draws (binomial with mean
//! N/2 and variance N/4); the library turns ordered trial sequences into deviation
//! metrics, detects hardware drift against a calibration baseline, and combines
//! evidence across sessions.
//!
//! ## Quick Start
//!
//! ```
//! use chancelab_core::{AnalysisParameters, calculate_z_score, trials_from_values};
//!
//! let params = AnalysisParameters::default(); // N = 200: mean 100, sd √50
//! let trials = trials_from_values(&[101, 98, 104, 100, 97, 103]);
//! let z = calculate_z_score(&trials, &params).unwrap();
//! println!("z = {:.3} ({})", z.z_score, z.significance);
//! ```
//!
//! ## Architecture
//!
//! Trials → numerics → deviation / baseline → inference
//!
//! - [`numerics`]: distributions, moments, effect sizes, multiple-comparison corrections.
//! - [`deviation`]: cumulative deviation with excursions, network and device variance,
//!   Z-scores and effect sizes.
//! - [`baseline`]: calibration comparison, windowed drift detection, intention vs control.
//! - [`inference`]: Bayes factors, conjugate posteriors, SPRT, meta-analysis, power.
//! - [`running`]: O(1) accumulator for live monitoring.
//! - [`session`]: per-session summaries feeding the meta-analysis.
//!
//! Every analysis is a pure function of its inputs. The randomness battery lives
//! in the `chancelab-tests` crate.

pub mod baseline;
pub mod deviation;
pub mod error;
pub mod inference;
pub mod numerics;
pub mod params;
pub mod result;
pub mod running;
pub mod session;
pub mod trial;

pub use baseline::{
    CalibrationAnalysis, ComparisonResult, DriftAnalysis, DriftStatus, DriftTrigger,
    DriftWindow, analyze_calibration_data, compare_control_periods, detect_baseline_drift,
};
pub use deviation::{
    CumulativePoint, CumulativeResult, DeviceVarianceResult, EffectSizeResult,
    ExcursionPeriod, IntentionSplit, NetworkVarianceResult, ZScoreResult,
    calculate_cumulative_deviation, calculate_device_variance, calculate_effect_size,
    calculate_network_variance, calculate_z_score, point_biserial_for_intention,
    split_by_intention,
};
pub use error::{AnalysisError, Result};
pub use numerics::{ConfidenceInterval, EffectMagnitude, Significance};
pub use params::{AnalysisParameters, DEFAULT_TRIAL_BITS};
pub use result::AnalysisResult;
pub use running::{RunningSnapshot, RunningStatistics};
pub use session::{SessionSummary, effect_sizes, summarize_sessions};
pub use trial::{IntentionTag, MS_PER_DAY, Trial, trial_values, trials_from_values};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
