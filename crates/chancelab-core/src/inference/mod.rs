//! Cross-session inference: Bayes factors and conjugate posteriors, sequential
//! testing, fixed/random-effects meta-analysis, and power calculations.
//!
//! Consumes per-session outputs of the deviation analyzer (or raw values) and
//! never re-reads trials on its own.

pub mod bayes;
pub mod meta;
pub mod power;
pub mod sequential;

pub use bayes::{
    BayesFactorResult, Distribution, EvidenceDirection, EvidenceStrength, Hypothesis,
    PosteriorDistribution, Prior, bayes_factor, credible_interval, update_posterior,
};
pub use meta::{
    CombinedZ, EffectSizeData, ForestPlotData, ForestRow, Heterogeneity, MetaAnalysisResult,
    MetaModel, fixed_effects, forest_plot_data, random_effects, stouffer_combined_z,
};
pub use power::{required_sample_size, statistical_power};
pub use sequential::{
    AdaptiveSampleSize, SequentialAnalysisResult, SprtConfig, SprtDecision,
    adaptive_sample_size, sequential_probability_ratio_test,
};
