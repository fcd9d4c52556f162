//! Single tagged output type over every analysis result.

use serde::Serialize;

use crate::baseline::{CalibrationAnalysis, ComparisonResult, DriftAnalysis};
use crate::deviation::{
    CumulativeResult, DeviceVarianceResult, EffectSizeResult, NetworkVarianceResult,
    ZScoreResult,
};
use crate::inference::{
    BayesFactorResult, ForestPlotData, MetaAnalysisResult, PosteriorDistribution,
    SequentialAnalysisResult,
};
use crate::running::RunningSnapshot;
use crate::session::SessionSummary;

/// Any analysis output, serialized with a `"kind"` discriminator.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisResult {
    ZScore(ZScoreResult),
    EffectSize(EffectSizeResult),
    Cumulative(CumulativeResult),
    NetworkVariance(NetworkVarianceResult),
    DeviceVariance(DeviceVarianceResult),
    Calibration(CalibrationAnalysis),
    Drift(DriftAnalysis),
    Comparison(ComparisonResult),
    BayesFactor(BayesFactorResult),
    Posterior(PosteriorDistribution),
    Sequential(SequentialAnalysisResult),
    MetaAnalysis(MetaAnalysisResult),
    ForestPlot(ForestPlotData),
    Running(RunningSnapshot),
    Sessions { sessions: Vec<SessionSummary> },
}

macro_rules! impl_from_result {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for AnalysisResult {
                fn from(r: $ty) -> Self {
                    Self::$variant(r)
                }
            }
        )*
    };
}

impl_from_result! {
    ZScoreResult => ZScore,
    EffectSizeResult => EffectSize,
    CumulativeResult => Cumulative,
    NetworkVarianceResult => NetworkVariance,
    DeviceVarianceResult => DeviceVariance,
    CalibrationAnalysis => Calibration,
    DriftAnalysis => Drift,
    ComparisonResult => Comparison,
    BayesFactorResult => BayesFactor,
    PosteriorDistribution => Posterior,
    SequentialAnalysisResult => Sequential,
    MetaAnalysisResult => MetaAnalysis,
    ForestPlotData => ForestPlot,
    RunningSnapshot => Running,
}

impl From<Vec<SessionSummary>> for AnalysisResult {
    fn from(sessions: Vec<SessionSummary>) -> Self {
        Self::Sessions { sessions }
    }
}
