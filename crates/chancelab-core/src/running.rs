//! O(1) running statistics for live monitoring.
//!
//! Moment updates follow Welford with Terriberry's extension to the third and
//! fourth central moments; `merge` uses the pairwise combination of Chan et al.

use serde::Serialize;

use crate::error::{AnalysisError, Result};
use crate::numerics::one_tailed_p;
use crate::params::AnalysisParameters;
use crate::trial::Trial;

/// Running moments plus the cumulative deviation from the expected mean.
#[derive(Debug, Clone, PartialEq)]
pub struct RunningStatistics {
    expected_mean: f64,
    expected_std_dev: f64,
    count: u64,
    mean: f64,
    m2: f64,
    m3: f64,
    m4: f64,
    cumulative_deviation: f64,
}

/// Point-in-time view of a [`RunningStatistics`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunningSnapshot {
    pub count: u64,
    pub mean: Option<f64>,
    pub variance: Option<f64>,
    pub std_dev: Option<f64>,
    pub skewness: Option<f64>,
    pub kurtosis: Option<f64>,
    pub cumulative_deviation: f64,
    pub cumulative_z: Option<f64>,
    pub cumulative_p_value: Option<f64>,
}

impl RunningStatistics {
    pub fn new(params: &AnalysisParameters) -> Self {
        Self {
            expected_mean: params.expected_mean,
            expected_std_dev: params.expected_std_dev,
            count: 0,
            mean: 0.0,
            m2: 0.0,
            m3: 0.0,
            m4: 0.0,
            cumulative_deviation: 0.0,
        }
    }

    pub fn push(&mut self, trial: &Trial) {
        self.push_value(trial.value);
    }

    pub fn push_value(&mut self, value: u32) {
        let x = value as f64;
        let n1 = self.count as f64;
        self.count += 1;
        let n = self.count as f64;

        let delta = x - self.mean;
        let delta_n = delta / n;
        let delta_n2 = delta_n * delta_n;
        let term1 = delta * delta_n * n1;

        self.mean += delta_n;
        self.m4 += term1 * delta_n2 * (n * n - 3.0 * n + 3.0) + 6.0 * delta_n2 * self.m2
            - 4.0 * delta_n * self.m3;
        self.m3 += term1 * delta_n * (n - 2.0) - 3.0 * delta_n * self.m2;
        self.m2 += term1;
        self.cumulative_deviation += x - self.expected_mean;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }

    /// Sample variance (n − 1).
    pub fn variance(&self) -> Option<f64> {
        (self.count > 1).then(|| (self.m2 / (self.count as f64 - 1.0)).max(0.0))
    }

    pub fn std_dev(&self) -> Option<f64> {
        self.variance().map(f64::sqrt)
    }

    /// Population moment-ratio skewness; 0 for constant input.
    pub fn skewness(&self) -> Option<f64> {
        if self.count < 2 {
            return None;
        }
        if self.m2 <= 1e-300 {
            return Some(0.0);
        }
        Some((self.count as f64).sqrt() * self.m3 / self.m2.powf(1.5))
    }

    /// Excess kurtosis; 0 for constant input.
    pub fn kurtosis(&self) -> Option<f64> {
        if self.count < 2 {
            return None;
        }
        if self.m2 <= 1e-300 {
            return Some(0.0);
        }
        Some(self.count as f64 * self.m4 / (self.m2 * self.m2) - 3.0)
    }

    pub fn cumulative_deviation(&self) -> f64 {
        self.cumulative_deviation
    }

    /// cumulative_deviation / (σ · √n).
    pub fn cumulative_z(&self) -> Option<f64> {
        (self.count > 0)
            .then(|| self.cumulative_deviation / (self.expected_std_dev * (self.count as f64).sqrt()))
    }

    pub fn snapshot(&self) -> RunningSnapshot {
        let cumulative_z = self.cumulative_z();
        RunningSnapshot {
            count: self.count,
            mean: self.mean(),
            variance: self.variance(),
            std_dev: self.std_dev(),
            skewness: self.skewness(),
            kurtosis: self.kurtosis(),
            cumulative_deviation: self.cumulative_deviation,
            cumulative_z,
            cumulative_p_value: cumulative_z.map(one_tailed_p),
        }
    }

    pub fn reset(&mut self) {
        self.count = 0;
        self.mean = 0.0;
        self.m2 = 0.0;
        self.m3 = 0.0;
        self.m4 = 0.0;
        self.cumulative_deviation = 0.0;
    }

    /// Fold `other` into `self` as if its trials had been pushed here.
    pub fn merge(&mut self, other: &RunningStatistics) -> Result<()> {
        if self.expected_mean != other.expected_mean
            || self.expected_std_dev != other.expected_std_dev
        {
            return Err(AnalysisError::invalid(
                "cannot merge running statistics with different reference parameters",
            ));
        }
        if other.count == 0 {
            return Ok(());
        }
        if self.count == 0 {
            *self = other.clone();
            return Ok(());
        }

        let na = self.count as f64;
        let nb = other.count as f64;
        let n = na + nb;
        let delta = other.mean - self.mean;
        let d2 = delta * delta;
        let d3 = d2 * delta;
        let d4 = d2 * d2;

        let m2 = self.m2 + other.m2 + d2 * na * nb / n;
        let m3 = self.m3
            + other.m3
            + d3 * na * nb * (na - nb) / (n * n)
            + 3.0 * delta * (na * other.m2 - nb * self.m2) / n;
        let m4 = self.m4
            + other.m4
            + d4 * na * nb * (na * na - na * nb + nb * nb) / (n * n * n)
            + 6.0 * d2 * (na * na * other.m2 + nb * nb * self.m2) / (n * n)
            + 4.0 * delta * (na * other.m3 - nb * self.m3) / n;

        self.mean += delta * nb / n;
        self.m2 = m2;
        self.m3 = m3;
        self.m4 = m4;
        self.count += other.count;
        self.cumulative_deviation += other.cumulative_deviation;
        Ok(())
    }
}
