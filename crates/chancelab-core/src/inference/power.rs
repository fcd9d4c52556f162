//! Two-sided power and sample-size formulas for a standardized effect.

use crate::error::{AnalysisError, Result};
use crate::numerics::{normal_cdf, normal_inverse, z_critical};

/// Power of a two-sided z-test detecting `effect` (Cohen's d) with `n` trials.
pub fn statistical_power(effect: f64, n: usize, alpha: f64) -> Result<f64> {
    check_effect(effect)?;
    if n == 0 {
        return Err(AnalysisError::EmptyInput);
    }
    let z_alpha = z_critical(1.0 - alpha)?;
    let lambda = effect.abs() * (n as f64).sqrt();
    Ok((normal_cdf(lambda - z_alpha) + normal_cdf(-lambda - z_alpha)).clamp(0.0, 1.0))
}

/// Trials needed to reach `power` for `effect` at two-sided `alpha`:
/// ⌈((z₁₋α/₂ + z_power) / |d|)²⌉.
pub fn required_sample_size(effect: f64, alpha: f64, power: f64) -> Result<usize> {
    check_effect(effect)?;
    let z_alpha = z_critical(1.0 - alpha)?;
    let z_power = normal_inverse(power)?;
    let n = ((z_alpha + z_power) / effect.abs()).powi(2).ceil();
    Ok((n as usize).max(1))
}

fn check_effect(effect: f64) -> Result<()> {
    if effect == 0.0 || !effect.is_finite() {
        return Err(AnalysisError::invalid(format!(
            "effect size must be finite and nonzero, got {effect}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn textbook_sample_size() {
        // d = 0.5, alpha 0.05, power 0.8 → 31.4 → 32 for the one-sample z-test.
        assert_eq!(required_sample_size(0.5, 0.05, 0.8).unwrap(), 32);
        assert_eq!(required_sample_size(-0.5, 0.05, 0.8).unwrap(), 32);
    }

    #[test]
    fn power_at_required_n_meets_target() {
        let n = required_sample_size(0.2, 0.05, 0.9).unwrap();
        let p = statistical_power(0.2, n, 0.05).unwrap();
        assert!(p >= 0.9 && p < 0.91, "power {p}");
    }

    #[test]
    fn power_grows_with_n() {
        let small = statistical_power(0.1, 50, 0.05).unwrap();
        let large = statistical_power(0.1, 5000, 0.05).unwrap();
        assert!(small < large);
        assert!(large > 0.99);
    }

    #[test]
    fn zero_effect_is_invalid() {
        assert!(required_sample_size(0.0, 0.05, 0.8).is_err());
        assert!(statistical_power(0.0, 10, 0.05).is_err());
    }
}
