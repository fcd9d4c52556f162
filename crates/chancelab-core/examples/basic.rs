//! Basic analysis example.
//!
//! Simulates a stream of 200-bit trials, then prints the Z-score, the
//! cumulative deviation with its excursions, and a live running snapshot.
//!
//! Run: `cargo run --example basic`

use chancelab_core::{
    AnalysisParameters, RunningStatistics, calculate_cumulative_deviation, calculate_z_score,
    trials_from_values,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn main() {
    let params = AnalysisParameters::default();
    let mut rng = StdRng::seed_from_u64(42);

    // Popcount of 200 fair bits per trial
    let values: Vec<u32> = (0..5000)
        .map(|_| {
            rng.random::<u128>().count_ones()
                + rng.random::<u64>().count_ones()
                + rng.random::<u8>().count_ones()
        })
        .collect();
    let trials = trials_from_values(&values);

    let z = calculate_z_score(&trials, &params).unwrap();
    println!(
        "n = {}  mean = {:.3}  z = {:+.3}  p = {:.4}  ({})",
        z.n, z.mean, z.z_score, z.p_value_two_tailed, z.significance
    );

    let cumulative = calculate_cumulative_deviation(&trials, &params).unwrap();
    println!(
        "cumulative deviation {:+.1}, max |z| {:.3} at trial {}, {} excursion(s)",
        cumulative.final_cumulative_deviation,
        cumulative.max_abs_z,
        cumulative.max_abs_z_index,
        cumulative.excursions.len()
    );

    let mut running = RunningStatistics::new(&params);
    for &v in &values {
        running.push_value(v);
    }
    let snap = running.snapshot();
    println!(
        "running: count {}  variance {:.3}  cumulative z {:+.3}",
        snap.count,
        snap.variance.unwrap_or(f64::NAN),
        snap.cumulative_z.unwrap_or(f64::NAN)
    );
}
