//! Double-spend attack estimators over (attacker hash power %, confirmation depth).
//! Nothing here reads ledger state.

use rand::Rng;

/// Chance an attacker holding `attacker_power_pct` percent of the hash power catches up
/// from `confirmations` blocks behind: `(q / p)^z`, capped at 1.
pub fn nakamoto_success_probability(attacker_power_pct: f64, confirmations: u32) -> f64 {
    let honest = 100.0 - attacker_power_pct;
    if honest <= 0.0 {
        return 1.0;
    }
    let ratio = (attacker_power_pct / honest).max(0.0);
    ratio.powf(f64::from(confirmations)).min(1.0)
}

/// Sample the catch-up event `runs` times and return the observed success rate.
pub fn monte_carlo_success<R: Rng + ?Sized>(
    attacker_power_pct: f64,
    confirmations: u32,
    runs: u32,
    rng: &mut R,
) -> f64 {
    if runs == 0 {
        return 0.0;
    }
    let p = nakamoto_success_probability(attacker_power_pct, confirmations);
    let hits = (0..runs).filter(|_| rng.gen_bool(p)).count();
    hits as f64 / runs as f64
}

/// Leave-one-out means.
pub fn jackknife_estimates(data: &[f64]) -> Vec<f64> {
    let n = data.len();
    if n < 2 {
        return Vec::new();
    }
    let total: f64 = data.iter().sum();
    data.iter().map(|x| (total - x) / (n - 1) as f64).collect()
}

/// Jackknife variance of the mean: `(n - 1) * mean((theta_i - mean)^2)`.
pub fn jackknife_variance(data: &[f64]) -> f64 {
    let n = data.len();
    if n < 2 {
        return 0.0;
    }
    let mean = data.iter().sum::<f64>() / n as f64;
    let estimates = jackknife_estimates(data);
    let spread = estimates.iter().map(|e| (e - mean).powi(2)).sum::<f64>() / n as f64;
    (n - 1) as f64 * spread
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn nakamoto_matches_closed_form() {
        assert!(close(nakamoto_success_probability(10.0, 1), 10.0 / 90.0));
        assert!(close(nakamoto_success_probability(25.0, 3), (25.0f64 / 75.0).powi(3)));
        assert!(close(nakamoto_success_probability(30.0, 0), 1.0));
    }

    #[test]
    fn nakamoto_caps_at_one() {
        assert_eq!(nakamoto_success_probability(60.0, 2), 1.0);
        assert_eq!(nakamoto_success_probability(100.0, 6), 1.0);
        assert_eq!(nakamoto_success_probability(0.0, 6), 0.0);
    }

    #[test]
    fn huge_depth_drives_minority_attacker_to_zero() {
        assert_eq!(nakamoto_success_probability(10.0, 3_000_000_000), 0.0);
        assert_eq!(nakamoto_success_probability(10.0, u32::MAX), 0.0);
        assert_eq!(nakamoto_success_probability(50.0, u32::MAX), 1.0);
    }

    #[test]
    fn deeper_confirmations_are_safer() {
        let shallow = nakamoto_success_probability(20.0, 1);
        let deep = nakamoto_success_probability(20.0, 6);
        assert!(deep < shallow);
    }

    #[test]
    fn monte_carlo_tracks_closed_form() {
        let mut rng = StdRng::seed_from_u64(7);
        let p = nakamoto_success_probability(30.0, 2);
        let est = monte_carlo_success(30.0, 2, 20_000, &mut rng);
        assert!((est - p).abs() < 0.02, "estimate {est} vs {p}");
        assert_eq!(monte_carlo_success(30.0, 2, 0, &mut rng), 0.0);
    }

    #[test]
    fn jackknife_of_mean_equals_sample_variance_over_n() {
        let data = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let n = data.len() as f64;
        let mean = data.iter().sum::<f64>() / n;
        let sample_var = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
        assert!(close(jackknife_variance(&data), sample_var / n));
    }

    #[test]
    fn jackknife_estimates_leave_one_out() {
        let est = jackknife_estimates(&[1.0, 2.0, 3.0]);
        assert_eq!(est, vec![2.5, 2.0, 1.5]);
        assert!(jackknife_estimates(&[1.0]).is_empty());
        assert_eq!(jackknife_variance(&[]), 0.0);
    }
}
