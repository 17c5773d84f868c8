//! Common test fixtures for coordinate index tests.
//!
//! Value sets that show up across the suite: standard pressure levels,
//! forecast-hour schedules and the unordered offsets used in scenario tests.

/// Standard isobaric levels in Pa, from the surface upward as NCEP lists them.
pub const PRESSURE_LEVELS_PA: [u32; 10] = [
    100_000, 92_500, 85_000, 70_000, 50_000, 30_000, 25_000, 20_000, 10_000, 5_000,
];

/// Forecast hours in arrival order, with a duplicate.
pub const UNORDERED_FORECAST_HOURS: [u32; 5] = [6, 0, 12, 6, 3];

/// GFS-like schedule: hourly to 12, then 3-hourly to 48.
pub fn gfs_forecast_hours() -> Vec<u32> {
    (0..12).chain((12..=48).step_by(3)).collect()
}

/// Deterministic permutation of `0..n` (multiplicative stride), for
/// order-independence tests without a random number generator.
pub fn permutation(n: usize, stride: usize) -> Vec<usize> {
    assert!(n > 0 && gcd(n, stride) == 1, "stride must be coprime with n");
    (0..n).map(|i| (i * stride) % n).collect()
}

fn gcd(a: usize, b: usize) -> usize {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gfs_schedule() {
        let hours = gfs_forecast_hours();
        assert_eq!(hours.first(), Some(&0));
        assert_eq!(hours.last(), Some(&48));
        assert!(hours.contains(&11));
        assert!(!hours.contains(&13));
    }

    #[test]
    fn test_permutation_is_bijection() {
        let mut p = permutation(10, 7);
        p.sort();
        assert_eq!(p, (0..10).collect::<Vec<_>>());
    }
}
