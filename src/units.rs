//! Conversions from backend-native units to the exported canonical units
//! (bytes per second and seconds).

use std::time::Duration;

/// 1 Mbit/s expressed in bytes/s (decimal mega)
pub const BYTES_PER_MEGABIT: f64 = 125_000.0;

const MILLIS_PER_SECOND: f64 = 1000.0;

/// Convert a throughput in Mbit/s to bytes/s
pub fn mbps_to_bytes_per_second(mbps: f64) -> f64 {
    mbps * BYTES_PER_MEGABIT
}

/// Convert a latency in milliseconds to seconds
pub fn millis_to_seconds(millis: f64) -> f64 {
    millis / MILLIS_PER_SECOND
}

pub fn duration_to_seconds(duration: Duration) -> f64 {
    duration.as_secs_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_known_conversions() {
        assert_eq!(mbps_to_bytes_per_second(150.5), 18_812_500.0);
        assert_eq!(mbps_to_bytes_per_second(20.3), 2_537_500.0);
        assert_eq!(millis_to_seconds(12.8), 0.0128);
        assert_eq!(duration_to_seconds(Duration::from_millis(250)), 0.25);
    }

    #[test]
    fn test_non_positive_values_pass_through() {
        assert_eq!(mbps_to_bytes_per_second(0.0), 0.0);
        assert_eq!(mbps_to_bytes_per_second(-1.0), -125_000.0);
        assert_eq!(millis_to_seconds(-5.0), -0.005);
    }

    proptest! {
        #[test]
        fn prop_throughput_is_linear(a in 0.0f64..10_000.0, b in 0.0f64..10_000.0) {
            let sum = mbps_to_bytes_per_second(a) + mbps_to_bytes_per_second(b);
            let combined = mbps_to_bytes_per_second(a + b);
            prop_assert!((sum - combined).abs() <= combined.abs() * 1e-12 + 1e-6);
        }

        #[test]
        fn prop_latency_round_trips(ms in 0.0f64..1_000_000.0) {
            let back = millis_to_seconds(ms) * 1000.0;
            prop_assert!((back - ms).abs() <= ms * 1e-12 + 1e-9);
        }
    }
}
