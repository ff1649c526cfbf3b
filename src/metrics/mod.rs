//! Derived health metrics and the sampler that produces them.

mod probe;
mod sampler;

pub use probe::{ProcessCounters, ProcessProbe, SysinfoProbe};
pub use sampler::{FixedSource, MetricsSampler, MetricsSource};

use serde::{Deserialize, Serialize};

/// One immutable reading of process health.
///
/// Recreated on every sample. Consumers always receive a copy; the optimizer
/// replaces its stored snapshot as a whole and never edits fields in place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    /// Uptime and memory headroom blended into one ratio
    pub system_efficiency: f64,
    /// Operations per second (nominal 1000)
    pub processing_speed: f64,
    /// Fraction of successful operations
    pub accuracy: f64,
    /// Memory in use relative to total memory (0.0 - 1.0)
    pub resource_utilization: f64,
    /// Fraction of failed operations (0.0 - 1.0)
    pub error_rate: f64,
    /// Completed operations per second
    pub throughput: f64,
    /// Milliseconds
    pub latency: f64,
}

impl Default for MetricsSnapshot {
    /// The baseline reading used before the first sample.
    fn default() -> Self {
        Self {
            system_efficiency: 0.999,
            processing_speed: 1000.0,
            accuracy: 0.999,
            resource_utilization: 0.75,
            error_rate: 0.001,
            throughput: 1000.0,
            latency: 50.0,
        }
    }
}

impl MetricsSnapshot {
    /// Check the snapshot invariants: no NaN, ratios in `[0, 1]`, the rest non-negative.
    pub fn is_valid(&self) -> bool {
        let fields = [
            self.system_efficiency,
            self.processing_speed,
            self.accuracy,
            self.resource_utilization,
            self.error_rate,
            self.throughput,
            self.latency,
        ];
        fields.iter().all(|v| !v.is_nan() && *v >= 0.0)
            && self.resource_utilization <= 1.0
            && self.error_rate <= 1.0
    }

    /// Force the snapshot back inside its invariants.
    ///
    /// NaN fields take the value from `fallback`; ratios are clamped to `[0, 1]`
    /// and everything else is floored at zero.
    pub fn sanitized(self, fallback: &MetricsSnapshot) -> Self {
        let pick = |v: f64, prior: f64| if v.is_nan() { prior } else { v };
        Self {
            system_efficiency: pick(self.system_efficiency, fallback.system_efficiency).max(0.0),
            processing_speed: pick(self.processing_speed, fallback.processing_speed).max(0.0),
            accuracy: pick(self.accuracy, fallback.accuracy).max(0.0),
            resource_utilization: pick(self.resource_utilization, fallback.resource_utilization)
                .clamp(0.0, 1.0),
            error_rate: pick(self.error_rate, fallback.error_rate).clamp(0.0, 1.0),
            throughput: pick(self.throughput, fallback.throughput).max(0.0),
            latency: pick(self.latency, fallback.latency).max(0.0),
        }
    }
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "eff {:.4}, speed {:.0}/s, acc {:.4}, util {:.1}%, err {:.3}%, tput {:.0}/s, lat {:.1}ms",
            self.system_efficiency,
            self.processing_speed,
            self.accuracy,
            self.resource_utilization * 100.0,
            self.error_rate * 100.0,
            self.throughput,
            self.latency
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_is_valid() {
        assert!(MetricsSnapshot::default().is_valid());
    }

    #[test]
    fn test_out_of_range_is_invalid() {
        let mut snapshot = MetricsSnapshot::default();
        snapshot.resource_utilization = 2.0;
        assert!(!snapshot.is_valid());

        let mut snapshot = MetricsSnapshot::default();
        snapshot.latency = f64::NAN;
        assert!(!snapshot.is_valid());
    }

    #[test]
    fn test_sanitized_restores_invariants() {
        let fallback = MetricsSnapshot::default();
        let broken = MetricsSnapshot {
            system_efficiency: f64::NAN,
            processing_speed: -5.0,
            accuracy: 0.5,
            resource_utilization: 1.7,
            error_rate: -0.1,
            throughput: 10.0,
            latency: f64::NAN,
        };

        let fixed = broken.sanitized(&fallback);
        assert!(fixed.is_valid());
        assert_eq!(fixed.system_efficiency, fallback.system_efficiency);
        assert_eq!(fixed.processing_speed, 0.0);
        assert_eq!(fixed.resource_utilization, 1.0);
        assert_eq!(fixed.error_rate, 0.0);
        assert_eq!(fixed.latency, fallback.latency);
    }

    #[test]
    fn test_display() {
        let s = format!("{}", MetricsSnapshot::default());
        assert!(s.contains("util 75.0%"));
        assert!(s.contains("lat 50.0ms"));
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(MetricsSnapshot::default()).unwrap();
        assert_eq!(json["resourceUtilization"], 0.75);
        assert_eq!(json["errorRate"], 0.001);
    }
}
