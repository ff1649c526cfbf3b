//! Post-pass validation against fixed health thresholds.

use serde::Serialize;

use crate::metrics::MetricsSnapshot;

use super::OPTIMAL_UTILIZATION;

/// Thresholds a snapshot must meet for a pass to count as successful.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidationThresholds {
    pub min_system_efficiency: f64,
    pub min_processing_speed: f64,
    pub min_accuracy: f64,
    /// Allowed distance from the optimal utilization
    pub utilization_tolerance: f64,
    pub max_error_rate: f64,
}

impl Default for ValidationThresholds {
    fn default() -> Self {
        Self {
            min_system_efficiency: 0.999,
            min_processing_speed: 1000.0,
            min_accuracy: 0.999,
            utilization_tolerance: 0.1,
            max_error_rate: 0.001,
        }
    }
}

impl ValidationThresholds {
    /// Check a measured snapshot and its score against the thresholds.
    pub fn check(&self, snapshot: &MetricsSnapshot, score: f64, target: f64) -> ValidationReport {
        ValidationReport {
            system_efficiency: snapshot.system_efficiency >= self.min_system_efficiency,
            processing_speed: snapshot.processing_speed >= self.min_processing_speed,
            accuracy: snapshot.accuracy >= self.min_accuracy,
            resource_utilization: (snapshot.resource_utilization - OPTIMAL_UTILIZATION).abs()
                <= self.utilization_tolerance,
            error_rate: snapshot.error_rate <= self.max_error_rate,
            overall_efficiency: score >= target,
        }
    }
}

/// Outcome of each named check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub system_efficiency: bool,
    pub processing_speed: bool,
    pub accuracy: bool,
    pub resource_utilization: bool,
    pub error_rate: bool,
    pub overall_efficiency: bool,
}

impl ValidationReport {
    pub fn all_passed(&self) -> bool {
        self.system_efficiency
            && self.processing_speed
            && self.accuracy
            && self.resource_utilization
            && self.error_rate
            && self.overall_efficiency
    }

    /// Names of the checks that did not pass.
    pub fn failures(&self) -> Vec<&'static str> {
        [
            ("systemEfficiency", self.system_efficiency),
            ("processingSpeed", self.processing_speed),
            ("accuracy", self.accuracy),
            ("resourceUtilization", self.resource_utilization),
            ("errorRate", self.error_rate),
            ("overallEfficiency", self.overall_efficiency),
        ]
        .into_iter()
        .filter(|(_, passed)| !passed)
        .map(|(name, _)| name)
        .collect()
    }
}
