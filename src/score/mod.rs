//! Composite efficiency scoring.
//!
//! Reduces a [`MetricsSnapshot`] to a single score in `[0, 1]`. Most terms reward
//! higher (or, for errors and latency, lower) values. Resource utilization is
//! scored against an optimal band: running far below or far above it costs the
//! same.

mod validation;

pub use validation::{ValidationReport, ValidationThresholds};

use serde::Serialize;

use crate::metrics::MetricsSnapshot;

/// Utilization the resource term rewards most.
pub const OPTIMAL_UTILIZATION: f64 = 0.75;

/// Per-term weights. The standard set sums to 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub system_efficiency: f64,
    pub processing_speed: f64,
    pub accuracy: f64,
    pub resource_utilization: f64,
    pub error_rate: f64,
    pub throughput: f64,
    pub latency: f64,
}

impl ScoreWeights {
    pub const STANDARD: Self = Self {
        system_efficiency: 0.25,
        processing_speed: 0.20,
        accuracy: 0.20,
        resource_utilization: 0.15,
        error_rate: 0.10,
        throughput: 0.05,
        latency: 0.05,
    };

    pub fn sum(&self) -> f64 {
        self.system_efficiency
            + self.processing_speed
            + self.accuracy
            + self.resource_utilization
            + self.error_rate
            + self.throughput
            + self.latency
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Weighted contribution of each term to the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub system_efficiency: f64,
    pub processing_speed: f64,
    pub accuracy: f64,
    pub resource_utilization: f64,
    pub error_rate: f64,
    pub throughput: f64,
    pub latency: f64,
}

impl ScoreBreakdown {
    /// Sum of all contributions, clamped to `[0, 1]`.
    pub fn total(&self) -> f64 {
        unit(
            self.system_efficiency
                + self.processing_speed
                + self.accuracy
                + self.resource_utilization
                + self.error_rate
                + self.throughput
                + self.latency,
        )
    }
}

/// Pure, deterministic scoring function.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreModel {
    weights: ScoreWeights,
}

impl ScoreModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(weights: ScoreWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    /// Composite score in `[0, 1]`.
    #[inline]
    pub fn compute(&self, snapshot: &MetricsSnapshot) -> f64 {
        self.breakdown(snapshot).total()
    }

    /// Per-term contributions. Every raw term is clamped to `[0, 1]` before
    /// weighting, so no term can pull the composite below zero.
    pub fn breakdown(&self, snapshot: &MetricsSnapshot) -> ScoreBreakdown {
        let w = &self.weights;
        let utilization_term =
            1.0 - (snapshot.resource_utilization - OPTIMAL_UTILIZATION).abs();

        ScoreBreakdown {
            system_efficiency: unit(snapshot.system_efficiency) * w.system_efficiency,
            processing_speed: unit(snapshot.processing_speed / 1000.0) * w.processing_speed,
            accuracy: unit(snapshot.accuracy) * w.accuracy,
            resource_utilization: unit(utilization_term) * w.resource_utilization,
            error_rate: unit(1.0 - snapshot.error_rate) * w.error_rate,
            throughput: unit(snapshot.throughput / 1000.0) * w.throughput,
            latency: unit(1.0 - snapshot.latency / 100.0) * w.latency,
        }
    }
}

/// Clamp into `[0, 1]`, mapping NaN to 0.
#[inline]
fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
