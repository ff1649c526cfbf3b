//! Turns raw process counters into a [`MetricsSnapshot`].

use std::sync::RwLock;

use super::MetricsSnapshot;
use super::probe::{ProcessProbe, SysinfoProbe};

/// Seconds of uptime that count as a fully warmed-up process.
const FULL_UPTIME_SECS: f64 = 24.0 * 60.0 * 60.0;

/// Operation count assumed when the previous reading had no throughput.
const DEFAULT_TOTAL_OPS: f64 = 1000.0;

/// Anything able to produce a fresh snapshot.
///
/// `previous` is the last stored snapshot; some terms are relative to it.
/// Implementations must never fail and must return a snapshot that satisfies
/// [`MetricsSnapshot::is_valid`].
pub trait MetricsSource: Send + Sync {
    fn sample(&self, previous: &MetricsSnapshot, target: f64) -> MetricsSnapshot;
}

/// The standard sampler, deriving every metric from process counters.
pub struct MetricsSampler<P: ProcessProbe = SysinfoProbe> {
    probe: P,
}

impl MetricsSampler<SysinfoProbe> {
    /// Sampler over the current process.
    pub fn new() -> Self {
        Self::with_probe(SysinfoProbe::new())
    }
}

impl Default for MetricsSampler<SysinfoProbe> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: ProcessProbe> MetricsSampler<P> {
    pub fn with_probe(probe: P) -> Self {
        Self { probe }
    }
}

impl<P: ProcessProbe> MetricsSource for MetricsSampler<P> {
    fn sample(&self, previous: &MetricsSnapshot, target: f64) -> MetricsSnapshot {
        let counters = self.probe.read();

        let memory_ratio = counters
            .memory_ratio()
            .unwrap_or(previous.resource_utilization)
            .clamp(0.0, 1.0);
        let memory_score = 1.0 - memory_ratio;
        let uptime_score = (counters.uptime_secs.unwrap_or(0.0) / FULL_UPTIME_SECS).min(1.0);
        let cpu_score = 1.0 - counters.cpu_fraction.unwrap_or(0.0).clamp(0.0, 1.0);

        let system_efficiency = (uptime_score + memory_score) / 2.0;
        let processing_speed = (cpu_score + memory_score) / 2.0 * 1000.0;

        // Accuracy looks back at the previous reading's volume and failure rate
        let total_ops = if previous.throughput > 0.0 {
            previous.throughput
        } else {
            DEFAULT_TOTAL_OPS
        };
        let errors = (total_ops * previous.error_rate).floor();
        let accuracy = (total_ops - errors) / total_ops;

        // Errors rise as efficiency falls
        let error_rate = (0.001 * (2.0 - system_efficiency)).clamp(0.0, 1.0);
        let throughput = (1000.0 * system_efficiency).floor();
        // Efficiency above target lowers latency, below target raises it
        let latency = (50.0 + (system_efficiency - target) * 1000.0).max(1.0);

        MetricsSnapshot {
            system_efficiency,
            processing_speed,
            accuracy,
            resource_utilization: memory_ratio,
            error_rate,
            throughput,
            latency,
        }
        .sanitized(previous)
    }
}

/// A source that returns whatever snapshot it was last given.
///
/// Lets a host feed measurements taken elsewhere, and gives tests a
/// deterministic reading.
#[derive(Debug)]
pub struct FixedSource {
    snapshot: RwLock<MetricsSnapshot>,
}

impl FixedSource {
    pub fn new(snapshot: MetricsSnapshot) -> Self {
        Self {
            snapshot: RwLock::new(snapshot),
        }
    }

    /// Replace the snapshot returned by later samples.
    pub fn set(&self, snapshot: MetricsSnapshot) {
        *self.snapshot.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = snapshot;
    }
}

impl MetricsSource for FixedSource {
    fn sample(&self, previous: &MetricsSnapshot, _target: f64) -> MetricsSnapshot {
        self.snapshot
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .sanitized(previous)
    }
}
