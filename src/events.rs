//! Event feed for external observers.
//!
//! Every state transition of the optimizer is published on a bounded
//! broadcast channel. Subscribers that fall behind lose the oldest events
//! (`RecvError::Lagged`) and never slow the optimizer down.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

use crate::error::OptimizerError;
use crate::metrics::MetricsSnapshot;
use crate::score::ValidationReport;

/// Something the optimizer announces.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum OptimizerEvent {
    /// The measured score already meets the target; the pass applied nothing.
    EfficiencyAchieved { efficiency: f64 },

    /// One action finished. `efficiency` is the running estimate, not a measurement.
    EfficiencyUpdated { algorithm: String, efficiency: f64 },

    /// A pass that applied actions finished.
    OptimizationComplete {
        efficiency: f64,
        optimization_time_ms: f64,
        metrics: MetricsSnapshot,
    },

    /// An action failed or timed out and the pass was abandoned.
    OptimizationError { action: String, error: String },

    ValidationSuccess(ValidationReport),

    ValidationWarning(ValidationReport),

    /// Periodic reading from the monitor loop.
    PerformanceUpdate {
        efficiency: f64,
        metrics: MetricsSnapshot,
        timestamp: DateTime<Utc>,
    },

    /// The monitor saw the score drop below the degradation watermark.
    PerformanceDegradation {
        efficiency: f64,
        watermark: f64,
        metrics: MetricsSnapshot,
    },
}

impl OptimizerEvent {
    /// Wire name of the event.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::EfficiencyAchieved { .. } => "efficiency-achieved",
            Self::EfficiencyUpdated { .. } => "efficiency-updated",
            Self::OptimizationComplete { .. } => "optimization-complete",
            Self::OptimizationError { .. } => "optimization-error",
            Self::ValidationSuccess(_) => "validation-success",
            Self::ValidationWarning(_) => "validation-warning",
            Self::PerformanceUpdate { .. } => "performance-update",
            Self::PerformanceDegradation { .. } => "performance-degradation",
        }
    }
}

/// An event stamped with the time it was published.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventEnvelope {
    #[serde(rename = "emittedAt")]
    pub emitted_at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: OptimizerEvent,
}

impl EventEnvelope {
    pub fn new(event: OptimizerEvent) -> Self {
        Self {
            emitted_at: Utc::now(),
            event,
        }
    }

    /// JSON with an ISO-8601 timestamp and a kebab-case `event` tag.
    pub fn to_json(&self) -> Result<String, OptimizerError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Publish/subscribe channel for [`OptimizerEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Publish to every current subscriber. Returns how many received it.
    pub fn publish(&self, event: OptimizerEvent) -> usize {
        let name = event.name();
        match self.sender.send(EventEnvelope::new(event)) {
            Ok(receivers) => receivers,
            Err(_) => {
                // Nobody listening
                trace!("Dropped {} event", name);
                0
            }
        }
    }
}
