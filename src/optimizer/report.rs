//! Status and pass results handed back to callers.

use serde::Serialize;

use crate::metrics::MetricsSnapshot;
use crate::score::ValidationReport;

use super::phase::Activity;

/// Snapshot of the optimizer for dashboards and CLIs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizerStatus {
    pub status: Activity,
    pub efficiency: f64,
    pub target_efficiency: f64,
    pub algorithms_active: usize,
    pub uptime_seconds: f64,
}

/// Summary of a pass that applied actions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassReport {
    /// Score measured before any action ran
    pub initial_efficiency: f64,
    /// Running estimate after the last action
    pub estimated_efficiency: f64,
    /// Score measured on the post-action snapshot; supersedes the estimate
    pub efficiency: f64,
    /// Actions applied, in execution order
    pub actions_applied: Vec<String>,
    pub validation: ValidationReport,
    pub optimization_time_ms: f64,
    pub metrics: MetricsSnapshot,
}

/// How a call to run a pass ended. Never an error: failures are contained.
#[derive(Debug, Clone, PartialEq)]
pub enum PassOutcome {
    /// Another pass was already in flight; nothing happened.
    Skipped,
    /// The measured score already met the target; no action was applied.
    TargetMet { efficiency: f64 },
    /// Actions were applied and validated.
    Completed(PassReport),
    /// An action failed, panicked or timed out; the pass was abandoned.
    ///
    /// Actions that completed before the failure keep their effects.
    Failed {
        action: String,
        error: String,
        actions_applied: Vec<String>,
    },
}

impl PassOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }

    /// Number of actions the pass applied.
    pub fn actions_applied(&self) -> usize {
        match self {
            Self::Completed(report) => report.actions_applied.len(),
            Self::Failed {
                actions_applied, ..
            } => actions_applied.len(),
            Self::Skipped | Self::TargetMet { .. } => 0,
        }
    }
}
