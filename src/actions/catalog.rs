//! The six standard corrective actions.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::OptimizerError;
use crate::metrics::MetricsSnapshot;
use crate::score::OPTIMAL_UTILIZATION;

use super::remediator::{RemediationRequest, Remediator};
use super::{ActionCategory, CorrectiveAction};

/// Ceiling for processing speed and throughput adjustments.
const RATE_CAP: f64 = 2000.0;
/// Floor for latency adjustments, in milliseconds.
const LATENCY_FLOOR: f64 = 10.0;

/// The effect each standard action has on the sampled metrics.
///
/// Every adjustment is bounded, so repeating an action converges instead of
/// diverging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Remedy {
    /// Halves the error rate.
    ErrorCorrection,
    /// Nudges accuracy and processing speed up.
    AnalysisOptimization,
    /// Raises throughput and trims latency.
    PredictiveTuning,
    /// Moves utilization a tenth of the way toward the optimal band.
    ResourceReallocation,
    /// Nudges system efficiency up.
    HardeningPass,
    /// Raises processing speed and throughput.
    DataPathOptimization,
}

impl Remedy {
    pub const ALL: [Remedy; 6] = [
        Self::ErrorCorrection,
        Self::AnalysisOptimization,
        Self::PredictiveTuning,
        Self::ResourceReallocation,
        Self::HardeningPass,
        Self::DataPathOptimization,
    ];

    /// Apply this remedy's bounded adjustment to a snapshot.
    pub fn adjust(&self, s: &MetricsSnapshot) -> MetricsSnapshot {
        let mut next = *s;
        match self {
            Self::ErrorCorrection => {
                next.error_rate = s.error_rate * 0.5;
            }
            Self::AnalysisOptimization => {
                next.accuracy = (s.accuracy + 0.001).min(1.0);
                next.processing_speed = (s.processing_speed + 10.0).min(RATE_CAP);
            }
            Self::PredictiveTuning => {
                next.throughput = (s.throughput + 50.0).min(RATE_CAP);
                next.latency = (s.latency - 5.0).max(LATENCY_FLOOR);
            }
            Self::ResourceReallocation => {
                let step = (OPTIMAL_UTILIZATION - s.resource_utilization) * 0.1;
                next.resource_utilization = (s.resource_utilization + step).clamp(0.5, 0.9);
            }
            Self::HardeningPass => {
                next.system_efficiency = (s.system_efficiency + 0.001).min(1.0);
            }
            Self::DataPathOptimization => {
                next.processing_speed = (s.processing_speed + 20.0).min(RATE_CAP);
                next.throughput = (s.throughput + 25.0).min(RATE_CAP);
            }
        }
        next
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::ErrorCorrection => "Error-Correction",
            Self::AnalysisOptimization => "Analysis Optimization",
            Self::PredictiveTuning => "Predictive Tuning",
            Self::ResourceReallocation => "Resource Reallocation",
            Self::HardeningPass => "Hardening Pass",
            Self::DataPathOptimization => "Data-Path Optimization",
        }
    }

    pub const fn category(&self) -> ActionCategory {
        match self {
            Self::ErrorCorrection | Self::ResourceReallocation => ActionCategory::Resource,
            Self::AnalysisOptimization | Self::DataPathOptimization => ActionCategory::Analysis,
            Self::PredictiveTuning => ActionCategory::Prediction,
            Self::HardeningPass => ActionCategory::Security,
        }
    }

    /// Static priority used to order actions within a pass.
    pub const fn declared_impact(&self) -> f64 {
        match self {
            Self::PredictiveTuning => 0.003,
            Self::AnalysisOptimization
            | Self::ResourceReallocation
            | Self::DataPathOptimization => 0.002,
            Self::ErrorCorrection | Self::HardeningPass => 0.001,
        }
    }

    pub const fn declared_accuracy(&self) -> f64 {
        match self {
            Self::PredictiveTuning => 0.998,
            _ => 0.999,
        }
    }

    pub const fn description(&self) -> &'static str {
        match self {
            Self::ErrorCorrection => "Probabilistic error correction over failed operations",
            Self::AnalysisOptimization => "Retunes analysis paths for accuracy and speed",
            Self::PredictiveTuning => "Pre-warms hot paths from recent load trends",
            Self::ResourceReallocation => "Rebalances memory toward the optimal utilization band",
            Self::HardeningPass => "Tightens runtime guards and drops unstable state",
            Self::DataPathOptimization => "Streamlines the data path for higher throughput",
        }
    }

    pub const fn application_domain(&self) -> &'static str {
        match self {
            Self::ErrorCorrection => "Data integrity validation and error reduction",
            Self::AnalysisOptimization => "Pattern recognition and data analysis",
            Self::PredictiveTuning => "Forecasting and trend analysis",
            Self::ResourceReallocation => "System resource management and load balancing",
            Self::HardeningPass => "Threat detection and prevention",
            Self::DataPathOptimization => "Real-time data processing",
        }
    }
}

impl std::fmt::Display for Remedy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A catalog action: asks the remediator to do the work, then reports the
/// remedy's effect on the sampled metrics.
#[derive(Debug, Clone, Copy)]
pub struct StandardAction {
    remedy: Remedy,
}

impl StandardAction {
    pub const fn new(remedy: Remedy) -> Self {
        Self { remedy }
    }

    pub const fn remedy(&self) -> Remedy {
        self.remedy
    }
}

#[async_trait]
impl CorrectiveAction for StandardAction {
    fn name(&self) -> &str {
        self.remedy.name()
    }

    fn category(&self) -> ActionCategory {
        self.remedy.category()
    }

    fn declared_impact(&self) -> f64 {
        self.remedy.declared_impact()
    }

    fn declared_accuracy(&self) -> f64 {
        self.remedy.declared_accuracy()
    }

    fn description(&self) -> &str {
        self.remedy.description()
    }

    fn application_domain(&self) -> &str {
        self.remedy.application_domain()
    }

    async fn apply(
        &self,
        snapshot: &MetricsSnapshot,
        remediator: &dyn Remediator,
    ) -> Result<MetricsSnapshot, OptimizerError> {
        remediator
            .remediate(&RemediationRequest {
                action: self.remedy.name(),
                category: self.remedy.category(),
            })
            .await?;

        let next = self.remedy.adjust(snapshot);
        debug!(action = self.remedy.name(), "{}", next);
        Ok(next)
    }
}

/// The standard catalog, in declaration order.
pub fn standard_catalog() -> Vec<Arc<dyn CorrectiveAction>> {
    Remedy::ALL
        .into_iter()
        .map(|remedy| Arc::new(StandardAction::new(remedy)) as Arc<dyn CorrectiveAction>)
        .collect()
}
