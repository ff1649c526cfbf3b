//! Corrective actions and the registry that orders them.

mod catalog;
mod remediator;

pub use catalog::{Remedy, StandardAction, standard_catalog};
pub use remediator::{NoopRemediator, RemediationRequest, Remediator};

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::OptimizerError;
use crate::metrics::MetricsSnapshot;

/// Broad area a corrective action works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionCategory {
    Resource,
    Analysis,
    Prediction,
    Security,
}

impl ActionCategory {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Resource => "resource",
            Self::Analysis => "analysis",
            Self::Prediction => "prediction",
            Self::Security => "security",
        }
    }
}

impl std::fmt::Display for ActionCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named remediation step with a static priority.
///
/// `declared_impact` orders actions within a pass and feeds the running score
/// estimate; it is not a promise about the measured effect.
#[async_trait]
pub trait CorrectiveAction: Send + Sync {
    fn name(&self) -> &str;

    fn category(&self) -> ActionCategory;

    fn declared_impact(&self) -> f64;

    fn declared_accuracy(&self) -> f64;

    fn description(&self) -> &str {
        ""
    }

    /// Human description of where this action applies.
    fn application_domain(&self) -> &str;

    /// Run the remediation and return the snapshot as it stands afterwards.
    ///
    /// Must be safe to call repeatedly: every adjustment is bounded.
    async fn apply(
        &self,
        snapshot: &MetricsSnapshot,
        remediator: &dyn Remediator,
    ) -> Result<MetricsSnapshot, OptimizerError>;
}

/// Public view of a registered action.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionStatus {
    pub name: String,
    pub category: ActionCategory,
    pub application_domain: String,
}

/// Immutable catalog of corrective actions.
///
/// Membership is fixed at construction; only the priority order is
/// recomputed, once per pass.
#[derive(Clone)]
pub struct ActionRegistry {
    actions: Vec<Arc<dyn CorrectiveAction>>,
}

impl ActionRegistry {
    /// Registry holding the six standard actions.
    pub fn standard() -> Self {
        Self {
            actions: standard_catalog(),
        }
    }

    /// Registry over a caller-supplied suite.
    ///
    /// Rejects an empty suite, duplicate names, and impacts that are negative
    /// or not finite.
    pub fn from_actions(actions: Vec<Arc<dyn CorrectiveAction>>) -> Result<Self, OptimizerError> {
        if actions.is_empty() {
            return Err(OptimizerError::EmptyCatalog);
        }

        let mut seen = HashSet::new();
        for action in &actions {
            if !seen.insert(action.name().to_string()) {
                return Err(OptimizerError::DuplicateAction(action.name().to_string()));
            }
            let impact = action.declared_impact();
            if !impact.is_finite() || impact < 0.0 {
                return Err(OptimizerError::InvalidConfig(format!(
                    "action {} declares impact {}, expected a finite value >= 0",
                    action.name(),
                    impact
                )));
            }
        }

        Ok(Self { actions })
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Actions ordered by declared impact, highest first. Ties keep catalog order.
    pub fn by_priority(&self) -> Vec<Arc<dyn CorrectiveAction>> {
        let mut ordered = self.actions.clone();
        ordered.sort_by(|a, b| b.declared_impact().total_cmp(&a.declared_impact()));
        ordered
    }

    pub fn status(&self) -> Vec<ActionStatus> {
        self.actions
            .iter()
            .map(|action| ActionStatus {
                name: action.name().to_string(),
                category: action.category(),
                application_domain: action.application_domain().to_string(),
            })
            .collect()
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.actions.iter().map(|a| a.name()))
            .finish()
    }
}
