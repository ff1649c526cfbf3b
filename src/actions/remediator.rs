//! The subsystem that corrective actions actually act upon.

use async_trait::async_trait;

use crate::error::OptimizerError;

use super::ActionCategory;

/// What a corrective action asks the remediated subsystem to do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RemediationRequest<'a> {
    pub action: &'a str,
    pub category: ActionCategory,
}

/// Collaborator that performs the real remediation work.
///
/// Corrective actions call into this instead of owning any side effects, so
/// a host can plug in cache flushes, pool resizing, and so on. Returning an
/// error aborts the current pass.
#[async_trait]
pub trait Remediator: Send + Sync {
    async fn remediate(&self, request: &RemediationRequest<'_>) -> Result<(), OptimizerError>;
}

/// Remediator with no side effects. Actions still adjust the sampled metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRemediator;

#[async_trait]
impl Remediator for NoopRemediator {
    async fn remediate(&self, _request: &RemediationRequest<'_>) -> Result<(), OptimizerError> {
        Ok(())
    }
}
