use thiserror::Error;

#[derive(Error, Debug)]
pub enum OptimizerError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Action catalog is empty")]
    EmptyCatalog,

    #[error("Duplicate action name: {0}")]
    DuplicateAction(String),

    #[error("Remediation failed in {action}: {reason}")]
    Remediation { action: String, reason: String },

    #[error("Action {action} timed out after {timeout_ms}ms")]
    ActionTimedOut { action: String, timeout_ms: u64 },

    #[error("Failed to serialize event: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl OptimizerError {
    /// Shorthand for collaborators reporting a failed remediation.
    pub fn remediation(action: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Remediation {
            action: action.into(),
            reason: reason.into(),
        }
    }
}
