pub mod actions;
mod error;
pub mod events;
pub mod metrics;
pub mod optimizer;
pub mod score;

pub use actions::{ActionCategory, ActionRegistry, CorrectiveAction, Remediator};
pub use error::OptimizerError;
pub use events::{EventBus, EventEnvelope, OptimizerEvent};
pub use metrics::{MetricsSampler, MetricsSnapshot, MetricsSource};
pub use optimizer::{Optimizer, OptimizerConfig, OptimizerStatus, PassOutcome, PassPhase};
pub use score::{ScoreModel, ValidationReport};
