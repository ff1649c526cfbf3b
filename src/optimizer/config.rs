//! Optimizer configuration with tunable thresholds.

use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::error::OptimizerError;

/// Configuration for the [`Optimizer`](super::Optimizer).
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerConfig {
    /// Score the optimization loop drives toward, in (0, 1] (default: 0.999)
    pub target_optimization: f64,
    /// Period of the optimization loop in milliseconds (default: 30000ms)
    pub optimization_interval_ms: u64,
    /// Period of the monitor loop; `None` means a sixth of the optimization interval
    pub monitor_interval_ms: Option<u64>,
    /// Score below which the monitor raises a degradation alarm (default: 0.995)
    pub degradation_watermark: f64,
    /// Upper bound on a single action's `apply()` (default: 5000ms)
    pub action_timeout_ms: u64,
    /// Events buffered per subscriber before the oldest are dropped (default: 256)
    pub event_capacity: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            target_optimization: 0.999,
            optimization_interval_ms: 30_000,
            monitor_interval_ms: None,
            degradation_watermark: 0.995,
            action_timeout_ms: 5_000,
            event_capacity: 256,
        }
    }
}

impl OptimizerConfig {
    /// Create a new config builder.
    pub fn builder() -> OptimizerConfigBuilder {
        OptimizerConfigBuilder::default()
    }

    /// Short intervals and a low watermark for hosts that want fast reaction.
    pub fn aggressive() -> Self {
        Self {
            optimization_interval_ms: 5_000,
            monitor_interval_ms: Some(1_000),
            degradation_watermark: 0.98,
            ..Default::default()
        }
    }

    /// Long intervals and a modest target for background services.
    pub fn relaxed() -> Self {
        Self {
            target_optimization: 0.95,
            optimization_interval_ms: 120_000,
            monitor_interval_ms: Some(30_000),
            degradation_watermark: 0.9,
            ..Default::default()
        }
    }

    /// Load configuration from environment variables with defaults.
    ///
    /// - `OPTIMIZER_TARGET`
    /// - `OPTIMIZER_INTERVAL_MS`
    /// - `OPTIMIZER_MONITOR_INTERVAL_MS`
    /// - `OPTIMIZER_DEGRADATION_WATERMARK`
    /// - `OPTIMIZER_ACTION_TIMEOUT_MS`
    ///
    /// Unparseable values are logged and the default is kept.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let value = |key: &str| lookup(key).map(|raw| (key.to_string(), raw));
        let mut config = Self::default();
        if let Some(v) = value("OPTIMIZER_TARGET").and_then(parse_var) {
            config.target_optimization = v;
        }
        if let Some(v) = value("OPTIMIZER_INTERVAL_MS").and_then(parse_var) {
            config.optimization_interval_ms = v;
        }
        if let Some(v) = value("OPTIMIZER_MONITOR_INTERVAL_MS").and_then(parse_var) {
            config.monitor_interval_ms = Some(v);
        }
        if let Some(v) = value("OPTIMIZER_DEGRADATION_WATERMARK").and_then(parse_var) {
            config.degradation_watermark = v;
        }
        if let Some(v) = value("OPTIMIZER_ACTION_TIMEOUT_MS").and_then(parse_var) {
            config.action_timeout_ms = v;
        }
        config
    }

    /// Reject values the optimizer cannot run with.
    pub fn validate(&self) -> Result<(), OptimizerError> {
        if !unit_interval(self.target_optimization) {
            return Err(OptimizerError::InvalidConfig(format!(
                "target_optimization must be in (0, 1], got {}",
                self.target_optimization
            )));
        }
        if self.optimization_interval_ms == 0 {
            return Err(OptimizerError::InvalidConfig(
                "optimization_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.monitor_interval_ms == Some(0) {
            return Err(OptimizerError::InvalidConfig(
                "monitor_interval_ms must be greater than zero".to_string(),
            ));
        }
        if !unit_interval(self.degradation_watermark) {
            return Err(OptimizerError::InvalidConfig(format!(
                "degradation_watermark must be in (0, 1], got {}",
                self.degradation_watermark
            )));
        }
        if self.action_timeout_ms == 0 {
            return Err(OptimizerError::InvalidConfig(
                "action_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(OptimizerError::InvalidConfig(
                "event_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn optimization_interval(&self) -> Duration {
        Duration::from_millis(self.optimization_interval_ms)
    }

    pub fn monitor_interval(&self) -> Duration {
        let ms = self
            .monitor_interval_ms
            .unwrap_or(self.optimization_interval_ms / 6)
            .max(1);
        Duration::from_millis(ms)
    }

    pub fn action_timeout(&self) -> Duration {
        Duration::from_millis(self.action_timeout_ms)
    }
}

fn unit_interval(value: f64) -> bool {
    value.is_finite() && value > 0.0 && value <= 1.0
}

fn parse_var<T: FromStr>((key, raw): (String, String)) -> Option<T> {
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring unparseable {}={:?}, using default", key, raw);
            None
        }
    }
}

/// Builder pattern for OptimizerConfig.
#[derive(Default)]
pub struct OptimizerConfigBuilder {
    config: OptimizerConfig,
}

impl OptimizerConfigBuilder {
    /// Set the target score.
    pub fn target(mut self, target: f64) -> Self {
        self.config.target_optimization = target;
        self
    }

    /// Set the optimization loop period in milliseconds.
    pub fn interval_ms(mut self, interval: u64) -> Self {
        self.config.optimization_interval_ms = interval;
        self
    }

    /// Set the monitor loop period in milliseconds.
    pub fn monitor_interval_ms(mut self, interval: u64) -> Self {
        self.config.monitor_interval_ms = Some(interval);
        self
    }

    /// Set the degradation watermark.
    pub fn degradation_watermark(mut self, watermark: f64) -> Self {
        self.config.degradation_watermark = watermark;
        self
    }

    /// Set the per-action timeout in milliseconds.
    pub fn action_timeout_ms(mut self, timeout: u64) -> Self {
        self.config.action_timeout_ms = timeout;
        self
    }

    /// Set the event channel capacity.
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> OptimizerConfig {
        self.config
    }
}
