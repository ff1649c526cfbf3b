//! Closed-loop optimizer - scores process health and applies corrective actions.
//!
//! Two independent loops run once [`Optimizer::start`] is called:
//!
//! - **Optimization loop**: every `optimization_interval_ms`, run one pass
//!   (sample, score, act, validate).
//! - **Monitor loop**: on a shorter period, sample and score without acting,
//!   raising a degradation event when the score drops below the watermark.
//!
//! Passes never overlap. A pass requested while another is in flight is
//! skipped, not queued.

mod config;
mod phase;
mod report;

pub use config::{OptimizerConfig, OptimizerConfigBuilder};
pub use phase::{Activity, PassPhase};
pub use report::{OptimizerStatus, PassOutcome, PassReport};

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Instant;

use chrono::Utc;
use futures::FutureExt;
use tokio::sync::{RwLock, broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior, interval, timeout};
use tracing::{debug, error, info, warn};

use crate::actions::{ActionRegistry, ActionStatus, CorrectiveAction, NoopRemediator, Remediator};
use crate::error::OptimizerError;
use crate::events::{EventBus, EventEnvelope, OptimizerEvent};
use crate::metrics::{MetricsSampler, MetricsSnapshot, MetricsSource, ProcessProbe, SysinfoProbe};
use crate::score::{ScoreModel, ValidationThresholds};

/// A snapshot together with the score measured from it.
#[derive(Debug, Clone, Copy)]
struct Measurement {
    snapshot: MetricsSnapshot,
    efficiency: f64,
}

/// Handles for the two background loops.
struct Loops {
    shutdown: watch::Sender<bool>,
    _optimization: JoinHandle<()>,
    _monitor: JoinHandle<()>,
}

/// The optimizer. Owns the only shared mutable state: the current measurement.
pub struct Optimizer {
    config: OptimizerConfig,
    source: Arc<dyn MetricsSource>,
    registry: ActionRegistry,
    remediator: Arc<dyn Remediator>,
    scorer: ScoreModel,
    thresholds: ValidationThresholds,
    events: EventBus,
    /// Replaced as a whole, never edited in place
    state: RwLock<Measurement>,
    /// Current `PassPhase`; doubles as the reentrancy guard
    phase: AtomicU8,
    loops: Mutex<Option<Loops>>,
    /// When the OS started this process
    process_started: Instant,
}

impl Optimizer {
    /// Create an optimizer over the current process with the standard catalog.
    pub fn new(config: OptimizerConfig) -> Result<Self, OptimizerError> {
        Self::builder(config).build()
    }

    pub fn builder(config: OptimizerConfig) -> OptimizerBuilder {
        OptimizerBuilder::new(config)
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Subscribe to the event feed.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.events.subscribe()
    }

    #[inline]
    pub fn phase(&self) -> PassPhase {
        PassPhase::from_u8(self.phase.load(Ordering::Acquire))
    }

    #[inline]
    pub fn is_optimizing(&self) -> bool {
        self.phase().is_busy()
    }

    /// Whether the background loops are scheduled.
    pub fn is_running(&self) -> bool {
        self.loops
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub async fn current_efficiency(&self) -> f64 {
        self.state.read().await.efficiency
    }

    /// Copy of the current snapshot.
    pub async fn metrics(&self) -> MetricsSnapshot {
        self.state.read().await.snapshot
    }

    pub fn algorithm_status(&self) -> Vec<ActionStatus> {
        self.registry.status()
    }

    pub async fn status(&self) -> OptimizerStatus {
        OptimizerStatus {
            status: self.phase().activity(),
            efficiency: self.current_efficiency().await,
            target_efficiency: self.config.target_optimization,
            algorithms_active: self.registry.len(),
            uptime_seconds: self.process_started.elapsed().as_secs_f64(),
        }
    }

    /// Start the optimization and monitor loops. Subscribe first to see the
    /// first pass's events. Must be called from within a Tokio runtime.
    ///
    /// The first pass and the first monitor reading happen immediately.
    /// Calling this while already running does nothing.
    pub fn start(self: &Arc<Self>) {
        let mut loops = self.loops.lock().unwrap_or_else(PoisonError::into_inner);
        if loops.is_some() {
            warn!("Optimizer already running");
            return;
        }

        let (shutdown, shutdown_rx) = watch::channel(false);
        let optimization = tokio::spawn(optimization_loop(
            Arc::downgrade(self),
            self.config.optimization_interval(),
            shutdown_rx.clone(),
        ));
        let monitor = tokio::spawn(monitor_loop(
            Arc::downgrade(self),
            self.config.monitor_interval(),
            shutdown_rx,
        ));

        *loops = Some(Loops {
            shutdown,
            _optimization: optimization,
            _monitor: monitor,
        });

        info!(
            "Optimizer started: target {:.4}, interval {:?}, monitor {:?}, {} actions",
            self.config.target_optimization,
            self.config.optimization_interval(),
            self.config.monitor_interval(),
            self.registry.len()
        );
    }

    /// Cancel both loops. A pass already in flight runs to completion, but no
    /// further pass is scheduled.
    pub fn stop(&self) {
        let loops = self
            .loops
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match loops {
            Some(loops) => {
                loops.shutdown.send_replace(true);
                info!("Optimizer stopped");
            }
            None => debug!("Optimizer not running"),
        }
    }

    /// Run a pass now, outside the schedule. Skipped if one is in flight.
    pub async fn force_run(&self) -> PassOutcome {
        info!("Manual optimization requested");
        self.run_pass().await
    }

    /// Run one pass: sample, score, and if below target apply actions in
    /// priority order, then validate.
    pub async fn run_pass(&self) -> PassOutcome {
        let Some(guard) = PassGuard::acquire(&self.phase) else {
            debug!("Optimization already in progress, skipping");
            return PassOutcome::Skipped;
        };
        let started = Instant::now();
        let target = self.config.target_optimization;

        let previous = self.metrics().await;
        let snapshot = self.source.sample(&previous, target);

        guard.enter(PassPhase::Scoring);
        let initial = self.record(snapshot).await;
        debug!("Measured {:.5} against target {:.4} ({})", initial, target, snapshot);

        if initial >= target {
            info!("Target efficiency met: {:.5}", initial);
            self.events
                .publish(OptimizerEvent::EfficiencyAchieved { efficiency: initial });
            return PassOutcome::TargetMet { efficiency: initial };
        }

        guard.enter(PassPhase::Optimizing);
        let mut working = snapshot;
        let mut estimate = initial;
        let mut applied = Vec::new();

        for action in self.registry.by_priority() {
            if estimate >= target {
                break;
            }
            info!("Executing {}", action.name());

            match self.apply(action.as_ref(), &working).await {
                Ok(next) => {
                    working = next;
                    self.record(working).await;
                    estimate = (estimate + action.declared_impact()).min(target);
                    applied.push(action.name().to_string());
                    debug!("Estimated efficiency after {}: {:.5}", action.name(), estimate);
                    self.events.publish(OptimizerEvent::EfficiencyUpdated {
                        algorithm: action.name().to_string(),
                        efficiency: estimate,
                    });
                }
                Err(e) => {
                    error!("Optimization failed in {}: {}", action.name(), e);
                    self.events.publish(OptimizerEvent::OptimizationError {
                        action: action.name().to_string(),
                        error: e.to_string(),
                    });
                    return PassOutcome::Failed {
                        action: action.name().to_string(),
                        error: e.to_string(),
                        actions_applied: applied,
                    };
                }
            }
        }

        guard.enter(PassPhase::Validating);
        // The measurement supersedes the running estimate
        let efficiency = self.scorer.compute(&working);
        let validation = self.thresholds.check(&working, efficiency, target);
        if validation.all_passed() {
            info!("All optimization targets achieved");
            self.events.publish(OptimizerEvent::ValidationSuccess(validation));
        } else {
            warn!("Optimization targets not met: {}", validation.failures().join(", "));
            self.events.publish(OptimizerEvent::ValidationWarning(validation));
        }

        let optimization_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        info!(
            "Optimization complete: {:.5} -> {:.5} in {:.1}ms ({} actions)",
            initial,
            efficiency,
            optimization_time_ms,
            applied.len()
        );
        self.events.publish(OptimizerEvent::OptimizationComplete {
            efficiency,
            optimization_time_ms,
            metrics: working,
        });

        PassOutcome::Completed(PassReport {
            initial_efficiency: initial,
            estimated_efficiency: estimate,
            efficiency,
            actions_applied: applied,
            validation,
            optimization_time_ms,
            metrics: working,
        })
    }

    /// Take one read-only reading: sample, score, publish. Never applies an
    /// action and never touches the stored measurement.
    pub async fn monitor_once(&self) -> f64 {
        let current = self.metrics().await;
        let snapshot = self.source.sample(&current, self.config.target_optimization);
        let efficiency = self.scorer.compute(&snapshot);

        self.events.publish(OptimizerEvent::PerformanceUpdate {
            efficiency,
            metrics: snapshot,
            timestamp: Utc::now(),
        });

        let watermark = self.config.degradation_watermark;
        if efficiency < watermark {
            warn!("Performance degraded: {:.5} < {:.4} ({})", efficiency, watermark, snapshot);
            self.events.publish(OptimizerEvent::PerformanceDegradation {
                efficiency,
                watermark,
                metrics: snapshot,
            });
        }
        efficiency
    }

    /// Store a snapshot with its measured score, replacing the previous pair.
    async fn record(&self, snapshot: MetricsSnapshot) -> f64 {
        let efficiency = self.scorer.compute(&snapshot);
        *self.state.write().await = Measurement {
            snapshot,
            efficiency,
        };
        efficiency
    }

    /// Apply one action under the per-action timeout. A panic inside the
    /// action is reported as a remediation failure.
    async fn apply(
        &self,
        action: &dyn CorrectiveAction,
        snapshot: &MetricsSnapshot,
    ) -> Result<MetricsSnapshot, OptimizerError> {
        let limit = self.config.action_timeout();
        let work =
            AssertUnwindSafe(action.apply(snapshot, self.remediator.as_ref())).catch_unwind();
        match timeout(limit, work).await {
            Ok(Ok(result)) => result.map(|next| next.sanitized(snapshot)),
            Ok(Err(_)) => Err(OptimizerError::remediation(action.name(), "panicked")),
            Err(_) => Err(OptimizerError::ActionTimedOut {
                action: action.name().to_string(),
                timeout_ms: self.config.action_timeout_ms,
            }),
        }
    }
}

impl std::fmt::Debug for Optimizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Optimizer")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

/// Holds the pass phase away from `Idle` for the lifetime of a pass.
///
/// Dropping the guard always releases it, whether the pass completed,
/// failed, or its future was dropped.
struct PassGuard<'a> {
    phase: &'a AtomicU8,
}

impl<'a> PassGuard<'a> {
    fn acquire(phase: &'a AtomicU8) -> Option<Self> {
        phase
            .compare_exchange(
                PassPhase::Idle.as_u8(),
                PassPhase::Sampling.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .ok()
            .map(|_| Self { phase })
    }

    fn enter(&self, next: PassPhase) {
        self.phase.store(next.as_u8(), Ordering::Release);
    }
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.phase.store(PassPhase::Idle.as_u8(), Ordering::Release);
    }
}

/// Run a pass on every tick until shut down or the optimizer is dropped.
async fn optimization_loop(
    optimizer: Weak<Optimizer>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {}
        }
        let Some(optimizer) = optimizer.upgrade() else {
            break;
        };
        optimizer.run_pass().await;
    }
    debug!("Optimization loop exited");
}

/// Take a monitor reading on every tick until shut down or dropped.
async fn monitor_loop(
    optimizer: Weak<Optimizer>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {}
        }
        let Some(optimizer) = optimizer.upgrade() else {
            break;
        };
        optimizer.monitor_once().await;
    }
    debug!("Monitor loop exited");
}

/// Back-date `now` by the process uptime. Unknown uptime counts from now.
fn process_start(uptime_secs: Option<f64>) -> Instant {
    let now = Instant::now();
    uptime_secs
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .and_then(|uptime| now.checked_sub(uptime))
        .unwrap_or_else(|| {
            debug!("Process uptime unavailable, counting from now");
            now
        })
}

/// Assembles an [`Optimizer`] from its collaborators.
pub struct OptimizerBuilder {
    config: OptimizerConfig,
    source: Option<Arc<dyn MetricsSource>>,
    actions: Option<Vec<Arc<dyn CorrectiveAction>>>,
    remediator: Option<Arc<dyn Remediator>>,
    process: Option<Arc<dyn ProcessProbe>>,
    scorer: ScoreModel,
    thresholds: ValidationThresholds,
}

impl OptimizerBuilder {
    pub fn new(config: OptimizerConfig) -> Self {
        Self {
            config,
            source: None,
            actions: None,
            remediator: None,
            process: None,
            scorer: ScoreModel::default(),
            thresholds: ValidationThresholds::default(),
        }
    }

    /// Where snapshots come from (default: the current process via `sysinfo`).
    pub fn metrics_source(mut self, source: Arc<dyn MetricsSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Replace the standard catalog with a custom suite.
    pub fn actions(mut self, actions: Vec<Arc<dyn CorrectiveAction>>) -> Self {
        self.actions = Some(actions);
        self
    }

    /// The subsystem actions remediate (default: [`NoopRemediator`]).
    pub fn remediator(mut self, remediator: Arc<dyn Remediator>) -> Self {
        self.remediator = Some(remediator);
        self
    }

    /// Where process uptime for [`Optimizer::status`] is read from
    /// (default: [`SysinfoProbe`]).
    pub fn process_probe(mut self, probe: Arc<dyn ProcessProbe>) -> Self {
        self.process = Some(probe);
        self
    }

    pub fn score_model(mut self, scorer: ScoreModel) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn validation_thresholds(mut self, thresholds: ValidationThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Validate everything and build. No timer is started.
    pub fn build(self) -> Result<Optimizer, OptimizerError> {
        self.config.validate()?;
        let registry = match self.actions {
            Some(actions) => ActionRegistry::from_actions(actions)?,
            None => ActionRegistry::standard(),
        };
        let source = self
            .source
            .unwrap_or_else(|| Arc::new(MetricsSampler::new()));
        let remediator = self.remediator.unwrap_or_else(|| Arc::new(NoopRemediator));
        let process = self
            .process
            .unwrap_or_else(|| Arc::new(SysinfoProbe::new()));
        let process_started = process_start(process.read().uptime_secs);

        let baseline = MetricsSnapshot::default();
        let state = Measurement {
            snapshot: baseline,
            efficiency: self.scorer.compute(&baseline),
        };

        Ok(Optimizer {
            events: EventBus::new(self.config.event_capacity),
            config: self.config,
            source,
            registry,
            remediator,
            scorer: self.scorer,
            thresholds: self.thresholds,
            state: RwLock::new(state),
            phase: AtomicU8::new(PassPhase::Idle.as_u8()),
            loops: Mutex::new(None),
            process_started,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{ActionCategory, RemediationRequest};
    use crate::metrics::{FixedSource, ProcessCounters};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::broadcast::error::TryRecvError;

    /// Scores 0.97445 under the standard weights.
    fn reference() -> MetricsSnapshot {
        MetricsSnapshot {
            system_efficiency: 0.999,
            processing_speed: 1000.0,
            accuracy: 0.999,
            resource_utilization: 0.75,
            error_rate: 0.001,
            throughput: 1000.0,
            latency: 50.0,
        }
    }

    /// Scores 0.80 under the standard weights.
    fn degraded() -> MetricsSnapshot {
        MetricsSnapshot {
            system_efficiency: 0.74,
            processing_speed: 800.0,
            accuracy: 0.8,
            resource_utilization: 0.75,
            error_rate: 0.2,
            throughput: 800.0,
            latency: 50.0,
        }
    }

    #[derive(Default)]
    struct CountingRemediator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Remediator for CountingRemediator {
        async fn remediate(&self, _request: &RemediationRequest<'_>) -> Result<(), OptimizerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Test action with a configurable delay and outcome.
    struct Scripted {
        name: &'static str,
        impact: f64,
        delay: Duration,
        fail: bool,
        panic: bool,
        calls: Arc<AtomicUsize>,
    }

    impl Scripted {
        fn new(name: &'static str, impact: f64) -> Self {
            Self {
                name,
                impact,
                delay: Duration::ZERO,
                fail: false,
                panic: false,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl CorrectiveAction for Scripted {
        fn name(&self) -> &str {
            self.name
        }
        fn category(&self) -> ActionCategory {
            ActionCategory::Analysis
        }
        fn declared_impact(&self) -> f64 {
            self.impact
        }
        fn declared_accuracy(&self) -> f64 {
            0.999
        }
        fn application_domain(&self) -> &str {
            "tests"
        }
        async fn apply(
            &self,
            snapshot: &MetricsSnapshot,
            _remediator: &dyn Remediator,
        ) -> Result<MetricsSnapshot, OptimizerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.panic {
                panic!("{} blew up", self.name);
            }
            if self.fail {
                return Err(OptimizerError::remediation(self.name, "rejected"));
            }
            Ok(*snapshot)
        }
    }

    struct UptimeProbe(f64);

    impl ProcessProbe for UptimeProbe {
        fn read(&self) -> ProcessCounters {
            ProcessCounters {
                uptime_secs: Some(self.0),
                ..Default::default()
            }
        }
    }

    fn optimizer_with(snapshot: MetricsSnapshot, config: OptimizerConfig) -> OptimizerBuilder {
        Optimizer::builder(config).metrics_source(Arc::new(FixedSource::new(snapshot)))
    }

    fn drain(rx: &mut broadcast::Receiver<EventEnvelope>) -> Vec<OptimizerEvent> {
        let mut events = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(envelope) => events.push(envelope.event),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
        events
    }

    fn names(events: &[OptimizerEvent]) -> Vec<&'static str> {
        events.iter().map(|e| e.name()).collect()
    }

    async fn wait_for(
        rx: &mut broadcast::Receiver<EventEnvelope>,
        name: &str,
        within: Duration,
    ) -> Option<OptimizerEvent> {
        tokio::time::timeout(within, async {
            loop {
                match rx.recv().await {
                    Ok(envelope) if envelope.event.name() == name => return Some(envelope.event),
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
        .await
        .ok()
        .flatten()
    }

    #[test]
    fn test_invalid_config_fails_at_construction() {
        let config = OptimizerConfig::builder().target(0.0).build();
        assert!(matches!(
            Optimizer::new(config),
            Err(OptimizerError::InvalidConfig(_))
        ));

        let config = OptimizerConfig::builder().interval_ms(0).build();
        assert!(Optimizer::new(config).is_err());
    }

    #[test]
    fn test_empty_suite_fails_at_construction() {
        let result = Optimizer::builder(OptimizerConfig::default())
            .actions(Vec::new())
            .build();
        assert!(matches!(result, Err(OptimizerError::EmptyCatalog)));
    }

    #[tokio::test]
    async fn test_initial_status() {
        let optimizer = Optimizer::new(OptimizerConfig::default()).unwrap();
        let status = optimizer.status().await;

        assert_eq!(status.status, Activity::Monitoring);
        assert_eq!(status.target_efficiency, 0.999);
        assert_eq!(status.algorithms_active, 6);
        assert!((status.efficiency - 0.97445).abs() < 1e-9);
        assert!(status.uptime_seconds >= 0.0);
        assert_eq!(optimizer.metrics().await, MetricsSnapshot::default());
        assert_eq!(optimizer.algorithm_status().len(), 6);
        assert!(!optimizer.is_running());
    }

    #[tokio::test]
    async fn test_converged_snapshot_meets_target_without_actions() {
        let remediator = Arc::new(CountingRemediator::default());
        let optimizer = optimizer_with(
            reference(),
            OptimizerConfig::builder().target(0.97).build(),
        )
        .remediator(remediator.clone())
        .build()
        .unwrap();
        let mut rx = optimizer.subscribe();

        let outcome = optimizer.run_pass().await;

        assert!(matches!(outcome, PassOutcome::TargetMet { .. }));
        assert_eq!(outcome.actions_applied(), 0);
        assert_eq!(remediator.calls.load(Ordering::SeqCst), 0);
        assert_eq!(names(&drain(&mut rx)), vec!["efficiency-achieved"]);
        assert!(!optimizer.is_optimizing());
    }

    #[tokio::test]
    async fn test_pass_applies_actions_in_priority_order() {
        let remediator = Arc::new(CountingRemediator::default());
        let optimizer = optimizer_with(reference(), OptimizerConfig::default())
            .remediator(remediator.clone())
            .build()
            .unwrap();
        let mut rx = optimizer.subscribe();

        let PassOutcome::Completed(report) = optimizer.run_pass().await else {
            panic!("expected a completed pass");
        };

        // Declared impacts add up to 0.011, never enough to reach 0.999
        assert_eq!(
            report.actions_applied,
            vec![
                "Predictive Tuning",
                "Analysis Optimization",
                "Resource Reallocation",
                "Data-Path Optimization",
                "Error-Correction",
                "Hardening Pass",
            ]
        );
        assert_eq!(remediator.calls.load(Ordering::SeqCst), 6);

        let events = drain(&mut rx);
        let mut running = report.initial_efficiency;
        for event in &events {
            if let OptimizerEvent::EfficiencyUpdated { efficiency, .. } = event {
                assert!(*efficiency >= running, "running score decreased");
                running = *efficiency;
            }
        }
        assert!((running - report.estimated_efficiency).abs() < 1e-12);

        let tail: Vec<_> = names(&events).into_iter().rev().take(2).collect();
        assert_eq!(tail, vec!["optimization-complete", "validation-warning"]);

        // The measured score on the post-action snapshot is what gets stored
        assert!((report.efficiency - 0.97745).abs() < 1e-9);
        assert_eq!(optimizer.metrics().await, report.metrics);
        assert_eq!(optimizer.current_efficiency().await, report.efficiency);
    }

    #[tokio::test]
    async fn test_pass_stops_once_estimate_reaches_target() {
        let optimizer = optimizer_with(
            reference(),
            OptimizerConfig::builder().target(0.976).build(),
        )
        .build()
        .unwrap();
        let mut rx = optimizer.subscribe();

        let PassOutcome::Completed(report) = optimizer.run_pass().await else {
            panic!("expected a completed pass");
        };

        assert_eq!(report.actions_applied, vec!["Predictive Tuning"]);
        assert_eq!(report.estimated_efficiency, 0.976);
        assert!(report.validation.all_passed());

        let events = drain(&mut rx);
        assert_eq!(
            names(&events),
            vec!["efficiency-updated", "validation-success", "optimization-complete"]
        );
        assert_eq!(
            events[0],
            OptimizerEvent::EfficiencyUpdated {
                algorithm: "Predictive Tuning".to_string(),
                efficiency: 0.976,
            }
        );
    }

    #[tokio::test]
    async fn test_force_run_is_not_reentrant() {
        let mut slow = Scripted::new("Slow", 0.5);
        slow.delay = Duration::from_millis(300);
        let calls = slow.calls.clone();

        let optimizer = Arc::new(
            optimizer_with(reference(), OptimizerConfig::default())
                .actions(vec![Arc::new(slow) as Arc<dyn CorrectiveAction>])
                .build()
                .unwrap(),
        );

        let first = {
            let optimizer = Arc::clone(&optimizer);
            tokio::spawn(async move { optimizer.force_run().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(optimizer.is_optimizing());
        assert_eq!(optimizer.status().await.status, Activity::Optimizing);
        assert!(optimizer.force_run().await.is_skipped());

        let outcome = first.await.unwrap();
        assert!(matches!(outcome, PassOutcome::Completed(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!optimizer.is_optimizing());
    }

    #[tokio::test]
    async fn test_failing_action_is_contained() {
        let mut failing = Scripted::new("Failing", 0.5);
        failing.fail = true;
        let next = Scripted::new("Next", 0.1);
        let next_calls = next.calls.clone();

        let optimizer = optimizer_with(reference(), OptimizerConfig::default())
            .actions(vec![
                Arc::new(next) as Arc<dyn CorrectiveAction>,
                Arc::new(failing),
            ])
            .build()
            .unwrap();
        let mut rx = optimizer.subscribe();

        let outcome = optimizer.run_pass().await;

        assert!(matches!(&outcome, PassOutcome::Failed { action, .. } if action == "Failing"));
        assert_eq!(outcome.actions_applied(), 0);
        assert_eq!(next_calls.load(Ordering::SeqCst), 0);
        assert!(!optimizer.is_optimizing());

        let events = drain(&mut rx);
        let errors = events
            .iter()
            .filter(|e| matches!(e, OptimizerEvent::OptimizationError { .. }))
            .count();
        assert_eq!(errors, 1);
        assert!(!names(&events).contains(&"optimization-complete"));

        let status = optimizer.status().await;
        assert_eq!(status.status, Activity::Monitoring);

        // The next pass is unaffected by the previous failure
        assert!(matches!(optimizer.run_pass().await, PassOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn test_failed_pass_reports_completed_actions() {
        let first = Scripted::new("First", 0.002);
        let mut failing = Scripted::new("Failing", 0.001);
        failing.fail = true;

        let optimizer = optimizer_with(reference(), OptimizerConfig::default())
            .actions(vec![
                Arc::new(failing) as Arc<dyn CorrectiveAction>,
                Arc::new(first),
            ])
            .build()
            .unwrap();

        let outcome = optimizer.run_pass().await;

        let PassOutcome::Failed {
            action,
            actions_applied,
            ..
        } = &outcome
        else {
            panic!("expected a failed pass");
        };
        assert_eq!(action, "Failing");
        assert_eq!(actions_applied, &vec!["First".to_string()]);
        assert_eq!(outcome.actions_applied(), 1);
    }

    #[tokio::test]
    async fn test_panicking_action_is_contained() {
        let mut panicking = Scripted::new("Panicking", 0.5);
        panicking.panic = true;

        let optimizer = optimizer_with(reference(), OptimizerConfig::default())
            .actions(vec![Arc::new(panicking) as Arc<dyn CorrectiveAction>])
            .build()
            .unwrap();
        let mut rx = optimizer.subscribe();

        let PassOutcome::Failed { action, error, .. } = optimizer.run_pass().await else {
            panic!("expected a failed pass");
        };
        assert_eq!(action, "Panicking");
        assert!(error.contains("panicked"));
        assert!(!optimizer.is_optimizing());
        assert_eq!(names(&drain(&mut rx)), vec!["optimization-error"]);
    }

    #[tokio::test]
    async fn test_scheduled_loop_survives_panicking_action() {
        let mut panicking = Scripted::new("Panicking", 0.5);
        panicking.panic = true;
        let calls = panicking.calls.clone();

        let config = OptimizerConfig::builder()
            .interval_ms(50)
            .monitor_interval_ms(10_000)
            .build();
        let optimizer = Arc::new(
            optimizer_with(reference(), config)
                .actions(vec![Arc::new(panicking) as Arc<dyn CorrectiveAction>])
                .build()
                .unwrap(),
        );
        let mut rx = optimizer.subscribe();

        optimizer.start();
        for _ in 0..3 {
            assert!(
                wait_for(&mut rx, "optimization-error", Duration::from_secs(2))
                    .await
                    .is_some()
            );
        }

        assert!(calls.load(Ordering::SeqCst) >= 3);
        assert!(optimizer.is_running());
        optimizer.stop();
    }

    #[tokio::test]
    async fn test_status_reports_process_uptime() {
        let optimizer = optimizer_with(reference(), OptimizerConfig::default())
            .process_probe(Arc::new(UptimeProbe(30.0)))
            .build()
            .unwrap();

        let status = optimizer.status().await;
        assert!(status.uptime_seconds >= 30.0);
        assert!(status.uptime_seconds < 90.0);
    }

    #[test]
    fn test_process_start_without_uptime_counts_from_now() {
        let before = Instant::now();
        assert!(process_start(None) >= before);
        assert!(process_start(Some(f64::NAN)) >= before);
        assert!(process_start(Some(-1.0)) >= before);
    }

    #[tokio::test]
    async fn test_hanging_action_times_out() {
        let mut hanging = Scripted::new("Hanging", 0.5);
        hanging.delay = Duration::from_secs(10);

        let optimizer = optimizer_with(
            reference(),
            OptimizerConfig::builder().action_timeout_ms(50).build(),
        )
        .actions(vec![Arc::new(hanging) as Arc<dyn CorrectiveAction>])
        .build()
        .unwrap();

        let outcome = optimizer.run_pass().await;
        let PassOutcome::Failed { action, error, .. } = outcome else {
            panic!("expected a failed pass");
        };
        assert_eq!(action, "Hanging");
        assert!(error.contains("timed out"));
        assert!(!optimizer.is_optimizing());
    }

    #[tokio::test]
    async fn test_monitor_raises_degradation_without_acting() {
        let remediator = Arc::new(CountingRemediator::default());
        let optimizer = optimizer_with(degraded(), OptimizerConfig::default())
            .remediator(remediator.clone())
            .build()
            .unwrap();
        let mut rx = optimizer.subscribe();
        let before = optimizer.metrics().await;

        let efficiency = optimizer.monitor_once().await;

        assert!((efficiency - 0.80).abs() < 1e-9);
        let events = drain(&mut rx);
        assert_eq!(
            names(&events),
            vec!["performance-update", "performance-degradation"]
        );
        assert_eq!(remediator.calls.load(Ordering::SeqCst), 0);
        // Read-only: the stored measurement is untouched
        assert_eq!(optimizer.metrics().await, before);
    }

    #[tokio::test]
    async fn test_monitor_healthy_reading() {
        let optimizer = optimizer_with(
            reference(),
            OptimizerConfig::builder().degradation_watermark(0.95).build(),
        )
        .build()
        .unwrap();
        let mut rx = optimizer.subscribe();

        optimizer.monitor_once().await;

        assert_eq!(names(&drain(&mut rx)), vec!["performance-update"]);
    }

    #[tokio::test]
    async fn test_start_runs_first_pass_immediately() {
        let config = OptimizerConfig::builder()
            .interval_ms(60_000)
            .monitor_interval_ms(60_000)
            .build();
        let optimizer = Arc::new(optimizer_with(reference(), config).build().unwrap());
        let mut rx = optimizer.subscribe();

        optimizer.start();
        assert!(optimizer.is_running());

        let complete = wait_for(&mut rx, "optimization-complete", Duration::from_secs(2)).await;
        assert!(complete.is_some());
        optimizer.stop();
        assert!(!optimizer.is_running());
    }

    #[tokio::test]
    async fn test_stop_halts_scheduled_passes() {
        let config = OptimizerConfig::builder()
            .interval_ms(50)
            .monitor_interval_ms(10_000)
            .build();
        let optimizer = Arc::new(optimizer_with(reference(), config).build().unwrap());
        let mut rx = optimizer.subscribe();

        optimizer.start();
        assert!(
            wait_for(&mut rx, "optimization-complete", Duration::from_secs(2))
                .await
                .is_some()
        );

        optimizer.stop();
        // Let any in-flight pass finish, then discard what it emitted
        tokio::time::sleep(Duration::from_millis(50)).await;
        drain(&mut rx);

        tokio::time::sleep(Duration::from_millis(200)).await;
        let late = drain(&mut rx);
        assert!(!names(&late).contains(&"optimization-complete"));
    }

    #[tokio::test]
    async fn test_start_twice_is_ignored() {
        let config = OptimizerConfig::builder().interval_ms(60_000).build();
        let optimizer = Arc::new(optimizer_with(reference(), config).build().unwrap());

        optimizer.start();
        optimizer.start();
        assert!(optimizer.is_running());

        optimizer.stop();
        optimizer.stop();
        assert!(!optimizer.is_running());
    }
}
