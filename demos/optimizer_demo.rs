//! Optimizer Demo - closed-loop efficiency tuning
//!
//! Runs the optimizer against the current process and prints every event
//! it publishes as JSON.
//!
//! Run with: cargo run --example optimizer_demo
//! Tune with the OPTIMIZER_* environment variables (see `OptimizerConfig::from_env`).

use forge_optimizer::{Optimizer, OptimizerConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("info,forge_optimizer=debug"))
        .init();

    let mut config = OptimizerConfig::from_env();
    if std::env::var("OPTIMIZER_INTERVAL_MS").is_err() {
        // Faster than the default so the demo shows a few passes
        config.optimization_interval_ms = 3_000;
    }

    println!("Optimizer Configuration:");
    println!("  • Target: {:.4}", config.target_optimization);
    println!("  • Pass Interval: {}ms", config.optimization_interval_ms);
    println!("  • Monitor Interval: {:?}", config.monitor_interval());
    println!("  • Degradation Watermark: {:.4}\n", config.degradation_watermark);

    // Subscribe before starting so the first pass is not missed
    let optimizer = Arc::new(Optimizer::new(config)?);
    let mut events = optimizer.subscribe();
    optimizer.start();

    for action in optimizer.algorithm_status() {
        println!("  [{}] {} - {}", action.category, action.name, action.application_domain);
    }
    println!();

    let deadline = tokio::time::sleep(Duration::from_secs(15));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            event = events.recv() => match event {
                Ok(envelope) => println!("{}", envelope.to_json()?),
                Err(RecvError::Lagged(missed)) => println!("(missed {missed} events)"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    optimizer.stop();
    let status = optimizer.status().await;
    println!("\nFinal status: {}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
