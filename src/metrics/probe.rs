//! Raw process counters read from the operating system.

use std::sync::Mutex;

use sysinfo::{Pid, ProcessesToUpdate, System};
use tracing::debug;

/// Raw counters for the current process.
///
/// Every field is optional: a counter the platform cannot provide is `None`
/// and the sampler substitutes a safe default instead of failing.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProcessCounters {
    /// Seconds since the process started
    pub uptime_secs: Option<f64>,
    /// Memory in use on the host in bytes
    pub memory_used_bytes: Option<u64>,
    /// Total memory on the host in bytes
    pub memory_total_bytes: Option<u64>,
    /// Process CPU usage normalized over all cores (0.0 - 1.0)
    pub cpu_fraction: Option<f64>,
}

impl ProcessCounters {
    /// Memory in use relative to the total, if both counters are readable.
    pub fn memory_ratio(&self) -> Option<f64> {
        match (self.memory_used_bytes, self.memory_total_bytes) {
            (Some(used), Some(total)) if total > 0 => Some(used as f64 / total as f64),
            _ => None,
        }
    }
}

/// Source of raw process counters.
pub trait ProcessProbe: Send + Sync {
    /// Read the counters. Must not fail; unreadable counters are `None`.
    fn read(&self) -> ProcessCounters;
}

/// Reads counters for the current process through `sysinfo`.
pub struct SysinfoProbe {
    sys: Mutex<System>,
    pid: Option<Pid>,
}

impl SysinfoProbe {
    pub fn new() -> Self {
        let pid = sysinfo::get_current_pid().ok();
        if pid.is_none() {
            debug!("Current pid unavailable, process counters will use defaults");
        }
        Self {
            sys: Mutex::new(System::new()),
            pid,
        }
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessProbe for SysinfoProbe {
    fn read(&self) -> ProcessCounters {
        let Some(pid) = self.pid else {
            return ProcessCounters::default();
        };
        let mut sys = self.sys.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        // Refresh only CPU, memory and the one process we care about
        sys.refresh_cpu_usage();
        sys.refresh_memory();
        sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

        let total = sys.total_memory();
        let (memory_used_bytes, memory_total_bytes) = if total > 0 {
            (Some(sys.used_memory()), Some(total))
        } else {
            (None, None)
        };

        let cores = sys.cpus().len().max(1) as f64;
        match sys.process(pid) {
            Some(process) => ProcessCounters {
                uptime_secs: Some(process.run_time() as f64),
                memory_used_bytes,
                memory_total_bytes,
                cpu_fraction: Some((process.cpu_usage() as f64 / 100.0 / cores).clamp(0.0, 1.0)),
            },
            None => ProcessCounters {
                memory_used_bytes,
                memory_total_bytes,
                ..Default::default()
            },
        }
    }
}
