//! Pass phase state machine.

use serde::Serialize;

/// Where the optimizer is within a pass.
///
/// `Idle -> Sampling -> Scoring -> Idle` when the target is already met,
/// `Idle -> Sampling -> Scoring -> Optimizing -> Validating -> Idle` otherwise.
/// Any phase other than `Idle` means a pass is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum PassPhase {
    /// No pass running.
    #[default]
    Idle = 0,
    /// Reading process counters.
    Sampling = 1,
    /// Reducing the snapshot to a score.
    Scoring = 2,
    /// Applying corrective actions.
    Optimizing = 3,
    /// Re-scoring and checking thresholds.
    Validating = 4,
}

impl PassPhase {
    /// Convert to u8 for atomic storage.
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Convert from u8 (from atomic load).
    #[inline]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Sampling,
            2 => Self::Scoring,
            3 => Self::Optimizing,
            4 => Self::Validating,
            _ => Self::Idle,
        }
    }

    #[inline]
    pub const fn is_busy(&self) -> bool {
        !matches!(self, Self::Idle)
    }

    /// Coarse activity reported on the status surface.
    pub const fn activity(&self) -> Activity {
        if self.is_busy() {
            Activity::Optimizing
        } else {
            Activity::Monitoring
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Sampling => "sampling",
            Self::Scoring => "scoring",
            Self::Optimizing => "optimizing",
            Self::Validating => "validating",
        }
    }
}

impl std::fmt::Display for PassPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What the optimizer is doing, as seen from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Activity {
    /// A pass is in flight.
    Optimizing,
    /// Between passes; only the monitor loop is active.
    Monitoring,
}

impl std::fmt::Display for Activity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Optimizing => write!(f, "optimizing"),
            Self::Monitoring => write!(f, "monitoring"),
        }
    }
}
