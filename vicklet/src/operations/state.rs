//! Backend lifecycle state and its Kubernetes phase mapping.
//!
//! The mapping is a const table so every row is visible at a glance:
//! ```text
//! Starting                    → Pending   (init F, ready F, sched T)
//! Running                     → Running   (init T, ready T, sched T)
//! Stopping                    → Running   (init T, ready F, sched T)
//! Stopped, Removing, Removed  → Succeeded (init T, ready F, sched T)
//! anything else               → Unknown   (all Unknown)
//! ```

use std::fmt;

use crate::runtime::constants::states;

/// Lifecycle state as reported by the portlayer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendState {
    Starting,
    Running,
    Stopping,
    Stopped,
    Removing,
    Removed,
    Error,
    /// Any string the backend reports that is not listed above.
    Unknown,
}

impl BackendState {
    /// Parse a backend state string. Unrecognized values map to `Unknown`.
    pub fn parse(s: &str) -> Self {
        match s {
            states::STARTING => BackendState::Starting,
            states::RUNNING => BackendState::Running,
            states::STOPPING => BackendState::Stopping,
            states::STOPPED => BackendState::Stopped,
            states::REMOVING => BackendState::Removing,
            states::REMOVED => BackendState::Removed,
            states::ERROR => BackendState::Error,
            _ => BackendState::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BackendState::Starting => states::STARTING,
            BackendState::Running => states::RUNNING,
            BackendState::Stopping => states::STOPPING,
            BackendState::Stopped => states::STOPPED,
            BackendState::Removing => states::REMOVING,
            BackendState::Removed => states::REMOVED,
            BackendState::Error => states::ERROR,
            BackendState::Unknown => "Unknown",
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, BackendState::Running)
    }

    /// Whether the pod must be force-stopped before removal.
    pub fn is_error(&self) -> bool {
        matches!(self, BackendState::Error)
    }

    /// Whether a graceful delete must be refused.
    pub fn is_starting(&self) -> bool {
        matches!(self, BackendState::Starting)
    }
}

impl fmt::Display for BackendState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kubernetes condition status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionValue {
    True,
    False,
    Unknown,
}

impl ConditionValue {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionValue::True => "True",
            ConditionValue::False => "False",
            ConditionValue::Unknown => "Unknown",
        }
    }
}

/// Pod phase and the three pod conditions for one backend state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseMapping {
    pub phase: &'static str,
    pub initialized: ConditionValue,
    pub ready: ConditionValue,
    pub scheduled: ConditionValue,
}

const fn row(
    phase: &'static str,
    initialized: ConditionValue,
    ready: ConditionValue,
    scheduled: ConditionValue,
) -> PhaseMapping {
    PhaseMapping {
        phase,
        initialized,
        ready,
        scheduled,
    }
}

use ConditionValue::{False as F, True as T, Unknown as U};

pub const UNKNOWN_MAPPING: PhaseMapping = row("Unknown", U, U, U);

const PHASE_TABLE: [(BackendState, PhaseMapping); 6] = [
    (BackendState::Starting, row("Pending", F, F, T)),
    (BackendState::Running, row("Running", T, T, T)),
    (BackendState::Stopping, row("Running", T, F, T)),
    (BackendState::Stopped, row("Succeeded", T, F, T)),
    (BackendState::Removing, row("Succeeded", T, F, T)),
    (BackendState::Removed, row("Succeeded", T, F, T)),
];

/// Phase and conditions for a backend state.
pub fn phase_for(state: BackendState) -> PhaseMapping {
    PHASE_TABLE
        .iter()
        .find(|(s, _)| *s == state)
        .map(|(_, mapping)| *mapping)
        .unwrap_or(UNKNOWN_MAPPING)
}
