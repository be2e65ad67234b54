//! Run-phase state machine
//!
//! `Start -> Probed -> DeltaComputed -> Applied -> Done`, with any
//! non-terminal phase able to fail.

use serde::{Deserialize, Serialize};

/// Phase of one reconciliation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Nothing probed yet
    Start,
    /// Existence of the environment is known
    Probed,
    /// Entries to write are known, nothing written
    DeltaComputed,
    /// Environment created or updated
    Applied,
    /// Result reported
    Done,
    /// Run aborted with an error
    Failed,
}

/// Rejected phase change
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal phase transition: {from:?} -> {to:?}")]
pub struct IllegalTransition {
    /// Phase the run was in
    pub from: Phase,
    /// Phase that was requested
    pub to: Phase,
}

/// Validates a phase transition.
///
/// # Errors
/// [`IllegalTransition`] if `to` is not reachable from `from`
pub fn validate_transition(from: Phase, to: Phase) -> Result<(), IllegalTransition> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(IllegalTransition { from, to })
    }
}

/// Phases reachable in one step from `from`
#[must_use]
pub fn allowed_transitions(from: Phase) -> Vec<Phase> {
    match from {
        Phase::Start => vec![Phase::Probed, Phase::Failed],
        Phase::Probed => vec![Phase::DeltaComputed, Phase::Failed],
        Phase::DeltaComputed => vec![Phase::Applied, Phase::Failed],
        Phase::Applied => vec![Phase::Done, Phase::Failed],
        Phase::Done | Phase::Failed => vec![],
    }
}

impl Phase {
    /// No further transitions possible
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Tracks the phase of a single run
#[derive(Debug)]
pub(crate) struct PhaseTracker {
    current: Phase,
}

impl PhaseTracker {
    pub(crate) fn new() -> Self {
        Self {
            current: Phase::Start,
        }
    }

    pub(crate) fn current(&self) -> Phase {
        self.current
    }

    pub(crate) fn advance(&mut self, to: Phase) {
        let checked = validate_transition(self.current, to);
        debug_assert!(checked.is_ok(), "{checked:?}");
        tracing::debug!(from = ?self.current, to = ?to, "phase transition");
        self.current = to;
    }
}
