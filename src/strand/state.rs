//! The strand state machine.
//!
//! Five states, and only the edges below are legal:
//!
//! ```text
//! Ready             -> Running            start() begins
//! SuspendedInactive -> Running            send/throw triggers start()
//! SuspendedActive   -> Ready              send/throw while mid-dispatch
//! Running           -> SuspendedActive    frame yielded, dispatch begins
//! SuspendedActive   -> Running            dispatch completed without an external resume
//! SuspendedActive   -> SuspendedInactive  dispatch parked the strand
//! Running           -> Exited             stack empty after completion
//! any non-Exited    -> Exited             terminate()
//! ```
//!
//! The active/inactive suspension split is the load-bearing distinction:
//! `SuspendedActive` means the interpreter is still inside `start()` with a
//! dispatch in progress, so a synchronous resume must flip the strand back
//! to `Ready` for the in-progress loop to pick up rather than re-entering
//! `start()` recursively. `SuspendedInactive` means nothing will advance the
//! strand except an external `send`/`throw`.

use core::fmt;

/// The scheduling state of a strand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrandState {
    /// A resume is queued; `start()` will consume it.
    Ready,
    /// The interpreter is actively executing inside `start()`.
    Running,
    /// The strand yielded and its dispatch is still in progress.
    SuspendedActive,
    /// The strand is parked on an awaitable that has stored a reference.
    SuspendedInactive,
    /// The strand completed; its action and value are frozen.
    Exited,
}

impl StrandState {
    /// Returns true for either suspended state.
    #[must_use]
    pub const fn is_suspended(self) -> bool {
        matches!(self, Self::SuspendedActive | Self::SuspendedInactive)
    }

    /// Returns true once the strand has exited.
    #[must_use]
    pub const fn is_exited(self) -> bool {
        matches!(self, Self::Exited)
    }

    /// Returns true when `self -> to` is a legal transition.
    ///
    /// Identity transitions on live states are permitted as no-ops; an
    /// exited strand permits none.
    #[must_use]
    pub fn can_transition(self, to: Self) -> bool {
        match (self, to) {
            (Self::Exited, _) => false,
            (_, Self::Exited) => true,
            (from, to) if from == to => true,
            (Self::Ready | Self::SuspendedInactive, Self::Running) => true,
            (Self::SuspendedActive, Self::Ready | Self::Running | Self::SuspendedInactive) => true,
            (Self::Running, Self::SuspendedActive) => true,
            _ => false,
        }
    }
}

impl fmt::Display for StrandState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ready => "ready",
            Self::Running => "running",
            Self::SuspendedActive => "suspended-active",
            Self::SuspendedInactive => "suspended-inactive",
            Self::Exited => "exited",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::StrandState::{Exited, Ready, Running, SuspendedActive, SuspendedInactive};

    #[test]
    fn specified_edges_are_legal() {
        assert!(Ready.can_transition(Running));
        assert!(SuspendedInactive.can_transition(Running));
        assert!(SuspendedActive.can_transition(Ready));
        assert!(Running.can_transition(SuspendedActive));
        assert!(SuspendedActive.can_transition(Running));
        assert!(SuspendedActive.can_transition(SuspendedInactive));
        assert!(Running.can_transition(Exited));
    }

    #[test]
    fn every_live_state_may_exit() {
        for state in [Ready, Running, SuspendedActive, SuspendedInactive] {
            assert!(state.can_transition(Exited));
        }
    }

    #[test]
    fn exited_is_terminal() {
        for state in [Ready, Running, SuspendedActive, SuspendedInactive, Exited] {
            assert!(!Exited.can_transition(state));
        }
    }

    #[test]
    fn unlisted_edges_are_illegal() {
        assert!(!Ready.can_transition(SuspendedActive));
        assert!(!Ready.can_transition(SuspendedInactive));
        assert!(!Running.can_transition(Ready));
        assert!(!Running.can_transition(SuspendedInactive));
        assert!(!SuspendedInactive.can_transition(Ready));
        assert!(!SuspendedInactive.can_transition(SuspendedActive));
    }

    #[test]
    fn identity_is_a_live_state_no_op() {
        for state in [Ready, Running, SuspendedActive, SuspendedInactive] {
            assert!(state.can_transition(state));
        }
    }

    #[test]
    fn display_names() {
        assert_eq!(Running.to_string(), "running");
        assert_eq!(SuspendedActive.to_string(), "suspended-active");
    }
}
