//! Error types and error handling strategy for the strand engine.
//!
//! Errors inside a strand travel as values: a frame that fails produces an
//! error that is fed into its parent frame, and only when the stack is
//! exhausted does the error become the strand's final result and reach its
//! listeners. [`StrandError`] is the clonable, type-erased carrier for that
//! journey; the concrete types below are the engine's own error vocabulary
//! at the kernel/listener boundary.
//!
//! Principles:
//!
//! - Errors are explicit and typed; listeners can downcast to the engine
//!   types or to whatever the user coroutine threw.
//! - Errors are never converted to values silently.
//! - Engine errors reference strands by [`StrandId`]: a strand's final
//!   result is frozen on the strand itself, so error values must not own
//!   strand handles.

use core::fmt;
use std::rc::Rc;

use crate::types::StrandId;

/// A clonable, type-erased error value as it travels through a strand.
///
/// Cloning shares the underlying error; a strand's final error is delivered
/// to every listener from the same allocation.
#[derive(Clone)]
pub struct StrandError {
    inner: Rc<dyn std::error::Error>,
}

impl StrandError {
    /// Wraps a concrete error.
    #[must_use]
    pub fn new<E: std::error::Error + 'static>(error: E) -> Self {
        Self {
            inner: Rc::new(error),
        }
    }

    /// Creates an error from a plain message.
    #[must_use]
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(Message(message.into()))
    }

    /// Returns a reference to the underlying error if it has type `E`.
    #[must_use]
    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.inner.downcast_ref::<E>()
    }

    /// Returns true if the underlying error has type `E`.
    #[must_use]
    pub fn is<E: std::error::Error + 'static>(&self) -> bool {
        self.downcast_ref::<E>().is_some()
    }

    /// Returns true if this error records a strand termination.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.is::<Terminated>()
    }
}

impl fmt::Debug for StrandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StrandError({:?})", self.inner)
    }
}

impl fmt::Display for StrandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl std::error::Error for StrandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner.source()
    }
}

/// A stringly error for tests and api implementations without a richer type.
#[derive(Debug)]
struct Message(String);

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for Message {}

/// Final value of a terminated strand.
///
/// Termination discards the strand's call stack without unwinding it, so
/// this error is never observed by the strand's own frames; it reaches only
/// the strand's listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Terminated {
    strand: StrandId,
}

impl Terminated {
    /// Records the termination of `strand`.
    #[must_use]
    pub const fn new(strand: StrandId) -> Self {
        Self { strand }
    }

    /// The strand that was terminated.
    #[must_use]
    pub const fn strand(&self) -> StrandId {
        self.strand
    }
}

impl fmt::Display for Terminated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "strand {} terminated", self.strand)
    }
}

impl std::error::Error for Terminated {}

/// Delivered to a displaced primary listener.
///
/// Replacing a strand's primary listener notifies the previous one with this
/// error, unless the previous one was the kernel. Awaiters that hand a
/// strand off to a new owner detect the handoff by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimaryListenerRemoved {
    strand: StrandId,
}

impl PrimaryListenerRemoved {
    /// Records the displacement of the primary listener of `strand`.
    #[must_use]
    pub const fn new(strand: StrandId) -> Self {
        Self { strand }
    }

    /// The strand whose primary listener was replaced.
    #[must_use]
    pub const fn strand(&self) -> StrandId {
        self.strand
    }
}

impl fmt::Display for PrimaryListenerRemoved {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "removed as primary listener of strand {}", self.strand)
    }
}

impl std::error::Error for PrimaryListenerRemoved {}

/// Reported to the kernel when a completion listener fails.
///
/// Listener failures cannot be delivered to the strand (it has already
/// exited), so they surface through [`Kernel::interrupt`]. Listeners after
/// the failing one are skipped.
///
/// [`Kernel::interrupt`]: crate::kernel::Kernel::interrupt
#[derive(Debug, Clone)]
pub struct ListenerFailure {
    strand: StrandId,
    cause: StrandError,
}

impl ListenerFailure {
    /// Records a listener failure while notifying completion of `strand`.
    #[must_use]
    pub const fn new(strand: StrandId, cause: StrandError) -> Self {
        Self { strand, cause }
    }

    /// The strand whose completion was being delivered.
    #[must_use]
    pub const fn strand(&self) -> StrandId {
        self.strand
    }

    /// The error the listener produced.
    #[must_use]
    pub const fn cause(&self) -> &StrandError {
        &self.cause
    }
}

impl fmt::Display for ListenerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener failed while observing strand {}", self.strand)
    }
}

impl std::error::Error for ListenerFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

/// The kernel's wrapping of an unhandled error that reached a strand's top
/// frame.
#[derive(Debug, Clone)]
pub struct StrandFailed {
    strand: StrandId,
    cause: StrandError,
}

impl StrandFailed {
    /// Records an unhandled failure of `strand`.
    #[must_use]
    pub const fn new(strand: StrandId, cause: StrandError) -> Self {
        Self { strand, cause }
    }

    /// The strand that failed.
    #[must_use]
    pub const fn strand(&self) -> StrandId {
        self.strand
    }

    /// The error that exhausted the strand's stack.
    #[must_use]
    pub const fn cause(&self) -> &StrandError {
        &self.cause
    }
}

impl fmt::Display for StrandFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "strand {} failed: {}", self.strand, self.cause)
    }
}

impl std::error::Error for StrandFailed {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

/// Constructor-time failure: a callable entry point did not produce a
/// coroutine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InvalidEntryPoint;

impl fmt::Display for InvalidEntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("entry point callable did not produce a coroutine")
    }
}

impl std::error::Error for InvalidEntryPoint {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn display_messages() {
        let id = StrandId::new(3);
        assert_eq!(Terminated::new(id).to_string(), "strand S3 terminated");
        assert_eq!(
            PrimaryListenerRemoved::new(id).to_string(),
            "removed as primary listener of strand S3"
        );
        assert_eq!(
            StrandFailed::new(id, StrandError::msg("boom")).to_string(),
            "strand S3 failed: boom"
        );
        assert_eq!(
            InvalidEntryPoint.to_string(),
            "entry point callable did not produce a coroutine"
        );
    }

    #[test]
    fn downcast_recovers_engine_types() {
        let err = StrandError::new(Terminated::new(StrandId::new(9)));
        assert!(err.is_terminated());
        let inner = err.downcast_ref::<Terminated>().expect("downcast");
        assert_eq!(inner.strand(), StrandId::new(9));
        assert!(!err.is::<InvalidEntryPoint>());
    }

    #[test]
    fn listener_failure_exposes_cause_as_source() {
        let cause = StrandError::msg("listener exploded");
        let failure = ListenerFailure::new(StrandId::new(1), cause);
        let source = failure.source().expect("source");
        assert_eq!(source.to_string(), "listener exploded");
    }

    #[test]
    fn message_errors_display_verbatim() {
        let err = StrandError::msg("no such operation");
        assert_eq!(err.to_string(), "no such operation");
    }

    #[test]
    fn clones_share_one_allocation() {
        let err = StrandError::msg("shared");
        let clone = err.clone();
        assert_eq!(err.to_string(), clone.to_string());
    }
}
