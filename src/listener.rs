//! Completion listeners.
//!
//! A listener receives a strand's terminal result: exactly one of
//! [`Listener::send`] or [`Listener::throw`] is invoked per completed strand
//! per listener. Strands themselves implement `Listener`, which is how one
//! strand awaits another.

use std::rc::Rc;

use crate::error::StrandError;
use crate::strand::Strand;
use crate::types::Value;

/// A recipient of a strand's terminal result.
///
/// A failing listener returns `Err`; during exit notification the failure is
/// reported to the kernel as a [`ListenerFailure`] and listeners after the
/// failing one are skipped.
///
/// [`ListenerFailure`]: crate::error::ListenerFailure
pub trait Listener {
    /// The strand completed with a value.
    fn send(&self, value: Value, from: &Strand) -> Result<(), StrandError>;

    /// The strand completed with an error.
    fn throw(&self, error: StrandError, from: &Strand) -> Result<(), StrandError>;
}

/// A shared listener handle.
pub type ListenerRef = Rc<dyn Listener>;
