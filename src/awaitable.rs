//! Awaitables and the polymorphic producers a strand may encounter.
//!
//! An awaitable is anything a strand can park on: told to attach a strand,
//! it stores the strand (or resumes it synchronously, which the interpreter
//! detects and loops on rather than recursing) and eventually calls
//! [`Strand::send`] or [`Strand::throw`].
//!
//! The provider traits produce coroutines and awaitables on demand; they
//! are consumed by the dispatch that encounters them, so both take the
//! yielded box by value.
//!
//! [`Strand::send`]: crate::strand::Strand::send
//! [`Strand::throw`]: crate::strand::Strand::throw

use std::rc::Rc;

use crate::api::ApiRef;
use crate::error::StrandError;
use crate::frame::CoroutineFrame;
use crate::strand::Strand;

/// An operation a strand can park on.
pub trait Awaitable {
    /// Registers `strand` as a waiter.
    ///
    /// The awaitable is responsible for eventually calling `strand.send` or
    /// `strand.throw`, and for installing a terminator on the strand when
    /// registration reserves a resource. Resuming synchronously from inside
    /// `attach` is legal. A returned `Err` is fed back into the yielding
    /// frame.
    fn attach(&self, strand: &Strand, api: ApiRef) -> Result<(), StrandError>;
}

/// Produces an awaitable when one is needed.
pub trait AwaitableProvider {
    /// Consumes the provider, producing its awaitable.
    ///
    /// An `Err` is fed back into the frame that yielded the provider.
    fn awaitable(self: Box<Self>) -> Result<Rc<dyn Awaitable>, StrandError>;
}

/// Produces a coroutine when one is needed.
pub trait CoroutineProvider {
    /// Consumes the provider, producing its coroutine.
    ///
    /// An `Err` is fed back into the frame that yielded the provider, not
    /// into the coroutine that never came to be.
    fn coroutine(self: Box<Self>) -> Result<Box<dyn CoroutineFrame>, StrandError>;
}
