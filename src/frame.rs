//! Coroutine frames and the yield taxonomy.
//!
//! A frame is one level of a strand's logical call stack: a suspendable
//! computation that is resumed with a value or an error and observed
//! afterwards as *still suspended* (it yielded), *completed* (it returned),
//! or *failed* (it threw). The engine drives frames exclusively through the
//! [`CoroutineFrame`] trait, so a frame may be a hand-written state machine,
//! a closure over a step counter ([`FnCoroutine`]), or anything else with
//! the same observational power.
//!
//! The values a frame may yield form the closed [`Yielded`] taxonomy; each
//! variant has exactly one dispatch rule in the strand interpreter.

use core::fmt;
use std::rc::Rc;

use crate::api::ApiCall;
use crate::awaitable::{Awaitable, AwaitableProvider, CoroutineProvider};
use crate::error::{InvalidEntryPoint, StrandError};
use crate::trace::{CoroutineTrace, YieldTrace};
use crate::types::Value;

/// A resume signal: the fused action/value pair fed into a frame.
#[derive(Debug, Clone)]
pub enum Resume {
    /// Resume the frame with a value.
    Send(Value),
    /// Resume the frame with an error.
    Throw(StrandError),
}

/// The observation made after resuming a frame.
pub enum FrameStep {
    /// The frame suspended again, producing a value for dispatch.
    Yielded(Yielded),
    /// The frame completed with a final value.
    Returned(Value),
    /// The frame failed.
    Threw(StrandError),
}

impl fmt::Debug for FrameStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yielded(y) => write!(f, "Yielded({y:?})"),
            Self::Returned(v) => write!(f, "Returned({v:?})"),
            Self::Threw(e) => write!(f, "Threw({e})"),
        }
    }
}

impl fmt::Debug for dyn CoroutineFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoroutineFrame")
            .field("name", &self.name())
            .finish()
    }
}

/// A suspendable computation: one level of a strand's call stack.
pub trait CoroutineFrame {
    /// Resumes the frame with a value.
    fn resume_send(&mut self, value: Value) -> FrameStep;

    /// Resumes the frame with an error.
    fn resume_throw(&mut self, error: StrandError) -> FrameStep;

    /// The key half of the suspending expression, for frames with keyed
    /// yields. Frames without keys report `None`.
    fn key(&self) -> Option<Value> {
        None
    }

    /// A human-readable name for diagnostics.
    fn name(&self) -> Option<&str> {
        None
    }
}

/// The closed set of values a frame may yield.
pub enum Yielded {
    /// A nested coroutine: pushed onto the stack and entered.
    Coroutine(Box<dyn CoroutineFrame>),
    /// A producer asked for its coroutine, then as above.
    CoroutineProvider(Box<dyn CoroutineProvider>),
    /// A named api call dispatched to the strand's api collaborator.
    ApiCall(ApiCall),
    /// An awaitable the strand parks on.
    Awaitable(Rc<dyn Awaitable>),
    /// A producer asked for its awaitable, then as above.
    AwaitableProvider(Box<dyn AwaitableProvider>),
    /// Developer-mode record identifying the current coroutine.
    CoroutineTrace(CoroutineTrace),
    /// Developer-mode record identifying the next yield's call site.
    YieldTrace(Box<YieldTrace>),
    /// Anything else: delegated to the api's fallback dispatch.
    Other(Value),
}

impl Yielded {
    /// Yields a nested coroutine.
    #[must_use]
    pub fn coroutine(frame: impl CoroutineFrame + 'static) -> Self {
        Self::Coroutine(Box::new(frame))
    }

    /// Yields an awaitable.
    #[must_use]
    pub fn awaitable(awaitable: impl Awaitable + 'static) -> Self {
        Self::Awaitable(Rc::new(awaitable))
    }

    /// Yields a plain value for the api's fallback dispatch.
    #[must_use]
    pub fn value(value: impl Into<Value>) -> Self {
        Self::Other(value.into())
    }
}

impl fmt::Debug for Yielded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Coroutine(_) => f.write_str("Coroutine"),
            Self::CoroutineProvider(_) => f.write_str("CoroutineProvider"),
            Self::ApiCall(call) => write!(f, "ApiCall({})", call.name()),
            Self::Awaitable(_) => f.write_str("Awaitable"),
            Self::AwaitableProvider(_) => f.write_str("AwaitableProvider"),
            Self::CoroutineTrace(tr) => write!(f, "CoroutineTrace({})", tr.function),
            Self::YieldTrace(tr) => write!(f, "YieldTrace({:?})", tr.inner),
            Self::Other(v) => write!(f, "Other({v:?})"),
        }
    }
}

/// The trivial frame wrapping a non-coroutine entry point.
///
/// Yields its value once, then completes with whatever it is resumed with.
/// An injected error is rethrown unchanged.
pub struct OneShotCoroutine {
    pending: Option<Yielded>,
}

impl OneShotCoroutine {
    /// Wraps a single yielded value.
    #[must_use]
    pub fn new(yielded: Yielded) -> Self {
        Self {
            pending: Some(yielded),
        }
    }
}

impl CoroutineFrame for OneShotCoroutine {
    fn resume_send(&mut self, value: Value) -> FrameStep {
        match self.pending.take() {
            Some(yielded) => FrameStep::Yielded(yielded),
            None => FrameStep::Returned(value),
        }
    }

    fn resume_throw(&mut self, error: StrandError) -> FrameStep {
        self.pending = None;
        FrameStep::Threw(error)
    }
}

/// A poll-style frame built from a single closure.
///
/// The closure receives each [`Resume`] in order and decides whether to
/// yield again, return, or fail; state lives in its captures. This is the
/// lightest way to hand-write a coroutine as a state machine.
pub struct FnCoroutine<F> {
    name: Option<&'static str>,
    step: F,
}

impl<F> FnCoroutine<F>
where
    F: FnMut(Resume) -> FrameStep + 'static,
{
    /// Creates an anonymous frame from a step closure.
    pub fn new(step: F) -> Self {
        Self { name: None, step }
    }

    /// Creates a named frame; the name shows up in diagnostics.
    pub fn named(name: &'static str, step: F) -> Self {
        Self {
            name: Some(name),
            step,
        }
    }

    /// Boxes the frame for use as a [`Yielded::Coroutine`] or entry point.
    #[must_use]
    pub fn boxed(self) -> Box<dyn CoroutineFrame> {
        Box::new(self)
    }
}

impl<F> CoroutineFrame for FnCoroutine<F>
where
    F: FnMut(Resume) -> FrameStep + 'static,
{
    fn resume_send(&mut self, value: Value) -> FrameStep {
        (self.step)(Resume::Send(value))
    }

    fn resume_throw(&mut self, error: StrandError) -> FrameStep {
        (self.step)(Resume::Throw(error))
    }

    fn name(&self) -> Option<&str> {
        self.name
    }
}

/// The four entry-point shapes a strand constructor accepts.
///
/// Construction normalizes each shape into a single initial frame:
/// a coroutine is used as-is, a provider is asked for its coroutine, a
/// callable is invoked once (and must produce a coroutine), and anything
/// else is wrapped in a [`OneShotCoroutine`].
pub enum Entry {
    /// A suspendable coroutine, used as the initial frame directly.
    Coroutine(Box<dyn CoroutineFrame>),
    /// A producer asked for its coroutine at construction time.
    CoroutineProvider(Box<dyn CoroutineProvider>),
    /// A zero-argument callable invoked at construction time; only a
    /// [`Entry::Coroutine`] result is accepted.
    Callable(Box<dyn FnOnce() -> Entry>),
    /// Any other value, wrapped in a [`OneShotCoroutine`].
    Yield(Yielded),
}

impl Entry {
    /// An entry point that runs the given frame.
    #[must_use]
    pub fn coroutine(frame: impl CoroutineFrame + 'static) -> Self {
        Self::Coroutine(Box::new(frame))
    }

    /// An entry point that invokes the callable once at construction.
    #[must_use]
    pub fn callable(f: impl FnOnce() -> Entry + 'static) -> Self {
        Self::Callable(Box::new(f))
    }

    /// An entry point that yields a plain value once.
    #[must_use]
    pub fn value(value: impl Into<Value>) -> Self {
        Self::Yield(Yielded::Other(value.into()))
    }

    /// Normalizes the entry point into the strand's initial frame.
    ///
    /// Fails with [`InvalidEntryPoint`] when a callable produced something
    /// other than a coroutine, or with the provider's own error when asking
    /// it for a coroutine fails.
    pub fn into_frame(self) -> Result<Box<dyn CoroutineFrame>, StrandError> {
        match self {
            Self::Coroutine(frame) => Ok(frame),
            Self::CoroutineProvider(provider) => provider.coroutine(),
            Self::Callable(f) => match f() {
                Self::Coroutine(frame) => Ok(frame),
                _ => Err(StrandError::new(InvalidEntryPoint)),
            },
            Self::Yield(yielded) => Ok(Box::new(OneShotCoroutine::new(yielded))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_shot_yields_then_returns_the_resume_result() {
        let mut frame = OneShotCoroutine::new(Yielded::value(7_i32));
        match frame.resume_send(Value::null()) {
            FrameStep::Yielded(Yielded::Other(v)) => {
                assert_eq!(v.downcast_ref::<i32>(), Some(&7));
            }
            other => panic!("expected a yield, got {other:?}"),
        }
        match frame.resume_send(Value::new("done")) {
            FrameStep::Returned(v) => assert_eq!(v.downcast_ref::<&str>(), Some(&"done")),
            other => panic!("expected completion, got {other:?}"),
        }
    }

    #[test]
    fn one_shot_rethrows_injected_errors() {
        let mut frame = OneShotCoroutine::new(Yielded::value(7_i32));
        match frame.resume_throw(StrandError::msg("boom")) {
            FrameStep::Threw(e) => assert_eq!(e.to_string(), "boom"),
            other => panic!("expected a rethrow, got {other:?}"),
        }
    }

    #[test]
    fn fn_coroutine_steps_through_its_closure() {
        let mut calls = 0;
        let mut frame = FnCoroutine::named("stepper", move |resume| {
            calls += 1;
            match (calls, resume) {
                (1, Resume::Send(_)) => FrameStep::Yielded(Yielded::value(1_i32)),
                (2, Resume::Send(v)) => FrameStep::Returned(v),
                (_, Resume::Throw(e)) => FrameStep::Threw(e),
                _ => panic!("resumed too often"),
            }
        });
        assert_eq!(frame.name(), Some("stepper"));
        assert!(matches!(
            frame.resume_send(Value::null()),
            FrameStep::Yielded(Yielded::Other(_))
        ));
        assert!(matches!(
            frame.resume_send(Value::new(5_i32)),
            FrameStep::Returned(_)
        ));
    }

    #[test]
    fn callable_entry_must_produce_a_coroutine() {
        let entry = Entry::callable(|| Entry::value(3_i32));
        let err = entry.into_frame().expect_err("value is not a coroutine");
        assert!(err.is::<InvalidEntryPoint>());

        let entry = Entry::callable(|| {
            Entry::coroutine(FnCoroutine::new(|_| FrameStep::Returned(Value::null())))
        });
        assert!(entry.into_frame().is_ok());
    }

    #[test]
    fn value_entry_wraps_in_a_one_shot() {
        let mut frame = Entry::value(9_i32).into_frame().expect("one-shot");
        assert!(matches!(
            frame.resume_send(Value::null()),
            FrameStep::Yielded(Yielded::Other(_))
        ));
    }
}
