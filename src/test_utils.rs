//! Test doubles for engine tests.
//!
//! These fixtures exercise the engine without an event loop: a kernel that
//! starts strands synchronously, an api whose fallback dispatch echoes the
//! yielded value back, listeners that record or fail on purpose, and
//! awaitables covering the park / synchronous-resume / registration-failure
//! cases. Both the unit tests and the integration suites build on them.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::rc::{Rc, Weak};

use crate::api::{Api, ApiCall, ApiRef};
use crate::awaitable::{Awaitable, CoroutineProvider};
use crate::error::{StrandError, StrandFailed};
use crate::frame::{CoroutineFrame, Entry, FrameStep, Resume};
use crate::kernel::Kernel;
use crate::listener::Listener;
use crate::strand::Strand;
use crate::types::{StrandId, Value};

/// A kernel that starts strands synchronously inside `execute`.
///
/// Useful for unit tests that want a strand to run to its first suspension
/// without a run queue in between.
pub struct StubKernel {
    me: Weak<StubKernel>,
    api: ApiRef,
    next_id: Cell<u64>,
    results: RefCell<BTreeMap<StrandId, Result<Value, StrandError>>>,
    interrupts: RefCell<Vec<StrandError>>,
}

impl StubKernel {
    /// Creates a stub kernel backed by [`EchoApi`].
    #[must_use]
    pub fn new() -> Rc<Self> {
        Self::with_api(Rc::new(EchoApi))
    }

    /// Creates a stub kernel backed by the given api.
    #[must_use]
    pub fn with_api(api: ApiRef) -> Rc<Self> {
        Rc::new_cyclic(|me| Self {
            me: me.clone(),
            api,
            next_id: Cell::new(1),
            results: RefCell::new(BTreeMap::new()),
            interrupts: RefCell::new(Vec::new()),
        })
    }

    /// A non-owning handle suitable for [`Strand::new`].
    #[must_use]
    pub fn kernel_ref(&self) -> Weak<dyn Kernel> {
        self.me.clone()
    }

    /// Creates a strand without starting it.
    pub fn spawn(&self, entry: Entry) -> Result<Strand, StrandError> {
        let id = StrandId::new(self.next_id.get());
        self.next_id.set(self.next_id.get() + 1);
        Strand::new(self.kernel_ref(), Rc::clone(&self.api), id, entry)
    }

    /// The recorded outcome of a strand whose exit reached this kernel.
    #[must_use]
    pub fn result(&self, id: StrandId) -> Option<Result<Value, StrandError>> {
        self.results.borrow().get(&id).cloned()
    }

    /// The errors reported through [`Kernel::interrupt`].
    #[must_use]
    pub fn interrupts(&self) -> Vec<StrandError> {
        self.interrupts.borrow().clone()
    }
}

impl Listener for StubKernel {
    fn send(&self, value: Value, from: &Strand) -> Result<(), StrandError> {
        self.results.borrow_mut().insert(from.id(), Ok(value));
        Ok(())
    }

    fn throw(&self, error: StrandError, from: &Strand) -> Result<(), StrandError> {
        // Termination is an intentional outcome, not an unhandled failure.
        let recorded = if error.is_terminated() {
            error
        } else {
            StrandError::new(StrandFailed::new(from.id(), error))
        };
        self.results.borrow_mut().insert(from.id(), Err(recorded));
        Ok(())
    }
}

impl Kernel for StubKernel {
    fn execute(&self, entry: Entry) -> Result<Strand, StrandError> {
        let strand = self.spawn(entry)?;
        strand.start();
        Ok(strand)
    }

    fn interrupt(&self, error: StrandError) {
        self.interrupts.borrow_mut().push(error);
    }
}

/// An api whose fallback dispatch resumes the strand with the yielded value
/// and which rejects every named call.
pub struct EchoApi;

impl Api for EchoApi {
    fn call(
        &self,
        _strand: &Strand,
        call: ApiCall,
    ) -> Result<Option<Box<dyn CoroutineFrame>>, StrandError> {
        Err(StrandError::msg(format!(
            "unknown api operation: {}",
            call.name()
        )))
    }

    fn dispatch(
        &self,
        strand: &Strand,
        _key: Option<Value>,
        value: Value,
    ) -> Result<(), StrandError> {
        strand.send(value);
        Ok(())
    }
}

/// One recorded completion notification.
#[derive(Debug, Clone)]
pub enum Notification {
    /// The strand completed with a value.
    Value {
        /// The completed strand.
        strand: StrandId,
        /// Its final value.
        value: Value,
    },
    /// The strand completed with an error.
    Error {
        /// The completed strand.
        strand: StrandId,
        /// Its final error.
        error: StrandError,
    },
}

impl Notification {
    /// The value notification's payload, if this is one.
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Value { value, .. } => Some(value),
            Self::Error { .. } => None,
        }
    }

    /// The error notification's payload, if this is one.
    #[must_use]
    pub fn error(&self) -> Option<&StrandError> {
        match self {
            Self::Error { error, .. } => Some(error),
            Self::Value { .. } => None,
        }
    }
}

/// A listener that records every notification it receives.
#[derive(Default)]
pub struct RecordingListener {
    events: RefCell<Vec<Notification>>,
}

impl RecordingListener {
    /// Creates a shareable recording listener.
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Snapshot of the notifications received so far.
    #[must_use]
    pub fn events(&self) -> Vec<Notification> {
        self.events.borrow().clone()
    }

    /// Number of notifications received so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    /// Returns true when nothing was received.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }
}

impl Listener for RecordingListener {
    fn send(&self, value: Value, from: &Strand) -> Result<(), StrandError> {
        self.events.borrow_mut().push(Notification::Value {
            strand: from.id(),
            value,
        });
        Ok(())
    }

    fn throw(&self, error: StrandError, from: &Strand) -> Result<(), StrandError> {
        self.events.borrow_mut().push(Notification::Error {
            strand: from.id(),
            error,
        });
        Ok(())
    }
}

/// A listener that fails every notification with the given message.
pub struct FailingListener {
    message: &'static str,
}

impl FailingListener {
    /// Creates a failing listener.
    #[must_use]
    pub fn new(message: &'static str) -> Rc<Self> {
        Rc::new(Self { message })
    }
}

impl Listener for FailingListener {
    fn send(&self, _value: Value, _from: &Strand) -> Result<(), StrandError> {
        Err(StrandError::msg(self.message))
    }

    fn throw(&self, _error: StrandError, _from: &Strand) -> Result<(), StrandError> {
        Err(StrandError::msg(self.message))
    }
}

/// A listener that appends its tag to a shared log, for ordering tests.
pub struct TagListener {
    tag: &'static str,
    log: Rc<RefCell<Vec<&'static str>>>,
}

impl TagListener {
    /// Creates a tagging listener over a shared log.
    #[must_use]
    pub fn new(tag: &'static str, log: Rc<RefCell<Vec<&'static str>>>) -> Rc<Self> {
        Rc::new(Self { tag, log })
    }
}

impl Listener for TagListener {
    fn send(&self, _value: Value, _from: &Strand) -> Result<(), StrandError> {
        self.log.borrow_mut().push(self.tag);
        Ok(())
    }

    fn throw(&self, _error: StrandError, _from: &Strand) -> Result<(), StrandError> {
        self.log.borrow_mut().push(self.tag);
        Ok(())
    }
}

/// An awaitable that parks the strand and never resumes it.
pub struct NeverAwaitable;

impl Awaitable for NeverAwaitable {
    fn attach(&self, _strand: &Strand, _api: ApiRef) -> Result<(), StrandError> {
        Ok(())
    }
}

/// An awaitable that resumes the strand synchronously from inside `attach`.
pub struct ImmediateAwaitable {
    value: Value,
}

impl ImmediateAwaitable {
    /// Creates an awaitable resolving to `value`.
    #[must_use]
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

impl Awaitable for ImmediateAwaitable {
    fn attach(&self, strand: &Strand, _api: ApiRef) -> Result<(), StrandError> {
        strand.send(self.value.clone());
        Ok(())
    }
}

/// An awaitable whose registration fails.
pub struct FailingAwaitable {
    message: &'static str,
}

impl FailingAwaitable {
    /// Creates an awaitable that fails registration with `message`.
    #[must_use]
    pub const fn new(message: &'static str) -> Self {
        Self { message }
    }
}

impl Awaitable for FailingAwaitable {
    fn attach(&self, _strand: &Strand, _api: ApiRef) -> Result<(), StrandError> {
        Err(StrandError::msg(self.message))
    }
}

/// An awaitable that parks the strand after installing a terminator which
/// counts its invocations.
pub struct ParkingAwaitable {
    fired: Rc<Cell<u32>>,
}

impl ParkingAwaitable {
    /// Creates the awaitable and the counter its terminator increments.
    #[must_use]
    pub fn new() -> (Self, Rc<Cell<u32>>) {
        let fired = Rc::new(Cell::new(0));
        (
            Self {
                fired: Rc::clone(&fired),
            },
            fired,
        )
    }
}

impl Awaitable for ParkingAwaitable {
    fn attach(&self, strand: &Strand, _api: ApiRef) -> Result<(), StrandError> {
        let fired = Rc::clone(&self.fired);
        strand.set_terminator(Some(Box::new(move |_| fired.set(fired.get() + 1))));
        Ok(())
    }
}

/// A coroutine provider that fails to produce its coroutine.
pub struct FailingCoroutineProvider {
    message: &'static str,
}

impl FailingCoroutineProvider {
    /// Creates a provider that fails with `message`.
    #[must_use]
    pub const fn new(message: &'static str) -> Self {
        Self { message }
    }
}

impl CoroutineProvider for FailingCoroutineProvider {
    fn coroutine(self: Box<Self>) -> Result<Box<dyn CoroutineFrame>, StrandError> {
        Err(StrandError::msg(self.message))
    }
}

type Step = Box<dyn FnOnce(Resume) -> FrameStep>;

/// A frame scripted as an ordered sequence of one-shot steps.
///
/// Each resume consumes the next step; resuming past the end completes with
/// a null value.
pub struct ScriptedCoroutine {
    name: &'static str,
    steps: VecDeque<Step>,
}

impl ScriptedCoroutine {
    /// Creates an empty script with a diagnostic name.
    #[must_use]
    pub fn named(name: &'static str) -> Self {
        Self {
            name,
            steps: VecDeque::new(),
        }
    }

    /// Appends a step.
    #[must_use]
    pub fn then(mut self, step: impl FnOnce(Resume) -> FrameStep + 'static) -> Self {
        self.steps.push_back(Box::new(step));
        self
    }

    fn step(&mut self, resume: Resume) -> FrameStep {
        match self.steps.pop_front() {
            Some(step) => step(resume),
            None => FrameStep::Returned(Value::null()),
        }
    }
}

impl CoroutineFrame for ScriptedCoroutine {
    fn resume_send(&mut self, value: Value) -> FrameStep {
        self.step(Resume::Send(value))
    }

    fn resume_throw(&mut self, error: StrandError) -> FrameStep {
        self.step(Resume::Throw(error))
    }

    fn name(&self) -> Option<&str> {
        Some(self.name)
    }
}

/// Unwraps a `Send` resume, panicking on a `Throw`.
///
/// # Panics
///
/// Panics when the resume carries an error.
#[must_use]
pub fn expect_send(resume: Resume) -> Value {
    match resume {
        Resume::Send(value) => value,
        Resume::Throw(error) => panic!("expected a value resume, got error: {error}"),
    }
}

/// Unwraps a `Throw` resume, panicking on a `Send`.
///
/// # Panics
///
/// Panics when the resume carries a value.
#[must_use]
pub fn expect_throw(resume: Resume) -> StrandError {
    match resume {
        Resume::Throw(error) => error,
        Resume::Send(value) => panic!("expected an error resume, got {value:?}"),
    }
}
