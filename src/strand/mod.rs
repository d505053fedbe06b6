//! The strand engine.
//!
//! A strand is a lightweight task whose body is a stack of suspendable
//! coroutine frames. The interpreter in [`Strand::start`] feeds resume
//! signals into the top frame, interprets what it yields (nested
//! coroutines, awaitables, api calls), and propagates results and errors up
//! the logical call stack. Everything runs on one thread; a strand is
//! shared by reference with its listeners, links, and awaitables, and all
//! mutation goes through the strand's own methods.
//!
//! # Resumption without recursion
//!
//! An awaitable may resume a strand synchronously from inside its own
//! `attach` registration. The interpreter detects this through the
//! [`StrandState::SuspendedActive`] / [`StrandState::Ready`] handshake and
//! loops instead of re-entering `start()`; see [`state`].
//!
//! # Termination
//!
//! [`Strand::terminate`] discards the call stack without unwinding it,
//! fires the terminator hook so pending event-loop registrations can be
//! cancelled, and exits the strand with a [`Terminated`] error. It is legal
//! in any state, including from within one of the strand's own running
//! frames.

mod state;

pub use state::StrandState;

use core::fmt;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::mem;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use crate::api::ApiRef;
use crate::awaitable::{Awaitable, AwaitableProvider};
use crate::error::{ListenerFailure, PrimaryListenerRemoved, StrandError, Terminated};
use crate::frame::{CoroutineFrame, Entry, FrameStep, Resume, Yielded};
use crate::kernel::Kernel;
use crate::listener::{Listener, ListenerRef};
use crate::trace::FrameAnnotation;
use crate::tracing_compat::{debug, trace};
use crate::types::{StrandId, Value};

/// A one-shot cleanup hook invoked on termination.
///
/// Installed by whoever parks the strand against a resource; cleared by the
/// engine on every resume, once stale.
pub type Terminator = Box<dyn FnOnce(&Strand)>;

/// One level of the call stack: the frame plus its trace annotations.
struct FrameRecord {
    frame: Box<dyn CoroutineFrame>,
    annotation: FrameAnnotation,
}

impl FrameRecord {
    fn new(frame: Box<dyn CoroutineFrame>) -> Self {
        Self {
            frame,
            annotation: FrameAnnotation::default(),
        }
    }
}

/// Who the primary listener currently is.
///
/// `Kernel` is both the initial value and what [`Strand::clear_primary_listener`]
/// restores, so "was the displaced listener the kernel?" is a structural
/// question rather than a pointer comparison.
enum PrimarySlot {
    Kernel,
    Listener(ListenerRef),
    Cleared,
}

struct StrandInner {
    id: StrandId,
    kernel: Weak<dyn Kernel>,
    api: ApiRef,
    stack: SmallVec<[FrameRecord; 4]>,
    current: Option<FrameRecord>,
    state: StrandState,
    /// Pending resume while live; frozen final result once exited.
    resume: Option<Resume>,
    primary: PrimarySlot,
    listeners: SmallVec<[ListenerRef; 2]>,
    terminator: Option<Terminator>,
    /// Strands to terminate when this one exits, keyed by id for
    /// deterministic cascade order.
    links: BTreeMap<StrandId, Strand>,
    trace: Vec<FrameAnnotation>,
}

impl StrandInner {
    fn set_state(&mut self, to: StrandState) {
        debug_assert!(
            self.state.can_transition(to),
            "illegal strand transition {} -> {} on {}",
            self.state,
            to,
            self.id,
        );
        self.state = to;
    }

    fn final_result(&self) -> Resume {
        self.resume
            .clone()
            .unwrap_or_else(|| Resume::Send(Value::null()))
    }
}

/// A scheduled task: a stack of suspendable coroutine frames driven by the
/// yield-dispatch interpreter.
///
/// `Strand` is a cheap clonable handle; clones refer to the same task.
#[derive(Clone)]
pub struct Strand {
    inner: Rc<RefCell<StrandInner>>,
}

impl Strand {
    /// Creates a strand with the given id and entry point.
    ///
    /// The entry point is normalized into the initial frame; see
    /// [`Entry::into_frame`] for the failure cases. The new strand is
    /// `Ready` with its first resume queued and starts when the kernel
    /// invokes [`Strand::start`].
    pub fn new(
        kernel: Weak<dyn Kernel>,
        api: ApiRef,
        id: StrandId,
        entry: Entry,
    ) -> Result<Self, StrandError> {
        let frame = entry.into_frame()?;
        let inner = StrandInner {
            id,
            kernel,
            api,
            stack: SmallVec::new(),
            current: Some(FrameRecord::new(frame)),
            state: StrandState::Ready,
            resume: Some(Resume::Send(Value::null())),
            primary: PrimarySlot::Kernel,
            listeners: SmallVec::new(),
            terminator: None,
            links: BTreeMap::new(),
            trace: Vec::new(),
        };
        Ok(Self {
            inner: Rc::new(RefCell::new(inner)),
        })
    }

    /// The strand's id.
    #[must_use]
    pub fn id(&self) -> StrandId {
        self.inner.borrow().id
    }

    /// The kernel that owns this strand, if it is still alive.
    #[must_use]
    pub fn kernel(&self) -> Option<Rc<dyn Kernel>> {
        self.inner.borrow().kernel.upgrade()
    }

    /// The strand's current scheduling state.
    #[must_use]
    pub fn state(&self) -> StrandState {
        self.inner.borrow().state
    }

    /// Returns true once the strand has exited.
    #[must_use]
    pub fn has_exited(&self) -> bool {
        self.inner.borrow().state.is_exited()
    }

    /// The trace annotations of the frames that were still on the stack
    /// when the strand completed. Empty unless developer-mode trace records
    /// were yielded.
    #[must_use]
    pub fn trace(&self) -> Vec<FrameAnnotation> {
        self.inner.borrow().trace.clone()
    }

    /// This strand viewed as an awaitable; awaiting it observes its
    /// terminal result.
    #[must_use]
    pub fn awaitable(&self) -> Self {
        self.clone()
    }

    // ========================================================================
    // The interpreter
    // ========================================================================

    /// Advances the strand until it parks, is terminated, or exits.
    ///
    /// No-op on an exited strand. Must not be re-entered: a callback that
    /// would re-enter (a synchronous resume during dispatch) instead flips
    /// the state to `Ready` and returns, and the in-progress invocation
    /// picks the queued resume up.
    pub fn start(&self) {
        {
            let inner = self.inner.borrow();
            match inner.state {
                StrandState::Exited => return,
                StrandState::Running | StrandState::SuspendedActive => {
                    debug_assert!(false, "start() re-entered on {}", inner.id);
                    return;
                }
                StrandState::Ready | StrandState::SuspendedInactive => {}
            }
        }

        loop {
            // Take the frame and its pending resume out of the cell so the
            // frame body can call back into this strand.
            let (mut record, resume) = {
                let mut inner = self.inner.borrow_mut();
                if inner.state.is_exited() {
                    return;
                }
                inner.set_state(StrandState::Running);
                let Some(record) = inner.current.take() else {
                    return;
                };
                let resume = inner.resume.take().unwrap_or_else(|| Resume::Send(Value::null()));
                (record, resume)
            };

            trace!(strand = %self.id(), "resuming frame");
            let step = match resume {
                Resume::Send(value) => record.frame.resume_send(value),
                Resume::Throw(error) => record.frame.resume_throw(error),
            };

            if self.has_exited() {
                // The frame terminated its own strand; the rest of this
                // invocation is moot and the discarded frame never resumes.
                return;
            }

            let yielded = match step {
                FrameStep::Returned(value) => {
                    if self.unwind(Resume::Send(value)) {
                        continue;
                    }
                    return;
                }
                FrameStep::Threw(error) => {
                    if self.unwind(Resume::Throw(error)) {
                        continue;
                    }
                    return;
                }
                FrameStep::Yielded(yielded) => yielded,
            };

            {
                let mut inner = self.inner.borrow_mut();
                inner.set_state(StrandState::SuspendedActive);
                inner.current = Some(record);
            }
            self.dispatch(yielded);

            let mut inner = self.inner.borrow_mut();
            match inner.state {
                // A synchronous resume, a dispatch error, or a nested frame
                // entry: loop for the next iteration to consume it.
                StrandState::Ready | StrandState::Running => continue,
                StrandState::Exited => return,
                StrandState::SuspendedActive => {
                    inner.set_state(StrandState::SuspendedInactive);
                    trace!(strand = %inner.id, "parked");
                    return;
                }
                StrandState::SuspendedInactive => return,
            }
        }
    }

    /// Routes one yielded value. Runs with no borrow held; anything called
    /// here may synchronously resume or terminate the strand.
    fn dispatch(&self, yielded: Yielded) {
        match yielded {
            Yielded::CoroutineTrace(record) => {
                let mut inner = self.inner.borrow_mut();
                if let Some(current) = inner.current.as_mut() {
                    current.annotation.coroutine = Some(record);
                }
                // Transparent resume: the record is informational only.
                inner.resume = Some(Resume::Send(Value::null()));
                inner.set_state(StrandState::Ready);
            }
            Yielded::YieldTrace(record) => {
                let crate::trace::YieldTrace { site, inner: wrapped } = *record;
                {
                    let mut inner = self.inner.borrow_mut();
                    if let Some(current) = inner.current.as_mut() {
                        current.annotation.yield_site = Some(site);
                    }
                }
                self.dispatch(wrapped);
            }
            Yielded::Coroutine(frame) => self.push_frame(frame),
            Yielded::CoroutineProvider(provider) => match provider.coroutine() {
                Ok(frame) => self.push_frame(frame),
                Err(error) => self.dispatch_error(error),
            },
            Yielded::ApiCall(call) => {
                trace!(strand = %self.id(), operation = call.name(), "api call");
                match self.api().call(self, call) {
                    Ok(Some(frame)) => self.push_frame(frame),
                    Ok(None) => {}
                    Err(error) => self.dispatch_error(error),
                }
            }
            Yielded::Awaitable(awaitable) => {
                if let Err(error) = awaitable.attach(self, self.api()) {
                    self.dispatch_error(error);
                }
            }
            Yielded::AwaitableProvider(provider) => match provider.awaitable() {
                Ok(awaitable) => {
                    if let Err(error) = awaitable.attach(self, self.api()) {
                        self.dispatch_error(error);
                    }
                }
                Err(error) => self.dispatch_error(error),
            },
            Yielded::Other(value) => {
                let key = {
                    let inner = self.inner.borrow();
                    inner.current.as_ref().and_then(|record| record.frame.key())
                };
                if let Err(error) = self.api().dispatch(self, key, value) {
                    self.dispatch_error(error);
                }
            }
        }
    }

    /// Pushes the suspended current frame and enters `frame` in its place.
    fn push_frame(&self, frame: Box<dyn CoroutineFrame>) {
        let mut inner = self.inner.borrow_mut();
        let parent = inner
            .current
            .take()
            .expect("dispatch requires an active frame");
        inner.stack.push(parent);
        inner.current = Some(FrameRecord::new(frame));
        // Frame entry is its first resume.
        inner.resume = Some(Resume::Send(Value::null()));
        inner.set_state(StrandState::Running);
    }

    /// Feeds a dispatch-path failure back into the yielding frame, as if it
    /// had thrown on its own yield expression.
    fn dispatch_error(&self, error: StrandError) {
        let mut inner = self.inner.borrow_mut();
        if inner.state.is_exited() {
            return;
        }
        inner.resume = Some(Resume::Throw(error));
        inner.set_state(StrandState::Ready);
    }

    /// Completion of the current frame: pop the parent and feed it the
    /// result, or exit when the stack is empty. Returns true when a parent
    /// was popped and the interpreter should continue.
    fn unwind(&self, resume: Resume) -> bool {
        let popped = {
            let mut inner = self.inner.borrow_mut();
            inner.resume = Some(resume);
            match inner.stack.pop() {
                Some(parent) => {
                    inner.current = Some(parent);
                    true
                }
                None => false,
            }
        };
        if !popped {
            self.exit();
        }
        popped
    }

    // ========================================================================
    // Resumption
    // ========================================================================

    /// Resumes the strand with a value.
    ///
    /// No-op once exited. Parked strands re-enter the interpreter
    /// synchronously; a strand mid-dispatch is flipped back to `Ready` for
    /// the in-progress `start()` to pick up.
    pub fn send(&self, value: Value) {
        self.resume_with(Resume::Send(value));
    }

    /// Resumes the strand with an error.
    ///
    /// Same scheduling behavior as [`Strand::send`].
    pub fn throw(&self, error: StrandError) {
        self.resume_with(Resume::Throw(error));
    }

    fn resume_with(&self, resume: Resume) {
        let start_now = {
            let mut inner = self.inner.borrow_mut();
            if inner.state.is_exited() {
                return;
            }
            // Whatever the terminator would have cancelled is now resolved.
            inner.terminator = None;
            inner.resume = Some(resume);
            match inner.state {
                StrandState::SuspendedInactive => true,
                StrandState::SuspendedActive => {
                    inner.set_state(StrandState::Ready);
                    false
                }
                StrandState::Ready | StrandState::Running | StrandState::Exited => false,
            }
        };
        if start_now {
            self.start();
        }
    }

    // ========================================================================
    // Termination and exit
    // ========================================================================

    /// Installs (or clears) the terminator hook.
    ///
    /// No-op once exited. The engine clears the hook on every resume, so a
    /// hook observed firing was installed by the registration that was
    /// actually pending.
    pub fn set_terminator(&self, terminator: Option<Terminator>) {
        let mut inner = self.inner.borrow_mut();
        if inner.state.is_exited() {
            return;
        }
        inner.terminator = terminator;
    }

    /// Terminates the strand.
    ///
    /// The call stack is discarded without unwinding: there is no way to
    /// resume discarded frames, so their cleanup code does not run. The
    /// terminator hook fires, listeners are notified with [`Terminated`],
    /// and linked strands are terminated in turn. Legal in any state; no-op
    /// once exited.
    pub fn terminate(&self) {
        let terminator = {
            let mut inner = self.inner.borrow_mut();
            if inner.state.is_exited() {
                return;
            }
            inner.resume = Some(Resume::Throw(StrandError::new(Terminated::new(inner.id))));
            inner.terminator.take()
        };
        debug!(strand = %self.id(), "terminated");
        if let Some(terminator) = terminator {
            terminator(self);
        }
        self.exit();
    }

    /// Freezes the final result, notifies listeners, and cascades to linked
    /// strands. Runs once; a second call (a terminator terminating its own
    /// strand again) is a no-op.
    fn exit(&self) {
        let (id, result, primary, listeners, links, kernel) = {
            let mut inner = self.inner.borrow_mut();
            if inner.state.is_exited() {
                return;
            }
            inner.set_state(StrandState::Exited);
            let mut annotations = Vec::new();
            for record in inner.stack.iter().chain(inner.current.iter()) {
                if !record.annotation.is_empty() {
                    annotations.push(record.annotation.clone());
                }
            }
            inner.trace = annotations;
            inner.current = None;
            inner.stack.clear();
            let result = inner.final_result();
            if inner.resume.is_none() {
                inner.resume = Some(result.clone());
            }
            let primary = mem::replace(&mut inner.primary, PrimarySlot::Cleared);
            let listeners = mem::take(&mut inner.listeners);
            let links = mem::take(&mut inner.links);
            (inner.id, result, primary, listeners, links, inner.kernel.clone())
        };
        debug!(strand = %id, "exited");

        let mut failure: Option<StrandError> = None;
        match primary {
            PrimarySlot::Kernel => {
                if let Some(kernel) = kernel.upgrade() {
                    failure = deliver(&*kernel, &result, self).err();
                }
            }
            PrimarySlot::Listener(listener) => {
                failure = deliver(&*listener, &result, self).err();
            }
            PrimarySlot::Cleared => {}
        }
        if failure.is_none() {
            for listener in &listeners {
                if let Err(cause) = deliver(&**listener, &result, self) {
                    failure = Some(cause);
                    break;
                }
            }
        }
        if let Some(cause) = failure {
            if let Some(kernel) = kernel.upgrade() {
                kernel.interrupt(StrandError::new(ListenerFailure::new(id, cause)));
            }
        }

        for other in links.into_values() {
            other.unlink(self);
            other.terminate();
        }
    }

    // ========================================================================
    // Listeners and links
    // ========================================================================

    /// Replaces the primary listener.
    ///
    /// On an exited strand the new listener is notified immediately with the
    /// final result and not installed. Otherwise, a displaced non-kernel
    /// primary is notified with [`PrimaryListenerRemoved`]; displacing the
    /// kernel is silent. Notification failures propagate to the caller.
    pub fn set_primary_listener(&self, listener: ListenerRef) -> Result<(), StrandError> {
        let (final_result, displaced) = {
            let mut inner = self.inner.borrow_mut();
            if inner.state.is_exited() {
                (Some(inner.final_result()), None)
            } else {
                let previous =
                    mem::replace(&mut inner.primary, PrimarySlot::Listener(Rc::clone(&listener)));
                let displaced = match previous {
                    PrimarySlot::Listener(previous) => Some(previous),
                    PrimarySlot::Kernel | PrimarySlot::Cleared => None,
                };
                (None, displaced)
            }
        };
        if let Some(result) = final_result {
            return deliver(&*listener, &result, self);
        }
        if let Some(previous) = displaced {
            let removed = StrandError::new(PrimaryListenerRemoved::new(self.id()));
            return previous.throw(removed, self);
        }
        Ok(())
    }

    /// Restores the kernel as the primary listener. No notification is
    /// delivered; callers use this to relinquish a strand they previously
    /// claimed. No-op once exited.
    pub fn clear_primary_listener(&self) {
        let mut inner = self.inner.borrow_mut();
        if inner.state.is_exited() {
            return;
        }
        inner.primary = PrimarySlot::Kernel;
    }

    /// Registers a secondary listener for the strand's terminal result.
    ///
    /// On an exited strand the listener is notified immediately, and a
    /// notification failure propagates to the caller.
    pub fn observe(&self, listener: ListenerRef) -> Result<(), StrandError> {
        let final_result = {
            let mut inner = self.inner.borrow_mut();
            if inner.state.is_exited() {
                Some(inner.final_result())
            } else {
                inner.listeners.push(Rc::clone(&listener));
                None
            }
        };
        match final_result {
            Some(result) => deliver(&*listener, &result, self),
            None => Ok(()),
        }
    }

    /// Links `other` to this strand: when this strand exits, `other` is
    /// terminated. Links are uni-directional; `other` is unaffected by this
    /// edge until this strand exits. No-op once exited.
    pub fn link(&self, other: &Strand) {
        // Read the id before borrowing: `other` may be this very strand.
        let other_id = other.id();
        let mut inner = self.inner.borrow_mut();
        if inner.state.is_exited() {
            return;
        }
        inner.links.insert(other_id, other.clone());
    }

    /// Removes the link to `other`, if present.
    pub fn unlink(&self, other: &Strand) {
        let other_id = other.id();
        self.inner.borrow_mut().links.remove(&other_id);
    }

    /// Returns true when `other` is linked to this strand.
    #[must_use]
    pub fn is_linked(&self, other: &Strand) -> bool {
        let other_id = other.id();
        self.inner.borrow().links.contains_key(&other_id)
    }

    /// The ids of the currently linked strands, in id order.
    #[must_use]
    pub fn linked_strands(&self) -> Vec<StrandId> {
        self.inner.borrow().links.keys().copied().collect()
    }

    fn api(&self) -> ApiRef {
        Rc::clone(&self.inner.borrow().api)
    }
}

/// Delivers a terminal result to one listener under the frozen action.
fn deliver<L: Listener + ?Sized>(
    listener: &L,
    result: &Resume,
    strand: &Strand,
) -> Result<(), StrandError> {
    match result {
        Resume::Send(value) => listener.send(value.clone(), strand),
        Resume::Throw(error) => listener.throw(error.clone(), strand),
    }
}

/// Strand-to-strand awaiting: a strand used as a listener forwards the
/// observed result into itself as a resume.
impl Listener for Strand {
    fn send(&self, value: Value, _from: &Strand) -> Result<(), StrandError> {
        Strand::send(self, value);
        Ok(())
    }

    fn throw(&self, error: StrandError, _from: &Strand) -> Result<(), StrandError> {
        Strand::throw(self, error);
        Ok(())
    }
}

/// Awaiting a strand registers the waiter as a secondary listener (or
/// notifies it immediately when the strand has already exited).
impl Awaitable for Strand {
    fn attach(&self, strand: &Strand, _api: ApiRef) -> Result<(), StrandError> {
        self.observe(Rc::new(strand.clone()))
    }
}

impl AwaitableProvider for Strand {
    fn awaitable(self: Box<Self>) -> Result<Rc<dyn Awaitable>, StrandError> {
        Ok(Rc::new(*self))
    }
}

impl fmt::Debug for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(inner) => write!(f, "Strand({}, {})", inner.id, inner.state),
            Err(_) => f.write_str("Strand(<borrowed>)"),
        }
    }
}
