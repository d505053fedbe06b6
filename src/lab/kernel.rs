//! The lab kernel.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::rc::{Rc, Weak};

use crate::api::ApiRef;
use crate::error::{StrandError, StrandFailed};
use crate::frame::Entry;
use crate::kernel::Kernel;
use crate::lab::api::LabApi;
use crate::lab::{LabConfig, LabError};
use crate::listener::Listener;
use crate::strand::Strand;
use crate::tracing_compat::debug;
use crate::types::{StrandId, Value};

/// A deterministic, single-threaded kernel with a FIFO next-tick queue.
///
/// The kernel is the default primary listener of every strand it creates;
/// final outcomes land in an inspectable map, with unhandled errors wrapped
/// in [`StrandFailed`]. Failures with no listener left to hear them arrive
/// through [`Kernel::interrupt`] and are recorded as well.
pub struct LabKernel {
    me: Weak<LabKernel>,
    config: LabConfig,
    api: Rc<LabApi>,
    next_id: Cell<u64>,
    queue: RefCell<VecDeque<Box<dyn FnOnce()>>>,
    results: RefCell<BTreeMap<StrandId, Result<Value, StrandError>>>,
    interrupts: RefCell<Vec<StrandError>>,
    steps: Cell<u64>,
}

impl LabKernel {
    /// Creates a lab kernel with the given configuration.
    #[must_use]
    pub fn new(config: LabConfig) -> Rc<Self> {
        Rc::new_cyclic(|me| Self {
            me: me.clone(),
            config,
            api: Rc::new(LabApi::new(me.clone())),
            next_id: Cell::new(1),
            queue: RefCell::new(VecDeque::new()),
            results: RefCell::new(BTreeMap::new()),
            interrupts: RefCell::new(Vec::new()),
            steps: Cell::new(0),
        })
    }

    /// Creates a lab kernel with the default configuration.
    #[must_use]
    pub fn with_defaults() -> Rc<Self> {
        Self::new(LabConfig::default())
    }

    /// A non-owning handle suitable for [`Strand::new`].
    #[must_use]
    pub fn kernel_ref(&self) -> Weak<dyn Kernel> {
        self.me.clone()
    }

    /// The kernel's api collaborator.
    #[must_use]
    pub fn api(&self) -> ApiRef {
        Rc::clone(&self.api) as ApiRef
    }

    /// Queues a callback for the next tick.
    pub fn schedule(&self, job: impl FnOnce() + 'static) {
        self.queue.borrow_mut().push_back(Box::new(job));
    }

    /// Executes at most one queued callback.
    ///
    /// Returns whether one ran. Fails once the kernel's lifetime step count
    /// exceeds the configured limit.
    pub fn step(&self) -> Result<bool, LabError> {
        let job = self.queue.borrow_mut().pop_front();
        let Some(job) = job else {
            return Ok(false);
        };
        if let Some(limit) = self.config.max_steps {
            if self.steps.get() >= limit {
                return Err(LabError::StepLimitExceeded { limit });
            }
        }
        self.steps.set(self.steps.get() + 1);
        job();
        Ok(true)
    }

    /// Drains the next-tick queue until it is empty.
    ///
    /// Returns the number of steps executed by this call.
    pub fn run(&self) -> Result<u64, LabError> {
        let mut executed = 0;
        while self.step()? {
            executed += 1;
        }
        Ok(executed)
    }

    /// Returns true when nothing is queued.
    #[must_use]
    pub fn is_quiescent(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    /// Total steps executed over the kernel's lifetime.
    #[must_use]
    pub fn steps(&self) -> u64 {
        self.steps.get()
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

impl Listener for LabKernel {
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

impl Kernel for LabKernel {
    fn execute(&self, entry: Entry) -> Result<Strand, StrandError> {
        let id = StrandId::new(self.next_id.get());
        self.next_id.set(self.next_id.get() + 1);
        let strand = Strand::new(self.kernel_ref(), self.api(), id, entry)?;
        debug!(strand = %id, "strand created");
        let runner = strand.clone();
        self.schedule(move || runner.start());
        Ok(strand)
    }

    fn interrupt(&self, error: StrandError) {
        self.interrupts.borrow_mut().push(error);
    }
}
