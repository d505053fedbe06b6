//! Weft: a cooperative strand engine.
//!
//! # Overview
//!
//! Weft multiplexes many logical tasks onto a single event-loop thread. A
//! *strand* is a lightweight task whose body is a stack of suspendable
//! coroutine frames; the engine advances a strand by feeding values into
//! its top frame, interpreting what the frame yields — nested coroutines,
//! awaitables, api calls — and propagating results and errors up the
//! strand's logical call stack.
//!
//! The engine is deliberately narrow. Timers, I/O readiness, and every
//! domain operation live behind the [`Api`] interface; orchestration and id
//! allocation live behind [`Kernel`]. What the crate owns is the part that
//! has to be exactly right: the strand state machine, the yield-dispatch
//! interpreter, error propagation, termination, and the listener/linking
//! protocol.
//!
//! # Core guarantees
//!
//! - **Single-threaded cooperation**: all strand manipulation runs on one
//!   logical thread; a frame suspends only at its own yield points.
//! - **No recursive interpretation**: an awaitable that resumes its strand
//!   synchronously during registration is detected and looped on, never
//!   recursed into.
//! - **Errors are values**: a failing frame resumes its parent with the
//!   error; only an exhausted stack makes the error the strand's final
//!   result, and listeners then see it exactly once.
//! - **Cancellation is explicit**: termination discards the stack, fires
//!   the one-shot terminator hook, and cascades over links.
//!
//! # Module structure
//!
//! - [`types`]: strand ids and type-erased payload values
//! - [`error`]: the error value carrier and the engine's error vocabulary
//! - [`frame`]: coroutine frames, the yield taxonomy, entry points
//! - [`strand`]: the state machine and interpreter
//! - [`listener`], [`api`], [`kernel`], [`awaitable`]: the interfaces the
//!   engine consumes
//! - [`trace`]: developer-mode trace records and per-frame annotations
//! - [`lab`]: deterministic kernel for tests and examples
//! - [`test_utils`]: shared test doubles

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod api;
pub mod awaitable;
pub mod error;
pub mod frame;
pub mod kernel;
pub mod lab;
pub mod listener;
pub mod strand;
pub mod test_utils;
pub mod trace;
pub mod tracing_compat;
pub mod types;

pub use api::{Api, ApiCall, ApiRef};
pub use awaitable::{Awaitable, AwaitableProvider, CoroutineProvider};
pub use error::{
    InvalidEntryPoint, ListenerFailure, PrimaryListenerRemoved, StrandError, StrandFailed,
    Terminated,
};
pub use frame::{CoroutineFrame, Entry, FnCoroutine, FrameStep, OneShotCoroutine, Resume, Yielded};
pub use kernel::Kernel;
pub use lab::{LabApi, LabConfig, LabError, LabKernel};
pub use listener::{Listener, ListenerRef};
pub use strand::{Strand, StrandState, Terminator};
pub use trace::{CoroutineTrace, FrameAnnotation, SourceSite, YieldTrace};
pub use types::{StrandId, Value};
