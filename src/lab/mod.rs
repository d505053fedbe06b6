//! Deterministic lab kernel for tests and examples.
//!
//! The lab kernel drives strands without a real event loop: `execute`
//! queues a strand's start on a FIFO next-tick queue and [`LabKernel::run`]
//! drains the queue until quiescence, counting steps against a configurable
//! limit so a strand that never parks cannot hang a test. Outcomes and
//! interrupts are recorded for assertions.
//!
//! [`LabApi`] is the matching api collaborator: `cooperate` defers a resume
//! to the next tick (installing a terminator that cancels it), `suspend`
//! parks forever, `terminate` ends the calling strand, and the fallback
//! dispatch echoes yielded values back into the strand.

mod api;
mod config;
mod kernel;

pub use api::LabApi;
pub use config::LabConfig;
pub use kernel::LabKernel;

/// Errors surfaced by the lab kernel's run loop.
#[derive(Debug, thiserror::Error)]
pub enum LabError {
    /// The run loop executed more steps than the configured limit, which
    /// usually means a strand is resuming itself forever.
    #[error("run exceeded the configured step limit of {limit}")]
    StepLimitExceeded {
        /// The configured limit.
        limit: u64,
    },
}
