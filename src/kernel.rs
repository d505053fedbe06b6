//! The kernel interface consumed by strands.
//!
//! The kernel orchestrates: it allocates strand ids, creates strands, and
//! drives whatever loop makes their callbacks run. To the engine it matters
//! in exactly two roles, captured here: it is the default primary listener
//! of every strand it creates, and it is the sink for failures that cannot
//! be delivered to any listener.
//!
//! Strands hold their kernel as a non-owning back-reference; a kernel must
//! outlive its strands.

use crate::error::StrandError;
use crate::frame::Entry;
use crate::listener::Listener;
use crate::strand::Strand;

/// The orchestrator that creates strands and collects their fates.
pub trait Kernel: Listener {
    /// Creates a strand for the given entry point and schedules its start.
    fn execute(&self, entry: Entry) -> Result<Strand, StrandError>;

    /// Receives an engine-level failure that no strand can handle, such as
    /// a [`ListenerFailure`] raised while delivering a completion.
    ///
    /// [`ListenerFailure`]: crate::error::ListenerFailure
    fn interrupt(&self, error: StrandError);
}
