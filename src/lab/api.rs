//! The lab api collaborator.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use crate::api::{Api, ApiCall};
use crate::error::StrandError;
use crate::frame::CoroutineFrame;
use crate::lab::kernel::LabKernel;
use crate::strand::Strand;
use crate::types::Value;

/// A scripted api over the lab kernel's next-tick queue.
///
/// Operations:
///
/// - `cooperate`: parks the strand and queues its resume on the next tick,
///   with a terminator that cancels the queued resume.
/// - `suspend`: parks the strand with no resumption arranged.
/// - `terminate`: terminates the calling strand.
///
/// Unrecognized yielded values are echoed back into the strand, so a frame
/// that yields a plain value is resumed with that value.
pub struct LabApi {
    kernel: Weak<LabKernel>,
}

impl LabApi {
    pub(crate) fn new(kernel: Weak<LabKernel>) -> Self {
        Self { kernel }
    }

    fn kernel(&self) -> Result<Rc<LabKernel>, StrandError> {
        self.kernel
            .upgrade()
            .ok_or_else(|| StrandError::msg("lab kernel is gone"))
    }
}

impl Api for LabApi {
    fn call(
        &self,
        strand: &Strand,
        call: ApiCall,
    ) -> Result<Option<Box<dyn CoroutineFrame>>, StrandError> {
        match call.name() {
            "cooperate" => {
                let kernel = self.kernel()?;
                let cancelled = Rc::new(Cell::new(false));
                let flag = Rc::clone(&cancelled);
                strand.set_terminator(Some(Box::new(move |_| flag.set(true))));
                let waiter = strand.clone();
                kernel.schedule(move || {
                    if !cancelled.get() {
                        waiter.send(Value::null());
                    }
                });
                Ok(None)
            }
            "suspend" => Ok(None),
            "terminate" => {
                strand.terminate();
                Ok(None)
            }
            other => Err(StrandError::msg(format!("unknown api operation: {other}"))),
        }
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
