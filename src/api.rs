//! The api collaborator: yield-dispatch at the event-loop boundary.
//!
//! Domain operations (`sleep`, `read`, `cooperate`, ...) are not part of the
//! engine. A strand that yields an [`ApiCall`] hands it to its [`Api`]
//! together with itself; the api either returns a coroutine frame to run in
//! the strand, or arranges an eventual [`Strand::send`]/[`Strand::throw`]
//! against its event loop. The api must install a terminator whenever the
//! arrangement reserves a resource on the strand's behalf.
//!
//! [`Strand::send`]: crate::strand::Strand::send
//! [`Strand::throw`]: crate::strand::Strand::throw

use std::borrow::Cow;
use std::rc::Rc;

use crate::error::StrandError;
use crate::frame::CoroutineFrame;
use crate::strand::Strand;
use crate::types::Value;

/// A named api call yielded by a coroutine frame.
#[derive(Debug)]
pub struct ApiCall {
    name: Cow<'static, str>,
    args: Vec<Value>,
}

impl ApiCall {
    /// Creates a call with the given operation name and arguments.
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>, args: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// The operation name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The call arguments.
    #[must_use]
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Consumes the call, returning its arguments.
    #[must_use]
    pub fn into_args(self) -> Vec<Value> {
        self.args
    }
}

/// The engine's collaborator for interpreting api calls and unrecognized
/// yields.
pub trait Api {
    /// Dispatches a named api call on behalf of `strand`.
    ///
    /// Returning `Ok(Some(frame))` pushes the frame onto the strand and
    /// enters it. Returning `Ok(None)` means the api has arranged its own
    /// resumption (or none). A synchronous `Err` is fed back into the
    /// yielding frame as a thrown error.
    fn call(
        &self,
        strand: &Strand,
        call: ApiCall,
    ) -> Result<Option<Box<dyn CoroutineFrame>>, StrandError>;

    /// Fallback dispatch for yielded values with no engine interpretation.
    ///
    /// `key` is the key half of the suspending expression when the yielding
    /// frame supports keyed yields.
    fn dispatch(
        &self,
        strand: &Strand,
        key: Option<Value>,
        value: Value,
    ) -> Result<(), StrandError>;
}

/// A shared api handle.
pub type ApiRef = Rc<dyn Api>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_call_exposes_name_and_args() {
        let call = ApiCall::new("sleep", vec![Value::new(100_u64)]);
        assert_eq!(call.name(), "sleep");
        assert_eq!(call.args().len(), 1);
        let args = call.into_args();
        assert_eq!(args[0].downcast_ref::<u64>(), Some(&100));
    }
}
