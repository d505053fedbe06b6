//! Structured-logging shim.
//!
//! With the `tracing-integration` feature enabled this re-exports the event
//! macros from the `tracing` crate; without it the same names expand to
//! nothing, so instrumented code compiles to zero runtime cost.
//!
//! ```toml
//! weft = { version = "0.1", features = ["tracing-integration"] }
//! ```

#[cfg(feature = "tracing-integration")]
pub use tracing::{debug, error, info, trace, warn};

#[cfg(not(feature = "tracing-integration"))]
mod noop {
    macro_rules! noop_event {
        ($($arg:tt)*) => {};
    }

    pub(crate) use noop_event as debug;
    pub(crate) use noop_event as error;
    pub(crate) use noop_event as info;
    pub(crate) use noop_event as trace;
    pub(crate) use noop_event as warn;
}

#[cfg(not(feature = "tracing-integration"))]
#[allow(unused_imports)]
pub(crate) use noop::{debug, error, info, trace, warn};
