#![allow(dead_code)]
//! Shared integration test utilities.
//!
//! Import with:
//! ```ignore
//! mod common;
//! use common::*;
//! ```

use std::sync::Once;

use weft::frame::{Entry, FrameStep, Yielded};
use weft::test_utils::{expect_send, NeverAwaitable, ScriptedCoroutine};

static INIT_LOGGING: Once = Once::new();

/// Initializes a test-writer tracing subscriber once per process.
///
/// Filtering follows `RUST_LOG`; without the `tracing-integration` feature
/// the engine emits nothing and this only affects the tests' own spans.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// An entry point that parks on a never-resuming awaitable and completes
/// with whatever it is eventually resumed with.
pub fn parked_entry() -> Entry {
    Entry::coroutine(
        ScriptedCoroutine::named("parked")
            .then(|_| FrameStep::Yielded(Yielded::awaitable(NeverAwaitable)))
            .then(|resume| FrameStep::Returned(expect_send(resume))),
    )
}
