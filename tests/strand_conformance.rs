//! End-to-end conformance scenarios for the strand engine.
//!
//! Each test drives a complete scenario through the lab kernel: entry-point
//! execution, yield dispatch, parking, resumption, termination, listener
//! notification, and link cascades, asserting the externally observable
//! protocol at every step.

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::{init_test_logging, parked_entry};
use weft::api::ApiRef;
use weft::awaitable::Awaitable;
use weft::error::{PrimaryListenerRemoved, StrandError, Terminated};
use weft::frame::{Entry, FrameStep, Yielded};
use weft::kernel::Kernel;
use weft::lab::LabKernel;
use weft::strand::{Strand, StrandState};
use weft::test_utils::{expect_send, ParkingAwaitable, RecordingListener, ScriptedCoroutine};
use weft::types::Value;

/// Scenario: an entry point yields the integer 7 once and returns "done";
/// the api's fallback dispatch resumes integers with the yielded value.
#[test]
fn simple_value_round_trip() {
    init_test_logging();
    let kernel = LabKernel::with_defaults();
    let listener = RecordingListener::new();

    let entry = Entry::coroutine(
        ScriptedCoroutine::named("simple")
            .then(|_| FrameStep::Yielded(Yielded::value(7_i32)))
            .then(|resume| {
                assert_eq!(expect_send(resume).downcast_ref::<i32>(), Some(&7));
                FrameStep::Returned(Value::new("done"))
            }),
    );
    let strand = kernel.execute(entry).expect("valid entry");
    strand.set_primary_listener(listener.clone()).expect("live");

    kernel.run().expect("within step limit");

    assert!(strand.has_exited());
    assert_eq!(listener.len(), 1);
    let value = listener.events()[0].value().cloned().expect("send");
    assert_eq!(value.downcast_ref::<&str>(), Some(&"done"));
}

/// Scenario: a two-level stack where the child throws and the parent does
/// not catch; the error propagates frame-by-frame and reaches the listener.
#[test]
fn exception_propagates_through_the_stack_to_the_listener() {
    init_test_logging();
    let kernel = LabKernel::with_defaults();
    let listener = RecordingListener::new();

    let child =
        ScriptedCoroutine::named("child").then(|_| FrameStep::Threw(StrandError::msg("E")));
    let entry = Entry::coroutine(
        ScriptedCoroutine::named("parent")
            .then(move |_| FrameStep::Yielded(Yielded::coroutine(child)))
            .then(|resume| match resume {
                // The parent observes the child's error as a throw-resume
                // and rethrows it.
                weft::frame::Resume::Throw(error) => FrameStep::Threw(error),
                weft::frame::Resume::Send(v) => panic!("expected an error, got {v:?}"),
            }),
    );
    let strand = kernel.execute(entry).expect("valid entry");
    strand.set_primary_listener(listener.clone()).expect("live");

    kernel.run().expect("within step limit");

    assert!(strand.has_exited());
    assert_eq!(listener.len(), 1);
    let error = listener.events()[0].error().cloned().expect("throw");
    assert_eq!(error.to_string(), "E");
}

/// Scenario: a strand parks with a terminator installed, then is
/// terminated. The terminator fires exactly once, the listener sees the
/// termination, and no discarded frame ever runs again.
#[test]
fn termination_fires_the_terminator_and_stops_the_strand() {
    init_test_logging();
    let kernel = LabKernel::with_defaults();
    let listener = RecordingListener::new();
    let (awaitable, fired) = ParkingAwaitable::new();

    let entry = Entry::coroutine(
        ScriptedCoroutine::named("victim")
            .then(move |_| FrameStep::Yielded(Yielded::awaitable(awaitable)))
            .then(|_| panic!("a discarded frame must never resume")),
    );
    let strand = kernel.execute(entry).expect("valid entry");
    strand.set_primary_listener(listener.clone()).expect("live");
    kernel.run().expect("within step limit");
    assert_eq!(strand.state(), StrandState::SuspendedInactive);

    strand.terminate();

    assert_eq!(fired.get(), 1);
    assert!(strand.has_exited());
    assert_eq!(listener.len(), 1);
    let error = listener.events()[0].error().cloned().expect("throw");
    let terminated = error.downcast_ref::<Terminated>().expect("terminated");
    assert_eq!(terminated.strand(), strand.id());

    // Nothing further runs or notifies.
    strand.send(Value::new(1_i32));
    kernel.run().expect("within step limit");
    assert_eq!(listener.len(), 1);
    assert_eq!(fired.get(), 1);
}

/// Scenario: A links B and B links C. Terminating A terminates B over the
/// direct edge; C is reached only because B's own exit cascades over B's
/// link, never directly from A.
#[test]
fn linked_cascade_follows_direct_edges() {
    init_test_logging();
    let kernel = LabKernel::with_defaults();
    let listener_b = RecordingListener::new();

    let a = kernel.execute(parked_entry()).expect("valid entry");
    let b = kernel.execute(parked_entry()).expect("valid entry");
    let c = kernel.execute(parked_entry()).expect("valid entry");
    kernel.run().expect("within step limit");

    a.link(&b);
    b.link(&c);
    b.set_primary_listener(listener_b.clone()).expect("live");

    a.terminate();

    assert!(a.has_exited());
    assert!(b.has_exited());
    assert_eq!(listener_b.len(), 1);
    assert!(listener_b.events()[0]
        .error()
        .expect("throw")
        .is_terminated());
    // B exited, so B's own link reached C.
    assert!(c.has_exited());
}

/// Scenario: primary listener handoff. The displaced non-kernel primary is
/// told exactly once; the kernel, displaced first, hears nothing; the final
/// owner receives the result.
#[test]
fn primary_listener_handoff() {
    init_test_logging();
    let kernel = LabKernel::with_defaults();
    let first = RecordingListener::new();
    let second = RecordingListener::new();

    let strand = kernel.execute(parked_entry()).expect("valid entry");
    kernel.run().expect("within step limit");

    strand.set_primary_listener(first.clone()).expect("live");
    strand.set_primary_listener(second.clone()).expect("live");

    assert_eq!(first.len(), 1);
    let removed = first.events()[0].error().cloned().expect("throw");
    let removed = removed
        .downcast_ref::<PrimaryListenerRemoved>()
        .expect("handoff marker");
    assert_eq!(removed.strand(), strand.id());

    strand.send(Value::new("result"));
    kernel.run().expect("within step limit");

    assert_eq!(first.len(), 1);
    assert_eq!(second.len(), 1);
    let value = second.events()[0].value().cloned().expect("send");
    assert_eq!(value.downcast_ref::<&str>(), Some(&"result"));
    assert!(kernel.result(strand.id()).is_none());
}

/// Scenario: an awaitable resumes the strand synchronously from inside its
/// own registration. The interpreter must loop, not recurse: registration
/// returns before the frame consumes the value, and the observed states are
/// suspended-active at registration, ready right after the send, and
/// running when the frame resumes.
#[test]
fn synchronous_resume_during_registration_loops() {
    init_test_logging();

    struct SyncResume {
        value: Value,
        observed: Rc<RefCell<Vec<(&'static str, StrandState)>>>,
    }

    impl Awaitable for SyncResume {
        fn attach(&self, strand: &Strand, _api: ApiRef) -> Result<(), StrandError> {
            self.observed
                .borrow_mut()
                .push(("attach", strand.state()));
            strand.send(self.value.clone());
            self.observed
                .borrow_mut()
                .push(("after-send", strand.state()));
            Ok(())
        }
    }

    let kernel = LabKernel::with_defaults();
    let observed: Rc<RefCell<Vec<(&'static str, StrandState)>>> =
        Rc::new(RefCell::new(Vec::new()));
    let slot: Rc<RefCell<Option<Strand>>> = Rc::new(RefCell::new(None));

    let awaitable = SyncResume {
        value: Value::new(42_i32),
        observed: Rc::clone(&observed),
    };
    let in_frame = Rc::clone(&observed);
    let captured = Rc::clone(&slot);
    let entry = Entry::coroutine(
        ScriptedCoroutine::named("eager")
            .then(move |_| FrameStep::Yielded(Yielded::awaitable(awaitable)))
            .then(move |resume| {
                let strand = captured.borrow().clone().expect("installed before run");
                in_frame.borrow_mut().push(("resumed", strand.state()));
                FrameStep::Returned(expect_send(resume))
            }),
    );
    let strand = kernel.execute(entry).expect("valid entry");
    *slot.borrow_mut() = Some(strand.clone());

    kernel.run().expect("within step limit");

    assert!(strand.has_exited());
    let value = kernel.result(strand.id()).expect("recorded").expect("value");
    assert_eq!(value.downcast_ref::<i32>(), Some(&42));
    assert_eq!(
        *observed.borrow(),
        vec![
            ("attach", StrandState::SuspendedActive),
            ("after-send", StrandState::Ready),
            ("resumed", StrandState::Running),
        ]
    );
}
