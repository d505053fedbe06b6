//! Type-erased payload values.
//!
//! Coroutine frames send, yield, and return dynamically typed values: the
//! engine routes them without inspecting them, and only the producing and
//! consuming frames agree on the concrete type. [`Value`] is a cheaply
//! clonable, immutable handle around such a payload. The captured type name
//! makes diagnostics readable without downcasting.

use core::any::Any;
use core::fmt;
use std::rc::Rc;

/// An immutable, type-erased payload shared by reference.
///
/// `Value::null()` stands in for "no payload" and is what a frame receives
/// when it is resumed without an explicit value (frame entry, transparent
/// trace resumes).
#[derive(Clone)]
pub struct Value {
    payload: Option<Rc<dyn Any>>,
    type_name: &'static str,
}

impl Value {
    /// Wraps a concrete value.
    #[must_use]
    pub fn new<T: Any>(value: T) -> Self {
        Self {
            payload: Some(Rc::new(value)),
            type_name: core::any::type_name::<T>(),
        }
    }

    /// The empty payload.
    #[must_use]
    pub const fn null() -> Self {
        Self {
            payload: None,
            type_name: "null",
        }
    }

    /// Returns true when this is the empty payload.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        self.payload.is_none()
    }

    /// Returns a reference to the payload if it has type `T`.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.as_ref().and_then(|rc| rc.downcast_ref::<T>())
    }

    /// Returns true if the payload has type `T`.
    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.downcast_ref::<T>().is_some()
    }

    /// The type name captured when the payload was wrapped.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({})", self.type_name)
    }
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Self::null()
    }
}

macro_rules! value_from {
    ($($ty:ty),* $(,)?) => {
        $(impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Self::new(v)
            }
        })*
    };
}

value_from!(bool, i32, i64, u32, u64, f64, &'static str, String);
