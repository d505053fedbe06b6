//! Core value and identifier types for the strand engine.

mod id;
mod value;

pub use id::StrandId;
pub use value::Value;
