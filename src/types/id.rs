//! Strand identifiers.
//!
//! A [`StrandId`] is allocated by a kernel when it creates a strand and is
//! unique among the live strands of that kernel. Ids are never reused while
//! the strand they name is alive; kernels in this crate allocate them from a
//! monotonic counter.

use core::fmt;

/// A unique identifier for a strand.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StrandId(u64);

impl StrandId {
    /// Creates a strand id from a raw value.
    ///
    /// Kernels are responsible for keeping raw values unique among their
    /// live strands.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the underlying numeric identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for StrandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StrandId({})", self.0)
    }
}

impl fmt::Display for StrandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_compact() {
        assert_eq!(StrandId::new(7).to_string(), "S7");
        assert_eq!(format!("{:?}", StrandId::new(7)), "StrandId(7)");
    }

    #[test]
    fn ids_are_ordered_by_value() {
        assert!(StrandId::new(1) < StrandId::new(2));
        assert_eq!(StrandId::new(3), StrandId::new(3));
    }
}
