//! Developer-mode trace records.
//!
//! Coroutine code may interleave two kinds of record among its yields:
//! a [`CoroutineTrace`] naming the coroutine itself, and a [`YieldTrace`]
//! naming the call site of the next yield. Both are strictly informational.
//! The interpreter folds them into per-frame annotations and resumes
//! execution transparently; a strand's surviving annotations are snapshotted
//! when it exits and can be rendered or exported by higher layers.
//!
//! A program that yields no records pays nothing: annotations are `None`
//! until a record arrives, and the exit-time snapshot is only built when at
//! least one frame was annotated.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::frame::Yielded;

/// A source location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSite {
    /// Source file.
    pub file: String,
    /// 1-based line number.
    pub line: u32,
}

impl SourceSite {
    /// Creates a source location.
    #[must_use]
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for SourceSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Identifies the coroutine executing in a frame.
///
/// Yielding one attaches it to the current frame; the strand resumes
/// transparently with a null value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoroutineTrace {
    /// The coroutine's function name.
    pub function: String,
    /// Where the coroutine is defined.
    pub site: SourceSite,
}

impl CoroutineTrace {
    /// Creates a coroutine identification record.
    #[must_use]
    pub fn new(function: impl Into<String>, site: SourceSite) -> Self {
        Self {
            function: function.into(),
            site,
        }
    }
}

/// Identifies the call site of the next yield, wrapping the value actually
/// yielded there.
///
/// The site is attached to the current frame and `inner` re-enters dispatch
/// as if the record had not been present.
pub struct YieldTrace {
    /// Where the yield happens.
    pub site: SourceSite,
    /// The value yielded at that site.
    pub inner: Yielded,
}

impl YieldTrace {
    /// Wraps a yielded value with its call site.
    #[must_use]
    pub fn new(site: SourceSite, inner: Yielded) -> Self {
        Self { site, inner }
    }
}

/// The annotations accumulated on one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameAnnotation {
    /// The coroutine identification, when one was yielded.
    pub coroutine: Option<CoroutineTrace>,
    /// The most recent yield site, when one was yielded.
    pub yield_site: Option<SourceSite>,
}

impl FrameAnnotation {
    /// Returns true when the frame carries no annotations.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.coroutine.is_none() && self.yield_site.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_site_displays_as_file_line() {
        let site = SourceSite::new("worker.rs", 42);
        assert_eq!(site.to_string(), "worker.rs:42");
    }

    #[test]
    fn empty_annotation_is_empty() {
        let mut ann = FrameAnnotation::default();
        assert!(ann.is_empty());
        ann.yield_site = Some(SourceSite::new("a.rs", 1));
        assert!(!ann.is_empty());
    }

    #[test]
    fn annotation_equality_covers_both_fields() {
        let ann = FrameAnnotation {
            coroutine: Some(CoroutineTrace::new("pump", SourceSite::new("pump.rs", 10))),
            yield_site: Some(SourceSite::new("pump.rs", 17)),
        };
        assert_eq!(ann.clone(), ann);
        assert_ne!(ann, FrameAnnotation::default());
    }
}
