//! Lab kernel configuration.

use serde::{Deserialize, Serialize};

/// Configuration for [`LabKernel`](crate::lab::LabKernel).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabConfig {
    /// Maximum number of queue steps a kernel may execute across its
    /// lifetime; `None` disables the guard.
    pub max_steps: Option<u64>,
}

impl LabConfig {
    /// The default step limit.
    pub const DEFAULT_MAX_STEPS: u64 = 10_000;

    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the step limit.
    #[must_use]
    pub const fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    /// Removes the step limit.
    #[must_use]
    pub const fn without_step_limit(mut self) -> Self {
        self.max_steps = None;
        self
    }
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            max_steps: Some(Self::DEFAULT_MAX_STEPS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_has_a_step_limit() {
        assert_eq!(
            LabConfig::new().max_steps,
            Some(LabConfig::DEFAULT_MAX_STEPS)
        );
    }

    #[test]
    fn builders_adjust_the_limit() {
        assert_eq!(LabConfig::new().with_max_steps(5).max_steps, Some(5));
        assert_eq!(LabConfig::new().without_step_limit().max_steps, None);
    }
}
