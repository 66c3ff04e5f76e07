//! Run-scoped log of recoverable events

use tracing::{info, warn};

/// Warnings collected during one run. They never change its outcome.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    warnings: Vec<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning and emit it through tracing
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.warnings.push(message);
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn count(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Log the end-of-run summary
    pub fn summarize(&self) {
        if self.warnings.is_empty() {
            info!("Finished without warnings");
        } else {
            info!("Finished with {} warning(s)", self.warnings.len());
            for (i, message) in self.warnings.iter().enumerate() {
                info!("  {}: {}", i + 1, message);
            }
        }
    }
}
