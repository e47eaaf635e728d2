use std::sync::Arc;

use log_schema::{Category, Level, LogEntry};
use tracing::error;

use crate::error::DIAGNOSTIC_TARGET;
use crate::transport::Transport;

/// A transport together with the minimum level it accepts.
#[derive(Clone)]
pub struct Target {
    pub min_level: Level,
    pub transport: Arc<dyn Transport>,
}

impl Target {
    pub fn new(min_level: Level, transport: Arc<dyn Transport>) -> Self {
        Self {
            min_level,
            transport,
        }
    }

    pub fn admits(&self, level: Level) -> bool {
        level >= self.min_level
    }
}

/// Fans entries of one category out to every target whose minimum level
/// admits them.
///
/// Targets are independent: a failing target is reported on the diagnostic
/// channel and the remaining targets still receive the entry.
pub struct TransportRouter {
    category: Category,
    targets: Vec<Target>,
}

impl std::fmt::Debug for TransportRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportRouter")
            .field("category", &self.category)
            .field(
                "targets",
                &self
                    .targets
                    .iter()
                    .map(|t| format!("{}>={}", t.transport.name(), t.min_level))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl TransportRouter {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            targets: Vec::new(),
        }
    }

    pub fn with_target(mut self, target: Target) -> Self {
        self.targets.push(target);
        self
    }

    pub fn push(&mut self, target: Target) {
        self.targets.push(target);
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    /// Deliver `entry` to every admitting target. Returns how many targets
    /// accepted it.
    pub fn dispatch(&self, entry: &LogEntry) -> usize {
        let mut delivered = 0;
        for target in self.targets.iter().filter(|t| t.admits(entry.level)) {
            match target.transport.deliver(entry) {
                Ok(()) => delivered += 1,
                Err(err) => error!(
                    target: DIAGNOSTIC_TARGET,
                    transport = target.transport.name(),
                    category = %self.category,
                    level = %entry.level,
                    %err,
                    "transport delivery failed"
                ),
            }
        }
        delivered
    }
}
