//! Registry of in-flight chain runs.

use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

/// Information about one in-flight run.
#[derive(Debug, Clone)]
pub struct RunInfo {
    /// The run's id.
    pub run_id: Uuid,
    /// Label of the chain the run was started from.
    pub label: String,
    /// Number of actions in the run's snapshot.
    pub steps: usize,
    /// When the run was started (ISO 8601).
    pub started_at: String,
}

/// Thread-safe registry of runs between `start()` and resolution.
///
/// Each [`ChainBuilder`](crate::ChainBuilder) owns one; every run registers
/// itself at launch and unregisters when it completes or halts, so the
/// tracker always reflects what is currently in flight.
#[derive(Default)]
pub struct RunTracker {
    runs: RwLock<HashMap<Uuid, RunInfo>>,
}

impl RunTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a run.
    pub fn register(&self, info: RunInfo) {
        self.runs.write().insert(info.run_id, info);
    }

    /// Unregisters a run.
    pub fn unregister(&self, run_id: Uuid) -> Option<RunInfo> {
        self.runs.write().remove(&run_id)
    }

    /// Gets information about a run, if it is still in flight.
    #[must_use]
    pub fn get(&self, run_id: Uuid) -> Option<RunInfo> {
        self.runs.read().get(&run_id).cloned()
    }

    /// Returns every in-flight run.
    #[must_use]
    pub fn active(&self) -> Vec<RunInfo> {
        self.runs.read().values().cloned().collect()
    }

    /// Number of in-flight runs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.runs.read().len()
    }

    /// Whether no runs are in flight.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runs.read().is_empty()
    }
}
