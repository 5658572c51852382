use std::sync::Arc;

use crate::track::Action;

/// Events emitted during library synchronization for progress reporting
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// A directory tree is being listed
    ScanningTree { root: String },

    /// Both trees have been listed and diffed
    PlanReady {
        total_files: usize,
        ignored_count: usize,
        synced_count: usize,
        to_process: usize,
    },

    /// More than one source file maps to the same destination
    CollisionDetected {
        destination: String,
        sources: Vec<String>,
    },

    /// An item is starting
    ItemStarting {
        /// Identifies the worker slot (0 to max_concurrent-1)
        slot_id: usize,
        source: String,
        action: Action,
        /// Index of this item in the plan
        item_index: usize,
        /// Total number of items in the plan
        total_items: usize,
    },

    /// An item was written successfully
    ItemCompleted {
        /// Identifies the worker slot
        slot_id: usize,
        source: String,
        destination: String,
        action: Action,
    },

    /// An item failed; the batch continues
    ItemFailed {
        /// Identifies the worker slot
        slot_id: usize,
        source: String,
        destination: String,
        error: String,
    },

    /// Shutdown was requested; no further items will start
    Cancelling { remaining: usize },

    /// Sync operation completed
    SyncCompleted {
        processed_count: usize,
        synced_count: usize,
        failed_count: usize,
        cancelled_count: usize,
    },
}

/// Trait for reporting progress events during synchronization.
///
/// Implementations can use this to display progress bars, log messages,
/// or collect statistics.
pub trait ProgressReporter: Send + Sync {
    /// Report a progress event
    fn report(&self, event: ProgressEvent);
}

/// A shared reference to a progress reporter
pub type SharedProgressReporter = Arc<dyn ProgressReporter>;

/// A no-op progress reporter that silently ignores all events.
/// Useful for tests or quiet mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _event: ProgressEvent) {}
}

impl NoopReporter {
    /// Create a new NoopReporter wrapped in an Arc
    pub fn shared() -> SharedProgressReporter {
        Arc::new(Self)
    }
}
