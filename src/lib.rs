pub mod error;
pub mod logging;
pub mod media;
pub mod progress;
pub mod state;
pub mod sync;
pub mod track;
pub mod tree;

// Re-export main types for convenience
pub use error::{CopyError, ItemError, SyncError, TranscodeError, TraversalError};
pub use media::{Copier, FfmpegTranscoder, FsCopier, Transcoder};
pub use progress::{NoopReporter, ProgressEvent, ProgressReporter, SharedProgressReporter};
pub use state::{Collision, SyncPlan, WorkItem, create_sync_plan, plan};
pub use sync::{ItemOutcome, ItemStatus, SyncOptions, SyncReport, execute, sync_library};
pub use track::{Action, Category, canonicalize, categorize, fold_to_ascii};
pub use tree::{Snapshot, list_tree};
