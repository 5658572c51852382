use std::path::Path;

use crate::error::ItemError;
use crate::media::{Copier, Transcoder};
use crate::progress::{ProgressEvent, SharedProgressReporter};
use crate::state::WorkItem;
use crate::track::Action;

/// Context for tracking an item in concurrent scenarios
#[derive(Debug, Clone)]
pub struct ItemContext {
    /// Slot ID (0 to max_concurrent-1) for progress bar management
    pub slot_id: usize,
    /// Index of this item in the plan
    pub item_index: usize,
    /// Total number of items in the plan
    pub total_items: usize,
}

/// Bring one work item into the destination tree
///
/// Creates the destination's parent directory if needed, then hands the
/// absolute paths to the transcoder or the copier depending on the item's
/// action. A partially written destination is left in place on failure.
pub async fn process_item<T: Transcoder, C: Copier>(
    transcoder: &T,
    copier: &C,
    item: &WorkItem,
    source_root: &Path,
    destination_root: &Path,
    context: &ItemContext,
    reporter: &SharedProgressReporter,
) -> Result<(), ItemError> {
    let source_path = source_root.join(&item.source);
    let destination_path = destination_root.join(&item.destination);

    reporter.report(ProgressEvent::ItemStarting {
        slot_id: context.slot_id,
        source: item.source.clone(),
        action: item.action,
        item_index: context.item_index,
        total_items: context.total_items,
    });

    if let Some(parent) = destination_path.parent() {
        // create_dir_all tolerates directories created concurrently
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ItemError::CreateDirectoryFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
    }

    match item.action {
        Action::Transcode => {
            transcoder
                .transcode(&source_path, &destination_path)
                .await?;
        }
        Action::Copy => {
            copier.copy(&source_path, &destination_path).await?;
        }
    }

    reporter.report(ProgressEvent::ItemCompleted {
        slot_id: context.slot_id,
        source: item.source.clone(),
        destination: item.destination.clone(),
        action: item.action,
    });

    Ok(())
}
