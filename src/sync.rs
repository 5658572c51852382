// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::FutureExt;
use serde::Serialize;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};

use crate::error::{ItemError, SyncError};
use crate::media::{Copier, Transcoder};
use crate::progress::{ProgressEvent, SharedProgressReporter};
use crate::state::{Collision, SyncPlan, WorkItem, create_sync_plan};
use crate::track::{ItemContext, process_item};
use crate::tree::list_tree;

/// Upper bound on parallel lanes, whatever the options ask for
pub const MAX_CONCURRENT: usize = 256;

/// Options for library synchronization
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Maximum number of items processed at once (1 = strictly sequential)
    pub max_concurrent: usize,
    /// Once set, no further items are started
    pub shutdown: Arc<AtomicBool>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            max_concurrent: 1,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl SyncOptions {
    fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }
}

/// What happened to a single work item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "lowercase")]
pub enum ItemStatus {
    Written,
    Failed(String),
    /// Never started because shutdown was requested
    Cancelled,
}

/// Outcome of one work item
#[derive(Debug, Clone, Serialize)]
pub struct ItemOutcome {
    pub item: WorkItem,
    #[serde(flatten)]
    pub status: ItemStatus,
}

/// Result of a sync operation
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    /// One outcome per planned item, in plan order
    pub outcomes: Vec<ItemOutcome>,
    /// Number of music files whose destination already existed
    pub skipped: usize,
    /// Destinations claimed by more than one source
    pub collisions: Vec<Collision>,
    /// Planned destinations that do not exist after the run
    pub missing: Vec<String>,
}

impl SyncReport {
    fn count(&self, matches: impl Fn(&ItemStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| matches(&o.status)).count()
    }

    /// Number of items written successfully
    pub fn processed(&self) -> usize {
        self.count(|s| matches!(s, ItemStatus::Written))
    }

    /// Number of items that failed
    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, ItemStatus::Failed(_)))
    }

    /// Number of items skipped because of shutdown
    pub fn cancelled(&self) -> usize {
        self.count(|s| matches!(s, ItemStatus::Cancelled))
    }

    /// Failed items with their error messages
    pub fn failures(&self) -> impl Iterator<Item = (&WorkItem, &str)> {
        self.outcomes.iter().filter_map(|o| match &o.status {
            ItemStatus::Failed(error) => Some((&o.item, error.as_str())),
            _ => None,
        })
    }
}

/// Synchronize a source music tree into an MP3-only destination tree
///
/// This is the main entry point for the library. It:
/// 1. Creates the destination root if needed
/// 2. Lists both trees
/// 3. Creates a sync plan
/// 4. Transcodes or copies each pending item
/// 5. Checks which planned destinations ended up on disk
///
/// Only setup and listing failures are returned as errors; per-item failures
/// are recorded in the report.
pub async fn sync_library<T, C>(
    transcoder: &T,
    copier: &C,
    source_root: &Path,
    destination_root: &Path,
    options: &SyncOptions,
    reporter: SharedProgressReporter,
) -> Result<SyncReport, SyncError>
where
    T: Transcoder + Clone + 'static,
    C: Copier + Clone + 'static,
{
    if !source_root.is_dir() {
        return Err(SyncError::SourceNotFound(source_root.to_path_buf()));
    }

    tokio::fs::create_dir_all(destination_root)
        .await
        .map_err(|e| SyncError::CreateDestinationFailed {
            path: destination_root.to_path_buf(),
            source: e,
        })?;

    reporter.report(ProgressEvent::ScanningTree {
        root: source_root.display().to_string(),
    });
    let source = list_tree(source_root)?;

    reporter.report(ProgressEvent::ScanningTree {
        root: destination_root.display().to_string(),
    });
    let destination = list_tree(destination_root)?;

    let plan = create_sync_plan(&source, &destination);

    reporter.report(ProgressEvent::PlanReady {
        total_files: plan.total_source_files,
        ignored_count: plan.ignored.len(),
        synced_count: plan.already_synced.len(),
        to_process: plan.to_process.len(),
    });

    for collision in &plan.collisions {
        reporter.report(ProgressEvent::CollisionDetected {
            destination: collision.destination.clone(),
            sources: collision.sources.clone(),
        });
    }

    let mut report = execute(
        transcoder,
        copier,
        &plan,
        source_root,
        destination_root,
        options,
        reporter.clone(),
    )
    .await;

    report.missing = find_missing(&plan, destination_root).await;

    reporter.report(ProgressEvent::SyncCompleted {
        processed_count: report.processed(),
        synced_count: report.skipped,
        failed_count: report.failed(),
        cancelled_count: report.cancelled(),
    });

    Ok(report)
}

/// Process every pending item of a plan
///
/// Items are grouped into lanes by destination. A lane runs sequentially, in
/// lexicographic source order, so colliding sources never run at the same
/// time and the last source in that order is written last. Up to
/// `max_concurrent` lanes run in parallel. Item failures never abort the
/// batch.
pub async fn execute<T, C>(
    transcoder: &T,
    copier: &C,
    plan: &SyncPlan,
    source_root: &Path,
    destination_root: &Path,
    options: &SyncOptions,
    reporter: SharedProgressReporter,
) -> SyncReport
where
    T: Transcoder + Clone + 'static,
    C: Copier + Clone + 'static,
{
    let total_items = plan.to_process.len();
    let max_concurrent = options.max_concurrent.clamp(1, MAX_CONCURRENT);

    // Slot pool limits concurrency and provides stable slot IDs
    let (slot_tx, mut slot_rx) = mpsc::channel(max_concurrent);
    for slot in 0..max_concurrent {
        let _ = slot_tx.try_send(slot);
    }

    let outcomes: Arc<Mutex<Vec<Option<ItemOutcome>>>> =
        Arc::new(Mutex::new(vec![None; total_items]));

    let source_root = source_root.to_path_buf();
    let destination_root = destination_root.to_path_buf();

    let mut handles = Vec::new();
    let mut lanes = build_lanes(&plan.to_process).into_iter();

    while let Some(lane) = lanes.next() {
        // Acquire a slot BEFORE spawning so lanes start in plan order
        let Some(slot_id) = slot_rx.recv().await else {
            break;
        };

        if options.is_shutting_down() {
            let cancelled: Vec<_> = std::iter::once(lane)
                .chain(lanes.by_ref())
                .flatten()
                .collect();

            reporter.report(ProgressEvent::Cancelling {
                remaining: cancelled.len(),
            });

            let mut outcomes = outcomes.lock().await;
            for (item_index, item) in cancelled {
                outcomes[item_index] = Some(ItemOutcome {
                    item,
                    status: ItemStatus::Cancelled,
                });
            }
            break;
        }

        let slot_tx = slot_tx.clone();
        let transcoder = transcoder.clone();
        let copier = copier.clone();
        let source_root = source_root.clone();
        let destination_root = destination_root.clone();
        let reporter = reporter.clone();
        let outcomes = outcomes.clone();
        let shutdown = options.shutdown.clone();

        let handle = tokio::spawn(async move {
            for (item_index, item) in lane {
                let status = if shutdown.load(Ordering::SeqCst) {
                    ItemStatus::Cancelled
                } else {
                    let context = ItemContext {
                        slot_id,
                        item_index,
                        total_items,
                    };

                    // A panicking collaborator fails its item, not the lane
                    let result = AssertUnwindSafe(process_item(
                        &transcoder,
                        &copier,
                        &item,
                        &source_root,
                        &destination_root,
                        &context,
                        &reporter,
                    ))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|payload| Err(ItemError::Panicked(panic_message(&*payload))));

                    match result {
                        Ok(()) => ItemStatus::Written,
                        Err(e) => {
                            debug!(
                                source = %item.source,
                                destination = %item.destination,
                                error = %e,
                                "Item failed"
                            );
                            reporter.report(ProgressEvent::ItemFailed {
                                slot_id,
                                source: item.source.clone(),
                                destination: item.destination.clone(),
                                error: e.to_string(),
                            });
                            ItemStatus::Failed(e.to_string())
                        }
                    }
                };

                outcomes.lock().await[item_index] = Some(ItemOutcome { item, status });
            }

            // Return slot to the pool when done
            let _ = slot_tx.send(slot_id).await;
        });

        handles.push(handle);
    }

    // Wait for all lanes to complete
    futures::future::join_all(handles).await;

    let outcomes = outcomes.lock().await.clone();
    let outcomes: Vec<ItemOutcome> = outcomes
        .into_iter()
        .zip(&plan.to_process)
        .map(|(outcome, item)| {
            outcome.unwrap_or_else(|| ItemOutcome {
                item: item.clone(),
                status: ItemStatus::Failed("worker task aborted".to_string()),
            })
        })
        .collect();

    let report = SyncReport {
        outcomes,
        skipped: plan.already_synced.len(),
        collisions: plan.collisions.clone(),
        missing: Vec::new(),
    };

    info!(
        processed = report.processed(),
        failed = report.failed(),
        cancelled = report.cancelled(),
        skipped = report.skipped,
        "Sync finished"
    );

    report
}

/// Text of a panic payload, for the item's failure message
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Group items by destination, keeping lanes in order of first appearance
fn build_lanes(items: &[WorkItem]) -> Vec<Vec<(usize, WorkItem)>> {
    let mut lanes: Vec<Vec<(usize, WorkItem)>> = Vec::new();
    let mut lane_for: HashMap<&str, usize> = HashMap::new();

    for (index, item) in items.iter().enumerate() {
        match lane_for.get(item.destination.as_str()) {
            Some(&lane) => lanes[lane].push((index, item.clone())),
            None => {
                lane_for.insert(item.destination.as_str(), lanes.len());
                lanes.push(vec![(index, item.clone())]);
            }
        }
    }

    for lane in &mut lanes {
        lane.sort_by(|(_, a), (_, b)| a.source.cmp(&b.source));
    }

    lanes
}

/// Planned destinations that are not on disk
async fn find_missing(plan: &SyncPlan, destination_root: &Path) -> Vec<String> {
    let mut missing = Vec::new();
    for item in &plan.to_process {
        let exists = tokio::fs::try_exists(destination_root.join(&item.destination))
            .await
            .unwrap_or(false);
        if !exists && !missing.contains(&item.destination) {
            missing.push(item.destination.clone());
        }
    }
    missing
}
