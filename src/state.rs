use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::TraversalError;
use crate::track::{Action, canonicalize};
use crate::tree::{Snapshot, list_tree};

/// One source file whose canonical destination does not exist yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkItem {
    /// Path relative to the source root, used to read the file
    pub source: String,
    /// Canonical path relative to the destination root
    pub destination: String,
    /// Whether the file is copied or transcoded
    pub action: Action,
}

/// A destination claimed by more than one source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Collision {
    pub destination: String,
    /// Colliding sources in lexicographic order; the last one is written last
    pub sources: Vec<String>,
}

/// Plan for synchronization, indicating what needs to be written
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncPlan {
    /// Items to process, in source traversal order
    pub to_process: Vec<WorkItem>,
    /// Items whose canonical destination already exists
    pub already_synced: Vec<WorkItem>,
    /// Source files that are not music, or are hidden
    pub ignored: Vec<String>,
    /// Destinations that more than one pending source maps to
    pub collisions: Vec<Collision>,
    /// Total number of files in the source tree
    pub total_source_files: usize,
}

/// Scan both trees and plan the work needed to bring the destination up to date
///
/// Fails if either tree cannot be listed; nothing is returned in that case.
pub fn plan(source_root: &Path, destination_root: &Path) -> Result<SyncPlan, TraversalError> {
    let source = list_tree(source_root)?;
    let destination = list_tree(destination_root)?;
    Ok(create_sync_plan(&source, &destination))
}

/// Create a sync plan by diffing two snapshots
///
/// A source file is pending when its canonical destination name is not an
/// exact member of the destination snapshot. Category comes from the source
/// side only.
pub fn create_sync_plan(source: &Snapshot, destination: &Snapshot) -> SyncPlan {
    let existing: HashSet<&str> = destination.files.iter().map(String::as_str).collect();

    let mut plan = SyncPlan {
        total_source_files: source.len(),
        ..Default::default()
    };

    for path in &source.files {
        let (canonical, category) = canonicalize(path);

        let (Some(target), Some(action)) = (canonical, category.action()) else {
            plan.ignored.push(path.clone());
            continue;
        };

        let item = WorkItem {
            source: path.clone(),
            destination: target,
            action,
        };

        if existing.contains(item.destination.as_str()) {
            plan.already_synced.push(item);
        } else {
            debug!(source = %item.source, destination = %item.destination, "Planned");
            plan.to_process.push(item);
        }
    }

    plan.collisions = find_collisions(&plan.to_process);
    for collision in &plan.collisions {
        warn!(
            destination = %collision.destination,
            sources = ?collision.sources,
            "Multiple source files map to the same destination"
        );
    }

    info!(
        total = plan.total_source_files,
        pending = plan.to_process.len(),
        synced = plan.already_synced.len(),
        ignored = plan.ignored.len(),
        "Sync plan ready"
    );

    plan
}

fn find_collisions(items: &[WorkItem]) -> Vec<Collision> {
    let mut by_destination: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for item in items {
        by_destination
            .entry(item.destination.as_str())
            .or_default()
            .push(item.source.clone());
    }

    by_destination
        .into_iter()
        .filter(|(_, sources)| sources.len() > 1)
        .map(|(destination, mut sources)| {
            sources.sort();
            Collision {
                destination: destination.to_string(),
                sources,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn snapshot(files: &[&str]) -> Snapshot {
        Snapshot {
            root: PathBuf::from("/tmp"),
            files: files.iter().map(|f| f.to_string()).collect(),
        }
    }

    fn destinations(plan: &SyncPlan) -> Vec<&str> {
        plan.to_process
            .iter()
            .map(|item| item.destination.as_str())
            .collect()
    }

    #[test]
    fn both_trees_empty() {
        let plan = create_sync_plan(&snapshot(&[]), &snapshot(&[]));
        assert!(plan.to_process.is_empty());
        assert_eq!(plan.total_source_files, 0);
    }

    #[test]
    fn empty_source_with_populated_destination() {
        let plan = create_sync_plan(&snapshot(&[]), &snapshot(&["file1.mp3", "file2.mp3"]));
        assert!(plan.to_process.is_empty());
    }

    #[test]
    fn empty_destination_plans_every_music_file() {
        let plan = create_sync_plan(&snapshot(&["file1.m4a", "file2.m4a"]), &snapshot(&[]));
        assert_eq!(destinations(&plan), vec!["file1.mp3", "file2.mp3"]);
    }

    #[test]
    fn skips_files_already_in_destination() {
        let plan = create_sync_plan(
            &snapshot(&["file1.m4a", "file2.m4a", "file3.m4a"]),
            &snapshot(&["file2.mp3", "file3.mp3", "file4.mp3"]),
        );

        assert_eq!(destinations(&plan), vec!["file1.mp3"]);
        assert_eq!(plan.already_synced.len(), 2);
    }

    #[test]
    fn set_difference_across_categories() {
        let plan = create_sync_plan(
            &snapshot(&["a.m4a", "b.mp3", "c.aif"]),
            &snapshot(&["b.mp3"]),
        );

        assert_eq!(
            plan.to_process,
            vec![
                WorkItem {
                    source: "a.m4a".to_string(),
                    destination: "a.mp3".to_string(),
                    action: Action::Transcode,
                },
                WorkItem {
                    source: "c.aif".to_string(),
                    destination: "c.mp3".to_string(),
                    action: Action::Transcode,
                },
            ]
        );
    }

    #[test]
    fn mp3_sources_are_copied_verbatim() {
        let plan = create_sync_plan(
            &snapshot(&["file1.m4a", "file103.mp3"]),
            &snapshot(&["file4.mp3"]),
        );

        assert_eq!(destinations(&plan), vec!["file1.mp3", "file103.mp3"]);
        assert_eq!(plan.to_process[1].action, Action::Copy);
        assert_eq!(plan.to_process[1].source, "file103.mp3");
    }

    #[test]
    fn destination_m4a_does_not_count_as_synced() {
        let plan = create_sync_plan(
            &snapshot(&["file4.m4a"]),
            &snapshot(&["file4.m4a", "file5.mp3"]),
        );

        assert_eq!(destinations(&plan), vec!["file4.mp3"]);
    }

    #[test]
    fn mp3_source_matching_transcoded_destination_is_synced() {
        let plan = create_sync_plan(&snapshot(&["song.mp3"]), &snapshot(&["song.mp3"]));
        assert!(plan.to_process.is_empty());
        assert_eq!(plan.already_synced.len(), 1);
    }

    #[test]
    fn ignored_files_never_planned() {
        let plan = create_sync_plan(
            &snapshot(&[".DS_Store", "notes.txt", "._file7.m4a", "file3"]),
            &snapshot(&[]),
        );

        assert!(plan.to_process.is_empty());
        assert_eq!(plan.ignored.len(), 4);
    }

    #[test]
    fn ignored_files_never_planned_even_if_in_destination() {
        let plan = create_sync_plan(
            &snapshot(&[".DS_Store", "notes.txt"]),
            &snapshot(&[".DS_Store", "notes.txt"]),
        );

        assert!(plan.to_process.is_empty());
        assert!(plan.already_synced.is_empty());
    }

    #[test]
    fn plans_non_ascii_names_with_folded_destination() {
        let source = [
            "Megan Perry Fisher/Megan Perry Fisher - Pensées/Megan Perry Fisher - Pensées - 12 Pensée xii.m4a",
        ];
        let plan = create_sync_plan(&snapshot(&source), &snapshot(&[]));

        assert_eq!(
            destinations(&plan),
            vec![
                "Megan Perry Fisher/Megan Perry Fisher - Pensees/Megan Perry Fisher - Pensees - 12 Pensee xii.mp3"
            ]
        );
        assert_eq!(plan.to_process[0].source, source[0]);
    }

    #[test]
    fn does_not_replan_folded_names() {
        let plan = create_sync_plan(
            &snapshot(&["Stéphane/Ørsted.m4a"]),
            &snapshot(&["Stephane/Orsted.mp3"]),
        );

        assert!(plan.to_process.is_empty());
    }

    #[test]
    fn detects_collisions_but_keeps_both_items() {
        let plan = create_sync_plan(&snapshot(&["Cafe.m4a", "Café.m4a"]), &snapshot(&[]));

        assert_eq!(destinations(&plan), vec!["Cafe.mp3", "Cafe.mp3"]);
        assert_eq!(
            plan.collisions,
            vec![Collision {
                destination: "Cafe.mp3".to_string(),
                sources: vec!["Cafe.m4a".to_string(), "Café.m4a".to_string()],
            }]
        );
    }

    #[test]
    fn no_collisions_for_distinct_destinations() {
        let plan = create_sync_plan(&snapshot(&["a.m4a", "b.wav"]), &snapshot(&[]));
        assert!(plan.collisions.is_empty());
    }

    #[test]
    fn plan_reads_both_trees() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("source");
        let destination = dir.path().join("destination");
        std::fs::create_dir_all(source.join("album")).unwrap();
        std::fs::create_dir_all(destination.join("album")).unwrap();
        std::fs::write(source.join("album/one.m4a"), b"").unwrap();
        std::fs::write(source.join("album/two.mp3"), b"").unwrap();
        std::fs::write(destination.join("album/one.mp3"), b"").unwrap();

        let plan = plan(&source, &destination).unwrap();

        assert_eq!(destinations(&plan), vec!["album/two.mp3"]);
    }

    #[test]
    fn plan_tolerates_missing_destination() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("source");
        std::fs::create_dir_all(&source).unwrap();
        std::fs::write(source.join("one.wav"), b"").unwrap();

        let plan = plan(&source, &dir.path().join("destination dir that does not exist")).unwrap();

        assert_eq!(destinations(&plan), vec!["one.mp3"]);
    }

    #[test]
    fn plan_fails_when_source_is_a_file() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("source");
        std::fs::write(&source, b"").unwrap();

        let result = plan(&source, &dir.path().join("destination"));
        assert!(matches!(result, Err(TraversalError::NotADirectory(_))));
    }
}
