// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::TraversalError;

/// The regular files under a root at one point in time
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// The directory that was listed
    pub root: PathBuf,
    /// Paths relative to `root`, `/`-separated, in traversal order
    pub files: Vec<String>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// List every regular file under `root`, relative to `root`
///
/// A missing root yields an empty snapshot, since a destination that has not
/// been created yet is expected on the first run. Entries are visited in
/// lexicographic order within each directory, so the result is stable across
/// runs. Directories and symlinks are not included.
pub fn list_tree(root: &Path) -> Result<Snapshot, TraversalError> {
    let mut files = Vec::new();

    match std::fs::metadata(root) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(root = %root.display(), "Tree root does not exist yet");
            return Ok(Snapshot {
                root: root.to_path_buf(),
                files,
            });
        }
        Ok(metadata) if !metadata.is_dir() => {
            return Err(TraversalError::NotADirectory(root.to_path_buf()));
        }
        _ => {}
    }

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| TraversalError::ReadDirectoryFailed {
            path: e.path().unwrap_or(root).to_path_buf(),
            source: e,
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };

        match relative_to_string(relative) {
            Some(relative) => files.push(relative),
            None => warn!(
                path = %entry.path().display(),
                "Skipping file with a name that is not valid UTF-8"
            ),
        }
    }

    debug!(root = %root.display(), files = files.len(), "Listed tree");

    Ok(Snapshot {
        root: root.to_path_buf(),
        files,
    })
}

/// Join the normal components of a relative path with `/`
fn relative_to_string(relative: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        if let Component::Normal(part) = component {
            parts.push(part.to_str()?);
        }
    }
    Some(parts.join("/"))
}
