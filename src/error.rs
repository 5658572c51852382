use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while listing a directory tree
#[derive(Error, Debug)]
pub enum TraversalError {
    #[error("Failed to read directory {path}: {source}")]
    ReadDirectoryFailed {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Errors reported by the external encoder
#[derive(Error, Debug)]
pub enum TranscodeError {
    #[error("Failed to start encoder '{program}': {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Encoder exited with {status} for {source_path}: {stderr}")]
    EncoderFailed {
        source_path: PathBuf,
        status: String,
        stderr: String,
    },
}

/// Errors that can occur while copying a file verbatim
#[derive(Error, Debug)]
pub enum CopyError {
    #[error("Failed to open {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create file {path}: {source}")]
    CreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write to file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to flush {path} to disk: {source}")]
    FlushFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that fail a single work item without aborting the batch
#[derive(Error, Debug)]
pub enum ItemError {
    #[error("Failed to create directory {path}: {source}")]
    CreateDirectoryFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Transcode failed: {0}")]
    Transcode(#[from] TranscodeError),

    #[error("Copy failed: {0}")]
    Copy(#[from] CopyError),

    #[error("Worker panicked: {0}")]
    Panicked(String),
}

/// Top-level errors for sync operations
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Traversal error: {0}")]
    Traversal(#[from] TraversalError),

    #[error("Source directory does not exist: {0}")]
    SourceNotFound(PathBuf),

    #[error("Failed to create destination directory {path}: {source}")]
    CreateDestinationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
