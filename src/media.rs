// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::fs::File;
use tokio::process::Command;

use crate::error::{CopyError, TranscodeError};

/// Encoder abstraction for testability
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Convert the file at `source` into an MP3 written to `destination`
    async fn transcode(&self, source: &Path, destination: &Path) -> Result<(), TranscodeError>;
}

/// Byte copier abstraction for testability
#[async_trait]
pub trait Copier: Send + Sync {
    /// Copy `source` to `destination`, returning the number of bytes written
    ///
    /// Implementations must flush the data to stable storage before returning.
    async fn copy(&self, source: &Path, destination: &Path) -> Result<u64, CopyError>;
}

/// Default transcoder running an `ffmpeg` child process
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: PathBuf,
}

impl FfmpegTranscoder {
    /// Create a transcoder using `ffmpeg` from `PATH`
    pub fn new() -> Self {
        Self::with_program("ffmpeg")
    }

    /// Create a transcoder using a specific encoder binary
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Arguments passed to the encoder for one conversion
    fn arguments(source: &Path, destination: &Path) -> Vec<std::ffi::OsString> {
        vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-nostdin".into(),
            "-y".into(),
            "-i".into(),
            source.as_os_str().to_os_string(),
            destination.as_os_str().to_os_string(),
        ]
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, source: &Path, destination: &Path) -> Result<(), TranscodeError> {
        let mut command = Command::new(&self.program);
        // The child is killed if this future is dropped mid-conversion
        command
            .args(Self::arguments(source, destination))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Own process group: a terminal Ctrl-C reaches only us, so a running
        // conversion completes while shutdown stops new ones
        #[cfg(unix)]
        command.process_group(0);

        let output = command
            .output()
            .await
            .map_err(|e| TranscodeError::SpawnFailed {
                program: self.program.display().to_string(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(TranscodeError::EncoderFailed {
                source_path: source.to_path_buf(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

/// Default copier using tokio's async file APIs
#[derive(Debug, Default, Clone, Copy)]
pub struct FsCopier;

#[async_trait]
impl Copier for FsCopier {
    async fn copy(&self, source: &Path, destination: &Path) -> Result<u64, CopyError> {
        let mut reader = File::open(source)
            .await
            .map_err(|e| CopyError::OpenFailed {
                path: source.to_path_buf(),
                source: e,
            })?;

        let mut writer = File::create(destination)
            .await
            .map_err(|e| CopyError::CreateFailed {
                path: destination.to_path_buf(),
                source: e,
            })?;

        let bytes = tokio::io::copy(&mut reader, &mut writer)
            .await
            .map_err(|e| CopyError::WriteFailed {
                path: destination.to_path_buf(),
                source: e,
            })?;

        // Ensure all data is flushed to disk
        writer
            .sync_all()
            .await
            .map_err(|e| CopyError::FlushFailed {
                path: destination.to_path_buf(),
                source: e,
            })?;

        Ok(bytes)
    }
}
