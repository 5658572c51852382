//! Log output for the command-line tool.
//!
//! Library code emits `tracing` events; this module installs the subscriber
//! that renders them. Control the level with `RUST_LOG`:
//!
//! ```bash
//! RUST_LOG=debug mp3mirror --source music --destination phone
//! RUST_LOG=mp3mirror::state=debug mp3mirror
//! ```

use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber, writing to stderr.
///
/// `RUST_LOG` takes precedence; otherwise `default_level` is used.
pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // try_init so tests or embedders that already installed a subscriber keep it
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
