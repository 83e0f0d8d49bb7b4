use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failures that stop a stream session from being set up. Everything that
/// goes wrong after setup is absorbed inside the session and only logged.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Stream directory {0} does not exist or is not a directory")]
    DirectoryMissing(PathBuf),

    #[error("Failed to watch {path}: {source}")]
    WatchSetup {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("Failed to spawn change watcher thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Streaming service not ready after {0:?}")]
    ServiceTimeout(Duration),

    #[error("Streaming service failed to start: {0}")]
    ServiceFailed(String),

    #[error("Stream session already closed")]
    SessionClosed,
}
