use notify::{Event, PollWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc as std_mpsc, Arc};
use std::thread;
use tokio::sync::mpsc;

use crate::core::{LoaderConfig, LoaderError, WatchBackend};
use crate::status::{ProgressReport, StatusParser};
use crate::watch::{ArtifactKey, ChangeKind, WatchEvent};

#[derive(Debug, Clone)]
pub struct WatchedKeys {
    pub descriptor: String,
    pub status: String,
}

impl WatchedKeys {
    pub fn from_config(config: &LoaderConfig) -> Self {
        Self {
            descriptor: config.descriptor_file.clone(),
            status: config.status_file.clone(),
        }
    }

    pub fn classify(&self, path: &Path) -> Option<ArtifactKey> {
        let filename = path.file_name().and_then(|s| s.to_str())?;
        if filename == self.descriptor {
            Some(ArtifactKey::Descriptor)
        } else if filename == self.status {
            Some(ArtifactKey::Status)
        } else {
            None
        }
    }
}

/// Watches the streamer directory for the descriptor and status artifacts.
/// Events are delivered on the receiver returned from [`ChangeWatcher::new`].
pub struct ChangeWatcher {
    watcher: Box<dyn Watcher + Send>,
    directory: PathBuf,
    status_path: PathBuf,
    event_sender: mpsc::UnboundedSender<WatchEvent>,
    paused: Arc<AtomicBool>,
}

impl ChangeWatcher {
    pub fn new(config: &LoaderConfig) -> Result<(Self, mpsc::UnboundedReceiver<WatchEvent>), LoaderError> {
        let directory = config.stream_directory.clone();
        if !directory.is_dir() {
            log::error!("Stream directory {} is not available", directory.display());
            return Err(LoaderError::DirectoryMissing(directory));
        }

        let (tx, rx) = std_mpsc::channel::<notify::Result<Event>>();
        let (event_sender, event_receiver) = mpsc::unbounded_channel();

        let setup_error = |source| LoaderError::WatchSetup {
            path: directory.clone(),
            source,
        };
        let mut watcher: Box<dyn Watcher + Send> = match config.watch_backend {
            WatchBackend::Native => Box::new(notify::recommended_watcher(tx).map_err(setup_error)?),
            WatchBackend::Poll => {
                let poll_config = notify::Config::default()
                    .with_poll_interval(config.poll_interval())
                    .with_compare_contents(true);
                Box::new(PollWatcher::new(tx, poll_config).map_err(setup_error)?)
            }
        };

        let keys = WatchedKeys::from_config(config);
        let paused = Arc::new(AtomicBool::new(false));

        let dispatch_paused = paused.clone();
        let dispatch_sender = event_sender.clone();
        thread::Builder::new()
            .name("change-watcher".to_string())
            .spawn(move || {
                // Ends once the notify watcher (and with it `tx`) is dropped
                while let Ok(result) = rx.recv() {
                    match result {
                        Ok(event) => {
                            if dispatch_paused.load(Ordering::SeqCst) {
                                continue;
                            }
                            if !dispatch(&event, &keys, &dispatch_sender) {
                                log::debug!("Watch event receiver dropped, stopping dispatch");
                                break;
                            }
                        }
                        Err(e) => log::warn!("Change watcher error: {}", e),
                    }
                }
            })?;

        watcher
            .watch(&directory, RecursiveMode::NonRecursive)
            .map_err(|source| LoaderError::WatchSetup {
                path: directory.clone(),
                source,
            })?;
        log::info!("Watching {} ({:?} backend)", directory.display(), config.watch_backend);

        Ok((
            ChangeWatcher {
                watcher,
                directory,
                status_path: config.status_path(),
                event_sender,
                paused,
            },
            event_receiver,
        ))
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Stops delivering events. Changes made while paused are not replayed.
    pub fn pause(&mut self) {
        if self.paused.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = self.watcher.unwatch(&self.directory) {
            log::warn!("Failed to unwatch {}: {}", self.directory.display(), e);
        }
        log::info!("Paused watching {}", self.directory.display());
    }

    /// Re-arms the watch on the same directory.
    pub fn resume(&mut self) -> Result<(), LoaderError> {
        if !self.paused.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.watcher
            .watch(&self.directory, RecursiveMode::NonRecursive)
            .map_err(|source| LoaderError::WatchSetup {
                path: self.directory.clone(),
                source,
            })?;
        self.paused.store(false, Ordering::SeqCst);
        log::info!("Resumed watching {}", self.directory.display());
        Ok(())
    }

    /// Re-reads the current status artifact, for callers that need exact
    /// state after a resume. Does nothing if the artifact doesn't exist yet.
    pub fn rescan(&self) {
        if !self.status_path.is_file() {
            log::debug!("No status artifact to rescan at {}", self.status_path.display());
            return;
        }
        let report = read_status(&self.status_path);
        if let Err(e) = self.event_sender.send(WatchEvent::Status(report)) {
            log::error!("Failed to send rescanned status for {:?}: {}", self.status_path, e);
        }
    }
}

/// Forwards at most one event per key for a single notification.
/// Returns false once nobody is listening anymore.
pub(crate) fn dispatch(event: &Event, keys: &WatchedKeys, sender: &mpsc::UnboundedSender<WatchEvent>) -> bool {
    let Some(kind) = ChangeKind::from_event_kind(&event.kind) else {
        return true;
    };

    let mut seen = Vec::with_capacity(2);
    for path in &event.paths {
        let Some(key) = keys.classify(path) else {
            continue;
        };
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);

        let watch_event = match (key, kind) {
            (ArtifactKey::Descriptor, ChangeKind::Created) => {
                log::debug!("Streamer descriptor created");
                continue;
            }
            (ArtifactKey::Descriptor, ChangeKind::Modified) => {
                log::debug!("Streamer descriptor modified");
                WatchEvent::DescriptorReady
            }
            (ArtifactKey::Status, _) => {
                log::debug!("Status artifact changed ({:?})", kind);
                WatchEvent::Status(read_status(path))
            }
        };

        if sender.send(watch_event).is_err() {
            return false;
        }
    }

    true
}

fn read_status(path: &Path) -> Option<ProgressReport> {
    match std::fs::read(path) {
        Ok(bytes) => StatusParser::parse(&bytes),
        Err(e) => {
            log::warn!("Failed to read status artifact {}: {}", path.display(), e);
            StatusParser::parse(&[])
        }
    }
}
