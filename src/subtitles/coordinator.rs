use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::watch;

/// Language value hosts pass when the user explicitly picked "no subtitles".
pub const NO_SUBTITLES: &str = "no-subs";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SubtitleOutcome {
    Pending,
    Succeeded,
    Failed,
    /// No subtitles were asked for. Gates like `Succeeded`, launches like `Failed`.
    NotRequested,
}

impl SubtitleOutcome {
    pub fn is_pending(self) -> bool {
        self == SubtitleOutcome::Pending
    }

    pub fn carries_subtitles(self) -> bool {
        self == SubtitleOutcome::Succeeded
    }
}

pub type FetchFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'static>>;

/// Downloads subtitles for a media item. Implementations own their transport.
pub trait SubtitleFetcher: Send + Sync {
    fn fetch(&self, media_id: &str, language: &str) -> FetchFuture;
}

impl<F> SubtitleFetcher for F
where
    F: Fn(&str, &str) -> FetchFuture + Send + Sync,
{
    fn fetch(&self, media_id: &str, language: &str) -> FetchFuture {
        self(media_id, language)
    }
}

/// Looks for an already downloaded `<media_id>.<language>.srt` in a directory.
pub struct LocalSubtitleFetcher {
    directory: PathBuf,
}

impl LocalSubtitleFetcher {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn subtitle_path(&self, media_id: &str, language: &str) -> PathBuf {
        self.directory.join(format!("{}.{}.srt", media_id, language))
    }
}

impl SubtitleFetcher for LocalSubtitleFetcher {
    fn fetch(&self, media_id: &str, language: &str) -> FetchFuture {
        let path = self.subtitle_path(media_id, language);
        Box::pin(async move {
            let metadata = tokio::fs::metadata(&path)
                .await
                .map_err(|e| anyhow::anyhow!("Subtitle file {} not available: {}", path.display(), e))?;
            if metadata.len() == 0 {
                return Err(anyhow::anyhow!("Subtitle file {} is empty", path.display()));
            }
            Ok(())
        })
    }
}

/// Write side of a subtitle outcome. Only the first resolution sticks.
#[derive(Clone)]
pub struct SubtitleResolver {
    sender: Arc<watch::Sender<SubtitleOutcome>>,
}

impl SubtitleResolver {
    /// Returns true if this call resolved the outcome.
    pub fn resolve(&self, outcome: SubtitleOutcome) -> bool {
        if outcome.is_pending() {
            return false;
        }
        self.sender.send_if_modified(|current| {
            if current.is_pending() {
                *current = outcome;
                true
            } else {
                false
            }
        })
    }
}

/// Read side of a subtitle outcome.
#[derive(Clone)]
pub struct SubtitleHandle {
    receiver: watch::Receiver<SubtitleOutcome>,
    language: Option<String>,
}

impl SubtitleHandle {
    /// An outcome that is already settled as "not requested".
    pub fn not_requested() -> Self {
        let (_sender, receiver) = watch::channel(SubtitleOutcome::NotRequested);
        Self {
            receiver,
            language: None,
        }
    }

    /// A pending outcome for callers that drive resolution themselves.
    pub fn pending(language: impl Into<String>) -> (Self, SubtitleResolver) {
        let (sender, receiver) = watch::channel(SubtitleOutcome::Pending);
        (
            Self {
                receiver,
                language: Some(language.into()),
            },
            SubtitleResolver {
                sender: Arc::new(sender),
            },
        )
    }

    pub fn outcome(&self) -> SubtitleOutcome {
        *self.receiver.borrow()
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// Waits until the outcome is no longer pending. If every resolver is
    /// gone without resolving, returns `Pending`.
    pub async fn resolved(&mut self) -> SubtitleOutcome {
        let resolved = self.receiver.wait_for(|outcome| !outcome.is_pending()).await.map(|outcome| *outcome);
        resolved.unwrap_or(SubtitleOutcome::Pending)
    }
}

pub struct SubtitleCoordinator {
    fetcher: Arc<dyn SubtitleFetcher>,
}

impl SubtitleCoordinator {
    pub fn new(fetcher: Arc<dyn SubtitleFetcher>) -> Self {
        Self { fetcher }
    }

    /// `None`, an empty string and [`NO_SUBTITLES`] all mean no subtitles.
    pub fn requested_language(language: Option<&str>) -> Option<&str> {
        language
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.eq_ignore_ascii_case(NO_SUBTITLES))
    }

    /// Issues at most one fetch. Must be called from within a tokio runtime
    /// when a language is requested.
    pub fn request(&self, media_id: &str, language: Option<&str>) -> SubtitleHandle {
        let Some(language) = Self::requested_language(language) else {
            log::debug!("No subtitles requested for {}", media_id);
            return SubtitleHandle::not_requested();
        };

        let (handle, resolver) = SubtitleHandle::pending(language);
        let fetch = self.fetcher.fetch(media_id, language);
        let media_id = media_id.to_string();
        let language = language.to_string();

        log::info!("Fetching {} subtitles for {}", language, media_id);
        tokio::spawn(async move {
            let outcome = match fetch.await {
                Ok(()) => {
                    log::info!("Subtitles ready for {} ({})", media_id, language);
                    SubtitleOutcome::Succeeded
                }
                Err(e) => {
                    log::warn!("Subtitle download failed for {} ({}), continuing without: {}", media_id, language, e);
                    SubtitleOutcome::Failed
                }
            };
            if !resolver.resolve(outcome) {
                log::debug!("Subtitle outcome for {} already resolved, ignoring {:?}", media_id, outcome);
            }
        });

        handle
    }
}
