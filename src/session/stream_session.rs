use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::core::{LoaderConfig, LoaderError, SessionParams};
use crate::readiness::{Effect, LaunchTemplate, ProgressUpdate, ReadinessStateMachine};
use crate::session::PlaybackLauncher;
use crate::subtitles::{SubtitleCoordinator, SubtitleFetcher, SubtitleHandle};
use crate::watch::{ChangeWatcher, WatchEvent};

const UPDATE_CAPACITY: usize = 64;

#[derive(Debug)]
enum SessionCommand {
    Close,
}

/// One loading screen: watches the streamer directory, waits for subtitles
/// and launches playback once. All state changes happen on a single
/// consumer task; watcher, subtitle and lifecycle calls only post to it.
pub struct StreamSession {
    id: Uuid,
    watcher: ChangeWatcher,
    commands: mpsc::UnboundedSender<SessionCommand>,
    updates: broadcast::Sender<ProgressUpdate>,
    consumer: Option<JoinHandle<()>>,
    rescan_on_resume: bool,
}

impl StreamSession {
    /// Fails only if the stream directory can't be watched.
    pub fn start<L: PlaybackLauncher>(
        config: &LoaderConfig,
        params: SessionParams,
        fetcher: Arc<dyn SubtitleFetcher>,
        launcher: L,
    ) -> anyhow::Result<Self> {
        let id = Uuid::new_v4();
        let (watcher, watch_events) = ChangeWatcher::new(config)?;

        // Sessions opened from a bare link have nothing to fetch subtitles for
        let subtitles = if params.media.is_some() {
            SubtitleCoordinator::new(fetcher).request(params.media_id(), params.subtitle_language.as_deref())
        } else {
            SubtitleHandle::not_requested()
        };

        let template = LaunchTemplate {
            media: params.media,
            quality: params.quality,
            subtitle_language: subtitles.language().map(str::to_string),
            location: config.playback_location.clone(),
        };
        let machine = ReadinessStateMachine::new(template, subtitles.outcome());

        let (updates, _) = broadcast::channel(UPDATE_CAPACITY);
        let (commands, command_receiver) = mpsc::unbounded_channel();

        let consumer = SessionConsumer {
            id,
            machine,
            updates: updates.clone(),
            launcher,
        };
        let consumer = tokio::spawn(consumer.run(watch_events, subtitles, command_receiver));

        log::info!(
            "Stream session {} started for {} in {}",
            id,
            params.stream_url,
            watcher.directory().display()
        );

        Ok(Self {
            id,
            watcher,
            commands,
            updates,
            consumer: Some(consumer),
            rescan_on_resume: config.rescan_on_resume,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressUpdate> {
        self.updates.subscribe()
    }

    pub fn is_paused(&self) -> bool {
        self.watcher.is_paused()
    }

    /// Stops watching. Subtitle and launch state are kept.
    pub fn pause(&mut self) {
        self.watcher.pause();
    }

    pub fn resume(&mut self) -> anyhow::Result<()> {
        if self.commands.is_closed() {
            return Err(LoaderError::SessionClosed.into());
        }
        self.watcher.resume()?;
        if self.rescan_on_resume {
            self.watcher.rescan();
        }
        Ok(())
    }

    /// Stops watching and waits for the consumer to finish. An in-flight
    /// subtitle download is left to complete on its own.
    pub async fn close(mut self) -> anyhow::Result<()> {
        self.watcher.pause();
        if self.commands.send(SessionCommand::Close).is_err() {
            log::debug!("Stream session {} consumer already stopped", self.id);
        }
        if let Some(consumer) = self.consumer.take() {
            consumer
                .await
                .map_err(|e| anyhow::anyhow!("Stream session {} consumer failed: {}", self.id, e))?;
        }
        log::info!("Stream session {} closed", self.id);
        Ok(())
    }
}

struct SessionConsumer<L> {
    id: Uuid,
    machine: ReadinessStateMachine,
    updates: broadcast::Sender<ProgressUpdate>,
    launcher: L,
}

impl<L: PlaybackLauncher> SessionConsumer<L> {
    async fn run(
        mut self,
        mut watch_events: mpsc::UnboundedReceiver<WatchEvent>,
        mut subtitles: SubtitleHandle,
        mut commands: mpsc::UnboundedReceiver<SessionCommand>,
    ) {
        let mut awaiting_subtitles = self.machine.subtitle_outcome().is_pending();

        loop {
            let effects = tokio::select! {
                Some(event) = watch_events.recv() => self.on_watch_event(event),
                outcome = subtitles.resolved(), if awaiting_subtitles => {
                    awaiting_subtitles = false;
                    if outcome.is_pending() {
                        log::warn!("Session {}: subtitle download vanished without a result", self.id);
                        Vec::new()
                    } else {
                        self.machine.on_subtitle_resolved(outcome)
                    }
                }
                command = commands.recv() => match command {
                    Some(SessionCommand::Close) | None => break,
                },
            };
            self.apply(effects);
        }

        log::debug!("Session {} consumer stopped ({:?})", self.id, self.machine.phase());
    }

    fn on_watch_event(&mut self, event: WatchEvent) -> Vec<Effect> {
        match event {
            WatchEvent::Status(Some(report)) => self.machine.on_progress(report),
            WatchEvent::Status(None) => {
                log::debug!("Session {}: skipping unusable status artifact", self.id);
                Vec::new()
            }
            WatchEvent::DescriptorReady => self.machine.on_descriptor_ready(),
        }
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Publish(update) => {
                    log::debug!("Session {}: {:?}", self.id, update);
                    // No subscribers is fine, the host may only care about the launch
                    let _ = self.updates.send(update);
                }
                Effect::Launch(request) => {
                    if let Err(e) = self.launcher.launch(request) {
                        log::error!("Session {}: playback launcher failed: {}", self.id, e);
                    }
                }
            }
        }
    }
}
