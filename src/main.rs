use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{broadcast, oneshot};

use stream_loader::core::{LoaderConfig, MediaItem, PlaybackRequest, SessionParams, WatchBackend};
use stream_loader::subtitles::{FetchFuture, LocalSubtitleFetcher, SubtitleFetcher};
use stream_loader::{ProgressUpdate, ServiceGate, StreamSession};

#[derive(Parser, Debug)]
#[command(name = "stream-loader", about = "Waits for a buffering stream and hands it to the player")]
struct Args {
    /// Stream url, percent-encoded links are decoded
    url: String,

    #[arg(long)]
    media_id: Option<String>,

    #[arg(long)]
    title: Option<String>,

    #[arg(long)]
    quality: Option<String>,

    /// Subtitle language, or "no-subs"
    #[arg(long)]
    subs: Option<String>,

    /// Overrides the configured stream directory
    #[arg(long)]
    stream_dir: Option<PathBuf>,

    /// Poll the directory instead of using native change notifications
    #[arg(long)]
    poll: bool,
}

impl Args {
    fn session_params(&self) -> SessionParams {
        match &self.media_id {
            Some(media_id) => {
                let title = self.title.clone().unwrap_or_else(|| media_id.clone());
                let mut params = SessionParams::new(self.url.clone(), MediaItem::new(media_id.clone(), title));
                params.quality = self.quality.clone();
                params.subtitle_language = self.subs.clone();
                params
            }
            None => {
                let mut params = SessionParams::from_view_url(&self.url);
                params.quality = self.quality.clone();
                params
            }
        }
    }
}

fn subtitle_fetcher(config: &LoaderConfig) -> Arc<dyn SubtitleFetcher> {
    match &config.subtitle_directory {
        Some(directory) => Arc::new(LocalSubtitleFetcher::new(directory.clone())),
        None => Arc::new(|_media_id: &str, language: &str| -> FetchFuture {
            let language = language.to_string();
            Box::pin(async move { Err(anyhow::anyhow!("No subtitle source configured for {}", language)) })
        }),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();
    let mut config = LoaderConfig::load()?;
    if let Some(stream_dir) = &args.stream_dir {
        config.stream_directory = stream_dir.clone();
    }
    if args.poll {
        config.watch_backend = WatchBackend::Poll;
    }

    // The stream directory is this host's service; everything waits on it
    let gate = ServiceGate::new();
    let service = gate.clone();
    let service_config = config.clone();
    tokio::task::spawn_blocking(move || match service_config.ensure_stream_directory() {
        Ok(()) => service.mark_ready(),
        Err(e) => service.mark_failed(e.to_string()),
    });
    gate.wait_ready(config.service_wait()).await?;

    let (launched_tx, launched_rx) = oneshot::channel::<PlaybackRequest>();
    let mut launched_tx = Some(launched_tx);
    let launcher = move |request: PlaybackRequest| -> anyhow::Result<()> {
        let sender = launched_tx
            .take()
            .ok_or_else(|| anyhow::anyhow!("Playback already launched"))?;
        sender
            .send(request)
            .map_err(|_| anyhow::anyhow!("Host stopped listening for playback"))
    };

    let params = args.session_params();
    let session = StreamSession::start(&config, params, subtitle_fetcher(&config), launcher)?;
    let mut updates = session.subscribe();

    tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(ProgressUpdate::Percent(progress)) => println!("{}%", progress),
                Ok(ProgressUpdate::WaitingForSubtitles) => println!("Waiting for subtitles"),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::debug!("Progress display skipped {} updates", skipped)
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    tokio::select! {
        launched = launched_rx => match launched {
            Ok(request) => println!("{}", serde_json::to_string_pretty(&request)?),
            Err(_) => log::warn!("Session ended without launching playback"),
        },
        _ = tokio::signal::ctrl_c() => log::info!("Interrupted, stopping stream session"),
    }

    session.close().await
}
