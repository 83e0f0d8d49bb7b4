use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WatchBackend {
    /// Platform change notifications (inotify, FSEvents, ReadDirectoryChangesW)
    #[default]
    Native,
    /// Timer-based re-read of the directory, works everywhere
    Poll,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub stream_directory: PathBuf,
    pub descriptor_file: String, // presence/modification means the streamer can be queried
    pub status_file: String,     // rewritten periodically with buffering progress
    pub playback_location: String,
    pub subtitle_directory: Option<PathBuf>,
    pub watch_backend: WatchBackend,
    pub poll_interval_ms: u64,
    pub rescan_on_resume: bool,
    pub service_wait_secs: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        let stream_directory = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("stream-loader")
            .join("streamer");

        Self {
            stream_directory,
            descriptor_file: "streamer.json".to_string(),
            status_file: "status.json".to_string(),
            playback_location: "http://localhost:9999".to_string(),
            subtitle_directory: None,
            watch_backend: WatchBackend::Native,
            poll_interval_ms: 500,
            rescan_on_resume: true,
            service_wait_secs: 30,
        }
    }
}

impl LoaderConfig {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(config_path: &Path) -> anyhow::Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)
                .map_err(|e| anyhow::anyhow!("Failed to read config file at {}: {}", config_path.display(), e))?;

            // Missing fields fall back to defaults, anything unparsable gets replaced
            match serde_json::from_str::<Self>(&content) {
                Ok(config) => {
                    log::info!("Loaded existing config from {}", config_path.display());
                    Ok(config)
                }
                Err(e) => {
                    log::warn!("Config file exists but has issues ({}), creating new one with defaults", e);
                    let new_config = Self::default();
                    new_config.save_to(config_path)
                        .map_err(|save_err| anyhow::anyhow!("Failed to save new config: {}", save_err))?;
                    log::info!("Created new config file at {}", config_path.display());
                    Ok(new_config)
                }
            }
        } else {
            log::info!("No config file found, creating default config");
            let config = Self::default();
            config.save_to(config_path)
                .map_err(|e| anyhow::anyhow!("Failed to save default config: {}", e))?;
            log::info!("Created new config file at {}", config_path.display());
            Ok(config)
        }
    }

    pub fn save_to(&self, config_path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("stream-loader")
            .join("config.json")
    }

    pub fn status_path(&self) -> PathBuf {
        self.stream_directory.join(&self.status_file)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn service_wait(&self) -> Duration {
        Duration::from_secs(self.service_wait_secs)
    }

    /// Only for hosts that own the stream directory. The watcher itself never
    /// creates it; a missing directory is a setup failure.
    pub fn ensure_stream_directory(&self) -> anyhow::Result<()> {
        if let Err(e) = std::fs::create_dir_all(&self.stream_directory) {
            log::error!("Failed to create stream directory {}: {}", self.stream_directory.display(), e);
            return Err(anyhow::anyhow!("Failed to create stream directory {}: {}", self.stream_directory.display(), e));
        }
        log::debug!("Stream directory ensured: {}", self.stream_directory.display());
        Ok(())
    }
}
