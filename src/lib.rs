//! Decides when a stream that an external process is buffering may be handed
//! to the player. The streamer reports progress by rewriting a status file in
//! a shared directory; subtitles are fetched alongside; playback is launched
//! exactly once when both are settled.

pub mod core;
pub mod readiness;
pub mod session;
pub mod status;
pub mod subtitles;
pub mod watch;

pub use crate::core::{LoaderConfig, LoaderError, MediaItem, PlaybackRequest, SessionParams};
pub use crate::readiness::{ProgressUpdate, ReadinessStateMachine};
pub use crate::session::{PlaybackLauncher, ServiceGate, ServiceState, StreamSession};
pub use crate::subtitles::{SubtitleFetcher, SubtitleOutcome};
