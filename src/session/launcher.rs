use crate::core::PlaybackRequest;

/// Hands the stream over to the player. Called at most once per session,
/// from the session's consumer task, so it should return quickly.
pub trait PlaybackLauncher: Send + 'static {
    fn launch(&mut self, request: PlaybackRequest) -> anyhow::Result<()>;
}

impl<F> PlaybackLauncher for F
where
    F: FnMut(PlaybackRequest) -> anyhow::Result<()> + Send + 'static,
{
    fn launch(&mut self, request: PlaybackRequest) -> anyhow::Result<()> {
        self(request)
    }
}
