use serde::Serialize;

use crate::core::{MediaItem, PlaybackRequest};
use crate::status::ProgressReport;
use crate::subtitles::SubtitleOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchState {
    AwaitingReadiness,
    Launched,
}

/// `Ready` is a pass-through: the event that completes both conditions also
/// launches, so callers only ever see `Buffering` or `Launched` from `phase()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Buffering,
    Ready,
    Launched,
}

/// What the loading screen shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProgressUpdate {
    Percent(u8),
    WaitingForSubtitles,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Publish(ProgressUpdate),
    Launch(PlaybackRequest),
}

/// Fixed parts of the eventual playback request.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchTemplate {
    pub media: Option<MediaItem>,
    pub quality: Option<String>,
    pub subtitle_language: Option<String>,
    pub location: String,
}

impl LaunchTemplate {
    fn build(&self, subtitles: SubtitleOutcome) -> PlaybackRequest {
        PlaybackRequest {
            media: self.media.clone(),
            quality: self.quality.clone(),
            subtitle_language: if subtitles.carries_subtitles() {
                self.subtitle_language.clone()
            } else {
                None
            },
            location: self.location.clone(),
        }
    }
}

/// Decides when playback may begin. Not synchronized itself: callers must
/// feed it from a single consumer.
///
/// Below 100 the displayed percentage follows each report, including
/// downward. Once it has shown 100 it never changes again.
pub struct ReadinessStateMachine {
    launch_state: LaunchState,
    displayed: u8,
    subtitles: SubtitleOutcome,
    template: LaunchTemplate,
}

impl ReadinessStateMachine {
    pub fn new(template: LaunchTemplate, subtitles: SubtitleOutcome) -> Self {
        Self {
            launch_state: LaunchState::AwaitingReadiness,
            displayed: 0,
            subtitles,
            template,
        }
    }

    pub fn launch_state(&self) -> LaunchState {
        self.launch_state
    }

    pub fn displayed_progress(&self) -> u8 {
        self.displayed
    }

    pub fn subtitle_outcome(&self) -> SubtitleOutcome {
        self.subtitles
    }

    pub fn phase(&self) -> Phase {
        match self.launch_state {
            LaunchState::Launched => Phase::Launched,
            LaunchState::AwaitingReadiness if self.is_complete() && !self.subtitles.is_pending() => Phase::Ready,
            LaunchState::AwaitingReadiness => Phase::Buffering,
        }
    }

    fn is_complete(&self) -> bool {
        self.displayed == ProgressReport::COMPLETE
    }

    pub fn on_progress(&mut self, report: ProgressReport) -> Vec<Effect> {
        if self.launch_state == LaunchState::Launched {
            return Vec::new();
        }
        if self.is_complete() {
            return self.reevaluate();
        }

        let progress = report.display_progress();
        if progress < self.displayed {
            log::debug!("Displayed progress going back from {}% to {}%", self.displayed, progress);
        }
        self.displayed = progress;

        let mut effects = vec![Effect::Publish(ProgressUpdate::Percent(progress))];
        if self.is_complete() {
            effects.extend(self.reevaluate());
        }
        effects
    }

    pub fn on_descriptor_ready(&mut self) -> Vec<Effect> {
        self.reevaluate()
    }

    /// The first non-pending outcome is kept; later ones are ignored.
    pub fn on_subtitle_resolved(&mut self, outcome: SubtitleOutcome) -> Vec<Effect> {
        if self.subtitles.is_pending() && !outcome.is_pending() {
            self.subtitles = outcome;
        } else if outcome != self.subtitles {
            log::debug!("Ignoring subtitle outcome {:?}, already {:?}", outcome, self.subtitles);
        }
        self.reevaluate()
    }

    fn reevaluate(&mut self) -> Vec<Effect> {
        if self.launch_state == LaunchState::Launched {
            return Vec::new();
        }
        if !self.is_complete() {
            return vec![Effect::Publish(ProgressUpdate::Percent(self.displayed))];
        }
        if self.subtitles.is_pending() {
            return vec![Effect::Publish(ProgressUpdate::WaitingForSubtitles)];
        }

        self.launch_state = LaunchState::Launched;
        let request = self.template.build(self.subtitles);
        log::info!(
            "Stream ready, launching playback (quality: {:?}, subtitles: {:?})",
            request.quality,
            request.subtitle_language
        );
        vec![Effect::Launch(request)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(subtitle_language: Option<&str>) -> LaunchTemplate {
        LaunchTemplate {
            media: Some(MediaItem::new("tt0111161", "The Shawshank Redemption")),
            quality: Some("720p".to_string()),
            subtitle_language: subtitle_language.map(str::to_string),
            location: "http://localhost:9999".to_string(),
        }
    }

    fn percent(value: u8) -> Effect {
        Effect::Publish(ProgressUpdate::Percent(value))
    }

    fn launches(effects: &[Effect]) -> Vec<&PlaybackRequest> {
        effects
            .iter()
            .filter_map(|effect| match effect {
                Effect::Launch(request) => Some(request),
                Effect::Publish(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_initial_state() {
        let machine = ReadinessStateMachine::new(template(None), SubtitleOutcome::NotRequested);
        assert_eq!(machine.launch_state(), LaunchState::AwaitingReadiness);
        assert_eq!(machine.phase(), Phase::Buffering);
        assert_eq!(machine.displayed_progress(), 0);
    }

    #[test]
    fn test_progress_without_subtitles_launches_at_100() {
        let mut machine = ReadinessStateMachine::new(template(None), SubtitleOutcome::NotRequested);

        assert_eq!(machine.on_progress(ProgressReport::new(0.2)), vec![percent(4)]);

        let effects = machine.on_progress(ProgressReport::new(5.0));
        assert_eq!(effects[0], percent(100));
        let launched = launches(&effects);
        assert_eq!(launched.len(), 1);
        assert_eq!(launched[0].subtitle_language, None);
        assert_eq!(launched[0].quality.as_deref(), Some("720p"));
        assert_eq!(launched[0].location, "http://localhost:9999");
        assert_eq!(machine.phase(), Phase::Launched);
    }

    #[test]
    fn test_launch_happens_at_most_once() {
        let mut machine = ReadinessStateMachine::new(template(None), SubtitleOutcome::NotRequested);
        let first = machine.on_progress(ProgressReport::new(6.0));
        assert_eq!(launches(&first).len(), 1);

        assert!(machine.on_descriptor_ready().is_empty());
        assert!(machine.on_descriptor_ready().is_empty());
        assert!(machine.on_progress(ProgressReport::new(7.0)).is_empty());
        assert!(machine.on_progress(ProgressReport::new(0.1)).is_empty());
        assert!(machine.on_subtitle_resolved(SubtitleOutcome::Succeeded).is_empty());
        assert_eq!(machine.launch_state(), LaunchState::Launched);
    }

    #[test]
    fn test_progress_can_regress_below_100() {
        let mut machine = ReadinessStateMachine::new(template(None), SubtitleOutcome::NotRequested);
        assert_eq!(machine.on_progress(ProgressReport::new(2.0)), vec![percent(40)]);
        assert_eq!(machine.on_progress(ProgressReport::new(1.0)), vec![percent(20)]);
        assert_eq!(machine.displayed_progress(), 20);
    }

    #[test]
    fn test_display_never_regresses_after_100() {
        let mut machine = ReadinessStateMachine::new(template(Some("en")), SubtitleOutcome::Pending);
        machine.on_progress(ProgressReport::new(5.0));

        let effects = machine.on_progress(ProgressReport::new(0.5));
        assert_eq!(effects, vec![Effect::Publish(ProgressUpdate::WaitingForSubtitles)]);
        assert_eq!(machine.displayed_progress(), 100);
    }

    #[test]
    fn test_descriptor_before_completion_republishes_progress() {
        let mut machine = ReadinessStateMachine::new(template(None), SubtitleOutcome::NotRequested);
        assert_eq!(machine.on_descriptor_ready(), vec![percent(0)]);

        machine.on_progress(ProgressReport::new(1.5));
        assert_eq!(machine.on_descriptor_ready(), vec![percent(30)]);
        assert_eq!(machine.launch_state(), LaunchState::AwaitingReadiness);
    }

    #[test]
    fn test_pending_subtitles_defer_launch_until_resolution() {
        let mut machine = ReadinessStateMachine::new(template(Some("pt-br")), SubtitleOutcome::Pending);

        let effects = machine.on_progress(ProgressReport::new(5.0));
        assert_eq!(effects, vec![percent(100), Effect::Publish(ProgressUpdate::WaitingForSubtitles)]);
        assert_eq!(machine.phase(), Phase::Buffering);

        assert_eq!(
            machine.on_descriptor_ready(),
            vec![Effect::Publish(ProgressUpdate::WaitingForSubtitles)]
        );

        let effects = machine.on_subtitle_resolved(SubtitleOutcome::Succeeded);
        let launched = launches(&effects);
        assert_eq!(launched.len(), 1);
        assert_eq!(launched[0].subtitle_language.as_deref(), Some("pt-br"));
    }

    #[test]
    fn test_subtitles_resolved_before_progress_complete() {
        let mut machine = ReadinessStateMachine::new(template(Some("en")), SubtitleOutcome::Pending);
        machine.on_progress(ProgressReport::new(1.0));

        assert_eq!(machine.on_subtitle_resolved(SubtitleOutcome::Succeeded), vec![percent(20)]);
        assert_eq!(machine.launch_state(), LaunchState::AwaitingReadiness);

        let effects = machine.on_progress(ProgressReport::new(5.0));
        assert_eq!(launches(&effects)[0].subtitle_language.as_deref(), Some("en"));
    }

    #[test]
    fn test_failed_subtitles_launch_without_language() {
        let mut machine = ReadinessStateMachine::new(template(Some("en")), SubtitleOutcome::Pending);
        machine.on_subtitle_resolved(SubtitleOutcome::Failed);

        let effects = machine.on_progress(ProgressReport::new(5.0));
        let launched = launches(&effects);
        assert_eq!(launched.len(), 1);
        assert_eq!(launched[0].subtitle_language, None);
    }

    #[test]
    fn test_subtitle_outcome_is_immutable_once_resolved() {
        let mut machine = ReadinessStateMachine::new(template(Some("en")), SubtitleOutcome::Pending);
        machine.on_subtitle_resolved(SubtitleOutcome::Failed);
        machine.on_subtitle_resolved(SubtitleOutcome::Succeeded);
        assert_eq!(machine.subtitle_outcome(), SubtitleOutcome::Failed);

        machine.on_subtitle_resolved(SubtitleOutcome::Pending);
        assert_eq!(machine.subtitle_outcome(), SubtitleOutcome::Failed);
    }

    #[test]
    fn test_ready_is_never_left_standing() {
        let mut machine = ReadinessStateMachine::new(template(None), SubtitleOutcome::Pending);
        assert_eq!(machine.phase(), Phase::Buffering);

        machine.on_progress(ProgressReport::new(5.0));
        assert_eq!(machine.phase(), Phase::Buffering);

        machine.on_descriptor_ready();
        assert_eq!(machine.phase(), Phase::Buffering);

        let effects = machine.on_subtitle_resolved(SubtitleOutcome::NotRequested);
        assert_eq!(launches(&effects).len(), 1);
        assert_eq!(machine.phase(), Phase::Launched);
    }
}
