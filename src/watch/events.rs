use notify::event::{MetadataKind, ModifyKind, RenameMode};
use notify::EventKind;

use crate::status::ProgressReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
}

impl ChangeKind {
    pub fn from_event_kind(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(ChangeKind::Created),
            // The poll backend reports rewrites as a write-time change
            EventKind::Modify(ModifyKind::Metadata(MetadataKind::WriteTime)) => Some(ChangeKind::Modified),
            EventKind::Modify(ModifyKind::Metadata(_)) => None,
            // Only the arriving side of a rename counts; `Both` repeats the `To` event
            EventKind::Modify(ModifyKind::Name(RenameMode::From | RenameMode::Both)) => None,
            EventKind::Modify(_) => Some(ChangeKind::Modified),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKey {
    Descriptor,
    Status,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    /// The descriptor was rewritten; its content is not consumed.
    DescriptorReady,
    /// The status artifact changed. `None` when it could not be read or parsed.
    Status(Option<ProgressReport>),
}
