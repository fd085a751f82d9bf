//! Runtime events emitted by the lip-sync core for UI and observability.
//!
//! Events are plain data so a frame can emit them without blocking; the
//! frame loop forwards them over a channel and the simulator prints them as
//! JSON lines.

use crate::avatar::BindingGeneration;
use crate::scheduler::session::SessionGeneration;
use crate::viseme::VisemeId;
use serde::Serialize;

/// Why a session was torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetReason {
    /// A new utterance was armed.
    Rearm,
    /// Playback was stopped explicitly.
    Stop,
    /// The avatar model was swapped.
    AvatarSwap,
}

/// What the scheduler did, in the order it did it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LipSyncEvent {
    /// A new event list was loaded.
    SessionArmed {
        generation: SessionGeneration,
        events: usize,
    },
    /// The audio collaborator reported that playback started.
    PlaybackStarted { generation: SessionGeneration },
    /// An event's attack transition fired.
    Attack {
        generation: SessionGeneration,
        index: usize,
        viseme_id: VisemeId,
        /// Event timestamp within the audio.
        event_time_ms: f64,
        /// Playback position that triggered the event.
        playback_ms: f64,
        /// Clock time of the attack.
        at_ms: f64,
        duration_ms: f64,
    },
    /// A release was queued behind an attack.
    ReleaseScheduled {
        generation: SessionGeneration,
        index: usize,
        viseme_id: VisemeId,
        due_at_ms: f64,
        duration_ms: f64,
    },
    /// A queued release ran.
    Release {
        generation: SessionGeneration,
        index: usize,
        viseme_id: VisemeId,
        at_ms: f64,
        duration_ms: f64,
    },
    /// A release from an older session reached its due time and was discarded.
    ReleaseDropped {
        generation: SessionGeneration,
        index: usize,
    },
    /// The session was cleared.
    SessionReset {
        /// Session that was torn down.
        generation: SessionGeneration,
        reason: ResetReason,
        cancelled_releases: usize,
    },
    /// A new avatar binding replaced the old one.
    AvatarBound {
        generation: BindingGeneration,
        meshes: usize,
    },
}

impl LipSyncEvent {
    /// Short event name, matching the serialized `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SessionArmed { .. } => "session_armed",
            Self::PlaybackStarted { .. } => "playback_started",
            Self::Attack { .. } => "attack",
            Self::ReleaseScheduled { .. } => "release_scheduled",
            Self::Release { .. } => "release",
            Self::ReleaseDropped { .. } => "release_dropped",
            Self::SessionReset { .. } => "session_reset",
            Self::AvatarBound { .. } => "avatar_bound",
        }
    }
}
