//! Timestamped viseme events and validated per-utterance tracks.

use super::VisemeId;
use crate::error::{LipSyncError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// TTS audio offsets are reported in 100-nanosecond ticks.
const TICKS_PER_MS: f64 = 10_000.0;

/// One mouth-shape change at a point in the synthesized audio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisemeEvent {
    /// Viseme class.
    #[serde(rename = "viseme", alias = "visemeId", alias = "viseme_id")]
    pub viseme_id: VisemeId,
    /// Offset from the start of the audio, in ms.
    #[serde(rename = "time", alias = "timeMs", alias = "time_ms")]
    pub time_ms: f64,
}

impl VisemeEvent {
    pub fn new(viseme_id: VisemeId, time_ms: f64) -> Self {
        Self { viseme_id, time_ms }
    }

    /// Build an event from a TTS audio offset in 100-ns ticks.
    pub fn from_audio_offset_ticks(viseme_id: VisemeId, ticks: u64) -> Self {
        Self {
            viseme_id,
            time_ms: ticks as f64 / TICKS_PER_MS,
        }
    }
}

/// The ordered viseme events of one utterance.
///
/// Construction validates the ordering contract instead of sorting: an
/// unsorted list means the producer is broken, and guessing an order would
/// hide that. Cloning is cheap (shared storage).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisemeTrack {
    events: Arc<[VisemeEvent]>,
}

impl VisemeTrack {
    /// Validate and wrap an event list.
    ///
    /// # Errors
    ///
    /// Returns [`LipSyncError::Track`] if any time is negative or not finite,
    /// or if an event is earlier than its predecessor.
    pub fn new(events: Vec<VisemeEvent>) -> Result<Self> {
        let mut previous: Option<f64> = None;
        for (index, event) in events.iter().enumerate() {
            if !event.time_ms.is_finite() {
                return Err(LipSyncError::Track {
                    index,
                    reason: format!("time {} is not finite", event.time_ms),
                });
            }
            if event.time_ms < 0.0 {
                return Err(LipSyncError::Track {
                    index,
                    reason: format!("time {} ms is negative", event.time_ms),
                });
            }
            if let Some(prev) = previous
                && event.time_ms < prev
            {
                return Err(LipSyncError::Track {
                    index,
                    reason: format!(
                        "time {} ms is earlier than the previous event at {prev} ms",
                        event.time_ms
                    ),
                });
            }
            previous = Some(event.time_ms);
        }

        Ok(Self {
            events: events.into(),
        })
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&VisemeEvent> {
        self.events.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VisemeEvent> {
        self.events.iter()
    }

    pub fn as_slice(&self) -> &[VisemeEvent] {
        &self.events
    }

    /// Time at which the event after `index` starts.
    ///
    /// For the last event this is its own time plus `trailing_sustain_ms`.
    /// Returns `None` when `index` is out of range.
    pub fn next_time_ms(&self, index: usize, trailing_sustain_ms: f64) -> Option<f64> {
        let event = self.events.get(index)?;
        Some(
            self.events
                .get(index + 1)
                .map(|next| next.time_ms)
                .unwrap_or(event.time_ms + trailing_sustain_ms),
        )
    }

    /// Number of leading events whose time is at or before `position_ms`.
    pub fn due_count(&self, position_ms: f64) -> usize {
        self.events.partition_point(|e| e.time_ms <= position_ms)
    }

    /// Time by which the last viseme has finished, in ms.
    pub fn end_time_ms(&self, trailing_sustain_ms: f64) -> f64 {
        self.events
            .last()
            .map(|e| e.time_ms + trailing_sustain_ms)
            .unwrap_or(0.0)
    }
}

impl TryFrom<Vec<VisemeEvent>> for VisemeTrack {
    type Error = LipSyncError;

    fn try_from(events: Vec<VisemeEvent>) -> Result<Self> {
        Self::new(events)
    }
}
