//! Mutable state bound to one utterance's playback.

use crate::viseme::{VisemeId, VisemeTrack};
use serde::Serialize;
use std::fmt;

/// Identifies one armed session. Increases on every arm and reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct SessionGeneration(pub(crate) u64);

impl SessionGeneration {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed-size bitset of fired event indices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FiredSet {
    words: Vec<u64>,
    len: usize,
    count: usize,
}

impl FiredSet {
    /// A set for `len` events, none fired.
    pub fn with_len(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(64)],
            len,
            count: 0,
        }
    }

    /// Mark `index` fired. Returns `false` if it already was, or is out of range.
    pub fn mark(&mut self, index: usize) -> bool {
        if index >= self.len {
            return false;
        }
        let (word, bit) = (index / 64, 1u64 << (index % 64));
        if self.words[word] & bit != 0 {
            return false;
        }
        self.words[word] |= bit;
        self.count += 1;
        true
    }

    pub fn contains(&self, index: usize) -> bool {
        index < self.len && self.words[index / 64] & (1u64 << (index % 64)) != 0
    }

    /// Number of fired indices.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Capacity (number of events in the session).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Index of the first event not yet fired, or `len` when all have.
    pub fn first_unfired(&self) -> usize {
        self.words
            .iter()
            .enumerate()
            .find(|(_, w)| **w != u64::MAX)
            .map(|(i, w)| i * 64 + w.trailing_ones() as usize)
            .unwrap_or(self.len)
            .min(self.len)
    }
}

/// A release (attack → neutral) waiting for its due time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PendingRelease {
    /// Session that scheduled the release.
    pub generation: SessionGeneration,
    /// Event whose attack this release undoes.
    pub event_index: usize,
    pub viseme_id: VisemeId,
    /// Clock time at which the release starts.
    pub due_at_ms: f64,
    pub duration_ms: f64,
}

/// Scheduling state for one utterance.
#[derive(Debug, Clone)]
pub struct ScheduleSession {
    generation: SessionGeneration,
    track: VisemeTrack,
    fired: FiredSet,
    pending_releases: Vec<PendingRelease>,
}

impl ScheduleSession {
    pub fn new(generation: SessionGeneration, track: VisemeTrack) -> Self {
        let fired = FiredSet::with_len(track.len());
        Self {
            generation,
            track,
            fired,
            pending_releases: Vec::new(),
        }
    }

    pub fn generation(&self) -> SessionGeneration {
        self.generation
    }

    pub fn track(&self) -> &VisemeTrack {
        &self.track
    }

    pub fn fired(&self) -> &FiredSet {
        &self.fired
    }

    pub(crate) fn fired_mut(&mut self) -> &mut FiredSet {
        &mut self.fired
    }

    /// Releases not yet executed, in scheduling order.
    pub fn pending_releases(&self) -> &[PendingRelease] {
        &self.pending_releases
    }

    pub(crate) fn schedule_release(&mut self, release: PendingRelease) {
        self.pending_releases.push(release);
    }

    /// Remove and return releases due at or before `now_ms`, earliest first.
    pub(crate) fn take_due_releases(&mut self, now_ms: f64) -> Vec<PendingRelease> {
        let (mut due, rest): (Vec<_>, Vec<_>) = self
            .pending_releases
            .drain(..)
            .partition(|r| r.due_at_ms <= now_ms);
        self.pending_releases = rest;
        due.sort_by(|a, b| a.due_at_ms.total_cmp(&b.due_at_ms));
        due
    }

    /// Drop every pending release. Returns how many were cancelled.
    pub(crate) fn cancel_releases(&mut self) -> usize {
        let cancelled = self.pending_releases.len();
        self.pending_releases.clear();
        cancelled
    }
}
