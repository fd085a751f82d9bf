//! Playback position sources.

use std::sync::Mutex;
use tokio::time::Instant;

/// Where the audio collaborator currently is.
///
/// Implementations must be cheap to query; the frame loop reads the
/// position once per tick.
pub trait PlaybackClock: Send + Sync {
    /// Current playback position in ms.
    fn position_ms(&self) -> f64;

    /// Whether audio is advancing.
    fn is_playing(&self) -> bool;
}

#[derive(Debug, Default)]
struct ClockState {
    /// Position accumulated before the current play run.
    offset_ms: f64,
    /// Start of the current play run, if playing.
    started_at: Option<Instant>,
}

impl ClockState {
    fn position_ms(&self, now: Instant) -> f64 {
        match self.started_at {
            Some(start) => self.offset_ms + now.duration_since(start).as_secs_f64() * 1000.0,
            None => self.offset_ms,
        }
    }
}

/// A player stand-in that advances on tokio's clock.
///
/// Under `#[tokio::test(start_paused = true)]` the position moves only when
/// the test advances time, which makes frame-loop tests deterministic.
#[derive(Debug, Default)]
pub struct SimulatedPlayback {
    state: Mutex<ClockState>,
    duration_ms: Option<f64>,
}

impl SimulatedPlayback {
    /// A stopped player at position 0 with no end.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clamp the position at `duration_ms` (end of the audio file).
    pub fn with_duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = Some(duration_ms.max(0.0));
        self
    }

    pub fn duration_ms(&self) -> Option<f64> {
        self.duration_ms
    }

    /// Start or resume advancing. No-op while already playing.
    pub fn play(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.started_at.is_none() {
            state.started_at = Some(Instant::now());
        }
    }

    /// Freeze the position.
    pub fn pause(&self) {
        let now = Instant::now();
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.offset_ms = self.clamp(state.position_ms(now));
        state.started_at = None;
    }

    /// Jump to `position_ms`, keeping the play/pause state.
    pub fn seek(&self, position_ms: f64) {
        let now = Instant::now();
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.offset_ms = self.clamp(position_ms);
        if state.started_at.is_some() {
            state.started_at = Some(now);
        }
    }

    /// Whether the position has reached the configured duration.
    pub fn is_finished(&self) -> bool {
        self.duration_ms
            .is_some_and(|end| self.position_ms() >= end)
    }

    fn clamp(&self, position_ms: f64) -> f64 {
        let position_ms = position_ms.max(0.0);
        match self.duration_ms {
            Some(end) => position_ms.min(end),
            None => position_ms,
        }
    }
}

impl PlaybackClock for SimulatedPlayback {
    fn position_ms(&self) -> f64 {
        let now = Instant::now();
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        self.clamp(state.position_ms(now))
    }

    fn is_playing(&self) -> bool {
        let now = Instant::now();
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.started_at.is_none() {
            return false;
        }
        let position = self.clamp(state.position_ms(now));
        self.duration_ms.is_none_or(|end| position < end)
    }
}
