//! Playback-synchronized viseme scheduler.
//!
//! The scheduler owns the event list of the current utterance and decides,
//! once per frame, which events the playback position has crossed. Each
//! crossed event fires exactly once per session: an attack toward full
//! intensity right away, and a release back to neutral queued for later so
//! consecutive visemes overlap instead of cutting hard.
//!
//! ```text
//!   Idle --arm--> Armed --playback_started--> Running
//!    ^                                           |
//!    +----------- reset (rearm / stop / swap) ---+
//! ```
//!
//! Seeking backward does not re-fire events: an index marked fired stays
//! fired until the session is replaced. Replaying an utterance means arming
//! it again.

pub mod runner;
pub mod session;

use crate::config::SchedulerConfig;
use crate::runtime::{LipSyncEvent, ResetReason};
use crate::viseme::{VisemeId, VisemeTrack};
use serde::Serialize;
use session::{PendingRelease, ScheduleSession, SessionGeneration};
use tracing::{debug, info, trace, warn};

/// Receives the transitions the scheduler decides on.
///
/// The coordinator implements this over the transition engine and the
/// current avatar binding; tests record the calls.
pub trait TransitionSink {
    /// Drive `viseme_id` toward `intensity` over `duration_ms`, starting at `now_ms`.
    fn transition(&mut self, viseme_id: VisemeId, intensity: f32, duration_ms: f64, now_ms: f64);
}

/// Lifecycle state of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    /// No session armed.
    Idle,
    /// Events loaded, waiting for playback to start.
    Armed,
    /// Polling playback every frame.
    Running,
}

/// Fires viseme transitions as playback crosses event timestamps.
#[derive(Debug)]
pub struct VisemeScheduler {
    config: SchedulerConfig,
    state: SchedulerState,
    session: Option<ScheduleSession>,
    generation: SessionGeneration,
}

impl VisemeScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            state: SchedulerState::Idle,
            session: None,
            generation: SessionGeneration::default(),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Current generation. Bumped by every arm and reset.
    pub fn generation(&self) -> SessionGeneration {
        self.generation
    }

    pub fn session(&self) -> Option<&ScheduleSession> {
        self.session.as_ref()
    }

    pub fn is_fired(&self, index: usize) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.fired().contains(index))
    }

    pub fn fired_count(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.fired().count())
    }

    pub fn pending_releases(&self) -> &[PendingRelease] {
        self.session
            .as_ref()
            .map_or(&[], |s| s.pending_releases())
    }

    /// Replace any current session with a fresh one for `track`.
    ///
    /// The previous session's pending releases are cancelled and its fired
    /// markers discarded. Returns the reset (if a session existed) followed
    /// by the arm event.
    pub fn arm(&mut self, track: VisemeTrack) -> Vec<LipSyncEvent> {
        let mut events = Vec::with_capacity(2);
        if let Some(reset) = self.reset(ResetReason::Rearm) {
            events.push(reset);
        }

        self.generation = self.next_generation();
        let count = track.len();
        self.session = Some(ScheduleSession::new(self.generation, track));
        self.state = SchedulerState::Armed;
        info!(generation = %self.generation, events = count, "viseme session armed");

        events.push(LipSyncEvent::SessionArmed {
            generation: self.generation,
            events: count,
        });
        events
    }

    /// Handle the audio collaborator's "playback started" signal.
    ///
    /// Moves `Armed` to `Running`. A repeat signal while running (resume
    /// after pause) keeps the fired markers. Ignored while idle.
    pub fn playback_started(&mut self) -> Option<LipSyncEvent> {
        match self.state {
            SchedulerState::Idle => {
                warn!("playback started with no viseme session armed, ignoring");
                None
            }
            SchedulerState::Armed => {
                self.state = SchedulerState::Running;
                info!(generation = %self.generation, "viseme scheduler running");
                Some(LipSyncEvent::PlaybackStarted {
                    generation: self.generation,
                })
            }
            SchedulerState::Running => {
                debug!(generation = %self.generation, "playback resumed");
                Some(LipSyncEvent::PlaybackStarted {
                    generation: self.generation,
                })
            }
        }
    }

    /// Tear down the current session and return to `Idle`.
    ///
    /// Cancels every pending release and bumps the generation so any
    /// release captured before the reset is recognised as stale. Returns
    /// `None` when there was nothing to reset.
    pub fn reset(&mut self, reason: ResetReason) -> Option<LipSyncEvent> {
        let mut session = self.session.take()?;
        let cancelled_releases = session.cancel_releases();
        let torn_down = session.generation();

        self.state = SchedulerState::Idle;
        self.generation = self.next_generation();
        info!(
            generation = %torn_down,
            ?reason,
            cancelled_releases,
            fired = session.fired().count(),
            "viseme session reset"
        );

        Some(LipSyncEvent::SessionReset {
            generation: torn_down,
            reason,
            cancelled_releases,
        })
    }

    /// Run one frame.
    ///
    /// Due releases run first (they were queued on the clock, like timers
    /// that fire between frames), then every unfired event with
    /// `time_ms <= playback_ms` fires in ascending order. Does nothing
    /// unless `Running`.
    pub fn tick(
        &mut self,
        playback_ms: f64,
        now_ms: f64,
        sink: &mut dyn TransitionSink,
    ) -> Vec<LipSyncEvent> {
        let mut events = Vec::new();
        if self.state != SchedulerState::Running {
            return events;
        }

        let due = match self.session.as_mut() {
            Some(session) => session.take_due_releases(now_ms),
            None => return events,
        };
        for release in due {
            events.push(self.run_release(release, now_ms, sink));
        }

        if playback_ms.is_nan() {
            warn!("playback position is NaN, skipping attacks this frame");
            return events;
        }
        self.fire_due_events(playback_ms, now_ms, sink, &mut events);
        events
    }

    /// Execute a release if it belongs to the current session.
    ///
    /// A release captured from an earlier session is dropped without
    /// touching the sink.
    pub fn run_release(
        &mut self,
        release: PendingRelease,
        now_ms: f64,
        sink: &mut dyn TransitionSink,
    ) -> LipSyncEvent {
        if release.generation != self.generation {
            debug!(
                release_generation = %release.generation,
                current = %self.generation,
                index = release.event_index,
                "dropping stale viseme release"
            );
            return LipSyncEvent::ReleaseDropped {
                generation: release.generation,
                index: release.event_index,
            };
        }

        sink.transition(release.viseme_id, 0.0, release.duration_ms, now_ms);
        trace!(index = release.event_index, viseme_id = release.viseme_id, "release");
        LipSyncEvent::Release {
            generation: release.generation,
            index: release.event_index,
            viseme_id: release.viseme_id,
            at_ms: now_ms,
            duration_ms: release.duration_ms,
        }
    }

    fn fire_due_events(
        &mut self,
        playback_ms: f64,
        now_ms: f64,
        sink: &mut dyn TransitionSink,
        events: &mut Vec<LipSyncEvent>,
    ) {
        let config = &self.config;
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let generation = session.generation();
        let due = session.track().due_count(playback_ms);
        let first = session.fired().first_unfired();

        for index in first..due {
            if !session.fired_mut().mark(index) {
                continue;
            }
            let Some(event) = session.track().get(index).copied() else {
                break;
            };
            let next_time_ms = session
                .track()
                .next_time_ms(index, config.trailing_sustain_ms)
                .unwrap_or(event.time_ms + config.trailing_sustain_ms);
            let span_ms = (next_time_ms - event.time_ms).max(config.min_span_ms);
            let attack_ms = span_ms * config.attack_fraction;
            let release = PendingRelease {
                generation,
                event_index: index,
                viseme_id: event.viseme_id,
                due_at_ms: now_ms + span_ms * config.release_delay_fraction,
                duration_ms: span_ms * config.release_fraction,
            };

            sink.transition(event.viseme_id, 1.0, attack_ms, now_ms);
            session.schedule_release(release);
            trace!(
                index,
                viseme_id = event.viseme_id,
                event_time_ms = event.time_ms,
                playback_ms,
                "attack"
            );

            events.push(LipSyncEvent::Attack {
                generation,
                index,
                viseme_id: event.viseme_id,
                event_time_ms: event.time_ms,
                playback_ms,
                at_ms: now_ms,
                duration_ms: attack_ms,
            });
            events.push(LipSyncEvent::ReleaseScheduled {
                generation,
                index,
                viseme_id: event.viseme_id,
                due_at_ms: release.due_at_ms,
                duration_ms: release.duration_ms,
            });
        }
    }

    fn next_generation(&self) -> SessionGeneration {
        SessionGeneration(self.generation.0 + 1)
    }
}
