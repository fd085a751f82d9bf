//! Lip-sync coordinator: the single owner of scheduler, transition engine,
//! and avatar binding.
//!
//! All mutation of session state and morph weights goes through one
//! `&mut LipSyncCoordinator`, so ordering within a frame is simply program
//! order. The frame loop in [`crate::scheduler::runner`] wraps the
//! coordinator in a mutex and calls [`LipSyncCoordinator::frame`] on every
//! tick; the simulator calls it directly with a stepped clock.

use crate::avatar::{AvatarBinding, AvatarRig, MorphMesh};
use crate::config::LipSyncConfig;
use crate::error::Result;
use crate::pipeline::messages::ChatReply;
use crate::runtime::{LipSyncEvent, ResetReason};
use crate::scheduler::{SchedulerState, TransitionSink, VisemeScheduler};
use crate::transition::TransitionEngine;
use crate::viseme::{VisemeId, VisemeTrack};
use tracing::{debug, info};

/// Routes scheduler decisions into the engine for the current binding.
struct RigSink<'a> {
    engine: &'a mut TransitionEngine,
    rig: &'a AvatarRig,
}

impl TransitionSink for RigSink<'_> {
    fn transition(&mut self, viseme_id: VisemeId, intensity: f32, duration_ms: f64, now_ms: f64) {
        self.engine
            .transition(self.rig, viseme_id, intensity, duration_ms, now_ms);
    }
}

/// Result of swapping the avatar model.
#[derive(Debug)]
pub struct AvatarSwap {
    /// The binding that was replaced. Nothing in the coordinator refers to
    /// it any more.
    pub detached: AvatarBinding,
    pub events: Vec<LipSyncEvent>,
}

/// Owns everything that animates the avatar's mouth.
#[derive(Debug)]
pub struct LipSyncCoordinator {
    config: LipSyncConfig,
    rig: AvatarRig,
    engine: TransitionEngine,
    scheduler: VisemeScheduler,
}

impl LipSyncCoordinator {
    /// Create a coordinator with no avatar bound.
    pub fn new(config: LipSyncConfig) -> Self {
        let engine = TransitionEngine::new(config.transition.easing);
        let scheduler = VisemeScheduler::new(config.scheduler.clone());
        Self {
            config,
            rig: AvatarRig::new(),
            engine,
            scheduler,
        }
    }

    pub fn config(&self) -> &LipSyncConfig {
        &self.config
    }

    pub fn rig(&self) -> &AvatarRig {
        &self.rig
    }

    pub fn engine(&self) -> &TransitionEngine {
        &self.engine
    }

    pub fn scheduler(&self) -> &VisemeScheduler {
        &self.scheduler
    }

    pub fn state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    /// Replace the avatar meshes.
    ///
    /// Resets the current session (its releases target the old model) and
    /// discards every tween in flight. The new meshes start neutral.
    pub fn load_avatar(&mut self, meshes: Vec<MorphMesh>) -> AvatarSwap {
        let mut events = Vec::with_capacity(2);
        if let Some(reset) = self.scheduler.reset(ResetReason::AvatarSwap) {
            events.push(reset);
        }
        self.engine.clear();

        let mesh_count = meshes.len();
        let detached = self.rig.bind(meshes);
        let generation = self.rig.generation();
        info!(%generation, meshes = mesh_count, "avatar bound");
        events.push(LipSyncEvent::AvatarBound {
            generation,
            meshes: mesh_count,
        });

        AvatarSwap { detached, events }
    }

    /// Arm a new utterance, replacing whatever was armed or running.
    pub fn arm(&mut self, track: VisemeTrack, now_ms: f64) -> Vec<LipSyncEvent> {
        let had_session = self.scheduler.session().is_some();
        let events = self.scheduler.arm(track);
        if had_session {
            self.relax_to_neutral(now_ms);
        }
        events
    }

    /// Arm the viseme track of a backend reply.
    ///
    /// # Errors
    ///
    /// Returns [`crate::LipSyncError::Track`] if the reply's events are out
    /// of order; the current session is left untouched in that case.
    pub fn arm_reply(&mut self, reply: &ChatReply, now_ms: f64) -> Result<Vec<LipSyncEvent>> {
        let track = reply.track()?;
        Ok(self.arm(track, now_ms))
    }

    /// The audio collaborator reports that playback started or resumed.
    pub fn playback_started(&mut self) -> Option<LipSyncEvent> {
        self.scheduler.playback_started()
    }

    /// Stop lip-sync for the current utterance.
    pub fn stop(&mut self, now_ms: f64) -> Option<LipSyncEvent> {
        let event = self.scheduler.reset(ResetReason::Stop)?;
        self.relax_to_neutral(now_ms);
        Some(event)
    }

    /// Run one frame: scheduler tick, then write interpolated weights.
    ///
    /// `now_ms` is the monotonic frame clock, `playback_ms` the audio
    /// position.
    pub fn frame(&mut self, now_ms: f64, playback_ms: f64) -> Vec<LipSyncEvent> {
        let mut sink = RigSink {
            engine: &mut self.engine,
            rig: &self.rig,
        };
        let events = self.scheduler.tick(playback_ms, now_ms, &mut sink);
        self.engine.advance(&mut self.rig, now_ms);
        events
    }

    /// Issue a transition outside the scheduler (idle gestures, tests).
    pub fn transition(&mut self, viseme_id: VisemeId, intensity: f32, duration_ms: f64, now_ms: f64) {
        self.engine
            .transition(&self.rig, viseme_id, intensity, duration_ms, now_ms);
    }

    fn relax_to_neutral(&mut self, now_ms: f64) {
        if !self.config.scheduler.neutral_on_reset {
            return;
        }
        let relaxed = self
            .engine
            .relax(&self.rig, self.config.scheduler.neutral_return_ms, now_ms);
        if relaxed > 0 {
            debug!(relaxed, "relaxing mouth to neutral");
        }
    }
}
