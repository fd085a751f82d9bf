//! Frame loop and the driver that binds it to a session.
//!
//! [`FrameLoop`] is a tokio task that ticks the coordinator at display
//! cadence. [`LipSyncDriver`] owns the loop's lifetime: arming, stopping,
//! or swapping the avatar cancels the running loop before touching the
//! session, and "playback started" spawns a fresh one. Nothing relies on a
//! closure being dropped to stop animating.

use crate::audio::PlaybackClock;
use crate::avatar::MorphMesh;
use crate::error::{LipSyncError, Result};
use crate::pipeline::coordinator::{AvatarSwap, LipSyncCoordinator};
use crate::pipeline::messages::ChatReply;
use crate::runtime::LipSyncEvent;
use crate::scheduler::SchedulerState;
use crate::viseme::VisemeTrack;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

type SharedCoordinator = Arc<Mutex<LipSyncCoordinator>>;

fn lock(coordinator: &SharedCoordinator) -> MutexGuard<'_, LipSyncCoordinator> {
    coordinator.lock().unwrap_or_else(|e| e.into_inner())
}

/// Repeating frame task.
///
/// Each tick reads the playback position, runs one coordinator frame, and
/// forwards the emitted events. The loop ends when its token is
/// cancelled, when the event receiver is dropped, or once the scheduler is
/// no longer running and every tween has settled.
pub struct FrameLoop {
    coordinator: SharedCoordinator,
    clock: Arc<dyn PlaybackClock>,
    epoch: Instant,
    interval: Duration,
    cancel: CancellationToken,
    events_tx: Option<mpsc::UnboundedSender<LipSyncEvent>>,
}

impl FrameLoop {
    pub fn new(
        coordinator: SharedCoordinator,
        clock: Arc<dyn PlaybackClock>,
        epoch: Instant,
        cancel: CancellationToken,
    ) -> Self {
        let interval_ms = lock(&coordinator).config().runner.frame_interval_ms.max(1);
        Self {
            coordinator,
            clock,
            epoch,
            interval: Duration::from_millis(interval_ms),
            cancel,
            events_tx: None,
        }
    }

    /// Forward frame events on `tx`.
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<LipSyncEvent>) -> Self {
        self.events_tx = Some(tx);
        self
    }

    /// Run until cancelled, orphaned, or settled.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(interval_ms = self.interval.as_millis() as u64, "lip-sync frame loop started");

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    info!("lip-sync frame loop cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    let Some((events, settled)) = self.frame() else {
                        break;
                    };
                    if !self.forward(events) {
                        info!("lip-sync event receiver dropped, stopping frame loop");
                        break;
                    }
                    if settled {
                        info!("lip-sync frame loop settled");
                        break;
                    }
                }
            }
        }
    }

    /// One tick. Returns `None` if the loop was cancelled while waiting
    /// for the coordinator.
    fn frame(&self) -> Option<(Vec<LipSyncEvent>, bool)> {
        let now_ms = self.epoch.elapsed().as_secs_f64() * 1000.0;
        let playback_ms = self.clock.position_ms();

        let mut coordinator = lock(&self.coordinator);
        if self.cancel.is_cancelled() {
            return None;
        }
        let events = coordinator.frame(now_ms, playback_ms);
        let settled = coordinator.state() != SchedulerState::Running
            && coordinator.engine().active_count() == 0;
        Some((events, settled))
    }

    /// Returns `false` once nobody is listening.
    fn forward(&self, events: Vec<LipSyncEvent>) -> bool {
        let Some(tx) = &self.events_tx else {
            return true;
        };
        if tx.is_closed() {
            return false;
        }
        events.into_iter().all(|event| tx.send(event).is_ok())
    }
}

struct RunningLoop {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Drives a [`LipSyncCoordinator`] in real time.
///
/// Methods that may start a frame loop must be called from inside a tokio
/// runtime. Every event a method returns is also sent on the event channel
/// when one is attached, so the channel carries the complete stream.
pub struct LipSyncDriver {
    coordinator: SharedCoordinator,
    clock: Arc<dyn PlaybackClock>,
    epoch: Instant,
    events_tx: Option<mpsc::UnboundedSender<LipSyncEvent>>,
    frame_loop: Option<RunningLoop>,
}

impl LipSyncDriver {
    pub fn new(coordinator: LipSyncCoordinator, clock: Arc<dyn PlaybackClock>) -> Self {
        Self {
            coordinator: Arc::new(Mutex::new(coordinator)),
            clock,
            epoch: Instant::now(),
            events_tx: None,
            frame_loop: None,
        }
    }

    /// Send every event on `tx`.
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<LipSyncEvent>) -> Self {
        self.events_tx = Some(tx);
        self
    }

    /// Shared handle to the coordinator, for inspection.
    pub fn coordinator(&self) -> SharedCoordinator {
        Arc::clone(&self.coordinator)
    }

    /// Milliseconds on the frame clock since the driver was created.
    pub fn now_ms(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64() * 1000.0
    }

    /// Whether a frame loop task is alive.
    pub fn is_running(&self) -> bool {
        self.frame_loop
            .as_ref()
            .is_some_and(|running| !running.handle.is_finished())
    }

    /// Swap the avatar. Stops the frame loop first.
    pub fn load_avatar(&mut self, meshes: Vec<MorphMesh>) -> AvatarSwap {
        self.cancel_loop();
        let swap = lock(&self.coordinator).load_avatar(meshes);
        self.emit(&swap.events);
        swap
    }

    /// Arm a new utterance. Stops the frame loop first; a short settle
    /// loop runs if the previous utterance left the mouth open.
    ///
    /// # Errors
    ///
    /// Returns [`LipSyncError::Scheduler`] if a settle loop is needed and
    /// no tokio runtime is available.
    pub fn arm(&mut self, track: VisemeTrack) -> Result<Vec<LipSyncEvent>> {
        self.cancel_loop();
        let now_ms = self.now_ms();
        let (events, unsettled) = {
            let mut coordinator = lock(&self.coordinator);
            let events = coordinator.arm(track, now_ms);
            (events, coordinator.engine().active_count() > 0)
        };
        self.emit(&events);
        if unsettled {
            self.spawn_loop()?;
        }
        Ok(events)
    }

    /// Arm the track carried by a backend reply.
    ///
    /// # Errors
    ///
    /// Returns [`LipSyncError::Track`] for an unordered track, leaving the
    /// current session and frame loop untouched.
    pub fn arm_reply(&mut self, reply: &ChatReply) -> Result<Vec<LipSyncEvent>> {
        let track = reply.track()?;
        self.arm(track)
    }

    /// Audio started or resumed: start polling with a fresh loop.
    ///
    /// # Errors
    ///
    /// Returns [`LipSyncError::Scheduler`] outside a tokio runtime.
    pub fn playback_started(&mut self) -> Result<Option<LipSyncEvent>> {
        let (event, running) = {
            let mut coordinator = lock(&self.coordinator);
            let event = coordinator.playback_started();
            (event, coordinator.state() == SchedulerState::Running)
        };
        if let Some(event) = &event {
            self.emit(std::slice::from_ref(event));
        }
        if running {
            self.cancel_loop();
            self.spawn_loop()?;
        }
        Ok(event)
    }

    /// Stop the utterance. The frame loop is cancelled before the reset;
    /// a settle loop then relaxes the mouth to neutral.
    ///
    /// # Errors
    ///
    /// Returns [`LipSyncError::Scheduler`] if a settle loop is needed and
    /// no tokio runtime is available.
    pub fn stop(&mut self) -> Result<Option<LipSyncEvent>> {
        self.cancel_loop();
        let now_ms = self.now_ms();
        let (event, unsettled) = {
            let mut coordinator = lock(&self.coordinator);
            let event = coordinator.stop(now_ms);
            (event, coordinator.engine().active_count() > 0)
        };
        if let Some(event) = &event {
            self.emit(std::slice::from_ref(event));
        }
        if unsettled {
            self.spawn_loop()?;
        }
        Ok(event)
    }

    /// Wait for the current frame loop, if any, to end on its own.
    pub async fn settled(&mut self) {
        if let Some(running) = self.frame_loop.take() {
            if let Err(e) = running.handle.await {
                debug!("frame loop task ended abnormally: {e}");
            }
        }
    }

    /// Cancel the frame loop and wait for it to exit.
    pub async fn shutdown(mut self) {
        if let Some(running) = self.frame_loop.take() {
            running.cancel.cancel();
            if let Err(e) = running.handle.await {
                debug!("frame loop task ended abnormally: {e}");
            }
        }
    }

    fn spawn_loop(&mut self) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| LipSyncError::Scheduler(format!("frame loop needs a tokio runtime: {e}")))?;
        let cancel = CancellationToken::new();
        let mut frame_loop = FrameLoop::new(
            Arc::clone(&self.coordinator),
            Arc::clone(&self.clock),
            self.epoch,
            cancel.clone(),
        );
        if let Some(tx) = &self.events_tx {
            frame_loop = frame_loop.with_events(tx.clone());
        }
        let handle = runtime.spawn(frame_loop.run());
        self.frame_loop = Some(RunningLoop { cancel, handle });
        Ok(())
    }

    fn cancel_loop(&mut self) {
        if let Some(running) = self.frame_loop.take() {
            running.cancel.cancel();
            debug!("frame loop cancelled by driver");
        }
    }

    fn emit(&self, events: &[LipSyncEvent]) {
        if let Some(tx) = &self.events_tx {
            for event in events {
                if tx.send(event.clone()).is_err() {
                    break;
                }
            }
        }
    }
}

impl Drop for LipSyncDriver {
    fn drop(&mut self) {
        self.cancel_loop();
    }
}
