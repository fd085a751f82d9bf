//! Frame loop on tokio's paused clock.

use crate::helpers::{head, track};
use lipsync::audio::{PlaybackClock, SimulatedPlayback};
use lipsync::runtime::LipSyncEvent;
use lipsync::{LipSyncConfig, LipSyncCoordinator, LipSyncDriver, SchedulerState};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

struct Rig {
    driver: LipSyncDriver,
    clock: Arc<SimulatedPlayback>,
    rx: mpsc::UnboundedReceiver<LipSyncEvent>,
}

impl Rig {
    fn new() -> Self {
        let clock = Arc::new(SimulatedPlayback::new());
        let (tx, rx) = mpsc::unbounded_channel();
        let mut driver =
            LipSyncDriver::new(LipSyncCoordinator::new(LipSyncConfig::default()), clock.clone())
                .with_events(tx);
        driver.load_avatar(vec![head()]);
        Self { driver, clock, rx }
    }

    fn drain(&mut self) -> Vec<LipSyncEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}

fn attacked(events: &[LipSyncEvent]) -> Vec<u32> {
    events
        .iter()
        .filter_map(|e| match e {
            LipSyncEvent::Attack { viseme_id, .. } => Some(*viseme_id),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn utterance_plays_in_real_time() {
    let mut rig = Rig::new();
    rig.driver
        .arm(track(&[(4, 0.0), (11, 300.0), (0, 600.0)]))
        .unwrap();
    rig.clock.play();
    rig.driver.playback_started().unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(attacked(&rig.drain()), vec![4]);

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(attacked(&rig.drain()), vec![11]);

    tokio::time::sleep(Duration::from_millis(600)).await;
    let tail = rig.drain();
    assert_eq!(attacked(&tail), vec![0]);
    assert!(tail.iter().any(|e| matches!(e, LipSyncEvent::Release { viseme_id: 0, .. })));

    rig.driver.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn attacks_never_run_ahead_of_the_audio() {
    let mut rig = Rig::new();
    rig.driver
        .arm(track(&[(1, 0.0), (2, 90.0), (3, 250.0), (5, 251.0)]))
        .unwrap();
    rig.clock.play();
    rig.driver.playback_started().unwrap();

    tokio::time::sleep(Duration::from_millis(600)).await;
    let events = rig.drain();
    for event in &events {
        if let LipSyncEvent::Attack {
            event_time_ms,
            playback_ms,
            ..
        } = event
        {
            assert!(event_time_ms <= playback_ms);
        }
    }
    assert_eq!(attacked(&events), vec![1, 2, 3, 5]);
    rig.driver.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn pause_and_resume_keeps_fired_events() {
    let mut rig = Rig::new();
    rig.driver.arm(track(&[(4, 0.0), (11, 300.0)])).unwrap();
    rig.clock.play();
    rig.driver.playback_started().unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    rig.clock.pause();
    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert_eq!(attacked(&rig.drain()), vec![4]);

    rig.clock.play();
    rig.driver.playback_started().unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(attacked(&rig.drain()), vec![11]);

    let coordinator = rig.driver.coordinator();
    let state = coordinator.lock().unwrap().state();
    assert_eq!(state, SchedulerState::Running);
    rig.driver.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn stop_halts_the_loop_and_cancels_releases() {
    let mut rig = Rig::new();
    rig.driver.arm(track(&[(4, 0.0), (11, 300.0)])).unwrap();
    rig.clock.play();
    rig.driver.playback_started().unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let reset = rig.driver.stop().unwrap();
    assert!(matches!(reset, Some(LipSyncEvent::SessionReset { cancelled_releases: 1, .. })));
    rig.driver.settled().await;
    assert!(!rig.driver.is_running());

    tokio::time::sleep(Duration::from_millis(1000)).await;
    let events = rig.drain();
    assert_eq!(attacked(&events), vec![4]);
    assert!(events.iter().all(|e| e.kind() != "release"));
    assert!(rig.clock.position_ms() > 300.0);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_driver_cancels_the_loop() {
    let rig = Rig::new();
    let Rig {
        mut driver,
        clock,
        mut rx,
    } = rig;
    driver.arm(track(&[(4, 0.0), (11, 500.0)])).unwrap();
    clock.play();
    driver.playback_started().unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    drop(driver);
    tokio::time::sleep(Duration::from_millis(1000)).await;

    let mut attacks = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let LipSyncEvent::Attack { viseme_id, .. } = event {
            attacks.push(viseme_id);
        }
    }
    assert_eq!(attacks, vec![4]);
}
