//! Re-arming, stopping, and avatar swaps never let old work leak through.

use crate::helpers::{RecordingSink, coordinator, head, track};
use lipsync::LipSyncConfig;
use lipsync::LipSyncCoordinator;
use lipsync::MorphMesh;
use lipsync::SchedulerState;
use lipsync::config::SchedulerConfig;
use lipsync::runtime::{LipSyncEvent, ResetReason};
use lipsync::VisemeScheduler;

// ---------------------------------------------------------------------------
// Re-arm
// ---------------------------------------------------------------------------

#[test]
fn rearm_clears_fired_and_cancels_pending_releases() {
    let mut scheduler = VisemeScheduler::new(SchedulerConfig::default());
    scheduler.arm(track(&[(4, 0.0), (11, 100.0), (0, 5000.0)]));
    scheduler.playback_started();
    let mut sink = RecordingSink::default();
    scheduler.tick(100.0, 100.0, &mut sink);
    assert!(scheduler.is_fired(0) && scheduler.is_fired(1));
    assert_eq!(scheduler.pending_releases().len(), 2);

    let events = scheduler.arm(track(&[(6, 1000.0)]));
    match &events[0] {
        LipSyncEvent::SessionReset {
            reason,
            cancelled_releases,
            ..
        } => {
            assert_eq!(*reason, ResetReason::Rearm);
            assert_eq!(*cancelled_releases, 2);
        }
        other => panic!("expected a reset first, got {other:?}"),
    }
    assert_eq!(scheduler.fired_count(), 0);
    assert!(scheduler.pending_releases().is_empty());
    assert_eq!(scheduler.state(), SchedulerState::Armed);
}

#[test]
fn stale_release_never_touches_the_new_session() {
    let mut c = LipSyncCoordinator::new(LipSyncConfig {
        scheduler: SchedulerConfig {
            neutral_on_reset: false,
            ..SchedulerConfig::default()
        },
        ..LipSyncConfig::default()
    });
    c.load_avatar(vec![head()]);

    c.arm(track(&[(4, 0.0), (11, 100.0), (0, 150.0)]), 0.0);
    c.playback_started();
    c.frame(0.0, 0.0);
    c.frame(100.0, 100.0);
    // Viseme 11's release is pending, due at 140.
    assert_eq!(c.scheduler().pending_releases().len(), 1);

    // New utterance whose first viseme shares jawOpen with the old ones.
    c.arm(track(&[(6, 0.0)]), 100.0);
    c.playback_started();
    let mut events = Vec::new();
    events.extend(c.frame(100.0, 0.0));
    events.extend(c.frame(200.0, 100.0));
    for now in [230.0, 250.0] {
        events.extend(c.frame(now, now - 100.0));
    }

    assert!(events.iter().all(|e| e.kind() != "release"));
    let jaw = c.rig().binding().mesh("Head").unwrap().influence("jawOpen").unwrap();
    assert!((jaw - 0.2).abs() < 1e-6);
}

#[test]
fn captured_release_from_old_generation_is_dropped() {
    let mut scheduler = VisemeScheduler::new(SchedulerConfig::default());
    scheduler.arm(track(&[(4, 0.0)]));
    scheduler.playback_started();
    let mut sink = RecordingSink::default();
    scheduler.tick(0.0, 0.0, &mut sink);
    let stale = scheduler.pending_releases()[0];

    scheduler.reset(ResetReason::Stop);
    scheduler.arm(track(&[(4, 0.0)]));
    scheduler.playback_started();

    let event = scheduler.run_release(stale, 10_000.0, &mut sink);
    assert!(matches!(event, LipSyncEvent::ReleaseDropped { index: 0, .. }));
    assert!(sink.releases().is_empty());
}

// ---------------------------------------------------------------------------
// Stop
// ---------------------------------------------------------------------------

#[test]
fn stop_returns_to_idle_and_mouth_relaxes() {
    let mut c = coordinator();
    c.arm(track(&[(5, 0.0), (8, 400.0)]), 0.0);
    c.playback_started();
    c.frame(0.0, 0.0);
    c.frame(200.0, 200.0);

    let event = c.stop(200.0).unwrap();
    assert!(matches!(
        event,
        LipSyncEvent::SessionReset {
            reason: ResetReason::Stop,
            cancelled_releases: 1,
            ..
        }
    ));
    assert_eq!(c.state(), SchedulerState::Idle);

    for now in [250.0, 320.0, 800.0] {
        assert!(c.frame(now, now).is_empty());
    }
    assert!(
        c.rig()
            .binding()
            .meshes()
            .iter()
            .all(|m| m.influences().iter().all(|w| *w == 0.0))
    );
}

#[test]
fn playback_started_after_stop_is_ignored() {
    let mut c = coordinator();
    c.arm(track(&[(5, 0.0)]), 0.0);
    c.playback_started();
    c.stop(0.0);

    assert!(c.playback_started().is_none());
    assert!(c.frame(100.0, 100.0).is_empty());
}

// ---------------------------------------------------------------------------
// Avatar swap
// ---------------------------------------------------------------------------

#[test]
fn swap_before_release_leaves_detached_mesh_untouched() {
    let mut c = coordinator();
    c.arm(track(&[(4, 0.0)]), 0.0);
    c.playback_started();
    c.frame(0.0, 0.0);
    c.frame(50.0, 50.0);

    let swap = c.load_avatar(vec![head(), MorphMesh::new("Teeth", ["jawOpen"])]);
    let frozen: Vec<f32> = swap.detached.meshes()[0].influences().to_vec();
    let frozen_revision = swap.detached.revision();
    assert!(frozen_revision > 0);

    // Well past the original release (due 160) and its end.
    for now in [160.0, 200.0, 400.0] {
        c.frame(now, now);
    }

    assert_eq!(swap.detached.revision(), frozen_revision);
    assert_eq!(swap.detached.meshes()[0].influences(), frozen.as_slice());
    assert_eq!(c.rig().binding().revision(), 0);
    assert_eq!(c.state(), SchedulerState::Idle);
}

#[test]
fn swap_to_empty_binding_then_transitions_are_dropped() {
    let mut c = coordinator();
    c.load_avatar(Vec::new());
    c.arm(track(&[(4, 0.0)]), 0.0);
    c.playback_started();

    let events = c.frame(0.0, 0.0);
    assert_eq!(events[0].kind(), "attack");
    assert_eq!(c.engine().active_count(), 0);
}

#[test]
fn each_swap_gets_a_new_binding_generation() {
    let mut c = coordinator();
    let first = c.rig().generation();
    let swap = c.load_avatar(vec![head()]);
    assert_eq!(swap.detached.generation(), first);
    assert!(c.rig().generation() > first);
    assert!(matches!(
        swap.events.last(),
        Some(LipSyncEvent::AvatarBound { meshes: 1, .. })
    ));
}
