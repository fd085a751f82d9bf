//! The reference three-viseme utterance, frame by frame.

use crate::helpers::{RecordingSink, approx, coordinator, track};
use lipsync::config::SchedulerConfig;
use lipsync::runtime::LipSyncEvent;
use lipsync::VisemeScheduler;

const POSITIONS: [f64; 6] = [0.0, 150.0, 300.0, 450.0, 600.0, 750.0];

fn utterance() -> lipsync::VisemeTrack {
    track(&[(4, 0.0), (11, 300.0), (0, 600.0)])
}

/// `(kind, viseme)` pairs for attacks and releases in one frame.
fn actions(events: &[LipSyncEvent]) -> Vec<(&'static str, u32)> {
    events
        .iter()
        .filter_map(|event| match event {
            LipSyncEvent::Attack { viseme_id, .. } => Some(("attack", *viseme_id)),
            LipSyncEvent::Release { viseme_id, .. } => Some(("release", *viseme_id)),
            _ => None,
        })
        .collect()
}

#[test]
fn firing_sequence_matches_playback_positions() {
    let mut scheduler = VisemeScheduler::new(SchedulerConfig::default());
    scheduler.arm(utterance());
    scheduler.playback_started();
    let mut sink = RecordingSink::default();

    let per_frame: Vec<Vec<(&str, u32)>> = POSITIONS
        .iter()
        .map(|&p| actions(&scheduler.tick(p, p, &mut sink)))
        .collect();

    assert_eq!(per_frame[0], vec![("attack", 4)]);
    assert!(per_frame[1].is_empty());
    // release(4) came due at 240 and runs before attack(11).
    assert_eq!(per_frame[2], vec![("release", 4), ("attack", 11)]);
    assert!(per_frame[3].is_empty());
    // release(11) came due at 540.
    assert_eq!(per_frame[4], vec![("release", 11), ("attack", 0)]);
    assert!(per_frame[5].is_empty());

    let trailing = scheduler.pending_releases();
    assert_eq!(trailing.len(), 1);
    assert_eq!(trailing[0].viseme_id, 0);
    assert!(approx(trailing[0].due_at_ms, 760.0));
    assert!(approx(trailing[0].duration_ms, 100.0));

    scheduler.tick(760.0, 760.0, &mut sink);
    assert!(scheduler.pending_releases().is_empty());
    assert_eq!(sink.releases().len(), 3);
}

#[test]
fn attack_durations_follow_event_spacing() {
    let mut scheduler = VisemeScheduler::new(SchedulerConfig::default());
    scheduler.arm(utterance());
    scheduler.playback_started();
    let mut sink = RecordingSink::default();
    for p in POSITIONS {
        scheduler.tick(p, p, &mut sink);
    }

    let durations: Vec<f64> = sink.attacks().iter().map(|c| c.duration_ms).collect();
    assert!(approx(durations[0], 150.0));
    assert!(approx(durations[1], 150.0));
    assert!(approx(durations[2], 100.0));
    let starts: Vec<f64> = sink.attacks().iter().map(|c| c.now_ms).collect();
    assert_eq!(starts, vec![0.0, 300.0, 600.0]);
}

#[test]
fn mouth_opens_per_viseme_and_ends_neutral() {
    let mut coordinator = coordinator();
    coordinator.arm(utterance(), 0.0);
    coordinator.playback_started();

    let jaw = |c: &lipsync::LipSyncCoordinator| {
        c.rig()
            .binding()
            .mesh("Head")
            .unwrap()
            .influence("jawOpen")
            .unwrap()
    };

    coordinator.frame(0.0, 0.0);
    coordinator.frame(150.0, 150.0);
    // Viseme 4 drives jawOpen to 0.6 over 150 ms.
    assert!((jaw(&coordinator) - 0.6).abs() < 1e-6);

    for p in [300.0, 450.0, 600.0, 750.0, 760.0, 860.0] {
        coordinator.frame(p, p);
    }
    assert!(
        coordinator
            .rig()
            .binding()
            .meshes()
            .iter()
            .all(|m| m.influences().iter().all(|w| *w == 0.0))
    );
    assert_eq!(coordinator.engine().active_count(), 0);
}
