//! Backend reply in, scheduled animation out.

use crate::helpers::coordinator;
use lipsync::LipSyncError;
use lipsync::avatar::catalog::{AvatarCatalog, Gender};
use lipsync::pipeline::messages::{ChatReply, ChatRequest};
use lipsync::runtime::LipSyncEvent;
use std::path::PathBuf;

fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read_to_string(path).expect("read fixture")
}

#[test]
fn saved_reply_plays_through_to_neutral() {
    let reply = ChatReply::from_json(&fixture("reply_hello.json")).unwrap();
    let url = reply.resolve_audio_url("http://localhost:8000").unwrap();
    assert!(url.path().starts_with("/output_audio/"));

    let mut c = coordinator();
    let armed = c.arm_reply(&reply, 0.0).unwrap();
    assert!(matches!(
        armed.last(),
        Some(LipSyncEvent::SessionArmed { events: 12, .. })
    ));
    c.playback_started();

    let end = reply.track().unwrap().end_time_ms(200.0);
    let mut attacks = 0;
    let mut now = 0.0;
    while now <= end + 200.0 {
        attacks += c
            .frame(now, now)
            .iter()
            .filter(|e| e.kind() == "attack")
            .count();
        now += 16.0;
    }

    assert_eq!(attacks, 12);
    assert!(c.scheduler().pending_releases().is_empty());
    assert_eq!(c.engine().active_count(), 0);
    assert!(
        c.rig()
            .binding()
            .meshes()
            .iter()
            .all(|m| m.influences().iter().all(|w| *w == 0.0))
    );
}

#[test]
fn camel_case_events_are_accepted() {
    let reply = ChatReply::from_json(
        r#"{"bot_reply":"hi","audio_url":"/a.mp3",
            "viseme_data":[{"visemeId":2,"timeMs":0},{"visemeId":3,"timeMs":80}]}"#,
    )
    .unwrap();
    assert_eq!(reply.track().unwrap().len(), 2);
}

#[test]
fn unordered_reply_is_rejected_with_the_offending_index() {
    let reply = ChatReply::from_json(
        r#"{"bot_reply":"hi","audio_url":"/a.mp3",
            "viseme_data":[{"viseme":1,"time":0},{"viseme":2,"time":300},{"viseme":3,"time":120}]}"#,
    )
    .unwrap();

    let mut c = coordinator();
    match c.arm_reply(&reply, 0.0) {
        Err(LipSyncError::Track { index, .. }) => assert_eq!(index, 2),
        other => panic!("expected a track error, got {other:?}"),
    }
    assert!(c.scheduler().session().is_none());
}

#[test]
fn every_builtin_avatar_can_build_a_request() {
    let catalog = AvatarCatalog::builtin();
    for profile in catalog.profiles() {
        let request = ChatRequest::for_avatar("Tell me a joke", &catalog, &profile.file).unwrap();
        assert_eq!(request.voice, profile.voice);
    }
    assert_eq!(catalog.avatars_for(Gender::Female).len(), 6);
    assert_eq!(catalog.avatars_for(Gender::Male).len(), 6);
}
