//! End-to-end sequencing through a playback session

use std::sync::Arc;
use std::time::Duration;

use adseq::config::SequencerConfig;
use adseq::resolver::FileResolver;
use adseq::{
    AdDescriptor, AdType, EntryId, PlaybackPolicy, PlaybackSession, PlaylistEntryType,
    SequencerError, SequencerEvent, SessionError, SessionInput,
};

use crate::helpers::{at, fixture_path, linear, window, RecordingRenderer};

fn session_with(config: SequencerConfig) -> PlaybackSession<RecordingRenderer> {
    PlaybackSession::new(config, RecordingRenderer::default())
}

fn session() -> PlaybackSession<RecordingRenderer> {
    session_with(SequencerConfig::default())
}

// ============================================================================
// Preroll
// ============================================================================

#[test]
fn preroll_plays_first_then_content_from_linear_zero() {
    let mut session = session();
    let events = session.subscribe();
    let content = session
        .append_content_clip("main.m3u8", window(0.0, 100.0))
        .unwrap();
    let pre = session
        .schedule_clip(
            &AdDescriptor::new("pre.mp4", window(0.0, 15.0), AdType::Preroll).one_shot(),
            None,
            PlaylistEntryType::Media,
        )
        .unwrap();

    session.play().unwrap();
    assert_eq!(session.current_segment().unwrap().segment_id, pre);

    session.post(SessionInput::EndOfMedia {
        is_end_of_sequence: false,
    });
    session.pump().unwrap();

    let segment = session.current_segment().unwrap();
    assert_eq!(segment.segment_id, content);
    assert_eq!(segment.initial_playback_time, 0.0);
    assert!(session.scheduler().entry(pre).is_none());
    assert_eq!(
        session.renderer().calls,
        vec!["play pre.mp4 @0", "play main.m3u8 @0"]
    );

    let changes: Vec<_> = events
        .try_iter()
        .filter(|e| matches!(e, SequencerEvent::EntryChanged { .. }))
        .collect();
    assert_eq!(changes.len(), 2);
}

// ============================================================================
// Seekbar policy
// ============================================================================

#[test]
fn no_rewind_content_pins_seekbar_and_refuses_backward_seeks() {
    let mut session = session_with(SequencerConfig {
        content_policy: PlaybackPolicy {
            allow_rewind: false,
            ..PlaybackPolicy::default()
        },
        ..SequencerConfig::default()
    });
    session
        .append_content_clip("main.m3u8", window(0.0, 100.0))
        .unwrap();
    session.play().unwrap();

    session.handle(SessionInput::Tick(at(50.0))).unwrap();

    let reading = session.last_reading().unwrap();
    assert_eq!(reading.seekbar.min(), 50.0);
    assert_eq!(reading.seekbar.max(), 100.0);
    assert!(!reading.range_exceeded);

    let err = session.seek_to(10.0).unwrap_err();
    assert!(matches!(
        err,
        SessionError::Sequencer(SequencerError::OutsideSeekbarWindow { .. })
    ));
    session.seek_to(75.0).unwrap();
    assert_eq!(session.current_segment().unwrap().initial_playback_time, 75.0);
}

#[test]
fn seek_refused_during_locked_ad_keeps_segment() {
    let mut session = session();
    session
        .append_content_clip("main.m3u8", window(0.0, 100.0))
        .unwrap();
    session
        .schedule_clip(
            &AdDescriptor::new("pre.mp4", window(0.0, 15.0), AdType::Preroll)
                .with_policy(PlaybackPolicy::locked()),
            None,
            PlaylistEntryType::Media,
        )
        .unwrap();
    session.play().unwrap();
    let before = session.current_segment().unwrap().clone();

    assert!(session.seek_to_linear(linear(60.0)).is_err());
    assert_eq!(session.current_segment(), Some(&before));
    assert_eq!(session.renderer().calls.len(), 1);
}

// ============================================================================
// Non-skippable ads
// ============================================================================

#[test]
fn seek_across_forced_midroll_plays_it_then_resumes() {
    let mut session = session();
    session
        .append_content_clip("main.m3u8", window(0.0, 100.0))
        .unwrap();
    let forced = session
        .schedule_clip(
            &AdDescriptor::new("forced.mp4", window(0.0, 10.0), AdType::Midroll).with_policy(
                PlaybackPolicy {
                    allow_skip_forward: false,
                    ..PlaybackPolicy::default()
                },
            ),
            Some(linear(40.0)),
            PlaylistEntryType::Media,
        )
        .unwrap();
    session.play().unwrap();
    session.handle(SessionInput::Tick(at(10.0))).unwrap();

    session.seek_to_linear(linear(80.0)).unwrap();
    assert_eq!(session.current_segment().unwrap().segment_id, forced);

    session
        .handle(SessionInput::EndOfMedia {
            is_end_of_sequence: false,
        })
        .unwrap();
    let landed = session.current_segment().unwrap();
    assert!(!landed.clip.is_advertisement);
    assert_eq!(landed.initial_playback_time, 80.0);
}

// ============================================================================
// Ad references
// ============================================================================

#[test]
fn reference_resolved_from_file_becomes_ordered_pod() {
    let resolver = FileResolver::new(Some(fixture_path("scenarios")));
    let mut session = session().with_resolver(Arc::new(resolver));
    session
        .append_content_clip("main.m3u8", window(0.0, 60.0))
        .unwrap();
    let reference = session
        .schedule_vast("break.json", Some(linear(30.0)), AdType::Midroll, true)
        .unwrap();

    session.wait_for_resolutions(Duration::from_secs(5)).unwrap();

    let entries = session.scheduler().entries();
    let uris: Vec<_> = entries
        .iter()
        .map(|e| e.clip_uri.as_deref().unwrap_or("-"))
        .collect();
    assert_eq!(uris, vec!["main.m3u8", "one.mp4", "two.mp4", "main.m3u8"]);
    assert_eq!(entries[1].original_id, reference);
    assert!(!entries[2].playback_policy.allow_skip_forward);
    assert_eq!(session.scheduler().linear_duration(), 60.0);
}

#[test]
fn schedule_then_cancel_leaves_playlist_unchanged() {
    let mut session = session();
    session
        .append_content_clip("main.m3u8", window(0.0, 60.0))
        .unwrap();
    let before = session.scheduler().entries().to_vec();

    let id = session
        .schedule_clip(
            &AdDescriptor::new("mid.mp4", window(0.0, 10.0), AdType::Midroll),
            Some(linear(20.0)),
            PlaylistEntryType::Media,
        )
        .unwrap();
    session.cancel_clip(id).unwrap();

    assert_eq!(session.scheduler().entries(), before.as_slice());
    assert!(session.cancel_clip(EntryId(1)).is_err());
}
