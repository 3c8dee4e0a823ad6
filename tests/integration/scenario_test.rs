//! Scripted scenarios run through the simulator

use adseq::config::Config;
use adseq::simulate::{self, Record, Scenario, Transcript};
use adseq::{PlaybackState, SequencerEvent};

use crate::helpers::{fixture_path, fixtures_dir, load_fixture};

fn run_fixture(name: &str) -> Transcript {
    let scenario = Scenario::parse(&load_fixture(&format!("scenarios/{name}"))).unwrap();
    simulate::run(&scenario, &Config::default(), &fixtures_dir().join("scenarios")).unwrap()
}

fn calls(transcript: &Transcript) -> Vec<&str> {
    transcript
        .records
        .iter()
        .filter_map(|r| match r {
            Record::Renderer { call, .. } => Some(call.as_str()),
            _ => None,
        })
        .collect()
}

#[test]
fn preroll_transcript() {
    let transcript = run_fixture("preroll.toml");

    insta::assert_snapshot!(transcript.to_string(), @r###"
    [   0] ready
    [   0] entry - -> #2 at 0.000
    [   0] play pre.mp4 @0.000 x1
    [   2] entry #2 -> #1 at 0.000
    [   2] play main.m3u8 @0.000 x1
    [   6] entry #1 -> - at 0.000
    [   6] finished
    [   6] stop
    Finished after 6 ticks (4 seekbar updates)
    "###);
}

#[test]
fn vast_reference_plays_as_a_pod_then_resumes_content() {
    let transcript = run_fixture("vast_pod.toml");

    assert_eq!(
        calls(&transcript),
        vec![
            "play main.m3u8 @0.000 x1",
            "play one.mp4 @0.000 x1",
            "play two.mp4 @0.000 x1",
            "play main.m3u8 @30.000 x1",
            "stop"
        ]
    );
    assert_eq!(transcript.final_state, PlaybackState::Finished);
    assert!(!transcript.records.iter().any(|r| matches!(
        r,
        Record::Event {
            event: SequencerEvent::ResolutionFailed { .. },
            ..
        }
    )));
}

#[test]
fn seek_over_forced_ad_plays_it_first() {
    let transcript = run_fixture("forced_seek.toml");

    assert_eq!(
        calls(&transcript),
        vec![
            "play main.m3u8 @0.000 x1",
            "play forced.mp4 @0.000 x1",
            "play main.m3u8 @80.000 x1",
            "stop"
        ]
    );
    assert_eq!(transcript.final_state, PlaybackState::Finished);
}

#[test]
fn transcript_serializes_as_tagged_records() {
    let transcript = run_fixture("preroll.toml");
    let json = serde_json::to_value(&transcript).unwrap();

    assert_eq!(json["final_state"], "finished");
    assert_eq!(json["ticks"], 6);
    assert_eq!(json["records"][0]["type"], "event");
    assert_eq!(json["records"][0]["event"]["event"], "ready");
    assert_eq!(json["records"][2]["type"], "renderer");
}

#[test]
fn invalid_scenario_is_rejected() {
    assert!(Scenario::load(&fixture_path("scenarios/invalid.toml")).is_err());
    assert!(Scenario::load(&fixture_path("scenarios/missing.toml")).is_err());
}
