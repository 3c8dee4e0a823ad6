//! Scripted playback simulation.
//!
//! Loads a scenario into a [`PlaybackSession`] driven by a
//! [`SimulatedRenderer`] and records what happens tick by tick. Ad references
//! are resolved before the first tick, so a scenario always produces the same
//! transcript.

mod renderer;
mod scenario;

pub use renderer::SimulatedRenderer;
pub use scenario::{AdClip, ContentClip, Scenario, ScriptedSeek, VastSlot};

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::debug;

use crate::config::Config;
use crate::playlist::{AdDescriptor, EntryId, PlaylistEntryType};
use crate::resolver::FileResolver;
use crate::sequencer::SequencerEvent;
use crate::session::{PlaybackSession, PlaybackState, SessionInput};
use crate::time::{LinearTime, ManifestTime};

/// One line of the transcript.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Record {
    Renderer { tick: usize, call: String },
    Event { tick: usize, event: SequencerEvent },
    Rejected { tick: usize, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transcript {
    pub records: Vec<Record>,
    pub ticks: usize,
    pub final_state: PlaybackState,
    /// Seekbar updates are counted rather than listed
    pub seekbar_updates: usize,
}

fn id_or_dash(id: &Option<EntryId>) -> String {
    id.map_or_else(|| "-".to_string(), |id| id.to_string())
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Record::Renderer { tick, call } => write!(f, "[{tick:>4}] {call}"),
            Record::Rejected { tick, message } => write!(f, "[{tick:>4}] rejected: {message}"),
            Record::Event { tick, event } => {
                write!(f, "[{tick:>4}] ")?;
                match event {
                    SequencerEvent::Ready => write!(f, "ready"),
                    SequencerEvent::Finished => write!(f, "finished"),
                    SequencerEvent::EntryChanged {
                        current,
                        next,
                        playback_time,
                    } => write!(
                        f,
                        "entry {} -> {} at {playback_time:.3}",
                        id_or_dash(current),
                        id_or_dash(next)
                    ),
                    SequencerEvent::SequencingError { entry, message } => {
                        write!(f, "error on {}: {message}", id_or_dash(entry))
                    }
                    SequencerEvent::ResolutionFailed { reference, message } => {
                        write!(f, "resolution of {reference} failed: {message}")
                    }
                    SequencerEvent::SeekbarTimeUpdated { seekbar, .. } => write!(
                        f,
                        "seekbar {:.3} in [{:.3}, {:.3}]",
                        seekbar.current(),
                        seekbar.min(),
                        seekbar.max()
                    ),
                }
            }
        }
    }
}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for record in &self.records {
            writeln!(f, "{record}")?;
        }
        write!(
            f,
            "{:?} after {} ticks ({} seekbar updates)",
            self.final_state, self.ticks, self.seekbar_updates
        )
    }
}

struct Recorder {
    transcript: Transcript,
}

impl Recorder {
    fn collect(
        &mut self,
        tick: usize,
        session: &mut PlaybackSession<SimulatedRenderer>,
        events: &std::sync::mpsc::Receiver<SequencerEvent>,
    ) {
        for event in events.try_iter() {
            if matches!(event, SequencerEvent::SeekbarTimeUpdated { .. }) {
                self.transcript.seekbar_updates += 1;
            } else {
                self.transcript.records.push(Record::Event { tick, event });
            }
        }
        for call in session.renderer_mut().drain_log() {
            self.transcript.records.push(Record::Renderer { tick, call });
        }
    }

    fn reject(&mut self, tick: usize, error: impl fmt::Display) {
        debug!(tick, error = %error, "Input rejected");
        self.transcript.records.push(Record::Rejected {
            tick,
            message: error.to_string(),
        });
    }
}

fn linear(seconds: Option<f64>) -> Result<Option<LinearTime>> {
    Ok(seconds.map(LinearTime::new).transpose()?)
}

/// Build the session described by `scenario`. Relative ad-list paths resolve
/// against `base_dir` unless the config names its own.
fn build_session(
    scenario: &Scenario,
    config: &Config,
    base_dir: &Path,
) -> Result<PlaybackSession<SimulatedRenderer>> {
    let mut renderer = SimulatedRenderer::new();
    for clip in &scenario.content {
        renderer.add_media(clip.uri.clone(), clip.min, clip.max);
    }
    for uri in &scenario.failing {
        renderer.fail_on(uri.clone());
    }

    let resolver_dir = config
        .resolver
        .base_dir
        .clone()
        .unwrap_or_else(|| base_dir.to_path_buf());
    Ok(
        PlaybackSession::new(config.sequencer.clone(), renderer)
            .with_resolver(Arc::new(FileResolver::new(Some(resolver_dir)))),
    )
}

fn schedule(
    scenario: &Scenario,
    session: &mut PlaybackSession<SimulatedRenderer>,
    recorder: &mut Recorder,
) -> Result<()> {
    for clip in &scenario.content {
        let window = ManifestTime::window(clip.min, clip.max)
            .with_context(|| format!("Invalid window for content '{}'", clip.uri))?;
        session
            .append_content_clip(clip.uri.clone(), window)
            .with_context(|| format!("Failed to append content '{}'", clip.uri))?;
    }
    for ad in &scenario.ads {
        let window = ManifestTime::window(0.0, ad.duration)
            .with_context(|| format!("Invalid duration for ad '{}'", ad.uri))?;
        let mut descriptor = AdDescriptor::new(ad.uri.clone(), window, ad.roll).with_policy(ad.policy);
        descriptor.delete_after_play = ad.delete_after_play;
        if let Err(e) = session.schedule_clip(&descriptor, linear(ad.at)?, PlaylistEntryType::Media) {
            recorder.reject(0, format!("ad '{}': {e}", ad.uri));
        }
    }
    for slot in &scenario.vast {
        if let Err(e) = session.schedule_vast(slot.url.clone(), linear(slot.at)?, slot.roll, slot.one_shot) {
            recorder.reject(0, format!("vast '{}': {e}", slot.url));
        }
    }
    if let Some(uri) = &scenario.live_start_uri {
        session.set_seek_to_start_with_url(uri.clone())?;
    } else if scenario.seek_to_start {
        session.set_seek_to_start()?;
    }
    Ok(())
}

/// Handle every queued input, recording rejected ones. A rejected input
/// leaves the rest queued.
fn pump_all(session: &mut PlaybackSession<SimulatedRenderer>, recorder: &mut Recorder, tick: usize) {
    while let Err(e) = session.pump() {
        recorder.reject(tick, e);
    }
}

/// Run `scenario` to completion (or `max_ticks`) and return the transcript.
pub fn run(scenario: &Scenario, config: &Config, base_dir: &Path) -> Result<Transcript> {
    let mut session = build_session(scenario, config, base_dir)?;
    let events = session.subscribe();
    let mut recorder = Recorder {
        transcript: Transcript {
            records: Vec::new(),
            ticks: 0,
            final_state: PlaybackState::Stopped,
            seekbar_updates: 0,
        },
    };

    schedule(scenario, &mut session, &mut recorder)?;
    session.wait_for_resolutions(Duration::from_secs(config.resolver.timeout_secs))?;
    recorder.collect(0, &mut session, &events);

    if let Err(e) = session.play() {
        recorder.reject(0, e);
    }
    recorder.collect(0, &mut session, &events);

    let mut tick = 0;
    while tick < scenario.max_ticks
        && matches!(session.state(), PlaybackState::Playing | PlaybackState::Paused)
    {
        tick += 1;
        for seek in scenario.seeks.iter().filter(|s| s.tick == tick) {
            let input = match (seek.position, seek.seekbar) {
                (Some(position), _) => SessionInput::SeekLinear(LinearTime::new(position)?),
                (None, Some(seekbar)) => SessionInput::SeekSeekbar(seekbar),
                (None, None) => continue,
            };
            session.post(input);
        }
        // Seeks land before the renderer moves on.
        pump_all(&mut session, &mut recorder, tick);

        let fallback = session
            .current_segment()
            .map(|s| (s.clip.render_time.min(), s.clip.render_time.max()))
            .unwrap_or((0.0, 0.0));
        if let Some(input) = session.renderer_mut().advance(scenario.step, fallback) {
            session.post(input);
        }
        pump_all(&mut session, &mut recorder, tick);
        recorder.collect(tick, &mut session, &events);
    }

    recorder.transcript.ticks = tick;
    recorder.transcript.final_state = session.state();
    Ok(recorder.transcript)
}
