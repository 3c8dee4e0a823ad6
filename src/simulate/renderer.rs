//! A renderer that plays media by counting ticks.

use std::collections::{HashMap, HashSet};

use crate::session::{Renderer, RendererError, SessionInput};
use crate::time::ManifestTime;

#[derive(Debug, Default)]
pub struct SimulatedRenderer {
    /// Known media windows by URI; other media spans its render window
    media: HashMap<String, (f64, f64)>,
    failing: HashSet<String>,
    playing: Option<(String, f64)>,
    rate: f64,
    paused: bool,
    log: Vec<String>,
}

impl SimulatedRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_media(&mut self, uri: impl Into<String>, min: f64, max: f64) {
        self.media.insert(uri.into(), (min, max));
    }

    pub fn fail_on(&mut self, uri: impl Into<String>) {
        self.failing.insert(uri.into());
    }

    pub fn position(&self) -> Option<f64> {
        self.playing.as_ref().map(|(_, position)| *position)
    }

    /// Renderer calls made since the last drain.
    pub fn drain_log(&mut self) -> Vec<String> {
        std::mem::take(&mut self.log)
    }

    /// Play `step` seconds of media and report what the renderer would:
    /// a position tick, or end of media when the media runs out.
    ///
    /// `fallback` is the media window to assume for URIs without a known one.
    pub fn advance(&mut self, step: f64, fallback: (f64, f64)) -> Option<SessionInput> {
        if self.paused {
            return None;
        }
        let (uri, position) = self.playing.as_mut()?;
        let (min, max) = self.media.get(uri.as_str()).copied().unwrap_or(fallback);
        let next = *position + step * self.rate;

        let ended = if self.rate >= 0.0 { next >= max } else { next <= min };
        if ended {
            self.playing = None;
            return Some(SessionInput::EndOfMedia {
                is_end_of_sequence: false,
            });
        }
        *position = next;
        ManifestTime::new(next, min.min(next), max.max(next))
            .ok()
            .map(SessionInput::Tick)
    }
}

impl Renderer for SimulatedRenderer {
    fn play(&mut self, uri: &str, start: f64, rate: f64) -> Result<(), RendererError> {
        self.log.push(format!("play {uri} @{start:.3} x{rate}"));
        if self.failing.contains(uri) {
            self.playing = None;
            return Err(RendererError::Load {
                uri: uri.to_string(),
                message: "simulated failure".to_string(),
            });
        }
        self.playing = Some((uri.to_string(), start));
        self.rate = rate;
        self.paused = false;
        Ok(())
    }

    fn pause(&mut self) {
        self.log.push("pause".to_string());
        self.paused = true;
    }

    fn stop(&mut self) {
        self.log.push("stop".to_string());
        self.playing = None;
    }
}
