//! Shared helpers for integration tests.

use std::path::PathBuf;

use adseq::{LinearTime, ManifestTime, Renderer, RendererError};

pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

pub fn fixture_path(name: &str) -> PathBuf {
    fixtures_dir().join(name)
}

pub fn load_fixture(name: &str) -> String {
    let path = fixture_path(name);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {:?}: {}", path, e))
}

pub fn window(min: f64, max: f64) -> ManifestTime {
    ManifestTime::window(min, max).unwrap()
}

pub fn at(seconds: f64) -> ManifestTime {
    ManifestTime::new(seconds, 0.0, 100.0).unwrap()
}

pub fn linear(seconds: f64) -> LinearTime {
    LinearTime::new(seconds).unwrap()
}

/// Renderer that records every call as `play <uri> @<start>`, `pause`, `stop`.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub calls: Vec<String>,
}

impl Renderer for RecordingRenderer {
    fn play(&mut self, uri: &str, start: f64, _rate: f64) -> Result<(), RendererError> {
        self.calls.push(format!("play {uri} @{start}"));
        Ok(())
    }

    fn pause(&mut self) {
        self.calls.push("pause".to_string());
    }

    fn stop(&mut self) {
        self.calls.push("stop".to_string());
    }
}
