//! The renderer seam: whatever actually decodes and shows the media.

/// Errors a renderer reports when asked to start playback.
#[derive(Debug, thiserror::Error)]
pub enum RendererError {
    #[error("Cannot load '{uri}': {message}")]
    Load { uri: String, message: String },

    #[error("Renderer unavailable: {0}")]
    Unavailable(String),
}

/// A single-stream media renderer.
///
/// Calls are made from the session's loop only. Completion, buffering and
/// failures are reported back by posting [`SessionInput`](super::SessionInput)s.
pub trait Renderer {
    /// Start `uri` at manifest time `start`, playing at `rate`.
    fn play(&mut self, uri: &str, start: f64, rate: f64) -> Result<(), RendererError>;

    fn pause(&mut self);

    fn stop(&mut self);

    /// Hint that `uri` will be played next from `start`.
    fn preload(&mut self, _uri: &str, _start: f64) {}
}
