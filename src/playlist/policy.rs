//! Playback policy attached to playlist entries.

use serde::{Deserialize, Serialize};

/// What the viewer may do while an entry is active.
///
/// Every flag defaults to `true`, so a partially specified policy in a config
/// file or ad list only restricts what it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackPolicy {
    pub allow_seek: bool,
    pub allow_rewind: bool,
    pub allow_fast_forward: bool,
    pub allow_skip_back: bool,
    pub allow_skip_forward: bool,
    pub allow_pause: bool,
}

impl Default for PlaybackPolicy {
    fn default() -> Self {
        Self::unrestricted()
    }
}

impl PlaybackPolicy {
    /// Everything allowed (regular content).
    pub const fn unrestricted() -> Self {
        Self {
            allow_seek: true,
            allow_rewind: true,
            allow_fast_forward: true,
            allow_skip_back: true,
            allow_skip_forward: true,
            allow_pause: true,
        }
    }

    /// Nothing but pausing allowed (a typical forced ad).
    pub const fn locked() -> Self {
        Self {
            allow_seek: false,
            allow_rewind: false,
            allow_fast_forward: false,
            allow_skip_back: false,
            allow_skip_forward: false,
            allow_pause: true,
        }
    }

    /// Whether a seek in the given direction may jump over an entry with this policy.
    pub fn allows_skip(&self, forward: bool) -> bool {
        if forward {
            self.allow_skip_forward
        } else {
            self.allow_skip_back
        }
    }
}
