//! Typed notifications published by the sequencer.
//!
//! Each subscriber gets its own channel. Subscribers that hang up are dropped
//! on the next publish.

use std::sync::mpsc::{self, Receiver, Sender};

use serde::Serialize;

use crate::playlist::{EntryId, PlaybackPolicy};
use crate::time::SeekbarTime;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SequencerEvent {
    /// Periodic seekbar position and the policy shaping it
    SeekbarTimeUpdated {
        seekbar: SeekbarTime,
        policy: PlaybackPolicy,
    },
    /// The renderer switched entries (ids are the callers' original ids)
    EntryChanged {
        current: Option<EntryId>,
        next: Option<EntryId>,
        playback_time: f64,
    },
    SequencingError {
        entry: Option<EntryId>,
        message: String,
    },
    ResolutionFailed {
        reference: EntryId,
        message: String,
    },
    /// The playlist became playable
    Ready,
    /// Playback ran off the end of the playlist
    Finished,
}

#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<Sender<SequencerEvent>>,
}

impl EventBus {
    pub fn subscribe(&mut self) -> Receiver<SequencerEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn publish(&mut self, event: SequencerEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
