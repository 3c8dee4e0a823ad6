//! Ad descriptors: output of ad resolution, input to the scheduler.

use serde::{Deserialize, Serialize};

use super::{EntryId, PlaybackPolicy};
use crate::time::ManifestTime;

/// Where an ad goes relative to the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdType {
    Preroll,
    Midroll,
    Postroll,
    /// Subsequent ad in a pod, placed right after `append_to`
    Pod,
}

/// A resolved ad ready to be scheduled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdDescriptor {
    pub clip_url: String,
    /// Rendering window inside the ad media
    pub render_time: ManifestTime,
    #[serde(default)]
    pub policy: PlaybackPolicy,
    #[serde(default)]
    pub delete_after_play: bool,
    pub ad_type: AdType,
    /// Entry this pod member follows; `None` outside pods
    #[serde(default)]
    pub append_to: Option<EntryId>,
}

impl AdDescriptor {
    pub fn new(clip_url: impl Into<String>, render_time: ManifestTime, ad_type: AdType) -> Self {
        Self {
            clip_url: clip_url.into(),
            render_time,
            policy: PlaybackPolicy::default(),
            delete_after_play: false,
            ad_type,
            append_to: None,
        }
    }

    pub fn with_policy(mut self, policy: PlaybackPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn one_shot(mut self) -> Self {
        self.delete_after_play = true;
        self
    }

    /// Turn this descriptor into a pod member following `entry`.
    pub fn appended_to(mut self, entry: EntryId) -> Self {
        self.ad_type = AdType::Pod;
        self.append_to = Some(entry);
        self
    }
}
