//! Ad resolution boundary.
//!
//! Resolving an ad reference (fetching and parsing ad markup) is slow and
//! fallible, so it runs off the playback loop. Resolvers turn a reference URL
//! into ad descriptors; [`ResolverWorker`] runs them on a background thread and
//! posts [`Resolution`]s back into the caller's queue.

mod sources;
mod worker;

pub use sources::{FileResolver, StaticResolver};
pub use worker::{Resolution, ResolverWorker};

use std::io::Read;

use serde::Deserialize;

use crate::playlist::AdDescriptor;

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Failed to read ad list: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed ad list: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Ad list contains no ads")]
    NoAds,

    #[error("No ad list registered for '{0}'")]
    NotFound(String),

    #[error("Unsupported ad URL '{0}'")]
    UnsupportedUrl(String),

    #[error("Resolver worker is not running")]
    WorkerUnavailable,
}

/// Turns an ad reference URL into playable ad descriptors.
pub trait AdResolver: Send + Sync {
    fn resolve(&self, url: &str) -> Result<Vec<AdDescriptor>, ResolveError>;
}

#[derive(Deserialize)]
struct AdList {
    #[serde(default)]
    ads: Vec<AdDescriptor>,
}

/// Parse a JSON ad list of the form `{ "ads": [ ... ] }`.
pub fn parse_ad_list<R: Read>(reader: R) -> Result<Vec<AdDescriptor>, ResolveError> {
    let list: AdList = serde_json::from_reader(reader)?;
    if list.ads.is_empty() {
        return Err(ResolveError::NoAds);
    }
    Ok(list.ads)
}
