//! Resolver implementations.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{parse_ad_list, AdResolver, ResolveError};
use crate::config::ResolverConfig;
use crate::playlist::AdDescriptor;

/// Reads JSON ad lists from disk. Accepts `file://` URLs and plain paths;
/// relative paths are taken from `base_dir` when set.
#[derive(Debug, Clone, Default)]
pub struct FileResolver {
    base_dir: Option<PathBuf>,
}

impl FileResolver {
    pub fn new(base_dir: Option<PathBuf>) -> Self {
        Self { base_dir }
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(config.base_dir.clone())
    }

    fn path_for(&self, url: &str) -> Result<PathBuf, ResolveError> {
        let raw = match url.strip_prefix("file://") {
            Some(rest) => rest,
            None if url.contains("://") => {
                return Err(ResolveError::UnsupportedUrl(url.to_string()))
            }
            None => url,
        };
        let path = Path::new(raw);
        Ok(match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        })
    }
}

impl AdResolver for FileResolver {
    fn resolve(&self, url: &str) -> Result<Vec<AdDescriptor>, ResolveError> {
        let path = self.path_for(url)?;
        debug!(path = %path.display(), "Reading ad list");
        let file = File::open(&path)?;
        parse_ad_list(BufReader::new(file))
    }
}

/// In-memory ad lists keyed by URL.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    lists: HashMap<String, Vec<AdDescriptor>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: impl Into<String>, ads: Vec<AdDescriptor>) {
        self.lists.insert(url.into(), ads);
    }

    pub fn with(mut self, url: impl Into<String>, ads: Vec<AdDescriptor>) -> Self {
        self.insert(url, ads);
        self
    }
}

impl AdResolver for StaticResolver {
    fn resolve(&self, url: &str) -> Result<Vec<AdDescriptor>, ResolveError> {
        match self.lists.get(url) {
            Some(ads) if ads.is_empty() => Err(ResolveError::NoAds),
            Some(ads) => Ok(ads.clone()),
            None => Err(ResolveError::NotFound(url.to_string())),
        }
    }
}
