use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::cache::{DEFAULT_BUCKET_SIZE, DEFAULT_DIGEST_CAPACITY};
use crate::ProxyResult;

pub const DEFAULT_CACHE_TTL_SECS: u64 = 20 * 60;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config
{
    /// lifetime of a remembered digest location
    pub blob_repository_cache_ttl: u64,
    pub cache_digests: usize,
    pub cache_repositories_per_digest: usize,
    /// per request timeout against remote registries
    pub timeout: u64,
}

impl Default for Config
{
    fn default() -> Self
    {
        Config {
            blob_repository_cache_ttl: DEFAULT_CACHE_TTL_SECS,
            cache_digests: DEFAULT_DIGEST_CAPACITY,
            cache_repositories_per_digest: DEFAULT_BUCKET_SIZE,
            timeout: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Config
{
    pub fn from_file<P: AsRef<Path>>(path: P) -> ProxyResult<Self>
    {
        let json = std::fs::read(path)?;
        Ok(serde_json::from_slice(&json)?)
    }

    pub fn cache_ttl(&self) -> Duration
    {
        Duration::from_secs(self.blob_repository_cache_ttl)
    }

    pub fn request_timeout(&self) -> Duration
    {
        Duration::from_secs(self.timeout)
    }
}
