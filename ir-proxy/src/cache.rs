use log::debug;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::digest::Digest;

pub const DEFAULT_DIGEST_CAPACITY: usize = 2048;
pub const DEFAULT_BUCKET_SIZE: usize = 10;

/// Remembers which repositories recently served a digest.
pub trait LocationCache: Send + Sync
{
    /// Repository keys known to hold `digest`, most recent first.
    fn repositories_for_digest(&self, digest: &Digest) -> Vec<String>;
    fn remember_digest(&self, digest: &Digest, ttl: Duration, repository: &str);
}

#[derive(Debug)]
struct Location
{
    repository: String,
    expires: Instant,
}

#[derive(Debug, Default)]
struct Bucket
{
    // newest first
    locations: Vec<Location>,
}

impl Bucket
{
    fn prune(&mut self, now: Instant)
    {
        self.locations.retain(|l| l.expires > now);
    }
}

/// In-memory `LocationCache` with per entry expiry. Holds at most `capacity`
/// digests (least recently used is dropped) and `bucket_size` repositories
/// per digest (oldest is dropped).
#[derive(Debug)]
pub struct DigestCache
{
    buckets: Mutex<LruCache<Digest, Bucket>>,
    bucket_size: usize,
}

impl Default for DigestCache
{
    fn default() -> Self
    {
        Self::new(DEFAULT_DIGEST_CAPACITY, DEFAULT_BUCKET_SIZE)
    }
}

impl DigestCache
{
    pub fn new(capacity: usize, bucket_size: usize) -> Self
    {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            buckets: Mutex::new(LruCache::new(capacity)),
            bucket_size: bucket_size.max(1),
        }
    }

    pub fn len(&self) -> usize
    {
        self.buckets.lock().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool
    {
        self.len() == 0
    }
}

impl LocationCache for DigestCache
{
    fn repositories_for_digest(&self, digest: &Digest) -> Vec<String>
    {
        let Ok(mut buckets) = self.buckets.lock() else {
            return Vec::new();
        };

        let Some(bucket) = buckets.get_mut(digest) else {
            return Vec::new();
        };

        bucket.prune(Instant::now());
        let repositories: Vec<String> =
            bucket.locations.iter().map(|l| l.repository.clone()).collect();

        if repositories.is_empty() {
            debug!("Dropping expired locations of {}", digest);
            buckets.pop(digest);
        }

        repositories
    }

    fn remember_digest(&self, digest: &Digest, ttl: Duration, repository: &str)
    {
        let Ok(mut buckets) = self.buckets.lock() else {
            return;
        };

        let now = Instant::now();
        let bucket = buckets.get_or_insert_mut(digest.clone(), Bucket::default);

        bucket.prune(now);
        bucket.locations.retain(|l| l.repository != repository);
        bucket.locations.insert(
            0,
            Location {
                repository: repository.to_string(),
                expires: now + ttl,
            },
        );
        bucket.locations.truncate(self.bucket_size);
    }
}
