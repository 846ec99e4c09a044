use log::{debug, error, info};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::cache::LocationCache;
use crate::candidates::CandidateSet;
use crate::digest::Digest;
use crate::error::ProxyError;
use crate::imagestream::SecurityContext;
use crate::reference::ImageReference;
use crate::registry::{BlobStore, Descriptor, RepositoryRetriever};
use crate::ProxyResult;

/// Blob stores that have been found to hold a digest during this session.
#[derive(Default)]
pub struct ResolvedStore
{
    stores: Mutex<HashMap<Digest, Arc<dyn BlobStore>>>,
}

impl ResolvedStore
{
    pub fn get(&self, digest: &Digest) -> Option<Arc<dyn BlobStore>>
    {
        self.stores.lock().ok()?.get(digest).cloned()
    }

    /// Keeps the first store registered for a digest.
    pub fn insert(&self, digest: &Digest, store: Arc<dyn BlobStore>)
    {
        if let Ok(mut stores) = self.stores.lock() {
            stores.entry(digest.clone()).or_insert(store);
        }
    }
}

/// One resolution pass over a set of candidate repositories.
pub struct LocationResolver<'a>
{
    pub retriever: &'a dyn RepositoryRetriever,
    pub cache: &'a dyn LocationCache,
    pub resolved: &'a ResolvedStore,
    pub security: SecurityContext,
    pub ttl: Duration,
}

impl LocationResolver<'_>
{
    /// Looks for `digest` in `search`, trying repositories from `cached`
    /// before the rest.
    pub async fn resolve(
        &self,
        digest: &Digest,
        mut search: CandidateSet,
        cached: &[String],
    ) -> ProxyResult<Descriptor>
    {
        if search.is_empty() {
            return Err(ProxyError::BlobUnknown);
        }

        for repo in cached {
            let Some(reference) = search.get(repo) else {
                continue;
            };
            match self.stat_in(reference, digest).await {
                Ok(desc) => {
                    info!("Found digest location from cache {} in {}", digest, repo);
                    return Ok(desc);
                }
                Err(_) => {
                    search.remove(repo);
                }
            }
        }

        for (repo, reference) in &search {
            let Ok(desc) = self.stat_in(reference, digest).await else {
                continue;
            };
            self.cache.remember_digest(digest, self.ttl, repo);
            info!("Found digest location by search {} in {}", digest, repo);
            return Ok(desc);
        }

        Err(ProxyError::BlobUnknown)
    }

    async fn stat_in(&self, reference: &ImageReference, digest: &Digest) -> ProxyResult<Descriptor>
    {
        info!("Trying to stat {} from {}", digest, reference.exact());

        let registry = reference.registry_url()?;
        let repo = self
            .retriever
            .repository(&registry, &reference.repository_name(), self.security.insecure)
            .await
            .inspect_err(|e| {
                error!("Error getting remote repository for image {}: {}", reference.exact(), e)
            })?;

        let blobs = repo.blobs();
        let desc = match blobs.stat(digest).await {
            Ok(desc) => desc,
            Err(ProxyError::BlobUnknown) => {
                debug!("Blob {} not present in {}", digest, reference.exact());
                return Err(ProxyError::BlobUnknown);
            }
            Err(e) => {
                error!("Error getting blob {} from {}: {}", digest, reference.exact(), e);
                return Err(e);
            }
        };

        self.resolved.insert(digest, blobs);

        Ok(desc)
    }
}
