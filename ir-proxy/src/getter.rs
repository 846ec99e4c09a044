use axum::http::request::Parts;
use axum::response::Response;
use bytes::Bytes;
use log::error;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::LocationCache;
use crate::candidates::{self, Candidates};
use crate::digest::Digest;
use crate::error::ProxyError;
use crate::imagestream::ImageStreamGetter;
use crate::registry::{BlobReader, BlobStore, Descriptor, RepositoryRetriever};
use crate::resolver::{LocationResolver, ResolvedStore};
use crate::ProxyResult;

/// Serves blobs of an image stream out of the remote repositories its tags
/// point at.
///
/// Blob stores located by `stat` are kept for the lifetime of the getter, so
/// one getter is meant to back one client session.
pub struct RemoteBlobGetter
{
    stream: Arc<dyn ImageStreamGetter>,
    retriever: Arc<dyn RepositoryRetriever>,
    cache: Arc<dyn LocationCache>,
    ttl: Duration,
    resolved: ResolvedStore,
}

impl RemoteBlobGetter
{
    pub fn new(
        stream: Arc<dyn ImageStreamGetter>,
        retriever: Arc<dyn RepositoryRetriever>,
        cache: Arc<dyn LocationCache>,
        ttl: Duration,
    ) -> Self
    {
        Self {
            stream,
            retriever,
            cache,
            ttl,
            resolved: ResolvedStore::default(),
        }
    }

    pub async fn stat(&self, digest: &Digest) -> ProxyResult<Descriptor>
    {
        let is = match self.stream.image_stream().await {
            Ok(is) => is,
            Err(ProxyError::ImageStreamNotFound(_)) | Err(ProxyError::ImageStreamForbidden(_)) => {
                return Err(ProxyError::BlobUnknown)
            }
            Err(e) => {
                error!("Error retrieving image stream for blob: {}", e);
                return Err(e);
            }
        };

        let resolver = LocationResolver {
            retriever: self.retriever.as_ref(),
            cache: self.cache.as_ref(),
            resolved: &self.resolved,
            security: is.security_context(),
            ttl: self.ttl,
        };

        let local_registry = is.local_registry();
        let cached = self.cache.repositories_for_digest(digest);

        let primary = candidates::identify(&is, &local_registry, Candidates::Primary);
        if let Ok(desc) = resolver.resolve(digest, primary.clone(), &cached).await {
            return Ok(desc);
        }

        let secondary = candidates::without(
            candidates::identify(&is, &local_registry, Candidates::Secondary),
            &primary,
        );
        if let Ok(desc) = resolver.resolve(digest, secondary, &cached).await {
            return Ok(desc);
        }

        Err(ProxyError::BlobUnknown)
    }

    pub async fn open(&self, digest: &Digest) -> ProxyResult<BlobReader>
    {
        let (store, digest) = self.locate(digest, "Open").await?;
        store.open(&digest).await
    }

    pub async fn get(&self, digest: &Digest) -> ProxyResult<Bytes>
    {
        let (store, digest) = self.locate(digest, "Get").await?;
        store.get(&digest).await
    }

    pub async fn serve(&self, digest: &Digest, request: &Parts) -> ProxyResult<Response>
    {
        let (store, digest) = self.locate(digest, "Serve").await?;
        store.serve(&digest, request).await
    }

    /// Blob store for `digest` and the digest to ask it for.
    async fn locate(&self, digest: &Digest, op: &str)
        -> ProxyResult<(Arc<dyn BlobStore>, Digest)>
    {
        if let Some(store) = self.resolved.get(digest) {
            return Ok((store, digest.clone()));
        }

        let desc = self.stat(digest).await.inspect_err(|e| {
            error!("{}: failed to stat blob {} in remote repositories: {}", op, digest, e)
        })?;

        let store = self.resolved.get(&desc.digest).ok_or(ProxyError::BlobUnknown)?;

        Ok((store, desc.digest))
    }
}
