use async_trait::async_trait;
use axum::http::request::Parts;
use axum::response::Response;
use bytes::Bytes;
use std::pin::Pin;
use std::sync::Arc;
use tokio::io::AsyncRead;
use url::Url;

use crate::digest::Digest;
use crate::ProxyResult;

pub const DEFAULT_MEDIA_TYPE: &str = "application/octet-stream";

/// Metadata of a located blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor
{
    pub digest: Digest,
    pub size: u64,
    pub media_type: String,
}

pub struct BlobReader
{
    reader: Pin<Box<dyn AsyncRead + Send>>,
    length: Option<u64>,
}

impl BlobReader
{
    pub fn new(reader: impl AsyncRead + Send + 'static, length: Option<u64>) -> Self
    {
        Self {
            reader: Box::pin(reader),
            length,
        }
    }

    /// Size announced by the remote, if it sent one.
    pub fn content_length(&self) -> Option<u64>
    {
        self.length
    }
}

impl AsyncRead for BlobReader
{
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>>
    {
        self.reader.as_mut().poll_read(cx, buf)
    }
}

/// Blob operations of one repository.
#[async_trait]
pub trait BlobStore: Send + Sync
{
    /// Fails with `ProxyError::BlobUnknown` when the repository lacks the blob.
    async fn stat(&self, digest: &Digest) -> ProxyResult<Descriptor>;
    async fn get(&self, digest: &Digest) -> ProxyResult<Bytes>;
    async fn open(&self, digest: &Digest) -> ProxyResult<BlobReader>;
    async fn serve(&self, digest: &Digest, request: &Parts) -> ProxyResult<Response>;
}

pub trait RemoteRepository: Send + Sync
{
    fn blobs(&self) -> Arc<dyn BlobStore>;
}

#[async_trait]
pub trait RepositoryRetriever: Send + Sync
{
    async fn repository(
        &self,
        registry: &Url,
        repository: &str,
        insecure: bool,
    ) -> ProxyResult<Box<dyn RemoteRepository>>;
}
