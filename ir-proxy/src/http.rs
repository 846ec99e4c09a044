use async_trait::async_trait;
use axum::body::Body;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, HeaderName};
use axum::response::Response;
use bytes::Bytes;
use futures::stream::TryStreamExt;
use log::{debug, error, info};
use reqwest::{Client, Method, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::io::StreamReader;
use url::Url;

use crate::digest::Digest;
use crate::error::ProxyError;
use crate::registry::{
    BlobReader, BlobStore, Descriptor, RemoteRepository, RepositoryRetriever, DEFAULT_MEDIA_TYPE,
};
use crate::ProxyResult;

const VERSION_PATH: &str = "v2/";
const BLOBS_PATH: &str = "blobs/";

pub const DOCKER_CONTENT_DIGEST: HeaderName = HeaderName::from_static("docker-content-digest");

const RELAYED_HEADERS: [HeaderName; 4] = [
    header::CONTENT_TYPE,
    header::CONTENT_LENGTH,
    header::CONTENT_RANGE,
    DOCKER_CONTENT_DIGEST,
];

fn header_str(headers: &HeaderMap, name: &HeaderName) -> Option<String>
{
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

fn content_length(headers: &HeaderMap) -> Option<u64>
{
    header_str(headers, &header::CONTENT_LENGTH)?.parse().ok()
}

fn blobs_url(registry: &Url, repository: &str) -> ProxyResult<Url>
{
    Ok(registry
        .join(VERSION_PATH)?
        .join(&format!("{}/", repository))?
        .join(BLOBS_PATH)?)
}

fn blob_url(base: &Url, digest: &Digest) -> ProxyResult<Url>
{
    // "./" keeps the digest algorithm from being read as a url scheme
    Ok(base.join(&format!("./{}", digest))?)
}

/// Hands out unauthenticated registry v2 clients.
pub struct HttpRetriever
{
    secure: Client,
    insecure: Client,
}

impl HttpRetriever
{
    pub fn new(timeout: Duration) -> ProxyResult<Self>
    {
        let client = |insecure: bool| {
            Client::builder()
                .danger_accept_invalid_certs(insecure)
                .timeout(timeout)
                .build()
        };

        Ok(Self {
            secure: client(false)?,
            insecure: client(true)?,
        })
    }

    fn client(&self, insecure: bool) -> Client
    {
        match insecure {
            true => self.insecure.clone(),
            false => self.secure.clone(),
        }
    }
}

#[async_trait]
impl RepositoryRetriever for HttpRetriever
{
    async fn repository(
        &self,
        registry: &Url,
        repository: &str,
        insecure: bool,
    ) -> ProxyResult<Box<dyn RemoteRepository>>
    {
        let base = blobs_url(registry, repository)?;

        debug!("Remote repository {} (insecure: {})", base, insecure);

        Ok(Box::new(HttpRepository {
            blobs: Arc::new(HttpBlobStore {
                client: self.client(insecure),
                base,
            }),
        }))
    }
}

pub struct HttpRepository
{
    blobs: Arc<HttpBlobStore>,
}

impl RemoteRepository for HttpRepository
{
    fn blobs(&self) -> Arc<dyn BlobStore>
    {
        self.blobs.clone()
    }
}

pub struct HttpBlobStore
{
    client: Client,
    base: Url,
}

impl HttpBlobStore
{
    async fn request(
        &self,
        method: Method,
        digest: &Digest,
        headers: HeaderMap,
    ) -> ProxyResult<reqwest::Response>
    {
        let url = blob_url(&self.base, digest)?;
        info!("Fetching {} {}", method, url);

        let response = self
            .client
            .request(method, url)
            .headers(headers)
            .send()
            .await
            .inspect_err(|e| error!("Failed to send request: {}", e))?;

        match response.status() {
            s if s.is_success() => Ok(response),
            StatusCode::NOT_FOUND => Err(ProxyError::BlobUnknown),
            s => Err(ProxyError::Status(s.as_u16())),
        }
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore
{
    async fn stat(&self, digest: &Digest) -> ProxyResult<Descriptor>
    {
        let response = self.request(Method::HEAD, digest, HeaderMap::new()).await?;
        let headers = response.headers();

        let digest = match header_str(headers, &DOCKER_CONTENT_DIGEST) {
            Some(d) => Digest::try_from(d)?,
            None => digest.clone(),
        };

        Ok(Descriptor {
            digest,
            size: content_length(headers).unwrap_or(0),
            media_type: header_str(headers, &header::CONTENT_TYPE)
                .unwrap_or_else(|| DEFAULT_MEDIA_TYPE.to_string()),
        })
    }

    async fn get(&self, digest: &Digest) -> ProxyResult<Bytes>
    {
        let response = self.request(Method::GET, digest, HeaderMap::new()).await?;
        let bytes = response.bytes().await?;

        if !digest.verify(&bytes) {
            error!("Response for {} doesn't match its digest", digest);
            return Err(ProxyError::DigestMismatch(digest.to_string()));
        }

        Ok(bytes)
    }

    async fn open(&self, digest: &Digest) -> ProxyResult<BlobReader>
    {
        let response = self.request(Method::GET, digest, HeaderMap::new()).await?;
        let length = content_length(response.headers());
        let stream = response.bytes_stream().map_err(std::io::Error::other);

        Ok(BlobReader::new(StreamReader::new(stream), length))
    }

    async fn serve(&self, digest: &Digest, request: &Parts) -> ProxyResult<Response>
    {
        let mut headers = HeaderMap::new();
        if let Some(range) = request.headers.get(header::RANGE) {
            headers.insert(header::RANGE, range.clone());
        }

        let response = self.request(Method::GET, digest, headers).await?;

        let mut builder = Response::builder().status(response.status());
        for name in RELAYED_HEADERS {
            if let Some(value) = response.headers().get(&name) {
                builder = builder.header(name, value.clone());
            }
        }

        builder
            .body(Body::from_stream(response.bytes_stream()))
            .map_err(|e| ProxyError::Generic(e.to_string()))
    }
}
