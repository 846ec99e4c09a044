#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::request::Parts;
use axum::response::Response;
use bytes::Bytes;
use ir_proxy::cache::LocationCache;
use ir_proxy::digest::{Digest, SHA_256};
use ir_proxy::error::ProxyError;
use ir_proxy::imagestream::{
    ImageStream, ImageStreamGetter, TagEvent, TagEventList, INSECURE_REPOSITORY_ANNOTATION,
};
use ir_proxy::registry::{
    BlobReader, BlobStore, Descriptor, RemoteRepository, RepositoryRetriever, DEFAULT_MEDIA_TYPE,
};
use ir_proxy::ProxyResult;
use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

pub const TTL: Duration = Duration::from_secs(600);

pub fn blob(content: &str) -> (Digest, Bytes)
{
    let digest = Digest::from_content(SHA_256, content.as_bytes()).unwrap();
    (digest, Bytes::from(content.to_string()))
}

pub fn image_stream(local: &str, tags: &[(&str, &[&str])]) -> ImageStream
{
    let mut is = ImageStream::default();
    is.status.docker_image_repository = local.to_string();
    for (tag, refs) in tags {
        let items = refs
            .iter()
            .map(|r| TagEvent {
                docker_image_reference: r.to_string(),
                ..Default::default()
            })
            .collect();
        is.status.tags.insert(tag.to_string(), TagEventList { items });
    }
    is
}

pub enum StreamFailure
{
    NotFound,
    Forbidden,
    Other,
}

#[derive(Default)]
pub struct FakeStream
{
    stream: Mutex<ImageStream>,
    failure: Mutex<Option<StreamFailure>>,
}

impl FakeStream
{
    pub fn new(stream: ImageStream) -> Self
    {
        Self {
            stream: Mutex::new(stream),
            failure: Mutex::new(None),
        }
    }

    pub fn failing(failure: StreamFailure) -> Self
    {
        Self {
            stream: Mutex::new(ImageStream::default()),
            failure: Mutex::new(Some(failure)),
        }
    }

    pub fn set_insecure(&self, insecure: bool)
    {
        self.stream
            .lock()
            .unwrap()
            .annotations
            .insert(INSECURE_REPOSITORY_ANNOTATION.to_string(), insecure.to_string());
    }
}

#[async_trait]
impl ImageStreamGetter for FakeStream
{
    async fn image_stream(&self) -> ProxyResult<ImageStream>
    {
        match *self.failure.lock().unwrap() {
            Some(StreamFailure::NotFound) => Err(ProxyError::ImageStreamNotFound("is".into())),
            Some(StreamFailure::Forbidden) => Err(ProxyError::ImageStreamForbidden("is".into())),
            Some(StreamFailure::Other) => Err(ProxyError::Generic("etcd is down".into())),
            None => Ok(self.stream.lock().unwrap().clone()),
        }
    }
}

pub struct FakeBlobStore
{
    blobs: HashMap<Digest, Bytes>,
    broken: bool,
}

#[async_trait]
impl BlobStore for FakeBlobStore
{
    async fn stat(&self, digest: &Digest) -> ProxyResult<Descriptor>
    {
        if self.broken {
            return Err(ProxyError::Status(500));
        }
        let content = self.blobs.get(digest).ok_or(ProxyError::BlobUnknown)?;
        Ok(Descriptor {
            digest: digest.clone(),
            size: content.len() as u64,
            media_type: DEFAULT_MEDIA_TYPE.to_string(),
        })
    }

    async fn get(&self, digest: &Digest) -> ProxyResult<Bytes>
    {
        self.blobs.get(digest).cloned().ok_or(ProxyError::BlobUnknown)
    }

    async fn open(&self, digest: &Digest) -> ProxyResult<BlobReader>
    {
        let content = self.get(digest).await?;
        let length = content.len() as u64;
        Ok(BlobReader::new(Cursor::new(content), Some(length)))
    }

    async fn serve(&self, digest: &Digest, _request: &Parts) -> ProxyResult<Response>
    {
        let content = self.get(digest).await?;
        Ok(Response::new(Body::from(content)))
    }
}

struct FakeRepository
{
    blobs: Arc<FakeBlobStore>,
}

impl RemoteRepository for FakeRepository
{
    fn blobs(&self) -> Arc<dyn BlobStore>
    {
        self.blobs.clone()
    }
}

/// Serves blobs from in-memory repositories keyed `host[:port]/repository`
/// and records every repository request.
#[derive(Default)]
pub struct FakeRetriever
{
    repos: HashMap<String, HashMap<Digest, Bytes>>,
    broken: HashSet<String>,
    calls: Mutex<Vec<(String, bool)>>,
}

impl FakeRetriever
{
    pub fn with_blob(mut self, repo: &str, digest: &Digest, content: &Bytes) -> Self
    {
        self.repos
            .entry(repo.to_string())
            .or_default()
            .insert(digest.clone(), content.clone());
        self
    }

    pub fn with_broken(mut self, repo: &str) -> Self
    {
        self.broken.insert(repo.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String>
    {
        self.calls.lock().unwrap().iter().map(|(r, _)| r.clone()).collect()
    }

    pub fn insecure_flags(&self) -> Vec<bool>
    {
        self.calls.lock().unwrap().iter().map(|(_, i)| *i).collect()
    }
}

#[async_trait]
impl RepositoryRetriever for FakeRetriever
{
    async fn repository(
        &self,
        registry: &Url,
        repository: &str,
        insecure: bool,
    ) -> ProxyResult<Box<dyn RemoteRepository>>
    {
        let host = registry.host_str().unwrap_or_default();
        let key = match registry.port() {
            Some(port) => format!("{}:{}/{}", host, port, repository),
            None => format!("{}/{}", host, repository),
        };
        self.calls.lock().unwrap().push((key.clone(), insecure));

        let store = FakeBlobStore {
            blobs: self.repos.get(&key).cloned().unwrap_or_default(),
            broken: self.broken.contains(&key),
        };

        Ok(Box::new(FakeRepository {
            blobs: Arc::new(store),
        }))
    }
}

/// Location cache with fixed hints that records writes.
#[derive(Default)]
pub struct RecordingCache
{
    hints: Mutex<HashMap<Digest, Vec<String>>>,
    remembered: Mutex<Vec<(Digest, Duration, String)>>,
}

impl RecordingCache
{
    pub fn with_hint(self, digest: &Digest, repos: &[&str]) -> Self
    {
        self.hints
            .lock()
            .unwrap()
            .insert(digest.clone(), repos.iter().map(|r| r.to_string()).collect());
        self
    }

    pub fn remembered(&self) -> Vec<(Digest, Duration, String)>
    {
        self.remembered.lock().unwrap().clone()
    }
}

impl LocationCache for RecordingCache
{
    fn repositories_for_digest(&self, digest: &Digest) -> Vec<String>
    {
        self.hints.lock().unwrap().get(digest).cloned().unwrap_or_default()
    }

    fn remember_digest(&self, digest: &Digest, ttl: Duration, repository: &str)
    {
        self.remembered
            .lock()
            .unwrap()
            .push((digest.clone(), ttl, repository.to_string()));
    }
}
