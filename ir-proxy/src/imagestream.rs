use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::error::ProxyError;
use crate::reference::ImageReference;
use crate::ProxyResult;

pub const INSECURE_REPOSITORY_ANNOTATION: &str = "openshift.io/image.insecureRepository";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagEvent
{
    pub docker_image_reference: String,
    #[serde(default)]
    pub image: String,
}

/// Tag history, newest event first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagEventList
{
    #[serde(default)]
    pub items: Vec<TagEvent>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageStreamStatus
{
    #[serde(default)]
    pub docker_image_repository: String,
    #[serde(default)]
    pub tags: BTreeMap<String, TagEventList>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageStream
{
    #[serde(default)]
    pub annotations: HashMap<String, String>,
    #[serde(default)]
    pub status: ImageStreamStatus,
}

/// Trust setting for remote registries, taken from the owning image stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SecurityContext
{
    pub insecure: bool,
}

impl ImageStream
{
    pub fn security_context(&self) -> SecurityContext
    {
        let insecure = self
            .annotations
            .get(INSECURE_REPOSITORY_ANNOTATION)
            .is_some_and(|v| v == "true");

        SecurityContext { insecure }
    }

    /// Registry this stream is served from, empty when unknown.
    pub fn local_registry(&self) -> String
    {
        match ImageReference::parse(&self.status.docker_image_repository) {
            Ok(local) => local.registry,
            Err(_) => String::new(),
        }
    }
}

#[async_trait]
pub trait ImageStreamGetter: Send + Sync
{
    async fn image_stream(&self) -> ProxyResult<ImageStream>;
}

/// Reads the image stream from a JSON document, again on every call.
#[derive(Debug, Clone)]
pub struct FileImageStreamGetter
{
    path: PathBuf,
}

impl FileImageStreamGetter
{
    pub fn new<P: Into<PathBuf>>(path: P) -> Self
    {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ImageStreamGetter for FileImageStreamGetter
{
    async fn image_stream(&self) -> ProxyResult<ImageStream>
    {
        debug!("Loading image stream from: \"{}\"", self.path.display());

        let json = match tokio::fs::read(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(ProxyError::ImageStreamNotFound(self.path.display().to_string()))
            }
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                return Err(ProxyError::ImageStreamForbidden(self.path.display().to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        Ok(serde_json::from_slice(&json)?)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    const STREAM: &str = r#"{
        "annotations": { "openshift.io/image.insecureRepository": "true" },
        "status": {
            "dockerImageRepository": "172.30.1.1:5000/myproject/app",
            "tags": {
                "latest": { "items": [ { "dockerImageReference": "quay.io/org/app:v2" } ] }
            }
        }
    }"#;

    #[test]
    fn decode_stream()
    {
        let is: ImageStream = serde_json::from_str(STREAM).unwrap();

        assert!(is.security_context().insecure);
        assert_eq!(is.local_registry(), "172.30.1.1:5000");
        assert_eq!(is.status.tags["latest"].items[0].docker_image_reference, "quay.io/org/app:v2");
    }

    #[test]
    fn defaults_when_missing()
    {
        let is: ImageStream = serde_json::from_str("{}").unwrap();

        assert!(!is.security_context().insecure);
        assert!(is.local_registry().is_empty());
        assert!(is.status.tags.is_empty());
    }

    #[tokio::test]
    async fn missing_file_is_not_found()
    {
        let getter = FileImageStreamGetter::new("/nonexistent/ir-proxy/stream.json");

        assert!(matches!(
            getter.image_stream().await,
            Err(ProxyError::ImageStreamNotFound(_))
        ));
    }
}
