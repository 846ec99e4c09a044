use log::debug;
use regex::Regex;
use std::fmt::Display;
use std::sync::OnceLock;
use url::Url;

use crate::digest::Digest;
use crate::error::ProxyError;
use crate::ProxyResult;

pub const DOCKER_DEFAULT_REGISTRY: &str = "docker.io";
pub const DOCKER_DEFAULT_V2_REGISTRY: &str = "registry-1.docker.io";
pub const DOCKER_DEFAULT_NAMESPACE: &str = "library";
pub const DOCKER_DEFAULT_TAG: &str = "latest";

const TAG_PATTERN: &str = r"^[a-zA-Z0-9_][a-zA-Z0-9._-]{0,127}$";
const COMPONENT_PATTERN: &str = r"^[a-z0-9]+(?:(?:[._]|__|-+)[a-z0-9]+)*$";

macro_rules! err {
    ($($arg:tt)+) => (Err(ProxyError::ReferenceInvalid(format!($($arg)+))))
}

fn tag_regex() -> &'static Regex
{
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(TAG_PATTERN).expect("Tag regex is malformed"))
}

fn component_regex() -> &'static Regex
{
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(COMPONENT_PATTERN).expect("Component regex is malformed"))
}

fn looks_like_registry(part: &str) -> bool
{
    part.contains('.') || part.contains(':') || part == "localhost"
}

/// A docker pull spec split into its parts. Empty strings mark absent parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageReference
{
    pub registry: String,
    pub namespace: String,
    pub name: String,
    pub tag: String,
    pub id: String,
}

impl ImageReference
{
    pub fn parse(raw: &str) -> ProxyResult<Self>
    {
        let mut reference = ImageReference::default();

        let mut rest = raw;
        if let Some((name, id)) = raw.split_once('@') {
            Digest::try_from(id)?;
            reference.id = id.to_string();
            rest = name;
        }

        if let Some(pos) = rest.rfind(':') {
            if pos > rest.rfind('/').unwrap_or(0) {
                let tag = &rest[pos + 1..];
                if !tag_regex().is_match(tag) {
                    return err!("Tag \"{}\" doesn't match: {}", tag, TAG_PATTERN);
                }
                reference.tag = tag.to_string();
                rest = &rest[..pos];
            }
        }

        let parts: Vec<&str> = rest.split('/').collect();
        match parts.as_slice() {
            [name] => {
                reference.name = name.to_string();
            }
            [first, name] => {
                if looks_like_registry(first) {
                    reference.registry = first.to_string();
                } else {
                    reference.namespace = first.to_string();
                }
                reference.name = name.to_string();
            }
            [registry, namespace, name @ ..] => {
                reference.registry = registry.to_string();
                reference.namespace = namespace.to_string();
                reference.name = name.join("/");
            }
            [] => return err!("Empty reference"),
        }

        if reference.name.is_empty() {
            return err!("Reference \"{}\" has no image name", raw);
        }

        let path = &parts[usize::from(!reference.registry.is_empty())..];
        for component in path {
            if !component_regex().is_match(component) {
                return err!("Invalid path component \"{}\" in \"{}\"", component, raw);
            }
        }

        debug!("Parsed reference \"{}\" as {:?}", raw, reference);

        Ok(reference)
    }

    /// Fills in what the docker client would assume for missing parts.
    pub fn docker_client_defaults(mut self) -> Self
    {
        if self.registry.is_empty() {
            self.registry = DOCKER_DEFAULT_REGISTRY.to_string();
        }
        if self.namespace.is_empty() && self.registry == DOCKER_DEFAULT_REGISTRY {
            self.namespace = DOCKER_DEFAULT_NAMESPACE.to_string();
        }
        if self.tag.is_empty() && self.id.is_empty() {
            self.tag = DOCKER_DEFAULT_TAG.to_string();
        }
        self
    }

    pub fn as_repository(&self) -> Self
    {
        Self {
            tag: String::new(),
            id: String::new(),
            ..self.clone()
        }
    }

    pub fn repository_name(&self) -> String
    {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", self.namespace, self.name)
        }
    }

    pub fn exact(&self) -> String
    {
        let mut s = String::new();
        if !self.registry.is_empty() {
            s.push_str(&self.registry);
            s.push('/');
        }
        s.push_str(&self.repository_name());
        if !self.tag.is_empty() {
            s.push(':');
            s.push_str(&self.tag);
        }
        if !self.id.is_empty() {
            s.push('@');
            s.push_str(&self.id);
        }
        s
    }

    /// Base url of the v2 API for the registry of this reference.
    pub fn registry_url(&self) -> ProxyResult<Url>
    {
        let host = match self.registry.as_str() {
            "" | DOCKER_DEFAULT_REGISTRY => DOCKER_DEFAULT_V2_REGISTRY,
            other => other,
        };

        Ok(Url::parse(&format!("https://{}", host))?)
    }
}

impl Display for ImageReference
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.write_str(&self.exact())
    }
}
