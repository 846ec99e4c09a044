#[derive(Debug)]
pub enum ProxyError
{
    BlobUnknown,
    ImageStreamNotFound(String),
    ImageStreamForbidden(String),
    ReferenceInvalid(String),
    DigestInvalid(String),
    DigestMismatch(String),
    Status(u16),
    IO(std::io::Error),
    SerdeJson(serde_json::Error),
    Http(reqwest::Error),
    UrlParsing(String),
    Generic(String),
}

impl std::error::Error for ProxyError {}

impl std::fmt::Display for ProxyError
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        match self {
            ProxyError::BlobUnknown => write!(f, "BlobUnknown"),
            ProxyError::ImageStreamNotFound(s) => write!(f, "ImageStreamNotFound({})", s),
            ProxyError::ImageStreamForbidden(s) => write!(f, "ImageStreamForbidden({})", s),
            ProxyError::ReferenceInvalid(s) => write!(f, "ReferenceInvalid({})", s),
            ProxyError::DigestInvalid(s) => write!(f, "DigestInvalid({})", s),
            ProxyError::DigestMismatch(s) => write!(f, "DigestMismatch({})", s),
            ProxyError::Status(code) => write!(f, "StatusError({})", code),
            ProxyError::IO(e) => write!(f, "IOError({:?})", e),
            ProxyError::SerdeJson(e) => write!(f, "SerdeJsonError({:?})", e),
            ProxyError::Http(e) => write!(f, "HttpError({})", e),
            ProxyError::UrlParsing(s) => write!(f, "UrlParsingError({})", s),
            ProxyError::Generic(s) => write!(f, "GenericError({})", s),
        }
    }
}

impl From<std::io::Error> for ProxyError
{
    fn from(value: std::io::Error) -> Self
    {
        Self::IO(value)
    }
}

impl From<serde_json::Error> for ProxyError
{
    fn from(value: serde_json::Error) -> Self
    {
        Self::SerdeJson(value)
    }
}

impl From<reqwest::Error> for ProxyError
{
    fn from(value: reqwest::Error) -> Self
    {
        Self::Http(value)
    }
}

impl From<url::ParseError> for ProxyError
{
    fn from(value: url::ParseError) -> Self
    {
        Self::UrlParsing(value.to_string())
    }
}
