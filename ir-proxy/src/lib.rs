pub mod cache;
pub mod candidates;
pub mod config;
pub mod digest;
pub mod error;
pub mod getter;
pub mod http;
pub mod imagestream;
pub mod reference;
pub mod registry;
pub mod resolver;

pub type ProxyResult<T> = Result<T, error::ProxyError>;

pub use config::Config;
pub use getter::RemoteBlobGetter;
