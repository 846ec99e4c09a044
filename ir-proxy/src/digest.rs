use sha2::{Digest as Sha2Digest, Sha256, Sha512};
use std::fmt::{Debug, Display};

use crate::error::ProxyError;
use crate::ProxyResult;

pub const SHA_256: &str = "sha256";
pub const SHA_512: &str = "sha512";

const SHA256_LEN: usize = 64;
const SHA512_LEN: usize = 128;

macro_rules! err {
    ($($arg:tt)+) => (Err(ProxyError::DigestInvalid(format!($($arg)+))))
}

macro_rules! er {
    ($($arg:tt)+) => (ProxyError::DigestInvalid(format!($($arg)+)))
}

/// Content address of a blob, `<algorithm>:<hex>`.
#[derive(PartialEq, Eq, Hash, Clone, PartialOrd, Ord)]
pub struct Digest
{
    algo: String,
    hash: String,
}

impl Display for Digest
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        <Self as Debug>::fmt(self, f)
    }
}

impl Debug for Digest
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        write!(f, "{}:{}", self.algo, self.hash)
    }
}

impl TryFrom<&String> for Digest
{
    type Error = ProxyError;

    fn try_from(value: &String) -> Result<Self, Self::Error>
    {
        Digest::try_from(value as &str)
    }
}

impl TryFrom<String> for Digest
{
    type Error = ProxyError;

    fn try_from(value: String) -> Result<Self, Self::Error>
    {
        Digest::try_from(&value as &str)
    }
}

impl TryFrom<&str> for Digest
{
    type Error = ProxyError;

    fn try_from(value: &str) -> Result<Self, Self::Error>
    {
        let Some((algo, hash)) = value.split_once(':') else {
            return err!("Digest \"{}\" has no algorithm separator", value);
        };

        Self::new(algo.to_string(), hash.to_string())
    }
}

impl Digest
{
    pub fn new(algo: String, hash: String) -> ProxyResult<Self>
    {
        let hash_len = hash.len();
        match algo.as_str() {
            SHA_256 => {
                if hash_len != SHA256_LEN {
                    err!("Wrong hash length: {}, expected: {}", hash_len, SHA256_LEN)?;
                }
            }
            SHA_512 => {
                if hash_len != SHA512_LEN {
                    err!("Wrong hash length: {}, expected: {}", hash_len, SHA512_LEN)?;
                }
            }
            a => err!("Wrong hash algorithm: {}", a)?,
        }

        hex::decode(&hash).map_err(|e| er!("Incorrect hash string: {}", e))?;

        Ok(Digest { algo, hash })
    }

    /// Digest of `content` using the given algorithm.
    pub fn from_content(algo: &str, content: &[u8]) -> ProxyResult<Self>
    {
        let hash = match algo {
            SHA_256 => hex::encode(Sha256::digest(content)),
            SHA_512 => hex::encode(Sha512::digest(content)),
            a => err!("Wrong hash algorithm: {}", a)?,
        };

        Ok(Digest { algo: algo.to_string(), hash })
    }

    pub fn get_algo(&self) -> &str
    {
        &self.algo
    }

    pub fn get_hash(&self) -> &str
    {
        &self.hash
    }

    pub fn verify(&self, content: &[u8]) -> bool
    {
        // new() guarantees a known algorithm so from_content() can't fail here
        match Digest::from_content(&self.algo, content) {
            Ok(computed) => computed == *self,
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn parse_and_display()
    {
        let raw = format!("sha256:{}", "ab".repeat(32));
        let digest = Digest::try_from(raw.as_str()).unwrap();

        assert_eq!(digest.get_algo(), "sha256");
        assert_eq!(digest.to_string(), raw);
    }

    #[test]
    fn rejects_malformed()
    {
        assert!(Digest::try_from("sha256").is_err());
        assert!(Digest::try_from("sha256:abcd").is_err());
        assert!(Digest::try_from(format!("md5:{}", "a".repeat(32))).is_err());
        assert!(Digest::try_from(format!("sha256:{}", "z".repeat(64))).is_err());
        assert!(Digest::try_from(format!("sha512:{}", "a".repeat(64))).is_err());
    }

    #[test]
    fn verify_content()
    {
        let digest = Digest::from_content(SHA_256, b"hello").unwrap();

        assert!(digest.verify(b"hello"));
        assert!(!digest.verify(b"hello!"));
        assert_eq!(
            digest.get_hash(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }
}
