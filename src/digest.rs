//! Content digests.
//!
//! Grounded on `original_source/registry/registry.go`'s `getLayerSHA`/`checkSHA256` and
//! `oci-metadata/reader.go`'s `validateSHA256`: a digest is always `sha256:<64 lowercase hex
//! chars>` in this system, and any other algorithm is a hard failure.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

use crate::error::{Error, Result};

/// The only digest algorithm this system accepts.
pub const SHA256: &str = "sha256";

/// A content digest, `(algorithm, encoded)`, fixed to sha256 throughout this crate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Digest {
    encoded: String,
}

impl Digest {
    /// Returns the lowercase hex-encoded digest value, without the `sha256:` prefix.
    pub fn encoded(&self) -> &str {
        &self.encoded
    }

    /// Computes the sha256 digest of `bytes`.
    pub fn of(bytes: &[u8]) -> Digest {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Digest {
            encoded: hex::encode(hasher.finalize()),
        }
    }

    /// Verifies that `bytes` hashes to this digest, returning a [`Error::ShaMismatch`] otherwise.
    pub fn verify(&self, bytes: &[u8]) -> Result<()> {
        let actual = Digest::of(bytes);
        if actual != *self {
            return Err(Error::ShaMismatch {
                expected: self.encoded.clone(),
                actual: actual.encoded,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", SHA256, self.encoded)
    }
}

impl FromStr for Digest {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (algorithm, encoded) = s
            .split_once(':')
            .ok_or_else(|| Error::InvalidDigest(s.to_string()))?;

        if algorithm != SHA256 {
            return Err(Error::DigestAlgorithm {
                actual: algorithm.to_string(),
            });
        }

        if encoded.len() != 64 || !encoded.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::InvalidDigest(s.to_string()));
        }

        Ok(Digest {
            encoded: encoded.to_lowercase(),
        })
    }
}

impl TryFrom<String> for Digest {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Digest> for String {
    fn from(digest: Digest) -> Self {
        digest.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_digest() {
        let d: Digest = format!("sha256:{}", "a".repeat(64)).parse().unwrap();
        assert_eq!(d.encoded(), "a".repeat(64));
    }

    #[test]
    fn rejects_non_sha256_algorithm() {
        let err = format!("sha512:{}", "a".repeat(128))
            .parse::<Digest>()
            .unwrap_err();
        assert!(matches!(err, Error::DigestAlgorithm { actual } if actual == "sha512"));
    }

    #[test]
    fn rejects_malformed_digest() {
        assert!("not-a-digest".parse::<Digest>().is_err());
        assert!("sha256:tooshort".parse::<Digest>().is_err());
    }

    #[test]
    fn of_computes_matching_digest() {
        let d = Digest::of(b"hello world");
        assert_eq!(
            d.encoded(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn verify_detects_mismatch() {
        let d = Digest::of(b"hello world");
        let err = d.verify(b"goodbye world").unwrap_err();
        assert!(matches!(err, Error::ShaMismatch { .. }));
    }
}
