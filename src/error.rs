//! `ociwin::error` is a module containing the crate's error type.

use thiserror::Error;

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// The result of an `ociwin` operation.
pub type Result<T> = std::result::Result<T, Error>;

/// An error that occurred while hydrating or extracting a Windows container image.
#[derive(pretty_error_debug::Debug, Error)]
pub enum Error {
    /// A registry request did not return a 200 OK.
    #[error("registry request failed: HTTP {status}")]
    HttpNotOk {
        /// The status code returned by the registry.
        status: u16,
    },

    /// A blob's recomputed digest did not match its declared digest.
    #[error("sha256 mismatch: expected {expected}, found {actual}")]
    ShaMismatch {
        /// The digest declared by the manifest/config/descriptor.
        expected: String,
        /// The digest recomputed over the downloaded bytes.
        actual: String,
    },

    /// A digest used an algorithm other than sha256.
    #[error("unsupported digest algorithm: expected sha256, found {actual}")]
    DigestAlgorithm {
        /// The algorithm actually found in the digest string.
        actual: String,
    },

    /// A digest string was not of the form `<algorithm>:<hex>`.
    #[error("invalid digest format: {0}")]
    InvalidDigest(String),

    /// A layer descriptor declared a media type the registry client does not know how to fetch.
    #[error("invalid media type: {0}")]
    InvalidMediaType(String),

    /// A blob or layer download failed; wraps the underlying cause with the blob's digest.
    #[error("failed to download blob {blob_sha}: {source}")]
    Download {
        /// The encoded digest of the blob that failed to download.
        blob_sha: String,
        /// The underlying error.
        #[source]
        source: Box<Error>,
    },

    /// The OCI artifact chain (index/manifest/config) failed schema or consistency validation.
    #[error("schema error: {0}")]
    Schema(String),

    /// A CLI argument or image reference was missing or malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The backup tar stream (or its embedded backup-stream frames) was malformed.
    #[error("backup tar error: {0}")]
    BackupTar(String),

    /// A layer-writer backend call failed; wraps the underlying cause with a contextual prefix
    /// naming which operation failed.
    #[error("{context}: {source}")]
    LayerWriter {
        /// A contextual prefix, e.g. "Failed to remove", "Failed to add link".
        context: &'static str,
        /// The underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// An HTTP client error.
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),

    /// A JSON (de)serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Wraps `self` as the cause of a [`Error::Download`] for the given blob digest.
    pub fn into_download(self, blob_sha: impl Into<String>) -> Error {
        Error::Download {
            blob_sha: blob_sha.into(),
            source: Box::new(self),
        }
    }
}
