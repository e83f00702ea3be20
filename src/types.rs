//! OCI artifact data model: descriptors, manifests, image config, and the image index.
//!
//! Grounded on `original_source/oci-metadata/{metadata,reader}.go`, which serialize these
//! same shapes through `opencontainers/image-spec`; field names here follow that spec's JSON
//! casing via `serde(rename)` rather than the Go struct names.

use serde::{Deserialize, Serialize};

use crate::digest::Digest;

/// Media type of a Docker/OCI manifest (single-platform, schema v2).
pub const MEDIA_TYPE_MANIFEST_V2: &str = "application/vnd.docker.distribution.manifest.v2+json";
/// Media type of a Docker manifest list (multi-platform).
pub const MEDIA_TYPE_MANIFEST_V2_LIST: &str =
    "application/vnd.docker.distribution.manifest.list.v2+json";
/// Media type of an OCI image manifest (accepted as an index entry in `index.json`).
pub const MEDIA_TYPE_OCI_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";
/// Media type of a Docker container image config blob.
pub const MEDIA_TYPE_IMAGE_CONFIG: &str = "application/vnd.docker.container.image.v1+json";
/// Media type of a layer fetched directly from the registry.
pub const MEDIA_TYPE_DIFF_LAYER: &str = "application/vnd.docker.image.rootfs.diff.tar.gzip";
/// Media type of a layer fetched from the descriptor's `urls[0]` (foreign layer).
pub const MEDIA_TYPE_FOREIGN_LAYER: &str =
    "application/vnd.docker.image.rootfs.foreign.diff.tar.gzip";
/// Media type layers are tagged with once they are written into an on-disk OCI layout.
pub const MEDIA_TYPE_OCI_LAYER: &str = "application/vnd.oci.image.layer.v1.tar+gzip";

/// The only OS/architecture pair this system accepts.
pub const PLATFORM_OS: &str = "windows";
/// The only OS/architecture pair this system accepts.
pub const PLATFORM_ARCH: &str = "amd64";

/// The OCI image layout version this crate writes and expects to read.
pub const IMAGE_LAYOUT_VERSION: &str = "1.0.0";

/// `{os, architecture}`, declared on a config, or optionally on a descriptor/index entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    /// Operating system, e.g. `"windows"`.
    pub os: String,
    /// CPU architecture, e.g. `"amd64"`.
    pub architecture: String,
}

impl Platform {
    /// The fixed `windows/amd64` platform this system targets.
    pub fn windows_amd64() -> Platform {
        Platform {
            os: PLATFORM_OS.to_string(),
            architecture: PLATFORM_ARCH.to_string(),
        }
    }

    /// Returns `Ok(())` iff this platform is `windows/amd64`.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.os != PLATFORM_OS || self.architecture != PLATFORM_ARCH {
            return Err(crate::error::Error::Schema(format!(
                "invalid platform: expected {PLATFORM_OS}/{PLATFORM_ARCH}, found {}/{}",
                self.os, self.architecture
            )));
        }
        Ok(())
    }
}

/// An OCI descriptor: a reference to content by digest, with its media type and size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    /// The media type of the referenced content.
    #[serde(rename = "mediaType")]
    pub media_type: String,
    /// The digest of the referenced content.
    pub digest: Digest,
    /// The size in bytes of the referenced content.
    pub size: u64,
    /// Alternative URLs the content may be fetched from (used by foreign layers).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub urls: Vec<String>,
    /// The platform this content targets, if declared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
}

impl Descriptor {
    /// Builds a descriptor with no `urls`/`platform`.
    pub fn new(media_type: impl Into<String>, digest: Digest, size: u64) -> Descriptor {
        Descriptor {
            media_type: media_type.into(),
            digest,
            size,
            urls: Vec::new(),
            platform: None,
        }
    }
}

/// `rootfs.type` value this system understands.
pub const ROOTFS_TYPE_LAYERS: &str = "layers";

/// The `rootfs` field of an [`ImageConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootFs {
    /// Always `"layers"`.
    #[serde(rename = "type")]
    pub fs_type: String,
    /// Digests of each layer's *uncompressed* content, bottom-most first; `diff_ids[i]` is the
    /// on-disk id of `manifest.layers[i]`.
    pub diff_ids: Vec<Digest>,
}

/// The image configuration blob referenced by a [`Manifest`]'s `config` descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Operating system, must be `"windows"`.
    pub os: String,
    /// CPU architecture, must be `"amd64"`.
    pub architecture: String,
    /// The layer chain this config describes.
    pub rootfs: RootFs,
}

impl ImageConfig {
    /// Builds a config for the fixed `windows/amd64` platform.
    pub fn new(diff_ids: Vec<Digest>) -> ImageConfig {
        ImageConfig {
            os: PLATFORM_OS.to_string(),
            architecture: PLATFORM_ARCH.to_string(),
            rootfs: RootFs {
                fs_type: ROOTFS_TYPE_LAYERS.to_string(),
                diff_ids,
            },
        }
    }

    /// Validates the platform and `rootfs.type` invariants.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.rootfs.fs_type != ROOTFS_TYPE_LAYERS {
            return Err(crate::error::Error::Schema(format!(
                "invalid rootfs type: {}",
                self.rootfs.fs_type
            )));
        }
        Platform {
            os: self.os.clone(),
            architecture: self.architecture.clone(),
        }
        .validate()
    }
}

/// An OCI/Docker image manifest: a config descriptor plus an ordered list of layer descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Always `2`.
    #[serde(rename = "schemaVersion")]
    pub schema_version: u32,
    /// The descriptor of the image config blob.
    pub config: Descriptor,
    /// Layer descriptors, ordered bottom-most first.
    pub layers: Vec<Descriptor>,
}

impl Manifest {
    /// Builds a manifest for the given config and layers (`schemaVersion` fixed to 2).
    pub fn new(config: Descriptor, layers: Vec<Descriptor>) -> Manifest {
        Manifest {
            schema_version: 2,
            config,
            layers,
        }
    }
}

/// The `oci-layout` marker file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageLayout {
    /// The OCI image layout version.
    #[serde(rename = "imageLayoutVersion")]
    pub image_layout_version: String,
}

impl Default for ImageLayout {
    fn default() -> ImageLayout {
        ImageLayout {
            image_layout_version: IMAGE_LAYOUT_VERSION.to_string(),
        }
    }
}

/// The top-level `index.json` of an OCI image layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    /// Always `2`.
    #[serde(rename = "schemaVersion")]
    pub schema_version: u32,
    /// The manifests referenced by this index; this system always writes/expects exactly one.
    pub manifests: Vec<Descriptor>,
}

impl Index {
    /// Builds an index containing exactly one manifest descriptor.
    pub fn new(manifest: Descriptor) -> Index {
        Index {
            schema_version: 2,
            manifests: vec![manifest],
        }
    }
}
