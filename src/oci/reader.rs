//! Reads and strictly validates an on-disk OCI image layout.
//!
//! Grounded on `original_source/oci-metadata/reader.go`'s `Read`: load `index.json`, then the
//! manifest blob it points to, then the config blob the manifest points to, checking media
//! types, digests, and platform at every step rather than trusting the files as given.

use std::path::Path;

use serde::de::DeserializeOwned;

use crate::digest::Digest;
use crate::error::{Error, Result};
use crate::types::{
    Descriptor, ImageConfig, Manifest, MEDIA_TYPE_IMAGE_CONFIG, MEDIA_TYPE_OCI_LAYER,
    MEDIA_TYPE_OCI_MANIFEST,
};

/// Reads and validates the manifest and config at `src_dir`, checking that every layer/config
/// media type, digest, and platform matches what this system expects.
#[tracing::instrument(skip(src_dir))]
pub async fn read(src_dir: &Path) -> Result<(Manifest, ImageConfig)> {
    let manifest_desc = load_index(src_dir).await?;
    let manifest = load_manifest(src_dir, &manifest_desc).await?;
    let config = load_config(src_dir, &manifest.config).await?;

    if manifest.layers.len() != config.rootfs.diff_ids.len() {
        return Err(Error::Schema(format!(
            "manifest + config mismatch: {} layers, {} diffIds",
            manifest.layers.len(),
            config.rootfs.diff_ids.len()
        )));
    }

    Ok((manifest, config))
}

async fn load_index(src_dir: &Path) -> Result<Descriptor> {
    let index: crate::types::Index = load_json(&src_dir.join("index.json")).await?;

    if index.manifests.len() != 1 {
        return Err(Error::Schema(format!(
            "invalid # of manifests: expected 1, found {}",
            index.manifests.len()
        )));
    }

    let manifest_desc = index.manifests.into_iter().next().unwrap();
    if manifest_desc.media_type != MEDIA_TYPE_OCI_MANIFEST {
        return Err(Error::InvalidMediaType(manifest_desc.media_type));
    }

    if let Some(platform) = &manifest_desc.platform {
        platform.validate()?;
    }

    Ok(manifest_desc)
}

async fn load_manifest(src_dir: &Path, desc: &Descriptor) -> Result<Manifest> {
    let manifest: Manifest = load_descriptor(src_dir, desc).await?;

    if manifest.config.media_type != MEDIA_TYPE_IMAGE_CONFIG {
        return Err(Error::InvalidMediaType(manifest.config.media_type.clone()));
    }

    for layer in &manifest.layers {
        if layer.media_type != MEDIA_TYPE_OCI_LAYER {
            return Err(Error::InvalidMediaType(layer.media_type.clone()));
        }
        validate_blob_sha(src_dir, &layer.digest).await?;
    }

    Ok(manifest)
}

async fn load_config(src_dir: &Path, desc: &Descriptor) -> Result<ImageConfig> {
    let config: ImageConfig = load_descriptor(src_dir, desc).await?;
    config.validate()?;
    Ok(config)
}

/// Reads a blob referenced by `desc`, verifying its contents hash to `desc.digest` before
/// parsing it, mirroring `reader.go`'s `loadDescriptor`.
async fn load_descriptor<T: DeserializeOwned>(src_dir: &Path, desc: &Descriptor) -> Result<T> {
    let blob_path = src_dir
        .join("blobs")
        .join(crate::digest::SHA256)
        .join(desc.digest.encoded());
    let contents = tokio::fs::read(&blob_path).await?;
    desc.digest.verify(&contents)?;
    Ok(serde_json::from_slice(&contents)?)
}

async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&contents)?)
}

async fn validate_blob_sha(src_dir: &Path, digest: &Digest) -> Result<()> {
    let blob_path = src_dir
        .join("blobs")
        .join(crate::digest::SHA256)
        .join(digest.encoded());
    let contents = tokio::fs::read(&blob_path).await?;
    digest.verify(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oci::write;

    #[tokio::test]
    async fn rejects_tampered_layer_blob() {
        let dir = tempfile::tempdir().unwrap();
        let layer_digest = Digest::of(b"original layer contents");
        write(
            dir.path(),
            vec![Descriptor::new(MEDIA_TYPE_OCI_LAYER, layer_digest.clone(), 24)],
            vec![layer_digest.clone()],
        )
        .await
        .unwrap();

        tokio::fs::write(
            dir.path()
                .join("blobs")
                .join("sha256")
                .join(layer_digest.encoded()),
            b"tampered contents",
        )
        .await
        .unwrap();

        let err = read(dir.path()).await.unwrap_err();
        assert!(matches!(err, Error::ShaMismatch { .. }));
    }

    #[tokio::test]
    async fn rejects_missing_manifest_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read(dir.path()).await.unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[tokio::test]
    async fn rejects_tampered_manifest_blob() {
        let dir = tempfile::tempdir().unwrap();
        let layer_digest = Digest::of(b"layer contents");
        write(
            dir.path(),
            vec![Descriptor::new(MEDIA_TYPE_OCI_LAYER, layer_digest.clone(), 14)],
            vec![layer_digest.clone()],
        )
        .await
        .unwrap();
        tokio::fs::write(
            dir.path().join("blobs").join("sha256").join(layer_digest.encoded()),
            b"layer contents",
        )
        .await
        .unwrap();

        let index: crate::types::Index =
            load_json(&dir.path().join("index.json")).await.unwrap();
        let manifest_digest = index.manifests[0].digest.encoded().to_string();
        tokio::fs::write(
            dir.path().join("blobs").join("sha256").join(manifest_digest),
            b"tampered manifest",
        )
        .await
        .unwrap();

        let err = read(dir.path()).await.unwrap_err();
        assert!(matches!(err, Error::ShaMismatch { .. }));
    }

    #[tokio::test]
    async fn rejects_tampered_config_blob() {
        let dir = tempfile::tempdir().unwrap();
        let layer_digest = Digest::of(b"layer contents");
        write(
            dir.path(),
            vec![Descriptor::new(MEDIA_TYPE_OCI_LAYER, layer_digest.clone(), 14)],
            vec![layer_digest.clone()],
        )
        .await
        .unwrap();
        tokio::fs::write(
            dir.path().join("blobs").join("sha256").join(layer_digest.encoded()),
            b"layer contents",
        )
        .await
        .unwrap();

        let index: crate::types::Index =
            load_json(&dir.path().join("index.json")).await.unwrap();
        let manifest: Manifest = load_descriptor(dir.path(), &index.manifests[0])
            .await
            .unwrap();
        tokio::fs::write(
            dir.path()
                .join("blobs")
                .join("sha256")
                .join(manifest.config.digest.encoded()),
            b"tampered config",
        )
        .await
        .unwrap();

        let err = read(dir.path()).await.unwrap_err();
        assert!(matches!(err, Error::ShaMismatch { .. }));
    }
}
