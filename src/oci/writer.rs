//! Writes a complete OCI image layout: `oci-layout`, the config and manifest blobs, and
//! `index.json`. Grounded on `original_source/oci-metadata/writer.go`.
//!
//! Blob encoding must be deterministic — the same `(layers, diff_ids)` input always produces
//! byte-identical blobs, since callers that re-run hydration over an already-populated output
//! directory expect unchanged digests. `serde_json` preserves struct field order, so this falls
//! out of the field ordering declared on the types themselves.

use std::path::Path;

use serde::Serialize;

use crate::digest::Digest;
use crate::error::Result;
use crate::types::{
    Descriptor, ImageConfig, ImageLayout, Index, Manifest, Platform, MEDIA_TYPE_IMAGE_CONFIG,
    MEDIA_TYPE_OCI_MANIFEST,
};

/// Writes a complete OCI image layout rooted at `out_dir`: `oci-layout`, the config and
/// manifest blobs under `blobs/sha256/`, and `index.json`.
#[tracing::instrument(skip(out_dir, layers, diff_ids))]
pub async fn write(out_dir: &Path, layers: Vec<Descriptor>, diff_ids: Vec<Digest>) -> Result<()> {
    write_oci_layout(out_dir).await?;

    let config = ImageConfig::new(diff_ids);
    let mut config_desc = write_blob(out_dir, &config).await?;
    config_desc.media_type = MEDIA_TYPE_IMAGE_CONFIG.to_string();

    let manifest = Manifest::new(config_desc, layers);
    let mut manifest_desc = write_blob(out_dir, &manifest).await?;
    manifest_desc.media_type = MEDIA_TYPE_OCI_MANIFEST.to_string();
    manifest_desc.platform = Some(Platform::windows_amd64());

    write_index(out_dir, manifest_desc).await
}

async fn write_oci_layout(out_dir: &Path) -> Result<()> {
    let data = serde_json::to_vec(&ImageLayout::default())?;
    tokio::fs::write(out_dir.join("oci-layout"), data).await?;
    Ok(())
}

async fn write_blob<T: Serialize>(out_dir: &Path, blob: &T) -> Result<Descriptor> {
    let data = serde_json::to_vec(blob)?;
    let digest = Digest::of(&data);

    let blobs_dir = out_dir.join("blobs").join(crate::digest::SHA256);
    tokio::fs::create_dir_all(&blobs_dir).await?;
    tokio::fs::write(blobs_dir.join(digest.encoded()), &data).await?;

    Ok(Descriptor::new(String::new(), digest, data.len() as u64))
}

async fn write_index(out_dir: &Path, manifest: Descriptor) -> Result<()> {
    let index = Index::new(manifest);
    let data = serde_json::to_vec(&index)?;
    tokio::fs::write(out_dir.join("index.json"), data).await?;
    Ok(())
}
