//! The Image Extractor: the top-level pipeline that turns a valid OCI image layout into a chain
//! of materialized layer directories.
//!
//! Grounded on `original_source/image/image.go`'s `Manager.Extract` and `cmd/extract/main.go`.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::layer::{LayerWriterBackend, Manager, State};
use crate::oci;

/// Consumes the OCI image layout at `src_dir`, extracting every layer beneath `home` in
/// manifest order, and returns the absolute path of the top layer directory.
#[tracing::instrument(skip(src_dir, home, backend))]
pub async fn run<B: LayerWriterBackend>(
    src_dir: &Path,
    home: &Path,
    backend: B,
) -> Result<PathBuf> {
    let (manifest, config) = oci::read(src_dir).await?;
    let manager = Manager::new(home, backend);

    let mut parent_layer_ids: Vec<String> = Vec::new();

    for (layer_desc, diff_id) in manifest.layers.iter().zip(config.rootfs.diff_ids.iter()) {
        let layer_sha = layer_desc.digest.encoded();
        let blob_path = src_dir.join("blobs").join(crate::digest::SHA256).join(layer_sha);
        let layer_id = diff_id.encoded().to_string();

        match manager.state(&layer_id) {
            State::Incomplete => {
                manager.delete(&layer_id)?;
                extract_one(&manager, &blob_path, &layer_id, &parent_layer_ids)?;
            }
            State::NotExist => {
                extract_one(&manager, &blob_path, &layer_id, &parent_layer_ids)?;
            }
            State::Valid => {
                tracing::info!(layer_id = %layer_id, "layer already exists");
            }
        }

        parent_layer_ids.insert(0, layer_id);
    }

    let top_layer_id = parent_layer_ids
        .first()
        .expect("a valid OCI layout has at least one layer")
        .clone();
    Ok(home.join(top_layer_id))
}

fn extract_one<B: LayerWriterBackend>(
    manager: &Manager<B>,
    blob_path: &Path,
    layer_id: &str,
    parent_layer_ids: &[String],
) -> Result<()> {
    tracing::info!(layer_id, "extracting layer");
    manager.extract(blob_path, layer_id, parent_layer_ids)?;
    tracing::info!(layer_id, "layer extraction done");
    Ok(())
}
