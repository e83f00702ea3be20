//! The Downloader: fetches a manifest and config, cross-validates them, and pulls every layer
//! blob down in parallel.
//!
//! Grounded on `original_source/downloader/downloader.go`'s `Run`: a wait-group of per-layer
//! goroutines racing a one-slot error channel. Rust's equivalent is a [`tokio::task::JoinSet`]
//! racing a `tokio::sync::mpsc::channel(1)` — the first task to fail wins and every other task is
//! aborted when the `JoinSet` is dropped.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::digest::Digest;
use crate::error::{Error, Result};
use crate::registry::Client;
use crate::types::{Descriptor, MEDIA_TYPE_OCI_LAYER, PLATFORM_ARCH, PLATFORM_OS};

/// The result of a successful download run: every layer blob now sits in the download
/// directory, retagged to [`MEDIA_TYPE_OCI_LAYER`], paired with its uncompressed diff id in the
/// same order as the manifest.
#[derive(Debug)]
pub struct Downloaded {
    /// Layer descriptors, retagged to the OCI layout's layer media type, in manifest order.
    pub layers: Vec<Descriptor>,
    /// Each layer's uncompressed content digest, in the same order as `layers`.
    pub diff_ids: Vec<Digest>,
}

/// Fetches the manifest and config from `client`, validates them against each other, and
/// downloads every layer blob into `download_dir`.
#[tracing::instrument(skip(client, download_dir))]
pub async fn run(client: &Client, download_dir: &Path) -> Result<Downloaded> {
    let manifest = client.manifest().await?;
    let config = client.config(&manifest.config).await?;

    if config.os != PLATFORM_OS {
        return Err(Error::Schema(format!("invalid container OS: {}", config.os)));
    }
    if config.architecture != PLATFORM_ARCH {
        return Err(Error::Schema(format!(
            "invalid container arch: {}",
            config.architecture
        )));
    }

    let total_layers = manifest.layers.len();
    let diff_ids = config.rootfs.diff_ids;
    if total_layers != diff_ids.len() {
        return Err(Error::Schema(format!(
            "mismatch: {} layers, {} diffIds",
            total_layers,
            diff_ids.len()
        )));
    }

    tracing::info!(total_layers, "downloading layers");

    let (error_tx, mut error_rx) = mpsc::channel::<Error>(1);
    let mut tasks = tokio::task::JoinSet::new();
    let client = Arc::new(client.clone());
    let download_dir: Arc<PathBuf> = Arc::new(download_dir.to_path_buf());

    let mut downloaded_layers = Vec::with_capacity(total_layers);
    for layer in &manifest.layers {
        let oci_layer = Descriptor::new(MEDIA_TYPE_OCI_LAYER, layer.digest.clone(), layer.size);
        downloaded_layers.push(oci_layer);

        let client = Arc::clone(&client);
        let download_dir = Arc::clone(&download_dir);
        let error_tx = error_tx.clone();
        let layer = layer.clone();
        tasks.spawn(async move {
            tracing::debug!(digest = %layer.digest, "layer download begin");
            if let Err(err) = client.download_layer(&layer, &download_dir).await {
                let _ = error_tx.send(err).await;
                return;
            }
            tracing::debug!(digest = %layer.digest, "layer download end");
        });
    }
    drop(error_tx);

    tokio::select! {
        biased;
        Some(err) = error_rx.recv() => {
            tasks.abort_all();
            return Err(err);
        }
        _ = join_all(&mut tasks) => {}
    }

    // A failing task sends its error before returning, so if one raced past the select above
    // (all tasks already joined in the same poll) the error is still sitting in the channel.
    if let Ok(err) = error_rx.try_recv() {
        return Err(err);
    }

    Ok(Downloaded {
        layers: downloaded_layers,
        diff_ids,
    })
}

async fn join_all(tasks: &mut tokio::task::JoinSet<()>) {
    while tasks.join_next().await.is_some() {}
}
