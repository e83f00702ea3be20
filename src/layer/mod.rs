//! Per-layer on-disk state machine and the extraction operation that drives it.
//!
//! Grounded on `original_source/layer/layer.go`'s `Manager`.

pub mod backup_tar;
mod privilege;
pub mod sink;

use std::path::{Path, PathBuf};

use crate::error::Result;
pub use sink::{LayerSink, LayerWriterBackend};

/// The state of a layer directory, derived purely from what's on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// `<home>/<id>` does not exist.
    NotExist,
    /// `<home>/<id>/.complete` is missing or does not contain exactly `id`.
    Incomplete,
    /// `<home>/<id>/.complete` exists and contains exactly `id`.
    Valid,
}

const COMPLETE_FILE: &str = ".complete";
const LAYERCHAIN_FILE: &str = "layerchain.json";

/// Manages layer directories under a single driver home, using `backend` to materialize and
/// destroy their contents.
pub struct Manager<B: LayerWriterBackend> {
    home: PathBuf,
    backend: B,
}

impl<B: LayerWriterBackend> Manager<B> {
    /// Builds a manager rooted at `home`.
    pub fn new(home: impl Into<PathBuf>, backend: B) -> Manager<B> {
        Manager {
            home: home.into(),
            backend,
        }
    }

    /// Reads the current state of layer `id` from disk.
    pub fn state(&self, id: &str) -> State {
        let layer_dir = self.home.join(id);
        if !layer_dir.exists() {
            return State::NotExist;
        }

        match std::fs::read_to_string(layer_dir.join(COMPLETE_FILE)) {
            Ok(contents) if contents == id => State::Valid,
            _ => State::Incomplete,
        }
    }

    /// Fully destroys the on-disk directory for layer `id`.
    pub fn delete(&self, id: &str) -> Result<()> {
        self.backend.destroy_layer(&self.home, id)
    }

    /// Materializes layer `id` from the gzipped backup tar at `layer_blob_path`, chained to
    /// `parent_layer_ids` (top-most-first), and marks it Valid.
    #[tracing::instrument(skip(self), fields(layer_id = %id))]
    pub fn extract(
        &self,
        layer_blob_path: &Path,
        id: &str,
        parent_layer_ids: &[String],
    ) -> Result<()> {
        let layer_path = self.home.join(id);
        std::fs::create_dir_all(&layer_path)?;

        let parent_layer_paths: Vec<PathBuf> =
            parent_layer_ids.iter().map(|p| self.home.join(p)).collect();

        let writer = self
            .backend
            .new_layer_writer(&self.home, id, &parent_layer_paths)
            .map_err(|e| crate::error::Error::LayerWriter {
                context: "Failed to set up new layer writer",
                source: Box::new(e),
            })?;

        backup_tar::write_layer(layer_blob_path, writer)?;

        if !parent_layer_paths.is_empty() {
            let paths: Vec<String> = parent_layer_paths
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect();
            let data = serde_json::to_vec(&paths)?;
            std::fs::write(layer_path.join(LAYERCHAIN_FILE), data)?;
        }

        std::fs::write(layer_path.join(COMPLETE_FILE), id)?;
        Ok(())
    }
}
