//! The boundary between this crate and the platform-specific layer-writer backend.
//!
//! The real backend (HCS's layer writer on Windows) is out of scope; it is expressed here as a
//! trait so the rest of the pipeline can be exercised against an in-memory or filesystem fake.
//! Grounded on `original_source/writer/writer.go`'s `Writer` interface (`Add`, `AddLink`,
//! `Remove`, io.Writer, `Close`) and `layer/layer.go`'s `Writer` interface
//! (`WriteLayer`/`SetHCSLayerWriter`).

use std::path::{Path, PathBuf};

use crate::error::Result;

/// NTFS file timestamps and attributes carried alongside a tar entry, as produced by the
/// Windows backup-tar helper (`backuptar.FileInfoFromHeader`).
/// Timestamps are Windows FILETIME values: 100-nanosecond intervals since 1601-01-01 UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileBasicInfo {
    pub creation_time: u64,
    pub last_access_time: u64,
    pub last_write_time: u64,
    pub change_time: u64,
    pub file_attributes: u32,
}

const UNIX_EPOCH_AS_FILETIME: u64 = 116_444_736_000_000_000;

impl FileBasicInfo {
    /// Converts a tar header's modification time (Unix seconds) into FILETIME ticks, used for
    /// all four timestamp fields when a tar header carries only a single mtime.
    pub fn from_mtime_and_attributes(mtime_secs: u64, file_attributes: u32) -> FileBasicInfo {
        let filetime = UNIX_EPOCH_AS_FILETIME + mtime_secs.saturating_mul(10_000_000);
        FileBasicInfo {
            creation_time: filetime,
            last_access_time: filetime,
            last_write_time: filetime,
            change_time: filetime,
            file_attributes,
        }
    }
}

/// Windows file attribute bits this crate derives from a tar entry's type.
pub const FILE_ATTRIBUTE_DIRECTORY: u32 = 0x10;
pub const FILE_ATTRIBUTE_NORMAL: u32 = 0x80;

/// A single layer's write session: begin a file, stream its body, or record a link/removal.
pub trait LayerSink {
    /// Begins a new file entry at `name` with the given NTFS metadata. Subsequent [`write`]
    /// calls append to this file's backup stream until the next `add`/`add_link`/`remove`.
    ///
    /// [`write`]: LayerSink::write
    fn add(&mut self, name: &str, info: &FileBasicInfo) -> Result<()>;

    /// Records a hard link from `name` to the already-written `linkname`.
    fn add_link(&mut self, name: &str, linkname: &str) -> Result<()>;

    /// Records a whiteout: `name` is removed from the merged view.
    fn remove(&mut self, name: &str) -> Result<()>;

    /// Appends `bytes` to the backup stream of the file most recently opened via [`add`].
    ///
    /// [`add`]: LayerSink::add
    fn write(&mut self, bytes: &[u8]) -> Result<()>;

    /// Finalizes the layer. Called exactly once, after the last tar entry.
    fn close(self: Box<Self>) -> Result<()>;
}

/// Creates and destroys [`LayerSink`]s for a layer directory.
pub trait LayerWriterBackend {
    /// Opens a new sink for `layer_id` under `home`, chained to `parent_layer_paths`
    /// (top-most-first).
    fn new_layer_writer(
        &self,
        home: &Path,
        layer_id: &str,
        parent_layer_paths: &[PathBuf],
    ) -> Result<Box<dyn LayerSink>>;

    /// Fully destroys the on-disk layer directory for `layer_id` under `home`.
    fn destroy_layer(&self, home: &Path, layer_id: &str) -> Result<()>;
}

/// A [`LayerWriterBackend`] that materializes a real `Files/` tree on disk, standing in for the
/// HCS layer writer in tests. Hard links and whiteouts are applied directly against that tree;
/// NTFS metadata is recorded but not actually set as filesystem attributes, since the host
/// running these tests is not necessarily Windows.
pub struct FsLayerWriterBackend;

impl LayerWriterBackend for FsLayerWriterBackend {
    fn new_layer_writer(
        &self,
        home: &Path,
        layer_id: &str,
        parent_layer_paths: &[PathBuf],
    ) -> Result<Box<dyn LayerSink>> {
        let files_dir = home.join(layer_id).join("Files");
        std::fs::create_dir_all(&files_dir)?;
        Ok(Box::new(FsLayerSink {
            files_dir,
            parent_layer_paths: parent_layer_paths.to_vec(),
            current_file: None,
        }))
    }

    fn destroy_layer(&self, home: &Path, layer_id: &str) -> Result<()> {
        let layer_dir = home.join(layer_id);
        if layer_dir.exists() {
            std::fs::remove_dir_all(layer_dir)?;
        }
        Ok(())
    }
}

struct FsLayerSink {
    files_dir: PathBuf,
    #[allow(dead_code)]
    parent_layer_paths: Vec<PathBuf>,
    current_file: Option<std::fs::File>,
}

impl FsLayerSink {
    fn resolve(&self, name: &str) -> PathBuf {
        let relative = name.replace('\\', "/");
        self.files_dir.join(relative.trim_start_matches('/'))
    }
}

impl LayerSink for FsLayerSink {
    fn add(&mut self, name: &str, info: &FileBasicInfo) -> Result<()> {
        let path = self.resolve(name);
        if info.file_attributes & FILE_ATTRIBUTE_DIRECTORY != 0 {
            std::fs::create_dir_all(&path)?;
            self.current_file = None;
        } else {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            self.current_file = Some(std::fs::File::create(&path)?);
        }
        Ok(())
    }

    fn add_link(&mut self, name: &str, linkname: &str) -> Result<()> {
        let target = self.resolve(linkname);
        let link = self.resolve(name);
        if let Some(parent) = link.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::hard_link(target, link)?;
        Ok(())
    }

    fn remove(&mut self, name: &str) -> Result<()> {
        let path = self.resolve(name);
        if path.is_dir() {
            std::fs::remove_dir_all(path)?;
        } else if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if let Some(file) = self.current_file.as_mut() {
            use std::io::Write as _;
            file.write_all(bytes)?;
        }
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
