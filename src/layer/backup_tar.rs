//! Replays a gzipped Windows backup tar stream through a [`LayerSink`].
//!
//! Grounded on `original_source/writer/writer.go`'s `WriteLayer`: read tar headers in order,
//! recognize whiteouts and hard links by name/type, and for everything else derive file metadata
//! and stream the body through the sink.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use typed_path::Utf8UnixPath;

use crate::error::{Error, Result};
use crate::layer::privilege;
use crate::layer::sink::{FileBasicInfo, LayerSink, FILE_ATTRIBUTE_DIRECTORY, FILE_ATTRIBUTE_NORMAL};

const WHITEOUT_PREFIX: &str = ".wh.";

/// Decompresses and replays `layer_gzip_file` through `sink`, then closes it.
#[tracing::instrument(skip(sink), fields(layer = %layer_gzip_file.display()))]
pub fn write_layer(layer_gzip_file: &Path, mut sink: Box<dyn LayerSink>) -> Result<()> {
    let _guard = privilege::enable_backup_restore()?;

    let file = File::open(layer_gzip_file)?;
    let gz = flate2::read::GzDecoder::new(file);
    let mut archive = tar::Archive::new(gz);

    for entry in archive.entries()? {
        let mut entry = entry?;
        let name = entry
            .path()?
            .to_str()
            .ok_or_else(|| Error::BackupTar("non-UTF8 tar entry name".to_string()))?
            .to_string();

        let base = name.rsplit('/').next().unwrap_or(&name).to_string();

        if let Some(stripped) = base.strip_prefix(WHITEOUT_PREFIX) {
            let dir = name
                .rsplit_once('/')
                .map(|(dir, _)| dir)
                .unwrap_or("");
            let target = if dir.is_empty() {
                stripped.to_string()
            } else {
                format!("{dir}/{stripped}")
            };
            sink.remove(&to_native(&target))
                .map_err(|e| Error::BackupTar(format!("Failed to remove: {e}")))?;
            continue;
        }

        if entry.header().entry_type() == tar::EntryType::Link {
            let linkname = entry
                .link_name()?
                .ok_or_else(|| Error::BackupTar("hardlink entry missing linkname".to_string()))?
                .to_str()
                .ok_or_else(|| Error::BackupTar("non-UTF8 link name".to_string()))?
                .to_string();
            sink.add_link(&to_native(&name), &to_native(&linkname))
                .map_err(|e| Error::BackupTar(format!("Failed to add link: {e}")))?;
            continue;
        }

        let is_dir = entry.header().entry_type() == tar::EntryType::Directory;
        let attributes = if is_dir {
            FILE_ATTRIBUTE_DIRECTORY
        } else {
            FILE_ATTRIBUTE_NORMAL
        };
        let mtime = entry.header().mtime().unwrap_or(0);
        let info = FileBasicInfo::from_mtime_and_attributes(mtime, attributes);

        sink.add(&to_native(&name), &info)
            .map_err(|e| Error::BackupTar(format!("Failed to get file info: {e}")))?;

        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = entry
                .read(&mut buf)
                .map_err(|e| Error::BackupTar(format!("Failed to add layer: {e}")))?;
            if n == 0 {
                break;
            }
            sink.write(&buf[..n])
                .map_err(|e| Error::BackupTar(format!("Failed to add layer: {e}")))?;
        }
    }

    sink.close()
}

/// Translates a forward-slash tar entry name into a Windows-separated path string.
fn to_native(name: &str) -> String {
    Utf8UnixPath::new(name).with_windows_encoding().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingSink {
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingSink {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl LayerSink for RecordingSink {
        fn add(&mut self, name: &str, _info: &FileBasicInfo) -> Result<()> {
            self.calls.lock().unwrap().push(format!("add {name}"));
            Ok(())
        }
        fn add_link(&mut self, name: &str, linkname: &str) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("add_link {name} {linkname}"));
            Ok(())
        }
        fn remove(&mut self, name: &str) -> Result<()> {
            self.calls.lock().unwrap().push(format!("remove {name}"));
            Ok(())
        }
        fn write(&mut self, bytes: &[u8]) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("write {}", bytes.len()));
            Ok(())
        }
        fn close(self: Box<Self>) -> Result<()> {
            Ok(())
        }
    }

    fn build_gzip_tar(entries: impl FnOnce(&mut tar::Builder<Vec<u8>>)) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        entries(&mut builder);
        let tar_bytes = builder.into_inner().unwrap();

        let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(&tar_bytes).unwrap();
        encoder.finish().unwrap()
    }

    fn write_to_temp(bytes: &[u8]) -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), bytes).unwrap();
        file
    }

    #[test]
    fn whiteout_translates_to_a_single_remove_call() {
        let gz = build_gzip_tar(|builder| {
            let mut header = tar::Header::new_gnu();
            header.set_size(0);
            header.set_entry_type(tar::EntryType::Regular);
            header.set_cksum();
            builder
                .append_data(&mut header, "foo/.wh.bar", std::io::empty())
                .unwrap();
        });
        let file = write_to_temp(&gz);

        let sink = RecordingSink::default();
        write_layer(file.path(), Box::new(sink.clone())).unwrap();
        assert_eq!(sink.calls(), vec!["remove foo\\bar"]);
    }

    #[test]
    fn hardlink_translates_to_add_link() {
        let gz = build_gzip_tar(|builder| {
            let mut header = tar::Header::new_gnu();
            header.set_size(0);
            header.set_entry_type(tar::EntryType::Link);
            header.set_link_name("b").unwrap();
            header.set_cksum();
            builder
                .append_data(&mut header, "a", std::io::empty())
                .unwrap();
        });
        let file = write_to_temp(&gz);

        let sink = RecordingSink::default();
        write_layer(file.path(), Box::new(sink.clone())).unwrap();
        assert_eq!(sink.calls(), vec!["add_link a b"]);
    }

    #[test]
    fn regular_file_streams_add_then_write() {
        let gz = build_gzip_tar(|builder| {
            let mut header = tar::Header::new_gnu();
            header.set_size(5);
            header.set_entry_type(tar::EntryType::Regular);
            header.set_cksum();
            builder.append_data(&mut header, "file.txt", &b"hello"[..]).unwrap();
        });
        let file = write_to_temp(&gz);

        let sink = RecordingSink::default();
        write_layer(file.path(), Box::new(sink.clone())).unwrap();
        assert_eq!(sink.calls(), vec!["add file.txt", "write 5"]);
    }
}
