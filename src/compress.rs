//! Packages an OCI image layout directory into a gzipped tar (`.tgz`).
//!
//! Grounded on `original_source/compress/compress.go`'s `WriteTgz`: entries are walked in
//! filename-sorted order with forward-slash names so the same layout directory always produces
//! a byte-identical archive, regardless of host path separator or directory-listing order.

use std::fs;
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;
use tar::{Builder, Header};

use crate::error::Result;

const MODE_DIR: u32 = 0o755 | 0o040000;
const MODE_REG: u32 = 0o644 | 0o100000;

/// Writes every file under `src_dir` into a gzipped tar at `output_file`, preserving directory
/// structure with forward-slash-separated names.
pub fn write_tgz(src_dir: &Path, output_file: &Path) -> Result<()> {
    let file = fs::File::create(output_file)?;
    let gz = GzEncoder::new(file, Compression::default());
    let mut tar = Builder::new(gz);

    write_dir(src_dir, &mut tar, "")?;

    tar.into_inner()?.finish()?;
    Ok(())
}

/// Unpacks a gzipped tar at `src_file` into `dest_dir`, creating it if necessary. The inverse of
/// [`write_tgz`], used to stage a downloaded rootfs tarball before reading it as an OCI layout.
pub fn extract_tgz(src_file: &Path, dest_dir: &Path) -> Result<()> {
    fs::create_dir_all(dest_dir)?;
    let file = fs::File::open(src_file)?;
    let gz = flate2::read::GzDecoder::new(file);
    let mut archive = tar::Archive::new(gz);
    archive.unpack(dest_dir)?;
    Ok(())
}

fn write_dir(dir: &Path, tar: &mut Builder<GzEncoder<fs::File>>, prefix: &str) -> Result<()> {
    let mut entries: Vec<_> = fs::read_dir(dir)?.collect::<std::io::Result<_>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let file_name = entry.file_name();
        let name = file_name.to_string_lossy();
        let source = dir.join(&file_name);
        let metadata = entry.metadata()?;
        let archive_name = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}/{name}")
        };

        if metadata.is_dir() {
            let mut header = Header::new_gnu();
            header.set_mode(MODE_DIR);
            header.set_size(0);
            header.set_entry_type(tar::EntryType::Directory);
            header.set_cksum();
            tar.append_data(&mut header, format!("{archive_name}/"), std::io::empty())?;

            write_dir(&source, tar, &archive_name)?;
        } else {
            let mut header = Header::new_gnu();
            header.set_mode(MODE_REG);
            header.set_size(metadata.len());
            header.set_entry_type(tar::EntryType::Regular);
            header.set_cksum();
            let mut f = fs::File::open(&source)?;
            tar.append_data(&mut header, &archive_name, &mut f)?;
        }
    }

    Ok(())
}
