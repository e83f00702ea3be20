//! Reading and writing the on-disk OCI image layout: `oci-layout`, `index.json`, and
//! content-addressed blobs under `blobs/sha256/`.

mod reader;
mod writer;

pub use reader::read;
pub use writer::write;
