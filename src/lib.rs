//! Fetches Windows container images from an OCI/Docker registry into an on-disk OCI image
//! layout (hydrate), and unpacks that layout's layers into chained filesystem directories
//! (extract).

pub mod compress;
pub mod digest;
pub mod download;
pub mod error;
pub mod extract;
pub mod hydrate;
pub mod layer;
pub mod oci;
pub mod registry;
pub mod types;
