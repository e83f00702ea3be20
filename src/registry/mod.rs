//! Authenticated registry client for fetching manifests, configs, and layer blobs.
//!
//! Grounded on `original_source/registry/registry.go` for the wire protocol (token endpoint,
//! manifest/blob GETs with bearer auth) and on `microsandbox-core/lib/oci/registry.rs` for the
//! crate idiom: a struct holding a shared `reqwest::Client` plus endpoint configuration, async
//! methods returning `crate::error::Result<T>`, `tracing` spans around network calls.

mod auth;
mod client;
mod endpoints;

pub use client::Client;
pub use endpoints::RegistryEndpoints;
