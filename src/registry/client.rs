//! The Registry Client: an authenticated fetcher for a single `{image, ref}` target.
//!
//! Grounded on `original_source/registry/registry.go`. Each public method performs exactly one
//! registry interaction and leaves any on-disk side effects to its caller (the Downloader).

use std::path::Path;

use tokio::io::AsyncWriteExt;

use crate::digest::Digest;
use crate::error::{Error, Result};
use crate::registry::auth::fetch_token;
use crate::registry::endpoints::RegistryEndpoints;
use crate::types::{
    Descriptor, ImageConfig, Manifest, MEDIA_TYPE_DIFF_LAYER, MEDIA_TYPE_FOREIGN_LAYER,
    MEDIA_TYPE_IMAGE_CONFIG, MEDIA_TYPE_MANIFEST_V2, MEDIA_TYPE_MANIFEST_V2_LIST,
};

/// Authenticated client for a single `{image, ref}` registry target.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    endpoints: RegistryEndpoints,
    image_name: String,
    image_ref: String,
}

impl Client {
    /// Builds a client for `image_name` (a `namespace/repo` string) at `image_ref` (a tag or
    /// digest), talking to `endpoints`.
    pub fn new(
        endpoints: RegistryEndpoints,
        image_name: impl Into<String>,
        image_ref: impl Into<String>,
    ) -> Client {
        Client {
            http: reqwest::Client::new(),
            endpoints,
            image_name: image_name.into(),
            image_ref: image_ref.into(),
        }
    }

    async fn token(&self) -> Result<String> {
        fetch_token(&self.http, &self.endpoints.auth_server_url, &self.image_name).await
    }

    /// Fetches and parses the image manifest. No on-disk side effect.
    #[tracing::instrument(skip(self), fields(image = %self.image_name, reference = %self.image_ref))]
    pub async fn manifest(&self) -> Result<Manifest> {
        let token = self.token().await?;
        let url = format!(
            "{}/v2/{}/manifests/{}",
            self.endpoints.registry_server_url, self.image_name, self.image_ref
        );

        let response = self
            .http
            .get(&url)
            .bearer_auth(&token)
            .header(reqwest::header::ACCEPT, MEDIA_TYPE_MANIFEST_V2)
            .header(reqwest::header::ACCEPT, MEDIA_TYPE_MANIFEST_V2_LIST)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpNotOk {
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await?;
        let manifest: Manifest = serde_json::from_slice(&bytes)?;
        Ok(manifest)
    }

    /// Fetches the image config blob referenced by `desc`, verifying its digest.
    #[tracing::instrument(skip(self, desc), fields(digest = %desc.digest))]
    pub async fn config(&self, desc: &Descriptor) -> Result<ImageConfig> {
        if desc.media_type != MEDIA_TYPE_IMAGE_CONFIG {
            return Err(Error::InvalidMediaType(desc.media_type.clone()));
        }

        let bytes = self.fetch_blob(&desc.digest).await?;
        desc.digest.verify(&bytes)?;

        let config: ImageConfig = serde_json::from_slice(&bytes)?;
        Ok(config)
    }

    /// Downloads a layer blob into `output_dir/<encoded-digest>`, dispatching on media type, then
    /// verifies its digest. Any error is wrapped as [`Error::Download`].
    #[tracing::instrument(skip(self, desc, output_dir), fields(digest = %desc.digest))]
    pub async fn download_layer(&self, desc: &Descriptor, output_dir: &Path) -> Result<()> {
        self.try_download_layer(desc, output_dir)
            .await
            .map_err(|e| e.into_download(desc.digest.encoded().to_string()))
    }

    async fn try_download_layer(&self, desc: &Descriptor, output_dir: &Path) -> Result<()> {
        let url = match desc.media_type.as_str() {
            MEDIA_TYPE_DIFF_LAYER => {
                format!(
                    "{}/v2/{}/blobs/{}",
                    self.endpoints.registry_server_url, self.image_name, desc.digest
                )
            }
            MEDIA_TYPE_FOREIGN_LAYER => desc
                .urls
                .first()
                .ok_or_else(|| Error::InvalidMediaType(desc.media_type.clone()))?
                .clone(),
            other => return Err(Error::InvalidMediaType(other.to_string())),
        };

        let mut response = self.authed_get(&url).await?;

        let output_path = output_dir.join(desc.digest.encoded());
        let mut file = tokio::fs::File::create(&output_path).await?;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        drop(file);

        let bytes = tokio::fs::read(&output_path).await?;
        desc.digest.verify(&bytes)?;

        Ok(())
    }

    async fn authed_get(&self, url: &str) -> Result<reqwest::Response> {
        let token = self.token().await?;
        let response = self.http.get(url).bearer_auth(&token).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpNotOk {
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn fetch_blob(&self, digest: &Digest) -> Result<bytes::Bytes> {
        let url = format!(
            "{}/v2/{}/blobs/{}",
            self.endpoints.registry_server_url, self.image_name, digest
        );
        let response = self.authed_get(&url).await?;
        Ok(response.bytes().await?)
    }
}
