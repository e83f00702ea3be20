//! The Hydrator: the top-level fetch pipeline tying the registry client, downloader, and OCI
//! metadata writer together into "pull this image to disk".
//!
//! Grounded on `original_source/hydrator/hydrator.go` and `cmd/hydrate/main.go` for the pipeline
//! shape and CLI-facing validation.

use std::path::{Path, PathBuf};

use crate::download;
use crate::error::{Error, Result};
use crate::oci;
use crate::registry::{Client, RegistryEndpoints};

/// Inputs to a single hydrate run.
pub struct Config {
    /// Directory the tgz (or, with `no_tarball`, the OCI layout itself) is written into.
    pub output_dir: PathBuf,
    /// The image's `namespace/repo` name.
    pub image_name: String,
    /// The image tag to pull. Defaults to `latest`.
    pub image_tag: String,
    /// When true, write the OCI layout directly into `output_dir` and skip tgz packaging.
    pub no_tarball: bool,
    /// Registry/auth server endpoints to talk to.
    pub endpoints: RegistryEndpoints,
}

/// Runs the full hydrate pipeline, returning the path of the artifact left in `output_dir` (the
/// tgz file, or the OCI layout directory itself when `no_tarball` is set).
#[tracing::instrument(skip(config), fields(image = %config.image_name, tag = %config.image_tag))]
pub async fn run(config: Config) -> Result<PathBuf> {
    let repo = validate_image_name(&config.image_name)?;

    tokio::fs::create_dir_all(&config.output_dir).await?;

    let scratch = if config.no_tarball {
        None
    } else {
        Some(tempfile::tempdir()?)
    };
    let work_dir: &Path = match &scratch {
        Some(dir) => dir.path(),
        None => &config.output_dir,
    };

    let blobs_dir = work_dir.join("blobs").join(crate::digest::SHA256);
    tokio::fs::create_dir_all(&blobs_dir).await?;

    let client = Client::new(
        config.endpoints.clone(),
        config.image_name.clone(),
        config.image_tag.clone(),
    );

    tracing::info!("downloading layers");
    let downloaded = download::run(&client, &blobs_dir).await?;

    tracing::info!("writing OCI metadata");
    oci::write(work_dir, downloaded.layers, downloaded.diff_ids).await?;

    if config.no_tarball {
        return Ok(config.output_dir);
    }

    let tgz_name = format!("{repo}-{}.tgz", config.image_tag);
    let tgz_path = config.output_dir.join(tgz_name);
    let work_dir = work_dir.to_path_buf();
    let write_path = tgz_path.clone();
    tracing::info!(tgz = %tgz_path.display(), "packaging tgz");
    tokio::task::spawn_blocking(move || crate::compress::write_tgz(&work_dir, &write_path))
        .await
        .expect("tgz packaging task panicked")?;

    Ok(tgz_path)
}

/// Validates that `image_name` splits into exactly two `/`-separated, non-empty components,
/// returning the `repo` half used to name the output tgz.
fn validate_image_name(image_name: &str) -> Result<&str> {
    if image_name.is_empty() {
        return Err(Error::InvalidArgument("No image name provided".to_string()));
    }

    let mut parts = image_name.split('/');
    let (namespace, repo, rest) = (parts.next(), parts.next(), parts.next());
    match (namespace, repo, rest) {
        (Some(namespace), Some(repo), None) if !namespace.is_empty() && !repo.is_empty() => {
            Ok(repo)
        }
        _ => Err(Error::InvalidArgument(format!(
            "invalid image name: {image_name}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MEDIA_TYPE_DIFF_LAYER, MEDIA_TYPE_IMAGE_CONFIG};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn validates_two_part_image_names() {
        assert_eq!(validate_image_name("library/nginx").unwrap(), "nginx");
        assert!(validate_image_name("").is_err());
        assert!(validate_image_name("nginx").is_err());
        assert!(validate_image_name("a/b/c").is_err());
        assert!(validate_image_name("/nginx").is_err());
    }

    async fn mock_registry(image: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"token": "t"})))
            .mount(&server)
            .await;

        let body = b"layer contents".to_vec();
        let layer_digest = crate::digest::Digest::of(&body);
        let config_body = serde_json::to_vec(&serde_json::json!({
            "os": "windows",
            "architecture": "amd64",
            "rootfs": {"type": "layers", "diff_ids": [layer_digest.to_string()]}
        }))
        .unwrap();
        let config_digest = crate::digest::Digest::of(&config_body);
        let manifest_body = serde_json::to_vec(&serde_json::json!({
            "schemaVersion": 2,
            "config": {"mediaType": MEDIA_TYPE_IMAGE_CONFIG, "digest": config_digest.to_string(), "size": config_body.len()},
            "layers": [{"mediaType": MEDIA_TYPE_DIFF_LAYER, "digest": layer_digest.to_string(), "size": body.len()}]
        }))
        .unwrap();

        Mock::given(method("GET"))
            .and(path(format!("/v2/{image}/manifests/latest")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(manifest_body))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/v2/{image}/blobs/{config_digest}")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(config_body))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/v2/{image}/blobs/{layer_digest}")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
            .mount(&server)
            .await;

        server
    }

    #[tokio::test]
    async fn hydrates_into_a_tgz_by_default() {
        let server = mock_registry("library/nginx").await;
        let out_dir = tempfile::tempdir().unwrap();

        let tgz_path = run(Config {
            output_dir: out_dir.path().to_path_buf(),
            image_name: "library/nginx".to_string(),
            image_tag: "latest".to_string(),
            no_tarball: false,
            endpoints: RegistryEndpoints {
                auth_server_url: server.uri(),
                registry_server_url: server.uri(),
            },
        })
        .await
        .unwrap();

        assert_eq!(tgz_path, out_dir.path().join("nginx-latest.tgz"));
        assert!(tgz_path.exists());
    }

    #[tokio::test]
    async fn no_tarball_leaves_a_bare_oci_layout() {
        let server = mock_registry("library/nginx").await;
        let out_dir = tempfile::tempdir().unwrap();

        let result_dir = run(Config {
            output_dir: out_dir.path().to_path_buf(),
            image_name: "library/nginx".to_string(),
            image_tag: "latest".to_string(),
            no_tarball: true,
            endpoints: RegistryEndpoints {
                auth_server_url: server.uri(),
                registry_server_url: server.uri(),
            },
        })
        .await
        .unwrap();

        assert_eq!(result_dir, out_dir.path());
        assert!(out_dir.path().join("oci-layout").exists());
        assert!(out_dir.path().join("index.json").exists());
    }
}
