//! Bearer token acquisition.
//!
//! Grounded on `original_source/registry/registry.go::getToken`: a per-call, unauthenticated GET
//! to `{auth}/token?service=registry.docker.io&scope=repository:{image}:pull` returning `{
//! "token": "..." }`.

use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

/// Fetches a bearer token scoped to pulling `image_name` from `auth_server_url`.
pub(super) async fn fetch_token(
    http: &reqwest::Client,
    auth_server_url: &str,
    image_name: &str,
) -> Result<String> {
    let url = format!(
        "{auth_server_url}/token?service=registry.docker.io&scope=repository:{image_name}:pull"
    );

    tracing::debug!(%url, "fetching registry bearer token");

    let response = http.get(&url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(Error::HttpNotOk {
            status: status.as_u16(),
        });
    }

    let token: TokenResponse = response.json().await?;
    Ok(token.token)
}
