//! Registry/auth server endpoint configuration.
//!
//! Spec §6: "registry endpoints are compile-time constants ... but MUST be overrideable for
//! testing." Grounded on `microsandbox-utils/lib/env.rs`'s pattern of a default constant with an
//! environment-variable override.

/// Default Docker Hub auth server.
pub const DEFAULT_AUTH_SERVER_URL: &str = "https://auth.docker.io";
/// Default Docker Hub registry server.
pub const DEFAULT_REGISTRY_SERVER_URL: &str = "https://registry.hub.docker.com";

/// Environment variable overriding [`DEFAULT_AUTH_SERVER_URL`].
pub const OCIWIN_AUTH_SERVER_ENV_VAR: &str = "OCIWIN_AUTH_SERVER_URL";
/// Environment variable overriding [`DEFAULT_REGISTRY_SERVER_URL`].
pub const OCIWIN_REGISTRY_SERVER_ENV_VAR: &str = "OCIWIN_REGISTRY_SERVER_URL";

/// The auth/registry server pair a [`super::Client`] talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEndpoints {
    /// Base URL of the bearer-token issuing auth server.
    pub auth_server_url: String,
    /// Base URL of the Docker Registry HTTP API v2 server.
    pub registry_server_url: String,
}

impl RegistryEndpoints {
    /// Builds endpoints from environment variables, falling back to the compile-time Docker Hub
    /// defaults for whichever is unset.
    pub fn from_env() -> RegistryEndpoints {
        RegistryEndpoints {
            auth_server_url: std::env::var(OCIWIN_AUTH_SERVER_ENV_VAR)
                .unwrap_or_else(|_| DEFAULT_AUTH_SERVER_URL.to_string()),
            registry_server_url: std::env::var(OCIWIN_REGISTRY_SERVER_ENV_VAR)
                .unwrap_or_else(|_| DEFAULT_REGISTRY_SERVER_URL.to_string()),
        }
    }
}

impl Default for RegistryEndpoints {
    fn default() -> RegistryEndpoints {
        RegistryEndpoints {
            auth_server_url: DEFAULT_AUTH_SERVER_URL.to_string(),
            registry_server_url: DEFAULT_REGISTRY_SERVER_URL.to_string(),
        }
    }
}
