use crate::error::{ProxyError, Result};
use crate::models::{default_catalog, ModelInfo};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Largest inbound request body accepted, in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub images: ImageConfig,
    #[serde(default = "default_catalog")]
    pub models: Vec<ModelInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Environment variable holding the upstream API key. When unset, the
    /// client's bearer token is forwarded as the key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    /// Overall timeout for upstream and image requests. No timeout when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Credentials file holding the expected bearer token. Defaults to
    /// `$CODEX_HOME/auth.json` (or `~/.config/codex/auth.json`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Remote images downloaded at once within a message; 1 means strictly sequential.
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_api_version() -> String {
    "2023-06-01".to_string()
}

fn default_max_concurrent_fetches() -> usize {
    1
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
            upstream: UpstreamConfig::default(),
            auth: AuthConfig::default(),
            images: ImageConfig::default(),
            models: default_catalog(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_version: default_api_version(),
            api_key_env: None,
            timeout_secs: None,
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: default_max_concurrent_fetches(),
        }
    }
}

impl ProxyConfig {
    /// Load config from a TOML file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ProxyError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Search standard locations for a config file.
    /// Priority: CLI arg > CWD > XDG config > home dir > built-in defaults
    pub fn find_and_load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::load(path);
        }

        for candidate in &config_search_paths() {
            if candidate.exists() {
                tracing::info!(path = %candidate.display(), "Loading config");
                return Self::load(candidate);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// URL the translated request is POSTed to.
    pub fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.upstream.base_url.trim_end_matches('/'))
    }

    /// Resolve the key sent upstream as `x-api-key`.
    ///
    /// # Errors
    /// Returns `ProxyError::Config` when `api_key_env` names an unset variable.
    pub fn resolve_upstream_key(&self, bearer_token: Option<&str>) -> Result<Option<String>> {
        match self.upstream.api_key_env {
            Some(ref var) => std::env::var(var).map(Some).map_err(|_| {
                ProxyError::config(format!(
                    "Environment variable '{var}' not set. Set it with your upstream API key."
                ))
            }),
            None => Ok(bearer_token.map(str::to_string)),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.upstream.timeout_secs.map(Duration::from_secs)
    }
}

/// Candidate config locations, in the order they are tried.
pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // CWD
    paths.push(PathBuf::from("c2a-proxy.toml"));

    // XDG / platform config dir
    if cfg!(target_os = "macos") {
        if let Some(home) = home_dir() {
            paths.push(
                home.join("Library")
                    .join("Application Support")
                    .join("c2a-proxy")
                    .join("config.toml"),
            );
        }
    } else {
        if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg).join("c2a-proxy").join("config.toml"));
        }
        if let Some(home) = home_dir() {
            paths.push(home.join(".config").join("c2a-proxy").join("config.toml"));
        }
    }

    // Home directory fallback
    if let Some(home) = home_dir() {
        paths.push(home.join(".c2a-proxy.toml"));
    }

    paths
}

pub(crate) fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(
            f,
            r#"
port = 5000
max_body_bytes = 1024

[upstream]
base_url = "http://localhost:9000/"
api_key_env = "C2A_TEST_UPSTREAM_KEY"

[auth]
credentials_path = "/tmp/auth.json"

[images]
max_concurrent_fetches = 4

[[models]]
id = "claude-3-5-sonnet"
context_length = 100000
"#
        )
        .unwrap();

        let config = ProxyConfig::load(f.path()).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.max_body_bytes, 1024);
        assert_eq!(config.upstream.api_version, "2023-06-01");
        assert_eq!(config.messages_url(), "http://localhost:9000/v1/messages");
        assert_eq!(
            config.auth.credentials_path,
            Some(PathBuf::from("/tmp/auth.json"))
        );
        assert_eq!(config.images.max_concurrent_fetches, 4);
        assert_eq!(config.models, vec![ModelInfo::new("claude-3-5-sonnet", 100_000)]);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let f = NamedTempFile::new().unwrap();
        let config = ProxyConfig::load(f.path()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.messages_url(), "https://api.anthropic.com/v1/messages");
        assert_eq!(config.images.max_concurrent_fetches, 1);
        assert_eq!(config.models, default_catalog());
        assert!(config.timeout().is_none());
    }

    #[test]
    fn test_upstream_key_falls_back_to_bearer_token() {
        let config = ProxyConfig::default();
        assert_eq!(
            config.resolve_upstream_key(Some("tok")).unwrap(),
            Some("tok".to_string())
        );
        assert_eq!(config.resolve_upstream_key(None).unwrap(), None);
    }

    #[test]
    fn test_upstream_key_env_must_be_set() {
        let mut config = ProxyConfig::default();
        config.upstream.api_key_env = Some("C2A_TEST_SURELY_UNSET_VARIABLE".to_string());
        let err = config.resolve_upstream_key(Some("tok")).unwrap_err();
        assert!(err.to_string().contains("C2A_TEST_SURELY_UNSET_VARIABLE"));
    }
}
