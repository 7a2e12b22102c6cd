/// Configuration for the navdash client.
/// Reads client.json from ~/.config/navdash/client.json (or platform equivalent).

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Bearer token sent with every request.
    #[serde(default)]
    pub token: Option<String>,
    /// Per-request timeout. Unset means requests wait indefinitely.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_api_base() -> String {
    "http://localhost:8788/api".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            token: None,
            timeout_secs: None,
        }
    }
}

impl ClientConfig {
    /// Apply command-line overrides on top of file values.
    pub fn with_overrides(mut self, api_base: Option<String>, token: Option<String>) -> Self {
        if let Some(api_base) = api_base {
            self.api_base = api_base;
        }
        if token.is_some() {
            self.token = token;
        }
        self
    }
}

/// Default config path: ~/.config/navdash/client.json
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("navdash")
        .join("client.json")
}

/// Load config from path. Returns default if the file doesn't exist or can't be parsed.
pub fn load_config(path: &Path) -> ClientConfig {
    match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            log::warn!("Failed to parse config {}: {}", path.display(), e);
            ClientConfig::default()
        }),
        Err(_) => {
            log::info!("No config at {}, using defaults", path.display());
            ClientConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.json"));
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.api_base, "http://localhost:8788/api");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.json");
        fs::write(&path, r#"{ "token": "abc", "timeout_secs": 5 }"#).unwrap();

        let config = load_config(&path);
        assert_eq!(config.token.as_deref(), Some("abc"));
        assert_eq!(config.timeout_secs, Some(5));
        assert_eq!(config.api_base, "http://localhost:8788/api");
    }

    #[test]
    fn test_malformed_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.json");
        fs::write(&path, "{ token: ").unwrap();
        assert_eq!(load_config(&path), ClientConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = ClientConfig {
            token: Some("file".into()),
            ..ClientConfig::default()
        }
        .with_overrides(Some("https://nav.example/api".into()), None);
        assert_eq!(config.api_base, "https://nav.example/api");
        assert_eq!(config.token.as_deref(), Some("file"));
    }
}
