//! Backend connection settings
//!
//! The backend address is fixed at build or configuration time. It can come
//! from a TOML file, from the `COMPLIANCE_API_BASE` environment variable, or
//! fall back to the built-in default.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context};
use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Environment variable naming the backend base URL
pub const BASE_URL_ENV: &str = "COMPLIANCE_API_BASE";

/// Backend address used when nothing else is configured
pub const DEFAULT_BASE_URL: &str = match option_env!("COMPLIANCE_API_BASE") {
    Some(url) => url,
    None => "http://localhost:8000",
};

/// Top-level configuration file layout
///
/// ```toml
/// [backend]
/// base_url = "http://compliance.internal:8000"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    backend: ClientConfig,
}

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the compliance backend
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

impl ClientConfig {
    /// Configuration pointing at the given backend
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML is malformed or
    /// the base URL is not an absolute http(s) URL.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        let file: ConfigFile = toml::from_str(s).context("Failed to parse TOML configuration")?;
        file.backend.validate()?;
        Ok(file.backend)
    }

    /// Default configuration with the `COMPLIANCE_API_BASE` override applied
    pub fn from_env() -> anyhow::Result<Self> {
        Self::default().with_override(std::env::var(BASE_URL_ENV).ok())
    }

    /// Apply an optional base URL override, ignoring blank values
    pub fn with_override(mut self, base_url: Option<String>) -> anyhow::Result<Self> {
        if let Some(url) = base_url.filter(|u| !u.trim().is_empty()) {
            self.base_url = url.trim().to_string();
        }
        self.validate()?;
        Ok(self)
    }

    /// Parsed base URL
    pub fn url(&self) -> anyhow::Result<Url> {
        Url::parse(&self.base_url)
            .with_context(|| format!("Invalid backend base URL: {}", self.base_url))
    }

    /// Check the base URL is an absolute http(s) URL that can take path segments
    pub fn validate(&self) -> anyhow::Result<()> {
        let url = self.url()?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("Backend base URL must use http or https: {}", self.base_url);
        }
        if url.cannot_be_a_base() {
            bail!("Backend base URL cannot be used as a base: {}", self.base_url);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_points_at_local_backend() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_str_reads_backend_table() {
        let config = ClientConfig::from_str(
            r#"
            [backend]
            base_url = "http://compliance.internal:9000"
            "#,
        )
        .unwrap();
        assert_eq!(config.base_url, "http://compliance.internal:9000");
    }

    #[test]
    fn test_from_str_empty_uses_default() {
        let config = ClientConfig::from_str("").unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_from_str_rejects_bad_urls() {
        assert!(ClientConfig::from_str("[backend]\nbase_url = \"not a url\"").is_err());
        assert!(ClientConfig::from_str("[backend]\nbase_url = \"ftp://host\"").is_err());
        assert!(ClientConfig::from_str("[backend]\nbase_url = \"mailto:ops@example.com\"").is_err());
    }

    #[test]
    fn test_from_str_rejects_malformed_toml() {
        assert!(ClientConfig::from_str("[backend\nbase_url =").is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[backend]\nbase_url = \"https://rules.example.com/api\"").unwrap();
        let config = ClientConfig::from_file(file.path()).unwrap();
        assert_eq!(config.base_url, "https://rules.example.com/api");
    }

    #[test]
    fn test_from_file_missing() {
        let err = ClientConfig::from_file("/nonexistent/console.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_override_applies_and_ignores_blank() {
        let config = ClientConfig::default()
            .with_override(Some(" http://10.0.0.5:8000 ".to_string()))
            .unwrap();
        assert_eq!(config.base_url, "http://10.0.0.5:8000");

        let config = ClientConfig::default()
            .with_override(Some("   ".to_string()))
            .unwrap();
        assert_eq!(config, ClientConfig::default());

        assert!(ClientConfig::default()
            .with_override(Some("localhost".to_string()))
            .is_err());
    }
}
