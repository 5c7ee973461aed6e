// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.
//
// Settings come from an optional JSON file, then environment variables, and are
// validated once at startup. The resulting `AppConfig` is handed to the server
// explicitly; nothing reads the environment after that.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{DivDrawError, Result};

/// Default port for the HTTP backend.
pub const DEFAULT_PORT: u16 = 8000;

/// Maximum accepted request body size (64 MiB).
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 64 * 1024 * 1024;

const DEFAULT_ENHANCE_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_ENHANCE_MODEL: &str = "gemini-2.5-flash-image-preview";
const DEFAULT_ENHANCE_PROMPT: &str = "This is a hand-drawn sketch assembled from several \
     pieces. Redraw it as a polished, clean illustration. Keep the composition, \
     proportions and subject exactly as drawn, smooth out wobbly strokes, and \
     briefly describe what the drawing shows.";

/// Server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Interface to bind (default `0.0.0.0`).
    pub host: IpAddr,
    /// Port to listen on (default 8000). Port 0 binds an ephemeral port.
    pub port: u16,
    /// Upper bound on request body size in bytes.
    pub max_request_bytes: usize,
    /// Generative backend used by `/enhance`.
    pub enhance: EnhanceConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
            enhance: EnhanceConfig::default(),
        }
    }
}

/// Settings for the remote generative-image service.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhanceConfig {
    /// API key. `None` disables `/enhance`.
    pub api_key: Option<String>,
    /// Model identifier.
    pub model: String,
    /// Base URL of the REST API.
    pub endpoint: String,
    /// Instruction sent alongside the merged sketch.
    pub prompt: String,
    /// Per-call timeout.
    pub timeout_secs: u64,
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_ENHANCE_MODEL.into(),
            endpoint: DEFAULT_ENHANCE_ENDPOINT.into(),
            prompt: DEFAULT_ENHANCE_PROMPT.into(),
            timeout_secs: 120,
        }
    }
}

// The key must never end up in logs.
impl std::fmt::Debug for EnhanceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnhanceConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration: JSON file (if given), then environment overrides,
    /// then validation.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let data = std::fs::read_to_string(path).map_err(|e| {
                    DivDrawError::Config(format!("read {}: {e}", path.display()))
                })?;
                let parsed: AppConfig = serde_json::from_str(&data)?;
                info!(path = %path.display(), "configuration file loaded");
                parsed
            }
            None => AppConfig::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `DIVDRAW_*` / `GEMINI_API_KEY` overrides from `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("DIVDRAW_HOST") {
            self.host = host
                .parse()
                .map_err(|e| DivDrawError::Config(format!("DIVDRAW_HOST '{host}': {e}")))?;
        }
        if let Some(port) = lookup("DIVDRAW_PORT") {
            self.port = port
                .parse()
                .map_err(|e| DivDrawError::Config(format!("DIVDRAW_PORT '{port}': {e}")))?;
        }
        if let Some(limit) = lookup("DIVDRAW_MAX_REQUEST_BYTES") {
            self.max_request_bytes = limit.parse().map_err(|e| {
                DivDrawError::Config(format!("DIVDRAW_MAX_REQUEST_BYTES '{limit}': {e}"))
            })?;
        }
        if let Some(key) = lookup("GEMINI_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.enhance.api_key = Some(key.trim().to_string());
        }
        if let Some(model) = lookup("DIVDRAW_ENHANCE_MODEL") {
            self.enhance.model = model;
        }
        if let Some(endpoint) = lookup("DIVDRAW_ENHANCE_ENDPOINT") {
            self.enhance.endpoint = endpoint;
        }
        if let Some(timeout) = lookup("DIVDRAW_ENHANCE_TIMEOUT_SECS") {
            self.enhance.timeout_secs = timeout.parse().map_err(|e| {
                DivDrawError::Config(format!("DIVDRAW_ENHANCE_TIMEOUT_SECS '{timeout}': {e}"))
            })?;
        }
        debug!(config = ?self, "environment overrides applied");
        Ok(())
    }

    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_request_bytes == 0 {
            return Err(DivDrawError::Config("max_request_bytes must be > 0".into()));
        }
        if self.enhance.timeout_secs == 0 {
            return Err(DivDrawError::Config("enhance.timeout_secs must be > 0".into()));
        }
        if self.enhance.model.trim().is_empty() {
            return Err(DivDrawError::Config("enhance.model must not be empty".into()));
        }
        if !self.enhance.endpoint.starts_with("http://")
            && !self.enhance.endpoint.starts_with("https://")
        {
            return Err(DivDrawError::Config(format!(
                "enhance.endpoint '{}' is not an http(s) URL",
                self.enhance.endpoint
            )));
        }
        Ok(())
    }

    /// Socket address the server binds.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_bind_all_interfaces_on_8000() {
        let config = AppConfig::default();
        assert_eq!(config.bind_addr().to_string(), "0.0.0.0:8000");
        assert!(config.enhance.api_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn overrides_replace_fields() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(lookup_from(&[
                ("DIVDRAW_HOST", "127.0.0.1"),
                ("DIVDRAW_PORT", "9100"),
                ("GEMINI_API_KEY", "  secret  "),
                ("DIVDRAW_ENHANCE_TIMEOUT_SECS", "30"),
            ]))
            .unwrap();
        assert_eq!(config.bind_addr().to_string(), "127.0.0.1:9100");
        assert_eq!(config.enhance.api_key.as_deref(), Some("secret"));
        assert_eq!(config.enhance.timeout_secs, 30);
    }

    #[test]
    fn blank_api_key_is_ignored() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(lookup_from(&[("GEMINI_API_KEY", "   ")]))
            .unwrap();
        assert!(config.enhance.api_key.is_none());
    }

    #[test]
    fn unparsable_port_is_a_config_error() {
        let mut config = AppConfig::default();
        let err = config
            .apply_overrides(lookup_from(&[("DIVDRAW_PORT", "eighty")]))
            .unwrap_err();
        assert!(matches!(err, DivDrawError::Config(_)));
    }

    #[test]
    fn validate_rejects_zero_body_limit() {
        let config = AppConfig {
            max_request_bytes: 0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_non_http_endpoint() {
        let mut config = AppConfig::default();
        config.enhance.endpoint = "ftp://example.com".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"port": 9000}"#).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.max_request_bytes, DEFAULT_MAX_REQUEST_BYTES);
        assert_eq!(config.enhance.timeout_secs, 120);
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let mut enhance = EnhanceConfig::default();
        enhance.api_key = Some("top-secret".into());
        let rendered = format!("{enhance:?}");
        assert!(!rendered.contains("top-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
