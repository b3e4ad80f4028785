//! Bridge configuration
//!
//! Every field has a default, so an empty TOML document is a valid config:
//!
//! ```toml
//! osc_listen = "0.0.0.0:57122"
//! engine_addr = "127.0.0.1:57120"
//! ws_listen = "0.0.0.0:3001"
//! http_listen = "0.0.0.0:3000"
//! allowed_prefixes = ["/daemon/", "/brahma/"]
//! static_dir = "public"
//! ```

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use cortex_core::{
    DEFAULT_ALLOWED_PREFIXES, DEFAULT_ENGINE_PORT, DEFAULT_HTTP_PORT, DEFAULT_OSC_LISTEN_PORT,
    DEFAULT_REGISTRY_NAMESPACE, DEFAULT_WS_PORT,
};

use crate::error::{BridgeError, Result};

/// Bridge configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// UDP address the engine broadcasts to
    #[serde(default = "default_osc_listen")]
    pub osc_listen: String,
    /// Local UDP address used for sends to the engine
    #[serde(default = "default_osc_send_bind")]
    pub osc_send_bind: String,
    /// UDP address of the engine
    #[serde(default = "default_engine_addr")]
    pub engine_addr: String,
    /// WebSocket listen address for browser clients
    #[serde(default = "default_ws_listen")]
    pub ws_listen: String,
    /// HTTP listen address; `None` or an empty string disables HTTP
    #[serde(default = "default_http_listen")]
    pub http_listen: Option<String>,
    /// Address prefixes clients may send to
    #[serde(default = "default_allowed_prefixes")]
    pub allowed_prefixes: Vec<String>,
    /// Namespace of the registry announcement addresses
    #[serde(default = "default_registry_namespace")]
    pub registry_namespace: String,
    /// Frames queued per client before the client is dropped
    #[serde(default = "default_client_queue_capacity")]
    pub client_queue_capacity: usize,
    /// Largest datagram read from the engine
    #[serde(default = "default_max_datagram_size")]
    pub max_datagram_size: usize,
    /// Directory served as static files over HTTP
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
    /// Permissive CORS on the HTTP surface
    #[serde(default = "default_true")]
    pub cors: bool,
}

fn default_osc_listen() -> String {
    format!("0.0.0.0:{}", DEFAULT_OSC_LISTEN_PORT)
}

fn default_osc_send_bind() -> String {
    "0.0.0.0:0".to_string()
}

fn default_engine_addr() -> String {
    format!("127.0.0.1:{}", DEFAULT_ENGINE_PORT)
}

fn default_ws_listen() -> String {
    format!("0.0.0.0:{}", DEFAULT_WS_PORT)
}

fn default_http_listen() -> Option<String> {
    Some(format!("0.0.0.0:{}", DEFAULT_HTTP_PORT))
}

fn default_allowed_prefixes() -> Vec<String> {
    DEFAULT_ALLOWED_PREFIXES
        .iter()
        .map(|p| p.to_string())
        .collect()
}

fn default_registry_namespace() -> String {
    DEFAULT_REGISTRY_NAMESPACE.to_string()
}

fn default_client_queue_capacity() -> usize {
    256
}

fn default_max_datagram_size() -> usize {
    65536
}

fn default_true() -> bool {
    true
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            osc_listen: default_osc_listen(),
            osc_send_bind: default_osc_send_bind(),
            engine_addr: default_engine_addr(),
            ws_listen: default_ws_listen(),
            http_listen: default_http_listen(),
            allowed_prefixes: default_allowed_prefixes(),
            registry_namespace: default_registry_namespace(),
            client_queue_capacity: default_client_queue_capacity(),
            max_datagram_size: default_max_datagram_size(),
            static_dir: None,
            cors: true,
        }
    }
}

impl BridgeConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| BridgeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| BridgeError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// HTTP listen address, if HTTP is enabled
    pub fn http_addr(&self) -> Option<&str> {
        self.http_listen.as_deref().filter(|addr| !addr.is_empty())
    }

    pub fn validate(&self) -> Result<()> {
        parse_addr("osc_listen", &self.osc_listen)?;
        parse_addr("osc_send_bind", &self.osc_send_bind)?;
        parse_addr("engine_addr", &self.engine_addr)?;
        parse_addr("ws_listen", &self.ws_listen)?;
        if let Some(addr) = self.http_addr() {
            parse_addr("http_listen", addr)?;
        }

        if !self.registry_namespace.starts_with('/') {
            return Err(BridgeError::Config(format!(
                "registry_namespace must start with '/': {:?}",
                self.registry_namespace
            )));
        }
        if self.client_queue_capacity == 0 {
            return Err(BridgeError::Config(
                "client_queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.max_datagram_size == 0 {
            return Err(BridgeError::Config(
                "max_datagram_size must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// Engine address as a socket address
    pub fn engine_socket_addr(&self) -> Result<SocketAddr> {
        parse_addr("engine_addr", &self.engine_addr)
    }
}

fn parse_addr(field: &str, value: &str) -> Result<SocketAddr> {
    value
        .parse()
        .map_err(|_| BridgeError::Config(format!("{} is not a socket address: {:?}", field, value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.osc_listen, "0.0.0.0:57122");
        assert_eq!(config.engine_addr, "127.0.0.1:57120");
        assert_eq!(config.ws_listen, "0.0.0.0:3001");
        assert_eq!(config.http_addr(), Some("0.0.0.0:3000"));
        assert_eq!(config.registry_namespace, "/brahma/registry");
        assert_eq!(config.allowed_prefixes.len(), 9);
        assert!(config.cors);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_document_is_default() {
        let config = BridgeConfig::from_toml_str("").unwrap();
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn test_partial_document() {
        let config = BridgeConfig::from_toml_str(
            r#"
            engine_addr = "10.0.0.5:57120"
            allowed_prefixes = ["/daemon/"]
            client_queue_capacity = 16
            "#,
        )
        .unwrap();

        assert_eq!(config.engine_addr, "10.0.0.5:57120");
        assert_eq!(config.allowed_prefixes, vec!["/daemon/".to_string()]);
        assert_eq!(config.client_queue_capacity, 16);
        assert_eq!(config.osc_listen, "0.0.0.0:57122");
    }

    #[test]
    fn test_empty_http_listen_disables_http() {
        let config = BridgeConfig::from_toml_str(r#"http_listen = """#).unwrap();
        assert_eq!(config.http_addr(), None);
    }

    #[test]
    fn test_rejects_bad_address() {
        let result = BridgeConfig::from_toml_str(r#"ws_listen = "localhost""#);
        assert!(matches!(result, Err(BridgeError::Config(_))));
    }

    #[test]
    fn test_rejects_bad_namespace() {
        let result = BridgeConfig::from_toml_str(r#"registry_namespace = "registry""#);
        assert!(matches!(result, Err(BridgeError::Config(_))));
    }

    #[test]
    fn test_rejects_unknown_types() {
        let result = BridgeConfig::from_toml_str(r#"client_queue_capacity = "many""#);
        assert!(matches!(result, Err(BridgeError::Config(_))));
    }
}
