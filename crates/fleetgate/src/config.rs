//! Configuration management for the gateway binary.
//!
//! Handles loading, validation, and conversion of configuration from
//! TOML files and command-line overrides.

use gateway_protocol::DEFAULT_MAX_FRAME_BYTES;
use gateway_server::GatewayConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Application configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Gateway network settings
    pub server: ServerSettings,
    /// Token validation settings
    #[serde(default)]
    pub auth: AuthSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// Gateway network settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Network address to bind the gateway to (e.g., "0.0.0.0:8081")
    pub bind_address: String,
    /// Maximum number of concurrent connections
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Close connections with no inbound traffic for this many seconds
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Ceiling for a single frame body in bytes
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: u32,
    /// Whether to use SO_REUSEPORT for multi-threaded accept loops
    #[serde(default)]
    pub use_reuse_port: bool,
}

fn default_max_connections() -> usize {
    1000
}

fn default_idle_timeout_secs() -> u64 {
    300
}

fn default_max_frame_bytes() -> u32 {
    DEFAULT_MAX_FRAME_BYTES
}

/// Token validation settings.
///
/// The token list feeds the static validator; deployments with a real
/// authentication store plug it in behind the validator trait instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthSettings {
    /// Accepted server tokens. Values are credentials: keep this file out
    /// of logs and version control.
    #[serde(default)]
    pub tokens: Vec<String>,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                bind_address: "0.0.0.0:8081".to_string(),
                max_connections: default_max_connections(),
                idle_timeout_secs: default_idle_timeout_secs(),
                max_frame_bytes: default_max_frame_bytes(),
                use_reuse_port: false,
            },
            auth: AuthSettings::default(),
            logging: LoggingSettings {
                level: "info".to_string(),
                json_format: false,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from a file, writing a default one if missing.
    pub async fn load_from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Validate field-level constraints before startup.
    pub fn validate(&self) -> Result<(), String> {
        if self
            .server
            .bind_address
            .parse::<std::net::SocketAddr>()
            .is_err()
        {
            return Err(format!("Invalid bind address: {}", self.server.bind_address));
        }

        if self.server.max_frame_bytes == 0 {
            return Err("max_frame_bytes must be greater than zero".to_string());
        }
        if self.server.idle_timeout_secs == 0 {
            return Err("idle_timeout_secs must be greater than zero".to_string());
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level, valid_levels
            ));
        }

        Ok(())
    }

    /// Convert to the gateway crate's configuration.
    pub fn to_gateway_config(&self) -> Result<GatewayConfig, Box<dyn std::error::Error>> {
        Ok(GatewayConfig {
            bind_address: self.server.bind_address.parse()?,
            max_connections: self.server.max_connections,
            idle_timeout: Duration::from_secs(self.server.idle_timeout_secs),
            max_frame_bytes: self.server.max_frame_bytes,
            use_reuse_port: self.server.use_reuse_port,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_config_validates_and_converts() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());

        let gateway_config = config.to_gateway_config().unwrap();
        assert_eq!(gateway_config.bind_address.port(), 8081);
        assert_eq!(gateway_config.max_connections, 1000);
        assert_eq!(gateway_config.idle_timeout, Duration::from_secs(300));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.server.bind_address = "not-an-address".to_string();
        assert!(config.validate().is_err());

        config.server.bind_address = "127.0.0.1:8081".to_string();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());

        config.logging.level = "debug".to_string();
        config.server.max_frame_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn toml_parsing_with_sparse_sections() {
        let config: AppConfig = toml::from_str(
            r#"
[server]
bind_address = "0.0.0.0:9999"

[auth]
tokens = ["abcdefabcdefabcdefabcdefabcdefab"]

[logging]
level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.bind_address, "0.0.0.0:9999");
        assert_eq!(config.server.max_connections, 1000); // default
        assert_eq!(config.auth.tokens.len(), 1);
        assert!(!config.logging.json_format);
    }

    #[tokio::test]
    async fn load_creates_default_file_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fleetgate.toml");

        let created = AppConfig::load_from_file(&path).await.unwrap();
        assert!(path.exists());
        assert!(created.validate().is_ok());

        // a second load reads the file it just wrote
        let reloaded = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(reloaded.server.bind_address, created.server.bind_address);
    }
}
