//! # Application State
//!
//! Shared state for the Axum application.
//! Contains the gateway configuration, pingback handler and product catalog.

use pw_core::ProductCatalog;
use pw_gateway::{GatewayConfig, LoggingPingbackHandler, PingbackHandler};
use std::net::SocketAddr;
use std::sync::Arc;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Skip the pingback origin check (never honoured in production)
    pub skip_ip_check: bool,
    /// Reverse proxies in front of the server that append to `X-Forwarded-For`.
    /// 0 ignores the header and uses the socket peer.
    pub trusted_proxy_hops: usize,
}

impl AppConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            skip_ip_check: env_flag("PINGBACK_SKIP_IP_CHECK"),
            trusted_proxy_hops: if env_flag("TRUST_FORWARDED_FOR") {
                std::env::var("TRUSTED_PROXY_HOPS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .filter(|&hops: &usize| hops > 0)
                    .unwrap_or(1)
            } else {
                0
            },
        }
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid socket address {}:{}: {}", self.host, self.port, e))
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Whether pingback origin checks are bypassed
    pub fn skips_ip_check(&self) -> bool {
        self.skip_ip_check && !self.is_production()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_flag(name: &str) -> bool {
    matches!(std::env::var(name).as_deref(), Ok("1") | Ok("true"))
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Gateway project configuration
    pub gateway: Arc<GatewayConfig>,
    /// Pingback handler
    pub handler: Arc<dyn PingbackHandler>,
    /// Product catalog
    pub catalog: ProductCatalog,
    /// Application config
    pub config: AppConfig,
}

impl AppState {
    /// Create a new AppState from the environment with the logging handler
    pub fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env();

        let gateway = GatewayConfig::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to initialize gateway: {}", e))?;

        // Load product catalog
        let catalog = load_product_catalog()?;

        Ok(Self::from_parts(config, gateway, catalog))
    }

    /// Assemble state from explicit parts (for testing)
    pub fn from_parts(config: AppConfig, gateway: GatewayConfig, catalog: ProductCatalog) -> Self {
        Self {
            gateway: Arc::new(gateway),
            handler: Arc::new(LoggingPingbackHandler),
            catalog,
            config,
        }
    }

    /// Builder: replace the pingback handler
    pub fn with_handler(mut self, handler: Arc<dyn PingbackHandler>) -> Self {
        self.handler = handler;
        self
    }
}

/// Load product catalog from config file
fn load_product_catalog() -> anyhow::Result<ProductCatalog> {
    // Try to load from config/products.toml
    let config_paths = [
        "config/products.toml",
        "../config/products.toml",
        "../../config/products.toml",
    ];

    for path in config_paths {
        if let Ok(content) = std::fs::read_to_string(path) {
            let catalog = ProductCatalog::from_toml(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path, e))?;
            tracing::info!("Loaded {} products from {}", catalog.products.len(), path);
            return Ok(catalog);
        }
    }

    // Return empty catalog if no config found
    tracing::warn!("No product catalog found, using empty catalog");
    Ok(ProductCatalog::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(environment: &str, skip_ip_check: bool) -> AppConfig {
        AppConfig {
            host: "0.0.0.0".to_string(),
            port: 3000,
            environment: environment.to_string(),
            skip_ip_check,
            trusted_proxy_hops: 0,
        }
    }

    #[test]
    fn test_socket_addr() {
        let addr = config("test", false).socket_addr().unwrap();
        assert_eq!(addr.to_string(), "0.0.0.0:3000");
    }

    #[test]
    fn test_invalid_socket_addr() {
        let mut cfg = config("test", false);
        cfg.host = "not a host".to_string();
        assert!(cfg.socket_addr().is_err());
    }

    #[test]
    fn test_skip_ip_check_ignored_in_production() {
        assert!(config("development", true).skips_ip_check());
        assert!(!config("production", true).skips_ip_check());
        assert!(!config("development", false).skips_ip_check());
    }
}
