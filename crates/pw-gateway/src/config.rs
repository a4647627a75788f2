//! # Gateway Configuration
//!
//! Configuration for the Paymentwall integration.
//! All secrets are loaded from environment variables.

use crate::pingback::Pingback;
use crate::widget::{Widget, DEFAULT_API_BASE_URL};
use pw_core::{ApiType, DigestEncoding, GatewayError, IpAllowlist, ParameterSet, SignatureEngine};
use std::env;

/// Default widget code
pub const DEFAULT_WIDGET_CODE: &str = "p1_1";

/// Paymentwall project configuration
#[derive(Clone)]
pub struct GatewayConfig {
    /// Project (application) key
    pub app_key: String,

    /// Project secret key, shared with the gateway
    pub secret_key: String,

    /// API surface of the project
    pub api_type: ApiType,

    /// Widget code (e.g. "p1_1")
    pub widget_code: String,

    /// Widget endpoint root (for testing/mocking)
    pub api_base_url: String,

    /// Addresses pingbacks may come from
    pub allowlist: IpAllowlist,

    /// Comparison used for legacy (v2) pingback signatures
    pub legacy_digest_encoding: DigestEncoding,
}

impl GatewayConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `PAYMENTWALL_APP_KEY`
    /// - `PAYMENTWALL_SECRET_KEY`
    ///
    /// Optional:
    /// - `PAYMENTWALL_API_TYPE` (`vc`, `goods`, `cart`; default `goods`)
    /// - `PAYMENTWALL_WIDGET_CODE` (default `p1_1`)
    /// - `PAYMENTWALL_API_BASE_URL`
    /// - `PAYMENTWALL_IP_ALLOWLIST` (`a.b.c.d-e.f.g.h` or comma-separated list)
    /// - `PAYMENTWALL_LEGACY_RAW_DIGEST` (`1` to compare v2 signatures as raw digests)
    pub fn from_env() -> Result<Self, GatewayError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let app_key = required_var("PAYMENTWALL_APP_KEY")?;
        let secret_key = required_var("PAYMENTWALL_SECRET_KEY")?;

        let api_type = match env::var("PAYMENTWALL_API_TYPE") {
            Ok(value) => ApiType::from_config(&value).ok_or_else(|| {
                GatewayError::Configuration(format!(
                    "PAYMENTWALL_API_TYPE must be vc, goods or cart (got {})",
                    value
                ))
            })?,
            Err(_) => ApiType::default(),
        };

        let allowlist = match env::var("PAYMENTWALL_IP_ALLOWLIST") {
            Ok(value) => IpAllowlist::parse(&value)?,
            Err(_) => IpAllowlist::default(),
        };

        let legacy_digest_encoding = match env::var("PAYMENTWALL_LEGACY_RAW_DIGEST").as_deref() {
            Ok("1") | Ok("true") => DigestEncoding::Raw,
            _ => DigestEncoding::Hex,
        };

        Ok(Self {
            app_key,
            secret_key,
            api_type,
            widget_code: env::var("PAYMENTWALL_WIDGET_CODE")
                .unwrap_or_else(|_| DEFAULT_WIDGET_CODE.to_string()),
            api_base_url: env::var("PAYMENTWALL_API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
            allowlist,
            legacy_digest_encoding,
        })
    }

    /// Create config with explicit values (for testing)
    pub fn new(app_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            app_key: app_key.into(),
            secret_key: secret_key.into(),
            api_type: ApiType::default(),
            widget_code: DEFAULT_WIDGET_CODE.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            allowlist: IpAllowlist::default(),
            legacy_digest_encoding: DigestEncoding::Hex,
        }
    }

    /// Builder: set the API surface
    pub fn with_api_type(mut self, api_type: ApiType) -> Self {
        self.api_type = api_type;
        self
    }

    /// Builder: set the widget code
    pub fn with_widget_code(mut self, code: impl Into<String>) -> Self {
        self.widget_code = code.into();
        self
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Builder: set the pingback allowlist
    pub fn with_allowlist(mut self, allowlist: IpAllowlist) -> Self {
        self.allowlist = allowlist;
        self
    }

    /// Builder: set the legacy signature comparison
    pub fn with_legacy_digest_encoding(mut self, encoding: DigestEncoding) -> Self {
        self.legacy_digest_encoding = encoding;
        self
    }

    pub fn signature_engine(&self) -> SignatureEngine {
        SignatureEngine::new().with_legacy_encoding(self.legacy_digest_encoding)
    }

    /// Start a widget for `uid` with this project's keys
    pub fn widget(&self, uid: impl Into<String>) -> Widget {
        Widget::new(
            self.app_key.clone(),
            self.secret_key.clone(),
            self.api_type,
            uid,
            self.widget_code.clone(),
        )
        .with_api_base_url(self.api_base_url.clone())
    }

    /// Wrap received parameters as a pingback checked against this project
    pub fn pingback(&self, params: impl Into<ParameterSet>, ip: impl Into<String>) -> Pingback {
        Pingback::new(params, ip, self.api_type, self.secret_key.clone())
            .with_allowlist(self.allowlist.clone())
            .with_signature_engine(self.signature_engine())
    }

    /// Parse a urlencoded query or form body into a pingback.
    ///
    /// The claimed signature is kept as its decoded bytes alongside the
    /// text parameters, so raw legacy digests can be verified.
    pub fn pingback_from_urlencoded(&self, input: &[u8], ip: impl Into<String>) -> Pingback {
        let pingback = self.pingback(ParameterSet::from_urlencoded(input), ip);
        match pingback
            .signature_key()
            .and_then(|key| ParameterSet::raw_urlencoded_value(input, key))
        {
            Some(raw) => pingback.with_raw_signature(raw),
            None => pingback,
        }
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("app_key", &self.app_key)
            .field("secret_key", &"<redacted>")
            .field("api_type", &self.api_type)
            .field("widget_code", &self.widget_code)
            .field("api_base_url", &self.api_base_url)
            .field("allowlist", &self.allowlist)
            .field("legacy_digest_encoding", &self.legacy_digest_encoding)
            .finish()
    }
}

fn required_var(name: &str) -> Result<String, GatewayError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(GatewayError::Configuration(format!("{} not set", name))),
    }
}
