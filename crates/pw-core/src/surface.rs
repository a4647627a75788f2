//! # API Surfaces
//!
//! The gateway exposes three APIs, each with its own widget endpoint,
//! required pingback fields and default signature version.

use crate::signature::SignatureVersion;
use serde::{Deserialize, Serialize};

/// Gateway API a widget or pingback belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiType {
    /// Virtual Currency API
    #[serde(alias = "vc")]
    VirtualCurrency,
    /// Digital Goods API (one-time and subscription products)
    #[serde(alias = "goods")]
    DigitalGoods,
    /// Cart API (multiple products)
    Cart,
}

impl ApiType {
    /// Widget endpoint path segment
    pub fn controller(&self) -> &'static str {
        match self {
            ApiType::VirtualCurrency => "ps",
            ApiType::DigitalGoods => "subscription",
            ApiType::Cart => "cart",
        }
    }

    /// Signature version a widget uses unless `sign_version` is overridden
    pub fn default_widget_sign_version(&self) -> SignatureVersion {
        match self {
            ApiType::Cart => SignatureVersion::V2,
            _ => SignatureVersion::DEFAULT,
        }
    }

    /// Parameters a pingback must carry, in the order they are checked.
    ///
    /// `sig` stands for the signature slot, which may also arrive as `sign`.
    pub fn required_pingback_params(&self) -> &'static [&'static str] {
        match self {
            ApiType::VirtualCurrency => &["uid", "type", "ref", "sig", "sign_version", "currency"],
            ApiType::DigitalGoods => &["uid", "type", "ref", "sig", "sign_version", "goodsid"],
            ApiType::Cart => &[],
        }
    }

    /// Parse a configuration value (`vc`, `goods`, `cart` or the full snake_case name)
    pub fn from_config(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "vc" | "virtual_currency" => Some(ApiType::VirtualCurrency),
            "goods" | "digital_goods" => Some(ApiType::DigitalGoods),
            "cart" => Some(ApiType::Cart),
            _ => None,
        }
    }
}

impl Default for ApiType {
    fn default() -> Self {
        ApiType::DigitalGoods
    }
}

impl std::fmt::Display for ApiType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ApiType::VirtualCurrency => "virtual_currency",
            ApiType::DigitalGoods => "digital_goods",
            ApiType::Cart => "cart",
        };
        f.write_str(name)
    }
}
