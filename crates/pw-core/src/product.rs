//! # Product Types
//!
//! The slice of the merchant's catalog that widgets fold into their
//! signed parameters. Products are loaded from `config/products.toml`.

use crate::error::{GatewayError, GatewayResult};
use serde::{Deserialize, Serialize};

/// Product type, sent as `ag_type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    /// One-time purchase
    Fixed,
    /// Subscription with a billing period
    Subscription,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Fixed => "fixed",
            ProductType::Subscription => "subscription",
        }
    }
}

impl Default for ProductType {
    fn default() -> Self {
        ProductType::Fixed
    }
}

/// Subscription period unit, sent as `ag_period_type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    Day,
    Week,
    Month,
    Year,
}

impl PeriodType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodType::Day => "day",
            PeriodType::Week => "week",
            PeriodType::Month => "month",
            PeriodType::Year => "year",
        }
    }
}

/// A product offered through a widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Merchant product identifier (sent as `ag_external_id` / `external_ids[i]`)
    pub id: String,

    /// Display name
    pub name: String,

    /// Price in major currency units (e.g. 9.99)
    pub amount: f64,

    /// ISO 4217 currency code (e.g. "USD")
    pub currency: String,

    /// Product type
    #[serde(default)]
    pub product_type: ProductType,

    /// Subscription period length
    #[serde(default)]
    pub period_length: u32,

    /// Subscription period unit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_type: Option<PeriodType>,

    /// Whether the subscription renews automatically
    #[serde(default)]
    pub recurring: bool,

    /// Whether this product is active and available for purchase
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

impl Product {
    /// Create a one-time purchase product
    pub fn fixed(
        id: impl Into<String>,
        name: impl Into<String>,
        amount: f64,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            amount,
            currency: currency.into(),
            product_type: ProductType::Fixed,
            period_length: 0,
            period_type: None,
            recurring: false,
            active: true,
        }
    }

    /// Create a subscription product
    pub fn subscription(
        id: impl Into<String>,
        name: impl Into<String>,
        amount: f64,
        currency: impl Into<String>,
        period_length: u32,
        period_type: PeriodType,
        recurring: bool,
    ) -> Self {
        Self::fixed(id, name, amount, currency).with_subscription(period_length, period_type, recurring)
    }

    /// Builder: turn this product into a subscription
    pub fn with_subscription(mut self, period_length: u32, period_type: PeriodType, recurring: bool) -> Self {
        self.product_type = ProductType::Subscription;
        self.period_length = period_length;
        self.period_type = Some(period_type);
        self.recurring = recurring;
        self
    }

    /// Check if this is a subscription product
    pub fn is_subscription(&self) -> bool {
        self.product_type == ProductType::Subscription
    }

    /// Shortest decimal form of the amount ("9.99", "10", "0.5")
    pub fn display_amount(&self) -> String {
        format!("{}", self.amount)
    }

    pub fn display_period_length(&self) -> String {
        self.period_length.to_string()
    }
}

/// Product catalog (loaded from config)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductCatalog {
    #[serde(default)]
    pub products: Vec<Product>,
}

impl ProductCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self {
            products: Vec::new(),
        }
    }

    /// Add a product to the catalog
    pub fn add(&mut self, product: Product) {
        self.products.push(product);
    }

    /// Find a product by ID
    pub fn get(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Get all active products
    pub fn active_products(&self) -> impl Iterator<Item = &Product> {
        self.products.iter().filter(|p| p.active)
    }

    /// Load catalog from TOML string
    pub fn from_toml(toml_str: &str) -> GatewayResult<Self> {
        toml::from_str(toml_str).map_err(|e| GatewayError::Serialization(e.to_string()))
    }
}
