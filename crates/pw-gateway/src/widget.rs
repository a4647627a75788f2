//! # Widget Signing
//!
//! Builds the signed checkout request ("widget") a merchant embeds or
//! redirects to. Parameters are assembled in this order, later steps
//! overwriting earlier ones:
//!
//! 1. identity: `key`, `uid`, `widget`, `email`, `timestamp`, `ps`
//! 2. product fields for the API surface
//! 3. caller extra params (may override anything, including `sign_version`)
//! 4. `sign_version` and `sign`, unless signing is skipped

use pw_core::{
    ApiType, GatewayError, GatewayResult, ParameterSet, Product, SignatureEngine,
    SignatureVersion,
};
use std::collections::BTreeMap;

/// Default widget endpoint root
pub const DEFAULT_API_BASE_URL: &str = "https://api.paymentwall.com/api";

/// Default payment system selector (`ps`)
pub const DEFAULT_PAYMENT_SYSTEM: &str = "all";

/// Signed widget request builder
#[derive(Clone)]
pub struct Widget {
    app_key: String,
    secret_key: String,
    api_type: ApiType,
    uid: String,
    widget_code: String,
    email: Option<String>,
    ps: String,
    skip_signature: bool,
    api_base_url: String,
    products: Vec<Product>,
    extra_params: BTreeMap<String, String>,
    engine: SignatureEngine,
}

impl Widget {
    /// Create a widget for one user
    pub fn new(
        app_key: impl Into<String>,
        secret_key: impl Into<String>,
        api_type: ApiType,
        uid: impl Into<String>,
        widget_code: impl Into<String>,
    ) -> Self {
        Self {
            app_key: app_key.into(),
            secret_key: secret_key.into(),
            api_type,
            uid: uid.into(),
            widget_code: widget_code.into(),
            email: None,
            ps: DEFAULT_PAYMENT_SYSTEM.to_string(),
            skip_signature: false,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            products: Vec::new(),
            extra_params: BTreeMap::new(),
            engine: SignatureEngine::default(),
        }
    }

    /// Builder: prefill the user's email
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Builder: leave the request unsigned (no `sign`, no `sign_version`)
    pub fn with_skip_signature(mut self, skip: bool) -> Self {
        self.skip_signature = skip;
        self
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Append products.
    ///
    /// The digital goods API takes exactly one product: appending a second,
    /// or more than one at once, fails with
    /// [`GatewayError::OnlyOneProductAllowed`] and appends nothing.
    pub fn append_products(&mut self, products: impl IntoIterator<Item = Product>) -> GatewayResult<()> {
        let products: Vec<Product> = products.into_iter().collect();

        if self.api_type == ApiType::DigitalGoods
            && (products.len() > 1 || (!products.is_empty() && !self.products.is_empty()))
        {
            return Err(GatewayError::OnlyOneProductAllowed);
        }

        self.products.extend(products);
        Ok(())
    }

    pub fn append_product(&mut self, product: Product) -> GatewayResult<()> {
        self.append_products([product])
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn api_type(&self) -> ApiType {
        self.api_type
    }

    /// Restrict the payment systems shown (`ps`, default `all`)
    pub fn set_ps(&mut self, ps: impl Into<String>) {
        self.ps = ps.into();
    }

    /// Redirect targets after payment, sent as `success_url` / `failure_url`
    pub fn set_callback_urls(&mut self, success_url: impl Into<String>, failure_url: impl Into<String>) {
        self.set_extra_param("success_url", success_url);
        self.set_extra_param("failure_url", failure_url);
    }

    pub fn set_extra_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.extra_params.insert(key.into(), value.into());
    }

    pub fn set_extra_params<K, V>(&mut self, params: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in params {
            self.set_extra_param(key, value);
        }
    }

    /// Wire value of the signature version this widget signs with.
    ///
    /// An explicit `sign_version` extra param wins; otherwise cart widgets
    /// use `"2"` and the others `"3"`.
    pub fn sign_version_wire(&self) -> String {
        self.extra_params
            .get("sign_version")
            .cloned()
            .unwrap_or_else(|| self.api_type.default_widget_sign_version().as_str().to_string())
    }

    /// Resolved signature algorithm
    pub fn sign_version(&self) -> SignatureVersion {
        SignatureVersion::from_wire(&self.sign_version_wire())
    }

    /// Assemble (and sign) the request parameters at a given unix timestamp
    pub fn params_at(&self, timestamp: i64) -> ParameterSet {
        let mut params = ParameterSet::new()
            .with("key", self.app_key.as_str())
            .with("uid", self.uid.as_str())
            .with("widget", self.widget_code.as_str())
            .with("email", self.email.as_deref().unwrap_or(""))
            .with("timestamp", timestamp.to_string())
            .with("ps", self.ps.as_str());

        self.append_product_params(&mut params);

        params.extend(self.extra_params.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        if self.skip_signature {
            params.remove("sign_version");
        } else {
            let wire = self.sign_version_wire();
            let version = SignatureVersion::from_wire(&wire);
            params.insert("sign_version", wire);
            let sign = self
                .engine
                .compute(&params, Some("sign"), &self.secret_key, version);
            params.insert("sign", sign);
        }

        params
    }

    /// Assemble (and sign) the request parameters now
    pub fn params(&self) -> ParameterSet {
        self.params_at(chrono::Utc::now().timestamp())
    }

    fn append_product_params(&self, params: &mut ParameterSet) {
        match self.api_type {
            ApiType::DigitalGoods => {
                let Some(product) = self.products.first() else {
                    return;
                };
                params.insert("amount", product.display_amount());
                params.insert("currencyCode", product.currency.as_str());
                params.insert("ag_name", product.name.as_str());
                params.insert("ag_external_id", product.id.as_str());
                params.insert("ag_type", product.product_type.as_str());
                if product.is_subscription() {
                    params.insert("ag_period_length", product.display_period_length());
                    params.insert(
                        "ag_period_type",
                        product.period_type.map(|p| p.as_str()).unwrap_or(""),
                    );
                    if product.recurring {
                        params.insert("ag_recurring", "1");
                    }
                }
            }
            ApiType::Cart => {
                for (i, product) in self.products.iter().enumerate() {
                    params.insert(format!("external_ids[{}]", i), product.id.as_str());
                    if product.amount > 0.0 {
                        params.insert(format!("prices[{}]", i), product.display_amount());
                    }
                    if !product.currency.is_empty() {
                        params.insert(format!("currencies[{}]", i), product.currency.as_str());
                    }
                }
            }
            ApiType::VirtualCurrency => {}
        }
    }

    /// Full widget URL at a given unix timestamp
    pub fn url_at(&self, timestamp: i64) -> String {
        format!(
            "{}/{}?{}",
            self.api_base_url,
            self.api_type.controller(),
            self.params_at(timestamp).to_query_string()
        )
    }

    /// Full widget URL, timestamped now
    pub fn url(&self) -> String {
        self.url_at(chrono::Utc::now().timestamp())
    }

    /// `<iframe>` markup embedding the widget URL.
    ///
    /// Defaults `frameborder="0" width="750" height="800"`; `attributes`
    /// override or extend them. Attributes are written in name order.
    pub fn html_code<K, V>(&self, attributes: impl IntoIterator<Item = (K, V)>) -> String
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.html_code_for_url(&self.url(), attributes)
    }

    /// `<iframe>` markup for a URL already produced by [`url`](Self::url)
    /// or [`url_at`](Self::url_at), so both carry the same `timestamp` and `sign`.
    pub fn html_code_for_url<K, V>(&self, url: &str, attributes: impl IntoIterator<Item = (K, V)>) -> String
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut attrs: BTreeMap<String, String> = [
            ("frameborder", "0"),
            ("width", "750"),
            ("height", "800"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        attrs.extend(attributes.into_iter().map(|(k, v)| (k.into(), v.into())));

        let rendered: Vec<String> = attrs
            .iter()
            .map(|(name, value)| format!(r#"{}="{}""#, name, escape_attr(value)))
            .collect();

        format!(
            r#"<iframe src="{}" {}></iframe>"#,
            escape_attr(url),
            rendered.join(" ")
        )
    }
}

impl std::fmt::Debug for Widget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Widget")
            .field("app_key", &self.app_key)
            .field("api_type", &self.api_type)
            .field("uid", &self.uid)
            .field("widget_code", &self.widget_code)
            .field("products", &self.products.len())
            .field("skip_signature", &self.skip_signature)
            .finish_non_exhaustive()
    }
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pw_core::PeriodType;

    const TS: i64 = 1_700_000_000;

    fn goods_widget() -> Widget {
        Widget::new("app_key", "secret", ApiType::DigitalGoods, "user-1", "p1_1")
    }

    #[test]
    fn test_digital_goods_rejects_two_products_at_once() {
        let mut widget = goods_widget();
        let result = widget.append_products(vec![
            Product::fixed("a", "A", 1.0, "USD"),
            Product::fixed("b", "B", 2.0, "USD"),
        ]);

        assert!(matches!(result, Err(GatewayError::OnlyOneProductAllowed)));
        assert!(widget.products().is_empty());
    }

    #[test]
    fn test_digital_goods_rejects_second_append() {
        let mut widget = goods_widget();
        widget.append_product(Product::fixed("a", "A", 1.0, "USD")).unwrap();

        let result = widget.append_product(Product::fixed("b", "B", 2.0, "USD"));
        assert!(matches!(result, Err(GatewayError::OnlyOneProductAllowed)));
        assert_eq!(widget.products().len(), 1);
        assert_eq!(widget.products()[0].id, "a");
    }

    #[test]
    fn test_cart_accepts_many_products() {
        let mut widget = Widget::new("k", "s", ApiType::Cart, "u", "p1");
        widget
            .append_products(vec![
                Product::fixed("a", "A", 1.5, "USD"),
                Product::fixed("b", "B", 0.0, ""),
            ])
            .unwrap();

        let params = widget.params_at(TS);
        assert_eq!(params.get("external_ids[0]"), Some("a"));
        assert_eq!(params.get("prices[0]"), Some("1.5"));
        assert_eq!(params.get("currencies[0]"), Some("USD"));
        assert_eq!(params.get("external_ids[1]"), Some("b"));
        assert!(!params.contains_key("prices[1]"));
        assert!(!params.contains_key("currencies[1]"));
        assert_eq!(params.get("sign_version"), Some("2"));
        assert_eq!(params.get("sign").map(str::len), Some(32));
    }

    #[test]
    fn test_identity_params() {
        let widget = goods_widget().with_email("u@example.com");
        let params = widget.params_at(TS);

        assert_eq!(params.get("key"), Some("app_key"));
        assert_eq!(params.get("uid"), Some("user-1"));
        assert_eq!(params.get("widget"), Some("p1_1"));
        assert_eq!(params.get("email"), Some("u@example.com"));
        assert_eq!(params.get("timestamp"), Some("1700000000"));
        assert_eq!(params.get("ps"), Some("all"));
        assert_eq!(goods_widget().params_at(TS).get("email"), Some(""));
    }

    #[test]
    fn test_subscription_product_fields() {
        let mut widget = goods_widget();
        widget
            .append_product(Product::subscription("vip", "VIP", 9.99, "USD", 1, PeriodType::Month, true))
            .unwrap();

        let params = widget.params_at(TS);
        assert_eq!(params.get("amount"), Some("9.99"));
        assert_eq!(params.get("currencyCode"), Some("USD"));
        assert_eq!(params.get("ag_name"), Some("VIP"));
        assert_eq!(params.get("ag_external_id"), Some("vip"));
        assert_eq!(params.get("ag_type"), Some("subscription"));
        assert_eq!(params.get("ag_period_length"), Some("1"));
        assert_eq!(params.get("ag_period_type"), Some("month"));
        assert_eq!(params.get("ag_recurring"), Some("1"));
    }

    #[test]
    fn test_fixed_product_has_no_period_fields() {
        let mut widget = goods_widget();
        widget.append_product(Product::fixed("gems", "Gems", 5.0, "EUR")).unwrap();

        let params = widget.params_at(TS);
        assert_eq!(params.get("amount"), Some("5"));
        assert_eq!(params.get("ag_type"), Some("fixed"));
        assert!(!params.contains_key("ag_period_length"));
        assert!(!params.contains_key("ag_recurring"));
    }

    #[test]
    fn test_signature_covers_all_params() {
        let mut widget = goods_widget();
        widget.append_product(Product::fixed("gems", "Gems", 5.0, "EUR")).unwrap();

        let params = widget.params_at(TS);
        let sign = params.get("sign").unwrap().to_string();
        assert_eq!(params.get("sign_version"), Some("3"));
        assert_eq!(sign.len(), 64);
        assert!(SignatureEngine::new().verify(&params, Some("sign"), &sign, "secret", SignatureVersion::V3));
    }

    #[test]
    fn test_extra_params_override() {
        let mut widget = goods_widget();
        widget.set_extra_params([("sign_version", "2"), ("uid", "override")]);
        widget.set_callback_urls("https://shop/ok", "https://shop/fail");

        let params = widget.params_at(TS);
        assert_eq!(params.get("uid"), Some("override"));
        assert_eq!(params.get("sign_version"), Some("2"));
        assert_eq!(params.get("sign").map(str::len), Some(32));
        assert_eq!(params.get("success_url"), Some("https://shop/ok"));
        assert_eq!(params.get("failure_url"), Some("https://shop/fail"));
    }

    #[test]
    fn test_skip_signature_drops_sign_version() {
        let mut widget = goods_widget().with_skip_signature(true);
        widget.set_extra_param("sign_version", "3");

        let params = widget.params_at(TS);
        assert!(!params.contains_key("sign"));
        assert!(!params.contains_key("sign_version"));
    }

    #[test]
    fn test_url_uses_controller() {
        let vc = Widget::new("k", "s", ApiType::VirtualCurrency, "u", "p1");
        assert!(vc.url_at(TS).starts_with("https://api.paymentwall.com/api/ps?"));

        let cart = Widget::new("k", "s", ApiType::Cart, "u", "p1").with_api_base_url("http://localhost:9000/api");
        assert!(cart.url_at(TS).starts_with("http://localhost:9000/api/cart?"));

        let goods = goods_widget();
        let url = goods.url_at(TS);
        assert!(url.starts_with("https://api.paymentwall.com/api/subscription?"));
        assert!(url.contains("timestamp=1700000000"));
    }

    #[test]
    fn test_html_code() {
        let widget = goods_widget();
        let html = widget.html_code_for_url("https://w/x?a=1&b=2", [("width", "100%"), ("id", "pw")]);

        assert_eq!(
            html,
            r#"<iframe src="https://w/x?a=1&amp;b=2" frameborder="0" height="800" id="pw" width="100%"></iframe>"#
        );
    }

    #[test]
    fn test_html_code_embeds_given_url() {
        let widget = goods_widget();
        let url = widget.url_at(TS);
        let html = widget.html_code_for_url(&url, Vec::<(String, String)>::new());

        let src = format!(r#"src="{}""#, url.replace('&', "&amp;"));
        assert!(html.contains(&src));
    }
}
