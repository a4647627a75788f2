//! # Request Handlers
//!
//! Axum request handlers for the pingwall API.
//! Issues signed widget URLs and receives gateway pingbacks.

use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{ConnectInfo, RawQuery, State},
    http::{Extensions, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use pw_core::{GatewayError, Product};
use pw_gateway::dispatch_pingback;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use tracing::{error, info, instrument};

// =============================================================================
// Request/Response Types
// =============================================================================

/// Create widget request
#[derive(Debug, Deserialize)]
pub struct CreateWidgetRequest {
    /// Merchant user id
    pub uid: String,
    /// Convenience: single product_id (alternative to product_ids)
    #[serde(default)]
    pub product_id: Option<String>,
    /// Products for cart widgets
    #[serde(default)]
    pub product_ids: Vec<String>,
    /// User email (optional prefill)
    #[serde(default)]
    pub email: Option<String>,
    /// Redirect after successful payment
    #[serde(default)]
    pub success_url: Option<String>,
    /// Redirect after failed payment
    #[serde(default)]
    pub failure_url: Option<String>,
    /// Extra widget parameters, applied last
    #[serde(default)]
    pub extra_params: HashMap<String, String>,
}

/// Create widget response
#[derive(Debug, Serialize)]
pub struct CreateWidgetResponse {
    /// Signed widget URL (redirect user here)
    pub url: String,
    /// Embeddable iframe markup for the same URL
    pub html: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn gateway_error_to_response(err: GatewayError) -> ApiError {
    let code = err.status_code();
    let response = ErrorResponse::new(err.to_string(), code);
    (
        StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(response),
    )
}

// =============================================================================
// Handlers
// =============================================================================

/// Health check endpoint
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "pingwall",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Get products list
pub async fn list_products(State(state): State<AppState>) -> impl IntoResponse {
    let products: Vec<_> = state.catalog.active_products().collect();
    Json(serde_json::json!({
        "products": products,
        "count": products.len()
    }))
}

/// Create a signed widget URL
#[instrument(skip(state, request), fields(uid = %request.uid))]
pub async fn create_widget(
    State(state): State<AppState>,
    Json(request): Json<CreateWidgetRequest>,
) -> Result<Json<CreateWidgetResponse>, ApiError> {
    if request.uid.trim().is_empty() {
        return Err(gateway_error_to_response(GatewayError::InvalidRequest(
            "uid is required".to_string(),
        )));
    }

    let product_ids: Vec<&String> = request.product_id.iter().chain(&request.product_ids).collect();

    let mut products: Vec<Product> = Vec::with_capacity(product_ids.len());
    for id in product_ids {
        let product = state
            .catalog
            .get(id)
            .filter(|p| p.active)
            .ok_or_else(|| {
                gateway_error_to_response(GatewayError::ProductNotFound {
                    product_id: id.clone(),
                })
            })?;
        products.push(product.clone());
    }

    let mut widget = state.gateway.widget(request.uid.as_str());
    if let Some(email) = &request.email {
        widget = widget.with_email(email.as_str());
    }
    widget
        .append_products(products)
        .map_err(gateway_error_to_response)?;

    if let (Some(success), Some(failure)) = (&request.success_url, &request.failure_url) {
        widget.set_callback_urls(success.as_str(), failure.as_str());
    }
    widget.set_extra_params(request.extra_params);

    let url = widget.url();
    let html = widget.html_code_for_url(&url, Vec::<(String, String)>::new());

    info!(
        "Created widget: api_type={}, products={}",
        widget.api_type(),
        widget.products().len()
    );

    Ok(Json(CreateWidgetResponse { url, html }))
}

/// Receive a pingback sent as query parameters
pub async fn pingback_query(
    State(state): State<AppState>,
    headers: HeaderMap,
    extensions: Extensions,
    RawQuery(query): RawQuery,
) -> Result<&'static str, ApiError> {
    let query = query.unwrap_or_default();
    process_pingback(&state, &headers, &extensions, query.as_bytes())
}

/// Receive a pingback sent as a form body
pub async fn pingback_form(
    State(state): State<AppState>,
    headers: HeaderMap,
    extensions: Extensions,
    body: Bytes,
) -> Result<&'static str, ApiError> {
    process_pingback(&state, &headers, &extensions, &body)
}

/// Validate and dispatch; the gateway expects the body `OK` on success
#[instrument(skip_all)]
fn process_pingback(
    state: &AppState,
    headers: &HeaderMap,
    extensions: &Extensions,
    params: &[u8],
) -> Result<&'static str, ApiError> {
    let ip = source_ip(state, headers, extensions);
    let pingback = state.gateway.pingback_from_urlencoded(params, ip);

    let kind = dispatch_pingback(state.handler.as_ref(), &pingback, state.config.skips_ip_check())
        .map_err(|e| {
            error!("Pingback failed: {}", e);
            gateway_error_to_response(e)
        })?;

    info!(
        "Processed pingback: ref={}, kind={}, test={}",
        pingback.reference_id(),
        kind.as_str(),
        pingback.is_test()
    );

    Ok("OK")
}

/// Pingback source address: the client entry recorded by the trusted
/// proxies in `X-Forwarded-For`, else the socket peer
fn source_ip(state: &AppState, headers: &HeaderMap, extensions: &Extensions) -> String {
    if let Some(ip) = forwarded_client_ip(headers, state.config.trusted_proxy_hops) {
        return ip;
    }

    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_default()
}

/// Each proxy appends the address it received from, so with `hops` trusted
/// proxies the client is the `hops`-th entry from the right. Entries further
/// left are written by the client and ignored.
fn forwarded_client_ip(headers: &HeaderMap, hops: usize) -> Option<String> {
    if hops == 0 {
        return None;
    }

    let entries: Vec<&str> = headers
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect();

    entries
        .len()
        .checked_sub(hops)
        .and_then(|i| entries.get(i))
        .map(|ip| ip.to_string())
}
