//! # pw-gateway
//!
//! Paymentwall protocol support for pingwall-rs.
//!
//! This crate provides both directions of the integration:
//!
//! 1. **Widget** - signed checkout requests
//!    - Digital goods (one product), virtual currency and cart APIs
//!    - Signed URL or embeddable `<iframe>` markup
//!
//! 2. **Pingback** - payment notifications from the gateway
//!    - Required-parameter, origin and signature checks
//!    - Deliverable / cancelable / under-review classification
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pw_gateway::GatewayConfig;
//! use pw_core::Product;
//!
//! let config = GatewayConfig::from_env()?;
//!
//! let mut widget = config.widget("user-42");
//! widget.append_product(Product::fixed("gems-100", "100 Gems", 1.99, "USD"))?;
//!
//! // Redirect the user to widget.url()
//! ```
//!
//! ## Pingback Handling
//!
//! ```rust,ignore
//! use pw_gateway::{dispatch_pingback, PingbackHandler, Pingback};
//!
//! struct MyHandler;
//!
//! impl PingbackHandler for MyHandler {
//!     fn on_deliverable(&self, pingback: &Pingback) -> GatewayResult<()> {
//!         // Grant goods unless pingback.reference_id() was already processed
//!         Ok(())
//!     }
//! }
//!
//! // In your pingback endpoint:
//! let pingback = config.pingback(query_params, peer_ip);
//! dispatch_pingback(&MyHandler, &pingback, false)?;
//! // Respond with body "OK"
//! ```

pub mod config;
pub mod handler;
pub mod pingback;
pub mod widget;

// Re-exports
pub use config::GatewayConfig;
pub use handler::{dispatch_pingback, LoggingPingbackHandler, PingbackHandler};
pub use pingback::{
    CallbackKind, ChargebackReason, Pingback, PingbackType, ValidationError, ValidationOutcome,
};
pub use widget::Widget;
