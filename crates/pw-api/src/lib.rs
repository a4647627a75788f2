//! # pw-api
//!
//! HTTP API layer for pingwall-rs.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - Signed widget URLs for the product catalog
//! - The pingback endpoint the gateway calls after payment events
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | GET | `/api/v1/products` | List active products |
//! | POST | `/api/v1/widget` | Create signed widget URL |
//! | GET | `/pingback` | Pingback (query parameters) |
//! | POST | `/pingback` | Pingback (form body) |

pub mod handlers;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppConfig, AppState};
