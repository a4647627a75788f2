//! # pw-core
//!
//! Core types for the pingwall gateway integration.
//!
//! This crate provides:
//! - `ParameterSet` and its canonical signing string
//! - `SignatureVersion` and `SignatureEngine` (MD5 / SHA-256 signatures)
//! - `IpAllowlist` for pingback origin checks
//! - `ApiType` for the three gateway API surfaces
//! - `Product` and `ProductCatalog` for the fields widgets sign
//! - `GatewayError` for typed error handling
//!
//! Everything here is synchronous and free of I/O and logging.
//!
//! ## Example
//!
//! ```rust
//! use pw_core::{ParameterSet, SignatureEngine, SignatureVersion};
//!
//! let params = ParameterSet::new()
//!     .with("uid", "1")
//!     .with("type", "0")
//!     .with("ref", "r1");
//!
//! let engine = SignatureEngine::new();
//! let sig = engine.compute(&params, Some("sig"), "secret", SignatureVersion::V3);
//! assert!(engine.verify(&params, Some("sig"), &sig, "secret", SignatureVersion::V3));
//! ```

pub mod allowlist;
pub mod error;
pub mod params;
pub mod product;
pub mod signature;
pub mod surface;

// Re-exports for convenience
pub use allowlist::IpAllowlist;
pub use error::{GatewayError, GatewayResult};
pub use params::ParameterSet;
pub use product::{PeriodType, Product, ProductCatalog, ProductType};
pub use signature::{DigestEncoding, SignatureEngine, SignatureVersion};
pub use surface::ApiType;
