//! # Pingwall
//!
//! Widget signing and pingback validation server.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export PAYMENTWALL_APP_KEY=...
//! export PAYMENTWALL_SECRET_KEY=...
//! export PAYMENTWALL_API_TYPE=digital_goods
//!
//! # Run the server
//! pingwall
//! ```

use pw_api::{routes, state::AppState};
use std::net::SocketAddr;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    print_banner();

    let state = AppState::new()?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Products loaded: {}", state.catalog.products.len());
    info!("API type: {}", state.gateway.api_type);

    if state.config.skips_ip_check() {
        warn!("Pingback origin check is disabled");
    } else if state.config.skip_ip_check {
        warn!("PINGBACK_SKIP_IP_CHECK ignored in production");
    }

    let app = routes::create_router(state);

    info!("Pingwall starting on http://{}", addr);

    if !is_prod {
        info!("Health: http://{}/health", addr);
        info!("Widget: POST http://{}/api/v1/widget", addr);
        info!("Pingback: GET|POST http://{}/pingback", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
  Pingwall RS
  ━━━━━━━━━━━━━━━━━━━━━━━
  Widget signing & pingback validation
  Version: {}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
