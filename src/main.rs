// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTML Pastebin Service
//!
//! Accepts pasted HTML, stores it under a short name and serves it back with
//! a warning banner and a restrictive Content-Security-Policy.
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables (or a `.env` file):
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `PUBLIC_BASE_URL`: Base of returned site URLs (default: http://localhost:8080/)
//! - `SITES_DIR`: Directory holding the sites (default: public/sites)
//! - `CREATE_COOLDOWN_MS`: Minimum spacing between creations per client (default: 10000)
//! - `ADMIN_PASSWORD`: Admin password; admin API is disabled when unset

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use html_pastebin::{build_router, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let config = Config::from_env();
    info!(
        bind_addr = %config.bind_addr,
        public_base_url = %config.public_base_url,
        sites_dir = %config.storage.sites_dir.display(),
        create_cooldown_ms = config.rate_limit.create_cooldown_ms,
        max_content_bytes = config.content.max_bytes,
        "Starting HTML pastebin"
    );

    let state = Arc::new(AppState::new(config.clone()).await?);

    // Spawn throttle sweep task
    let sweep_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_state.config.rate_limit.sweep_interval());
        loop {
            interval.tick().await;
            sweep_state.sweep().await;
        }
    });

    let app = build_router(state);

    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
