// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Route table for the pastebin service.

use crate::handlers::{
    admin_login, create_site, delete_site, get_site, health, list_sites, metrics, rename_site,
    serve_site, AppState,
};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Headroom over the content limit for JSON escaping and the envelope.
const BODY_OVERHEAD: usize = 64 * 1024;

/// Build the application router.
///
/// Static routes take priority over the `/:name` catch-all, and the reserved
/// site names keep the two from overlapping.
pub fn build_router(state: Arc<AppState>) -> Router {
    // JSON may escape each byte of content up to six bytes (`\u00XX`).
    let body_limit = state.config.content.max_bytes.saturating_mul(6) + BODY_OVERHEAD;

    let mut router = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/api/sites", post(create_site))
        .route("/api/admin/login", post(admin_login))
        .route("/api/admin/sites", get(list_sites))
        .route("/api/admin/sites/:name", get(get_site).delete(delete_site))
        .route("/api/admin/sites/:name/rename", post(rename_site))
        .route("/:name", get(serve_site));

    if state.config.metrics.enabled {
        router = router.route("/metrics", get(metrics));
    }

    router
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
