// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the HTML pastebin service.
//!
//! Creation runs sanitize → name check → throttle → allocate/store. Retrieval maps the
//! path segment straight onto the store and serves the document with
//! anti-framing and anti-exfiltration headers. Admin routes require a bearer
//! session token issued by `/api/admin/login`.

use crate::admin::{AdminGate, Session};
use crate::config::Config;
use crate::error::{Result, SiteError, ValidationError};
use crate::limiter::{RateLimitResult, Throttle};
use crate::metrics::Metrics;
use crate::name::{NameAllocator, SiteName};
use crate::sanitizer::ContentSanitizer;
use crate::store::{Site, SiteStore, SiteSummary};
use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequest, FromRequestParts, Path, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error, info};
use url::Url;

/// Content-Security-Policy applied to every served site.
///
/// Inline scripts stay allowed (it is a playground), but forms cannot submit
/// and scripts cannot make outbound requests.
pub const SITE_CSP: &str = "default-src 'self' 'unsafe-inline' 'unsafe-eval' data: https:; \
form-action 'none'; connect-src 'none'; object-src 'none'; base-uri 'none'; frame-ancestors 'none'";

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub public_base: Url,
    pub store: SiteStore,
    pub allocator: NameAllocator,
    pub sanitizer: ContentSanitizer,
    pub create_throttle: Throttle,
    pub login_throttle: Throttle,
    pub gate: AdminGate,
    pub metrics: Metrics,
}

impl AppState {
    /// Build the state, creating the sites directory if needed.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let mut base = config.public_base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let public_base = Url::parse(&base)?;
        let store = SiteStore::open(&config.storage.sites_dir).await?;

        Ok(Self {
            public_base,
            store,
            allocator: NameAllocator::new(config.names.clone()),
            sanitizer: ContentSanitizer::new(config.content.clone()),
            create_throttle: Throttle::new("create", config.rate_limit.create_cooldown()),
            login_throttle: Throttle::new("login", config.rate_limit.login_cooldown()),
            gate: AdminGate::new(&config.admin)?,
            metrics: Metrics::new()?,
            config,
        })
    }

    /// Public URL of a site.
    pub fn site_url(&self, name: &SiteName) -> Result<Url> {
        self.public_base
            .join(name.as_str())
            .map_err(|e| SiteError::Internal(format!("cannot build site URL: {e}")))
    }

    /// Throttle key for a request: the peer IP, or the first forwarded hop when trusted.
    pub fn client_key(&self, peer: SocketAddr, headers: &HeaderMap) -> String {
        if self.config.rate_limit.trust_forwarded_for {
            let forwarded = headers
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty());
            if let Some(client) = forwarded {
                return client.to_string();
            }
        }
        peer.ip().to_string()
    }

    /// Sweep both throttles.
    pub async fn sweep(&self) {
        let removed =
            self.create_throttle.cleanup().await + self.login_throttle.cleanup().await;
        if removed > 0 {
            debug!(removed, "Evicted stale throttle entries");
        }
    }
}

/// JSON request body whose rejections are reported as [`SiteError`].
#[derive(FromRequest)]
#[from_request(via(Json), rejection(SiteError))]
pub struct JsonBody<T>(pub T);

/// Path parameters whose rejections are reported as [`SiteError`].
#[derive(FromRequestParts)]
#[from_request(via(Path), rejection(SiteError))]
pub struct SitePath<T>(pub T);

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Site creation request.
#[derive(Debug, Deserialize)]
pub struct CreateSiteRequest {
    pub content: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Site creation response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSiteResponse {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_name: Option<String>,
}

/// Admin login request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Rename request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameRequest {
    pub new_name: String,
}

/// Rename response.
#[derive(Debug, Serialize)]
pub struct RenameResponse {
    pub name: String,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "html-pastebin",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Prometheus scrape endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
            body,
        )
            .into_response(),
        Err(e) => SiteError::Internal(e.to_string()).into_response(),
    }
}

/// Create a site from pasted HTML.
pub async fn create_site(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    JsonBody(req): JsonBody<CreateSiteRequest>,
) -> Result<(StatusCode, Json<CreateSiteResponse>)> {
    let client = state.client_key(peer, &headers);
    debug!(%client, bytes = req.content.len(), name = ?req.name, "Processing site creation");

    let created = create_inner(&state, &client, &req).await;
    match created {
        Ok(response) => {
            state.metrics.sites_created.inc();
            Ok((StatusCode::CREATED, Json(response)))
        }
        Err(err) => {
            info!(%client, code = err.code(), error = %err, "Site creation rejected");
            state.metrics.reject(err.code());
            Err(err)
        }
    }
}

async fn create_inner(
    state: &AppState,
    client: &str,
    req: &CreateSiteRequest,
) -> Result<CreateSiteResponse> {
    let document = state.sanitizer.sanitize(&req.content)?;

    // Reject bad or taken names before charging the cooldown. A name lost to
    // a concurrent writer after this point still counts as an attempt.
    if let Some(name) = NameAllocator::requested_name(req.name.as_deref())? {
        if state.store.exists(name.as_str()).await? {
            return Err(SiteError::NameTaken(name.to_string()));
        }
    }

    if let RateLimitResult::Limited { retry_after } = state.create_throttle.check(client).await {
        return Err(SiteError::RateLimited { retry_after });
    }

    let allocation = state
        .allocator
        .create_site(&state.store, req.name.as_deref(), &document)
        .await?;
    let url = state.site_url(&allocation.name)?;

    info!(%client, name = %allocation.name, generated = allocation.generated, "Site published");
    Ok(CreateSiteResponse {
        url: url.to_string(),
        generated_name: allocation.generated.then(|| allocation.name.to_string()),
    })
}

/// Serve a stored site.
pub async fn serve_site(
    State(state): State<Arc<AppState>>,
    SitePath(site_name): SitePath<String>,
) -> Response {
    match state.store.read(&site_name).await {
        Ok(html) => {
            state.metrics.sites_served.inc();
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "text/html; charset=utf-8"),
                    (header::X_FRAME_OPTIONS, "DENY"),
                    (header::CONTENT_SECURITY_POLICY, SITE_CSP),
                    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
                    (header::REFERRER_POLICY, "no-referrer"),
                ],
                html,
            )
                .into_response()
        }
        Err(SiteError::Validation(_)) => {
            debug!(name = %site_name.escape_debug(), "Rejected invalid site name");
            (
                StatusCode::BAD_REQUEST,
                Html(status_page(
                    "Invalid site name",
                    "Site names may only contain letters, digits, '-' and '_'.",
                )),
            )
                .into_response()
        }
        Err(SiteError::NotFound(_)) => (
            StatusCode::NOT_FOUND,
            Html(status_page("Site not found", "No site is published under this name.")),
        )
            .into_response(),
        Err(err) => {
            error!(name = %site_name, error = %err, "Failed to read site");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(status_page("Error", "The site could not be loaded.")),
            )
                .into_response()
        }
    }
}

fn status_page(title: &str, message: &str) -> String {
    format!(
        r#"<!doctype html>
<html><head><meta charset="utf-8"><title>{title}</title></head>
<body><h1>{title}</h1><p>{message}</p></body></html>"#
    )
}

/// Proof that the request carried a valid admin session token.
pub struct AdminSession;

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminSession {
    type Rejection = SiteError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> std::result::Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim);

        match token {
            Some(token) if state.gate.verify(token) => Ok(AdminSession),
            _ => {
                debug!("Admin request without a valid session");
                Err(SiteError::Unauthorized)
            }
        }
    }
}

/// Exchange admin credentials for a session token.
pub async fn admin_login(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<Json<Session>> {
    let client = state.client_key(peer, &headers);

    if let RateLimitResult::Limited { retry_after } = state.login_throttle.check(&client).await {
        info!(%client, "Admin login throttled");
        let err = SiteError::RateLimited { retry_after };
        state.metrics.reject(err.code());
        return Err(err);
    }

    match state.gate.login(&req.username, &req.password).await {
        Some(session) => {
            state.metrics.admin_logins.with_label_values(&["success"]).inc();
            Ok(Json(session))
        }
        None => {
            info!(%client, "Admin login failed");
            state.metrics.admin_logins.with_label_values(&["failure"]).inc();
            Err(SiteError::Unauthorized)
        }
    }
}

/// List all sites, newest first.
pub async fn list_sites(
    _session: AdminSession,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SiteSummary>>> {
    Ok(Json(state.store.list().await?))
}

/// Full content of one site, for previewing.
pub async fn get_site(
    _session: AdminSession,
    State(state): State<Arc<AppState>>,
    SitePath(name): SitePath<String>,
) -> Result<Json<Site>> {
    Ok(Json(state.store.get(&name).await?))
}

/// Rename a site.
pub async fn rename_site(
    _session: AdminSession,
    State(state): State<Arc<AppState>>,
    SitePath(name): SitePath<String>,
    JsonBody(req): JsonBody<RenameRequest>,
) -> Result<Json<RenameResponse>> {
    let target = SiteName::parse(&req.new_name)?;
    if target.is_reserved() {
        return Err(ValidationError::ReservedName(target.to_string()).into());
    }
    state.store.rename(&name, target.as_str()).await?;
    Ok(Json(RenameResponse {
        name: target.to_string(),
    }))
}

/// Delete a site.
pub async fn delete_site(
    _session: AdminSession,
    State(state): State<Arc<AppState>>,
    SitePath(name): SitePath<String>,
) -> Result<StatusCode> {
    state.store.delete(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}
