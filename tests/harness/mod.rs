// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test harness for driving the pastebin router in-process.
//!
//! Requests go through `tower::ServiceExt::oneshot` with a mocked peer
//! address, so no socket is bound.

#![allow(dead_code)]

pub mod generators;

use axum::{
    body::Body,
    extract::connect_info::MockConnectInfo,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use html_pastebin::{build_router, AppState, Config};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_PASSWORD: &str = "correct horse battery staple";
pub const PUBLIC_BASE: &str = "https://paste.example.test/";

/// An app instance backed by a private temp directory.
pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    _dir: TempDir,
}

/// Buffered response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        if self.body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&self.body).expect("response body is JSON")
        }
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.clone()).expect("response body is UTF-8")
    }
}

/// Build an app with throttles and login delay off, then apply `configure`.
pub async fn spawn_app(configure: impl FnOnce(&mut Config)) -> TestApp {
    let dir = tempfile::tempdir().unwrap();

    let mut config = Config::default();
    config.storage.sites_dir = dir.path().join("sites");
    config.public_base_url = PUBLIC_BASE.to_string();
    config.rate_limit.create_cooldown_ms = 0;
    config.rate_limit.login_cooldown_ms = 0;
    config.admin.username = ADMIN_USERNAME.to_string();
    config.admin.password = Some(ADMIN_PASSWORD.to_string());
    config.admin.login_delay_ms = 0;
    configure(&mut config);

    let state = Arc::new(AppState::new(config).await.unwrap());
    let router = build_router(state.clone())
        .layer(MockConnectInfo(SocketAddr::from(([203, 0, 113, 7], 4711))));

    TestApp {
        router,
        state,
        _dir: dir,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.send(Request::get(path).body(Body::empty()).unwrap())
            .await
    }

    pub async fn post_json(&self, path: &str, body: Value) -> TestResponse {
        self.send(json_request(Method::POST, path, body)).await
    }

    /// Create a site as the default client.
    pub async fn create(&self, content: &str, name: Option<&str>) -> TestResponse {
        let mut body = json!({ "content": content });
        if let Some(name) = name {
            body["name"] = json!(name);
        }
        self.post_json("/api/sites", body).await
    }

    /// Log in with the configured credentials and return the bearer token.
    pub async fn login(&self) -> String {
        let response = self
            .post_json(
                "/api/admin/login",
                json!({ "username": ADMIN_USERNAME, "password": ADMIN_PASSWORD }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "login failed: {}", response.text());
        response.json()["token"].as_str().unwrap().to_string()
    }

    /// Send an admin request with a bearer token.
    pub async fn admin(
        &self,
        method: Method,
        path: &str,
        token: &str,
        body: Option<Value>,
    ) -> TestResponse {
        let builder = Request::builder()
            .method(method)
            .uri(path)
            .header(header::AUTHORIZATION, format!("Bearer {token}"));
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }
}

pub fn json_request(method: Method, path: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}
