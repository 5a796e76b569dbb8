// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Admin credential gate and session tokens.
//!
//! Credentials are compared as BLAKE3 digests (`blake3::Hash` equality is
//! constant time) after a fixed delay that applies to every attempt.
//! A successful login yields a stateless token:
//!
//! ```text
//! <expires_unix>.<nonce_hex>.<mac_hex>
//! mac = BLAKE3-keyed(session_key, "<expires_unix>.<nonce_hex>")
//! ```

use crate::config::AdminConfig;
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Longest accepted session lifetime.
pub const MAX_SESSION_TTL: Duration = Duration::from_secs(366 * 24 * 60 * 60);

/// Errors building the gate from configuration.
#[derive(Debug, Error)]
pub enum AdminConfigError {
    #[error("ADMIN_SESSION_KEY must be 64 hex characters")]
    InvalidSessionKey,

    #[error("ADMIN_SESSION_TTL_SECS must be between 1 and {max} seconds, got {secs}")]
    InvalidSessionTtl { secs: u64, max: u64 },
}

/// An issued admin session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Static-credential admin gate.
pub struct AdminGate {
    username: blake3::Hash,
    password: Option<blake3::Hash>,
    delay: Duration,
    session_ttl: chrono::Duration,
    key: [u8; 32],
}

impl AdminGate {
    pub fn new(config: &AdminConfig) -> Result<Self, AdminConfigError> {
        let key = match config.session_key.as_deref() {
            Some(hex) => *blake3::Hash::from_hex(hex.trim())
                .map_err(|_| AdminConfigError::InvalidSessionKey)?
                .as_bytes(),
            None => rand::random(),
        };

        let ttl = config.session_ttl();
        let invalid_ttl = || AdminConfigError::InvalidSessionTtl {
            secs: config.session_ttl_secs,
            max: MAX_SESSION_TTL.as_secs(),
        };
        if ttl.is_zero() || ttl > MAX_SESSION_TTL {
            return Err(invalid_ttl());
        }
        let session_ttl = chrono::Duration::from_std(ttl).map_err(|_| invalid_ttl())?;

        if config.password.is_none() {
            warn!("ADMIN_PASSWORD is not set, admin access is disabled");
        }

        Ok(Self {
            username: blake3::hash(config.username.as_bytes()),
            password: config.password.as_deref().map(|p| blake3::hash(p.as_bytes())),
            delay: config.login_delay(),
            session_ttl,
            key,
        })
    }

    /// Whether an admin password is configured at all.
    pub fn is_enabled(&self) -> bool {
        self.password.is_some()
    }

    /// Compare credentials against the configured values after the login delay.
    pub async fn authenticate(&self, username: &str, password: &str) -> bool {
        tokio::time::sleep(self.delay).await;

        let Some(expected_password) = self.password else {
            return false;
        };
        // Evaluate both comparisons so timing does not reveal which one failed.
        let user_ok = blake3::hash(username.as_bytes()) == self.username;
        let pass_ok = blake3::hash(password.as_bytes()) == expected_password;
        user_ok & pass_ok
    }

    /// Authenticate and issue a session token on success.
    pub async fn login(&self, username: &str, password: &str) -> Option<Session> {
        if !self.authenticate(username, password).await {
            info!("Admin login rejected");
            return None;
        }
        let session = self.issue(Utc::now());
        info!(expires_at = %session.expires_at, "Admin login accepted");
        Some(session)
    }

    /// Issue a session valid for the configured TTL from `now`.
    pub fn issue(&self, now: DateTime<Utc>) -> Session {
        let expires_at = now + self.session_ttl;
        let payload = format!(
            "{}.{:032x}",
            expires_at.timestamp(),
            rand::random::<u128>()
        );
        let mac = blake3::keyed_hash(&self.key, payload.as_bytes());
        Session {
            token: format!("{payload}.{}", mac.to_hex()),
            expires_at: Utc
                .timestamp_opt(expires_at.timestamp(), 0)
                .single()
                .unwrap_or(expires_at),
        }
    }

    /// Verify a token's signature and expiry.
    pub fn verify(&self, token: &str) -> bool {
        self.verify_at(token, Utc::now())
    }

    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> bool {
        let Some((payload, mac_hex)) = token.rsplit_once('.') else {
            return false;
        };
        let Some((expires, _nonce)) = payload.split_once('.') else {
            return false;
        };
        let Ok(mac) = blake3::Hash::from_hex(mac_hex) else {
            return false;
        };
        if blake3::keyed_hash(&self.key, payload.as_bytes()) != mac {
            return false;
        }
        match expires.parse::<i64>() {
            Ok(expires) => now.timestamp() < expires,
            Err(_) => false,
        }
    }
}
