// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTML Pastebin
//!
//! Stores pasted HTML documents under short names and serves them back at
//! `/<name>`:
//!
//! - Name allocation (explicit or random, collision-safe)
//! - Structural checks and a mandatory warning banner on every document
//! - Flat-directory storage with atomic create and rename
//! - Per-client cooldown throttling for creation and admin login
//! - Admin API (list, preview, rename, delete) behind signed session tokens

pub mod admin;
pub mod config;
pub mod error;
pub mod handlers;
pub mod limiter;
pub mod metrics;
pub mod name;
pub mod router;
pub mod sanitizer;
pub mod store;

pub use config::Config;
pub use error::{SiteError, ValidationError};
pub use handlers::AppState;
pub use limiter::{RateLimitResult, Throttle};
pub use name::{NameAllocator, SiteName};
pub use router::build_router;
pub use sanitizer::ContentSanitizer;
pub use store::SiteStore;
