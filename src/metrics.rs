// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus metrics for the pastebin.

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Service counters, registered on a private registry.
pub struct Metrics {
    registry: Registry,
    pub sites_created: IntCounter,
    pub sites_served: IntCounter,
    pub requests_rejected: IntCounterVec,
    pub admin_logins: IntCounterVec,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let sites_created = IntCounter::new(
            "pastebin_sites_created_total",
            "Sites successfully created",
        )?;
        let sites_served = IntCounter::new(
            "pastebin_sites_served_total",
            "Site documents served",
        )?;
        let requests_rejected = IntCounterVec::new(
            Opts::new(
                "pastebin_requests_rejected_total",
                "Requests rejected, by error code",
            ),
            &["reason"],
        )?;
        let admin_logins = IntCounterVec::new(
            Opts::new("pastebin_admin_logins_total", "Admin login attempts"),
            &["outcome"],
        )?;

        registry.register(Box::new(sites_created.clone()))?;
        registry.register(Box::new(sites_served.clone()))?;
        registry.register(Box::new(requests_rejected.clone()))?;
        registry.register(Box::new(admin_logins.clone()))?;

        Ok(Self {
            registry,
            sites_created,
            sites_served,
            requests_rejected,
            admin_logins,
        })
    }

    pub fn reject(&self, reason: &str) {
        self.requests_rejected.with_label_values(&[reason]).inc();
    }

    /// Render all metrics in the Prometheus text format.
    pub fn render(&self) -> prometheus::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
