// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Site names and name allocation.
//!
//! A [`SiteName`] can only be built from a string matching
//! `[A-Za-z0-9_-]+`, so holding one means the value is safe to use as a
//! file stem in the flat sites directory: no separators, no dot segments.
//!
//! [`NameAllocator`] resolves the final name for a new site. Explicit names
//! that are taken are rejected; empty candidates get a random name, retried
//! on collision. Uniqueness comes from the store's atomic create, never from
//! a separate existence check.

use crate::config::NameConfig;
use crate::error::{Result, SiteError, ValidationError};
use crate::store::SiteStore;
use rand::{distributions::Alphanumeric, Rng};
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

/// Longest accepted site name, in bytes.
pub const MAX_NAME_LEN: usize = 128;

/// Names that would shadow service routes.
const RESERVED_NAMES: &[&str] = &["admin", "api", "health", "healthz", "metrics"];

/// A validated site name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SiteName(String);

impl SiteName {
    /// Validate `raw` against the site name pattern.
    pub fn parse(raw: &str) -> std::result::Result<Self, ValidationError> {
        if raw.is_empty() || !raw.bytes().all(is_name_byte) {
            return Err(ValidationError::InvalidName(raw.to_string()));
        }
        if raw.len() > MAX_NAME_LEN {
            return Err(ValidationError::NameTooLong { max: MAX_NAME_LEN });
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of the stored document.
    pub fn file_name(&self) -> String {
        format!("{}.html", self.0)
    }

    /// Whether the name collides with a service route.
    pub fn is_reserved(&self) -> bool {
        RESERVED_NAMES
            .iter()
            .any(|reserved| reserved.eq_ignore_ascii_case(&self.0))
    }
}

impl fmt::Display for SiteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SiteName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}

/// Outcome of a successful allocation.
#[derive(Debug, Clone)]
pub struct Allocation {
    pub name: SiteName,
    /// True when the name was generated rather than chosen by the caller
    pub generated: bool,
}

/// Resolves names for new sites and creates them.
pub struct NameAllocator {
    config: NameConfig,
}

impl NameAllocator {
    /// Create a new allocator with the given configuration.
    pub fn new(config: NameConfig) -> Self {
        Self { config }
    }

    /// Generate a random alphanumeric name that is not reserved.
    pub fn generate(&self) -> SiteName {
        let min = self.config.min_generated_len.max(1);
        let max = self.config.max_generated_len.clamp(min, MAX_NAME_LEN);
        let mut rng = rand::thread_rng();

        loop {
            let len = rng.gen_range(min..=max);
            let candidate: String = (&mut rng)
                .sample_iter(&Alphanumeric)
                .take(len)
                .map(char::from)
                .collect();
            let name = SiteName(candidate);
            if !name.is_reserved() {
                return name;
            }
        }
    }

    /// Resolve a caller-supplied candidate.
    ///
    /// An absent or empty candidate yields `None`. Anything else must be a
    /// valid, unreserved name as given; surrounding whitespace is not stripped.
    pub fn requested_name(
        candidate: Option<&str>,
    ) -> std::result::Result<Option<SiteName>, ValidationError> {
        let Some(raw) = candidate.filter(|c| !c.is_empty()) else {
            return Ok(None);
        };
        let name = SiteName::parse(raw)?;
        if name.is_reserved() {
            return Err(ValidationError::ReservedName(name.to_string()));
        }
        Ok(Some(name))
    }

    /// Store `content` under the caller's `candidate` or a generated name.
    ///
    /// An empty candidate means "pick one for me". A taken explicit name fails
    /// with [`SiteError::NameTaken`] rather than falling back to a random name.
    pub async fn create_site(
        &self,
        store: &SiteStore,
        candidate: Option<&str>,
        content: &str,
    ) -> Result<Allocation> {
        match Self::requested_name(candidate)? {
            Some(name) => match store.create(name.as_str(), content).await {
                Ok(()) => Ok(Allocation {
                    name,
                    generated: false,
                }),
                Err(SiteError::AlreadyExists(taken)) => {
                    debug!(name = %taken, "Requested site name is taken");
                    Err(SiteError::NameTaken(taken))
                }
                Err(err) => Err(err),
            },
            None => self.create_generated(store, content).await,
        }
    }

    async fn create_generated(&self, store: &SiteStore, content: &str) -> Result<Allocation> {
        let attempts = self.config.max_attempts.max(1);
        for attempt in 1..=attempts {
            let name = self.generate();
            match store.create(name.as_str(), content).await {
                Ok(()) => {
                    if attempt > 1 {
                        info!(%name, attempt, "Generated site name after collisions");
                    }
                    return Ok(Allocation {
                        name,
                        generated: true,
                    });
                }
                Err(SiteError::AlreadyExists(_)) => {
                    debug!(%name, attempt, "Generated site name collided, retrying");
                }
                Err(err) => return Err(err),
            }
        }

        warn!(attempts, "Exhausted attempts to generate a free site name");
        Err(SiteError::NamesExhausted { attempts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SiteStore;

    const DOC: &str = "<html><body>hi</body></html>";

    #[test]
    fn test_parse_accepts_pattern() {
        for name in ["abc", "A-b_9", "-", "_", "x".repeat(MAX_NAME_LEN).as_str()] {
            assert!(SiteName::parse(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn test_parse_rejects_traversal_and_separators() {
        for name in ["", "..", "../etc/passwd", "a/b", "a\\b", "a.html", "a b", "ünï", "a\0b"] {
            assert!(
                matches!(SiteName::parse(name), Err(ValidationError::InvalidName(_))),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_rejects_long_names() {
        let long = "a".repeat(MAX_NAME_LEN + 1);
        assert_eq!(
            SiteName::parse(&long),
            Err(ValidationError::NameTooLong { max: MAX_NAME_LEN })
        );
    }

    #[test]
    fn test_generated_names_follow_config() {
        let allocator = NameAllocator::new(NameConfig::default());
        for _ in 0..200 {
            let name = allocator.generate();
            assert!((6..=9).contains(&name.as_str().len()));
            assert!(name.as_str().bytes().all(|b| b.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn test_reserved_names_case_insensitive() {
        assert!(SiteName::parse("Metrics").unwrap().is_reserved());
        assert!(!SiteName::parse("metricsx").unwrap().is_reserved());
    }

    #[tokio::test]
    async fn test_explicit_name_taken_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = SiteStore::open(dir.path()).await.unwrap();
        let allocator = NameAllocator::new(NameConfig::default());

        let first = allocator.create_site(&store, Some("mine"), DOC).await.unwrap();
        assert_eq!(first.name.as_str(), "mine");
        assert!(!first.generated);

        let second = allocator.create_site(&store, Some("mine"), DOC).await;
        assert!(matches!(second, Err(SiteError::NameTaken(n)) if n == "mine"));
    }

    #[tokio::test]
    async fn test_empty_candidate_generates() {
        let dir = tempfile::tempdir().unwrap();
        let store = SiteStore::open(dir.path()).await.unwrap();
        let allocator = NameAllocator::new(NameConfig::default());

        let allocation = allocator.create_site(&store, Some(""), DOC).await.unwrap();
        assert!(allocation.generated);
        assert_eq!(store.read(allocation.name.as_str()).await.unwrap(), DOC);
    }

    #[test]
    fn test_requested_name_is_not_trimmed() {
        assert_eq!(NameAllocator::requested_name(None), Ok(None));
        assert_eq!(NameAllocator::requested_name(Some("")), Ok(None));
        assert_eq!(
            NameAllocator::requested_name(Some("mine")),
            Ok(Some(SiteName::parse("mine").unwrap()))
        );
        for raw in [" mine ", "mine\n", "   "] {
            assert!(
                matches!(
                    NameAllocator::requested_name(Some(raw)),
                    Err(ValidationError::InvalidName(_))
                ),
                "{raw:?} should be rejected"
            );
        }
        assert!(matches!(
            NameAllocator::requested_name(Some("health")),
            Err(ValidationError::ReservedName(_))
        ));
    }

    #[tokio::test]
    async fn test_reserved_candidate_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = SiteStore::open(dir.path()).await.unwrap();
        let allocator = NameAllocator::new(NameConfig::default());

        let result = allocator.create_site(&store, Some("api"), DOC).await;
        assert!(matches!(
            result,
            Err(SiteError::Validation(ValidationError::ReservedName(_)))
        ));
    }

    #[tokio::test]
    async fn test_generation_exhausts_when_space_is_full() {
        let dir = tempfile::tempdir().unwrap();
        let store = SiteStore::open(dir.path()).await.unwrap();
        // One-character names over 62 symbols; fill them all.
        let allocator = NameAllocator::new(NameConfig {
            min_generated_len: 1,
            max_generated_len: 1,
            max_attempts: 4,
        });
        for b in (b'0'..=b'9').chain(b'A'..=b'Z').chain(b'a'..=b'z') {
            let name = (b as char).to_string();
            store.create(&name, DOC).await.unwrap();
        }

        let result = allocator.create_site(&store, None, DOC).await;
        assert!(matches!(result, Err(SiteError::NamesExhausted { attempts: 4 })));
    }
}
