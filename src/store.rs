// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Filesystem-backed site storage.
//!
//! Layout is a single flat directory with one `<name>.html` per site. Every
//! operation parses its name argument into a [`SiteName`] before any path is
//! built, so traversal attempts never reach the filesystem.
//!
//! Publication is atomic: content is written to a hidden temp file, fsynced,
//! then hard-linked into place. `hard_link` fails when the target exists,
//! which gives create-if-absent semantics even across processes. Mutations
//! take the write half of an `RwLock` and reads take the read half, so a
//! rename is never observed half-done.

use crate::error::{Result, SiteError, ValidationError};
use crate::name::SiteName;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Characters of content included in list previews.
pub const PREVIEW_CHARS: usize = 200;

/// A stored site with its full content.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub name: SiteName,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Listing entry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteSummary {
    pub name: SiteName,
    pub content_preview: String,
    pub created_at: DateTime<Utc>,
}

/// Site store rooted at a flat directory.
pub struct SiteStore {
    root: PathBuf,
    lock: RwLock<()>,
}

impl SiteStore {
    /// Open (and create if needed) the sites directory.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        debug!(root = %root.display(), "Opened site store");
        Ok(Self {
            root,
            lock: RwLock::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, name: &SiteName) -> PathBuf {
        self.root.join(name.file_name())
    }

    /// Store `content` under `name`, failing if the name is already used.
    pub async fn create(&self, name: &str, content: &str) -> Result<()> {
        let name = SiteName::parse(name)?;
        let target = self.path_for(&name);
        let temp = self.root.join(format!(".{}.{:016x}.tmp", name, rand::random::<u64>()));

        let _guard = self.lock.write().await;

        if let Err(err) = write_synced(&temp, content).await {
            let _ = fs::remove_file(&temp).await;
            return Err(err.into());
        }
        let published = fs::hard_link(&temp, &target).await;
        if let Err(err) = fs::remove_file(&temp).await {
            warn!(path = %temp.display(), error = %err, "Failed to remove temp file");
        }

        published.map_err(|err| SiteError::from_io(err, name.as_str()))?;
        info!(%name, bytes = content.len(), "Site created");
        Ok(())
    }

    /// Read the content stored under `name`.
    pub async fn read(&self, name: &str) -> Result<String> {
        let name = SiteName::parse(name)?;
        let _guard = self.lock.read().await;
        fs::read_to_string(self.path_for(&name))
            .await
            .map_err(|err| SiteError::from_io(err, name.as_str()))
    }

    /// Read a site with its creation time.
    pub async fn get(&self, name: &str) -> Result<Site> {
        let name = SiteName::parse(name)?;
        let path = self.path_for(&name);
        let _guard = self.lock.read().await;

        let metadata = fs::metadata(&path)
            .await
            .map_err(|err| SiteError::from_io(err, name.as_str()))?;
        let content = fs::read_to_string(&path)
            .await
            .map_err(|err| SiteError::from_io(err, name.as_str()))?;
        Ok(Site {
            name,
            content,
            created_at: created_at(&metadata),
        })
    }

    /// Whether a site with `name` exists.
    pub async fn exists(&self, name: &str) -> Result<bool> {
        let name = SiteName::parse(name)?;
        let _guard = self.lock.read().await;
        Ok(fs::try_exists(self.path_for(&name)).await?)
    }

    /// All sites, newest first.
    pub async fn list(&self) -> Result<Vec<SiteSummary>> {
        let _guard = self.lock.read().await;
        let mut entries = fs::read_dir(&self.root).await?;
        let mut sites = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(name) = file_name
                .to_str()
                .and_then(|f| f.strip_suffix(".html"))
                .and_then(|stem| SiteName::parse(stem).ok())
            else {
                continue;
            };

            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let content = match fs::read_to_string(entry.path()).await {
                Ok(content) => content,
                Err(err) => {
                    warn!(%name, error = %err, "Skipping unreadable site");
                    continue;
                }
            };

            sites.push(SiteSummary {
                content_preview: content.chars().take(PREVIEW_CHARS).collect(),
                created_at: created_at(&metadata),
                name,
            });
        }

        sites.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(sites)
    }

    /// Move a site to a new name. The destination must not exist.
    pub async fn rename(&self, old: &str, new: &str) -> Result<()> {
        let old = SiteName::parse(old)?;
        let new = SiteName::parse(new)?;
        if old == new {
            return Err(ValidationError::SameName.into());
        }
        let from = self.path_for(&old);
        let to = self.path_for(&new);

        let _guard = self.lock.write().await;

        if fs::try_exists(&to).await? {
            return Err(SiteError::AlreadyExists(new.to_string()));
        }
        if !fs::try_exists(&from).await? {
            return Err(SiteError::NotFound(old.to_string()));
        }

        fs::hard_link(&from, &to).await.map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => SiteError::NotFound(old.to_string()),
            _ => SiteError::from_io(err, new.as_str()),
        })?;

        if let Err(err) = fs::remove_file(&from).await {
            // Roll back so only the old name remains.
            if let Err(rollback) = fs::remove_file(&to).await {
                warn!(%new, error = %rollback, "Failed to roll back rename");
            }
            return Err(err.into());
        }

        info!(from = %old, to = %new, "Site renamed");
        Ok(())
    }

    /// Delete the site stored under `name`.
    pub async fn delete(&self, name: &str) -> Result<()> {
        let name = SiteName::parse(name)?;
        let _guard = self.lock.write().await;
        fs::remove_file(self.path_for(&name))
            .await
            .map_err(|err| SiteError::from_io(err, name.as_str()))?;
        info!(%name, "Site deleted");
        Ok(())
    }
}

async fn write_synced(path: &Path, content: &str) -> std::io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(content.as_bytes()).await?;
    file.sync_all().await
}

fn created_at(metadata: &std::fs::Metadata) -> DateTime<Utc> {
    metadata
        .created()
        .or_else(|_| metadata.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| DateTime::<Utc>::from(SystemTime::UNIX_EPOCH))
}
