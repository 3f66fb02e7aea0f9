// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 VPN Tunnel Controller Contributors

// VPN Tunnel Controller - Profile Store Module
// File-backed profile persistence, one TOML file per profile

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::platform::ProfileStore;
use crate::types::TunnelProfile;

/// Get the default profiles directory path
pub fn default_profiles_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;
    Ok(config_dir.join("vpn-tunnel-controller").join("profiles"))
}

/// Profile store keeping each profile in `<dir>/<id>.toml`
#[derive(Debug, Clone)]
pub struct FileProfileStore {
    dir: PathBuf,
}

impl FileProfileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn profile_path(&self, id: &Uuid) -> PathBuf {
        self.dir.join(format!("{}.toml", id))
    }

    /// Load a single profile by its UUID
    pub async fn load(&self, id: &Uuid) -> Result<TunnelProfile> {
        let path = self.profile_path(id);
        if !fs::try_exists(&path).await? {
            return Err(Error::ProfileNotFound(*id));
        }
        read_profile(&path).await
    }

    /// Delete a profile from disk by UUID
    pub async fn delete(&self, id: &Uuid) -> Result<PathBuf> {
        let path = self.profile_path(id);
        if !fs::try_exists(&path).await? {
            return Err(Error::ProfileNotFound(*id));
        }

        fs::remove_file(&path).await?;
        debug!("Deleted profile at {}", path.display());

        Ok(path)
    }
}

#[async_trait]
impl ProfileStore for FileProfileStore {
    async fn load_all(&self) -> Result<Vec<TunnelProfile>> {
        let exists = fs::try_exists(&self.dir)
            .await
            .map_err(|e| Error::ProfileList(format!("{}: {}", self.dir.display(), e)))?;
        if !exists {
            debug!("Profiles directory does not exist: {}", self.dir.display());
            return Ok(Vec::new());
        }

        let mut entries = fs::read_dir(&self.dir)
            .await
            .map_err(|e| Error::ProfileList(format!("{}: {}", self.dir.display(), e)))?;

        let mut profiles = Vec::new();

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::ProfileList(e.to_string()))?
        {
            let path = entry.path();

            // Skip non-TOML files
            if path.extension().and_then(|s| s.to_str()) != Some("toml") {
                continue;
            }

            match read_profile(&path).await {
                Ok(profile) => {
                    debug!("Loaded profile {} from {}", profile.id, path.display());
                    profiles.push(profile);
                }
                Err(e) => {
                    warn!("Failed to load profile {}: {}", path.display(), e);
                }
            }
        }

        // Directory order is arbitrary; keep "first" stable across calls
        profiles.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        Ok(profiles)
    }

    async fn save(&self, profile: &TunnelProfile) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| Error::Save(format!("{}: {}", self.dir.display(), e)))?;

        let mut stored = profile.clone();
        stored.modified_at = Utc::now();

        let contents = toml::to_string_pretty(&stored)
            .map_err(|e| Error::Save(format!("failed to serialize profile {}: {}", profile.id, e)))?;

        // Write to a sibling file first so a crash never leaves a truncated profile
        let path = self.profile_path(&profile.id);
        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, contents)
            .await
            .map_err(|e| Error::Save(format!("{}: {}", tmp_path.display(), e)))?;
        fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| Error::Save(format!("{}: {}", path.display(), e)))?;

        debug!("Saved profile {} to {}", profile.id, path.display());
        Ok(())
    }

    async fn reload(&self, profile: &mut TunnelProfile) -> Result<()> {
        let fresh = self
            .load(&profile.id)
            .await
            .map_err(|e| Error::Reload(e.to_string()))?;
        *profile = fresh;
        Ok(())
    }
}

async fn read_profile(path: &Path) -> Result<TunnelProfile> {
    let contents = fs::read_to_string(path).await?;
    let profile: TunnelProfile = toml::from_str(&contents)?;
    Ok(profile)
}
