//! Application configuration
//!
//! Read from `ballot.toml`. Every key is optional:
//!
//! ```toml
//! page_url = "http://127.0.0.1:15000/?room=<uuid>"
//! user_name = "Ann"
//! role = "Voter"          # or "Watcher"
//! data_dir = "/var/lib/ballot"
//! keepalive_secs = 30     # 0 disables
//! ```

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ballot_core::{Identity, Role};
use directories::ProjectDirs;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{AppError, Result};

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "BALLOT_CONFIG";

pub const CONFIG_FILE: &str = "ballot.toml";

pub const DEFAULT_PAGE_URL: &str = "http://127.0.0.1:15000/";

const DEFAULT_KEEPALIVE_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub page_url: String,
    pub user_name: Option<String>,
    pub role: Option<Role>,
    pub data_dir: Option<PathBuf>,
    pub keepalive_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            page_url: DEFAULT_PAGE_URL.to_string(),
            user_name: None,
            role: None,
            data_dir: None,
            keepalive_secs: DEFAULT_KEEPALIVE_SECS,
        }
    }
}

impl AppConfig {
    /// Load the config file; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content, path)
    }

    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|source| AppError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(?config, "Loaded config");
        Ok(config)
    }

    /// Where the identity database lives
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(project_dirs("data")?.data_dir().to_path_buf()),
        }
    }

    pub fn keepalive(&self) -> Option<Duration> {
        (self.keepalive_secs > 0).then(|| Duration::from_secs(self.keepalive_secs))
    }

    /// Apply name and role overrides. Returns whether the identity changed.
    pub fn apply_to(&self, identity: &mut Identity) -> bool {
        let mut changed = false;
        if let Some(name) = &self.user_name {
            if &identity.user_name != name {
                identity.user_name = name.clone();
                changed = true;
            }
        }
        if let Some(role) = self.role {
            if identity.role != role {
                identity.role = role;
                changed = true;
            }
        }
        changed
    }
}

/// Resolve the config file: first CLI argument, then `BALLOT_CONFIG`, then
/// the platform config directory
pub fn config_path(arg: Option<OsString>, env: Option<OsString>) -> Result<PathBuf> {
    if let Some(path) = arg.or(env).filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(path));
    }
    Ok(project_dirs("config")?.config_dir().join(CONFIG_FILE))
}

fn project_dirs(kind: &'static str) -> Result<ProjectDirs> {
    ProjectDirs::from("dev", "ballot", "ballot").ok_or(AppError::NoProjectDirs(kind))
}
