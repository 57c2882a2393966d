//! PlugHub configuration
//!
//! Feed locations, request settings and the host's install location roots.
//! Loaded from `config.yaml` in the platform config directory; a missing
//! file yields the defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::catalog::{GithubRepo, InstallLocation};
use crate::error::{HubError, Result};

/// Default owner of the plugin hub repository
pub const DEFAULT_HUB_OWNER: &str = "bmarciniec";

/// Default name of the plugin hub repository
pub const DEFAULT_HUB_REPO: &str = "plugin-hub";

/// Default branch the catalog is read from
pub const DEFAULT_HUB_BRANCH: &str = "main";

/// Base URL for raw repository content
pub const DEFAULT_RAW_BASE_URL: &str = "https://raw.githubusercontent.com";

/// Base URL of the GitHub REST API
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

/// Default per-request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// GitHub API version sent with every request
pub const GITHUB_API_VERSION: &str = "2022-11-28";

/// Media type accepted from the GitHub API
pub const GITHUB_ACCEPT: &str = "application/vnd.github+json";

const CATALOG_FILE: &str = "allplan-extensions.json";
const DEVELOPERS_FILE: &str = "plugin-developers.json";

/// Repository hosting the catalog and developer index
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HubRepo {
    pub owner: String,
    pub repo: String,
    /// Version-qualified branch, usually the host's main release name
    pub branch: String,
}

impl Default for HubRepo {
    fn default() -> Self {
        Self {
            owner: DEFAULT_HUB_OWNER.to_string(),
            repo: DEFAULT_HUB_REPO.to_string(),
            branch: DEFAULT_HUB_BRANCH.to_string(),
        }
    }
}

/// Root directories of the host's install locations
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct HostPaths {
    #[serde(default)]
    pub etc: Option<PathBuf>,
    #[serde(default)]
    pub std: Option<PathBuf>,
    #[serde(default)]
    pub usr: Option<PathBuf>,
}

impl HostPaths {
    /// Root directory of an install location, if configured
    pub fn root(&self, location: InstallLocation) -> Option<&Path> {
        match location {
            InstallLocation::Etc => self.etc.as_deref(),
            InstallLocation::Std => self.std.as_deref(),
            InstallLocation::Usr => self.usr.as_deref(),
        }
    }

    /// Path of the plugin manifest kept in an install location
    pub fn manifest_path(&self, location: InstallLocation) -> Option<PathBuf> {
        self.root(location)
            .map(|root| root.join("AllepPlugins").join("manifests.json"))
    }
}

/// Complete PlugHub configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HubConfig {
    #[serde(default)]
    pub hub: HubRepo,

    #[serde(default = "default_raw_base_url")]
    pub raw_base_url: String,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Optional bearer token for the GitHub API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default)]
    pub paths: HostPaths,
}

fn default_raw_base_url() -> String {
    DEFAULT_RAW_BASE_URL.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            hub: HubRepo::default(),
            raw_base_url: default_raw_base_url(),
            api_base_url: default_api_base_url(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            token: None,
            paths: HostPaths::default(),
        }
    }
}

impl HubConfig {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::default_config_path()?)
    }

    /// Load configuration from a specific path, defaults if it does not exist
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            HubError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        serde_yaml_ng::from_str(&content)
            .map_err(|e| HubError::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_yaml_ng::to_string(self)
            .map_err(|e| HubError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = directories::ProjectDirs::from("io", "plughub", "plughub")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .or_else(|| dirs::config_dir().map(|d| d.join("plughub")))
            .ok_or_else(|| HubError::Config("Could not determine config directory".into()))?;

        Ok(config_dir.join("config.yaml"))
    }

    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn raw_url(&self, file: &str) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.raw_base_url.trim_end_matches('/'),
            self.hub.owner,
            self.hub.repo,
            self.hub.branch,
            file
        )
    }

    /// URL of the plugin catalog
    pub fn catalog_url(&self) -> String {
        self.raw_url(CATALOG_FILE)
    }

    /// URL of the developer index
    pub fn developers_url(&self) -> String {
        self.raw_url(DEVELOPERS_FILE)
    }

    /// URL listing all releases of a plugin repository
    pub fn releases_url(&self, repo: &GithubRepo) -> String {
        format!(
            "{}/repos/{}/{}/releases",
            self.api_base_url.trim_end_matches('/'),
            repo.owner,
            repo.repo
        )
    }

    /// URL of the release GitHub marks as latest
    pub fn latest_release_url(&self, repo: &GithubRepo) -> String {
        format!("{}/latest", self.releases_url(repo))
    }
}
