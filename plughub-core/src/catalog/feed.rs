//! Remote feeds: catalog, developer index and per-plugin releases
//!
//! `HubFeed` is the seam between the reconciliation core and the network.
//! `HttpFeed` talks to GitHub with a blocking client; tests substitute an
//! in-memory implementation.

use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::Developer;
use crate::config::{HubConfig, GITHUB_ACCEPT, GITHUB_API_VERSION};
use crate::error::{HubError, Result};

/// Coordinates of a plugin's GitHub repository
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GithubRepo {
    pub owner: String,
    pub repo: String,
}

impl GithubRepo {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }
}

impl fmt::Display for GithubRepo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// One plugin as listed in the remote catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub uuid: Uuid,
    pub name: String,
    /// Developer id, resolved through the developer index
    pub developer: String,
    #[serde(default)]
    pub description: String,
    pub github: GithubRepo,
    /// Compatibility specifier, e.g. `~=1.0`
    #[serde(default)]
    pub compatibility: Option<String>,
}

/// One release as returned by the GitHub releases API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseEntry {
    pub tag_name: String,
    pub published_at: DateTime<Utc>,
    pub html_url: String,
    #[serde(default)]
    pub prerelease: bool,
    /// Absent when the API response carries no asset list at all
    #[serde(default)]
    pub assets: Option<Vec<ReleaseAsset>>,
}

/// A downloadable file attached to a release
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseAsset {
    #[serde(default)]
    pub name: String,
    pub browser_download_url: String,
    #[serde(default)]
    pub size: u64,
}

/// Source of catalog, developer and release data
pub trait HubFeed {
    /// All plugins published in the catalog
    fn catalog(&self) -> Result<Vec<CatalogEntry>>;

    /// All registered developers
    fn developers(&self) -> Result<Vec<Developer>>;

    /// Every release of a plugin repository
    fn releases(&self, repo: &GithubRepo) -> Result<Vec<ReleaseEntry>>;

    /// The release GitHub marks as latest
    fn latest_release(&self, repo: &GithubRepo) -> Result<ReleaseEntry>;
}

/// `HubFeed` backed by HTTPS requests
pub struct HttpFeed {
    client: Client,
    config: HubConfig,
}

impl HttpFeed {
    /// Create a feed client from configuration
    pub fn new(config: HubConfig) -> Result<Self> {
        let headers = Self::default_headers(&config)?;

        let client = Client::builder()
            .user_agent(concat!("plughub/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout())
            .default_headers(headers)
            .build()
            .map_err(|source| HubError::Transport {
                url: String::new(),
                source,
            })?;

        Ok(Self { client, config })
    }

    /// Headers sent with every request
    fn default_headers(config: &HubConfig) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
        headers.insert(
            HeaderName::from_static("x-github-api-version"),
            HeaderValue::from_static(GITHUB_API_VERSION),
        );

        if let Some(token) = &config.token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| HubError::Config("Token contains invalid characters".into()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| HubError::from_request(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HubError::HttpStatus {
                url: url.to_string(),
                status,
            });
        }

        let body = response
            .text()
            .map_err(|e| HubError::from_request(url, e))?;

        Ok(serde_json::from_str(&body)?)
    }
}

impl HubFeed for HttpFeed {
    fn catalog(&self) -> Result<Vec<CatalogEntry>> {
        self.get_json(&self.config.catalog_url())
    }

    fn developers(&self) -> Result<Vec<Developer>> {
        self.get_json(&self.config.developers_url())
    }

    fn releases(&self, repo: &GithubRepo) -> Result<Vec<ReleaseEntry>> {
        self.get_json(&self.config.releases_url(repo))
    }

    fn latest_release(&self, repo: &GithubRepo) -> Result<ReleaseEntry> {
        self.get_json(&self.config.latest_release_url(repo))
    }
}
