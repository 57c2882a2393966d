//! PlugHub error types
//!
//! Every failure the core can produce has its own variant so callers can
//! tell a missing release feed apart from a plugin that was never checked.

use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised by the plugin hub core
#[derive(Error, Debug)]
pub enum HubError {
    /// A version string does not follow the accepted grammar
    #[error("Invalid version format: '{input}'")]
    InvalidVersionFormat { input: String },

    /// A compatibility specifier could not be parsed
    #[error("Invalid compatibility specifier '{input}': {reason}")]
    InvalidSpecifier { input: String, reason: String },

    /// A release feed entry carries no `assets` field at all
    #[error("No assets found in the release data for {tag}")]
    NoAssetList { tag: String },

    /// None of the release assets is an installable package
    #[error("No ALLEP package found in release {tag}")]
    NoInstallablePackage { tag: String },

    /// Developer id is not present in the developer index
    #[error("Developer with ID {id} not found")]
    DeveloperNotFound { id: String },

    /// Release data was queried before `check_releases` ran
    #[error("Release data for plugin '{plugin}' has not been loaded yet")]
    ReleaseDataNotLoaded { plugin: String },

    /// Release data was queried on a plugin without a GitHub repository
    #[error("Plugin '{plugin}' does not have a GitHub repository attached")]
    NoRemoteReference { plugin: String },

    /// No release is compatible with the plugin's specifier
    #[error("No compatible release found for plugin '{plugin}'")]
    NoCompatibleRelease { plugin: String },

    /// Plugin is not part of the collection
    #[error("Plugin not found: {key}")]
    PluginNotFound { key: String },

    /// DNS, connect or timeout failure while reaching a feed
    #[error("Could not connect to {url}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The feed answered with a non-success status
    #[error("HTTP {status} from {url}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    /// Any other transport failure (body decoding, client construction)
    #[error("Request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to read manifest {path}")]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse manifest {path}")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write manifest {path}")]
    ManifestWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Manifest entry with an unparsable installation date
    #[error("Invalid installation date '{input}' for plugin {uuid}")]
    InvalidDate { uuid: Uuid, input: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HubError>;

impl HubError {
    /// True for failures that mean "the network could not be reached"
    ///
    /// Timeouts count as connectivity failures, HTTP error statuses do not.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, HubError::Connection { .. })
    }

    /// Classify a reqwest error raised while sending a request to `url`
    pub(crate) fn from_request(url: &str, source: reqwest::Error) -> Self {
        if source.is_connect() || source.is_timeout() {
            HubError::Connection {
                url: url.to_string(),
                source,
            }
        } else if let Some(status) = source.status() {
            HubError::HttpStatus {
                url: url.to_string(),
                status,
            }
        } else {
            HubError::Transport {
                url: url.to_string(),
                source,
            }
        }
    }
}

/// User-level operations, each with its own outcome message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Install,
    Update,
    Uninstall,
    CheckForUpdates,
}

impl Operation {
    /// Message shown when the operation fails
    pub fn failure_message(&self) -> &'static str {
        match self {
            Operation::Install => "Failed to install.",
            Operation::Update => "Failed to update. Unable to install the new version.",
            Operation::Uninstall => "Failed to uninstall.",
            Operation::CheckForUpdates => "Failed to check for updates.",
        }
    }

    /// Message shown when the operation succeeds
    pub fn success_message(&self) -> &'static str {
        match self {
            Operation::Install => "The following plugin has been successfully installed:",
            Operation::Update => "The following plugin has been successfully updated:",
            Operation::Uninstall => "The plugin has been successfully uninstalled:",
            Operation::CheckForUpdates => "Update check completed:",
        }
    }

    /// Success message with collected warnings appended
    pub fn success_with_warnings(&self, subject: &str, warnings: &[String]) -> String {
        let mut msg = format!("{} {}", self.success_message(), subject);

        if !warnings.is_empty() {
            msg.push_str(" Following warnings appeared:");
        }
        for (i, warning) in warnings.iter().enumerate() {
            msg.push_str(&format!("\n{}. {}", i + 1, warning));
        }

        msg
    }
}
