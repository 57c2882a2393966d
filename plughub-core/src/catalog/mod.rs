//! PlugHub catalog - plugin discovery and reconciliation
//!
//! Brings together three sources of truth about plugins:
//! - the remote catalog and developer index kept in the hub repository
//! - the GitHub releases of every published plugin
//! - the install manifests written by the host's installer
//!
//! # Architecture
//!
//! ```text
//! Hub repository (raw content)         GitHub releases API
//!     ├── allplan-extensions.json          /repos/<owner>/<repo>/releases
//!     └── plugin-developers.json           /repos/<owner>/<repo>/releases/latest
//!            │                                     │
//!            ▼                                     ▼
//!     PluginsCollection ──── Plugin::check_releases ──▶ Releases
//!            ▲
//!            │
//!     <location>/AllepPlugins/manifests.json (etc, std, usr)
//! ```

mod collection;
mod developers;
mod feed;
mod manifest;
mod package;
mod plugin;
mod progress;
mod releases;

pub use collection::{PluginKey, PluginsCollection};
pub use developers::{Address, Developer, DeveloperIndex, Support};
pub use feed::{CatalogEntry, GithubRepo, HttpFeed, HubFeed, ReleaseAsset, ReleaseEntry};
pub use manifest::{ManifestEntry, ManifestFile};
pub use package::{is_package_file, AllepPackage, PACKAGE_EXTENSION};
pub use plugin::{InstallLocation, Plugin, PluginStatus, UninstallReport};
pub use progress::ProgressObserver;
pub use releases::{Release, Releases};
