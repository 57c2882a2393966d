//! ALLEP package references
//!
//! A package is the installable artifact attached to a release. It is
//! either remote (URL only), local (path only, e.g. dropped onto the host)
//! or both once it has been downloaded.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// File extension of installable packages
pub const PACKAGE_EXTENSION: &str = ".allep";

/// Check whether a file name denotes an installable package
pub fn is_package_file(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(PACKAGE_EXTENSION)
}

/// An installable ALLEP package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllepPackage {
    pub name: String,
    /// Size in bytes
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub local_path: Option<PathBuf>,
}

impl AllepPackage {
    /// Package published as a release asset
    pub fn remote(name: impl Into<String>, url: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            url: Some(url.into()),
            local_path: None,
        }
    }

    /// Package already present on disk
    pub fn from_local_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);

        Self {
            name,
            size,
            url: None,
            local_path: Some(path.to_path_buf()),
        }
    }

    /// True unless the package is referenced by an http(s) URL
    pub fn is_local(&self) -> bool {
        match &self.url {
            Some(url) => {
                let lower = url.to_ascii_lowercase();
                !(lower.starts_with("http://") || lower.starts_with("https://"))
            }
            None => true,
        }
    }

    /// True once a local copy exists
    pub fn downloaded(&self) -> bool {
        self.local_path.is_some()
    }

    /// Record where the downloaded copy was saved
    pub fn mark_downloaded(&mut self, path: PathBuf) {
        self.local_path = Some(path);
    }

    /// Remove the local copy after installation, successful or not
    pub fn delete_local_file(&mut self) -> Result<()> {
        if let Some(path) = self.local_path.take() {
            if path.exists() {
                std::fs::remove_file(&path)?;
                tracing::debug!("Deleted package file {}", path.display());
            }
        }
        Ok(())
    }
}
