//! Install manifest (`<location>/AllepPlugins/manifests.json`)
//!
//! Written by the host's installer, one per install location. PlugHub reads
//! it to discover installed plugins and rewrites it on uninstall. Keys this
//! crate does not know about are carried through unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use uuid::Uuid;

use crate::error::{HubError, Result};

/// Contents of one manifest file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManifestFile {
    #[serde(default)]
    pub plugins: Vec<ManifestEntry>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One installed plugin as recorded by the installer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    #[serde(rename = "UUID")]
    pub uuid: Uuid,

    #[serde(rename = "pluginName")]
    pub plugin_name: String,

    #[serde(rename = "developerName", default)]
    pub developer_name: String,

    pub version: String,

    /// Files relative to the host's standard path, backslash separated
    #[serde(rename = "filesCopied", default)]
    pub files_copied: Vec<String>,

    /// ISO-8601 date or date-time
    #[serde(rename = "createdOn")]
    pub created_on: String,

    #[serde(rename = "ACTBFile", default)]
    pub actb_file: String,

    #[serde(rename = "NPDFile", default)]
    pub npd_file: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ManifestEntry {
    /// Every file the installer placed for this plugin
    pub fn installed_files(&self) -> impl Iterator<Item = &str> {
        self.files_copied
            .iter()
            .chain([&self.actb_file, &self.npd_file])
            .map(String::as_str)
            .filter(|file| !file.is_empty())
    }
}

impl ManifestFile {
    /// Load a manifest, or an empty one if the file does not exist
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| HubError::ManifestRead {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| HubError::ManifestParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the manifest back to disk
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let write_err = |source| HubError::ManifestWrite {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(write_err)?;

        tracing::debug!("Wrote manifest {}", path.display());
        Ok(())
    }

    /// Drop every entry of a plugin
    ///
    /// Returns `true` if anything was removed.
    pub fn remove(&mut self, uuid: &Uuid) -> bool {
        let before = self.plugins.len();
        self.plugins.retain(|entry| entry.uuid != *uuid);
        self.plugins.len() != before
    }

    pub fn get(&self, uuid: &Uuid) -> Option<&ManifestEntry> {
        self.plugins.iter().find(|entry| entry.uuid == *uuid)
    }
}
