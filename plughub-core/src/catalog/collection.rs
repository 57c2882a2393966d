//! Plugin collection: reconciles catalog and installed records
//!
//! Plugins are stored by UUID. A second list keeps their UUIDs ordered by
//! name and is rebuilt after every mutation, so positional access and
//! iteration always follow the displayed order.

use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use super::manifest::ManifestFile;
use super::{DeveloperIndex, HubFeed, InstallLocation, Plugin, PluginStatus};
use crate::config::HostPaths;
use crate::error::{HubError, Result};

/// Address of a plugin in a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginKey {
    Uuid(Uuid),
    /// Position in name order
    Index(usize),
}

impl From<Uuid> for PluginKey {
    fn from(uuid: Uuid) -> Self {
        PluginKey::Uuid(uuid)
    }
}

impl From<&Uuid> for PluginKey {
    fn from(uuid: &Uuid) -> Self {
        PluginKey::Uuid(*uuid)
    }
}

impl From<usize> for PluginKey {
    fn from(index: usize) -> Self {
        PluginKey::Index(index)
    }
}

impl fmt::Display for PluginKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginKey::Uuid(uuid) => write!(f, "{uuid}"),
            PluginKey::Index(index) => write!(f, "#{index}"),
        }
    }
}

/// All plugins known to the hub
#[derive(Debug, Default)]
pub struct PluginsCollection {
    plugins: HashMap<Uuid, Plugin>,
    sorted: Vec<Uuid>,
    developers: DeveloperIndex,
}

impl PluginsCollection {
    pub fn new(developers: DeveloperIndex) -> Self {
        Self {
            plugins: HashMap::new(),
            sorted: Vec::new(),
            developers,
        }
    }

    /// Create a collection with the developer index from the feed
    ///
    /// When the feed cannot be reached at all the collection starts with an
    /// empty index, so installed plugins can still be listed offline.
    pub fn connect(feed: &dyn HubFeed) -> Result<Self> {
        let developers = match DeveloperIndex::from_feed(feed) {
            Ok(index) => index,
            Err(e) if e.is_connectivity() => {
                tracing::warn!("Developer index unavailable, continuing offline: {}", e);
                DeveloperIndex::new()
            }
            Err(e) => return Err(e),
        };

        Ok(Self::new(developers))
    }

    pub fn developers(&self) -> &DeveloperIndex {
        &self.developers
    }

    /// Add a plugin, merging it into an existing record with the same UUID
    pub fn append(&mut self, plugin: Plugin) {
        match self.plugins.get_mut(&plugin.uuid) {
            Some(existing) => {
                tracing::debug!("Merging record of '{}' ({})", plugin.name, plugin.uuid);
                existing.fetch(plugin);
            }
            None => {
                self.plugins.insert(plugin.uuid, plugin);
            }
        }

        self.sort();
    }

    /// Add every catalog plugin whose developer is registered
    pub fn load_from_catalog(&mut self, feed: &dyn HubFeed) -> Result<()> {
        let entries = feed.catalog()?;
        let total = entries.len();
        let mut added = 0;

        for entry in entries {
            let developer = match self.developers.get(&entry.developer) {
                Ok(developer) => developer.clone(),
                Err(_) => {
                    tracing::debug!(
                        "Skipping '{}': developer '{}' is not registered",
                        entry.name,
                        entry.developer
                    );
                    continue;
                }
            };

            self.append(Plugin::from_catalog_entry(&entry, developer)?);
            added += 1;
        }

        tracing::info!("Loaded {} of {} catalog plugins", added, total);
        Ok(())
    }

    /// Add every plugin recorded in the install manifests
    pub fn load_installed(&mut self, paths: &HostPaths) -> Result<()> {
        for location in InstallLocation::ALL {
            let Some(manifest_path) = paths.manifest_path(location) else {
                continue;
            };
            if !manifest_path.exists() {
                continue;
            }

            let manifest = ManifestFile::load_from_path(&manifest_path)?;
            tracing::debug!(
                "{} plugins installed in {}",
                manifest.plugins.len(),
                location
            );

            for entry in &manifest.plugins {
                self.append(Plugin::from_manifest_entry(location, entry, paths)?);
            }
        }

        Ok(())
    }

    /// Drop plugins that are neither installed nor published on GitHub
    pub fn clean_up(&mut self) {
        let before = self.plugins.len();
        self.plugins
            .retain(|_, plugin| plugin.status() != PluginStatus::NotInstalled || plugin.has_github());
        self.sort();

        tracing::debug!("Clean up removed {} plugins", before - self.plugins.len());
    }

    pub fn get(&self, key: impl Into<PluginKey>) -> Result<&Plugin> {
        let key = key.into();
        self.resolve(key)
            .and_then(|uuid| self.plugins.get(&uuid))
            .ok_or_else(|| HubError::PluginNotFound {
                key: key.to_string(),
            })
    }

    pub fn get_mut(&mut self, key: impl Into<PluginKey>) -> Result<&mut Plugin> {
        let key = key.into();
        self.resolve(key)
            .and_then(|uuid| self.plugins.get_mut(&uuid))
            .ok_or_else(|| HubError::PluginNotFound {
                key: key.to_string(),
            })
    }

    /// First plugin whose name matches, ignoring case
    pub fn find_by_name(&self, name: &str) -> Option<&Plugin> {
        let name = name.to_lowercase();
        self.iter().find(|plugin| plugin.name.to_lowercase() == name)
    }

    fn resolve(&self, key: PluginKey) -> Option<Uuid> {
        match key {
            PluginKey::Uuid(uuid) => Some(uuid),
            PluginKey::Index(index) => self.sorted.get(index).copied(),
        }
    }

    /// Plugins in name order
    pub fn iter(&self) -> impl Iterator<Item = &Plugin> {
        self.sorted.iter().filter_map(|uuid| self.plugins.get(uuid))
    }

    pub fn uuids(&self) -> &[Uuid] {
        &self.sorted
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    fn sort(&mut self) {
        let plugins = &self.plugins;
        let mut sorted: Vec<Uuid> = plugins.keys().copied().collect();
        sorted.sort_by(|a, b| plugins[a].name.cmp(&plugins[b].name).then_with(|| a.cmp(b)));
        self.sorted = sorted;
    }
}
