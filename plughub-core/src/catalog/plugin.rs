//! Plugin entity and its status
//!
//! A plugin is assembled from up to two records: the catalog entry (GitHub
//! coordinates, registered developer, compatibility) and the install manifest
//! entry (installed version, date and files). `fetch` merges them.
//!
//! Release data follows a two-step contract. `check_releases` talks to the
//! feed; every other accessor only reads what it stored and never blocks.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::manifest::{ManifestEntry, ManifestFile};
use super::progress::{make_step, ProgressObserver};
use super::{AllepPackage, CatalogEntry, Developer, GithubRepo, HubFeed, Release, Releases};
use crate::config::HostPaths;
use crate::error::{HubError, Result};
use crate::version::{SpecifierSet, Version};

/// Status of a plugin as shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginStatus {
    /// No installed version recorded
    NotInstalled,
    /// Installed, newest version unknown
    Installed,
    /// Installed, a newer compatible release exists
    UpdateAvailable,
    /// Installed and at least as new as the newest compatible release
    UpToDate,
}

impl PluginStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PluginStatus::NotInstalled => "not installed",
            PluginStatus::Installed => "installed",
            PluginStatus::UpdateAvailable => "update available",
            PluginStatus::UpToDate => "up to date",
        }
    }
}

impl fmt::Display for PluginStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host directories a plugin can be installed into
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallLocation {
    Etc,
    Std,
    Usr,
}

impl InstallLocation {
    /// Every location, in the order manifests are read
    pub const ALL: [InstallLocation; 3] = [
        InstallLocation::Etc,
        InstallLocation::Std,
        InstallLocation::Usr,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InstallLocation::Etc => "etc",
            InstallLocation::Std => "std",
            InstallLocation::Usr => "usr",
        }
    }

    /// Location named by the first segment of a manifest path
    fn from_path_prefix(segment: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|location| segment.eq_ignore_ascii_case(location.as_str()))
    }
}

impl fmt::Display for InstallLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of an uninstall that did not fail outright
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UninstallReport {
    /// Files that could not be removed
    pub warnings: Vec<String>,
}

impl UninstallReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Plugin fields taking part in a merge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PluginField {
    Name,
    Developer,
    Description,
    Github,
    Compatibility,
    InstalledVersion,
    InstalledDate,
    InstalledFiles,
    Location,
    LocalPackage,
    Releases,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MergePolicy {
    /// Incoming value replaces the current one when it is set
    OverwriteIfSet,
    /// Like `OverwriteIfSet`, unless the current record has GitHub data
    FrozenOnceRegistered,
}

/// Merge order matters: `developer` is decided before `github` arrives
const MERGE_POLICY: &[(PluginField, MergePolicy)] = &[
    (PluginField::Name, MergePolicy::OverwriteIfSet),
    (PluginField::Developer, MergePolicy::FrozenOnceRegistered),
    (PluginField::Description, MergePolicy::OverwriteIfSet),
    (PluginField::Github, MergePolicy::OverwriteIfSet),
    (PluginField::Compatibility, MergePolicy::OverwriteIfSet),
    (PluginField::InstalledVersion, MergePolicy::OverwriteIfSet),
    (PluginField::InstalledDate, MergePolicy::OverwriteIfSet),
    (PluginField::InstalledFiles, MergePolicy::OverwriteIfSet),
    (PluginField::Location, MergePolicy::OverwriteIfSet),
    (PluginField::LocalPackage, MergePolicy::OverwriteIfSet),
    (PluginField::Releases, MergePolicy::OverwriteIfSet),
];

/// Directories below a location root that hold plugin content
const CONTENT_FOLDERS: [&str; 3] = ["Library", "PythonPartsScripts", "PythonPartsActionbar"];

const ACTIONBAR_EXTENSION: &str = ".actb";

/// A plugin known from the catalog, the install manifests, or both
#[derive(Debug, Clone)]
pub struct Plugin {
    pub uuid: Uuid,
    pub name: String,
    pub developer: Developer,
    pub description: String,
    pub github: Option<GithubRepo>,
    pub compatibility: Option<SpecifierSet>,
    pub installed_version: Option<Version>,
    pub installed_date: Option<NaiveDateTime>,
    pub installed_files: BTreeSet<PathBuf>,
    pub location: Option<InstallLocation>,
    /// Package supplied from disk instead of a release
    pub local_package: Option<AllepPackage>,
    releases: Option<Releases>,
}

impl Plugin {
    pub fn new(uuid: Uuid, name: impl Into<String>, developer: Developer) -> Self {
        Self {
            uuid,
            name: name.into(),
            developer,
            description: String::new(),
            github: None,
            compatibility: None,
            installed_version: None,
            installed_date: None,
            installed_files: BTreeSet::new(),
            location: None,
            local_package: None,
            releases: None,
        }
    }

    /// Build a plugin from its catalog entry
    ///
    /// The developer id has already been resolved by the caller. An empty
    /// compatibility string means "any version".
    pub fn from_catalog_entry(entry: &CatalogEntry, developer: Developer) -> Result<Self> {
        let compatibility = match entry.compatibility.as_deref().map(str::trim) {
            Some(spec) if !spec.is_empty() => Some(SpecifierSet::parse(spec)?),
            _ => None,
        };

        Ok(Self {
            description: entry.description.clone(),
            github: Some(entry.github.clone()),
            compatibility,
            ..Self::new(entry.uuid, entry.name.clone(), developer)
        })
    }

    /// Build a plugin from an install manifest entry
    ///
    /// Only installed files that exist as regular files are kept.
    pub fn from_manifest_entry(
        location: InstallLocation,
        entry: &ManifestEntry,
        paths: &HostPaths,
    ) -> Result<Self> {
        let installed_files = entry
            .installed_files()
            .filter_map(|file| resolve_installed_file(file, location, paths))
            .filter(|path| path.is_file())
            .collect();

        Ok(Self {
            installed_version: Some(Version::parse(&entry.version)?),
            installed_date: Some(parse_installed_date(entry.uuid, &entry.created_on)?),
            installed_files,
            location: Some(location),
            ..Self::new(
                entry.uuid,
                entry.plugin_name.clone(),
                Developer::unregistered(entry.developer_name.clone()),
            )
        })
    }

    pub fn has_github(&self) -> bool {
        self.github.is_some()
    }

    /// Fetch release data from the feed
    ///
    /// Without a compatibility specifier the feed's latest marker is resolved
    /// as well, so that later queries need no network access.
    pub fn check_releases(&mut self, feed: &dyn HubFeed) -> Result<()> {
        let repo = self.github.clone().ok_or_else(|| HubError::NoRemoteReference {
            plugin: self.name.clone(),
        })?;

        let mut releases = Releases::from_feed(feed, &repo)?;
        if self.compatibility.is_none() {
            releases.get_latest(feed, &repo)?;
        }

        tracing::info!("Checked {} releases of '{}'", releases.len(), self.name);
        self.releases = Some(releases);
        Ok(())
    }

    fn loaded_releases(&self) -> Result<&Releases> {
        if !self.has_github() {
            return Err(HubError::NoRemoteReference {
                plugin: self.name.clone(),
            });
        }

        self.releases.as_ref().ok_or_else(|| HubError::ReleaseDataNotLoaded {
            plugin: self.name.clone(),
        })
    }

    /// Releases offered for this plugin, prereleases included
    pub fn releases(&self) -> Result<Releases> {
        let releases = self.loaded_releases()?;
        Ok(match &self.compatibility {
            Some(spec) => releases.get_matching(spec, true),
            None => releases.clone(),
        })
    }

    /// Newest release this plugin may be updated to
    pub fn latest_compatible_release(&self) -> Result<Option<&Release>> {
        let releases = self.loaded_releases()?;
        Ok(match &self.compatibility {
            Some(spec) => releases.get_latest_matching(spec),
            None => releases.marked_latest(),
        })
    }

    pub fn status(&self) -> PluginStatus {
        let Some(installed) = &self.installed_version else {
            return PluginStatus::NotInstalled;
        };

        match self.latest_compatible_release() {
            Ok(Some(latest)) if *installed < latest.version => PluginStatus::UpdateAvailable,
            Ok(Some(_)) => PluginStatus::UpToDate,
            _ => PluginStatus::Installed,
        }
    }

    pub fn is_installed(&self) -> bool {
        self.status() != PluginStatus::NotInstalled
    }

    /// True when the installed plugin placed a file on the action bar
    pub fn is_on_actionbar(&self) -> bool {
        self.is_installed()
            && self.installed_files.iter().any(|file| {
                file.file_name()
                    .map(|name| {
                        name.to_string_lossy()
                            .to_ascii_lowercase()
                            .ends_with(ACTIONBAR_EXTENSION)
                    })
                    .unwrap_or(false)
            })
    }

    /// Package to hand to the installer
    pub fn resolve_package(&self) -> Result<AllepPackage> {
        if let Some(package) = &self.local_package {
            return Ok(package.clone());
        }

        self.latest_compatible_release()?
            .map(|release| release.package.clone())
            .ok_or_else(|| HubError::NoCompatibleRelease {
                plugin: self.name.clone(),
            })
    }

    /// Package of one specific release, for installing another version
    ///
    /// The version has to be among the releases offered for this plugin.
    pub fn resolve_package_for(&self, version: &Version) -> Result<AllepPackage> {
        self.releases()?
            .get_by_version(version)
            .map(|release| release.package.clone())
            .ok_or_else(|| HubError::NoCompatibleRelease {
                plugin: format!("{} {}", self.name, version),
            })
    }

    /// True when installing `version` would go back from the installed one
    pub fn is_downgrade(&self, version: &Version) -> bool {
        self.installed_version
            .as_ref()
            .is_some_and(|installed| version < installed)
    }

    /// Record a finished installation
    pub fn mark_installed(&mut self, version: Version, at: NaiveDateTime) {
        tracing::info!("Installed '{}' {}", self.name, version);
        self.installed_version = Some(version);
        self.installed_date = Some(at);
    }

    /// Merge another record of the same plugin into this one
    pub fn fetch(&mut self, mut other: Plugin) {
        for &(field, policy) in MERGE_POLICY {
            if policy == MergePolicy::FrozenOnceRegistered && self.has_github() {
                continue;
            }
            self.take_field(field, &mut other);
        }
    }

    fn take_field(&mut self, field: PluginField, other: &mut Plugin) {
        match field {
            PluginField::Name => {
                if !other.name.is_empty() {
                    self.name = std::mem::take(&mut other.name);
                }
            }
            PluginField::Developer => {
                if !other.developer.is_empty() {
                    self.developer = other.developer.clone();
                }
            }
            PluginField::Description => {
                if !other.description.is_empty() {
                    self.description = std::mem::take(&mut other.description);
                }
            }
            PluginField::Github => overwrite_if_set(&mut self.github, &mut other.github),
            PluginField::Compatibility => {
                overwrite_if_set(&mut self.compatibility, &mut other.compatibility)
            }
            PluginField::InstalledVersion => {
                overwrite_if_set(&mut self.installed_version, &mut other.installed_version)
            }
            PluginField::InstalledDate => {
                overwrite_if_set(&mut self.installed_date, &mut other.installed_date)
            }
            PluginField::InstalledFiles => {
                if !other.installed_files.is_empty() {
                    self.installed_files = std::mem::take(&mut other.installed_files);
                }
            }
            PluginField::Location => overwrite_if_set(&mut self.location, &mut other.location),
            PluginField::LocalPackage => {
                overwrite_if_set(&mut self.local_package, &mut other.local_package)
            }
            PluginField::Releases => overwrite_if_set(&mut self.releases, &mut other.releases),
        }
    }

    /// Remove the installed plugin from the host
    ///
    /// Files that cannot be removed are reported as warnings. The plugin's
    /// entry is dropped from the manifest of its install location.
    pub fn uninstall(
        &mut self,
        paths: &HostPaths,
        mut progress: Option<&mut dyn ProgressObserver>,
    ) -> Result<UninstallReport> {
        let mut report = UninstallReport::default();

        if !self.is_installed() {
            tracing::debug!("'{}' is not installed, nothing to uninstall", self.name);
            return Ok(report);
        }

        make_step(&mut progress, 40, "Removing files");

        for file in std::mem::take(&mut self.installed_files) {
            match std::fs::remove_file(&file) {
                Ok(()) => tracing::debug!("Removed {}", file.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!("Could not remove {}: {}", file.display(), e);
                    report.warnings.push(format!(
                        "File {} is being used by another process and won't be removed. {}",
                        file.display(),
                        e
                    ));
                }
            }
        }

        if let Some(root) = self.location.and_then(|location| paths.root(location)) {
            let developer_dir = sanitize_path_segment(self.developer.display_name());
            let plugin_dir = sanitize_path_segment(&self.name);

            for folder in CONTENT_FOLDERS {
                make_step(&mut progress, 10, "Removing directories");

                let dir = root
                    .join(folder)
                    .join("AllepPlugins")
                    .join(&developer_dir)
                    .join(&plugin_dir);
                remove_empty_dirs(&dir);
                if let Some(parent) = dir.parent() {
                    if let Err(e) = std::fs::remove_dir(parent) {
                        tracing::debug!("Kept {}: {}", parent.display(), e);
                    }
                }
            }
        }

        make_step(&mut progress, 10, "Updating manifest files");

        if let Some(manifest_path) = self.location.and_then(|location| paths.manifest_path(location)) {
            if manifest_path.exists() {
                let mut manifest = ManifestFile::load_from_path(&manifest_path)?;
                if manifest.remove(&self.uuid) {
                    manifest.save_to_path(&manifest_path)?;
                }
            }
        }

        self.installed_version = None;
        self.installed_date = None;
        self.location = None;

        make_step(&mut progress, 10, "Completed");
        tracing::info!(
            "Uninstalled '{}' with {} warnings",
            self.name,
            report.warnings.len()
        );

        Ok(report)
    }
}

fn overwrite_if_set<T>(current: &mut Option<T>, incoming: &mut Option<T>) {
    if incoming.is_some() {
        *current = incoming.take();
    }
}

/// Turn a manifest path into an absolute path below the host roots
///
/// Manifest paths are backslash separated and start with the location they
/// live in (`Usr\...`). Older installers wrote an extra segment after `Usr`,
/// which is dropped. Paths without a location prefix are taken relative to
/// the plugin's own location.
fn resolve_installed_file(
    raw: &str,
    location: InstallLocation,
    paths: &HostPaths,
) -> Option<PathBuf> {
    let mut parts: Vec<&str> = raw
        .split(|c| c == '\\' || c == '/')
        .filter(|part| !part.is_empty())
        .collect();

    if raw.starts_with("Usr") && parts.len() > 1 {
        parts.remove(1);
    }

    let (root, rest) = match parts.first().and_then(|p| InstallLocation::from_path_prefix(p)) {
        Some(prefix) => (paths.root(prefix)?, &parts[1..]),
        None => (paths.root(location)?, &parts[..]),
    };

    if rest.is_empty() {
        return None;
    }

    Some(rest.iter().fold(root.to_path_buf(), |path, part| path.join(part)))
}

/// Parse `createdOn`, which is either a date or a date-time
fn parse_installed_date(uuid: Uuid, input: &str) -> Result<NaiveDateTime> {
    let trimmed = input.trim();
    let invalid = || HubError::InvalidDate {
        uuid,
        input: input.to_string(),
    };

    if let Ok(datetime) = trimmed.parse::<NaiveDateTime>() {
        return Ok(datetime);
    }
    if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(datetime);
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(datetime.naive_local());
    }

    trimmed
        .parse::<NaiveDate>()
        .map_err(|_| invalid())?
        .and_hms_opt(0, 0, 0)
        .ok_or_else(invalid)
}

/// Directory name the installer derives from a developer or plugin name
fn sanitize_path_segment(value: &str) -> String {
    value
        .chars()
        .filter(|c| *c != ' ')
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' => '-',
            other => other,
        })
        .collect()
}

/// Remove a directory tree bottom-up, keeping anything that still has files
///
/// Python bytecode caches and the host's `_pyp` leftovers are removed
/// outright.
fn remove_empty_dirs(dir: &Path) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            if entry.file_name().to_string_lossy().contains("_pyp") {
                if let Err(e) = std::fs::remove_file(&path) {
                    tracing::debug!("Could not remove {}: {}", path.display(), e);
                }
            }
            continue;
        }

        if entry.file_name() == "__pycache__" {
            if let Err(e) = std::fs::remove_dir_all(&path) {
                tracing::debug!("Could not remove {}: {}", path.display(), e);
            }
        } else {
            remove_empty_dirs(&path);
        }
    }

    if std::fs::remove_dir(dir).is_ok() {
        tracing::debug!("Removed directory {}", dir.display());
    }
}
