//! Releases of a plugin
//!
//! `Releases` is a set keyed by version: two releases with the same
//! version are the same release, whatever else differs.

use chrono::{DateTime, Utc};
use std::collections::btree_map::{self, Entry};
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use super::feed::ReleaseEntry;
use super::package::{is_package_file, AllepPackage};
use super::{GithubRepo, HubFeed};
use crate::error::{HubError, Result};
use crate::version::{SpecifierSet, Version};

/// A published, versioned build of a plugin
#[derive(Debug, Clone)]
pub struct Release {
    pub version: Version,
    pub published_at: DateTime<Utc>,
    pub url: String,
    pub is_prerelease: bool,
    pub package: AllepPackage,
    /// Set when GitHub marks this release as the latest one
    pub latest: bool,
}

impl Release {
    /// Build a release from a releases API entry
    ///
    /// Every asset is scanned for the first installable package.
    pub fn from_feed_entry(entry: &ReleaseEntry) -> Result<Self> {
        let assets = entry.assets.as_ref().ok_or_else(|| HubError::NoAssetList {
            tag: entry.tag_name.clone(),
        })?;

        let asset = assets
            .iter()
            .find(|asset| is_package_file(&asset.name))
            .ok_or_else(|| HubError::NoInstallablePackage {
                tag: entry.tag_name.clone(),
            })?;

        let version = Version::parse(&entry.tag_name)?;

        Ok(Self {
            is_prerelease: entry.prerelease || version.is_prerelease(),
            version,
            published_at: entry.published_at,
            url: entry.html_url.clone(),
            package: AllepPackage::remote(
                asset.name.clone(),
                asset.browser_download_url.clone(),
                asset.size,
            ),
            latest: false,
        })
    }

    /// Short relative age, e.g. "2 wks ago"
    pub fn published_ago(&self, now: DateTime<Utc>) -> String {
        let days = (now - self.published_at).num_days().max(0);

        if days < 30 {
            let weeks = days / 7;
            format!("{} wk{} ago", weeks, if weeks != 1 { "s" } else { "" })
        } else if days < 365 {
            format!("{} mo ago", days / 30)
        } else {
            let years = days / 365;
            format!("{} yr{} ago", years, if years != 1 { "s" } else { "" })
        }
    }
}

impl PartialEq for Release {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
    }
}

impl Eq for Release {}

impl Hash for Release {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.version.hash(state);
    }
}

/// Set of releases of one plugin, unique by version
#[derive(Debug, Clone, Default)]
pub struct Releases {
    releases: BTreeMap<Version, Release>,
}

impl Releases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch every release of a repository
    pub fn from_feed(feed: &dyn HubFeed, repo: &GithubRepo) -> Result<Self> {
        let mut releases = Self::new();
        releases.extend_from_feed(feed, repo)?;
        Ok(releases)
    }

    /// Add every release of a repository to this set
    pub fn extend_from_feed(&mut self, feed: &dyn HubFeed, repo: &GithubRepo) -> Result<()> {
        for entry in feed.releases(repo)? {
            self.add(Release::from_feed_entry(&entry)?);
        }

        tracing::debug!("{} has {} releases", repo, self.len());
        Ok(())
    }

    /// Add a release; a release with the same version is kept as is
    ///
    /// Returns `false` if the version was already present.
    pub fn add(&mut self, release: Release) -> bool {
        match self.releases.entry(release.version.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(release);
                true
            }
        }
    }

    /// Releases whose version satisfies `specifier`
    pub fn get_matching(&self, specifier: &SpecifierSet, include_prerelease: bool) -> Releases {
        self.iter()
            .filter(|release| specifier.contains(&release.version))
            .filter(|release| include_prerelease || !release.is_prerelease)
            .cloned()
            .collect()
    }

    /// Newest non-prerelease release satisfying `specifier`
    pub fn get_latest_matching(&self, specifier: &SpecifierSet) -> Option<&Release> {
        self.iter()
            .filter(|release| !release.is_prerelease && specifier.contains(&release.version))
            .max_by(|a, b| a.version.cmp(&b.version))
    }

    /// The release GitHub marks as latest
    ///
    /// A release already flagged `latest` is returned without touching the
    /// feed. Otherwise the latest release is fetched; an existing release
    /// with the same version is flagged in place, a new one is inserted.
    pub fn get_latest(&mut self, feed: &dyn HubFeed, repo: &GithubRepo) -> Result<&Release> {
        if let Some(version) = self.marked_latest().map(|r| r.version.clone()) {
            tracing::debug!("Using cached latest release {} of {}", version, repo);
            return Ok(&self.releases[&version]);
        }

        let mut fetched = Release::from_feed_entry(&feed.latest_release(repo)?)?;
        fetched.latest = true;

        let release: &Release = match self.releases.entry(fetched.version.clone()) {
            Entry::Occupied(slot) => {
                let existing = slot.into_mut();
                existing.latest = true;
                existing
            }
            Entry::Vacant(slot) => slot.insert(fetched),
        };

        Ok(release)
    }

    /// Release currently flagged as latest, if any
    pub fn marked_latest(&self) -> Option<&Release> {
        self.iter().find(|release| release.latest)
    }

    pub fn get_by_version(&self, version: &Version) -> Option<&Release> {
        self.releases.get(version)
    }

    pub fn contains(&self, release: &Release) -> bool {
        self.releases.contains_key(&release.version)
    }

    /// Releases in ascending version order
    pub fn iter(&self) -> btree_map::Values<'_, Version, Release> {
        self.releases.values()
    }

    pub fn len(&self) -> usize {
        self.releases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }
}

impl FromIterator<Release> for Releases {
    fn from_iter<I: IntoIterator<Item = Release>>(iter: I) -> Self {
        let mut releases = Releases::new();
        for release in iter {
            releases.add(release);
        }
        releases
    }
}

impl<'a> IntoIterator for &'a Releases {
    type Item = &'a Release;
    type IntoIter = btree_map::Values<'a, Version, Release>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::feed::ReleaseAsset;
    use crate::catalog::{CatalogEntry, Developer};
    use chrono::TimeZone;
    use std::cell::Cell;
    use std::collections::hash_map::DefaultHasher;

    fn entry(tag: &str, prerelease: bool) -> ReleaseEntry {
        ReleaseEntry {
            tag_name: tag.to_string(),
            published_at: Utc.with_ymd_and_hms(2023, 2, 1, 0, 0, 0).unwrap(),
            html_url: format!("https://github.com/owner/repo/releases/{tag}"),
            prerelease,
            assets: Some(vec![ReleaseAsset {
                name: "plugin.allep".to_string(),
                browser_download_url: format!("https://example.com/{tag}/plugin.allep"),
                size: 2048,
            }]),
        }
    }

    fn release(tag: &str, prerelease: bool) -> Release {
        Release::from_feed_entry(&entry(tag, prerelease)).unwrap()
    }

    fn sample() -> Releases {
        [
            release("v1.0.0", false),
            release("v1.1.0", false),
            release("v1.2.2", true),
            release("2.0.0", false),
            release("2.1.0", false),
            release("2.1.6", false),
        ]
        .into_iter()
        .collect()
    }

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn spec(s: &str) -> SpecifierSet {
        SpecifierSet::parse(s).unwrap()
    }

    /// Feed that only answers the latest-release query
    struct LatestOnly {
        tag: &'static str,
        calls: Cell<usize>,
    }

    impl HubFeed for LatestOnly {
        fn catalog(&self) -> Result<Vec<CatalogEntry>> {
            Ok(vec![])
        }

        fn developers(&self) -> Result<Vec<Developer>> {
            Ok(vec![])
        }

        fn releases(&self, _repo: &GithubRepo) -> Result<Vec<ReleaseEntry>> {
            Ok(vec![])
        }

        fn latest_release(&self, _repo: &GithubRepo) -> Result<ReleaseEntry> {
            self.calls.set(self.calls.get() + 1);
            Ok(entry(self.tag, false))
        }
    }

    #[test]
    fn test_from_feed_entry() {
        let release = release("v1.0.0", false);
        assert_eq!(release.version.major(), 1);
        assert_eq!(release.version.minor(), 0);
        assert_eq!(release.published_at.date_naive().to_string(), "2023-02-01");
        assert_eq!(release.url, "https://github.com/owner/repo/releases/v1.0.0");
        assert!(!release.is_prerelease);
        assert_eq!(release.package.name, "plugin.allep");
        assert_eq!(release.package.size, 2048);
        assert!(!release.latest);
    }

    #[test]
    fn test_missing_asset_list() {
        let mut data = entry("1.0.0", false);
        data.assets = None;
        assert!(matches!(
            Release::from_feed_entry(&data),
            Err(HubError::NoAssetList { .. })
        ));
    }

    #[test]
    fn test_empty_asset_list() {
        let mut data = entry("1.0.0", false);
        data.assets = Some(vec![]);
        assert!(matches!(
            Release::from_feed_entry(&data),
            Err(HubError::NoInstallablePackage { .. })
        ));
    }

    #[test]
    fn test_no_package_among_assets() {
        let mut data = entry("1.0.0", false);
        data.assets.as_mut().unwrap()[0].name = "plugin.zip".to_string();
        assert!(matches!(
            Release::from_feed_entry(&data),
            Err(HubError::NoInstallablePackage { .. })
        ));
    }

    #[test]
    fn test_package_found_after_other_assets() {
        let mut data = entry("1.0.0", false);
        let assets = data.assets.as_mut().unwrap();
        assets.insert(
            0,
            ReleaseAsset {
                name: "README.md".to_string(),
                browser_download_url: "https://example.com/README.md".to_string(),
                size: 10,
            },
        );
        assets.insert(
            0,
            ReleaseAsset {
                name: String::new(),
                browser_download_url: "https://example.com/unnamed".to_string(),
                size: 1,
            },
        );
        assets[2].name = "Plugin.ALLEP".to_string();

        let release = Release::from_feed_entry(&data).unwrap();
        assert_eq!(release.package.name, "Plugin.ALLEP");
    }

    #[test]
    fn test_invalid_tag() {
        assert!(matches!(
            Release::from_feed_entry(&entry("latest-build", false)),
            Err(HubError::InvalidVersionFormat { .. })
        ));
    }

    #[test]
    fn test_prerelease_version_marks_release() {
        assert!(release("2.0.0rc1", false).is_prerelease);
    }

    #[test]
    fn test_equality_by_version_only() {
        let a = release("1.0.0", false);
        let mut b = release("v1.0", true);
        b.url = "https://elsewhere".to_string();
        b.latest = true;

        assert_eq!(a, b);

        let hash = |r: &Release| {
            let mut hasher = DefaultHasher::new();
            r.hash(&mut hasher);
            hasher.finish()
        };
        assert_eq!(hash(&a), hash(&b));
    }

    #[test]
    fn test_add_deduplicates() {
        let mut releases = Releases::new();
        assert!(releases.add(release("1.0.0", false)));
        assert!(!releases.add(release("v1.0.0", true)));
        assert_eq!(releases.len(), 1);

        // The first release is kept
        assert!(!releases.get_by_version(&v("1.0.0")).unwrap().is_prerelease);
        assert!(releases.contains(&release("1.0", false)));
    }

    #[test]
    fn test_get_matching() {
        let matching = sample().get_matching(&spec("~=1.0"), false);
        let versions: Vec<String> = matching.iter().map(|r| r.version.to_string()).collect();
        assert_eq!(versions, vec!["1.0.0", "1.1.0"]);
        assert!(matching.iter().all(|r| !r.is_prerelease));
    }

    #[test]
    fn test_get_matching_including_prerelease() {
        let matching = sample().get_matching(&spec("~=1.0"), true);
        assert_eq!(matching.len(), 3);
        assert!(matching.get_by_version(&v("1.2.2")).is_some());
    }

    #[test]
    fn test_get_matching_skips_prerelease_tags() {
        // Flagged by the feed: kept on request. Pre-release tag: never kept
        // under a final-release specifier.
        let mut releases = sample();
        assert!(releases.add(release("1.3rc1", false)));

        let matching = releases.get_matching(&spec("~=1.0"), true);
        assert_eq!(matching.len(), 3);
        assert!(matching.get_by_version(&v("1.3rc1")).is_none());

        let opted_in = releases.get_matching(&spec("~=1.0, >=1.3rc1"), true);
        assert!(opted_in.get_by_version(&v("1.3rc1")).is_some());
    }

    #[test]
    fn test_get_matching_does_not_mutate() {
        let releases = sample();
        let _ = releases.get_matching(&spec("~=1.0"), false);
        assert_eq!(releases.len(), 6);
    }

    #[test]
    fn test_get_latest_matching() {
        let releases = sample();
        assert_eq!(
            releases.get_latest_matching(&spec("~=2.0")).unwrap().version,
            v("2.1.6")
        );
        assert_eq!(
            releases.get_latest_matching(&spec("~=1.0")).unwrap().version,
            v("1.1.0")
        );
    }

    #[test]
    fn test_get_latest_matching_empty() {
        assert!(sample().get_latest_matching(&spec("~=3.0")).is_none());
        assert!(Releases::new().get_latest_matching(&spec("~=1.0")).is_none());

        // Only a prerelease matches
        assert!(sample().get_latest_matching(&spec("==1.2.2")).is_none());
    }

    #[test]
    fn test_get_latest_marks_existing_release_in_place() {
        let mut releases = sample();
        let feed = LatestOnly {
            tag: "v2.1.6",
            calls: Cell::new(0),
        };
        let repo = GithubRepo::new("owner", "repo");

        let latest = releases.get_latest(&feed, &repo).unwrap();
        assert_eq!(latest.version, v("2.1.6"));
        assert!(latest.latest);
        assert_eq!(releases.len(), 6);
        assert_eq!(feed.calls.get(), 1);

        // Second query is answered from the cached flag
        let latest = releases.get_latest(&feed, &repo).unwrap();
        assert_eq!(latest.version, v("2.1.6"));
        assert_eq!(feed.calls.get(), 1);
        assert_eq!(releases.iter().filter(|r| r.latest).count(), 1);
    }

    #[test]
    fn test_get_latest_inserts_unknown_release() {
        let mut releases = Releases::new();
        let feed = LatestOnly {
            tag: "3.0.0",
            calls: Cell::new(0),
        };
        let repo = GithubRepo::new("owner", "repo");

        let latest = releases.get_latest(&feed, &repo).unwrap();
        assert_eq!(latest.version, v("3.0.0"));
        assert_eq!(releases.len(), 1);
        assert!(releases.marked_latest().is_some());
    }

    #[test]
    fn test_iteration_is_ascending() {
        let versions: Vec<String> = sample().iter().map(|r| r.version.to_string()).collect();
        assert_eq!(
            versions,
            vec!["1.0.0", "1.1.0", "1.2.2", "2.0.0", "2.1.0", "2.1.6"]
        );
    }

    #[test]
    fn test_published_ago() {
        let release = release("1.0.0", false);
        let at = |y, m, d| Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap();

        assert_eq!(release.published_ago(at(2023, 2, 1)), "0 wks ago");
        assert_eq!(release.published_ago(at(2023, 2, 8)), "1 wk ago");
        assert_eq!(release.published_ago(at(2023, 2, 20)), "2 wks ago");
        assert_eq!(release.published_ago(at(2023, 5, 2)), "2 mo ago");
        assert_eq!(release.published_ago(at(2024, 2, 1)), "1 yr ago");
        assert_eq!(release.published_ago(at(2026, 3, 1)), "3 yrs ago");
    }
}
