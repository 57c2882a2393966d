//! PlugHub CLI commands
//!
//! Every command builds a fresh plugin collection: developer index and
//! catalog from the hub, installed plugins from the host's manifests.

use anyhow::{anyhow, Context, Result};
use clap::Subcommand;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};
use uuid::Uuid;

use plughub_core::catalog::{HttpFeed, HubFeed, Plugin, PluginsCollection, ProgressObserver};
use plughub_core::config::HubConfig;
use plughub_core::Operation;

#[derive(Subcommand, Debug)]
pub enum HubCommand {
    /// List catalog and installed plugins
    List {
        /// Output as JSON
        #[clap(long)]
        json: bool,

        /// Only show installed plugins
        #[clap(long)]
        installed: bool,
    },

    /// Show details and releases of a plugin
    Show {
        /// Plugin UUID or name
        plugin: String,

        /// Output as JSON
        #[clap(long)]
        json: bool,
    },

    /// Check installed plugins for updates
    Check {
        /// Output as JSON
        #[clap(long)]
        json: bool,
    },

    /// Uninstall a plugin
    Uninstall {
        /// Plugin UUID or name
        plugin: String,
    },
}

impl HubCommand {
    pub fn execute(self, config: HubConfig) -> Result<()> {
        let feed = HttpFeed::new(config.clone()).context("Failed to create feed client")?;

        match self {
            HubCommand::List { json, installed } => execute_list(&config, &feed, json, installed),
            HubCommand::Show { plugin, json } => execute_show(&config, &feed, &plugin, json),
            HubCommand::Check { json } => execute_check(&config, &feed, json),
            HubCommand::Uninstall { plugin } => execute_uninstall(&config, &feed, &plugin),
        }
    }
}

/// Collection of catalog and installed plugins
///
/// An unreachable hub is not fatal: installed plugins are still listed.
fn load_collection(config: &HubConfig, feed: &dyn HubFeed) -> Result<PluginsCollection> {
    let mut collection = PluginsCollection::connect(feed).context("Failed to load developers")?;

    match collection.load_from_catalog(feed) {
        Ok(()) => {}
        Err(e) if e.is_connectivity() => {
            tracing::warn!("Catalog unavailable, showing installed plugins only: {}", e);
        }
        Err(e) => return Err(e).context("Failed to load plugin catalog"),
    }

    collection
        .load_installed(&config.paths)
        .context("Failed to read install manifests")?;
    collection.clean_up();

    Ok(collection)
}

/// Resolve a plugin given by UUID or by name
fn resolve_plugin(collection: &PluginsCollection, key: &str) -> Result<Uuid> {
    if let Ok(uuid) = Uuid::parse_str(key) {
        if let Ok(plugin) = collection.get(uuid) {
            return Ok(plugin.uuid);
        }
    }

    collection
        .find_by_name(key)
        .map(|plugin| plugin.uuid)
        .ok_or_else(|| anyhow!("Plugin '{key}' not found"))
}

fn version_display(plugin: &Plugin) -> String {
    plugin
        .installed_version
        .as_ref()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn print_table<T: Tabled>(rows: &[T]) {
    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .to_string();

    println!("{table}");
}

#[derive(Tabled)]
struct PluginRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Developer")]
    developer: String,
    #[tabled(rename = "Installed")]
    installed: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Status")]
    status: String,
}

fn execute_list(config: &HubConfig, feed: &dyn HubFeed, json_output: bool, installed_only: bool) -> Result<()> {
    let collection = load_collection(config, feed)?;

    let plugins: Vec<&Plugin> = collection
        .iter()
        .filter(|plugin| !installed_only || plugin.is_installed())
        .collect();

    if json_output {
        let json_results: Vec<serde_json::Value> = plugins
            .iter()
            .map(|plugin| {
                serde_json::json!({
                    "uuid": plugin.uuid,
                    "name": plugin.name,
                    "developer": plugin.developer.display_name(),
                    "description": plugin.description,
                    "github": plugin.github.as_ref().map(|g| g.to_string()),
                    "compatibility": plugin.compatibility.as_ref().map(|c| c.to_string()),
                    "installed_version": plugin.installed_version,
                    "location": plugin.location,
                    "status": plugin.status(),
                })
            })
            .collect();

        println!("{}", serde_json::to_string_pretty(&json_results)?);
        return Ok(());
    }

    if plugins.is_empty() {
        println!("No plugins found.");
        return Ok(());
    }

    let rows: Vec<PluginRow> = plugins
        .iter()
        .map(|plugin| PluginRow {
            name: plugin.name.clone(),
            developer: plugin.developer.display_name().to_string(),
            installed: version_display(plugin),
            location: plugin
                .location
                .map(|l| l.to_string())
                .unwrap_or_default(),
            status: plugin.status().to_string(),
        })
        .collect();

    println!("Found {} plugin(s):\n", rows.len());
    print_table(&rows);

    Ok(())
}

#[derive(Tabled)]
struct ReleaseRow {
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Published")]
    published: String,
    #[tabled(rename = "Package")]
    package: String,
    #[tabled(rename = "Notes")]
    notes: String,
}

fn execute_show(config: &HubConfig, feed: &dyn HubFeed, key: &str, json_output: bool) -> Result<()> {
    let mut collection = load_collection(config, feed)?;
    let uuid = resolve_plugin(&collection, key)?;
    let plugin = collection.get_mut(uuid)?;

    if plugin.has_github() {
        if let Err(e) = plugin.check_releases(feed) {
            tracing::warn!("Could not fetch releases of '{}': {}", plugin.name, e);
        }
    }

    let releases = plugin.releases().ok();
    let latest_compatible = plugin
        .latest_compatible_release()
        .ok()
        .flatten()
        .map(|release| release.version.clone());

    if json_output {
        let release_list: Vec<serde_json::Value> = releases
            .iter()
            .flat_map(|releases| releases.iter())
            .map(|release| {
                serde_json::json!({
                    "version": release.version,
                    "published_at": release.published_at,
                    "url": release.url,
                    "prerelease": release.is_prerelease,
                    "latest": release.latest,
                    "package": release.package.name,
                    "size": release.package.size,
                })
            })
            .collect();

        let details = serde_json::json!({
            "uuid": plugin.uuid,
            "name": plugin.name,
            "description": plugin.description,
            "developer": plugin.developer,
            "github": plugin.github,
            "compatibility": plugin.compatibility,
            "installed_version": plugin.installed_version,
            "installed_date": plugin.installed_date,
            "location": plugin.location,
            "status": plugin.status(),
            "on_actionbar": plugin.is_on_actionbar(),
            "latest_compatible": latest_compatible,
            "releases": release_list,
        });

        println!("{}", serde_json::to_string_pretty(&details)?);
        return Ok(());
    }

    let developer = &plugin.developer;

    println!("{}", plugin.name);
    println!("{}", "=".repeat(plugin.name.chars().count().max(1)));
    println!();
    println!("UUID:        {}", plugin.uuid);
    if !plugin.description.is_empty() {
        println!("Description: {}", plugin.description);
    }
    println!("Developer:   {}", developer.display_name());
    if let Some(address) = &developer.address {
        println!("Address:     {}", address.full_address());
    }
    if let Some(support) = &developer.support {
        println!("Support:     {}", support.email);
    }
    if !developer.homepage.is_empty() {
        println!("Homepage:    {}", developer.homepage);
    }
    if let Some(github) = &plugin.github {
        println!("Repository:  https://github.com/{github}");
    }
    if let Some(compatibility) = &plugin.compatibility {
        println!("Requires:    {compatibility}");
    }
    println!("Status:      {}", plugin.status());
    if let Some(version) = &plugin.installed_version {
        println!("Installed:   {version}");
    }
    if let Some(date) = plugin.installed_date {
        println!("Installed on: {}", date.format("%Y-%m-%d"));
    }
    if let Some(location) = plugin.location {
        println!("Location:    {location}");
    }
    if plugin.is_on_actionbar() {
        println!("Action bar:  yes");
    }

    let Some(releases) = releases else {
        return Ok(());
    };

    if releases.is_empty() {
        println!("\nNo releases published.");
        return Ok(());
    }

    let now = chrono::Utc::now();
    let rows: Vec<ReleaseRow> = releases
        .iter()
        .rev()
        .map(|release| {
            let mut notes = Vec::new();
            if release.is_prerelease {
                notes.push("prerelease");
            }
            if release.latest {
                notes.push("latest");
            }
            if latest_compatible.as_ref() == Some(&release.version) {
                notes.push("recommended");
            }

            ReleaseRow {
                version: release.version.to_string(),
                published: release.published_ago(now),
                package: release.package.name.clone(),
                notes: notes.join(", "),
            }
        })
        .collect();

    println!("\nReleases:\n");
    print_table(&rows);

    Ok(())
}

#[derive(Tabled)]
struct UpdateRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Installed")]
    installed: String,
    #[tabled(rename = "Latest")]
    latest: String,
    #[tabled(rename = "Status")]
    status: String,
}

fn execute_check(config: &HubConfig, feed: &dyn HubFeed, json_output: bool) -> Result<()> {
    let mut collection = load_collection(config, feed)?;
    let to_check: Vec<Uuid> = collection
        .iter()
        .filter(|plugin| plugin.is_installed() && plugin.has_github())
        .map(|plugin| plugin.uuid)
        .collect();

    if to_check.is_empty() {
        println!("No installed plugins are published on the hub.");
        return Ok(());
    }

    let mut rows = Vec::new();
    for uuid in to_check {
        let plugin = collection.get_mut(uuid)?;

        match plugin.check_releases(feed) {
            Ok(()) => {}
            Err(e) if e.is_connectivity() => {
                return Err(e).context(Operation::CheckForUpdates.failure_message());
            }
            Err(e) => {
                tracing::warn!("Skipping '{}': {}", plugin.name, e);
                rows.push(UpdateRow {
                    name: plugin.name.clone(),
                    installed: version_display(plugin),
                    latest: "-".to_string(),
                    status: format!("error: {e}"),
                });
                continue;
            }
        }

        let latest = plugin
            .latest_compatible_release()
            .ok()
            .flatten()
            .map(|release| release.version.to_string())
            .unwrap_or_else(|| "-".to_string());

        rows.push(UpdateRow {
            name: plugin.name.clone(),
            installed: version_display(plugin),
            latest,
            status: plugin.status().to_string(),
        });
    }

    if json_output {
        let json_results: Vec<serde_json::Value> = rows
            .iter()
            .map(|row| {
                serde_json::json!({
                    "name": row.name,
                    "installed": row.installed,
                    "latest": row.latest,
                    "status": row.status,
                })
            })
            .collect();

        println!("{}", serde_json::to_string_pretty(&json_results)?);
        return Ok(());
    }

    let updates = rows.iter().filter(|row| row.status == "update available").count();

    println!("{}\n", Operation::CheckForUpdates.success_message());
    print_table(&rows);
    println!("\n{updates} update(s) available.");

    Ok(())
}

/// Prints a line whenever the uninstall moves to a new phase
struct ConsoleProgress {
    done: u32,
    last_title: String,
}

impl ProgressObserver for ConsoleProgress {
    fn step(&mut self, steps: u32, title: &str) {
        self.done += steps;
        if title != self.last_title {
            eprintln!("{title}...");
            self.last_title = title.to_string();
        }
        tracing::debug!("Progress {} ({})", self.done, title);
    }
}

fn execute_uninstall(config: &HubConfig, feed: &dyn HubFeed, key: &str) -> Result<()> {
    let mut collection = load_collection(config, feed)?;
    let uuid = resolve_plugin(&collection, key)?;
    let plugin = collection.get_mut(uuid)?;

    if !plugin.is_installed() {
        println!("Plugin '{}' is not installed.", plugin.name);
        return Ok(());
    }

    let mut progress = ConsoleProgress {
        done: 0,
        last_title: String::new(),
    };
    let report = plugin
        .uninstall(&config.paths, Some(&mut progress))
        .context(Operation::Uninstall.failure_message())?;

    println!(
        "{}",
        Operation::Uninstall.success_with_warnings(&plugin.name, &report.warnings)
    );

    Ok(())
}
