//! Plugin developers and the developer index

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::HubFeed;
use crate::error::{HubError, Result};

/// Postal address of a developer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub zip: String,
    pub country: String,
}

impl Address {
    /// Address on a single line
    pub fn full_address(&self) -> String {
        format!(
            "{}, {} {}, {}",
            self.street, self.zip, self.city, self.country
        )
    }
}

/// Support contact of a developer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Support {
    pub email: String,
    #[serde(default)]
    pub languages: Vec<String>,
}

/// A plugin developer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Developer {
    /// Stable key in the developer index
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: Option<Address>,
    #[serde(default)]
    pub homepage: String,
    #[serde(default)]
    pub support: Option<Support>,
    /// GitHub profile name
    #[serde(default)]
    pub github: Option<String>,
}

impl Developer {
    /// Developer known only by the name stored in an install manifest
    pub fn unregistered(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            name,
            address: None,
            homepage: String::new(),
            support: None,
            github: None,
        }
    }

    /// Name for display, falling back to the id
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_empty() && self.name.is_empty()
    }
}

/// Index of developers keyed by id
#[derive(Debug, Clone, Default)]
pub struct DeveloperIndex {
    developers: BTreeMap<String, Developer>,
}

impl DeveloperIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index from the remote developer feed
    pub fn from_feed(feed: &dyn HubFeed) -> Result<Self> {
        let mut index = Self::new();
        for developer in feed.developers()? {
            index.add(developer);
        }

        tracing::debug!("Loaded {} developers", index.len());
        Ok(index)
    }

    /// Add a developer; the first entry for an id wins
    ///
    /// Returns `false` if the id was already present.
    pub fn add(&mut self, developer: Developer) -> bool {
        if self.developers.contains_key(&developer.id) {
            return false;
        }
        self.developers.insert(developer.id.clone(), developer);
        true
    }

    /// Look up a developer by id
    pub fn get(&self, id: &str) -> Result<&Developer> {
        self.developers
            .get(id)
            .ok_or_else(|| HubError::DeveloperNotFound { id: id.to_string() })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.developers.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Developer> {
        self.developers.values()
    }

    pub fn len(&self) -> usize {
        self.developers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.developers.is_empty()
    }
}

impl<'a> IntoIterator for &'a DeveloperIndex {
    type Item = &'a Developer;
    type IntoIter = std::collections::btree_map::Values<'a, String, Developer>;

    fn into_iter(self) -> Self::IntoIter {
        self.developers.values()
    }
}
