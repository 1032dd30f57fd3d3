//! Class usage inventory
//!
//! Classes seeded through [`Inventory::reset`] start at zero; a class still at
//! zero after running in production is a dead code candidate.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Load counts per class and the moment tracking started
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(rename = "AutoLoaded", default)]
    pub autoloaded: BTreeMap<String, i64>,
    #[serde(rename = "Since")]
    pub since: DateTime<Utc>,
}

/// Dead/active counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InventorySummary {
    pub dead: usize,
    pub active: usize,
}

impl InventorySummary {
    pub fn total(&self) -> usize {
        self.dead + self.active
    }
}

impl Default for Inventory {
    fn default() -> Self {
        Self {
            autoloaded: BTreeMap::new(),
            since: Utc::now(),
        }
    }
}

impl Inventory {
    /// Add `count` loads; counts come off the network and saturate instead of wrapping
    pub fn increment(&mut self, class: &str, count: i64) {
        let total = self.autoloaded.entry(class.to_string()).or_insert(0);
        *total = total.saturating_add(count);
    }

    /// Start over with `classes` as the known class list, all at zero
    pub fn reset<I, S>(&mut self, classes: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.autoloaded.clear();
        self.since = Utc::now();
        for class in classes {
            let class = class.as_ref().trim();
            if !class.is_empty() {
                self.autoloaded.insert(class.to_string(), 0);
            }
        }
    }

    /// Returns whether the class was tracked
    pub fn remove(&mut self, class: &str) -> bool {
        self.autoloaded.remove(class.trim()).is_some()
    }

    /// Classes never loaded, sorted by name
    pub fn dead(&self) -> Vec<&str> {
        self.autoloaded
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(class, _)| class.as_str())
            .collect()
    }

    /// Loaded classes, most loaded first
    pub fn active(&self) -> Vec<(&str, i64)> {
        let mut active: Vec<_> = self
            .autoloaded
            .iter()
            .filter(|(_, count)| **count != 0)
            .map(|(class, count)| (class.as_str(), *count))
            .collect();
        active.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        active
    }

    pub fn summary(&self) -> InventorySummary {
        let dead = self.autoloaded.values().filter(|c| **c == 0).count();
        InventorySummary {
            dead,
            active: self.autoloaded.len() - dead,
        }
    }
}

/// Inventory shared between the receive loop and the periodic saver
#[derive(Debug, Clone, Default)]
pub struct SharedInventory {
    inner: Arc<RwLock<Inventory>>,
}

impl SharedInventory {
    pub fn new(inventory: Inventory) -> Self {
        Self {
            inner: Arc::new(RwLock::new(inventory)),
        }
    }

    /// Load from `path`; a missing file yields an empty inventory
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "No inventory file, starting empty");
            return Ok(Self::default());
        }

        let raw = std::fs::read(path)?;
        let inventory: Inventory = serde_json::from_slice(&raw)?;
        tracing::info!(
            path = %path.display(),
            classes = inventory.autoloaded.len(),
            "Loaded inventory"
        );
        Ok(Self::new(inventory))
    }

    /// Write to `path` through a temporary file so readers never see a partial file
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec(&*self.read())?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, path)?;

        tracing::debug!(path = %path.display(), "Saved inventory");
        Ok(())
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Inventory> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Inventory> {
        self.inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
