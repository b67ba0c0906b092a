//! In-memory site definition registry.

use crate::{
    definition::SiteDefinition,
    error::{Result, SiteError},
    loader::SiteLoader,
};
use jobscout_core::SiteId;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// Shared cache of site definitions keyed by site ID.
///
/// Iteration order is by site ID, so listings are stable.
#[derive(Clone, Default)]
pub struct SiteRegistry {
    definitions: Arc<RwLock<BTreeMap<SiteId, SiteDefinition>>>,
}

impl SiteRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding everything the loader finds.
    pub fn load_from(loader: &SiteLoader) -> Result<Self> {
        let registry = Self::new();
        registry.reload(loader)?;
        Ok(registry)
    }

    /// Replace the cache with freshly loaded definitions.
    pub fn reload(&self, loader: &SiteLoader) -> Result<()> {
        let definitions = loader.load_all()?;

        let mut cache = self
            .definitions
            .write()
            .expect("acquire write lock on site definitions");

        cache.clear();
        for definition in definitions {
            cache.insert(definition.id().clone(), definition);
        }

        info!(count = cache.len(), "reloaded site definitions");
        Ok(())
    }

    /// Get a site definition by ID.
    pub fn get(&self, site_id: &SiteId) -> Result<SiteDefinition> {
        self.definitions
            .read()
            .expect("acquire read lock on site definitions")
            .get(site_id)
            .cloned()
            .ok_or_else(|| SiteError::NotFound {
                site_id: site_id.to_string(),
            })
    }

    /// All definitions, ordered by ID.
    #[must_use]
    pub fn get_all(&self) -> Vec<SiteDefinition> {
        self.definitions
            .read()
            .expect("acquire read lock on site definitions")
            .values()
            .cloned()
            .collect()
    }

    /// All site IDs, ordered.
    #[must_use]
    pub fn get_all_ids(&self) -> Vec<SiteId> {
        self.definitions
            .read()
            .expect("acquire read lock on site definitions")
            .keys()
            .cloned()
            .collect()
    }

    /// Number of loaded sites.
    #[must_use]
    pub fn count(&self) -> usize {
        self.definitions
            .read()
            .expect("acquire read lock on site definitions")
            .len()
    }

    /// Whether a site is loaded.
    #[must_use]
    pub fn contains(&self, site_id: &SiteId) -> bool {
        self.definitions
            .read()
            .expect("acquire read lock on site definitions")
            .contains_key(site_id)
    }

    /// Validate and add (or replace) a definition.
    pub fn insert(&self, definition: SiteDefinition) -> Result<()> {
        definition.validate()?;

        let site_id = definition.id().clone();
        self.definitions
            .write()
            .expect("acquire write lock on site definitions")
            .insert(site_id.clone(), definition);

        debug!(site_id = %site_id, "inserted site definition");
        Ok(())
    }

    /// Remove a definition. Returns whether it was present.
    pub fn remove(&self, site_id: &SiteId) -> bool {
        let removed = self
            .definitions
            .write()
            .expect("acquire write lock on site definitions")
            .remove(site_id)
            .is_some();

        if removed {
            debug!(site_id = %site_id, "removed site definition");
        }
        removed
    }
}
