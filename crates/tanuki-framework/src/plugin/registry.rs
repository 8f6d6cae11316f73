//! Name/alias index and stage lists for installed plugins.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::{info, warn};

use super::core::{BoxedPlugin, Plugin, PluginStage};

/// Holds the installed plugins.
///
/// Every plugin, whatever its stage, is indexed under its lower-cased name and
/// each lower-cased alias. `Before`, `All` and `After` plugins are also
/// appended to an ordered per-stage list.
///
/// # Key collisions
///
/// When two plugins claim the same name or alias, the **last registration
/// wins** and the earlier plugin becomes unreachable under that key. This is
/// logged as a warning at registration time but is otherwise allowed.
///
/// # Concurrency
///
/// Registration takes `&mut self` and happens during startup. Afterwards the
/// registry is wrapped in an `Arc` and only read, so lookups need no locking.
#[derive(Default)]
pub struct PluginRegistry {
    /// Unique plugins in registration order.
    plugins: Vec<BoxedPlugin>,
    lookup: HashMap<String, BoxedPlugin>,
    before: Vec<BoxedPlugin>,
    all: Vec<BoxedPlugin>,
    after: Vec<BoxedPlugin>,
}

impl PluginRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a plugin.
    pub fn register<P: Plugin>(&mut self, plugin: P) {
        self.register_arc(Arc::new(plugin));
    }

    /// Registers an already shared plugin.
    pub fn register_arc(&mut self, plugin: BoxedPlugin) {
        let meta = plugin.metadata();

        let keys = std::iter::once(meta.name).chain(meta.aliases.iter().copied());
        for key in keys {
            let key = key.to_lowercase();
            if let Some(prev) = self.lookup.insert(key.clone(), Arc::clone(&plugin))
                && !Arc::ptr_eq(&prev, &plugin)
            {
                warn!(
                    key           = %key,
                    prev_plugin   = %prev.name(),
                    new_plugin    = %meta.name,
                    "Duplicate plugin key, last registration wins"
                );
            }
        }

        match meta.stage {
            PluginStage::Before => self.before.push(Arc::clone(&plugin)),
            PluginStage::All => self.all.push(Arc::clone(&plugin)),
            PluginStage::After => self.after.push(Arc::clone(&plugin)),
            PluginStage::Command => {}
        }

        info!(plugin = %meta.name, stage = %meta.stage, "Plugin registered");
        self.plugins.push(plugin);
    }

    /// Looks up a plugin by name or alias, ignoring case.
    ///
    /// Only exact matches resolve; an empty verb never does.
    pub fn resolve(&self, verb: &str) -> Option<BoxedPlugin> {
        if verb.is_empty() {
            return None;
        }
        self.lookup.get(&verb.to_lowercase()).cloned()
    }

    /// Returns every plugin whose category equals `category`, ignoring case.
    pub fn list_by_category(&self, category: &str) -> Vec<BoxedPlugin> {
        let wanted = category.to_lowercase();
        self.plugins
            .iter()
            .filter(|p| p.category().to_lowercase() == wanted)
            .cloned()
            .collect()
    }

    /// Returns the sorted, de-duplicated category names.
    pub fn categories(&self) -> Vec<&'static str> {
        self.plugins
            .iter()
            .map(|p| p.category())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Returns the plugins of a non-command stage in registration order.
    ///
    /// [`PluginStage::Command`] has no ordered list and yields an empty slice.
    pub fn stage(&self, stage: PluginStage) -> &[BoxedPlugin] {
        match stage {
            PluginStage::Before => &self.before,
            PluginStage::All => &self.all,
            PluginStage::After => &self.after,
            PluginStage::Command => &[],
        }
    }

    /// Returns every registered plugin in registration order.
    pub fn plugins(&self) -> &[BoxedPlugin] {
        &self.plugins
    }

    /// Returns the number of registered plugins.
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Returns `true` when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugins", &self.plugins.iter().map(|p| p.name()).collect::<Vec<_>>())
            .field("keys", &self.lookup.len())
            .finish()
    }
}
