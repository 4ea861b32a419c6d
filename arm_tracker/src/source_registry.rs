//! Registry of edge sources.
//!
//! Maps source names from `arm.toml` to factories. Built at startup and
//! handed to `TrackerCore::init`.

use arm::arm::source::{EdgeSource, SourceError, SourceFactory};
use std::collections::HashMap;

/// Registry of available edge sources.
pub struct SourceRegistry {
    factories: HashMap<&'static str, SourceFactory>,
}

impl SourceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with every built-in source.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        crate::sources::register_all_sources(&mut registry);
        registry
    }

    /// Register a source factory.
    ///
    /// # Panics
    /// Panics if a source with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: SourceFactory) {
        if self.factories.contains_key(name) {
            panic!("Edge source '{name}' is already registered");
        }
        self.factories.insert(name, factory);
    }

    /// Get a source factory by name.
    pub fn get_factory(&self, name: &str) -> Option<SourceFactory> {
        self.factories.get(name).copied()
    }

    /// Create a source instance by name.
    ///
    /// # Errors
    /// Returns `SourceError::SourceNotFound` if nothing is registered under `name`.
    pub fn create_source(&self, name: &str) -> Result<Box<dyn EdgeSource>, SourceError> {
        let factory = self
            .get_factory(name)
            .ok_or_else(|| SourceError::SourceNotFound(name.to_string()))?;
        Ok(factory())
    }

    /// List all registered source names, sorted.
    pub fn list_sources(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
