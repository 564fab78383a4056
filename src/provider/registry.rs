//! Provider registry.
//!
//! # Responsibilities
//! - Store named factories (declared capabilities)
//! - Cache created instances by name (runtime state)
//! - Enumerate factory names deterministically
//!
//! # Design Decisions
//! - The two maps are independent; overwriting a factory leaves cached instances alone
//! - Reads take the read lock, mutations the write lock

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::ProviderSettings;
use crate::error::{BoxError, Error};

/// Builds a provider instance from an opaque configuration bag.
pub type Factory<P> = Arc<dyn Fn(&ProviderSettings) -> Result<Arc<P>, BoxError> + Send + Sync>;

/// Named factories plus an instance cache.
///
/// `P` is usually a shape trait object such as `dyn RequestResponse<I, O>`.
pub struct Registry<P: ?Sized> {
    factories: RwLock<HashMap<String, Factory<P>>>,
    instances: RwLock<HashMap<String, Arc<P>>>,
}

impl<P: ?Sized> Default for Registry<P> {
    fn default() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
            instances: RwLock::new(HashMap::new()),
        }
    }
}

impl<P: ?Sized> std::fmt::Debug for Registry<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("factories", &self.list())
            .field("instances", &self.instance_names())
            .finish()
    }
}

impl<P: ?Sized> Registry<P> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store or overwrite the factory for `name`.
    pub fn register_factory<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn(&ProviderSettings) -> Result<Arc<P>, BoxError> + Send + Sync + 'static,
    {
        let name = name.into();
        tracing::debug!(provider = %name, "Registering provider factory");
        self.factories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, Arc::new(factory));
    }

    /// Invoke the factory registered under `name`.
    ///
    /// The factory runs outside the lock.
    pub fn create(&self, name: &str, settings: &ProviderSettings) -> Result<Arc<P>, Error> {
        let factory = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| Error::FactoryNotRegistered(name.to_string()))?;

        factory(settings).map_err(|source| Error::Factory {
            name: name.to_string(),
            source,
        })
    }

    /// Cached instance for `name`, if any.
    pub fn get(&self, name: &str) -> Option<Arc<P>> {
        self.instances
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Cache `instance` under `name`, replacing any previous one.
    pub fn set(&self, name: impl Into<String>, instance: Arc<P>) {
        self.instances
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), instance);
    }

    /// Factory names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Cached instance names, sorted.
    pub fn instance_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .instances
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}
