//! Provider manager.
//!
//! # Responsibilities
//! - Initialize named providers from registered factories
//! - Hand out a provider per call (default override, else selector)
//! - Close every closeable provider at shutdown

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::{ManagerConfig, ProviderEntry, ProviderSettings};
use crate::context::Context;
use crate::error::{BoxError, CloseFailure, Error};
use crate::provider::registry::Registry;
use crate::provider::Provider;
use crate::selector::{selector_from_config, Selector};

/// Owns a registry, a selector and the set of initialized providers.
pub struct Manager<P: ?Sized + Provider> {
    registry: Registry<P>,
    selector: Box<dyn Selector<P>>,
    providers: RwLock<HashMap<String, Arc<P>>>,
    default_name: RwLock<Option<String>>,
}

impl<P> Manager<P>
where
    P: ?Sized + Provider + 'static,
{
    pub fn new(selector: impl Selector<P> + 'static) -> Self {
        Self::with_selector(Box::new(selector))
    }

    pub fn with_selector(selector: Box<dyn Selector<P>>) -> Self {
        Self {
            registry: Registry::new(),
            selector,
            providers: RwLock::new(HashMap::new()),
            default_name: RwLock::new(None),
        }
    }

    /// Build a manager whose selector comes from `config`.
    pub fn from_config(config: &ManagerConfig) -> Self {
        Self::with_selector(selector_from_config(&config.selector))
    }

    pub fn registry(&self) -> &Registry<P> {
        &self.registry
    }

    /// Register a factory with the underlying registry.
    pub fn register<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn(&ProviderSettings) -> Result<Arc<P>, BoxError> + Send + Sync + 'static,
    {
        self.registry.register_factory(name, factory);
    }

    /// Create `name` from its factory, run its init hook and store it.
    pub async fn initialize(
        &self,
        ctx: &Context,
        name: &str,
        settings: &ProviderSettings,
    ) -> Result<(), Error> {
        self.initialize_as(ctx, name, name, settings).await
    }

    /// Like `initialize`, but the instance name may differ from the factory name.
    pub async fn initialize_as(
        &self,
        ctx: &Context,
        name: &str,
        factory: &str,
        settings: &ProviderSettings,
    ) -> Result<(), Error> {
        self.initialize_decorated(ctx, name, factory, settings, |p| p)
            .await
    }

    /// Create and init from `factory`, then store `decorate(instance)` under `name`.
    pub async fn initialize_decorated(
        &self,
        ctx: &Context,
        name: &str,
        factory: &str,
        settings: &ProviderSettings,
        decorate: impl FnOnce(Arc<P>) -> Arc<P> + Send,
    ) -> Result<(), Error> {
        let provider = self.registry.create(factory, settings)?;

        if let Some(init) = provider.as_initializable() {
            init.init(ctx).await.map_err(|source| Error::Init {
                name: name.to_string(),
                source,
            })?;
        }
        let provider = decorate(provider);

        self.providers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), provider.clone());
        // Registry readers look instances up directly, so keep both maps populated.
        self.registry.set(name, provider);

        tracing::info!(provider = %name, factory = %factory, "Provider initialized");
        Ok(())
    }

    /// Initialize every configured provider, then apply the configured default.
    pub async fn initialize_from_config(
        &self,
        ctx: &Context,
        config: &ManagerConfig,
    ) -> Result<(), Error> {
        self.initialize_from_config_with(ctx, config, |_, p| p).await
    }

    /// Like `initialize_from_config`, passing each instance through `decorate`
    /// together with its entry, typically to apply `entry.resilience`.
    pub async fn initialize_from_config_with<D>(
        &self,
        ctx: &Context,
        config: &ManagerConfig,
        decorate: D,
    ) -> Result<(), Error>
    where
        D: Fn(&ProviderEntry, Arc<P>) -> Arc<P> + Sync,
    {
        for entry in &config.providers {
            self.initialize_decorated(ctx, &entry.name, entry.factory_name(), &entry.settings, |p| {
                decorate(entry, p)
            })
            .await?;
        }
        if let Some(default) = &config.default {
            self.set_default(default)?;
        }
        Ok(())
    }

    /// The default provider if one is set, otherwise whatever the selector picks.
    pub async fn get(&self, ctx: &Context) -> Result<Arc<P>, Error> {
        let default = self
            .default_name
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        if let Some(name) = default {
            return self
                .lookup(&name)
                .ok_or(Error::DefaultProviderNotFound(name));
        }

        // Selection may block on availability checks; never hold the lock across it.
        let snapshot = self
            .providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        self.selector.select(ctx, &snapshot).await
    }

    /// Exact lookup, bypassing selection.
    pub fn get_by_name(&self, name: &str) -> Result<Arc<P>, Error> {
        self.lookup(name)
            .ok_or_else(|| Error::ProviderNotFound(name.to_string()))
    }

    fn lookup(&self, name: &str) -> Option<Arc<P>> {
        self.providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Route every `get` to `name`. The provider must already be initialized.
    pub fn set_default(&self, name: &str) -> Result<(), Error> {
        let known = self
            .providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name);
        if !known {
            return Err(Error::NotInitialized(name.to_string()));
        }

        *self
            .default_name
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(name.to_string());
        tracing::info!(provider = %name, "Default provider set");
        Ok(())
    }

    pub fn default_name(&self) -> Option<String> {
        self.default_name
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Names of all initialized providers, sorted.
    pub fn available(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Close every closeable provider, continuing past individual failures.
    pub async fn close_all(&self, ctx: &Context) -> Result<(), Error> {
        let mut snapshot: Vec<(String, Arc<P>)> = self
            .providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(name, p)| (name.clone(), p.clone()))
            .collect();
        snapshot.sort_by(|a, b| a.0.cmp(&b.0));

        let mut failures = Vec::new();
        for (name, provider) in snapshot {
            let Some(closeable) = provider.as_closeable() else {
                continue;
            };
            match closeable.close(ctx).await {
                Ok(()) => tracing::debug!(provider = %name, "Provider closed"),
                Err(source) => {
                    tracing::warn!(provider = %name, error = %source, "Provider close failed");
                    failures.push(CloseFailure { name, source });
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::Close(failures))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{Closeable, Initializable};
    use crate::selector::{PrioritySelector, RoundRobinSelector};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct Fixture {
        name: String,
        up: AtomicBool,
        fail_init: bool,
        fail_close: bool,
        closes: AtomicUsize,
    }

    #[async_trait]
    impl Provider for Fixture {
        fn name(&self) -> &str {
            &self.name
        }

        async fn is_available(&self, _ctx: &Context) -> bool {
            self.up.load(Ordering::SeqCst)
        }

        fn as_initializable(&self) -> Option<&dyn Initializable> {
            Some(self)
        }

        fn as_closeable(&self) -> Option<&dyn Closeable> {
            Some(self)
        }
    }

    #[async_trait]
    impl Initializable for Fixture {
        async fn init(&self, _ctx: &Context) -> Result<(), BoxError> {
            if self.fail_init {
                return Err("init refused".into());
            }
            Ok(())
        }
    }

    #[async_trait]
    impl Closeable for Fixture {
        async fn close(&self, _ctx: &Context) -> Result<(), BoxError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            if self.fail_close {
                return Err("close refused".into());
            }
            Ok(())
        }
    }

    fn fixture_factory(
        up: bool,
        fail_init: bool,
        fail_close: bool,
    ) -> impl Fn(&ProviderSettings) -> Result<Arc<Fixture>, BoxError> + Send + Sync + 'static {
        move |s: &ProviderSettings| {
            Ok(Arc::new(Fixture {
                name: s.get_str("name").unwrap_or("fixture").to_string(),
                up: AtomicBool::new(up),
                fail_init,
                fail_close,
                ..Default::default()
            }))
        }
    }

    fn named(name: &str) -> ProviderSettings {
        let mut s = ProviderSettings::new();
        s.insert("name", name);
        s
    }

    #[tokio::test]
    async fn test_initialize_stores_in_both_maps() {
        let ctx = Context::background();
        let manager: Manager<Fixture> = Manager::new(RoundRobinSelector::new());
        manager.register("x", fixture_factory(true, false, false));

        manager.initialize(&ctx, "x", &named("x")).await.unwrap();

        assert!(manager.get_by_name("x").is_ok());
        assert!(manager.registry().get("x").is_some());
        assert_eq!(manager.available(), vec!["x"]);
    }

    #[tokio::test]
    async fn test_failed_init_is_not_stored() {
        let ctx = Context::background();
        let manager: Manager<Fixture> = Manager::new(RoundRobinSelector::new());
        manager.register("x", fixture_factory(true, true, false));

        let err = manager.initialize(&ctx, "x", &named("x")).await.unwrap_err();
        assert!(matches!(err, Error::Init { .. }));
        assert!(matches!(
            manager.get_by_name("x"),
            Err(Error::ProviderNotFound(name)) if name == "x"
        ));
        assert!(manager.registry().get("x").is_none());
    }

    #[tokio::test]
    async fn test_initialize_unknown_factory() {
        let ctx = Context::background();
        let manager: Manager<Fixture> = Manager::new(RoundRobinSelector::new());
        let err = manager
            .initialize(&ctx, "ghost", &ProviderSettings::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "factory ghost not registered");
    }

    #[tokio::test]
    async fn test_set_default_requires_initialization() {
        let ctx = Context::background();
        let manager: Manager<Fixture> =
            Manager::new(PrioritySelector::new(["y"]));
        manager.register("x", fixture_factory(false, false, false));
        manager.register("y", fixture_factory(true, false, false));

        assert!(matches!(manager.set_default("x"), Err(Error::NotInitialized(_))));

        manager.initialize(&ctx, "x", &named("x")).await.unwrap();
        manager.initialize(&ctx, "y", &named("y")).await.unwrap();
        manager.set_default("x").unwrap();

        // The default wins even though it is unavailable and the selector prefers "y".
        for _ in 0..3 {
            assert_eq!(manager.get(&ctx).await.unwrap().name(), "x");
        }
    }

    #[tokio::test]
    async fn test_get_uses_selector_without_default() {
        let ctx = Context::background();
        let manager: Manager<Fixture> =
            Manager::new(PrioritySelector::new(["x", "y"]));
        manager.register("p", fixture_factory(false, false, false));
        manager.register("q", fixture_factory(true, false, false));
        manager.initialize_as(&ctx, "x", "p", &named("x")).await.unwrap();
        manager.initialize_as(&ctx, "y", "q", &named("y")).await.unwrap();

        assert_eq!(manager.get(&ctx).await.unwrap().name(), "y");
    }

    #[tokio::test]
    async fn test_close_all_does_not_short_circuit() {
        let ctx = Context::background();
        let manager: Manager<Fixture> = Manager::new(RoundRobinSelector::new());
        manager.register("bad", fixture_factory(true, false, true));
        manager.register("good", fixture_factory(true, false, false));
        manager.initialize_as(&ctx, "a", "bad", &named("a")).await.unwrap();
        manager.initialize_as(&ctx, "b", "good", &named("b")).await.unwrap();
        manager.initialize_as(&ctx, "c", "bad", &named("c")).await.unwrap();

        let err = manager.close_all(&ctx).await.unwrap_err();
        match err {
            Error::Close(failures) => {
                let names: Vec<_> = failures.iter().map(|f| f.name.as_str()).collect();
                assert_eq!(names, vec!["a", "c"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        for name in ["a", "b", "c"] {
            assert_eq!(manager.get_by_name(name).unwrap().closes.load(Ordering::SeqCst), 1);
        }
    }
}
