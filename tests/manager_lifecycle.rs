//! Manager lifecycle: configuration-driven setup, selection, shutdown.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use provider_kit::config::{parse_config, ProviderSettings};
use provider_kit::middleware::{with_logging, with_metrics, with_tracing};
use provider_kit::{
    chain, with_resilience, Context, Error, Manager, Middleware, PrioritySelector, Provider,
    RequestResponse, RoundRobinSelector,
};

mod common;
use common::{Shared, ScriptedProvider};

type SharedManager = Manager<dyn RequestResponse<String, String>>;

/// Factory that builds a scripted provider named after the `label` setting
/// and remembers every instance it created.
fn register_scripted(manager: &SharedManager) -> Arc<Mutex<HashMap<String, Arc<ScriptedProvider>>>> {
    let created = Arc::new(Mutex::new(HashMap::new()));
    let sink = created.clone();
    manager.register("scripted", move |settings: &ProviderSettings| {
        let label = settings.get_str("label").unwrap_or("unnamed");
        let fail_first = settings.get_u64("fail_first").unwrap_or(0) as u32;
        let provider = ScriptedProvider::failing_first(label, fail_first);
        sink.lock().unwrap().insert(label.to_string(), provider.clone());
        Ok(provider as Shared)
    });
    created
}

const CONFIG: &str = r#"
[selector]
strategy = "priority"
order = ["primary", "secondary"]

[[providers]]
name = "primary"
factory = "scripted"
settings = { label = "primary", fail_first = 2 }

[providers.resilience.retry]
max_attempts = 3
initial_backoff_ms = 5
max_backoff_ms = 5

[[providers]]
name = "secondary"
factory = "scripted"
settings = { label = "secondary" }
"#;

#[tokio::test(start_paused = true)]
async fn test_config_driven_initialization() {
    let config = parse_config(CONFIG).unwrap();
    let manager: SharedManager = Manager::from_config(&config);
    let created = register_scripted(&manager);
    let ctx = Context::background();

    manager
        .initialize_from_config_with(&ctx, &config, |entry, p| {
            with_resilience(p, &entry.resilience)
        })
        .await
        .unwrap();
    assert_eq!(manager.available(), vec!["primary", "secondary"]);
    assert_eq!(manager.registry().instance_names(), vec!["primary", "secondary"]);

    let chosen = manager.get(&ctx).await.unwrap();
    assert_eq!(chosen.name(), "primary");
    // Two scripted failures absorbed by the configured retry.
    assert_eq!(chosen.execute(&ctx, "q".into()).await.unwrap(), "primary:q");
    assert_eq!(created.lock().unwrap()["primary"].calls(), 3);

    // Entries without resilience are stored unwrapped.
    let secondary = manager.get_by_name("secondary").unwrap();
    let raw: Shared = created.lock().unwrap()["secondary"].clone();
    assert!(Arc::ptr_eq(&secondary, &raw));
}

#[tokio::test]
async fn test_priority_falls_through_to_next_available() {
    let config = parse_config(CONFIG).unwrap();
    let manager: SharedManager = Manager::from_config(&config);
    let created = register_scripted(&manager);
    let ctx = Context::background();
    manager.initialize_from_config(&ctx, &config).await.unwrap();

    created.lock().unwrap()["primary"].set_available(false);
    assert_eq!(manager.get(&ctx).await.unwrap().name(), "secondary");

    created.lock().unwrap()["secondary"].set_available(false);
    assert!(matches!(manager.get(&ctx).await, Err(Error::NoPriorityProvider)));
}

#[tokio::test]
async fn test_default_overrides_selector() {
    let manager: SharedManager = Manager::new(PrioritySelector::new(["a"]));
    let a = ScriptedProvider::new("a");
    let b = ScriptedProvider::new("b");
    let (fa, fb) = (a.clone(), b.clone());
    manager.register("a", move |_: &ProviderSettings| Ok(fa.clone() as Shared));
    manager.register("b", move |_: &ProviderSettings| Ok(fb.clone() as Shared));
    let ctx = Context::background();

    assert!(matches!(manager.set_default("b"), Err(Error::NotInitialized(name)) if name == "b"));

    manager.initialize(&ctx, "a", &ProviderSettings::new()).await.unwrap();
    manager.initialize(&ctx, "b", &ProviderSettings::new()).await.unwrap();
    manager.set_default("b").unwrap();

    b.set_available(false);
    for _ in 0..5 {
        assert_eq!(manager.get(&ctx).await.unwrap().name(), "b");
    }
    assert_eq!(manager.default_name().as_deref(), Some("b"));
}

#[tokio::test]
async fn test_round_robin_serves_everyone() {
    let manager: SharedManager = Manager::new(RoundRobinSelector::new());
    for name in ["a", "b"] {
        let provider = ScriptedProvider::new(name);
        manager.register(name, move |_: &ProviderSettings| Ok(provider.clone() as Shared));
        manager
            .initialize(&Context::background(), name, &ProviderSettings::new())
            .await
            .unwrap();
    }

    let ctx = Context::background();
    let mut seen = HashMap::new();
    for _ in 0..10 {
        let p = manager.get(&ctx).await.unwrap();
        *seen.entry(p.name().to_string()).or_insert(0) += 1;
    }
    assert!(seen["a"] >= 1);
    assert!(seen["b"] >= 1);
}

#[tokio::test]
async fn test_failed_init_is_not_stored() {
    let manager: SharedManager = Manager::new(RoundRobinSelector::new());
    let broken = ScriptedProvider::failing_init("broken");
    manager.register("broken", move |_: &ProviderSettings| Ok(broken.clone() as Shared));
    let ctx = Context::background();

    let err = manager
        .initialize(&ctx, "broken", &ProviderSettings::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Init { ref name, .. } if name == "broken"));
    assert!(manager.available().is_empty());
    assert!(manager.registry().get("broken").is_none());

    let err = manager
        .initialize(&ctx, "ghost", &ProviderSettings::new())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "factory ghost not registered");
}

#[tokio::test]
async fn test_close_all_closes_every_provider() {
    let config = parse_config(CONFIG).unwrap();
    let manager: SharedManager = Manager::from_config(&config);
    let created = register_scripted(&manager);
    let ctx = Context::background();
    manager.initialize_from_config(&ctx, &config).await.unwrap();

    manager.close_all(&ctx).await.unwrap();
    for provider in created.lock().unwrap().values() {
        assert!(provider.is_closed());
    }
}

#[tokio::test]
async fn test_middleware_stack_preserves_identity() {
    let manager: SharedManager = Manager::new(RoundRobinSelector::new());
    let inner = ScriptedProvider::new("search");
    let backend = inner.clone();
    let stack = chain([
        Arc::new(with_logging()) as Arc<dyn Middleware<String, String>>,
        Arc::new(with_tracing("catalog")) as Arc<dyn Middleware<String, String>>,
        Arc::new(with_metrics()) as Arc<dyn Middleware<String, String>>,
    ]);
    manager.register("search", move |_: &ProviderSettings| {
        Ok(stack.wrap(inner.clone() as Shared))
    });
    let ctx = Context::background();
    manager
        .initialize(&ctx, "search", &ProviderSettings::new())
        .await
        .unwrap();

    let provider = manager.get(&ctx).await.unwrap();
    assert_eq!(provider.name(), "search");
    assert!(provider.is_available(&ctx).await);
    assert_eq!(provider.execute(&ctx, "shoes".into()).await.unwrap(), "search:shoes");

    // Lifecycle hooks reach the innermost provider through every decorator.
    manager.close_all(&ctx).await.unwrap();
    assert!(backend.is_closed());
}
