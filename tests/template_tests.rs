//! Template Tests
//!
//! Checks how frozen configurations are read back into builders, both
//! directly through `Builder::read` and through the registry.
//!
//! ## Test Strategy
//! - Templates are real frozen `Configuration`s built from fluent setters
//! - Both combine policies are checked for scalars, collections and
//!   repeated elements (stores, backups, interceptors)
//! - Equality of whole trees is used for idempotence and default stability

use cache_config::config::clustering::CacheMode;
use cache_config::config::interceptors::InterceptorPosition;
use cache_config::config::locking::IsolationLevel;
use cache_config::config::sites::BackupStrategy;
use cache_config::{
    Builder, CombinePolicy, ConfigError, Configuration, ConfigurationBuilder, ConfigurationElement,
    ConfigurationRegistry, GlobalConfigurationBuilder,
};
use std::time::Duration;

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Helper to build a distributed template with one store and two entities
fn make_template() -> Configuration {
    let mut builder = ConfigurationBuilder::new();
    builder.template(true).statistics(true);
    builder.clustering().cache_mode(CacheMode::DistSync).hash().num_owners(3);
    builder.locking().isolation(IsolationLevel::ReadCommitted);
    builder.persistence().add_store("A").preload(true);
    builder.indexing().add_indexed_entity("A").add_indexed_entity("B");
    builder.build().unwrap()
}

/// Helper to read `template` into a fresh builder and build it
fn derive(template: &Configuration, policy: CombinePolicy) -> Configuration {
    let mut builder = ConfigurationBuilder::new();
    builder.read(template, policy).unwrap();
    builder.build().unwrap()
}

/// Helper to list store names in order
fn store_names(config: &Configuration) -> Vec<&str> {
    config.persistence().stores().iter().map(|s| s.name()).collect()
}

/// Helper to create a clustered registry in site `LON`
fn make_registry() -> ConfigurationRegistry {
    let mut global = GlobalConfigurationBuilder::clustered();
    global.transport().site("LON");
    ConfigurationRegistry::new(global.build().unwrap())
}

// ============================================================================
// DEFAULTS
// ============================================================================

#[test]
fn test_default_stability() {
    let first = ConfigurationBuilder::new().build().unwrap();
    let second = ConfigurationBuilder::new().build().unwrap();
    assert_eq!(first, second);
    assert_eq!(first.to_btreemap(), second.to_btreemap());
}

#[test]
fn test_reading_defaults_changes_nothing() {
    let defaults = ConfigurationBuilder::new().build().unwrap();
    let mut builder = ConfigurationBuilder::new();
    builder.locking().concurrency_level(64);
    builder.read(&defaults, CombinePolicy::Override).unwrap();
    let config = builder.build().unwrap();
    assert_eq!(config.locking().concurrency_level(), 64);
}

// ============================================================================
// OVERRIDE
// ============================================================================

#[test]
fn test_override_copies_template() {
    let template = make_template();
    let derived = derive(&template, CombinePolicy::Override);
    assert_eq!(derived, template);
    assert_eq!(derived.to_btreemap(), template.to_btreemap());
}

#[test]
fn test_override_read_is_idempotent() {
    let template = make_template();

    let mut once = ConfigurationBuilder::new();
    once.read(&template, CombinePolicy::Override).unwrap();
    let mut twice = ConfigurationBuilder::new();
    twice.read(&template, CombinePolicy::Override).unwrap();
    twice.read(&template, CombinePolicy::Override).unwrap();

    assert_eq!(once.build().unwrap(), twice.build().unwrap());
}

#[test]
fn test_override_replaces_written_values() {
    let template = make_template();
    let mut builder = ConfigurationBuilder::new();
    builder.clustering().hash().num_owners(5);
    builder.persistence().add_store("Z");
    builder.read(&template, CombinePolicy::Override).unwrap();
    let config = builder.build().unwrap();

    assert_eq!(config.clustering().hash().num_owners(), 3);
    assert_eq!(store_names(&config), vec!["A"]);
}

#[test]
fn test_override_keeps_list_when_template_has_none() {
    let template = ConfigurationBuilder::new().build().unwrap();
    let mut builder = ConfigurationBuilder::new();
    builder.persistence().add_store("mine");
    builder.read(&template, CombinePolicy::Override).unwrap();
    assert_eq!(store_names(&builder.build().unwrap()), vec!["mine"]);
}

#[test]
fn test_settings_after_read_win() {
    let template = make_template();
    let mut builder = ConfigurationBuilder::new();
    builder.read(&template, CombinePolicy::Override).unwrap();
    builder.clustering().hash().num_owners(1);
    builder.template(false);
    let config = builder.build().unwrap();
    assert_eq!(config.clustering().hash().num_owners(), 1);
    assert_eq!(config.clustering().cache_mode(), CacheMode::DistSync);
    assert!(!config.is_template());
}

// ============================================================================
// COMBINE
// ============================================================================

#[test]
fn test_combine_union_of_collections() {
    let template = make_template();
    let mut builder = ConfigurationBuilder::new();
    builder.indexing().add_indexed_entity("B").add_indexed_entity("C");
    builder.read(&template, CombinePolicy::Combine).unwrap();
    let config = builder.build().unwrap();

    let entities: Vec<&str> =
        config.indexing().indexed_entities().iter().map(String::as_str).collect();
    assert_eq!(entities, vec!["A", "B", "C"]);
}

#[test]
fn test_combine_keeps_explicit_scalars() {
    let template = make_template();
    let mut builder = ConfigurationBuilder::new();
    builder.clustering().hash().num_owners(5);
    builder.read(&template, CombinePolicy::Combine).unwrap();
    let config = builder.build().unwrap();

    assert_eq!(config.clustering().hash().num_owners(), 5);
    assert_eq!(config.clustering().cache_mode(), CacheMode::DistSync);
    assert_eq!(config.locking().isolation(), IsolationLevel::ReadCommitted);
}

#[test]
fn test_combine_merges_stores_by_name() {
    let template = make_template();
    let mut builder = ConfigurationBuilder::new();
    builder.persistence().add_store("A").purge_on_startup(true);
    builder.persistence().add_store("B");
    builder.read(&template, CombinePolicy::Combine).unwrap();
    let config = builder.build().unwrap();

    assert_eq!(store_names(&config), vec!["A", "B"]);
    let a = config.persistence().store("A").unwrap();
    assert!(a.preload());
    assert!(a.purge_on_startup());
}

#[test]
fn test_combine_appends_backups_and_interceptors() {
    let mut template = ConfigurationBuilder::new();
    template.clustering().cache_mode(CacheMode::ReplSync);
    template.sites().add_backup("NYC").strategy(BackupStrategy::Sync);
    template
        .custom_interceptors()
        .add_interceptor("audit")
        .position(InterceptorPosition::First);
    let template = template.build().unwrap();

    let mut builder = ConfigurationBuilder::new();
    builder.sites().add_backup("SFO").timeout(Duration::from_secs(5));
    builder.read(&template, CombinePolicy::Combine).unwrap();
    let config = builder.build().unwrap();

    let sites: Vec<&str> = config.sites().backups().iter().map(|b| b.site()).collect();
    assert_eq!(sites, vec!["SFO", "NYC"]);
    assert_eq!(config.sites().sync_backups().count(), 1);
    assert_eq!(config.custom_interceptors().interceptors()[0].name(), "audit");
}

// ============================================================================
// FROZEN TEMPLATES
// ============================================================================

#[test]
fn test_template_survives_derivation() {
    let template = make_template();
    let before = template.to_btreemap();
    let mut builder = ConfigurationBuilder::new();
    builder.read(&template, CombinePolicy::Combine).unwrap();
    builder.clustering().hash().num_owners(9);
    builder.build().unwrap();
    assert_eq!(template.to_btreemap(), before);
}

#[test]
fn test_runtime_changes_on_frozen_configuration() {
    let mut builder = ConfigurationBuilder::new();
    builder.template(true).statistics(true).memory().max_count(100);
    let mut config = builder.build().unwrap();
    config.set_statistics(false).unwrap();
    config.memory_mut().set_max_count(500).unwrap();
    config.expiration_mut().set_lifespan(Some(Duration::from_secs(60))).unwrap();

    assert!(!config.statistics());
    assert_eq!(config.memory().max_count(), Some(500));
    assert_eq!(config.expiration().lifespan(), Some(Duration::from_secs(60)));
}

#[test]
fn test_runtime_changes_follow_build_rules() {
    let mut builder = ConfigurationBuilder::new();
    builder.clustering().cache_mode(CacheMode::ReplSync);
    builder.memory().max_size("1 GB");
    let mut config = builder.build().unwrap();

    assert!(config.memory_mut().set_max_size("0").is_err());
    assert!(config.clustering_mut().set_remote_timeout(Duration::ZERO).is_err());
    config.clustering_mut().set_remote_timeout(Duration::from_secs(20)).unwrap();

    assert_eq!(config.memory().max_size(), Some("1 GB"));
    assert_eq!(config.clustering().remote_timeout(), Duration::from_secs(20));

    let mut unbounded = ConfigurationBuilder::new().build().unwrap();
    assert!(unbounded.memory_mut().set_max_count(100).is_err());
    assert_eq!(unbounded.memory().max_count(), None);
}

// ============================================================================
// REGISTRY
// ============================================================================

#[test]
fn test_registry_derivation() {
    let registry = make_registry();
    let mut base = ConfigurationBuilder::new();
    base.template(true).clustering().cache_mode(CacheMode::DistSync);
    base.sites().add_backup("NYC");
    registry.define("base", base).unwrap();

    let derived = registry
        .define_from_template("orders", "base", CombinePolicy::Combine, |b| {
            b.sites().add_backup("SFO");
        })
        .unwrap();

    assert!(!derived.is_template());
    assert!(registry.get("base").unwrap().is_template());
    assert_eq!(derived.sites().backups().len(), 2);
    assert_eq!(registry.names(), vec!["base", "orders"]);
}

#[test]
fn test_registry_derivation_is_validated() {
    let registry = make_registry();
    let mut base = ConfigurationBuilder::new();
    base.template(true).clustering().cache_mode(CacheMode::DistSync);
    registry.define("base", base).unwrap();

    let error = registry
        .define_from_template("bad", "base", CombinePolicy::Override, |b| {
            b.sites().add_backup("LON");
        })
        .unwrap_err();
    assert!(error.is_global());
    assert!(registry.get("bad").is_none());
    assert!(matches!(
        registry.define_from_template("base", "base", CombinePolicy::Override, |_| {}),
        Err(ConfigError::AlreadyDefined(_))
    ));
}
