//! Cache Configuration
//!
//! [`ConfigurationBuilder`] is the root of a cache's builder tree and
//! [`Configuration`] the frozen tree it produces. Each sub-configuration
//! lives in its own module:
//!
//! | Element | Builder | Node |
//! |---------|---------|------|
//! | `clustering` | [`ClusteringConfigurationBuilder`](clustering::ClusteringConfigurationBuilder) | [`ClusteringConfiguration`](clustering::ClusteringConfiguration) |
//! | `memory` | [`MemoryConfigurationBuilder`](memory::MemoryConfigurationBuilder) | [`MemoryConfiguration`](memory::MemoryConfiguration) |
//! | `expiration` | [`ExpirationConfigurationBuilder`](expiration::ExpirationConfigurationBuilder) | [`ExpirationConfiguration`](expiration::ExpirationConfiguration) |
//! | `locking` | [`LockingConfigurationBuilder`](locking::LockingConfigurationBuilder) | [`LockingConfiguration`](locking::LockingConfiguration) |
//! | `transaction` | [`TransactionConfigurationBuilder`](transaction::TransactionConfigurationBuilder) | [`TransactionConfiguration`](transaction::TransactionConfiguration) |
//! | `persistence` | [`PersistenceConfigurationBuilder`](persistence::PersistenceConfigurationBuilder) | [`PersistenceConfiguration`](persistence::PersistenceConfiguration) |
//! | `sites` | [`SitesConfigurationBuilder`](sites::SitesConfigurationBuilder) | [`SitesConfiguration`](sites::SitesConfiguration) |
//! | `security` | [`SecurityConfigurationBuilder`](security::SecurityConfigurationBuilder) | [`SecurityConfiguration`](security::SecurityConfiguration) |
//! | `indexing` | [`IndexingConfigurationBuilder`](indexing::IndexingConfigurationBuilder) | [`IndexingConfiguration`](indexing::IndexingConfiguration) |
//! | `custom-interceptors` | [`CustomInterceptorsConfigurationBuilder`](interceptors::CustomInterceptorsConfigurationBuilder) | [`CustomInterceptorsConfiguration`](interceptors::CustomInterceptorsConfiguration) |
//!
//! # Validation
//!
//! [`ConfigurationBuilder::build`] validates every element, then the rules
//! that span elements (through a [`CacheView`] of the cache mode, the
//! transaction mode and the effective eviction strategy), then the simple
//! cache restrictions. All failures are reported together and nothing is
//! frozen unless the whole tree is valid.
//! [`ConfigurationBuilder::build_with`] additionally checks the tree
//! against a [`GlobalScope`] once the local pass succeeded.
//!
//! # Examples
//!
//! ```
//! use cache_config::config::clustering::CacheMode;
//! use cache_config::config::memory::EvictionStrategy;
//! use cache_config::ConfigurationBuilder;
//!
//! let mut builder = ConfigurationBuilder::new();
//! builder.clustering().cache_mode(CacheMode::DistSync).hash().num_owners(3);
//! builder.memory().max_count(10_000);
//!
//! let config = builder.build().unwrap();
//! assert_eq!(config.clustering().hash().num_owners(), 3);
//! assert_eq!(config.memory().when_full(), EvictionStrategy::Remove);
//! ```

/// Clustering settings.
pub mod clustering;
/// Expiration settings.
pub mod expiration;
/// Indexing settings.
pub mod indexing;
/// Custom interceptors.
pub mod interceptors;
/// Locking settings.
pub mod locking;
/// Memory and eviction settings.
pub mod memory;
/// Persistence settings.
pub mod persistence;
/// Cache authorization.
pub mod security;
/// Cross-site backups.
pub mod sites;
/// Transaction settings.
pub mod transaction;

use crate::attributes::{AttributeDefinition, AttributeSet, ChangeTracker, CombinePolicy};
use crate::builder::{Builder, ConfigurationElement, ErrorCollector, GlobalScope};
use crate::error::{Result, Violation};
use clustering::{CacheMode, ClusteringConfiguration, ClusteringConfigurationBuilder};
use expiration::{ExpirationConfiguration, ExpirationConfigurationBuilder};
use indexing::{IndexingConfiguration, IndexingConfigurationBuilder};
use interceptors::{CustomInterceptorsConfiguration, CustomInterceptorsConfigurationBuilder};
use locking::{LockingConfiguration, LockingConfigurationBuilder};
use memory::{EvictionStrategy, MemoryConfiguration, MemoryConfigurationBuilder};
use persistence::{PersistenceConfiguration, PersistenceConfigurationBuilder};
use security::{SecurityConfiguration, SecurityConfigurationBuilder};
use sites::{SitesConfiguration, SitesConfigurationBuilder};
use transaction::{TransactionConfiguration, TransactionConfigurationBuilder};

/// `cache.simple-cache`
pub static SIMPLE_CACHE: AttributeDefinition<bool> =
    AttributeDefinition::new("simple-cache", false).immutable();
/// `cache.template`
pub static TEMPLATE: AttributeDefinition<bool> =
    AttributeDefinition::new("template", false).immutable();
/// `cache.statistics`
pub static STATISTICS: AttributeDefinition<bool> = AttributeDefinition::new("statistics", false);

/// The facts about a cache that rules spanning several elements depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheView {
    /// Configured cache mode.
    pub cache_mode: CacheMode,
    /// Whether the cache is transactional.
    pub transactional: bool,
    /// Eviction strategy after implied defaults are applied.
    pub eviction: EvictionStrategy,
}

/// Repeated elements are matched across a template read by this key.
pub(crate) trait Identified {
    fn identity(&self) -> &str;
}

/// Reads repeated elements by identity.
///
/// An empty template list leaves `builders` alone. Otherwise `Override`
/// replaces the list with the template's elements, and `Combine` reads each
/// template element into the builder with the same identity, appending a new
/// builder from `make` when there is none.
pub(crate) fn read_repeated<B, F>(
    builders: &mut Vec<B>,
    template: &[B::Target],
    policy: CombinePolicy,
    mut make: F,
) -> Result<()>
where
    B: Builder + Identified,
    B::Target: Identified,
    F: FnMut(&str) -> B,
{
    if template.is_empty() {
        return Ok(());
    }
    if policy == CombinePolicy::Override {
        builders.clear();
    }
    for element in template {
        match builders.iter_mut().find(|b| b.identity() == element.identity()) {
            Some(builder) => builder.read(element, policy)?,
            None => {
                let mut builder = make(element.identity());
                builder.read(element, policy)?;
                builders.push(builder);
            }
        }
    }
    Ok(())
}

/// Mutable root of a cache configuration.
#[derive(Debug)]
pub struct ConfigurationBuilder {
    attributes: AttributeSet,
    clustering: ClusteringConfigurationBuilder,
    memory: MemoryConfigurationBuilder,
    expiration: ExpirationConfigurationBuilder,
    locking: LockingConfigurationBuilder,
    transaction: TransactionConfigurationBuilder,
    persistence: PersistenceConfigurationBuilder,
    sites: SitesConfigurationBuilder,
    security: SecurityConfigurationBuilder,
    indexing: IndexingConfigurationBuilder,
    custom_interceptors: CustomInterceptorsConfigurationBuilder,
    tracker: ChangeTracker,
}

impl Default for ConfigurationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigurationBuilder {
    /// Creates a builder holding the defaults.
    pub fn new() -> Self {
        Self::with_tracker(ChangeTracker::new())
    }

    /// Creates a builder whose writes are recorded by `tracker`.
    pub fn with_tracker(tracker: ChangeTracker) -> Self {
        let mut attributes = Configuration::attribute_set();
        tracker.attach(&mut attributes);
        Self {
            attributes,
            clustering: ClusteringConfigurationBuilder::new(&tracker),
            memory: MemoryConfigurationBuilder::new(&tracker),
            expiration: ExpirationConfigurationBuilder::new(&tracker),
            locking: LockingConfigurationBuilder::new(&tracker),
            transaction: TransactionConfigurationBuilder::new(&tracker),
            persistence: PersistenceConfigurationBuilder::new(&tracker),
            sites: SitesConfigurationBuilder::new(&tracker),
            security: SecurityConfigurationBuilder::new(&tracker),
            indexing: IndexingConfigurationBuilder::new(&tracker),
            custom_interceptors: CustomInterceptorsConfigurationBuilder::new(&tracker),
            tracker,
        }
    }

    /// Restricts the cache to the simple, local-only feature set.
    pub fn simple_cache(&mut self, simple: bool) -> &mut Self {
        self.attributes.write(&SIMPLE_CACHE, simple);
        self
    }

    /// Marks the configuration as a template for other configurations.
    pub fn template(&mut self, template: bool) -> &mut Self {
        self.attributes.write(&TEMPLATE, template);
        self
    }

    /// Enables statistics collection.
    pub fn statistics(&mut self, enabled: bool) -> &mut Self {
        self.attributes.write(&STATISTICS, enabled);
        self
    }

    /// The `clustering` element.
    pub fn clustering(&mut self) -> &mut ClusteringConfigurationBuilder {
        &mut self.clustering
    }

    /// The `memory` element.
    pub fn memory(&mut self) -> &mut MemoryConfigurationBuilder {
        &mut self.memory
    }

    /// The `expiration` element.
    pub fn expiration(&mut self) -> &mut ExpirationConfigurationBuilder {
        &mut self.expiration
    }

    /// The `locking` element.
    pub fn locking(&mut self) -> &mut LockingConfigurationBuilder {
        &mut self.locking
    }

    /// The `transaction` element.
    pub fn transaction(&mut self) -> &mut TransactionConfigurationBuilder {
        &mut self.transaction
    }

    /// The `persistence` element.
    pub fn persistence(&mut self) -> &mut PersistenceConfigurationBuilder {
        &mut self.persistence
    }

    /// The `sites` element.
    pub fn sites(&mut self) -> &mut SitesConfigurationBuilder {
        &mut self.sites
    }

    /// The `security` element.
    pub fn security(&mut self) -> &mut SecurityConfigurationBuilder {
        &mut self.security
    }

    /// The `indexing` element.
    pub fn indexing(&mut self) -> &mut IndexingConfigurationBuilder {
        &mut self.indexing
    }

    /// The `custom-interceptors` element.
    pub fn custom_interceptors(&mut self) -> &mut CustomInterceptorsConfigurationBuilder {
        &mut self.custom_interceptors
    }

    /// The tracker recording writes to this builder.
    pub fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    /// The facts cross-element rules are evaluated against.
    pub fn view(&self) -> CacheView {
        CacheView {
            cache_mode: self.clustering.mode(),
            transactional: self.transaction.is_transactional(),
            eviction: self.memory.effective_strategy(),
        }
    }

    /// Validates the tree and freezes it.
    ///
    /// # Errors
    ///
    /// Every broken local rule; nothing is frozen on failure.
    pub fn build(self) -> Result<Configuration> {
        if let Err(error) = self.validate() {
            tracing::warn!(%error, "rejected cache configuration");
            return Err(error);
        }
        Ok(self.finish())
    }

    /// Validates the tree locally, then against `global`, and freezes it.
    ///
    /// # Errors
    ///
    /// Every broken local rule, or if there are none, every broken global
    /// rule. Nothing is frozen on failure.
    pub fn build_with(self, global: &dyn GlobalScope) -> Result<Configuration> {
        if let Err(error) = self.validate().and_then(|()| self.validate_global(global)) {
            tracing::warn!(%error, global = error.is_global(), "rejected cache configuration");
            return Err(error);
        }
        Ok(self.finish())
    }

    fn finish(self) -> Configuration {
        let changes = self.tracker.describe();
        tracing::debug!(?changes, "creating cache configuration");
        self.create()
    }

    fn validate_simple_cache(&self, errors: &mut ErrorCollector) {
        let restricted = [
            (self.clustering.mode().is_clustered(), "clustering"),
            (self.transaction.is_transactional(), "transactions"),
            (self.persistence.uses_stores(), "persistence"),
            (self.indexing.is_enabled(), "indexing"),
            (!self.custom_interceptors.is_empty(), "custom interceptors"),
            (self.sites.has_active_backups(), "cross-site backups"),
            (self.security.authorization_enabled(), "authorization"),
        ];
        for (used, feature) in restricted {
            errors.ensure(!used, "cache", Violation::NotSupportedInSimpleCache { feature });
        }
    }
}

impl Builder for ConfigurationBuilder {
    type Target = Configuration;

    fn validate(&self) -> Result<()> {
        let mut errors = ErrorCollector::new();
        errors.check(self.clustering.validate());
        errors.check(self.memory.validate());
        errors.check(self.expiration.validate());
        errors.check(self.locking.validate());
        errors.check(self.transaction.validate());
        errors.check(self.persistence.validate());
        errors.check(self.sites.validate());
        errors.check(self.security.validate());
        errors.check(self.indexing.validate());
        errors.check(self.custom_interceptors.validate());

        let view = self.view();
        errors.check(self.clustering.validate_in(&view));
        errors.check(self.memory.validate_in(&view));
        errors.check(self.persistence.validate_in(&view));
        errors.check(self.sites.validate_in(&view));

        if *self.attributes.get(&SIMPLE_CACHE) {
            self.validate_simple_cache(&mut errors);
        }
        errors.into_result()
    }

    fn validate_global(&self, global: &dyn GlobalScope) -> Result<()> {
        let mut errors = ErrorCollector::new();
        let mode = self.clustering.mode();
        errors.ensure_global(
            !mode.is_clustered() || global.is_clustered(),
            "clustering",
            Violation::MissingTransport { mode },
        );
        errors.check(self.sites.validate_global(global));
        errors.check(self.security.validate_global(global));
        errors.into_result()
    }

    fn create(self) -> Configuration {
        let tracker = self.tracker;
        tracker.stop();
        let configuration = Configuration {
            attributes: self.attributes.protect(),
            clustering: self.clustering.create(),
            memory: self.memory.create(),
            expiration: self.expiration.create(),
            locking: self.locking.create(),
            transaction: self.transaction.create(),
            persistence: self.persistence.create(),
            sites: self.sites.create(),
            security: self.security.create(),
            indexing: self.indexing.create(),
            custom_interceptors: self.custom_interceptors.create(),
        };
        tracker.reset();
        configuration
    }

    fn read(&mut self, template: &Configuration, policy: CombinePolicy) -> Result<()> {
        self.attributes.read(&template.attributes, policy)?;
        self.clustering.read(&template.clustering, policy)?;
        self.memory.read(&template.memory, policy)?;
        self.expiration.read(&template.expiration, policy)?;
        self.locking.read(&template.locking, policy)?;
        self.transaction.read(&template.transaction, policy)?;
        self.persistence.read(&template.persistence, policy)?;
        self.sites.read(&template.sites, policy)?;
        self.security.read(&template.security, policy)?;
        self.indexing.read(&template.indexing, policy)?;
        self.custom_interceptors.read(&template.custom_interceptors, policy)
    }
}

/// Frozen cache configuration.
///
/// `Send + Sync`; share it behind an `Arc`.
#[derive(Debug, PartialEq)]
pub struct Configuration {
    attributes: AttributeSet,
    clustering: ClusteringConfiguration,
    memory: MemoryConfiguration,
    expiration: ExpirationConfiguration,
    locking: LockingConfiguration,
    transaction: TransactionConfiguration,
    persistence: PersistenceConfiguration,
    sites: SitesConfiguration,
    security: SecurityConfiguration,
    indexing: IndexingConfiguration,
    custom_interceptors: CustomInterceptorsConfiguration,
}

impl Configuration {
    pub(crate) fn attribute_set() -> AttributeSet {
        AttributeSet::new("cache", &[&SIMPLE_CACHE, &TEMPLATE, &STATISTICS])
    }

    /// Whether this is a simple cache.
    pub fn simple_cache(&self) -> bool {
        *self.attributes.get(&SIMPLE_CACHE)
    }

    /// Whether this configuration only serves as a template.
    pub fn is_template(&self) -> bool {
        *self.attributes.get(&TEMPLATE)
    }

    /// Whether statistics are collected.
    pub fn statistics(&self) -> bool {
        *self.attributes.get(&STATISTICS)
    }

    /// Turns statistics on or off for a running cache.
    ///
    /// # Errors
    ///
    /// Never fails for this attribute; the signature follows [`AttributeSet::set`].
    pub fn set_statistics(&mut self, enabled: bool) -> Result<()> {
        self.attributes.set(&STATISTICS, enabled)
    }

    /// Clustering settings.
    pub fn clustering(&self) -> &ClusteringConfiguration {
        &self.clustering
    }

    /// Mutable access for the attributes that stay writable at runtime.
    pub fn clustering_mut(&mut self) -> &mut ClusteringConfiguration {
        &mut self.clustering
    }

    /// Memory settings.
    pub fn memory(&self) -> &MemoryConfiguration {
        &self.memory
    }

    /// Mutable access for the attributes that stay writable at runtime.
    pub fn memory_mut(&mut self) -> &mut MemoryConfiguration {
        &mut self.memory
    }

    /// Expiration settings.
    pub fn expiration(&self) -> &ExpirationConfiguration {
        &self.expiration
    }

    /// Mutable access for the attributes that stay writable at runtime.
    pub fn expiration_mut(&mut self) -> &mut ExpirationConfiguration {
        &mut self.expiration
    }

    /// Locking settings.
    pub fn locking(&self) -> &LockingConfiguration {
        &self.locking
    }

    /// Mutable access for the attributes that stay writable at runtime.
    pub fn locking_mut(&mut self) -> &mut LockingConfiguration {
        &mut self.locking
    }

    /// Transaction settings.
    pub fn transaction(&self) -> &TransactionConfiguration {
        &self.transaction
    }

    /// Persistence settings.
    pub fn persistence(&self) -> &PersistenceConfiguration {
        &self.persistence
    }

    /// Cross-site settings.
    pub fn sites(&self) -> &SitesConfiguration {
        &self.sites
    }

    /// Security settings.
    pub fn security(&self) -> &SecurityConfiguration {
        &self.security
    }

    /// Indexing settings.
    pub fn indexing(&self) -> &IndexingConfiguration {
        &self.indexing
    }

    /// Custom interceptors.
    pub fn custom_interceptors(&self) -> &CustomInterceptorsConfiguration {
        &self.custom_interceptors
    }
}

impl ConfigurationElement for Configuration {
    fn element_name(&self) -> String {
        "cache".to_string()
    }

    fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }

    fn children(&self) -> Vec<&dyn ConfigurationElement> {
        vec![
            &self.clustering,
            &self.memory,
            &self.expiration,
            &self.locking,
            &self.transaction,
            &self.persistence,
            &self.sites,
            &self.security,
            &self.indexing,
            &self.custom_interceptors,
        ]
    }
}
