//! Persistence configuration.
//!
//! A cache may be backed by any number of stores. Each store is a repeated
//! `store` element identified by its name; validation failures of a store are
//! reported against `persistence.store[<name>]`.
//!
//! ```text
//! persistence (passivation, availability-interval, connection-attempts)
//!  ├── store[a] (shared, read-only, write-only, preload, ...)
//!  │     └── write-behind (enabled, modification-queue-size, ...)
//!  └── store[b]
//!        └── write-behind
//! ```
//!
//! `ignore-modifications` is the legacy spelling of `read-only`. It is still
//! accepted, counts as read-only for validation, and sets `read-only` when
//! the configuration is created.

use crate::attributes::{AttributeDefinition, AttributeSet, ChangeTracker, CombinePolicy};
use crate::builder::{Builder, ConfigurationElement, ErrorCollector};
use crate::config::{read_repeated, CacheView, Identified};
use crate::error::{Result, Violation};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// `persistence.passivation`
pub static PASSIVATION: AttributeDefinition<bool> =
    AttributeDefinition::new("passivation", false).immutable();
/// `persistence.availability-interval`
pub static AVAILABILITY_INTERVAL: AttributeDefinition<Duration> =
    AttributeDefinition::new("availability-interval", Duration::from_secs(1)).immutable();
/// `persistence.connection-attempts`
pub static CONNECTION_ATTEMPTS: AttributeDefinition<u32> =
    AttributeDefinition::new("connection-attempts", 10).immutable();

/// `store.name`
pub static NAME: AttributeDefinition<String> =
    AttributeDefinition::new("name", String::new()).immutable();
/// `store.shared`
pub static SHARED: AttributeDefinition<bool> =
    AttributeDefinition::new("shared", false).immutable();
/// `store.read-only`
pub static READ_ONLY: AttributeDefinition<bool> =
    AttributeDefinition::new("read-only", false).immutable();
/// `store.write-only`
pub static WRITE_ONLY: AttributeDefinition<bool> =
    AttributeDefinition::new("write-only", false).immutable();
/// `store.ignore-modifications`, superseded by `read-only`.
pub static IGNORE_MODIFICATIONS: AttributeDefinition<bool> =
    AttributeDefinition::new("ignore-modifications", false).immutable();
/// `store.purge-on-startup`
pub static PURGE_ON_STARTUP: AttributeDefinition<bool> =
    AttributeDefinition::new("purge-on-startup", false).immutable();
/// `store.transactional`
pub static TRANSACTIONAL: AttributeDefinition<bool> =
    AttributeDefinition::new("transactional", false).immutable();
/// `store.segmented`
pub static SEGMENTED: AttributeDefinition<bool> =
    AttributeDefinition::new("segmented", true).immutable();
/// `store.preload`
pub static PRELOAD: AttributeDefinition<bool> =
    AttributeDefinition::new("preload", false).immutable();
/// `store.fetch-state`
pub static FETCH_STATE: AttributeDefinition<bool> =
    AttributeDefinition::new("fetch-state", false).immutable();
/// `store.singleton`
pub static SINGLETON: AttributeDefinition<bool> =
    AttributeDefinition::new("singleton", false).immutable();
/// `store.properties`
pub static PROPERTIES: AttributeDefinition<BTreeMap<String, String>> =
    AttributeDefinition::new("properties", BTreeMap::new()).immutable();

/// `write-behind.enabled`
pub static WRITE_BEHIND_ENABLED: AttributeDefinition<bool> =
    AttributeDefinition::new("enabled", false).immutable();
/// `write-behind.modification-queue-size`
pub static MODIFICATION_QUEUE_SIZE: AttributeDefinition<u32> =
    AttributeDefinition::new("modification-queue-size", 1024).immutable();
/// `write-behind.thread-pool-size`
pub static THREAD_POOL_SIZE: AttributeDefinition<u32> =
    AttributeDefinition::new("thread-pool-size", 1).immutable();
/// `write-behind.fail-silently`
pub static FAIL_SILENTLY: AttributeDefinition<bool> =
    AttributeDefinition::new("fail-silently", false).immutable();

// ============================================================================
// write-behind
// ============================================================================

/// Builder for [`WriteBehindConfiguration`].
#[derive(Debug)]
pub struct WriteBehindConfigurationBuilder {
    attributes: AttributeSet,
}

impl WriteBehindConfigurationBuilder {
    fn new(tracker: &ChangeTracker) -> Self {
        let mut attributes = WriteBehindConfiguration::attribute_set();
        tracker.attach(&mut attributes);
        Self { attributes }
    }

    /// Makes writes to the store asynchronous.
    pub fn enable(&mut self) -> &mut Self {
        self.attributes.write(&WRITE_BEHIND_ENABLED, true);
        self
    }

    /// Makes writes to the store synchronous again.
    pub fn disable(&mut self) -> &mut Self {
        self.attributes.write(&WRITE_BEHIND_ENABLED, false);
        self
    }

    /// Maximum number of pending modifications.
    pub fn modification_queue_size(&mut self, size: u32) -> &mut Self {
        self.attributes.write(&MODIFICATION_QUEUE_SIZE, size);
        self
    }

    /// Threads applying pending modifications.
    pub fn thread_pool_size(&mut self, size: u32) -> &mut Self {
        self.attributes.write(&THREAD_POOL_SIZE, size);
        self
    }

    /// Whether failed writes are dropped instead of retried.
    pub fn fail_silently(&mut self, fail_silently: bool) -> &mut Self {
        self.attributes.write(&FAIL_SILENTLY, fail_silently);
        self
    }

    fn is_enabled(&self) -> bool {
        *self.attributes.get(&WRITE_BEHIND_ENABLED)
    }

    fn validate_for(&self, element: &str) -> Result<()> {
        let mut errors = ErrorCollector::new();
        if self.is_enabled() {
            errors.ensure(
                *self.attributes.get(&MODIFICATION_QUEUE_SIZE) > 0,
                element,
                Violation::NonPositive { attribute: "modification-queue-size" },
            );
            errors.ensure(
                *self.attributes.get(&THREAD_POOL_SIZE) > 0,
                element,
                Violation::NonPositive { attribute: "thread-pool-size" },
            );
        }
        errors.into_result()
    }
}

impl Builder for WriteBehindConfigurationBuilder {
    type Target = WriteBehindConfiguration;

    fn validate(&self) -> Result<()> {
        self.validate_for("persistence.store.write-behind")
    }

    fn create(self) -> WriteBehindConfiguration {
        WriteBehindConfiguration::new(self.attributes.protect())
    }

    fn read(&mut self, template: &WriteBehindConfiguration, policy: CombinePolicy) -> Result<()> {
        self.attributes.read(&template.attributes, policy)
    }
}

/// Asynchronous store writes.
#[derive(Debug, PartialEq)]
pub struct WriteBehindConfiguration {
    attributes: AttributeSet,
}

impl WriteBehindConfiguration {
    pub(crate) fn attribute_set() -> AttributeSet {
        AttributeSet::new(
            "persistence.store.write-behind",
            &[&WRITE_BEHIND_ENABLED, &MODIFICATION_QUEUE_SIZE, &THREAD_POOL_SIZE, &FAIL_SILENTLY],
        )
    }

    fn new(attributes: AttributeSet) -> Self {
        debug_assert!(attributes.check_protection().is_ok());
        Self { attributes }
    }

    /// Whether writes reach the store asynchronously.
    pub fn enabled(&self) -> bool {
        *self.attributes.get(&WRITE_BEHIND_ENABLED)
    }

    /// Pending modifications held before writers block.
    pub fn modification_queue_size(&self) -> u32 {
        *self.attributes.get(&MODIFICATION_QUEUE_SIZE)
    }

    /// Threads applying queued modifications.
    pub fn thread_pool_size(&self) -> u32 {
        *self.attributes.get(&THREAD_POOL_SIZE)
    }

    /// Whether a full queue drops modifications instead of blocking.
    pub fn fail_silently(&self) -> bool {
        *self.attributes.get(&FAIL_SILENTLY)
    }
}

impl ConfigurationElement for WriteBehindConfiguration {
    fn element_name(&self) -> String {
        "write-behind".to_string()
    }

    fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }
}

// ============================================================================
// store
// ============================================================================

/// Builder for one [`StoreConfiguration`].
#[derive(Debug)]
pub struct StoreConfigurationBuilder {
    attributes: AttributeSet,
    write_behind: WriteBehindConfigurationBuilder,
}

impl StoreConfigurationBuilder {
    fn new(tracker: &ChangeTracker, name: &str) -> Self {
        let mut attributes = StoreConfiguration::attribute_set();
        tracker.attach(&mut attributes);
        attributes.write(&NAME, name.to_string());
        Self {
            attributes,
            write_behind: WriteBehindConfigurationBuilder::new(tracker),
        }
    }

    /// Store name.
    pub fn name(&self) -> &str {
        self.attributes.get(&NAME).as_str()
    }

    /// Whether the store is shared by every node.
    pub fn shared(&mut self, shared: bool) -> &mut Self {
        self.attributes.write(&SHARED, shared);
        self
    }

    /// Whether the cache never writes to the store.
    pub fn read_only(&mut self, read_only: bool) -> &mut Self {
        self.attributes.write(&READ_ONLY, read_only);
        self
    }

    /// Whether the cache never reads from the store.
    pub fn write_only(&mut self, write_only: bool) -> &mut Self {
        self.attributes.write(&WRITE_ONLY, write_only);
        self
    }

    /// Legacy alias of [`read_only`](Self::read_only).
    #[deprecated(note = "use `read_only`")]
    pub fn ignore_modifications(&mut self, ignore: bool) -> &mut Self {
        tracing::warn!(
            store = %self.name(),
            "'ignore-modifications' is deprecated, use 'read-only' instead"
        );
        self.attributes.write(&IGNORE_MODIFICATIONS, ignore);
        self
    }

    /// Whether the store is cleared when the cache starts.
    pub fn purge_on_startup(&mut self, purge: bool) -> &mut Self {
        self.attributes.write(&PURGE_ON_STARTUP, purge);
        self
    }

    /// Whether the store takes part in cache transactions.
    pub fn transactional(&mut self, transactional: bool) -> &mut Self {
        self.attributes.write(&TRANSACTIONAL, transactional);
        self
    }

    /// Whether the store is split by hash segment.
    pub fn segmented(&mut self, segmented: bool) -> &mut Self {
        self.attributes.write(&SEGMENTED, segmented);
        self
    }

    /// Whether the store is loaded into memory on start.
    pub fn preload(&mut self, preload: bool) -> &mut Self {
        self.attributes.write(&PRELOAD, preload);
        self
    }

    /// Whether joining nodes fetch this store's state.
    pub fn fetch_state(&mut self, fetch: bool) -> &mut Self {
        self.attributes.write(&FETCH_STATE, fetch);
        self
    }

    /// Whether only the coordinator writes to the store.
    pub fn singleton(&mut self, singleton: bool) -> &mut Self {
        self.attributes.write(&SINGLETON, singleton);
        self
    }

    /// Adds an implementation specific property.
    pub fn add_property(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let mut properties = self.attributes.get(&PROPERTIES).clone();
        properties.insert(key.into(), value.into());
        self.attributes.write(&PROPERTIES, properties);
        self
    }

    /// Write-behind settings.
    pub fn write_behind(&mut self) -> &mut WriteBehindConfigurationBuilder {
        &mut self.write_behind
    }

    fn flag(&self, definition: &AttributeDefinition<bool>) -> bool {
        *self.attributes.get(definition)
    }

    fn is_read_only(&self) -> bool {
        self.flag(&READ_ONLY) || self.flag(&IGNORE_MODIFICATIONS)
    }

    fn element(&self) -> String {
        format!("persistence.store[{}]", self.name())
    }

    pub(crate) fn validate_in(&self, view: &CacheView) -> Result<()> {
        let mut errors = ErrorCollector::new();
        let element = self.element();
        errors.ensure(
            !self.flag(&SHARED) || view.cache_mode.is_clustered(),
            &element,
            Violation::SharedStoreRequiresClusteredCache { mode: view.cache_mode },
        );
        errors.ensure(
            !self.flag(&TRANSACTIONAL) || view.transactional,
            &element,
            Violation::TransactionalStoreRequiresTransactions,
        );
        errors.into_result()
    }
}

impl Identified for StoreConfigurationBuilder {
    fn identity(&self) -> &str {
        self.name()
    }
}

impl Builder for StoreConfigurationBuilder {
    type Target = StoreConfiguration;

    fn validate(&self) -> Result<()> {
        let mut errors = ErrorCollector::new();
        let element = self.element();
        let read_only = self.is_read_only();
        let write_behind = self.write_behind.is_enabled();

        errors.ensure(!self.name().is_empty(), &element, Violation::Missing { attribute: "name" });
        errors.ensure(
            !(read_only && self.flag(&WRITE_ONLY)),
            &element,
            Violation::ReadOnlyAndWriteOnly,
        );
        errors.ensure(
            !(read_only && self.flag(&PURGE_ON_STARTUP)),
            &element,
            Violation::ReadOnlyStore { attribute: "purge-on-startup" },
        );
        errors.ensure(
            !(read_only && write_behind),
            &element,
            Violation::ReadOnlyStore { attribute: "write-behind" },
        );
        errors.ensure(
            !(self.flag(&WRITE_ONLY) && self.flag(&PRELOAD)),
            &element,
            Violation::WriteOnlyPreload,
        );
        errors.ensure(
            !(self.flag(&SHARED) && self.flag(&SINGLETON)),
            &element,
            Violation::SharedSingletonStore,
        );
        errors.ensure(
            !self.flag(&TRANSACTIONAL) || self.flag(&SHARED),
            &element,
            Violation::TransactionalStoreNotShared,
        );
        errors.ensure(
            !(self.flag(&TRANSACTIONAL) && write_behind),
            &element,
            Violation::AsyncTransactionalStore,
        );
        errors.check(self.write_behind.validate_for(&format!("{}.write-behind", element)));
        errors.into_result()
    }

    fn create(mut self) -> StoreConfiguration {
        if self.flag(&IGNORE_MODIFICATIONS) && !self.flag(&READ_ONLY) {
            self.attributes.write(&READ_ONLY, true);
        }
        StoreConfiguration::new(self.attributes.protect(), self.write_behind.create())
    }

    fn read(&mut self, template: &StoreConfiguration, policy: CombinePolicy) -> Result<()> {
        self.attributes.read(&template.attributes, policy)?;
        self.write_behind.read(&template.write_behind, policy)
    }
}

/// One frozen store.
#[derive(Debug, PartialEq)]
pub struct StoreConfiguration {
    attributes: AttributeSet,
    write_behind: WriteBehindConfiguration,
}

impl StoreConfiguration {
    pub(crate) fn attribute_set() -> AttributeSet {
        AttributeSet::new(
            "persistence.store",
            &[
                &NAME,
                &SHARED,
                &READ_ONLY,
                &WRITE_ONLY,
                &IGNORE_MODIFICATIONS,
                &PURGE_ON_STARTUP,
                &TRANSACTIONAL,
                &SEGMENTED,
                &PRELOAD,
                &FETCH_STATE,
                &SINGLETON,
                &PROPERTIES,
            ],
        )
    }

    fn new(attributes: AttributeSet, write_behind: WriteBehindConfiguration) -> Self {
        debug_assert!(attributes.check_protection().is_ok());
        Self {
            attributes,
            write_behind,
        }
    }

    /// Store name.
    pub fn name(&self) -> &str {
        self.attributes.get(&NAME).as_str()
    }

    /// Whether the store is shared by all nodes.
    pub fn shared(&self) -> bool {
        *self.attributes.get(&SHARED)
    }

    /// Includes stores configured through `ignore-modifications`.
    pub fn read_only(&self) -> bool {
        *self.attributes.get(&READ_ONLY)
    }

    /// Whether the store is never read.
    pub fn write_only(&self) -> bool {
        *self.attributes.get(&WRITE_ONLY)
    }

    /// Whether the store is cleared on startup.
    pub fn purge_on_startup(&self) -> bool {
        *self.attributes.get(&PURGE_ON_STARTUP)
    }

    /// Whether the store takes part in cache transactions.
    pub fn transactional(&self) -> bool {
        *self.attributes.get(&TRANSACTIONAL)
    }

    /// Whether the store is segmented.
    pub fn segmented(&self) -> bool {
        *self.attributes.get(&SEGMENTED)
    }

    /// Whether the store is loaded into memory on startup.
    pub fn preload(&self) -> bool {
        *self.attributes.get(&PRELOAD)
    }

    /// Whether state is fetched from this store when joining.
    pub fn fetch_state(&self) -> bool {
        *self.attributes.get(&FETCH_STATE)
    }

    /// Whether only the coordinator writes to the store.
    pub fn singleton(&self) -> bool {
        *self.attributes.get(&SINGLETON)
    }

    /// Implementation-specific properties.
    pub fn properties(&self) -> &BTreeMap<String, String> {
        self.attributes.get(&PROPERTIES)
    }

    /// Write-behind settings.
    pub fn write_behind(&self) -> &WriteBehindConfiguration {
        &self.write_behind
    }
}

impl Identified for StoreConfiguration {
    fn identity(&self) -> &str {
        self.name()
    }
}

impl ConfigurationElement for StoreConfiguration {
    fn element_name(&self) -> String {
        format!("store[{}]", self.name())
    }

    fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }

    fn children(&self) -> Vec<&dyn ConfigurationElement> {
        vec![&self.write_behind]
    }
}

// ============================================================================
// persistence
// ============================================================================

/// Builder for [`PersistenceConfiguration`].
#[derive(Debug)]
pub struct PersistenceConfigurationBuilder {
    attributes: AttributeSet,
    stores: Vec<StoreConfigurationBuilder>,
    tracker: ChangeTracker,
}

impl PersistenceConfigurationBuilder {
    pub(crate) fn new(tracker: &ChangeTracker) -> Self {
        let mut attributes = PersistenceConfiguration::attribute_set();
        tracker.attach(&mut attributes);
        Self {
            attributes,
            stores: Vec::new(),
            tracker: tracker.clone(),
        }
    }

    /// Whether entries are written to the stores only when evicted.
    pub fn passivation(&mut self, passivation: bool) -> &mut Self {
        self.attributes.write(&PASSIVATION, passivation);
        self
    }

    /// Interval between store availability checks.
    pub fn availability_interval(&mut self, interval: Duration) -> &mut Self {
        self.attributes.write(&AVAILABILITY_INTERVAL, interval);
        self
    }

    /// Attempts to reach a store on start.
    pub fn connection_attempts(&mut self, attempts: u32) -> &mut Self {
        self.attributes.write(&CONNECTION_ATTEMPTS, attempts);
        self
    }

    /// Declares a new store named `name`.
    pub fn add_store(&mut self, name: &str) -> &mut StoreConfigurationBuilder {
        let store = StoreConfigurationBuilder::new(&self.tracker, name);
        self.stores.push(store);
        let last = self.stores.len() - 1;
        &mut self.stores[last]
    }

    /// The first declared store named `name`.
    pub fn store(&mut self, name: &str) -> Option<&mut StoreConfigurationBuilder> {
        self.stores.iter_mut().find(|s| s.name() == name)
    }

    /// Removes every declared store.
    pub fn clear_stores(&mut self) -> &mut Self {
        self.stores.clear();
        self
    }

    pub(crate) fn uses_stores(&self) -> bool {
        !self.stores.is_empty() || *self.attributes.get(&PASSIVATION)
    }

    pub(crate) fn validate_in(&self, view: &CacheView) -> Result<()> {
        let mut errors = ErrorCollector::new();
        for store in &self.stores {
            errors.check(store.validate_in(view));
        }
        errors.into_result()
    }
}

impl Builder for PersistenceConfigurationBuilder {
    type Target = PersistenceConfiguration;

    fn validate(&self) -> Result<()> {
        let mut errors = ErrorCollector::new();
        errors.ensure(
            *self.attributes.get(&CONNECTION_ATTEMPTS) > 0,
            "persistence",
            Violation::NonPositive { attribute: "connection-attempts" },
        );
        errors.ensure(
            !self.attributes.get(&AVAILABILITY_INTERVAL).is_zero(),
            "persistence",
            Violation::NonPositive { attribute: "availability-interval" },
        );

        let mut names = BTreeSet::new();
        for store in &self.stores {
            errors.check(store.validate());
            if !names.insert(store.name()) {
                errors.ensure(
                    false,
                    "persistence",
                    Violation::DuplicateElement {
                        name: store.name().to_string(),
                    },
                );
            }
        }

        errors.ensure(
            !(*self.attributes.get(&PASSIVATION) && self.stores.iter().any(|s| s.flag(&SHARED))),
            "persistence",
            Violation::PassivationWithSharedStore,
        );
        errors.ensure(
            self.stores.iter().filter(|s| s.flag(&FETCH_STATE)).count() <= 1,
            "persistence",
            Violation::MultipleFetchStateStores,
        );
        errors.into_result()
    }

    fn create(self) -> PersistenceConfiguration {
        PersistenceConfiguration::new(
            self.attributes.protect(),
            self.stores.into_iter().map(Builder::create).collect(),
        )
    }

    fn read(&mut self, template: &PersistenceConfiguration, policy: CombinePolicy) -> Result<()> {
        self.attributes.read(&template.attributes, policy)?;
        let tracker = self.tracker.clone();
        read_repeated(&mut self.stores, &template.stores, policy, |name| {
            StoreConfigurationBuilder::new(&tracker, name)
        })
    }
}

/// Frozen persistence settings and stores.
#[derive(Debug, PartialEq)]
pub struct PersistenceConfiguration {
    attributes: AttributeSet,
    stores: Vec<StoreConfiguration>,
}

impl PersistenceConfiguration {
    pub(crate) fn attribute_set() -> AttributeSet {
        AttributeSet::new(
            "persistence",
            &[&PASSIVATION, &AVAILABILITY_INTERVAL, &CONNECTION_ATTEMPTS],
        )
    }

    fn new(attributes: AttributeSet, stores: Vec<StoreConfiguration>) -> Self {
        debug_assert!(attributes.check_protection().is_ok());
        Self { attributes, stores }
    }

    /// Whether entries live in the store only after eviction.
    pub fn passivation(&self) -> bool {
        *self.attributes.get(&PASSIVATION)
    }

    /// Interval between store availability checks.
    pub fn availability_interval(&self) -> Duration {
        *self.attributes.get(&AVAILABILITY_INTERVAL)
    }

    /// Connection attempts before the store counts as unavailable.
    pub fn connection_attempts(&self) -> u32 {
        *self.attributes.get(&CONNECTION_ATTEMPTS)
    }

    /// Stores in declaration order.
    pub fn stores(&self) -> &[StoreConfiguration] {
        &self.stores
    }

    /// The store named `name`.
    pub fn store(&self, name: &str) -> Option<&StoreConfiguration> {
        self.stores.iter().find(|s| s.name() == name)
    }

    /// Whether any store is configured.
    pub fn uses_persistence(&self) -> bool {
        !self.stores.is_empty()
    }
}

impl ConfigurationElement for PersistenceConfiguration {
    fn element_name(&self) -> String {
        "persistence".to_string()
    }

    fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }

    fn children(&self) -> Vec<&dyn ConfigurationElement> {
        self.stores.iter().map(|s| s as &dyn ConfigurationElement).collect()
    }
}
