//! Clustering configuration.
//!
//! The cache mode decides how entries are shared across nodes. The
//! `clustering` element also groups the settings that only matter once a
//! cache is clustered:
//!
//! | Child | Attributes |
//! |-------|------------|
//! | `hash` | `num-owners`, `num-segments`, `capacity-factor` |
//! | `l1` | `enabled`, `lifespan`, `invalidation-threshold`, `cleanup-task-frequency` |
//! | `state-transfer` | `fetch-in-memory-state`, `await-initial-transfer`, `timeout`, `chunk-size` |
//! | `partition-handling` | `when-split`, `merge-policy` |
//!
//! L1 only applies to distributed modes and partition handling cannot be
//! customised in invalidation mode; both are checked by the clustering
//! builder since they depend on the cache mode.

use crate::attributes::{
    AttributeDefinition, AttributeSet, AttributeValue, ChangeTracker, CombinePolicy,
};
use crate::builder::{Builder, ConfigurationElement, ErrorCollector};
use crate::config::memory::EvictionStrategy;
use crate::config::CacheView;
use crate::error::{Result, Violation};
use std::time::Duration;

/// How a cache shares its entries with the rest of the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CacheMode {
    /// Not clustered.
    #[default]
    Local,
    /// Every node holds every entry; writes are acknowledged synchronously.
    ReplSync,
    /// Every node holds every entry; writes are replicated asynchronously.
    ReplAsync,
    /// Writes invalidate remote copies synchronously.
    InvalidationSync,
    /// Writes invalidate remote copies asynchronously.
    InvalidationAsync,
    /// Entries are stored on `num-owners` nodes; synchronous.
    DistSync,
    /// Entries are stored on `num-owners` nodes; asynchronous.
    DistAsync,
}

impl CacheMode {
    /// Whether the cache spans more than one node.
    pub fn is_clustered(self) -> bool {
        self != CacheMode::Local
    }

    /// Whether entries are distributed by consistent hashing.
    pub fn is_distributed(self) -> bool {
        matches!(self, CacheMode::DistSync | CacheMode::DistAsync)
    }

    /// Whether every node holds every entry.
    pub fn is_replicated(self) -> bool {
        matches!(self, CacheMode::ReplSync | CacheMode::ReplAsync)
    }

    /// Whether remote copies are invalidated rather than updated.
    pub fn is_invalidation(self) -> bool {
        matches!(self, CacheMode::InvalidationSync | CacheMode::InvalidationAsync)
    }

    /// Whether remote operations wait for acknowledgement.
    pub fn is_synchronous(self) -> bool {
        matches!(
            self,
            CacheMode::Local
                | CacheMode::ReplSync
                | CacheMode::InvalidationSync
                | CacheMode::DistSync
        )
    }
}

impl AttributeValue for CacheMode {}

/// Behaviour of a partition that lost contact with part of the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PartitionHandling {
    /// Both partitions keep serving reads and writes.
    #[default]
    AllowReadWrites,
    /// Minority partitions reject reads and writes.
    DenyReadWrites,
    /// Minority partitions serve reads only.
    AllowReads,
}

impl AttributeValue for PartitionHandling {}

/// How conflicting entries are resolved when partitions merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MergePolicy {
    /// Conflicts are left unresolved.
    #[default]
    None,
    /// The value from the majority partition wins.
    PreferConsistency,
    /// A non-null value always wins.
    PreferNonNull,
    /// Conflicting entries are removed.
    RemoveAll,
}

impl AttributeValue for MergePolicy {}

/// `clustering.cache-mode`
pub static CACHE_MODE: AttributeDefinition<CacheMode> =
    AttributeDefinition::new("cache-mode", CacheMode::Local).immutable();
/// `clustering.remote-timeout`
pub static REMOTE_TIMEOUT: AttributeDefinition<Duration> =
    AttributeDefinition::new("remote-timeout", Duration::from_secs(15));

/// `clustering.hash.num-owners`
pub static NUM_OWNERS: AttributeDefinition<u32> =
    AttributeDefinition::new("num-owners", 2).immutable();
/// `clustering.hash.num-segments`
pub static NUM_SEGMENTS: AttributeDefinition<u32> =
    AttributeDefinition::new("num-segments", 256).immutable();
/// `clustering.hash.capacity-factor`
pub static CAPACITY_FACTOR: AttributeDefinition<f32> =
    AttributeDefinition::new("capacity-factor", 1.0).immutable();

/// `clustering.l1.enabled`
pub static L1_ENABLED: AttributeDefinition<bool> =
    AttributeDefinition::new("enabled", false).immutable();
/// `clustering.l1.lifespan`
pub static L1_LIFESPAN: AttributeDefinition<Duration> =
    AttributeDefinition::new("lifespan", Duration::from_secs(600)).immutable();
/// `clustering.l1.invalidation-threshold`
pub static INVALIDATION_THRESHOLD: AttributeDefinition<i32> =
    AttributeDefinition::new("invalidation-threshold", 0).immutable();
/// `clustering.l1.cleanup-task-frequency`
pub static CLEANUP_TASK_FREQUENCY: AttributeDefinition<Duration> =
    AttributeDefinition::new("cleanup-task-frequency", Duration::from_secs(60)).immutable();

/// `clustering.state-transfer.fetch-in-memory-state`
pub static FETCH_IN_MEMORY_STATE: AttributeDefinition<bool> =
    AttributeDefinition::new("fetch-in-memory-state", true).immutable();
/// `clustering.state-transfer.await-initial-transfer`
pub static AWAIT_INITIAL_TRANSFER: AttributeDefinition<bool> =
    AttributeDefinition::new("await-initial-transfer", true).immutable();
/// `clustering.state-transfer.timeout`
pub static STATE_TRANSFER_TIMEOUT: AttributeDefinition<Duration> =
    AttributeDefinition::new("timeout", Duration::from_secs(240)).immutable();
/// `clustering.state-transfer.chunk-size`
pub static CHUNK_SIZE: AttributeDefinition<u32> =
    AttributeDefinition::new("chunk-size", 512).immutable();

/// `clustering.partition-handling.when-split`
pub static WHEN_SPLIT: AttributeDefinition<PartitionHandling> =
    AttributeDefinition::new("when-split", PartitionHandling::AllowReadWrites).immutable();
/// `clustering.partition-handling.merge-policy`
pub static MERGE_POLICY: AttributeDefinition<MergePolicy> =
    AttributeDefinition::new("merge-policy", MergePolicy::None).immutable();

// ============================================================================
// hash
// ============================================================================

/// Builder for [`HashConfiguration`].
#[derive(Debug)]
pub struct HashConfigurationBuilder {
    attributes: AttributeSet,
}

impl HashConfigurationBuilder {
    fn new(tracker: &ChangeTracker) -> Self {
        let mut attributes = HashConfiguration::attribute_set();
        tracker.attach(&mut attributes);
        Self { attributes }
    }

    /// Number of nodes holding each entry in distributed modes.
    pub fn num_owners(&mut self, owners: u32) -> &mut Self {
        self.attributes.write(&NUM_OWNERS, owners);
        self
    }

    /// Number of hash segments.
    pub fn num_segments(&mut self, segments: u32) -> &mut Self {
        self.attributes.write(&NUM_SEGMENTS, segments);
        self
    }

    /// Relative share of segments this node owns.
    pub fn capacity_factor(&mut self, factor: f32) -> &mut Self {
        self.attributes.write(&CAPACITY_FACTOR, factor);
        self
    }
}

impl Builder for HashConfigurationBuilder {
    type Target = HashConfiguration;

    fn validate(&self) -> Result<()> {
        let mut errors = ErrorCollector::new();
        errors.ensure(
            *self.attributes.get(&NUM_OWNERS) > 0,
            "clustering.hash",
            Violation::NonPositive { attribute: "num-owners" },
        );
        errors.ensure(
            *self.attributes.get(&NUM_SEGMENTS) > 0,
            "clustering.hash",
            Violation::NonPositive { attribute: "num-segments" },
        );
        let factor = *self.attributes.get(&CAPACITY_FACTOR);
        errors.ensure(
            factor.is_finite() && factor >= 0.0,
            "clustering.hash",
            Violation::InvalidCapacityFactor,
        );
        errors.into_result()
    }

    fn create(self) -> HashConfiguration {
        HashConfiguration::new(self.attributes.protect())
    }

    fn read(&mut self, template: &HashConfiguration, policy: CombinePolicy) -> Result<()> {
        self.attributes.read(&template.attributes, policy)
    }
}

/// Consistent hash settings.
#[derive(Debug, PartialEq)]
pub struct HashConfiguration {
    attributes: AttributeSet,
}

impl HashConfiguration {
    pub(crate) fn attribute_set() -> AttributeSet {
        AttributeSet::new("clustering.hash", &[&NUM_OWNERS, &NUM_SEGMENTS, &CAPACITY_FACTOR])
    }

    fn new(attributes: AttributeSet) -> Self {
        debug_assert!(attributes.check_protection().is_ok());
        Self { attributes }
    }

    /// Number of nodes holding each entry.
    pub fn num_owners(&self) -> u32 {
        *self.attributes.get(&NUM_OWNERS)
    }

    /// Number of hash segments.
    pub fn num_segments(&self) -> u32 {
        *self.attributes.get(&NUM_SEGMENTS)
    }

    /// Relative share of segments this node owns.
    pub fn capacity_factor(&self) -> f32 {
        *self.attributes.get(&CAPACITY_FACTOR)
    }
}

impl ConfigurationElement for HashConfiguration {
    fn element_name(&self) -> String {
        "hash".to_string()
    }

    fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }
}

// ============================================================================
// l1
// ============================================================================

/// Builder for [`L1Configuration`].
#[derive(Debug)]
pub struct L1ConfigurationBuilder {
    attributes: AttributeSet,
}

impl L1ConfigurationBuilder {
    fn new(tracker: &ChangeTracker) -> Self {
        let mut attributes = L1Configuration::attribute_set();
        tracker.attach(&mut attributes);
        Self { attributes }
    }

    /// Enables the near cache for remotely owned entries.
    pub fn enable(&mut self) -> &mut Self {
        self.enabled(true)
    }

    /// Disables L1.
    pub fn disable(&mut self) -> &mut Self {
        self.enabled(false)
    }

    /// Enables or disables L1.
    pub fn enabled(&mut self, enabled: bool) -> &mut Self {
        self.attributes.write(&L1_ENABLED, enabled);
        self
    }

    /// How long an L1 entry lives.
    pub fn lifespan(&mut self, lifespan: Duration) -> &mut Self {
        self.attributes.write(&L1_LIFESPAN, lifespan);
        self
    }

    /// Requestor count above which invalidations are multicast.
    pub fn invalidation_threshold(&mut self, threshold: i32) -> &mut Self {
        self.attributes.write(&INVALIDATION_THRESHOLD, threshold);
        self
    }

    /// How often expired L1 entries are purged.
    pub fn cleanup_task_frequency(&mut self, frequency: Duration) -> &mut Self {
        self.attributes.write(&CLEANUP_TASK_FREQUENCY, frequency);
        self
    }

    fn is_enabled(&self) -> bool {
        *self.attributes.get(&L1_ENABLED)
    }
}

impl Builder for L1ConfigurationBuilder {
    type Target = L1Configuration;

    fn validate(&self) -> Result<()> {
        let mut errors = ErrorCollector::new();
        if self.is_enabled() {
            errors.ensure(
                !self.attributes.get(&L1_LIFESPAN).is_zero(),
                "clustering.l1",
                Violation::NonPositive { attribute: "lifespan" },
            );
            errors.ensure(
                !self.attributes.get(&CLEANUP_TASK_FREQUENCY).is_zero(),
                "clustering.l1",
                Violation::NonPositive { attribute: "cleanup-task-frequency" },
            );
        }
        errors.into_result()
    }

    fn create(self) -> L1Configuration {
        L1Configuration::new(self.attributes.protect())
    }

    fn read(&mut self, template: &L1Configuration, policy: CombinePolicy) -> Result<()> {
        self.attributes.read(&template.attributes, policy)
    }
}

/// Near cache for entries owned by other nodes.
#[derive(Debug, PartialEq)]
pub struct L1Configuration {
    attributes: AttributeSet,
}

impl L1Configuration {
    pub(crate) fn attribute_set() -> AttributeSet {
        AttributeSet::new(
            "clustering.l1",
            &[&L1_ENABLED, &L1_LIFESPAN, &INVALIDATION_THRESHOLD, &CLEANUP_TASK_FREQUENCY],
        )
    }

    fn new(attributes: AttributeSet) -> Self {
        debug_assert!(attributes.check_protection().is_ok());
        Self { attributes }
    }

    /// Whether L1 is enabled.
    pub fn enabled(&self) -> bool {
        *self.attributes.get(&L1_ENABLED)
    }

    /// How long an L1 entry lives.
    pub fn lifespan(&self) -> Duration {
        *self.attributes.get(&L1_LIFESPAN)
    }

    /// Requestor count above which invalidations are multicast.
    pub fn invalidation_threshold(&self) -> i32 {
        *self.attributes.get(&INVALIDATION_THRESHOLD)
    }

    /// How often expired L1 entries are purged.
    pub fn cleanup_task_frequency(&self) -> Duration {
        *self.attributes.get(&CLEANUP_TASK_FREQUENCY)
    }
}

impl ConfigurationElement for L1Configuration {
    fn element_name(&self) -> String {
        "l1".to_string()
    }

    fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }
}

// ============================================================================
// state-transfer
// ============================================================================

/// Builder for [`StateTransferConfiguration`].
#[derive(Debug)]
pub struct StateTransferConfigurationBuilder {
    attributes: AttributeSet,
}

impl StateTransferConfigurationBuilder {
    fn new(tracker: &ChangeTracker) -> Self {
        let mut attributes = StateTransferConfiguration::attribute_set();
        tracker.attach(&mut attributes);
        Self { attributes }
    }

    /// Whether a joining node fetches in-memory state.
    pub fn fetch_in_memory_state(&mut self, fetch: bool) -> &mut Self {
        self.attributes.write(&FETCH_IN_MEMORY_STATE, fetch);
        self
    }

    /// Whether a joining node waits for the initial transfer to finish.
    pub fn await_initial_transfer(&mut self, wait: bool) -> &mut Self {
        self.attributes.write(&AWAIT_INITIAL_TRANSFER, wait);
        self
    }

    /// Maximum time for the initial transfer.
    pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
        self.attributes.write(&STATE_TRANSFER_TIMEOUT, timeout);
        self
    }

    /// Entries per transfer batch.
    pub fn chunk_size(&mut self, size: u32) -> &mut Self {
        self.attributes.write(&CHUNK_SIZE, size);
        self
    }
}

impl Builder for StateTransferConfigurationBuilder {
    type Target = StateTransferConfiguration;

    fn validate(&self) -> Result<()> {
        let mut errors = ErrorCollector::new();
        errors.ensure(
            !self.attributes.get(&STATE_TRANSFER_TIMEOUT).is_zero(),
            "clustering.state-transfer",
            Violation::NonPositive { attribute: "timeout" },
        );
        errors.ensure(
            *self.attributes.get(&CHUNK_SIZE) > 0,
            "clustering.state-transfer",
            Violation::NonPositive { attribute: "chunk-size" },
        );
        errors.into_result()
    }

    fn create(self) -> StateTransferConfiguration {
        StateTransferConfiguration::new(self.attributes.protect())
    }

    fn read(&mut self, template: &StateTransferConfiguration, policy: CombinePolicy) -> Result<()> {
        self.attributes.read(&template.attributes, policy)
    }
}

/// How state moves to joining nodes.
#[derive(Debug, PartialEq)]
pub struct StateTransferConfiguration {
    attributes: AttributeSet,
}

impl StateTransferConfiguration {
    pub(crate) fn attribute_set() -> AttributeSet {
        AttributeSet::new(
            "clustering.state-transfer",
            &[
                &FETCH_IN_MEMORY_STATE,
                &AWAIT_INITIAL_TRANSFER,
                &STATE_TRANSFER_TIMEOUT,
                &CHUNK_SIZE,
            ],
        )
    }

    fn new(attributes: AttributeSet) -> Self {
        debug_assert!(attributes.check_protection().is_ok());
        Self { attributes }
    }

    /// Whether a joining node fetches in-memory state.
    pub fn fetch_in_memory_state(&self) -> bool {
        *self.attributes.get(&FETCH_IN_MEMORY_STATE)
    }

    /// Whether a joining node waits for the initial transfer.
    pub fn await_initial_transfer(&self) -> bool {
        *self.attributes.get(&AWAIT_INITIAL_TRANSFER)
    }

    /// Maximum time for the initial transfer.
    pub fn timeout(&self) -> Duration {
        *self.attributes.get(&STATE_TRANSFER_TIMEOUT)
    }

    /// Entries per transfer batch.
    pub fn chunk_size(&self) -> u32 {
        *self.attributes.get(&CHUNK_SIZE)
    }
}

impl ConfigurationElement for StateTransferConfiguration {
    fn element_name(&self) -> String {
        "state-transfer".to_string()
    }

    fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }
}

// ============================================================================
// partition-handling
// ============================================================================

/// Builder for [`PartitionHandlingConfiguration`].
#[derive(Debug)]
pub struct PartitionHandlingConfigurationBuilder {
    attributes: AttributeSet,
}

impl PartitionHandlingConfigurationBuilder {
    fn new(tracker: &ChangeTracker) -> Self {
        let mut attributes = PartitionHandlingConfiguration::attribute_set();
        tracker.attach(&mut attributes);
        Self { attributes }
    }

    /// Behaviour of a minority partition.
    pub fn when_split(&mut self, handling: PartitionHandling) -> &mut Self {
        self.attributes.write(&WHEN_SPLIT, handling);
        self
    }

    /// Conflict resolution on merge.
    pub fn merge_policy(&mut self, policy: MergePolicy) -> &mut Self {
        self.attributes.write(&MERGE_POLICY, policy);
        self
    }

    fn is_customised(&self) -> bool {
        *self.attributes.get(&WHEN_SPLIT) != PartitionHandling::default()
            || *self.attributes.get(&MERGE_POLICY) != MergePolicy::default()
    }
}

impl Builder for PartitionHandlingConfigurationBuilder {
    type Target = PartitionHandlingConfiguration;

    fn validate(&self) -> Result<()> {
        Ok(())
    }

    fn create(self) -> PartitionHandlingConfiguration {
        PartitionHandlingConfiguration::new(self.attributes.protect())
    }

    fn read(
        &mut self,
        template: &PartitionHandlingConfiguration,
        policy: CombinePolicy,
    ) -> Result<()> {
        self.attributes.read(&template.attributes, policy)
    }
}

/// Split-brain behaviour.
#[derive(Debug, PartialEq)]
pub struct PartitionHandlingConfiguration {
    attributes: AttributeSet,
}

impl PartitionHandlingConfiguration {
    pub(crate) fn attribute_set() -> AttributeSet {
        AttributeSet::new("clustering.partition-handling", &[&WHEN_SPLIT, &MERGE_POLICY])
    }

    fn new(attributes: AttributeSet) -> Self {
        debug_assert!(attributes.check_protection().is_ok());
        Self { attributes }
    }

    /// Behaviour of a minority partition.
    pub fn when_split(&self) -> PartitionHandling {
        *self.attributes.get(&WHEN_SPLIT)
    }

    /// Conflict resolution on merge.
    pub fn merge_policy(&self) -> MergePolicy {
        *self.attributes.get(&MERGE_POLICY)
    }
}

impl ConfigurationElement for PartitionHandlingConfiguration {
    fn element_name(&self) -> String {
        "partition-handling".to_string()
    }

    fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }
}

// ============================================================================
// clustering
// ============================================================================

/// Builder for [`ClusteringConfiguration`].
#[derive(Debug)]
pub struct ClusteringConfigurationBuilder {
    attributes: AttributeSet,
    hash: HashConfigurationBuilder,
    l1: L1ConfigurationBuilder,
    state_transfer: StateTransferConfigurationBuilder,
    partition_handling: PartitionHandlingConfigurationBuilder,
}

impl ClusteringConfigurationBuilder {
    pub(crate) fn new(tracker: &ChangeTracker) -> Self {
        let mut attributes = ClusteringConfiguration::attribute_set();
        tracker.attach(&mut attributes);
        Self {
            attributes,
            hash: HashConfigurationBuilder::new(tracker),
            l1: L1ConfigurationBuilder::new(tracker),
            state_transfer: StateTransferConfigurationBuilder::new(tracker),
            partition_handling: PartitionHandlingConfigurationBuilder::new(tracker),
        }
    }

    /// Sets the cache mode.
    pub fn cache_mode(&mut self, mode: CacheMode) -> &mut Self {
        self.attributes.write(&CACHE_MODE, mode);
        self
    }

    /// Timeout for synchronous remote calls.
    pub fn remote_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.attributes.write(&REMOTE_TIMEOUT, timeout);
        self
    }

    /// Consistent hash settings.
    pub fn hash(&mut self) -> &mut HashConfigurationBuilder {
        &mut self.hash
    }

    /// L1 settings.
    pub fn l1(&mut self) -> &mut L1ConfigurationBuilder {
        &mut self.l1
    }

    /// State transfer settings.
    pub fn state_transfer(&mut self) -> &mut StateTransferConfigurationBuilder {
        &mut self.state_transfer
    }

    /// Partition handling settings.
    pub fn partition_handling(&mut self) -> &mut PartitionHandlingConfigurationBuilder {
        &mut self.partition_handling
    }

    pub(crate) fn mode(&self) -> CacheMode {
        *self.attributes.get(&CACHE_MODE)
    }

    /// Rules involving sibling elements.
    pub(crate) fn validate_in(&self, view: &CacheView) -> Result<()> {
        let mut errors = ErrorCollector::new();
        errors.ensure(
            !(self.l1.is_enabled() && view.eviction == EvictionStrategy::Exception),
            "clustering.l1",
            Violation::L1WithExceptionEviction,
        );
        errors.into_result()
    }
}

impl Builder for ClusteringConfigurationBuilder {
    type Target = ClusteringConfiguration;

    fn validate(&self) -> Result<()> {
        let mut errors = ErrorCollector::new();
        let mode = self.mode();
        errors.ensure(
            !self.attributes.get(&REMOTE_TIMEOUT).is_zero(),
            "clustering",
            Violation::NonPositive { attribute: "remote-timeout" },
        );
        errors.check(self.hash.validate());
        errors.check(self.l1.validate());
        errors.check(self.state_transfer.validate());
        errors.check(self.partition_handling.validate());
        errors.ensure(
            !self.l1.is_enabled() || mode.is_distributed(),
            "clustering.l1",
            Violation::L1RequiresDistribution { mode },
        );
        errors.ensure(
            !(mode.is_invalidation() && self.partition_handling.is_customised()),
            "clustering.partition-handling",
            Violation::PartitionHandlingInInvalidation,
        );
        errors.into_result()
    }

    fn create(self) -> ClusteringConfiguration {
        ClusteringConfiguration::new(
            self.attributes.protect(),
            self.hash.create(),
            self.l1.create(),
            self.state_transfer.create(),
            self.partition_handling.create(),
        )
    }

    fn read(&mut self, template: &ClusteringConfiguration, policy: CombinePolicy) -> Result<()> {
        self.attributes.read(&template.attributes, policy)?;
        self.hash.read(&template.hash, policy)?;
        self.l1.read(&template.l1, policy)?;
        self.state_transfer.read(&template.state_transfer, policy)?;
        self.partition_handling.read(&template.partition_handling, policy)
    }
}

/// Frozen clustering settings.
#[derive(Debug, PartialEq)]
pub struct ClusteringConfiguration {
    attributes: AttributeSet,
    hash: HashConfiguration,
    l1: L1Configuration,
    state_transfer: StateTransferConfiguration,
    partition_handling: PartitionHandlingConfiguration,
}

impl ClusteringConfiguration {
    pub(crate) fn attribute_set() -> AttributeSet {
        AttributeSet::new("clustering", &[&CACHE_MODE, &REMOTE_TIMEOUT])
    }

    fn new(
        attributes: AttributeSet,
        hash: HashConfiguration,
        l1: L1Configuration,
        state_transfer: StateTransferConfiguration,
        partition_handling: PartitionHandlingConfiguration,
    ) -> Self {
        debug_assert!(attributes.check_protection().is_ok());
        Self {
            attributes,
            hash,
            l1,
            state_transfer,
            partition_handling,
        }
    }

    /// The cache mode.
    pub fn cache_mode(&self) -> CacheMode {
        *self.attributes.get(&CACHE_MODE)
    }

    /// Timeout for synchronous remote calls.
    pub fn remote_timeout(&self) -> Duration {
        *self.attributes.get(&REMOTE_TIMEOUT)
    }

    /// Changes the remote timeout of a running cache.
    ///
    /// # Errors
    ///
    /// [`Violation::NonPositive`] for a zero timeout.
    pub fn set_remote_timeout(&mut self, timeout: Duration) -> Result<()> {
        let mut errors = ErrorCollector::new();
        errors.ensure(
            !timeout.is_zero(),
            "clustering",
            Violation::NonPositive { attribute: "remote-timeout" },
        );
        errors.into_result()?;
        self.attributes.set(&REMOTE_TIMEOUT, timeout)
    }

    /// Consistent hash settings.
    pub fn hash(&self) -> &HashConfiguration {
        &self.hash
    }

    /// L1 settings.
    pub fn l1(&self) -> &L1Configuration {
        &self.l1
    }

    /// State transfer settings.
    pub fn state_transfer(&self) -> &StateTransferConfiguration {
        &self.state_transfer
    }

    /// Partition handling settings.
    pub fn partition_handling(&self) -> &PartitionHandlingConfiguration {
        &self.partition_handling
    }
}

impl ConfigurationElement for ClusteringConfiguration {
    fn element_name(&self) -> String {
        "clustering".to_string()
    }

    fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }

    fn children(&self) -> Vec<&dyn ConfigurationElement> {
        vec![&self.hash, &self.l1, &self.state_transfer, &self.partition_handling]
    }
}
