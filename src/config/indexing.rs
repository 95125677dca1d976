//! Indexing configuration.
//!
//! Declaring indexed entities without touching `enabled` turns indexing on
//! when the configuration is created.

use crate::attributes::{
    AttributeDefinition, AttributeSet, AttributeValue, ChangeTracker, CombinePolicy,
};
use crate::builder::{Builder, ConfigurationElement, ErrorCollector};
use crate::error::{Result, Violation};
use std::collections::BTreeSet;

/// Where index data lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexStorage {
    /// On disk under `path`.
    #[default]
    Filesystem,
    /// In memory.
    LocalHeap,
}

impl AttributeValue for IndexStorage {}

/// `indexing.enabled`
pub static ENABLED: AttributeDefinition<bool> =
    AttributeDefinition::new("enabled", false).immutable();
/// `indexing.indexed-entities`
pub static INDEXED_ENTITIES: AttributeDefinition<BTreeSet<String>> =
    AttributeDefinition::new("indexed-entities", BTreeSet::new()).immutable();
/// `indexing.storage`
pub static STORAGE: AttributeDefinition<IndexStorage> =
    AttributeDefinition::new("storage", IndexStorage::Filesystem).immutable();
/// `indexing.path`
pub static PATH: AttributeDefinition<Option<String>> =
    AttributeDefinition::new("path", None).immutable();

/// Builder for [`IndexingConfiguration`].
#[derive(Debug)]
pub struct IndexingConfigurationBuilder {
    attributes: AttributeSet,
}

impl IndexingConfigurationBuilder {
    pub(crate) fn new(tracker: &ChangeTracker) -> Self {
        let mut attributes = IndexingConfiguration::attribute_set();
        tracker.attach(&mut attributes);
        Self { attributes }
    }

    /// Turns indexing on.
    pub fn enable(&mut self) -> &mut Self {
        self.attributes.write(&ENABLED, true);
        self
    }

    /// Turns indexing off.
    pub fn disable(&mut self) -> &mut Self {
        self.attributes.write(&ENABLED, false);
        self
    }

    /// Adds an entity type to index.
    pub fn add_indexed_entity(&mut self, entity: impl Into<String>) -> &mut Self {
        let mut entities = self.attributes.get(&INDEXED_ENTITIES).clone();
        entities.insert(entity.into());
        self.attributes.write(&INDEXED_ENTITIES, entities);
        self
    }

    /// Where indexes are kept.
    pub fn storage(&mut self, storage: IndexStorage) -> &mut Self {
        self.attributes.write(&STORAGE, storage);
        self
    }

    /// Directory for filesystem indexes.
    pub fn path(&mut self, path: impl Into<String>) -> &mut Self {
        self.attributes.write(&PATH, Some(path.into()));
        self
    }

    /// Whether indexing will be on once created.
    pub(crate) fn is_enabled(&self) -> bool {
        let enabled = self.attributes.attribute(&ENABLED);
        if enabled.is_modified() {
            *enabled.get()
        } else {
            !self.attributes.get(&INDEXED_ENTITIES).is_empty()
        }
    }
}

impl Builder for IndexingConfigurationBuilder {
    type Target = IndexingConfiguration;

    fn validate(&self) -> Result<()> {
        let mut errors = ErrorCollector::new();
        errors.ensure(
            !self.is_enabled() || !self.attributes.get(&INDEXED_ENTITIES).is_empty(),
            "indexing",
            Violation::IndexingWithoutEntities,
        );
        errors.into_result()
    }

    fn create(mut self) -> IndexingConfiguration {
        if self.is_enabled() && !*self.attributes.get(&ENABLED) {
            self.attributes.write(&ENABLED, true);
        }
        IndexingConfiguration::new(self.attributes.protect())
    }

    fn read(&mut self, template: &IndexingConfiguration, policy: CombinePolicy) -> Result<()> {
        self.attributes.read(&template.attributes, policy)
    }
}

/// Frozen indexing settings.
#[derive(Debug, PartialEq)]
pub struct IndexingConfiguration {
    attributes: AttributeSet,
}

impl IndexingConfiguration {
    pub(crate) fn attribute_set() -> AttributeSet {
        AttributeSet::new("indexing", &[&ENABLED, &INDEXED_ENTITIES, &STORAGE, &PATH])
    }

    fn new(attributes: AttributeSet) -> Self {
        debug_assert!(attributes.check_protection().is_ok());
        Self { attributes }
    }

    /// Whether queries use indexes.
    pub fn enabled(&self) -> bool {
        *self.attributes.get(&ENABLED)
    }

    /// Entity types that are indexed.
    pub fn indexed_entities(&self) -> &BTreeSet<String> {
        self.attributes.get(&INDEXED_ENTITIES)
    }

    /// Where indexes are kept.
    pub fn storage(&self) -> IndexStorage {
        *self.attributes.get(&STORAGE)
    }

    /// Directory for filesystem indexes, if any.
    pub fn path(&self) -> Option<&str> {
        self.attributes.get(&PATH).as_deref()
    }
}

impl ConfigurationElement for IndexingConfiguration {
    fn element_name(&self) -> String {
        "indexing".to_string()
    }

    fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }
}
