//! Attribute Sets
//!
//! An [`AttributeSet`] is the ordered collection of cells that makes up one
//! configuration element. Builders own an unprotected set and write to it
//! freely; `create()` consumes the builder, protects the set, and moves it
//! into the frozen configuration node. A protected set never becomes
//! unprotected again.
//!
//! Cells are addressed by their static [`AttributeDefinition`], which keeps
//! lookups type checked:
//!
//! ```
//! use cache_config::{AttributeDefinition, AttributeSet};
//!
//! static TIMEOUT: AttributeDefinition<u64> = AttributeDefinition::new("timeout", 15_000);
//!
//! let mut set = AttributeSet::new("state-transfer", &[&TIMEOUT]);
//! set.set(&TIMEOUT, 30_000).unwrap();
//! assert_eq!(*set.get(&TIMEOUT), 30_000);
//!
//! let set = set.protect();
//! assert!(set.is_protected());
//! ```

use super::attribute::{AnyAttribute, Attribute, AttributeListener};
use super::definition::{AnyDefinition, AttributeDefinition};
use super::{AttributeValue, CombinePolicy};
use crate::error::{ConfigError, Result};
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "hashbrown")]
use hashbrown::HashMap;

#[cfg(not(feature = "hashbrown"))]
use std::collections::HashMap;

/// The ordered cells of one configuration element.
pub struct AttributeSet {
    owner: &'static str,
    attributes: Vec<Box<dyn AnyAttribute>>,
    index: HashMap<&'static str, usize>,
    protected: bool,
}

impl AttributeSet {
    /// Creates a set for `owner` with one default-valued cell per definition,
    /// in the given order.
    pub fn new(owner: &'static str, definitions: &[&'static dyn AnyDefinition]) -> Self {
        let mut attributes = Vec::with_capacity(definitions.len());
        let mut index = HashMap::with_capacity(definitions.len());
        for definition in definitions {
            let previous = index.insert(definition.name(), attributes.len());
            debug_assert!(
                previous.is_none(),
                "attribute '{}' declared twice in '{}'",
                definition.name(),
                owner
            );
            attributes.push(definition.instantiate(owner));
        }
        Self {
            owner,
            attributes,
            index,
            protected: false,
        }
    }

    /// Owner tag, e.g. `"memory"` or `"persistence.store"`.
    pub fn owner(&self) -> &'static str {
        self.owner
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Whether the schema is empty.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Whether the set contains a cell named `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Returns the cell for `definition`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnknownAttribute`] if the set has no cell with that
    /// name and value type.
    pub fn try_attribute<T: AttributeValue>(
        &self,
        definition: &AttributeDefinition<T>,
    ) -> Result<&Attribute<T>> {
        self.index
            .get(definition.name())
            .and_then(|&i| self.attributes[i].as_any().downcast_ref::<Attribute<T>>())
            .ok_or_else(|| self.unknown(definition.name()))
    }

    /// Mutable variant of [`try_attribute`](Self::try_attribute).
    ///
    /// # Errors
    ///
    /// Same as [`try_attribute`](Self::try_attribute).
    pub fn try_attribute_mut<T: AttributeValue>(
        &mut self,
        definition: &AttributeDefinition<T>,
    ) -> Result<&mut Attribute<T>> {
        let owner = self.owner;
        match self.index.get(definition.name()) {
            Some(&i) => self.attributes[i]
                .as_any_mut()
                .downcast_mut::<Attribute<T>>()
                .ok_or_else(|| unknown(owner, definition.name())),
            None => Err(unknown(owner, definition.name())),
        }
    }

    /// Returns the cell for `definition`.
    ///
    /// # Panics
    ///
    /// If the definition does not belong to this set's schema. That is a
    /// programming error in the element owning the set.
    pub fn attribute<T: AttributeValue>(
        &self,
        definition: &AttributeDefinition<T>,
    ) -> &Attribute<T> {
        match self.try_attribute(definition) {
            Ok(attribute) => attribute,
            Err(e) => panic!("{}", e),
        }
    }

    /// Mutable variant of [`attribute`](Self::attribute).
    ///
    /// # Panics
    ///
    /// Same as [`attribute`](Self::attribute).
    pub fn attribute_mut<T: AttributeValue>(
        &mut self,
        definition: &AttributeDefinition<T>,
    ) -> &mut Attribute<T> {
        match self.try_attribute_mut(definition) {
            Ok(attribute) => attribute,
            Err(e) => panic!("{}", e),
        }
    }

    /// Looks a cell up by name.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnknownAttribute`] if there is no such cell.
    pub fn try_attribute_by_name(&self, name: &str) -> Result<&dyn AnyAttribute> {
        self.index
            .get(name)
            .map(|&i| self.attributes[i].as_ref())
            .ok_or_else(|| self.unknown(name))
    }

    /// Current value of `definition`.
    ///
    /// # Panics
    ///
    /// Same as [`attribute`](Self::attribute).
    pub fn get<T: AttributeValue>(&self, definition: &AttributeDefinition<T>) -> &T {
        self.attribute(definition).get()
    }

    /// Writes `value` to the cell for `definition`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnknownAttribute`] for a foreign definition,
    /// [`ConfigError::ProtectionViolation`] for an immutable cell of a
    /// protected set.
    pub fn set<T: AttributeValue>(
        &mut self,
        definition: &AttributeDefinition<T>,
        value: T,
    ) -> Result<()> {
        self.try_attribute_mut(definition)?.set(value)
    }

    /// Infallible write used by builders, which only ever hold unprotected sets.
    pub(crate) fn write<T: AttributeValue>(
        &mut self,
        definition: &AttributeDefinition<T>,
        value: T,
    ) {
        debug_assert!(!self.protected, "builder wrote to protected set '{}'", self.owner);
        self.attribute_mut(definition).assign(value);
    }

    /// Whether the cell for `definition` was explicitly written.
    pub fn is_modified_attr<T: AttributeValue>(&self, definition: &AttributeDefinition<T>) -> bool {
        self.attribute(definition).is_modified()
    }

    /// Protects every cell and returns the same set. Calling it twice is a no-op.
    pub fn protect(mut self) -> Self {
        if !self.protected {
            for attribute in &mut self.attributes {
                attribute.protect();
            }
            self.protected = true;
            tracing::trace!(
                owner = self.owner,
                attributes = self.attributes.len(),
                "protected attribute set"
            );
        }
        self
    }

    /// Whether [`protect`](Self::protect) has been called.
    pub fn is_protected(&self) -> bool {
        self.protected
    }

    /// Fails unless the set is protected.
    ///
    /// # Errors
    ///
    /// [`ConfigError::IllegalState`] for an unprotected set.
    pub fn check_protection(&self) -> Result<()> {
        if self.protected {
            Ok(())
        } else {
            Err(ConfigError::IllegalState { owner: self.owner })
        }
    }

    /// Imports every modified cell of `source` that this set also declares,
    /// following `policy`. Cells present in only one of the sets are ignored.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MergeConflict`] when a cell's value type differs between
    /// the sets and [`ConfigError::ProtectionViolation`] when importing into an
    /// immutable cell of a protected set. On error no cell has changed.
    pub fn read(&mut self, source: &AttributeSet, policy: CombinePolicy) -> Result<()> {
        let source_of = |name: &str| source.index.get(name).map(|&i| source.attributes[i].as_ref());
        for attribute in &self.attributes {
            if let Some(other) = source_of(attribute.name()) {
                attribute.check_read(other)?;
            }
        }
        for attribute in &mut self.attributes {
            if let Some(other) = source_of(attribute.name()) {
                attribute.read_from(other, policy)?;
            }
        }
        Ok(())
    }

    /// Cells in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn AnyAttribute> + '_ {
        self.attributes.iter().map(|a| a.as_ref())
    }

    /// Whether any cell was explicitly written.
    pub fn is_modified(&self) -> bool {
        self.attributes.iter().any(|a| a.is_modified())
    }

    /// Registers `listener` on every cell.
    pub fn add_listener(&mut self, listener: Arc<dyn AttributeListener>) {
        for attribute in &mut self.attributes {
            attribute.add_listener(Arc::clone(&listener));
        }
    }

    /// `owner [name=value, ...]`.
    pub fn describe(&self) -> String {
        self.to_string()
    }

    fn unknown(&self, name: &str) -> ConfigError {
        unknown(self.owner, name)
    }
}

fn unknown(owner: &'static str, name: &str) -> ConfigError {
    ConfigError::UnknownAttribute {
        owner,
        attribute: name.to_string(),
    }
}

impl fmt::Display for AttributeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [", self.owner)?;
        for (i, attribute) in self.attributes.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", attribute.name(), attribute.describe())?;
        }
        f.write_str("]")
    }
}

impl fmt::Debug for AttributeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeSet")
            .field("owner", &self.owner)
            .field("protected", &self.protected)
            .field("attributes", &self.attributes)
            .finish()
    }
}

impl PartialEq for AttributeSet {
    fn eq(&self, other: &Self) -> bool {
        self.owner == other.owner
            && self.attributes.len() == other.attributes.len()
            && self
                .attributes
                .iter()
                .zip(&other.attributes)
                .all(|(a, b)| a.name() == b.name() && a.value_eq(b.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    static ENABLED: AttributeDefinition<bool> = AttributeDefinition::new("enabled", false);
    static PATH: AttributeDefinition<Option<String>> =
        AttributeDefinition::new("path", None).immutable();
    static ENTITIES: AttributeDefinition<Vec<String>> =
        AttributeDefinition::new("indexed-entities", Vec::new()).immutable();
    static FOREIGN: AttributeDefinition<u32> = AttributeDefinition::new("foreign", 0);
    static ENABLED_AS_INT: AttributeDefinition<u32> = AttributeDefinition::new("enabled", 0);

    fn make_set() -> AttributeSet {
        AttributeSet::new("indexing", &[&ENABLED, &PATH, &ENTITIES])
    }

    #[test]
    fn test_new_set_is_default() {
        let set = make_set();
        assert_eq!(set.len(), 3);
        assert!(!set.is_modified());
        assert!(!*set.get(&ENABLED));
        assert!(set.get(&PATH).is_none());
        assert!(set.attribute(&PATH).is_null());
        let names: Vec<_> = set.iter().map(|a| a.name()).collect();
        assert_eq!(names, vec!["enabled", "path", "indexed-entities"]);
    }

    #[test]
    fn test_unknown_attribute() {
        let mut set = make_set();
        assert!(matches!(
            set.try_attribute(&FOREIGN),
            Err(ConfigError::UnknownAttribute { owner: "indexing", .. })
        ));
        assert!(set.try_attribute(&ENABLED_AS_INT).is_err());
        assert!(set.set(&FOREIGN, 1).is_err());
        assert!(set.try_attribute_by_name("missing").is_err());
        assert_eq!(set.try_attribute_by_name("enabled").unwrap().describe(), "false");
    }

    #[test]
    #[should_panic(expected = "no attribute named 'foreign'")]
    fn test_attribute_panics_for_foreign_definition() {
        make_set().attribute(&FOREIGN);
    }

    #[test]
    fn test_protect_is_idempotent() {
        let mut set = make_set();
        assert!(set.check_protection().is_err());
        set.set(&PATH, Some("/tmp/index".into())).unwrap();

        let set = set.protect().protect();
        assert!(set.is_protected());
        assert!(set.check_protection().is_ok());
        assert!(set.iter().all(|a| a.is_protected()));
        assert_eq!(set.get(&PATH).as_deref(), Some("/tmp/index"));
    }

    #[test]
    fn test_protected_set_rejects_immutable_writes() {
        let mut set = make_set().protect();
        assert!(matches!(
            set.set(&PATH, Some("/other".into())),
            Err(ConfigError::ProtectionViolation { attribute: "path", .. })
        ));
        set.set(&ENABLED, true).unwrap();
        assert!(*set.get(&ENABLED));
    }

    #[test]
    fn test_read_override_copies_modified_only() {
        let mut template = make_set();
        template.set(&ENABLED, true).unwrap();
        let mut dest = make_set();
        dest.set(&PATH, Some("/dest".into())).unwrap();

        dest.read(&template, CombinePolicy::Override).unwrap();
        assert!(*dest.get(&ENABLED));
        assert_eq!(dest.get(&PATH).as_deref(), Some("/dest"));
        assert!(!dest.attribute(&ENTITIES).is_modified());
    }

    #[test]
    fn test_read_combine_unions_entities() {
        let mut template = make_set();
        template.set(&ENTITIES, vec!["Book".into(), "Author".into()]).unwrap();
        let mut dest = make_set();
        dest.set(&ENTITIES, vec!["Author".into(), "Publisher".into()]).unwrap();

        dest.read(&template, CombinePolicy::Combine).unwrap();
        assert_eq!(*dest.get(&ENTITIES), vec!["Author", "Publisher", "Book"]);
    }

    #[test]
    fn test_read_into_protected_immutable_fails() {
        let mut template = make_set();
        template.set(&PATH, Some("/template".into())).unwrap();
        let mut dest = make_set().protect();
        assert!(dest.read(&template, CombinePolicy::Override).is_err());
    }

    #[test]
    fn test_read_type_mismatch() {
        let mut template = AttributeSet::new("indexing", &[&ENABLED_AS_INT]);
        template.set(&ENABLED_AS_INT, 1).unwrap();
        let mut dest = make_set();
        assert!(matches!(
            dest.read(&template, CombinePolicy::Override),
            Err(ConfigError::MergeConflict { attribute: "enabled", .. })
        ));
    }

    #[test]
    fn test_equality_and_display() {
        let mut a = make_set();
        let mut b = make_set();
        assert_eq!(a, b);
        a.set(&ENABLED, true).unwrap();
        assert_ne!(a, b);
        b.set(&ENABLED, true).unwrap();
        assert_eq!(a, b.protect());
        assert_eq!(a.to_string(), "indexing [enabled=true, path=null, indexed-entities=[]]");
    }

    #[traced_test]
    #[test]
    fn test_protect_logs_at_trace() {
        let _ = make_set().protect();
        assert!(logs_contain("protected attribute set"));
    }
}
