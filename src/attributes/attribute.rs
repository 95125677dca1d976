//! Attribute Cells
//!
//! An [`Attribute`] holds the current value of one attribute kind inside a
//! set, whether it was explicitly written, and whether the owning set has
//! been protected. Writes go through [`Attribute::set`], which rejects
//! changes to immutable attributes after protection and notifies listeners
//! synchronously.
//!
//! ```text
//!            set(v) / read(template)
//!   default ─────────────────────────▶ modified
//!      │                                  │
//!      └──────────── protect() ───────────┘
//!                        │
//!                        ▼
//!                    protected  (immutable cells reject writes)
//! ```
//!
//! [`AnyAttribute`] is the type-erased view used by sets, template reads and
//! listeners.

use super::definition::AttributeDefinition;
use super::{AttributeValue, CombinePolicy};
use crate::error::{ConfigError, Result};
use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

/// Observer of attribute writes.
pub trait AttributeListener: Send + Sync {
    /// Called after `attribute` changed; `old_value` is the previous value.
    fn attribute_changed(&self, attribute: &dyn AnyAttribute, old_value: &dyn fmt::Debug);
}

/// A typed attribute cell.
pub struct Attribute<T: AttributeValue> {
    definition: &'static AttributeDefinition<T>,
    owner: &'static str,
    value: T,
    modified: bool,
    protected: bool,
    listeners: Vec<Arc<dyn AttributeListener>>,
}

impl<T: AttributeValue> Attribute<T> {
    pub(crate) fn new(definition: &'static AttributeDefinition<T>, owner: &'static str) -> Self {
        Self {
            definition,
            owner,
            value: definition.default_value().clone(),
            modified: false,
            protected: false,
            listeners: Vec::new(),
        }
    }

    /// The definition this cell was created from.
    pub fn definition(&self) -> &'static AttributeDefinition<T> {
        self.definition
    }

    /// Current value.
    pub fn get(&self) -> &T {
        &self.value
    }

    /// Writes `value` and notifies listeners.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ProtectionViolation`] if the cell is protected and its
    /// definition is immutable.
    pub fn set(&mut self, value: T) -> Result<()> {
        self.check_writable()?;
        self.assign(value);
        Ok(())
    }

    /// Restores the default value and clears the modified flag.
    ///
    /// # Errors
    ///
    /// Same as [`Attribute::set`].
    pub fn reset(&mut self) -> Result<()> {
        self.check_writable()?;
        let old = std::mem::replace(&mut self.value, self.definition.default_value().clone());
        self.modified = false;
        self.notify(&old);
        Ok(())
    }

    /// Whether the value was explicitly written or imported from a template.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// Whether the value represents "not set".
    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    /// Whether the definition is immutable.
    pub fn is_immutable(&self) -> bool {
        self.definition.is_immutable()
    }

    /// Whether the owning set has been protected.
    pub fn is_protected(&self) -> bool {
        self.protected
    }

    /// Registers a listener for subsequent writes.
    pub fn add_listener(&mut self, listener: Arc<dyn AttributeListener>) {
        self.listeners.push(listener);
    }

    pub(crate) fn assign(&mut self, value: T) {
        let old = std::mem::replace(&mut self.value, value);
        self.modified = true;
        self.notify(&old);
    }

    fn notify(&self, old: &T) {
        for listener in &self.listeners {
            listener.attribute_changed(self, old);
        }
    }

    fn typed_source<'a>(&self, source: &'a dyn AnyAttribute) -> Result<&'a Attribute<T>> {
        source
            .as_any()
            .downcast_ref::<Attribute<T>>()
            .ok_or_else(|| ConfigError::MergeConflict {
                owner: self.owner,
                attribute: self.definition.name(),
                reason: format!(
                    "template value for '{}' is not of type {}",
                    source.name(),
                    type_name::<T>()
                ),
            })
    }

    fn check_writable(&self) -> Result<()> {
        if self.protected && self.definition.is_immutable() {
            return Err(ConfigError::ProtectionViolation {
                owner: self.owner,
                attribute: self.definition.name(),
            });
        }
        Ok(())
    }
}

impl<T: AttributeValue> fmt::Debug for Attribute<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.definition.name())
            .field("value", &self.value)
            .field("modified", &self.modified)
            .field("protected", &self.protected)
            .finish()
    }
}

/// Type-erased view of an [`Attribute`].
pub trait AnyAttribute: Send + Sync + fmt::Debug {
    /// Attribute name.
    fn name(&self) -> &'static str;
    /// Owner tag of the set holding this cell.
    fn owner(&self) -> &'static str;
    /// See [`Attribute::is_modified`].
    fn is_modified(&self) -> bool;
    /// See [`Attribute::is_null`].
    fn is_null(&self) -> bool;
    /// See [`Attribute::is_immutable`].
    fn is_immutable(&self) -> bool;
    /// See [`Attribute::is_protected`].
    fn is_protected(&self) -> bool;
    /// Rendering of the current value.
    fn describe(&self) -> String;
    /// Upcast for downcasting to the concrete [`Attribute`].
    fn as_any(&self) -> &dyn Any;
    /// Mutable upcast for downcasting to the concrete [`Attribute`].
    fn as_any_mut(&mut self) -> &mut dyn Any;
    /// Value equality; cells of different types are never equal.
    fn value_eq(&self, other: &dyn AnyAttribute) -> bool;
    /// Imports the value of `source` according to `policy`.
    ///
    /// An unmodified source never changes this cell. Listeners are not
    /// notified of imported values.
    fn read_from(&mut self, source: &dyn AnyAttribute, policy: CombinePolicy) -> Result<()>;
    /// Fails exactly when [`read_from`](Self::read_from) would, without
    /// touching the cell.
    fn check_read(&self, source: &dyn AnyAttribute) -> Result<()>;
    /// See [`Attribute::add_listener`].
    fn add_listener(&mut self, listener: Arc<dyn AttributeListener>);
    /// Marks the cell protected and drops the listeners registered so far.
    /// There is no way back.
    fn protect(&mut self);
}

impl<T: AttributeValue> AnyAttribute for Attribute<T> {
    fn name(&self) -> &'static str {
        self.definition.name()
    }

    fn owner(&self) -> &'static str {
        self.owner
    }

    fn is_modified(&self) -> bool {
        self.modified
    }

    fn is_null(&self) -> bool {
        self.value.is_null()
    }

    fn is_immutable(&self) -> bool {
        self.definition.is_immutable()
    }

    fn is_protected(&self) -> bool {
        self.protected
    }

    fn describe(&self) -> String {
        self.value.describe()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn value_eq(&self, other: &dyn AnyAttribute) -> bool {
        other
            .as_any()
            .downcast_ref::<Attribute<T>>()
            .is_some_and(|other| other.value == self.value)
    }

    fn check_read(&self, source: &dyn AnyAttribute) -> Result<()> {
        if self.typed_source(source)?.modified {
            self.check_writable()?;
        }
        Ok(())
    }

    fn read_from(&mut self, source: &dyn AnyAttribute, policy: CombinePolicy) -> Result<()> {
        self.check_read(source)?;
        let source = self.typed_source(source)?;
        if !source.modified {
            return Ok(());
        }

        match policy {
            CombinePolicy::Override => self.value = source.value.clone(),
            CombinePolicy::Combine if !self.modified => self.value = source.value.clone(),
            CombinePolicy::Combine => {
                if let Some(merge) = self.definition.merge() {
                    merge(&mut self.value, &source.value);
                } else if T::REPEATED {
                    self.value.union(&source.value);
                }
                // explicit scalar writes on the destination win
            }
        }
        self.modified = true;
        Ok(())
    }

    fn add_listener(&mut self, listener: Arc<dyn AttributeListener>) {
        self.listeners.push(listener);
    }

    fn protect(&mut self) {
        self.protected = true;
        self.listeners.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    static LIFESPAN: AttributeDefinition<i64> = AttributeDefinition::new("lifespan", -1);
    static STORAGE: AttributeDefinition<String> =
        AttributeDefinition::new("storage", String::new()).immutable();
    static ROLES: AttributeDefinition<Vec<String>> = AttributeDefinition::new("roles", Vec::new());

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl AttributeListener for Recorder {
        fn attribute_changed(&self, attribute: &dyn AnyAttribute, old_value: &dyn fmt::Debug) {
            self.events.lock().push(format!(
                "{}: {:?} -> {}",
                attribute.name(),
                old_value,
                attribute.describe()
            ));
        }
    }

    #[test]
    fn test_new_cell_holds_default() {
        let cell = Attribute::new(&LIFESPAN, "expiration");
        assert_eq!(*cell.get(), -1);
        assert!(!cell.is_modified());
        assert!(!cell.is_protected());
    }

    #[test]
    fn test_set_marks_modified_and_notifies() {
        let recorder = Arc::new(Recorder::default());
        let mut cell = Attribute::new(&LIFESPAN, "expiration");
        cell.add_listener(recorder.clone());

        cell.set(1000).unwrap();
        assert!(cell.is_modified());
        assert_eq!(*cell.get(), 1000);
        assert_eq!(*recorder.events.lock(), vec!["lifespan: -1 -> 1000"]);
    }

    #[test]
    fn test_protected_immutable_rejects_writes() {
        let mut cell = Attribute::new(&STORAGE, "memory");
        cell.set("heap".to_string()).unwrap();
        cell.protect();

        let err = cell.set("off-heap".to_string()).unwrap_err();
        assert_eq!(
            err,
            ConfigError::ProtectionViolation {
                owner: "memory",
                attribute: "storage"
            }
        );
        assert_eq!(cell.get(), "heap");
        assert!(cell.reset().is_err());
    }

    #[test]
    fn test_protect_detaches_builder_listeners() {
        let before = Arc::new(Recorder::default());
        let after = Arc::new(Recorder::default());
        let mut cell = Attribute::new(&LIFESPAN, "expiration");
        cell.add_listener(before.clone());
        cell.set(1).unwrap();
        cell.protect();
        cell.add_listener(after.clone());
        cell.set(2).unwrap();

        assert_eq!(*before.events.lock(), vec!["lifespan: -1 -> 1"]);
        assert_eq!(*after.events.lock(), vec!["lifespan: 1 -> 2"]);
    }

    #[test]
    fn test_protected_mutable_accepts_writes() {
        let mut cell = Attribute::new(&LIFESPAN, "expiration");
        cell.protect();
        cell.set(5).unwrap();
        assert_eq!(*cell.get(), 5);
        cell.reset().unwrap();
        assert_eq!(*cell.get(), -1);
        assert!(!cell.is_modified());
    }

    #[test]
    fn test_read_ignores_unmodified_source() {
        let source = Attribute::new(&LIFESPAN, "expiration");
        let mut dest = Attribute::new(&LIFESPAN, "expiration");
        dest.set(42).unwrap();
        dest.read_from(&source, CombinePolicy::Override).unwrap();
        assert_eq!(*dest.get(), 42);
    }

    #[test]
    fn test_combine_keeps_destination_scalar() {
        let mut source = Attribute::new(&LIFESPAN, "expiration");
        source.set(10).unwrap();
        let mut dest = Attribute::new(&LIFESPAN, "expiration");
        dest.set(20).unwrap();

        dest.read_from(&source, CombinePolicy::Combine).unwrap();
        assert_eq!(*dest.get(), 20);
        dest.read_from(&source, CombinePolicy::Override).unwrap();
        assert_eq!(*dest.get(), 10);
    }

    #[test]
    fn test_combine_unions_collections() {
        let mut source = Attribute::new(&ROLES, "authorization");
        source.set(vec!["reader".into(), "writer".into()]).unwrap();
        let mut dest = Attribute::new(&ROLES, "authorization");
        dest.set(vec!["admin".into(), "reader".into()]).unwrap();

        dest.read_from(&source, CombinePolicy::Combine).unwrap();
        assert_eq!(*dest.get(), vec!["admin", "reader", "writer"]);
    }

    #[test]
    fn test_read_type_mismatch_is_merge_conflict() {
        let mut source = Attribute::new(&STORAGE, "memory");
        source.set("heap".into()).unwrap();
        let mut dest = Attribute::new(&LIFESPAN, "memory");
        let err = dest.read_from(&source, CombinePolicy::Override).unwrap_err();
        assert!(matches!(err, ConfigError::MergeConflict { attribute: "lifespan", .. }));
    }

    #[test]
    fn test_read_does_not_notify() {
        let recorder = Arc::new(Recorder::default());
        let mut source = Attribute::new(&LIFESPAN, "expiration");
        source.set(7).unwrap();
        let mut dest = Attribute::new(&LIFESPAN, "expiration");
        dest.add_listener(recorder.clone());

        dest.read_from(&source, CombinePolicy::Override).unwrap();
        assert!(dest.is_modified());
        assert!(recorder.events.lock().is_empty());
    }
}
