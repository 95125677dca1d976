//! Attribute Definitions
//!
//! A definition is the static schema of one attribute kind: its name, its
//! default value, whether it becomes read-only once its set is protected, and
//! an optional custom merge used by `Combine` reads. Definitions are declared
//! once as `static` items and shared by every cell created from them.
//!
//! ```
//! use cache_config::AttributeDefinition;
//!
//! static CONCURRENCY_LEVEL: AttributeDefinition<u32> =
//!     AttributeDefinition::new("concurrency-level", 32).immutable();
//!
//! assert_eq!(CONCURRENCY_LEVEL.name(), "concurrency-level");
//! assert_eq!(*CONCURRENCY_LEVEL.default_value(), 32);
//! assert!(CONCURRENCY_LEVEL.is_immutable());
//! ```

use super::attribute::{AnyAttribute, Attribute};
use super::AttributeValue;
use std::fmt;

/// Custom merge applied by `Combine` reads: `(destination, template)`.
pub type MergeFn<T> = fn(&mut T, &T);

/// Static schema entry for one attribute kind.
pub struct AttributeDefinition<T: AttributeValue> {
    name: &'static str,
    default: T,
    immutable: bool,
    merge: Option<MergeFn<T>>,
}

impl<T: AttributeValue> AttributeDefinition<T> {
    /// Declares a mutable attribute named `name` with the given default.
    pub const fn new(name: &'static str, default: T) -> Self {
        Self {
            name,
            default,
            immutable: false,
            merge: None,
        }
    }

    /// Freezes the attribute once its set is protected.
    pub const fn immutable(mut self) -> Self {
        self.immutable = true;
        self
    }

    /// Replaces the default `Combine` behaviour with `merge`.
    pub const fn with_merge(mut self, merge: MergeFn<T>) -> Self {
        self.merge = Some(merge);
        self
    }

    /// Attribute name, unique within its set.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The value a fresh cell starts with.
    pub fn default_value(&self) -> &T {
        &self.default
    }

    /// Whether writes are rejected after protection.
    pub fn is_immutable(&self) -> bool {
        self.immutable
    }

    /// The custom merge function, if any.
    pub fn merge(&self) -> Option<MergeFn<T>> {
        self.merge
    }
}

impl<T: AttributeValue> fmt::Debug for AttributeDefinition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeDefinition")
            .field("name", &self.name)
            .field("default", &self.default)
            .field("immutable", &self.immutable)
            .field("custom_merge", &self.merge.is_some())
            .finish()
    }
}

/// Type-erased definition used to declare the schema of an
/// [`AttributeSet`](super::AttributeSet).
pub trait AnyDefinition: Send + Sync {
    /// Attribute name.
    fn name(&self) -> &'static str;

    /// Creates a fresh cell holding the default value.
    fn instantiate(&'static self, owner: &'static str) -> Box<dyn AnyAttribute>;
}

impl<T: AttributeValue> AnyDefinition for AttributeDefinition<T> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn instantiate(&'static self, owner: &'static str) -> Box<dyn AnyAttribute> {
        Box::new(Attribute::new(self, owner))
    }
}
