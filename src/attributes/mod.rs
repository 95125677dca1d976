//! Attribute Engine
//!
//! The building blocks every configuration element is made of:
//!
//! | Type | Role |
//! |------|------|
//! | [`AttributeDefinition`] | static schema of one attribute kind (name, default, immutability, merge) |
//! | [`Attribute`] | a cell holding the current value, its modified flag and listeners |
//! | [`AttributeSet`] | the ordered cells of one element, protected when the element is built |
//! | [`ChangeTracker`] | passive listener recording what a builder tree changed |
//!
//! # Reading from templates
//!
//! [`AttributeSet::read`] imports the explicitly written cells of another
//! set. How a written template cell meets a destination cell depends on the
//! [`CombinePolicy`]:
//!
//! | Destination | `Override` | `Combine` |
//! |-------------|------------|-----------|
//! | unmodified | template value | template value |
//! | modified scalar | template value | destination value |
//! | modified collection | template value | union of both |
//! | custom merge | template value | `merge(destination, template)` |
//!
//! Unmodified template cells never change the destination.

mod attribute;
mod definition;
mod set;
mod tracker;
mod value;

pub use attribute::{AnyAttribute, Attribute, AttributeListener};
pub use definition::{AnyDefinition, AttributeDefinition, MergeFn};
pub use set::AttributeSet;
pub use tracker::ChangeTracker;
pub use value::AttributeValue;

/// How a template is applied by `read`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CombinePolicy {
    /// Written template values replace destination values.
    #[default]
    Override,
    /// Collections are unioned; explicit destination scalars are kept.
    Combine,
}
