//! Builder Lifecycle
//!
//! Every configuration element comes as a pair: a mutable builder owning an
//! unprotected [`AttributeSet`], and an immutable node owning the protected
//! set the builder produced. The [`Builder`] trait ties the two together:
//!
//! ```text
//!   Builder ──validate()──▶ validate_global(&dyn GlobalScope) ──create()──▶ Node
//!      ▲                                                                     │
//!      └─────────────────────────── read(&Node, policy) ─────────────────────┘
//! ```
//!
//! `validate` checks everything a builder can decide on its own and collects
//! all failures of the subtree. `validate_global` runs only after every local
//! check passed, against a read-only [`GlobalScope`]. `create` never
//! validates; it derives implied values, protects the set and consumes the
//! builder so a frozen node cannot be reached through it again.
//!
//! Nodes implement [`ConfigurationElement`], which gives serialisers and
//! diagnostics a uniform way to walk a frozen tree.

use crate::attributes::{AnyAttribute, AttributeSet, CombinePolicy};
use crate::error::{ConfigError, Result, Violation};
use std::collections::BTreeMap;

/// A mutable configuration element that produces an immutable node.
pub trait Builder {
    /// The frozen node produced by [`create`](Self::create).
    type Target;

    /// Checks the rules that depend only on this builder and its children.
    ///
    /// # Errors
    ///
    /// Every broken rule of the subtree, as [`ConfigError::Invalid`] or
    /// [`ConfigError::Multiple`].
    fn validate(&self) -> Result<()>;

    /// Checks the rules that depend on the global configuration.
    ///
    /// Only called once [`validate`](Self::validate) succeeded for the whole tree.
    ///
    /// # Errors
    ///
    /// Every broken rule, as [`ConfigError::InvalidGlobal`] or
    /// [`ConfigError::Multiple`].
    fn validate_global(&self, _global: &dyn GlobalScope) -> Result<()> {
        Ok(())
    }

    /// Derives implied values, protects the attribute sets and returns the
    /// frozen node.
    fn create(self) -> Self::Target;

    /// Imports the explicitly written values of `template`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MergeConflict`] if a value cannot be combined.
    fn read(&mut self, template: &Self::Target, policy: CombinePolicy) -> Result<()>;
}

/// Read-only view of the process-wide configuration consulted by
/// [`Builder::validate_global`].
pub trait GlobalScope {
    /// Whether a cluster transport is configured.
    fn is_clustered(&self) -> bool;

    /// Whether authorization is enabled process-wide.
    fn is_authorization_enabled(&self) -> bool;

    /// Whether `role` is declared process-wide.
    fn has_role(&self, role: &str) -> bool;

    /// Name of the site this process runs in, if any.
    fn local_site(&self) -> Option<&str>;
}

/// A frozen node of the configuration tree.
pub trait ConfigurationElement {
    /// Element name within its parent, e.g. `memory` or `store[jdbc]`.
    fn element_name(&self) -> String;

    /// The protected attribute set of this element.
    fn attributes(&self) -> &AttributeSet;

    /// Child elements in declaration order.
    fn children(&self) -> Vec<&dyn ConfigurationElement> {
        Vec::new()
    }

    /// Calls `visitor` with the dotted path and attribute set of this element
    /// and every descendant, depth first.
    fn visit(&self, visitor: &mut dyn FnMut(&str, &AttributeSet)) {
        self.visit_at("", visitor);
    }

    #[doc(hidden)]
    fn visit_at(&self, parent: &str, visitor: &mut dyn FnMut(&str, &AttributeSet)) {
        let path = if parent.is_empty() {
            self.element_name()
        } else {
            format!("{}.{}", parent, self.element_name())
        };
        visitor(&path, self.attributes());
        for child in self.children() {
            child.visit_at(&path, visitor);
        }
    }

    /// Finds the attribute `name` in the first element whose set is owned by
    /// `owner`.
    fn find_attribute(&self, owner: &str, name: &str) -> Option<&dyn AnyAttribute> {
        if self.attributes().owner() == owner {
            if let Ok(attribute) = self.attributes().try_attribute_by_name(name) {
                return Some(attribute);
            }
        }
        self.children()
            .into_iter()
            .find_map(|child| child.find_attribute(owner, name))
    }

    /// Every attribute of the subtree as `path.attribute -> value`.
    ///
    /// A `BTreeMap` keeps the output ordered, so two equal trees always
    /// render identically.
    fn to_btreemap(&self) -> BTreeMap<String, String> {
        let mut values = BTreeMap::new();
        self.visit(&mut |path, attributes| {
            for attribute in attributes.iter() {
                values.insert(format!("{}.{}", path, attribute.name()), attribute.describe());
            }
        });
        values
    }
}

/// Accumulates validation failures so a whole tree is reported at once.
#[derive(Debug, Default)]
pub(crate) struct ErrorCollector {
    errors: Vec<ConfigError>,
}

impl ErrorCollector {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Records the failure of `result`, flattening nested collections.
    pub(crate) fn check(&mut self, result: Result<()>) {
        match result {
            Ok(()) => {}
            Err(ConfigError::Multiple(errors)) => self.errors.extend(errors),
            Err(error) => self.errors.push(error),
        }
    }

    /// Records a local violation on `element` unless `ok` holds.
    pub(crate) fn ensure(&mut self, ok: bool, element: &str, violation: Violation) {
        if !ok {
            self.errors.push(ConfigError::invalid(element, violation));
        }
    }

    /// Records a global violation on `element` unless `ok` holds.
    pub(crate) fn ensure_global(&mut self, ok: bool, element: &str, violation: Violation) {
        if !ok {
            self.errors.push(ConfigError::invalid_global(element, violation));
        }
    }

    pub(crate) fn into_result(mut self) -> Result<()> {
        match self.errors.len() {
            0 => Ok(()),
            1 => Err(self.errors.remove(0)),
            _ => Err(ConfigError::Multiple(self.errors)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_empty_is_ok() {
        assert!(ErrorCollector::new().into_result().is_ok());
    }

    #[test]
    fn test_collector_single_error_is_unwrapped() {
        let mut collector = ErrorCollector::new();
        collector.ensure(
            false,
            "locking",
            Violation::NonPositive { attribute: "concurrency-level" },
        );
        collector.ensure(true, "locking", Violation::NonPositive { attribute: "acquire-timeout" });
        assert_eq!(
            collector.into_result().unwrap_err(),
            ConfigError::invalid(
                "locking",
                Violation::NonPositive { attribute: "concurrency-level" }
            )
        );
    }

    #[test]
    fn test_collector_flattens_nested_errors() {
        let mut collector = ErrorCollector::new();
        collector.check(Err(ConfigError::Multiple(vec![
            ConfigError::invalid("a", Violation::ReadOnlyAndWriteOnly),
            ConfigError::invalid("b", Violation::WriteOnlyPreload),
        ])));
        collector.ensure_global(false, "sites", Violation::MissingLocalSite);

        match collector.into_result().unwrap_err() {
            ConfigError::Multiple(errors) => assert_eq!(errors.len(), 3),
            other => panic!("expected multiple errors, got {other}"),
        }
    }
}
