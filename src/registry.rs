//! Configuration Registry
//!
//! A [`ConfigurationRegistry`] holds the named cache configurations of one
//! process together with the [`GlobalConfiguration`] they were validated
//! against. Every definition goes through the full two-phase validation, so
//! the registry only ever contains frozen, valid configurations.
//!
//! Templates are ordinary definitions marked with
//! [`ConfigurationBuilder::template`]. [`define_from_template`] starts a new
//! builder, reads the template into it and lets the caller customise the
//! result before it is validated:
//!
//! ```
//! use cache_config::config::clustering::CacheMode;
//! use cache_config::{CombinePolicy, ConfigurationBuilder, ConfigurationRegistry, GlobalConfigurationBuilder};
//!
//! let registry = ConfigurationRegistry::new(GlobalConfigurationBuilder::clustered().build().unwrap());
//!
//! let mut base = ConfigurationBuilder::new();
//! base.template(true).clustering().cache_mode(CacheMode::DistSync);
//! registry.define("dist-template", base).unwrap();
//!
//! let orders = registry
//!     .define_from_template("orders", "dist-template", CombinePolicy::Override, |b| {
//!         b.clustering().hash().num_owners(3);
//!     })
//!     .unwrap();
//! assert_eq!(orders.clustering().cache_mode(), CacheMode::DistSync);
//! assert!(!orders.is_template());
//! ```
//!
//! Reads take a shared lock and hand out `Arc<Configuration>`, so lookups
//! from many threads never copy a configuration.
//!
//! [`define_from_template`]: ConfigurationRegistry::define_from_template

use crate::attributes::CombinePolicy;
use crate::builder::Builder;
use crate::config::{Configuration, ConfigurationBuilder};
use crate::error::{ConfigError, Result};
use crate::global::GlobalConfiguration;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "hashbrown")]
use hashbrown::HashMap;

#[cfg(not(feature = "hashbrown"))]
use std::collections::HashMap;

/// Named, frozen cache configurations sharing one global configuration.
pub struct ConfigurationRegistry {
    global: Arc<GlobalConfiguration>,
    configurations: RwLock<HashMap<String, Arc<Configuration>>>,
}

impl ConfigurationRegistry {
    /// Creates an empty registry validating against `global`.
    pub fn new(global: GlobalConfiguration) -> Self {
        Self {
            global: Arc::new(global),
            configurations: RwLock::new(HashMap::new()),
        }
    }

    /// The global configuration every definition is checked against.
    pub fn global(&self) -> &Arc<GlobalConfiguration> {
        &self.global
    }

    /// Validates `builder` and registers the result under `name`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::AlreadyDefined`] if `name` is taken, otherwise every
    /// validation failure of the builder.
    pub fn define(&self, name: &str, builder: ConfigurationBuilder) -> Result<Arc<Configuration>> {
        if self.configurations.read().contains_key(name) {
            return Err(ConfigError::AlreadyDefined(name.to_string()));
        }
        let configuration = Arc::new(builder.build_with(self.global.as_ref())?);

        let mut configurations = self.configurations.write();
        if configurations.contains_key(name) {
            return Err(ConfigError::AlreadyDefined(name.to_string()));
        }
        configurations.insert(name.to_string(), Arc::clone(&configuration));
        tracing::info!(
            cache = name,
            template = configuration.is_template(),
            mode = ?configuration.clustering().cache_mode(),
            "defined cache configuration"
        );
        Ok(configuration)
    }

    /// Defines `name` from the registered `template`, customised by `customize`.
    ///
    /// The new definition is never itself a template.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UndefinedTemplate`] if `template` is not registered,
    /// otherwise anything [`define`](Self::define) reports.
    pub fn define_from_template<F>(
        &self,
        name: &str,
        template: &str,
        policy: CombinePolicy,
        customize: F,
    ) -> Result<Arc<Configuration>>
    where
        F: FnOnce(&mut ConfigurationBuilder),
    {
        let source = self
            .get(template)
            .ok_or_else(|| ConfigError::UndefinedTemplate(template.to_string()))?;

        let mut builder = ConfigurationBuilder::new();
        builder.read(&source, policy)?;
        customize(&mut builder);
        builder.template(false);
        tracing::debug!(cache = name, template, ?policy, "deriving cache configuration");
        self.define(name, builder)
    }

    /// The configuration registered under `name`.
    pub fn get(&self, name: &str) -> Option<Arc<Configuration>> {
        self.configurations.read().get(name).cloned()
    }

    /// Unregisters `name`, returning its configuration.
    pub fn remove(&self, name: &str) -> Option<Arc<Configuration>> {
        let removed = self.configurations.write().remove(name);
        if removed.is_some() {
            tracing::info!(cache = name, "removed cache configuration");
        }
        removed
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.configurations.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of defined configurations.
    pub fn len(&self) -> usize {
        self.configurations.read().len()
    }

    /// Whether no configuration is defined.
    pub fn is_empty(&self) -> bool {
        self.configurations.read().is_empty()
    }
}

impl fmt::Debug for ConfigurationRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigurationRegistry")
            .field("global", &self.global.name())
            .field("configurations", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::clustering::CacheMode;
    use crate::error::Violation;
    use crate::global::GlobalConfigurationBuilder;
    use tracing_test::traced_test;

    fn make_registry(clustered: bool) -> ConfigurationRegistry {
        let builder = if clustered {
            GlobalConfigurationBuilder::clustered()
        } else {
            GlobalConfigurationBuilder::new()
        };
        ConfigurationRegistry::new(builder.build().unwrap())
    }

    #[traced_test]
    #[test]
    fn test_define_and_get() {
        let registry = make_registry(false);
        assert!(registry.is_empty());
        let defined = registry.define("local", ConfigurationBuilder::new()).unwrap();
        let fetched = registry.get("local").unwrap();
        assert!(Arc::ptr_eq(&defined, &fetched));
        assert_eq!(registry.len(), 1);
        assert!(logs_contain("defined cache configuration"));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let registry = make_registry(false);
        registry.define("a", ConfigurationBuilder::new()).unwrap();
        assert_eq!(
            registry.define("a", ConfigurationBuilder::new()).unwrap_err(),
            ConfigError::AlreadyDefined("a".to_string())
        );
    }

    #[test]
    fn test_clustered_cache_needs_transport() {
        let registry = make_registry(false);
        let mut builder = ConfigurationBuilder::new();
        builder.clustering().cache_mode(CacheMode::ReplSync);
        let err = registry.define("repl", builder).unwrap_err();
        assert!(err.is_global());
        assert_eq!(
            err.violations(),
            vec![&Violation::MissingTransport { mode: CacheMode::ReplSync }]
        );
        assert!(registry.get("repl").is_none());
    }

    #[test]
    fn test_undefined_template() {
        let registry = make_registry(true);
        assert_eq!(
            registry
                .define_from_template("x", "missing", CombinePolicy::Override, |_| {})
                .unwrap_err(),
            ConfigError::UndefinedTemplate("missing".to_string())
        );
    }

    #[test]
    fn test_names_sorted_and_remove() {
        let registry = make_registry(false);
        for name in ["zeta", "alpha", "mid"] {
            registry.define(name, ConfigurationBuilder::new()).unwrap();
        }
        assert_eq!(registry.names(), vec!["alpha", "mid", "zeta"]);
        assert!(registry.remove("mid").is_some());
        assert!(registry.remove("mid").is_none());
        assert_eq!(registry.len(), 2);
    }
}
