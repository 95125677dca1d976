//! Global Configuration
//!
//! Process-wide settings shared by every cache of a
//! [`ConfigurationRegistry`](crate::ConfigurationRegistry): the cluster
//! transport and the declared authorization roles. A frozen
//! [`GlobalConfiguration`] is the [`GlobalScope`] cache configurations are
//! checked against in the global validation pass.
//!
//! ```
//! use cache_config::{GlobalConfigurationBuilder, GlobalScope};
//!
//! let mut builder = GlobalConfigurationBuilder::clustered();
//! builder.transport().cluster_name("orders").site("LON");
//! let global = builder.build().unwrap();
//!
//! assert!(global.is_clustered());
//! assert_eq!(global.local_site(), Some("LON"));
//! ```

use crate::attributes::{AttributeDefinition, AttributeSet, ChangeTracker, CombinePolicy};
use crate::builder::{Builder, ConfigurationElement, ErrorCollector, GlobalScope};
use crate::error::{Result, Violation};
use std::collections::BTreeSet;
use std::time::Duration;

/// `global.name`
pub static NAME: AttributeDefinition<String> =
    AttributeDefinition::new("name", String::new()).immutable();
/// `global.default-cache`
pub static DEFAULT_CACHE: AttributeDefinition<Option<String>> =
    AttributeDefinition::new("default-cache", None).immutable();
/// `global.statistics`
pub static STATISTICS: AttributeDefinition<bool> = AttributeDefinition::new("statistics", false);

/// `global.transport.enabled`
pub static TRANSPORT_ENABLED: AttributeDefinition<bool> =
    AttributeDefinition::new("enabled", false).immutable();
/// `global.transport.cluster-name`
pub static CLUSTER_NAME: AttributeDefinition<String> =
    AttributeDefinition::new("cluster-name", String::new()).immutable();
/// `global.transport.node-name`
pub static NODE_NAME: AttributeDefinition<Option<String>> =
    AttributeDefinition::new("node-name", None).immutable();
/// `global.transport.site`
pub static SITE: AttributeDefinition<Option<String>> =
    AttributeDefinition::new("site", None).immutable();
/// `global.transport.distributed-sync-timeout`
pub static DISTRIBUTED_SYNC_TIMEOUT: AttributeDefinition<Duration> =
    AttributeDefinition::new("distributed-sync-timeout", Duration::from_secs(240));

/// `global.security.authorization.enabled`
pub static AUTHORIZATION_ENABLED: AttributeDefinition<bool> =
    AttributeDefinition::new("enabled", false).immutable();
/// `global.security.authorization.roles`
pub static ROLES: AttributeDefinition<BTreeSet<String>> =
    AttributeDefinition::new("roles", BTreeSet::new()).immutable();

const DEFAULT_CLUSTER_NAME: &str = "cache-cluster";

// ============================================================================
// transport
// ============================================================================

/// Builder for [`TransportConfiguration`].
#[derive(Debug)]
pub struct TransportConfigurationBuilder {
    attributes: AttributeSet,
}

impl TransportConfigurationBuilder {
    fn new(tracker: &ChangeTracker) -> Self {
        let mut attributes = TransportConfiguration::attribute_set();
        tracker.attach(&mut attributes);
        Self { attributes }
    }

    /// Turns the cluster transport on with the default cluster name.
    pub fn enable(&mut self) -> &mut Self {
        self.attributes.write(&TRANSPORT_ENABLED, true);
        if !self.attributes.is_modified_attr(&CLUSTER_NAME) {
            self.attributes.write(&CLUSTER_NAME, DEFAULT_CLUSTER_NAME.to_string());
        }
        self
    }

    /// Turns the transport off.
    pub fn disable(&mut self) -> &mut Self {
        self.attributes.write(&TRANSPORT_ENABLED, false);
        self
    }

    /// Name of the cluster to join.
    pub fn cluster_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.attributes.write(&CLUSTER_NAME, name.into());
        self
    }

    /// Name of this node.
    pub fn node_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.attributes.write(&NODE_NAME, Some(name.into()));
        self
    }

    /// Names the site this node belongs to.
    pub fn site(&mut self, site: impl Into<String>) -> &mut Self {
        self.attributes.write(&SITE, Some(site.into()));
        self
    }

    /// Timeout for cluster-wide synchronous operations.
    pub fn distributed_sync_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.attributes.write(&DISTRIBUTED_SYNC_TIMEOUT, timeout);
        self
    }
}

impl Builder for TransportConfigurationBuilder {
    type Target = TransportConfiguration;

    fn validate(&self) -> Result<()> {
        let mut errors = ErrorCollector::new();
        let enabled = *self.attributes.get(&TRANSPORT_ENABLED);
        errors.ensure(
            enabled || self.attributes.attribute(&SITE).is_null(),
            "global.transport",
            Violation::SiteRequiresTransport,
        );
        errors.ensure(
            !enabled || !self.attributes.get(&CLUSTER_NAME).is_empty(),
            "global.transport",
            Violation::Missing { attribute: "cluster-name" },
        );
        errors.ensure(
            !self.attributes.get(&DISTRIBUTED_SYNC_TIMEOUT).is_zero(),
            "global.transport",
            Violation::NonPositive { attribute: "distributed-sync-timeout" },
        );
        errors.into_result()
    }

    fn create(self) -> TransportConfiguration {
        TransportConfiguration {
            attributes: self.attributes.protect(),
        }
    }

    fn read(&mut self, template: &TransportConfiguration, policy: CombinePolicy) -> Result<()> {
        self.attributes.read(&template.attributes, policy)
    }
}

/// Frozen transport settings.
#[derive(Debug, PartialEq)]
pub struct TransportConfiguration {
    attributes: AttributeSet,
}

impl TransportConfiguration {
    pub(crate) fn attribute_set() -> AttributeSet {
        AttributeSet::new(
            "global.transport",
            &[&TRANSPORT_ENABLED, &CLUSTER_NAME, &NODE_NAME, &SITE, &DISTRIBUTED_SYNC_TIMEOUT],
        )
    }

    /// Whether the node is clustered.
    pub fn enabled(&self) -> bool {
        *self.attributes.get(&TRANSPORT_ENABLED)
    }

    /// Cluster name.
    pub fn cluster_name(&self) -> &str {
        self.attributes.get(&CLUSTER_NAME).as_str()
    }

    /// Node name, if any.
    pub fn node_name(&self) -> Option<&str> {
        self.attributes.get(&NODE_NAME).as_deref()
    }

    /// Site name, if any.
    pub fn site(&self) -> Option<&str> {
        self.attributes.get(&SITE).as_deref()
    }

    /// Timeout for cluster-wide synchronous operations.
    pub fn distributed_sync_timeout(&self) -> Duration {
        *self.attributes.get(&DISTRIBUTED_SYNC_TIMEOUT)
    }
}

impl ConfigurationElement for TransportConfiguration {
    fn element_name(&self) -> String {
        "transport".to_string()
    }

    fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }
}

// ============================================================================
// authorization
// ============================================================================

/// Builder for [`GlobalAuthorizationConfiguration`].
#[derive(Debug)]
pub struct GlobalAuthorizationConfigurationBuilder {
    attributes: AttributeSet,
}

impl GlobalAuthorizationConfigurationBuilder {
    fn new(tracker: &ChangeTracker) -> Self {
        let mut attributes = GlobalAuthorizationConfiguration::attribute_set();
        tracker.attach(&mut attributes);
        Self { attributes }
    }

    /// Turns global authorization on.
    pub fn enable(&mut self) -> &mut Self {
        self.attributes.write(&AUTHORIZATION_ENABLED, true);
        self
    }

    /// Turns global authorization off.
    pub fn disable(&mut self) -> &mut Self {
        self.attributes.write(&AUTHORIZATION_ENABLED, false);
        self
    }

    /// Declares a role caches may grant access to.
    pub fn role(&mut self, role: impl Into<String>) -> &mut Self {
        let mut roles = self.attributes.get(&ROLES).clone();
        roles.insert(role.into());
        self.attributes.write(&ROLES, roles);
        self
    }
}

impl Builder for GlobalAuthorizationConfigurationBuilder {
    type Target = GlobalAuthorizationConfiguration;

    fn validate(&self) -> Result<()> {
        let mut errors = ErrorCollector::new();
        errors.ensure(
            !*self.attributes.get(&AUTHORIZATION_ENABLED)
                || !self.attributes.get(&ROLES).is_empty(),
            "global.security.authorization",
            Violation::AuthorizationWithoutRoles,
        );
        errors.into_result()
    }

    fn create(self) -> GlobalAuthorizationConfiguration {
        GlobalAuthorizationConfiguration {
            attributes: self.attributes.protect(),
        }
    }

    fn read(
        &mut self,
        template: &GlobalAuthorizationConfiguration,
        policy: CombinePolicy,
    ) -> Result<()> {
        self.attributes.read(&template.attributes, policy)
    }
}

/// Frozen process-wide authorization settings.
#[derive(Debug, PartialEq)]
pub struct GlobalAuthorizationConfiguration {
    attributes: AttributeSet,
}

impl GlobalAuthorizationConfiguration {
    pub(crate) fn attribute_set() -> AttributeSet {
        AttributeSet::new("global.security.authorization", &[&AUTHORIZATION_ENABLED, &ROLES])
    }

    /// Whether authorization is enabled.
    pub fn enabled(&self) -> bool {
        *self.attributes.get(&AUTHORIZATION_ENABLED)
    }

    /// Declared roles.
    pub fn roles(&self) -> &BTreeSet<String> {
        self.attributes.get(&ROLES)
    }
}

impl ConfigurationElement for GlobalAuthorizationConfiguration {
    fn element_name(&self) -> String {
        "authorization".to_string()
    }

    fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }
}

// ============================================================================
// global
// ============================================================================

/// Builder for [`GlobalConfiguration`].
#[derive(Debug)]
pub struct GlobalConfigurationBuilder {
    attributes: AttributeSet,
    transport: TransportConfigurationBuilder,
    authorization: GlobalAuthorizationConfigurationBuilder,
    tracker: ChangeTracker,
}

impl Default for GlobalConfigurationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GlobalConfigurationBuilder {
    /// Creates a builder for a local, non-clustered process.
    pub fn new() -> Self {
        let tracker = ChangeTracker::new();
        let mut attributes = GlobalConfiguration::attribute_set();
        tracker.attach(&mut attributes);
        Self {
            attributes,
            transport: TransportConfigurationBuilder::new(&tracker),
            authorization: GlobalAuthorizationConfigurationBuilder::new(&tracker),
            tracker,
        }
    }

    /// Creates a builder with the cluster transport enabled.
    pub fn clustered() -> Self {
        let mut builder = Self::new();
        builder.transport.enable();
        builder
    }

    /// Names the cache container.
    pub fn name(&mut self, name: impl Into<String>) -> &mut Self {
        self.attributes.write(&NAME, name.into());
        self
    }

    /// Name of the cache returned when none is asked for explicitly.
    pub fn default_cache(&mut self, name: impl Into<String>) -> &mut Self {
        self.attributes.write(&DEFAULT_CACHE, Some(name.into()));
        self
    }

    /// Whether statistics are collected by default.
    pub fn statistics(&mut self, enabled: bool) -> &mut Self {
        self.attributes.write(&STATISTICS, enabled);
        self
    }

    /// Transport settings.
    pub fn transport(&mut self) -> &mut TransportConfigurationBuilder {
        &mut self.transport
    }

    /// Authorization settings.
    pub fn authorization(&mut self) -> &mut GlobalAuthorizationConfigurationBuilder {
        &mut self.authorization
    }

    /// Validates and freezes the global configuration.
    ///
    /// # Errors
    ///
    /// Every broken rule of the transport and authorization elements.
    pub fn build(self) -> Result<GlobalConfiguration> {
        if let Err(error) = self.validate() {
            tracing::warn!(%error, "rejected global configuration");
            return Err(error);
        }
        let changes = self.tracker.describe();
        tracing::debug!(?changes, "creating global configuration");
        Ok(self.create())
    }
}

impl Builder for GlobalConfigurationBuilder {
    type Target = GlobalConfiguration;

    fn validate(&self) -> Result<()> {
        let mut errors = ErrorCollector::new();
        errors.check(self.transport.validate());
        errors.check(self.authorization.validate());
        errors.into_result()
    }

    fn create(self) -> GlobalConfiguration {
        self.tracker.stop();
        let global = GlobalConfiguration {
            attributes: self.attributes.protect(),
            transport: self.transport.create(),
            authorization: self.authorization.create(),
        };
        self.tracker.reset();
        global
    }

    fn read(&mut self, template: &GlobalConfiguration, policy: CombinePolicy) -> Result<()> {
        self.attributes.read(&template.attributes, policy)?;
        self.transport.read(&template.transport, policy)?;
        self.authorization.read(&template.authorization, policy)
    }
}

/// Frozen process-wide configuration.
#[derive(Debug, PartialEq)]
pub struct GlobalConfiguration {
    attributes: AttributeSet,
    transport: TransportConfiguration,
    authorization: GlobalAuthorizationConfiguration,
}

impl GlobalConfiguration {
    pub(crate) fn attribute_set() -> AttributeSet {
        AttributeSet::new("global", &[&NAME, &DEFAULT_CACHE, &STATISTICS])
    }

    /// Name of the container.
    pub fn name(&self) -> &str {
        self.attributes.get(&NAME).as_str()
    }

    /// Cache used when none is named, if any.
    pub fn default_cache(&self) -> Option<&str> {
        self.attributes.get(&DEFAULT_CACHE).as_deref()
    }

    /// Whether statistics are collected by default.
    pub fn statistics(&self) -> bool {
        *self.attributes.get(&STATISTICS)
    }

    /// Transport settings.
    pub fn transport(&self) -> &TransportConfiguration {
        &self.transport
    }

    /// Authorization settings.
    pub fn authorization(&self) -> &GlobalAuthorizationConfiguration {
        &self.authorization
    }
}

impl GlobalScope for GlobalConfiguration {
    fn is_clustered(&self) -> bool {
        self.transport.enabled()
    }

    fn is_authorization_enabled(&self) -> bool {
        self.authorization.enabled()
    }

    fn has_role(&self, role: &str) -> bool {
        self.authorization.roles().contains(role)
    }

    fn local_site(&self) -> Option<&str> {
        self.transport.site()
    }
}

impl ConfigurationElement for GlobalConfiguration {
    fn element_name(&self) -> String {
        "global".to_string()
    }

    fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }

    fn children(&self) -> Vec<&dyn ConfigurationElement> {
        vec![&self.transport, &self.authorization]
    }
}
