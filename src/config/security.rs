//! Cache security configuration.
//!
//! Cache level authorization only restricts roles that the global
//! configuration already declares, so both of its rules run in the global
//! validation pass.

use crate::attributes::{AttributeDefinition, AttributeSet, ChangeTracker, CombinePolicy};
use crate::builder::{Builder, ConfigurationElement, ErrorCollector, GlobalScope};
use crate::error::{Result, Violation};
use std::collections::BTreeSet;

/// `security.authorization.enabled`
pub static ENABLED: AttributeDefinition<bool> =
    AttributeDefinition::new("enabled", false).immutable();
/// `security.authorization.roles`
pub static ROLES: AttributeDefinition<BTreeSet<String>> =
    AttributeDefinition::new("roles", BTreeSet::new()).immutable();

/// Builder for [`AuthorizationConfiguration`].
#[derive(Debug)]
pub struct AuthorizationConfigurationBuilder {
    attributes: AttributeSet,
}

impl AuthorizationConfigurationBuilder {
    fn new(tracker: &ChangeTracker) -> Self {
        let mut attributes = AuthorizationConfiguration::attribute_set();
        tracker.attach(&mut attributes);
        Self { attributes }
    }

    /// Turns authorization on.
    pub fn enable(&mut self) -> &mut Self {
        self.attributes.write(&ENABLED, true);
        self
    }

    /// Turns authorization off.
    pub fn disable(&mut self) -> &mut Self {
        self.attributes.write(&ENABLED, false);
        self
    }

    /// Allows `role` to access the cache.
    pub fn role(&mut self, role: impl Into<String>) -> &mut Self {
        let mut roles = self.attributes.get(&ROLES).clone();
        roles.insert(role.into());
        self.attributes.write(&ROLES, roles);
        self
    }

    pub(crate) fn is_enabled(&self) -> bool {
        *self.attributes.get(&ENABLED)
    }
}

impl Builder for AuthorizationConfigurationBuilder {
    type Target = AuthorizationConfiguration;

    fn validate(&self) -> Result<()> {
        Ok(())
    }

    fn validate_global(&self, global: &dyn GlobalScope) -> Result<()> {
        let mut errors = ErrorCollector::new();
        if self.is_enabled() {
            errors.ensure_global(
                global.is_authorization_enabled(),
                "security.authorization",
                Violation::AuthorizationNotEnabledGlobally,
            );
            for role in self.attributes.get(&ROLES) {
                errors.ensure_global(
                    global.has_role(role),
                    "security.authorization",
                    Violation::UnknownRole { role: role.clone() },
                );
            }
        }
        errors.into_result()
    }

    fn create(self) -> AuthorizationConfiguration {
        AuthorizationConfiguration::new(self.attributes.protect())
    }

    fn read(&mut self, template: &AuthorizationConfiguration, policy: CombinePolicy) -> Result<()> {
        self.attributes.read(&template.attributes, policy)
    }
}

/// Frozen authorization settings.
#[derive(Debug, PartialEq)]
pub struct AuthorizationConfiguration {
    attributes: AttributeSet,
}

impl AuthorizationConfiguration {
    pub(crate) fn attribute_set() -> AttributeSet {
        AttributeSet::new("security.authorization", &[&ENABLED, &ROLES])
    }

    fn new(attributes: AttributeSet) -> Self {
        debug_assert!(attributes.check_protection().is_ok());
        Self { attributes }
    }

    /// Whether access is checked.
    pub fn enabled(&self) -> bool {
        *self.attributes.get(&ENABLED)
    }

    /// Roles allowed to access the cache.
    pub fn roles(&self) -> &BTreeSet<String> {
        self.attributes.get(&ROLES)
    }
}

impl ConfigurationElement for AuthorizationConfiguration {
    fn element_name(&self) -> String {
        "authorization".to_string()
    }

    fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }
}

/// Builder for [`SecurityConfiguration`].
#[derive(Debug)]
pub struct SecurityConfigurationBuilder {
    attributes: AttributeSet,
    authorization: AuthorizationConfigurationBuilder,
}

impl SecurityConfigurationBuilder {
    pub(crate) fn new(tracker: &ChangeTracker) -> Self {
        Self {
            attributes: SecurityConfiguration::attribute_set(),
            authorization: AuthorizationConfigurationBuilder::new(tracker),
        }
    }

    /// Authorization settings.
    pub fn authorization(&mut self) -> &mut AuthorizationConfigurationBuilder {
        &mut self.authorization
    }

    pub(crate) fn authorization_enabled(&self) -> bool {
        self.authorization.is_enabled()
    }
}

impl Builder for SecurityConfigurationBuilder {
    type Target = SecurityConfiguration;

    fn validate(&self) -> Result<()> {
        self.authorization.validate()
    }

    fn validate_global(&self, global: &dyn GlobalScope) -> Result<()> {
        self.authorization.validate_global(global)
    }

    fn create(self) -> SecurityConfiguration {
        SecurityConfiguration::new(self.attributes.protect(), self.authorization.create())
    }

    fn read(&mut self, template: &SecurityConfiguration, policy: CombinePolicy) -> Result<()> {
        self.authorization.read(&template.authorization, policy)
    }
}

/// Frozen security settings.
#[derive(Debug, PartialEq)]
pub struct SecurityConfiguration {
    attributes: AttributeSet,
    authorization: AuthorizationConfiguration,
}

impl SecurityConfiguration {
    pub(crate) fn attribute_set() -> AttributeSet {
        AttributeSet::new("security", &[])
    }

    fn new(attributes: AttributeSet, authorization: AuthorizationConfiguration) -> Self {
        debug_assert!(attributes.check_protection().is_ok());
        Self {
            attributes,
            authorization,
        }
    }

    /// Authorization settings.
    pub fn authorization(&self) -> &AuthorizationConfiguration {
        &self.authorization
    }
}

impl ConfigurationElement for SecurityConfiguration {
    fn element_name(&self) -> String {
        "security".to_string()
    }

    fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }

    fn children(&self) -> Vec<&dyn ConfigurationElement> {
        vec![&self.authorization]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    struct RoleScope {
        enabled: bool,
        roles: &'static [&'static str],
    }

    impl GlobalScope for RoleScope {
        fn is_clustered(&self) -> bool {
            false
        }

        fn is_authorization_enabled(&self) -> bool {
            self.enabled
        }

        fn has_role(&self, role: &str) -> bool {
            self.roles.contains(&role)
        }

        fn local_site(&self) -> Option<&str> {
            None
        }
    }

    #[test]
    fn test_disabled_authorization_skips_global_rules() {
        let mut builder = SecurityConfigurationBuilder::new(&ChangeTracker::new());
        builder.authorization().role("ghost");
        let scope = RoleScope { enabled: false, roles: &[] };
        assert!(builder.validate_global(&scope).is_ok());
    }

    #[test]
    fn test_authorization_needs_global_support() {
        let mut builder = SecurityConfigurationBuilder::new(&ChangeTracker::new());
        builder.authorization().enable().role("admin").role("ghost");
        let scope = RoleScope {
            enabled: false,
            roles: &["admin"],
        };
        match builder.validate_global(&scope).unwrap_err() {
            ConfigError::Multiple(errors) => {
                assert_eq!(errors.len(), 2);
                assert!(errors.iter().all(ConfigError::is_global));
            }
            other => panic!("expected two errors, got {other}"),
        }
    }

    #[test]
    fn test_roles_are_frozen() {
        let mut builder = SecurityConfigurationBuilder::new(&ChangeTracker::new());
        builder.authorization().enable().role("reader").role("reader");
        let scope = RoleScope {
            enabled: true,
            roles: &["reader"],
        };
        assert!(builder.validate_global(&scope).is_ok());
        let config = builder.create();
        assert_eq!(config.authorization().roles().len(), 1);
        assert!(config.authorization().enabled());
    }
}
