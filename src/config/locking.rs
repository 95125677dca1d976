//! Locking configuration.

use crate::attributes::{
    AttributeDefinition, AttributeSet, AttributeValue, ChangeTracker, CombinePolicy,
};
use crate::builder::{Builder, ConfigurationElement, ErrorCollector};
use crate::error::{Result, Violation};
use std::time::Duration;

/// Transaction isolation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IsolationLevel {
    /// No isolation.
    None,
    /// Dirty reads allowed.
    ReadUncommitted,
    /// Only committed values are read.
    ReadCommitted,
    /// Reads within a transaction are repeatable.
    #[default]
    RepeatableRead,
    /// Full serialisability.
    Serializable,
}

impl AttributeValue for IsolationLevel {}

/// `locking.concurrency-level`
pub static CONCURRENCY_LEVEL: AttributeDefinition<u32> =
    AttributeDefinition::new("concurrency-level", 32).immutable();
/// `locking.acquire-timeout`
pub static ACQUIRE_TIMEOUT: AttributeDefinition<Duration> =
    AttributeDefinition::new("acquire-timeout", Duration::from_secs(10));
/// `locking.isolation`
pub static ISOLATION: AttributeDefinition<IsolationLevel> =
    AttributeDefinition::new("isolation", IsolationLevel::RepeatableRead).immutable();
/// `locking.striping`
pub static STRIPING: AttributeDefinition<bool> =
    AttributeDefinition::new("striping", false).immutable();

/// Builder for [`LockingConfiguration`].
#[derive(Debug)]
pub struct LockingConfigurationBuilder {
    attributes: AttributeSet,
}

impl LockingConfigurationBuilder {
    pub(crate) fn new(tracker: &ChangeTracker) -> Self {
        let mut attributes = LockingConfiguration::attribute_set();
        tracker.attach(&mut attributes);
        Self { attributes }
    }

    /// Expected number of concurrent writers.
    pub fn concurrency_level(&mut self, level: u32) -> &mut Self {
        self.attributes.write(&CONCURRENCY_LEVEL, level);
        self
    }

    /// Maximum time to wait for a lock.
    pub fn acquire_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.attributes.write(&ACQUIRE_TIMEOUT, timeout);
        self
    }

    /// Isolation level.
    pub fn isolation(&mut self, isolation: IsolationLevel) -> &mut Self {
        self.attributes.write(&ISOLATION, isolation);
        self
    }

    /// Whether locks are shared across stripes.
    pub fn striping(&mut self, striping: bool) -> &mut Self {
        self.attributes.write(&STRIPING, striping);
        self
    }
}

impl Builder for LockingConfigurationBuilder {
    type Target = LockingConfiguration;

    fn validate(&self) -> Result<()> {
        let mut errors = ErrorCollector::new();
        errors.ensure(
            *self.attributes.get(&CONCURRENCY_LEVEL) > 0,
            "locking",
            Violation::NonPositive { attribute: "concurrency-level" },
        );
        errors.ensure(
            !self.attributes.get(&ACQUIRE_TIMEOUT).is_zero(),
            "locking",
            Violation::NonPositive { attribute: "acquire-timeout" },
        );
        errors.into_result()
    }

    fn create(self) -> LockingConfiguration {
        LockingConfiguration::new(self.attributes.protect())
    }

    fn read(&mut self, template: &LockingConfiguration, policy: CombinePolicy) -> Result<()> {
        self.attributes.read(&template.attributes, policy)
    }
}

/// Frozen locking settings.
#[derive(Debug, PartialEq)]
pub struct LockingConfiguration {
    attributes: AttributeSet,
}

impl LockingConfiguration {
    pub(crate) fn attribute_set() -> AttributeSet {
        AttributeSet::new(
            "locking",
            &[&CONCURRENCY_LEVEL, &ACQUIRE_TIMEOUT, &ISOLATION, &STRIPING],
        )
    }

    fn new(attributes: AttributeSet) -> Self {
        debug_assert!(attributes.check_protection().is_ok());
        Self { attributes }
    }

    /// Expected number of concurrent writers.
    pub fn concurrency_level(&self) -> u32 {
        *self.attributes.get(&CONCURRENCY_LEVEL)
    }

    /// How long a lock acquisition waits.
    pub fn acquire_timeout(&self) -> Duration {
        *self.attributes.get(&ACQUIRE_TIMEOUT)
    }

    /// Isolation level.
    pub fn isolation(&self) -> IsolationLevel {
        *self.attributes.get(&ISOLATION)
    }

    /// Whether locks are striped.
    pub fn striping(&self) -> bool {
        *self.attributes.get(&STRIPING)
    }

    /// Changes the lock acquisition timeout of a running cache.
    ///
    /// # Errors
    ///
    /// [`Violation::NonPositive`] for a zero timeout.
    pub fn set_acquire_timeout(&mut self, timeout: Duration) -> Result<()> {
        let mut errors = ErrorCollector::new();
        errors.ensure(
            !timeout.is_zero(),
            "locking",
            Violation::NonPositive { attribute: "acquire-timeout" },
        );
        errors.into_result()?;
        self.attributes.set(&ACQUIRE_TIMEOUT, timeout)
    }
}

impl ConfigurationElement for LockingConfiguration {
    fn element_name(&self) -> String {
        "locking".to_string()
    }

    fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locking_defaults() {
        let config = LockingConfigurationBuilder::new(&ChangeTracker::new()).create();
        assert_eq!(config.concurrency_level(), 32);
        assert_eq!(config.isolation(), IsolationLevel::RepeatableRead);
        assert_eq!(config.acquire_timeout(), Duration::from_secs(10));
        assert!(!config.striping());
    }

    #[test]
    fn test_locking_rejects_zero() {
        let mut builder = LockingConfigurationBuilder::new(&ChangeTracker::new());
        builder.concurrency_level(0).acquire_timeout(Duration::ZERO);
        assert_eq!(builder.validate().unwrap_err().violations().len(), 2);
    }

    #[test]
    fn test_acquire_timeout_runtime_change() {
        let mut config = LockingConfigurationBuilder::new(&ChangeTracker::new()).create();
        config.set_acquire_timeout(Duration::from_millis(500)).unwrap();
        assert_eq!(config.acquire_timeout(), Duration::from_millis(500));
        assert!(config.set_acquire_timeout(Duration::ZERO).is_err());
    }
}
