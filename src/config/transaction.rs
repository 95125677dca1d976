//! Transaction configuration.
//!
//! Whether a cache is transactional matters beyond this element: exception
//! based eviction and transactional stores both require it, which the root
//! builder checks through its cache view.

use crate::attributes::{
    AttributeDefinition, AttributeSet, AttributeValue, ChangeTracker, CombinePolicy,
};
use crate::builder::{Builder, ConfigurationElement, ErrorCollector};
use crate::error::{Result, Violation};
use std::time::Duration;

/// Whether the cache takes part in transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransactionMode {
    /// Operations are applied immediately.
    #[default]
    NonTransactional,
    /// Operations are grouped in transactions.
    Transactional,
}

impl AttributeValue for TransactionMode {}

/// When transactional locks are acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LockingMode {
    /// At prepare time.
    #[default]
    Optimistic,
    /// On every write.
    Pessimistic,
}

impl AttributeValue for LockingMode {}

/// `transaction.mode`
pub static MODE: AttributeDefinition<TransactionMode> =
    AttributeDefinition::new("mode", TransactionMode::NonTransactional).immutable();
/// `transaction.locking`
pub static LOCKING: AttributeDefinition<LockingMode> =
    AttributeDefinition::new("locking", LockingMode::Optimistic).immutable();
/// `transaction.auto-commit`
pub static AUTO_COMMIT: AttributeDefinition<bool> =
    AttributeDefinition::new("auto-commit", true).immutable();
/// `transaction.complete-timeout`
pub static COMPLETE_TIMEOUT: AttributeDefinition<Duration> =
    AttributeDefinition::new("complete-timeout", Duration::from_secs(60)).immutable();
/// `transaction.reaper-interval`
pub static REAPER_INTERVAL: AttributeDefinition<Duration> =
    AttributeDefinition::new("reaper-interval", Duration::from_secs(30)).immutable();
/// `transaction.stop-timeout`
pub static STOP_TIMEOUT: AttributeDefinition<Duration> =
    AttributeDefinition::new("stop-timeout", Duration::from_secs(30)).immutable();

/// Builder for [`TransactionConfiguration`].
#[derive(Debug)]
pub struct TransactionConfigurationBuilder {
    attributes: AttributeSet,
}

impl TransactionConfigurationBuilder {
    pub(crate) fn new(tracker: &ChangeTracker) -> Self {
        let mut attributes = TransactionConfiguration::attribute_set();
        tracker.attach(&mut attributes);
        Self { attributes }
    }

    /// Transaction mode.
    pub fn mode(&mut self, mode: TransactionMode) -> &mut Self {
        self.attributes.write(&MODE, mode);
        self
    }

    /// Locking mode.
    pub fn locking(&mut self, locking: LockingMode) -> &mut Self {
        self.attributes.write(&LOCKING, locking);
        self
    }

    /// Whether single operations run in implicit transactions.
    pub fn auto_commit(&mut self, auto_commit: bool) -> &mut Self {
        self.attributes.write(&AUTO_COMMIT, auto_commit);
        self
    }

    /// How long completed transaction records are kept.
    pub fn complete_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.attributes.write(&COMPLETE_TIMEOUT, timeout);
        self
    }

    /// Interval between completed transaction cleanups.
    pub fn reaper_interval(&mut self, interval: Duration) -> &mut Self {
        self.attributes.write(&REAPER_INTERVAL, interval);
        self
    }

    /// How long stopping the cache waits for ongoing transactions.
    pub fn stop_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.attributes.write(&STOP_TIMEOUT, timeout);
        self
    }

    pub(crate) fn is_transactional(&self) -> bool {
        *self.attributes.get(&MODE) == TransactionMode::Transactional
    }
}

impl Builder for TransactionConfigurationBuilder {
    type Target = TransactionConfiguration;

    fn validate(&self) -> Result<()> {
        let mut errors = ErrorCollector::new();
        for (definition, attribute) in [
            (&COMPLETE_TIMEOUT, "complete-timeout"),
            (&REAPER_INTERVAL, "reaper-interval"),
            (&STOP_TIMEOUT, "stop-timeout"),
        ] {
            errors.ensure(
                !self.attributes.get(definition).is_zero(),
                "transaction",
                Violation::NonPositive { attribute },
            );
        }
        errors.into_result()
    }

    fn create(self) -> TransactionConfiguration {
        TransactionConfiguration::new(self.attributes.protect())
    }

    fn read(&mut self, template: &TransactionConfiguration, policy: CombinePolicy) -> Result<()> {
        self.attributes.read(&template.attributes, policy)
    }
}

/// Frozen transaction settings.
#[derive(Debug, PartialEq)]
pub struct TransactionConfiguration {
    attributes: AttributeSet,
}

impl TransactionConfiguration {
    pub(crate) fn attribute_set() -> AttributeSet {
        AttributeSet::new(
            "transaction",
            &[&MODE, &LOCKING, &AUTO_COMMIT, &COMPLETE_TIMEOUT, &REAPER_INTERVAL, &STOP_TIMEOUT],
        )
    }

    fn new(attributes: AttributeSet) -> Self {
        debug_assert!(attributes.check_protection().is_ok());
        Self { attributes }
    }

    /// Transaction mode.
    pub fn mode(&self) -> TransactionMode {
        *self.attributes.get(&MODE)
    }

    /// Shorthand for `mode() == Transactional`.
    pub fn is_transactional(&self) -> bool {
        self.mode() == TransactionMode::Transactional
    }

    /// Locking mode.
    pub fn locking(&self) -> LockingMode {
        *self.attributes.get(&LOCKING)
    }

    /// Whether single operations run in their own transaction.
    pub fn auto_commit(&self) -> bool {
        *self.attributes.get(&AUTO_COMMIT)
    }

    /// How long completed transactions are remembered.
    pub fn complete_timeout(&self) -> Duration {
        *self.attributes.get(&COMPLETE_TIMEOUT)
    }

    /// Interval of the transaction reaper.
    pub fn reaper_interval(&self) -> Duration {
        *self.attributes.get(&REAPER_INTERVAL)
    }

    /// How long a stopping cache waits for ongoing transactions.
    pub fn stop_timeout(&self) -> Duration {
        *self.attributes.get(&STOP_TIMEOUT)
    }
}

impl ConfigurationElement for TransactionConfiguration {
    fn element_name(&self) -> String {
        "transaction".to_string()
    }

    fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_transactional_by_default() {
        let builder = TransactionConfigurationBuilder::new(&ChangeTracker::new());
        assert!(!builder.is_transactional());
        let config = builder.create();
        assert_eq!(config.mode(), TransactionMode::NonTransactional);
        assert_eq!(config.locking(), LockingMode::Optimistic);
        assert!(config.auto_commit());
    }

    #[test]
    fn test_zero_timeouts_rejected() {
        let mut builder = TransactionConfigurationBuilder::new(&ChangeTracker::new());
        builder
            .mode(TransactionMode::Transactional)
            .stop_timeout(Duration::ZERO)
            .reaper_interval(Duration::ZERO);
        let err = builder.validate().unwrap_err();
        assert_eq!(
            err.violations(),
            vec![
                &Violation::NonPositive { attribute: "reaper-interval" },
                &Violation::NonPositive { attribute: "stop-timeout" },
            ]
        );
    }
}
