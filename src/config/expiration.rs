//! Expiration configuration.
//!
//! `lifespan` and `max-idle` are the defaults applied to entries written
//! without explicit expiration; `None` means entries never expire. Both can
//! be changed on a running cache.

use crate::attributes::{AttributeDefinition, AttributeSet, ChangeTracker, CombinePolicy};
use crate::builder::{Builder, ConfigurationElement, ErrorCollector};
use crate::error::{Result, Violation};
use std::time::Duration;

/// `expiration.lifespan`
pub static LIFESPAN: AttributeDefinition<Option<Duration>> =
    AttributeDefinition::new("lifespan", None);
/// `expiration.max-idle`
pub static MAX_IDLE: AttributeDefinition<Option<Duration>> =
    AttributeDefinition::new("max-idle", None);
/// `expiration.wake-up-interval`
pub static WAKE_UP_INTERVAL: AttributeDefinition<Duration> =
    AttributeDefinition::new("wake-up-interval", Duration::from_secs(60)).immutable();
/// `expiration.reaper-enabled`
pub static REAPER_ENABLED: AttributeDefinition<bool> =
    AttributeDefinition::new("reaper-enabled", true).immutable();

/// Builder for [`ExpirationConfiguration`].
#[derive(Debug)]
pub struct ExpirationConfigurationBuilder {
    attributes: AttributeSet,
}

impl ExpirationConfigurationBuilder {
    pub(crate) fn new(tracker: &ChangeTracker) -> Self {
        let mut attributes = ExpirationConfiguration::attribute_set();
        tracker.attach(&mut attributes);
        Self { attributes }
    }

    /// Default maximum lifetime of an entry.
    pub fn lifespan(&mut self, lifespan: Duration) -> &mut Self {
        self.attributes.write(&LIFESPAN, Some(lifespan));
        self
    }

    /// Default maximum time an entry may go unread.
    pub fn max_idle(&mut self, max_idle: Duration) -> &mut Self {
        self.attributes.write(&MAX_IDLE, Some(max_idle));
        self
    }

    /// Interval between reaper runs.
    pub fn wake_up_interval(&mut self, interval: Duration) -> &mut Self {
        self.attributes.write(&WAKE_UP_INTERVAL, interval);
        self
    }

    /// Enables or disables the background reaper.
    pub fn reaper_enabled(&mut self, enabled: bool) -> &mut Self {
        self.attributes.write(&REAPER_ENABLED, enabled);
        self
    }
}

impl Builder for ExpirationConfigurationBuilder {
    type Target = ExpirationConfiguration;

    fn validate(&self) -> Result<()> {
        let mut errors = ErrorCollector::new();
        errors.ensure(
            *self.attributes.get(&LIFESPAN) != Some(Duration::ZERO),
            "expiration",
            Violation::NonPositive { attribute: "lifespan" },
        );
        errors.ensure(
            *self.attributes.get(&MAX_IDLE) != Some(Duration::ZERO),
            "expiration",
            Violation::NonPositive { attribute: "max-idle" },
        );
        errors.ensure(
            !*self.attributes.get(&REAPER_ENABLED)
                || !self.attributes.get(&WAKE_UP_INTERVAL).is_zero(),
            "expiration",
            Violation::NonPositive { attribute: "wake-up-interval" },
        );
        errors.into_result()
    }

    fn create(self) -> ExpirationConfiguration {
        ExpirationConfiguration::new(self.attributes.protect())
    }

    fn read(&mut self, template: &ExpirationConfiguration, policy: CombinePolicy) -> Result<()> {
        self.attributes.read(&template.attributes, policy)
    }
}

/// Frozen expiration settings.
#[derive(Debug, PartialEq)]
pub struct ExpirationConfiguration {
    attributes: AttributeSet,
}

impl ExpirationConfiguration {
    pub(crate) fn attribute_set() -> AttributeSet {
        AttributeSet::new("expiration", &[&LIFESPAN, &MAX_IDLE, &WAKE_UP_INTERVAL, &REAPER_ENABLED])
    }

    fn new(attributes: AttributeSet) -> Self {
        debug_assert!(attributes.check_protection().is_ok());
        Self { attributes }
    }

    /// Default lifespan, `None` for immortal entries.
    pub fn lifespan(&self) -> Option<Duration> {
        *self.attributes.get(&LIFESPAN)
    }

    /// Default max idle time, `None` if entries never idle out.
    pub fn max_idle(&self) -> Option<Duration> {
        *self.attributes.get(&MAX_IDLE)
    }

    /// Interval between reaper runs.
    pub fn wake_up_interval(&self) -> Duration {
        *self.attributes.get(&WAKE_UP_INTERVAL)
    }

    /// Whether the background reaper runs.
    pub fn reaper_enabled(&self) -> bool {
        *self.attributes.get(&REAPER_ENABLED)
    }

    /// Changes the default lifespan of a running cache.
    ///
    /// # Errors
    ///
    /// [`Violation::NonPositive`] for a zero duration.
    pub fn set_lifespan(&mut self, lifespan: Option<Duration>) -> Result<()> {
        let mut errors = ErrorCollector::new();
        errors.ensure(
            lifespan != Some(Duration::ZERO),
            "expiration",
            Violation::NonPositive { attribute: "lifespan" },
        );
        errors.into_result()?;
        self.attributes.set(&LIFESPAN, lifespan)
    }

    /// Changes the default max idle time of a running cache.
    ///
    /// # Errors
    ///
    /// [`Violation::NonPositive`] for a zero duration.
    pub fn set_max_idle(&mut self, max_idle: Option<Duration>) -> Result<()> {
        let mut errors = ErrorCollector::new();
        errors.ensure(
            max_idle != Some(Duration::ZERO),
            "expiration",
            Violation::NonPositive { attribute: "max-idle" },
        );
        errors.into_result()?;
        self.attributes.set(&MAX_IDLE, max_idle)
    }
}

impl ConfigurationElement for ExpirationConfiguration {
    fn element_name(&self) -> String {
        "expiration".to_string()
    }

    fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_builder() -> ExpirationConfigurationBuilder {
        ExpirationConfigurationBuilder::new(&ChangeTracker::new())
    }

    #[test]
    fn test_defaults_never_expire() {
        let config = make_builder().create();
        assert_eq!(config.lifespan(), None);
        assert_eq!(config.max_idle(), None);
        assert!(config.reaper_enabled());
    }

    #[test]
    fn test_zero_durations_rejected() {
        let mut builder = make_builder();
        builder
            .lifespan(Duration::ZERO)
            .max_idle(Duration::ZERO)
            .wake_up_interval(Duration::ZERO);
        assert_eq!(builder.validate().unwrap_err().violations().len(), 3);

        builder
            .reaper_enabled(false)
            .lifespan(Duration::from_secs(1))
            .max_idle(Duration::from_secs(1));
        assert!(builder.validate().is_ok());
    }

    #[test]
    fn test_runtime_changes() {
        let mut config = make_builder().create();
        config.set_lifespan(Some(Duration::from_secs(60))).unwrap();
        config.set_max_idle(Some(Duration::from_secs(5))).unwrap();
        assert_eq!(config.lifespan(), Some(Duration::from_secs(60)));
        assert_eq!(config.max_idle(), Some(Duration::from_secs(5)));
        assert!(config.set_lifespan(Some(Duration::ZERO)).is_err());
        assert_eq!(config.lifespan(), Some(Duration::from_secs(60)));
    }
}
