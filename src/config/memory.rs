//! Memory and eviction configuration.
//!
//! A cache is bounded either by entry count (`max-count`) or by memory use
//! (`max-size`, a byte quantity such as `"1.5 GB"`), never both. What happens
//! when the bound is reached is decided by `when-full`:
//!
//! | Strategy | Bound required | Notes |
//! |----------|----------------|-------|
//! | `None` | no | unbounded |
//! | `Manual` | no | the application evicts explicitly |
//! | `Remove` | yes | implied when a bound is set and `when-full` is not |
//! | `Exception` | yes | writes fail when full; needs a transactional cache |
//!
//! Both bounds remain writable on a running cache.

use crate::attributes::{
    AttributeDefinition, AttributeSet, AttributeValue, ChangeTracker, CombinePolicy,
};
use crate::builder::{Builder, ConfigurationElement, ErrorCollector};
use crate::config::CacheView;
use crate::error::{Result, Violation};

/// Largest supported eviction bound, in entries or bytes.
pub const MAX_EVICTION_BOUND: u64 = 1 << 48;

/// Where entries are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StorageType {
    /// On the managed heap.
    #[default]
    Heap,
    /// In native memory.
    OffHeap,
}

impl AttributeValue for StorageType {}

/// What a bounded cache does when it is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EvictionStrategy {
    /// No eviction.
    #[default]
    None,
    /// The application evicts entries itself.
    Manual,
    /// Entries are removed to make room.
    Remove,
    /// Writes that would exceed the bound fail.
    Exception,
}

impl EvictionStrategy {
    /// Whether the cache enforces a bound.
    pub fn is_enabled(self) -> bool {
        matches!(self, EvictionStrategy::Remove | EvictionStrategy::Exception)
    }

    /// Whether writes are rejected instead of evicting.
    pub fn is_exception_based(self) -> bool {
        self == EvictionStrategy::Exception
    }
}

impl AttributeValue for EvictionStrategy {}

/// `memory.max-count`
pub static MAX_COUNT: AttributeDefinition<Option<u64>> =
    AttributeDefinition::new("max-count", None);
/// `memory.max-size`
pub static MAX_SIZE: AttributeDefinition<Option<String>> =
    AttributeDefinition::new("max-size", None);
/// `memory.storage`
pub static STORAGE: AttributeDefinition<StorageType> =
    AttributeDefinition::new("storage", StorageType::Heap).immutable();
/// `memory.when-full`
pub static WHEN_FULL: AttributeDefinition<EvictionStrategy> =
    AttributeDefinition::new("when-full", EvictionStrategy::None).immutable();

const DECIMAL_UNITS: [(&str, u64); 5] = [
    ("B", 1),
    ("KB", 1_000),
    ("MB", 1_000_000),
    ("GB", 1_000_000_000),
    ("TB", 1_000_000_000_000),
];

const BINARY_UNITS: [(&str, u64); 4] = [
    ("KIB", 1 << 10),
    ("MIB", 1 << 20),
    ("GIB", 1 << 30),
    ("TIB", 1 << 40),
];

/// Parses a byte quantity such as `"512"`, `"64 MB"`, `"1.5GB"` or `"2 GiB"`.
///
/// Decimal units are powers of 1000, binary units powers of 1024. Units are
/// case-insensitive and fractional values are truncated to whole bytes.
///
/// ```
/// use cache_config::config::memory::parse_byte_quantity;
///
/// assert_eq!(parse_byte_quantity("1.5 GB"), Ok(1_500_000_000));
/// assert_eq!(parse_byte_quantity("1KiB"), Ok(1024));
/// assert!(parse_byte_quantity("lots").is_err());
/// ```
///
/// # Errors
///
/// [`Violation::InvalidByteQuantity`] for malformed text or values that do
/// not fit in a `u64`.
pub fn parse_byte_quantity(text: &str) -> core::result::Result<u64, Violation> {
    let invalid = || Violation::InvalidByteQuantity {
        value: text.to_string(),
    };
    let trimmed = text.trim();
    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);
    let unit = unit.trim().to_ascii_uppercase();

    let multiplier = if unit.is_empty() {
        1
    } else {
        DECIMAL_UNITS
            .iter()
            .chain(BINARY_UNITS.iter())
            .find(|(name, _)| *name == unit)
            .map(|&(_, multiplier)| multiplier)
            .ok_or_else(invalid)?
    };

    let (whole, fraction) = match number.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (number, ""),
    };
    if whole.is_empty() || (number.contains('.') && fraction.is_empty()) {
        return Err(invalid());
    }
    let whole: u128 = whole.parse().map_err(|_| invalid())?;
    let mut bytes = whole.checked_mul(u128::from(multiplier)).ok_or_else(invalid)?;
    if !fraction.is_empty() {
        let digits = u32::try_from(fraction.len()).map_err(|_| invalid())?;
        let scale = 10u128.checked_pow(digits).ok_or_else(invalid)?;
        let fraction: u128 = fraction.parse().map_err(|_| invalid())?;
        bytes += fraction.checked_mul(u128::from(multiplier)).ok_or_else(invalid)? / scale;
    }
    u64::try_from(bytes).map_err(|_| invalid())
}

/// Bound rules shared by the build and the runtime setters.
fn check_bounds(errors: &mut ErrorCollector, count: Option<u64>, size: Option<&str>) {
    let bytes = match size.map(parse_byte_quantity) {
        Some(Ok(bytes)) => Some(bytes),
        Some(Err(violation)) => {
            errors.ensure(false, "memory", violation);
            None
        }
        None => None,
    };

    errors.ensure(count != Some(0), "memory", Violation::NonPositive { attribute: "max-count" });
    errors.ensure(bytes != Some(0), "memory", Violation::NonPositive { attribute: "max-size" });
    errors.ensure(
        !(count.is_some() && size.is_some()),
        "memory",
        Violation::ConflictingEvictionBounds,
    );
    for bound in [count, bytes].into_iter().flatten() {
        errors.ensure(
            bound <= MAX_EVICTION_BOUND,
            "memory",
            Violation::EvictionBoundTooLarge {
                bound,
                max: MAX_EVICTION_BOUND,
            },
        );
    }
}

/// Builder for [`MemoryConfiguration`].
#[derive(Debug)]
pub struct MemoryConfigurationBuilder {
    attributes: AttributeSet,
}

impl MemoryConfigurationBuilder {
    pub(crate) fn new(tracker: &ChangeTracker) -> Self {
        let mut attributes = MemoryConfiguration::attribute_set();
        tracker.attach(&mut attributes);
        Self { attributes }
    }

    /// Bounds the cache by entry count.
    pub fn max_count(&mut self, count: u64) -> &mut Self {
        self.attributes.write(&MAX_COUNT, Some(count));
        self
    }

    /// Bounds the cache by memory, e.g. `"512 MB"`.
    pub fn max_size(&mut self, size: impl Into<String>) -> &mut Self {
        self.attributes.write(&MAX_SIZE, Some(size.into()));
        self
    }

    /// Where entries are stored.
    pub fn storage(&mut self, storage: StorageType) -> &mut Self {
        self.attributes.write(&STORAGE, storage);
        self
    }

    /// What to do when the bound is reached.
    pub fn when_full(&mut self, strategy: EvictionStrategy) -> &mut Self {
        self.attributes.write(&WHEN_FULL, strategy);
        self
    }

    fn has_bound(&self) -> bool {
        self.attributes.get(&MAX_COUNT).is_some() || self.attributes.get(&MAX_SIZE).is_some()
    }

    /// The strategy `create` will settle on.
    pub(crate) fn effective_strategy(&self) -> EvictionStrategy {
        let when_full = self.attributes.attribute(&WHEN_FULL);
        if !when_full.is_modified() && self.has_bound() {
            EvictionStrategy::Remove
        } else {
            *when_full.get()
        }
    }

    pub(crate) fn validate_in(&self, view: &CacheView) -> Result<()> {
        let mut errors = ErrorCollector::new();
        errors.ensure(
            !(view.eviction.is_exception_based() && !view.transactional),
            "memory",
            Violation::ExceptionEvictionRequiresTransactions,
        );
        errors.into_result()
    }
}

impl Builder for MemoryConfigurationBuilder {
    type Target = MemoryConfiguration;

    fn validate(&self) -> Result<()> {
        let mut errors = ErrorCollector::new();
        check_bounds(
            &mut errors,
            *self.attributes.get(&MAX_COUNT),
            self.attributes.get(&MAX_SIZE).as_deref(),
        );
        let strategy = self.effective_strategy();
        errors.ensure(
            !strategy.is_enabled() || self.has_bound(),
            "memory",
            Violation::EvictionWithoutBound { strategy },
        );
        errors.into_result()
    }

    fn create(mut self) -> MemoryConfiguration {
        let strategy = self.effective_strategy();
        if strategy != *self.attributes.get(&WHEN_FULL) {
            self.attributes.write(&WHEN_FULL, strategy);
        }
        MemoryConfiguration::new(self.attributes.protect())
    }

    fn read(&mut self, template: &MemoryConfiguration, policy: CombinePolicy) -> Result<()> {
        self.attributes.read(&template.attributes, policy)
    }
}

/// Frozen memory settings.
#[derive(Debug, PartialEq)]
pub struct MemoryConfiguration {
    attributes: AttributeSet,
}

impl MemoryConfiguration {
    pub(crate) fn attribute_set() -> AttributeSet {
        AttributeSet::new("memory", &[&MAX_COUNT, &MAX_SIZE, &STORAGE, &WHEN_FULL])
    }

    fn new(attributes: AttributeSet) -> Self {
        debug_assert!(attributes.check_protection().is_ok());
        Self { attributes }
    }

    /// Entry count bound, if any.
    pub fn max_count(&self) -> Option<u64> {
        *self.attributes.get(&MAX_COUNT)
    }

    /// Memory bound as configured, if any.
    pub fn max_size(&self) -> Option<&str> {
        self.attributes.get(&MAX_SIZE).as_deref()
    }

    /// Memory bound in bytes, if one is configured and well formed.
    pub fn max_size_bytes(&self) -> Option<u64> {
        self.max_size().and_then(|size| parse_byte_quantity(size).ok())
    }

    /// Where entries are stored.
    pub fn storage(&self) -> StorageType {
        *self.attributes.get(&STORAGE)
    }

    /// What happens when the bound is reached.
    pub fn when_full(&self) -> EvictionStrategy {
        *self.attributes.get(&WHEN_FULL)
    }

    /// Whether the cache is bounded.
    pub fn is_eviction_enabled(&self) -> bool {
        self.when_full().is_enabled()
    }

    /// Changes the count bound of a running cache.
    ///
    /// The same bound rules as the build apply. A cache frozen with
    /// `when-full` set to `None` cannot be bounded, since the strategy is
    /// immutable.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`](crate::ConfigError::Invalid) naming the broken
    /// rule, e.g. [`Violation::NonPositive`] or [`Violation::EvictionBoundTooLarge`].
    pub fn set_max_count(&mut self, count: u64) -> Result<()> {
        self.check_runtime_bounds(Some(count), self.max_size())?;
        self.attributes.set(&MAX_COUNT, Some(count))
    }

    /// Changes the size bound of a running cache.
    ///
    /// # Errors
    ///
    /// As [`set_max_count`](Self::set_max_count), plus
    /// [`Violation::InvalidByteQuantity`] for malformed sizes.
    pub fn set_max_size(&mut self, size: &str) -> Result<()> {
        self.check_runtime_bounds(self.max_count(), Some(size))?;
        self.attributes.set(&MAX_SIZE, Some(size.to_string()))
    }

    fn check_runtime_bounds(&self, count: Option<u64>, size: Option<&str>) -> Result<()> {
        let mut errors = ErrorCollector::new();
        check_bounds(&mut errors, count, size);
        let strategy = self.when_full();
        errors.ensure(
            strategy != EvictionStrategy::None,
            "memory",
            Violation::BoundWithoutEviction { strategy },
        );
        errors.into_result()
    }
}

impl ConfigurationElement for MemoryConfiguration {
    fn element_name(&self) -> String {
        "memory".to_string()
    }

    fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::clustering::CacheMode;
    use crate::error::ConfigError;

    fn make_builder() -> MemoryConfigurationBuilder {
        MemoryConfigurationBuilder::new(&ChangeTracker::new())
    }

    #[test]
    fn test_parse_byte_quantity() {
        assert_eq!(parse_byte_quantity("1024"), Ok(1024));
        assert_eq!(parse_byte_quantity("1.5 GB"), Ok(1_500_000_000));
        assert_eq!(parse_byte_quantity("64mb"), Ok(64_000_000));
        assert_eq!(parse_byte_quantity(" 2 GiB "), Ok(2 * 1024 * 1024 * 1024));
        assert_eq!(parse_byte_quantity("0.5KiB"), Ok(512));
        for bad in ["", "GB", "1.", ".5 GB", "1.5.2 GB", "12 parsecs", "-1"] {
            assert!(parse_byte_quantity(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_defaults_are_unbounded() {
        let builder = make_builder();
        assert!(builder.validate().is_ok());
        let config = builder.create();
        assert_eq!(config.max_count(), None);
        assert_eq!(config.when_full(), EvictionStrategy::None);
        assert_eq!(config.storage(), StorageType::Heap);
        assert!(!config.is_eviction_enabled());
    }

    #[test]
    fn test_bound_implies_remove() {
        let mut builder = make_builder();
        builder.max_count(1000);
        assert!(builder.validate().is_ok());
        let config = builder.create();
        assert_eq!(config.when_full(), EvictionStrategy::Remove);
        assert_eq!(config.max_count(), Some(1000));
    }

    #[test]
    fn test_explicit_manual_is_kept() {
        let mut builder = make_builder();
        builder.max_count(10).when_full(EvictionStrategy::Manual);
        assert_eq!(builder.create().when_full(), EvictionStrategy::Manual);
    }

    #[test]
    fn test_size_bound_in_bytes() {
        let mut builder = make_builder();
        builder.max_size("1.5 GB");
        let config = builder.create();
        assert_eq!(config.max_size(), Some("1.5 GB"));
        assert_eq!(config.max_size_bytes(), Some(1_500_000_000));
    }

    #[test]
    fn test_bounds_are_exclusive() {
        let mut builder = make_builder();
        builder.max_count(10).max_size("10 MB");
        assert_eq!(
            builder.validate().unwrap_err(),
            ConfigError::invalid("memory", Violation::ConflictingEvictionBounds)
        );
    }

    #[test]
    fn test_strategy_without_bound() {
        let mut builder = make_builder();
        builder.when_full(EvictionStrategy::Remove);
        assert_eq!(
            builder.validate().unwrap_err().violations(),
            vec![&Violation::EvictionWithoutBound {
                strategy: EvictionStrategy::Remove
            }]
        );
    }

    #[test]
    fn test_bound_ceiling_and_zero() {
        let mut builder = make_builder();
        builder.max_count(MAX_EVICTION_BOUND + 1);
        assert!(matches!(
            builder.validate().unwrap_err(),
            ConfigError::Invalid {
                violation: Violation::EvictionBoundTooLarge { .. },
                ..
            }
        ));

        let mut builder = make_builder();
        builder.max_count(0);
        assert!(builder.validate().is_err());
    }

    #[test]
    fn test_malformed_size() {
        let mut builder = make_builder();
        builder.max_size("a lot");
        assert!(matches!(
            builder.validate().unwrap_err().violations()[0],
            Violation::InvalidByteQuantity { .. }
        ));
    }

    #[test]
    fn test_exception_requires_transactions() {
        let builder = make_builder();
        let view = CacheView {
            cache_mode: CacheMode::Local,
            transactional: false,
            eviction: EvictionStrategy::Exception,
        };
        assert!(builder.validate_in(&view).is_err());
        let view = CacheView {
            transactional: true,
            ..view
        };
        assert!(builder.validate_in(&view).is_ok());
    }

    #[test]
    fn test_runtime_bound_changes() {
        let mut builder = make_builder();
        builder.max_count(100);
        let mut config = builder.create();

        config.set_max_count(200).unwrap();
        assert_eq!(config.max_count(), Some(200));
        assert!(config.set_max_count(0).is_err());
        assert!(config.set_max_size("1 GB").is_err());
        assert_eq!(config.max_count(), Some(200));
    }

    #[test]
    fn test_runtime_bounds_follow_build_rules() {
        let mut builder = make_builder();
        builder.max_size("1 GB");
        let mut config = builder.create();

        assert_eq!(
            config.set_max_size("0").unwrap_err().violations(),
            vec![&Violation::NonPositive { attribute: "max-size" }]
        );
        assert!(config.set_max_size("64 TiB").is_ok());
        assert!(matches!(
            config.set_max_size("2048 TiB").unwrap_err().violations()[0],
            Violation::EvictionBoundTooLarge { .. }
        ));
        assert_eq!(config.max_size(), Some("64 TiB"));

        let mut builder = make_builder();
        builder.max_count(10);
        let mut config = builder.create();
        assert!(matches!(
            config.set_max_count(MAX_EVICTION_BOUND + 1).unwrap_err().violations()[0],
            Violation::EvictionBoundTooLarge { .. }
        ));
        assert_eq!(config.max_count(), Some(10));
    }

    #[test]
    fn test_unbounded_cache_stays_unbounded() {
        let mut config = make_builder().create();
        assert_eq!(
            config.set_max_count(100).unwrap_err(),
            ConfigError::invalid(
                "memory",
                Violation::BoundWithoutEviction {
                    strategy: EvictionStrategy::None
                }
            )
        );
        assert!(config.set_max_size("1 MB").is_err());
        assert_eq!(config.max_count(), None);
        assert_eq!(config.max_size(), None);
        assert_eq!(config.when_full(), EvictionStrategy::None);

        let mut builder = make_builder();
        builder.when_full(EvictionStrategy::Manual);
        let mut config = builder.create();
        assert!(config.set_max_count(100).is_ok());
    }
}
