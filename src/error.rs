//! Configuration Errors
//!
//! Every fallible operation in this crate returns [`ConfigError`]. The enum
//! separates lifecycle bugs (writing to a frozen attribute, asking a set for
//! an attribute it does not have) from data errors (a builder tree that
//! violates one of the validation rules).
//!
//! Validation failures carry a [`Violation`] naming the exact rule that was
//! broken, together with the element it was detected on, so callers can
//! match on the failure kind instead of parsing messages:
//!
//! ```
//! use cache_config::{ConfigError, ConfigurationBuilder, Violation};
//!
//! let mut builder = ConfigurationBuilder::new();
//! builder.persistence().add_store("jdbc").shared(true);
//!
//! let error = builder.build().unwrap_err();
//! assert!(error
//!     .violations()
//!     .iter()
//!     .any(|v| matches!(v, Violation::SharedStoreRequiresClusteredCache { .. })));
//! ```
//!
//! Validation collects every failure of a build before reporting; more than
//! one failure is returned as [`ConfigError::Multiple`].

use crate::config::clustering::CacheMode;
use crate::config::memory::EvictionStrategy;
use crate::config::sites::BackupFailurePolicy;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, ConfigError>;

/// Errors produced by attribute sets, builders and the registry.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// An immutable attribute was written after its set was protected.
    #[error("attribute '{attribute}' of '{owner}' is protected and cannot be modified")]
    ProtectionViolation {
        /// Owner tag of the attribute set.
        owner: &'static str,
        /// Name of the attribute.
        attribute: &'static str,
    },

    /// An attribute was addressed that is not part of the set's schema.
    #[error("'{owner}' has no attribute named '{attribute}' of the requested type")]
    UnknownAttribute {
        /// Owner tag of the attribute set.
        owner: &'static str,
        /// Name that was looked up.
        attribute: String,
    },

    /// A configuration node was built from an attribute set that is still mutable.
    #[error("attribute set '{owner}' is not protected")]
    IllegalState {
        /// Owner tag of the attribute set.
        owner: &'static str,
    },

    /// A builder violates a rule that only depends on the cache configuration itself.
    #[error("invalid configuration for '{element}': {violation}")]
    Invalid {
        /// Element the rule was checked on (e.g. `persistence.store[jdbc]`).
        element: String,
        /// The rule that was broken.
        violation: Violation,
    },

    /// A builder violates a rule that depends on the global configuration.
    #[error("invalid configuration for '{element}' in the global scope: {violation}")]
    InvalidGlobal {
        /// Element the rule was checked on.
        element: String,
        /// The rule that was broken.
        violation: Violation,
    },

    /// Two attributes could not be combined while reading a template.
    #[error("cannot combine attribute '{attribute}' of '{owner}': {reason}")]
    MergeConflict {
        /// Owner tag of the destination set.
        owner: &'static str,
        /// Name of the attribute.
        attribute: &'static str,
        /// Why the values could not be reconciled.
        reason: String,
    },

    /// Several validation failures collected from one build.
    #[error("{} configuration errors: {}", .0.len(), join(.0))]
    Multiple(Vec<ConfigError>),

    /// A registry already holds a configuration under this name.
    #[error("configuration '{0}' is already defined")]
    AlreadyDefined(String),

    /// A registry has no configuration under the requested template name.
    #[error("template '{0}' is not defined")]
    UndefinedTemplate(String),
}

impl ConfigError {
    /// Builds a local validation error for `element`.
    pub fn invalid(element: impl Into<String>, violation: Violation) -> Self {
        ConfigError::Invalid {
            element: element.into(),
            violation,
        }
    }

    /// Builds a global validation error for `element`.
    pub fn invalid_global(element: impl Into<String>, violation: Violation) -> Self {
        ConfigError::InvalidGlobal {
            element: element.into(),
            violation,
        }
    }

    /// Returns every validation rule broken by this error, flattening
    /// [`ConfigError::Multiple`]. Lifecycle errors yield an empty list.
    pub fn violations(&self) -> Vec<&Violation> {
        match self {
            ConfigError::Invalid { violation, .. }
            | ConfigError::InvalidGlobal { violation, .. } => vec![violation],
            ConfigError::Multiple(errors) => errors.iter().flat_map(|e| e.violations()).collect(),
            _ => Vec::new(),
        }
    }

    /// Returns `true` if this error (or every error it collects) came from
    /// the global validation pass.
    pub fn is_global(&self) -> bool {
        match self {
            ConfigError::InvalidGlobal { .. } => true,
            ConfigError::Multiple(errors) => errors.iter().all(ConfigError::is_global),
            _ => false,
        }
    }
}

fn join(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A validation rule that a builder tree broke.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Violation {
    /// A numeric attribute must be strictly positive.
    #[error("'{attribute}' must be strictly positive")]
    NonPositive {
        /// Attribute name.
        attribute: &'static str,
    },

    /// A required attribute has no value.
    #[error("'{attribute}' is required")]
    Missing {
        /// Attribute name.
        attribute: &'static str,
    },

    /// Two repeated elements share the same identity.
    #[error("'{name}' is declared more than once")]
    DuplicateElement {
        /// The duplicated identity.
        name: String,
    },

    /// A read-only store is combined with an attribute that writes to it.
    #[error("a read-only store cannot be configured with '{attribute}'")]
    ReadOnlyStore {
        /// The conflicting attribute.
        attribute: &'static str,
    },

    /// A store is both read-only and write-only.
    #[error("a store cannot be both read-only and write-only")]
    ReadOnlyAndWriteOnly,

    /// A write-only store cannot preload entries.
    #[error("a write-only store cannot preload")]
    WriteOnlyPreload,

    /// A shared store is also a singleton store.
    #[error("a shared store cannot also be a singleton store")]
    SharedSingletonStore,

    /// A transactional store is not shared.
    #[error("a transactional store must be shared")]
    TransactionalStoreNotShared,

    /// A transactional store has write-behind enabled.
    #[error("a store with write-behind enabled cannot be transactional")]
    AsyncTransactionalStore,

    /// A transactional store is attached to a non-transactional cache.
    #[error("a transactional store requires a transactional cache")]
    TransactionalStoreRequiresTransactions,

    /// Passivation is enabled together with a shared store.
    #[error("passivation cannot be used with a shared store")]
    PassivationWithSharedStore,

    /// More than one store fetches persistent state.
    #[error("at most one store may fetch persistent state")]
    MultipleFetchStateStores,

    /// A shared store is used with a cache mode that is not clustered.
    #[error("a shared store requires a clustered cache mode, found {mode:?}")]
    SharedStoreRequiresClusteredCache {
        /// The configured cache mode.
        mode: CacheMode,
    },

    /// An eviction strategy is enabled without a count or size bound.
    #[error("eviction strategy {strategy:?} requires a max-count or max-size")]
    EvictionWithoutBound {
        /// The configured strategy.
        strategy: EvictionStrategy,
    },

    /// A running cache without an eviction strategy was given a bound.
    #[error("a running cache with when-full {strategy:?} cannot be bounded")]
    BoundWithoutEviction {
        /// The frozen strategy.
        strategy: EvictionStrategy,
    },

    /// Both a count bound and a size bound are configured.
    #[error("max-count and max-size cannot both be configured")]
    ConflictingEvictionBounds,

    /// An eviction bound exceeds the supported ceiling.
    #[error("eviction bound {bound} exceeds the maximum of {max}")]
    EvictionBoundTooLarge {
        /// The configured bound.
        bound: u64,
        /// The ceiling.
        max: u64,
    },

    /// A byte quantity string could not be parsed.
    #[error("'{value}' is not a valid byte quantity")]
    InvalidByteQuantity {
        /// The rejected text.
        value: String,
    },

    /// Exception-based eviction is used in a non-transactional cache.
    #[error("exception-based eviction requires a transactional cache")]
    ExceptionEvictionRequiresTransactions,

    /// L1 is enabled outside of a distributed cache mode.
    #[error("L1 is only valid in distributed cache modes, found {mode:?}")]
    L1RequiresDistribution {
        /// The configured cache mode.
        mode: CacheMode,
    },

    /// L1 is enabled together with exception-based eviction.
    #[error("L1 cannot be used with exception-based eviction")]
    L1WithExceptionEviction,

    /// Partition handling other than the default is used in invalidation mode.
    #[error("partition handling cannot be customised in invalidation mode")]
    PartitionHandlingInInvalidation,

    /// The capacity factor is negative or not finite.
    #[error("capacity-factor must be a finite, non-negative number")]
    InvalidCapacityFactor,

    /// A custom backup failure policy has no policy class.
    #[error("failure policy CUSTOM requires a failure-policy-class")]
    CustomFailurePolicyWithoutClass,

    /// A non-custom backup failure policy has a policy class.
    #[error("failure policy {policy:?} does not accept a failure-policy-class")]
    FailurePolicyClassNotAllowed {
        /// The configured policy.
        policy: BackupFailurePolicy,
    },

    /// Failure policy FAIL is used with an asynchronous backup.
    #[error("failure policy FAIL cannot be used with the ASYNC backup strategy")]
    FailPolicyWithAsyncBackup,

    /// Two-phase commit is requested for an asynchronous backup.
    #[error("two-phase commit requires the SYNC backup strategy")]
    TwoPhaseCommitWithAsyncBackup,

    /// Cross-site backups are configured for a cache that is not clustered.
    #[error("cross-site backups require a clustered cache mode, found {mode:?}")]
    BackupRequiresClusteredCache {
        /// The configured cache mode.
        mode: CacheMode,
    },

    /// A backup targets the site the cache runs in.
    #[error("site '{site}' is the local site and cannot be a backup")]
    BackupToLocalSite {
        /// The backup site.
        site: String,
    },

    /// Backups are configured but the global transport has no site name.
    #[error("cross-site backups require the transport to declare a local site")]
    MissingLocalSite,

    /// Indexing is enabled but no entity is indexed.
    #[error("indexing is enabled but no indexed entities are declared")]
    IndexingWithoutEntities,

    /// An interceptor declares no placement.
    #[error("interceptor '{name}' needs one of position, index, after or before")]
    InterceptorPositionRequired {
        /// Interceptor name.
        name: String,
    },

    /// An interceptor declares more than one placement.
    #[error("interceptor '{name}' declares more than one of position, index, after and before")]
    InterceptorPositionAmbiguous {
        /// Interceptor name.
        name: String,
    },

    /// A simple cache enables a feature it does not support.
    #[error("{feature} is not supported by simple caches")]
    NotSupportedInSimpleCache {
        /// The offending feature.
        feature: &'static str,
    },

    /// A clustered cache mode is used without a global transport.
    #[error("cache mode {mode:?} requires a global transport")]
    MissingTransport {
        /// The configured cache mode.
        mode: CacheMode,
    },

    /// Cache authorization is enabled while global authorization is not.
    #[error("authorization is enabled for the cache but not globally")]
    AuthorizationNotEnabledGlobally,

    /// A cache role is not declared in the global configuration.
    #[error("role '{role}' is not declared in the global authorization")]
    UnknownRole {
        /// The undeclared role.
        role: String,
    },

    /// Global authorization is enabled without any role.
    #[error("authorization is enabled but declares no roles")]
    AuthorizationWithoutRoles,

    /// A site name is configured without a transport.
    #[error("a site name requires the transport to be enabled")]
    SiteRequiresTransport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violations_flatten_multiple() {
        let error = ConfigError::Multiple(vec![
            ConfigError::invalid("memory", Violation::ConflictingEvictionBounds),
            ConfigError::invalid_global(
                "security.authorization",
                Violation::AuthorizationNotEnabledGlobally,
            ),
        ]);
        let violations = error.violations();
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0], &Violation::ConflictingEvictionBounds);
        assert!(!error.is_global());
    }

    #[test]
    fn test_lifecycle_errors_have_no_violations() {
        let error = ConfigError::ProtectionViolation {
            owner: "memory",
            attribute: "storage",
        };
        assert!(error.violations().is_empty());
        assert_eq!(
            error.to_string(),
            "attribute 'storage' of 'memory' is protected and cannot be modified"
        );
    }

    #[test]
    fn test_multiple_display_joins_messages() {
        let error = ConfigError::Multiple(vec![
            ConfigError::invalid("a", Violation::ReadOnlyAndWriteOnly),
            ConfigError::invalid("b", Violation::WriteOnlyPreload),
        ]);
        let message = error.to_string();
        assert!(message.starts_with("2 configuration errors"));
        assert!(message.contains("invalid configuration for 'a'"));
        assert!(message.contains("invalid configuration for 'b'"));
    }

    #[test]
    fn test_global_errors_are_flagged() {
        let error = ConfigError::invalid_global("sites", Violation::MissingLocalSite);
        assert!(error.is_global());
        assert!(error.to_string().contains("global scope"));
    }
}
