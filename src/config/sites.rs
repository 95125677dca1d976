//! Cross-site backup configuration.
//!
//! Each `backup` element names a remote site that receives a copy of every
//! write. Backups need a clustered cache, a local site name declared by the
//! global transport, and must not point back at the local site; the last two
//! are only known in the global validation pass.
//!
//! | Policy | Meaning | Constraint |
//! |--------|---------|------------|
//! | `Ignore` | failures are dropped | no policy class |
//! | `Warn` | failures are logged | no policy class |
//! | `Fail` | failures fail the local write | `SYNC` strategy only |
//! | `Custom` | a user class decides | policy class required |

use crate::attributes::{
    AttributeDefinition, AttributeSet, AttributeValue, ChangeTracker, CombinePolicy,
};
use crate::builder::{Builder, ConfigurationElement, ErrorCollector, GlobalScope};
use crate::config::{read_repeated, CacheView, Identified};
use crate::error::{Result, Violation};
use std::collections::BTreeSet;
use std::time::Duration;

/// How writes are sent to a backup site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BackupStrategy {
    /// The local write waits for the backup site.
    Sync,
    /// The backup is sent in the background.
    #[default]
    Async,
}

impl AttributeValue for BackupStrategy {}

/// What happens when a backup call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BackupFailurePolicy {
    /// Failures are ignored.
    Ignore,
    /// Failures are logged.
    #[default]
    Warn,
    /// Failures are propagated to the caller.
    Fail,
    /// Failures are handed to `failure-policy-class`.
    Custom,
}

impl AttributeValue for BackupFailurePolicy {}

/// `sites.disable-backups`
pub static DISABLE_BACKUPS: AttributeDefinition<bool> =
    AttributeDefinition::new("disable-backups", false).immutable();

/// `backup.site`
pub static SITE: AttributeDefinition<String> =
    AttributeDefinition::new("site", String::new()).immutable();
/// `backup.strategy`
pub static STRATEGY: AttributeDefinition<BackupStrategy> =
    AttributeDefinition::new("strategy", BackupStrategy::Async).immutable();
/// `backup.failure-policy`
pub static FAILURE_POLICY: AttributeDefinition<BackupFailurePolicy> =
    AttributeDefinition::new("failure-policy", BackupFailurePolicy::Warn).immutable();
/// `backup.failure-policy-class`
pub static FAILURE_POLICY_CLASS: AttributeDefinition<Option<String>> =
    AttributeDefinition::new("failure-policy-class", None).immutable();
/// `backup.timeout`
pub static TIMEOUT: AttributeDefinition<Duration> =
    AttributeDefinition::new("timeout", Duration::from_secs(15)).immutable();
/// `backup.two-phase-commit`
pub static TWO_PHASE_COMMIT: AttributeDefinition<bool> =
    AttributeDefinition::new("two-phase-commit", false).immutable();
/// `backup.take-offline-after-failures`, zero disables taking the site offline.
pub static TAKE_OFFLINE_AFTER_FAILURES: AttributeDefinition<u32> =
    AttributeDefinition::new("take-offline-after-failures", 0).immutable();
/// `backup.take-offline-min-wait`
pub static TAKE_OFFLINE_MIN_WAIT: AttributeDefinition<Duration> =
    AttributeDefinition::new("take-offline-min-wait", Duration::ZERO).immutable();

// ============================================================================
// backup
// ============================================================================

/// Builder for one [`BackupConfiguration`].
#[derive(Debug)]
pub struct BackupConfigurationBuilder {
    attributes: AttributeSet,
}

impl BackupConfigurationBuilder {
    fn new(tracker: &ChangeTracker, site: &str) -> Self {
        let mut attributes = BackupConfiguration::attribute_set();
        tracker.attach(&mut attributes);
        attributes.write(&SITE, site.to_string());
        Self { attributes }
    }

    /// The backup site.
    pub fn site(&self) -> &str {
        self.attributes.get(&SITE).as_str()
    }

    /// Whether writes reach the site synchronously.
    pub fn strategy(&mut self, strategy: BackupStrategy) -> &mut Self {
        self.attributes.write(&STRATEGY, strategy);
        self
    }

    /// What happens when the backup call fails.
    pub fn failure_policy(&mut self, policy: BackupFailurePolicy) -> &mut Self {
        self.attributes.write(&FAILURE_POLICY, policy);
        self
    }

    /// Class handling failures under [`BackupFailurePolicy::Custom`].
    pub fn failure_policy_class(&mut self, class: impl Into<String>) -> &mut Self {
        self.attributes.write(&FAILURE_POLICY_CLASS, Some(class.into()));
        self
    }

    /// Timeout for the backup call.
    pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
        self.attributes.write(&TIMEOUT, timeout);
        self
    }

    /// Whether the backup takes part in the prepare phase.
    pub fn two_phase_commit(&mut self, enabled: bool) -> &mut Self {
        self.attributes.write(&TWO_PHASE_COMMIT, enabled);
        self
    }

    /// Consecutive failures after which the site is taken offline.
    pub fn take_offline_after_failures(&mut self, failures: u32) -> &mut Self {
        self.attributes.write(&TAKE_OFFLINE_AFTER_FAILURES, failures);
        self
    }

    /// Minimum time a site keeps failing before it is taken offline.
    pub fn take_offline_min_wait(&mut self, wait: Duration) -> &mut Self {
        self.attributes.write(&TAKE_OFFLINE_MIN_WAIT, wait);
        self
    }

    fn element(&self) -> String {
        format!("sites.backup[{}]", self.site())
    }
}

impl Identified for BackupConfigurationBuilder {
    fn identity(&self) -> &str {
        self.site()
    }
}

impl Builder for BackupConfigurationBuilder {
    type Target = BackupConfiguration;

    fn validate(&self) -> Result<()> {
        let mut errors = ErrorCollector::new();
        let element = self.element();
        let policy = *self.attributes.get(&FAILURE_POLICY);
        let has_class = self.attributes.get(&FAILURE_POLICY_CLASS).is_some();
        let asynchronous = *self.attributes.get(&STRATEGY) == BackupStrategy::Async;

        errors.ensure(!self.site().is_empty(), &element, Violation::Missing { attribute: "site" });
        if policy == BackupFailurePolicy::Custom {
            errors.ensure(has_class, &element, Violation::CustomFailurePolicyWithoutClass);
        } else {
            errors.ensure(!has_class, &element, Violation::FailurePolicyClassNotAllowed { policy });
        }
        errors.ensure(
            !(policy == BackupFailurePolicy::Fail && asynchronous),
            &element,
            Violation::FailPolicyWithAsyncBackup,
        );
        errors.ensure(
            !(*self.attributes.get(&TWO_PHASE_COMMIT) && asynchronous),
            &element,
            Violation::TwoPhaseCommitWithAsyncBackup,
        );
        errors.ensure(
            !self.attributes.get(&TIMEOUT).is_zero(),
            &element,
            Violation::NonPositive { attribute: "timeout" },
        );
        errors.into_result()
    }

    fn validate_global(&self, global: &dyn GlobalScope) -> Result<()> {
        let mut errors = ErrorCollector::new();
        if let Some(local) = global.local_site() {
            errors.ensure_global(
                self.site() != local,
                &self.element(),
                Violation::BackupToLocalSite {
                    site: self.site().to_string(),
                },
            );
        }
        errors.into_result()
    }

    fn create(self) -> BackupConfiguration {
        BackupConfiguration::new(self.attributes.protect())
    }

    fn read(&mut self, template: &BackupConfiguration, policy: CombinePolicy) -> Result<()> {
        self.attributes.read(&template.attributes, policy)
    }
}

/// One frozen backup site.
#[derive(Debug, PartialEq)]
pub struct BackupConfiguration {
    attributes: AttributeSet,
}

impl BackupConfiguration {
    pub(crate) fn attribute_set() -> AttributeSet {
        AttributeSet::new(
            "sites.backup",
            &[
                &SITE,
                &STRATEGY,
                &FAILURE_POLICY,
                &FAILURE_POLICY_CLASS,
                &TIMEOUT,
                &TWO_PHASE_COMMIT,
                &TAKE_OFFLINE_AFTER_FAILURES,
                &TAKE_OFFLINE_MIN_WAIT,
            ],
        )
    }

    fn new(attributes: AttributeSet) -> Self {
        debug_assert!(attributes.check_protection().is_ok());
        Self { attributes }
    }

    /// The backup site.
    pub fn site(&self) -> &str {
        self.attributes.get(&SITE).as_str()
    }

    /// Replication strategy.
    pub fn strategy(&self) -> BackupStrategy {
        *self.attributes.get(&STRATEGY)
    }

    /// Failure policy.
    pub fn failure_policy(&self) -> BackupFailurePolicy {
        *self.attributes.get(&FAILURE_POLICY)
    }

    /// Custom failure policy class, if any.
    pub fn failure_policy_class(&self) -> Option<&str> {
        self.attributes.get(&FAILURE_POLICY_CLASS).as_deref()
    }

    /// Timeout for the backup call.
    pub fn timeout(&self) -> Duration {
        *self.attributes.get(&TIMEOUT)
    }

    /// Whether the backup takes part in the prepare phase.
    pub fn two_phase_commit(&self) -> bool {
        *self.attributes.get(&TWO_PHASE_COMMIT)
    }

    /// Failures before the site is taken offline; zero never does.
    pub fn take_offline_after_failures(&self) -> u32 {
        *self.attributes.get(&TAKE_OFFLINE_AFTER_FAILURES)
    }

    /// Minimum wait before the site is taken offline.
    pub fn take_offline_min_wait(&self) -> Duration {
        *self.attributes.get(&TAKE_OFFLINE_MIN_WAIT)
    }
}

impl Identified for BackupConfiguration {
    fn identity(&self) -> &str {
        self.site()
    }
}

impl ConfigurationElement for BackupConfiguration {
    fn element_name(&self) -> String {
        format!("backup[{}]", self.site())
    }

    fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }
}

// ============================================================================
// sites
// ============================================================================

/// Builder for [`SitesConfiguration`].
#[derive(Debug)]
pub struct SitesConfigurationBuilder {
    attributes: AttributeSet,
    backups: Vec<BackupConfigurationBuilder>,
    tracker: ChangeTracker,
}

impl SitesConfigurationBuilder {
    pub(crate) fn new(tracker: &ChangeTracker) -> Self {
        let mut attributes = SitesConfiguration::attribute_set();
        tracker.attach(&mut attributes);
        Self {
            attributes,
            backups: Vec::new(),
            tracker: tracker.clone(),
        }
    }

    /// Keeps the declared backups but stops sending to them.
    pub fn disable_backups(&mut self, disable: bool) -> &mut Self {
        self.attributes.write(&DISABLE_BACKUPS, disable);
        self
    }

    /// Declares a backup to `site`.
    pub fn add_backup(&mut self, site: &str) -> &mut BackupConfigurationBuilder {
        self.backups.push(BackupConfigurationBuilder::new(&self.tracker, site));
        let last = self.backups.len() - 1;
        &mut self.backups[last]
    }

    /// The backup to `site`, if declared.
    pub fn backup(&mut self, site: &str) -> Option<&mut BackupConfigurationBuilder> {
        self.backups.iter_mut().find(|b| b.site() == site)
    }

    pub(crate) fn has_active_backups(&self) -> bool {
        !self.backups.is_empty() && !*self.attributes.get(&DISABLE_BACKUPS)
    }

    pub(crate) fn validate_in(&self, view: &CacheView) -> Result<()> {
        let mut errors = ErrorCollector::new();
        errors.ensure(
            !self.has_active_backups() || view.cache_mode.is_clustered(),
            "sites",
            Violation::BackupRequiresClusteredCache { mode: view.cache_mode },
        );
        errors.into_result()
    }
}

impl Builder for SitesConfigurationBuilder {
    type Target = SitesConfiguration;

    fn validate(&self) -> Result<()> {
        let mut errors = ErrorCollector::new();
        let mut sites = BTreeSet::new();
        for backup in &self.backups {
            errors.check(backup.validate());
            if !sites.insert(backup.site()) {
                errors.ensure(
                    false,
                    "sites",
                    Violation::DuplicateElement {
                        name: backup.site().to_string(),
                    },
                );
            }
        }
        errors.into_result()
    }

    fn validate_global(&self, global: &dyn GlobalScope) -> Result<()> {
        let mut errors = ErrorCollector::new();
        if self.has_active_backups() {
            errors.ensure_global(
                global.local_site().is_some(),
                "sites",
                Violation::MissingLocalSite,
            );
            for backup in &self.backups {
                errors.check(backup.validate_global(global));
            }
        }
        errors.into_result()
    }

    fn create(self) -> SitesConfiguration {
        SitesConfiguration::new(
            self.attributes.protect(),
            self.backups.into_iter().map(Builder::create).collect(),
        )
    }

    fn read(&mut self, template: &SitesConfiguration, policy: CombinePolicy) -> Result<()> {
        self.attributes.read(&template.attributes, policy)?;
        let tracker = self.tracker.clone();
        read_repeated(&mut self.backups, &template.backups, policy, |site| {
            BackupConfigurationBuilder::new(&tracker, site)
        })
    }
}

/// Frozen cross-site settings.
#[derive(Debug, PartialEq)]
pub struct SitesConfiguration {
    attributes: AttributeSet,
    backups: Vec<BackupConfiguration>,
}

impl SitesConfiguration {
    pub(crate) fn attribute_set() -> AttributeSet {
        AttributeSet::new("sites", &[&DISABLE_BACKUPS])
    }

    fn new(attributes: AttributeSet, backups: Vec<BackupConfiguration>) -> Self {
        debug_assert!(attributes.check_protection().is_ok());
        Self { attributes, backups }
    }

    /// Whether every backup is switched off.
    pub fn disable_backups(&self) -> bool {
        *self.attributes.get(&DISABLE_BACKUPS)
    }

    /// Declared backups, in order.
    pub fn backups(&self) -> &[BackupConfiguration] {
        &self.backups
    }

    /// Whether writes are sent to at least one site.
    pub fn has_backups(&self) -> bool {
        !self.backups.is_empty() && !self.disable_backups()
    }

    /// Backups using [`BackupStrategy::Sync`].
    pub fn sync_backups(&self) -> impl Iterator<Item = &BackupConfiguration> + '_ {
        self.backups.iter().filter(|b| b.strategy() == BackupStrategy::Sync)
    }
}

impl ConfigurationElement for SitesConfiguration {
    fn element_name(&self) -> String {
        "sites".to_string()
    }

    fn attributes(&self) -> &AttributeSet {
        &self.attributes
    }

    fn children(&self) -> Vec<&dyn ConfigurationElement> {
        self.backups.iter().map(|b| b as &dyn ConfigurationElement).collect()
    }
}
