//! Attribute Engine Tests
//!
//! Exercises the attribute engine through its public API: definitions,
//! sets, protection and template reads, independent of any concrete cache
//! element.
//!
//! ## Test Strategy
//! - A small private schema of scalar, optional and collection attributes
//! - Freeze finality checked for both immutable and mutable attributes
//! - Read semantics checked for each combination in the policy table

use cache_config::attributes::{AnyAttribute, AttributeListener};
use cache_config::{AttributeDefinition, AttributeSet, ChangeTracker, CombinePolicy, ConfigError};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

static OWNERS: AttributeDefinition<u32> = AttributeDefinition::new("owners", 2).immutable();
static TIMEOUT: AttributeDefinition<Duration> =
    AttributeDefinition::new("timeout", Duration::from_secs(15));
static SITE: AttributeDefinition<Option<String>> =
    AttributeDefinition::new("site", None).immutable();
static ROLES: AttributeDefinition<BTreeSet<String>> =
    AttributeDefinition::new("roles", BTreeSet::new()).immutable();
static LIMIT: AttributeDefinition<u64> =
    AttributeDefinition::new("limit", 10).with_merge(keep_larger);

fn keep_larger(current: &mut u64, template: &u64) {
    *current = (*current).max(*template);
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Helper to create a fresh, unprotected set of the test schema
fn make_set() -> AttributeSet {
    AttributeSet::new("test", &[&OWNERS, &TIMEOUT, &SITE, &ROLES, &LIMIT])
}

/// Helper to build a role set from string slices
fn roles(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|n| n.to_string()).collect()
}

/// Listener recording every change it is told about
#[derive(Default)]
struct Recorder {
    changes: Mutex<Vec<String>>,
}

impl AttributeListener for Recorder {
    fn attribute_changed(&self, attribute: &dyn AnyAttribute, old_value: &dyn fmt::Debug) {
        self.changes
            .lock()
            .push(format!("{}: {:?} -> {}", attribute.name(), old_value, attribute.describe()));
    }
}

// ============================================================================
// DEFAULTS AND WRITES
// ============================================================================

#[test]
fn test_defaults_are_unmodified() {
    let set = make_set();
    assert_eq!(*set.get(&OWNERS), 2);
    assert_eq!(*set.get(&SITE), None);
    assert!(set.attribute(&SITE).is_null());
    assert!(!set.is_modified());
    assert!(!set.is_protected());
}

#[test]
fn test_write_marks_modified_even_for_default_value() {
    let mut set = make_set();
    set.set(&OWNERS, 2).unwrap();
    assert!(set.is_modified_attr(&OWNERS));
    assert!(!set.is_modified_attr(&TIMEOUT));
}

#[test]
fn test_reset_restores_default() {
    let mut set = make_set();
    set.set(&OWNERS, 5).unwrap();
    set.attribute_mut(&OWNERS).reset().unwrap();
    assert_eq!(*set.get(&OWNERS), 2);
    assert!(!set.is_modified_attr(&OWNERS));
}

#[test]
fn test_unknown_attribute() {
    static OTHER: AttributeDefinition<u32> = AttributeDefinition::new("other", 0);
    let set = make_set();
    assert!(matches!(
        set.try_attribute(&OTHER),
        Err(ConfigError::UnknownAttribute { owner: "test", .. })
    ));
    assert!(set.try_attribute_by_name("missing").is_err());
    assert_eq!(set.try_attribute_by_name("owners").unwrap().describe(), "2");
}

// ============================================================================
// FREEZE FINALITY
// ============================================================================

#[test]
fn test_protected_immutable_rejects_writes() {
    let mut set = make_set();
    set.set(&OWNERS, 3).unwrap();
    let mut set = set.protect();

    assert_eq!(
        set.set(&OWNERS, 4).unwrap_err(),
        ConfigError::ProtectionViolation {
            owner: "test",
            attribute: "owners"
        }
    );
    assert!(set.attribute_mut(&OWNERS).reset().is_err());
    assert_eq!(*set.get(&OWNERS), 3);
}

#[test]
fn test_protected_mutable_accepts_writes() {
    let mut set = make_set().protect();
    set.set(&TIMEOUT, Duration::from_secs(1)).unwrap();
    assert_eq!(*set.get(&TIMEOUT), Duration::from_secs(1));
    assert!(set.check_protection().is_ok());
}

#[test]
fn test_protect_is_idempotent() {
    let first = make_set().protect();
    let second = make_set().protect().protect();
    assert_eq!(first, second);
    assert!(second.is_protected());
}

#[test]
fn test_unprotected_set_fails_state_check() {
    assert_eq!(
        make_set().check_protection().unwrap_err(),
        ConfigError::IllegalState { owner: "test" }
    );
}

// ============================================================================
// TEMPLATE READS
// ============================================================================

#[test]
fn test_override_takes_written_template_values_only() {
    let mut template = make_set();
    template.set(&OWNERS, 4).unwrap();
    let template = template.protect();

    let mut set = make_set();
    set.set(&OWNERS, 1).unwrap();
    set.set(&TIMEOUT, Duration::from_secs(3)).unwrap();
    set.read(&template, CombinePolicy::Override).unwrap();

    assert_eq!(*set.get(&OWNERS), 4);
    assert_eq!(*set.get(&TIMEOUT), Duration::from_secs(3));
}

#[test]
fn test_override_read_is_idempotent() {
    let mut template = make_set();
    template.set(&SITE, Some("LON".to_string())).unwrap();
    template.set(&ROLES, roles(&["a"])).unwrap();
    let template = template.protect();

    let mut once = make_set();
    once.read(&template, CombinePolicy::Override).unwrap();
    let mut twice = make_set();
    twice.read(&template, CombinePolicy::Override).unwrap();
    twice.read(&template, CombinePolicy::Override).unwrap();

    assert_eq!(once, twice);
}

#[test]
fn test_combine_keeps_explicit_scalars_and_unions_collections() {
    let mut template = make_set();
    template.set(&OWNERS, 4).unwrap();
    template.set(&ROLES, roles(&["A", "B"])).unwrap();
    let template = template.protect();

    let mut set = make_set();
    set.set(&OWNERS, 1).unwrap();
    set.set(&ROLES, roles(&["B", "C"])).unwrap();
    set.read(&template, CombinePolicy::Combine).unwrap();

    assert_eq!(*set.get(&OWNERS), 1);
    assert_eq!(*set.get(&ROLES), roles(&["A", "B", "C"]));
}

#[test]
fn test_combine_fills_unmodified_destination() {
    let mut template = make_set();
    template.set(&OWNERS, 4).unwrap();
    let template = template.protect();

    let mut set = make_set();
    set.read(&template, CombinePolicy::Combine).unwrap();
    assert_eq!(*set.get(&OWNERS), 4);
    assert!(set.is_modified_attr(&OWNERS));
}

#[test]
fn test_combine_uses_custom_merge() {
    let mut template = make_set();
    template.set(&LIMIT, 50).unwrap();
    let template = template.protect();

    let mut set = make_set();
    set.set(&LIMIT, 20).unwrap();
    set.read(&template, CombinePolicy::Combine).unwrap();
    assert_eq!(*set.get(&LIMIT), 50);
}

#[test]
fn test_read_into_protected_immutable_fails() {
    let mut template = make_set();
    template.set(&OWNERS, 4).unwrap();
    let template = template.protect();

    let mut frozen = make_set().protect();
    assert!(matches!(
        frozen.read(&template, CombinePolicy::Override),
        Err(ConfigError::ProtectionViolation { attribute: "owners", .. })
    ));
}

#[test]
fn test_failed_read_leaves_set_untouched() {
    let mut template = make_set();
    template.set(&TIMEOUT, Duration::from_secs(1)).unwrap();
    template.set(&SITE, Some("NYC".to_string())).unwrap();
    let template = template.protect();

    let mut frozen = make_set().protect();
    assert!(matches!(
        frozen.read(&template, CombinePolicy::Combine),
        Err(ConfigError::ProtectionViolation { attribute: "site", .. })
    ));
    assert_eq!(*frozen.get(&TIMEOUT), Duration::from_secs(15));
    assert!(!frozen.is_modified());
}

// ============================================================================
// LISTENERS AND TRACKING
// ============================================================================

#[test]
fn test_listeners_see_old_values() {
    let recorder = Arc::new(Recorder::default());
    let mut set = make_set();
    set.add_listener(recorder.clone());

    set.set(&OWNERS, 3).unwrap();
    set.set(&SITE, Some("NYC".to_string())).unwrap();

    assert_eq!(
        *recorder.changes.lock(),
        vec!["owners: 2 -> 3", "site: None -> NYC"]
    );
}

#[test]
fn test_tracker_shared_between_sets() {
    let tracker = ChangeTracker::new();
    let mut first = make_set();
    let mut second = AttributeSet::new("other", &[&OWNERS]);
    tracker.attach(&mut first);
    tracker.attach(&mut second);

    first.set(&TIMEOUT, Duration::from_millis(250)).unwrap();
    second.set(&OWNERS, 7).unwrap();
    tracker.stop();
    first.set(&OWNERS, 9).unwrap();

    assert_eq!(tracker.describe(), vec!["test.timeout=250ms", "other.owners=7"]);
}

#[test]
fn test_display_lists_values() {
    let mut set = AttributeSet::new("hash", &[&OWNERS, &ROLES]);
    set.set(&ROLES, roles(&["x", "y"])).unwrap();
    assert_eq!(set.to_string(), "hash [owners=2, roles=[x, y]]");
}
