//! Change Tracking
//!
//! A [`ChangeTracker`] is a passive listener attached to every set of a
//! builder tree. It remembers the latest value written to each attribute,
//! keyed by `owner.name`, so the root builder can log what a caller actually
//! changed when it creates a configuration. It never influences validation.

use super::attribute::{AnyAttribute, AttributeListener};
use super::set::AttributeSet;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct TrackerState {
    suspended: AtomicBool,
    touched: Mutex<Vec<(String, String)>>,
}

struct TrackingListener {
    state: Arc<TrackerState>,
}

impl AttributeListener for TrackingListener {
    fn attribute_changed(&self, attribute: &dyn AnyAttribute, _old_value: &dyn fmt::Debug) {
        if self.state.suspended.load(Ordering::Acquire) {
            return;
        }
        let key = format!("{}.{}", attribute.owner(), attribute.name());
        let value = attribute.describe();
        let mut touched = self.state.touched.lock();
        match touched.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => touched.push((key, value)),
        }
    }
}

/// Records the attributes written through a builder tree.
///
/// Clones share the same record.
#[derive(Clone, Default)]
pub struct ChangeTracker {
    state: Arc<TrackerState>,
}

impl ChangeTracker {
    /// Creates an empty, active tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts observing every cell of `set`.
    pub fn attach(&self, set: &mut AttributeSet) {
        set.add_listener(Arc::new(TrackingListener {
            state: Arc::clone(&self.state),
        }));
    }

    /// Forgets everything recorded and resumes tracking.
    pub fn reset(&self) {
        self.state.touched.lock().clear();
        self.start();
    }

    /// Suspends recording.
    pub fn stop(&self) {
        self.state.suspended.store(true, Ordering::Release);
    }

    /// Resumes recording.
    pub fn start(&self) {
        self.state.suspended.store(false, Ordering::Release);
    }

    /// Whether writes are currently recorded.
    pub fn is_tracking(&self) -> bool {
        !self.state.suspended.load(Ordering::Acquire)
    }

    /// Recorded `(owner.name, value)` pairs in first-write order.
    pub fn touched(&self) -> Vec<(String, String)> {
        self.state.touched.lock().clone()
    }

    /// Recorded changes rendered as `owner.name=value`.
    pub fn describe(&self) -> Vec<String> {
        self.state
            .touched
            .lock()
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.state.touched.lock().is_empty()
    }
}

impl fmt::Debug for ChangeTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeTracker")
            .field("tracking", &self.is_tracking())
            .field("touched", &self.state.touched.lock().len())
            .finish()
    }
}
