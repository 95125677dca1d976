//! Values that can be stored in an attribute cell.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;

/// A type that can be held by an [`Attribute`](super::Attribute).
///
/// Scalars use the provided defaults. Collections set [`REPEATED`](Self::REPEATED)
/// and override [`union`](Self::union) so that `Combine` reads can merge them
/// instead of replacing them.
pub trait AttributeValue: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// `true` for collection values that are unioned under `Combine`.
    const REPEATED: bool = false;

    /// Merges `other` into `self`. Scalars take `other`.
    fn union(&mut self, other: &Self) {
        *self = other.clone();
    }

    /// Whether the value represents "not set".
    fn is_null(&self) -> bool {
        false
    }

    /// Human readable rendering used by diagnostics and the change tracker.
    fn describe(&self) -> String {
        format!("{:?}", self)
    }
}

macro_rules! scalar_values {
    ($($ty:ty),* $(,)?) => {
        $(impl AttributeValue for $ty {})*
    };
}

scalar_values!(bool, u8, u16, u32, u64, usize, i32, i64, f32, f64, Duration);

impl AttributeValue for String {
    fn describe(&self) -> String {
        self.clone()
    }
}

impl AttributeValue for Cow<'static, str> {
    fn describe(&self) -> String {
        self.to_string()
    }
}

impl<T: AttributeValue> AttributeValue for Option<T> {
    fn is_null(&self) -> bool {
        self.is_none()
    }

    fn describe(&self) -> String {
        match self {
            Some(value) => value.describe(),
            None => "null".to_string(),
        }
    }
}

impl<T: AttributeValue> AttributeValue for Vec<T> {
    const REPEATED: bool = true;

    fn union(&mut self, other: &Self) {
        for item in other {
            if !self.contains(item) {
                self.push(item.clone());
            }
        }
    }

    fn describe(&self) -> String {
        let items: Vec<String> = self.iter().map(AttributeValue::describe).collect();
        format!("[{}]", items.join(", "))
    }
}

impl<T: AttributeValue + Ord> AttributeValue for BTreeSet<T> {
    const REPEATED: bool = true;

    fn union(&mut self, other: &Self) {
        self.extend(other.iter().cloned());
    }

    fn describe(&self) -> String {
        let items: Vec<String> = self.iter().map(AttributeValue::describe).collect();
        format!("[{}]", items.join(", "))
    }
}

impl<K, V> AttributeValue for BTreeMap<K, V>
where
    K: AttributeValue + Ord,
    V: AttributeValue,
{
    const REPEATED: bool = true;

    // Keys already present keep their value.
    fn union(&mut self, other: &Self) {
        for (key, value) in other {
            self.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }

    fn describe(&self) -> String {
        let items: Vec<String> = self
            .iter()
            .map(|(k, v)| format!("{}={}", k.describe(), v.describe()))
            .collect();
        format!("{{{}}}", items.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_union_replaces() {
        let mut value = 3u32;
        value.union(&7);
        assert_eq!(value, 7);
        assert!(!u32::REPEATED);
    }

    #[test]
    fn test_vec_union_skips_duplicates() {
        let mut roles = vec!["admin".to_string(), "reader".to_string()];
        roles.union(&vec!["reader".to_string(), "writer".to_string()]);
        assert_eq!(roles, vec!["admin", "reader", "writer"]);
    }

    #[test]
    fn test_map_union_keeps_existing_keys() {
        let mut props = BTreeMap::from([("a".to_string(), "1".to_string())]);
        let other = BTreeMap::from([
            ("a".to_string(), "2".to_string()),
            ("b".to_string(), "3".to_string()),
        ]);
        props.union(&other);
        assert_eq!(props.describe(), "{a=1, b=3}");
    }

    #[test]
    fn test_option_describe_and_null() {
        let none: Option<u64> = None;
        assert!(none.is_null());
        assert_eq!(none.describe(), "null");
        assert_eq!(Some("1 GB".to_string()).describe(), "1 GB");
    }
}
