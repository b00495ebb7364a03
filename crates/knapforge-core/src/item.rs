//! Knapsack items and the efficiency order.

use std::cmp::Ordering;

/// A single knapsack item.
///
/// Items never change once created. An [`Instance`](crate::Instance) moves
/// them between positions but the `id` always names the caller's original
/// index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Item {
    /// Index of the item in the caller's item list.
    pub id: usize,
    pub weight: i64,
    pub profit: i64,
}

impl Item {
    /// Creates a new item.
    pub fn new(id: usize, weight: i64, profit: i64) -> Self {
        Self { id, weight, profit }
    }

    /// Compares profit-per-weight ratios by cross multiplication.
    ///
    /// Both items must have a positive weight.
    pub fn cmp_efficiency(&self, other: &Item) -> Ordering {
        debug_assert!(self.weight > 0 && other.weight > 0);
        let lhs = self.profit as i128 * other.weight as i128;
        let rhs = other.profit as i128 * self.weight as i128;
        lhs.cmp(&rhs)
    }

    /// Sort key placing the most efficient items first.
    pub fn by_decreasing_efficiency(a: &Item, b: &Item) -> Ordering {
        b.cmp_efficiency(a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_efficiency_comparison() {
        let dense = Item::new(0, 6, 7);
        let sparse = Item::new(1, 5, 5);
        assert_eq!(dense.cmp_efficiency(&sparse), Ordering::Greater);
        assert_eq!(sparse.cmp_efficiency(&dense), Ordering::Less);
        assert_eq!(
            Item::new(2, 2, 4).cmp_efficiency(&Item::new(3, 3, 6)),
            Ordering::Equal
        );
    }

    #[test]
    fn test_decreasing_sort() {
        let mut items = vec![
            Item::new(0, 10, 5),
            Item::new(1, 10, 20),
            Item::new(2, 10, 12),
        ];
        items.sort_by(Item::by_decreasing_efficiency);
        let ids: Vec<usize> = items.iter().map(|item| item.id).collect();
        assert_eq!(ids, vec![1, 2, 0]);
    }

    #[test]
    fn test_large_values_do_not_overflow() {
        let a = Item::new(0, i64::MAX, i64::MAX - 1);
        let b = Item::new(1, i64::MAX - 1, i64::MAX);
        assert_eq!(a.cmp_efficiency(&b), Ordering::Less);
    }
}
