//! Greedy starting solution.

use std::cmp::Ordering;

use fixedbitset::FixedBitSet;
use knapforge_core::{Instance, Item};

/// Greedy by decreasing efficiency, continuing past the first item that
/// does not fit, compared against the most profitable single item.
///
/// Returns the profit and the solution indexed by item id. Runs in
/// O(n log n) over all items, fixed or not.
pub fn greedy(instance: &Instance) -> (i64, FixedBitSet) {
    let capacity = instance.capacity();
    let mut order: Vec<&Item> = instance.items().iter().collect();
    order.sort_unstable_by(|a, b| match (a.weight == 0, b.weight == 0) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => Item::by_decreasing_efficiency(a, b),
    });

    let mut solution = FixedBitSet::with_capacity(instance.len());
    let mut weight = 0;
    let mut profit = 0;
    for item in order {
        if weight + item.weight <= capacity {
            weight += item.weight;
            profit += item.profit;
            solution.insert(item.id);
        }
    }

    let single = instance
        .items()
        .iter()
        .filter(|item| item.weight <= capacity)
        .max_by_key(|item| item.profit);
    match single {
        Some(item) if item.profit > profit => {
            let mut alone = FixedBitSet::with_capacity(instance.len());
            alone.insert(item.id);
            (item.profit, alone)
        }
        _ => (profit, solution),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greedy_fills_past_break_item() {
        let instance =
            Instance::from_pairs(&[(6, 7), (6, 7), (5, 5), (5, 5), (5, 5)], 15).unwrap();
        let (profit, solution) = greedy(&instance);
        assert_eq!(profit, 14);
        assert_eq!(instance.evaluate(&solution), (12, 14));
    }

    #[test]
    fn test_single_item_beats_greedy() {
        let instance = Instance::from_pairs(&[(1, 2), (10, 10)], 10).unwrap();
        let (profit, solution) = greedy(&instance);
        assert_eq!(profit, 10);
        assert!(solution.contains(1));
        assert!(!solution.contains(0));
    }

    #[test]
    fn test_zero_weight_items_always_taken() {
        let instance = Instance::from_pairs(&[(0, 3), (4, 4), (0, 0)], 3).unwrap();
        let (profit, solution) = greedy(&instance);
        assert_eq!(profit, 3);
        assert!(solution.contains(0));
    }

    #[test]
    fn test_empty_instance() {
        let instance = Instance::from_pairs(&[], 5).unwrap();
        assert_eq!(greedy(&instance).0, 0);
    }
}
