//! Full-table dynamic programming oracle.
//!
//! O(n * capacity) time and O(capacity) memory; meant for instances small
//! enough that the table fits comfortably in a test.

use fixedbitset::FixedBitSet;
use knapforge_core::Instance;

/// Optimal profit of `(weight, profit)` pairs under `capacity`.
pub fn optimum(items: &[(i64, i64)], capacity: i64) -> i64 {
    if capacity < 0 {
        return 0;
    }
    let capacity = usize::try_from(capacity).expect("capacity fits in memory");
    let mut best = vec![0_i64; capacity + 1];
    for &(weight, profit) in items {
        let weight = usize::try_from(weight).expect("non-negative weight");
        if weight > capacity {
            continue;
        }
        for room in (weight..=capacity).rev() {
            best[room] = best[room].max(best[room - weight] + profit);
        }
    }
    best[capacity]
}

/// Optimal profit of `instance` given the items it has already fixed.
pub fn optimum_with_fixes(instance: &Instance) -> i64 {
    let free: Vec<(i64, i64)> = instance
        .free_items()
        .iter()
        .map(|item| (item.weight, item.profit))
        .collect();
    instance.fixed_profit() + optimum(&free, instance.residual_capacity())
}

/// Total profit of the items selected by `solution`, indexed by item id.
pub fn profit_of(items: &[(i64, i64)], solution: &FixedBitSet) -> i64 {
    solution.ones().map(|id| items[id].1).sum()
}

/// Total weight of the items selected by `solution`.
pub fn weight_of(items: &[(i64, i64)], solution: &FixedBitSet) -> i64 {
    solution.ones().map(|id| items[id].0).sum()
}

/// Whether `solution` names only existing items and fits `capacity`.
pub fn is_feasible(items: &[(i64, i64)], capacity: i64, solution: &FixedBitSet) -> bool {
    solution.ones().all(|id| id < items.len()) && weight_of(items, solution) <= capacity
}
