//! Linear relaxation upper bounds.
//!
//! Every function here is O(1) once the pivot position is known. Products
//! are formed in `i128` and the result saturates into `i64`, so callers may
//! pass residual capacities of either sign.

use crate::instance::Instance;
use crate::item::Item;

fn saturate(value: i128) -> i64 {
    value.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

/// `profit + floor(residual * p / w)` for the pivot item.
fn fill(profit: i64, residual: i64, pivot: &Item) -> i64 {
    debug_assert!(pivot.weight > 0, "pivot item {} has zero weight", pivot.id);
    let gain = (residual as i128 * pivot.profit as i128).div_euclid(pivot.weight as i128);
    saturate(profit as i128 + gain)
}

/// Dantzig bound: the break solution plus the remaining capacity filled
/// fractionally with the break item.
///
/// Equals the break solution profit when every free item fits.
pub fn dantzig(instance: &Instance) -> i64 {
    let (weight, profit) = instance.break_solution();
    let window = instance.window();
    if window.all_fit() {
        return profit;
    }
    fill(
        profit,
        instance.capacity() - weight,
        instance.item(window.break_item()),
    )
}

/// Dembo bound for a state with `profit` and `residual_capacity` left,
/// filling at the efficiency of the item at `pivot`.
///
/// A negative residual gives the Lagrangian bound with the pivot's
/// efficiency as multiplier, which stays valid.
pub fn dembo(instance: &Instance, pivot: usize, profit: i64, residual_capacity: i64) -> i64 {
    fill(profit, residual_capacity, instance.item(pivot))
}

/// Bound for an over-capacity state: the profit that must be given back to
/// shed `residual_deficit` weight, priced at the pivot's efficiency.
///
/// `None` means no removable item remains; the state can never become
/// feasible and the bound is `0`.
pub fn dembo_reverse(
    instance: &Instance,
    pivot: Option<usize>,
    profit: i64,
    residual_deficit: i64,
) -> i64 {
    match pivot {
        Some(pivot) => fill(profit, -residual_deficit, instance.item(pivot)),
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::Interval;
    use smallvec::smallvec;

    fn located() -> Instance {
        let mut instance =
            Instance::from_pairs(&[(6, 7), (6, 7), (5, 5), (5, 5), (5, 5)], 15).unwrap();
        instance.locate(2, Interval::new(0, 5), smallvec![], smallvec![]);
        instance
    }

    #[test]
    fn test_dantzig() {
        // 14 + floor(3 * 5 / 5)
        assert_eq!(dantzig(&located()), 17);
    }

    #[test]
    fn test_dantzig_all_fit() {
        let mut instance = Instance::from_pairs(&[(1, 4), (2, 3)], 10).unwrap();
        instance.locate_all_fit();
        assert_eq!(dantzig(&instance), 7);
    }

    #[test]
    fn test_dembo_rounds_down() {
        let instance = located();
        // pivot (6, 7): 10 + floor(4 * 7 / 6) = 10 + 4
        assert_eq!(dembo(&instance, 0, 10, 4), 14);
        // negative residual rounds towards minus infinity
        assert_eq!(dembo(&instance, 0, 10, -1), 8);
    }

    #[test]
    fn test_dembo_reverse() {
        let instance = located();
        // 19 - ceil(2 * 7 / 6) = 19 - 3
        assert_eq!(dembo_reverse(&instance, Some(1), 19, 2), 16);
        assert_eq!(dembo_reverse(&instance, None, 19, 2), 0);
    }

    #[test]
    fn test_saturates_on_huge_values() {
        let mut instance = Instance::from_pairs(&[(1, i64::MAX / 2)], i64::MAX).unwrap();
        instance.locate(0, Interval::new(0, 1), smallvec![], smallvec![]);
        assert_eq!(dembo(&instance, 0, 0, i64::MAX), i64::MAX);
    }
}
