//! Break item location and lazy core expansion.
//!
//! The free range is never fully sorted up front. A randomized three-way
//! partition narrows it down to a small sorted core around the break item
//! and leaves the rest as unsorted intervals, ordered by efficiency between
//! each other. The search asks for the next item on either side; only then
//! is the adjacent interval sorted, tested against the lower bound and
//! merged into the core.

use std::cmp::Ordering;

use knapforge_core::{bound, Instance, Interval, IntervalStack, Item};
use rand::Rng;
use tracing::trace;

/// Below this many items a range is sorted outright.
const SORT_THRESHOLD: usize = 16;

/// Locates the break item and grows the sorted core on demand.
#[derive(Debug, Default)]
pub struct CoreManager {
    extensions: u64,
    fixed: usize,
}

impl CoreManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intervals merged into the core so far.
    pub fn extensions(&self) -> u64 {
        self.extensions
    }

    /// Items fixed by extension-time tests so far.
    pub fn fixed(&self) -> usize {
        self.fixed
    }

    /// Partitions the free range around the break item in expected linear
    /// time and records the result in the instance's window.
    ///
    /// Returns the break item position, or the end of the free range when
    /// every free item fits.
    pub fn locate_break_item<R: Rng>(&mut self, instance: &mut Instance, rng: &mut R) -> usize {
        let free = instance.free_range();
        let capacity = instance.residual_capacity();
        let (free_weight, _) = instance.sum_range(free.start, free.end);
        if free_weight <= capacity {
            instance.locate_all_fit();
            return free.end;
        }

        let mut left = IntervalStack::new();
        let mut right = IntervalStack::new();
        let (mut lo, mut hi) = (free.start, free.end);
        // Weight of [free.start, lo), all of which fits.
        let mut packed = 0;
        while hi - lo > SORT_THRESHOLD {
            let pivot = *instance.item(rng.random_range(lo..hi));
            let (greater, equal) = partition(instance.free_items_mut(lo..hi), &pivot);
            let mid = lo + greater;
            let tail = mid + equal;
            let (greater_weight, _) = instance.sum_range(lo, mid);
            let (equal_weight, _) = instance.sum_range(mid, tail);

            if packed + greater_weight > capacity {
                push(&mut right, tail, hi);
                push(&mut right, mid, tail);
                hi = mid;
            } else if packed + greater_weight + equal_weight > capacity {
                push(&mut left, lo, mid);
                push(&mut right, tail, hi);
                packed += greater_weight;
                lo = mid;
                hi = tail;
                break;
            } else {
                push(&mut left, lo, mid);
                push(&mut left, mid, tail);
                packed += greater_weight + equal_weight;
                lo = tail;
            }
        }

        instance.sort_range(lo, hi);
        let mut break_item = lo;
        while break_item < hi && packed + instance.item(break_item).weight <= capacity {
            packed += instance.item(break_item).weight;
            break_item += 1;
        }
        debug_assert!(break_item < hi, "partition lost the break item");
        instance.locate(break_item, Interval::new(lo, hi), left, right);
        break_item
    }

    /// Sorts the whole free range and records the break item.
    pub fn sort_free_range(&mut self, instance: &mut Instance) -> usize {
        let free = instance.free_range();
        instance.sort_range(free.start, free.end);
        let capacity = instance.residual_capacity();
        let mut packed = 0;
        let mut break_item = free.start;
        while break_item < free.end && packed + instance.item(break_item).weight <= capacity {
            packed += instance.item(break_item).weight;
            break_item += 1;
        }
        if break_item == free.end {
            instance.locate_all_fit();
        } else {
            instance.locate_sorted(break_item);
        }
        break_item
    }

    /// Sorts the unsorted interval right of the core and merges it in.
    ///
    /// Items that are too heavy for the residual capacity, or whose forced
    /// inclusion cannot beat `lower_bound`, are fixed out instead. Returns
    /// false when no interval is left.
    pub fn extend_right(&mut self, instance: &mut Instance, lower_bound: i64) -> bool {
        let Some(interval) = instance.window_mut().pop_right() else {
            return false;
        };
        instance.sort_range(interval.lo, interval.hi);
        let residual = instance.residual_capacity();
        let capacity = instance.capacity();
        let (break_weight, break_profit) = instance.break_solution();
        let break_item = instance.window().break_item();
        let reducible: Vec<bool> = (interval.lo..interval.hi)
            .map(|pos| {
                let item = instance.item(pos);
                item.weight > residual
                    || bound::dembo(
                        instance,
                        break_item,
                        break_profit + item.profit,
                        capacity - break_weight - item.weight,
                    ) <= lower_bound
            })
            .collect();

        let kept = stable_split(
            instance.free_items_mut(interval.lo..interval.hi),
            &reducible,
            false,
        );
        let fixed = interval.len() - kept;
        instance.window_mut().grow_right(interval.lo + kept);
        instance.fix_trailing(interval.hi, fixed);
        self.record(interval, fixed, "right");
        true
    }

    /// Sorts the unsorted interval left of the core and merges it in.
    ///
    /// Items whose forced exclusion cannot beat `lower_bound` are fixed in
    /// instead. Returns false when no interval is left.
    pub fn extend_left(&mut self, instance: &mut Instance, lower_bound: i64) -> bool {
        let Some(interval) = instance.window_mut().pop_left() else {
            return false;
        };
        instance.sort_range(interval.lo, interval.hi);
        let capacity = instance.capacity();
        let (break_weight, break_profit) = instance.break_solution();
        let break_item = instance.window().break_item();
        let reducible: Vec<bool> = (interval.lo..interval.hi)
            .map(|pos| {
                let item = instance.item(pos);
                bound::dembo(
                    instance,
                    break_item,
                    break_profit - item.profit,
                    capacity - break_weight + item.weight,
                ) <= lower_bound
            })
            .collect();

        let kept = stable_split(
            instance.free_items_mut(interval.lo..interval.hi),
            &reducible,
            true,
        );
        let fixed = interval.len() - kept;
        instance.window_mut().grow_left(interval.lo + fixed);
        instance.fix_leading(interval.lo, fixed);
        self.record(interval, fixed, "left");
        true
    }

    /// Returns `position` once it lies in the sorted core right of the
    /// break item, extending the core as needed. `None` means the free range
    /// is exhausted on that side.
    pub fn bound_item_right(
        &mut self,
        instance: &mut Instance,
        position: usize,
        lower_bound: i64,
    ) -> Option<usize> {
        loop {
            if position < instance.window().sorted_hi() {
                return Some(position);
            }
            if position > instance.window().sorted_hi() || !self.extend_right(instance, lower_bound)
            {
                return None;
            }
        }
    }

    /// Returns the item just below the exclusive cursor `left` once it lies
    /// in the sorted core, extending the core as needed. `None` means the
    /// free range is exhausted on that side.
    pub fn bound_item_left(
        &mut self,
        instance: &mut Instance,
        left: usize,
        lower_bound: i64,
    ) -> Option<usize> {
        loop {
            if left > instance.window().sorted_lo() {
                return Some(left - 1);
            }
            if left < instance.window().sorted_lo() || !self.extend_left(instance, lower_bound) {
                return None;
            }
        }
    }

    fn record(&mut self, interval: Interval, fixed: usize, side: &'static str) {
        self.extensions += 1;
        self.fixed += fixed;
        trace!(
            event = "core_extension",
            side,
            lo = interval.lo,
            hi = interval.hi,
            fixed
        );
    }
}

fn push(stack: &mut IntervalStack, lo: usize, hi: usize) {
    if lo < hi {
        stack.push(Interval::new(lo, hi));
    }
}

/// Three-way partition by efficiency against `pivot`: more efficient items
/// first, then equally efficient ones, then the rest.
///
/// Returns the sizes of the first two groups.
fn partition(items: &mut [Item], pivot: &Item) -> (usize, usize) {
    let (mut greater, mut scan, mut less) = (0, 0, items.len());
    while scan < less {
        match items[scan].cmp_efficiency(pivot) {
            Ordering::Greater => {
                items.swap(greater, scan);
                greater += 1;
                scan += 1;
            }
            Ordering::Equal => scan += 1,
            Ordering::Less => {
                less -= 1;
                items.swap(scan, less);
            }
        }
    }
    (greater, less - greater)
}

/// Splits `items` by `marked`, keeping relative order on both sides.
///
/// Marked items go first when `marked_first` is set and last otherwise.
/// Returns the number of unmarked items.
fn stable_split(items: &mut [Item], marked: &[bool], marked_first: bool) -> usize {
    let (mut front, mut back): (Vec<Item>, Vec<Item>) = (Vec::new(), Vec::new());
    for (item, &mark) in items.iter().zip(marked) {
        if mark == marked_first {
            front.push(*item);
        } else {
            back.push(*item);
        }
    }
    let unmarked = if marked_first { back.len() } else { front.len() };
    let split = front.len();
    items[..split].copy_from_slice(&front);
    items[split..].copy_from_slice(&back);
    unmarked
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn efficiency_sorted(items: &[Item]) -> bool {
        items
            .windows(2)
            .all(|pair| pair[0].cmp_efficiency(&pair[1]) != Ordering::Less)
    }

    fn spread(n: usize, capacity: i64) -> Instance {
        let pairs: Vec<(i64, i64)> = (0..n as i64)
            .map(|i| (10 + (i * 7) % 23, 5 + (i * 13) % 41))
            .collect();
        Instance::from_pairs(&pairs, capacity).unwrap()
    }

    #[test]
    fn test_partition_groups() {
        let pivot = Item::new(9, 2, 2);
        let mut items = vec![
            Item::new(0, 1, 3),
            Item::new(1, 4, 2),
            Item::new(2, 3, 3),
            Item::new(3, 1, 5),
        ];
        let (greater, equal) = partition(&mut items, &pivot);
        assert_eq!((greater, equal), (2, 1));
        assert!(items[..2].iter().all(|i| i.cmp_efficiency(&pivot) == Ordering::Greater));
        assert_eq!(items[2].id, 2);
        assert_eq!(items[3].id, 1);
    }

    #[test]
    fn test_located_break_separates_by_efficiency() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut instance = spread(200, 700);
        let mut manager = CoreManager::new();
        let break_item = manager.locate_break_item(&mut instance, &mut rng);
        let pivot = *instance.item(break_item);

        let items = instance.items();
        assert!(items[..break_item]
            .iter()
            .all(|item| item.cmp_efficiency(&pivot) != Ordering::Less));
        assert!(items[break_item + 1..]
            .iter()
            .all(|item| item.cmp_efficiency(&pivot) != Ordering::Greater));

        let (weight, _) = instance.break_solution();
        assert!(weight <= 700);
        assert!(weight + pivot.weight > 700);

        let window = instance.window();
        assert!(window.sorted_lo() <= break_item && break_item < window.sorted_hi());
        assert!(efficiency_sorted(
            &instance.items()[window.sorted_lo()..window.sorted_hi()]
        ));
    }

    #[test]
    fn test_full_sort_agrees_on_break_weight_class() {
        let mut sorted = spread(200, 700);
        let break_item = CoreManager::new().sort_free_range(&mut sorted);
        assert!(efficiency_sorted(sorted.items()));
        let (weight, _) = sorted.break_solution();
        assert!(weight + sorted.item(break_item).weight > 700);
    }

    #[test]
    fn test_all_fit() {
        let mut instance = spread(20, 10_000);
        let mut rng = StdRng::seed_from_u64(1);
        let break_item = CoreManager::new().locate_break_item(&mut instance, &mut rng);
        assert_eq!(break_item, 20);
        assert!(instance.window().all_fit());
    }

    #[test]
    fn test_extension_walks_whole_range() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut instance = spread(300, 900);
        let mut manager = CoreManager::new();
        let break_item = manager.locate_break_item(&mut instance, &mut rng);

        // No item can be reduced against an unbounded-below lower bound.
        let mut next = break_item;
        while let Some(pos) = manager.bound_item_right(&mut instance, next, i64::MIN) {
            next = pos + 1;
        }
        let mut left = break_item;
        while let Some(pos) = manager.bound_item_left(&mut instance, left, i64::MIN) {
            left = pos;
        }
        let window = instance.window();
        assert_eq!(window.sorted_lo(), window.first());
        assert_eq!(window.sorted_hi(), window.end());
        assert_eq!(manager.fixed(), 0);
        assert!(efficiency_sorted(instance.free_items()));
    }

    #[test]
    fn test_extension_fixes_hopeless_items() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut instance = spread(300, 900);
        let mut manager = CoreManager::new();
        let break_item = manager.locate_break_item(&mut instance, &mut rng);
        let upper = bound::dantzig(&instance);
        let before = instance.break_solution();

        let mut next = break_item;
        while let Some(pos) = manager.bound_item_right(&mut instance, next, upper) {
            next = pos + 1;
        }
        let mut left = break_item;
        while let Some(pos) = manager.bound_item_left(&mut instance, left, upper) {
            left = pos;
        }
        // With the lower bound at the Dantzig bound every item but those in
        // the initial core is reducible.
        assert!(manager.fixed() > 0);
        assert_eq!(instance.break_solution(), before);
        assert!(instance.fixed_weight() <= instance.capacity());
    }
}
