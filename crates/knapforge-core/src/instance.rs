//! The item store of one knapsack instance.
//!
//! Items live in a single array that is partitioned in place into three
//! regions: `[0, first)` holds items fixed into the knapsack, `[first, end)`
//! the free items still under consideration, and `[end, len)` items fixed
//! out of it. Fixed items contribute a constant weight and profit offset.

use std::ops::Range;

use fixedbitset::FixedBitSet;

use crate::error::{KnapsackError, Result};
use crate::item::Item;
use crate::window::{CoreWindow, Interval, IntervalStack};

/// Permanent decision for a free item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fix {
    Included,
    Excluded,
}

/// Number of items moved out of the free range by one fixing pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixSummary {
    pub included: usize,
    pub excluded: usize,
}

impl FixSummary {
    pub fn total(&self) -> usize {
        self.included + self.excluded
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl std::ops::AddAssign for FixSummary {
    fn add_assign(&mut self, other: Self) {
        self.included += other.included;
        self.excluded += other.excluded;
    }
}

/// A 0-1 knapsack instance: items, capacity and the fixed/free partition.
#[derive(Debug, Clone)]
pub struct Instance {
    items: Vec<Item>,
    capacity: i64,
    fixed_weight: i64,
    fixed_profit: i64,
    break_totals: (i64, i64),
    window: CoreWindow,
}

impl Instance {
    /// Creates an instance from items whose ids are exactly `0..items.len()`.
    ///
    /// Rejects negative weights, profits or capacity, and instances whose
    /// total weight or total profit does not fit in an `i64`.
    pub fn new(items: Vec<Item>, capacity: i64) -> Result<Self> {
        if capacity < 0 {
            return Err(KnapsackError::InvalidInstance(format!(
                "capacity {capacity} is negative"
            )));
        }
        let mut seen = FixedBitSet::with_capacity(items.len());
        let mut total_weight: i64 = 0;
        let mut total_profit: i64 = 0;
        for item in &items {
            if item.weight < 0 || item.profit < 0 {
                return Err(KnapsackError::InvalidInstance(format!(
                    "item {} has negative weight or profit ({}, {})",
                    item.id, item.weight, item.profit
                )));
            }
            if item.id >= items.len() || seen.put(item.id) {
                return Err(KnapsackError::InvalidInstance(format!(
                    "item id {} is out of range or duplicated",
                    item.id
                )));
            }
            total_weight = total_weight.checked_add(item.weight).ok_or_else(|| {
                KnapsackError::InvalidInstance("total weight overflows i64".to_string())
            })?;
            total_profit = total_profit.checked_add(item.profit).ok_or_else(|| {
                KnapsackError::InvalidInstance("total profit overflows i64".to_string())
            })?;
        }

        let window = CoreWindow::new(items.len());
        Ok(Self {
            items,
            capacity,
            fixed_weight: 0,
            fixed_profit: 0,
            break_totals: (0, 0),
            window,
        })
    }

    /// Creates an instance from `(weight, profit)` pairs; ids follow the order.
    pub fn from_pairs(pairs: &[(i64, i64)], capacity: i64) -> Result<Self> {
        let items = pairs
            .iter()
            .enumerate()
            .map(|(id, &(weight, profit))| Item::new(id, weight, profit))
            .collect();
        Self::new(items, capacity)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> i64 {
        self.capacity
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Item at `position` (not to be confused with the item id).
    pub fn item(&self, position: usize) -> &Item {
        &self.items[position]
    }

    pub fn window(&self) -> &CoreWindow {
        &self.window
    }

    pub fn window_mut(&mut self) -> &mut CoreWindow {
        &mut self.window
    }

    /// Weight of all items fixed into the knapsack.
    pub fn fixed_weight(&self) -> i64 {
        self.fixed_weight
    }

    /// Profit of all items fixed into the knapsack.
    pub fn fixed_profit(&self) -> i64 {
        self.fixed_profit
    }

    /// Capacity left for the free items.
    pub fn residual_capacity(&self) -> i64 {
        self.capacity - self.fixed_weight
    }

    pub fn free_range(&self) -> Range<usize> {
        self.window.first()..self.window.end()
    }

    pub fn free_items(&self) -> &[Item] {
        &self.items[self.free_range()]
    }

    /// Mutable access to a sub-range of the free items.
    ///
    /// Callers may permute items inside the range but must keep the window
    /// cursors consistent with the new layout.
    pub fn free_items_mut(&mut self, range: Range<usize>) -> &mut [Item] {
        debug_assert!(range.start >= self.window.first() && range.end <= self.window.end());
        &mut self.items[range]
    }

    /// Sorts `[lo, hi)` by decreasing efficiency.
    pub fn sort_range(&mut self, lo: usize, hi: usize) {
        self.free_items_mut(lo..hi)
            .sort_unstable_by(Item::by_decreasing_efficiency);
    }

    /// Sum of weights and profits over `[lo, hi)`.
    pub fn sum_range(&self, lo: usize, hi: usize) -> (i64, i64) {
        self.items[lo..hi]
            .iter()
            .fold((0, 0), |(w, p), item| (w + item.weight, p + item.profit))
    }

    /// Records the outcome of a partition pass and the break solution.
    pub fn locate(
        &mut self,
        break_item: usize,
        core: Interval,
        left: IntervalStack,
        right: IntervalStack,
    ) {
        self.window.locate(break_item, core, left, right);
        self.refresh_break_solution();
    }

    /// Records that every free item fits into the residual capacity.
    pub fn locate_all_fit(&mut self) {
        self.window.locate_all_fit();
        self.refresh_break_solution();
    }

    /// Records a fully sorted free range with the given break item.
    pub fn locate_sorted(&mut self, break_item: usize) {
        self.window.locate_sorted(break_item);
        self.refresh_break_solution();
    }

    fn refresh_break_solution(&mut self) {
        let (weight, profit) = self.sum_range(self.window.first(), self.window.break_item());
        self.break_totals = (self.fixed_weight + weight, self.fixed_profit + profit);
    }

    /// Weight and profit of the break solution: every fixed-in item plus the
    /// free items before the break item.
    ///
    /// Fixing only ever moves items to the side the break solution already
    /// puts them on, so the totals stay valid until the next partition pass.
    pub fn break_solution(&self) -> (i64, i64) {
        debug_assert!(self.window.is_located());
        self.break_totals
    }

    /// Fixes free items in a single stable pass.
    ///
    /// `decide` is called once per free position. Fixed-in items move to the
    /// end of the included region, fixed-out items to the front of the
    /// excluded region, and the remaining free items keep their relative
    /// order, so any partial order and unsorted interval survives.
    pub fn fix_by<F>(&mut self, mut decide: F) -> FixSummary
    where
        F: FnMut(usize, &Item) -> Option<Fix>,
    {
        let first = self.window.first();
        let end = self.window.end();
        let marks: Vec<Option<Fix>> = (first..end)
            .map(|pos| decide(pos, &self.items[pos]))
            .collect();
        let summary = FixSummary {
            included: marks.iter().filter(|m| **m == Some(Fix::Included)).count(),
            excluded: marks.iter().filter(|m| **m == Some(Fix::Excluded)).count(),
        };
        if summary.is_empty() {
            return summary;
        }

        let free: Vec<Item> = self.items[first..end].to_vec();
        let mut map = vec![usize::MAX; free.len()];
        let mut next_in = first;
        let mut next_kept = first + summary.included;
        let mut next_out = end - summary.excluded;
        for (offset, (item, mark)) in free.iter().zip(&marks).enumerate() {
            match mark {
                Some(Fix::Included) => {
                    self.items[next_in] = *item;
                    self.fixed_weight += item.weight;
                    self.fixed_profit += item.profit;
                    next_in += 1;
                }
                Some(Fix::Excluded) => {
                    self.items[next_out] = *item;
                    next_out += 1;
                }
                None => {
                    map[offset] = next_kept;
                    self.items[next_kept] = *item;
                    next_kept += 1;
                }
            }
        }
        self.window
            .remap(&map, first + summary.included, end - summary.excluded);
        summary
    }

    /// Fixes the block `[lo, lo + count)` into the knapsack by rotating it to
    /// the front of the free range.
    ///
    /// The block must lie in an interval already popped from the left
    /// work-list, with the core grown down to `lo + count`.
    pub fn fix_leading(&mut self, lo: usize, count: usize) {
        if count == 0 {
            return;
        }
        let first = self.window.first();
        debug_assert!(lo >= first && lo + count <= self.window.sorted_lo());
        let (weight, profit) = self.sum_range(lo, lo + count);
        self.items[first..lo + count].rotate_right(count);
        self.fixed_weight += weight;
        self.fixed_profit += profit;
        self.window.absorb_left(count);
    }

    /// Fixes the block `[hi - count, hi)` out of the knapsack by rotating it
    /// to the back of the free range.
    ///
    /// The block must lie in an interval already popped from the right
    /// work-list, with the core grown up to `hi - count`.
    pub fn fix_trailing(&mut self, hi: usize, count: usize) {
        if count == 0 {
            return;
        }
        let end = self.window.end();
        debug_assert!(hi <= end && hi - count >= self.window.sorted_hi());
        self.items[hi - count..end].rotate_left(count);
        self.window.absorb_right(count);
    }

    /// Builds a solution bit-vector, indexed by item id, from a predicate
    /// over positions.
    pub fn solution_with<F>(&self, mut included: F) -> FixedBitSet
    where
        F: FnMut(usize) -> bool,
    {
        let mut solution = FixedBitSet::with_capacity(self.items.len());
        for (pos, item) in self.items.iter().enumerate() {
            if included(pos) {
                solution.insert(item.id);
            }
        }
        solution
    }

    /// Total weight and profit of the items selected by `solution`.
    pub fn evaluate(&self, solution: &FixedBitSet) -> (i64, i64) {
        self.items
            .iter()
            .filter(|item| solution.contains(item.id))
            .fold((0, 0), |(w, p), item| (w + item.weight, p + item.profit))
    }
}
