//! Variable reduction.
//!
//! An item left of the break item is fixed in when excluding it provably
//! cannot beat the lower bound; an item right of it is fixed out when
//! including it cannot. Fixes only ever move an item to the side the break
//! solution already puts it on, so the break item and the break solution
//! survive a reduction unchanged.

use knapforge_config::UpperBoundMode;
use knapforge_core::{bound, Fix, FixSummary, Instance};
use tracing::debug;

/// Outcome of a reduction pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    /// Items were fixed, possibly none.
    Reduced(FixSummary),
    /// No solution better than the lower bound exists.
    LowerBoundOptimal,
}

/// Runs the reduction matching `mode`.
///
/// [`UpperBoundMode::FullySorted`] requires the free range to be sorted.
pub fn reduce(instance: &mut Instance, lower_bound: i64, mode: UpperBoundMode) -> Reduction {
    let reduction = match mode {
        UpperBoundMode::BreakAnchored => reduce_using_break_pivot(instance, lower_bound),
        UpperBoundMode::FullySorted => reduce_using_full_order(instance, lower_bound),
    };
    match reduction {
        Reduction::Reduced(summary) => debug!(
            event = "reduction",
            included = summary.included,
            excluded = summary.excluded,
            free = instance.window().free_len()
        ),
        Reduction::LowerBoundOptimal => debug!(event = "reduction", lower_bound_optimal = true),
    }
    reduction
}

/// Reduction with the Dembo-Hammer bound at the break item's efficiency.
///
/// O(n); applying it twice fixes nothing the second time.
pub fn reduce_using_break_pivot(instance: &mut Instance, lower_bound: i64) -> Reduction {
    let window = instance.window();
    if window.all_fit() {
        return Reduction::Reduced(FixSummary::default());
    }
    let break_item = window.break_item();
    let free = instance.free_range();
    let capacity = instance.capacity();
    let (break_weight, break_profit) = instance.break_solution();

    let mut marks = vec![None; free.len()];
    let mut residual = instance.residual_capacity();
    for pos in free.start..break_item {
        let item = instance.item(pos);
        let upper = bound::dembo(
            instance,
            break_item,
            break_profit - item.profit,
            capacity - break_weight + item.weight,
        );
        if upper <= lower_bound {
            marks[pos - free.start] = Some(Fix::Included);
            residual -= item.weight;
        }
    }
    for pos in break_item + 1..free.end {
        let item = instance.item(pos);
        let upper = bound::dembo(
            instance,
            break_item,
            break_profit + item.profit,
            capacity - break_weight - item.weight,
        );
        if item.weight > residual || upper <= lower_bound {
            marks[pos - free.start] = Some(Fix::Excluded);
        }
    }

    let summary = instance.fix_by(|pos, _| marks[pos - free.start]);
    finish(instance, summary)
}

/// Reduction with the Martello-Toth bound over the fully sorted free range.
///
/// Tighter than [`reduce_using_break_pivot`] at O(n log n) per round.
/// Rounds repeat until nothing changes, so the result is a fixpoint.
pub fn reduce_using_full_order(instance: &mut Instance, lower_bound: i64) -> Reduction {
    let mut total = FixSummary::default();
    loop {
        if instance.window().all_fit() || instance.residual_capacity() < 0 {
            break;
        }
        let marks = full_order_marks(instance, lower_bound);
        if marks.iter().all(Option::is_none) {
            break;
        }
        let first = instance.window().first();
        total += instance.fix_by(|pos, _| marks[pos - first]);
    }
    finish(instance, total)
}

fn finish(instance: &Instance, summary: FixSummary) -> Reduction {
    if instance.residual_capacity() < 0 {
        Reduction::LowerBoundOptimal
    } else {
        Reduction::Reduced(summary)
    }
}

/// Prefix sums over a sorted free range, with the Martello-Toth bound for a
/// single forced item.
struct SortedPrefix<'a> {
    instance: &'a Instance,
    first: usize,
    end: usize,
    weights: Vec<i64>,
    profits: Vec<i64>,
}

impl<'a> SortedPrefix<'a> {
    fn new(instance: &'a Instance) -> Self {
        let free = instance.free_range();
        let mut weights = Vec::with_capacity(free.len() + 1);
        let mut profits = Vec::with_capacity(free.len() + 1);
        let (mut w, mut p) = (0, 0);
        weights.push(w);
        profits.push(p);
        for item in instance.free_items() {
            w += item.weight;
            p += item.profit;
            weights.push(w);
            profits.push(p);
        }
        Self {
            instance,
            first: free.start,
            end: free.end,
            weights,
            profits,
        }
    }

    /// Weight of the free items in `[first, pos)`.
    fn weight_before(&self, pos: usize) -> i64 {
        self.weights[pos - self.first]
    }

    fn profit_before(&self, pos: usize) -> i64 {
        self.profits[pos - self.first]
    }

    /// First position in `[lo, hi)` whose inclusive prefix, less `removed`,
    /// exceeds `capacity`; `hi` when there is none.
    fn break_in(&self, lo: usize, hi: usize, removed: i64, capacity: i64) -> usize {
        let prefix = &self.weights[lo + 1 - self.first..hi + 1 - self.first];
        lo + prefix.partition_point(|&w| w - removed <= capacity)
    }

    /// Martello-Toth bound for the free problem with `skip` removed,
    /// `capacity` free room and `profit` already earned.
    fn upper_bound(&self, skip: usize, capacity: i64, profit: i64, break_item: usize) -> i64 {
        let (skip_weight, skip_profit) = if skip < break_item {
            let item = self.instance.item(skip);
            (item.weight, item.profit)
        } else {
            (0, 0)
        };
        if break_item >= self.end {
            return profit + self.profit_before(self.end) - skip_profit;
        }
        let packed_weight = self.weight_before(break_item) - skip_weight;
        let packed_profit = profit + self.profit_before(break_item) - skip_profit;
        let room = capacity - packed_weight;
        debug_assert!(room >= 0);

        let after = self.neighbour(break_item, skip, 1);
        let without_break = match after {
            Some(next) => bound::dembo(self.instance, next, packed_profit, room),
            None => packed_profit,
        };
        let before = self.neighbour(break_item, skip, -1);
        let with_break = match before {
            Some(prev) => bound::dembo(
                self.instance,
                prev,
                packed_profit + self.instance.item(break_item).profit,
                room - self.instance.item(break_item).weight,
            ),
            None => i64::MIN,
        };
        without_break.max(with_break)
    }

    /// The position one step from `pos` in direction `step`, jumping over
    /// `skip`, if it lies in the free range.
    fn neighbour(&self, pos: usize, skip: usize, step: isize) -> Option<usize> {
        let mut next = pos.checked_add_signed(step)?;
        if next == skip {
            next = next.checked_add_signed(step)?;
        }
        (next >= self.first && next < self.end).then_some(next)
    }
}

fn full_order_marks(instance: &Instance, lower_bound: i64) -> Vec<Option<Fix>> {
    let prefix = SortedPrefix::new(instance);
    let break_item = instance.window().break_item();
    let residual = instance.residual_capacity();
    let fixed_profit = instance.fixed_profit();

    (prefix.first..prefix.end)
        .map(|pos| {
            let item = instance.item(pos);
            if pos < break_item {
                let next_break = prefix.break_in(break_item, prefix.end, item.weight, residual);
                let upper = prefix.upper_bound(pos, residual, fixed_profit, next_break);
                (upper <= lower_bound).then_some(Fix::Included)
            } else if pos > break_item {
                let room = residual - item.weight;
                if room < 0 {
                    return Some(Fix::Excluded);
                }
                let next_break = prefix.break_in(prefix.first, break_item, 0, room);
                let upper = prefix.upper_bound(pos, room, fixed_profit + item.profit, next_break);
                (upper <= lower_bound).then_some(Fix::Excluded)
            } else {
                None
            }
        })
        .collect()
}
