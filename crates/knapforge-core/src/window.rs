//! Cursors over the item array: the free range, the break item, the sorted
//! core around it and the stacks of intervals that are still unsorted.
//!
//! All positions are half-open. The free range is `[first, end)`; items
//! before `first` are fixed into the knapsack, items from `end` on are fixed
//! out of it. Once the break item is located, the unsorted intervals tile
//! `[first, sorted_lo)` and `[sorted_hi, end)` exactly, and the top of each
//! stack is the interval adjacent to the sorted core.

use smallvec::SmallVec;

/// A half-open range `[lo, hi)` of item positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    pub lo: usize,
    pub hi: usize,
}

impl Interval {
    pub fn new(lo: usize, hi: usize) -> Self {
        debug_assert!(lo <= hi, "interval [{lo}, {hi}) is inverted");
        Self { lo, hi }
    }

    pub fn len(&self) -> usize {
        self.hi - self.lo
    }

    pub fn is_empty(&self) -> bool {
        self.lo == self.hi
    }

    fn shifted_up(self, by: usize) -> Self {
        Self::new(self.lo + by, self.hi + by)
    }

    fn shifted_down(self, by: usize) -> Self {
        Self::new(self.lo - by, self.hi - by)
    }
}

/// Work-list of unsorted intervals on one side of the break item.
pub type IntervalStack = SmallVec<[Interval; 16]>;

/// Position bookkeeping for an [`Instance`](crate::Instance).
#[derive(Debug, Clone, Default)]
pub struct CoreWindow {
    first: usize,
    end: usize,
    located: bool,
    break_item: usize,
    sorted_lo: usize,
    sorted_hi: usize,
    left: IntervalStack,
    right: IntervalStack,
}

impl CoreWindow {
    /// Creates a window whose free range spans `len` items.
    pub fn new(len: usize) -> Self {
        Self {
            end: len,
            break_item: len,
            ..Self::default()
        }
    }

    pub fn first(&self) -> usize {
        self.first
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn free_len(&self) -> usize {
        self.end - self.first
    }

    /// Returns true once a break item (or the all-fit case) has been set.
    pub fn is_located(&self) -> bool {
        self.located
    }

    /// Position of the break item, equal to `end()` when every free item fits.
    pub fn break_item(&self) -> usize {
        self.break_item
    }

    pub fn all_fit(&self) -> bool {
        self.located && self.break_item == self.end
    }

    pub fn sorted_lo(&self) -> usize {
        self.sorted_lo
    }

    pub fn sorted_hi(&self) -> usize {
        self.sorted_hi
    }

    pub fn left_intervals(&self) -> &[Interval] {
        &self.left
    }

    pub fn right_intervals(&self) -> &[Interval] {
        &self.right
    }

    /// Records the outcome of a partition pass.
    pub fn locate(
        &mut self,
        break_item: usize,
        core: Interval,
        left: IntervalStack,
        right: IntervalStack,
    ) {
        debug_assert!(self.first <= core.lo && core.lo <= break_item);
        debug_assert!(break_item < core.hi && core.hi <= self.end);
        self.located = true;
        self.break_item = break_item;
        self.sorted_lo = core.lo;
        self.sorted_hi = core.hi;
        self.left = left;
        self.right = right;
        self.check();
    }

    /// Records that every free item fits, so there is no break item.
    pub fn locate_all_fit(&mut self) {
        self.located = true;
        self.break_item = self.end;
        self.sorted_lo = self.end;
        self.sorted_hi = self.end;
        self.left.clear();
        self.right.clear();
    }

    /// Marks the whole free range as sorted, with `break_item` inside it.
    pub fn locate_sorted(&mut self, break_item: usize) {
        debug_assert!(self.first <= break_item && break_item <= self.end);
        self.located = true;
        self.break_item = break_item;
        self.sorted_lo = self.first;
        self.sorted_hi = self.end;
        self.left.clear();
        self.right.clear();
    }

    /// Pops the unsorted interval adjacent to the left edge of the core.
    pub fn pop_left(&mut self) -> Option<Interval> {
        let interval = self.left.pop()?;
        debug_assert_eq!(interval.hi, self.sorted_lo);
        Some(interval)
    }

    /// Pops the unsorted interval adjacent to the right edge of the core.
    pub fn pop_right(&mut self) -> Option<Interval> {
        let interval = self.right.pop()?;
        debug_assert_eq!(interval.lo, self.sorted_hi);
        Some(interval)
    }

    /// Moves the left edge of the sorted core down to `lo`.
    pub fn grow_left(&mut self, lo: usize) {
        assert!(
            lo >= self.first && lo <= self.sorted_lo,
            "core cannot grow left to {lo} (first {}, sorted_lo {})",
            self.first,
            self.sorted_lo
        );
        self.sorted_lo = lo;
    }

    /// Moves the right edge of the sorted core up to `hi`.
    pub fn grow_right(&mut self, hi: usize) {
        assert!(
            hi <= self.end && hi >= self.sorted_hi,
            "core cannot grow right to {hi} (end {}, sorted_hi {})",
            self.end,
            self.sorted_hi
        );
        self.sorted_hi = hi;
    }

    /// Accounts for `count` items rotated into the included region.
    ///
    /// Every pending left interval moved up by `count` positions.
    pub fn absorb_left(&mut self, count: usize) {
        debug_assert!(self.first + count <= self.end);
        self.first += count;
        for interval in self.left.iter_mut() {
            *interval = interval.shifted_up(count);
        }
        self.check();
    }

    /// Accounts for `count` items rotated into the excluded region.
    ///
    /// Every pending right interval moved down by `count` positions.
    pub fn absorb_right(&mut self, count: usize) {
        debug_assert!(self.end >= count);
        self.end -= count;
        for interval in self.right.iter_mut() {
            *interval = interval.shifted_down(count);
        }
        self.check();
    }

    /// Applies a stable compaction of the free range.
    ///
    /// `map[i]` holds the new position of the item that was at
    /// `old_first + i`, or `usize::MAX` when it was fixed.
    pub(crate) fn remap(&mut self, map: &[usize], first: usize, end: usize) {
        let old_first = self.first;
        let translate = |interval: Interval| -> Option<Interval> {
            let kept = map[interval.lo - old_first..interval.hi - old_first]
                .iter()
                .copied()
                .filter(|&pos| pos != usize::MAX);
            let mut bounds: Option<(usize, usize)> = None;
            for pos in kept {
                bounds = Some(match bounds {
                    None => (pos, pos + 1),
                    Some((lo, _)) => (lo, pos + 1),
                });
            }
            bounds.map(|(lo, hi)| Interval::new(lo, hi))
        };

        if self.located {
            let old_break = self.break_item;
            let new_break = map
                .get(old_break.saturating_sub(old_first)..)
                .and_then(|tail| tail.iter().copied().find(|&pos| pos != usize::MAX))
                .unwrap_or(end);
            debug_assert!(
                old_break == self.end || map[old_break - old_first] != usize::MAX,
                "the break item must stay free"
            );

            let core = Interval::new(self.sorted_lo, self.sorted_hi);
            let (lo, hi) = translate(core)
                .map(|c| (c.lo, c.hi))
                .unwrap_or((new_break, new_break));
            self.left = self.left.iter().filter_map(|&i| translate(i)).collect();
            self.right = self.right.iter().filter_map(|&i| translate(i)).collect();
            self.break_item = new_break;
            self.sorted_lo = lo;
            self.sorted_hi = hi;
        }

        self.first = first;
        self.end = end;
        self.check();
    }

    fn check(&self) {
        if !cfg!(debug_assertions) || !self.located || self.all_fit() {
            return;
        }
        debug_assert!(self.first <= self.sorted_lo);
        debug_assert!(self.sorted_lo <= self.break_item && self.break_item < self.sorted_hi);
        debug_assert!(self.sorted_hi <= self.end);
        let mut edge = self.sorted_lo;
        for interval in self.left.iter().rev() {
            debug_assert_eq!(interval.hi, edge, "left work-list does not tile");
            edge = interval.lo;
        }
        debug_assert_eq!(edge, self.first, "left work-list does not reach first");
        let mut edge = self.sorted_hi;
        for interval in self.right.iter().rev() {
            debug_assert_eq!(interval.lo, edge, "right work-list does not tile");
            edge = interval.hi;
        }
        debug_assert_eq!(edge, self.end, "right work-list does not reach end");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    fn located() -> CoreWindow {
        let mut window = CoreWindow::new(20);
        window.locate(
            8,
            Interval::new(6, 10),
            smallvec![Interval::new(0, 4), Interval::new(4, 6)],
            smallvec![Interval::new(15, 20), Interval::new(10, 15)],
        );
        window
    }

    #[test]
    fn test_new_window_spans_everything() {
        let window = CoreWindow::new(5);
        assert_eq!(window.first(), 0);
        assert_eq!(window.end(), 5);
        assert_eq!(window.free_len(), 5);
        assert!(!window.is_located());
    }

    #[test]
    fn test_pop_and_grow() {
        let mut window = located();
        let right = window.pop_right().unwrap();
        assert_eq!(right, Interval::new(10, 15));
        window.grow_right(right.hi);
        assert_eq!(window.sorted_hi(), 15);

        let left = window.pop_left().unwrap();
        assert_eq!(left, Interval::new(4, 6));
        window.grow_left(left.lo);
        assert_eq!(window.sorted_lo(), 4);
    }

    #[test]
    #[should_panic(expected = "cannot grow right")]
    fn test_grow_right_past_end_panics() {
        let mut window = located();
        window.grow_right(21);
    }

    #[test]
    fn test_absorb_shifts_pending_intervals() {
        let mut window = located();
        let left = window.pop_left().unwrap();
        // Two items of [4, 6) fixed in; the remaining interval moves up.
        window.absorb_left(2);
        assert_eq!(window.first(), 2);
        assert_eq!(window.left_intervals(), &[Interval::new(2, 6)]);
        assert_eq!(left.len(), 2);

        let right = window.pop_right().unwrap();
        window.grow_right(right.lo + 3);
        window.absorb_right(2);
        assert_eq!(window.end(), 18);
        assert_eq!(window.right_intervals(), &[Interval::new(13, 18)]);
    }

    #[test]
    fn test_remap_drops_fixed_positions() {
        let mut window = located();
        // Fix positions 0 and 1 in, 19 out; everything else keeps order.
        let mut map = vec![usize::MAX; 20];
        let mut next = 2;
        for (old, slot) in map.iter_mut().enumerate() {
            if (2..19).contains(&old) {
                *slot = next;
                next += 1;
            }
        }
        window.remap(&map, 2, 19);
        assert_eq!(window.first(), 2);
        assert_eq!(window.end(), 19);
        assert_eq!(window.break_item(), 8);
        assert_eq!(
            window.left_intervals(),
            &[Interval::new(2, 4), Interval::new(4, 6)]
        );
        assert_eq!(
            window.right_intervals(),
            &[Interval::new(15, 19), Interval::new(10, 15)]
        );
    }

    #[test]
    fn test_all_fit() {
        let mut window = CoreWindow::new(4);
        window.locate_all_fit();
        assert!(window.all_fit());
        assert_eq!(window.break_item(), 4);
    }
}
