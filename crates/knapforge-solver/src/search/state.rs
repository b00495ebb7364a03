//! Search states and the dominance-free state list.

use knapforge_core::PartialCode;

/// A partial solution: totals over every item plus the window code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchState {
    pub weight: i64,
    pub profit: i64,
    pub code: PartialCode,
}

/// States ordered by strictly increasing weight and strictly increasing
/// profit, so no state dominates another.
#[derive(Debug, Clone, Default)]
pub struct StateList {
    states: Vec<SearchState>,
    scratch: Vec<SearchState>,
}

impl StateList {
    pub fn new(initial: SearchState) -> Self {
        Self {
            states: vec![initial],
            scratch: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn as_slice(&self) -> &[SearchState] {
        &self.states
    }

    pub fn iter(&self) -> impl Iterator<Item = &SearchState> {
        self.states.iter()
    }

    /// Checks the ordering invariant.
    pub fn is_dominance_free(&self) -> bool {
        self.states
            .windows(2)
            .all(|pair| pair[0].weight < pair[1].weight && pair[0].profit < pair[1].profit)
    }

    /// Merges the list with a copy of itself shifted by `(weight, profit)`.
    ///
    /// `keep` rewrites the code of unshifted states and `shift` the code of
    /// shifted ones. On equal weight the more profitable state wins; a state
    /// no more profitable than a lighter one is dominated. Dominance is
    /// decided before `admit`, so a state rejected by `admit` still
    /// dominates heavier ones.
    pub fn merge<K, S, A>(&mut self, weight: i64, profit: i64, keep: K, shift: S, mut admit: A)
    where
        K: Fn(PartialCode) -> PartialCode,
        S: Fn(PartialCode) -> PartialCode,
        A: FnMut(&SearchState) -> bool,
    {
        let mut merged = std::mem::take(&mut self.scratch);
        merged.clear();
        let source = &self.states;
        let (mut i, mut j) = (0, 0);
        let mut best_profit = i64::MIN;
        while i < source.len() || j < source.len() {
            let unshifted = source.get(i).map(|s| SearchState {
                code: keep(s.code),
                ..*s
            });
            let shifted = source.get(j).map(|s| SearchState {
                weight: s.weight + weight,
                profit: s.profit + profit,
                code: shift(s.code),
            });
            let next = match (unshifted, shifted) {
                (Some(a), Some(b)) if a.weight < b.weight => {
                    i += 1;
                    a
                }
                (Some(a), Some(b)) if b.weight < a.weight => {
                    j += 1;
                    b
                }
                (Some(a), Some(b)) => {
                    i += 1;
                    j += 1;
                    if b.profit > a.profit {
                        b
                    } else {
                        a
                    }
                }
                (Some(a), None) => {
                    i += 1;
                    a
                }
                (None, Some(b)) => {
                    j += 1;
                    b
                }
                (None, None) => break,
            };
            if next.profit <= best_profit {
                continue;
            }
            best_profit = next.profit;
            if admit(&next) {
                merged.push(next);
            }
        }
        self.scratch = std::mem::replace(&mut self.states, merged);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(weight: i64, profit: i64) -> SearchState {
        SearchState {
            weight,
            profit,
            code: PartialCode::default(),
        }
    }

    fn pairs(list: &StateList) -> Vec<(i64, i64)> {
        list.iter().map(|s| (s.weight, s.profit)).collect()
    }

    #[test]
    fn test_add_merge() {
        let mut list = StateList::new(state(0, 0));
        list.merge(3, 4, |c| c, |c| c.with(0, true), |_| true);
        list.merge(2, 1, |c| c, |c| c.with(1, true), |_| true);
        // (2, 1) is kept, (5, 5) is dominated by nothing lighter.
        assert_eq!(pairs(&list), vec![(0, 0), (2, 1), (3, 4), (5, 5)]);
        assert!(list.is_dominance_free());
        assert!(list.as_slice()[3].code.get(0) && list.as_slice()[3].code.get(1));
    }

    #[test]
    fn test_dominated_states_dropped() {
        let mut list = StateList::new(state(0, 0));
        list.merge(3, 4, |c| c, |c| c, |_| true);
        list.merge(4, 2, |c| c, |c| c, |_| true);
        // (4, 2) is dominated by (3, 4); (7, 6) survives.
        assert_eq!(pairs(&list), vec![(0, 0), (3, 4), (7, 6)]);
    }

    #[test]
    fn test_equal_weight_keeps_more_profitable() {
        let mut list = StateList::new(state(0, 0));
        list.merge(2, 3, |c| c, |c| c, |_| true);
        list.merge(2, 5, |c| c.with(0, true), |c| c.with(1, true), |_| true);
        // Weight 2 appears twice: (2, 3) kept and (2, 5) shifted.
        assert_eq!(pairs(&list), vec![(0, 0), (2, 5), (4, 8)]);
        assert!(list.as_slice()[1].code.get(1));
    }

    #[test]
    fn test_remove_merge_shifts_down() {
        let mut list = StateList::new(state(10, 12));
        list.merge(-4, -3, |c| c, |c| c, |_| true);
        assert_eq!(pairs(&list), vec![(6, 9), (10, 12)]);
    }

    #[test]
    fn test_rejected_state_still_dominates() {
        let mut list = StateList::new(state(0, 0));
        list.merge(3, 4, |c| c, |c| c, |_| true);
        // Reject (3, 4); (4, 3) must still be dominated by it.
        list.merge(4, 3, |c| c, |c| c, |s| s.weight != 3);
        assert_eq!(pairs(&list), vec![(0, 0), (7, 7)]);
    }
}
