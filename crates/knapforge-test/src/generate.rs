//! Seeded random instance families.
//!
//! The classic correlation families: the stronger the correlation between
//! weight and profit, the more items share the break item's efficiency and
//! the larger the core the search has to explore.

use knapforge_core::Instance;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// Profit independent of weight.
    Uncorrelated,
    /// Profit within a tenth of the range around the weight.
    WeaklyCorrelated,
    /// Profit equal to weight plus a tenth of the range.
    StronglyCorrelated,
    /// Profit equal to weight.
    SubsetSum,
}

impl Family {
    pub const ALL: [Family; 4] = [
        Family::Uncorrelated,
        Family::WeaklyCorrelated,
        Family::StronglyCorrelated,
        Family::SubsetSum,
    ];
}

/// A generated instance as plain pairs, ready for [`crate::dp`].
#[derive(Debug, Clone)]
pub struct Generated {
    pub family: Family,
    pub pairs: Vec<(i64, i64)>,
    pub capacity: i64,
}

impl Generated {
    pub fn instance(&self) -> Instance {
        Instance::from_pairs(&self.pairs, self.capacity).expect("generated instance is valid")
    }
}

/// Generates `n` items with weights in `1..=range` and a capacity of half
/// the total weight.
pub fn generate(family: Family, n: usize, range: i64, seed: u64) -> Generated {
    let mut rng = StdRng::seed_from_u64(seed);
    let spread = (range / 10).max(1);
    let pairs: Vec<(i64, i64)> = (0..n)
        .map(|_| {
            let weight = rng.random_range(1..=range);
            let profit = match family {
                Family::Uncorrelated => rng.random_range(1..=range),
                Family::WeaklyCorrelated => {
                    (weight + rng.random_range(-spread..=spread)).max(1)
                }
                Family::StronglyCorrelated => weight + spread,
                Family::SubsetSum => weight,
            };
            (weight, profit)
        })
        .collect();
    let capacity = pairs.iter().map(|&(weight, _)| weight).sum::<i64>() / 2;
    Generated {
        family,
        pairs,
        capacity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_is_reproducible() {
        let a = generate(Family::Uncorrelated, 20, 100, 3);
        let b = generate(Family::Uncorrelated, 20, 100, 3);
        assert_eq!(a.pairs, b.pairs);
    }

    #[test]
    fn test_families_respect_ranges() {
        for family in Family::ALL {
            let generated = generate(family, 50, 100, 11);
            assert_eq!(generated.pairs.len(), 50);
            assert!(generated
                .pairs
                .iter()
                .all(|&(w, p)| (1..=100).contains(&w) && p >= 1));
            assert!(generated.capacity > 0);
        }
    }

    #[test]
    fn test_strongly_correlated_profits() {
        let generated = generate(Family::StronglyCorrelated, 10, 100, 1);
        assert!(generated.pairs.iter().all(|&(w, p)| p == w + 10));
    }
}
