//! Hand-checked instances with known optima.

use knapforge_core::Instance;

/// A named instance with its optimal profit.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: &'static str,
    pub items: Vec<(i64, i64)>,
    pub capacity: i64,
    pub optimum: i64,
}

impl Scenario {
    pub fn instance(&self) -> Instance {
        Instance::from_pairs(&self.items, self.capacity).expect("scenario is valid")
    }
}

/// Every item fits; the optimum is the sum of all profits.
pub fn all_fit() -> Scenario {
    Scenario {
        name: "all_fit",
        items: vec![(10, 10), (10, 15), (10, 5), (10, 12), (10, 20)],
        capacity: 100,
        optimum: 62,
    }
}

/// The two efficient items leave room that three light ones use better.
pub fn two_heavy_three_light() -> Scenario {
    Scenario {
        name: "two_heavy_three_light",
        items: vec![(6, 7), (6, 7), (5, 5), (5, 5), (5, 5)],
        capacity: 15,
        optimum: 15,
    }
}

pub fn empty() -> Scenario {
    Scenario {
        name: "empty",
        items: Vec::new(),
        capacity: 7,
        optimum: 0,
    }
}

pub fn single_item() -> Scenario {
    Scenario {
        name: "single_item",
        items: vec![(6, 8)],
        capacity: 8,
        optimum: 8,
    }
}

/// The break solution already holds as many items as can ever fit, so the
/// cardinality surrogate applies.
pub fn surrogate_max_cardinality() -> Scenario {
    Scenario {
        name: "surrogate_max_cardinality",
        items: vec![(4, 10), (5, 11), (6, 12), (7, 13)],
        capacity: 12,
        optimum: 24,
    }
}

/// The break solution holds one item, while beating 20 takes two.
pub fn surrogate_min_cardinality() -> Scenario {
    Scenario {
        name: "surrogate_min_cardinality",
        items: vec![(6, 13), (5, 10), (5, 10), (4, 7)],
        capacity: 10,
        optimum: 20,
    }
}

pub fn all() -> Vec<Scenario> {
    vec![
        all_fit(),
        two_heavy_three_light(),
        empty(),
        single_item(),
        surrogate_max_cardinality(),
        surrogate_min_cardinality(),
    ]
}
