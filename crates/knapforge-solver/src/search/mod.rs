//! Dynamic programming over the expanding core.
//!
//! The searcher keeps a list of undominated states and alternately adds the
//! next item right of the break item and removes the next item left of it,
//! merging the shifted copy of the list back into itself. States whose
//! upper bound cannot beat the lower bound are dropped during the merge.

mod searcher;
mod state;

pub use searcher::{BestState, SearchPhase, StateSpaceSearcher};
pub use state::{SearchState, StateList};
