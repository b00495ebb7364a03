//! KnapForge Core - building blocks of the exact 0-1 knapsack solver
//!
//! This crate provides the types shared by every solver component:
//! - `Item` and `Instance`: the item store with its fixed and free regions
//! - `CoreWindow`: cursors around the break item and the unsorted work-lists
//! - `bound`: linear relaxation upper bounds (Dantzig, Dembo)
//! - `codec`: bounded-width encoding of partial solutions
//!
//! # Example
//!
//! ```
//! use knapforge_core::Instance;
//!
//! let instance = Instance::from_pairs(&[(6, 7), (6, 7), (5, 5)], 15).unwrap();
//! assert_eq!(instance.len(), 3);
//! assert_eq!(instance.capacity(), 15);
//! ```

pub mod bound;
pub mod codec;
pub mod error;
pub mod instance;
pub mod item;
pub mod window;

pub use codec::{CodecSnapshot, Decision, DecisionBits, PartialCode, PartialSolutionCodec};
pub use error::{KnapsackError, Result};
pub use instance::{Fix, FixSummary, Instance};
pub use item::Item;
pub use window::{CoreWindow, Interval, IntervalStack};
