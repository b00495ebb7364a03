//! Cooperative cancellation and the wall-clock budget.
//!
//! Every long-running loop polls a [`CancellationToken`] between fixed-cost
//! steps. The token is cancelled either when the [`TimeBudget`] runs out or
//! when the bound tracker proves the incumbent optimal.

mod budget;
mod token;

pub use budget::TimeBudget;
pub use token::CancellationToken;

#[cfg(test)]
mod tests;
