//! Shared test fixtures for KnapForge crates.
//!
//! This crate provides instances and a ground-truth oracle for testing.
//!
//! - [`scenarios`] - Small hand-checked instances with known optima
//! - [`dp`] - Full-table dynamic programming and solution checks
//! - [`generate`] - Seeded random instance families
//!
//! # Usage
//!
//! Add as a dev-dependency in your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! knapforge-test = { workspace = true }
//! ```
//!
//! Then compare a solver against the oracle:
//!
//! ```
//! use knapforge_test::generate::{generate, Family};
//! use knapforge_test::dp;
//!
//! let generated = generate(Family::StronglyCorrelated, 30, 50, 7);
//! let optimum = dp::optimum(&generated.pairs, generated.capacity);
//! assert!(optimum > 0);
//! ```

pub mod dp;
pub mod generate;
pub mod scenarios;

pub use generate::{Family, Generated};
pub use scenarios::Scenario;
