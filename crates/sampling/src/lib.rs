//! Approximate inference by likelihood weighting.
//!
//! Evidence variables are clamped, every other variable is drawn from its
//! conditional distribution in topological order, and each trial is weighted
//! by the likelihood of the evidence. Trials run in seeded batches, so an
//! estimate is reproducible for a given seed and sample size, with or
//! without the `parallel` feature.
//!
//! # Module Structure
//!
//! - `plan` — What a query samples and how one trial is drawn and weighted
//! - `tally` — Per-batch accumulators for marginals, joints and families
//! - `weighting` — [`LikelihoodWeighting`], the query interface

mod plan;
mod tally;
mod weighting;

pub use weighting::*;
