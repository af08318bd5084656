//! Decision trees unrolled from decision networks.
//!
//! A [`DecisionTree`] alternates chance/decision nodes with the branches
//! leaving them, and ends every path in a subtree of utility nodes. Utilities
//! and scenario probabilities are computed on demand and memoized per
//! element, so a tree is built once per network snapshot and discarded when
//! the network or the evidence changes.
//!
//! # Module Structure
//!
//! - `tree` — Arena holding the elements and the reference network
//! - `node` — [`TreeNode`] handle: max/sum/utility evaluation
//! - `branch` — [`TreeBranch`] handle: conditional weighting
//! - `element` — [`Element`], either of the two
//! - `builder` — [`DecisionTreeBuilder`] for IDs and DANs
//! - `restrict` — Restriction and revelation propagation, super-value synthesis

mod branch;
mod builder;
mod element;
mod node;
mod restrict;
mod tree;

pub use branch::*;
pub use builder::*;
pub use element::*;
pub use node::*;
pub use tree::*;
