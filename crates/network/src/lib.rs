//! Probabilistic network model consumed by the decision tree and the sampler.
//!
//! # Module Structure
//!
//! - `variable` — Variables, states and their types
//! - `evidence` — Findings, evidence cases and the [`Assignment`] abstraction
//! - `table` — Tabular potentials (probabilities, utilities, link restrictions)
//! - `potential` — Potential family (table, sum, product)
//! - `link` — Directed links with restriction and revelation metadata
//! - `node` — Node types and network nodes
//! - `kind` — Network types
//! - `net` — The network graph itself
//! - `order` — Partial order and topological sorting

mod evidence;
mod kind;
mod link;
mod net;
mod node;
mod order;
mod potential;
mod table;
mod variable;

pub use evidence::*;
pub use kind::*;
pub use link::*;
pub use net::*;
pub use node::*;
pub use order::*;
pub use potential::*;
pub use table::*;
pub use variable::*;
