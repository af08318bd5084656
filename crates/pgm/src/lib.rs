//! Decision analysis over probabilistic graphical models.
//!
//! This facade crate re-exports all public pgm crates for convenient access.
//!
//! ## Crate Organization
//!
//! - [`core`] — Type aliases, constants, errors and runtime configuration
//! - [`network`] — Variables, potentials, evidence and the network graph
//! - [`dtree`] — Decision trees unrolled from IDs and DANs
//! - [`sampling`] — Likelihood weighting over Bayesian and tuning networks

pub use pgm_core     as core;
pub use pgm_network  as network;
pub use pgm_dtree    as dtree;
pub use pgm_sampling as sampling;

// Re-export commonly used types at the root
pub use pgm_core::*;
