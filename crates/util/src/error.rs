use thiserror::Error;

/// Failures surfaced by the network model, the tree builder and the sampler.
///
/// Structural errors (missing nodes, malformed graphs) are data errors in the
/// caller's network. Evidence errors are expected at query time and must be
/// handled by whoever supplied the evidence.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("node '{0}' not found in network")]
    NodeNotFound(String),

    #[error("variable '{variable}' has no state '{state}'")]
    InvalidState { variable: String, state: String },

    #[error("table over [{variables}] expects {expected} values, got {actual}")]
    TableSize {
        variables: String,
        expected: usize,
        actual: usize,
    },

    #[error("no finding for variable '{0}' in configuration")]
    MissingFinding(String),

    #[error("node '{0}' has no potential")]
    MissingPotential(String),

    #[error("incompatible evidence: {0}")]
    IncompatibleEvidence(String),

    #[error("cannot normalize null vector over {0}")]
    NormalizeNullVector(String),

    #[error("network of type {0} is not evaluable by this algorithm")]
    NotEvaluable(String),

    #[error("wrong graph structure: {0}")]
    WrongGraphStructure(String),

    #[error("deadline exceeded")]
    DeadlineExceeded,
}

pub type Result<T> = std::result::Result<T, Error>;
