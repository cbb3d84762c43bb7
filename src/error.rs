//! Error type shared by every part of the crate.

use thiserror::Error;

/// Result type for model construction and update operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building or driving an [`MdpModel`](crate::mdp::MdpModel).
///
/// Failure to converge during value iteration is not an error; it is reported
/// through [`ValueIterationReport`](crate::mdp::ValueIterationReport).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// Invalid argument passed to a constructor or solver.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Configuration is missing a required field or is malformed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A measurement record does not carry a value for a modeled parameter.
    #[error("measurement is missing parameter `{parameter}`")]
    MissingMeasurement { parameter: String },

    /// No state covers the measurement; the parameter domains do not partition
    /// the measurement space.
    #[error("no state matches measurement {0}")]
    UnmatchedMeasurement(String),

    /// The action is not legal from the current state.
    #[error("action {action} is not legal in state {state}")]
    IllegalAction { action: String, state: usize },

    /// A state index outside the model.
    #[error("state index {index} out of range for {num_states} states")]
    StateOutOfRange { index: usize, num_states: usize },
}
