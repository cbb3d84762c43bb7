//! Empirical Markov Decision Process over a discretized operational state space.
//!
//! The model learns transition and reward statistics for every legal
//! (state, action) pair from observed measurements, and re-solves the Bellman
//! equations by value iteration after each observation to recommend the
//! greedy action for the current state.
//!
//! - [`parameter`]: discretization of one measured dimension
//! - [`state_space`]: Cartesian product of parameter domains
//! - [`qstate`]: per (state, action) empirical statistics
//! - [`state`]: a point of the space with its legal Q-states
//! - [`model`]: observation routing and value iteration
//! - [`policy`]: legality bounds and action selectors
//! - [`shared`]: mutex-guarded handle for multi-threaded callers

pub mod config;
pub mod model;
pub mod parameter;
pub mod policy;
pub mod qstate;
pub mod shared;
pub mod state;
pub mod state_space;

pub use config::{ModelConfig, ParameterSpec, SolverSettings, SweepMode};
pub use model::{Measurement, MdpModel, ValueIterationReport};
pub use parameter::{Interval, ParameterDomain};
pub use policy::{ActionSelector, EpsilonGreedy, Greedy, ResourceBounds};
pub use qstate::{Action, QState};
pub use shared::SharedModel;
pub use state::State;
pub use state_space::build_state_space;

/// Name of the parameter that counts provisioned VMs.
pub const NUMBER_OF_VMS: &str = "number_of_VMs";
/// Scale-out action name.
pub const ADD_VMS: &str = "add_VMs";
/// Scale-in action name.
pub const REMOVE_VMS: &str = "remove_VMs";
