//! Action legality and action selection.
//!
//! Legality is fixed when the model is built: a (state, action) pair gets a
//! Q-state only if [`ResourceBounds::permits`] accepts it. Selectors only read
//! the model; exploration is layered on top of the greedy recommendation.

use crate::error::{Error, Result};
use crate::mdp::model::MdpModel;
use crate::mdp::parameter::ParameterDomain;
use crate::mdp::qstate::Action;
use crate::mdp::state::State;
use crate::mdp::{ADD_VMS, NUMBER_OF_VMS, REMOVE_VMS};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Minimum and maximum number of VMs the controller may provision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceBounds {
    pub min: f64,
    pub max: f64,
}

impl ResourceBounds {
    pub fn new(min: f64, max: f64) -> Self {
        ResourceBounds { min, max }
    }

    /// Bounds spanned by the `number_of_VMs` domain, if one is modeled.
    pub fn from_domains(domains: &[ParameterDomain]) -> Option<Self> {
        domains
            .iter()
            .find(|d| d.name() == NUMBER_OF_VMS)
            .map(|d| ResourceBounds::new(d.min_value(), d.max_value()))
    }

    /// Returns true if `action` keeps the VM count of `state` within bounds.
    ///
    /// Scaling out by `k` needs `upper + k <= max`, scaling in needs
    /// `lower - k >= min`. Any other action is always permitted, as is any
    /// action on a state without a VM dimension.
    pub fn permits(&self, state: &State, action: &Action) -> bool {
        let Some(vms) = state.parameter(NUMBER_OF_VMS) else {
            return true;
        };
        let k = action.magnitude as f64;
        match action.name.as_str() {
            ADD_VMS => vms.upper() + k <= self.max,
            REMOVE_VMS => vms.lower() - k >= self.min,
            _ => true,
        }
    }
}

/// Chooses the next action to execute from the model's current state.
pub trait ActionSelector {
    /// Returns `None` if the current state has no legal action.
    fn select(&mut self, model: &MdpModel) -> Option<Action>;
}

/// Always follows the model's greedy recommendation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Greedy;

impl ActionSelector for Greedy {
    fn select(&mut self, model: &MdpModel) -> Option<Action> {
        model.suggest_action().cloned()
    }
}

/// Picks a uniformly random legal action with probability `epsilon`,
/// the greedy action otherwise.
#[derive(Debug, Clone)]
pub struct EpsilonGreedy<R: Rng> {
    epsilon: f64,
    rng: R,
}

impl<R: Rng> EpsilonGreedy<R> {
    pub fn new(epsilon: f64, rng: R) -> Result<Self> {
        validate_epsilon(epsilon)?;
        Ok(EpsilonGreedy { epsilon, rng })
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn set_epsilon(&mut self, epsilon: f64) -> Result<()> {
        validate_epsilon(epsilon)?;
        self.epsilon = epsilon;
        Ok(())
    }

    /// Multiplies epsilon by `decay_rate`, clamped to `[0, 1]`.
    pub fn decay_epsilon(&mut self, decay_rate: f64) {
        self.epsilon = (self.epsilon * decay_rate).clamp(0.0, 1.0);
    }
}

impl EpsilonGreedy<ChaCha8Rng> {
    /// Reproducible selector driven by a seeded ChaCha generator.
    pub fn seeded(epsilon: f64, seed: u64) -> Result<Self> {
        Self::new(epsilon, ChaCha8Rng::seed_from_u64(seed))
    }
}

impl<R: Rng> ActionSelector for EpsilonGreedy<R> {
    fn select(&mut self, model: &MdpModel) -> Option<Action> {
        if self.rng.gen::<f64>() < self.epsilon {
            model.legal_actions().choose(&mut self.rng).cloned()
        } else {
            model.suggest_action().cloned()
        }
    }
}

fn validate_epsilon(epsilon: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&epsilon) {
        return Err(Error::InvalidInput(format!(
            "epsilon must be in [0, 1], got {}",
            epsilon
        )));
    }
    Ok(())
}
