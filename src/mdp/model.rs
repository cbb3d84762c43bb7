//! The empirical MDP: state lookup, observation routing and value iteration.

use crate::error::{Error, Result};
use crate::mdp::config::{validate_threshold, ModelConfig, SolverSettings, SweepMode};
use crate::mdp::parameter::ParameterDomain;
use crate::mdp::policy::ResourceBounds;
use crate::mdp::qstate::{Action, QState};
use crate::mdp::state::State;
use crate::mdp::state_space::{build_state_space, state_index};
use crate::mdp::{ADD_VMS, NUMBER_OF_VMS, REMOVE_VMS};
use log::{debug, trace, warn};
use rayon::prelude::*;
use std::collections::BTreeMap;

/// Observed value of every modeled parameter, keyed by parameter name.
pub type Measurement = BTreeMap<String, f64>;

/// Outcome of one value-iteration run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueIterationReport {
    /// Number of full sweeps performed
    pub sweeps: usize,
    /// Largest change of a state value in the last sweep
    pub max_delta: f64,
    /// False if the sweep cap was hit before the threshold was met
    pub converged: bool,
}

/// Empirical Markov Decision Process over a discretized state space.
///
/// The model owns every [`State`] and [`QState`]. Statistics only change
/// through [`MdpModel::update`], which records the observed transition and
/// re-solves the model by value iteration before moving to the destination
/// state.
///
/// The model does no locking; wrap it in a [`SharedModel`](crate::mdp::SharedModel)
/// to drive it from several threads.
///
/// # Examples
///
/// ```
/// use elastic_mdp::mdp::{Action, Measurement, MdpModel, ModelConfig};
///
/// let conf = ModelConfig::from_json_str(r#"{
///     "parameters": { "number_of_VMs": { "values": [1, 2] } },
///     "actions": { "add_VMs": [1], "remove_VMs": [1], "no_op": [0] },
///     "discount": 0.5,
///     "initial_qvalues": 0
/// }"#)?;
/// let mut model = MdpModel::new(&conf)?;
///
/// let mut measurement = Measurement::new();
/// measurement.insert("number_of_VMs".to_string(), 1.0);
/// model.set_state(&measurement)?;
/// assert_eq!(
///     model.legal_actions(),
///     vec![Action::new("add_VMs", 1), Action::new("no_op", 0)]
/// );
///
/// // Scaling out was observed to pay off
/// measurement.insert("number_of_VMs".to_string(), 2.0);
/// let report = model.update(&Action::new("add_VMs", 1), &measurement, 1.0)?;
/// assert!(report.converged);
/// assert_eq!(model.current_state().index(), 1);
/// assert_eq!(model.state(0).unwrap().optimal_action(), Some(&Action::new("add_VMs", 1)));
/// # Ok::<(), elastic_mdp::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct MdpModel {
    domains: Vec<ParameterDomain>,
    states: Vec<State>,
    settings: SolverSettings,
    bounds: Option<ResourceBounds>,
    current: usize,
}

impl MdpModel {
    /// Builds a model from a validated configuration.
    pub fn new(config: &ModelConfig) -> Result<Self> {
        config.validate()?;
        Self::from_domains(config.domains()?, &config.action_list(), config.settings())
    }

    /// Builds the state space of `domains` and gives every state one Q-state
    /// per action its VM bounds permit.
    ///
    /// The current state starts at index 0.
    pub fn from_domains(
        domains: Vec<ParameterDomain>,
        actions: &[Action],
        settings: SolverSettings,
    ) -> Result<Self> {
        settings.validate()?;
        for (i, d) in domains.iter().enumerate() {
            if domains[..i].iter().any(|other| other.name() == d.name()) {
                return Err(Error::InvalidInput(format!(
                    "parameter `{}` is modeled twice",
                    d.name()
                )));
            }
        }
        for (i, a) in actions.iter().enumerate() {
            if actions[..i].contains(a) {
                return Err(Error::InvalidInput(format!("action {} is listed twice", a)));
            }
        }

        let bounds = ResourceBounds::from_domains(&domains);
        let scales_vms = actions
            .iter()
            .any(|a| a.name == ADD_VMS || a.name == REMOVE_VMS);
        if scales_vms && bounds.is_none() {
            return Err(Error::InvalidConfig(format!(
                "`{}`/`{}` actions require a `{}` parameter",
                ADD_VMS, REMOVE_VMS, NUMBER_OF_VMS
            )));
        }

        let mut states = build_state_space(&domains);
        let num_states = states.len();
        for action in actions {
            for state in states.iter_mut() {
                let permitted = bounds.map_or(true, |b| b.permits(state, action));
                if permitted {
                    state.add_qstate(QState::new(
                        action.clone(),
                        num_states,
                        settings.initial_qvalue,
                    ));
                }
            }
        }
        for state in states.iter_mut() {
            state.recompute_value();
        }

        debug!(
            "built MDP model: {} parameters, {} states, {} Q-states",
            domains.len(),
            num_states,
            states.iter().map(|s| s.qstates().len()).sum::<usize>()
        );

        Ok(MdpModel {
            domains,
            states,
            settings,
            bounds,
            current: 0,
        })
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn state(&self, index: usize) -> Option<&State> {
        self.states.get(index)
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    pub fn current_state(&self) -> &State {
        &self.states[self.current]
    }

    pub fn domains(&self) -> &[ParameterDomain] {
        &self.domains
    }

    /// Modeled parameter names in state-enumeration order.
    pub fn parameter_names(&self) -> Vec<&str> {
        self.domains.iter().map(ParameterDomain::name).collect()
    }

    pub fn discount(&self) -> f64 {
        self.settings.discount
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    pub fn bounds(&self) -> Option<ResourceBounds> {
        self.bounds
    }

    fn resolve_index(&self, measurement: &Measurement) -> Result<usize> {
        let mut levels = Vec::with_capacity(self.domains.len());
        for domain in &self.domains {
            let value = measurement
                .get(domain.name())
                .ok_or_else(|| Error::MissingMeasurement {
                    parameter: domain.name().to_string(),
                })?;
            let level = domain
                .bucket_of(*value)
                .ok_or_else(|| Error::UnmatchedMeasurement(format!("{:?}", measurement)))?;
            levels.push(level);
        }
        Ok(state_index(&self.domains, &levels))
    }

    /// The unique state whose levels contain every measured value.
    ///
    /// Fields not modeled by any parameter are ignored.
    ///
    /// # Errors
    /// `MissingMeasurement` if a modeled parameter is absent,
    /// `UnmatchedMeasurement` if a value falls outside its domain.
    pub fn resolve_state(&self, measurement: &Measurement) -> Result<&State> {
        let index = self.resolve_index(measurement)?;
        Ok(&self.states[index])
    }

    /// Moves the current state to the one matching `measurement`.
    pub fn set_state(&mut self, measurement: &Measurement) -> Result<()> {
        self.current = self.resolve_index(measurement)?;
        Ok(())
    }

    pub fn set_state_index(&mut self, index: usize) -> Result<()> {
        if index >= self.states.len() {
            return Err(Error::StateOutOfRange {
                index,
                num_states: self.states.len(),
            });
        }
        self.current = index;
        Ok(())
    }

    /// Greedy action of the current state.
    ///
    /// Before the first value iteration this is the first legal action.
    pub fn suggest_action(&self) -> Option<&Action> {
        self.current_state().optimal_action()
    }

    /// Actions legal from the current state, in configuration order.
    pub fn legal_actions(&self) -> Vec<Action> {
        self.current_state().legal_actions()
    }

    /// Records that `action` was taken from the current state, led to the
    /// state matching `measurement` and earned `reward`; re-solves the model
    /// and moves to the destination.
    ///
    /// All checks run before anything is mutated: a failed update leaves the
    /// model, including visit counts, untouched.
    ///
    /// # Errors
    /// `IllegalAction` if the current state has no Q-state for `action`,
    /// `InvalidInput` for a non-finite reward, or the errors of
    /// [`MdpModel::resolve_state`].
    pub fn update(
        &mut self,
        action: &Action,
        measurement: &Measurement,
        reward: f64,
    ) -> Result<ValueIterationReport> {
        let current = self.current;
        if self.states[current].qstate(action).is_none() {
            warn!("rejected illegal action {} in state {}", action, current);
            return Err(Error::IllegalAction {
                action: action.to_string(),
                state: current,
            });
        }
        if !reward.is_finite() {
            return Err(Error::InvalidInput(format!(
                "reward must be finite, got {}",
                reward
            )));
        }
        let destination = self.resolve_index(measurement)?;

        let state = &mut self.states[current];
        state.visit();
        if let Some(qstate) = state.qstate_mut(action) {
            qstate.record_observation(destination, reward);
        }
        trace!(
            "observed {} -> {} via {} with reward {}",
            current,
            destination,
            action,
            reward
        );

        let report = self.run_value_iteration(self.settings.convergence_threshold);
        self.current = destination;
        Ok(report)
    }

    /// Sweeps every state until no state value moves by more than the
    /// configured threshold, or the sweep cap is reached.
    pub fn value_iteration(&mut self) -> ValueIterationReport {
        self.run_value_iteration(self.settings.convergence_threshold)
    }

    /// Value iteration with a one-off convergence threshold.
    pub fn value_iteration_with_threshold(&mut self, threshold: f64) -> Result<ValueIterationReport> {
        validate_threshold(threshold)?;
        Ok(self.run_value_iteration(threshold))
    }

    fn run_value_iteration(&mut self, threshold: f64) -> ValueIterationReport {
        let discount = self.settings.discount;
        let max_iterations = self.settings.max_iterations;
        let mut values: Vec<f64> = self.states.iter().map(State::value).collect();

        let mut report = ValueIterationReport {
            sweeps: 0,
            max_delta: 0.0,
            converged: false,
        };
        while report.sweeps < max_iterations {
            report.sweeps += 1;
            report.max_delta = match self.settings.sweep {
                SweepMode::InPlace => sweep_in_place(&mut self.states, &mut values, discount),
                SweepMode::Synchronous => {
                    sweep_synchronous(&mut self.states, &mut values, discount)
                }
            };
            if report.max_delta <= threshold {
                report.converged = true;
                break;
            }
        }

        if report.converged {
            debug!(
                "value iteration converged after {} sweeps (delta {})",
                report.sweeps, report.max_delta
            );
        } else {
            warn!(
                "value iteration stopped at {} sweeps without converging (delta {} > {})",
                report.sweeps, report.max_delta, threshold
            );
        }
        report
    }

    /// Fraction of (state, action) pairs never taken; 0 for a model without
    /// Q-states.
    pub fn percent_not_taken(&self) -> f64 {
        let (total, not_taken) = self
            .states
            .iter()
            .flat_map(State::qstates)
            .fold((0usize, 0usize), |(total, not_taken), q| {
                (total + 1, not_taken + usize::from(q.num_taken() == 0))
            });
        if total == 0 {
            0.0
        } else {
            not_taken as f64 / total as f64
        }
    }
}

/// Gauss-Seidel sweep: `values` is updated as each state is backed up.
fn sweep_in_place(states: &mut [State], values: &mut [f64], discount: f64) -> f64 {
    let mut max_delta = 0.0_f64;
    for (i, state) in states.iter_mut().enumerate() {
        let old = state.value();
        let new = state.backup(values, discount);
        values[i] = new;
        max_delta = max_delta.max((new - old).abs());
    }
    max_delta
}

/// Jacobi sweep: every state is backed up against the same snapshot.
fn sweep_synchronous(states: &mut [State], values: &mut [f64], discount: f64) -> f64 {
    let snapshot: &[f64] = &*values;
    let new_values: Vec<f64> = states
        .par_iter_mut()
        .map(|state| state.backup(snapshot, discount))
        .collect();

    let max_delta = values
        .iter()
        .zip(&new_values)
        .map(|(old, new)| (new - old).abs())
        .fold(0.0_f64, f64::max);
    values.copy_from_slice(&new_values);
    max_delta
}
