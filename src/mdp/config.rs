//! Model configuration.
//!
//! A [`ModelConfig`] is usually read from JSON:
//!
//! ```
//! use elastic_mdp::mdp::ModelConfig;
//!
//! let conf = ModelConfig::from_json_str(r#"{
//!     "parameters": {
//!         "number_of_VMs": { "values": [1, 2, 3] },
//!         "load": { "limits": [0, 50, 100] }
//!     },
//!     "actions": { "add_VMs": [1], "remove_VMs": [1], "no_op": [0] },
//!     "discount": 0.5,
//!     "initial_qvalues": 0.0
//! }"#).unwrap();
//!
//! assert_eq!(conf.domains().unwrap().len(), 2);
//! assert_eq!(conf.action_list().len(), 3);
//! ```
//!
//! JSON objects are unordered, so parameters and actions are taken in
//! lexicographic key order.

use crate::error::{Error, Result};
use crate::mdp::parameter::ParameterDomain;
use crate::mdp::qstate::Action;
use crate::mdp::{ADD_VMS, NUMBER_OF_VMS, REMOVE_VMS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;

const DEFAULT_UPDATE_ERROR: f64 = 0.01;
const DEFAULT_MAX_UPDATES: usize = 100;

/// How value iteration applies updated state values within one sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepMode {
    /// Gauss-Seidel: a state's new value is visible to the states swept after
    /// it in the same sweep.
    #[default]
    InPlace,
    /// Jacobi: every state reads the values of the previous sweep. Q-values
    /// are computed in parallel.
    Synchronous,
}

/// Numeric settings of the solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverSettings {
    /// Discount applied to future value, in `[0, 1)`
    pub discount: f64,
    /// Q-value every (state, action) pair starts from
    pub initial_qvalue: f64,
    /// Largest per-state change that still counts as converged
    pub convergence_threshold: f64,
    /// Cap on the number of sweeps per value iteration
    pub max_iterations: usize,
    pub sweep: SweepMode,
}

impl SolverSettings {
    pub fn new(discount: f64) -> Self {
        SolverSettings {
            discount,
            initial_qvalue: 0.0,
            convergence_threshold: DEFAULT_UPDATE_ERROR,
            max_iterations: DEFAULT_MAX_UPDATES,
            sweep: SweepMode::InPlace,
        }
    }

    pub fn with_initial_qvalue(mut self, initial_qvalue: f64) -> Self {
        self.initial_qvalue = initial_qvalue;
        self
    }

    pub fn with_convergence_threshold(mut self, threshold: f64) -> Self {
        self.convergence_threshold = threshold;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_sweep(mut self, sweep: SweepMode) -> Self {
        self.sweep = sweep;
        self
    }

    /// Checks the ranges of every setting.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.discount) {
            return Err(Error::InvalidInput(format!(
                "discount must be in [0, 1), got {}",
                self.discount
            )));
        }
        if !self.initial_qvalue.is_finite() {
            return Err(Error::InvalidInput(format!(
                "initial Q-value must be finite, got {}",
                self.initial_qvalue
            )));
        }
        validate_threshold(self.convergence_threshold)?;
        if self.max_iterations == 0 {
            return Err(Error::InvalidInput(
                "max_iterations must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

pub(crate) fn validate_threshold(threshold: f64) -> Result<()> {
    if threshold.is_nan() || threshold < 0.0 {
        return Err(Error::InvalidInput(format!(
            "convergence threshold must be non-negative, got {}",
            threshold
        )));
    }
    Ok(())
}

/// Discretization of one parameter: either explicit levels or bucket limits.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParameterSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<Vec<f64>>,
}

impl ParameterSpec {
    pub fn values(values: Vec<f64>) -> Self {
        ParameterSpec {
            values: Some(values),
            limits: None,
        }
    }

    pub fn limits(limits: Vec<f64>) -> Self {
        ParameterSpec {
            values: None,
            limits: Some(limits),
        }
    }

    /// Builds the domain for parameter `name`.
    pub fn to_domain(&self, name: &str) -> Result<ParameterDomain> {
        match (&self.values, &self.limits) {
            (Some(values), None) => ParameterDomain::discrete(name, values),
            (None, Some(limits)) => ParameterDomain::from_limits(name, limits),
            (Some(_), Some(_)) => Err(Error::InvalidConfig(format!(
                "parameter `{}` has both `values` and `limits`",
                name
            ))),
            (None, None) => Err(Error::InvalidConfig(format!(
                "parameter `{}` has neither `values` nor `limits`",
                name
            ))),
        }
    }
}

/// Full description of a model: parameters, actions and solver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub parameters: BTreeMap<String, ParameterSpec>,
    /// Action name to the magnitudes it is offered with
    pub actions: BTreeMap<String, Vec<i64>>,
    pub discount: f64,
    pub initial_qvalues: f64,
    #[serde(default = "default_update_error")]
    pub update_error: f64,
    #[serde(default = "default_max_updates")]
    pub max_updates: usize,
    #[serde(default)]
    pub sweep: SweepMode,
}

fn default_update_error() -> f64 {
    DEFAULT_UPDATE_ERROR
}

fn default_max_updates() -> usize {
    DEFAULT_MAX_UPDATES
}

impl ModelConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        serde_json::from_reader(reader).map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    /// Parameter domains in key order.
    pub fn domains(&self) -> Result<Vec<ParameterDomain>> {
        self.parameters
            .iter()
            .map(|(name, spec)| spec.to_domain(name))
            .collect()
    }

    /// Every (name, magnitude) action, ordered by name then by listed magnitude.
    pub fn action_list(&self) -> Vec<Action> {
        self.actions
            .iter()
            .flat_map(|(name, magnitudes)| magnitudes.iter().map(move |&m| Action::new(name.clone(), m)))
            .collect()
    }

    pub fn settings(&self) -> SolverSettings {
        SolverSettings::new(self.discount)
            .with_initial_qvalue(self.initial_qvalues)
            .with_convergence_threshold(self.update_error)
            .with_max_iterations(self.max_updates)
            .with_sweep(self.sweep)
    }

    /// Checks the cross-field requirements serde cannot express.
    pub fn validate(&self) -> Result<()> {
        let scales_vms = self.actions.contains_key(ADD_VMS) || self.actions.contains_key(REMOVE_VMS);
        if scales_vms && !self.parameters.contains_key(NUMBER_OF_VMS) {
            return Err(Error::InvalidConfig(format!(
                "`{}`/`{}` actions require a `{}` parameter",
                ADD_VMS, REMOVE_VMS, NUMBER_OF_VMS
            )));
        }
        self.settings().validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONF: &str = r#"{
        "parameters": {
            "number_of_VMs": { "values": [1, 2, 3] },
            "load": { "limits": [0, 50, 100] }
        },
        "actions": { "remove_VMs": [1], "add_VMs": [1, 2], "no_op": [0] },
        "discount": 0.5,
        "initial_qvalues": 1.5
    }"#;

    #[test]
    fn test_parse_with_defaults() {
        let conf = ModelConfig::from_json_str(CONF).unwrap();
        conf.validate().unwrap();

        let settings = conf.settings();
        assert_eq!(settings.discount, 0.5);
        assert_eq!(settings.initial_qvalue, 1.5);
        assert_eq!(settings.convergence_threshold, 0.01);
        assert_eq!(settings.max_iterations, 100);
        assert_eq!(settings.sweep, SweepMode::InPlace);
    }

    #[test]
    fn test_keys_are_taken_in_sorted_order() {
        let conf = ModelConfig::from_json_str(CONF).unwrap();
        let names: Vec<String> = conf
            .domains()
            .unwrap()
            .iter()
            .map(|d| d.name().to_string())
            .collect();
        assert_eq!(names, vec!["load", "number_of_VMs"]);
        assert_eq!(
            conf.action_list(),
            vec![
                Action::new("add_VMs", 1),
                Action::new("add_VMs", 2),
                Action::new("no_op", 0),
                Action::new("remove_VMs", 1),
            ]
        );
    }

    #[test]
    fn test_missing_required_field() {
        for field in ["parameters", "actions", "discount", "initial_qvalues"] {
            let mut value: serde_json::Value = serde_json::from_str(CONF).unwrap();
            value.as_object_mut().unwrap().remove(field);
            match ModelConfig::from_value(value) {
                Err(Error::InvalidConfig(msg)) => assert!(msg.contains(field), "{}", msg),
                other => panic!("expected config error for {}, got {:?}", field, other),
            }
        }
    }

    #[test]
    fn test_malformed_parameter_spec() {
        let both = ParameterSpec {
            values: Some(vec![1.0]),
            limits: Some(vec![0.0, 1.0]),
        };
        assert!(matches!(both.to_domain("x"), Err(Error::InvalidConfig(_))));
        assert!(matches!(
            ParameterSpec::default().to_domain("x"),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_vm_actions_need_vm_parameter() {
        let conf = ModelConfig::from_json_str(
            r#"{
                "parameters": { "load": { "limits": [0, 1] } },
                "actions": { "add_VMs": [1] },
                "discount": 0.5,
                "initial_qvalues": 0
            }"#,
        )
        .unwrap();
        assert!(matches!(conf.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_optional_fields_and_reader() {
        let json = r#"{
            "parameters": {},
            "actions": { "no_op": [0] },
            "discount": 0.9,
            "initial_qvalues": 0,
            "update_error": 0.1,
            "max_updates": 7,
            "sweep": "synchronous"
        }"#;
        let conf = ModelConfig::from_reader(json.as_bytes()).unwrap();
        let settings = conf.settings();
        assert_eq!(settings.convergence_threshold, 0.1);
        assert_eq!(settings.max_iterations, 7);
        assert_eq!(settings.sweep, SweepMode::Synchronous);
        assert!(conf.domains().unwrap().is_empty());
    }

    #[test]
    fn test_settings_validation() {
        assert!(SolverSettings::new(0.0).validate().is_ok());
        assert!(SolverSettings::new(1.0).validate().is_err());
        assert!(SolverSettings::new(-0.1).validate().is_err());
        assert!(SolverSettings::new(0.5)
            .with_convergence_threshold(-1.0)
            .validate()
            .is_err());
        assert!(SolverSettings::new(0.5)
            .with_max_iterations(0)
            .validate()
            .is_err());
        assert!(ModelConfig::from_json_str("{ not json").is_err());
    }
}
