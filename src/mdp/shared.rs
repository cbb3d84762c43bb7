//! Thread-safe handle around a single [`MdpModel`].
//!
//! Every call takes the one lock guarding the whole model, so an `update`
//! (including its value iteration) is never interleaved with another call.

use crate::error::Result;
use crate::mdp::model::{Measurement, MdpModel, ValueIterationReport};
use crate::mdp::qstate::Action;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

/// Cloneable, lock-protected model handle.
#[derive(Debug, Clone)]
pub struct SharedModel {
    inner: Arc<Mutex<MdpModel>>,
}

impl SharedModel {
    pub fn new(model: MdpModel) -> Self {
        SharedModel {
            inner: Arc::new(Mutex::new(model)),
        }
    }

    pub fn update(
        &self,
        action: &Action,
        measurement: &Measurement,
        reward: f64,
    ) -> Result<ValueIterationReport> {
        self.inner.lock().update(action, measurement, reward)
    }

    pub fn set_state(&self, measurement: &Measurement) -> Result<()> {
        self.inner.lock().set_state(measurement)
    }

    pub fn suggest_action(&self) -> Option<Action> {
        self.inner.lock().suggest_action().cloned()
    }

    pub fn legal_actions(&self) -> Vec<Action> {
        self.inner.lock().legal_actions()
    }

    pub fn value_iteration(&self) -> ValueIterationReport {
        self.inner.lock().value_iteration()
    }

    pub fn percent_not_taken(&self) -> f64 {
        self.inner.lock().percent_not_taken()
    }

    /// Exclusive access for reads or calls not mirrored on the handle.
    pub fn lock(&self) -> MutexGuard<'_, MdpModel> {
        self.inner.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mdp::config::SolverSettings;
    use crate::mdp::parameter::ParameterDomain;
    use std::thread;

    #[test]
    fn test_updates_from_many_threads_are_all_recorded() {
        let domains = vec![ParameterDomain::discrete("x", &[0.0]).unwrap()];
        let action = Action::new("no_op", 0);
        let model =
            MdpModel::from_domains(domains, &[action.clone()], SolverSettings::new(0.5)).unwrap();
        let shared = SharedModel::new(model);

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let shared = shared.clone();
                let action = action.clone();
                thread::spawn(move || {
                    let m: Measurement = [("x".to_string(), 0.0)].into_iter().collect();
                    for _ in 0..25 {
                        shared.update(&action, &m, t as f64).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let model = shared.lock();
        let q = model.current_state().qstate(&action).unwrap();
        assert_eq!(q.num_taken(), 100);
        assert_eq!(q.transitions().iter().sum::<u64>(), 100);
        assert_eq!(model.current_state().visit_count(), 100);
        drop(model);

        assert_eq!(shared.suggest_action(), Some(action.clone()));
        assert_eq!(shared.legal_actions(), vec![action]);
        assert_eq!(shared.percent_not_taken(), 0.0);
        assert!(shared.value_iteration().converged);
    }
}
