//! Empirical model of one (state, action) pair.

use std::fmt::{Display, Formatter};

/// A named decision with a magnitude, e.g. `add_VMs(2)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Action {
    pub name: String,
    pub magnitude: i64,
}

impl Action {
    pub fn new(name: impl Into<String>, magnitude: i64) -> Self {
        Action {
            name: name.into(),
            magnitude,
        }
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.magnitude)
    }
}

/// Transition counts, reward sums and the current Q-value estimate for one
/// action taken from one state.
///
/// Statistics are purely additive: every observation is kept for the
/// lifetime of the model, so memory grows with `|States|` per Q-state but
/// never with the number of observations.
///
/// Invariant: `num_taken == transitions.iter().sum()`.
#[derive(Debug, Clone, PartialEq)]
pub struct QState {
    action: Action,
    num_taken: u64,
    qvalue: f64,
    transitions: Vec<u64>,
    rewards: Vec<f64>,
}

impl QState {
    /// Creates a Q-state with zeroed statistics over `num_states` destinations.
    pub fn new(action: Action, num_states: usize, initial_qvalue: f64) -> Self {
        QState {
            action,
            num_taken: 0,
            qvalue: initial_qvalue,
            transitions: vec![0; num_states],
            rewards: vec![0.0; num_states],
        }
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    pub fn qvalue(&self) -> f64 {
        self.qvalue
    }

    pub fn set_qvalue(&mut self, qvalue: f64) {
        self.qvalue = qvalue;
    }

    /// Number of times the action was executed from the owning state.
    pub fn num_taken(&self) -> u64 {
        self.num_taken
    }

    /// Number of destinations tracked (the size of the state space).
    pub fn num_states(&self) -> usize {
        self.transitions.len()
    }

    pub fn transitions(&self) -> &[u64] {
        &self.transitions
    }

    pub fn rewards(&self) -> &[f64] {
        &self.rewards
    }

    pub fn num_transitions(&self, destination: usize) -> u64 {
        self.transitions[destination]
    }

    pub fn has_transition(&self, destination: usize) -> bool {
        self.transitions[destination] > 0
    }

    /// Records one observed transition into `destination` with `reward`.
    ///
    /// # Panics
    /// Panics if `destination >= self.num_states()`.
    pub fn record_observation(&mut self, destination: usize, reward: f64) {
        self.transitions[destination] += 1;
        self.rewards[destination] += reward;
        self.num_taken += 1;
    }

    /// Estimated probability of landing in `destination`.
    ///
    /// Falls back to the uniform prior `1 / |States|` while the action has
    /// never been taken.
    pub fn transition_probability(&self, destination: usize) -> f64 {
        if self.num_taken == 0 {
            1.0 / self.transitions.len() as f64
        } else {
            self.transitions[destination] as f64 / self.num_taken as f64
        }
    }

    /// Mean reward observed when landing in `destination`, 0 if never seen.
    pub fn expected_reward(&self, destination: usize) -> f64 {
        match self.transitions[destination] {
            0 => 0.0,
            n => self.rewards[destination] / n as f64,
        }
    }

    /// Bellman backup against the given state values:
    /// `sum_j P(j) * (R(j) + discount * values[j])`.
    ///
    /// Does not store the result.
    pub fn bellman_backup(&self, values: &[f64], discount: f64) -> f64 {
        debug_assert_eq!(values.len(), self.transitions.len());
        values
            .iter()
            .enumerate()
            .map(|(j, &v)| self.transition_probability(j) * (self.expected_reward(j) + discount * v))
            .sum()
    }
}

impl Display for QState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Action: {}\tQ-value: {}\tTaken: {}",
            self.action, self.qvalue, self.num_taken
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn qstate(num_states: usize) -> QState {
        QState::new(Action::new("add_VMs", 1), num_states, 0.0)
    }

    #[test]
    fn test_untaken_uses_uniform_prior() {
        let q = qstate(4);
        for j in 0..4 {
            assert_abs_diff_eq!(q.transition_probability(j), 0.25);
            assert_eq!(q.expected_reward(j), 0.0);
        }
    }

    #[test]
    fn test_record_observation_keeps_counts_consistent() {
        let mut q = qstate(3);
        q.record_observation(2, 1.0);
        q.record_observation(2, 3.0);
        q.record_observation(0, -1.0);

        assert_eq!(q.num_taken(), 3);
        assert_eq!(q.num_taken(), q.transitions().iter().sum::<u64>());
        assert_eq!(q.num_transitions(2), 2);
        assert!(!q.has_transition(1));
        assert_abs_diff_eq!(q.expected_reward(2), 2.0);
        assert_abs_diff_eq!(q.expected_reward(0), -1.0);
        assert_abs_diff_eq!(q.transition_probability(2), 2.0 / 3.0);
        assert_eq!(q.transition_probability(1), 0.0);

        let total: f64 = (0..3).map(|j| q.transition_probability(j)).sum();
        assert_abs_diff_eq!(total, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_bellman_backup() {
        let mut q = qstate(2);
        q.record_observation(0, 1.0);
        q.record_observation(1, 3.0);
        // 0.5 * (1 + 0.5 * 10) + 0.5 * (3 + 0.5 * 20) = 3 + 6.5
        let backup = q.bellman_backup(&[10.0, 20.0], 0.5);
        assert_abs_diff_eq!(backup, 9.5, epsilon = 1e-12);
        // Backup does not write the Q-value
        assert_eq!(q.qvalue(), 0.0);
    }

    #[test]
    fn test_bellman_backup_untaken_averages_values() {
        let q = qstate(2);
        assert_abs_diff_eq!(q.bellman_backup(&[2.0, 4.0], 0.5), 1.5, epsilon = 1e-12);
    }

    #[test]
    #[should_panic]
    fn test_out_of_range_destination_panics() {
        let mut q = qstate(2);
        q.record_observation(2, 0.0);
    }

    #[test]
    fn test_display() {
        let mut q = qstate(1);
        q.set_qvalue(1.5);
        assert_eq!(q.to_string(), "Action: add_VMs(1)\tQ-value: 1.5\tTaken: 0");
    }
}
