//! A point of the discretized state space and its legal Q-states.

use crate::mdp::parameter::Interval;
use crate::mdp::qstate::{Action, QState};
use std::fmt::{Display, Formatter, Write};

/// One discretized operating point.
///
/// `value` and the best Q-state are derived data: they are refreshed only by
/// [`State::recompute_value`]. Reading them after mutating a Q-state without
/// a recompute observes the previous maximum.
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    index: usize,
    parameters: Vec<(String, Interval)>,
    value: f64,
    visits: u64,
    qstates: Vec<QState>,
    best: Option<usize>,
}

impl State {
    pub fn new(index: usize, parameters: Vec<(String, Interval)>) -> Self {
        State {
            index,
            parameters,
            value: 0.0,
            visits: 0,
            qstates: Vec::new(),
            best: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Parameter assignment, one entry per modeled dimension.
    pub fn parameters(&self) -> &[(String, Interval)] {
        &self.parameters
    }

    /// The level this state takes for parameter `name`.
    pub fn parameter(&self, name: &str) -> Option<&Interval> {
        self.parameters
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, interval)| interval)
    }

    /// Value as of the last [`State::recompute_value`].
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn visit_count(&self) -> u64 {
        self.visits
    }

    pub(crate) fn visit(&mut self) {
        self.visits += 1;
    }

    /// Appends a Q-state. The first one added becomes the provisional best.
    pub fn add_qstate(&mut self, qstate: QState) {
        self.qstates.push(qstate);
        if self.best.is_none() {
            self.best = Some(0);
        }
    }

    pub fn qstates(&self) -> &[QState] {
        &self.qstates
    }

    pub fn qstate(&self, action: &Action) -> Option<&QState> {
        self.qstates.iter().find(|q| q.action() == action)
    }

    pub fn qstate_mut(&mut self, action: &Action) -> Option<&mut QState> {
        self.qstates.iter_mut().find(|q| q.action() == action)
    }

    /// Sets `value` to the largest Q-value and records the Q-state reaching
    /// it. Ties go to the earliest Q-state. A state without Q-states has
    /// value 0.
    pub fn recompute_value(&mut self) {
        let mut best: Option<(usize, f64)> = None;
        for (i, q) in self.qstates.iter().enumerate() {
            let better = match best {
                Some((_, v)) => q.qvalue() > v,
                None => true,
            };
            if better {
                best = Some((i, q.qvalue()));
            }
        }
        self.best = best.map(|(i, _)| i);
        self.value = best.map_or(0.0, |(_, v)| v);
    }

    /// Runs a Bellman backup on every Q-state against `values`, then
    /// recomputes the state value. Returns the new value.
    pub(crate) fn backup(&mut self, values: &[f64], discount: f64) -> f64 {
        for q in self.qstates.iter_mut() {
            let qvalue = q.bellman_backup(values, discount);
            q.set_qvalue(qvalue);
        }
        self.recompute_value();
        self.value
    }

    pub fn best_qstate(&self) -> Option<&QState> {
        self.best.map(|i| &self.qstates[i])
    }

    /// The greedy action as of the last recompute.
    pub fn optimal_action(&self) -> Option<&Action> {
        self.best_qstate().map(QState::action)
    }

    pub fn best_action_num_taken(&self) -> u64 {
        self.best_qstate().map_or(0, QState::num_taken)
    }

    /// Actions legal from this state, in insertion order.
    pub fn legal_actions(&self) -> Vec<Action> {
        self.qstates.iter().map(|q| q.action().clone()).collect()
    }

    /// Multi-line dump of the state with its visit count and Q-states.
    pub fn detailed(&self) -> String {
        let mut out = format!("{}, visited: {}\n", self, self.visits);
        for q in &self.qstates {
            let _ = writeln!(out, "{}", q);
        }
        out
    }
}

impl Display for State {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: [", self.index)?;
        for (i, (name, interval)) in self.parameters.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "({},{})", name, interval)?;
        }
        write!(f, "]")
    }
}
