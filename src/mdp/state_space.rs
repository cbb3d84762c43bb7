//! Enumeration of the discretized state space.
//!
//! States are the Cartesian product of the parameter domains, numbered from 0
//! with the **first domain varying fastest**: for domains `d0, d1, ...` with
//! level indices `b0, b1, ...` the state index is
//! `b0 + |d0| * (b1 + |d1| * (b2 + ...))`.

use crate::mdp::parameter::ParameterDomain;
use crate::mdp::state::State;

/// Builds every state of the product space, without Q-states.
///
/// With no domains the result is a single state with an empty parameter
/// assignment.
pub fn build_state_space(domains: &[ParameterDomain]) -> Vec<State> {
    let mut assignments = vec![Vec::new()];

    for domain in domains {
        let mut next = Vec::with_capacity(assignments.len() * domain.len());
        for bucket in domain.buckets() {
            for assignment in &assignments {
                let mut extended = assignment.clone();
                extended.push((domain.name().to_string(), *bucket));
                next.push(extended);
            }
        }
        assignments = next;
    }

    assignments
        .into_iter()
        .enumerate()
        .map(|(index, parameters)| State::new(index, parameters))
        .collect()
}

/// Number of states the product of `domains` produces.
pub fn num_states(domains: &[ParameterDomain]) -> usize {
    domains.iter().map(ParameterDomain::len).product()
}

/// State index for one level index per domain, in domain order.
///
/// # Panics
/// Panics in debug builds if `levels` does not have one entry per domain.
pub fn state_index(domains: &[ParameterDomain], levels: &[usize]) -> usize {
    debug_assert_eq!(domains.len(), levels.len());
    domains
        .iter()
        .zip(levels)
        .rev()
        .fold(0, |acc, (domain, &level)| acc * domain.len() + level)
}
