//! Discretization of a single measured dimension.
//!
//! A domain is an ordered list of [`Interval`]s. Discrete domains hold one
//! degenerate interval `[v, v]` per level; bucketed domains are derived from a
//! list of limits `l0 < l1 < ... < ln` as `[l0, l1), [l1, l2), ..., [l(n-1), ln]`,
//! so every value in `[l0, ln]` falls into exactly one bucket.

use crate::error::{Error, Result};
use std::fmt::{Display, Formatter};

/// A numeric range covered by one discrete level of a parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    lower: f64,
    upper: f64,
    upper_closed: bool,
}

impl Interval {
    /// Degenerate interval matching exactly `value`.
    pub fn point(value: f64) -> Self {
        Interval {
            lower: value,
            upper: value,
            upper_closed: true,
        }
    }

    /// Half-open interval `[lower, upper)`.
    pub fn half_open(lower: f64, upper: f64) -> Self {
        Interval {
            lower,
            upper,
            upper_closed: false,
        }
    }

    /// Closed interval `[lower, upper]`.
    pub fn closed(lower: f64, upper: f64) -> Self {
        Interval {
            lower,
            upper,
            upper_closed: true,
        }
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    /// Returns true if `value` lies inside the interval.
    pub fn contains(&self, value: f64) -> bool {
        if value < self.lower {
            return false;
        }
        if self.upper_closed {
            value <= self.upper
        } else {
            value < self.upper
        }
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.lower == self.upper {
            write!(f, "{}", self.lower)
        } else if self.upper_closed {
            write!(f, "[{}, {}]", self.lower, self.upper)
        } else {
            write!(f, "[{}, {})", self.lower, self.upper)
        }
    }
}

/// The discretization of one modeled parameter. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDomain {
    name: String,
    buckets: Vec<Interval>,
}

impl ParameterDomain {
    /// Creates a domain with one exact-match level per value.
    ///
    /// # Errors
    /// Returns `Error::InvalidInput` if `values` is empty, contains a
    /// non-finite number or repeats a value.
    pub fn discrete(name: impl Into<String>, values: &[f64]) -> Result<Self> {
        let name = name.into();
        if values.is_empty() {
            return Err(Error::InvalidInput(format!(
                "parameter `{}` needs at least one value",
                name
            )));
        }
        if let Some(v) = values.iter().find(|v| !v.is_finite()) {
            return Err(Error::InvalidInput(format!(
                "parameter `{}` has non-finite value {}",
                name, v
            )));
        }
        for (i, v) in values.iter().enumerate() {
            if values[..i].contains(v) {
                return Err(Error::InvalidInput(format!(
                    "parameter `{}` repeats value {}",
                    name, v
                )));
            }
        }

        Ok(ParameterDomain {
            name,
            buckets: values.iter().map(|&v| Interval::point(v)).collect(),
        })
    }

    /// Creates a bucketed domain from strictly increasing limits.
    ///
    /// `n + 1` limits produce `n` contiguous buckets; the last bucket is closed
    /// on the right so the top limit itself is covered.
    ///
    /// # Errors
    /// Returns `Error::InvalidInput` if fewer than two limits are given, or
    /// they are not finite and strictly increasing.
    pub fn from_limits(name: impl Into<String>, limits: &[f64]) -> Result<Self> {
        let name = name.into();
        if limits.len() < 2 {
            return Err(Error::InvalidInput(format!(
                "parameter `{}` needs at least two limits, got {}",
                name,
                limits.len()
            )));
        }
        if limits.iter().any(|l| !l.is_finite()) {
            return Err(Error::InvalidInput(format!(
                "parameter `{}` has non-finite limits",
                name
            )));
        }
        if limits.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::InvalidInput(format!(
                "limits of parameter `{}` must be strictly increasing",
                name
            )));
        }

        let last = limits.len() - 2;
        let buckets = limits
            .windows(2)
            .enumerate()
            .map(|(i, w)| {
                if i == last {
                    Interval::closed(w[0], w[1])
                } else {
                    Interval::half_open(w[0], w[1])
                }
            })
            .collect();

        Ok(ParameterDomain { name, buckets })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn buckets(&self) -> &[Interval] {
        &self.buckets
    }

    /// Number of discrete levels.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Index of the level containing `value`, if any.
    pub fn bucket_of(&self, value: f64) -> Option<usize> {
        self.buckets.iter().position(|b| b.contains(value))
    }

    /// Smallest value covered by the domain.
    pub fn min_value(&self) -> f64 {
        self.buckets
            .iter()
            .map(Interval::lower)
            .fold(f64::INFINITY, f64::min)
    }

    /// Largest value covered by the domain.
    pub fn max_value(&self) -> f64 {
        self.buckets
            .iter()
            .map(Interval::upper)
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discrete_levels_match_exactly() {
        let d = ParameterDomain::discrete("number_of_VMs", &[1.0, 2.0, 4.0]).unwrap();
        assert_eq!(d.len(), 3);
        assert_eq!(d.bucket_of(2.0), Some(1));
        assert_eq!(d.bucket_of(3.0), None);
        assert_eq!(d.min_value(), 1.0);
        assert_eq!(d.max_value(), 4.0);
    }

    #[test]
    fn test_limits_partition_range() {
        let d = ParameterDomain::from_limits("load", &[0.0, 10.0, 20.0]).unwrap();
        assert_eq!(d.len(), 2);
        assert_eq!(d.bucket_of(0.0), Some(0));
        assert_eq!(d.bucket_of(9.99), Some(0));
        // Shared boundary belongs to the upper bucket only
        assert_eq!(d.bucket_of(10.0), Some(1));
        // Top limit is covered by the last bucket
        assert_eq!(d.bucket_of(20.0), Some(1));
        assert_eq!(d.bucket_of(20.5), None);
        assert_eq!(d.bucket_of(-0.1), None);
    }

    #[test]
    fn test_invalid_domains_rejected() {
        assert!(matches!(
            ParameterDomain::discrete("x", &[]),
            Err(Error::InvalidInput(_))
        ));
        assert!(ParameterDomain::discrete("x", &[1.0, 1.0]).is_err());
        assert!(ParameterDomain::discrete("x", &[f64::NAN]).is_err());
        assert!(ParameterDomain::from_limits("x", &[1.0]).is_err());
        assert!(ParameterDomain::from_limits("x", &[0.0, 5.0, 5.0]).is_err());
        assert!(ParameterDomain::from_limits("x", &[3.0, 1.0]).is_err());
    }

    #[test]
    fn test_interval_display() {
        assert_eq!(Interval::point(3.0).to_string(), "3");
        assert_eq!(Interval::half_open(0.0, 5.0).to_string(), "[0, 5)");
        assert_eq!(Interval::closed(5.0, 10.0).to_string(), "[5, 10]");
    }
}
