//! Discrete random variables and their finite domains.

use crate::error::{ArgumentError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Dense index of a variable inside a [`crate::Network`].
///
/// Ids are assigned in insertion order and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VarId(pub usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A discrete random variable: a unique name and an ordered list of state labels.
///
/// Cloning is cheap (name and states are shared), so factors carry their scope
/// by value. Two variables are equal when both name and domain agree.
///
/// # Example
///
/// ```rust
/// use bayes_prob::Variable;
///
/// let weather = Variable::new("Weather", ["sunny", "rain", "snow"]).unwrap();
/// assert_eq!(weather.cardinality(), 3);
/// assert_eq!(weather.state_index("rain"), Some(1));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Variable {
    name: Arc<str>,
    states: Arc<[String]>,
}

impl Variable {
    /// Create a variable from its name and ordered state labels.
    ///
    /// # Errors
    ///
    /// Returns an error if the domain is empty or repeats a label.
    pub fn new<I, S>(name: impl Into<String>, states: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name: String = name.into();
        let states: Vec<String> = states.into_iter().map(Into::into).collect();

        if states.is_empty() {
            return Err(ArgumentError::EmptyDomain(name).into());
        }

        let mut seen = HashSet::with_capacity(states.len());
        for state in &states {
            if !seen.insert(state.as_str()) {
                return Err(ArgumentError::DuplicateState {
                    variable: name,
                    state: state.clone(),
                }
                .into());
            }
        }

        Ok(Self {
            name: name.into(),
            states: states.into(),
        })
    }

    /// A variable whose states are labelled "0", "1", ..., "n-1".
    pub fn with_cardinality(name: impl Into<String>, n: usize) -> Result<Self> {
        Self::new(name, (0..n).map(|i| i.to_string()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn states(&self) -> &[String] {
        &self.states
    }

    /// Number of states in the domain.
    pub fn cardinality(&self) -> usize {
        self.states.len()
    }

    /// Position of a state label in the domain.
    pub fn state_index(&self, state: &str) -> Option<usize> {
        self.states.iter().position(|s| s == state)
    }

    /// Label of the state at `index`.
    pub fn state_label(&self, index: usize) -> Option<&str> {
        self.states.get(index).map(String::as_str)
    }

    /// Like [`Variable::state_index`], but reports an unknown state as an error.
    pub fn require_state(&self, state: &str) -> Result<usize> {
        self.state_index(state).ok_or_else(|| {
            ArgumentError::UnknownState {
                variable: self.name().to_string(),
                state: state.to_string(),
            }
            .into()
        })
    }

    /// True if both variables have the same states in the same order.
    pub fn same_domain(&self, other: &Variable) -> bool {
        self.states == other.states
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{{}}}", self.name, self.states.join(", "))
    }
}
