//! Observed variable states.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A partial assignment: variable name → observed state label.
///
/// Holds at most one state per variable; inserting again replaces the earlier
/// observation. Names and states are checked against a network only when the
/// evidence is used in a query.
///
/// # Example
///
/// ```rust
/// use bayes_prob::Evidence;
///
/// let e = Evidence::new().with("Weather", "rain").with("Accident", "yes");
/// assert_eq!(e.get("Weather"), Some("rain"));
/// assert_eq!(e.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Evidence(BTreeMap<String, String>);

impl Evidence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Evidence::insert`].
    pub fn with(mut self, variable: impl Into<String>, state: impl Into<String>) -> Self {
        self.insert(variable, state);
        self
    }

    /// Observe `variable` in `state`, returning the previous observation if any.
    pub fn insert(
        &mut self,
        variable: impl Into<String>,
        state: impl Into<String>,
    ) -> Option<String> {
        self.0.insert(variable.into(), state.into())
    }

    pub fn remove(&mut self, variable: &str) -> Option<String> {
        self.0.remove(variable)
    }

    pub fn get(&self, variable: &str) -> Option<&str> {
        self.0.get(variable).map(String::as_str)
    }

    pub fn contains(&self, variable: &str) -> bool {
        self.0.contains_key(variable)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Observations in variable-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Evidence {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for Evidence {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_state_per_variable() {
        let mut e = Evidence::new();
        assert_eq!(e.insert("Accident", "yes"), None);
        assert_eq!(e.insert("Accident", "no"), Some("yes".to_string()));
        assert_eq!(e.len(), 1);
        assert_eq!(e.get("Accident"), Some("no"));
    }

    #[test]
    fn test_from_pairs() {
        let e = Evidence::from([("T_Harry", "no"), ("T_Charles", "yes")]);
        let pairs: Vec<(&str, &str)> = e.iter().collect();
        assert_eq!(pairs, vec![("T_Charles", "yes"), ("T_Harry", "no")]);
    }

    #[test]
    fn test_serde_as_plain_map() {
        let e = Evidence::new().with("Weather", "rain");
        let json = serde_json::to_string(&e).unwrap();
        assert_eq!(json, r#"{"Weather":"rain"}"#);
        let back: Evidence = serde_json::from_str(&json).unwrap();
        assert_eq!(back, e);
    }
}
