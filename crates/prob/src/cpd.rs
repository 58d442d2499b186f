//! Conditional probability tables.
//!
//! A [`TabularCpd`] represents P(child | parents) as a [`Factor`] whose scope is
//! `[child, parent₁, ..., parentₖ]`. Because the child comes first, the table is
//! child-major: one row per child state, one column per parent combination.
//!
//! ```text
//!                  | Weather=sunny | Weather=rain | Weather=snow |
//! Accident=yes     |      0.1      |     0.2      |     0.4      |
//! Accident=no      |      0.9      |     0.8      |     0.6      |
//! ```
//!
//! Parent combinations are encoded row-major (the last parent varies fastest).

use crate::error::{ArgumentError, NumericError, Result};
use crate::factor::Factor;
use crate::variable::Variable;

/// P(child | parents) as a conditional probability table.
///
/// Construction only checks the table's shape. The per-column "sums to 1"
/// invariant is enforced by [`TabularCpd::check_normalized`], which
/// [`crate::Network::check`] runs for every attached CPD.
#[derive(Debug, Clone, PartialEq)]
pub struct TabularCpd {
    factor: Factor,
    n_parent_configs: usize,
}

impl TabularCpd {
    /// Create a CPD from a child-major table.
    ///
    /// `table[s][c]` = P(child = s | parents = combination c).
    ///
    /// # Example
    ///
    /// ```rust
    /// use bayes_prob::{TabularCpd, Variable};
    ///
    /// let weather = Variable::new("Weather", ["sunny", "rain", "snow"]).unwrap();
    /// let accident = Variable::new("Accident", ["yes", "no"]).unwrap();
    ///
    /// let cpd = TabularCpd::new(
    ///     accident,
    ///     vec![weather],
    ///     vec![
    ///         vec![0.1, 0.2, 0.4], // yes
    ///         vec![0.9, 0.8, 0.6], // no
    ///     ],
    /// )
    /// .unwrap();
    ///
    /// assert!((cpd.prob(0, &[1]) - 0.2).abs() < 1e-12);
    /// ```
    pub fn new(child: Variable, parents: Vec<Variable>, table: Vec<Vec<f64>>) -> Result<Self> {
        let n_parent_configs: usize = parents.iter().map(Variable::cardinality).product();

        if table.len() != child.cardinality() {
            return Err(ArgumentError::ShapeMismatch {
                expected: child.cardinality(),
                got: table.len(),
            }
            .into());
        }
        if let Some(row) = table.iter().find(|row| row.len() != n_parent_configs) {
            return Err(ArgumentError::ShapeMismatch {
                expected: n_parent_configs,
                got: row.len(),
            }
            .into());
        }

        let mut scope = Vec::with_capacity(parents.len() + 1);
        scope.push(child);
        scope.extend(parents);

        let values = table.into_iter().flatten().collect();
        Ok(Self {
            factor: Factor::new(scope, values)?,
            n_parent_configs,
        })
    }

    /// Create a prior P(child) for a root variable.
    pub fn prior(child: Variable, probs: Vec<f64>) -> Result<Self> {
        let table = probs.into_iter().map(|p| vec![p]).collect();
        Self::new(child, Vec::new(), table)
    }

    /// Build a CPD from a function of the parent states.
    ///
    /// `f` receives the state indices of one parent combination (in parent
    /// order) and returns the distribution over the child's domain.
    ///
    /// # Errors
    ///
    /// Returns an error if any returned vector has the wrong length or holds an
    /// invalid weight. Normalization is checked later by `Network::check`.
    pub fn from_fn<F>(child: Variable, parents: Vec<Variable>, mut f: F) -> Result<Self>
    where
        F: FnMut(&[usize]) -> Vec<f64>,
    {
        let n_child = child.cardinality();
        let parent_cards: Vec<usize> = parents.iter().map(Variable::cardinality).collect();
        let n_parent_configs: usize = parent_cards.iter().product();

        let mut table = vec![vec![0.0; n_parent_configs]; n_child];
        for c in 0..n_parent_configs {
            let parent_states = decode(&parent_cards, c);
            let column = f(&parent_states);
            if column.len() != n_child {
                return Err(ArgumentError::ShapeMismatch {
                    expected: n_child,
                    got: column.len(),
                }
                .into());
            }
            for (s, p) in column.into_iter().enumerate() {
                table[s][c] = p;
            }
        }

        Self::new(child, parents, table)
    }

    /// The variable this CPD defines.
    pub fn child(&self) -> &Variable {
        &self.factor.scope()[0]
    }

    /// Conditioning variables, in table order.
    pub fn parents(&self) -> &[Variable] {
        &self.factor.scope()[1..]
    }

    /// The CPD as a factor over `[child, parents...]`.
    pub fn factor(&self) -> &Factor {
        &self.factor
    }

    pub fn into_factor(self) -> Factor {
        self.factor
    }

    /// Number of parent combinations (columns).
    pub fn n_parent_configs(&self) -> usize {
        self.n_parent_configs
    }

    /// Encode parent states into a column index (row-major order).
    ///
    /// For parents with states [s0, s1], values [v0, v1] encodes as:
    /// idx = v0 * s1 + v1
    pub fn encode_parents(&self, parent_values: &[usize]) -> usize {
        let mut idx = 0;
        for (p, &val) in self.parents().iter().zip(parent_values) {
            idx = idx * p.cardinality() + val;
        }
        idx
    }

    /// Decode a column index into individual parent states.
    pub fn decode_parents(&self, idx: usize) -> Vec<usize> {
        let cards: Vec<usize> = self.parents().iter().map(Variable::cardinality).collect();
        decode(&cards, idx)
    }

    /// P(child = state | parents = parent_values).
    pub fn prob(&self, state: usize, parent_values: &[usize]) -> f64 {
        let column = self.encode_parents(parent_values);
        self.factor.values()[state * self.n_parent_configs + column]
    }

    /// The distribution over the child's domain for one parent combination.
    ///
    /// Equivalent to reducing the factor on every parent, without allocating
    /// intermediate factors.
    pub fn conditional(&self, parent_values: &[usize]) -> impl Iterator<Item = f64> + '_ {
        let column = self.encode_parents(parent_values);
        let stride = self.n_parent_configs;
        self.factor
            .values()
            .iter()
            .skip(column)
            .step_by(stride)
            .copied()
    }

    /// Check that every column sums to 1 within `tolerance`.
    pub fn check_normalized(&self, tolerance: f64) -> Result<()> {
        for c in 0..self.n_parent_configs {
            let parent_values = self.decode_parents(c);
            let sum: f64 = self.conditional(&parent_values).sum();
            if (sum - 1.0).abs() > tolerance {
                let parents = self
                    .parents()
                    .iter()
                    .zip(&parent_values)
                    .map(|(p, &s)| format!("{}={}", p.name(), p.state_label(s).unwrap_or("?")))
                    .collect();
                return Err(NumericError::CpdNotNormalized {
                    variable: self.child().name().to_string(),
                    parents,
                    sum,
                }
                .into());
            }
        }
        Ok(())
    }
}

/// Decode a row-major index over `cards` into per-position states.
fn decode(cards: &[usize], mut idx: usize) -> Vec<usize> {
    let mut values = vec![0; cards.len()];
    for i in (0..cards.len()).rev() {
        values[i] = idx % cards[i];
        idx /= cards[i];
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PgmError;
    use crate::PROB_TOLERANCE;

    fn binary(name: &str) -> Variable {
        Variable::new(name, ["yes", "no"]).unwrap()
    }

    fn weather() -> Variable {
        Variable::new("Weather", ["sunny", "rain", "snow"]).unwrap()
    }

    #[test]
    fn test_parent_encoding() {
        let cpd = TabularCpd::new(
            binary("Jam"),
            vec![binary("Accident"), weather()],
            vec![
                vec![0.6, 0.8, 0.9, 0.2, 0.5, 0.7],
                vec![0.4, 0.2, 0.1, 0.8, 0.5, 0.3],
            ],
        )
        .unwrap();

        assert_eq!(cpd.n_parent_configs(), 6);
        assert_eq!(cpd.encode_parents(&[0, 0]), 0);
        assert_eq!(cpd.encode_parents(&[0, 2]), 2);
        assert_eq!(cpd.encode_parents(&[1, 0]), 3);
        assert_eq!(cpd.decode_parents(4), vec![1, 1]);

        // P(Jam=yes | Accident=no, Weather=rain) = 0.5
        assert!((cpd.prob(0, &[1, 1]) - 0.5).abs() < PROB_TOLERANCE);
        // P(Jam=no | Accident=yes, Weather=snow) = 0.1
        assert!((cpd.prob(1, &[0, 2]) - 0.1).abs() < PROB_TOLERANCE);
    }

    #[test]
    fn test_factor_view_matches_table() {
        let cpd = TabularCpd::new(
            binary("Accident"),
            vec![weather()],
            vec![vec![0.1, 0.2, 0.4], vec![0.9, 0.8, 0.6]],
        )
        .unwrap();

        let f = cpd.factor();
        assert_eq!(f.names(), vec!["Accident", "Weather"]);
        let v = f.value_of(&[("Accident", "no"), ("Weather", "snow")]).unwrap();
        assert!((v - 0.6).abs() < PROB_TOLERANCE);

        // Summing the child out leaves 1 for every parent combination.
        let m = f.marginalize("Accident").unwrap();
        assert!(m.values().iter().all(|&x| (x - 1.0).abs() < PROB_TOLERANCE));
    }

    #[test]
    fn test_conditional_column() {
        let cpd = TabularCpd::new(
            binary("Accident"),
            vec![weather()],
            vec![vec![0.1, 0.2, 0.4], vec![0.9, 0.8, 0.6]],
        )
        .unwrap();
        let column: Vec<f64> = cpd.conditional(&[2]).collect();
        assert_eq!(column, vec![0.4, 0.6]);
    }

    #[test]
    fn test_prior() {
        let cpd = TabularCpd::prior(weather(), vec![0.7, 0.2, 0.1]).unwrap();
        assert!(cpd.parents().is_empty());
        assert_eq!(cpd.n_parent_configs(), 1);
        let column: Vec<f64> = cpd.conditional(&[]).collect();
        assert_eq!(column, vec![0.7, 0.2, 0.1]);
        assert!(cpd.check_normalized(PROB_TOLERANCE).is_ok());
    }

    #[test]
    fn test_from_fn_matches_table() {
        let by_table = TabularCpd::new(
            binary("Accident"),
            vec![weather()],
            vec![vec![0.1, 0.2, 0.4], vec![0.9, 0.8, 0.6]],
        )
        .unwrap();

        let by_fn = TabularCpd::from_fn(binary("Accident"), vec![weather()], |parents| {
            let p = [0.1, 0.2, 0.4][parents[0]];
            vec![p, 1.0 - p]
        })
        .unwrap();

        assert!(by_fn.factor().approx_eq(by_table.factor(), PROB_TOLERANCE));
    }

    #[test]
    fn test_from_fn_wrong_length() {
        let err = TabularCpd::from_fn(binary("A"), vec![], |_| vec![1.0]).unwrap_err();
        assert!(matches!(
            err,
            PgmError::InvalidArgument(ArgumentError::ShapeMismatch {
                expected: 2,
                got: 1
            })
        ));
    }

    #[test]
    fn test_shape_checks() {
        assert!(TabularCpd::new(binary("A"), vec![weather()], vec![vec![0.5; 3]]).is_err());
        assert!(TabularCpd::new(binary("A"), vec![weather()], vec![vec![0.5; 2]; 2]).is_err());
    }

    #[test]
    fn test_check_normalized_reports_column() {
        let cpd = TabularCpd::new(
            binary("Accident"),
            vec![weather()],
            vec![vec![0.1, 0.3, 0.4], vec![0.9, 0.8, 0.6]],
        )
        .unwrap();

        match cpd.check_normalized(PROB_TOLERANCE) {
            Err(PgmError::Numeric(NumericError::CpdNotNormalized {
                variable,
                parents,
                sum,
            })) => {
                assert_eq!(variable, "Accident");
                assert_eq!(parents, vec!["Weather=rain".to_string()]);
                assert!((sum - 1.1).abs() < 1e-9);
            }
            other => panic!("expected CpdNotNormalized, got {:?}", other),
        }
    }
}
