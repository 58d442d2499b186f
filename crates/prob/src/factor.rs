//! Discrete factors: dense non-negative tables over an ordered scope.
//!
//! A factor φ(X₁, ..., Xₙ) assigns a weight to every joint assignment of its
//! scope. CPDs, intermediate results of variable elimination, and exact query
//! answers are all factors.
//!
//! ## Layout
//!
//! Values are stored row-major: the LAST scope variable varies fastest.
//! For scope `[A, B]` with |A| = 2, |B| = 3:
//!
//! ```text
//! idx 0: A=0, B=0    idx 3: A=1, B=0
//! idx 1: A=0, B=1    idx 4: A=1, B=1
//! idx 2: A=0, B=2    idx 5: A=1, B=2
//! ```
//!
//! ## Operations
//!
//! | Operation | Result scope | Value |
//! |-----------|--------------|-------|
//! | `a.multiply(&b)` | scope(a) ∪ scope(b) | a(x↾a) · b(x↾b) |
//! | `f.marginalize(v)` | scope(f) \ {v} | Σᵥ f |
//! | `f.reduce(v, s)` | scope(f) \ {v} | f with v = s |
//! | `f.normalize()` | scope(f) | f / Σ f |

use crate::error::{ArgumentError, NumericError, Result};
use crate::variable::Variable;
use std::borrow::Cow;
use std::fmt;

/// A table mapping joint assignments of an ordered scope to non-negative weights.
///
/// # Example
///
/// ```rust
/// use bayes_prob::{Factor, Variable};
///
/// let rain = Variable::new("Rain", ["yes", "no"]).unwrap();
/// let f = Factor::new(vec![rain], vec![2.0, 6.0]).unwrap();
///
/// let p = f.normalize().unwrap();
/// assert!((p.values()[0] - 0.25).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Factor {
    scope: Vec<Variable>,
    values: Vec<f64>,
    /// Observations already reduced into this factor, as (variable, state index).
    observed: Vec<(Variable, usize)>,
}

impl Factor {
    /// Create a factor from its scope and a row-major value table.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A variable appears twice in the scope
    /// - The table length is not the product of the scope's cardinalities
    /// - Any value is negative or not finite
    pub fn new(scope: Vec<Variable>, values: Vec<f64>) -> Result<Self> {
        for (i, v) in scope.iter().enumerate() {
            if scope[..i].iter().any(|u| u.name() == v.name()) {
                return Err(ArgumentError::DuplicateVariable(v.name().to_string()).into());
            }
        }

        let expected: usize = scope.iter().map(Variable::cardinality).product();
        if values.len() != expected {
            return Err(ArgumentError::ShapeMismatch {
                expected,
                got: values.len(),
            }
            .into());
        }

        if let Some((index, &value)) = values
            .iter()
            .enumerate()
            .find(|(_, x)| !x.is_finite() || **x < 0.0)
        {
            return Err(ArgumentError::InvalidWeight { index, value }.into());
        }

        Ok(Self {
            scope,
            values,
            observed: Vec::new(),
        })
    }

    /// A factor with empty scope holding a single weight.
    pub fn scalar(value: f64) -> Result<Self> {
        Self::new(Vec::new(), vec![value])
    }

    /// The uniform factor (all ones) over a scope.
    pub fn ones(scope: Vec<Variable>) -> Result<Self> {
        let size = scope.iter().map(Variable::cardinality).product();
        Self::new(scope, vec![1.0; size])
    }

    pub fn scope(&self) -> &[Variable] {
        &self.scope
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Observations reduced into this factor, as (variable, state index).
    pub fn observed(&self) -> &[(Variable, usize)] {
        &self.observed
    }

    /// Names of the scope variables, in order.
    pub fn names(&self) -> Vec<&str> {
        self.scope.iter().map(Variable::name).collect()
    }

    /// Cardinalities of the scope variables, in order.
    pub fn cardinalities(&self) -> Vec<usize> {
        self.scope.iter().map(Variable::cardinality).collect()
    }

    /// Number of table entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false: even a scalar factor has one entry.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_scalar(&self) -> bool {
        self.scope.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.scope.iter().find(|v| v.name() == name)
    }

    pub(crate) fn position(&self, name: &str) -> Option<usize> {
        self.scope.iter().position(|v| v.name() == name)
    }

    /// Sum of all entries. Marginalizing every variable out yields a scalar
    /// factor holding this value.
    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Encode an assignment (state index per scope variable) into a table index.
    pub fn encode(&self, assignment: &[usize]) -> usize {
        let mut idx = 0;
        for (v, &s) in self.scope.iter().zip(assignment) {
            idx = idx * v.cardinality() + s;
        }
        idx
    }

    /// Decode a table index into an assignment.
    pub fn decode(&self, mut idx: usize) -> Vec<usize> {
        let mut assignment = vec![0; self.scope.len()];
        for i in (0..self.scope.len()).rev() {
            let card = self.scope[i].cardinality();
            assignment[i] = idx % card;
            idx /= card;
        }
        assignment
    }

    /// Value at an assignment given as state indices in scope order.
    ///
    /// Returns `None` if the assignment has the wrong length or an index is out
    /// of range.
    pub fn value(&self, assignment: &[usize]) -> Option<f64> {
        if assignment.len() != self.scope.len() {
            return None;
        }
        if self
            .scope
            .iter()
            .zip(assignment)
            .any(|(v, &s)| s >= v.cardinality())
        {
            return None;
        }
        Some(self.values[self.encode(assignment)])
    }

    /// Value at an assignment given as `(variable, state)` labels, in any order.
    ///
    /// Every scope variable must be labelled exactly once. Labels for
    /// variables already reduced into the factor are accepted when they match
    /// the observation.
    pub fn value_of(&self, labels: &[(&str, &str)]) -> Result<f64> {
        let mut assignment: Vec<Option<usize>> = vec![None; self.scope.len()];

        for (i, &(name, state)) in labels.iter().enumerate() {
            if labels[..i].iter().any(|&(seen, _)| seen == name) {
                return Err(ArgumentError::DuplicateVariable(name.to_string()).into());
            }
            if let Some(pos) = self.position(name) {
                assignment[pos] = Some(self.scope[pos].require_state(state)?);
            } else if let Some((var, idx)) = self.observed.iter().find(|(v, _)| v.name() == name)
            {
                if var.require_state(state)? != *idx {
                    return Ok(0.0);
                }
            } else {
                return Err(ArgumentError::NotInScope(name.to_string()).into());
            }
        }

        let assignment: Option<Vec<usize>> = assignment.into_iter().collect();
        let assignment = assignment.ok_or(ArgumentError::ShapeMismatch {
            expected: self.scope.len(),
            got: labels.len(),
        })?;
        Ok(self.values[self.encode(&assignment)])
    }

    /// Iterate over `(assignment, value)` pairs in table order.
    pub fn iter(&self) -> impl Iterator<Item = (Vec<usize>, f64)> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(move |(i, &v)| (self.decode(i), v))
    }

    /// Factor product.
    ///
    /// The result's scope is this factor's scope followed by the variables of
    /// `other` not already present. Each entry is the product of the two
    /// operands' entries at the projected assignments.
    ///
    /// A variable one operand was reduced on is reduced out of the other
    /// before the product, so it never appears in both the result's scope
    /// and its observations.
    ///
    /// # Errors
    ///
    /// Returns an error if the factors share a variable name with different
    /// domains, or were reduced to different states of the same variable.
    pub fn multiply(&self, other: &Factor) -> Result<Factor> {
        let lhs = self.absorb(&other.observed)?;
        let rhs = other.absorb(&self.observed)?;
        lhs.product(&rhs)
    }

    /// Reduce every scope variable fixed by `observed`.
    fn absorb(&self, observed: &[(Variable, usize)]) -> Result<Cow<'_, Factor>> {
        let mut out = Cow::Borrowed(self);
        for (var, state) in observed {
            if let Some(pos) = out.position(var.name()) {
                if !out.scope[pos].same_domain(var) {
                    return Err(ArgumentError::ConflictingDomains(var.name().to_string()).into());
                }
                out = Cow::Owned(out.reduce_at(pos, *state));
            }
        }
        Ok(out)
    }

    /// Product of two factors with no variable scoped in one and observed in the other.
    fn product(&self, other: &Factor) -> Result<Factor> {
        let mut scope = self.scope.clone();
        for v in &other.scope {
            match self.variable(v.name()) {
                Some(mine) if !mine.same_domain(v) => {
                    return Err(ArgumentError::ConflictingDomains(v.name().to_string()).into());
                }
                Some(_) => {}
                None => scope.push(v.clone()),
            }
        }

        let observed = merge_observations(&self.observed, &other.observed)?;

        let cards: Vec<usize> = scope.iter().map(Variable::cardinality).collect();
        let size: usize = cards.iter().product();
        let a_strides = projected_strides(&scope, &self.scope);
        let b_strides = projected_strides(&scope, &other.scope);

        let mut values = Vec::with_capacity(size);
        let mut assignment = vec![0; scope.len()];
        for _ in 0..size {
            let a = dot(&assignment, &a_strides);
            let b = dot(&assignment, &b_strides);
            values.push(self.values[a] * other.values[b]);
            advance(&mut assignment, &cards);
        }

        Ok(Factor {
            scope,
            values,
            observed,
        })
    }

    /// Sum a variable out of the factor.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is not in the scope.
    pub fn marginalize(&self, name: &str) -> Result<Factor> {
        let pos = self
            .position(name)
            .ok_or_else(|| ArgumentError::NotInScope(name.to_string()))?;

        let mut scope = self.scope.clone();
        scope.remove(pos);

        let size: usize = scope.iter().map(Variable::cardinality).product();
        let out_strides = projected_strides(&self.scope, &scope);
        let cards = self.cardinalities();

        let mut values = vec![0.0; size];
        let mut assignment = vec![0; self.scope.len()];
        for &v in &self.values {
            values[dot(&assignment, &out_strides)] += v;
            advance(&mut assignment, &cards);
        }

        Ok(Factor {
            scope,
            values,
            observed: self.observed.clone(),
        })
    }

    /// Sum out several variables, in the given order.
    pub fn marginalize_all(&self, names: &[&str]) -> Result<Factor> {
        let mut result = self.clone();
        for name in names {
            result = result.marginalize(name)?;
        }
        Ok(result)
    }

    /// Fix a variable to an observed state, removing it from the scope.
    ///
    /// Reducing again on the same variable and state is a no-op. A variable
    /// is never both in the scope and among the observations, so the two
    /// lookups below cannot disagree.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `name` was never in the scope
    /// - `state` is not in the variable's domain
    /// - The factor was already reduced on `name` to a different state
    pub fn reduce(&self, name: &str, state: &str) -> Result<Factor> {
        if let Some(pos) = self.position(name) {
            let idx = self.scope[pos].require_state(state)?;
            return Ok(self.reduce_at(pos, idx));
        }

        if let Some((var, idx)) = self.observed.iter().find(|(v, _)| v.name() == name) {
            let requested = var.require_state(state)?;
            if requested == *idx {
                return Ok(self.clone());
            }
            return Err(ArgumentError::AlreadyReduced {
                variable: name.to_string(),
                state: var.state_label(*idx).unwrap_or_default().to_string(),
            }
            .into());
        }

        Err(ArgumentError::NotInScope(name.to_string()).into())
    }

    /// [`Factor::reduce`] with the state given by index.
    pub fn reduce_index(&self, name: &str, state: usize) -> Result<Factor> {
        let var = self
            .variable(name)
            .or_else(|| {
                self.observed
                    .iter()
                    .find(|(v, _)| v.name() == name)
                    .map(|(v, _)| v)
            })
            .ok_or_else(|| ArgumentError::NotInScope(name.to_string()))?;
        let label = var
            .state_label(state)
            .ok_or_else(|| ArgumentError::UnknownState {
                variable: name.to_string(),
                state: state.to_string(),
            })?
            .to_string();
        self.reduce(name, &label)
    }

    fn reduce_at(&self, pos: usize, state: usize) -> Factor {
        let mut scope = self.scope.clone();
        let var = scope.remove(pos);

        let own_strides = strides(&self.cardinalities());
        let offset = state * own_strides[pos];
        let src_strides = projected_strides(&scope, &self.scope);
        let cards: Vec<usize> = scope.iter().map(Variable::cardinality).collect();
        let size: usize = cards.iter().product();

        let mut values = Vec::with_capacity(size);
        let mut assignment = vec![0; scope.len()];
        for _ in 0..size {
            values.push(self.values[offset + dot(&assignment, &src_strides)]);
            advance(&mut assignment, &cards);
        }

        let mut observed = self.observed.clone();
        observed.push((var, state));

        Factor {
            scope,
            values,
            observed,
        }
    }

    /// Divide every value by the total.
    ///
    /// # Errors
    ///
    /// Returns [`NumericError::ZeroMass`] if the values sum to zero.
    pub fn normalize(&self) -> Result<Factor> {
        let sum = self.sum();
        if sum <= 0.0 || !sum.is_finite() {
            return Err(NumericError::ZeroMass.into());
        }

        Ok(Factor {
            scope: self.scope.clone(),
            values: self.values.iter().map(|v| v / sum).collect(),
            observed: self.observed.clone(),
        })
    }

    /// Permute the scope into the given order.
    ///
    /// # Errors
    ///
    /// Returns an error unless `names` is a permutation of the scope.
    pub fn reorder(&self, names: &[&str]) -> Result<Factor> {
        if names.len() != self.scope.len() {
            return Err(ArgumentError::ShapeMismatch {
                expected: self.scope.len(),
                got: names.len(),
            }
            .into());
        }

        let mut scope = Vec::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(ArgumentError::DuplicateVariable(name.to_string()).into());
            }
            let var = self
                .variable(name)
                .ok_or_else(|| ArgumentError::NotInScope(name.to_string()))?;
            scope.push(var.clone());
        }

        let cards: Vec<usize> = scope.iter().map(Variable::cardinality).collect();
        let src_strides = projected_strides(&scope, &self.scope);
        let mut values = Vec::with_capacity(self.values.len());
        let mut assignment = vec![0; scope.len()];
        for _ in 0..self.values.len() {
            values.push(self.values[dot(&assignment, &src_strides)]);
            advance(&mut assignment, &cards);
        }

        Ok(Factor {
            scope,
            values,
            observed: self.observed.clone(),
        })
    }

    /// Compare scope (names and domains, in order) and values within `tol`.
    pub fn approx_eq(&self, other: &Factor, tol: f64) -> bool {
        self.scope == other.scope
            && self.values.len() == other.values.len()
            && self
                .values
                .iter()
                .zip(&other.values)
                .all(|(a, b)| (a - b).abs() <= tol)
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scope.is_empty() {
            return write!(f, "φ() = {:.4}", self.values[0]);
        }

        let header: Vec<&str> = self.names();
        writeln!(f, "{} | φ", header.join(" | "))?;
        for (assignment, value) in self.iter() {
            let states: Vec<&str> = self
                .scope
                .iter()
                .zip(&assignment)
                .map(|(v, &s)| v.state_label(s).unwrap_or("?"))
                .collect();
            writeln!(f, "{} | {:.4}", states.join(" | "), value)?;
        }
        Ok(())
    }
}

/// Row-major strides for the given cardinalities.
pub(crate) fn strides(cards: &[usize]) -> Vec<usize> {
    let mut out = vec![1; cards.len()];
    for i in (0..cards.len().saturating_sub(1)).rev() {
        out[i] = out[i + 1] * cards[i + 1];
    }
    out
}

/// For each variable of `target`, its stride in `source` (0 if absent).
fn projected_strides(target: &[Variable], source: &[Variable]) -> Vec<usize> {
    let source_cards: Vec<usize> = source.iter().map(Variable::cardinality).collect();
    let source_strides = strides(&source_cards);
    target
        .iter()
        .map(|v| {
            source
                .iter()
                .position(|u| u.name() == v.name())
                .map_or(0, |p| source_strides[p])
        })
        .collect()
}

fn dot(assignment: &[usize], strides: &[usize]) -> usize {
    assignment.iter().zip(strides).map(|(a, s)| a * s).sum()
}

/// Advance an odometer assignment (last position fastest).
fn advance(assignment: &mut [usize], cards: &[usize]) {
    for i in (0..assignment.len()).rev() {
        assignment[i] += 1;
        if assignment[i] < cards[i] {
            return;
        }
        assignment[i] = 0;
    }
}

fn merge_observations(
    a: &[(Variable, usize)],
    b: &[(Variable, usize)],
) -> Result<Vec<(Variable, usize)>> {
    let mut merged = a.to_vec();
    for (var, state) in b {
        match merged.iter().find(|(v, _)| v.name() == var.name()) {
            Some((_, s)) if s != state => {
                return Err(ArgumentError::ConflictingObservations(var.name().to_string()).into());
            }
            Some(_) => {}
            None => merged.push((var.clone(), *state)),
        }
    }
    Ok(merged)
}
