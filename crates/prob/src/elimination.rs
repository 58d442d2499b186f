//! Exact inference by variable elimination.
//!
//! P(Q | E=e) is computed without building the full joint:
//!
//! 1. Take every CPD as a factor and reduce the evidence into it.
//! 2. For each remaining non-query variable, in some elimination order,
//!    multiply the factors that mention it and sum it out.
//! 3. Multiply what is left (a factor over exactly Q) and normalize.
//!
//! The order changes the size of the intermediate tables, never the answer.
//! [`EliminationHeuristic`] picks one greedily; `query_with_order` takes an
//! explicit one.

use crate::error::{ArgumentError, Result};
use crate::evidence::Evidence;
use crate::factor::Factor;
use crate::network::ValidatedNetwork;
use crate::query::ResolvedQuery;
use crate::variable::VarId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, trace};

/// Greedy rule for choosing the next variable to sum out.
///
/// Min-fill and min-degree look at the interaction graph of the reduced factor
/// pool (two variables interact if some factor mentions both) and pick the
/// variable whose elimination adds the fewest new edges, or has the fewest
/// neighbours. Ties go to the variable added to the network first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EliminationHeuristic {
    #[default]
    MinFill,
    MinDegree,
    /// Eliminate in the network's topological order.
    Topological,
}

/// Variable elimination over a validated network.
///
/// # Example
///
/// ```rust
/// use bayes_prob::{Evidence, Network, Variable, VariableElimination};
///
/// let mut net = Network::new();
/// net.add_variable(Variable::new("Weather", ["sunny", "rain", "snow"]).unwrap()).unwrap();
/// net.add_variable(Variable::new("Accident", ["yes", "no"]).unwrap()).unwrap();
/// net.add_edge("Weather", "Accident").unwrap();
/// net.attach_table("Weather", &[], vec![vec![0.7], vec![0.2], vec![0.1]]).unwrap();
/// net.attach_table("Accident", &["Weather"], vec![vec![0.1, 0.2, 0.4], vec![0.9, 0.8, 0.6]]).unwrap();
/// let net = net.validate().unwrap();
///
/// let ve = VariableElimination::new(&net);
/// let posterior = ve
///     .query(&["Accident"], &Evidence::new().with("Weather", "rain"))
///     .unwrap();
/// assert!((posterior.values()[0] - 0.2).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct VariableElimination<'a> {
    net: &'a ValidatedNetwork,
    heuristic: EliminationHeuristic,
}

impl<'a> VariableElimination<'a> {
    pub fn new(net: &'a ValidatedNetwork) -> Self {
        Self {
            net,
            heuristic: EliminationHeuristic::default(),
        }
    }

    pub fn with_heuristic(mut self, heuristic: EliminationHeuristic) -> Self {
        self.heuristic = heuristic;
        self
    }

    pub fn heuristic(&self) -> EliminationHeuristic {
        self.heuristic
    }

    /// Compute the normalized posterior P(variables | evidence).
    ///
    /// The result's scope lists the query variables in the order given.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` for an empty query, unknown names or states,
    ///   repeated query variables, or a variable both queried and observed.
    /// - `NumericError::ZeroMass` if the evidence has probability zero.
    pub fn query(&self, variables: &[&str], evidence: &Evidence) -> Result<Factor> {
        let query = ResolvedQuery::resolve(self.net, variables, evidence)?;
        let pool = self.reduced_factors(&query.evidence)?;
        let order = self.choose_order(&pool, &self.elimination_set(&query));
        self.run(&query, pool, &order)
    }

    /// [`VariableElimination::query`] with a caller-chosen elimination order.
    ///
    /// `order` must name every variable that is neither queried nor observed,
    /// exactly once.
    pub fn query_with_order(
        &self,
        variables: &[&str],
        evidence: &Evidence,
        order: &[&str],
    ) -> Result<Factor> {
        let query = ResolvedQuery::resolve(self.net, variables, evidence)?;
        let expected: BTreeSet<VarId> = self.elimination_set(&query).into_iter().collect();

        let mut ids = Vec::with_capacity(order.len());
        let mut seen = BTreeSet::new();
        for name in order {
            let id = self.net.require_id(name)?;
            if !expected.contains(&id) {
                return Err(ArgumentError::InvalidEliminationOrder(format!(
                    "{} is queried, observed, or not eliminable",
                    name
                ))
                .into());
            }
            if !seen.insert(id) {
                return Err(ArgumentError::InvalidEliminationOrder(format!(
                    "{} appears twice",
                    name
                ))
                .into());
            }
            ids.push(id);
        }
        if let Some(missing) = expected.difference(&seen).next() {
            return Err(ArgumentError::InvalidEliminationOrder(format!(
                "{} is missing",
                self.net.var(*missing).name()
            ))
            .into());
        }

        let pool = self.reduced_factors(&query.evidence)?;
        self.run(&query, pool, &ids)
    }

    /// The order the configured heuristic would use for this query.
    pub fn elimination_order(
        &self,
        variables: &[&str],
        evidence: &Evidence,
    ) -> Result<Vec<&'a str>> {
        let query = ResolvedQuery::resolve(self.net, variables, evidence)?;
        let pool = self.reduced_factors(&query.evidence)?;
        let net = self.net;
        Ok(self
            .choose_order(&pool, &self.elimination_set(&query))
            .into_iter()
            .map(|id| net.var(id).name())
            .collect())
    }

    /// P(evidence), summing every unobserved variable out.
    ///
    /// Impossible evidence yields `0.0`; empty evidence yields `1.0` up to
    /// rounding.
    pub fn evidence_probability(&self, evidence: &Evidence) -> Result<f64> {
        let observed = self.net.resolve_evidence(evidence)?;
        let pool = self.reduced_factors(&observed)?;
        let eliminate: Vec<VarId> = (0..self.net.len())
            .map(VarId)
            .filter(|id| !observed.iter().any(|(o, _)| o == id))
            .collect();
        let order = self.choose_order(&pool, &eliminate);
        let pool = self.eliminate(pool, &order)?;
        Ok(multiply_all(&pool)?.sum())
    }

    fn run(&self, query: &ResolvedQuery, pool: Vec<Factor>, order: &[VarId]) -> Result<Factor> {
        let names: Vec<&str> = query
            .variables
            .iter()
            .map(|&id| self.net.var(id).name())
            .collect();
        debug!(
            query = ?names,
            evidence = query.evidence.len(),
            order = ?order.iter().map(|&id| self.net.var(id).name()).collect::<Vec<_>>(),
            "variable elimination"
        );

        let pool = self.eliminate(pool, order)?;
        multiply_all(&pool)?.reorder(&names)?.normalize()
    }

    /// Every CPD factor with the observations reduced in.
    fn reduced_factors(&self, evidence: &[(VarId, usize)]) -> Result<Vec<Factor>> {
        self.net
            .factors()
            .into_iter()
            .map(|mut factor| {
                for &(id, state) in evidence {
                    let name = self.net.var(id).name();
                    if factor.contains(name) {
                        factor = factor.reduce_index(name, state)?;
                    }
                }
                Ok(factor)
            })
            .collect()
    }

    /// Variables neither queried nor observed, in id order.
    fn elimination_set(&self, query: &ResolvedQuery) -> Vec<VarId> {
        (0..self.net.len())
            .map(VarId)
            .filter(|&id| !query.mentions(id))
            .collect()
    }

    fn eliminate(&self, mut pool: Vec<Factor>, order: &[VarId]) -> Result<Vec<Factor>> {
        for &id in order {
            let name = self.net.var(id).name();
            let (touching, rest): (Vec<Factor>, Vec<Factor>) =
                pool.into_iter().partition(|f| f.contains(name));
            pool = rest;
            if touching.is_empty() {
                continue;
            }

            let combined = multiply_all(&touching)?;
            trace!(
                variable = name,
                factors = touching.len(),
                table = combined.len(),
                "eliminating"
            );
            pool.push(combined.marginalize(name)?);
        }
        Ok(pool)
    }

    fn choose_order(&self, pool: &[Factor], eliminate: &[VarId]) -> Vec<VarId> {
        match self.heuristic {
            EliminationHeuristic::Topological => self
                .net
                .order()
                .iter()
                .filter(|id| eliminate.contains(*id))
                .copied()
                .collect(),
            EliminationHeuristic::MinFill | EliminationHeuristic::MinDegree => {
                self.greedy_order(pool, eliminate)
            }
        }
    }

    fn greedy_order(&self, pool: &[Factor], eliminate: &[VarId]) -> Vec<VarId> {
        let mut adjacency: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); self.net.len()];
        for factor in pool {
            let ids: Vec<usize> = factor
                .scope()
                .iter()
                .filter_map(|v| self.net.id(v.name()))
                .map(VarId::index)
                .collect();
            for &a in &ids {
                adjacency[a].extend(ids.iter().copied().filter(|&b| b != a));
            }
        }

        let mut remaining: BTreeSet<usize> = eliminate.iter().map(|id| id.index()).collect();
        let mut order = Vec::with_capacity(remaining.len());
        while let Some(next) = remaining
            .iter()
            .copied()
            .min_by_key(|&v| self.cost(&adjacency, v))
        {
            remaining.remove(&next);
            let neighbors: Vec<usize> = adjacency[next].iter().copied().collect();
            for &a in &neighbors {
                adjacency[a].remove(&next);
                adjacency[a].extend(neighbors.iter().copied().filter(|&b| b != a));
            }
            adjacency[next].clear();
            order.push(VarId(next));
        }
        order
    }

    fn cost(&self, adjacency: &[BTreeSet<usize>], v: usize) -> usize {
        let neighbors = &adjacency[v];
        match self.heuristic {
            EliminationHeuristic::MinDegree | EliminationHeuristic::Topological => neighbors.len(),
            EliminationHeuristic::MinFill => neighbors
                .iter()
                .enumerate()
                .map(|(i, &a)| {
                    neighbors
                        .iter()
                        .skip(i + 1)
                        .filter(|&b| !adjacency[a].contains(b))
                        .count()
                })
                .sum(),
        }
    }
}

/// Product of all factors; the empty product is the scalar 1.
fn multiply_all(factors: &[Factor]) -> Result<Factor> {
    factors
        .iter()
        .try_fold(Factor::scalar(1.0)?, |acc, f| acc.multiply(f))
}
