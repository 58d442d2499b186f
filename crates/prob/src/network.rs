//! Bayesian networks over discrete variables.
//!
//! A Bayesian network is a directed acyclic graph where:
//! - Nodes are random variables
//! - Edges represent conditional dependencies
//! - Each node has a conditional distribution given its parents
//!
//! The joint distribution factors as P(X₁, ..., Xₙ) = ∏ᵢ P(Xᵢ | parents(Xᵢ)).
//!
//! ## Lifecycle
//!
//! A [`Network`] is built incrementally (`add_variable`, `add_edge`,
//! `attach_cpd`) without eager validation. [`Network::validate`] runs
//! [`Network::check`] and hands back a [`ValidatedNetwork`], the only type the
//! inference engines accept. A validated network is immutable and `Sync`, so
//! any number of queries can share it.
//!
//! Variables live in a contiguous table indexed by [`VarId`]; the edge set is a
//! `petgraph` graph whose node `i` is variable `i`.

use crate::cpd::TabularCpd;
use crate::error::{ArgumentError, PgmError, Result, StructuralError};
use crate::evidence::Evidence;
use crate::factor::Factor;
use crate::variable::{VarId, Variable};
use crate::PROB_TOLERANCE;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap};
use std::ops::Deref;
use tracing::debug;

/// A Bayesian network under construction.
///
/// # Example
///
/// ```rust
/// use bayes_prob::{Network, Variable};
///
/// let mut net = Network::new();
/// net.add_variable(Variable::new("Weather", ["sunny", "rain", "snow"]).unwrap()).unwrap();
/// net.add_variable(Variable::new("Accident", ["yes", "no"]).unwrap()).unwrap();
/// net.add_edge("Weather", "Accident").unwrap();
///
/// net.attach_table("Weather", &[], vec![vec![0.7], vec![0.2], vec![0.1]]).unwrap();
/// net.attach_table(
///     "Accident",
///     &["Weather"],
///     vec![vec![0.1, 0.2, 0.4], vec![0.9, 0.8, 0.6]],
/// )
/// .unwrap();
///
/// assert!(net.check().is_ok());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Network {
    variables: Vec<Variable>,
    index: HashMap<String, VarId>,
    graph: DiGraph<VarId, ()>,
    cpds: Vec<TabularCpd>,
}

impl Network {
    /// Create an empty network.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable, returning its id.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable with the same name already exists.
    pub fn add_variable(&mut self, variable: Variable) -> Result<VarId> {
        if self.index.contains_key(variable.name()) {
            return Err(ArgumentError::DuplicateVariable(variable.name().to_string()).into());
        }

        let id = VarId(self.variables.len());
        let node = self.graph.add_node(id);
        debug_assert_eq!(node.index(), id.index());

        self.index.insert(variable.name().to_string(), id);
        self.variables.push(variable);
        Ok(id)
    }

    /// Add a directed edge `parent → child`.
    ///
    /// Adding an existing edge again has no effect. Cycles are accepted here and
    /// reported by [`Network::check`].
    pub fn add_edge(&mut self, parent: &str, child: &str) -> Result<()> {
        let p = self.require_id(parent)?;
        let c = self.require_id(child)?;
        self.graph.update_edge(node(p), node(c), ());
        Ok(())
    }

    /// Attach a CPD. Its child names the variable it defines.
    ///
    /// No validation happens here: unknown children, duplicates and scope
    /// mismatches are reported by [`Network::check`].
    pub fn attach_cpd(&mut self, cpd: TabularCpd) {
        self.cpds.push(cpd);
    }

    /// Build and attach a CPD from a child-major table, looking the child and
    /// parents up by name.
    pub fn attach_table(
        &mut self,
        variable: &str,
        parents: &[&str],
        table: Vec<Vec<f64>>,
    ) -> Result<()> {
        let child = self.require(variable)?.clone();
        let parents = parents
            .iter()
            .map(|p| self.require(p).cloned())
            .collect::<Result<Vec<_>>>()?;
        let cpd = TabularCpd::new(child, parents, table)?;
        self.attach_cpd(cpd);
        Ok(())
    }

    /// Number of variables.
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// All variables, indexed by [`VarId`].
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.id(name).map(|id| &self.variables[id.index()])
    }

    /// The variable with the given id.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this network.
    pub fn var(&self, id: VarId) -> &Variable {
        &self.variables[id.index()]
    }

    pub fn id(&self, name: &str) -> Option<VarId> {
        self.index.get(name).copied()
    }

    pub(crate) fn require_id(&self, name: &str) -> Result<VarId> {
        self.id(name)
            .ok_or_else(|| ArgumentError::UnknownVariable(name.to_string()).into())
    }

    pub(crate) fn require(&self, name: &str) -> Result<&Variable> {
        self.require_id(name).map(|id| self.var(id))
    }

    /// Edges as `(parent, child)` name pairs, ordered by child then parent id.
    pub fn edges(&self) -> Vec<(&str, &str)> {
        let mut ids: Vec<(VarId, VarId)> = self
            .graph
            .edge_indices()
            .filter_map(|e| self.graph.edge_endpoints(e))
            .map(|(a, b)| (self.graph[a], self.graph[b]))
            .collect();
        ids.sort_by_key(|&(p, c)| (c, p));
        ids.into_iter()
            .map(|(p, c)| (self.var(p).name(), self.var(c).name()))
            .collect()
    }

    /// Parent ids of a variable, in id order.
    pub fn parent_ids(&self, id: VarId) -> Vec<VarId> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Child ids of a variable, in id order.
    pub fn child_ids(&self, id: VarId) -> Vec<VarId> {
        self.neighbors(id, Direction::Outgoing)
    }

    fn neighbors(&self, id: VarId, dir: Direction) -> Vec<VarId> {
        let mut out: Vec<VarId> = self
            .graph
            .neighbors_directed(node(id), dir)
            .map(|n| self.graph[n])
            .collect();
        out.sort();
        out
    }

    /// Parent names of a variable.
    pub fn parents(&self, name: &str) -> Result<Vec<&str>> {
        let id = self.require_id(name)?;
        Ok(self
            .parent_ids(id)
            .into_iter()
            .map(|p| self.var(p).name())
            .collect())
    }

    /// Child names of a variable.
    pub fn children(&self, name: &str) -> Result<Vec<&str>> {
        let id = self.require_id(name)?;
        Ok(self
            .child_ids(id)
            .into_iter()
            .map(|c| self.var(c).name())
            .collect())
    }

    /// All attached CPDs, in attachment order.
    pub fn cpds(&self) -> &[TabularCpd] {
        &self.cpds
    }

    /// The first CPD attached for `name`.
    pub fn cpd(&self, name: &str) -> Option<&TabularCpd> {
        self.cpds.iter().find(|c| c.child().name() == name)
    }

    /// One topological order of the variables.
    ///
    /// Kahn's algorithm; among variables whose parents are all placed, the one
    /// added first goes next, so the order is deterministic.
    ///
    /// # Errors
    ///
    /// Returns [`StructuralError::Cycle`] listing the variables that could not
    /// be placed.
    pub fn topological_order(&self) -> Result<Vec<VarId>> {
        let mut in_degree: Vec<usize> = (0..self.len())
            .map(|i| {
                self.graph
                    .neighbors_directed(NodeIndex::new(i), Direction::Incoming)
                    .count()
            })
            .collect();

        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &d)| d == 0)
            .map(|(i, _)| Reverse(i))
            .collect();

        let mut order = Vec::with_capacity(self.len());
        while let Some(Reverse(i)) = ready.pop() {
            order.push(VarId(i));
            for succ in self
                .graph
                .neighbors_directed(NodeIndex::new(i), Direction::Outgoing)
            {
                let deg = &mut in_degree[succ.index()];
                *deg -= 1;
                if *deg == 0 {
                    ready.push(Reverse(succ.index()));
                }
            }
        }

        if order.len() < self.len() {
            let variables = in_degree
                .iter()
                .enumerate()
                .filter(|(_, &d)| d > 0)
                .map(|(i, _)| self.variables[i].name().to_string())
                .collect();
            return Err(StructuralError::Cycle { variables }.into());
        }

        Ok(order)
    }

    /// Validate the network with the default tolerance.
    ///
    /// Checks, in order: the edges are acyclic; every CPD defines a known
    /// variable and no variable has two; CPD domains agree with the network;
    /// every variable has a CPD; each CPD conditions on exactly the variable's
    /// parents; every CPD column sums to 1. Returns the first violation.
    pub fn check(&self) -> Result<()> {
        self.check_with_tolerance(PROB_TOLERANCE)
    }

    /// [`Network::check`] with an explicit "sums to 1" tolerance.
    pub fn check_with_tolerance(&self, tolerance: f64) -> Result<()> {
        self.checked(tolerance).map(|_| ())
    }

    fn checked(&self, tolerance: f64) -> Result<(Vec<VarId>, Vec<usize>)> {
        let result = self.check_inner(tolerance);
        match &result {
            Ok(_) => debug!(
                variables = self.len(),
                edges = self.graph.edge_count(),
                "network check passed"
            ),
            Err(e) => debug!(error = %e, "network check failed"),
        }
        result
    }

    /// Runs the checks and returns the topological order and CPD index per variable.
    fn check_inner(&self, tolerance: f64) -> Result<(Vec<VarId>, Vec<usize>)> {
        let order = self.topological_order()?;

        let mut owner: Vec<Option<usize>> = vec![None; self.len()];
        for (i, cpd) in self.cpds.iter().enumerate() {
            let name = cpd.child().name();
            let id = self.id(name).ok_or_else(|| StructuralError::OrphanCpd {
                variable: name.to_string(),
            })?;
            if owner[id.index()].replace(i).is_some() {
                return Err(StructuralError::DuplicateCpd {
                    variable: name.to_string(),
                }
                .into());
            }
        }

        for cpd in &self.cpds {
            for v in cpd.factor().scope() {
                if let Some(known) = self.variable(v.name()) {
                    if !known.same_domain(v) {
                        return Err(StructuralError::DomainMismatch {
                            cpd: cpd.child().name().to_string(),
                            variable: v.name().to_string(),
                        }
                        .into());
                    }
                }
            }
        }

        let mut cpd_of = Vec::with_capacity(self.len());
        for (i, slot) in owner.iter().enumerate() {
            let idx = slot.ok_or_else(|| StructuralError::MissingCpd {
                variable: self.variables[i].name().to_string(),
            })?;
            cpd_of.push(idx);
        }

        for (i, &c) in cpd_of.iter().enumerate() {
            let expected: BTreeSet<&str> = self
                .parent_ids(VarId(i))
                .into_iter()
                .map(|p| self.var(p).name())
                .collect();
            let cpd = &self.cpds[c];
            let found: Vec<&str> = cpd.parents().iter().map(Variable::name).collect();
            let found_set: BTreeSet<&str> = found.iter().copied().collect();
            if expected != found_set {
                return Err(StructuralError::ScopeMismatch {
                    variable: self.variables[i].name().to_string(),
                    expected: expected.into_iter().map(String::from).collect(),
                    found: found.into_iter().map(String::from).collect(),
                }
                .into());
            }
        }

        for cpd in &self.cpds {
            cpd.check_normalized(tolerance)?;
        }

        Ok((order, cpd_of))
    }

    /// Check the network and freeze it for inference.
    pub fn validate(self) -> Result<ValidatedNetwork> {
        self.validate_with_tolerance(PROB_TOLERANCE)
    }

    /// [`Network::validate`] with an explicit "sums to 1" tolerance.
    pub fn validate_with_tolerance(self, tolerance: f64) -> Result<ValidatedNetwork> {
        let (order, cpd_of) = self.checked(tolerance)?;

        let cpd_parents = cpd_of
            .iter()
            .map(|&c| {
                self.cpds[c]
                    .parents()
                    .iter()
                    .map(|p| self.require_id(p.name()))
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ValidatedNetwork {
            network: self,
            order,
            cpd_of,
            cpd_parents,
        })
    }

    /// Resolve labelled evidence to `(variable, state index)` pairs.
    ///
    /// # Errors
    ///
    /// Returns an error if an evidence key names no variable of the network,
    /// or its state is outside that variable's domain.
    pub fn resolve_evidence(&self, evidence: &Evidence) -> Result<Vec<(VarId, usize)>> {
        evidence
            .iter()
            .map(|(name, state)| {
                let id = self.require_id(name)?;
                Ok((id, self.var(id).require_state(state)?))
            })
            .collect()
    }
}

fn node(id: VarId) -> NodeIndex {
    NodeIndex::new(id.index())
}

/// A network that passed [`Network::check`].
///
/// Caches the topological order and, for every variable, its CPD and the ids
/// of the CPD's parents in table order. Derefs to [`Network`] for the read
/// accessors.
#[derive(Debug, Clone)]
pub struct ValidatedNetwork {
    network: Network,
    order: Vec<VarId>,
    cpd_of: Vec<usize>,
    cpd_parents: Vec<Vec<VarId>>,
}

impl Deref for ValidatedNetwork {
    type Target = Network;

    fn deref(&self) -> &Network {
        &self.network
    }
}

impl TryFrom<Network> for ValidatedNetwork {
    type Error = PgmError;

    fn try_from(network: Network) -> Result<Self> {
        network.validate()
    }
}

impl ValidatedNetwork {
    /// The cached topological order.
    pub fn order(&self) -> &[VarId] {
        &self.order
    }

    /// The CPD defining `id`.
    pub fn cpd_of(&self, id: VarId) -> &TabularCpd {
        &self.network.cpds[self.cpd_of[id.index()]]
    }

    /// Parent ids of `id` in the order its CPD lists them.
    pub fn cpd_parents(&self, id: VarId) -> &[VarId] {
        &self.cpd_parents[id.index()]
    }

    /// Every CPD as a factor, indexed by variable.
    pub fn factors(&self) -> Vec<Factor> {
        (0..self.len())
            .map(|i| self.cpd_of(VarId(i)).factor().clone())
            .collect()
    }

    /// Give the network back for further editing. It must be validated again.
    pub fn into_inner(self) -> Network {
        self.network
    }

    /// P(X₁=x₁, ..., Xₙ=xₙ) for a complete labelled assignment.
    ///
    /// # Errors
    ///
    /// Returns an error if a name or state is unknown, or if the assignment
    /// does not cover every variable.
    pub fn joint_probability(&self, assignment: &Evidence) -> Result<f64> {
        let resolved = self.resolve_evidence(assignment)?;
        if resolved.len() != self.len() {
            return Err(ArgumentError::ShapeMismatch {
                expected: self.len(),
                got: resolved.len(),
            }
            .into());
        }

        let mut states = vec![0; self.len()];
        for (id, s) in resolved {
            states[id.index()] = s;
        }

        Ok((0..self.len())
            .map(|i| {
                let id = VarId(i);
                let parent_values: Vec<usize> = self
                    .cpd_parents(id)
                    .iter()
                    .map(|p| states[p.index()])
                    .collect();
                self.cpd_of(id).prob(states[i], &parent_values)
            })
            .product())
    }
}
