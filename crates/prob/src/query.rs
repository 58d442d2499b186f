//! Query façade: argument checking and dispatch to the inference engines.
//!
//! Every query names its variables and evidence by label. [`ResolvedQuery`]
//! turns those into ids once, rejecting malformed queries before any engine
//! runs, so engine failures are always about the model (zero-probability
//! evidence), never about the arguments.

use crate::config::InferenceConfig;
use crate::elimination::VariableElimination;
use crate::error::{ArgumentError, Result};
use crate::evidence::Evidence;
use crate::factor::Factor;
use crate::network::{Network, ValidatedNetwork};
use crate::sampling::{
    ForwardSampler, RejectionBudget, RejectionEstimate, RejectionSampler, Sample, UniformSource,
};
use crate::variable::VarId;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Query variables and evidence resolved to ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedQuery {
    /// Query variables in the caller's order.
    pub variables: Vec<VarId>,
    /// Observations as `(variable, state index)`, in evidence order.
    pub evidence: Vec<(VarId, usize)>,
}

impl ResolvedQuery {
    /// Check a query against a network.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if:
    /// - `variables` is empty
    /// - A query or evidence variable is not in the network
    /// - An evidence state is not in its variable's domain
    /// - A query variable is repeated
    /// - A variable is both queried and observed
    pub fn resolve(net: &Network, variables: &[&str], evidence: &Evidence) -> Result<Self> {
        if variables.is_empty() {
            return Err(ArgumentError::EmptyQuery.into());
        }

        let mut ids: Vec<VarId> = Vec::with_capacity(variables.len());
        for name in variables {
            let id = net.require_id(name)?;
            if ids.contains(&id) {
                return Err(ArgumentError::DuplicateQueryVariable(name.to_string()).into());
            }
            ids.push(id);
        }

        let observed = net.resolve_evidence(evidence)?;
        if let Some((id, _)) = observed.iter().find(|(id, _)| ids.contains(id)) {
            return Err(
                ArgumentError::QueryEvidenceOverlap(net.var(*id).name().to_string()).into(),
            );
        }

        Ok(Self {
            variables: ids,
            evidence: observed,
        })
    }

    pub fn is_queried(&self, id: VarId) -> bool {
        self.variables.contains(&id)
    }

    pub fn is_observed(&self, id: VarId) -> bool {
        self.evidence.iter().any(|&(o, _)| o == id)
    }

    /// Queried or observed.
    pub fn mentions(&self, id: VarId) -> bool {
        self.is_queried(id) || self.is_observed(id)
    }
}

/// Which engine answers a [`Inference::query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMethod {
    Exact,
    Rejection(RejectionBudget),
}

/// Answer to a [`Inference::query`].
#[derive(Debug, Clone, PartialEq)]
pub enum QueryAnswer {
    /// Normalized posterior over the query variables.
    Exact(Factor),
    Approximate(RejectionEstimate),
}

impl QueryAnswer {
    pub fn exact(&self) -> Option<&Factor> {
        match self {
            Self::Exact(f) => Some(f),
            Self::Approximate(_) => None,
        }
    }

    pub fn approximate(&self) -> Option<&RejectionEstimate> {
        match self {
            Self::Exact(_) => None,
            Self::Approximate(e) => Some(e),
        }
    }
}

/// Query entry point over a validated network.
///
/// Holds only a shared reference, so any number of `Inference` values can
/// query the same network from different threads.
///
/// # Example
///
/// ```rust
/// use bayes_prob::{Evidence, Inference, Network, QueryMethod, RejectionBudget, Variable};
///
/// let mut net = Network::new();
/// net.add_variable(Variable::new("Weather", ["sunny", "rain", "snow"]).unwrap()).unwrap();
/// net.add_variable(Variable::new("Accident", ["yes", "no"]).unwrap()).unwrap();
/// net.add_edge("Weather", "Accident").unwrap();
/// net.attach_table("Weather", &[], vec![vec![0.7], vec![0.2], vec![0.1]]).unwrap();
/// net.attach_table("Accident", &["Weather"], vec![vec![0.1, 0.2, 0.4], vec![0.9, 0.8, 0.6]]).unwrap();
/// let net = net.validate().unwrap();
///
/// let inference = Inference::new(&net);
/// let rain = Evidence::new().with("Weather", "rain");
///
/// let exact = inference.query_exact(&["Accident"], &rain).unwrap();
/// assert!((exact.values()[0] - 0.2).abs() < 1e-12);
///
/// let answer = inference
///     .query(&["Accident"], &rain, QueryMethod::Rejection(RejectionBudget::accepted(2000, 100)))
///     .unwrap();
/// let estimate = answer.approximate().unwrap().posterior().unwrap();
/// assert_eq!(estimate.accepted, 2000);
/// ```
#[derive(Debug, Clone)]
pub struct Inference<'a> {
    net: &'a ValidatedNetwork,
    config: InferenceConfig,
}

impl<'a> Inference<'a> {
    pub fn new(net: &'a ValidatedNetwork) -> Self {
        Self {
            net,
            config: InferenceConfig::default(),
        }
    }

    /// Replace the configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the configuration does not validate.
    pub fn with_config(mut self, config: InferenceConfig) -> Result<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    pub fn network(&self) -> &'a ValidatedNetwork {
        self.net
    }

    /// Exact posterior P(variables | evidence) by variable elimination.
    pub fn query_exact(&self, variables: &[&str], evidence: &Evidence) -> Result<Factor> {
        VariableElimination::new(self.net)
            .with_heuristic(self.config.elimination)
            .query(variables, evidence)
    }

    /// P(evidence) by variable elimination.
    pub fn evidence_probability(&self, evidence: &Evidence) -> Result<f64> {
        VariableElimination::new(self.net)
            .with_heuristic(self.config.elimination)
            .evidence_probability(evidence)
    }

    /// `size` forward samples from the given source.
    pub fn query_forward<R: UniformSource + ?Sized>(
        &self,
        size: usize,
        rng: &mut R,
    ) -> Vec<Sample> {
        ForwardSampler::new(self.net).sample(size, rng)
    }

    /// `size` forward samples on the rayon pool, seeded from the configuration.
    pub fn query_forward_parallel(&self, size: usize) -> Vec<Sample> {
        let sampling = &self.config.sampling;
        ForwardSampler::new(self.net).sample_parallel(size, sampling.seed, sampling.workers)
    }

    /// Approximate P(variables | evidence) by rejection sampling.
    pub fn query_rejection<R: UniformSource + ?Sized>(
        &self,
        variables: &[&str],
        evidence: &Evidence,
        budget: RejectionBudget,
        rng: &mut R,
    ) -> Result<RejectionEstimate> {
        RejectionSampler::new(self.net, evidence)?.estimate(variables, budget, rng)
    }

    /// An accepted-count budget using the configured draw limit factor.
    pub fn rejection_budget(&self, target: usize) -> RejectionBudget {
        RejectionBudget::accepted(target, self.config.sampling.draw_limit_factor)
    }

    /// Dispatch to either engine. Sampling draws from a `ChaCha8Rng` seeded
    /// with the configured seed, so repeated calls give the same answer.
    pub fn query(
        &self,
        variables: &[&str],
        evidence: &Evidence,
        method: QueryMethod,
    ) -> Result<QueryAnswer> {
        ResolvedQuery::resolve(self.net, variables, evidence)?;
        match method {
            QueryMethod::Exact => self.query_exact(variables, evidence).map(QueryAnswer::Exact),
            QueryMethod::Rejection(budget) => {
                let mut rng = ChaCha8Rng::seed_from_u64(self.config.sampling.seed);
                self.query_rejection(variables, evidence, budget, &mut rng)
                    .map(QueryAnswer::Approximate)
            }
        }
    }
}
