//! Approximate inference by forward and rejection sampling.
//!
//! Forward sampling walks the network in topological order and draws each
//! variable from its CPD column for the parents' already-drawn states, so one
//! walk yields one complete assignment from the joint distribution.
//!
//! Rejection sampling repeats the walk and keeps only draws that agree with
//! the evidence. Kept draws are samples from P(X | E=e); the acceptance ratio
//! estimates P(E=e), so near-impossible evidence shows up as a large
//! `attempted` count for few `accepted` samples.
//!
//! ## Randomness
//!
//! Every draw consumes exactly one value from a [`UniformSource`]. Any
//! `rand::Rng` is one. [`ForwardSampler::sample_parallel`] splits the draws into
//! contiguous chunks, chunk `k` seeded from `(seed, stream k)` of a
//! `ChaCha8Rng`, so its output only depends on `(n, seed, workers)`.

use crate::error::{ArgumentError, NumericError, Result};
use crate::evidence::Evidence;
use crate::factor::Factor;
use crate::network::{Network, ValidatedNetwork};
use crate::query::ResolvedQuery;
use crate::variable::{VarId, Variable};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, trace, warn};

/// A source of uniform random numbers in `[0, 1)`.
pub trait UniformSource {
    fn next_uniform(&mut self) -> f64;
}

impl<R: Rng> UniformSource for R {
    fn next_uniform(&mut self) -> f64 {
        self.gen::<f64>()
    }
}

/// Draw an index from a probability column by inverse CDF.
///
/// Zero-weight entries are never chosen. If rounding leaves `u` past the
/// cumulative total, the last positive entry is returned.
fn draw_index(weights: impl Iterator<Item = f64>, u: f64) -> usize {
    let mut cumulative = 0.0;
    let mut last_positive = 0;
    for (i, w) in weights.enumerate() {
        if w > 0.0 {
            last_positive = i;
        }
        cumulative += w;
        if u < cumulative {
            return i;
        }
    }
    last_positive
}

/// One complete assignment: a state index for every variable, by [`VarId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sample {
    states: Vec<usize>,
}

impl Sample {
    /// State index of a variable.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not a variable of the sampled network.
    pub fn state(&self, id: VarId) -> usize {
        self.states[id.index()]
    }

    pub fn states(&self) -> &[usize] {
        &self.states
    }

    /// True if the sample agrees with every observation.
    pub fn matches(&self, observed: &[(VarId, usize)]) -> bool {
        observed.iter().all(|&(id, s)| self.states[id.index()] == s)
    }

    /// State label of a named variable.
    pub fn label<'n>(&self, net: &'n Network, name: &str) -> Option<&'n str> {
        let id = net.id(name)?;
        net.var(id).state_label(self.state(id))
    }

    /// The sample as variable name → state label.
    pub fn to_labels(&self, net: &Network) -> BTreeMap<String, String> {
        net.variables()
            .iter()
            .zip(&self.states)
            .filter_map(|(v, &s)| {
                v.state_label(s)
                    .map(|label| (v.name().to_string(), label.to_string()))
            })
            .collect()
    }
}

/// Forward (ancestral) sampler over a validated network.
#[derive(Debug, Clone, Copy)]
pub struct ForwardSampler<'a> {
    net: &'a ValidatedNetwork,
}

impl<'a> ForwardSampler<'a> {
    pub fn new(net: &'a ValidatedNetwork) -> Self {
        Self { net }
    }

    /// Draw one complete assignment.
    pub fn sample_one<R: UniformSource + ?Sized>(&self, rng: &mut R) -> Sample {
        let mut states = vec![0; self.net.len()];
        let mut parent_values = Vec::new();
        for &id in self.net.order() {
            parent_values.clear();
            parent_values.extend(self.net.cpd_parents(id).iter().map(|p| states[p.index()]));
            let column = self.net.cpd_of(id).conditional(&parent_values);
            states[id.index()] = draw_index(column, rng.next_uniform());
        }
        Sample { states }
    }

    /// Draw `n` independent samples from one source.
    pub fn sample<R: UniformSource + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<Sample> {
        (0..n).map(|_| self.sample_one(rng)).collect()
    }

    /// Draw `n` samples on the rayon pool.
    ///
    /// The draws are split into `workers` contiguous chunks (the first
    /// `n % workers` chunks get one extra). Chunk `k` uses
    /// `ChaCha8Rng::seed_from_u64(seed)` on stream `k`, and the chunks are
    /// concatenated in order. With one worker this equals `sample` on
    /// `ChaCha8Rng::seed_from_u64(seed)`.
    pub fn sample_parallel(&self, n: usize, seed: u64, workers: usize) -> Vec<Sample> {
        let workers = workers.max(1);
        let base = n / workers;
        let extra = n % workers;

        let chunks: Vec<Vec<Sample>> = (0..workers)
            .into_par_iter()
            .map(|k| {
                let len = base + usize::from(k < extra);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                rng.set_stream(k as u64);
                trace!(chunk = k, draws = len, "forward sampling chunk");
                self.sample(len, &mut rng)
            })
            .collect();

        chunks.into_iter().flatten().collect()
    }
}

/// When a rejection run stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionBudget {
    /// Stop after `target` accepted samples, or after `max_draws` attempts.
    Accepted { target: usize, max_draws: usize },
    /// Make exactly this many attempts.
    Draws(usize),
}

impl RejectionBudget {
    /// Accepted-count budget with `max_draws = target * draw_limit_factor`.
    pub fn accepted(target: usize, draw_limit_factor: usize) -> Self {
        Self::Accepted {
            target,
            max_draws: target.saturating_mul(draw_limit_factor),
        }
    }

    pub fn draws(n: usize) -> Self {
        Self::Draws(n)
    }

    /// Upper bound on attempts.
    pub fn max_draws(&self) -> usize {
        match *self {
            Self::Accepted { max_draws, .. } => max_draws,
            Self::Draws(n) => n,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::Accepted { target: 0, .. } => Err(ArgumentError::InvalidBudget(
                "accepted-sample target must be positive".into(),
            )
            .into()),
            Self::Accepted { target, max_draws } if max_draws < target => {
                Err(ArgumentError::InvalidBudget(format!(
                    "draw limit {} is below the target {}",
                    max_draws, target
                ))
                .into())
            }
            Self::Draws(0) => {
                Err(ArgumentError::InvalidBudget("draw budget must be positive".into()).into())
            }
            _ => Ok(()),
        }
    }
}

/// The raw result of a rejection run.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectionOutcome {
    /// Accepted samples, in draw order.
    pub samples: Vec<Sample>,
    pub attempted: usize,
    /// False only when an `Accepted` budget ran out of draws first.
    pub target_reached: bool,
}

impl RejectionOutcome {
    pub fn accepted(&self) -> usize {
        self.samples.len()
    }
}

/// Rejection sampler for fixed evidence.
#[derive(Debug, Clone)]
pub struct RejectionSampler<'a> {
    forward: ForwardSampler<'a>,
    evidence: Evidence,
    observed: Vec<(VarId, usize)>,
}

impl<'a> RejectionSampler<'a> {
    /// # Errors
    ///
    /// Returns an error if the evidence names an unknown variable or state.
    pub fn new(net: &'a ValidatedNetwork, evidence: &Evidence) -> Result<Self> {
        Ok(Self {
            forward: ForwardSampler::new(net),
            evidence: evidence.clone(),
            observed: net.resolve_evidence(evidence)?,
        })
    }

    pub fn evidence(&self) -> &Evidence {
        &self.evidence
    }

    /// Sample until the budget is spent, keeping evidence-consistent draws.
    pub fn run<R: UniformSource + ?Sized>(
        &self,
        budget: RejectionBudget,
        rng: &mut R,
    ) -> Result<RejectionOutcome> {
        budget.validate()?;
        let target = match budget {
            RejectionBudget::Accepted { target, .. } => Some(target),
            RejectionBudget::Draws(_) => None,
        };
        let max_draws = budget.max_draws();

        let mut samples = Vec::with_capacity(target.unwrap_or(0));
        let mut attempted = 0;
        while attempted < max_draws && target.map_or(true, |t| samples.len() < t) {
            let sample = self.forward.sample_one(rng);
            attempted += 1;
            if sample.matches(&self.observed) {
                samples.push(sample);
            }
        }

        let target_reached = target.map_or(true, |t| samples.len() >= t);
        let accepted = samples.len();
        debug!(
            accepted,
            attempted,
            ratio = accepted as f64 / attempted as f64,
            "rejection sampling finished"
        );
        if accepted == 0 {
            warn!(attempted, "rejection sampling accepted no samples");
        } else if !target_reached {
            warn!(
                accepted,
                attempted, "rejection sampling hit its draw limit before the target"
            );
        }

        Ok(RejectionOutcome {
            samples,
            attempted,
            target_reached,
        })
    }

    /// Estimate P(variables | evidence) from the accepted samples.
    ///
    /// # Errors
    ///
    /// Argument errors only; zero accepted samples is
    /// [`RejectionEstimate::NoAcceptedSamples`].
    pub fn estimate<R: UniformSource + ?Sized>(
        &self,
        variables: &[&str],
        budget: RejectionBudget,
        rng: &mut R,
    ) -> Result<RejectionEstimate> {
        let query = ResolvedQuery::resolve(self.forward.net, variables, &self.evidence)?;
        let outcome = self.run(budget, rng)?;
        Ok(RejectionEstimate::from_outcome(
            self.forward.net,
            &query.variables,
            outcome,
        ))
    }
}

/// Empirical counts of the joint states of some variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Frequencies {
    variables: Vec<Variable>,
    counts: BTreeMap<Vec<usize>, usize>,
    total: usize,
}

impl Frequencies {
    /// Count the joint states of `variables` across `samples`.
    pub fn from_samples(net: &Network, variables: &[&str], samples: &[Sample]) -> Result<Self> {
        let ids = variables
            .iter()
            .map(|name| net.require_id(name))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_ids(net, &ids, samples))
    }

    pub(crate) fn from_ids(net: &Network, ids: &[VarId], samples: &[Sample]) -> Self {
        let mut counts = BTreeMap::new();
        for sample in samples {
            let key: Vec<usize> = ids.iter().map(|&id| sample.state(id)).collect();
            *counts.entry(key).or_insert(0) += 1;
        }
        Self {
            variables: ids.iter().map(|&id| net.var(id).clone()).collect(),
            counts,
            total: samples.len(),
        }
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// Number of samples counted.
    pub fn total(&self) -> usize {
        self.total
    }

    /// How often the joint state `states` was seen.
    pub fn count(&self, states: &[usize]) -> usize {
        self.counts.get(states).copied().unwrap_or(0)
    }

    /// Relative frequency of `states`, or `None` if nothing was counted.
    pub fn probability(&self, states: &[usize]) -> Option<f64> {
        if self.total == 0 {
            return None;
        }
        Some(self.count(states) as f64 / self.total as f64)
    }

    /// [`Frequencies::probability`] by state labels, in variable order.
    pub fn probability_of(&self, labels: &[&str]) -> Result<Option<f64>> {
        if labels.len() != self.variables.len() {
            return Err(ArgumentError::ShapeMismatch {
                expected: self.variables.len(),
                got: labels.len(),
            }
            .into());
        }
        let states = self
            .variables
            .iter()
            .zip(labels)
            .map(|(v, label)| v.require_state(label))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.probability(&states))
    }

    /// Observed joint states and their counts, in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (&[usize], usize)> {
        self.counts.iter().map(|(k, &c)| (k.as_slice(), c))
    }

    /// The empirical distribution as a normalized factor over the variables.
    ///
    /// # Errors
    ///
    /// Returns [`NumericError::ZeroMass`] if nothing was counted.
    pub fn to_factor(&self) -> Result<Factor> {
        if self.total == 0 {
            return Err(NumericError::ZeroMass.into());
        }
        let layout = Factor::ones(self.variables.clone())?;
        let mut values = vec![0.0; layout.len()];
        for (states, count) in self.iter() {
            values[layout.encode(states)] = count as f64;
        }
        Factor::new(self.variables.clone(), values)?.normalize()
    }
}

/// Frequencies of the accepted samples of a rejection run, with its counts.
#[derive(Debug, Clone, PartialEq)]
pub struct ApproximatePosterior {
    pub frequencies: Frequencies,
    pub accepted: usize,
    pub attempted: usize,
    pub target_reached: bool,
}

impl ApproximatePosterior {
    /// accepted / attempted, an estimate of P(evidence).
    pub fn acceptance_ratio(&self) -> f64 {
        self.accepted as f64 / self.attempted as f64
    }

    pub fn probability(&self, states: &[usize]) -> f64 {
        self.frequencies.probability(states).unwrap_or(0.0)
    }
}

/// Result of rejection-sampling estimation.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectionEstimate {
    Estimated(ApproximatePosterior),
    /// No draw agreed with the evidence.
    NoAcceptedSamples { attempted: usize },
}

impl RejectionEstimate {
    pub(crate) fn from_outcome(net: &Network, ids: &[VarId], outcome: RejectionOutcome) -> Self {
        if outcome.samples.is_empty() {
            return Self::NoAcceptedSamples {
                attempted: outcome.attempted,
            };
        }
        Self::Estimated(ApproximatePosterior {
            frequencies: Frequencies::from_ids(net, ids, &outcome.samples),
            accepted: outcome.samples.len(),
            attempted: outcome.attempted,
            target_reached: outcome.target_reached,
        })
    }

    pub fn posterior(&self) -> Option<&ApproximatePosterior> {
        match self {
            Self::Estimated(p) => Some(p),
            Self::NoAcceptedSamples { .. } => None,
        }
    }

    pub fn attempted(&self) -> usize {
        match self {
            Self::Estimated(p) => p.attempted,
            Self::NoAcceptedSamples { attempted } => *attempted,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::NoAcceptedSamples { .. })
    }
}
