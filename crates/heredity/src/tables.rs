//! Inheritance probabilities and the CPDs built from them.
//!
//! Every person has a gene count G ∈ {2, 1, 0} (copies of the gene) and a
//! binary trait T. Gene states are listed in that order, so state index `i`
//! means `2 - i` copies.
//!
//! A parent with `g` copies passes one on with probability
//!
//! ```text
//! g = 2:  1 - m
//! g = 1:  1/2
//! g = 0:  m          (m = mutation probability)
//! ```
//!
//! and a child's count is the sum of two independent passes, one per parent.

use crate::error::{HeredityError, Result};
use bayes_prob::{TabularCpd, Variable};
use serde::{Deserialize, Serialize};

/// Gene-count state labels, most copies first.
pub const GENE_STATES: [&str; 3] = ["2", "1", "0"];

/// Trait state labels.
pub const TRAIT_STATES: [&str; 2] = ["yes", "no"];

/// Name of the gene-count variable for a person.
pub fn gene_name(person: &str) -> String {
    format!("G_{}", person)
}

/// Name of the trait variable for a person.
pub fn trait_name(person: &str) -> String {
    format!("T_{}", person)
}

pub fn gene_variable(person: &str) -> Result<Variable> {
    Ok(Variable::new(gene_name(person), GENE_STATES)?)
}

pub fn trait_variable(person: &str) -> Result<Variable> {
    Ok(Variable::new(trait_name(person), TRAIT_STATES)?)
}

/// State index of a gene count.
pub fn gene_state(copies: usize) -> Result<usize> {
    match copies {
        0..=2 => Ok(2 - copies),
        _ => Err(HeredityError::InvalidGeneCount(copies)),
    }
}

/// Model constants. Arrays are indexed by gene state (2, 1, 0 copies).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeredityParams {
    /// P(G) for a person with no parents in the tree.
    pub gene_prior: [f64; 3],
    /// P(T = yes | G).
    pub trait_given_gene: [f64; 3],
    /// Probability that a passed gene flips.
    pub mutation: f64,
}

impl Default for HeredityParams {
    fn default() -> Self {
        Self {
            gene_prior: [0.01, 0.03, 0.96],
            trait_given_gene: [0.65, 0.56, 0.01],
            mutation: 0.01,
        }
    }
}

impl HeredityParams {
    pub fn from_json(json: &str) -> Result<Self> {
        let params: Self =
            serde_json::from_str(json).map_err(|e| HeredityError::InvalidParams(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    /// Check every probability is in [0, 1] and the prior sums to 1.
    pub fn validate(&self) -> Result<()> {
        let mut probabilities = self
            .gene_prior
            .iter()
            .chain(&self.trait_given_gene)
            .chain(std::iter::once(&self.mutation));
        if let Some(p) = probabilities.find(|p| !(0.0..=1.0).contains(*p)) {
            return Err(HeredityError::InvalidParams(format!(
                "{} is not a probability",
                p
            )));
        }

        let sum: f64 = self.gene_prior.iter().sum();
        if (sum - 1.0).abs() > bayes_prob::PROB_TOLERANCE {
            return Err(HeredityError::InvalidParams(format!(
                "gene prior sums to {}",
                sum
            )));
        }
        Ok(())
    }

    /// Probability that a parent with `copies` copies passes the gene on.
    pub fn inherit_probability(&self, copies: usize) -> Result<f64> {
        Ok(self.pass_probability(gene_state(copies)?))
    }

    fn pass_probability(&self, state: usize) -> f64 {
        match state {
            0 => 1.0 - self.mutation,
            1 => 0.5,
            _ => self.mutation,
        }
    }

    /// P(child's gene count) given each parent's count, over [2, 1, 0] copies.
    pub fn child_gene_distribution(&self, father: usize, mother: usize) -> Result<[f64; 3]> {
        Ok(self.child_distribution_at(gene_state(father)?, gene_state(mother)?))
    }

    fn child_distribution_at(&self, father_state: usize, mother_state: usize) -> [f64; 3] {
        let f = self.pass_probability(father_state);
        let m = self.pass_probability(mother_state);
        [
            f * m,
            f * (1.0 - m) + (1.0 - f) * m,
            (1.0 - f) * (1.0 - m),
        ]
    }

    /// P(G_person) for a founder.
    pub fn gene_prior_cpd(&self, person: &str) -> Result<TabularCpd> {
        Ok(TabularCpd::prior(
            gene_variable(person)?,
            self.gene_prior.to_vec(),
        )?)
    }

    /// P(G_child | G_father, G_mother).
    pub fn child_gene_cpd(&self, child: &str, father: &str, mother: &str) -> Result<TabularCpd> {
        let parents = vec![gene_variable(father)?, gene_variable(mother)?];
        Ok(TabularCpd::from_fn(gene_variable(child)?, parents, |s| {
            self.child_distribution_at(s[0], s[1]).to_vec()
        })?)
    }

    /// P(T_person | G_person).
    pub fn trait_cpd(&self, person: &str) -> Result<TabularCpd> {
        Ok(TabularCpd::from_fn(
            trait_variable(person)?,
            vec![gene_variable(person)?],
            |s| {
                let yes = self.trait_given_gene[s[0]];
                vec![yes, 1.0 - yes]
            },
        )?)
    }
}
