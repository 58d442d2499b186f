//! Family trees as Bayesian networks.
//!
//! Each person contributes two variables: `G_<name>` (gene count) and
//! `T_<name>` (trait). Edges run from both parents' gene counts to the child's,
//! and from each gene count to the same person's trait. Founders (people whose
//! parents are not in the tree) get the unconditional gene prior.
//!
//! ```text
//!   G_Father   G_Mother
//!      │   ╲   ╱   │
//!      ▼    ▼ ▼    ▼
//!   T_Father G_Child T_Mother
//!              │
//!              ▼
//!           T_Child
//! ```

use crate::error::{HeredityError, Result};
use crate::tables::{
    gene_name, gene_state, gene_variable, trait_name, trait_variable, HeredityParams,
};
use bayes_prob::{Evidence, Network, ValidatedNetwork, VariableElimination};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone)]
struct Person {
    name: String,
    parents: Option<(String, String)>,
}

/// Builder for an inheritance network.
///
/// # Example
///
/// ```rust
/// use bayes_heredity::FamilyTree;
///
/// let mut family = FamilyTree::new();
/// family
///     .founder("James").unwrap()
///     .founder("Lily").unwrap()
///     .child("Harry", "James", "Lily").unwrap();
///
/// let net = family.build().unwrap();
/// assert_eq!(net.len(), 6);
/// ```
#[derive(Debug, Clone, Default)]
pub struct FamilyTree {
    params: HeredityParams,
    people: Vec<Person>,
    index: HashMap<String, usize>,
}

/// Posterior beliefs about one person.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub person: String,
    /// P(G = 2, 1, 0 copies | evidence).
    pub genes: [f64; 3],
    /// P(T = yes | evidence).
    pub trait_yes: f64,
}

impl FamilyTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(params: HeredityParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            ..Self::default()
        })
    }

    pub fn params(&self) -> &HeredityParams {
        &self.params
    }

    /// Add a person with no parents in the tree.
    pub fn founder(&mut self, name: &str) -> Result<&mut Self> {
        self.insert(name, None)
    }

    /// Add a child of two people already in the tree.
    pub fn child(&mut self, name: &str, father: &str, mother: &str) -> Result<&mut Self> {
        for parent in [father, mother] {
            if !self.index.contains_key(parent) {
                return Err(HeredityError::UnknownPerson(parent.to_string()));
            }
        }
        if father == mother {
            return Err(HeredityError::SameParents {
                child: name.to_string(),
                parent: father.to_string(),
            });
        }
        self.insert(name, Some((father.to_string(), mother.to_string())))
    }

    fn insert(&mut self, name: &str, parents: Option<(String, String)>) -> Result<&mut Self> {
        if self.index.contains_key(name) {
            return Err(HeredityError::DuplicatePerson(name.to_string()));
        }
        self.index.insert(name.to_string(), self.people.len());
        self.people.push(Person {
            name: name.to_string(),
            parents,
        });
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.people.len()
    }

    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }

    /// People in insertion order.
    pub fn people(&self) -> impl Iterator<Item = &str> {
        self.people.iter().map(|p| p.name.as_str())
    }

    pub fn parents_of(&self, name: &str) -> Result<Option<(&str, &str)>> {
        let person = self.person(name)?;
        Ok(person
            .parents
            .as_ref()
            .map(|(f, m)| (f.as_str(), m.as_str())))
    }

    fn person(&self, name: &str) -> Result<&Person> {
        self.index
            .get(name)
            .map(|&i| &self.people[i])
            .ok_or_else(|| HeredityError::UnknownPerson(name.to_string()))
    }

    /// Assemble the unvalidated network.
    pub fn network(&self) -> Result<Network> {
        let mut net = Network::new();
        for person in &self.people {
            net.add_variable(gene_variable(&person.name)?)?;
            net.add_variable(trait_variable(&person.name)?)?;
        }

        for person in &self.people {
            let gene = gene_name(&person.name);
            net.add_edge(&gene, &trait_name(&person.name))?;
            net.attach_cpd(self.params.trait_cpd(&person.name)?);

            match &person.parents {
                None => net.attach_cpd(self.params.gene_prior_cpd(&person.name)?),
                Some((father, mother)) => {
                    net.add_edge(&gene_name(father), &gene)?;
                    net.add_edge(&gene_name(mother), &gene)?;
                    net.attach_cpd(self.params.child_gene_cpd(&person.name, father, mother)?);
                }
            }
        }
        Ok(net)
    }

    /// Assemble and validate the network.
    pub fn build(&self) -> Result<ValidatedNetwork> {
        let net = self.network()?.validate()?;
        debug!(people = self.len(), variables = net.len(), "family network built");
        Ok(net)
    }

    /// Evidence observing each listed person's trait.
    pub fn trait_evidence(&self, observations: &[(&str, bool)]) -> Result<Evidence> {
        let mut evidence = Evidence::new();
        for &(name, has_trait) in observations {
            self.person(name)?;
            evidence.insert(trait_name(name), if has_trait { "yes" } else { "no" });
        }
        Ok(evidence)
    }

    /// Evidence observing each listed person's gene count (0, 1 or 2).
    pub fn gene_evidence(&self, observations: &[(&str, usize)]) -> Result<Evidence> {
        let mut evidence = Evidence::new();
        for &(name, copies) in observations {
            self.person(name)?;
            gene_state(copies)?;
            evidence.insert(gene_name(name), copies.to_string());
        }
        Ok(evidence)
    }

    /// Exact posterior gene counts and trait probability for every person.
    ///
    /// Observed variables are reported as certainties. Every evidence entry
    /// must name a variable of `net` and a state in its domain.
    pub fn predict(&self, net: &ValidatedNetwork, evidence: &Evidence) -> Result<Vec<Prediction>> {
        net.resolve_evidence(evidence)?;
        let ve = VariableElimination::new(net);
        self.people
            .iter()
            .map(|person| {
                let gene = gene_name(&person.name);
                let genes = match evidence.get(&gene) {
                    Some(copies) => {
                        let var = net
                            .variable(&gene)
                            .ok_or_else(|| HeredityError::UnknownPerson(person.name.clone()))?;
                        let mut one_hot = [0.0; 3];
                        one_hot[var.require_state(copies)?] = 1.0;
                        one_hot
                    }
                    None => {
                        let f = ve.query(&[gene.as_str()], evidence)?;
                        [f.values()[0], f.values()[1], f.values()[2]]
                    }
                };

                let trait_var = trait_name(&person.name);
                let trait_yes = match evidence.get(&trait_var) {
                    Some(state) => {
                        if trait_variable(&person.name)?.require_state(state)? == 0 {
                            1.0
                        } else {
                            0.0
                        }
                    }
                    None => ve.query(&[trait_var.as_str()], evidence)?.values()[0],
                };

                Ok(Prediction {
                    person: person.name.clone(),
                    genes,
                    trait_yes,
                })
            })
            .collect()
    }
}
