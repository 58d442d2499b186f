//! # Bayes Heredity - Inheritance Networks
//!
//! Conditional probability tables for a single-gene trait and a family-tree
//! builder that wires them into a [`bayes_prob::Network`].
//!
//! Every table is generated by a pure function from the parents' states to a
//! distribution over the child's states (see [`HeredityParams`]), so any
//! family shape can be assembled without writing tables by hand.
//!
//! ## Example
//!
//! ```rust
//! use bayes_heredity::FamilyTree;
//!
//! let mut family = FamilyTree::new();
//! family
//!     .founder("James").unwrap()
//!     .founder("Lily").unwrap()
//!     .child("Harry", "James", "Lily").unwrap();
//! let net = family.build().unwrap();
//!
//! let evidence = family.trait_evidence(&[("Harry", true), ("James", false)]).unwrap();
//! let predictions = family.predict(&net, &evidence).unwrap();
//!
//! let harry = &predictions[2];
//! assert_eq!(harry.trait_yes, 1.0);
//! // Showing the trait makes carrying at least one copy likely.
//! assert!(harry.genes[0] + harry.genes[1] > 0.5);
//! ```

mod error;
mod family;
mod tables;

pub use error::{HeredityError, Result};
pub use family::{FamilyTree, Prediction};
pub use tables::{
    gene_name, gene_state, gene_variable, trait_name, trait_variable, HeredityParams,
    GENE_STATES, TRAIT_STATES,
};
