//! # Bayes Prob - Discrete Bayesian Networks
//!
//! This crate builds directed acyclic networks of discrete random variables,
//! each with a conditional probability table, and answers queries against them
//! exactly (variable elimination) or approximately (forward and rejection
//! sampling).
//!
//! ## Core Concepts
//!
//! - **Factors are the algebra**: multiply, sum out, reduce on evidence, normalize
//! - **A CPD is a factor** over `[child, parents...]` whose columns sum to 1
//! - **The joint factorizes**: P(X₁, ..., Xₙ) = ∏ᵢ P(Xᵢ | parents(Xᵢ))
//! - **Validation gates inference**: only a [`ValidatedNetwork`] can be queried
//! - **Conditioning renormalizes**: P(Q | E=e) = P(Q, E=e) / P(E=e)
//!
//! ## Example: Traffic
//!
//! ```rust
//! use bayes_prob::{Evidence, Inference, Network, Variable};
//!
//! let mut net = Network::new();
//! net.add_variable(Variable::new("Weather", ["sunny", "rain", "snow"]).unwrap()).unwrap();
//! net.add_variable(Variable::new("Accident", ["yes", "no"]).unwrap()).unwrap();
//! net.add_edge("Weather", "Accident").unwrap();
//!
//! net.attach_table("Weather", &[], vec![vec![0.7], vec![0.2], vec![0.1]]).unwrap();
//! net.attach_table(
//!     "Accident",
//!     &["Weather"],
//!     vec![
//!         vec![0.1, 0.2, 0.4], // yes | sunny, rain, snow
//!         vec![0.9, 0.8, 0.6], // no
//!     ],
//! )
//! .unwrap();
//!
//! let net = net.validate().unwrap();
//! let inference = Inference::new(&net);
//!
//! // P(Accident | Weather=rain) = [0.2, 0.8]
//! let p = inference
//!     .query_exact(&["Accident"], &Evidence::new().with("Weather", "rain"))
//!     .unwrap();
//! assert!((p.values()[0] - 0.2).abs() < 1e-9);
//!
//! // P(Accident) = 0.7·0.1 + 0.2·0.2 + 0.1·0.4
//! let p = inference.query_exact(&["Accident"], &Evidence::new()).unwrap();
//! assert!((p.values()[0] - 0.15).abs() < 1e-9);
//! ```

mod config;
mod cpd;
mod elimination;
mod error;
mod evidence;
mod factor;
mod network;
mod query;
mod sampling;
mod variable;

pub use config::{InferenceConfig, SamplingConfig};
pub use cpd::TabularCpd;
pub use elimination::{EliminationHeuristic, VariableElimination};
pub use error::{ArgumentError, ErrorKind, NumericError, PgmError, Result, StructuralError};
pub use evidence::Evidence;
pub use factor::Factor;
pub use network::{Network, ValidatedNetwork};
pub use query::{Inference, QueryAnswer, QueryMethod, ResolvedQuery};
pub use sampling::{
    ApproximatePosterior, ForwardSampler, Frequencies, RejectionBudget, RejectionEstimate,
    RejectionOutcome, RejectionSampler, Sample, UniformSource,
};
pub use variable::{VarId, Variable};

/// Tolerance for probability comparisons.
pub const PROB_TOLERANCE: f64 = 1e-9;
