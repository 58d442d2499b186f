//! Error types for network construction and inference.
//!
//! Errors fall into three families:
//!
//! - [`StructuralError`]: the network itself is malformed (raised by `check()`).
//!   Fatal for that network; no inference can run on it.
//! - [`ArgumentError`]: a caller passed something that does not fit the network
//!   (unknown name, state outside a domain, overlapping query and evidence).
//!   Recoverable by retrying with corrected arguments.
//! - [`NumericError`]: a CPD column does not sum to 1, or a normalization hit an
//!   all-zero table.
//!
//! A rejection run that accepts no samples is *not* an error; see
//! [`crate::RejectionEstimate::NoAcceptedSamples`].

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = PgmError> = std::result::Result<T, E>;

/// Coarse classification of a [`PgmError`], for callers running batches of queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Structural,
    InvalidArgument,
    NumericInconsistency,
}

/// Errors that can occur while building networks or answering queries.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PgmError {
    #[error(transparent)]
    Structural(#[from] StructuralError),

    #[error(transparent)]
    InvalidArgument(#[from] ArgumentError),

    #[error(transparent)]
    Numeric(#[from] NumericError),
}

impl PgmError {
    /// The family this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PgmError::Structural(_) => ErrorKind::Structural,
            PgmError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            PgmError::Numeric(_) => ErrorKind::NumericInconsistency,
        }
    }
}

/// The network's graph or CPD wiring is invalid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    /// The edge set contains a directed cycle.
    #[error("Network contains a cycle through {variables:?}")]
    Cycle { variables: Vec<String> },

    /// A variable has no CPD attached.
    #[error("Variable '{variable}' has no CPD")]
    MissingCpd { variable: String },

    /// A variable has more than one CPD attached.
    #[error("Variable '{variable}' has more than one CPD")]
    DuplicateCpd { variable: String },

    /// A CPD was attached for a variable the network does not contain.
    #[error("CPD attached for unknown variable '{variable}'")]
    OrphanCpd { variable: String },

    /// A CPD's parents differ from the parents declared by the edges.
    #[error("CPD for '{variable}' conditions on {found:?}, but its parents are {expected:?}")]
    ScopeMismatch {
        variable: String,
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// A CPD uses a different domain for a variable than the network does.
    #[error("CPD for '{cpd}' uses a different domain for '{variable}' than the network")]
    DomainMismatch { cpd: String, variable: String },
}

/// A caller-supplied argument does not fit the network or factor.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArgumentError {
    #[error("Unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("State '{state}' is not in the domain of '{variable}'")]
    UnknownState { variable: String, state: String },

    #[error("Variable '{0}' is already defined")]
    DuplicateVariable(String),

    #[error("Variable '{variable}' lists state '{state}' more than once")]
    DuplicateState { variable: String, state: String },

    #[error("Variable '{0}' must have at least one state")]
    EmptyDomain(String),

    #[error("Query must name at least one variable")]
    EmptyQuery,

    #[error("Variable '{0}' is both queried and observed")]
    QueryEvidenceOverlap(String),

    #[error("Variable '{0}' appears more than once in the query")]
    DuplicateQueryVariable(String),

    /// Table size does not match the scope.
    #[error("Shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: usize, got: usize },

    /// Weights must be finite and non-negative.
    #[error("Invalid weight {value} at index {index}")]
    InvalidWeight { index: usize, value: f64 },

    #[error("Variable '{0}' is not in the factor's scope")]
    NotInScope(String),

    /// The factor was already reduced on this variable, to a different state.
    #[error("Variable '{variable}' was already reduced to '{state}'")]
    AlreadyReduced { variable: String, state: String },

    /// Two factors share a variable name but not its domain.
    #[error("Factors disagree on the domain of '{0}'")]
    ConflictingDomains(String),

    /// Two factors were reduced to different states of the same variable.
    #[error("Factors observe '{0}' in different states")]
    ConflictingObservations(String),

    #[error("Invalid elimination order: {0}")]
    InvalidEliminationOrder(String),

    #[error("Invalid sampling budget: {0}")]
    InvalidBudget(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// A numeric invariant does not hold.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NumericError {
    /// A CPD column (one parent combination) does not sum to 1.
    #[error("CPD for '{variable}' sums to {sum} for parents {parents:?} (expected 1.0)")]
    CpdNotNormalized {
        variable: String,
        parents: Vec<String>,
        sum: f64,
    },

    /// All weights are zero (can't normalize). During exact inference this means
    /// the evidence has probability zero.
    #[error("Cannot normalize: all weights are zero")]
    ZeroMass,
}
