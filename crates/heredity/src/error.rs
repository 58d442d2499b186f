//! Error types for family trees and inheritance tables.

use bayes_prob::PgmError;
use thiserror::Error;

pub type Result<T, E = HeredityError> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum HeredityError {
    #[error(transparent)]
    Network(#[from] PgmError),

    #[error("Person '{0}' is already in the family tree")]
    DuplicatePerson(String),

    #[error("Person '{0}' is not in the family tree")]
    UnknownPerson(String),

    /// Both parents of a child are the same person.
    #[error("'{child}' lists '{parent}' as both father and mother")]
    SameParents { child: String, parent: String },

    /// Gene counts range over 0, 1 and 2.
    #[error("Gene count must be 0, 1 or 2, got {0}")]
    InvalidGeneCount(usize),

    #[error("Invalid heredity parameters: {0}")]
    InvalidParams(String),
}
