//! Query error types
//!
//! Defines the error conditions that can surface from the engine.
//! Almost nothing does: a query never aborts mid-pipeline, so malformed
//! clauses degrade instead of erroring.

use thiserror::Error;

/// Errors that can occur during query operations
#[derive(Error, Debug)]
pub enum QueryError {
    /// Input data was not a record or a sequence of records. The only
    /// fatal construction-time condition.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A subsearch chain recursed past the depth guard.
    #[error("Subsearch recursion limit exceeded at depth {0}")]
    RecursionLimit(usize),
}

/// Result type for query operations
pub type QueryResult<T> = Result<T, QueryError>;
