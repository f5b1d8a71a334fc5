//! Query Engine
//!
//! Provides a pipe-separated query language over in-memory records:
//!
//! - **Parser**: Split a query string into a command pipeline
//! - **Condition**: Evaluate filter expressions against records
//! - **Subsearch**: Resolve bracketed inner queries into conditions
//! - **Executor**: Run the pipeline stage by stage
//!
//! # Query Language
//!
//! ```text
//! search status="active" age>30 | stats count by city | sort -count | head 5
//! ```
//!
//! # Examples
//!
//! ```rust,ignore
//! use rspl::Engine;
//!
//! let engine = Engine::from_json(serde_json::json!([
//!     {"name": "alice", "age": 30},
//!     {"name": "bob", "age": 25},
//! ]))?;
//!
//! let results = engine.execute("age>27 | fields name")?;
//! ```

mod condition;
mod error;
mod executor;
mod parser;
mod subsearch;

pub use condition::evaluate_condition;
pub use error::{QueryError, QueryResult};
pub use executor::{Engine, MAX_SUBSEARCH_DEPTH};
pub use parser::{parse_pipeline, split_pipes, Command};
