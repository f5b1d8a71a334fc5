//! # rspl
//!
//! SPL-style pipeline queries over in-memory JSON-like records.
//!
//! ## Features
//!
//! - **Pipelines**: `search | stats | eval | sort | head ...` stages
//!   chained with `|`
//! - **Forgiving filters**: quoted strings, numeric coercion, wildcard
//!   presence checks, OR alternatives
//! - **Aggregation**: `stats` collapses groups, `eventstats` enriches
//!   records in place
//! - **Subsearches**: bracketed inner queries feed the outer filter
//!
//! ## Modules
//!
//! - [`value`]: The dynamic value type and comparison rules
//! - [`record`]: Ordered field maps and datasets
//! - [`query`]: Pipeline parsing, filtering and execution
//! - [`commands`]: The individual pipeline stage transforms
//!
//! ## Quick Start
//!
//! ```rust
//! use rspl::Engine;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = Engine::from_json(serde_json::json!([
//!         {"name": "alice", "age": 30, "city": "NYC"},
//!         {"name": "bob", "age": 25, "city": "LA"},
//!         {"name": "charlie", "age": 35, "city": "NYC"},
//!     ]))?;
//!
//!     let results = engine.execute("city=\"NYC\" | stats avg(age) by city")?;
//!     assert_eq!(results.len(), 1);
//!     Ok(())
//! }
//! ```

pub mod commands;
pub mod query;
pub mod record;
pub mod value;

pub use query::{Command, Engine, QueryError, QueryResult};
pub use record::{Dataset, Record};
pub use value::Value;
