//! Pipeline command implementations
//!
//! Each command is a pure `Dataset -> Dataset` transform taking its raw
//! argument string. Argument parsing is forgiving throughout: a clause
//! that cannot be parsed degrades the stage to an identity or empty
//! transform rather than failing the query.

pub mod eval;
pub mod fields;
pub mod sort;
pub mod stats;
