//! Query Executor
//!
//! [`Engine`] owns an in-memory dataset and runs pipelines against it.
//! Execution is a pure fold: the dataset enters the first stage, each
//! command transforms the record vector, and the last stage's output is
//! returned. The source data is never mutated, so one engine can serve
//! any number of queries.

use serde_json::Value as JsonValue;

use crate::commands;
use crate::query::condition::evaluate_condition;
use crate::query::parser::{parse_pipeline, Command};
use crate::query::subsearch;
use crate::query::{QueryError, QueryResult};
use crate::record::{Dataset, Record};

/// Maximum allowed subsearch nesting before execution is refused.
pub const MAX_SUBSEARCH_DEPTH: usize = 10;

/// An immutable dataset plus the machinery to query it.
pub struct Engine {
    data: Dataset,
}

impl Engine {
    /// Build an engine over an already-typed dataset.
    pub fn new(data: Dataset) -> Self {
        Self { data }
    }

    /// Build an engine from parsed JSON. A single object becomes a
    /// one-record dataset; an array must contain only objects.
    pub fn from_json(json: JsonValue) -> QueryResult<Self> {
        let data = match json {
            JsonValue::Object(_) => {
                let record: Record = serde_json::from_value(json)
                    .map_err(|e| QueryError::InvalidInput(e.to_string()))?;
                vec![record]
            }
            JsonValue::Array(items) => {
                let mut records = Vec::with_capacity(items.len());
                for (i, item) in items.into_iter().enumerate() {
                    if !item.is_object() {
                        return Err(QueryError::InvalidInput(format!(
                            "element {} is not an object",
                            i
                        )));
                    }
                    let record: Record = serde_json::from_value(item)
                        .map_err(|e| QueryError::InvalidInput(e.to_string()))?;
                    records.push(record);
                }
                records
            }
            other => {
                return Err(QueryError::InvalidInput(format!(
                    "expected an object or an array of objects, got {}",
                    json_kind(&other)
                )))
            }
        };

        Ok(Self::new(data))
    }

    /// The underlying dataset.
    pub fn records(&self) -> &[Record] {
        &self.data
    }

    /// Run a query and return the resulting records.
    ///
    /// The only error paths are construction-time input validation and
    /// the subsearch depth guard; every malformed clause inside the
    /// pipeline degrades to an empty or unchanged result instead.
    pub fn execute(&self, query: &str) -> QueryResult<Dataset> {
        self.execute_at_depth(query, 0)
    }

    pub(crate) fn execute_at_depth(&self, query: &str, depth: usize) -> QueryResult<Dataset> {
        if depth > MAX_SUBSEARCH_DEPTH {
            return Err(QueryError::RecursionLimit(depth));
        }

        let resolved = subsearch::resolve(query, self, depth)?;
        let pipeline = parse_pipeline(&resolved);
        tracing::debug!(query = %query, stages = pipeline.len(), "executing pipeline");

        let mut data = self.data.clone();
        for command in &pipeline {
            let before = data.len();
            data = run_command(data, command);
            tracing::debug!(
                stage = command.name(),
                records_in = before,
                records_out = data.len(),
                "stage complete"
            );
        }

        Ok(data)
    }
}

/// Dispatch one pipeline stage.
fn run_command(data: Dataset, command: &Command) -> Dataset {
    match command {
        // A bare `search`/`where` with no condition matches everything
        Command::Search(condition) if condition.trim().is_empty() => data,
        Command::Search(condition) => data
            .into_iter()
            .filter(|record| evaluate_condition(record, condition))
            .collect(),
        Command::Stats(args) => commands::stats::execute_stats(data, args),
        Command::Eventstats(args) => commands::stats::execute_eventstats(data, args),
        Command::Fields(args) => commands::fields::execute_fields(data, args),
        Command::Rename(args) => commands::fields::execute_rename(data, args),
        Command::Eval(args) => commands::eval::execute_eval(data, args),
        Command::Sort(args) => commands::sort::execute_sort(data, args),
        Command::Head(args) => commands::sort::execute_head(data, args),
        Command::Tail(args) => commands::sort::execute_tail(data, args),
        Command::Table(args) => commands::fields::execute_table(data, args),
    }
}

fn json_kind(json: &JsonValue) -> &'static str {
    match json {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
