//! Subsearch Resolver
//!
//! A subsearch is a bracket-delimited query inside a query:
//!
//! ```text
//! [search status="active" | fields user] | stats count by user
//! ```
//!
//! Subsearches run first, against the original dataset, and their result
//! records are folded back into the outer query text as a synthesized
//! filter condition. Resolution is a pure text-to-text transform done
//! once before command parsing.

use crate::query::executor::Engine;
use crate::query::QueryResult;
use crate::record::Record;
use crate::value::Value;

/// Condition guaranteed to match nothing, spliced in when a subsearch
/// produces no usable results.
const IMPOSSIBLE: &str = "nonsearchfield=impossiblevalue";

/// A captured `[...]` span: inner text plus the byte range of the whole
/// span including brackets.
#[derive(Debug, Clone, PartialEq)]
struct Span {
    text: String,
    start: usize,
    end: usize,
}

/// Replace every subsearch span in `query` with a synthesized condition.
///
/// Spans are resolved right to left so earlier byte offsets stay valid.
/// Each span executes as a full query through the engine at `depth + 1`;
/// the engine's depth guard bounds runaway nesting.
pub(crate) fn resolve(query: &str, engine: &Engine, depth: usize) -> QueryResult<String> {
    let spans = extract_spans(query);
    if spans.is_empty() {
        return Ok(query.to_string());
    }

    let mut resolved = query.to_string();

    for span in spans.iter().rev() {
        // A `field=` immediately before the bracket is consumed together
        // with the span; synthesis already names fields itself.
        let mut splice_start = span.start;
        let before = resolved[..span.start].trim_end();
        if before.ends_with('=') {
            let name_start = before[..before.len() - 1]
                .rfind(|c: char| c == ' ' || c == '|' || c == '\t')
                .map(|i| i + 1)
                .unwrap_or(0);
            splice_start = name_start;
        }

        let results = engine.execute_at_depth(&span.text, depth + 1)?;
        let condition = synthesize_condition(&results);
        tracing::trace!(
            subsearch = %span.text,
            condition = %condition,
            "resolved subsearch"
        );

        resolved = format!(
            "{}{}{}",
            &resolved[..splice_start],
            condition,
            &resolved[span.end..]
        );
    }

    Ok(resolved)
}

/// Scan for bracket-delimited spans with a single depth counter. Nested
/// brackets extend the current span; only a close that returns the
/// counter to zero captures.
fn extract_spans(query: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut depth = 0i32;
    let mut start: Option<usize> = None;

    for (i, c) in query.char_indices() {
        match c {
            '[' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            ']' => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start.take() {
                        spans.push(Span {
                            text: query[s + 1..i].to_string(),
                            start: s,
                            end: i + 1,
                        });
                    }
                }
            }
            _ => {}
        }
    }

    spans
}

/// Turn subsearch results into a filter condition for the outer query.
///
/// - no results, or an empty first record: a never-matching sentinel
/// - one field: `field=value`, or an OR chain over the distinct values
/// - several fields: each record becomes an ANDed group, groups are ORed
fn synthesize_condition(results: &[Record]) -> String {
    let first = match results.first() {
        Some(r) if !r.is_empty() => r,
        _ => return IMPOSSIBLE.to_string(),
    };

    let fields: Vec<&String> = first.fields().collect();

    if fields.len() == 1 {
        let field = fields[0];
        let mut values: Vec<&Value> = Vec::new();
        for record in results {
            if let Some(v) = record.get(field) {
                if !v.is_null() && !values.contains(&v) {
                    values.push(v);
                }
            }
        }

        return match values.as_slice() {
            [] => IMPOSSIBLE.to_string(),
            [value] => format_comparison(field, value),
            many => {
                let clauses: Vec<String> =
                    many.iter().map(|v| format_comparison(field, v)).collect();
                format!("({})", clauses.join(" OR "))
            }
        };
    }

    let mut record_clauses = Vec::new();
    for record in results {
        let field_clauses: Vec<String> = record
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(f, v)| format_comparison(f, v))
            .collect();

        match field_clauses.len() {
            0 => {}
            1 => record_clauses.push(field_clauses.into_iter().next().unwrap_or_default()),
            _ => record_clauses.push(format!("({})", field_clauses.join(" "))),
        }
    }

    match record_clauses.len() {
        0 => IMPOSSIBLE.to_string(),
        1 => record_clauses.remove(0),
        _ => format!("({})", record_clauses.join(" OR ")),
    }
}

fn format_comparison(field: &str, value: &Value) -> String {
    match value {
        Value::Str(s) => format!("{}=\"{}\"", field, s),
        other => format!("{}={}", field, other),
    }
}
