//! Aggregation engine: `stats` and `eventstats`
//!
//! Both commands share one argument grammar:
//!
//! ```text
//! stats count, avg(age) by city
//! stats sum(price) as total dc(category) as categories by region
//! ```
//!
//! Two spec syntaxes are accepted. The legacy one is comma-separated
//! with no aliases; it is selected only when a comma is present and no
//! `as` keyword appears anywhere. Otherwise the spec is tokenized on
//! whitespace (commas act as extra separators) with optional
//! `<func> as <alias>` triples.
//!
//! `stats` collapses each group to one output record; `eventstats`
//! computes the same per-group values but copies every input record
//! through, augmented with the aggregate fields, preserving length and
//! order exactly.

use crate::record::{Dataset, Record};
use crate::value::Value;

/// An aggregation function identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggFunc {
    Count,
    Sum,
    Avg,
    Min,
    Max,
    /// Population standard deviation: sqrt(sum((x - mean)^2) / n)
    Stdev,
    /// Sample standard deviation: divisor n - 1
    StdevSample,
    /// Sorted distinct non-null values
    Values,
    /// All non-null values, duplicates kept, input order
    List,
    /// Count of distinct non-null values
    DistinctCount,
}

impl AggFunc {
    /// Parse from the name as written in a query.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "count" => Some(Self::Count),
            "sum" => Some(Self::Sum),
            "avg" | "mean" => Some(Self::Avg),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            "stdev" | "stdevp" => Some(Self::Stdev),
            "stdevs" => Some(Self::StdevSample),
            "values" => Some(Self::Values),
            "list" => Some(Self::List),
            "dc" | "distinct_count" => Some(Self::DistinctCount),
            _ => None,
        }
    }

    /// Apply the function over a group of records.
    ///
    /// Non-numeric values are silently skipped by the numeric functions
    /// rather than erroring; numeric strings participate.
    pub fn apply(&self, records: &[&Record], field: Option<&str>) -> Value {
        match self {
            Self::Count => match field {
                Some(f) => Value::Int(non_null(records, f).count() as i64),
                None => Value::Int(records.len() as i64),
            },
            Self::Sum => Value::Float(numeric(records, field).sum()),
            Self::Avg => {
                let values: Vec<f64> = numeric(records, field).collect();
                if values.is_empty() {
                    Value::Float(0.0)
                } else {
                    Value::Float(values.iter().sum::<f64>() / values.len() as f64)
                }
            }
            Self::Min => pick_extreme(records, field, std::cmp::Ordering::Less),
            Self::Max => pick_extreme(records, field, std::cmp::Ordering::Greater),
            Self::Stdev => Value::Float(stdev(&numeric(records, field).collect::<Vec<_>>(), 0)),
            Self::StdevSample => {
                Value::Float(stdev(&numeric(records, field).collect::<Vec<_>>(), 1))
            }
            Self::Values => Value::List(distinct_sorted(records, field)),
            Self::List => Value::List(non_null(records, field.unwrap_or("")).cloned().collect()),
            Self::DistinctCount => Value::Int(distinct_sorted(records, field).len() as i64),
        }
    }
}

/// One parsed aggregation: output field name, function, optional source
/// field.
#[derive(Debug, Clone, PartialEq)]
pub struct AggSpec {
    pub output: String,
    pub func: AggFunc,
    pub field: Option<String>,
}

/// Collapsing aggregation: one output record per group.
pub fn execute_stats(data: Dataset, args: &str) -> Dataset {
    if data.is_empty() {
        return Vec::new();
    }

    let (agg_part, group_fields) = split_by_clause(args);
    let specs = parse_agg_specs(&agg_part);
    if specs.is_empty() {
        return Vec::new();
    }

    if group_fields.is_empty() {
        let refs: Vec<&Record> = data.iter().collect();
        let mut result = Record::new();
        for spec in &specs {
            result.insert(spec.output.clone(), spec.func.apply(&refs, spec.field.as_deref()));
        }
        return vec![result];
    }

    group_records(&data, &group_fields)
        .into_iter()
        .map(|(key, members)| {
            let mut result = Record::new();
            for (field, value) in group_fields.iter().zip(key) {
                result.insert(field.clone(), value);
            }
            for spec in &specs {
                result.insert(spec.output.clone(), spec.func.apply(&members, spec.field.as_deref()));
            }
            result
        })
        .collect()
}

/// Enriching aggregation: every input record is copied through with the
/// per-group aggregate fields added. Output length equals input length
/// and input order is preserved.
pub fn execute_eventstats(data: Dataset, args: &str) -> Dataset {
    if data.is_empty() {
        return Vec::new();
    }

    let (agg_part, group_fields) = split_by_clause(args);
    let specs = parse_agg_specs(&agg_part);
    if specs.is_empty() {
        return data;
    }

    if group_fields.is_empty() {
        let refs: Vec<&Record> = data.iter().collect();
        let aggregates: Vec<(String, Value)> = specs
            .iter()
            .map(|spec| (spec.output.clone(), spec.func.apply(&refs, spec.field.as_deref())))
            .collect();

        return data
            .into_iter()
            .map(|mut record| {
                for (name, value) in &aggregates {
                    record.insert(name.clone(), value.clone());
                }
                record
            })
            .collect();
    }

    let groups = group_records(&data, &group_fields);
    let group_aggs: Vec<(Vec<Value>, Vec<(String, Value)>)> = groups
        .into_iter()
        .map(|(key, members)| {
            let aggregates = specs
                .iter()
                .map(|spec| (spec.output.clone(), spec.func.apply(&members, spec.field.as_deref())))
                .collect();
            (key, aggregates)
        })
        .collect();

    data.into_iter()
        .map(|mut record| {
            let key = group_key(&record, &group_fields);
            if let Some((_, aggregates)) = group_aggs.iter().find(|(k, _)| keys_match(k, &key)) {
                for (name, value) in aggregates {
                    record.insert(name.clone(), value.clone());
                }
            }
            record
        })
        .collect()
}

/// Split arguments at the first case-insensitive standalone ` by `
/// keyword into the spec part and the comma-separated group-by fields.
fn split_by_clause(args: &str) -> (String, Vec<String>) {
    let chars: Vec<(usize, char)> = args.char_indices().collect();

    for j in 0..chars.len() {
        let (pos, c) = chars[j];
        if matches!(c, 'b' | 'B')
            && j > 0
            && chars[j - 1].1.is_whitespace()
            && j + 2 < chars.len()
            && matches!(chars[j + 1].1, 'y' | 'Y')
            && chars[j + 2].1.is_whitespace()
        {
            let agg_part = args[..pos].trim().to_string();
            let by_part = &args[chars[j + 2].0..];
            let group_fields = by_part
                .split(',')
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty())
                .collect();
            return (agg_part, group_fields);
        }
    }

    (args.trim().to_string(), Vec::new())
}

/// Parse the aggregation-spec part of a stats/eventstats argument.
///
/// Malformed fragments are dropped silently; the rest of the spec still
/// applies.
pub fn parse_agg_specs(agg_str: &str) -> Vec<AggSpec> {
    // Legacy comma-separated syntax, kept for backward compatibility:
    // only when a comma is present and no `as` appears anywhere
    if agg_str.contains(',') && !agg_str.to_ascii_lowercase().contains(" as ") {
        return split_top_level_commas(agg_str)
            .iter()
            .filter_map(|part| parse_single_spec(part.trim(), None))
            .collect();
    }

    let tokens = tokenize_specs(agg_str);
    let mut specs = Vec::new();

    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];

        let starts_agg = token.contains('(') || token.eq_ignore_ascii_case("count");
        if !starts_agg {
            i += 1;
            continue;
        }

        let mut alias = None;
        if i + 2 < tokens.len() && tokens[i + 1].eq_ignore_ascii_case("as") {
            alias = Some(tokens[i + 2].clone());
            i += 3;
        } else {
            i += 1;
        }

        if let Some(spec) = parse_single_spec(token, alias) {
            specs.push(spec);
        }
    }

    specs
}

/// Parse one spec like `count`, `sum(price)` or `dc(category)`; the
/// default output name is `func(field)` (or the bare function name),
/// overridden by an explicit alias.
fn parse_single_spec(spec: &str, alias: Option<String>) -> Option<AggSpec> {
    let spec = spec.trim();
    if spec.is_empty() {
        return None;
    }

    if let Some(open) = spec.find('(') {
        let close = spec[open..].find(')')? + open;
        let name = spec[..open].trim();
        if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return None;
        }
        let func = AggFunc::from_name(name)?;
        let field = spec[open + 1..close].trim();

        let written = name.to_ascii_lowercase();
        let output = alias.unwrap_or_else(|| {
            if field.is_empty() {
                written.clone()
            } else {
                format!("{}({})", written, field)
            }
        });

        return Some(AggSpec {
            output,
            func,
            field: if field.is_empty() {
                None
            } else {
                Some(field.to_string())
            },
        });
    }

    // Bare function name without parentheses (e.g. `count`)
    let func = AggFunc::from_name(spec)?;
    Some(AggSpec {
        output: alias.unwrap_or_else(|| spec.to_ascii_lowercase()),
        func,
        field: None,
    })
}

/// Tokenize a spec string on spaces and commas, never splitting inside
/// parenthesized field lists.
fn tokenize_specs(agg_str: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;

    for c in agg_str.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth -= 1;
                current.push(c);
            }
            ' ' | ',' if depth == 0 => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

fn split_top_level_commas(s: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;

    for c in s.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth -= 1;
                current.push(c);
            }
            ',' if depth == 0 => parts.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }

    parts.push(current);
    parts
}

/// Group records by the given fields, preserving first-occurrence order.
/// Missing group-by fields key as null.
fn group_records<'a>(data: &'a [Record], group_fields: &[String]) -> Vec<(Vec<Value>, Vec<&'a Record>)> {
    let mut groups: Vec<(Vec<Value>, Vec<&Record>)> = Vec::new();

    for record in data {
        let key = group_key(record, group_fields);
        match groups.iter_mut().find(|(k, _)| keys_match(k, &key)) {
            Some((_, members)) => members.push(record),
            None => groups.push((key, vec![record])),
        }
    }

    groups
}

/// Key equality for grouping and distinctness. Numeric kinds compare by
/// value, so `1` and `1.0` land in the same group; everything else uses
/// plain equality.
fn group_value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            a.as_number() == b.as_number()
        }
        _ => a == b,
    }
}

fn keys_match(a: &[Value], b: &[Value]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| group_value_eq(x, y))
}

fn group_key(record: &Record, group_fields: &[String]) -> Vec<Value> {
    group_fields
        .iter()
        .map(|f| record.get(f).cloned().unwrap_or(Value::Null))
        .collect()
}

fn non_null<'a>(records: &'a [&Record], field: &'a str) -> impl Iterator<Item = &'a Value> {
    records
        .iter()
        .filter_map(move |r| r.get(field))
        .filter(|v| !v.is_null())
}

fn numeric<'a>(records: &'a [&Record], field: Option<&'a str>) -> impl Iterator<Item = f64> + 'a {
    records
        .iter()
        .filter_map(move |r| field.and_then(|f| r.get(f)))
        .filter_map(|v| v.to_f64_lossy())
}

fn pick_extreme(records: &[&Record], field: Option<&str>, keep: std::cmp::Ordering) -> Value {
    let mut best: Option<&Value> = None;
    for value in non_null(records, field.unwrap_or("")) {
        best = match best {
            None => Some(value),
            Some(current) if value.sort_cmp(current) == keep => Some(value),
            Some(current) => Some(current),
        };
    }
    best.cloned().unwrap_or(Value::Null)
}

fn distinct_sorted(records: &[&Record], field: Option<&str>) -> Vec<Value> {
    let mut values: Vec<Value> = Vec::new();
    for value in non_null(records, field.unwrap_or("")) {
        if !values.iter().any(|v| group_value_eq(v, value)) {
            values.push(value.clone());
        }
    }
    values.sort_by(|a, b| a.sort_cmp(b));
    values
}

/// Standard deviation with divisor `n - ddof`; 0.0 when fewer than two
/// values.
fn stdev(values: &[f64], ddof: usize) -> f64 {
    let n = values.len();
    if n <= 1 {
        return 0.0;
    }

    let mean = values.iter().sum::<f64>() / n as f64;
    let sum_sq: f64 = values.iter().map(|x| (x - mean).powi(2)).sum();
    (sum_sq / (n - ddof) as f64).sqrt()
}
