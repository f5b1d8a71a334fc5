//! Ordering commands: `sort`, `head`, `tail`
//!
//! ```text
//! sort -count, name | head 5
//! ```
//!
//! Sort keys are comma or space separated; a leading `-` on a key means
//! descending, a leading `+` spells out the ascending default.
//! Multi-key ordering comes from repeated stable sorts,
//! rightmost key first, so the leftmost key ends up dominating.

use std::cmp::Ordering;

use crate::record::Dataset;
use crate::value::Value;

const DEFAULT_LIMIT: usize = 10;

struct SortKey {
    field: String,
    descending: bool,
}

/// Order records by one or more keys. Records missing a key field sort
/// as null, which orders after every present value.
pub fn execute_sort(mut data: Dataset, args: &str) -> Dataset {
    let keys: Vec<SortKey> = args
        .split(',')
        .flat_map(|part| part.split_whitespace())
        .filter(|token| !token.is_empty() && *token != "-" && *token != "+")
        .map(|token| match token.strip_prefix('-') {
            Some(field) => SortKey { field: field.to_string(), descending: true },
            // An explicit `+` spells out the ascending default
            None => SortKey {
                field: token.strip_prefix('+').unwrap_or(token).to_string(),
                descending: false,
            },
        })
        .collect();

    for key in keys.iter().rev() {
        data.sort_by(|a, b| {
            let av = a.lookup(&key.field).cloned().unwrap_or(Value::Null);
            let bv = b.lookup(&key.field).cloned().unwrap_or(Value::Null);
            let ordering = av.sort_cmp(&bv);
            if key.descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
    }

    data
}

/// First N records; N defaults to 10 when absent or unparsable.
pub fn execute_head(data: Dataset, args: &str) -> Dataset {
    let limit = parse_limit(args);
    data.into_iter().take(limit).collect()
}

/// Last N records, original order preserved; N defaults to 10.
pub fn execute_tail(data: Dataset, args: &str) -> Dataset {
    let limit = parse_limit(args);
    let skip = data.len().saturating_sub(limit);
    data.into_iter().skip(skip).collect()
}

fn parse_limit(args: &str) -> usize {
    args.trim().parse().unwrap_or(DEFAULT_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;

    fn rec(json: serde_json::Value) -> Record {
        serde_json::from_value(json).unwrap()
    }

    fn sample() -> Dataset {
        vec![
            rec(serde_json::json!({"name": "alice", "age": 30})),
            rec(serde_json::json!({"name": "bob", "age": 25})),
            rec(serde_json::json!({"name": "charlie", "age": 35})),
            rec(serde_json::json!({"name": "dave", "age": 25})),
        ]
    }

    fn names(data: &Dataset) -> Vec<String> {
        data.iter()
            .map(|r| r.get("name").map(|v| v.to_string()).unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_sort_ascending() {
        let result = execute_sort(sample(), "age");
        assert_eq!(names(&result), vec!["bob", "dave", "alice", "charlie"]);
    }

    #[test]
    fn test_sort_descending() {
        let result = execute_sort(sample(), "-age");
        assert_eq!(names(&result), vec!["charlie", "alice", "bob", "dave"]);
    }

    #[test]
    fn test_sort_explicit_ascending_prefix() {
        let result = execute_sort(sample(), "+age");
        assert_eq!(names(&result), vec!["bob", "dave", "alice", "charlie"]);

        let result = execute_sort(sample(), "-age, +name");
        assert_eq!(names(&result), vec!["charlie", "alice", "bob", "dave"]);
    }

    #[test]
    fn test_sort_is_stable() {
        // bob and dave tie on age and keep their input order
        let result = execute_sort(sample(), "age");
        assert_eq!(names(&result)[..2], ["bob", "dave"]);
    }

    #[test]
    fn test_sort_multi_key() {
        // Descending age, then name breaks the 25 tie
        let result = execute_sort(sample(), "-age, name");

        // Leftmost key dominates
        assert_eq!(names(&result), vec!["charlie", "alice", "bob", "dave"]);

        let result = execute_sort(sample(), "age, -name");
        assert_eq!(names(&result), vec!["dave", "bob", "alice", "charlie"]);
    }

    #[test]
    fn test_sort_missing_field_orders_last() {
        let mut data = sample();
        data.push(rec(serde_json::json!({"name": "eve"})));
        let result = execute_sort(data, "age");
        assert_eq!(names(&result).last().map(String::as_str), Some("eve"));
    }

    #[test]
    fn test_sort_mixed_types_rank() {
        let data = vec![
            rec(serde_json::json!({"v": "text"})),
            rec(serde_json::json!({"v": 5})),
            rec(serde_json::json!({"v": true})),
        ];
        let result = execute_sort(data, "v");
        assert_eq!(result[0].get("v"), Some(&Value::Bool(true)));
        assert_eq!(result[1].get("v"), Some(&Value::Int(5)));
        assert_eq!(result[2].get("v"), Some(&Value::Str("text".into())));
    }

    #[test]
    fn test_sort_no_keys_is_identity() {
        assert_eq!(execute_sort(sample(), ""), sample());
    }

    #[test]
    fn test_head() {
        let result = execute_head(sample(), "2");
        assert_eq!(names(&result), vec!["alice", "bob"]);
    }

    #[test]
    fn test_head_default_limit() {
        assert_eq!(execute_head(sample(), "").len(), 4);
        assert_eq!(execute_head(sample(), "junk").len(), 4);
    }

    #[test]
    fn test_tail_preserves_order() {
        let result = execute_tail(sample(), "2");
        assert_eq!(names(&result), vec!["charlie", "dave"]);
    }

    #[test]
    fn test_head_tail_beyond_length() {
        assert_eq!(execute_head(sample(), "100").len(), 4);
        assert_eq!(execute_tail(sample(), "100").len(), 4);
    }
}
