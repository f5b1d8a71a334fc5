//! Field shaping commands: `fields`, `rename`, `table`
//!
//! All three reshape records without touching values. `fields` keeps or
//! drops columns, `rename` relabels them in place, and `table` is an
//! alias for the keep form of `fields`.

use crate::record::{Dataset, Record};

/// Project records down to the named fields, or drop fields when the
/// argument list starts with `-`.
///
/// ```text
/// fields name, age        keep only name and age
/// fields - password       drop password, keep everything else
/// ```
///
/// Kept fields appear in the order they are listed; a named field a
/// record lacks is simply absent from that record's output. An empty
/// field list is an identity transform.
pub fn execute_fields(data: Dataset, args: &str) -> Dataset {
    let args = args.trim();

    let (exclude, list) = match args.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, args),
    };

    let names: Vec<&str> = list
        .split(',')
        .flat_map(|part| part.split_whitespace())
        .filter(|name| !name.is_empty())
        .collect();

    if names.is_empty() {
        return data;
    }

    data.into_iter()
        .map(|record| {
            if exclude {
                record
                    .into_iter()
                    .filter(|(field, _)| !names.contains(&field.as_str()))
                    .collect()
            } else {
                let mut projected = Record::new();
                for name in &names {
                    if let Some(value) = record.get(name) {
                        projected.insert((*name).to_string(), value.clone());
                    }
                }
                projected
            }
        })
        .collect()
}

/// Rename fields, keeping each field's position and value.
///
/// ```text
/// rename old as new, status as http_status
/// ```
///
/// Clauses that are not exactly `old as new` are ignored, as are names
/// the record does not carry.
pub fn execute_rename(data: Dataset, args: &str) -> Dataset {
    let renames: Vec<(String, String)> = args
        .split(',')
        .filter_map(|clause| {
            let tokens: Vec<&str> = clause.split_whitespace().collect();
            match tokens.as_slice() {
                [old, kw, new] if kw.eq_ignore_ascii_case("as") => {
                    Some(((*old).to_string(), (*new).to_string()))
                }
                _ => None,
            }
        })
        .collect();

    if renames.is_empty() {
        return data;
    }

    data.into_iter()
        .map(|record| {
            record
                .into_iter()
                .map(|(field, value)| {
                    let renamed = renames
                        .iter()
                        .find(|(old, _)| *old == field)
                        .map(|(_, new)| new.clone())
                        .unwrap_or(field);
                    (renamed, value)
                })
                .collect()
        })
        .collect()
}

/// Column projection for display; same transform as the keep form of
/// `fields`.
pub fn execute_table(data: Dataset, args: &str) -> Dataset {
    execute_fields(data, args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn rec(json: serde_json::Value) -> Record {
        serde_json::from_value(json).unwrap()
    }

    fn sample() -> Dataset {
        vec![
            rec(serde_json::json!({"name": "alice", "age": 30, "city": "NYC"})),
            rec(serde_json::json!({"name": "bob", "city": "LA"})),
        ]
    }

    #[test]
    fn test_fields_keep() {
        let result = execute_fields(sample(), "name, age");
        let fields: Vec<&String> = result[0].fields().collect();
        assert_eq!(fields, vec!["name", "age"]);

        // bob has no age field, so only name survives
        let fields: Vec<&String> = result[1].fields().collect();
        assert_eq!(fields, vec!["name"]);
    }

    #[test]
    fn test_fields_keep_reorders() {
        let result = execute_fields(sample(), "city name");
        let fields: Vec<&String> = result[0].fields().collect();
        assert_eq!(fields, vec!["city", "name"]);
    }

    #[test]
    fn test_fields_exclude() {
        let result = execute_fields(sample(), "- age");
        let fields: Vec<&String> = result[0].fields().collect();
        assert_eq!(fields, vec!["name", "city"]);

        // Unaffected record passes through whole
        let fields: Vec<&String> = result[1].fields().collect();
        assert_eq!(fields, vec!["name", "city"]);
    }

    #[test]
    fn test_fields_empty_list_is_identity() {
        assert_eq!(execute_fields(sample(), ""), sample());
        assert_eq!(execute_fields(sample(), "-"), sample());
    }

    #[test]
    fn test_fields_space_separated() {
        let result = execute_fields(sample(), "name age");
        let fields: Vec<&String> = result[0].fields().collect();
        assert_eq!(fields, vec!["name", "age"]);
    }

    #[test]
    fn test_rename_preserves_position_and_value() {
        let result = execute_rename(sample(), "age as years");
        let fields: Vec<&String> = result[0].fields().collect();
        assert_eq!(fields, vec!["name", "years", "city"]);
        assert_eq!(result[0].get("years"), Some(&Value::Int(30)));
        assert_eq!(result[0].get("age"), None);
    }

    #[test]
    fn test_rename_multiple_clauses() {
        let result = execute_rename(sample(), "name as user, city as location");
        assert_eq!(result[1].get("user"), Some(&Value::Str("bob".into())));
        assert_eq!(result[1].get("location"), Some(&Value::Str("LA".into())));
    }

    #[test]
    fn test_rename_missing_field_ignored() {
        let result = execute_rename(sample(), "nosuch as other");
        assert_eq!(result, sample());
    }

    #[test]
    fn test_rename_malformed_clause_ignored() {
        assert_eq!(execute_rename(sample(), "age years"), sample());
        assert_eq!(execute_rename(sample(), ""), sample());
        // One good clause among bad ones still applies
        let result = execute_rename(sample(), "bogus, age as years");
        assert_eq!(result[0].get("years"), Some(&Value::Int(30)));
    }

    #[test]
    fn test_table_matches_fields() {
        assert_eq!(
            execute_table(sample(), "name"),
            execute_fields(sample(), "name")
        );
    }
}
