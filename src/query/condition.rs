//! Condition Evaluator
//!
//! Decides whether a single record matches a search/where condition
//! string.
//!
//! A condition is a set of OR-separated alternatives; each alternative
//! is a space-separated list of `<field><op><value>` primitives that
//! are ANDed. Values may be literals, quoted strings, the wildcard `*`
//! (field presence), or the name of another field on the same record
//! (field-to-field comparison).
//!
//! Tokenization is best-effort: a space-separated token that carries no
//! comparison operator is rejoined to the previous token, which recovers
//! unquoted multi-word literals but can misparse quoted multi-word
//! literals sitting next to an OR chain. That fragility is a documented
//! part of the language, not something to fix here.

use crate::record::Record;
use crate::value::{CmpOp, Value};

/// Operator table in priority order: ambiguous prefixes come last so
/// that `!=`, `>=`, `<=` win over `=`, `>`, `<`.
const OPERATORS: [(&str, CmpOp); 6] = [
    ("!=", CmpOp::Ne),
    (">=", CmpOp::Gte),
    ("<=", CmpOp::Lte),
    (">", CmpOp::Gt),
    ("<", CmpOp::Lt),
    ("=", CmpOp::Eq),
];

/// Evaluate a full condition (OR alternatives of ANDed primitives)
/// against one record.
pub fn evaluate_condition(record: &Record, condition: &str) -> bool {
    let condition = condition.trim();
    if condition == "*" {
        return true;
    }
    if condition.is_empty() {
        return false;
    }

    let stripped = strip_outer_parens(condition);

    let alternatives = split_top_level_or(stripped);
    if alternatives.len() > 1 {
        return alternatives
            .iter()
            .any(|alt| evaluate_condition(record, alt));
    }

    let alternative = alternatives.first().map(String::as_str).unwrap_or("");
    if alternative != stripped {
        // Stripping parens or trimming changed the text; re-enter so the
        // simplified form gets the full treatment.
        return evaluate_condition(record, alternative);
    }

    split_primitives(alternative)
        .iter()
        .all(|primitive| evaluate_primitive(record, primitive))
}

/// Evaluate one `<field><op><value>` primitive.
fn evaluate_primitive(record: &Record, condition: &str) -> bool {
    let condition = condition.trim();
    if condition == "*" {
        return true;
    }

    for (op_str, op) in OPERATORS {
        if let Some(idx) = condition.find(op_str) {
            let field = condition[..idx].trim();
            let value_str = condition[idx + op_str.len()..].trim();

            // A stored null counts as absent for presence checks
            let field_value = record.lookup(field);

            if value_str == "*" {
                match op {
                    CmpOp::Eq => return field_value.is_some(),
                    CmpOp::Ne => return field_value.is_none(),
                    _ => {} // fall through: `*` compares as a literal string
                }
            }

            let expected = resolve_value(record, value_str);

            let field_value = match field_value {
                Some(v) => v,
                None => return false,
            };

            return op.compare_values(field_value, &expected);
        }
    }

    // No comparison operator at all
    false
}

/// Resolve the right-hand side of a primitive.
///
/// Quoted tokens are string literals. An unquoted token naming another
/// field on the same record resolves to that field's live value, taking
/// precedence over literal parsing.
fn resolve_value(record: &Record, value_str: &str) -> Value {
    let bytes = value_str.as_bytes();
    let quoted = value_str.len() >= 2
        && ((bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[bytes.len() - 1] == b'\''));

    if quoted {
        return Value::Str(value_str[1..value_str.len() - 1].to_string());
    }

    if let Some(referenced) = record.get_path(value_str) {
        return referenced.clone();
    }

    Value::parse_literal(value_str)
}

/// Strip one outer matching pair of parentheses, if the whole condition
/// is wrapped in it.
fn strip_outer_parens(condition: &str) -> &str {
    let condition = condition.trim();
    if !condition.starts_with('(') || !condition.ends_with(')') {
        return condition;
    }

    let mut in_quotes = false;
    let mut quote_char = '\0';
    let mut depth = 0i32;
    let mut prev: Option<char> = None;

    for (i, c) in condition.char_indices() {
        if (c == '"' || c == '\'') && prev != Some('\\') {
            if !in_quotes {
                in_quotes = true;
                quote_char = c;
            } else if c == quote_char {
                in_quotes = false;
            }
        } else if c == '(' && !in_quotes {
            depth += 1;
        } else if c == ')' && !in_quotes {
            depth -= 1;
            if depth == 0 {
                // The opening paren closes here; only strip when that is
                // the final character
                if i == condition.len() - 1 {
                    return condition[1..condition.len() - 1].trim();
                }
                return condition;
            }
        }
        prev = Some(c);
    }

    condition
}

/// Split a condition at top-level standalone `OR` keywords
/// (case-insensitive, outside quotes and parentheses).
fn split_top_level_or(condition: &str) -> Vec<String> {
    let chars: Vec<(usize, char)> = condition.char_indices().collect();
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut quote_char = '\0';
    let mut depth = 0i32;
    let mut seg_start = 0usize;

    let mut j = 0;
    while j < chars.len() {
        let (pos, c) = chars[j];

        if (c == '"' || c == '\'') && (j == 0 || chars[j - 1].1 != '\\') {
            if !in_quotes {
                in_quotes = true;
                quote_char = c;
            } else if c == quote_char {
                in_quotes = false;
            }
        } else if c == '(' && !in_quotes {
            depth += 1;
        } else if c == ')' && !in_quotes {
            depth -= 1;
        } else if !in_quotes
            && depth == 0
            && matches!(c, 'o' | 'O')
            && j > 0
            && chars[j - 1].1.is_whitespace()
            && j + 2 < chars.len()
            && matches!(chars[j + 1].1, 'r' | 'R')
            && chars[j + 2].1.is_whitespace()
        {
            parts.push(condition[seg_start..pos].to_string());
            seg_start = chars[j + 2].0;
            j += 2;
            continue;
        }

        j += 1;
    }

    parts.push(condition[seg_start..].to_string());

    parts
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Tokenize an alternative into primitives: quote-aware space split,
/// then rejoin any token that lacks a comparison operator into its
/// predecessor (recovering unquoted multi-word literals).
fn split_primitives(alternative: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut quote_char = '\0';
    let mut prev: Option<char> = None;

    for c in alternative.chars() {
        if (c == '"' || c == '\'') && prev != Some('\\') {
            if !in_quotes {
                in_quotes = true;
                quote_char = c;
            } else if c == quote_char {
                in_quotes = false;
            }
        }

        if c == ' ' && !in_quotes {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            prev = Some(c);
            continue;
        }

        current.push(c);
        prev = Some(c);
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    let mut primitives: Vec<String> = Vec::new();
    for token in tokens {
        let has_operator = token.contains('=') || token.contains('<') || token.contains('>');
        match primitives.last_mut() {
            Some(last) if !has_operator && token != "*" => {
                last.push(' ');
                last.push_str(&token);
            }
            _ => primitives.push(token),
        }
    }

    primitives
}
