//! The `eval` command: compute a field from an expression
//!
//! ```text
//! eval total=price*quantity
//! eval greeting="hello " . name
//! eval tier=if(score>=90, "gold", "standard")
//! ```
//!
//! Expressions are parsed with nom into a small AST, then evaluated per
//! record. Evaluation never fails a query: any per-record problem (a
//! missing field in arithmetic, a division by zero, a type mismatch)
//! sets the target field to null for that record, and an argument
//! string that does not parse at all leaves the dataset unchanged.

use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_while, take_while1},
    character::complete::{char, multispace0},
    combinator::{map, opt, recognize, verify},
    multi::many0,
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

use crate::record::{Dataset, Record};
use crate::value::{CmpOp, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// An operand in an `if(...)` head or branch: a literal, or a word that
/// resolves as a field reference first and falls back to itself as a
/// string.
#[derive(Debug, Clone, PartialEq)]
enum Simple {
    Literal(Value),
    Word(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(Value),
    Field(String),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    If {
        lhs: Simple,
        cmp: CmpOp,
        rhs: Simple,
        then: Simple,
        otherwise: Simple,
    },
}

/// Compute `target=expression` for every record.
///
/// An unparsable assignment is an identity transform.
pub fn execute_eval(data: Dataset, args: &str) -> Dataset {
    let Some((target, expr)) = parse_assignment(args) else {
        tracing::debug!(args = %args, "eval assignment did not parse, skipping stage");
        return data;
    };

    data.into_iter()
        .map(|mut record| {
            let value = eval_expr(&record, &expr).unwrap_or(Value::Null);
            record.insert(target.clone(), value);
            record
        })
        .collect()
}

/// Split `field=expression` and parse the right-hand side. The whole
/// expression must be consumed for the assignment to count.
fn parse_assignment(args: &str) -> Option<(String, Expr)> {
    let args = args.trim();
    let eq = args.find('=')?;
    let target = args[..eq].trim();
    if target.is_empty() || !is_identifier(target) {
        return None;
    }

    match expr(&args[eq + 1..]) {
        Ok((rest, parsed)) if rest.trim().is_empty() => Some((target.to_string(), parsed)),
        _ => None,
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

fn expr(input: &str) -> IResult<&str, Expr> {
    alt((if_expr, additive))(input)
}

/// `a (+|-|.) b ...`; the dot is string concatenation and shares the
/// addition node, with the string case handled at evaluation time.
fn additive(input: &str) -> IResult<&str, Expr> {
    let (input, first) = term(input)?;
    let (input, rest) = many0(pair(ws(alt((char('+'), char('-'), char('.')))), term))(input)?;

    Ok((input, fold_binary(first, rest, |c| match c {
        '-' => BinOp::Sub,
        _ => BinOp::Add,
    })))
}

fn term(input: &str) -> IResult<&str, Expr> {
    let (input, first) = factor(input)?;
    let (input, rest) = many0(pair(ws(alt((char('*'), char('/')))), factor))(input)?;

    Ok((input, fold_binary(first, rest, |c| match c {
        '*' => BinOp::Mul,
        _ => BinOp::Div,
    })))
}

fn fold_binary(first: Expr, rest: Vec<(char, Expr)>, to_op: fn(char) -> BinOp) -> Expr {
    rest.into_iter().fold(first, |lhs, (c, rhs)| Expr::Binary {
        op: to_op(c),
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    })
}

fn factor(input: &str) -> IResult<&str, Expr> {
    preceded(
        multispace0,
        alt((
            delimited(char('('), ws(expr), char(')')),
            map(number, Expr::Literal),
            map(quoted, |s| Expr::Literal(Value::Str(s))),
            map(identifier, |name| Expr::Field(name.to_string())),
        )),
    )(input)
}

fn if_expr(input: &str) -> IResult<&str, Expr> {
    let (input, _) = preceded(multispace0, tag_no_case("if"))(input)?;
    let (input, (lhs, cmp, rhs, _, then, _, otherwise)) = delimited(
        ws(char('(')),
        tuple((
            ws(simple),
            cmp_op,
            ws(simple),
            char(','),
            ws(simple),
            char(','),
            ws(simple),
        )),
        char(')'),
    )(input)?;

    Ok((input, Expr::If { lhs, cmp, rhs, then, otherwise }))
}

fn simple(input: &str) -> IResult<&str, Simple> {
    alt((
        map(number, Simple::Literal),
        map(quoted, |s| Simple::Literal(Value::Str(s))),
        map(identifier, |name| Simple::Word(name.to_string())),
    ))(input)
}

fn cmp_op(input: &str) -> IResult<&str, CmpOp> {
    ws(alt((
        map(tag(">="), |_| CmpOp::Gte),
        map(tag("<="), |_| CmpOp::Lte),
        map(tag("=="), |_| CmpOp::Eq),
        map(tag("!="), |_| CmpOp::Ne),
        map(tag(">"), |_| CmpOp::Gt),
        map(tag("<"), |_| CmpOp::Lt),
        map(tag("="), |_| CmpOp::Eq),
    )))(input)
}

fn number(input: &str) -> IResult<&str, Value> {
    let (rest, text) = recognize(tuple((
        opt(char('-')),
        take_while1(|c: char| c.is_ascii_digit()),
        opt(pair(char('.'), take_while1(|c: char| c.is_ascii_digit()))),
    )))(input)?;

    let value = if text.contains('.') {
        Value::Float(text.parse().unwrap_or(0.0))
    } else {
        match text.parse::<i64>() {
            Ok(i) => Value::Int(i),
            Err(_) => Value::Float(text.parse().unwrap_or(0.0)),
        }
    };

    Ok((rest, value))
}

fn quoted(input: &str) -> IResult<&str, String> {
    map(
        alt((
            delimited(char('"'), take_while(|c| c != '"'), char('"')),
            delimited(char('\''), take_while(|c| c != '\''), char('\'')),
        )),
        |s: &str| s.to_string(),
    )(input)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    verify(
        take_while1(|c: char| c.is_alphanumeric() || c == '_'),
        |s: &str| s.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_'),
    )(input)
}

/// Evaluate an expression against one record. `None` means the target
/// field becomes null.
fn eval_expr(record: &Record, expr: &Expr) -> Option<Value> {
    match expr {
        Expr::Literal(value) => Some(value.clone()),
        Expr::Field(name) => record.lookup(name).cloned(),
        Expr::Binary { op, lhs, rhs } => {
            let lhs = eval_expr(record, lhs)?;
            let rhs = eval_expr(record, rhs)?;
            eval_binary(*op, lhs, rhs)
        }
        Expr::If { lhs, cmp, rhs, then, otherwise } => {
            let lhs = resolve_simple(record, lhs);
            let rhs = resolve_simple(record, rhs);
            let branch = if cmp.compare_values(&lhs, &rhs) { then } else { otherwise };
            Some(resolve_simple(record, branch))
        }
    }
}

/// A word resolves as a field reference when the record has it; an
/// unknown word is taken literally as a string.
fn resolve_simple(record: &Record, simple: &Simple) -> Value {
    match simple {
        Simple::Literal(value) => value.clone(),
        Simple::Word(word) => record
            .lookup(word)
            .cloned()
            .unwrap_or_else(|| Value::Str(word.clone())),
    }
}

fn eval_binary(op: BinOp, lhs: Value, rhs: Value) -> Option<Value> {
    // Addition doubles as concatenation when both sides are strings
    if op == BinOp::Add {
        if let (Value::Str(a), Value::Str(b)) = (&lhs, &rhs) {
            return Some(Value::Str(format!("{}{}", a, b)));
        }
    }

    // Integer arithmetic stays integral; overflow widens to float
    if let (Value::Int(a), Value::Int(b)) = (&lhs, &rhs) {
        match op {
            BinOp::Add => {
                return Some(match a.checked_add(*b) {
                    Some(v) => Value::Int(v),
                    None => Value::Float(*a as f64 + *b as f64),
                })
            }
            BinOp::Sub => {
                return Some(match a.checked_sub(*b) {
                    Some(v) => Value::Int(v),
                    None => Value::Float(*a as f64 - *b as f64),
                })
            }
            BinOp::Mul => {
                return Some(match a.checked_mul(*b) {
                    Some(v) => Value::Int(v),
                    None => Value::Float(*a as f64 * *b as f64),
                })
            }
            BinOp::Div => {}
        }
    }

    let a = lhs.as_number()?;
    let b = rhs.as_number()?;

    match op {
        BinOp::Add => Some(Value::Float(a + b)),
        BinOp::Sub => Some(Value::Float(a - b)),
        BinOp::Mul => Some(Value::Float(a * b)),
        BinOp::Div => {
            if b == 0.0 {
                None
            } else {
                Some(Value::Float(a / b))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(json: serde_json::Value) -> Record {
        serde_json::from_value(json).unwrap()
    }

    fn eval_one(record: Record, args: &str) -> Record {
        execute_eval(vec![record], args).remove(0)
    }

    #[test]
    fn test_arithmetic() {
        let r = eval_one(rec(serde_json::json!({"a": 6, "b": 4})), "x=a+b*2");
        assert_eq!(r.get("x"), Some(&Value::Int(14)));

        let r = eval_one(rec(serde_json::json!({"a": 6, "b": 4})), "x=(a+b)*2");
        assert_eq!(r.get("x"), Some(&Value::Int(20)));

        let r = eval_one(rec(serde_json::json!({"a": 6})), "x=a-10");
        assert_eq!(r.get("x"), Some(&Value::Int(-4)));
    }

    #[test]
    fn test_division_is_float() {
        let r = eval_one(rec(serde_json::json!({"a": 7, "b": 2})), "x=a/b");
        assert_eq!(r.get("x"), Some(&Value::Float(3.5)));

        let r = eval_one(rec(serde_json::json!({"a": 8, "b": 2})), "x=a/b");
        assert_eq!(r.get("x"), Some(&Value::Float(4.0)));
    }

    #[test]
    fn test_division_by_zero_is_null() {
        let r = eval_one(rec(serde_json::json!({"a": 7, "b": 0})), "x=a/b");
        assert_eq!(r.get("x"), Some(&Value::Null));
    }

    #[test]
    fn test_missing_field_in_arithmetic_is_null() {
        let r = eval_one(rec(serde_json::json!({"a": 7})), "x=a+nosuch");
        assert_eq!(r.get("x"), Some(&Value::Null));
    }

    #[test]
    fn test_string_concat() {
        let r = eval_one(
            rec(serde_json::json!({"first": "ada", "last": "lovelace"})),
            "full=first . \" \" . last",
        );
        assert_eq!(r.get("full"), Some(&Value::Str("ada lovelace".into())));
    }

    #[test]
    fn test_concat_mismatched_types_is_null() {
        let r = eval_one(rec(serde_json::json!({"name": "ada", "n": 3})), "x=name . n");
        assert_eq!(r.get("x"), Some(&Value::Null));
    }

    #[test]
    fn test_if_expression() {
        let r = eval_one(
            rec(serde_json::json!({"score": 95})),
            "tier=if(score>=90, \"gold\", \"standard\")",
        );
        assert_eq!(r.get("tier"), Some(&Value::Str("gold".into())));

        let r = eval_one(
            rec(serde_json::json!({"score": 70})),
            "tier=if(score>=90, \"gold\", \"standard\")",
        );
        assert_eq!(r.get("tier"), Some(&Value::Str("standard".into())));
    }

    #[test]
    fn test_if_word_operands_fall_back_to_strings() {
        // `admin` is not a field, so it compares as the string "admin"
        let r = eval_one(
            rec(serde_json::json!({"role": "admin"})),
            "is_admin=if(role==admin, 1, 0)",
        );
        assert_eq!(r.get("is_admin"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_if_branch_resolves_fields() {
        let r = eval_one(
            rec(serde_json::json!({"a": 1, "b": 2})),
            "bigger=if(a>b, a, b)",
        );
        assert_eq!(r.get("bigger"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_literal_assignment() {
        let r = eval_one(rec(serde_json::json!({})), "x=42");
        assert_eq!(r.get("x"), Some(&Value::Int(42)));

        let r = eval_one(rec(serde_json::json!({})), "x=\"hello\"");
        assert_eq!(r.get("x"), Some(&Value::Str("hello".into())));

        let r = eval_one(rec(serde_json::json!({})), "x=-1.5");
        assert_eq!(r.get("x"), Some(&Value::Float(-1.5)));
    }

    #[test]
    fn test_overwrites_existing_field() {
        let r = eval_one(rec(serde_json::json!({"x": 1})), "x=x+1");
        assert_eq!(r.get("x"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_unparsable_assignment_is_identity() {
        let data = vec![rec(serde_json::json!({"a": 1}))];
        assert_eq!(execute_eval(data.clone(), "no assignment here"), data);
        assert_eq!(execute_eval(data.clone(), "x=+++"), data);
        assert_eq!(execute_eval(data.clone(), ""), data);
    }

    #[test]
    fn test_string_in_arithmetic_is_null() {
        let r = eval_one(rec(serde_json::json!({"name": "ada"})), "x=name*2");
        assert_eq!(r.get("x"), Some(&Value::Null));
    }

    #[test]
    fn test_overflow_widens_to_float() {
        let r = eval_one(
            rec(serde_json::json!({"a": i64::MAX})),
            "x=a+1",
        );
        assert_eq!(r.get("x"), Some(&Value::Float(i64::MAX as f64 + 1.0)));
    }
}
