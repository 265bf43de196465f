// Copyright 2026 Flux Contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Builtin functions callable from template expressions.
//!
//! All builtins are pure functions over values. Templates cannot register
//! new ones.

use crate::value::{as_number, is_truthy, loose_eq, to_output_string, type_name};
use serde_json::Value;

/// Largest sequence `range()` will build.
const MAX_RANGE_LEN: u64 = 100_000;

/// Names of every builtin.
pub const BUILTINS: &[&str] = &[
    "count", "len", "upper", "strtoupper", "lower", "strtolower", "ucfirst", "trim", "join", "implode", "json",
    "json_encode", "empty", "isset", "range", "default", "keys", "values", "contains", "number_format",
];

/// Returns true for known function names.
pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

/// Functions whose arguments are evaluated without strict undefined checks.
pub fn takes_lenient_args(name: &str) -> bool {
    matches!(name, "isset" | "empty" | "default")
}

/// Calls a builtin. Errors are plain messages; the evaluator wraps them.
pub fn call(name: &str, args: &[Value]) -> Result<Value, String> {
    match name {
        "count" | "len" => {
            let value = single(name, args)?;
            match value {
                Value::Array(a) => Ok(Value::from(a.len())),
                Value::Object(o) => Ok(Value::from(o.len())),
                Value::String(s) => Ok(Value::from(s.chars().count())),
                Value::Null => Ok(Value::from(0)),
                other => Err(format!("{}() expects an array, object or string, got {}", name, type_name(other))),
            }
        }
        "upper" | "strtoupper" => Ok(Value::String(to_output_string(single(name, args)?).to_uppercase())),
        "lower" | "strtolower" => Ok(Value::String(to_output_string(single(name, args)?).to_lowercase())),
        "ucfirst" => {
            let text = to_output_string(single(name, args)?);
            let mut chars = text.chars();
            let result = match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            };
            Ok(Value::String(result))
        }
        "trim" => Ok(Value::String(to_output_string(single(name, args)?).trim().to_string())),
        "join" | "implode" => join(name, args),
        "json" | "json_encode" => Ok(Value::String(single(name, args)?.to_string())),
        "isset" => Ok(Value::Bool(!args.is_empty() && args.iter().all(|v| !v.is_null()))),
        "empty" => Ok(Value::Bool(!is_truthy(single(name, args)?))),
        "default" => {
            expect_args(name, args, 2, 2)?;
            let value = &args[0];
            let is_blank = match value {
                Value::Null => true,
                Value::String(s) => s.is_empty(),
                Value::Array(a) => a.is_empty(),
                _ => false,
            };
            Ok(if is_blank { args[1].clone() } else { value.clone() })
        }
        "range" => range(args),
        "keys" => match single(name, args)? {
            Value::Object(o) => Ok(Value::Array(o.keys().cloned().map(Value::String).collect())),
            Value::Array(a) => Ok(Value::Array((0..a.len()).map(Value::from).collect())),
            other => Err(format!("keys() expects an array or object, got {}", type_name(other))),
        },
        "values" => match single(name, args)? {
            Value::Object(o) => Ok(Value::Array(o.values().cloned().collect())),
            Value::Array(a) => Ok(Value::Array(a.clone())),
            other => Err(format!("values() expects an array or object, got {}", type_name(other))),
        },
        "contains" => {
            expect_args(name, args, 2, 2)?;
            let found = match (&args[0], &args[1]) {
                (Value::String(haystack), needle) => haystack.contains(to_output_string(needle).as_str()),
                (Value::Array(items), needle) => items.iter().any(|item| loose_eq(item, needle)),
                (Value::Object(map), key) => map.contains_key(to_output_string(key).as_str()),
                (Value::Null, _) => false,
                (other, _) => return Err(format!("contains() cannot search a {}", type_name(other))),
            };
            Ok(Value::Bool(found))
        }
        "number_format" => number_format(args),
        _ => Err(format!("unknown function '{}'", name)),
    }
}

fn expect_args(name: &str, args: &[Value], min: usize, max: usize) -> Result<(), String> {
    if args.len() < min || args.len() > max {
        let expected = if min == max { min.to_string() } else { format!("{} to {}", min, max) };
        return Err(format!("{}() expects {} argument(s), got {}", name, expected, args.len()));
    }
    Ok(())
}

fn single<'v>(name: &str, args: &'v [Value]) -> Result<&'v Value, String> {
    expect_args(name, args, 1, 1)?;
    Ok(&args[0])
}

fn join(name: &str, args: &[Value]) -> Result<Value, String> {
    expect_args(name, args, 1, 2)?;
    // Accept both `join(list, sep)` and the PHP order `implode(sep, list)`.
    let (list, separator) = match args {
        [list @ (Value::Array(_) | Value::Object(_))] => (list, String::new()),
        [list @ (Value::Array(_) | Value::Object(_)), sep] => (list, to_output_string(sep)),
        [sep, list @ (Value::Array(_) | Value::Object(_))] => (list, to_output_string(sep)),
        _ => return Err(format!("{}() expects a list to join", name)),
    };

    let parts: Vec<String> = match list {
        Value::Array(items) => items.iter().map(to_output_string).collect(),
        Value::Object(map) => map.values().map(to_output_string).collect(),
        _ => Vec::new(),
    };
    Ok(Value::String(parts.join(&separator)))
}

fn range(args: &[Value]) -> Result<Value, String> {
    expect_args("range", args, 2, 2)?;
    let bound = |v: &Value| as_number(v).filter(|n| n.fract() == 0.0).map(|n| n as i64);
    let (start, end) = match (bound(&args[0]), bound(&args[1])) {
        (Some(start), Some(end)) => (start, end),
        _ => return Err("range() expects two integers".to_string()),
    };

    if end.abs_diff(start) >= MAX_RANGE_LEN {
        return Err(format!("range() is limited to {} elements", MAX_RANGE_LEN));
    }

    let items: Vec<Value> = if start <= end {
        (start..=end).map(Value::from).collect()
    } else {
        (end..=start).rev().map(Value::from).collect()
    };
    Ok(Value::Array(items))
}

fn number_format(args: &[Value]) -> Result<Value, String> {
    expect_args("number_format", args, 1, 2)?;
    let number = as_number(&args[0]).ok_or_else(|| "number_format() expects a number".to_string())?;
    let decimals = match args.get(1) {
        Some(d) => as_number(d)
            .filter(|d| *d >= 0.0 && *d <= 20.0)
            .ok_or_else(|| "number_format() expects 0 to 20 decimals".to_string())? as usize,
        None => 0,
    };

    let formatted = format!("{:.*}", decimals, number.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let negative = number < 0.0 && formatted.chars().any(|c| c.is_ascii_digit() && c != '0');
    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    Ok(Value::String(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call_ok(name: &str, args: &[Value]) -> Value {
        call(name, args).unwrap()
    }

    #[test]
    fn test_count() {
        assert_eq!(call_ok("count", &[json!([1, 2, 3])]), json!(3));
        assert_eq!(call_ok("len", &[json!("héllo")]), json!(5));
        assert_eq!(call_ok("count", &[json!(null)]), json!(0));
        assert!(call("count", &[json!(true)]).is_err());
    }

    #[test]
    fn test_string_helpers() {
        assert_eq!(call_ok("upper", &[json!("abc")]), json!("ABC"));
        assert_eq!(call_ok("strtolower", &[json!("ABC")]), json!("abc"));
        assert_eq!(call_ok("ucfirst", &[json!("flux")]), json!("Flux"));
        assert_eq!(call_ok("trim", &[json!("  x ")]), json!("x"));
    }

    #[test]
    fn test_join_accepts_both_orders() {
        assert_eq!(call_ok("join", &[json!(["a", "b"]), json!(", ")]), json!("a, b"));
        assert_eq!(call_ok("implode", &[json!("-"), json!([1, 2])]), json!("1-2"));
    }

    #[test]
    fn test_isset_empty_default() {
        assert_eq!(call_ok("isset", &[json!(null)]), json!(false));
        assert_eq!(call_ok("isset", &[json!(0)]), json!(true));
        assert_eq!(call_ok("empty", &[json!([])]), json!(true));
        assert_eq!(call_ok("default", &[json!(null), json!("x")]), json!("x"));
        assert_eq!(call_ok("default", &[json!(0), json!("x")]), json!(0));
    }

    #[test]
    fn test_range() {
        assert_eq!(call_ok("range", &[json!(1), json!(3)]), json!([1, 2, 3]));
        assert_eq!(call_ok("range", &[json!(3), json!(1)]), json!([3, 2, 1]));
        assert!(call("range", &[json!(0), json!(1_000_000)]).is_err());
    }

    #[test]
    fn test_keys_values_contains() {
        let map = json!({"a": 1, "b": 2});
        assert_eq!(call_ok("keys", &[map.clone()]), json!(["a", "b"]));
        assert_eq!(call_ok("values", &[map.clone()]), json!([1, 2]));
        assert_eq!(call_ok("contains", &[map, json!("b")]), json!(true));
        assert_eq!(call_ok("contains", &[json!("flux view"), json!("view")]), json!(true));
        assert_eq!(call_ok("contains", &[json!([1, 2]), json!("2")]), json!(true));
    }

    #[test]
    fn test_number_format() {
        assert_eq!(call_ok("number_format", &[json!(1234567.891), json!(2)]), json!("1,234,567.89"));
        assert_eq!(call_ok("number_format", &[json!(999)]), json!("999"));
        assert_eq!(call_ok("number_format", &[json!(-1000)]), json!("-1,000"));
    }

    #[test]
    fn test_unknown_function() {
        assert!(!is_builtin("system"));
        assert!(call("system", &[]).unwrap_err().contains("unknown function"));
    }
}
