// Copyright 2026 Flux Contributors
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Value semantics shared by the evaluator and the renderer.
//!
//! Template values are plain [`serde_json::Value`]s. This module fixes how
//! they behave in templates:
//!
//! - **Truthiness**: `null`, `false`, `0`, `0.0`, `""`, `[]` and `{}` are
//!   falsy; everything else is truthy.
//! - **Stringification**: `null` → `""`, booleans → `"true"`/`"false"`,
//!   numbers in their shortest form, arrays and objects as JSON.
//! - **Arithmetic**: integer arithmetic when both operands are integers,
//!   floating point otherwise.

use serde_json::{Number, Value};
use std::cmp::Ordering;
use std::sync::Arc;

/// Escaping function applied to `{{ }}` output.
pub type Escaper = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Returns the default HTML escaper.
pub fn html_escaper() -> Escaper {
    Arc::new(html_escape)
}

/// Escapes `& < > " '` for safe inclusion in HTML text and attributes.
pub fn html_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

/// Template truthiness.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Converts a value to the text written to the output.
pub fn to_output_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => format_number(n),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn format_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

/// Builds a number value from a float, falling back to `null` for NaN and
/// infinities, which JSON cannot represent.
pub fn float_value(f: f64) -> Value {
    Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
}

/// Interprets a value as a number, if it looks like one.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null => Some(0.0),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::Null => Some(0),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Loose equality: numbers compare numerically, numeric strings compare
/// equal to the numbers they spell, everything else compares structurally.
pub fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(_), Value::Number(_))
        | (Value::Number(_), Value::String(_))
        | (Value::String(_), Value::Number(_)) => match (as_number(left), as_number(right)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
        (Value::Null, other) | (other, Value::Null) => !is_truthy(other),
        (Value::Bool(b), other) | (other, Value::Bool(b)) => *b == is_truthy(other),
        _ => left == right,
    }
}

/// Strict equality: same type and same value. `1` and `1.0` are equal.
pub fn strict_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

/// Orders two values: numerically when both are numeric, by string otherwise.
pub fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => match (as_number(left), as_number(right)) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
    }
}

/// Arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arith {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// Applies an arithmetic operator. Returns an error message on non-numeric
/// operands or division by zero.
pub fn arithmetic(op: Arith, left: &Value, right: &Value) -> Result<Value, String> {
    let both_int = is_integral(left) && is_integral(right);

    if both_int {
        if let (Some(a), Some(b)) = (as_integer(left), as_integer(right)) {
            let result = match op {
                Arith::Add => a.checked_add(b),
                Arith::Sub => a.checked_sub(b),
                Arith::Mul => a.checked_mul(b),
                Arith::Div if b == 0 => return Err("division by zero".to_string()),
                Arith::Div if a.checked_rem(b) == Some(0) => a.checked_div(b),
                Arith::Div => None,
                Arith::Mod if b == 0 => return Err("modulo by zero".to_string()),
                Arith::Mod => a.checked_rem(b),
            };
            if let Some(n) = result {
                return Ok(Value::from(n));
            }
        }
    }

    let (a, b) = match (as_number(left), as_number(right)) {
        (Some(a), Some(b)) => (a, b),
        _ => {
            return Err(format!(
                "cannot apply arithmetic to {} and {}",
                type_name(left),
                type_name(right)
            ))
        }
    };

    let result = match op {
        Arith::Add => a + b,
        Arith::Sub => a - b,
        Arith::Mul => a * b,
        Arith::Div if b == 0.0 => return Err("division by zero".to_string()),
        Arith::Div => a / b,
        Arith::Mod if b == 0.0 => return Err("modulo by zero".to_string()),
        Arith::Mod => a % b,
    };
    Ok(float_value(result))
}

fn is_integral(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.is_i64(),
        Value::Bool(_) | Value::Null => true,
        Value::String(s) => s.trim().parse::<i64>().is_ok(),
        _ => false,
    }
}

/// Short type name used in error messages.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truthiness_table() {
        for falsy in [json!(null), json!(false), json!(0), json!(0.0), json!(""), json!([]), json!({})] {
            assert!(!is_truthy(&falsy), "{falsy} should be falsy");
        }
        for truthy in [json!(true), json!(1), json!(-0.5), json!("0"), json!(" "), json!([0]), json!({"a": null})] {
            assert!(is_truthy(&truthy), "{truthy} should be truthy");
        }
    }

    #[test]
    fn test_output_strings() {
        assert_eq!(to_output_string(&json!(null)), "");
        assert_eq!(to_output_string(&json!(true)), "true");
        assert_eq!(to_output_string(&json!(3)), "3");
        assert_eq!(to_output_string(&json!(2.5)), "2.5");
        assert_eq!(to_output_string(&json!(4.0)), "4");
        assert_eq!(to_output_string(&json!([1, "a"])), "[1,\"a\"]");
        assert_eq!(to_output_string(&json!({"k": 1})), "{\"k\":1}");
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<b>\"Tom\" & 'Jerry'</b>"), "&lt;b&gt;&quot;Tom&quot; &amp; &#039;Jerry&#039;&lt;/b&gt;");
    }

    #[test]
    fn test_equality() {
        assert!(loose_eq(&json!(1), &json!("1")));
        assert!(loose_eq(&json!(1), &json!(1.0)));
        assert!(loose_eq(&json!(null), &json!("")));
        assert!(!loose_eq(&json!("a"), &json!("b")));
        assert!(!strict_eq(&json!(1), &json!("1")));
        assert!(strict_eq(&json!(2), &json!(2.0)));
    }

    #[test]
    fn test_compare() {
        assert_eq!(compare(&json!(2), &json!(10)), Some(Ordering::Less));
        assert_eq!(compare(&json!("b"), &json!("a")), Some(Ordering::Greater));
        assert_eq!(compare(&json!([1]), &json!(1)), None);
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(arithmetic(Arith::Add, &json!(2), &json!(3)).unwrap(), json!(5));
        assert_eq!(arithmetic(Arith::Div, &json!(7), &json!(2)).unwrap(), json!(3.5));
        assert_eq!(arithmetic(Arith::Div, &json!(6), &json!(2)).unwrap(), json!(3));
        assert_eq!(arithmetic(Arith::Mul, &json!(1.5), &json!(2)).unwrap(), json!(3.0));
        assert_eq!(arithmetic(Arith::Mod, &json!(7), &json!(3)).unwrap(), json!(1));
        assert!(arithmetic(Arith::Div, &json!(1), &json!(0)).is_err());
        assert!(arithmetic(Arith::Add, &json!([1]), &json!(1)).is_err());
    }

    #[test]
    fn test_integer_overflow_falls_back_to_float() {
        let min = json!(i64::MIN);
        let max = json!(i64::MAX);

        assert_eq!(arithmetic(Arith::Div, &min, &json!(-1)).unwrap(), json!(9.223372036854776e18));
        assert_eq!(arithmetic(Arith::Add, &max, &json!(1)).unwrap(), json!(9.223372036854776e18));
        assert_eq!(arithmetic(Arith::Sub, &json!(0), &min).unwrap(), json!(9.223372036854776e18));
        assert_eq!(arithmetic(Arith::Mul, &max, &json!(2)).unwrap(), json!(1.8446744073709552e19));
        assert!(arithmetic(Arith::Mod, &min, &json!(-1)).unwrap().as_f64().is_some());
        assert_eq!(arithmetic(Arith::Div, &min, &json!(2)).unwrap(), json!(i64::MIN / 2));
        assert_eq!(arithmetic(Arith::Div, &min, &json!(-2)).unwrap(), json!(i64::MIN / -2));
    }
}
