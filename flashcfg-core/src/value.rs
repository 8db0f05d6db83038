//! Typed access to configuration values
//!
//! A stored value is converted to whatever type the caller asks for.
//! Conversion never fails: a value that does not fit the requested type
//! comes back as that type's zero (`0`, `0.0`, `false`), strings are
//! parsed when they look like numbers or booleans, and anything can be
//! rendered as text.

use alloc::string::{String, ToString};

use serde_json::Value;

mod sealed {
    pub trait Sealed {}
}

/// Types that can be stored in the configuration document
///
/// Implemented for `f64`, `f32`, `i32`, `i64`, `u32`, `bool` and `String`.
pub trait ConfigValue: sealed::Sealed + Clone {
    /// Convert into a JSON value
    ///
    /// Non-finite floats become `null`.
    fn into_value(self) -> Value;

    /// Convert a stored JSON value, coercing if the type differs
    fn from_value(value: &Value) -> Self;
}

impl sealed::Sealed for f64 {}
impl ConfigValue for f64 {
    fn into_value(self) -> Value {
        Value::from(self)
    }

    fn from_value(value: &Value) -> Self {
        to_f64(value)
    }
}

impl sealed::Sealed for f32 {}
impl ConfigValue for f32 {
    fn into_value(self) -> Value {
        Value::from(self)
    }

    fn from_value(value: &Value) -> Self {
        to_f64(value) as f32
    }
}

impl sealed::Sealed for i64 {}
impl ConfigValue for i64 {
    fn into_value(self) -> Value {
        Value::from(self)
    }

    fn from_value(value: &Value) -> Self {
        to_i64(value).unwrap_or(0)
    }
}

impl sealed::Sealed for i32 {}
impl ConfigValue for i32 {
    fn into_value(self) -> Value {
        Value::from(self)
    }

    fn from_value(value: &Value) -> Self {
        to_i64(value)
            .and_then(|n| i32::try_from(n).ok())
            .unwrap_or(0)
    }
}

impl sealed::Sealed for u32 {}
impl ConfigValue for u32 {
    fn into_value(self) -> Value {
        Value::from(self)
    }

    fn from_value(value: &Value) -> Self {
        to_i64(value)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(0)
    }
}

impl sealed::Sealed for bool {}
impl ConfigValue for bool {
    fn into_value(self) -> Value {
        Value::Bool(self)
    }

    fn from_value(value: &Value) -> Self {
        to_bool(value)
    }
}

impl sealed::Sealed for String {}
impl ConfigValue for String {
    fn into_value(self) -> Value {
        Value::String(self)
    }

    fn from_value(value: &Value) -> Self {
        render(value)
    }
}

/// Render a value as text
///
/// Strings are returned as-is (unquoted); everything else as JSON.
pub fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn to_f64(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Integer view of a value, `None` if it has none or is out of range
fn to_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(truncate)),
        Value::Bool(b) => Some(*b as i64),
        Value::String(s) => {
            let s = s.trim();
            s.parse()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(truncate))
        }
        _ => None,
    }
}

/// Truncate toward zero if the result fits in an `i64`
fn truncate(f: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, which is already out of range
    if f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn to_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => match s.trim() {
            "true" => true,
            "false" => false,
            other => other.parse::<f64>().is_ok_and(|f| f != 0.0),
        },
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_same_type_round_trip() {
        assert_eq!(f64::from_value(&1.25f64.into_value()), 1.25);
        assert_eq!(f32::from_value(&0.5f32.into_value()), 0.5);
        assert_eq!(i32::from_value(&(-42i32).into_value()), -42);
        assert_eq!(i64::from_value(&i64::MIN.into_value()), i64::MIN);
        assert_eq!(u32::from_value(&u32::MAX.into_value()), u32::MAX);
        assert!(bool::from_value(&true.into_value()));
        assert_eq!(
            String::from_value(&String::from("wifi").into_value()),
            "wifi"
        );
    }

    #[test]
    fn test_non_finite_float_stored_as_null() {
        assert_eq!(f64::NAN.into_value(), Value::Null);
        assert_eq!(f64::INFINITY.into_value(), Value::Null);
        assert_eq!(f64::from_value(&Value::Null), 0.0);
    }

    #[test]
    fn test_number_to_integer() {
        assert_eq!(i32::from_value(&json!(3.9)), 3);
        assert_eq!(i32::from_value(&json!(-3.9)), -3);
        // Out of range for the requested type
        assert_eq!(i32::from_value(&json!(5_000_000_000i64)), 0);
        assert_eq!(u32::from_value(&json!(-1)), 0);
        assert_eq!(i64::from_value(&json!(u64::MAX)), 0);
        assert_eq!(i64::from_value(&json!(1e300)), 0);
    }

    #[test]
    fn test_number_to_bool_and_string() {
        assert!(bool::from_value(&json!(2)));
        assert!(bool::from_value(&json!(-0.5)));
        assert!(!bool::from_value(&json!(0)));
        assert_eq!(String::from_value(&json!(42)), "42");
        assert_eq!(String::from_value(&json!(1.5)), "1.5");
    }

    #[test]
    fn test_bool_to_number() {
        assert_eq!(f64::from_value(&json!(true)), 1.0);
        assert_eq!(i32::from_value(&json!(false)), 0);
        assert_eq!(u32::from_value(&json!(true)), 1);
        assert_eq!(String::from_value(&json!(false)), "false");
    }

    #[test]
    fn test_string_parsing() {
        assert_eq!(i32::from_value(&json!("12")), 12);
        assert_eq!(i32::from_value(&json!(" 7.8 ")), 7);
        assert_eq!(f64::from_value(&json!("2.5")), 2.5);
        assert!(bool::from_value(&json!("true")));
        assert!(bool::from_value(&json!("1")));
        assert!(!bool::from_value(&json!("false")));
    }

    #[test]
    fn test_unparseable_string_is_zero() {
        assert_eq!(i32::from_value(&json!("abc")), 0);
        assert_eq!(f64::from_value(&json!("")), 0.0);
        assert!(!bool::from_value(&json!("yes")));
    }

    #[test]
    fn test_null_and_containers() {
        assert_eq!(i64::from_value(&Value::Null), 0);
        assert!(!bool::from_value(&json!([1, 2])));
        assert_eq!(String::from_value(&Value::Null), "null");
        assert_eq!(String::from_value(&json!([1, 2])), "[1,2]");
        assert_eq!(String::from_value(&json!({"a": 1})), "{\"a\":1}");
    }

    #[test]
    fn test_render_unquotes_strings() {
        assert_eq!(render(&json!("hello")), "hello");
        assert_eq!(render(&json!("say \"hi\"")), "say \"hi\"");
        assert_eq!(render(&json!(-3)), "-3");
    }
}
