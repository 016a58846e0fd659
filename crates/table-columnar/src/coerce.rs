//! Numeric coercion shared by the builders and the numeric aggregators.

use crate::types::Value;

/// Coerce a non-null value to a native 64-bit integer.
///
/// Only integer values are accepted: floats are not silently truncated, even when they hold an
/// integral value.
pub fn coerce_to_long(value: &Value) -> Option<i64> {
    match value {
        Value::Integer(v) => Some(*v),
        _ => None,
    }
}

/// Coerce a non-null value to a native 64-bit float. Integers widen to floats.
pub fn coerce_to_double(value: &Value) -> Option<f64> {
    match value {
        Value::Float(v) => Some(*v),
        Value::Integer(v) => Some(*v as f64),
        _ => None,
    }
}

/// Convert a float to an integer when it holds an exactly representable integral value.
///
/// `-0.0` converts to `0`; NaN, infinities and values outside the `i64` range do not convert.
pub fn integral_f64_to_i64(value: f64) -> Option<i64> {
    // 2^63 is exactly representable as f64; the i64 range is [-2^63, 2^63).
    const BOUND: f64 = 9_223_372_036_854_775_808.0;
    if value.fract() == 0.0 && (-BOUND..BOUND).contains(&value) {
        Some(value as i64)
    } else {
        None
    }
}
