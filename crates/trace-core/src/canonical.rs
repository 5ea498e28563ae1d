//! Canonical JSON encoding used as hash input.
//!
//! The encoding is compact JSON with object keys sorted by code point and no
//! insignificant whitespace. Two conventions pin down the remaining
//! ambiguity so the write and verify paths can never drift apart:
//!
//! - **Floats** use the shortest digit string that round-trips, rendered
//!   fixed-point when the decimal exponent lies in `[-4, 16)` and scientific
//!   otherwise (`1e-05`, `1.5e+16`). Integral floats keep a trailing `.0`.
//! - **Strings** are ASCII-only. Anything outside printable ASCII is written
//!   as a lowercase `\uXXXX` escape (surrogate pairs above the BMP).
//!
//! Together these reproduce Python's `json.dumps(obj, sort_keys=True,
//! separators=(",", ":"))` byte for byte, so ledgers hashed by Python
//! producers verify here and vice versa.

use std::fmt::Write as _;

use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::errors::CoreError;

/// Serialize `value` to its canonical string form.
///
/// # Errors
///
/// Returns [`CoreError::Serialization`] if the value cannot be represented
/// as JSON or contains a non-finite float.
pub fn to_canonical_string<T: Serialize + ?Sized>(value: &T) -> Result<String, CoreError> {
    let value = serde_json::to_value(value)
        .map_err(|e| CoreError::serialization("payload", e.to_string()))?;
    let mut out = String::with_capacity(256);
    write_value(&mut out, &value)?;
    Ok(out)
}

/// Canonical form as UTF-8 bytes.
///
/// # Errors
///
/// See [`to_canonical_string`].
pub fn to_canonical_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CoreError> {
    to_canonical_string(value).map(String::into_bytes)
}

fn write_value(out: &mut String, value: &Value) -> Result<(), CoreError> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(n) => write_number(out, n)?,
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_value(out, item)?;
            }
            out.push(']');
        }
        Value::Object(map) => write_object(out, map)?,
    }
    Ok(())
}

fn write_object(out: &mut String, map: &Map<String, Value>) -> Result<(), CoreError> {
    // `Map` iteration order depends on serde_json's `preserve_order` feature,
    // so sort explicitly.
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    out.push('{');
    for (index, (key, value)) in entries.into_iter().enumerate() {
        if index > 0 {
            out.push(',');
        }
        write_string(out, key);
        out.push(':');
        write_value(out, value)?;
    }
    out.push('}');
    Ok(())
}

fn write_number(out: &mut String, n: &Number) -> Result<(), CoreError> {
    if let Some(v) = n.as_i64() {
        let _ = write!(out, "{v}");
    } else if let Some(v) = n.as_u64() {
        let _ = write!(out, "{v}");
    } else if let Some(v) = n.as_f64() {
        write_float(out, v)?;
    } else {
        return Err(CoreError::serialization(
            "payload",
            format!("unrepresentable number {n}"),
        ));
    }
    Ok(())
}

/// Append the canonical text of a float.
///
/// # Errors
///
/// Returns [`CoreError::Serialization`] for NaN and infinities.
pub fn write_float(out: &mut String, value: f64) -> Result<(), CoreError> {
    if !value.is_finite() {
        return Err(CoreError::serialization(
            "payload",
            format!("non-finite float {value} has no canonical form"),
        ));
    }

    if value == 0.0 {
        out.push_str(if value.is_sign_negative() { "-0.0" } else { "0.0" });
        return Ok(());
    }

    // `{:e}` yields the shortest round-trip digits, e.g. "-8.2e-1".
    let sci = format!("{value:e}");
    let (mantissa, exponent) = sci.split_once('e').ok_or_else(|| {
        CoreError::serialization("payload", format!("unexpected float rendering '{sci}'"))
    })?;
    let exponent: i32 = exponent.parse().map_err(|_| {
        CoreError::serialization("payload", format!("unexpected float exponent in '{sci}'"))
    })?;
    let (negative, mantissa) = mantissa
        .strip_prefix('-')
        .map_or((false, mantissa), |rest| (true, rest));
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();

    if negative {
        out.push('-');
    }

    if (-4..16).contains(&exponent) {
        write_fixed(out, &digits, exponent);
    } else {
        out.push_str(&digits[..1]);
        if digits.len() > 1 {
            out.push('.');
            out.push_str(&digits[1..]);
        }
        let sign = if exponent < 0 { '-' } else { '+' };
        let _ = write!(out, "e{sign}{:02}", exponent.unsigned_abs());
    }
    Ok(())
}

fn write_fixed(out: &mut String, digits: &str, exponent: i32) {
    if exponent < 0 {
        out.push_str("0.");
        for _ in 0..(exponent.unsigned_abs() - 1) {
            out.push('0');
        }
        out.push_str(digits);
        return;
    }

    // exponent is in [0, 16) here.
    let int_len = exponent.unsigned_abs() as usize + 1;
    if digits.len() <= int_len {
        out.push_str(digits);
        for _ in digits.len()..int_len {
            out.push('0');
        }
        out.push_str(".0");
    } else {
        out.push_str(&digits[..int_len]);
        out.push('.');
        out.push_str(&digits[int_len..]);
    }
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            ' '..='~' => out.push(c),
            _ => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    let _ = write!(out, "\\u{unit:04x}");
                }
            }
        }
    }
    out.push('"');
}
