//! Argument helpers shared by the tool handlers.
//!
//! Models send numbers in many shapes: `435`, `435.0`, `"435"`, `"435, 14"`,
//! `"(435 14)"`. Everything funnels through [`parse_number`], which takes the
//! first numeric token it can find.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static NUMBER_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[-+]?(?:\d+(?:\.\d*)?|\.\d+)").expect("number token pattern is valid")
});

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ArgumentError {
    #[error("missing argument '{0}'")]
    Missing(String),
    #[error("argument '{name}' has no number in {value}")]
    NotANumber { name: String, value: String },
    #[error("argument '{name}' is out of range: {value}")]
    OutOfRange { name: String, value: f64 },
    #[error("argument '{name}' must be {expected}")]
    WrongType { name: String, expected: &'static str },
}

/// Extract a float from a JSON number or the first numeric token of a string.
pub fn parse_number(name: &str, value: &Value) -> Result<f64, ArgumentError> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => NUMBER_TOKEN
            .find(s)
            .and_then(|m| m.as_str().parse::<f64>().ok()),
        _ => {
            return Err(ArgumentError::WrongType {
                name: name.to_string(),
                expected: "a number",
            })
        }
    };

    match number {
        Some(n) if n.is_finite() => Ok(n),
        Some(n) => Err(ArgumentError::OutOfRange {
            name: name.to_string(),
            value: n,
        }),
        None => Err(ArgumentError::NotANumber {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Normalize a pixel coordinate: first numeric token, rounded to the nearest
/// integer (halves away from zero). Never clamped to the screen.
pub fn normalize_coordinate(name: &str, value: &Value) -> Result<i32, ArgumentError> {
    let rounded = parse_number(name, value)?.round();
    if rounded < f64::from(i32::MIN) || rounded > f64::from(i32::MAX) {
        return Err(ArgumentError::OutOfRange {
            name: name.to_string(),
            value: rounded,
        });
    }
    Ok(rounded as i32)
}

fn required<'a>(args: &'a Value, name: &str) -> Result<&'a Value, ArgumentError> {
    match args.get(name) {
        Some(Value::Null) | None => Err(ArgumentError::Missing(name.to_string())),
        Some(value) => Ok(value),
    }
}

pub fn coordinate_arg(args: &Value, name: &str) -> Result<i32, ArgumentError> {
    normalize_coordinate(name, required(args, name)?)
}

pub fn number_arg(args: &Value, name: &str) -> Result<f64, ArgumentError> {
    parse_number(name, required(args, name)?)
}

pub fn str_arg<'a>(args: &'a Value, name: &str) -> Result<&'a str, ArgumentError> {
    required(args, name)?
        .as_str()
        .ok_or_else(|| ArgumentError::WrongType {
            name: name.to_string(),
            expected: "a string",
        })
}

pub fn optional_str_arg<'a>(args: &'a Value, name: &str) -> Option<&'a str> {
    args.get(name).and_then(|v| v.as_str())
}

/// First `max_chars` characters of `s`.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((byte_index, _)) => s[..byte_index].to_string(),
        None => s.to_string(),
    }
}
