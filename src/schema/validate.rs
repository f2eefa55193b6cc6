//! Schema interpreter.
//!
//! Walks every declared field, coerces the raw value to the field type,
//! checks rules and finally runs the cross-field refinements. All failures
//! are collected; validation never stops at the first one.

use chrono::{DateTime, NaiveDate};
use serde_json::{Map, Number, Value};

use super::errors::{ValidationErrors, ROOT_PATH};
use super::params::NormalizedParams;
use super::rules::{FieldType, Rule, Schema};

const DATE_FORMAT: &str = "%Y-%m-%d";

// == Validate ==
/// Parses `input` against `schema`.
///
/// `null` is treated as an empty object. Unknown keys are dropped from the
/// result. On failure every failing field path is reported.
pub fn validate(schema: &Schema, input: &Value) -> Result<NormalizedParams, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let empty = Map::new();
    let map = match input {
        Value::Null => &empty,
        Value::Object(map) => map,
        _ => {
            errors.add(ROOT_PATH, "Expected an object");
            return Err(errors);
        }
    };

    let output = validate_object(schema, map, "", &mut errors);
    if errors.is_empty() {
        Ok(NormalizedParams::from_map(output))
    } else {
        Err(errors)
    }
}

fn validate_object(
    schema: &Schema,
    input: &Map<String, Value>,
    prefix: &str,
    errors: &mut ValidationErrors,
) -> Map<String, Value> {
    let mut output = Map::new();

    for field in &schema.fields {
        let path = join_path(prefix, field.name);
        let raw = input.get(field.name).filter(|v| !is_absent(&field.ty, v));

        match raw {
            None => {
                if let Some(default) = &field.default {
                    output.insert(field.name.to_string(), default.clone());
                } else if field.required {
                    errors.add(path, "Required");
                }
            }
            Some(raw) => {
                if let Some(value) = coerce(&field.ty, raw, &path, errors) {
                    check_rules(&field.rules, &value, &path, errors);
                    output.insert(field.name.to_string(), value);
                }
            }
        }
    }

    // Refinements see the coerced values, including ones that failed rules.
    for refinement in &schema.refinements {
        if !(refinement.check)(&output) {
            errors.add(join_path(prefix, refinement.path), refinement.message);
        }
    }

    output
}

/// Null is always absent; blank strings are absent for everything except
/// plain string fields, since forms submit "" for untouched inputs.
fn is_absent(ty: &FieldType, value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) if s.trim().is_empty() => !matches!(ty, FieldType::String),
        _ => false,
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

// == Coercion ==
fn coerce(ty: &FieldType, raw: &Value, path: &str, errors: &mut ValidationErrors) -> Option<Value> {
    match ty {
        FieldType::Any => Some(raw.clone()),
        FieldType::String => match raw {
            Value::String(s) => Some(Value::String(s.clone())),
            Value::Number(n) => Some(Value::String(n.to_string())),
            _ => fail(errors, path, "Expected text"),
        },
        FieldType::Integer => match raw {
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Value::from(i)),
                None => match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                        Some(Value::from(f as i64))
                    }
                    _ => fail(errors, path, "Expected a whole number"),
                },
            },
            Value::String(s) => match s.trim().parse::<i64>() {
                Ok(i) => Some(Value::from(i)),
                Err(_) => fail(errors, path, "Expected a whole number"),
            },
            _ => fail(errors, path, "Expected a whole number"),
        },
        FieldType::Number => match raw {
            Value::Number(_) => Some(raw.clone()),
            Value::String(s) => {
                let s = s.trim();
                if let Ok(i) = s.parse::<i64>() {
                    Some(Value::from(i))
                } else {
                    match s.parse::<f64>().ok().and_then(Number::from_f64) {
                        Some(n) => Some(Value::Number(n)),
                        None => fail(errors, path, "Expected a number"),
                    }
                }
            }
            _ => fail(errors, path, "Expected a number"),
        },
        FieldType::Boolean => match raw {
            Value::Bool(b) => Some(Value::Bool(*b)),
            Value::String(s) => match s.trim() {
                "true" | "1" => Some(Value::Bool(true)),
                "false" | "0" => Some(Value::Bool(false)),
                _ => fail(errors, path, "Expected true or false"),
            },
            Value::Number(n) => match n.as_i64() {
                Some(1) => Some(Value::Bool(true)),
                Some(0) => Some(Value::Bool(false)),
                _ => fail(errors, path, "Expected true or false"),
            },
            _ => fail(errors, path, "Expected true or false"),
        },
        FieldType::Date => match raw.as_str().and_then(parse_date) {
            Some(date) => Some(Value::String(date.format(DATE_FORMAT).to_string())),
            None => fail(errors, path, "Expected a date (YYYY-MM-DD)"),
        },
        FieldType::Enum(options) => match raw.as_str() {
            Some(s) if options.contains(&s) => Some(Value::String(s.to_string())),
            _ => fail(
                errors,
                path,
                &format!("Must be one of: {}", options.join(", ")),
            ),
        },
        FieldType::Array(item_ty) => match raw {
            Value::Array(items) => {
                let coerced = items
                    .iter()
                    .enumerate()
                    .filter_map(|(i, item)| {
                        let item_path = join_path(path, &i.to_string());
                        if item.is_null() {
                            errors.add(item_path, "Required");
                            None
                        } else {
                            coerce(item_ty, item, &item_path, errors)
                        }
                    })
                    .collect();
                Some(Value::Array(coerced))
            }
            _ => fail(errors, path, "Expected a list"),
        },
        FieldType::Object(schema) => match raw {
            Value::Object(map) => Some(Value::Object(validate_object(schema, map, path, errors))),
            _ => fail(errors, path, "Expected an object"),
        },
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

fn fail(errors: &mut ValidationErrors, path: &str, message: &str) -> Option<Value> {
    errors.add(path, message);
    None
}

// == Rules ==
fn check_rules(rules: &[Rule], value: &Value, path: &str, errors: &mut ValidationErrors) {
    for rule in rules {
        if let Some(message) = violation(rule, value) {
            errors.add(path, message);
        }
    }
}

fn violation(rule: &Rule, value: &Value) -> Option<String> {
    match (rule, value) {
        (Rule::MinLength(n), Value::String(s)) if s.trim().chars().count() < *n => {
            if *n == 1 {
                Some("Required".to_string())
            } else {
                Some(format!("Must be at least {} characters", n))
            }
        }
        (Rule::MaxLength(n), Value::String(s)) if s.chars().count() > *n => {
            Some(format!("Must be at most {} characters", n))
        }
        (Rule::MinLength(n), Value::Array(items)) if items.len() < *n => {
            Some(format!("Must contain at least {} item(s)", n))
        }
        (Rule::MaxLength(n), Value::Array(items)) if items.len() > *n => {
            Some(format!("Must contain at most {} item(s)", n))
        }
        (Rule::Min(min), Value::Number(n)) if n.as_f64().is_some_and(|v| v < *min) => {
            Some(format!("Must be at least {}", format_bound(*min)))
        }
        (Rule::Max(max), Value::Number(n)) if n.as_f64().is_some_and(|v| v > *max) => {
            Some(format!("Must be at most {}", format_bound(*max)))
        }
        (Rule::Pattern(pattern, message), Value::String(s)) if !pattern.is_match(s) => {
            Some(message.to_string())
        }
        _ => None,
    }
}

fn format_bound(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
