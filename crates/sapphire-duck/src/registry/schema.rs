//! Structural argument checking
//!
//! Covers the subset of JSON Schema that tool input schemas use: `type`,
//! `properties`, `required`, `items`, `enum` and `additionalProperties: false`.
//! Annotations such as `description`, `default` or `minimum` are ignored.

use serde_json::{Map, Value};

/// Check `value` against `schema`. The error names the offending field.
pub fn validate(schema: &Value, value: &Value) -> Result<(), String> {
    check(schema, value, "arguments")
}

/// Check a `tools/call` argument object against a tool's input schema
pub fn validate_arguments(schema: &Value, arguments: &Map<String, Value>) -> Result<(), String> {
    let Some(schema) = schema.as_object() else {
        return Ok(());
    };
    if let Some(expected) = schema.get("type") {
        if !type_matches_any(expected, &Value::Object(Map::new())) {
            return Err(format!("arguments must be of type {}, got object", describe_type(expected)));
        }
    }
    check_object(schema, arguments)
}

fn check(schema: &Value, value: &Value, path: &str) -> Result<(), String> {
    let Some(schema) = schema.as_object() else {
        // `true`, `{}` and anything unrecognised accept every value
        return Ok(());
    };

    if let Some(expected) = schema.get("type") {
        if !type_matches_any(expected, value) {
            return Err(format!(
                "{} must be of type {}, got {}",
                path,
                describe_type(expected),
                json_type(value)
            ));
        }
    }

    if let Some(Value::Array(allowed)) = schema.get("enum") {
        if !allowed.contains(value) {
            let choices: Vec<String> = allowed.iter().map(Value::to_string).collect();
            return Err(format!("{} must be one of [{}]", path, choices.join(", ")));
        }
    }

    if let Value::Object(object) = value {
        check_object(schema, object)?;
    }

    if let (Value::Array(items), Some(item_schema)) = (value, schema.get("items")) {
        for (index, item) in items.iter().enumerate() {
            check(item_schema, item, &format!("{}[{}]", path, index))?;
        }
    }

    Ok(())
}

fn check_object(schema: &Map<String, Value>, object: &Map<String, Value>) -> Result<(), String> {
    if let Some(Value::Array(required)) = schema.get("required") {
        for name in required.iter().filter_map(Value::as_str) {
            if !object.contains_key(name) {
                return Err(format!("missing required field '{}'", name));
            }
        }
    }

    let properties = schema.get("properties").and_then(Value::as_object);
    for (name, field) in object {
        match properties.and_then(|p| p.get(name)) {
            Some(field_schema) => check(field_schema, field, &format!("field '{}'", name))?,
            None if schema.get("additionalProperties") == Some(&Value::Bool(false)) => {
                return Err(format!("unexpected field '{}'", name));
            }
            None => {}
        }
    }
    Ok(())
}

fn type_matches_any(expected: &Value, value: &Value) -> bool {
    match expected {
        Value::String(name) => type_matches(name, value),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .any(|name| type_matches(name, value)),
        _ => true,
    }
}

fn type_matches(name: &str, value: &Value) -> bool {
    match name {
        "object" => value.is_object(),
        "array" => value.is_array(),
        "string" => value.is_string(),
        "boolean" => value.is_boolean(),
        "null" => value.is_null(),
        "number" => value.is_number(),
        "integer" => is_integral(value),
        _ => true,
    }
}

/// Integers also accept whole-valued floats such as `2.0`
fn is_integral(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0)
        }
        _ => false,
    }
}

fn describe_type(expected: &Value) -> String {
    match expected {
        Value::String(name) => name.clone(),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(" or "),
        other => other.to_string(),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
