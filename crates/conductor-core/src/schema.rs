//! Wire payload validation
//!
//! A small JSON-schema-subset walker plus the declared shapes for the two
//! payloads the pipeline accepts: goal submissions and planner LLM
//! responses. Error messages carry a dotted path to the offending value.

use serde_json::{json, Value};
use thiserror::Error;

/// Payload/shape mismatch.
#[derive(Debug, Error)]
#[error("validation failed: {0}")]
pub struct SchemaError(pub String);

/// Validate a value against a schema, rooting paths at `$`.
pub fn validate(value: &Value, schema: &Value) -> Result<(), SchemaError> {
    validate_value(value, schema, "$").map_err(SchemaError)
}

/// Shape of the goal submission payload.
pub fn submission_schema() -> Value {
    json!({
        "type": "object",
        "required": ["goal"],
        "properties": {
            "goal": { "type": "string" },
            "maxConcurrency": { "type": "integer", "minimum": 1 },
            "maxSteps": { "type": "integer", "minimum": 1 }
        }
    })
}

/// Shape of the planner LLM response after fence stripping.
pub fn plan_response_schema() -> Value {
    json!({
        "type": "object",
        "required": ["nodes"],
        "properties": {
            "nodes": {
                "type": "array",
                "minItems": 1,
                "items": {
                    "type": "object",
                    "required": ["id", "task"],
                    "properties": {
                        "id": { "type": "string" },
                        "task": { "type": "string" },
                        "dependsOn": { "type": "array", "items": { "type": "string" } },
                        "assignTo": { "type": "string" }
                    }
                }
            },
            "synthesizerPrompt": { "type": "string" }
        }
    })
}

/// Validate a goal submission: declared shape plus a non-blank goal.
pub fn validate_submission(value: &Value) -> Result<(), SchemaError> {
    validate(value, &submission_schema())?;
    let goal = value.get("goal").and_then(|v| v.as_str()).unwrap_or("");
    if goal.trim().is_empty() {
        return Err(SchemaError("$.goal must not be blank".to_string()));
    }
    Ok(())
}

/// Validate a parsed planner response: declared shape plus non-blank node
/// ids and task descriptions.
pub fn validate_plan_response(value: &Value) -> Result<(), SchemaError> {
    validate(value, &plan_response_schema())?;
    let nodes = value.get("nodes").and_then(|v| v.as_array());
    for (idx, node) in nodes.into_iter().flatten().enumerate() {
        for field in ["id", "task"] {
            let text = node.get(field).and_then(|v| v.as_str()).unwrap_or("");
            if text.trim().is_empty() {
                return Err(SchemaError(format!(
                    "$.nodes[{}].{} must not be blank",
                    idx, field
                )));
            }
        }
    }
    Ok(())
}

fn validate_value(value: &Value, schema: &Value, path: &str) -> Result<(), String> {
    let schema_obj = schema
        .as_object()
        .ok_or_else(|| format!("schema at '{}' must be an object", path))?;

    if let Some(type_spec) = schema_obj.get("type") {
        validate_type(value, type_spec, path)?;
    }

    if let Some(variants) = schema_obj.get("enum").and_then(|v| v.as_array()) {
        if !variants.iter().any(|candidate| candidate == value) {
            return Err(format!("{} is not one of the allowed values", path));
        }
    }

    if let Some(minimum) = schema_obj.get("minimum").and_then(|v| v.as_i64()) {
        let below = match (value.as_i64(), value.as_u64()) {
            (Some(n), _) => n < minimum,
            (None, Some(n)) => (n as i128) < minimum as i128,
            _ => false,
        };
        if below {
            return Err(format!("{} must be >= {}", path, minimum));
        }
    }

    if let Some(required) = schema_obj.get("required").and_then(|v| v.as_array()) {
        let object = value
            .as_object()
            .ok_or_else(|| format!("{} must be an object", path))?;
        for key in required.iter().filter_map(|v| v.as_str()) {
            if !object.contains_key(key) {
                return Err(format!("{} missing required field '{}'", path, key));
            }
        }
    }

    if let Some(properties) = schema_obj.get("properties").and_then(|v| v.as_object()) {
        let object = value
            .as_object()
            .ok_or_else(|| format!("{} must be an object", path))?;
        for (key, property_schema) in properties {
            if let Some(child) = object.get(key) {
                let child_path = format!("{}.{}", path, key);
                validate_value(child, property_schema, &child_path)?;
            }
        }

        if schema_obj
            .get("additionalProperties")
            .and_then(|v| v.as_bool())
            == Some(false)
        {
            for key in object.keys() {
                if !properties.contains_key(key) {
                    return Err(format!("{} contains unknown field '{}'", path, key));
                }
            }
        }
    }

    if let Some(item_schema) = schema_obj.get("items") {
        let array = value
            .as_array()
            .ok_or_else(|| format!("{} must be an array", path))?;
        if let Some(min_items) = schema_obj.get("minItems").and_then(|v| v.as_u64()) {
            if (array.len() as u64) < min_items {
                return Err(format!("{} must contain at least {} item(s)", path, min_items));
            }
        }
        for (idx, item) in array.iter().enumerate() {
            let item_path = format!("{}[{}]", path, idx);
            validate_value(item, item_schema, &item_path)?;
        }
    }

    Ok(())
}

fn validate_type(value: &Value, type_spec: &Value, path: &str) -> Result<(), String> {
    let matches = |t: &str, v: &Value| match t {
        "object" => v.is_object(),
        "array" => v.is_array(),
        "string" => v.is_string(),
        "number" => v.is_number(),
        "integer" => v.as_i64().is_some() || v.as_u64().is_some(),
        "boolean" => v.is_boolean(),
        "null" => v.is_null(),
        _ => false,
    };

    match type_spec {
        Value::String(type_name) => {
            if matches(type_name, value) {
                Ok(())
            } else {
                Err(format!("{} expected type '{}'", path, type_name))
            }
        }
        Value::Array(types) => {
            if types
                .iter()
                .filter_map(|t| t.as_str())
                .any(|t| matches(t, value))
            {
                Ok(())
            } else {
                Err(format!("{} did not match any allowed types", path))
            }
        }
        _ => Err(format!("{} schema.type must be string or array", path)),
    }
}
