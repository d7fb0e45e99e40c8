//! Argument checks shared by the graph operations

use serde_json::{Map, Value};

use crate::tools::Arguments;
use crate::types::{McpError, Result};

/// Labels, relationship types and property names are spliced into Cypher
/// text, so they must be plain identifiers.
pub fn validate_identifier(what: &str, value: &str) -> Result<()> {
    let mut chars = value.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(McpError::Operation(format!(
            "Invalid {}: '{}' (use letters, digits and underscores, not starting with a digit)",
            what, value
        )))
    }
}

/// `None` passes; anything else must be a number within `[0.0, 1.0]`
pub fn validate_confidence(confidence: Option<&Value>) -> Result<Option<f64>> {
    match confidence {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(c) if (0.0..=1.0).contains(&c) => Ok(Some(c)),
            _ => Err(McpError::Operation(
                "Confidence must be between 0.0 and 1.0".to_string(),
            )),
        },
        Some(_) => Err(McpError::Operation("Confidence must be a number".to_string())),
    }
}

/// Entity properties must be an object carrying `name` or `id`
pub fn validate_entity_properties(properties: &Value) -> Result<&Map<String, Value>> {
    let map = properties
        .as_object()
        .ok_or_else(|| McpError::Operation("Properties must be a dictionary".to_string()))?;
    if !map.contains_key("name") && !map.contains_key("id") {
        return Err(McpError::Operation("Name or id property is required".to_string()));
    }
    Ok(map)
}

/// Required string argument. Numbers are accepted and rendered as text.
pub fn required_str(arguments: &Arguments, key: &str) -> Result<String> {
    match arguments.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::String(_)) | Some(Value::Null) | None => {
            Err(McpError::Operation(format!("Argument '{}' is required", key)))
        }
        Some(_) => Err(McpError::Operation(format!("Argument '{}' must be a string", key))),
    }
}

/// Optional string argument; empty strings read as absent
pub fn optional_str(arguments: &Arguments, key: &str) -> Result<Option<String>> {
    match arguments.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(McpError::Operation(format!("Argument '{}' must be a string", key))),
    }
}

pub fn bool_arg(arguments: &Arguments, key: &str, default: bool) -> Result<bool> {
    match arguments.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        Some(_) => Err(McpError::Operation(format!("Argument '{}' must be a boolean", key))),
    }
}

/// Optional list of strings; absent reads as empty
pub fn string_list(arguments: &Arguments, key: &str) -> Result<Vec<String>> {
    match arguments.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    McpError::Operation(format!("Argument '{}' must be a list of strings", key))
                })
            })
            .collect(),
        Some(_) => Err(McpError::Operation(format!(
            "Argument '{}' must be a list of strings",
            key
        ))),
    }
}

/// Optional JSON object; absent reads as empty
pub fn object_arg(arguments: &Arguments, key: &str) -> Result<Map<String, Value>> {
    match arguments.get(key) {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(_) => Err(McpError::Operation(format!("Argument '{}' must be an object", key))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identifiers() {
        assert!(validate_identifier("label", "Person").is_ok());
        assert!(validate_identifier("label", "_private2").is_ok());
        assert!(validate_identifier("label", "").is_err());
        assert!(validate_identifier("label", "2fast").is_err());
        assert!(validate_identifier("relationship type", "KNOWS]->(x) DETACH DELETE x//").is_err());
    }

    #[test]
    fn test_confidence_bounds() {
        assert_eq!(validate_confidence(None).unwrap(), None);
        assert_eq!(validate_confidence(Some(&json!(0.0))).unwrap(), Some(0.0));
        assert_eq!(validate_confidence(Some(&json!(1))).unwrap(), Some(1.0));
        assert_eq!(
            validate_confidence(Some(&json!(1.5))).unwrap_err().to_string(),
            "Confidence must be between 0.0 and 1.0"
        );
        assert_eq!(
            validate_confidence(Some(&json!("high"))).unwrap_err().to_string(),
            "Confidence must be a number"
        );
    }

    #[test]
    fn test_entity_properties() {
        assert!(validate_entity_properties(&json!({ "name": "Alice" })).is_ok());
        assert!(validate_entity_properties(&json!({ "id": 7 })).is_ok());
        assert_eq!(
            validate_entity_properties(&json!({})).unwrap_err().to_string(),
            "Name or id property is required"
        );
        assert_eq!(
            validate_entity_properties(&json!("Alice")).unwrap_err().to_string(),
            "Properties must be a dictionary"
        );
    }

    #[test]
    fn test_argument_readers() {
        let args = json!({ "flag": true, "tags": ["a", "b"], "id": 12, "blank": "" })
            .as_object()
            .cloned()
            .unwrap();
        assert!(bool_arg(&args, "flag", false).unwrap());
        assert!(bool_arg(&args, "other", true).unwrap());
        assert_eq!(string_list(&args, "tags").unwrap(), vec!["a", "b"]);
        assert!(string_list(&args, "none").unwrap().is_empty());
        assert_eq!(required_str(&args, "id").unwrap(), "12");
        assert_eq!(optional_str(&args, "blank").unwrap(), None);
        assert!(bool_arg(&args, "tags", false).is_err());
    }
}
