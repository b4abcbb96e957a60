//! Parsing of field maps and records

use crate::schema::{validate_field_map, validate_images, FieldMap, ImageOverlay};
use crate::{Result, TemplateError};
use serde_json::{Map, Value};

/// A flat record: field name to value
pub type Record = Map<String, Value>;

/// Parse and validate a field map from JSON
pub fn parse_field_map(json: &str) -> Result<FieldMap> {
    let fields: FieldMap =
        serde_json::from_str(json).map_err(|e| TemplateError::ParseError(e.to_string()))?;
    validate_field_map(&fields)?;
    Ok(fields)
}

/// Parse and validate a list of image overlays from JSON
pub fn parse_images(json: &str) -> Result<Vec<ImageOverlay>> {
    let images: Vec<ImageOverlay> =
        serde_json::from_str(json).map_err(|e| TemplateError::ParseError(e.to_string()))?;
    validate_images(&images)?;
    Ok(images)
}

/// Turn a JSON value into a record
///
/// Objects are flattened; anything else is rejected.
pub fn record_from_value(value: Value) -> Result<Record> {
    match value {
        Value::Object(map) => Ok(flatten_object(map)),
        other => Err(TemplateError::ParseError(format!(
            "a record must be a JSON object, got {}",
            type_name(&other)
        ))),
    }
}

/// Look up a field value in a record
///
/// Tries the exact name, then a case-insensitive match, then a dotted path
/// through nested objects and arrays (`items.0.item_code`).
pub fn lookup_value<'a>(record: &'a Record, name: &str) -> Option<&'a Value> {
    if let Some(value) = record.get(name) {
        return Some(value);
    }

    if let Some((_, value)) = record.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
        return Some(value);
    }

    resolve_path(record, name)
}

fn resolve_path<'a>(record: &'a Record, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = record.get(segments.next()?)?;

    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    Some(current)
}

/// Convert a JSON value to string for rendering
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Flatten nested objects and arrays into dotted keys
///
/// `{"items": [{"qty": 2}]}` becomes `{"items.0.qty": 2}`. Scalars keep
/// their type; empty containers are kept as they are.
pub fn flatten_object(map: Map<String, Value>) -> Record {
    let mut out = Record::new();
    for (key, value) in map {
        flatten_into(&mut out, key, value);
    }
    out
}

fn flatten_into(out: &mut Record, prefix: String, value: Value) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, inner) in map {
                flatten_into(out, format!("{prefix}.{key}"), inner);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (index, inner) in items.into_iter().enumerate() {
                flatten_into(out, format!("{prefix}.{index}"), inner);
            }
        }
        other => {
            out.insert(prefix, other);
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_lookup_exact_first() {
        let r = record(json!({ "Name": "upper", "name": "lower" }));
        assert_eq!(lookup_value(&r, "name"), Some(&json!("lower")));
        assert_eq!(lookup_value(&r, "Name"), Some(&json!("upper")));
    }

    #[test]
    fn test_lookup_case_insensitive() {
        let r = record(json!({ "Customer_Name": "Jane" }));
        assert_eq!(lookup_value(&r, "customer_name"), Some(&json!("Jane")));
    }

    #[test]
    fn test_lookup_nested_path() {
        let r = record(json!({
            "customer": { "name": "Jane" },
            "items": [{ "item_code": "A-1" }, { "item_code": "B-2" }]
        }));
        assert_eq!(lookup_value(&r, "customer.name"), Some(&json!("Jane")));
        assert_eq!(lookup_value(&r, "items.1.item_code"), Some(&json!("B-2")));
        assert_eq!(lookup_value(&r, "items.9.item_code"), None);
        assert_eq!(lookup_value(&r, "missing"), None);
    }

    #[test]
    fn test_value_to_string() {
        assert_eq!(value_to_string(&json!("hello")), "hello");
        assert_eq!(value_to_string(&json!(42)), "42");
        assert_eq!(value_to_string(&json!(1.5)), "1.5");
        assert_eq!(value_to_string(&json!(true)), "true");
        assert_eq!(value_to_string(&json!(null)), "");
    }

    #[test]
    fn test_flatten_object() {
        let flat = flatten_object(record(json!({
            "name": "SO-0001",
            "customer": { "name": "Acme", "tags": [] },
            "items": [{ "item_code": "A", "qty": 2 }]
        })));

        let expected = record(json!({
            "name": "SO-0001",
            "customer.name": "Acme",
            "customer.tags": [],
            "items.0.item_code": "A",
            "items.0.qty": 2
        }));
        assert_eq!(flat, expected);
    }

    #[test]
    fn test_record_from_value_rejects_scalars() {
        assert!(record_from_value(json!({ "a": 1 })).is_ok());
        let err = record_from_value(json!([1, 2])).unwrap_err();
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn test_parse_field_map() {
        let fields = parse_field_map(r#"{ "name": { "x": 20, "y": 30 }, "total": { "x": 150, "y": 30, "align": "right" } }"#).unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields["name"].page, 1);

        assert!(parse_field_map(r#"{ "name": { "x": 20, "y": 30, "page": 0 } }"#).is_err());
        assert!(parse_field_map("not json").is_err());
    }

    #[test]
    fn test_parse_images() {
        let images = parse_images(
            r#"[{ "id": "logo", "x": 5, "y": 5, "width": 40, "height": 20, "data": "AAAA", "record_range": { "from": 1, "to": 3 } }]"#,
        )
        .unwrap();
        assert_eq!(images.len(), 1);
        assert!(images[0].applies_to(3));
        assert!(!images[0].applies_to(4));
    }
}
