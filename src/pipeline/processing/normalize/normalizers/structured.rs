use super::RowParser;
use crate::domain::Value;
use crate::error::{ListerError, Result};
use crate::pipeline::ingestion::RawRow;

/// Parser for records taken from a structured-object (`.json`) source.
///
/// Field order is the key order of the record object. Lists of objects are
/// flattened into lists of their values, so callers rely on position only.
pub struct StructuredObjectParser;

impl RowParser for StructuredObjectParser {
    fn format_name(&self) -> &'static str {
        "structured_object"
    }

    fn fields(&self, row: &RawRow) -> Result<Vec<Value>> {
        match row {
            RawRow::Object(serde_json::Value::Object(map)) => {
                Ok(map.values().map(Value::from).collect())
            }
            RawRow::Object(other) => Err(ListerError::MalformedRecord(format!(
                "expected a record object, found {}",
                json_kind(other)
            ))),
            _ => Err(ListerError::MalformedRecord(
                "row is not a structured-object record".to_string(),
            )),
        }
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn values_follow_key_order_and_objects_flatten() {
        let row = RawRow::Object(json!({
            "file_path": "a.png",
            "properties": [{"type": "Eyes", "name": "Green"}],
            "supply": 2
        }));
        let fields = StructuredObjectParser.fields(&row).unwrap();
        assert_eq!(
            fields,
            vec![
                Value::text("a.png"),
                Value::List(vec![Value::List(vec![
                    Value::text("Eyes"),
                    Value::text("Green")
                ])]),
                Value::Int(2),
            ]
        );
    }

    #[test]
    fn non_object_record_is_malformed() {
        let row = RawRow::Object(json!(["a.png"]));
        assert!(matches!(
            StructuredObjectParser.fields(&row),
            Err(ListerError::MalformedRecord(_))
        ));
    }
}
