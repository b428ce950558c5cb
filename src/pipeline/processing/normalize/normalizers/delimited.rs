use super::RowParser;
use crate::constants::FIELD_DELIMITER;
use crate::domain::Value;
use crate::error::{ListerError, Result};
use crate::pipeline::ingestion::RawRow;
use crate::pipeline::processing::normalize::literal::coerce;

/// Parser for delimited-text rows, including checkpoint lines.
pub struct DelimitedTextParser;

impl RowParser for DelimitedTextParser {
    fn format_name(&self) -> &'static str {
        "delimited_text"
    }

    fn fields(&self, row: &RawRow) -> Result<Vec<Value>> {
        match row {
            RawRow::Delimited(line) => Ok(line.split(FIELD_DELIMITER).map(coerce).collect()),
            _ => Err(ListerError::MalformedRecord(
                "row is not a delimited-text line".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_are_trimmed_and_coerced() {
        let row = RawRow::Delimited(
            "art/a.png;; Sunrise ;; [['Sky', 'Red']];; False;; 3;; 0.5;; 01-01-2024 10:00".into(),
        );
        let fields = DelimitedTextParser.fields(&row).unwrap();
        assert_eq!(
            fields,
            vec![
                Value::text("art/a.png"),
                Value::text("Sunrise"),
                Value::List(vec![Value::List(vec![Value::text("Sky"), Value::text("Red")])]),
                Value::Bool(false),
                Value::Int(3),
                Value::Float(0.5),
                Value::text("01-01-2024 10:00"),
            ]
        );
    }
}
