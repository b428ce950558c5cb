use super::RowParser;
use crate::domain::Value;
use crate::error::{ListerError, Result};
use crate::pipeline::ingestion::RawRow;
use crate::pipeline::processing::normalize::literal::coerce;

/// Parser for spreadsheet rows. Cells arrive already rendered to text and go
/// through the same coercion as delimited fields.
pub struct TabularParser;

impl RowParser for TabularParser {
    fn format_name(&self) -> &'static str {
        "tabular"
    }

    fn fields(&self, row: &RawRow) -> Result<Vec<Value>> {
        match row {
            RawRow::Tabular(cells) => Ok(cells.iter().map(|cell| coerce(cell)).collect()),
            _ => Err(ListerError::MalformedRecord(
                "row is not a spreadsheet row".to_string(),
            )),
        }
    }
}
