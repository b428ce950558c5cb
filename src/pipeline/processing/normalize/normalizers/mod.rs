// One row parser per source format. Each turns a raw row into the positional
// field list that the schema mapping consumes.
pub mod delimited;
pub mod structured;
pub mod tabular;

pub use delimited::DelimitedTextParser;
pub use structured::StructuredObjectParser;
pub use tabular::TabularParser;

use crate::domain::Value;
use crate::error::Result;
use crate::pipeline::ingestion::RawRow;

/// Trait implemented by every format-specific row parser
pub trait RowParser {
    /// Short format name used in logs and metrics
    fn format_name(&self) -> &'static str;

    /// Split a raw row into positional values
    fn fields(&self, row: &RawRow) -> Result<Vec<Value>>;
}
