use crate::constants::{
    CHECKPOINT_SEPARATOR, FIELD_DELIMITER, NEWLINE_SENTINEL, RECORD_COLUMNS, SALE_DATE_COLUMN,
};
use crate::domain::{Record, Value};
use crate::pipeline::policy::Stage;
use crate::pipeline::processing::normalize::literal::coerce;

const NAME_COLUMN: usize = 1;
const SUPPLY_COLUMN: usize = 10;
const BLOCKCHAIN_COLUMN: usize = 11;
const REMOTE_URL_COLUMN: usize = 18;
const SALE_DATE_INDEX: usize = 19;

/// Header line of a stage's checkpoint file
pub fn header(stage: Stage) -> String {
    let mut columns: Vec<&str> = RECORD_COLUMNS.to_vec();
    if stage == Stage::Sell {
        columns.push(SALE_DATE_COLUMN);
    }
    columns.join(CHECKPOINT_SEPARATOR)
}

/// Serializes a record as one checkpoint line (no trailing newline).
///
/// Text fields are written bare, everything else in literal form, so the
/// line reads back through the delimited-text normalizer.
pub fn encode(record: &Record) -> String {
    record
        .to_fields()
        .iter()
        .map(encode_field)
        .collect::<Vec<_>>()
        .join(CHECKPOINT_SEPARATOR)
}

fn encode_field(value: &Value) -> String {
    let text = match value {
        Value::Str(s) => s.clone(),
        other => other.to_string(),
    };
    escape_newlines(&text)
}

pub fn escape_newlines(text: &str) -> String {
    text.replace("\r\n", NEWLINE_SENTINEL)
        .replace('\n', NEWLINE_SENTINEL)
        .replace('\r', "")
}

/// Identity column of a checkpoint or delimited source line
pub fn identity(line: &str) -> Option<&str> {
    line.split(FIELD_DELIMITER)
        .nth(NAME_COLUMN)
        .map(str::trim)
        .filter(|name| !name.is_empty())
}

/// Stage outputs kept per completed record, enough to resume later stages.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Projection {
    pub name: String,
    pub remote_url: Option<String>,
    pub supply: Option<u32>,
    pub blockchain: Option<String>,
    pub sale_date: Option<String>,
}

impl Projection {
    pub fn of(record: &Record) -> Self {
        Self {
            name: record.name.clone(),
            remote_url: record.remote_url().map(str::to_string),
            supply: Some(record.supply),
            blockchain: Some(record.blockchain.clone()),
            sale_date: record.sale_date.clone(),
        }
    }

    /// Copies the recorded stage outputs onto a freshly normalized record.
    pub fn apply_to(&self, record: &mut Record) {
        if let Some(url) = &self.remote_url {
            record.remote_url = Some(url.clone());
        }
        if let Some(supply) = self.supply {
            record.supply = supply;
        }
        if let Some(blockchain) = &self.blockchain {
            record.blockchain = blockchain.clone();
        }
        if let Some(date) = &self.sale_date {
            record.sale_date = Some(date.clone());
        }
    }
}

/// Extracts the projection from a checkpoint line. Only the identity column
/// is required; lines written by older versions may lack the later columns.
pub fn parse_projection(line: &str) -> Option<Projection> {
    let name = identity(line)?.to_string();
    let fields: Vec<&str> = line.split(FIELD_DELIMITER).map(str::trim).collect();
    let text = |index: usize| {
        fields
            .get(index)
            .filter(|f| !f.is_empty() && **f != "None")
            .map(|f| f.to_string())
    };
    let supply = fields
        .get(SUPPLY_COLUMN)
        .and_then(|f| match coerce(f) {
            Value::Int(n) if n >= 1 => u32::try_from(n).ok(),
            _ => None,
        });

    Some(Projection {
        name,
        remote_url: text(REMOTE_URL_COLUMN),
        supply,
        blockchain: text(BLOCKCHAIN_COLUMN),
        sale_date: text(SALE_DATE_INDEX),
    })
}
