//! Record normalization: raw rows of any supported format into one canonical
//! [`Record`].

pub mod literal;
pub mod normalizers;

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use tracing::debug;

use crate::constants::{DEFAULT_BLOCKCHAIN, MIN_RECORD_FIELDS, NEWLINE_SENTINEL};
use crate::domain::{
    AssetPath, Attribute, ListingDuration, Price, Record, SaleMethod, SpecificBuyer,
    UnlockableContent, Value,
};
use crate::error::{ListerError, Result};
use crate::observability::metrics;
use crate::pipeline::ingestion::RawRow;
use normalizers::{DelimitedTextParser, RowParser, StructuredObjectParser, TabularParser};

/// Leading path segment that looks like another machine's home directory
static HOME_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:/home/[^/\\]+|/Users/[^/\\]+|/root|[A-Za-z]:[\\/][Uu]sers[\\/][^/\\]+)")
        .expect("home prefix pattern is valid")
});

/// Builds canonical records from raw rows.
#[derive(Debug, Clone)]
pub struct Normalizer {
    home: Option<PathBuf>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    /// Normalizer rewriting asset paths onto the current user's home directory
    pub fn new() -> Self {
        Self {
            home: dirs::home_dir(),
        }
    }

    pub fn with_home(home: Option<PathBuf>) -> Self {
        Self { home }
    }

    pub fn normalize(&self, row: &RawRow) -> Result<Record> {
        let parser: &dyn RowParser = match row {
            RawRow::Object(_) => &StructuredObjectParser,
            RawRow::Delimited(_) => &DelimitedTextParser,
            RawRow::Tabular(_) => &TabularParser,
        };
        let result = parser
            .fields(row)
            .and_then(|fields| build_record(fields, self.home.as_deref()));
        match &result {
            Ok(record) => {
                metrics::normalize::record_normalized(parser.format_name());
                debug!(format = parser.format_name(), name = %record.name, "Record normalized");
            }
            Err(_) => metrics::normalize::record_malformed(parser.format_name()),
        }
        result
    }
}

/// Maps positional fields onto the record schema.
pub fn build_record(fields: Vec<Value>, home: Option<&Path>) -> Result<Record> {
    if fields.len() < MIN_RECORD_FIELDS {
        return Err(ListerError::MalformedRecord(format!(
            "expected at least {} fields, found {}",
            MIN_RECORD_FIELDS,
            fields.len()
        )));
    }
    let f = &fields;

    Ok(Record {
        asset: asset_path(&f[0], home)?,
        name: identity_name(&f[1]),
        link: f[2].to_text(),
        description: f[3].to_text().replace(NEWLINE_SENTINEL, "\n"),
        collection: f[4].to_text(),
        properties: attributes(&f[5], "properties")?,
        levels: attributes(&f[6], "levels")?,
        stats: attributes(&f[7], "stats")?,
        unlockable: unlockable(&f[8]),
        explicit_content: f[9].as_bool().unwrap_or(false),
        supply: supply(&f[10])?,
        blockchain: blockchain(&f[11]),
        listing_type: title_case(&f[12].to_text()),
        price: Price::from_value(&f[13]),
        sale_method: sale_method(&f[14]),
        duration: duration(&f[15])?,
        specific_buyer: specific_buyer(&f[16]),
        quantity: quantity(&f[17])?,
        remote_url: non_blank(&f[18]),
        sale_date: f.get(19).and_then(non_blank),
    })
}

/// Checkpoint key of a record: the name field as trimmed text. A bare `None`
/// stays the word rather than becoming empty.
pub fn identity_name(value: &Value) -> String {
    match value {
        Value::None => "None".to_string(),
        other => other.to_text().trim().to_string(),
    }
}

/// Rewrites a path recorded under another machine's home directory onto `home`.
pub fn rewrite_home(path: &str, home: Option<&Path>) -> String {
    let Some(home) = home else {
        return path.to_string();
    };
    if let Some(found) = HOME_PREFIX.find(path) {
        let rest = &path[found.end()..];
        if rest.is_empty() || rest.starts_with('/') || rest.starts_with('\\') {
            let rest: String = rest
                .chars()
                .map(|c| if c == '/' || c == '\\' { MAIN_SEPARATOR } else { c })
                .collect();
            return format!("{}{}", home.display(), rest);
        }
    }
    path.to_string()
}

fn asset_path(value: &Value, home: Option<&Path>) -> Result<AssetPath> {
    let local = |v: &Value| PathBuf::from(rewrite_home(&v.to_text(), home));
    match value {
        Value::List(items) if items.len() == 2 => Ok(AssetPath::WithPreview {
            primary: local(&items[0]),
            preview: local(&items[1]),
        }),
        Value::List(items) if items.len() == 1 => Ok(AssetPath::Single(local(&items[0]))),
        Value::List(items) => Err(ListerError::MalformedRecord(format!(
            "asset path list must hold one or two paths, found {}",
            items.len()
        ))),
        other => Ok(AssetPath::Single(local(other))),
    }
}

fn attributes(value: &Value, field: &str) -> Result<Vec<Attribute>> {
    if value.is_blank() {
        return Ok(Vec::new());
    }
    let items = value.as_list().ok_or_else(|| {
        ListerError::MalformedRecord(format!("{} must be a list, found '{}'", field, value))
    })?;

    // A single flat tuple stands for a list of one
    let tuples: Vec<&[Value]> = if items.iter().all(|i| matches!(i, Value::List(_))) {
        items.iter().filter_map(Value::as_list).collect()
    } else {
        vec![items]
    };

    tuples
        .into_iter()
        .map(|tuple| {
            if (2..=3).contains(&tuple.len()) {
                Ok(Attribute(tuple.to_vec()))
            } else {
                Err(ListerError::MalformedRecord(format!(
                    "{} entries need 2 or 3 values, found {}",
                    field,
                    tuple.len()
                )))
            }
        })
        .collect()
}

fn unlockable(value: &Value) -> UnlockableContent {
    match value.as_list() {
        Some([Value::Bool(true), text, ..]) => {
            UnlockableContent::Enabled(text.to_text().replace(NEWLINE_SENTINEL, "\n"))
        }
        _ => UnlockableContent::Disabled,
    }
}

fn specific_buyer(value: &Value) -> SpecificBuyer {
    match value.as_list() {
        Some([Value::Bool(true), address]) if !address.is_blank() => {
            SpecificBuyer::RestrictedTo(address.to_text())
        }
        _ => SpecificBuyer::Unrestricted,
    }
}

fn supply(value: &Value) -> Result<u32> {
    if value.is_blank() {
        return Ok(1);
    }
    match whole_number(value) {
        Some(n) if n >= 1 && n <= u32::MAX as i64 => Ok(n as u32),
        _ => Err(ListerError::MalformedRecord(format!(
            "supply must be a positive integer, found '{}'",
            value
        ))),
    }
}

fn quantity(value: &Value) -> Result<Option<u32>> {
    if value.is_blank() {
        return Ok(None);
    }
    match whole_number(value) {
        Some(n) if n >= 0 && n <= u32::MAX as i64 => Ok(Some(n as u32)),
        _ => Err(ListerError::MalformedRecord(format!(
            "quantity must be a non-negative integer, found '{}'",
            value
        ))),
    }
}

/// Integers, and floats with no fractional part (spreadsheets store `3` as `3.0`)
fn whole_number(value: &Value) -> Option<i64> {
    match value {
        Value::Int(n) => Some(*n),
        Value::Float(f) if f.is_finite() && f.fract() == 0.0 => Some(*f as i64),
        _ => None,
    }
}

fn blockchain(value: &Value) -> String {
    let text = value.to_text();
    let text = text.trim();
    if text.is_empty() {
        return DEFAULT_BLOCKCHAIN.to_string();
    }
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => DEFAULT_BLOCKCHAIN.to_string(),
    }
}

fn sale_method(value: &Value) -> SaleMethod {
    if value.is_blank() {
        return SaleMethod::Unset;
    }
    match value {
        Value::List(items) => SaleMethod::Method {
            name: items.first().map(Value::to_text).unwrap_or_default(),
            secondary: items.get(1).and_then(Price::from_value),
        },
        other => SaleMethod::Method {
            name: other.to_text(),
            secondary: None,
        },
    }
}

fn duration(value: &Value) -> Result<ListingDuration> {
    if value.is_blank() {
        return Ok(ListingDuration::Unset);
    }
    match value {
        Value::List(items) if items.len() == 1 => Ok(if items[0].is_blank() {
            ListingDuration::Unset
        } else {
            ListingDuration::Label(items[0].to_text())
        }),
        Value::List(items) if items.len() == 2 => Ok(ListingDuration::Range {
            start: items[0].to_text().trim().to_string(),
            end: items[1].to_text().trim().to_string(),
        }),
        Value::List(items) => Err(ListerError::MalformedRecord(format!(
            "duration must be a label or a [start, end] pair, found {} values",
            items.len()
        ))),
        other => Ok(ListingDuration::Label(other.to_text())),
    }
}

fn non_blank(value: &Value) -> Option<String> {
    if value.is_blank() {
        None
    } else {
        Some(value.to_text())
    }
}

/// Capitalises the first letter of every word, lowercasing the rest.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut previous_is_letter = false;
    for c in text.trim().chars() {
        if c.is_alphabetic() {
            if previous_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            out.push(c);
            previous_is_letter = false;
        }
    }
    out
}
