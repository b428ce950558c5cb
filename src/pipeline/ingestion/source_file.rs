use calamine::{open_workbook_auto, Data, Reader};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::constants::STRUCTURED_RECORD_SET;
use crate::error::{ListerError, Result};

/// Source formats, selected by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// `.json` with a top-level record array
    StructuredObject,
    /// `.csv` with one header line and `;;`-separated fields
    DelimitedText,
    /// `.xlsx`, first worksheet, one header row
    Tabular,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "json" => Ok(SourceFormat::StructuredObject),
            "csv" => Ok(SourceFormat::DelimitedText),
            "xlsx" => Ok(SourceFormat::Tabular),
            _ => Err(ListerError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// One unparsed row; the variant tells the normalizer which parser applies.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRow {
    Object(serde_json::Value),
    Delimited(String),
    Tabular(Vec<String>),
}

/// All rows of a source file, in file order.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub format: SourceFormat,
    pub rows: Vec<RawRow>,
}

impl SourceFile {
    pub fn open(path: &Path) -> Result<Self> {
        let format = SourceFormat::from_path(path)?;
        let rows = match format {
            SourceFormat::StructuredObject => read_structured(path)?,
            SourceFormat::DelimitedText => read_delimited(path)?,
            SourceFormat::Tabular => read_tabular(path)?,
        };
        info!(path = %path.display(), ?format, rows = rows.len(), "Source file loaded");
        Ok(Self {
            path: path.to_path_buf(),
            format,
            rows,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn read_structured(path: &Path) -> Result<Vec<RawRow>> {
    let content = fs::read_to_string(path)?;
    let mut document: serde_json::Value = serde_json::from_str(&content)?;
    let records = match document.get_mut(STRUCTURED_RECORD_SET).map(serde_json::Value::take) {
        Some(serde_json::Value::Array(items)) => items,
        _ => {
            return Err(ListerError::MalformedRecord(format!(
                "{} has no top-level \"{}\" array",
                path.display(),
                STRUCTURED_RECORD_SET
            )))
        }
    };
    Ok(records.into_iter().map(RawRow::Object).collect())
}

/// Reads a delimited-text file. Checkpoint files share this format, so the
/// same routine serves both.
pub fn read_delimited(path: &Path) -> Result<Vec<RawRow>> {
    let content = fs::read_to_string(path)?;
    let rows: Vec<RawRow> = content
        .lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .map(|line| RawRow::Delimited(line.to_string()))
        .collect();
    debug!(path = %path.display(), rows = rows.len(), "Read delimited rows");
    Ok(rows)
}

fn read_tabular(path: &Path) -> Result<Vec<RawRow>> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| ListerError::Spreadsheet(e.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ListerError::Spreadsheet(format!("{} has no worksheet", path.display())))?
        .map_err(|e| ListerError::Spreadsheet(e.to_string()))?;

    Ok(range
        .rows()
        .skip(1)
        .filter(|row| row.iter().any(|cell| !matches!(cell, Data::Empty)))
        .map(|row| RawRow::Tabular(row.iter().map(cell_text).collect()))
        .collect())
}

/// Renders a spreadsheet cell the way it would be typed into a text row.
/// Spreadsheets store every number as a float, so whole floats become integers.
pub fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(true) => "True".to_string(),
        Data::Bool(false) => "False".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn format_follows_extension_case_insensitively() {
        assert_eq!(
            SourceFormat::from_path(Path::new("data/batch.JSON")).unwrap(),
            SourceFormat::StructuredObject
        );
        assert_eq!(
            SourceFormat::from_path(Path::new("batch_uploaded.csv")).unwrap(),
            SourceFormat::DelimitedText
        );
        assert_eq!(
            SourceFormat::from_path(Path::new("batch.xlsx")).unwrap(),
            SourceFormat::Tabular
        );
        assert!(matches!(
            SourceFormat::from_path(Path::new("batch.txt")),
            Err(ListerError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn delimited_reader_skips_header_and_blank_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("batch.csv");
        let mut file = fs::File::create(&path).unwrap();
        write!(file, "file_path;; nft_name\r\na;; one\n\n   \nb;; two").unwrap();

        let rows = read_delimited(&path).unwrap();
        assert_eq!(
            rows,
            vec![
                RawRow::Delimited("a;; one".to_string()),
                RawRow::Delimited("b;; two".to_string()),
            ]
        );
    }

    #[test]
    fn structured_source_requires_record_array() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("batch.json");
        fs::write(&path, r#"{"items": []}"#).unwrap();
        assert!(matches!(
            SourceFile::open(&path),
            Err(ListerError::MalformedRecord(_))
        ));

        fs::write(&path, r#"{"nft": [{"file_path": "a.png"}, {"file_path": "b.png"}]}"#).unwrap();
        let source = SourceFile::open(&path).unwrap();
        assert_eq!(source.len(), 2);
        assert_eq!(source.format, SourceFormat::StructuredObject);
    }

    #[test]
    fn spreadsheet_cells_render_as_typed_text() {
        assert_eq!(cell_text(&Data::Float(3.0)), "3");
        assert_eq!(cell_text(&Data::Float(0.05)), "0.05");
        assert_eq!(cell_text(&Data::Bool(false)), "False");
        assert_eq!(cell_text(&Data::Empty), "");
        assert_eq!(cell_text(&Data::String("[True, 'x']".into())), "[True, 'x']");
    }
}
