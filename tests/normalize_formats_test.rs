use asset_lister::domain::{ListingDuration, Price, Record, SpecificBuyer, UnlockableContent};
use asset_lister::error::ListerError;
use asset_lister::pipeline::ingestion::{RawRow, SourceFile};
use asset_lister::pipeline::processing::normalize::Normalizer;
use serde_json::json;
use std::fs;
use tempfile::tempdir;

const CSV_FIELDS: [&str; 19] = [
    "/srv/art/sunrise.png",
    "Sunrise",
    "https://example.com/sunrise",
    "Line one_new_line_Line two",
    "Dawn",
    "[('Background', 'Blue')]",
    "[['Speed', 3, 5]]",
    "[]",
    "[True, 'secret code']",
    "False",
    "3",
    "ethereum",
    "fixed price",
    "0.05",
    "",
    "['01-01-2030 10:00', '01-02-2030 10:00']",
    "False",
    "2",
    "",
];

fn normalizer() -> Normalizer {
    Normalizer::with_home(None)
}

fn structured_row() -> RawRow {
    RawRow::Object(json!({
        "file_path": "/srv/art/sunrise.png",
        "nft_name": "Sunrise",
        "link": "https://example.com/sunrise",
        "description": "Line one\nLine two",
        "collection": "Dawn",
        "properties": [{ "type": "Background", "name": "Blue" }],
        "levels": [{ "name": "Speed", "value": 3, "max": 5 }],
        "stats": [],
        "unlockable_content": [true, "secret code"],
        "explicit_and_sensitive_content": false,
        "supply": 3,
        "blockchain": "ethereum",
        "type": "fixed price",
        "price": 0.05,
        "method": "",
        "duration": ["01-01-2030 10:00", "01-02-2030 10:00"],
        "specific_buyer": false,
        "quantity": 2,
        "nft_url": ""
    }))
}

fn assert_expected(record: &Record) {
    assert_eq!(record.name, "Sunrise");
    assert_eq!(record.description, "Line one\nLine two");
    assert_eq!(record.properties.len(), 1);
    assert_eq!(record.properties[0].label(), "Background");
    assert_eq!(record.levels[0].max().as_deref(), Some("5"));
    assert!(record.stats.is_empty());
    assert_eq!(
        record.unlockable,
        UnlockableContent::Enabled("secret code".to_string())
    );
    assert_eq!(record.supply, 3);
    assert_eq!(record.blockchain, "Ethereum");
    assert_eq!(record.listing_type, "Fixed Price");
    assert_eq!(record.price, Some(Price::Decimal(0.05)));
    assert_eq!(
        record.duration,
        ListingDuration::Range {
            start: "01-01-2030 10:00".to_string(),
            end: "01-02-2030 10:00".to_string()
        }
    );
    assert_eq!(record.specific_buyer, SpecificBuyer::Unrestricted);
    assert_eq!(record.quantity, Some(2));
    assert_eq!(record.remote_url, None);
}

#[test]
fn every_format_yields_the_same_record() {
    let normalizer = normalizer();

    let from_json = normalizer.normalize(&structured_row()).unwrap();
    let from_csv = normalizer
        .normalize(&RawRow::Delimited(CSV_FIELDS.join(";; ")))
        .unwrap();
    let from_xlsx = normalizer
        .normalize(&RawRow::Tabular(
            CSV_FIELDS.iter().map(|f| f.to_string()).collect(),
        ))
        .unwrap();

    assert_expected(&from_json);
    assert_eq!(from_json, from_csv);
    assert_eq!(from_json, from_xlsx);
}

#[test]
fn source_files_are_read_by_extension() {
    let dir = tempdir().unwrap();

    let csv_path = dir.path().join("nfts.csv");
    fs::write(
        &csv_path,
        format!("header;; line\n{}\n\n", CSV_FIELDS.join(";; ")),
    )
    .unwrap();
    let json_path = dir.path().join("nfts.json");
    fs::write(
        &json_path,
        json!({ "nft": [structured_row_value()] }).to_string(),
    )
    .unwrap();

    let csv = SourceFile::open(&csv_path).unwrap();
    let json = SourceFile::open(&json_path).unwrap();
    assert_eq!(csv.len(), 1);
    assert_eq!(json.len(), 1);

    let normalizer = normalizer();
    assert_eq!(
        normalizer.normalize(&csv.rows[0]).unwrap(),
        normalizer.normalize(&json.rows[0]).unwrap()
    );
}

fn structured_row_value() -> serde_json::Value {
    match structured_row() {
        RawRow::Object(value) => value,
        _ => unreachable!(),
    }
}

#[test]
fn unsupported_extension_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nfts.txt");
    fs::write(&path, "anything").unwrap();
    assert!(matches!(
        SourceFile::open(&path),
        Err(ListerError::UnsupportedFormat(_))
    ));
}

#[test]
fn short_rows_are_malformed() {
    let row = RawRow::Delimited("a.png;; Sunrise;; link".to_string());
    assert!(matches!(
        normalizer().normalize(&row),
        Err(ListerError::MalformedRecord(_))
    ));
}
