use anyhow::Result;
use std::fs;
use tempfile::tempdir;

use asset_lister::pipeline::checkpoint::{codec, CheckpointStore};
use asset_lister::pipeline::ingestion::{source_file::read_delimited, RawRow};
use asset_lister::pipeline::processing::normalize::Normalizer;
use asset_lister::pipeline::{ActionSet, Stage, StagePlan};

const LINE: &str = "/srv/art/one.png;; One;; https://example.com;; First line_new_line_second line;; \
Dawn;; [['Background', 'Blue'], ['Eyes', 'Green']];; [['Speed', 3, 5]];; [];; [True, 'code'];; \
False;; 2;; polygon;; timed auction;; 1.5;; ['Sell with declining price', 0.5];; \
['01-02-2024 10:00', '01-03-2024 10:00'];; [True, '0xbuyer'];; 1;; ";

fn normalizer() -> Normalizer {
    Normalizer::with_home(None)
}

#[test]
fn checkpoint_lines_read_back_as_the_same_record() -> Result<()> {
    let dir = tempdir()?;
    let source = dir.path().join("nfts.csv");
    fs::write(&source, "header\n")?;
    let plan = StagePlan::resolve(ActionSet::new([Stage::Upload, Stage::Sell])?, &source)?;

    let mut record = normalizer().normalize(&RawRow::Delimited(LINE.to_string()))?;
    assert_eq!(record.description, "First line\nsecond line");
    record.remote_url = Some("https://opensea.io/assets/polygon/0x1/7".to_string());

    let mut store = CheckpointStore::open(&plan)?;
    store.record_completion(Stage::Upload, &record)?;
    record.sale_date = Some("01-01-2024 09:00".to_string());
    store.record_completion(Stage::Sell, &record)?;

    let uploaded = dir.path().join("nfts_uploaded.csv");
    let content = fs::read_to_string(&uploaded)?;
    // One header and one entry, newline escaped inside the entry
    assert_eq!(content.lines().count(), 2);
    assert!(content.contains("First line_new_line_second line"));

    let rows = read_delimited(&uploaded)?;
    let mut reread = normalizer().normalize(&rows[0])?;
    reread.sale_date = record.sale_date.clone();
    assert_eq!(reread, record);

    let sold = read_delimited(&dir.path().join("nfts_sale.csv"))?;
    assert_eq!(normalizer().normalize(&sold[0])?, record);
    Ok(())
}

#[test]
fn reopening_restores_completed_names_and_projections() -> Result<()> {
    let dir = tempdir()?;
    let source = dir.path().join("nfts.csv");
    fs::write(&source, "header\n")?;
    let plan = StagePlan::resolve(ActionSet::new([Stage::Upload])?, &source)?;

    let mut record = normalizer().normalize(&RawRow::Delimited(LINE.to_string()))?;
    record.remote_url = Some("https://opensea.io/assets/polygon/0x1/7".to_string());
    {
        let mut store = CheckpointStore::open(&plan)?;
        assert!(!store.has_completed(Stage::Upload, "One"));
        store.record_completion(Stage::Upload, &record)?;
    }

    let store = CheckpointStore::open(&plan)?;
    assert!(store.has_completed(Stage::Upload, "One"));
    assert!(!store.has_completed(Stage::Sell, "One"));
    assert_eq!(store.completed_count(Stage::Upload), Some(1));

    let projection = store.projection(Stage::Upload, "One").unwrap();
    assert_eq!(
        projection.remote_url.as_deref(),
        Some("https://opensea.io/assets/polygon/0x1/7")
    );
    assert_eq!(projection.supply, Some(2));
    assert_eq!(projection.blockchain.as_deref(), Some("Polygon"));

    // Reopening writes no second header
    let content = fs::read_to_string(dir.path().join("nfts_uploaded.csv"))?;
    assert_eq!(
        content
            .lines()
            .filter(|l| *l == codec::header(Stage::Upload))
            .count(),
        1
    );
    Ok(())
}

#[test]
fn append_repairs_a_missing_trailing_newline() -> Result<()> {
    let dir = tempdir()?;
    let source = dir.path().join("nfts.csv");
    fs::write(&source, "header\n")?;
    let checkpoint = dir.path().join("nfts_uploaded.csv");
    // Left behind by an interrupted writer
    fs::write(
        &checkpoint,
        format!("{}\n{}", codec::header(Stage::Upload), LINE.replace("One", "Zero")),
    )?;

    let plan = StagePlan::resolve(ActionSet::new([Stage::Upload])?, &source)?;
    let mut store = CheckpointStore::open(&plan)?;
    assert!(store.has_completed(Stage::Upload, "Zero"));

    let record = normalizer().normalize(&RawRow::Delimited(LINE.to_string()))?;
    store.record_completion(Stage::Upload, &record)?;

    let names: Vec<String> = read_delimited(&checkpoint)?
        .iter()
        .map(|row| normalizer().normalize(row).map(|r| r.name))
        .collect::<std::result::Result<_, _>>()?;
    assert_eq!(names, vec!["Zero", "One"]);
    Ok(())
}

#[test]
fn status_reports_progress_without_creating_files() -> Result<()> {
    let dir = tempdir()?;
    let source = dir.path().join("batch_verified.csv");
    fs::write(&source, "header\n")?;
    fs::write(
        dir.path().join("batch_uploaded.csv"),
        format!("{}\n{}\n\n", codec::header(Stage::Upload), LINE),
    )?;

    let plan = StagePlan::inspect(&source)?;
    let status = CheckpointStore::status(&plan)?;

    assert_eq!(status.len(), 3);
    let upload = status.iter().find(|s| s.stage == Stage::Upload).unwrap();
    assert!(upload.exists);
    assert_eq!(upload.completed, 1);
    let sell = status.iter().find(|s| s.stage == Stage::Sell).unwrap();
    assert!(!sell.exists);
    assert_eq!(sell.completed, 0);
    assert!(!dir.path().join("batch_sale.csv").exists());
    Ok(())
}
