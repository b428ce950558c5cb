//! Per-stage record checks run before any marketplace call.

use chrono::{NaiveDateTime, Timelike};
use std::fs;
use std::path::Path;

use crate::config::WorkflowConfig;
use crate::constants::{
    DATE_FORMAT, DEFAULT_BLOCKCHAIN, MAX_DURATION_MINUTES, PREVIEW_REQUIRED_EXTENSIONS,
    SUPPORTED_ASSET_EXTENSIONS,
};
use crate::domain::{ListingDuration, Record, SaleMethod, SaleMethodKind};
use crate::error::StageError;

type Check = std::result::Result<(), StageError>;

pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text.trim(), DATE_FORMAT).ok()
}

pub fn validate_upload(record: &Record, config: &WorkflowConfig) -> Check {
    if record.name.trim().is_empty() {
        return Err(StageError::validation("the NFT name is missing"));
    }

    let primary = record.asset.primary();
    let extension = check_asset_file(primary, config.max_asset_megabytes)?;
    if PREVIEW_REQUIRED_EXTENSIONS.contains(&extension.as_str()) {
        let preview = record.asset.preview().ok_or_else(|| {
            StageError::validation(format!(
                "a .{} asset needs a preview image: give the path as [file, preview]",
                extension
            ))
        })?;
        check_asset_file(preview, config.max_asset_megabytes)?;
    }
    Ok(())
}

/// Returns the lowercased extension of a usable asset file.
fn check_asset_file(path: &Path, max_megabytes: u64) -> Result<String, StageError> {
    let metadata = fs::metadata(path).map_err(|_| {
        StageError::validation(format!("asset file not found: {}", path.display()))
    })?;
    if !metadata.is_file() {
        return Err(StageError::validation(format!(
            "asset path is not a file: {}",
            path.display()
        )));
    }
    let megabytes = metadata.len() as f64 / (1024.0 * 1024.0);
    if megabytes > max_megabytes as f64 {
        return Err(StageError::validation(format!(
            "{} is {:.1} MB, the limit is {} MB",
            path.display(),
            megabytes,
            max_megabytes
        )));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    if !SUPPORTED_ASSET_EXTENSIONS.contains(&extension.as_str()) {
        return Err(StageError::validation(format!(
            "unsupported asset type '.{}' for {}",
            extension,
            path.display()
        )));
    }
    Ok(extension)
}

/// Every stage after upload works on the remote asset page.
pub fn require_remote_url(record: &Record) -> Result<&str, StageError> {
    record.remote_url().ok_or(StageError::MissingRemoteUrl)
}

pub fn validate_sale(record: &Record, now: NaiveDateTime, config: &WorkflowConfig) -> Check {
    require_remote_url(record)?;

    let price = match record.price {
        Some(price) if price.as_f64() > 0.0 => price,
        Some(price) => {
            return Err(StageError::validation(format!(
                "price must be greater than 0, got {}",
                price
            )))
        }
        None => {
            return Err(StageError::validation(
                "price must be an integer or a decimal number",
            ))
        }
    };

    if let Some(quantity) = record.quantity {
        if quantity > record.supply {
            return Err(StageError::validation(format!(
                "quantity {} exceeds the supply of {}",
                quantity, record.supply
            )));
        }
    }

    if !config
        .known_blockchains
        .iter()
        .any(|known| known == &record.blockchain)
    {
        return Err(StageError::validation(format!(
            "unknown blockchain '{}', expected one of: {}",
            record.blockchain,
            config.known_blockchains.join(", ")
        )));
    }

    if record.is_timed_auction() {
        validate_auction(record, price.as_f64())?;
    }

    validate_duration(&record.duration, now)
}

fn validate_auction(record: &Record, price: f64) -> Check {
    if record.supply != 1 || record.blockchain != DEFAULT_BLOCKCHAIN {
        return Err(StageError::validation(format!(
            "a timed auction needs a supply of 1 on {}",
            DEFAULT_BLOCKCHAIN
        )));
    }

    let SaleMethod::Method { secondary, .. } = &record.sale_method else {
        return Err(StageError::validation("a timed auction needs a sale method"));
    };
    let kind = record.sale_method.kind();
    if kind == Some(SaleMethodKind::Other) {
        return Err(StageError::validation("unknown method for a timed auction"));
    }
    let secondary = secondary
        .map(|p| p.as_f64())
        .ok_or_else(|| StageError::validation("the method price must be a number"))?;

    match kind {
        Some(SaleMethodKind::DecliningPrice) if secondary >= price => {
            Err(StageError::validation(
                "the ending price must be lower than the starting price",
            ))
        }
        Some(SaleMethodKind::HighestBidder) if secondary <= 1.0 || secondary < price => {
            Err(StageError::validation(
                "the reserve price must be higher than 1 and not lower than the price",
            ))
        }
        _ => Ok(()),
    }
}

fn validate_duration(duration: &ListingDuration, now: NaiveDateTime) -> Check {
    match duration {
        ListingDuration::Unset => Err(StageError::validation("duration must be specified")),
        ListingDuration::Label(label) if label.trim().is_empty() => {
            Err(StageError::validation("duration must be specified"))
        }
        ListingDuration::Label(_) => Ok(()),
        ListingDuration::Range { start, end } => {
            let parse = |text: &str| {
                parse_timestamp(text).ok_or_else(|| {
                    StageError::validation(format!(
                        "'{}' is not a DD-MM-YYYY HH:MM timestamp",
                        text
                    ))
                })
            };
            let (start, end) = (parse(start)?, parse(end)?);
            let minutes = (end - start).num_minutes();
            if minutes <= 0 {
                return Err(StageError::validation("the listing must end after it starts"));
            }
            if minutes > MAX_DURATION_MINUTES {
                return Err(StageError::validation(
                    "the listing duration must not exceed 6 months",
                ));
            }
            // Compared at minute precision
            let now = now.with_second(0).and_then(|t| t.with_nanosecond(0)).unwrap_or(now);
            if start < now {
                return Err(StageError::validation("the listing cannot start in the past"));
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AssetPath, Price, SpecificBuyer, UnlockableContent};
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn now() -> NaiveDateTime {
        parse_timestamp("01-01-2024 09:00").unwrap()
    }

    fn listed_record() -> Record {
        Record {
            asset: AssetPath::Single(PathBuf::from("art/one.png")),
            name: "One".to_string(),
            link: String::new(),
            description: String::new(),
            collection: String::new(),
            properties: Vec::new(),
            levels: Vec::new(),
            stats: Vec::new(),
            unlockable: UnlockableContent::Disabled,
            explicit_content: false,
            supply: 3,
            blockchain: "Ethereum".to_string(),
            listing_type: "Fixed Price".to_string(),
            price: Some(Price::Decimal(0.5)),
            sale_method: SaleMethod::Unset,
            duration: ListingDuration::Label("1 week".to_string()),
            specific_buyer: SpecificBuyer::Unrestricted,
            quantity: Some(3),
            remote_url: Some("https://opensea.io/assets/ethereum/0x1/1".to_string()),
            sale_date: None,
        }
    }

    fn range(start: &str, end: &str) -> ListingDuration {
        ListingDuration::Range {
            start: start.to_string(),
            end: end.to_string(),
        }
    }

    #[test]
    fn duration_window_is_capped_at_six_months() {
        let config = WorkflowConfig::default();
        let mut record = listed_record();

        record.duration = range("01-01-2024 10:00", "01-08-2024 10:00");
        assert!(validate_sale(&record, now(), &config).is_err());

        record.duration = range("01-01-2024 10:00", "01-03-2024 10:00");
        assert!(validate_sale(&record, now(), &config).is_ok());
    }

    #[test]
    fn duration_cannot_start_in_the_past() {
        let mut record = listed_record();
        record.duration = range("01-01-2024 08:59", "02-01-2024 08:59");
        assert!(validate_sale(&record, now(), &WorkflowConfig::default()).is_err());

        record.duration = range("01-01-2024 09:00", "02-01-2024 09:00");
        assert!(validate_sale(&record, now(), &WorkflowConfig::default()).is_ok());
    }

    #[test]
    fn unset_duration_is_rejected() {
        let mut record = listed_record();
        record.duration = ListingDuration::Unset;
        assert!(validate_sale(&record, now(), &WorkflowConfig::default()).is_err());
    }

    #[test]
    fn quantity_cannot_exceed_supply() {
        let config = WorkflowConfig::default();
        let mut record = listed_record();

        record.quantity = Some(5);
        assert!(validate_sale(&record, now(), &config).is_err());

        record.quantity = Some(3);
        assert!(validate_sale(&record, now(), &config).is_ok());
    }

    #[test]
    fn price_must_be_present_and_positive() {
        let config = WorkflowConfig::default();
        let mut record = listed_record();

        record.price = None;
        assert!(validate_sale(&record, now(), &config).is_err());

        record.price = Some(Price::Int(0));
        assert!(validate_sale(&record, now(), &config).is_err());
    }

    #[test]
    fn blockchain_must_be_known() {
        let mut record = listed_record();
        record.blockchain = "Solana".to_string();
        let err = validate_sale(&record, now(), &WorkflowConfig::default()).unwrap_err();
        assert!(err.to_string().contains("Solana"));
    }

    #[test]
    fn sale_without_remote_url_is_refused() {
        let mut record = listed_record();
        record.remote_url = None;
        assert!(matches!(
            validate_sale(&record, now(), &WorkflowConfig::default()),
            Err(StageError::MissingRemoteUrl)
        ));
    }

    #[test]
    fn auction_methods_check_their_secondary_price() {
        let config = WorkflowConfig::default();
        let mut record = listed_record();
        record.supply = 1;
        record.quantity = None;
        record.listing_type = "Timed Auction".to_string();
        record.price = Some(Price::Int(2));

        record.sale_method = SaleMethod::Method {
            name: "Sell with declining price".to_string(),
            secondary: Some(Price::Int(1)),
        };
        assert!(validate_sale(&record, now(), &config).is_ok());

        record.sale_method = SaleMethod::Method {
            name: "Sell with declining price".to_string(),
            secondary: Some(Price::Int(3)),
        };
        assert!(validate_sale(&record, now(), &config).is_err());

        record.sale_method = SaleMethod::Method {
            name: "Sell to highest bidder".to_string(),
            secondary: Some(Price::Int(3)),
        };
        assert!(validate_sale(&record, now(), &config).is_ok());

        record.sale_method = SaleMethod::Method {
            name: "Sell to highest bidder".to_string(),
            secondary: Some(Price::Decimal(1.0)),
        };
        assert!(validate_sale(&record, now(), &config).is_err());

        record.sale_method = SaleMethod::Method {
            name: "Dutch".to_string(),
            secondary: Some(Price::Int(1)),
        };
        assert!(validate_sale(&record, now(), &config).is_err());

        record.blockchain = "Polygon".to_string();
        record.sale_method = SaleMethod::Method {
            name: "Sell to highest bidder".to_string(),
            secondary: Some(Price::Int(3)),
        };
        assert!(validate_sale(&record, now(), &config).is_err());
    }

    #[test]
    fn upload_checks_the_asset_file() {
        let dir = tempdir().unwrap();
        let config = WorkflowConfig::default();
        let mut record = listed_record();

        record.asset = AssetPath::Single(dir.path().join("missing.png"));
        assert!(validate_upload(&record, &config).is_err());

        let image = dir.path().join("one.png");
        fs::write(&image, b"png").unwrap();
        record.asset = AssetPath::Single(image.clone());
        assert!(validate_upload(&record, &config).is_ok());

        record.name = " ".to_string();
        assert!(validate_upload(&record, &config).is_err());
    }

    #[test]
    fn media_assets_need_a_preview() {
        let dir = tempdir().unwrap();
        let config = WorkflowConfig::default();
        let video = dir.path().join("clip.mp4");
        let preview = dir.path().join("clip.png");
        fs::write(&video, b"mp4").unwrap();
        fs::write(&preview, b"png").unwrap();
        let mut record = listed_record();

        record.asset = AssetPath::Single(video.clone());
        assert!(validate_upload(&record, &config).is_err());

        record.asset = AssetPath::WithPreview {
            primary: video,
            preview,
        };
        assert!(validate_upload(&record, &config).is_ok());
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let dir = tempdir().unwrap();
        let doc = dir.path().join("notes.txt");
        fs::write(&doc, b"text").unwrap();
        let mut record = listed_record();
        record.asset = AssetPath::Single(doc);
        assert!(validate_upload(&record, &WorkflowConfig::default()).is_err());
    }
}
