/// File-format and naming constants shared by the reader, the checkpoint store
/// and the stage policy.

// Delimiter between fields of a delimited-text row
pub const FIELD_DELIMITER: &str = ";;";

// Separator written between checkpoint fields
pub const CHECKPOINT_SEPARATOR: &str = ";; ";

// Line-oriented storage cannot hold raw newlines
pub const NEWLINE_SENTINEL: &str = "_new_line_";

// Top-level array holding the records of a structured-object source
pub const STRUCTURED_RECORD_SET: &str = "nft";

// Checkpoint file suffixes, appended to the source base name
pub const UPLOADED_SUFFIX: &str = "uploaded";
pub const VERIFIED_SUFFIX: &str = "verified";
pub const SALE_SUFFIX: &str = "sale";

pub const CHECKPOINT_EXTENSION: &str = "csv";

/// `DD-MM-YYYY HH:MM`, used for duration ranges and sale timestamps
pub const DATE_FORMAT: &str = "%d-%m-%Y %H:%M";

/// Longest accepted listing window, in minutes (roughly six months)
pub const MAX_DURATION_MINUTES: i64 = 262_146;

pub const DEFAULT_BLOCKCHAIN: &str = "Ethereum";

/// Positional column names of a record. Index 18 is the remote URL.
pub const RECORD_COLUMNS: [&str; 19] = [
    "file_path",
    "nft_name",
    "link",
    "description",
    "collection",
    "properties",
    "levels",
    "stats",
    "unlockable_content",
    "explicit_and_sensitive_content",
    "supply",
    "blockchain",
    "type",
    "price",
    "method",
    "duration",
    "specific_buyer",
    "quantity",
    "nft_url",
];

pub const SALE_DATE_COLUMN: &str = "sale_date";

/// Minimum number of positional fields in a row
pub const MIN_RECORD_FIELDS: usize = RECORD_COLUMNS.len();

pub const SUPPORTED_ASSET_EXTENSIONS: [&str; 12] = [
    "jpg", "jpeg", "png", "gif", "svg", "mp4", "webm", "mp3", "wav", "ogg", "glb", "gltf",
];

/// Asset types that need a separate preview image
pub const PREVIEW_REQUIRED_EXTENSIONS: [&str; 7] = ["mp4", "webm", "mp3", "wav", "ogg", "glb", "gltf"];
