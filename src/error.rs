use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ListerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("The file extension is not supported: {0}")]
    UnsupportedFormat(String),

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Checkpoint file {path} is unusable: {source}")]
    Checkpoint {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Login failed after {attempts} attempts: {last_error}")]
    LoginExhausted { attempts: u32, last_error: String },

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),
}

pub type Result<T> = std::result::Result<T, ListerError>;

/// Failures surfaced by the browser automation layer.
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("element not found: {0}")]
    NotFound(String),

    #[error("timed out waiting for {0}")]
    Timeout(String),

    #[error("session error: {0}")]
    Session(String),

    #[error("WebDriver request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// A failure scoped to one record and one stage. The run continues past it.
#[derive(Error, Debug)]
pub enum StageError {
    #[error("{0}")]
    Validation(String),

    #[error("no remote URL recorded for this record; upload it first")]
    MissingRemoteUrl,

    #[error("{0}")]
    Driver(#[from] DriverError),

    #[error("stage did not finish within {0:?}")]
    Timeout(Duration),

    #[error("could not update source file: {0}")]
    SourceRewrite(String),
}

impl StageError {
    pub fn validation(message: impl Into<String>) -> Self {
        StageError::Validation(message.into())
    }
}
