use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::fmt;

use crate::domain::Record;
use crate::error::{DriverError, StageError};

pub type DriverResult<T> = std::result::Result<T, DriverError>;
pub type StageResult<T> = std::result::Result<T, StageError>;

/// Reference to a located page element
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Element {
    pub id: String,
}

/// Low-level browser automation. Selectors are XPath expressions.
///
/// Every wait is bounded; an element that never shows up is
/// `DriverError::NotFound` or `DriverError::Timeout`, never a hang.
#[async_trait]
pub trait AutomationDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> DriverResult<()>;
    async fn refresh(&self) -> DriverResult<()>;
    async fn click(&self, selector: &str) -> DriverResult<()>;
    async fn wait_visible(&self, selector: &str) -> DriverResult<Element>;
    async fn send_keys(&self, selector: &str, text: &str) -> DriverResult<()>;
    /// Types a `DD-MM-YYYY` date, or a bare time, into a date picker input
    async fn send_date(&self, selector: &str, literal: &str) -> DriverResult<()>;
    async fn switch_to_window(&self, index: usize) -> DriverResult<()>;
    async fn current_url(&self) -> DriverResult<String>;
    async fn element_text(&self, selector: &str) -> DriverResult<String>;
    async fn element_attribute(&self, selector: &str, name: &str) -> DriverResult<Option<String>>;
    async fn window_count(&self) -> DriverResult<usize>;
    async fn quit(&self) -> DriverResult<()>;
}

/// Outcome of checking an existing listing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaleStatus {
    StillListed,
    /// The listing window closed; the record can be listed again
    Ended,
}

/// Stage-level marketplace operations, one per workflow stage.
#[async_trait]
pub trait Marketplace: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> DriverResult<()>;
    /// Creates the item and returns its remote URL
    async fn upload(&self, record: &Record) -> StageResult<String>;
    /// Whether the item behind the record's remote URL exists
    async fn verify_upload(&self, record: &Record) -> StageResult<bool>;
    async fn list_for_sale(&self, record: &Record) -> StageResult<()>;
    async fn check_sale(&self, record: &Record) -> StageResult<SaleStatus>;
    async fn remove(&self, record: &Record) -> StageResult<()>;
    async fn shutdown(&self) -> DriverResult<()>;
}

/// Source of "now" for date validation and sale timestamps
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// Wallet credentials, already resolved
#[derive(Clone)]
pub struct Credentials {
    pub password: String,
    pub recovery_phrase: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("password", &"<redacted>")
            .field("recovery_phrase", &"<redacted>")
            .finish()
    }
}
