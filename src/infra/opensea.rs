//! OpenSea stage flows expressed as browser steps.
//!
//! The selectors follow the marketplace's markup at the time of writing and
//! are the first thing to check when a stage starts failing everywhere.

use async_trait::async_trait;
use clap::ValueEnum;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::app::ports::{
    AutomationDriver, Credentials, DriverResult, Marketplace, SaleStatus, StageResult,
};
use crate::config::{DriverConfig, MarketplaceConfig};
use crate::domain::{
    Attribute, ListingDuration, Record, SaleMethod, SaleMethodKind, SpecificBuyer,
    UnlockableContent,
};
use crate::error::{DriverError, StageError};
use crate::infra::webdriver::keys;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Wallet {
    Coinbase,
    #[value(name = "metamask")]
    MetaMask,
}

impl Wallet {
    /// Prefix of the credential files in the assets directory
    pub fn file_prefix(&self) -> &'static str {
        match self {
            Wallet::Coinbase => "coin",
            Wallet::MetaMask => "meta",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Wallet::Coinbase => "Coinbase",
            Wallet::MetaMask => "MetaMask",
        }
    }

    /// Browser extension bundle for this wallet
    pub fn extension_path(&self, assets_dir: &Path) -> PathBuf {
        assets_dir.join(format!("{}.crx", self.display_name()))
    }
}

// Browser tabs: the wallet extension opens first, the marketplace second,
// and wallet pop-ups after that
const EXTENSION_TAB: usize = 0;
const MARKETPLACE_TAB: usize = 1;
const POPUP_TAB: usize = 2;

pub struct OpenSeaMarketplace<D: AutomationDriver> {
    driver: D,
    wallet: Wallet,
    base_url: String,
    completion_timeout: Duration,
    poll_interval: Duration,
}

impl<D: AutomationDriver> OpenSeaMarketplace<D> {
    pub fn new(
        driver: D,
        wallet: Wallet,
        marketplace: &MarketplaceConfig,
        driver_config: &DriverConfig,
    ) -> Self {
        Self {
            driver,
            wallet,
            base_url: marketplace.base_url.trim_end_matches('/').to_string(),
            completion_timeout: driver_config.completion_timeout(),
            poll_interval: driver_config.poll_interval(),
        }
    }

    fn create_url(&self) -> String {
        format!("{}/asset/create", self.base_url)
    }

    fn login_url(&self) -> String {
        format!("{}/login?referrer=%2Fasset%2Fcreate", self.base_url)
    }

    // ---- wallet ---------------------------------------------------------

    async fn wallet_login(&self, credentials: &Credentials) -> DriverResult<()> {
        let d = &self.driver;
        d.switch_to_window(EXTENSION_TAB).await?;
        // The extension tab is often blank until reloaded
        d.refresh().await?;
        match self.wallet {
            Wallet::Coinbase => {
                d.click(r#"//*[@data-testid="btn-import-existing-wallet"]"#).await?;
                d.click(r#"//*[@data-testid="btn-import-recovery-phrase"]"#).await?;
                d.send_keys(r#"//*[@data-testid="seed-phrase-input"]"#, &credentials.recovery_phrase)
                    .await?;
                d.click(r#"//*[@data-testid="btn-import-wallet"]"#).await?;
                d.send_keys(r#"//*[@data-testid="setPassword"]"#, &credentials.password).await?;
                d.send_keys(r#"//*[@data-testid="setPasswordVerify"]"#, &credentials.password)
                    .await?;
                d.click(r#"//*[@data-testid="terms-and-privacy-policy-parent"]"#).await?;
                d.click(r#"//*[@data-testid="btn-password-continue"]"#).await?;
            }
            Wallet::MetaMask => {
                d.click(r#"//*[@class="welcome-page"]/button"#).await?;
                d.click(r#"//*[contains(@class, "btn-primary")][position()=1]"#).await?;
                d.click("//footer/button[2]").await?;
                d.send_keys("//input[position()=1]", &credentials.recovery_phrase).await?;
                d.send_keys(r#"//*[@id="password"]"#, &credentials.password).await?;
                d.send_keys(r#"//*[@id="confirm-password"]"#, &credentials.password).await?;
                d.click(r#"(//*[@role="checkbox"])[2]"#).await?;
                d.click(r#"//*[contains(@class, "btn-primary")][position()=1]"#).await?;
                d.wait_visible(r#"//*[contains(@class, "emoji")][position()=1]"#).await?;
                d.click(r#"//*[contains(@class, "btn-primary")][position()=1]"#).await?;
            }
        }
        info!(wallet = self.wallet.display_name(), "Wallet unlocked");
        Ok(())
    }

    async fn connect_wallet(&self) -> DriverResult<()> {
        let d = &self.driver;
        match self.wallet {
            Wallet::Coinbase => {
                d.click(r#"//*[contains(text(), "Coinbase Wallet")]/../.."#).await?;
                d.switch_to_window(POPUP_TAB).await?;
                d.click(r#"//*[@data-testid="allow-authorize-button"]"#).await?;
                d.switch_to_window(POPUP_TAB + 1).await?;
                d.click(r#"//*[@data-testid="sign-message"]"#).await?;
            }
            Wallet::MetaMask => {
                d.click(r#"//*[contains(text(), "MetaMask")]/../.."#).await?;
                d.switch_to_window(POPUP_TAB).await?;
                d.click(r#"//*[@class="button btn-primary"]"#).await?;
                d.click(r#"//*[contains(@class, "button btn-primary")]"#).await?;
                d.switch_to_window(POPUP_TAB).await?;
                self.sign_contract(None).await?;
            }
        }
        Ok(())
    }

    /// Signs the pending wallet request and returns to the marketplace tab.
    async fn sign_contract(&self, blockchain: Option<&str>) -> DriverResult<()> {
        let d = &self.driver;
        match self.wallet {
            Wallet::Coinbase => {
                d.switch_to_window(POPUP_TAB).await?;
                d.click(r#"//*[@data-testid="sign-message"]"#).await?;
            }
            Wallet::MetaMask => {
                if blockchain == Some("Polygon") {
                    d.click(r#"//div[@data-testid="Panel"][last()]/div/div/div/div/button"#)
                        .await?;
                }
                d.switch_to_window(POPUP_TAB).await?;
                d.click(r#"//*[contains(@class, "button btn-secondary")]"#).await?;
            }
        }
        // The pop-up closes itself once the signature is accepted
        self.wait_for_popup_to_close(Duration::from_secs(10)).await?;
        d.switch_to_window(MARKETPLACE_TAB).await
    }

    // ---- helpers --------------------------------------------------------

    /// Polls the current URL until `accept` holds for it.
    async fn wait_for_url(
        &self,
        what: &str,
        timeout: Duration,
        accept: impl Fn(&str) -> bool + Send + Sync,
    ) -> DriverResult<String> {
        let deadline = Instant::now() + timeout;
        loop {
            let url = self.driver.current_url().await?;
            if accept(&url) {
                return Ok(url);
            }
            if Instant::now() >= deadline {
                return Err(DriverError::Timeout(what.to_string()));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn wait_for_popup_to_close(&self, timeout: Duration) -> DriverResult<()> {
        let deadline = Instant::now() + timeout;
        while self.driver.window_count().await? > POPUP_TAB {
            if Instant::now() >= deadline {
                return Err(DriverError::Timeout("wallet pop-up to close".to_string()));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
        Ok(())
    }

    /// Types `text` into `selector` when there is something to type.
    async fn fill(&self, selector: &str, text: &str) -> DriverResult<bool> {
        if text.trim().is_empty() {
            return Ok(false);
        }
        self.driver.send_keys(selector, text).await?;
        Ok(true)
    }

    async fn replace_text(&self, selector: &str, text: &str) -> DriverResult<()> {
        self.driver.click(selector).await?;
        self.driver.send_keys(selector, &keys::select_all()).await?;
        self.driver.send_keys(selector, text).await
    }

    async fn fill_attributes(&self, section: usize, attributes: &[Attribute]) -> DriverResult<()> {
        if attributes.is_empty() {
            return Ok(());
        }
        let d = &self.driver;
        d.click(&format!("//form/section/div[{}]/div/div[2]/button", section + 1))
            .await?;
        for (i, attribute) in attributes.iter().enumerate() {
            let row = i + 1;
            if i > 0 {
                d.click(r#"//div[@role="dialog"]/section/button"#).await?;
            }
            let cell = |column: usize| {
                format!(
                    "/html/body/div[{}]/div/div/div/section/table/tbody/tr[{}]/td[{}]/div/div/input",
                    section + 2,
                    row,
                    column
                )
            };
            d.send_keys(&cell(1), &attribute.label()).await?;
            if let Some(max) = attribute.max() {
                self.replace_text(&cell(3), &max).await?;
            }
            self.replace_text(&cell(2), &attribute.value()).await?;
        }
        d.click("//footer/button").await
    }

    async fn check_for_captcha(&self) {
        if self
            .driver
            .wait_visible(r#"//h4[contains(text(), "Almost done")]"#)
            .await
            .is_ok()
        {
            warn!("Captcha shown, waiting for the operator to solve it");
            println!("   ⚠️  Captcha found, solve it in the browser window");
        }
    }

    async fn remote_page(&self, record: &Record) -> StageResult<String> {
        let url = record
            .remote_url()
            .ok_or(StageError::MissingRemoteUrl)?
            .to_string();
        self.driver.navigate(&url).await?;
        Ok(url)
    }

    async fn is_visible(&self, selector: &str) -> DriverResult<bool> {
        match self.driver.wait_visible(selector).await {
            Ok(_) => Ok(true),
            Err(DriverError::NotFound(_)) | Err(DriverError::Timeout(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    // ---- sale form ------------------------------------------------------

    async fn fill_auction(&self, record: &Record) -> StageResult<()> {
        let d = &self.driver;
        d.click(r#"//i[@value="timelapse"]/../.."#).await?;
        let SaleMethod::Method { secondary: Some(secondary), .. } = &record.sale_method else {
            return Ok(());
        };
        match record.sale_method.kind() {
            Some(SaleMethodKind::DecliningPrice) => {
                d.click(r#"//*[@id="main"]/div/div/div[3]/div/div[2]/div/div[1]/form/div[2]/div/div[2]"#)
                    .await?;
                d.click(r#"//*[@role="tooltip"]/div/div/ul/li/button"#).await?;
                d.send_keys(r#"//*[@name="endingPrice"]"#, &secondary.form_value())
                    .await?;
            }
            Some(SaleMethodKind::HighestBidder) => {
                d.click(r#"//button[contains(@class, "more-options")]"#).await?;
                d.send_keys(r#"//*[@role="switch"]"#, keys::ENTER).await?;
                d.send_keys(r#"//*[@name="reservePrice"]"#, &secondary.form_value())
                    .await?;
            }
            _ => return Err(StageError::validation("unknown method for a timed auction")),
        }
        Ok(())
    }

    async fn fill_duration(&self, duration: &ListingDuration) -> StageResult<()> {
        let d = &self.driver;
        match duration {
            ListingDuration::Range { start, end } => {
                let split = |stamp: &str| -> StageResult<(String, String)> {
                    stamp
                        .split_once(' ')
                        .map(|(date, time)| (date.to_string(), time.to_string()))
                        .ok_or_else(|| StageError::validation(format!("'{}' has no time part", stamp)))
                };
                let (start_date, start_time) = split(start)?;
                let (end_date, end_time) = split(end)?;
                d.click(r#"//*[@id="duration"]"#).await?;
                d.wait_visible(r#"//*[@role="dialog"]"#).await?;
                d.send_date(r#"//*[@role="dialog"]/div[2]/div[2]/div/div[2]/input"#, &end_date)
                    .await?;
                d.send_date(r#"//*[@role="dialog"]/div[2]/div[1]/div/div[2]/input"#, &start_date)
                    .await?;
                d.send_date(r#"//*[@id="end-time"]"#, &end_time).await?;
                d.send_date(r#"//*[@id="start-time"]"#, &format!("{}{}", start_time, keys::ENTER))
                    .await?;
            }
            ListingDuration::Label(label) => {
                let current = d.element_text(r#"//*[@id="duration"]/div[2]"#).await?;
                if current.trim() != label.trim() {
                    d.click(r#"//*[@id="duration"]"#).await?;
                    d.click(r#"//*[@role="dialog"]/div[1]/div/div[2]/input"#).await?;
                    d.click(&format!(r#"//span[contains(text(), "{}")]/../.."#, label))
                        .await?;
                    d.send_keys(r#"//*[@role="dialog"]"#, keys::ENTER).await?;
                }
            }
            ListingDuration::Unset => {
                return Err(StageError::validation("duration must be specified"))
            }
        }
        Ok(())
    }
}

#[async_trait]
impl<D: AutomationDriver> Marketplace for OpenSeaMarketplace<D> {
    async fn login(&self, credentials: &Credentials) -> DriverResult<()> {
        self.wallet_login(credentials).await?;

        let d = &self.driver;
        d.switch_to_window(MARKETPLACE_TAB).await?;
        d.navigate(&self.login_url()).await?;
        d.click(r#"//button[contains(@class, "show-more")]"#).await?;
        self.connect_wallet().await?;
        d.switch_to_window(MARKETPLACE_TAB).await?;

        let create_url = self.create_url();
        let on_create_page = |url: &str| url == create_url;
        let landed = self
            .wait_for_url("marketplace login", Duration::from_secs(15), on_create_page)
            .await;
        if landed.is_err() {
            // The signature request sometimes arrives late
            debug!("Login not confirmed yet, signing the pending request");
            self.sign_contract(None).await?;
            self.wait_for_url("marketplace login", Duration::from_secs(15), on_create_page)
                .await?;
        }
        info!("Logged in to OpenSea");
        Ok(())
    }

    async fn upload(&self, record: &Record) -> StageResult<String> {
        let d = &self.driver;
        let form_url = format!("{}?enable_supply=true", self.create_url());
        d.navigate(&form_url).await?;

        let primary = absolute(record.asset.primary());
        d.send_keys(r#"//*[@id="media"]"#, &primary).await?;
        if let Some(preview) = record.asset.preview() {
            d.send_keys(r#"//input[@name="preview"]"#, &absolute(preview)).await?;
        }

        if !self.fill(r#"//*[@id="name"]"#, &record.name).await? {
            return Err(StageError::validation("the NFT name is missing"));
        }
        self.fill(r#"//*[@id="external_link"]"#, &record.link).await?;
        self.fill(r#"//*[@id="description"]"#, &record.description).await?;

        if self.fill("//form/div[5]/div/div[2]/input", &record.collection).await? {
            let option = format!(r#"//span[contains(text(), "{}")]/../.."#, record.collection);
            d.click(&option).await.map_err(|_| {
                StageError::validation(format!("collection '{}' cannot be found", record.collection))
            })?;
        }

        for (section, attributes) in [&record.properties, &record.levels, &record.stats]
            .into_iter()
            .enumerate()
        {
            self.fill_attributes(section, attributes).await?;
        }

        if let UnlockableContent::Enabled(text) = &record.unlockable {
            d.send_keys(r#"//*[@id="unlockable-content-toggle"]"#, keys::ENTER).await?;
            d.send_keys(r#"//div[contains(@class, "unlockable")]/textarea"#, text).await?;
        }
        if record.explicit_content {
            d.send_keys(r#"//*[@id="explicit-content-toggle"]"#, keys::ENTER).await?;
        }
        if record.supply > 1 {
            d.send_keys(
                r#"//*[@id="supply"]"#,
                &format!("{}{}", keys::BACKSPACE, record.supply),
            )
            .await?;
        }

        let chain = d.element_attribute(r#"//*[@id="chain"]"#, "value").await?;
        if chain.as_deref() != Some(record.blockchain.as_str()) {
            d.click(r#"//*[@id="chain"]/.."#).await?;
            d.click(&format!(r#"//span[contains(text(), "{}")]/../.."#, record.blockchain))
                .await
                .map_err(|_| {
                    StageError::validation(format!("blockchain '{}' is unknown", record.blockchain))
                })?;
        }

        d.click(r#"(//div[contains(@class, "submit")])[position()=1]/div/span/button"#)
            .await?;
        self.check_for_captcha().await;

        // The form redirects to the new item once the upload is done
        let url = self
            .wait_for_url("upload to complete", self.completion_timeout, |url| url != form_url)
            .await?;
        info!(name = %record.name, url = %url, "Uploaded");
        Ok(url)
    }

    async fn verify_upload(&self, record: &Record) -> StageResult<bool> {
        self.remote_page(record).await?;
        let title = format!(r#"//h1[@title="{}"]"#, record.name);
        Ok(self.is_visible(&title).await?)
    }

    async fn list_for_sale(&self, record: &Record) -> StageResult<()> {
        let url = self.remote_page(record).await?;
        let d = &self.driver;
        d.navigate(&format!("{}/sell", url)).await?;

        if record.is_timed_auction() {
            self.fill_auction(record).await?;
        } else if record.supply > 1 {
            if let Some(quantity) = record.quantity {
                d.send_keys(
                    r#"//*[@id="quantity"]"#,
                    &format!("{}{}", keys::BACKSPACE, quantity),
                )
                .await?;
            }
        }

        if !record.is_timed_auction() {
            if let SpecificBuyer::RestrictedTo(address) = &record.specific_buyer {
                d.click(r#"//button[contains(@class, "more-options")]"#).await?;
                d.send_keys(r#"(//*[@role="switch"])[last()]"#, keys::ENTER).await?;
                d.send_keys(r#"//*[@id="reservedBuyerAddressOrEnsName"]"#, address)
                    .await?;
            }
        }

        let price = record
            .price
            .ok_or_else(|| StageError::validation("the price is missing"))?;
        d.send_keys(r#"//*[@name="price"]"#, &price.form_value()).await?;
        self.fill_duration(&record.duration).await?;

        d.click(r#"//button[@type="submit"]"#).await.map_err(|_| {
            StageError::validation("the submit button cannot be clicked")
        })?;
        self.sign_contract(Some(&record.blockchain)).await.map_err(|e| {
            StageError::validation(format!(
                "listing was not signed, a deposit may be needed first ({})",
                e
            ))
        })?;

        // "Your NFT is listed!"
        d.wait_visible("//header/h4").await?;
        info!(name = %record.name, "Listed for sale");
        Ok(())
    }

    async fn check_sale(&self, record: &Record) -> StageResult<SaleStatus> {
        self.remote_page(record).await?;
        if self.is_visible(r#"//button[contains(text(), "Cancel")]"#).await? {
            return Ok(SaleStatus::StillListed);
        }
        if self.is_visible(r#"//*[contains(text(), "Sell")]"#).await? {
            return Ok(SaleStatus::Ended);
        }
        Err(StageError::Driver(DriverError::NotFound(
            "neither a cancel nor a sell button".to_string(),
        )))
    }

    async fn remove(&self, record: &Record) -> StageResult<()> {
        self.remote_page(record).await?;
        let d = &self.driver;
        let edit = r#"//a[contains(text(), "Edit")]"#;
        d.wait_visible(edit).await.map_err(|_| {
            StageError::validation("the NFT does not exist or did not load")
        })?;
        d.click(edit).await?;
        d.click(r#"//button[contains(text(), "Delete item")]"#).await?;
        d.wait_visible(r#"//*[contains(text(), "Are you sure you want to delete this item?")]"#)
            .await?;
        d.click(r#"//div[contains(@class, "Overlay")]/div/div/footer/div/button"#)
            .await?;
        d.wait_visible(r#"//span[contains(text(), "Deleted!")]"#).await?;
        info!(name = %record.name, "Deleted");
        Ok(())
    }

    async fn shutdown(&self) -> DriverResult<()> {
        self.driver.quit().await
    }
}

fn absolute(path: &Path) -> String {
    if path.is_absolute() {
        return path.display().to_string();
    }
    std::env::current_dir()
        .map(|dir| dir.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Driver that records every command and finds every element.
    #[derive(Default, Clone)]
    struct RecordingDriver {
        calls: Arc<Mutex<Vec<String>>>,
        url: Arc<Mutex<String>>,
    }

    impl RecordingDriver {
        fn log(&self, entry: String) {
            self.calls.lock().unwrap().push(entry);
        }
    }

    #[async_trait]
    impl AutomationDriver for RecordingDriver {
        async fn navigate(&self, url: &str) -> DriverResult<()> {
            *self.url.lock().unwrap() = url.to_string();
            self.log(format!("navigate {}", url));
            Ok(())
        }
        async fn refresh(&self) -> DriverResult<()> {
            Ok(())
        }
        async fn click(&self, selector: &str) -> DriverResult<()> {
            self.log(format!("click {}", selector));
            Ok(())
        }
        async fn wait_visible(&self, selector: &str) -> DriverResult<crate::app::ports::Element> {
            if selector.contains("Cancel") {
                return Err(DriverError::Timeout(selector.to_string()));
            }
            Ok(crate::app::ports::Element { id: "e".to_string() })
        }
        async fn send_keys(&self, selector: &str, text: &str) -> DriverResult<()> {
            self.log(format!("keys {} <- {}", selector, text));
            Ok(())
        }
        async fn send_date(&self, selector: &str, literal: &str) -> DriverResult<()> {
            self.log(format!("date {} <- {}", selector, literal));
            Ok(())
        }
        async fn switch_to_window(&self, _index: usize) -> DriverResult<()> {
            Ok(())
        }
        async fn current_url(&self) -> DriverResult<String> {
            Ok(self.url.lock().unwrap().clone())
        }
        async fn element_text(&self, _selector: &str) -> DriverResult<String> {
            Ok("1 month".to_string())
        }
        async fn element_attribute(&self, _selector: &str, _name: &str) -> DriverResult<Option<String>> {
            Ok(Some("Ethereum".to_string()))
        }
        async fn window_count(&self) -> DriverResult<usize> {
            Ok(2)
        }
        async fn quit(&self) -> DriverResult<()> {
            Ok(())
        }
    }

    fn marketplace(driver: RecordingDriver) -> OpenSeaMarketplace<RecordingDriver> {
        OpenSeaMarketplace::new(
            driver,
            Wallet::MetaMask,
            &MarketplaceConfig::default(),
            &DriverConfig {
                poll_interval_ms: 1,
                ..DriverConfig::default()
            },
        )
    }

    fn record() -> Record {
        use crate::domain::{AssetPath, Price};
        Record {
            asset: AssetPath::Single(PathBuf::from("/tmp/one.png")),
            name: "One".to_string(),
            link: String::new(),
            description: String::new(),
            collection: String::new(),
            properties: Vec::new(),
            levels: Vec::new(),
            stats: Vec::new(),
            unlockable: UnlockableContent::Disabled,
            explicit_content: false,
            supply: 1,
            blockchain: "Ethereum".to_string(),
            listing_type: "Fixed Price".to_string(),
            price: Some(Price::Decimal(0.25)),
            sale_method: SaleMethod::Unset,
            duration: ListingDuration::Label("1 month".to_string()),
            specific_buyer: SpecificBuyer::Unrestricted,
            quantity: None,
            remote_url: Some("https://opensea.io/assets/ethereum/0x1/1".to_string()),
            sale_date: None,
        }
    }

    #[test]
    fn wallet_names_select_credential_files() {
        assert_eq!(Wallet::MetaMask.file_prefix(), "meta");
        assert_eq!(
            Wallet::Coinbase.extension_path(Path::new("assets")),
            PathBuf::from("assets/Coinbase.crx")
        );
    }

    #[tokio::test]
    async fn sale_check_without_cancel_button_means_ended() {
        let market = marketplace(RecordingDriver::default());
        assert_eq!(market.check_sale(&record()).await.unwrap(), SaleStatus::Ended);
    }

    #[tokio::test]
    async fn listing_types_the_price_with_eight_decimals() {
        let driver = RecordingDriver::default();
        let market = marketplace(driver.clone());
        market.list_for_sale(&record()).await.unwrap();

        let calls = driver.calls.lock().unwrap();
        assert!(calls
            .iter()
            .any(|c| c == "navigate https://opensea.io/assets/ethereum/0x1/1/sell"));
        assert!(calls
            .iter()
            .any(|c| c == r#"keys //*[@name="price"] <- 0.25000000"#));
    }

    #[tokio::test]
    async fn operations_need_a_remote_url() {
        let market = marketplace(RecordingDriver::default());
        let mut record = record();
        record.remote_url = None;
        assert!(matches!(
            market.remove(&record).await,
            Err(StageError::MissingRemoteUrl)
        ));
    }
}
