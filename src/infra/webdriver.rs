//! W3C WebDriver client over HTTP, driving a Chrome session through
//! chromedriver.

use async_trait::async_trait;
use base64::Engine as _;
use reqwest::Method;
use serde_json::{json, Value};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::app::ports::{AutomationDriver, DriverResult, Element};
use crate::config::DriverConfig;
use crate::error::DriverError;

/// Key under which the protocol returns element references
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Special keys understood by the element send-keys command
pub mod keys {
    pub const NULL: &str = "\u{E000}";
    pub const BACKSPACE: &str = "\u{E003}";
    pub const ENTER: &str = "\u{E007}";
    pub const CONTROL: &str = "\u{E009}";
    pub const COMMAND: &str = "\u{E03D}";

    /// Chord selecting the whole content of a text input
    pub fn select_all() -> String {
        let modifier = if cfg!(target_os = "macos") { COMMAND } else { CONTROL };
        format!("{}a{}", modifier, NULL)
    }
}

pub struct WebDriverClient {
    http: reqwest::Client,
    session_url: String,
    element_timeout: Duration,
    window_timeout: Duration,
    poll_interval: Duration,
}

impl WebDriverClient {
    /// Starts a new browser session, optionally with a wallet extension
    /// (`.crx`) installed.
    pub async fn connect(config: &DriverConfig, extension: Option<&Path>) -> DriverResult<Self> {
        let mut args = vec![
            "--log-level=3".to_string(),
            "--mute-audio".to_string(),
            "--lang=en-US".to_string(),
        ];
        if config.headless {
            args.push("--headless=new".to_string());
        }
        let mut extensions = Vec::new();
        if let Some(path) = extension {
            let bytes = std::fs::read(path).map_err(|e| {
                DriverError::Session(format!(
                    "cannot read wallet extension {}: {}",
                    path.display(),
                    e
                ))
            })?;
            extensions.push(base64::engine::general_purpose::STANDARD.encode(bytes));
        }

        let capabilities = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": {
                        "args": args,
                        "extensions": extensions,
                        "prefs": { "intl.accept_languages": "en,en_US" }
                    }
                }
            }
        });

        let http = reqwest::Client::new();
        let base = config.webdriver_url.trim_end_matches('/').to_string();
        let response = http
            .post(format!("{}/session", base))
            .json(&capabilities)
            .send()
            .await?;
        let body: Value = response.json().await?;
        let session_id = body["value"]["sessionId"]
            .as_str()
            .ok_or_else(|| DriverError::Session(protocol_message(&body["value"])))?
            .to_string();
        info!(session_id = %session_id, webdriver = %base, "Browser session started");

        Ok(Self {
            http,
            session_url: format!("{}/session/{}", base, session_id),
            element_timeout: config.element_timeout(),
            window_timeout: config.window_timeout(),
            poll_interval: config.poll_interval(),
        })
    }

    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> DriverResult<Value> {
        let url = format!("{}{}", self.session_url, path);
        let mut request = self.http.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;
        let status = response.status();
        let payload: Value = response.json().await?;
        let value = payload.get("value").cloned().unwrap_or(Value::Null);
        if status.is_success() {
            return Ok(value);
        }
        let message = protocol_message(&value);
        match value["error"].as_str() {
            Some("no such element") | Some("stale element reference") => {
                Err(DriverError::NotFound(message))
            }
            Some("timeout") | Some("script timeout") => Err(DriverError::Timeout(message)),
            _ => Err(DriverError::Session(message)),
        }
    }

    async fn find_all(&self, selector: &str) -> DriverResult<Vec<String>> {
        let value = self
            .command(
                Method::POST,
                "/elements",
                Some(json!({ "using": "xpath", "value": selector })),
            )
            .await?;
        Ok(value
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item[ELEMENT_KEY].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn element_flag(&self, id: &str, flag: &str) -> DriverResult<bool> {
        let value = self
            .command(Method::GET, &format!("/element/{}/{}", id, flag), None)
            .await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// Polls until an element matching `selector` is displayed and/or enabled
    /// as required. Returns its reference.
    async fn wait_for(
        &self,
        selector: &str,
        timeout: Duration,
        require_visible: bool,
        require_enabled: bool,
    ) -> DriverResult<String> {
        let deadline = Instant::now() + timeout;
        let mut seen = false;
        loop {
            for id in self.find_all(selector).await? {
                seen = true;
                let visible = !require_visible || self.element_flag(&id, "displayed").await?;
                let enabled = !require_enabled || self.element_flag(&id, "enabled").await?;
                if visible && enabled {
                    return Ok(id);
                }
            }
            if Instant::now() >= deadline {
                return Err(if seen {
                    DriverError::Timeout(selector.to_string())
                } else {
                    DriverError::NotFound(selector.to_string())
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn js_click(&self, id: &str) -> DriverResult<()> {
        self.command(
            Method::POST,
            "/execute/sync",
            Some(json!({
                "script": "arguments[0].click();",
                "args": [{ ELEMENT_KEY: id }]
            })),
        )
        .await?;
        Ok(())
    }

    async fn type_into(&self, id: &str, text: &str) -> DriverResult<()> {
        self.command(
            Method::POST,
            &format!("/element/{}/value", id),
            Some(json!({ "text": text })),
        )
        .await?;
        Ok(())
    }

    async fn window_handles(&self) -> DriverResult<Vec<String>> {
        let value = self.command(Method::GET, "/window/handles", None).await?;
        Ok(value
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|h| h.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl AutomationDriver for WebDriverClient {
    async fn navigate(&self, url: &str) -> DriverResult<()> {
        debug!(url, "Navigating");
        self.command(Method::POST, "/url", Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    async fn refresh(&self) -> DriverResult<()> {
        self.command(Method::POST, "/refresh", Some(json!({}))).await?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> DriverResult<()> {
        let clicked = match self.wait_for(selector, self.element_timeout, true, true).await {
            Ok(id) => self
                .command(Method::POST, &format!("/element/{}/click", id), Some(json!({})))
                .await
                .map(|_| ()),
            Err(e) => Err(e),
        };
        if clicked.is_ok() {
            return Ok(());
        }
        // Some buttons only react to a scripted click
        let id = self.wait_for(selector, self.element_timeout, false, false).await?;
        self.js_click(&id).await
    }

    async fn wait_visible(&self, selector: &str) -> DriverResult<Element> {
        let id = self.wait_for(selector, self.element_timeout, true, false).await?;
        Ok(Element { id })
    }

    async fn send_keys(&self, selector: &str, text: &str) -> DriverResult<()> {
        match self.wait_for(selector, self.element_timeout, true, false).await {
            Ok(id) => self.type_into(&id, text).await,
            // File inputs and some toggles are present but never displayed
            Err(_) => {
                let id = self
                    .wait_for(selector, self.element_timeout / 2, false, false)
                    .await?;
                self.type_into(&id, text).await
            }
        }
    }

    async fn send_date(&self, selector: &str, literal: &str) -> DriverResult<()> {
        for part in date_parts(literal, chrono::Local::now().format("%Y").to_string().as_str()) {
            self.click(selector).await?;
            self.send_keys(selector, &part).await?;
        }
        Ok(())
    }

    async fn switch_to_window(&self, index: usize) -> DriverResult<()> {
        let deadline = Instant::now() + self.window_timeout;
        loop {
            let handles = self.window_handles().await?;
            if let Some(handle) = handles.get(index) {
                self.command(Method::POST, "/window", Some(json!({ "handle": handle })))
                    .await?;
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(DriverError::Timeout(format!("browser window #{}", index)));
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn current_url(&self) -> DriverResult<String> {
        let value = self.command(Method::GET, "/url", None).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn element_text(&self, selector: &str) -> DriverResult<String> {
        let id = self.wait_for(selector, self.element_timeout, true, false).await?;
        let value = self
            .command(Method::GET, &format!("/element/{}/text", id), None)
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn element_attribute(&self, selector: &str, name: &str) -> DriverResult<Option<String>> {
        let id = self.wait_for(selector, self.element_timeout, true, false).await?;
        let value = self
            .command(Method::GET, &format!("/element/{}/attribute/{}", id, name), None)
            .await?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn window_count(&self) -> DriverResult<usize> {
        Ok(self.window_handles().await?.len())
    }

    async fn quit(&self) -> DriverResult<()> {
        self.command(Method::DELETE, "", None).await?;
        info!("Browser session closed");
        Ok(())
    }
}

fn protocol_message(value: &Value) -> String {
    match (value["error"].as_str(), value["message"].as_str()) {
        (Some(error), Some(message)) => format!("{}: {}", error, message),
        (Some(error), None) => error.to_string(),
        (None, Some(message)) => message.to_string(),
        (None, None) => value.to_string(),
    }
}

/// Date pickers take month, day and year as separate entries, and the year is
/// left out when it is the current one. Anything without dashes (a time) is
/// typed as is.
fn date_parts(literal: &str, current_year: &str) -> Vec<String> {
    let parts: Vec<&str> = literal.split('-').collect();
    match parts.as_slice() {
        [day, month, year] => {
            let mut ordered = vec![month.to_string(), day.to_string()];
            if *year != current_year {
                ordered.push(year.to_string());
            }
            ordered
        }
        _ => vec![literal.to_string()],
    }
}
