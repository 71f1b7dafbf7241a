//! Screen activity forwarder.
//!
//! Pulls the most recent OCR frame from a local Screenpipe instance and
//! posts it to the usage-tracking service, which detects short-form video
//! platforms and records usage from it. Runs on its own ticker.
//!
//! The service's reply may say an intervention is required; that is only
//! logged here. Delivery stays with the intervention poller.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use reqwest::Client;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::api::ApiClient;
use crate::error::{ConfigError, CoreError, Result};
use crate::intervention::PollOutcome;
use crate::recurring::RecurringTask;
use crate::storage::Config;

pub const DEFAULT_FORWARD_INTERVAL: Duration = Duration::from_secs(15);
pub const SCREENPIPE_SEARCH_PATH: &str = "search";

/// Attempts per cycle when the Screenpipe search times out.
pub const MAX_FETCH_ATTEMPTS: u32 = 3;

/// One Screenpipe search result, forwarded as-is plus a `timestamp`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ScreenActivity(Map<String, Value>);

impl ScreenActivity {
    /// `None` when the search carried no OCR frames.
    pub fn from_search(body: Value) -> Option<Self> {
        let Value::Object(map) = body else {
            return None;
        };
        match map.get("data") {
            Some(Value::Array(frames)) if !frames.is_empty() => Some(Self(map)),
            _ => None,
        }
    }

    pub fn stamp(&mut self, at: NaiveDateTime) {
        self.0.insert(
            "timestamp".into(),
            Value::String(at.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()),
        );
    }

    pub fn timestamp(&self) -> Option<&str> {
        self.0.get("timestamp").and_then(Value::as_str)
    }

    /// OCR text of the newest frame, if the frame has any.
    pub fn text(&self) -> Option<&str> {
        self.0
            .get("data")?
            .get(0)?
            .get("content")?
            .get("text")?
            .as_str()
    }
}

/// What the service made of a forwarded frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenReport {
    pub platform_detected: bool,
    pub platform: Option<String>,
    pub confidence: f64,
    pub outcome: PollOutcome,
}

/// Client for the local Screenpipe search API.
#[derive(Debug, Clone)]
pub struct ScreenpipeClient {
    base_url: Url,
    http_client: Client,
    max_attempts: u32,
}

impl ScreenpipeClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut base_url = Url::parse(base_url).map_err(|e| ConfigError::InvalidValue {
            key: "forwarder.screenpipe_url".into(),
            message: e.to_string(),
        })?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Custom(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            http_client,
            max_attempts: MAX_FETCH_ATTEMPTS,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.forwarder.screenpipe_url, config.request_timeout())
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn search_once(&self) -> Result<Value> {
        let path = SCREENPIPE_SEARCH_PATH;
        let url = self
            .base_url
            .join(path)
            .map_err(|e| CoreError::Custom(format!("invalid endpoint '{path}': {e}")))?;
        let resp = self
            .http_client
            .get(url)
            .query(&[("limit", "1"), ("offset", "0"), ("content_type", "ocr")])
            .send()
            .await
            .map_err(|e| CoreError::http(path, e))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| CoreError::http(path, e))?;
        if !status.is_success() {
            return Err(CoreError::Status {
                endpoint: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|e| CoreError::decode(path, e.to_string()))
    }

    /// Latest OCR frame. Timeouts are retried up to the attempt limit; any
    /// other failure ends the cycle at once.
    pub async fn latest_ocr(&self) -> Result<Option<ScreenActivity>> {
        let mut attempt = 1;
        loop {
            match self.search_once().await {
                Ok(body) => return Ok(ScreenActivity::from_search(body)),
                Err(e) if e.is_timeout() && attempt < self.max_attempts => {
                    tracing::warn!(attempt, max = self.max_attempts, "screenpipe search timed out, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Result of one forwarding cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum ForwardOutcome {
    /// Screenpipe had no OCR frame; nothing was posted.
    NoActivity,
    Forwarded(ScreenReport),
}

/// Moves screen activity from Screenpipe to the usage-tracking service.
pub struct ActivityForwarder {
    screenpipe: ScreenpipeClient,
    api: ApiClient,
    interval: Duration,
}

impl ActivityForwarder {
    pub fn new(screenpipe: ScreenpipeClient, api: ApiClient) -> Self {
        Self {
            screenpipe,
            api,
            interval: DEFAULT_FORWARD_INTERVAL,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(
            ScreenpipeClient::from_config(config)?,
            ApiClient::from_config(config)?,
        )
        .with_interval(config.forward_interval()))
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn screenpipe(&self) -> &ScreenpipeClient {
        &self.screenpipe
    }

    /// Fetch one frame and post it.
    pub async fn forward_once(&self) -> Result<ForwardOutcome> {
        let Some(mut activity) = self.screenpipe.latest_ocr().await? else {
            tracing::info!("no OCR data from screenpipe, skipping this cycle");
            return Ok(ForwardOutcome::NoActivity);
        };
        activity.stamp(Local::now().naive_local());

        let report = self.api.process_screen(&activity).await?;
        match &report.outcome {
            PollOutcome::Required(intervention) => tracing::info!(
                kind = %intervention.kind,
                platform = report.platform.as_deref().unwrap_or("none"),
                "intervention required: {}",
                intervention.message
            ),
            PollOutcome::NotRequired => tracing::debug!(
                platform_detected = report.platform_detected,
                "screen activity forwarded"
            ),
        }
        Ok(ForwardOutcome::Forwarded(report))
    }

    /// Forward now and then once per interval until the handle is stopped.
    pub fn start(self: Arc<Self>) -> RecurringTask {
        tracing::info!(
            screenpipe = %self.screenpipe.base_url(),
            server = %self.api.base_url(),
            "starting activity forwarder"
        );
        RecurringTask::spawn("activity-forwarder", move |cancel| self.run(cancel))
    }

    async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        result = self.forward_once() => {
                            if let Err(e) = result {
                                tracing::warn!("screen activity not forwarded, skipping this cycle: {e}");
                            }
                        }
                    }
                }
            }
        }
        tracing::debug!("activity forwarder stopped");
    }
}
