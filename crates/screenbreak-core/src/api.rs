//! HTTP client for the usage-tracking service.
//!
//! | Method | Path                  | Used by             |
//! |--------|-----------------------|---------------------|
//! | GET    | `/check_intervention` | intervention poller |
//! | GET    | `/usage_stats`        | dashboard feed      |
//! | POST   | `/update_settings`    | settings sync       |
//! | POST   | `/process_screen`     | activity forwarder  |

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::dashboard::DashboardStats;
use crate::error::{ConfigError, CoreError, Result};
use crate::forwarder::{ScreenActivity, ScreenReport};
use crate::intervention::{Intervention, InterventionSource, PollOutcome};
use crate::settings::UserSettings;
use crate::storage::Config;

pub const CHECK_INTERVENTION_PATH: &str = "check_intervention";
pub const USAGE_STATS_PATH: &str = "usage_stats";
pub const UPDATE_SETTINGS_PATH: &str = "update_settings";
pub const PROCESS_SCREEN_PATH: &str = "process_screen";

/// `intervention_data` is kept raw and only decoded when the server says an
/// intervention is required.
#[derive(Debug, Deserialize)]
struct CheckResponse {
    #[serde(default)]
    intervention_required: bool,
    #[serde(default)]
    intervention_data: Option<serde_json::Value>,
}

impl CheckResponse {
    fn into_outcome(self, endpoint: &str) -> Result<PollOutcome> {
        match (self.intervention_required, self.intervention_data) {
            (true, Some(data)) if !data.is_null() => serde_json::from_value::<Intervention>(data)
                .map(PollOutcome::Required)
                .map_err(|e| CoreError::decode(endpoint, e.to_string())),
            // Required but nothing to show: clears like a "not required" answer.
            (true, _) => {
                tracing::debug!(endpoint, "intervention_required without intervention_data");
                Ok(PollOutcome::NotRequired)
            }
            (false, _) => Ok(PollOutcome::NotRequired),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProcessScreenResponse {
    #[serde(default)]
    platform_detected: bool,
    #[serde(default)]
    platform: Option<String>,
    #[serde(default)]
    confidence: f64,
    #[serde(flatten)]
    check: CheckResponse,
}

#[derive(Debug, Deserialize)]
struct StatsResponse {
    data: DashboardStats,
}

#[derive(Debug, Deserialize)]
struct SettingsResponse {
    #[serde(default)]
    message: Option<String>,
}

/// Client for the usage-tracking service.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    http_client: Client,
}

impl ApiClient {
    /// Create a client for `base_url` with a per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let mut base_url = Url::parse(base_url).map_err(|e| ConfigError::InvalidValue {
            key: "server.base_url".into(),
            message: e.to_string(),
        })?;
        // Url::join replaces the last segment unless the path ends in '/'.
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
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.server.base_url, config.request_timeout())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| CoreError::Custom(format!("invalid endpoint '{path}': {e}")))
    }

    async fn read_json<T: DeserializeOwned>(path: &str, resp: reqwest::Response) -> Result<T> {
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

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self
            .http_client
            .get(self.endpoint(path)?)
            .send()
            .await
            .map_err(|e| CoreError::http(path, e))?;
        Self::read_json(path, resp).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let resp = self
            .http_client
            .post(self.endpoint(path)?)
            .json(body)
            .send()
            .await
            .map_err(|e| CoreError::http(path, e))?;
        Self::read_json(path, resp).await
    }

    /// Ask whether an intervention is required right now.
    pub async fn fetch_intervention(&self) -> Result<PollOutcome> {
        let resp: CheckResponse = self.get_json(CHECK_INTERVENTION_PATH).await?;
        resp.into_outcome(CHECK_INTERVENTION_PATH)
    }

    /// Aggregate usage numbers for the dashboard.
    pub async fn usage_stats(&self) -> Result<DashboardStats> {
        let resp: StatsResponse = self.get_json(USAGE_STATS_PATH).await?;
        Ok(resp.data)
    }

    /// Submit the user's limits. Returns the server's confirmation message.
    pub async fn update_settings(&self, settings: &UserSettings) -> Result<String> {
        let resp: SettingsResponse = self.post_json(UPDATE_SETTINGS_PATH, settings).await?;
        Ok(resp
            .message
            .unwrap_or_else(|| "Settings updated successfully".to_string()))
    }
}

impl ApiClient {
    /// Post one OCR frame for platform detection and usage recording.
    pub async fn process_screen(&self, activity: &ScreenActivity) -> Result<ScreenReport> {
        let resp: ProcessScreenResponse = self.post_json(PROCESS_SCREEN_PATH, activity).await?;
        Ok(ScreenReport {
            platform_detected: resp.platform_detected,
            platform: resp.platform.filter(|p| p != "none"),
            confidence: resp.confidence,
            outcome: resp.check.into_outcome(PROCESS_SCREEN_PATH)?,
        })
    }
}

impl InterventionSource for ApiClient {
    fn check_intervention(&self) -> impl Future<Output = Result<PollOutcome>> + Send {
        self.fetch_intervention()
    }
}
