//! User limits submitted to the usage-tracking service.
//!
//! The intervention client never reads these values; the server applies
//! them when deciding whether to intervene.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::api::ApiClient;
use crate::dashboard::DashboardStats;
use crate::error::{Result, ValidationError};

pub const DAILY_LIMIT_RANGE: (u32, u32) = (1, 480);
pub const SESSION_LIMIT_RANGE: (u32, u32) = (1, 120);

/// How eagerly the server should intervene as limits approach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterventionFrequency {
    Low,
    #[default]
    Medium,
    High,
}

impl InterventionFrequency {
    pub fn as_str(self) -> &'static str {
        match self {
            InterventionFrequency::Low => "low",
            InterventionFrequency::Medium => "medium",
            InterventionFrequency::High => "high",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            InterventionFrequency::Low => "Less frequent reminders",
            InterventionFrequency::Medium => "Balanced reminders",
            InterventionFrequency::High => "More frequent reminders",
        }
    }
}

impl fmt::Display for InterventionFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterventionFrequency {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(InterventionFrequency::Low),
            "medium" => Ok(InterventionFrequency::Medium),
            "high" => Ok(InterventionFrequency::High),
            _ => Err(ValidationError::InvalidValue {
                field: "intervention_frequency".into(),
                message: format!("expected low, medium or high (got '{s}')"),
            }),
        }
    }
}

/// The settings form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettings {
    pub daily_limit_minutes: u32,
    pub session_limit_minutes: u32,
    pub intervention_frequency: InterventionFrequency,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            daily_limit_minutes: 60,
            session_limit_minutes: 15,
            intervention_frequency: InterventionFrequency::Medium,
        }
    }
}

fn check_range(field: &str, value: u32, (min, max): (u32, u32)) -> Result<(), ValidationError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field: field.to_string(),
            value,
            min,
            max,
        })
    }
}

impl UserSettings {
    /// Pre-fill the form from the server's current goals.
    ///
    /// The stats feed does not report a frequency, so it starts at medium.
    pub fn from_stats(stats: &DashboardStats) -> Self {
        Self {
            daily_limit_minutes: stats.daily_goal_minutes,
            session_limit_minutes: stats.session_goal_minutes,
            intervention_frequency: InterventionFrequency::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_range("daily_limit_minutes", self.daily_limit_minutes, DAILY_LIMIT_RANGE)?;
        check_range("session_limit_minutes", self.session_limit_minutes, SESSION_LIMIT_RANGE)?;
        Ok(())
    }
}

impl fmt::Display for UserSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Daily usage limit:      {} minutes", self.daily_limit_minutes)?;
        writeln!(f, "Session limit:          {} minutes", self.session_limit_minutes)?;
        write!(
            f,
            "Intervention frequency: {} ({})",
            self.intervention_frequency,
            self.intervention_frequency.description()
        )
    }
}

/// Loads and submits [`UserSettings`] through the API client.
#[derive(Debug, Clone)]
pub struct SettingsSync {
    client: ApiClient,
}

impl SettingsSync {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Current limits as reported by the stats endpoint.
    pub async fn load(&self) -> Result<UserSettings> {
        let stats = self.client.usage_stats().await?;
        Ok(UserSettings::from_stats(&stats))
    }

    /// Validate locally, then post. Invalid settings never reach the server.
    pub async fn submit(&self, settings: &UserSettings) -> Result<String> {
        settings.validate()?;
        let message = self.client.update_settings(settings).await?;
        tracing::info!(
            daily = settings.daily_limit_minutes,
            session = settings.session_limit_minutes,
            frequency = %settings.intervention_frequency,
            "settings submitted"
        );
        Ok(message)
    }
}
