//! Intervention payloads as reported by the usage-tracking service.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Usage statistics captured by the server when it decided to intervene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageSnapshot {
    #[serde(deserialize_with = "minutes")]
    pub current_session_minutes: u32,
    #[serde(deserialize_with = "minutes")]
    pub today_minutes: u32,
    #[serde(deserialize_with = "minutes")]
    pub daily_goal_minutes: u32,
}

/// Which presenter surface renders an intervention.
///
/// The server sends `"notification"` or `"overlay"`. Matching ignores ASCII
/// case, so `"Notification"` and `"OVERLAY"` select a surface too; this is
/// wider than an exact string compare. Anything else is kept verbatim in
/// `Unrecognized` so the record stays current without being rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterventionKind {
    Notification,
    Overlay,
    Unrecognized(String),
}

impl InterventionKind {
    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("notification") {
            InterventionKind::Notification
        } else if raw.eq_ignore_ascii_case("overlay") {
            InterventionKind::Overlay
        } else {
            InterventionKind::Unrecognized(raw.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            InterventionKind::Notification => "notification",
            InterventionKind::Overlay => "overlay",
            InterventionKind::Unrecognized(raw) => raw,
        }
    }
}

impl Default for InterventionKind {
    fn default() -> Self {
        InterventionKind::Unrecognized(String::new())
    }
}

impl fmt::Display for InterventionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for InterventionKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for InterventionKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // A non-string discriminator is malformed, not fatal.
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(match value {
            serde_json::Value::String(s) => InterventionKind::parse(&s),
            other => InterventionKind::Unrecognized(other.to_string()),
        })
    }
}

/// A server-issued directive to prompt the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intervention {
    #[serde(rename = "type", default)]
    pub kind: InterventionKind,
    pub message: String,
    /// Trigger label such as `session_limit_exceeded`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub usage_stats: UsageSnapshot,
}

impl Intervention {
    pub fn new(kind: InterventionKind, message: impl Into<String>, usage_stats: UsageSnapshot) -> Self {
        Self {
            kind,
            message: message.into(),
            reason: None,
            usage_stats,
        }
    }
}

/// Accept any non-negative JSON number as whole minutes.
///
/// The reference server computes minutes with float floor division, so
/// `12.0` is as common as `12`.
pub(crate) fn minutes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let number = serde_json::Number::deserialize(deserializer)?;
    if let Some(n) = number.as_u64() {
        return u32::try_from(n).map_err(|_| de::Error::custom(format!("minutes out of range: {n}")));
    }
    match number.as_f64() {
        Some(f) if f.is_finite() && f >= 0.0 && f <= u32::MAX as f64 => Ok(f.trunc() as u32),
        _ => Err(de::Error::custom(format!("invalid minute count: {number}"))),
    }
}
