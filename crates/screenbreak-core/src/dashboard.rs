//! Dashboard statistics feed.
//!
//! Independent of the intervention client: its own 30 s ticker, its own
//! state, and, unlike interventions, fetch failures are visible to the user.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::api::ApiClient;
use crate::error::Result;
use crate::intervention::model::minutes;
use crate::recurring::RecurringTask;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// More opens than this in one day counts as frequent opening.
pub const FREQUENT_OPENING_THRESHOLD: u32 = 10;

/// Aggregate usage for today, as served by `/usage_stats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    #[serde(default, deserialize_with = "minutes")]
    pub today_minutes: u32,
    #[serde(default = "default_daily_goal", deserialize_with = "minutes")]
    pub daily_goal_minutes: u32,
    #[serde(default, deserialize_with = "minutes")]
    pub current_session_minutes: u32,
    #[serde(default = "default_session_goal", deserialize_with = "minutes")]
    pub session_goal_minutes: u32,
    #[serde(default)]
    pub times_opened_today: u32,
    /// Minutes per detected platform.
    #[serde(default, deserialize_with = "platform_minutes")]
    pub platforms: BTreeMap<String, u32>,
}

fn default_daily_goal() -> u32 {
    60
}
fn default_session_goal() -> u32 {
    15
}

fn platform_minutes<'de, D: serde::Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, u32>, D::Error> {
    #[derive(Deserialize)]
    struct Minutes(#[serde(deserialize_with = "minutes")] u32);

    let raw = BTreeMap::<String, Minutes>::deserialize(deserializer)?;
    Ok(raw.into_iter().map(|(k, Minutes(v))| (k, v)).collect())
}

impl Default for DashboardStats {
    fn default() -> Self {
        Self {
            today_minutes: 0,
            daily_goal_minutes: default_daily_goal(),
            current_session_minutes: 0,
            session_goal_minutes: default_session_goal(),
            times_opened_today: 0,
            platforms: BTreeMap::new(),
        }
    }
}

impl DashboardStats {
    pub fn daily_remaining(&self) -> u32 {
        self.daily_goal_minutes.saturating_sub(self.today_minutes)
    }

    pub fn session_remaining(&self) -> u32 {
        self.session_goal_minutes
            .saturating_sub(self.current_session_minutes)
    }

    pub fn daily_goal_exceeded(&self) -> bool {
        self.today_minutes >= self.daily_goal_minutes
    }

    pub fn session_goal_exceeded(&self) -> bool {
        self.current_session_minutes >= self.session_goal_minutes
    }

    pub fn frequent_opening(&self) -> bool {
        self.times_opened_today > FREQUENT_OPENING_THRESHOLD
    }
}

impl fmt::Display for DashboardStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Today's usage:   {} minutes", self.today_minutes)?;
        if self.daily_goal_exceeded() {
            writeln!(f, " (exceeded daily goal)")?;
        } else {
            writeln!(f, " ({} minutes remaining)", self.daily_remaining())?;
        }

        write!(f, "Current session: {} minutes", self.current_session_minutes)?;
        if self.session_goal_exceeded() {
            writeln!(f, " (exceeded session goal)")?;
        } else {
            writeln!(f, " ({} minutes remaining)", self.session_remaining())?;
        }

        write!(f, "Session count:   {} today", self.times_opened_today)?;
        if self.frequent_opening() {
            writeln!(f, " (frequent app opening detected)")?;
        } else {
            writeln!(f, " (healthy usage pattern)")?;
        }

        write!(f, "Daily goal:      {} minutes", self.daily_goal_minutes)?;
        if self.platforms.is_empty() {
            write!(f, "\nNo platform data available yet")?;
        } else {
            for (platform, minutes) in &self.platforms {
                write!(f, "\n  {platform:<16} {minutes} minutes")?;
            }
        }
        Ok(())
    }
}

/// What the dashboard currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardState {
    Loading,
    Ready {
        stats: DashboardStats,
        fetched_at: DateTime<Utc>,
    },
    Failed(String),
}

/// Source of dashboard statistics.
pub trait StatsSource: Send + Sync + 'static {
    fn fetch_stats(&self) -> impl Future<Output = Result<DashboardStats>> + Send;
}

impl StatsSource for ApiClient {
    fn fetch_stats(&self) -> impl Future<Output = Result<DashboardStats>> + Send {
        self.usage_stats()
    }
}

/// Periodically refreshes [`DashboardState`].
pub struct DashboardFeed<S> {
    source: Arc<S>,
    interval: Duration,
    tx: Arc<watch::Sender<DashboardState>>,
}

impl<S: StatsSource> DashboardFeed<S> {
    pub fn new(source: Arc<S>) -> Self {
        let (tx, _rx) = watch::channel(DashboardState::Loading);
        Self {
            source,
            interval: DEFAULT_REFRESH_INTERVAL,
            tx: Arc::new(tx),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn state(&self) -> DashboardState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.tx.subscribe()
    }

    /// Fetch once and publish the result.
    pub async fn refresh(&self) -> DashboardState {
        let next = match self.source.fetch_stats().await {
            Ok(stats) => DashboardState::Ready {
                stats,
                fetched_at: Utc::now(),
            },
            Err(e) => {
                tracing::warn!("dashboard stats fetch failed: {e}");
                DashboardState::Failed("Failed to load statistics".to_string())
            }
        };
        self.tx.send_replace(next.clone());
        next
    }

    /// Refresh now and then once per interval until the handle is stopped.
    pub fn start(self: Arc<Self>) -> RecurringTask {
        RecurringTask::spawn("dashboard-feed", move |cancel| self.run(cancel))
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
                        _ = self.refresh() => {}
                    }
                }
            }
        }
        tracing::debug!("dashboard feed stopped");
    }
}
