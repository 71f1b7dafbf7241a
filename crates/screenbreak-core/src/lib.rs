//! # ScreenBreak Core Library
//!
//! Client-side logic for the ScreenBreak digital-wellbeing service. The
//! server tracks screen time and decides when the user should be prompted;
//! this library asks it, holds the answer, and turns it into something a
//! host can display.
//!
//! ## Architecture
//!
//! - **Intervention client**: a poller that queries the service every 15 s,
//!   a single-slot store holding the active intervention, and a presenter
//!   with two mutually exclusive surfaces (notification and overlay)
//! - **Dashboard feed**: an independent 30 s refresh of aggregate usage
//! - **Settings sync**: validation and submission of the user's limits
//! - **Activity forwarder**: relays Screenpipe OCR frames to the service
//! - **Storage**: TOML configuration under `~/.config/screenbreak/`
//!
//! ## Key Components
//!
//! - [`InterventionPoller`]: recurring query with a cancellable handle
//! - [`InterventionStore`]: the one place the active intervention lives
//! - [`Presenter`]: renders the store, routes user actions to dismissal
//! - [`ClientSession`]: starts and stops everything for one session

pub mod api;
pub mod dashboard;
pub mod error;
pub mod forwarder;
pub mod intervention;
pub mod recurring;
pub mod session;
pub mod settings;
pub mod storage;

pub use api::ApiClient;
pub use dashboard::{DashboardFeed, DashboardState, DashboardStats};
pub use error::{ConfigError, CoreError, ValidationError};
pub use forwarder::{ActivityForwarder, ForwardOutcome, ScreenActivity, ScreenReport, ScreenpipeClient};
pub use intervention::{
    Intervention, InterventionKind, InterventionPoller, InterventionSource, InterventionStore,
    PollOutcome, Presenter, UsageSnapshot, UserAction, Visible,
};
pub use recurring::RecurringTask;
pub use session::ClientSession;
pub use settings::{InterventionFrequency, SettingsSync, UserSettings};
pub use storage::Config;
