//! Display surfaces for the active intervention.
//!
//! Two surfaces read the same slot and gate on its kind:
//!
//! | Surface      | Shown for       | Fields                                   | Actions              |
//! |--------------|-----------------|------------------------------------------|----------------------|
//! | Notification | `Notification`  | message, session minutes                 | close                |
//! | Overlay      | `Overlay`       | message, session, today and goal minutes | take a break, dismiss|
//!
//! Every action clears the store. The overlay is prominent but not modal.

use serde::Serialize;
use std::fmt;

use super::model::{Intervention, InterventionKind};
use super::store::InterventionStore;

pub const NOTIFICATION_TITLE: &str = "Time Check";
pub const OVERLAY_TITLE: &str = "Time to Take a Break";
pub const TAKE_BREAK_LABEL: &str = "Take a Break (5 min)";
pub const DISMISS_LABEL: &str = "Dismiss";

/// What the notification surface shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationView {
    pub title: &'static str,
    pub message: String,
    pub current_session_minutes: u32,
}

impl NotificationView {
    /// `None` unless `intervention` is a notification.
    pub fn render(intervention: Option<&Intervention>) -> Option<Self> {
        let intervention = intervention?;
        if intervention.kind != InterventionKind::Notification {
            return None;
        }
        Some(Self {
            title: NOTIFICATION_TITLE,
            message: intervention.message.clone(),
            current_session_minutes: intervention.usage_stats.current_session_minutes,
        })
    }
}

impl fmt::Display for NotificationView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "┌─ {} ", self.title)?;
        writeln!(f, "│ {}", self.message)?;
        writeln!(f, "│ Current session: {} minutes", self.current_session_minutes)?;
        write!(f, "└─ [x] close")
    }
}

/// What the overlay surface shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverlayView {
    pub title: &'static str,
    pub message: String,
    pub current_session_minutes: u32,
    pub today_minutes: u32,
    pub daily_goal_minutes: u32,
}

impl OverlayView {
    /// `None` unless `intervention` is an overlay.
    pub fn render(intervention: Option<&Intervention>) -> Option<Self> {
        let intervention = intervention?;
        if intervention.kind != InterventionKind::Overlay {
            return None;
        }
        let stats = intervention.usage_stats;
        Some(Self {
            title: OVERLAY_TITLE,
            message: intervention.message.clone(),
            current_session_minutes: stats.current_session_minutes,
            today_minutes: stats.today_minutes,
            daily_goal_minutes: stats.daily_goal_minutes,
        })
    }
}

impl fmt::Display for OverlayView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "╔══ {} ", self.title)?;
        writeln!(f, "║ {}", self.message)?;
        writeln!(f, "║")?;
        writeln!(f, "║ Your Usage Today")?;
        writeln!(f, "║   Session time: {} minutes", self.current_session_minutes)?;
        writeln!(f, "║   Daily total:  {} minutes", self.today_minutes)?;
        writeln!(f, "║   Daily goal:   {} minutes", self.daily_goal_minutes)?;
        writeln!(f, "║")?;
        write!(f, "╚══ [{TAKE_BREAK_LABEL}]  [{DISMISS_LABEL}]")
    }
}

/// The one surface visible at a given instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "surface", rename_all = "snake_case")]
pub enum Visible {
    Nothing,
    Notification(NotificationView),
    Overlay(OverlayView),
}

impl Visible {
    pub fn is_nothing(&self) -> bool {
        matches!(self, Visible::Nothing)
    }
}

impl fmt::Display for Visible {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visible::Nothing => Ok(()),
            Visible::Notification(view) => fmt::Display::fmt(view, f),
            Visible::Overlay(view) => fmt::Display::fmt(view, f),
        }
    }
}

/// User actions offered by the surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    /// Notification close affordance.
    Close,
    /// Overlay "take a break" button.
    TakeBreak,
    /// Overlay "dismiss" button.
    Dismiss,
}

impl UserAction {
    pub fn label(self) -> &'static str {
        match self {
            UserAction::Close => "close",
            UserAction::TakeBreak => TAKE_BREAK_LABEL,
            UserAction::Dismiss => DISMISS_LABEL,
        }
    }
}

/// Renders the store through both surfaces and routes user actions back.
///
/// Never touches the network.
#[derive(Debug, Clone)]
pub struct Presenter {
    store: InterventionStore,
}

impl Presenter {
    pub fn new(store: InterventionStore) -> Self {
        Self { store }
    }

    pub fn notification(&self) -> Option<NotificationView> {
        self.store.with_current(NotificationView::render)
    }

    pub fn overlay(&self) -> Option<OverlayView> {
        self.store.with_current(OverlayView::render)
    }

    /// Both surfaces evaluated against a single snapshot of the store.
    pub fn visible(&self) -> Visible {
        self.store.with_current(Self::visible_for)
    }

    /// Which surface `intervention` would show.
    pub fn visible_for(intervention: Option<&Intervention>) -> Visible {
        if let Some(view) = NotificationView::render(intervention) {
            Visible::Notification(view)
        } else if let Some(view) = OverlayView::render(intervention) {
            Visible::Overlay(view)
        } else {
            Visible::Nothing
        }
    }

    /// Every action clears the active intervention; the break and dismiss
    /// buttons differ only in their label.
    pub fn handle(&self, action: UserAction) {
        tracing::debug!(action = action.label(), "intervention action");
        self.store.dismiss();
    }
}
