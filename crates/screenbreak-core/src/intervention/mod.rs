//! Intervention Delivery Client.
//!
//! ```text
//! InterventionPoller ──▶ InterventionStore ──▶ Presenter (notification | overlay)
//! ```
//!
//! The poller is the only producer of an active intervention; a dismissal
//! or a "not required" poll are the only ways to clear it.

pub mod model;
pub mod poller;
pub mod presenter;
pub mod store;

pub use model::{Intervention, InterventionKind, UsageSnapshot};
pub use poller::{
    apply_outcome, InterventionPoller, InterventionSource, PollOutcome, ResponseOrdering,
    DEFAULT_POLL_INTERVAL,
};
pub use presenter::{NotificationView, OverlayView, Presenter, UserAction, Visible};
pub use store::InterventionStore;
