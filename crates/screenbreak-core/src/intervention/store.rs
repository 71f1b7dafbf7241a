//! The single slot holding the currently active intervention.
//!
//! ```text
//!   poller ──set_intervention──▶ ┌──────────────────┐ ──current()───▶ presenter
//!                                │ InterventionStore│
//!   presenter ───dismiss()─────▶ └──────────────────┘ ──subscribe()─▶ host loop
//! ```
//!
//! Every write replaces the whole value. Writers are not ordered against
//! each other: whichever mutation is applied last is what readers see.

use std::sync::Arc;

use tokio::sync::watch;

use super::model::Intervention;

/// Owned container for the active intervention.
///
/// Cloning is cheap and every clone refers to the same slot, so the poller
/// and the presenter are handed clones of one store.
#[derive(Debug, Clone)]
pub struct InterventionStore {
    tx: Arc<watch::Sender<Option<Intervention>>>,
}

impl Default for InterventionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InterventionStore {
    /// Create an empty store (no active intervention).
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Replace the active intervention wholesale. No merging, no validation.
    pub fn set_intervention(&self, next: Option<Intervention>) {
        let replacing = next.is_some();
        let previous = self.tx.send_replace(next);
        if previous.is_some() && replacing {
            tracing::debug!("active intervention superseded");
        }
    }

    /// Clear the active intervention, whatever its kind. Idempotent.
    pub fn dismiss(&self) {
        if self.tx.send_replace(None).is_some() {
            tracing::debug!("intervention dismissed");
        }
    }

    /// Snapshot of the active intervention.
    pub fn current(&self) -> Option<Intervention> {
        self.tx.borrow().clone()
    }

    /// Run `f` against the active intervention without cloning it.
    ///
    /// The value cannot change while `f` runs, so anything derived inside
    /// reflects exactly one state.
    pub fn with_current<R>(&self, f: impl FnOnce(Option<&Intervention>) -> R) -> R {
        let guard = self.tx.borrow();
        f(guard.as_ref())
    }

    /// Receiver that is notified after every mutation.
    pub fn subscribe(&self) -> watch::Receiver<Option<Intervention>> {
        self.tx.subscribe()
    }
}
