//! A running client: intervention poller plus, optionally, the dashboard feed.

use std::sync::Arc;

use crate::api::ApiClient;
use crate::dashboard::{DashboardFeed, DashboardState};
use crate::error::Result;
use crate::intervention::{InterventionPoller, InterventionStore, Presenter, ResponseOrdering};
use crate::recurring::RecurringTask;
use crate::storage::Config;

/// Everything started for one client session.
///
/// Polling begins in [`ClientSession::start`] and ends in
/// [`ClientSession::shutdown`]; dropping the session also cancels both
/// tickers.
pub struct ClientSession {
    store: InterventionStore,
    presenter: Presenter,
    poller: RecurringTask,
    dashboard: Option<(Arc<DashboardFeed<ApiClient>>, RecurringTask)>,
}

impl ClientSession {
    /// Start polling with the given configuration. Must be called inside a
    /// tokio runtime.
    pub fn start(config: &Config, with_dashboard: bool) -> Result<Self> {
        config.validate()?;
        let client = Arc::new(ApiClient::from_config(config)?);
        tracing::info!(server = %client.base_url(), "starting client session");

        let store = InterventionStore::new();
        let ordering = if config.intervention.discard_stale_responses {
            ResponseOrdering::DiscardStale
        } else {
            ResponseOrdering::LastApplied
        };
        let poller = InterventionPoller::new(Arc::clone(&client), store.clone())
            .with_interval(config.poll_interval())
            .with_ordering(ordering)
            .start();

        let dashboard = with_dashboard.then(|| {
            let feed = Arc::new(
                DashboardFeed::new(Arc::clone(&client)).with_interval(config.dashboard_interval()),
            );
            let task = Arc::clone(&feed).start();
            (feed, task)
        });

        Ok(Self {
            presenter: Presenter::new(store.clone()),
            store,
            poller,
            dashboard,
        })
    }

    pub fn store(&self) -> &InterventionStore {
        &self.store
    }

    pub fn presenter(&self) -> &Presenter {
        &self.presenter
    }

    pub fn dashboard(&self) -> Option<&Arc<DashboardFeed<ApiClient>>> {
        self.dashboard.as_ref().map(|(feed, _)| feed)
    }

    pub fn dashboard_state(&self) -> Option<DashboardState> {
        self.dashboard().map(|feed| feed.state())
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_running()
    }

    /// Stop both tickers and wait for them to exit.
    pub async fn shutdown(self) -> Result<()> {
        self.poller.stop().await?;
        if let Some((_, task)) = self.dashboard {
            task.stop().await?;
        }
        tracing::info!("client session ended");
        Ok(())
    }
}
