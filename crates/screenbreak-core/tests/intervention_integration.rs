//! End-to-end tests for the intervention client against a mock server.

use std::sync::Arc;
use std::time::Duration;

use mockito::{Matcher, Server};
use screenbreak_core::intervention::presenter::{NOTIFICATION_TITLE, OVERLAY_TITLE};
use screenbreak_core::{
    ApiClient, CoreError, Intervention, InterventionFrequency, InterventionKind,
    InterventionPoller, InterventionStore, PollOutcome, Presenter, SettingsSync, UsageSnapshot,
    UserAction, UserSettings, Visible,
};
use serde_json::json;

fn client_for(server: &Server) -> Arc<ApiClient> {
    Arc::new(ApiClient::new(&server.url(), Duration::from_secs(5)).unwrap())
}

fn check_body(kind: &str, message: &str, session: f64, today: f64, goal: u32) -> String {
    json!({
        "intervention_required": true,
        "intervention_data": {
            "type": kind,
            "message": message,
            "usage_stats": {
                "current_session_minutes": session,
                "today_minutes": today,
                "daily_goal_minutes": goal
            }
        }
    })
    .to_string()
}

#[tokio::test]
async fn notification_payload_renders_time_check() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/check_intervention")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(check_body("notification", "You've been scrolling for 12 minutes", 12.0, 30.0, 60))
        .create_async()
        .await;

    let store = InterventionStore::new();
    let poller = InterventionPoller::new(client_for(&server), store.clone());
    let presenter = Presenter::new(store.clone());

    let outcome = poller.poll_once().await.unwrap();
    assert!(matches!(outcome, PollOutcome::Required(_)));
    mock.assert_async().await;

    let view = presenter.notification().expect("notification visible");
    assert_eq!(view.title, NOTIFICATION_TITLE);
    assert_eq!(view.current_session_minutes, 12);
    assert!(view.to_string().contains("12"));
    assert!(presenter.overlay().is_none());
}

#[tokio::test]
async fn overlay_cleared_by_either_action() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/check_intervention")
        .with_status(200)
        .with_body(check_body("overlay", "Daily goal reached", 20.0, 75.0, 60))
        .expect(2)
        .create_async()
        .await;

    let store = InterventionStore::new();
    let poller = InterventionPoller::new(client_for(&server), store.clone());
    let presenter = Presenter::new(store.clone());

    for action in [UserAction::TakeBreak, UserAction::Dismiss] {
        poller.poll_once().await.unwrap();
        let view = presenter.overlay().expect("overlay visible");
        assert_eq!(view.title, OVERLAY_TITLE);
        assert_eq!(
            (view.current_session_minutes, view.today_minutes, view.daily_goal_minutes),
            (20, 75, 60)
        );

        presenter.handle(action);
        assert!(store.current().is_none());
        assert_eq!(presenter.visible(), Visible::Nothing);
    }
}

#[tokio::test]
async fn server_error_keeps_state_until_not_required() {
    let mut server = Server::new_async().await;
    let store = InterventionStore::new();
    let poller = InterventionPoller::new(client_for(&server), store.clone());

    let ok = server
        .mock("GET", "/check_intervention")
        .with_status(200)
        .with_body(check_body("notification", "Time check", 5.0, 5.0, 60))
        .create_async()
        .await;
    poller.poll_once().await.unwrap();
    ok.remove_async().await;

    let failing = server
        .mock("GET", "/check_intervention")
        .with_status(500)
        .with_body("internal error")
        .create_async()
        .await;
    let err = poller.poll_once().await.unwrap_err();
    assert!(matches!(err, CoreError::Status { status: 500, .. }));
    assert_eq!(store.current().unwrap().message, "Time check");
    failing.remove_async().await;

    server
        .mock("GET", "/check_intervention")
        .with_status(200)
        .with_body(r#"{"intervention_required": false}"#)
        .create_async()
        .await;
    assert_eq!(poller.poll_once().await.unwrap(), PollOutcome::NotRequired);
    assert!(store.current().is_none());
}

#[tokio::test]
async fn unrecognized_kind_is_active_but_invisible() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/check_intervention")
        .with_status(200)
        .with_body(check_body("popup", "?", 1.0, 1.0, 60))
        .create_async()
        .await;

    let store = InterventionStore::new();
    let poller = InterventionPoller::new(client_for(&server), store.clone());
    poller.poll_once().await.unwrap();

    let active = store.current().expect("intervention stored");
    assert_eq!(active.kind, InterventionKind::Unrecognized("popup".into()));
    assert!(Presenter::new(store).visible().is_nothing());
}

#[tokio::test]
async fn required_without_data_clears_active_intervention() {
    let mut server = Server::new_async().await;
    let store = InterventionStore::new();
    store.set_intervention(Some(Intervention::new(
        InterventionKind::Overlay,
        "old",
        UsageSnapshot {
            current_session_minutes: 40,
            today_minutes: 100,
            daily_goal_minutes: 60,
        },
    )));
    let poller = InterventionPoller::new(client_for(&server), store.clone());

    for body in [
        r#"{"intervention_required": true}"#,
        r#"{"intervention_required": true, "intervention_data": null}"#,
    ] {
        let mock = server
            .mock("GET", "/check_intervention")
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;
        assert_eq!(poller.poll_once().await.unwrap(), PollOutcome::NotRequired);
        assert!(store.current().is_none());
        assert!(Presenter::new(store.clone()).visible().is_nothing());
        mock.remove_async().await;
    }
}

#[tokio::test]
async fn malformed_data_is_ignored_when_not_required() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/check_intervention")
        .with_status(200)
        .with_body(r#"{"intervention_required": false, "intervention_data": {"usage_stats": "n/a"}}"#)
        .create_async()
        .await;

    let store = InterventionStore::new();
    store.set_intervention(Some(Intervention::new(
        InterventionKind::Notification,
        "stale",
        UsageSnapshot {
            current_session_minutes: 1,
            today_minutes: 1,
            daily_goal_minutes: 60,
        },
    )));
    let poller = InterventionPoller::new(client_for(&server), store.clone());
    assert_eq!(poller.poll_once().await.unwrap(), PollOutcome::NotRequired);
    assert!(store.current().is_none());
}

#[tokio::test]
async fn malformed_required_data_is_a_decode_error() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/check_intervention")
        .with_status(200)
        .with_body(r#"{"intervention_required": true, "intervention_data": {"type": "overlay"}}"#)
        .create_async()
        .await;

    let store = InterventionStore::new();
    let poller = InterventionPoller::new(client_for(&server), store.clone());
    assert!(matches!(
        poller.poll_once().await,
        Err(CoreError::Decode { .. })
    ));
    assert!(store.current().is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn background_poller_picks_up_intervention() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/check_intervention")
        .with_status(200)
        .with_body(check_body("notification", "Still here?", 3.0, 3.0, 60))
        .create_async()
        .await;

    let store = InterventionStore::new();
    let mut rx = store.subscribe();
    let task = InterventionPoller::new(client_for(&server), store.clone())
        .with_interval(Duration::from_secs(60))
        .start();

    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|v| v.is_some()))
        .await
        .expect("first poll fires immediately")
        .unwrap();
    task.stop().await.unwrap();
    assert_eq!(store.current().unwrap().message, "Still here?");
}

#[tokio::test]
async fn usage_stats_decode() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/usage_stats")
        .with_status(200)
        .with_body(
            json!({
                "success": true,
                "data": {
                    "today_minutes": 42.0,
                    "daily_goal_minutes": 90,
                    "current_session_minutes": 6.0,
                    "session_goal_minutes": 20,
                    "times_opened_today": 12,
                    "platforms": {"tiktok": 40.0}
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = client_for(&server);
    let stats = client.usage_stats().await.unwrap();
    assert_eq!(stats.today_minutes, 42);
    assert!(stats.frequent_opening());

    let settings = SettingsSync::new((*client).clone()).load().await.unwrap();
    assert_eq!(settings.daily_limit_minutes, 90);
    assert_eq!(settings.session_limit_minutes, 20);
}

#[tokio::test]
async fn settings_are_posted_as_json() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/update_settings")
        .match_body(Matcher::Json(json!({
            "daily_limit_minutes": 120,
            "session_limit_minutes": 30,
            "intervention_frequency": "high"
        })))
        .with_status(200)
        .with_body(r#"{"success": true, "message": "Settings updated successfully"}"#)
        .create_async()
        .await;

    let sync = SettingsSync::new((*client_for(&server)).clone());
    let message = sync
        .submit(&UserSettings {
            daily_limit_minutes: 120,
            session_limit_minutes: 30,
            intervention_frequency: InterventionFrequency::High,
        })
        .await
        .unwrap();
    assert_eq!(message, "Settings updated successfully");
    mock.assert_async().await;
}

#[tokio::test]
async fn invalid_settings_never_reach_the_server() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/update_settings")
        .expect(0)
        .create_async()
        .await;

    let sync = SettingsSync::new((*client_for(&server)).clone());
    let err = sync
        .submit(&UserSettings {
            daily_limit_minutes: 0,
            ..UserSettings::default()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
    mock.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn client_session_runs_poller_and_dashboard() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/check_intervention")
        .with_status(200)
        .with_body(check_body("overlay", "Take five", 16.0, 61.0, 60))
        .create_async()
        .await;
    server
        .mock("GET", "/usage_stats")
        .with_status(200)
        .with_body(r#"{"data": {"today_minutes": 61, "times_opened_today": 2}}"#)
        .create_async()
        .await;

    let mut config = screenbreak_core::Config::default();
    config.server.base_url = server.url();

    let session = screenbreak_core::ClientSession::start(&config, true).unwrap();
    assert!(session.is_polling());

    let mut rx = session.store().subscribe();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|v| v.is_some()))
        .await
        .expect("poll applied")
        .unwrap();
    assert!(matches!(session.presenter().visible(), Visible::Overlay(_)));

    let mut dash = session.dashboard().expect("dashboard enabled").subscribe();
    tokio::time::timeout(
        Duration::from_secs(5),
        dash.wait_for(|s| matches!(s, screenbreak_core::DashboardState::Ready { .. })),
    )
    .await
    .expect("stats loaded")
    .unwrap();

    session.presenter().handle(UserAction::Dismiss);
    assert!(session.store().current().is_none());
    session.shutdown().await.unwrap();
}
