use screenbreak_core::{ClientSession, DashboardState, UserAction, Visible};
use std::future::Future;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::watch;

/// A line typed on stdin while watching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Action(UserAction),
    Quit,
}

fn parse_input(line: &str) -> Option<Input> {
    match line.trim().to_ascii_lowercase().as_str() {
        "close" | "c" => Some(Input::Action(UserAction::Close)),
        "break" | "b" => Some(Input::Action(UserAction::TakeBreak)),
        "dismiss" | "d" => Some(Input::Action(UserAction::Dismiss)),
        "quit" | "q" | "exit" => Some(Input::Quit),
        _ => None,
    }
}

/// Whether `action` is offered by the surface currently on screen.
fn offered(visible: &Visible, action: UserAction) -> bool {
    match visible {
        Visible::Nothing => false,
        Visible::Notification(_) => action == UserAction::Close,
        Visible::Overlay(_) => matches!(action, UserAction::TakeBreak | UserAction::Dismiss),
    }
}

fn show(visible: &Visible) {
    match visible {
        Visible::Nothing => println!("(no active intervention)"),
        Visible::Notification(_) => println!("{visible}\n  (type: close)"),
        Visible::Overlay(_) => println!("{visible}\n  (type: break | dismiss)"),
    }
}

fn show_dashboard(state: &DashboardState) {
    match state {
        DashboardState::Loading => {}
        DashboardState::Ready { stats, fetched_at } => {
            println!("-- usage at {} --", fetched_at.format("%H:%M:%S"));
            println!("{stats}");
        }
        DashboardState::Failed(message) => println!("-- {message} --"),
    }
}

async fn dashboard_changed(
    rx: &mut Option<watch::Receiver<DashboardState>>,
) -> Option<DashboardState> {
    match rx {
        Some(rx) => {
            rx.changed().await.ok()?;
            let state = rx.borrow_and_update().clone();
            Some(state)
        }
        None => std::future::pending().await,
    }
}

pub async fn run(
    server_url: Option<&str>,
    no_dashboard: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(server_url)?;
    let session = ClientSession::start(&config, !no_dashboard)?;

    println!(
        "Watching {} (actions: close, break, dismiss, quit)",
        config.server.base_url
    );
    let stdin = BufReader::new(tokio::io::stdin());
    watch_loop(&session, stdin, tokio::signal::ctrl_c()).await?;

    session.shutdown().await?;
    Ok(())
}

/// Render store and dashboard changes and apply typed actions until `quit`
/// or until `shutdown` resolves. `shutdown` is armed once for the whole loop.
async fn watch_loop<R, F>(
    session: &ClientSession,
    input: R,
    shutdown: F,
) -> Result<(), Box<dyn std::error::Error>>
where
    R: AsyncBufRead + Unpin,
    F: Future,
{
    let presenter = session.presenter();
    let mut interventions = session.store().subscribe();
    let mut dashboard = session.dashboard().map(|feed| feed.subscribe());
    let mut lines = input.lines();
    let mut stdin_open = true;
    let mut last_shown = Visible::Nothing;
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            changed = interventions.changed() => {
                if changed.is_err() {
                    break;
                }
                let visible = presenter.visible();
                if visible != last_shown {
                    show(&visible);
                    last_shown = visible;
                }
            }
            state = dashboard_changed(&mut dashboard) => match state {
                Some(state) => show_dashboard(&state),
                None => dashboard = None,
            },
            line = lines.next_line(), if stdin_open => match line? {
                None => stdin_open = false,
                Some(line) => match parse_input(&line) {
                    Some(Input::Quit) => break,
                    Some(Input::Action(action)) => {
                        if offered(&presenter.visible(), action) {
                            presenter.handle(action);
                        } else {
                            println!("'{}' is not available right now", line.trim());
                        }
                    }
                    None if line.trim().is_empty() => {}
                    None => println!("unknown action '{}'", line.trim()),
                },
            },
        }
    }
    Ok(())
}
