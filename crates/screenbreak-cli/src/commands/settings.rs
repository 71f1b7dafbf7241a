use clap::Subcommand;
use screenbreak_core::{InterventionFrequency, SettingsSync};

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Show the limits currently applied by the server
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change one or more limits; omitted values keep their current setting
    Set {
        /// Daily usage limit in minutes (1-480)
        #[arg(long)]
        daily: Option<u32>,
        /// Session limit in minutes (1-120)
        #[arg(long)]
        session: Option<u32>,
        /// Intervention frequency: low, medium or high
        #[arg(long)]
        frequency: Option<InterventionFrequency>,
    },
}

pub async fn run(
    server_url: Option<&str>,
    action: SettingsAction,
) -> Result<(), Box<dyn std::error::Error>> {
    let sync = SettingsSync::new(super::client(server_url)?);

    match action {
        SettingsAction::Show { json } => {
            let settings = sync.load().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&settings)?);
            } else {
                println!("{settings}");
            }
        }
        SettingsAction::Set {
            daily,
            session,
            frequency,
        } => {
            if daily.is_none() && session.is_none() && frequency.is_none() {
                return Err("nothing to change: pass --daily, --session or --frequency".into());
            }

            let mut settings = sync.load().await?;
            if let Some(daily) = daily {
                settings.daily_limit_minutes = daily;
            }
            if let Some(session) = session {
                settings.session_limit_minutes = session;
            }
            if let Some(frequency) = frequency {
                settings.intervention_frequency = frequency;
            }

            let message = sync.submit(&settings).await?;
            println!("{message}");
            println!("{settings}");
        }
    }
    Ok(())
}
