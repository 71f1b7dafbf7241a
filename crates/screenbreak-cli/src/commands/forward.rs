use std::sync::Arc;

use screenbreak_core::{ActivityForwarder, ForwardOutcome, PollOutcome, ScreenReport};

fn describe(report: &ScreenReport) -> String {
    let platform = match (&report.platform, report.platform_detected) {
        (Some(platform), true) => format!("{platform} ({:.0}% confidence)", report.confidence * 100.0),
        _ => "no platform detected".to_string(),
    };
    match &report.outcome {
        PollOutcome::Required(i) => format!("Forwarded: {platform}\nIntervention ({}): {}", i.kind, i.message),
        PollOutcome::NotRequired => format!("Forwarded: {platform}\nNo intervention required"),
    }
}

pub async fn run(
    server_url: Option<&str>,
    screenpipe_url: Option<&str>,
    once: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config(server_url)?;
    if let Some(url) = screenpipe_url {
        config.apply("forwarder.screenpipe_url", url)?;
    }
    let forwarder = ActivityForwarder::from_config(&config)?;

    if once {
        match forwarder.forward_once().await? {
            ForwardOutcome::NoActivity => println!("No OCR data, skipped"),
            ForwardOutcome::Forwarded(report) => println!("{}", describe(&report)),
        }
        return Ok(());
    }

    println!(
        "Forwarding {} to {} every {}s (Ctrl-C to stop)",
        config.forwarder.screenpipe_url,
        config.server.base_url,
        config.forwarder.forward_interval_secs
    );
    let task = Arc::new(forwarder).start();
    tokio::signal::ctrl_c().await?;
    task.stop().await?;
    Ok(())
}
