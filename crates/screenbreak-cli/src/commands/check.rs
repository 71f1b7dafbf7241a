use screenbreak_core::{PollOutcome, Presenter};
use serde_json::json;

pub async fn run(server_url: Option<&str>, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let client = super::client(server_url)?;
    let outcome = client.fetch_intervention().await?;
    let intervention = match &outcome {
        PollOutcome::Required(intervention) => Some(intervention),
        PollOutcome::NotRequired => None,
    };
    let visible = Presenter::visible_for(intervention);

    if json {
        let report = json!({
            "intervention_required": intervention.is_some(),
            "intervention": intervention,
            "visible": visible,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    match intervention {
        None => println!("No intervention required"),
        Some(i) if visible.is_nothing() => {
            println!("Intervention of unrecognized kind '{}' (not shown): {}", i.kind, i.message)
        }
        Some(_) => println!("{visible}"),
    }
    Ok(())
}
