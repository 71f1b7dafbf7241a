pub async fn run(server_url: Option<&str>, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let client = super::client(server_url)?;
    let stats = client.usage_stats().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("{stats}");
    }
    Ok(())
}
