use clap::Subcommand;
use screenbreak_core::Config;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective value of a key (e.g. "intervention.poll_interval_secs")
    Get { key: String },
    /// Change a key in the config file
    Set { key: String, value: String },
    /// Print the effective configuration as JSON
    List,
    /// Overwrite the config file with defaults
    Reset,
}

/// `get` and `list` show what a command run with the same flags would use,
/// so `--server-url` is reflected there. `set` and `reset` only ever write
/// what is on disk.
pub fn run(server_url: Option<&str>, action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let effective = super::load_config(server_url)?;
            let value = effective
                .get(&key)
                .ok_or_else(|| format!("unknown key: {key}"))?;
            println!("{value}");
        }
        ConfigAction::Set { key, value } => {
            let mut on_disk = Config::load()?;
            on_disk.set(&key, &value)?;
            println!("{key} = {}", on_disk.get(&key).unwrap_or(value));
        }
        ConfigAction::List => {
            let effective = super::load_config(server_url)?;
            println!("{}", serde_json::to_string_pretty(&effective)?);
        }
        ConfigAction::Reset => {
            Config::default().save()?;
            println!("config reset to defaults ({})", Config::path()?.display());
        }
    }
    Ok(())
}
