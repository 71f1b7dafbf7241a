pub mod check;
pub mod config;
pub mod forward;
pub mod settings;
pub mod stats;
pub mod watch;

use screenbreak_core::{ApiClient, Config};

/// Load the config file, with `--server-url` applied on top (not saved).
pub fn load_config(server_url: Option<&str>) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = Config::load()?;
    if let Some(url) = server_url {
        config.apply("server.base_url", url)?;
    }
    tracing::debug!(server = %config.server.base_url, "configuration loaded");
    Ok(config)
}

pub fn client(server_url: Option<&str>) -> Result<ApiClient, Box<dyn std::error::Error>> {
    let config = load_config(server_url)?;
    Ok(ApiClient::from_config(&config)?)
}
