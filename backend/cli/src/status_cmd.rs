//! CLI Status Command
//!
//! Queries a running instance's `/health` endpoint and pretty-prints it.

use anyhow::Result;

use crate::config::Config;

pub async fn run(config: &Config) -> Result<()> {
    let url = format!("http://localhost:{}/health", config.port);
    let client = reqwest::Client::new();

    match client.get(&url).send().await {
        Ok(resp) => {
            let body: serde_json::Value = resp.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Err(_) => {
            println!("cligate is not running on port {}", config.port);
        }
    }

    Ok(())
}
