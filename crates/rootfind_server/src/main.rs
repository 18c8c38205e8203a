use anyhow::Context;
use rootfind_server::{config::ServerConfig, run_server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env().context("Invalid server configuration")?;
    run_server(config).await
}
