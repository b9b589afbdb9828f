use anyhow::Context;
use parley::kernel::config::load_config;
use parley_logger::Logger;
use parley_server::Server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = load_config(Some("server")).context("Critical: Configuration is malformed")?;

    let _log = Logger::from_config(env!("CARGO_PKG_NAME"), &cfg.logging)?;

    Server::builder().config(cfg).build().await?.run().await
}
