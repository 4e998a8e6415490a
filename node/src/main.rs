use std::env;

use log::{error, info};
use ringlet_node::{api, ChordNode, Config, TcpTransport};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::init();

    let mut config = match env::args().nth(1) {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    config.apply_env();
    config.validate()?;
    let bootstrap_address = env::var("BOOTSTRAP_ADDRESS").ok();

    let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
    let transport = TcpTransport::bind(&config, inbox_tx).await?;
    let node = ChordNode::new(config.clone(), transport, inbox_rx)?;

    match bootstrap_address {
        Some(address) => node.join(&address).await?,
        None => node.create().await?,
    }
    info!(
        "Node {} ({}) is up",
        node.node_id(),
        node.peer_id()
    );

    let api_node = node.clone();
    let api_address = config.api_address.clone();
    tokio::spawn(async move {
        if let Err(e) = api::run(api_node, &api_address).await {
            error!("API server stopped: {}", e);
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    node.leave().await?;
    Ok(())
}
