//! Order publisher
//!
//! Reads an order document, checks it with the same validator the server
//! uses, publishes it to the bus and waits for the durable ack.
//!
//! ```text
//! order-publisher --file fixtures/model.json --addr 127.0.0.1:4222
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use order_client::{BusClient, init_logging};

#[derive(Debug, Parser)]
#[command(name = "order-publisher", about = "Publish an order document to the bus")]
struct Args {
    /// Order JSON file
    #[arg(short, long, default_value = "model.json")]
    file: PathBuf,

    /// Bus TCP ingress address
    #[arg(short, long, default_value = "127.0.0.1:4222")]
    addr: String,

    /// Channel to publish on
    #[arg(short, long, default_value = "orders")]
    channel: String,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level)?;

    tracing::info!("Starting publisher...");

    let data = std::fs::read(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;

    let order = shared::validate(&data)
        .with_context(|| format!("{} is not a valid order", args.file.display()))?;

    let mut client = BusClient::connect(&args.addr)
        .await
        .with_context(|| format!("failed to connect to bus at {}", args.addr))?;
    tracing::info!("Connected to bus at {}", args.addr);

    let sequence = client
        .publish(&args.channel, data)
        .await
        .context("publish failed")?;

    tracing::info!(
        order_uid = %order.order_uid,
        channel = %args.channel,
        sequence,
        "Order published"
    );

    Ok(())
}
