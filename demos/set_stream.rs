//! Switch a group to another stream.
//!
//! Usage: `cargo run --example set_stream -- GROUP_ID STREAM_ID [HOST:PORT]`

use std::time::Duration;

use anyhow::Context;
use snapcast_rpc::snapcast::{SnapcastClient, StreamId, DEFAULT_PORT};
use snapcast_rpc::RpcClientBuilder;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let group = args.next().context("missing GROUP_ID")?;
    let stream = StreamId::new(args.next().context("missing STREAM_ID")?);
    let addr = args
        .next()
        .or_else(|| std::env::var("SNAPSERVER_ADDR").ok())
        .unwrap_or_else(|| format!("localhost:{DEFAULT_PORT}"));

    let rpc = RpcClientBuilder::new(addr)
        .request_timeout(Duration::from_secs(10))
        .connect()?;
    let snapcast = SnapcastClient::new(rpc);

    let groups = snapcast.groups().await?;
    let current = groups
        .get(&group)
        .with_context(|| format!("no group {group}"))?;
    println!("{group}: {} -> {stream}", current.stream);

    snapcast
        .set_group_stream(&group, &stream)
        .await
        .context("could not set stream")?;

    snapcast.close().await;
    Ok(())
}
