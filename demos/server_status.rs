//! Print the server's host, groups and streams.
//!
//! Usage: `cargo run --example server_status -- [HOST:PORT]`
//! (defaults to `$SNAPSERVER_ADDR`, then `localhost:1705`).

use std::time::Duration;

use snapcast_rpc::snapcast::{SnapcastClient, DEFAULT_PORT};
use snapcast_rpc::RpcClientBuilder;
use tracing_subscriber::EnvFilter;

fn server_addr() -> String {
    // ---
    std::env::args()
        .nth(1)
        .or_else(|| std::env::var("SNAPSERVER_ADDR").ok())
        .unwrap_or_else(|| format!("localhost:{DEFAULT_PORT}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let rpc = RpcClientBuilder::new(server_addr())
        .request_timeout(Duration::from_secs(10))
        .connect()?;
    let snapcast = SnapcastClient::new(rpc);

    println!("host: {}", snapcast.host().await?);
    println!("control API: {}", snapcast.rpc_version().await?);

    println!("streams:");
    for stream in snapcast.streams().await? {
        println!("  {} ({})", stream.id, stream.status);
    }

    println!("groups:");
    for (id, group) in snapcast.groups().await? {
        println!("  {id} {:?} playing {}", group.name, group.stream);
        for speaker in group.speakers {
            println!(
                "    {} connected={} volume={}%{}",
                speaker.name,
                speaker.connected,
                speaker.volume.percent,
                if speaker.volume.muted { " (muted)" } else { "" }
            );
        }
    }

    snapcast.close().await;
    Ok(())
}
