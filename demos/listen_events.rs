//! Print connection events and stream changes until interrupted.
//!
//! Usage: `RUST_LOG=snapcast_rpc=info cargo run --example listen_events -- [HOST:PORT]`

use snapcast_rpc::snapcast::{SnapcastClient, DEFAULT_PORT};
use snapcast_rpc::RpcClientBuilder;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let addr = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("SNAPSERVER_ADDR").ok())
        .unwrap_or_else(|| format!("localhost:{DEFAULT_PORT}"));

    let rpc = RpcClientBuilder::new(addr)
        .on_connect(|| async { println!("connected") })
        .on_disconnect(|cause| async move {
            match cause {
                Some(err) => println!("disconnected: {err}"),
                None => println!("disconnected"),
            }
        })
        .on_any_notification(|method, params| async move {
            println!("{method}: {params}");
        })
        .build();

    let snapcast = SnapcastClient::new(rpc.clone());
    snapcast.on_group_stream_changed(|group, stream| {
        println!("group {group} now playing {stream}");
    });

    rpc.connect()?;

    tokio::signal::ctrl_c().await?;
    snapcast.close().await;
    Ok(())
}
