use serde_json::{json, Value};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use snapcast_rpc::snapcast::{methods, SnapcastClient, StreamId};
use snapcast_rpc::{
    //
    MemoryDialer,
    RpcClientBuilder,
};

const WAIT: Duration = Duration::from_secs(2);

#[tokio::test]
async fn test_group_stream_changed_reaches_handler() {
    // ---
    let (dialer, mut listener) = MemoryDialer::pair("snapserver");
    let rpc = RpcClientBuilder::new("snapserver")
        .dialer(dialer.into_ptr())
        .request_timeout(WAIT)
        .build();

    let snapcast = SnapcastClient::new(rpc.clone());
    let (tx, mut changes) = mpsc::unbounded_channel();
    snapcast.on_group_stream_changed(move |group, stream| {
        let _ = tx.send((group, stream));
    });
    rpc.connect().unwrap();

    let stream = tokio::time::timeout(WAIT, listener.accept())
        .await
        .unwrap()
        .unwrap();
    let (read, mut write) = tokio::io::split(stream);

    let notifications = [
        // Undecodable params are logged and dropped.
        json!({"jsonrpc": "2.0", "method": methods::GROUP_ON_STREAM_CHANGED, "params": {"id": 7}}),
        json!({
            "jsonrpc": "2.0",
            "method": methods::GROUP_ON_STREAM_CHANGED,
            "params": {"id": "4dcc4e3b", "stream_id": "Spotify"}
        }),
    ];
    for notification in notifications {
        let frame = format!("{notification}\r\n");
        write.write_all(frame.as_bytes()).await.unwrap();
    }

    let (group, stream) = tokio::time::timeout(WAIT, changes.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(group, "4dcc4e3b");
    assert_eq!(stream, StreamId::from("Spotify"));

    // The connection keeps serving calls afterwards.
    let call = tokio::spawn({
        let snapcast = snapcast.clone();
        async move { snapcast.rpc_version().await }
    });
    let mut lines = BufReader::new(read).lines();
    let line = tokio::time::timeout(WAIT, lines.next_line())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let request: Value = serde_json::from_str(&line).unwrap();
    assert_eq!(request["method"], methods::SERVER_GET_RPC_VERSION);

    let reply = json!({"jsonrpc": "2.0", "id": request["id"], "result": {"major": 2, "minor": 1, "patch": 0}});
    write
        .write_all(format!("{reply}\n").as_bytes())
        .await
        .unwrap();

    let version = call.await.unwrap().unwrap();
    assert_eq!((version.major, version.minor), (2, 1));
    assert!(changes.try_recv().is_err());

    snapcast.close().await;
}
