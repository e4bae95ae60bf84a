use std::collections::BTreeMap;

use serde_json::Value;

use super::messages::{
    // ---
    GroupSetName,
    GroupSetNameResult,
    GroupSetStream,
    GroupSetStreamResult,
    GroupStreamChanged,
    ServerGetStatus,
};
use super::methods;
use super::{Group, RpcVersion, Stream, StreamId};
use crate::{
    // ---
    log_warn,
    Result,
    RpcClient,
    RpcError,
};

/// Snapserver control client.
///
/// Cheap to clone; wraps an [`RpcClient`] which keeps owning the connection
/// and its reconnect loop.
///
/// # Example
///
/// ```no_run
/// use snapcast_rpc::snapcast::SnapcastClient;
/// use snapcast_rpc::RpcClientBuilder;
///
/// # async fn example() -> snapcast_rpc::Result<()> {
/// let rpc = RpcClientBuilder::new("snapserver.local:1705").connect()?;
/// let snapcast = SnapcastClient::new(rpc);
///
/// for (id, group) in snapcast.groups().await? {
///     println!("{id}: {} playing {}", group.name, group.stream);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct SnapcastClient {
    rpc: RpcClient,
}

impl SnapcastClient {
    // ---

    pub fn new(rpc: RpcClient) -> Self {
        Self { rpc }
    }

    /// The underlying JSON-RPC client, for calls this type does not wrap.
    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    async fn status(&self) -> Result<ServerGetStatus> {
        self.rpc.call(methods::SERVER_GET_STATUS, ()).await
    }

    /// Host name of the server, or its IP address if it reports no name.
    pub async fn host(&self) -> Result<String> {
        // ---
        let host = self.status().await?.server.server.host;
        Ok(if host.name.is_empty() {
            host.ip
        } else {
            host.name
        })
    }

    /// All groups, keyed by group id.
    pub async fn groups(&self) -> Result<BTreeMap<String, Group>> {
        // ---
        let groups = self
            .status()
            .await?
            .server
            .groups
            .into_iter()
            .map(|status| (status.id.clone(), Group::from(status)))
            .collect();
        Ok(groups)
    }

    /// All streams, in server order.
    pub async fn streams(&self) -> Result<Vec<Stream>> {
        // ---
        let streams = self
            .status()
            .await?
            .server
            .streams
            .into_iter()
            .map(Stream::from)
            .collect();
        Ok(streams)
    }

    /// Control API version of the server.
    pub async fn rpc_version(&self) -> Result<RpcVersion> {
        self.rpc.call(methods::SERVER_GET_RPC_VERSION, ()).await
    }

    /// Rename a group.
    ///
    /// # Errors
    ///
    /// `RpcError::UnexpectedResult` if the server echoes a different name.
    pub async fn set_group_name(&self, group_id: &str, name: &str) -> Result<()> {
        // ---
        let params = GroupSetName { id: group_id, name };
        let result: GroupSetNameResult = self.rpc.call(methods::GROUP_SET_NAME, params).await?;

        if result.name != name {
            return Err(RpcError::UnexpectedResult(format!(
                "tried to set group name to {name}, but got {} instead",
                result.name
            )));
        }
        Ok(())
    }

    /// Switch a group to another stream.
    ///
    /// # Errors
    ///
    /// `RpcError::UnexpectedResult` if the server echoes a different stream.
    pub async fn set_group_stream(&self, group_id: &str, stream: &StreamId) -> Result<()> {
        // ---
        let params = GroupSetStream {
            id: group_id,
            stream_id: stream,
        };
        let result: GroupSetStreamResult =
            self.rpc.call(methods::GROUP_SET_STREAM, params).await?;

        if &result.stream_id != stream {
            return Err(RpcError::UnexpectedResult(format!(
                "tried to set stream to {stream}, but got {} instead",
                result.stream_id
            )));
        }
        Ok(())
    }

    /// Call `handler(group_id, stream_id)` whenever a group changes stream.
    ///
    /// Replaces any previous handler. Notifications whose params do not
    /// decode are logged and dropped.
    pub fn on_group_stream_changed<F>(&self, handler: F)
    where
        F: Fn(String, StreamId) + Send + Sync + Clone + 'static,
    {
        // ---
        self.rpc
            .set_notification_handler(methods::GROUP_ON_STREAM_CHANGED, move |params: Value| {
                let handler = handler.clone();
                async move {
                    match serde_json::from_value::<GroupStreamChanged>(params) {
                        Ok(changed) => handler(changed.id, changed.stream_id),
                        Err(_err) => log_warn!(
                            "could not decode {} notification: {_err}",
                            methods::GROUP_ON_STREAM_CHANGED
                        ),
                    }
                }
            });
    }

    /// Stop handling `Group.OnStreamChanged`.
    pub fn clear_group_stream_changed(&self) {
        self.rpc
            .clear_notification_handler(methods::GROUP_ON_STREAM_CHANGED);
    }

    /// Shut down the underlying connection. See [`RpcClient::close`].
    pub async fn close(&self) {
        self.rpc.close().await;
    }
}
