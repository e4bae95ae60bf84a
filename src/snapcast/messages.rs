use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a Snapserver stream (e.g. `"Spotify"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamId(pub String);

impl StreamId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StreamId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for StreamId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A group of speakers playing the same stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub id: String,
    pub name: String,
    pub stream: StreamId,
    pub speakers: Vec<Speaker>,
}

/// One Snapclient.
#[derive(Debug, Clone, PartialEq)]
pub struct Speaker {
    /// The client's id as reported by the server.
    pub name: String,
    pub connected: bool,
    pub volume: Volume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Volume {
    #[serde(default)]
    pub percent: u8,
    #[serde(default)]
    pub muted: bool,
}

/// An audio source known to the server.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    pub id: StreamId,
    /// `"idle"`, `"playing"` or `"unknown"`.
    pub status: String,
}

/// Control API version reported by `Server.GetRPCVersion`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct RpcVersion {
    #[serde(default)]
    pub major: u32,
    #[serde(default)]
    pub minor: u32,
    #[serde(default)]
    pub patch: u32,
}

impl fmt::Display for RpcVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

// Wire shapes. Fields the layer does not use are left out; serde ignores
// unknown members.

#[derive(Debug, Default, Deserialize)]
pub(super) struct HostInfo {
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct ClientConfig {
    #[serde(default)]
    pub volume: Volume,
}

#[derive(Debug, Deserialize)]
pub(super) struct ClientStatus {
    pub id: String,
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub config: ClientConfig,
}

#[derive(Debug, Deserialize)]
pub(super) struct GroupStatus {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub stream_id: StreamId,
    #[serde(default)]
    pub clients: Vec<ClientStatus>,
}

#[derive(Debug, Deserialize)]
pub(super) struct StreamStatus {
    pub id: StreamId,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct ServerInfo {
    #[serde(default)]
    pub host: HostInfo,
}

#[derive(Debug, Deserialize)]
pub(super) struct ServerState {
    #[serde(default)]
    pub groups: Vec<GroupStatus>,
    #[serde(default)]
    pub streams: Vec<StreamStatus>,
    #[serde(default)]
    pub server: ServerInfo,
}

/// Result of `Server.GetStatus`.
#[derive(Debug, Deserialize)]
pub(super) struct ServerGetStatus {
    pub server: ServerState,
}

#[derive(Debug, Serialize)]
pub(super) struct GroupSetName<'a> {
    pub id: &'a str,
    pub name: &'a str,
}

#[derive(Debug, Deserialize)]
pub(super) struct GroupSetNameResult {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub(super) struct GroupSetStream<'a> {
    pub id: &'a str,
    pub stream_id: &'a StreamId,
}

#[derive(Debug, Deserialize)]
pub(super) struct GroupSetStreamResult {
    pub stream_id: StreamId,
}

/// Params of `Group.OnStreamChanged`.
#[derive(Debug, Deserialize)]
pub(super) struct GroupStreamChanged {
    pub id: String,
    pub stream_id: StreamId,
}

impl From<GroupStatus> for Group {
    fn from(group: GroupStatus) -> Self {
        // ---
        let speakers = group
            .clients
            .into_iter()
            .map(|client| Speaker {
                name: client.id,
                connected: client.connected,
                volume: client.config.volume,
            })
            .collect();

        Self {
            id: group.id,
            name: group.name,
            stream: group.stream_id,
            speakers,
        }
    }
}

impl From<StreamStatus> for Stream {
    fn from(stream: StreamStatus) -> Self {
        Self {
            id: stream.id,
            status: stream.status,
        }
    }
}
