//! Snapserver JSON-RPC method and notification names.

pub const CLIENT_GET_STATUS: &str = "Client.GetStatus";
pub const CLIENT_SET_LATENCY: &str = "Client.SetLatency";
pub const CLIENT_SET_NAME: &str = "Client.SetName";
pub const CLIENT_SET_VOLUME: &str = "Client.SetVolume";

pub const GROUP_GET_STATUS: &str = "Group.GetStatus";
pub const GROUP_SET_CLIENTS: &str = "Group.SetClients";
pub const GROUP_SET_MUTE: &str = "Group.SetMute";
pub const GROUP_SET_NAME: &str = "Group.SetName";
pub const GROUP_SET_STREAM: &str = "Group.SetStream";

pub const SERVER_GET_RPC_VERSION: &str = "Server.GetRPCVersion";
pub const SERVER_GET_STATUS: &str = "Server.GetStatus";
pub const SERVER_DELETE_CLIENT: &str = "Server.DeleteClient";

pub const STREAM_ADD_STREAM: &str = "Stream.AddStream";
pub const STREAM_REMOVE_STREAM: &str = "Stream.RemoveStream";

// Notifications

pub const CLIENT_ON_CONNECT: &str = "Client.OnConnect";
pub const CLIENT_ON_DISCONNECT: &str = "Client.OnDisconnect";
pub const CLIENT_ON_VOLUME_CHANGED: &str = "Client.OnVolumeChanged";
pub const CLIENT_ON_LATENCY_CHANGED: &str = "Client.OnLatencyChanged";
pub const CLIENT_ON_NAME_CHANGED: &str = "Client.OnNameChanged";
pub const GROUP_ON_MUTE: &str = "Group.OnMute";
pub const GROUP_ON_STREAM_CHANGED: &str = "Group.OnStreamChanged";
pub const GROUP_ON_NAME_CHANGED: &str = "Group.OnNameChanged";
pub const STREAM_ON_UPDATE: &str = "Stream.OnUpdate";
pub const SERVER_ON_UPDATE: &str = "Server.OnUpdate";
