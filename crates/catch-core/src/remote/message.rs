//! Relay protocol message types
//!
//! Messages exchanged between [`RelayClient`](super::RelayClient) and the
//! relay server, CBOR-encoded in binary WebSocket frames.
//!
//! ```text
//! client                          relay
//!   | -- hello ------------------> |
//!   | <------------------ welcome -- |
//!   | -- subscribe {id, path} ---> |
//!   | <--------- snapshot {id} ---- |
//!   | -- write {path, change} ---> |
//!   | <-------------- put {id} ---- |   (every subscriber, writer included)
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{RemoteEvent, SubscriptionId};
use crate::error::SyncError;
use crate::inventory::InventoryChange;
use crate::models::{Fish, FishKey};

/// Peer ID for identifying a client
pub type PeerId = String;

/// Protocol version
pub const PROTOCOL_V1: &str = "1";

/// Messages sent to the relay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Handshake
    Hello {
        #[serde(rename = "peerId")]
        peer_id: PeerId,
        version: String,
    },

    /// Start listening at a path under a client-chosen id
    Subscribe { id: SubscriptionId, path: String },

    /// Stop listening
    Unsubscribe { id: SubscriptionId },

    /// Apply a change at a path
    Write {
        path: String,
        change: InventoryChange,
    },
}

/// Messages sent by the relay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Handshake response
    Welcome {
        #[serde(rename = "serverId")]
        server_id: PeerId,
        version: String,
    },

    /// Full contents of a subscribed path
    Snapshot {
        id: SubscriptionId,
        fishes: BTreeMap<FishKey, Fish>,
    },

    /// A fish was written at a subscribed path
    Put {
        id: SubscriptionId,
        key: FishKey,
        fish: Fish,
    },

    /// A fish was deleted at a subscribed path
    Removed { id: SubscriptionId, key: FishKey },

    /// Request failed
    Error { message: String },
}

impl ClientMessage {
    /// Create a hello message
    pub fn hello(peer_id: &str) -> Self {
        ClientMessage::Hello {
            peer_id: peer_id.to_string(),
            version: PROTOCOL_V1.to_string(),
        }
    }

    /// Encode message to CBOR bytes
    pub fn encode(&self) -> Result<Vec<u8>, SyncError> {
        encode(self)
    }

    /// Decode message from CBOR bytes
    pub fn decode(bytes: &[u8]) -> Result<Self, SyncError> {
        ciborium::from_reader(bytes).map_err(|e| SyncError::Protocol(e.to_string()))
    }
}

impl ServerMessage {
    /// Create a welcome message
    pub fn welcome(server_id: &str) -> Self {
        ServerMessage::Welcome {
            server_id: server_id.to_string(),
            version: PROTOCOL_V1.to_string(),
        }
    }

    /// Wrap a tree event for the subscription it belongs to
    ///
    /// Status events are local to each side and have no wire form.
    pub fn from_event(id: SubscriptionId, event: RemoteEvent) -> Option<Self> {
        match event {
            RemoteEvent::Snapshot(fishes) => Some(ServerMessage::Snapshot { id, fishes }),
            RemoteEvent::Put { key, fish } => Some(ServerMessage::Put { id, key, fish }),
            RemoteEvent::Removed { key } => Some(ServerMessage::Removed { id, key }),
            RemoteEvent::Error(message) => Some(ServerMessage::Error { message }),
            RemoteEvent::Status(_) => None,
        }
    }

    /// Split into the subscription it targets and the event to deliver
    pub fn into_event(self) -> Option<(SubscriptionId, RemoteEvent)> {
        match self {
            ServerMessage::Snapshot { id, fishes } => Some((id, RemoteEvent::Snapshot(fishes))),
            ServerMessage::Put { id, key, fish } => Some((id, RemoteEvent::Put { key, fish })),
            ServerMessage::Removed { id, key } => Some((id, RemoteEvent::Removed { key })),
            ServerMessage::Welcome { .. } | ServerMessage::Error { .. } => None,
        }
    }

    /// Encode message to CBOR bytes
    pub fn encode(&self) -> Result<Vec<u8>, SyncError> {
        encode(self)
    }

    /// Decode message from CBOR bytes
    pub fn decode(bytes: &[u8]) -> Result<Self, SyncError> {
        ciborium::from_reader(bytes).map_err(|e| SyncError::Protocol(e.to_string()))
    }
}

fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>, SyncError> {
    let mut bytes = Vec::new();
    ciborium::into_writer(msg, &mut bytes).map_err(|e| SyncError::Encode(e.to_string()))?;
    Ok(bytes)
}
