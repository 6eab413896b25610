//! Realtime remote store
//!
//! The inventory of each store lives in a shared tree addressed by path
//! (`<storeId>/<collection>`). Clients subscribe to a path and receive a
//! [`RemoteEvent::Snapshot`] first, then incremental events for every write
//! made by anyone, their own writes included.
//!
//! Backends:
//! - [`MemoryRemote`]: in-process tree, optionally backed by a JSON file
//! - [`RelayClient`]: WebSocket client talking to a relay server
//! - [`relay::serve`]: relay server exposing a [`MemoryRemote`] over WebSocket

pub mod client;
pub mod memory;
pub mod message;
pub mod relay;

use std::collections::BTreeMap;
use std::fmt;

use tokio::sync::mpsc;

use crate::error::SyncError;
use crate::inventory::InventoryChange;
use crate::models::{Fish, FishKey, StoreId};

pub use client::{RelayClient, RelayConfig};
pub use memory::MemoryRemote;

/// Collection name used when none is configured
pub const DEFAULT_COLLECTION: &str = "fishes";

/// Identifier of a live subscription within one backend
pub type SubscriptionId = u64;

/// Path of a store's inventory in the remote tree
pub fn inventory_path(store: &StoreId, collection: &str) -> String {
    format!("{}/{}", store, collection)
}

/// State of the link to the remote backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Not connected, will retry
    Disconnected,
    /// Attempting to connect
    Connecting,
    /// Connected and subscribed
    Connected,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something that happened at a subscribed path
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteEvent {
    /// Full contents of the path; replaces whatever the listener had
    Snapshot(BTreeMap<FishKey, Fish>),
    /// A fish was written
    Put { key: FishKey, fish: Fish },
    /// A fish was deleted
    Removed { key: FishKey },
    /// Link state changed
    Status(ConnectionStatus),
    /// The backend reported a problem
    Error(String),
}

impl RemoteEvent {
    /// Events a tree emits for a change applied at a path
    pub fn for_change(change: &InventoryChange) -> Self {
        match change {
            InventoryChange::Put { key, fish } => RemoteEvent::Put {
                key: key.clone(),
                fish: fish.clone(),
            },
            InventoryChange::Remove { key } => RemoteEvent::Removed { key: key.clone() },
            InventoryChange::Replace { fishes } => RemoteEvent::Snapshot(fishes.clone()),
        }
    }
}

type ReleaseFn = Box<dyn FnOnce(SubscriptionId) + Send>;

/// A live listener on one path
///
/// Dropping the subscription deregisters it from the backend. Release
/// happens exactly once, whether through [`Subscription::release`] or drop.
pub struct Subscription {
    id: SubscriptionId,
    path: String,
    events: mpsc::UnboundedReceiver<RemoteEvent>,
    release: Option<ReleaseFn>,
}

impl Subscription {
    pub fn new(
        id: SubscriptionId,
        path: impl Into<String>,
        events: mpsc::UnboundedReceiver<RemoteEvent>,
        release: impl FnOnce(SubscriptionId) + Send + 'static,
    ) -> Self {
        Self {
            id,
            path: path.into(),
            events,
            release: Some(Box::new(release)),
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Next event if one is already queued
    pub fn try_next(&mut self) -> Option<RemoteEvent> {
        self.events.try_recv().ok()
    }

    /// Wait for the next event; `None` once the backend is gone
    pub async fn next(&mut self) -> Option<RemoteEvent> {
        self.events.recv().await
    }

    /// Deregister now instead of waiting for drop
    pub fn release(mut self) {
        self.do_release();
    }

    fn do_release(&mut self) {
        if let Some(release) = self.release.take() {
            release(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.do_release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("released", &self.release.is_none())
            .finish()
    }
}

/// A realtime tree the inventory is mirrored to
pub trait RemoteStore: Send + Sync {
    /// Start listening at `path`; the first event is a snapshot
    fn subscribe(&self, path: &str) -> Result<Subscription, SyncError>;

    /// Apply a change at `path` and notify every subscriber
    fn write(&self, path: &str, change: &InventoryChange) -> Result<(), SyncError>;

    /// Current link state, for backends that have one
    fn status(&self) -> ConnectionStatus {
        ConnectionStatus::Connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_inventory_path() {
        let store = StoreId::parse("blue-whale-7").unwrap();
        assert_eq!(inventory_path(&store, DEFAULT_COLLECTION), "blue-whale-7/fishes");
    }

    #[test]
    fn test_release_runs_once() {
        let count = Arc::new(AtomicUsize::new(0));
        let (_tx, rx) = mpsc::unbounded_channel();

        let counter = count.clone();
        let sub = Subscription::new(7, "a/fishes", rx, move |id| {
            assert_eq!(id, 7);
            counter.fetch_add(1, Ordering::SeqCst);
        });

        sub.release();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_releases() {
        let count = Arc::new(AtomicUsize::new(0));
        let (_tx, rx) = mpsc::unbounded_channel();

        let counter = count.clone();
        {
            let _sub = Subscription::new(1, "a/fishes", rx, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_event_for_change() {
        let change = InventoryChange::Remove {
            key: FishKey::new("fish1"),
        };
        assert_eq!(
            RemoteEvent::for_change(&change),
            RemoteEvent::Removed {
                key: FishKey::new("fish1")
            }
        );
    }
}
