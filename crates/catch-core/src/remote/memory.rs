//! In-process realtime tree
//!
//! Holds every path's fish map behind a mutex and fans each write out to the
//! subscribers of that path. Cloning shares the same tree, so two sessions
//! holding clones behave like two browsers on the same backend.
//!
//! With [`MemoryRemote::open`] the tree is loaded from and saved to a JSON
//! file after every write, so a local-only setup keeps its inventory.

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{RemoteEvent, RemoteStore, Subscription, SubscriptionId};
use crate::error::SyncError;
use crate::inventory::{Inventory, InventoryChange};
use crate::models::{Fish, FishKey};
use crate::storage::persistence::{atomic_write, read_optional};

type PathContents = BTreeMap<FishKey, Fish>;

struct Subscriber {
    path: String,
    tx: mpsc::UnboundedSender<RemoteEvent>,
}

#[derive(Default)]
struct Tree {
    paths: BTreeMap<String, Inventory>,
    subscribers: HashMap<SubscriptionId, Subscriber>,
    next_id: SubscriptionId,
    file: Option<PathBuf>,
}

impl Tree {
    fn save(&self) -> Result<(), SyncError> {
        let Some(ref file) = self.file else {
            return Ok(());
        };

        let data: BTreeMap<&str, &PathContents> = self
            .paths
            .iter()
            .map(|(path, inventory)| (path.as_str(), inventory.as_map()))
            .collect();

        let json = serde_json::to_vec_pretty(&data).map_err(io::Error::from)?;
        atomic_write(file, &json)?;
        Ok(())
    }
}

/// Shared in-memory realtime tree
#[derive(Clone, Default)]
pub struct MemoryRemote {
    inner: Arc<Mutex<Tree>>,
}

impl MemoryRemote {
    /// Empty tree that lives only as long as its clones
    pub fn new() -> Self {
        Self::default()
    }

    /// Tree persisted to `file` (created on first write if missing)
    pub fn open(file: &Path) -> Result<Self, SyncError> {
        let mut tree = Tree {
            file: Some(file.to_path_buf()),
            ..Tree::default()
        };

        if let Some(bytes) = read_optional(file)? {
            let data: BTreeMap<String, PathContents> =
                serde_json::from_slice(&bytes).map_err(io::Error::from)?;
            debug!(file = %file.display(), paths = data.len(), "Loaded realtime tree");
            tree.paths = data
                .into_iter()
                .map(|(path, fishes)| (path, Inventory::from_map(fishes)))
                .collect();
        }

        Ok(Self {
            inner: Arc::new(Mutex::new(tree)),
        })
    }

    /// Current contents of `path`
    pub fn snapshot(&self, path: &str) -> PathContents {
        self.lock()
            .paths
            .get(path)
            .map(|inventory| inventory.as_map().clone())
            .unwrap_or_default()
    }

    /// Number of live subscriptions on `path`
    pub fn subscriber_count(&self, path: &str) -> usize {
        self.lock()
            .subscribers
            .values()
            .filter(|sub| sub.path == path)
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, Tree> {
        lock_tree(&self.inner)
    }
}

fn lock_tree(tree: &Mutex<Tree>) -> MutexGuard<'_, Tree> {
    // A panic while holding the lock leaves the map itself intact
    tree.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn release(tree: &Weak<Mutex<Tree>>, id: SubscriptionId) {
    if let Some(tree) = tree.upgrade() {
        if lock_tree(&tree).subscribers.remove(&id).is_some() {
            debug!(id, "Released subscription");
        }
    }
}

impl RemoteStore for MemoryRemote {
    fn subscribe(&self, path: &str) -> Result<Subscription, SyncError> {
        let (tx, rx) = mpsc::unbounded_channel();

        let id = {
            let mut tree = self.lock();
            let id = tree.next_id;
            tree.next_id += 1;

            let contents = tree
                .paths
                .get(path)
                .map(|inventory| inventory.as_map().clone())
                .unwrap_or_default();
            // Receiver is alive, the send cannot fail
            let _ = tx.send(RemoteEvent::Snapshot(contents));

            tree.subscribers.insert(
                id,
                Subscriber {
                    path: path.to_string(),
                    tx,
                },
            );
            id
        };

        debug!(id, path, "Subscribed");
        let weak = Arc::downgrade(&self.inner);
        Ok(Subscription::new(id, path, rx, move |id| release(&weak, id)))
    }

    fn write(&self, path: &str, change: &InventoryChange) -> Result<(), SyncError> {
        let mut tree = self.lock();

        tree.paths
            .entry(path.to_string())
            .or_default()
            .apply(change);

        let event = RemoteEvent::for_change(change);
        tree.subscribers.retain(|id, sub| {
            if sub.path != path {
                return true;
            }
            let delivered = sub.tx.send(event.clone()).is_ok();
            if !delivered {
                debug!(id, "Dropping closed subscriber");
            }
            delivered
        });

        if let Err(e) = tree.save() {
            warn!(error = %e, "Failed to persist realtime tree");
            return Err(e);
        }

        Ok(())
    }
}
