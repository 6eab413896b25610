//! Store session
//!
//! A [`StoreSession`] owns everything about the one store a view is showing:
//! its inventory (mirrored two-way with the remote tree), its order ledger
//! (mirrored to local storage) and the health of both links.
//!
//! ## Usage
//!
//! ```ignore
//! let store = StoreId::parse("blue-whale-7")?;
//! let mut session = StoreSession::open(store, remote, Some(storage), SessionOptions::default());
//!
//! let key = session.add_fish(Fish::new("Trout", 9.99));
//! session.add_to_order(&key);
//! println!("{}", session.summary().total_text(session.locale()));
//! ```
//!
//! Neither backend can make an intent fail. A remote write error reports
//! [`SyncHealth`] as degraded until a later write succeeds; a storage error
//! turns the ledger into an in-memory one for the rest of the session.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::ValidationError;
use crate::format::Locale;
use crate::inventory::{Inventory, InventoryChange};
use crate::models::{Fish, FishField, FishKey, StoreId};
use crate::order::{OrderLedger, OrderSummary};
use crate::remote::{
    inventory_path, ConnectionStatus, RemoteEvent, RemoteStore, Subscription, DEFAULT_COLLECTION,
};
use crate::sample::sample_fishes;
use crate::storage::LocalStorage;

/// Settings for opening a session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Collection under the store id holding the inventory
    pub collection: String,
    /// Locale used for prices
    pub locale: Locale,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            locale: Locale::default(),
        }
    }
}

/// State of the inventory's link to the remote tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncHealth {
    /// Subscribed, waiting for the first snapshot
    Connecting,
    /// Snapshot received and the link is up
    Live,
    /// Working from local state only
    Degraded(String),
}

impl SyncHealth {
    pub fn is_live(&self) -> bool {
        matches!(self, SyncHealth::Live)
    }
}

/// Combined health of a session's backends
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHealth {
    pub sync: SyncHealth,
    /// Whether order changes are reaching local storage
    pub ledger_persistent: bool,
}

/// One open store
pub struct StoreSession {
    store_id: StoreId,
    path: String,
    options: SessionOptions,
    remote: Arc<dyn RemoteStore>,
    subscription: Option<Subscription>,
    storage: Option<Box<dyn LocalStorage>>,
    inventory: Inventory,
    ledger: OrderLedger,
    snapshot_received: bool,
    sync: SyncHealth,
    /// Set by a failed remote write, cleared by the next one that succeeds
    write_error: Option<String>,
}

impl StoreSession {
    /// Open `store_id`: restore its order and subscribe to its inventory
    ///
    /// Pass `None` for `storage` to keep the order in memory only.
    pub fn open(
        store_id: StoreId,
        remote: Arc<dyn RemoteStore>,
        storage: Option<Box<dyn LocalStorage>>,
        options: SessionOptions,
    ) -> Self {
        let path = inventory_path(&store_id, &options.collection);
        let mut storage = storage;
        let ledger = load_ledger(&store_id, &mut storage);

        let (subscription, sync) = match remote.subscribe(&path) {
            Ok(sub) => (Some(sub), SyncHealth::Connecting),
            Err(e) => {
                warn!(path = %path, error = %e, "Failed to subscribe to inventory");
                (None, SyncHealth::Degraded(e.summary()))
            }
        };

        info!(store = %store_id, lines = ledger.len(), "Opened store session");

        let mut session = Self {
            store_id,
            path,
            options,
            remote,
            subscription,
            storage,
            inventory: Inventory::new(),
            ledger,
            snapshot_received: false,
            sync,
            write_error: None,
        };
        // In-process backends deliver the snapshot synchronously
        session.poll_remote();
        session
    }

    pub fn store_id(&self) -> &StoreId {
        &self.store_id
    }

    /// Remote path the inventory is mirrored to
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn locale(&self) -> Locale {
        self.options.locale
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    /// Fish in key order
    pub fn fishes(&self) -> impl Iterator<Item = (&FishKey, &Fish)> {
        self.inventory.iter()
    }

    pub fn fish(&self, key: &FishKey) -> Option<&Fish> {
        self.inventory.get(key)
    }

    pub fn ledger(&self) -> &OrderLedger {
        &self.ledger
    }

    /// Order lines and total against the current inventory
    pub fn summary(&self) -> OrderSummary {
        OrderSummary::build(&self.ledger, &self.inventory)
    }

    pub fn health(&self) -> SessionHealth {
        let sync = match &self.write_error {
            Some(reason) => SyncHealth::Degraded(reason.clone()),
            None => self.sync.clone(),
        };
        SessionHealth {
            sync,
            ledger_persistent: self.storage.is_some(),
        }
    }

    /// Link state reported by the remote backend
    pub fn link_status(&self) -> ConnectionStatus {
        self.remote.status()
    }

    /// Whether the remote contents have arrived at least once
    pub fn has_snapshot(&self) -> bool {
        self.snapshot_received
    }

    // ==================== Inventory Intents ====================

    /// Add a fish under a freshly generated key
    pub fn add_fish(&mut self, fish: Fish) -> FishKey {
        let key = self.inventory.next_key();
        debug!(key = %key, name = %fish.name, "Adding fish");
        self.apply_local(InventoryChange::Put {
            key: key.clone(),
            fish,
        });
        key
    }

    /// Replace the fish at `key` wholesale
    pub fn update_fish(&mut self, key: &FishKey, fish: Fish) {
        self.apply_local(InventoryChange::Put {
            key: key.clone(),
            fish,
        });
    }

    /// Overwrite one field of an existing fish from form text
    pub fn update_fish_field(
        &mut self,
        key: &FishKey,
        field: FishField,
        raw: &str,
    ) -> Result<(), ValidationError> {
        let current = self
            .inventory
            .get(key)
            .ok_or_else(|| ValidationError::UnknownFish {
                key: key.to_string(),
            })?;
        let updated = current.with_field(field, raw)?;
        self.update_fish(key, updated);
        Ok(())
    }

    /// Delete the fish at `key`
    pub fn delete_fish(&mut self, key: &FishKey) {
        debug!(key = %key, "Deleting fish");
        self.apply_local(InventoryChange::Remove { key: key.clone() });
    }

    /// Replace the inventory with the bundled sample fish
    pub fn load_samples(&mut self) {
        info!(store = %self.store_id, "Loading sample fishes");
        self.apply_local(InventoryChange::Replace {
            fishes: sample_fishes(),
        });
    }

    fn apply_local(&mut self, change: InventoryChange) {
        self.inventory.apply(&change);

        match self.remote.write(&self.path, &change) {
            Ok(()) => {
                if self.write_error.take().is_some() {
                    info!(path = %self.path, "Remote writes recovered");
                }
            }
            Err(e) => {
                warn!(path = %self.path, op = change.kind(), error = %e, "Remote write failed");
                self.write_error = Some(e.summary());
            }
        }
    }

    // ==================== Order Intents ====================

    /// Add one pound of `key` to the order, returning the new quantity
    pub fn add_to_order(&mut self, key: &FishKey) -> u32 {
        let count = self.ledger.add(key);
        self.persist_ledger();
        count
    }

    /// Drop the order line for `key`
    pub fn remove_from_order(&mut self, key: &FishKey) -> bool {
        let removed = self.ledger.remove(key);
        if removed {
            self.persist_ledger();
        }
        removed
    }

    /// Empty the order
    pub fn clear_order(&mut self) {
        self.ledger.clear();
        self.persist_ledger();
    }

    fn persist_ledger(&mut self) {
        let Some(storage) = self.storage.as_mut() else {
            return;
        };

        let result = self
            .ledger
            .to_json()
            .map_err(|e| e.to_string())
            .and_then(|json| {
                storage
                    .set(self.store_id.as_str(), &json)
                    .map_err(|e| e.to_string())
            });

        if let Err(e) = result {
            warn!(store = %self.store_id, error = %e, "Order will not persist this session");
            self.storage = None;
        }
    }

    // ==================== Remote Events ====================

    /// Apply every event already queued, returning how many touched the inventory
    pub fn poll_remote(&mut self) -> usize {
        let mut applied = 0;
        while let Some(event) = self.subscription.as_mut().and_then(|sub| sub.try_next()) {
            if self.apply_event(event) {
                applied += 1;
            }
        }
        applied
    }

    /// Wait until the first snapshot arrives, up to `timeout`
    pub async fn wait_for_snapshot(&mut self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;

        while !self.snapshot_received {
            let next = match self.subscription.as_mut() {
                Some(sub) => tokio::time::timeout_at(deadline, sub.next()).await,
                None => return false,
            };

            match next {
                Ok(Some(event)) => {
                    self.apply_event(event);
                }
                Ok(None) | Err(_) => return false,
            }
        }

        true
    }

    fn apply_event(&mut self, event: RemoteEvent) -> bool {
        match event {
            RemoteEvent::Snapshot(fishes) => {
                debug!(path = %self.path, count = fishes.len(), "Inventory snapshot");
                self.snapshot_received = true;
                self.sync = SyncHealth::Live;
                self.inventory.apply(&InventoryChange::Replace { fishes });
                true
            }
            RemoteEvent::Put { key, fish } => {
                self.inventory.apply(&InventoryChange::Put { key, fish });
                true
            }
            RemoteEvent::Removed { key } => {
                self.inventory.apply(&InventoryChange::Remove { key });
                true
            }
            RemoteEvent::Status(status) => {
                self.sync = match status {
                    ConnectionStatus::Connected if self.snapshot_received => SyncHealth::Live,
                    ConnectionStatus::Connected | ConnectionStatus::Connecting => {
                        SyncHealth::Connecting
                    }
                    ConnectionStatus::Disconnected => SyncHealth::Degraded("offline".to_string()),
                };
                false
            }
            RemoteEvent::Error(message) => {
                warn!(path = %self.path, %message, "Remote error");
                self.sync = SyncHealth::Degraded(message);
                false
            }
        }
    }

    /// Release the subscription and end the session
    pub fn close(mut self) {
        if let Some(sub) = self.subscription.take() {
            sub.release();
        }
        debug!(store = %self.store_id, "Closed store session");
    }
}

fn load_ledger(store_id: &StoreId, storage: &mut Option<Box<dyn LocalStorage>>) -> OrderLedger {
    let Some(backend) = storage.as_ref() else {
        return OrderLedger::new();
    };

    match backend.get(store_id.as_str()) {
        Ok(Some(json)) => match OrderLedger::from_json(&json) {
            Ok(ledger) => ledger,
            Err(e) => {
                warn!(store = %store_id, error = %e, "Ignoring unreadable stored order");
                OrderLedger::new()
            }
        },
        Ok(None) => OrderLedger::new(),
        Err(e) => {
            warn!(store = %store_id, error = %e, "Local storage unavailable, order will not persist");
            *storage = None;
            OrderLedger::new()
        }
    }
}
