//! Opening a store session from configuration
//!
//! With sync enabled the inventory lives on the relay; otherwise in a tree
//! file under the data directory. Orders always go to the local SQLite
//! database, or stay in memory if it cannot be opened.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use catch_core::{
    Config, LocalStorage, MemoryRemote, RelayClient, RemoteStore, SessionOptions, SqliteStorage,
    StoreId, StoreSession,
};

/// How long to wait for the relay before working from local state
const SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(5);

/// A session plus the backend handles that need shutting down with it
pub struct OpenStore {
    session: StoreSession,
    relay: Option<Arc<RelayClient>>,
}

impl OpenStore {
    /// Open `store_id` and wait for its inventory to arrive
    pub async fn open(config: &Config, store_id: StoreId) -> Result<Self> {
        let mut store = Self::open_nowait(config, store_id)?;
        if !store.session.has_snapshot() {
            store.session.wait_for_snapshot(SNAPSHOT_TIMEOUT).await;
        }
        Ok(store)
    }

    /// Open `store_id` without waiting for the relay
    pub fn open_nowait(config: &Config, store_id: StoreId) -> Result<Self> {
        config
            .ensure_data_dir()
            .context("Failed to create data directory")?;

        let options = SessionOptions {
            collection: config.collection.clone(),
            locale: config.locale()?,
        };

        let (remote, relay): (Arc<dyn RemoteStore>, _) = match config.relay_url() {
            Some(url) => {
                let client = Arc::new(RelayClient::connect(url));
                (client.clone(), Some(client))
            }
            None => {
                let tree = MemoryRemote::open(&config.tree_path())
                    .with_context(|| format!("Failed to open {:?}", config.tree_path()))?;
                (Arc::new(tree), None)
            }
        };

        let storage: Option<Box<dyn LocalStorage>> =
            match SqliteStorage::open(&config.sqlite_path()) {
                Ok(storage) => Some(Box::new(storage)),
                Err(e) => {
                    warn!(
                        error = %e,
                        hint = e.recovery_suggestion().unwrap_or_default(),
                        "Order database unavailable, orders will not persist"
                    );
                    None
                }
            };

        Ok(Self {
            session: StoreSession::open(store_id, remote, storage, options),
            relay,
        })
    }

    /// Relay URL when syncing through a relay
    pub fn relay_url(&self) -> Option<&str> {
        self.relay.as_deref().map(RelayClient::url)
    }

    /// Release the subscription and flush writes to the relay
    ///
    /// Returns how many changes never reached an unreachable relay.
    pub async fn close(self) -> usize {
        self.session.close();
        match self.relay {
            Some(relay) => relay.shutdown().await,
            None => 0,
        }
    }
}

/// Stores this device has an order for, most recently touched first
pub fn recent_stores(config: &Config, limit: usize) -> Vec<String> {
    let keys = SqliteStorage::open(&config.sqlite_path()).and_then(|storage| storage.keys());
    match keys {
        Ok(keys) => keys.into_iter().take(limit).collect(),
        Err(e) => {
            debug!(error = %e, "No recent stores");
            Vec::new()
        }
    }
}

impl Deref for OpenStore {
    type Target = StoreSession;

    fn deref(&self) -> &StoreSession {
        &self.session
    }
}

impl DerefMut for OpenStore {
    fn deref_mut(&mut self) -> &mut StoreSession {
        &mut self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catch_core::{Fish, SyncHealth};
    use tempfile::TempDir;

    fn test_config(dir: &TempDir) -> Config {
        Config {
            data_dir: dir.path().to_path_buf(),
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_local_tree_persists_between_opens() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let store_id = StoreId::parse("quiet-harbor").unwrap();

        let mut store = OpenStore::open(&config, store_id.clone()).await.unwrap();
        assert_eq!(store.health().sync, SyncHealth::Live);
        let key = store.add_fish(Fish::new("Trout", 9.99));
        store.add_to_order(&key);
        store.close().await;

        let store = OpenStore::open(&config, store_id).await.unwrap();
        assert_eq!(store.fish(&key).map(|f| f.name.as_str()), Some("Trout"));
        assert_eq!(store.ledger().quantity(&key), Some(1));
        assert!(store.health().ledger_persistent);
        assert!(store.relay_url().is_none());
        assert_eq!(store.close().await, 0);
    }

    #[tokio::test]
    async fn test_unreachable_relay_reports_undelivered_changes() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let dir = TempDir::new().unwrap();
        let config = Config {
            sync_enabled: true,
            sync_url: Some(format!("ws://{}", addr)),
            ..test_config(&dir)
        };

        let mut store =
            OpenStore::open_nowait(&config, StoreId::parse("quiet-harbor").unwrap()).unwrap();
        assert!(store.relay_url().is_some());
        store.add_fish(Fish::new("Trout", 9.99));
        store.add_fish(Fish::new("Cod", 4.5));

        let dropped = tokio::time::timeout(Duration::from_secs(5), store.close())
            .await
            .unwrap();
        assert_eq!(dropped, 2);
    }

    #[tokio::test]
    async fn test_recent_stores_most_recent_first() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        assert!(recent_stores(&config, 5).is_empty());

        for name in ["quiet-harbor", "blue-whale-7"] {
            let mut store = OpenStore::open(&config, StoreId::parse(name).unwrap())
                .await
                .unwrap();
            store.add_to_order(&catch_core::FishKey::new("fish1"));
            store.close().await;
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        assert_eq!(recent_stores(&config, 5), vec!["blue-whale-7", "quiet-harbor"]);
        assert_eq!(recent_stores(&config, 1), vec!["blue-whale-7"]);
    }

    #[tokio::test]
    async fn test_bad_locale_is_rejected() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            locale: "xx-XX".to_string(),
            ..test_config(&dir)
        };

        let result = OpenStore::open(&config, StoreId::parse("a").unwrap()).await;
        assert!(result.is_err());
    }
}
