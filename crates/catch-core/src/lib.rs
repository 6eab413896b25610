//! Catch of the Day Core Library
//!
//! This crate provides the core functionality for Catch of the Day, a small
//! fish market storefront: sellers manage a store's inventory, customers
//! build an order against it.
//!
//! # Architecture
//!
//! - **Remote tree**: source of truth for each store's inventory, shared
//!   live between everyone looking at the store
//! - **Local storage**: this device's order for each store (SQLite)
//!
//! A [`StoreSession`] binds the two for one store and is what views talk to.
//!
//! # Quick Start
//!
//! ```text
//! let remote = Arc::new(MemoryRemote::new());
//! let storage = SqliteStorage::open(&config.sqlite_path())?;
//! let mut session = StoreSession::open(store_id, remote, Some(Box::new(storage)), options);
//!
//! let key = session.add_fish(Fish::new("Trout", 9.99));
//! session.add_to_order(&key);
//! let summary = session.summary();
//! ```
//!
//! # Modules
//!
//! - `session`: One open store (main entry point)
//! - `models`: Fish, keys and store ids
//! - `inventory`: Inventory map and its change operations
//! - `order`: Order ledger and rendered order summary
//! - `format`: Locale-aware price formatting
//! - `names`: Random store names
//! - `remote`: Realtime tree backends and the relay
//! - `storage`: Local key/value storage
//! - `config`: Application configuration

pub mod config;
pub mod error;
pub mod format;
pub mod inventory;
pub mod models;
pub mod names;
pub mod order;
pub mod remote;
pub mod sample;
pub mod session;
pub mod storage;

pub use config::Config;
pub use error::{SyncError, ValidationError};
pub use format::{format_price, Locale};
pub use inventory::{Inventory, InventoryChange};
pub use models::{Fish, FishField, FishForm, FishKey, FishStatus, StoreId};
pub use names::fun_name;
pub use order::{OrderLedger, OrderLine, OrderSummary};
pub use remote::{MemoryRemote, RelayClient, RemoteEvent, RemoteStore, Subscription};
pub use session::{SessionHealth, SessionOptions, StoreSession, SyncHealth};
pub use storage::{LocalStorage, MemoryStorage, SqliteStorage, StorageError};
