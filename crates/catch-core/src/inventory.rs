//! Inventory record store
//!
//! In-memory map of fish keyed by [`FishKey`]. All mutations go through
//! [`InventoryChange`] so the exact same operation can be applied locally
//! and shipped to the realtime backend. Deletion is its own variant rather
//! than a null value written into the map.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{Fish, FishKey};

/// A single mutation of a store's inventory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum InventoryChange {
    /// Insert or wholesale-replace the fish at `key`
    Put { key: FishKey, fish: Fish },
    /// Delete the fish at `key`
    Remove { key: FishKey },
    /// Replace the entire inventory
    Replace { fishes: BTreeMap<FishKey, Fish> },
}

impl InventoryChange {
    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            InventoryChange::Put { .. } => "put",
            InventoryChange::Remove { .. } => "remove",
            InventoryChange::Replace { .. } => "replace",
        }
    }
}

/// Fish on the menu of one store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inventory {
    fishes: BTreeMap<FishKey, Fish>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(fishes: BTreeMap<FishKey, Fish>) -> Self {
        Self { fishes }
    }

    pub fn get(&self, key: &FishKey) -> Option<&Fish> {
        self.fishes.get(key)
    }

    pub fn contains(&self, key: &FishKey) -> bool {
        self.fishes.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fishes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fishes.is_empty()
    }

    /// Fish in key order (creation order for generated keys)
    pub fn iter(&self) -> impl Iterator<Item = (&FishKey, &Fish)> {
        self.fishes.iter()
    }

    pub fn as_map(&self) -> &BTreeMap<FishKey, Fish> {
        &self.fishes
    }

    /// Generate a key not used by any fish in this inventory
    pub fn next_key(&self) -> FishKey {
        FishKey::generate(|key| self.fishes.contains_key(key))
    }

    /// Apply a change, returning whether anything was different afterwards
    pub fn apply(&mut self, change: &InventoryChange) -> bool {
        match change {
            InventoryChange::Put { key, fish } => {
                self.fishes.insert(key.clone(), fish.clone()).as_ref() != Some(fish)
            }
            InventoryChange::Remove { key } => self.fishes.remove(key).is_some(),
            InventoryChange::Replace { fishes } => {
                if &self.fishes == fishes {
                    false
                } else {
                    self.fishes = fishes.clone();
                    true
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FishStatus;

    fn put(key: &str, fish: Fish) -> InventoryChange {
        InventoryChange::Put {
            key: FishKey::new(key),
            fish,
        }
    }

    #[test]
    fn test_put_inserts_and_replaces() {
        let mut inventory = Inventory::new();

        assert!(inventory.apply(&put("f1", Fish::new("Trout", 9.99))));
        assert_eq!(inventory.len(), 1);

        // Same record again is a no-op
        assert!(!inventory.apply(&put("f1", Fish::new("Trout", 9.99))));

        let sold_out = Fish::new("Trout", 9.99).with_status(FishStatus::Unavailable);
        assert!(inventory.apply(&put("f1", sold_out)));
        assert!(!inventory.get(&FishKey::new("f1")).unwrap().is_available());
    }

    #[test]
    fn test_remove_deletes_key() {
        let mut inventory = Inventory::new();
        inventory.apply(&put("f1", Fish::new("Trout", 9.99)));

        assert!(inventory.apply(&InventoryChange::Remove {
            key: FishKey::new("f1")
        }));
        assert!(!inventory.contains(&FishKey::new("f1")));

        // Removing again reports no change
        assert!(!inventory.apply(&InventoryChange::Remove {
            key: FishKey::new("f1")
        }));
    }

    #[test]
    fn test_replace_swaps_everything() {
        let mut inventory = Inventory::new();
        inventory.apply(&put("f1", Fish::new("Trout", 9.99)));

        let mut fishes = BTreeMap::new();
        fishes.insert(FishKey::new("f2"), Fish::new("Cod", 4.0));
        fishes.insert(FishKey::new("f3"), Fish::new("Eel", 7.5));

        assert!(inventory.apply(&InventoryChange::Replace { fishes }));
        assert_eq!(inventory.len(), 2);
        assert!(!inventory.contains(&FishKey::new("f1")));
    }

    #[test]
    fn test_next_key_is_unused() {
        let mut inventory = Inventory::new();
        let first = inventory.next_key();
        inventory.apply(&InventoryChange::Put {
            key: first.clone(),
            fish: Fish::new("Trout", 9.99),
        });

        let second = inventory.next_key();
        assert_ne!(first, second);
        assert!(!inventory.contains(&second));
    }

    #[test]
    fn test_change_wire_format() {
        let change = InventoryChange::Remove {
            key: FishKey::new("fish1"),
        };
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["op"], "remove");
        assert_eq!(json["key"], "fish1");
    }
}
