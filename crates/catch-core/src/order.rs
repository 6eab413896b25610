//! Order ledger and order summary
//!
//! The ledger maps fish keys to the number of pounds ordered. It knows
//! nothing about the inventory; [`OrderSummary`] joins the two at render
//! time, skipping lines whose fish has not loaded (or was deleted) and
//! apologising for fish that sold out.
//!
//! Totals use plain `f64` arithmetic, like the prices they are built from.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::format::{format_price, Locale};
use crate::inventory::Inventory;
use crate::models::FishKey;

/// Quantities ordered, keyed by fish
///
/// Every quantity present is at least 1. Lines iterate in key order; keys
/// minted by [`FishKey::generate`] are fixed-width timestamps, so that is
/// also the order the fish were added to the inventory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderLedger {
    lines: BTreeMap<FishKey, u32>,
}

impl OrderLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one to the quantity for `key` (starting at 1), returning the new quantity
    pub fn add(&mut self, key: &FishKey) -> u32 {
        let count = self.lines.entry(key.clone()).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }

    /// Drop the line for `key` entirely, returning whether it existed
    pub fn remove(&mut self, key: &FishKey) -> bool {
        self.lines.remove(key).is_some()
    }

    pub fn quantity(&self, key: &FishKey) -> Option<u32> {
        self.lines.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FishKey, u32)> {
        self.lines.iter().map(|(k, v)| (k, *v))
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Serialize the whole ledger as a JSON object
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.lines)
    }

    /// Parse a ledger written by [`to_json`](Self::to_json)
    ///
    /// Zero quantities are dropped so the ledger invariant holds even for
    /// hand-edited data.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut lines: BTreeMap<FishKey, u32> = serde_json::from_str(json)?;
        lines.retain(|_, count| *count > 0);
        Ok(Self { lines })
    }
}

/// One rendered line of an order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum OrderLine {
    /// Fish is available and counts toward the total
    Available {
        key: FishKey,
        name: String,
        count: u32,
        line_total: f64,
    },
    /// Fish sold out after it was ordered
    Unavailable { key: FishKey, name: String },
}

impl OrderLine {
    pub fn key(&self) -> &FishKey {
        match self {
            OrderLine::Available { key, .. } | OrderLine::Unavailable { key, .. } => key,
        }
    }

    /// Human-readable form of the line
    pub fn render(&self, locale: Locale) -> String {
        match self {
            OrderLine::Available {
                name,
                count,
                line_total,
                ..
            } => format!("{} lbs {}  {}", count, name, format_price(*line_total, locale)),
            OrderLine::Unavailable { name, .. } => {
                format!("Sorry {} is no longer available", name)
            }
        }
    }
}

/// Order lines and total, resolved against an inventory
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderSummary {
    pub lines: Vec<OrderLine>,
    pub total: f64,
}

impl OrderSummary {
    /// Join a ledger with the inventory it was placed against
    pub fn build(ledger: &OrderLedger, inventory: &Inventory) -> Self {
        let mut lines = Vec::with_capacity(ledger.len());
        let mut total = 0.0;

        for (key, count) in ledger.iter() {
            // Not loaded yet (or deleted): nothing to show
            let Some(fish) = inventory.get(key) else {
                continue;
            };

            if fish.is_available() {
                let line_total = f64::from(count) * fish.price;
                total += line_total;
                lines.push(OrderLine::Available {
                    key: key.clone(),
                    name: fish.name.clone(),
                    count,
                    line_total,
                });
            } else {
                lines.push(OrderLine::Unavailable {
                    key: key.clone(),
                    name: fish.name.clone(),
                });
            }
        }

        Self { lines, total }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Formatted total
    pub fn total_text(&self, locale: Locale) -> String {
        format_price(self.total, locale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::InventoryChange;
    use crate::models::{Fish, FishStatus};

    fn inventory_with(entries: &[(&str, Fish)]) -> Inventory {
        let mut inventory = Inventory::new();
        for (key, fish) in entries {
            inventory.apply(&InventoryChange::Put {
                key: FishKey::new(*key),
                fish: fish.clone(),
            });
        }
        inventory
    }

    #[test]
    fn test_add_twice_then_remove() {
        let mut ledger = OrderLedger::new();
        let key = FishKey::new("f1");

        assert_eq!(ledger.add(&key), 1);
        assert_eq!(ledger.add(&key), 2);
        assert_eq!(ledger.quantity(&key), Some(2));

        // Removal drops the line, it does not decrement
        assert!(ledger.remove(&key));
        assert_eq!(ledger.quantity(&key), None);
        assert!(ledger.is_empty());
        assert!(!ledger.remove(&key));
    }

    #[test]
    fn test_lines_follow_key_order() {
        let mut ledger = OrderLedger::new();
        let later = FishKey::new("fish1700000000500");
        let earlier = FishKey::new("fish1700000000100");
        ledger.add(&later);
        ledger.add(&earlier);

        let keys: Vec<&FishKey> = ledger.iter().map(|(key, _)| key).collect();
        assert_eq!(keys, vec![&earlier, &later]);
    }

    #[test]
    fn test_json_round_trip() {
        let mut ledger = OrderLedger::new();
        ledger.add(&FishKey::new("fish1"));
        ledger.add(&FishKey::new("fish2"));
        ledger.add(&FishKey::new("fish2"));

        let json = ledger.to_json().unwrap();
        assert_eq!(json, r#"{"fish1":1,"fish2":2}"#);
        assert_eq!(OrderLedger::from_json(&json).unwrap(), ledger);
    }

    #[test]
    fn test_from_json_drops_zero_quantities() {
        let ledger = OrderLedger::from_json(r#"{"fish1":0,"fish2":3}"#).unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.quantity(&FishKey::new("fish2")), Some(3));
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(OrderLedger::from_json("not json").is_err());
        assert!(OrderLedger::from_json(r#"{"fish1":-1}"#).is_err());
    }

    #[test]
    fn test_trout_scenario() {
        let mut inventory = inventory_with(&[("f1", Fish::new("Trout", 9.99))]);
        let mut ledger = OrderLedger::new();
        ledger.add(&FishKey::new("f1"));
        ledger.add(&FishKey::new("f1"));

        let summary = OrderSummary::build(&ledger, &inventory);
        assert_eq!(summary.lines.len(), 1);
        assert_eq!(summary.total_text(Locale::EnUs), "$19.98");
        assert_eq!(summary.lines[0].render(Locale::EnUs), "2 lbs Trout  $19.98");

        inventory.apply(&InventoryChange::Put {
            key: FishKey::new("f1"),
            fish: Fish::new("Trout", 9.99).with_status(FishStatus::Unavailable),
        });

        let summary = OrderSummary::build(&ledger, &inventory);
        assert_eq!(
            summary.lines[0].render(Locale::EnUs),
            "Sorry Trout is no longer available"
        );
        assert_eq!(summary.total, 0.0);
        assert_eq!(summary.total_text(Locale::EnUs), "$0.00");
    }

    #[test]
    fn test_missing_fish_is_skipped_not_fatal() {
        let inventory = inventory_with(&[("f1", Fish::new("Trout", 10.0))]);
        let mut ledger = OrderLedger::new();
        ledger.add(&FishKey::new("f0"));
        ledger.add(&FishKey::new("f1"));
        ledger.add(&FishKey::new("f2"));

        let summary = OrderSummary::build(&ledger, &inventory);
        assert_eq!(summary.lines.len(), 1);
        assert_eq!(summary.lines[0].key(), &FishKey::new("f1"));
        assert_eq!(summary.total, 10.0);
    }

    #[test]
    fn test_total_counts_only_available_lines() {
        let inventory = inventory_with(&[
            ("a", Fish::new("Cod", 4.0)),
            ("b", Fish::new("Eel", 7.5)),
            ("c", Fish::new("Tuna", 20.0).with_status(FishStatus::Unavailable)),
        ]);
        let mut ledger = OrderLedger::new();
        for key in ["a", "a", "a", "b", "c", "c"] {
            ledger.add(&FishKey::new(key));
        }

        let summary = OrderSummary::build(&ledger, &inventory);
        assert_eq!(summary.total, 3.0 * 4.0 + 7.5);

        // Dropping the sold-out fish from the inventory leaves the total alone
        let mut without_tuna = inventory.clone();
        without_tuna.apply(&InventoryChange::Remove {
            key: FishKey::new("c"),
        });
        assert_eq!(OrderSummary::build(&ledger, &without_tuna).total, summary.total);
    }
}
