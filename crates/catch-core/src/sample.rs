//! Bundled sample inventory for seeding a demo store

use std::collections::BTreeMap;

use crate::models::{Fish, FishKey};

const SAMPLE_FISHES: &str = include_str!("../data/sample-fishes.json");

/// The sample fish set, keyed `fish1` through `fish9`
pub fn sample_fishes() -> BTreeMap<FishKey, Fish> {
    serde_json::from_str(SAMPLE_FISHES).expect("bundled sample fishes are valid JSON")
}
