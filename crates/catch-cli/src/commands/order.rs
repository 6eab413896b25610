//! Order command handlers

use anyhow::{bail, Result};

use catch_core::{FishKey, StoreSession};

use super::resolve_fish;
use crate::output::Output;

/// Show the order and its total
pub fn show(store: &StoreSession, output: &Output) -> Result<()> {
    output.print_order(&store.summary(), store.locale());
    Ok(())
}

/// Add a pound of a fish to the order
pub fn add(store: &mut StoreSession, key: String, output: &Output) -> Result<()> {
    let key = resolve_fish(store, &key)?;

    let name = match store.fish(&key) {
        Some(fish) if fish.is_available() => fish.name.clone(),
        Some(fish) => bail!("{} is sold out", fish.name),
        None => bail!("No fish found matching: {}", key),
    };

    let count = store.add_to_order(&key);

    output.success(&format!("{} lbs {} in your order", count, name));

    Ok(())
}

/// Remove a fish from the order
pub fn remove(store: &mut StoreSession, key: String, output: &Output) -> Result<()> {
    // Ordered fish may have been deleted since; fall back to the raw key
    let key = resolve_fish(store, &key).unwrap_or_else(|_| FishKey::new(key.trim()));

    if store.remove_from_order(&key) {
        output.success(&format!("Removed {} from your order", key));
    } else {
        output.message(&format!("{} is not in your order", key));
    }

    Ok(())
}

/// Empty the order
pub fn clear(store: &mut StoreSession, output: &Output) -> Result<()> {
    store.clear_order();
    output.success("Cleared your order");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support;
    use crate::output::OutputFormat;
    use catch_core::{Fish, FishStatus};

    #[test]
    fn test_add_by_name_and_remove() {
        let output = Output::new(OutputFormat::Quiet);
        let mut session = test_support::session();
        let trout = session.add_fish(Fish::new("Trout", 9.99));

        add(&mut session, "trout".to_string(), &output).unwrap();
        add(&mut session, trout.to_string(), &output).unwrap();
        assert_eq!(session.ledger().quantity(&trout), Some(2));
        assert_eq!(session.summary().total_text(session.locale()), "$19.98");

        remove(&mut session, "Trout".to_string(), &output).unwrap();
        assert!(session.ledger().is_empty());
    }

    #[test]
    fn test_sold_out_fish_cannot_be_added() {
        let output = Output::new(OutputFormat::Quiet);
        let mut session = test_support::session();
        session.add_fish(Fish::new("Halibut", 24.0).with_status(FishStatus::Unavailable));

        let err = add(&mut session, "Halibut".to_string(), &output).unwrap_err();
        assert!(err.to_string().contains("sold out"));
        assert!(session.ledger().is_empty());
    }

    #[test]
    fn test_remove_line_for_deleted_fish() {
        let output = Output::new(OutputFormat::Quiet);
        let mut session = test_support::session();
        let trout = session.add_fish(Fish::new("Trout", 9.99));
        session.add_to_order(&trout);
        session.delete_fish(&trout);

        remove(&mut session, trout.to_string(), &output).unwrap();
        assert!(session.ledger().is_empty());
    }
}
