//! Fish command handlers

use anyhow::{Context, Result};

use catch_core::{Fish, FishField, FishForm, StoreSession};

use super::resolve_fish;
use crate::output::Output;
use crate::prompt::confirm;

/// List the store's fish
pub fn list(store: &StoreSession, output: &Output) -> Result<()> {
    output.print_fishes(store.fishes(), store.locale());
    Ok(())
}

/// Add a fish from raw form values
pub fn add(
    store: &mut StoreSession,
    name: String,
    price: String,
    status: String,
    desc: String,
    image: String,
    output: &Output,
) -> Result<()> {
    let form = FishForm {
        name,
        price,
        status,
        desc,
        image,
    };
    let fish = Fish::from_form(&form)?;

    let key = store.add_fish(fish.clone());

    output.success(&format!("Added fish: {}", key));
    output.print_fish(&key, &fish, store.locale());

    Ok(())
}

/// Change one field of a fish
pub fn edit(
    store: &mut StoreSession,
    key: String,
    field: String,
    value: String,
    output: &Output,
) -> Result<()> {
    let key = resolve_fish(store, &key)?;
    let field: FishField = field.parse()?;

    store
        .update_fish_field(&key, field, &value)
        .with_context(|| format!("Failed to update {}", field.as_str()))?;

    output.success(&format!("Set {} of {} = {}", field.as_str(), key, value));

    Ok(())
}

/// Delete a fish
pub fn delete(store: &mut StoreSession, key: String, yes: bool, output: &Output) -> Result<()> {
    let key = resolve_fish(store, &key)?;

    // Confirm deletion
    if output.should_prompt() && !yes {
        if let Some(fish) = store.fish(&key) {
            println!("Delete fish: {} - {}", key, fish.name);
        }
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    store.delete_fish(&key);

    output.success(&format!("Deleted fish: {}", key));

    Ok(())
}

/// Replace the inventory with the sample fish
pub fn samples(store: &mut StoreSession, output: &Output) -> Result<()> {
    store.load_samples();
    output.success(&format!("Loaded {} sample fish", store.inventory().len()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support;
    use crate::output::OutputFormat;
    use catch_core::FishStatus;

    fn quiet() -> Output {
        Output::new(OutputFormat::Quiet)
    }

    #[test]
    fn test_add_validates_form() {
        let mut session = test_support::session();

        add(
            &mut session,
            "Trout".to_string(),
            "$9.99".to_string(),
            "available".to_string(),
            String::new(),
            String::new(),
            &quiet(),
        )
        .unwrap();
        assert_eq!(session.inventory().len(), 1);

        let err = add(
            &mut session,
            "Cod".to_string(),
            "cheap".to_string(),
            "available".to_string(),
            String::new(),
            String::new(),
            &quiet(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("cheap"));
        assert_eq!(session.inventory().len(), 1);
    }

    #[test]
    fn test_edit_and_delete() {
        let mut session = test_support::session();
        let key = session.add_fish(Fish::new("Trout", 9.99));

        edit(
            &mut session,
            "Trout".to_string(),
            "status".to_string(),
            "unavailable".to_string(),
            &quiet(),
        )
        .unwrap();
        assert_eq!(session.fish(&key).unwrap().status, FishStatus::Unavailable);

        assert!(edit(
            &mut session,
            key.to_string(),
            "colour".to_string(),
            "red".to_string(),
            &quiet(),
        )
        .is_err());

        delete(&mut session, key.to_string(), false, &quiet()).unwrap();
        assert!(session.fish(&key).is_none());
    }

    #[test]
    fn test_samples_replace_inventory() {
        let mut session = test_support::session();
        session.add_fish(Fish::new("Trout", 9.99));

        samples(&mut session, &quiet()).unwrap();
        assert!(session.inventory().len() > 1);
        assert!(session.fishes().all(|(_, fish)| fish.name != "Trout"));
    }
}
