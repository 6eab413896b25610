//! Command handlers

pub mod config;
pub mod fish;
pub mod order;
pub mod relay;
pub mod status;

use anyhow::{bail, Result};

use catch_core::{FishKey, StoreSession};

/// Find a fish by key, or by name when no key matches
pub fn resolve_fish(session: &StoreSession, query: &str) -> Result<FishKey> {
    let query = query.trim();
    let key = FishKey::new(query);
    if session.fish(&key).is_some() {
        return Ok(key);
    }

    let matches: Vec<_> = session
        .fishes()
        .filter(|(_, fish)| fish.name.eq_ignore_ascii_case(query))
        .collect();

    match matches.len() {
        0 => bail!("No fish found matching: {}", query),
        1 => Ok(matches[0].0.clone()),
        _ => {
            eprintln!("Multiple fish are called '{}':", query);
            for (key, fish) in &matches {
                eprintln!("  {} - {}", key, fish.name);
            }
            bail!("Ambiguous name. Please use the fish key.");
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use catch_core::Fish;

    #[test]
    fn test_resolve_by_key_or_name() {
        let mut session = test_support::session();
        let trout = session.add_fish(Fish::new("Trout", 9.99));

        assert_eq!(resolve_fish(&session, trout.as_str()).unwrap(), trout);
        assert_eq!(resolve_fish(&session, "trout").unwrap(), trout);
        assert!(resolve_fish(&session, "Halibut").is_err());
    }

    #[test]
    fn test_resolve_ambiguous_name() {
        let mut session = test_support::session();
        session.add_fish(Fish::new("Trout", 9.99));
        session.add_fish(Fish::new("Trout", 11.50));

        let err = resolve_fish(&session, "Trout").unwrap_err();
        assert!(err.to_string().contains("Ambiguous"));
    }
}
