//! Status command handler

use anyhow::Result;

use catch_core::{Config, SyncHealth};

use crate::output::{Output, OutputFormat};
use crate::store::OpenStore;

/// Show status information
pub fn show(store: &OpenStore, config: &Config, output: &Output) -> Result<()> {
    let health = store.health();
    let summary = store.summary();
    let locale = store.locale();

    let (sync_state, sync_detail) = match &health.sync {
        SyncHealth::Live => ("live", None),
        SyncHealth::Connecting => ("connecting", None),
        SyncHealth::Degraded(reason) => ("degraded", Some(reason.as_str())),
    };
    let backend = store.relay_url().unwrap_or("local");
    let link = store.link_status();

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "store": store.store_id(),
                    "path": store.path(),
                    "locale": locale.tag(),
                    "sync": {
                        "backend": backend,
                        "link": link.as_str(),
                        "state": sync_state,
                        "detail": sync_detail
                    },
                    "storage": {
                        "data_dir": config.data_dir,
                        "order_persistent": health.ledger_persistent
                    },
                    "counts": {
                        "fish": store.inventory().len(),
                        "order_lines": store.ledger().len()
                    },
                    "order_total": summary.total
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", store.store_id());
        }
        OutputFormat::Human => {
            println!("Catch of the Day Status");
            println!("=======================");
            println!();
            println!("Store:");
            println!("  Name:   {}", store.store_id());
            println!("  Path:   {}", store.path());
            println!("  Locale: {}", locale.tag());
            println!();
            println!("Sync:");
            println!("  Backend: {}", backend);
            println!("  Link:    {}", link);
            match sync_detail {
                Some(detail) => println!("  Status:  {} ({})", sync_state, detail),
                None => println!("  Status:  {}", sync_state),
            }
            println!();
            println!("Storage:");
            println!("  Location: {}", config.data_dir.display());
            println!(
                "  Orders:   {}",
                if health.ledger_persistent {
                    "saved locally"
                } else {
                    "memory only"
                }
            );
            println!();
            println!("Contents:");
            println!("  Fish:        {}", store.inventory().len());
            println!("  Order lines: {}", store.ledger().len());
            println!("  Order total: {}", summary.total_text(locale));
        }
    }

    Ok(())
}
