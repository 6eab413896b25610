//! Catch of the Day CLI
//!
//! Command-line interface and terminal storefront for Catch of the Day.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use catch_core::{fun_name, Config, StoreId, SyncHealth};

mod commands;
mod output;
mod prompt;
mod store;
mod tui;

use output::{Output, OutputFormat};
use store::OpenStore;

#[derive(Parser)]
#[command(name = "catch")]
#[command(about = "Catch of the Day - a fish market storefront")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Store to open (defaults to the last store opened)
    #[arg(short, long, global = true)]
    store: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the TUI storefront
    Tui,
    /// Print a random store name
    Name,
    /// Manage the store's fish
    Fish {
        #[command(subcommand)]
        command: FishCommands,
    },
    /// Manage your order
    Order {
        #[command(subcommand)]
        command: Option<OrderCommands>,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Show status (store, sync, storage)
    Status,
    /// Run a relay server other devices can sync through
    Relay {
        /// Address to listen on (defaults to relay_bind from config)
        #[arg(long)]
        bind: Option<String>,
        /// JSON file persisting the relay's tree
        #[arg(long)]
        data: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum FishCommands {
    /// List the store's fish
    #[command(alias = "ls")]
    List,
    /// Add a fish
    Add {
        /// Fish name
        name: String,
        /// Price per pound, e.g. 12.50
        price: String,
        /// available or unavailable
        #[arg(long, default_value = "available")]
        status: String,
        /// Description
        #[arg(short, long, default_value = "")]
        desc: String,
        /// Image URL
        #[arg(short, long, default_value = "")]
        image: String,
    },
    /// Change one field of a fish
    Edit {
        /// Fish key
        key: String,
        /// Field to change (name, price, status, desc, image)
        field: String,
        /// New value
        value: String,
    },
    /// Delete a fish
    #[command(alias = "delete")]
    Rm {
        /// Fish key
        key: String,
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Replace the inventory with the sample fish
    Samples,
}

#[derive(Subcommand)]
enum OrderCommands {
    /// Show the order and its total
    Show,
    /// Add a pound of a fish to the order
    Add {
        /// Fish key
        key: String,
    },
    /// Remove a fish from the order
    #[command(alias = "remove")]
    Rm {
        /// Fish key
        key: String,
    },
    /// Empty the order
    Clear,
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, sync_url, sync_enabled, collection, locale, ...)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Commands that don't need a store
    match &cli.command {
        Some(Commands::Config { command }) => {
            return handle_config_command(command.clone(), cli.config.as_ref(), &output);
        }
        Some(Commands::Name) => {
            output.print_name(&fun_name());
            return Ok(());
        }
        _ => {}
    }

    let config = Config::load_with_cli_override(cli.config.as_ref())
        .context("Failed to load configuration")?;

    // Handle TUI (default when no command given); it sets up its own logging
    if matches!(&cli.command, Some(Commands::Tui) | None) {
        return tui::run(config, cli.config, cli.store).await;
    }

    init_cli_logging();

    let command = match cli.command {
        Some(command) => command,
        None => return Ok(()),
    };

    if let Commands::Relay { bind, data } = command {
        return commands::relay::run(&config, bind, data, &output).await;
    }

    let store_id = resolve_store(cli.store.as_deref(), &config)?;
    let mut store = OpenStore::open(&config, store_id).await?;

    let health = store.health();
    if let SyncHealth::Degraded(reason) = &health.sync {
        output.warn(&format!("Working offline ({}); showing local data only", reason));
    } else if !health.sync.is_live() {
        output.warn("Inventory has not arrived from the relay yet");
    }
    if !health.ledger_persistent {
        output.warn("Order database unavailable; order changes will not be saved");
    }

    let result = match command {
        Commands::Fish { command } => handle_fish_command(command, &mut store, &output),
        Commands::Order { command } => handle_order_command(command, &mut store, &output),
        Commands::Status => commands::status::show(&store, &config, &output),
        Commands::Tui
        | Commands::Name
        | Commands::Config { .. }
        | Commands::Relay { .. } => Ok(()), // Handled above
    };

    // Writes reach the relay before the connection closes
    let undelivered = store.close().await;
    if undelivered > 0 {
        output.warn(&undelivered_message(undelivered));
    }

    result
}

/// Warning for changes the relay never received
pub(crate) fn undelivered_message(count: usize) -> String {
    format!(
        "{} change{} could not reach the relay and {} lost",
        count,
        if count == 1 { "" } else { "s" },
        if count == 1 { "was" } else { "were" }
    )
}

fn handle_fish_command(command: FishCommands, store: &mut OpenStore, output: &Output) -> Result<()> {
    match command {
        FishCommands::List => commands::fish::list(store, output),
        FishCommands::Add {
            name,
            price,
            status,
            desc,
            image,
        } => commands::fish::add(store, name, price, status, desc, image, output),
        FishCommands::Edit { key, field, value } => {
            commands::fish::edit(store, key, field, value, output)
        }
        FishCommands::Rm { key, yes } => commands::fish::delete(store, key, yes, output),
        FishCommands::Samples => commands::fish::samples(store, output),
    }
}

fn handle_order_command(
    command: Option<OrderCommands>,
    store: &mut OpenStore,
    output: &Output,
) -> Result<()> {
    match command {
        Some(OrderCommands::Show) | None => commands::order::show(store, output),
        Some(OrderCommands::Add { key }) => commands::order::add(store, key, output),
        Some(OrderCommands::Rm { key }) => commands::order::remove(store, key, output),
        Some(OrderCommands::Clear) => commands::order::clear(store, output),
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Pick the store a command works on: `--store`, then the last one opened
fn resolve_store(flag: Option<&str>, config: &Config) -> Result<StoreId> {
    let raw = flag.or(config.last_store.as_deref()).context(
        "No store selected. Pass --store <name> or open one in the TUI first.\n\
         Need a name? Try `catch name`.",
    )?;

    Ok(StoreId::parse(raw)?)
}

/// Log to stderr when CATCH_LOG is set
fn init_cli_logging() {
    let Ok(log_level) = std::env::var("CATCH_LOG") else {
        return;
    };

    let env_filter = EnvFilter::new(format!(
        "catch_core={},catch_cli={}",
        log_level, log_level
    ));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}
