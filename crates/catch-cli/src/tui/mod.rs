//! Catch of the Day TUI
//!
//! Terminal storefront for one store.
//!
//! ## Layout
//!
//! Three-pane layout under a header:
//! - Left: Menu (the store's fish, what customers see)
//! - Middle: Order (lines and running total)
//! - Right: Inventory (the seller's editor)
//!
//! ## Navigation
//!
//! - j/k or ↑/↓: Move selection up/down
//! - h/l or ←/→: Switch focus between panes
//! - Tab: Cycle through panes
//! - q: Quit
//!
//! ## Commands
//!
//! - a / Enter (menu): Add a pound to the order
//! - x: Remove from order
//! - n: New fish
//! - e / Enter (inventory): Edit fish
//! - d: Delete fish
//! - L: Load sample fishes
//! - o: Open fish image

mod app;
mod picker;
mod ui;

use std::fs::File;
use std::io::stdout;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use catch_core::{Config, StoreId, StoreSession};

use crate::store::OpenStore;
use app::{ActivePane, App, InputMode};
use picker::StorePicker;

/// How many recent stores the picker lists
const RECENT_STORES: usize = 5;

/// Run the TUI application
///
/// Without `store`, a picker asks which store to open.
pub async fn run(config: Config, config_path: Option<PathBuf>, store: Option<String>) -> Result<()> {
    // Validate before touching the terminal
    let store_id = store.as_deref().map(StoreId::parse).transpose()?;

    // Initialize TUI logging (file-based, only if CATCH_LOG is set)
    init_tui_logging(&config);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_storefront(&mut terminal, &config, config_path, store_id).await;

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    let undelivered = result?;
    if undelivered > 0 {
        eprintln!("⚠ {}", crate::undelivered_message(undelivered));
    }
    Ok(())
}

async fn run_storefront<B: Backend>(
    terminal: &mut Terminal<B>,
    config: &Config,
    config_path: Option<PathBuf>,
    store_id: Option<StoreId>,
) -> Result<usize> {
    let store_id = match store_id {
        Some(store_id) => store_id,
        None => {
            let recent = crate::store::recent_stores(config, RECENT_STORES);
            let mut picker = StorePicker::new(config.last_store.as_deref(), recent);
            match picker.run(terminal).await? {
                Some(store_id) => store_id,
                None => return Ok(0),
            }
        }
    };

    remember_store(&store_id, config_path.as_ref());

    // Don't block on the relay; the indicator shows when it arrives
    let mut store = OpenStore::open_nowait(config, store_id)?;
    let mut app = App::new(store.relay_url().is_some());

    let result = run_app(terminal, &mut app, &mut store).await;

    let undelivered = store.close().await;
    result.map(|()| undelivered)
}

async fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    session: &mut StoreSession,
) -> Result<()> {
    loop {
        // Check for status message timeout
        app.check_status_timeout();

        // Apply remote changes
        if session.poll_remote() > 0 {
            info!(store = %session.store_id(), "Applied remote changes");
        }
        app.sync_from(session);

        // Draw UI
        terminal.draw(|frame| ui::draw(frame, app, session))?;

        tokio::time::sleep(Duration::from_millis(50)).await;

        // Check for terminal events (non-blocking)
        if !event::poll(Duration::from_millis(0))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };

        // Only handle key press events (not release)
        if key.kind != KeyEventKind::Press {
            continue;
        }

        // If error modal is showing, any key dismisses it
        if app.has_error() {
            app.clear_error();
            continue;
        }

        // If help is showing, any key dismisses it
        if app.show_help {
            app.show_help = false;
            continue;
        }

        match app.input_mode {
            InputMode::Normal => handle_normal_mode(app, session, key.code, key.modifiers),
            InputMode::Form => handle_form_mode(app, session, key.code, key.modifiers),
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

/// Handle key events in normal mode
fn handle_normal_mode(
    app: &mut App,
    session: &mut StoreSession,
    code: KeyCode,
    modifiers: KeyModifiers,
) {
    // Clear pending 'g' if timeout expired (500ms)
    if let Some(time) = app.pending_g {
        if time.elapsed() > Duration::from_millis(500) {
            app.pending_g = None;
        }
    }

    match code {
        // Quit
        KeyCode::Char('q') => {
            app.should_quit = true;
        }
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
        }

        // Navigation
        KeyCode::Char('k') | KeyCode::Up => app.move_up(),
        KeyCode::Char('j') | KeyCode::Down => app.move_down(session),
        KeyCode::Char('h') | KeyCode::Left | KeyCode::BackTab => app.prev_pane(),
        KeyCode::Char('l') | KeyCode::Right | KeyCode::Tab => app.next_pane(),

        // Enter: act on the selection
        KeyCode::Enter => match app.active_pane {
            ActivePane::Menu => app.add_selected_to_order(session),
            ActivePane::Inventory => app.open_edit_form(session),
            ActivePane::Order => {}
        },

        // Order
        KeyCode::Char('a') if app.active_pane != ActivePane::Order => {
            app.add_selected_to_order(session);
        }
        KeyCode::Char('x') => app.remove_selected_from_order(session),
        KeyCode::Char('C') => {
            session.clear_order();
            app.sync_from(session);
            app.set_status("Cleared your order");
        }

        // Inventory
        KeyCode::Char('n') => app.open_new_form(),
        KeyCode::Char('e') => {
            if app.active_pane == ActivePane::Order {
                app.active_pane = ActivePane::Inventory;
            }
            app.open_edit_form(session);
        }
        KeyCode::Char('d') if app.active_pane == ActivePane::Inventory => {
            app.delete_selected(session);
        }
        KeyCode::Char('L') => app.load_samples(session),
        KeyCode::Char('o') => app.open_selected_image(session),

        // Help
        KeyCode::Char('?') => app.toggle_help(),

        // Vim navigation: G (go to last)
        KeyCode::Char('G') => {
            app.pending_g = None;
            app.move_to_last(session);
        }

        // Vim navigation: g (start of gg sequence)
        KeyCode::Char('g') => {
            if app.pending_g.is_some() {
                app.pending_g = None;
                app.move_to_first();
            } else {
                app.pending_g = Some(Instant::now());
            }
        }

        _ => {
            // Any other key clears pending 'g'
            app.pending_g = None;
        }
    }
}

/// Handle key events while the fish form is open
fn handle_form_mode(
    app: &mut App,
    session: &mut StoreSession,
    code: KeyCode,
    modifiers: KeyModifiers,
) {
    match code {
        KeyCode::Esc => {
            app.close_form();
            return;
        }
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
            app.close_form();
            return;
        }
        KeyCode::Enter => {
            app.submit_form(session);
            return;
        }
        _ => {}
    }

    let Some(form) = app.form.as_mut() else {
        app.input_mode = InputMode::Normal;
        return;
    };

    match code {
        KeyCode::Tab | KeyCode::Down => form.next_field(),
        KeyCode::BackTab | KeyCode::Up => form.prev_field(),
        KeyCode::Char('t') if modifiers.contains(KeyModifiers::CONTROL) => form.toggle_status(),
        KeyCode::Char(c) => form.insert(c),
        KeyCode::Backspace => form.backspace(),
        KeyCode::Left => form.move_left(),
        KeyCode::Right => form.move_right(),
        KeyCode::Home => form.cursor_to_start(),
        KeyCode::End => form.cursor_to_end(),
        _ => {}
    }
}

/// Save the opened store so the picker offers it next time
fn remember_store(store_id: &StoreId, config_path: Option<&PathBuf>) {
    let path = Config::file_path(config_path);
    let result = Config::update_file(&path, |config| {
        config.last_store = Some(store_id.to_string());
        Ok(())
    })
    .context("Failed to save last store");

    if let Err(e) = result {
        warn!(error = %e, "Could not remember last store");
    }
}

/// Initialize logging for TUI mode
///
/// Only initializes if CATCH_LOG environment variable is set.
/// Logs to file (config.log_file or default {data_dir}/debug.log).
fn init_tui_logging(config: &Config) {
    let Ok(log_level) = std::env::var("CATCH_LOG") else {
        return;
    };

    let log_path = config.log_path();

    let log_file = match File::create(&log_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
            return;
        }
    };

    let env_filter = EnvFilter::new(format!("catch_core={},catch_cli={}", log_level, log_level));

    // Initialize file-based logging (ignore error if already initialized)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(log_file)
        .try_init();

    info!("TUI logging initialized to {:?}", log_path);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use catch_core::{Fish, MemoryRemote, SessionOptions};
    use tempfile::TempDir;

    fn session() -> StoreSession {
        StoreSession::open(
            StoreId::parse("keys-test").unwrap(),
            Arc::new(MemoryRemote::new()),
            None,
            SessionOptions::default(),
        )
    }

    fn press(app: &mut App, session: &mut StoreSession, code: KeyCode) {
        match app.input_mode {
            InputMode::Normal => handle_normal_mode(app, session, code, KeyModifiers::NONE),
            InputMode::Form => handle_form_mode(app, session, code, KeyModifiers::NONE),
        }
    }

    #[test]
    fn test_add_fish_through_form_keys() {
        let mut app = App::new(false);
        let mut session = session();

        press(&mut app, &mut session, KeyCode::Char('n'));
        assert_eq!(app.input_mode, InputMode::Form);
        for c in "Trout".chars() {
            press(&mut app, &mut session, KeyCode::Char(c));
        }
        press(&mut app, &mut session, KeyCode::Tab);
        for c in "9.99".chars() {
            press(&mut app, &mut session, KeyCode::Char(c));
        }
        press(&mut app, &mut session, KeyCode::Enter);

        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(session.inventory().len(), 1);

        // Menu: Enter twice orders two pounds
        press(&mut app, &mut session, KeyCode::Enter);
        press(&mut app, &mut session, KeyCode::Enter);
        assert_eq!(session.summary().total_text(session.locale()), "$19.98");

        press(&mut app, &mut session, KeyCode::Char('x'));
        assert!(session.ledger().is_empty());
    }

    #[test]
    fn test_delete_only_from_inventory_pane() {
        let mut app = App::new(false);
        let mut session = session();
        session.add_fish(Fish::new("Trout", 9.99));

        press(&mut app, &mut session, KeyCode::Char('d'));
        assert_eq!(session.inventory().len(), 1);

        app.active_pane = ActivePane::Inventory;
        press(&mut app, &mut session, KeyCode::Char('d'));
        assert!(session.inventory().is_empty());
    }

    #[test]
    fn test_escape_discards_form() {
        let mut app = App::new(false);
        let mut session = session();

        press(&mut app, &mut session, KeyCode::Char('n'));
        press(&mut app, &mut session, KeyCode::Char('X'));
        press(&mut app, &mut session, KeyCode::Esc);

        assert_eq!(app.input_mode, InputMode::Normal);
        assert!(app.form.is_none());
        assert!(session.inventory().is_empty());
    }

    #[test]
    fn test_remember_store_writes_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            format!("data_dir = {:?}\n", dir.path().join("data").display().to_string()),
        )
        .unwrap();

        remember_store(&StoreId::parse("jolly-narwhal-42").unwrap(), Some(&path));

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.last_store.as_deref(), Some("jolly-narwhal-42"));
    }

    #[test]
    fn test_remember_store_leaves_env_out_of_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "locale = \"en-US\"\n").unwrap();

        let saved = std::env::var("CATCH_LOCALE").ok();
        std::env::set_var("CATCH_LOCALE", "de-DE");
        remember_store(&StoreId::parse("jolly-narwhal-42").unwrap(), Some(&path));
        match saved {
            Some(value) => std::env::set_var("CATCH_LOCALE", value),
            None => std::env::remove_var("CATCH_LOCALE"),
        }

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("en-US"));
        assert!(!content.contains("de-DE"));
        assert!(content.contains("jolly-narwhal-42"));
    }
}
