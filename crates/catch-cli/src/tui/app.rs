//! Application state and logic

use std::time::{Duration, Instant};

use catch_core::{Fish, FishField, FishForm, FishKey, FishStatus, StoreSession, SyncHealth};

/// Input mode for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Normal navigation mode
    Normal,
    /// Filling in the fish form
    Form,
}

/// Which pane has focus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivePane {
    Menu,
    Order,
    Inventory,
}

impl ActivePane {
    /// Move to the next pane (wrapping)
    pub fn next(self) -> Self {
        match self {
            ActivePane::Menu => ActivePane::Order,
            ActivePane::Order => ActivePane::Inventory,
            ActivePane::Inventory => ActivePane::Menu,
        }
    }

    /// Move to the previous pane (wrapping)
    pub fn prev(self) -> Self {
        match self {
            ActivePane::Menu => ActivePane::Inventory,
            ActivePane::Order => ActivePane::Menu,
            ActivePane::Inventory => ActivePane::Order,
        }
    }
}

/// Sync status indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncIndicator {
    /// Connected and synced
    Synced,
    /// Waiting for the relay
    Syncing,
    /// Disconnected, will retry
    Offline,
    /// Sync not configured (local tree only)
    Disabled,
    /// Sync error occurred
    Error,
}

impl SyncIndicator {
    /// Indicator for a session's sync health
    pub fn from_health(sync: &SyncHealth, relay: bool) -> Self {
        match sync {
            SyncHealth::Live if relay => SyncIndicator::Synced,
            SyncHealth::Live => SyncIndicator::Disabled,
            SyncHealth::Connecting => SyncIndicator::Syncing,
            SyncHealth::Degraded(reason) if reason == "offline" || reason == "disconnected" => {
                SyncIndicator::Offline
            }
            SyncHealth::Degraded(_) => SyncIndicator::Error,
        }
    }
}

/// Add or edit form for one fish
#[derive(Debug, Clone, PartialEq)]
pub struct FishFormState {
    /// Fish being edited, `None` when adding
    pub target: Option<FishKey>,
    /// Raw text per field, in [`FishField::ALL`] order
    pub values: [String; 5],
    /// Index of the focused field
    pub field: usize,
    /// Cursor position within the focused field (in chars)
    pub cursor: usize,
}

impl FishFormState {
    /// Empty form for a new fish
    pub fn blank() -> Self {
        let mut values: [String; 5] = Default::default();
        values[field_index(FishField::Status)] = FishStatus::Available.to_string();
        Self {
            target: None,
            values,
            field: 0,
            cursor: 0,
        }
    }

    /// Form pre-filled from an existing fish
    pub fn edit(key: FishKey, fish: &Fish) -> Self {
        let values = FishField::ALL.map(|field| fish.field_text(field));
        let cursor = values[0].chars().count();
        Self {
            target: Some(key),
            values,
            field: 0,
            cursor,
        }
    }

    pub fn title(&self) -> &'static str {
        if self.target.is_some() {
            " Edit Fish "
        } else {
            " Add Fish "
        }
    }

    pub fn current_field(&self) -> FishField {
        FishField::ALL[self.field]
    }

    pub fn value(&self, field: FishField) -> &str {
        &self.values[field_index(field)]
    }

    pub fn next_field(&mut self) {
        self.field = (self.field + 1) % FishField::ALL.len();
        self.cursor_to_end();
    }

    pub fn prev_field(&mut self) {
        self.field = (self.field + FishField::ALL.len() - 1) % FishField::ALL.len();
        self.cursor_to_end();
    }

    pub fn insert(&mut self, c: char) {
        let at = self.byte_offset();
        self.values[self.field].insert(at, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let at = self.byte_offset();
        self.values[self.field].remove(at);
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        if self.cursor < self.values[self.field].chars().count() {
            self.cursor += 1;
        }
    }

    pub fn cursor_to_start(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_to_end(&mut self) {
        self.cursor = self.values[self.field].chars().count();
    }

    /// Flip the status field between available and unavailable
    pub fn toggle_status(&mut self) {
        let index = field_index(FishField::Status);
        let status = self.values[index]
            .parse::<FishStatus>()
            .map(FishStatus::toggled)
            .unwrap_or_default();
        self.values[index] = status.to_string();
        if self.field == index {
            self.cursor_to_end();
        }
    }

    pub fn to_form(&self) -> FishForm {
        FishForm {
            name: self.value(FishField::Name).to_string(),
            price: self.value(FishField::Price).to_string(),
            status: self.value(FishField::Status).to_string(),
            desc: self.value(FishField::Desc).to_string(),
            image: self.value(FishField::Image).to_string(),
        }
    }

    fn byte_offset(&self) -> usize {
        let value = &self.values[self.field];
        value
            .char_indices()
            .nth(self.cursor)
            .map(|(i, _)| i)
            .unwrap_or(value.len())
    }
}

fn field_index(field: FishField) -> usize {
    FishField::ALL
        .iter()
        .position(|f| *f == field)
        .unwrap_or_default()
}

/// Application state
pub struct App {
    /// Whether the app should exit
    pub should_quit: bool,
    /// Current input mode
    pub input_mode: InputMode,
    /// Open fish form
    pub form: Option<FishFormState>,
    /// Which pane has focus
    pub active_pane: ActivePane,
    /// Selected fish in the menu
    pub menu_index: usize,
    /// Selected order line
    pub order_index: usize,
    /// Selected fish in the inventory editor
    pub inventory_index: usize,
    /// Status message to display temporarily
    pub status_message: Option<String>,
    /// When the status message was set (for auto-dismiss)
    pub status_message_time: Option<Instant>,
    /// Error shown in a modal until a key is pressed
    pub error: Option<String>,
    /// Whether help overlay is visible
    pub show_help: bool,
    /// Sync status indicator
    pub sync_status: SyncIndicator,
    /// Whether the inventory comes from a relay
    pub relay: bool,
    /// Pending 'g' keypress for gg sequence (with timestamp)
    pub pending_g: Option<Instant>,
}

impl App {
    pub fn new(relay: bool) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Normal,
            form: None,
            active_pane: ActivePane::Menu,
            menu_index: 0,
            order_index: 0,
            inventory_index: 0,
            status_message: None,
            status_message_time: None,
            error: None,
            show_help: false,
            sync_status: if relay {
                SyncIndicator::Syncing
            } else {
                SyncIndicator::Disabled
            },
            relay,
            pending_g: None,
        }
    }

    /// Set a status message with auto-dismiss
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
        self.status_message_time = Some(Instant::now());
    }

    /// Check and clear expired status message
    pub fn check_status_timeout(&mut self) {
        if let Some(time) = self.status_message_time {
            if time.elapsed() > Duration::from_secs(3) {
                self.status_message = None;
                self.status_message_time = None;
            }
        }
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    /// Toggle help overlay
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub fn next_pane(&mut self) {
        self.active_pane = self.active_pane.next();
    }

    pub fn prev_pane(&mut self) {
        self.active_pane = self.active_pane.prev();
    }

    /// Refresh the indicator and keep selections in range after remote changes
    pub fn sync_from(&mut self, session: &StoreSession) {
        self.sync_status = SyncIndicator::from_health(&session.health().sync, self.relay);
        self.clamp(session);
    }

    fn clamp(&mut self, session: &StoreSession) {
        let fish = session.inventory().len().saturating_sub(1);
        let lines = session.summary().lines.len().saturating_sub(1);
        self.menu_index = self.menu_index.min(fish);
        self.inventory_index = self.inventory_index.min(fish);
        self.order_index = self.order_index.min(lines);
    }

    fn pane_len(&self, session: &StoreSession) -> usize {
        match self.active_pane {
            ActivePane::Menu | ActivePane::Inventory => session.inventory().len(),
            ActivePane::Order => session.summary().lines.len(),
        }
    }

    fn index_mut(&mut self) -> &mut usize {
        match self.active_pane {
            ActivePane::Menu => &mut self.menu_index,
            ActivePane::Order => &mut self.order_index,
            ActivePane::Inventory => &mut self.inventory_index,
        }
    }

    /// Move selection up in the current pane
    pub fn move_up(&mut self) {
        let index = self.index_mut();
        *index = index.saturating_sub(1);
    }

    /// Move selection down in the current pane
    pub fn move_down(&mut self, session: &StoreSession) {
        let last = self.pane_len(session).saturating_sub(1);
        let index = self.index_mut();
        if *index < last {
            *index += 1;
        }
    }

    pub fn move_to_first(&mut self) {
        *self.index_mut() = 0;
    }

    pub fn move_to_last(&mut self, session: &StoreSession) {
        let last = self.pane_len(session).saturating_sub(1);
        *self.index_mut() = last;
    }

    /// Fish under the cursor in the menu or inventory pane
    pub fn selected_fish(&self, session: &StoreSession) -> Option<FishKey> {
        let index = match self.active_pane {
            ActivePane::Menu => self.menu_index,
            ActivePane::Inventory => self.inventory_index,
            ActivePane::Order => return self.selected_order_key(session),
        };
        session.fishes().nth(index).map(|(key, _)| key.clone())
    }

    fn selected_order_key(&self, session: &StoreSession) -> Option<FishKey> {
        session
            .summary()
            .lines
            .get(self.order_index)
            .map(|line| line.key().clone())
    }

    // ==================== Order ====================

    /// Add a pound of the selected fish to the order
    pub fn add_selected_to_order(&mut self, session: &mut StoreSession) {
        let Some(key) = self.selected_fish(session) else {
            return;
        };
        let Some(fish) = session.fish(&key) else {
            return;
        };

        if !fish.is_available() {
            let name = fish.name.clone();
            self.set_status(format!("Sorry, {} is sold out!", name));
            return;
        }

        let name = fish.name.clone();
        let count = session.add_to_order(&key);
        self.set_status(format!("{} lbs {} in your order", count, name));
    }

    /// Drop the selected fish from the order
    pub fn remove_selected_from_order(&mut self, session: &mut StoreSession) {
        let key = match self.active_pane {
            ActivePane::Order => self.selected_order_key(session),
            _ => self.selected_fish(session),
        };
        let Some(key) = key else {
            return;
        };

        if session.remove_from_order(&key) {
            self.set_status("Removed from order");
            self.clamp(session);
        }
    }

    // ==================== Inventory ====================

    pub fn open_new_form(&mut self) {
        self.form = Some(FishFormState::blank());
        self.input_mode = InputMode::Form;
    }

    pub fn open_edit_form(&mut self, session: &StoreSession) {
        let Some(key) = self.selected_fish(session) else {
            self.set_status("No fish selected");
            return;
        };
        let Some(fish) = session.fish(&key) else {
            return;
        };
        self.form = Some(FishFormState::edit(key, fish));
        self.input_mode = InputMode::Form;
    }

    pub fn close_form(&mut self) {
        self.form = None;
        self.input_mode = InputMode::Normal;
    }

    /// Validate the form and write it to the inventory
    ///
    /// On a validation error the form stays open.
    pub fn submit_form(&mut self, session: &mut StoreSession) {
        let Some(form) = self.form.as_ref() else {
            return;
        };

        match form.target.clone() {
            None => match Fish::from_form(&form.to_form()) {
                Ok(fish) => {
                    let name = fish.name.clone();
                    session.add_fish(fish);
                    self.close_form();
                    self.set_status(format!("Added {}", name));
                }
                Err(e) => self.set_error(e.to_string()),
            },
            Some(key) => {
                let Some(current) = session.fish(&key) else {
                    self.close_form();
                    self.set_error("That fish was deleted while you were editing it");
                    return;
                };

                let mut updated = current.clone();
                for field in FishField::ALL {
                    let raw = form.value(field);
                    if raw == current.field_text(field) {
                        continue;
                    }
                    match updated.with_field(field, raw) {
                        Ok(fish) => updated = fish,
                        Err(e) => {
                            self.set_error(e.to_string());
                            return;
                        }
                    }
                }

                if &updated != current {
                    session.update_fish(&key, updated);
                    self.set_status("Saved");
                }
                self.close_form();
            }
        }
    }

    /// Delete the selected fish from the inventory
    pub fn delete_selected(&mut self, session: &mut StoreSession) {
        let Some(key) = self.selected_fish(session) else {
            return;
        };
        let name = session
            .fish(&key)
            .map(|fish| fish.name.clone())
            .unwrap_or_default();

        session.delete_fish(&key);
        self.clamp(session);
        self.set_status(format!("Deleted {}", name));
    }

    pub fn load_samples(&mut self, session: &mut StoreSession) {
        session.load_samples();
        self.clamp(session);
        self.set_status(format!("Loaded {} sample fish", session.inventory().len()));
    }

    /// Open the selected fish's image in the default viewer
    pub fn open_selected_image(&mut self, session: &StoreSession) {
        let Some(fish) = self.selected_fish(session).and_then(|key| session.fish(&key)) else {
            return;
        };

        if fish.image.is_empty() {
            self.set_status(format!("{} has no image", fish.name));
            return;
        }

        match open::that(&fish.image) {
            Ok(()) => self.set_status(format!("Opened {}", fish.image)),
            Err(e) => self.set_error(format!("Failed to open image: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use catch_core::{MemoryRemote, SessionOptions, StoreId};

    fn session() -> StoreSession {
        StoreSession::open(
            StoreId::parse("tui-test").unwrap(),
            Arc::new(MemoryRemote::new()),
            None,
            SessionOptions::default(),
        )
    }

    #[test]
    fn test_active_pane_next() {
        assert_eq!(ActivePane::Menu.next(), ActivePane::Order);
        assert_eq!(ActivePane::Order.next(), ActivePane::Inventory);
        assert_eq!(ActivePane::Inventory.next(), ActivePane::Menu);
    }

    #[test]
    fn test_active_pane_prev() {
        assert_eq!(ActivePane::Menu.prev(), ActivePane::Inventory);
        assert_eq!(ActivePane::Order.prev(), ActivePane::Menu);
        assert_eq!(ActivePane::Inventory.prev(), ActivePane::Order);
    }

    #[test]
    fn test_sync_indicator_from_health() {
        assert_eq!(
            SyncIndicator::from_health(&SyncHealth::Live, true),
            SyncIndicator::Synced
        );
        assert_eq!(
            SyncIndicator::from_health(&SyncHealth::Live, false),
            SyncIndicator::Disabled
        );
        assert_eq!(
            SyncIndicator::from_health(&SyncHealth::Degraded("offline".to_string()), true),
            SyncIndicator::Offline
        );
        assert_eq!(
            SyncIndicator::from_health(&SyncHealth::Degraded("protocol error".to_string()), true),
            SyncIndicator::Error
        );
    }

    #[test]
    fn test_form_editing() {
        let mut form = FishFormState::blank();
        assert_eq!(form.value(FishField::Status), "available");

        for c in "Trot".chars() {
            form.insert(c);
        }
        form.move_left();
        form.insert('u');
        assert_eq!(form.value(FishField::Name), "Trout");

        form.next_field();
        assert_eq!(form.current_field(), FishField::Price);
        form.insert('9');
        form.backspace();
        form.backspace();
        assert_eq!(form.value(FishField::Price), "");

        form.toggle_status();
        assert_eq!(form.value(FishField::Status), "unavailable");

        form.prev_field();
        form.prev_field();
        assert_eq!(form.current_field(), FishField::Image);
    }

    #[test]
    fn test_form_handles_multibyte_text() {
        let mut form = FishFormState::blank();
        for c in "Crème".chars() {
            form.insert(c);
        }
        form.cursor_to_start();
        form.move_right();
        form.move_right();
        form.move_right();
        form.backspace();
        assert_eq!(form.value(FishField::Name), "Crme");
    }

    #[test]
    fn test_submit_new_fish() {
        let mut session = session();
        let mut app = App::new(false);

        app.open_new_form();
        let form = app.form.as_mut().unwrap();
        form.values = [
            "Trout".to_string(),
            "cheap".to_string(),
            "available".to_string(),
            String::new(),
            String::new(),
        ];

        app.submit_form(&mut session);
        assert!(app.has_error());
        assert_eq!(app.input_mode, InputMode::Form);
        assert!(session.inventory().is_empty());

        app.clear_error();
        app.form.as_mut().unwrap().values[1] = "9.99".to_string();
        app.submit_form(&mut session);
        assert!(!app.has_error());
        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(session.inventory().len(), 1);
    }

    #[test]
    fn test_edit_form_updates_changed_fields() {
        let mut session = session();
        let key = session.add_fish(Fish::new("Trout", 9.99).with_desc("Lake"));
        let mut app = App::new(false);
        app.active_pane = ActivePane::Inventory;

        app.open_edit_form(&session);
        let form = app.form.as_mut().unwrap();
        assert_eq!(form.target.as_ref(), Some(&key));
        form.values[1] = "12.5".to_string();
        app.submit_form(&mut session);

        let fish = session.fish(&key).unwrap();
        assert_eq!(fish.price, 12.5);
        assert_eq!(fish.desc, "Lake");
    }

    #[test]
    fn test_sold_out_fish_not_added() {
        let mut session = session();
        session.add_fish(Fish::new("Halibut", 24.0).with_status(FishStatus::Unavailable));
        let mut app = App::new(false);

        app.add_selected_to_order(&mut session);
        assert!(session.ledger().is_empty());
        assert!(app.status_message.unwrap().contains("sold out"));
    }

    #[test]
    fn test_order_pane_remove_and_clamp() {
        let mut session = session();
        let trout = session.add_fish(Fish::new("Trout", 9.99));
        let cod = session.add_fish(Fish::new("Cod", 7.50));
        session.add_to_order(&trout);
        session.add_to_order(&cod);

        let mut app = App::new(false);
        app.active_pane = ActivePane::Order;
        app.move_to_last(&session);
        assert_eq!(app.order_index, 1);

        app.remove_selected_from_order(&mut session);
        assert_eq!(session.ledger().len(), 1);
        assert_eq!(app.order_index, 0);
    }

    #[test]
    fn test_delete_clamps_selection() {
        let mut session = session();
        session.add_fish(Fish::new("Trout", 9.99));
        session.add_fish(Fish::new("Cod", 7.50));

        let mut app = App::new(false);
        app.active_pane = ActivePane::Inventory;
        app.move_down(&session);
        app.move_down(&session);
        assert_eq!(app.inventory_index, 1);

        app.delete_selected(&mut session);
        assert_eq!(session.inventory().len(), 1);
        assert_eq!(app.inventory_index, 0);
    }
}
