//! UI rendering

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use catch_core::{format_price, FishField, OrderLine, StoreSession};

use super::app::{ActivePane, App, FishFormState, SyncIndicator};

/// Main UI rendering function
pub fn draw(frame: &mut Frame, app: &App, session: &StoreSession) {
    // Header, panes, status bar
    let outer_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let pane_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Percentage(30),
            Constraint::Percentage(30),
        ])
        .split(outer_chunks[1]);

    draw_header(frame, session, outer_chunks[0]);
    draw_menu_pane(frame, app, session, pane_chunks[0]);
    draw_order_pane(frame, app, session, pane_chunks[1]);
    draw_inventory_pane(frame, app, session, pane_chunks[2]);

    draw_sync_indicator(frame, app);
    draw_status_bar(frame, app, session, outer_chunks[2]);

    if let Some(form) = &app.form {
        draw_form(frame, form);
    }

    if let Some(error) = &app.error {
        draw_error(frame, error);
    } else if app.show_help {
        draw_help_overlay(frame);
    }
}

fn draw_header(frame: &mut Frame, session: &StoreSession, area: Rect) {
    let header = Paragraph::new(vec![
        Line::from(vec![
            Span::styled(
                "Catch of the Day",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("  ·  {}", session.store_id()),
                Style::default().add_modifier(Modifier::DIM),
            ),
        ]),
        Line::from(Span::styled(
            "Fresh Seafood Market",
            Style::default().add_modifier(Modifier::ITALIC),
        )),
    ])
    .alignment(Alignment::Center);

    frame.render_widget(header, area);
}

fn pane_block(title: &str, is_active: bool) -> Block<'_> {
    let border_style = if is_active {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };

    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style)
}

fn highlight_style(is_active: bool) -> Style {
    if is_active {
        Style::default()
            .add_modifier(Modifier::BOLD)
            .add_modifier(Modifier::REVERSED)
    } else {
        Style::default().add_modifier(Modifier::REVERSED)
    }
}

/// Draw the menu pane (left)
fn draw_menu_pane(frame: &mut Frame, app: &App, session: &StoreSession, area: Rect) {
    let is_active = app.active_pane == ActivePane::Menu;
    let locale = session.locale();
    let max_len = area.width.saturating_sub(4) as usize;

    let items: Vec<ListItem> = session
        .fishes()
        .map(|(_, fish)| {
            let price = format_price(fish.price, locale);
            let name_width = max_len.saturating_sub(price.chars().count() + 1);
            let name_style = if fish.is_available() {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default().add_modifier(Modifier::DIM)
            };

            let title = Line::from(vec![
                Span::styled(
                    format!("{:<width$}", truncate(&fish.name, name_width), width = name_width),
                    name_style,
                ),
                Span::raw(" "),
                Span::styled(price, Style::default().fg(Color::Green)),
            ]);

            let status_style = if fish.is_available() {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::Red)
            };
            let detail = Line::from(vec![
                Span::styled(fish.status.label(), status_style),
                Span::styled(
                    format!(" {}", truncate(&fish.desc, max_len.saturating_sub(11))),
                    Style::default().add_modifier(Modifier::DIM),
                ),
            ]);

            ListItem::new(vec![title, detail])
        })
        .collect();

    let block = pane_block(" Menu ", is_active);

    if items.is_empty() {
        let empty = Paragraph::new(vec![
            Line::from(""),
            Line::from(Span::styled(
                "No fish yet. Press L to load samples.",
                Style::default().add_modifier(Modifier::DIM),
            )),
        ])
        .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let list = List::new(items)
        .block(block)
        .highlight_style(highlight_style(is_active));

    let mut state = ListState::default();
    state.select(Some(app.menu_index));

    frame.render_stateful_widget(list, area, &mut state);
}

/// Draw the order pane (middle)
fn draw_order_pane(frame: &mut Frame, app: &App, session: &StoreSession, area: Rect) {
    let is_active = app.active_pane == ActivePane::Order;
    let locale = session.locale();
    let summary = session.summary();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(area);

    let items: Vec<ListItem> = summary
        .lines
        .iter()
        .map(|line| {
            let style = match line {
                OrderLine::Available { .. } => Style::default(),
                OrderLine::Unavailable { .. } => Style::default().fg(Color::Red),
            };
            ListItem::new(Span::styled(line.render(locale), style))
        })
        .collect();

    let block = pane_block(" Order ", is_active);

    if items.is_empty() {
        let empty = Paragraph::new(Span::styled(
            "Nothing ordered yet",
            Style::default().add_modifier(Modifier::DIM),
        ))
        .block(block);
        frame.render_widget(empty, chunks[0]);
    } else {
        let list = List::new(items)
            .block(block)
            .highlight_style(highlight_style(is_active));

        let mut state = ListState::default();
        if is_active {
            state.select(Some(app.order_index));
        }

        frame.render_stateful_widget(list, chunks[0], &mut state);
    }

    let total = Paragraph::new(Line::from(vec![
        Span::styled("Total: ", Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(
            summary.total_text(locale),
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        ),
    ]))
    .alignment(Alignment::Right)
    .block(Block::default().borders(Borders::ALL));

    frame.render_widget(total, chunks[1]);
}

/// Draw the inventory pane (right)
fn draw_inventory_pane(frame: &mut Frame, app: &App, session: &StoreSession, area: Rect) {
    let is_active = app.active_pane == ActivePane::Inventory;
    let max_len = area.width.saturating_sub(4) as usize;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(6)])
        .split(area);

    let items: Vec<ListItem> = session
        .fishes()
        .map(|(key, fish)| {
            ListItem::new(vec![
                Line::from(truncate(&fish.name, max_len)),
                Line::from(Span::styled(
                    truncate(key.as_str(), max_len),
                    Style::default().add_modifier(Modifier::DIM),
                )),
            ])
        })
        .collect();

    let list = List::new(items)
        .block(pane_block(" Inventory ", is_active))
        .highlight_style(highlight_style(is_active));

    let mut state = ListState::default();
    if !session.inventory().is_empty() {
        state.select(Some(app.inventory_index));
    }

    frame.render_stateful_widget(list, chunks[0], &mut state);

    // Details of the selected fish
    let detail = session
        .fishes()
        .nth(app.inventory_index)
        .map(|(_, fish)| {
            vec![
                Line::from(vec![
                    Span::styled("Status: ", Style::default().add_modifier(Modifier::BOLD)),
                    Span::raw(fish.status.as_str()),
                ]),
                Line::from(vec![
                    Span::styled("Image:  ", Style::default().add_modifier(Modifier::BOLD)),
                    Span::raw(if fish.image.is_empty() {
                        "(none)".to_string()
                    } else {
                        fish.image.clone()
                    }),
                ]),
            ]
        })
        .unwrap_or_default();

    let paragraph = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title(" Details "))
        .wrap(Wrap { trim: true });

    frame.render_widget(paragraph, chunks[1]);
}

/// Draw the status bar at the bottom
fn draw_status_bar(frame: &mut Frame, app: &App, session: &StoreSession, area: Rect) {
    let content = if let Some(msg) = &app.status_message {
        msg.clone()
    } else if !session.health().ledger_persistent {
        "Order storage unavailable - this order will not be saved".to_string()
    } else {
        match app.active_pane {
            ActivePane::Menu => "a:add to order  x:remove  Tab:pane  ?:help  q:quit",
            ActivePane::Order => "x:remove line  C:clear order  Tab:pane  ?:help  q:quit",
            ActivePane::Inventory => {
                "n:new  e:edit  d:delete  L:samples  o:image  Tab:pane  ?:help  q:quit"
            }
        }
        .to_string()
    };

    let paragraph = Paragraph::new(content).style(Style::default().add_modifier(Modifier::DIM));

    frame.render_widget(paragraph, area);
}

/// Draw sync indicator in top-right corner
fn draw_sync_indicator(frame: &mut Frame, app: &App) {
    let area = frame.area();
    if area.width < 5 {
        return;
    }

    let (icon, style) = match app.sync_status {
        SyncIndicator::Synced => ("✓", Style::default().fg(Color::Green)),
        SyncIndicator::Syncing => ("↻", Style::default().fg(Color::Yellow)),
        SyncIndicator::Offline => ("⚡", Style::default().fg(Color::DarkGray)),
        SyncIndicator::Disabled => ("○", Style::default().add_modifier(Modifier::DIM)),
        SyncIndicator::Error => ("✗", Style::default().fg(Color::Red)),
    };

    let indicator = Paragraph::new(Span::styled(icon, style));
    let indicator_area = Rect::new(area.width - 2, 0, 1, 1);
    frame.render_widget(indicator, indicator_area);
}

/// Draw the add/edit fish form as a popup
fn draw_form(frame: &mut Frame, form: &FishFormState) {
    let popup_area = centered(frame.area(), 60, 13);
    frame.render_widget(Clear, popup_area);

    let mut lines = vec![Line::from("")];
    let mut cursor = None;

    for (row, field) in FishField::ALL.iter().enumerate() {
        let focused = form.current_field() == *field;
        let label_style = if focused {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::DIM)
        };

        let label = format!(" {:<8}", field.as_str());
        if focused {
            cursor = Some((
                popup_area.x + 1 + label.chars().count() as u16 + form.cursor as u16,
                popup_area.y + 2 + row as u16,
            ));
        }

        lines.push(Line::from(vec![
            Span::styled(label, label_style),
            Span::raw(form.value(*field).to_string()),
        ]));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        " Tab/↓:next field  ↑:prev  Ctrl-T:toggle status",
        Style::default().add_modifier(Modifier::DIM),
    )));
    lines.push(Line::from(Span::styled(
        " Enter:save  Esc:cancel",
        Style::default().add_modifier(Modifier::DIM),
    )));

    let block = Block::default()
        .title(form.title())
        .borders(Borders::ALL)
        .border_style(Style::default().add_modifier(Modifier::BOLD));

    frame.render_widget(Paragraph::new(lines).block(block), popup_area);

    if let Some(position) = cursor {
        frame.set_cursor_position(position);
    }
}

/// Draw an error modal
fn draw_error(frame: &mut Frame, message: &str) {
    let popup_area = centered(frame.area(), 50, 7);
    frame.render_widget(Clear, popup_area);

    let text = vec![
        Line::from(Span::styled(message, Style::default().fg(Color::Red))),
        Line::from(""),
        Line::from(Span::styled(
            "Press any key to continue",
            Style::default().add_modifier(Modifier::DIM),
        )),
    ];

    let block = Block::default()
        .title(" Error ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));

    let paragraph = Paragraph::new(text).block(block).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, popup_area);
}

/// Draw help overlay
fn draw_help_overlay(frame: &mut Frame) {
    let popup_area = centered(frame.area(), 50, 22);

    // Clear the popup area
    frame.render_widget(Clear, popup_area);

    let help_text = vec![
        Line::from(vec![Span::styled(
            "Keyboard Shortcuts",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from(""),
        Line::from("Navigation:"),
        Line::from("  j/k, ↑/↓    Move up/down"),
        Line::from("  gg          Jump to first item"),
        Line::from("  G           Jump to last item"),
        Line::from("  h/l, ←/→    Switch panes"),
        Line::from("  Tab         Cycle panes"),
        Line::from(""),
        Line::from("Order:"),
        Line::from("  a, Enter    Add 1 lb of selected fish"),
        Line::from("  x           Remove from order"),
        Line::from("  C           Clear order"),
        Line::from(""),
        Line::from("Inventory:"),
        Line::from("  n           New fish"),
        Line::from("  e, Enter    Edit fish"),
        Line::from("  d           Delete fish"),
        Line::from("  L           Load sample fishes"),
        Line::from("  o           Open image"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(Style::default().add_modifier(Modifier::BOLD));

    let paragraph = Paragraph::new(help_text).block(block);
    frame.render_widget(paragraph, popup_area);
}

/// Centered popup area clamped to the screen
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let popup_width = width.min(area.width.saturating_sub(4));
    let popup_height = height.min(area.height.saturating_sub(4));
    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;
    Rect::new(popup_x, popup_y, popup_width, popup_height)
}

/// Truncate to max characters with an ellipsis
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{}…", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use catch_core::{Fish, FishStatus, MemoryRemote, SessionOptions, StoreId};
    use ratatui::{backend::TestBackend, Terminal};

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Trout", 10), "Trout");
        assert_eq!(truncate("Pacific Halibut", 8), "Pacific…");
    }

    #[test]
    fn test_centered_fits_screen() {
        let area = Rect::new(0, 0, 40, 10);
        let popup = centered(area, 60, 13);
        assert!(popup.width <= 36);
        assert!(popup.height <= 6);
    }

    #[test]
    fn test_draw_storefront() {
        let mut session = StoreSession::open(
            StoreId::parse("draw-test").unwrap(),
            Arc::new(MemoryRemote::new()),
            None,
            SessionOptions::default(),
        );
        let trout = session.add_fish(Fish::new("Trout", 9.99));
        session.add_fish(Fish::new("Halibut", 24.0).with_status(FishStatus::Unavailable));
        session.add_to_order(&trout);
        session.add_to_order(&trout);

        let mut app = App::new(false);
        app.show_help = true;
        app.open_new_form();

        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal
            .draw(|frame| draw(frame, &app, &session))
            .unwrap();

        let buffer = terminal.backend().buffer();
        let text: String = buffer.content().iter().map(|cell| cell.symbol()).collect();
        assert!(text.contains("Catch of the Day"));
        assert!(text.contains("Fresh Seafood Market"));
        assert!(text.contains("$19.98"));
        assert!(text.contains("Sold out!"));
    }
}
