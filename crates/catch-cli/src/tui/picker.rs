//! Store picker
//!
//! Shown when the TUI starts without `--store`: asks which store to open,
//! offering the last store or a freshly generated name. Tab cycles through
//! stores this device has ordered from.

use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    prelude::*,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use catch_core::{fun_name, StoreId};

/// Store picker state
pub struct StorePicker {
    input: String,
    cursor: usize,
    error: Option<String>,
    recent: Vec<String>,
    recent_index: Option<usize>,
}

impl StorePicker {
    /// Picker pre-filled with `suggestion`, or a random name
    pub fn new(suggestion: Option<&str>, recent: Vec<String>) -> Self {
        let input = suggestion
            .map(str::to_string)
            .unwrap_or_else(fun_name);
        let cursor = input.chars().count();
        Self {
            input,
            cursor,
            error: None,
            recent,
            recent_index: None,
        }
    }

    fn set_input(&mut self, input: String) {
        self.cursor = input.chars().count();
        self.input = input;
        self.error = None;
    }

    /// Run until a store is chosen (`Some`) or the user quits (`None`)
    pub async fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<Option<StoreId>> {
        loop {
            terminal.draw(|frame| self.draw(frame))?;

            tokio::time::sleep(Duration::from_millis(50)).await;

            if !event::poll(Duration::from_millis(0))? {
                continue;
            }
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if let Some(outcome) = self.handle_key(key.code, key.modifiers) {
                    return Ok(outcome);
                }
            }
        }
    }

    /// Apply one key press; `Some` ends the picker
    fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> Option<Option<StoreId>> {
        match code {
            KeyCode::Esc => return Some(None),
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => return Some(None),
            KeyCode::Enter => match StoreId::parse(&self.input) {
                Ok(store) => return Some(Some(store)),
                Err(e) => self.error = Some(e.to_string()),
            },
            // Ctrl-R: roll a new name
            KeyCode::Char('r') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.recent_index = None;
                self.set_input(fun_name());
            }
            KeyCode::Tab if !self.recent.is_empty() => {
                let next = self
                    .recent_index
                    .map_or(0, |i| (i + 1) % self.recent.len());
                let name = self.recent[next].clone();
                self.recent_index = Some(next);
                self.set_input(name);
            }
            KeyCode::Char(c) => {
                let at = self.byte_offset();
                self.input.insert(at, c);
                self.cursor += 1;
                self.error = None;
            }
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    let at = self.byte_offset();
                    self.input.remove(at);
                    self.error = None;
                }
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
            }
            KeyCode::Right => {
                if self.cursor < self.input.chars().count() {
                    self.cursor += 1;
                }
            }
            KeyCode::Home => {
                self.cursor = 0;
            }
            KeyCode::End => {
                self.cursor = self.input.chars().count();
            }
            _ => {}
        }
        None
    }

    fn byte_offset(&self) -> usize {
        self.input
            .char_indices()
            .nth(self.cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.input.len())
    }

    fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        frame.render_widget(Clear, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(7),
                Constraint::Length(3),
                Constraint::Min(0),
            ])
            .margin(2)
            .split(area);

        let title = Paragraph::new(vec![
            Line::from(vec![Span::styled(
                "Catch of the Day",
                Style::default()
                    .add_modifier(Modifier::BOLD)
                    .fg(Color::Cyan),
            )]),
            Line::from(""),
            Line::from("Fresh Seafood Market"),
        ])
        .alignment(Alignment::Center);
        frame.render_widget(title, chunks[0]);

        let input_area = inner_row(chunks[1], 3);
        let content = Paragraph::new(vec![
            Line::from(""),
            Line::from("Please enter a store name"),
        ])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Open Store ")
                .border_style(Style::default().fg(Color::Blue)),
        );
        frame.render_widget(content, chunks[1]);

        let input = Paragraph::new(Span::styled(
            self.input.as_str(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ))
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(input, input_area);

        let cursor_x = input_area.x + 1 + self.cursor as u16;
        frame.set_cursor_position((cursor_x, input_area.y + 1));

        let footer = if let Some(err) = &self.error {
            Paragraph::new(Span::styled(err.as_str(), Style::default().fg(Color::Red)))
        } else {
            Paragraph::new(Span::styled(
                "Enter: visit store   Tab: recent   Ctrl-R: new name   Esc: quit",
                Style::default().add_modifier(Modifier::DIM),
            ))
        };
        frame.render_widget(footer, chunks[2]);

        if !self.recent.is_empty() {
            let mut lines = vec![Line::from(Span::styled(
                "Recent stores",
                Style::default().add_modifier(Modifier::BOLD),
            ))];
            lines.extend(self.recent.iter().enumerate().map(|(i, name)| {
                let style = if Some(i) == self.recent_index {
                    Style::default().fg(Color::Yellow)
                } else {
                    Style::default()
                };
                Line::from(Span::styled(format!("  {}", name), style))
            }));
            frame.render_widget(Paragraph::new(lines), chunks[3]);
        }
    }
}

/// Row of `height` lines at the bottom of `area`, inside its border
fn inner_row(area: Rect, height: u16) -> Rect {
    Rect {
        x: area.x + 1,
        y: area.y + area.height.saturating_sub(height + 1),
        width: area.width.saturating_sub(2),
        height,
    }
}
